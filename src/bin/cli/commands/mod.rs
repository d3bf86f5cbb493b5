pub mod generate;
pub mod health;
pub mod list;
pub mod manage;
pub mod show;
