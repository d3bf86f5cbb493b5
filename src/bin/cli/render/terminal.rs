use studyforge_lib::study_sets::{
    FlashcardItem, QuizQuestion, ShortAnswerQuestion, StudyPayload, StudySet, TestData,
    TrueFalseQuestion,
};

/// ANSI color codes
pub struct Color;

impl Color {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";
    pub const RED: &str = "\x1b[31m";
    pub const GREEN: &str = "\x1b[32m";
    pub const CYAN: &str = "\x1b[36m";
}

/// Wrap `text` in `color` when colors are enabled
pub fn paint(text: &str, color: &str, use_color: bool) -> String {
    if use_color {
        format!("{}{}{}", color, text, Color::RESET)
    } else {
        text.to_string()
    }
}

/// Truncate to `width` characters, ending in "..." when cut
pub fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let kept: String = text.chars().take(width.saturating_sub(3)).collect();
    format!("{}...", kept)
}

pub fn render_tags(tags: &[String]) -> String {
    tags.iter()
        .map(|t| format!("#{}", t))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render a whole set: header, tags, summary and material
pub fn render_study_set(set: &StudySet, use_color: bool) -> String {
    let mut lines = vec![paint(&set.name, Color::BOLD, use_color)];

    let meta = format!(
        "{} · {} item(s) · updated {}",
        set.mode(),
        set.payload.item_count(),
        set.updated_at.format("%Y-%m-%d %H:%M")
    );
    lines.push(paint(&meta, Color::DIM, use_color));
    if !set.tags.is_empty() {
        lines.push(paint(&render_tags(&set.tags), Color::DIM, use_color));
    }
    if let Some(summary) = set.summary.as_deref().filter(|s| !s.is_empty()) {
        lines.push(String::new());
        lines.push(summary.to_string());
    }

    lines.push(String::new());
    lines.extend(render_payload(&set.payload, use_color));

    // Remove trailing blank line
    while lines.last().map_or(false, |l| l.is_empty()) {
        lines.pop();
    }

    lines.join("\n")
}

pub fn render_payload(payload: &StudyPayload, use_color: bool) -> Vec<String> {
    match payload {
        StudyPayload::Flashcards { flashcards } => render_flashcards(flashcards, use_color),
        StudyPayload::Quiz { quiz_questions } => render_quiz(quiz_questions, 1, use_color),
        StudyPayload::Test { test_data } => render_test(test_data, use_color),
    }
}

fn render_flashcards(cards: &[FlashcardItem], use_color: bool) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, card) in cards.iter().enumerate() {
        lines.push(paint(&format!("{}. {}", i + 1, card.question), Color::BOLD, use_color));
        lines.push(format!("   {}", card.answer));
        lines.push(String::new());
    }
    lines
}

fn render_quiz(questions: &[QuizQuestion], start: usize, use_color: bool) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, question) in questions.iter().enumerate() {
        lines.push(paint(
            &format!("{}. {}", start + i, question.question),
            Color::BOLD,
            use_color,
        ));
        let correct = question.correct_index();
        for (j, option) in question.options.iter().enumerate() {
            let letter = (b'A' + j as u8) as char;
            let line = format!("   {}) {}", letter, option);
            if correct == Some(j) {
                lines.push(paint(&format!("{}  ✓", line), Color::GREEN, use_color));
            } else {
                lines.push(line);
            }
        }
        if correct.is_none() {
            lines.push(format!("   Answer: {}", question.correct_answer));
        }
        if let Some(explanation) = &question.explanation {
            lines.push(paint(&format!("   {}", explanation), Color::DIM, use_color));
        }
        lines.push(String::new());
    }
    lines
}

fn render_true_false(
    questions: &[TrueFalseQuestion],
    start: usize,
    use_color: bool,
) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, question) in questions.iter().enumerate() {
        lines.push(paint(
            &format!("{}. {}", start + i, question.statement),
            Color::BOLD,
            use_color,
        ));
        let (answer, color) = if question.answer {
            ("True", Color::GREEN)
        } else {
            ("False", Color::RED)
        };
        lines.push(format!("   {}", paint(answer, color, use_color)));
        if let Some(explanation) = &question.explanation {
            lines.push(paint(&format!("   {}", explanation), Color::DIM, use_color));
        }
        lines.push(String::new());
    }
    lines
}

fn render_short_answer(
    questions: &[ShortAnswerQuestion],
    start: usize,
    use_color: bool,
) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, question) in questions.iter().enumerate() {
        lines.push(paint(
            &format!("{}. {}", start + i, question.question),
            Color::BOLD,
            use_color,
        ));
        lines.push(format!("   {}", question.answer));
        if !question.keywords.is_empty() {
            lines.push(paint(
                &format!("   Keywords: {}", question.keywords.join(", ")),
                Color::DIM,
                use_color,
            ));
        }
        lines.push(String::new());
    }
    lines
}

/// Test sections share one running question number
fn render_test(test: &TestData, use_color: bool) -> Vec<String> {
    let mut lines = Vec::new();
    let mut next = 1;

    if !test.multiple_choice.is_empty() {
        lines.push(paint("Multiple choice", Color::CYAN, use_color));
        lines.extend(render_quiz(&test.multiple_choice, next, use_color));
        next += test.multiple_choice.len();
    }
    if !test.true_false.is_empty() {
        lines.push(paint("True or false", Color::CYAN, use_color));
        lines.extend(render_true_false(&test.true_false, next, use_color));
        next += test.true_false.len();
    }
    if !test.short_answer.is_empty() {
        lines.push(paint("Short answer", Color::CYAN, use_color));
        lines.extend(render_short_answer(&test.short_answer, next, use_color));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use studyforge_lib::study_sets::CreateStudySet;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Biology", 10), "Biology");
        assert_eq!(truncate("Introduction to Biology", 10), "Introdu...");
    }

    #[test]
    fn test_test_numbering_runs_across_sections() {
        let payload = StudyPayload::Test {
            test_data: TestData {
                multiple_choice: vec![],
                true_false: vec![TrueFalseQuestion {
                    statement: "Cells divide".to_string(),
                    answer: true,
                    explanation: None,
                }],
                short_answer: vec![ShortAnswerQuestion {
                    question: "Define mitosis".to_string(),
                    answer: "Cell division".to_string(),
                    keywords: vec!["division".to_string()],
                }],
            },
        };
        let request = CreateStudySet::new("Cells", payload).with_tags(vec!["bio".into()]);
        let set = StudySet::new(request);
        let rendered = render_study_set(&set, false);

        assert!(rendered.starts_with("Cells\n"));
        assert!(rendered.contains("#bio"));
        assert!(rendered.contains("1. Cells divide"));
        assert!(rendered.contains("2. Define mitosis"));
        assert!(!rendered.contains('\x1b'));
    }
}
