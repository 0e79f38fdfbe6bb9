//! Quiz prompt construction and completion validation.
//!
//! The generative backend is asked for a strict JSON array of
//! [`QuizItem`]s. Whatever comes back is validated here; anything that does
//! not parse or does not match the item shape collapses to a single
//! [`fallback_item`], so callers always receive a non-empty list.

use crate::models::{ChatMessage, QuizItem};

/// Number of options every quiz item must carry.
pub const OPTION_COUNT: usize = 4;

/// Question text of the item returned when a completion cannot be used.
pub const FALLBACK_QUESTION: &str = "Parsing fallito, riprova";

const QUIZ_SYSTEM: &str =
    "Sei un generatore di quiz per diritto civile italiano. Produci solo JSON valido.";

/// Instruction asking for `num` items on `topic` at `difficulty`.
pub fn quiz_instruction(topic: &str, difficulty: &str, num: usize) -> String {
    format!(
        "Genera {num} domande a risposta multipla ({OPTION_COUNT} opzioni) sulla teoria di diritto civile italiano.\n\
         Argomento: {topic}\n\
         Difficoltà: {difficulty}\n\
         Formato JSON: un array di oggetti con chiavi question, options (array di {OPTION_COUNT}), \
         correct_index (0-3), explanation (breve), references (norme/giurisprudenza essenziali).\n\
         Rispetta rigorosamente il JSON, senza testo extra.\n"
    )
}

/// `[system, user]` turns for a quiz request.
pub fn quiz_messages(topic: &str, difficulty: &str, num: usize) -> [ChatMessage; 2] {
    [
        ChatMessage::system(QUIZ_SYSTEM),
        ChatMessage::user(quiz_instruction(topic, difficulty, num)),
    ]
}

/// Fixed demonstrative item returned when no generative backend is configured.
pub fn demo_item() -> QuizItem {
    QuizItem {
        question: "Che cos'è l'obbligazione?".to_string(),
        options: vec![
            "Un dovere morale".to_string(),
            "Un vincolo giuridico a una prestazione".to_string(),
            "Un diritto reale".to_string(),
            "Una sanzione".to_string(),
        ],
        correct_index: 1,
        explanation: Some(
            "L'obbligazione è un vincolo giuridico a una prestazione (art. 1173 ss. c.c.)."
                .to_string(),
        ),
        references: Some(vec!["art. 1173 c.c.".to_string(), "art. 1174 c.c.".to_string()]),
    }
}

/// Placeholder item signalling that a completion could not be used.
pub fn fallback_item() -> QuizItem {
    QuizItem {
        question: FALLBACK_QUESTION.to_string(),
        options: ["OK", "NO", "BOH", "RIPROVA"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        correct_index: 0,
        explanation: None,
        references: None,
    }
}

/// Why a completion was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuizRejection {
    /// Not valid JSON for an array of items.
    Malformed(String),
    /// Valid JSON but an empty array.
    Empty,
    /// Item at this position has the wrong number of options.
    OptionCount(usize),
    /// Item at this position has `correct_index` outside `0..=3`.
    CorrectIndex(usize),
    /// Item at this position has an empty question.
    EmptyQuestion(usize),
}

impl std::fmt::Display for QuizRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuizRejection::Malformed(e) => write!(f, "malformed quiz JSON: {}", e),
            QuizRejection::Empty => write!(f, "quiz completion contained no items"),
            QuizRejection::OptionCount(i) => {
                write!(f, "item {} does not have {} options", i, OPTION_COUNT)
            }
            QuizRejection::CorrectIndex(i) => write!(f, "item {} has correct_index out of range", i),
            QuizRejection::EmptyQuestion(i) => write!(f, "item {} has an empty question", i),
        }
    }
}

impl std::error::Error for QuizRejection {}

/// Strip a surrounding Markdown code fence (```` ```json ... ``` ````), if any.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(nl) => &rest[nl + 1..],
        None => rest,
    };
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Parse and validate a raw completion.
pub fn parse_quiz_items(raw: &str) -> Result<Vec<QuizItem>, QuizRejection> {
    let items: Vec<QuizItem> = serde_json::from_str(strip_code_fence(raw))
        .map_err(|e| QuizRejection::Malformed(e.to_string()))?;

    if items.is_empty() {
        return Err(QuizRejection::Empty);
    }
    for (i, item) in items.iter().enumerate() {
        if item.question.trim().is_empty() {
            return Err(QuizRejection::EmptyQuestion(i));
        }
        if item.options.len() != OPTION_COUNT {
            return Err(QuizRejection::OptionCount(i));
        }
        if item.correct_index as usize >= OPTION_COUNT {
            return Err(QuizRejection::CorrectIndex(i));
        }
    }
    Ok(items)
}

/// Parse a completion, degrading to `[fallback_item()]` on any rejection.
pub fn items_or_fallback(raw: &str) -> (Vec<QuizItem>, Option<QuizRejection>) {
    match parse_quiz_items(raw) {
        Ok(items) => (items, None),
        Err(rejection) => (vec![fallback_item()], Some(rejection)),
    }
}
