//! Profile-aware prompt construction.
//!
//! The system turn is a fixed base instruction followed by exactly one
//! addendum chosen by [`Profile`]. The user turn carries the literal query,
//! the retrieved local contexts and, when present, the web citations.

use serde::{Deserialize, Serialize};

use crate::models::ChatMessage;

/// Maximum number of local contexts placed in the user turn.
pub const MAX_CONTEXTS: usize = 8;
/// Maximum number of web citations placed in the user turn.
pub const MAX_WEB_CITATIONS: usize = 8;

/// Delimiter between local contexts in the user turn.
pub const CONTEXT_DELIMITER: &str = "\n---\n";

const BASE_INSTRUCTION: &str = "Sei un assistente giuridico (diritto civile IT). \
Cita SOLO norme e giurisprudenza; niente dottrina protetta. \
Se i dati sono incerti, indicalo.";

/// Audience the answer is written for. Selects the system addendum only;
/// retrieval is identical for every profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Profile {
    /// Trainee lawyer (`praticanteAvvocato`).
    #[default]
    TraineeLawyer,
    /// Lawyer (`avvocato`).
    Lawyer,
    /// Trainee notary (`praticanteNotaio`).
    TraineeNotary,
    /// Notary (`notaio`).
    Notary,
    /// Any other audience: plain didactic explanations.
    Didactic,
}

impl Profile {
    /// Parse a wire identifier. Unknown identifiers select [`Profile::Didactic`].
    pub fn parse(s: &str) -> Self {
        match s {
            "praticanteAvvocato" => Profile::TraineeLawyer,
            "avvocato" => Profile::Lawyer,
            "praticanteNotaio" => Profile::TraineeNotary,
            "notaio" => Profile::Notary,
            _ => Profile::Didactic,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Profile::TraineeLawyer => "praticanteAvvocato",
            Profile::Lawyer => "avvocato",
            Profile::TraineeNotary => "praticanteNotaio",
            Profile::Notary => "notaio",
            Profile::Didactic => "didattico",
        }
    }

    /// The profile-specific system addendum.
    pub fn addendum(&self) -> &'static str {
        match self {
            Profile::TraineeLawyer => {
                "Taglio forense operativo: onere della prova, termini, rimedi; checklist finale. \
                 Struttura: Quesito -> Norme -> Giurisprudenza -> Applicazione -> Conclusioni."
            }
            Profile::Lawyer => {
                "Taglio professionale: strategia processuale, rischi, orientamenti consolidati, \
                 spese e rito; richiami a SU ove rilevanti."
            }
            Profile::TraineeNotary => {
                "Taglio notarile: qualificazione, causa, forma, clausole, rischi, \
                 adempimenti post stipula; massime notarili verificate."
            }
            Profile::Notary => {
                "Approfondimento notarile: varianti e red flags; massime CN Milano ove rilevanti."
            }
            Profile::Didactic => "Taglio didattico con definizioni chiare e schemi.",
        }
    }
}

impl From<String> for Profile {
    fn from(s: String) -> Self {
        Profile::parse(&s)
    }
}

impl From<Profile> for String {
    fn from(p: Profile) -> Self {
        p.as_str().to_string()
    }
}

/// Full system instruction for `profile`.
pub fn system_instruction(profile: Profile) -> String {
    format!("{} {}", BASE_INSTRUCTION, profile.addendum())
}

/// Build the `[system, user]` turn pair.
///
/// At most [`MAX_CONTEXTS`] contexts and [`MAX_WEB_CITATIONS`] citations are
/// included; callers passing more simply see the excess dropped.
pub fn build_prompt(
    profile: Profile,
    query: &str,
    contexts: &[String],
    web_citations: &[String],
) -> [ChatMessage; 2] {
    let mut user = format!(
        "Quesito: {}\n\nContesto recuperato (usa solo ciò che è pertinente):\n{}",
        query,
        contexts
            .iter()
            .take(MAX_CONTEXTS)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(CONTEXT_DELIMITER)
    );

    if !web_citations.is_empty() {
        user.push_str("\n\nRiferimenti web (usa solo per giurisprudenza effettiva):\n");
        user.push_str(
            &web_citations
                .iter()
                .take(MAX_WEB_CITATIONS)
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join("\n"),
        );
    }

    [
        ChatMessage::system(system_instruction(profile)),
        ChatMessage::user(user),
    ]
}
