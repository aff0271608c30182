use thiserror::Error;

use crate::model::ids::QuestionId;
use crate::model::sphere::SphereKey;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question text cannot be empty")]
    EmptyText,

    #[error("unknown question kind: {0}")]
    UnknownKind(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AnswerError {
    #[error("answer text cannot be empty")]
    Empty,
}

//
// ─── QUESTION ─────────────────────────────────────────────────────────────────
//

/// How a question is answered.
///
/// The backend currently only serves free-text questions; the enum leaves
/// room for future kinds without widening the wire contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionKind {
    Text,
}

impl QuestionKind {
    /// Parse the wire representation of a question kind.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::UnknownKind` for unrecognized values.
    pub fn from_wire(value: &str) -> Result<Self, QuestionError> {
        match value {
            "text" => Ok(Self::Text),
            other => Err(QuestionError::UnknownKind(other.to_string())),
        }
    }

    #[must_use]
    pub fn as_wire(self) -> &'static str {
        match self {
            QuestionKind::Text => "text",
        }
    }
}

/// A single reflection question served by the backend.
///
/// The flow treats it as an opaque unit: something to display and to
/// reference when submitting an answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    sphere: SphereKey,
    text: String,
    kind: QuestionKind,
}

impl Question {
    /// Create a question from validated parts.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::EmptyText` if the text is blank.
    pub fn new(
        id: QuestionId,
        sphere: SphereKey,
        text: impl Into<String>,
        kind: QuestionKind,
    ) -> Result<Self, QuestionError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(QuestionError::EmptyText);
        }
        Ok(Self {
            id,
            sphere,
            text,
            kind,
        })
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn sphere(&self) -> &SphereKey {
        &self.sphere
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn kind(&self) -> QuestionKind {
        self.kind
    }
}

//
// ─── ANSWER DRAFT ─────────────────────────────────────────────────────────────
//

/// A locally-validated answer ready for submission.
///
/// Trimming and the non-empty check happen here, before any network call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerDraft {
    question_id: QuestionId,
    text: String,
}

impl AnswerDraft {
    /// Validate raw answer text for the given question.
    ///
    /// # Errors
    ///
    /// Returns `AnswerError::Empty` if the text is blank after trimming.
    pub fn new(question_id: QuestionId, raw: &str) -> Result<Self, AnswerError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AnswerError::Empty);
        }
        Ok(Self {
            question_id,
            text: trimmed.to_string(),
        })
    }

    #[must_use]
    pub fn question_id(&self) -> QuestionId {
        self.question_id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SphereCatalog;

    fn career() -> SphereKey {
        SphereCatalog::default_catalog().key("career").unwrap()
    }

    #[test]
    fn question_rejects_blank_text() {
        let err = Question::new(QuestionId::new(1), career(), "   ", QuestionKind::Text)
            .unwrap_err();
        assert!(matches!(err, QuestionError::EmptyText));
    }

    #[test]
    fn question_kind_wire_roundtrip() {
        let kind = QuestionKind::from_wire("text").unwrap();
        assert_eq!(kind.as_wire(), "text");
    }

    #[test]
    fn unknown_question_kind_is_rejected() {
        let err = QuestionKind::from_wire("scale").unwrap_err();
        assert!(matches!(err, QuestionError::UnknownKind(_)));
    }

    #[test]
    fn answer_draft_trims_text() {
        let draft = AnswerDraft::new(QuestionId::new(7), "  did well today  ").unwrap();
        assert_eq!(draft.text(), "did well today");
        assert_eq!(draft.question_id(), QuestionId::new(7));
    }

    #[test]
    fn blank_answer_is_rejected() {
        let err = AnswerDraft::new(QuestionId::new(7), " \n ").unwrap_err();
        assert!(matches!(err, AnswerError::Empty));
    }
}
