use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use reflect_core::model::{AnswerDraft, FocusSpheres, Question, SphereKey};

use crate::api_client::ApiClient;
use crate::error::ApiError;

/// The operations the daily flow consumes from the outside world.
///
/// `ApiClient` is the production implementation; `StaticQuestionBank` serves
/// tests and offline prototyping.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    /// The user's current focus spheres.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on auth or transport failures.
    async fn focus_spheres(&self) -> Result<FocusSpheres, ApiError>;

    /// The next question, optionally filtered to one sphere.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` when no question remains today; other
    /// `ApiError`s on failure.
    async fn next_question(&self, sphere: Option<&SphereKey>) -> Result<Question, ApiError>;

    /// Submit an answer.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on validation, transport, or server failures.
    async fn submit_answer(&self, answer: &AnswerDraft) -> Result<(), ApiError>;
}

#[async_trait]
impl QuestionSource for ApiClient {
    async fn focus_spheres(&self) -> Result<FocusSpheres, ApiError> {
        ApiClient::focus_spheres(self).await
    }

    async fn next_question(&self, sphere: Option<&SphereKey>) -> Result<Question, ApiError> {
        ApiClient::next_question(self, sphere).await
    }

    async fn submit_answer(&self, answer: &AnswerDraft) -> Result<(), ApiError> {
        ApiClient::submit_answer(self, answer).await
    }
}

/// In-process question source with a fixed pool of questions.
///
/// Each serve consumes the first question matching the filter, so a skip
/// naturally yields a different question until the pool runs dry.
pub struct StaticQuestionBank {
    focus: FocusSpheres,
    questions: Mutex<Vec<Question>>,
    submitted: Mutex<Vec<AnswerDraft>>,
}

impl StaticQuestionBank {
    #[must_use]
    pub fn new(focus: FocusSpheres, questions: Vec<Question>) -> Self {
        Self {
            focus,
            questions: Mutex::new(questions),
            submitted: Mutex::new(Vec::new()),
        }
    }

    /// Answers submitted so far, in order.
    #[must_use]
    pub fn submitted(&self) -> Vec<AnswerDraft> {
        self.submitted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Questions still waiting to be served.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.questions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl QuestionSource for StaticQuestionBank {
    async fn focus_spheres(&self) -> Result<FocusSpheres, ApiError> {
        Ok(self.focus.clone())
    }

    async fn next_question(&self, sphere: Option<&SphereKey>) -> Result<Question, ApiError> {
        let mut guard = self
            .questions
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let position = guard
            .iter()
            .position(|q| sphere.is_none_or(|key| q.sphere() == key));
        match position {
            Some(index) => Ok(guard.remove(index)),
            None => Err(ApiError::NotFound),
        }
    }

    async fn submit_answer(&self, answer: &AnswerDraft) -> Result<(), ApiError> {
        self.submitted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(answer.clone());
        Ok(())
    }
}
