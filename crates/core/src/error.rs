use thiserror::Error;

use crate::model::{AnswerError, DayStateError, QuestionError, SphereError};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Sphere(#[from] SphereError),
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Answer(#[from] AnswerError),
    #[error(transparent)]
    DayState(#[from] DayStateError),
}
