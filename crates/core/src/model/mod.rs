mod day_state;
mod ids;
mod preferences;
mod question;
mod sphere;

pub use day_state::{DayState, DayStateError, NOT_UNDERSTOOD_LIMIT, SPHERE_ADVANCE_THRESHOLD};
pub use ids::{ParseIdError, QuestionId, UserId};
pub use preferences::Preferences;
pub use question::{AnswerDraft, AnswerError, Question, QuestionError, QuestionKind};
pub use sphere::{FocusSpheres, SphereCatalog, SphereError, SphereKey};
