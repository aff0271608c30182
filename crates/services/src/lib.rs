#![forbid(unsafe_code)]

pub mod api_client;
pub mod error;
pub mod flow;
pub mod preferences_service;
pub mod provider;

pub use reflect_core::Clock;

pub use api_client::{ApiClient, ApiConfig, AuthMode, SphereRating, UserProfile};
pub use error::{ApiError, FlowError, PreferencesError};
pub use flow::{ActionSet, DailyFlowController, FlowSnapshot, FlowState};
pub use preferences_service::PreferencesService;
pub use provider::{QuestionSource, StaticQuestionBank};
