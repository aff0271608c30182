use std::env;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use reflect_core::model::{
    AnswerDraft, FocusSpheres, Question, QuestionId, QuestionKind, SphereCatalog, SphereKey,
    UserId,
};

use crate::error::ApiError;

/// Header carrying the Telegram Mini App init data.
pub const TELEGRAM_INIT_DATA_HEADER: &str = "X-Telegram-Init-Data";

/// Header carrying the persisted guest user id for non-Telegram sessions.
pub const GUEST_USER_ID_HEADER: &str = "X-Guest-User-Id";

const DEFAULT_BASE_URL: &str = "http://localhost:8000";
const ERROR_BODY_LIMIT: usize = 200;

//
// ─── CONFIG ───────────────────────────────────────────────────────────────────
//

#[derive(Clone, Debug)]
pub struct ApiConfig {
    base_url: Url,
}

impl ApiConfig {
    /// Create a config with a validated base URL.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidBaseUrl` if the URL does not parse.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let url =
            Url::parse(base_url).map_err(|_| ApiError::InvalidBaseUrl(base_url.to_string()))?;
        Ok(Self { base_url: url })
    }

    /// Read the base URL from `REFLECT_API_BASE_URL`, falling back to the
    /// local development default when unset or invalid.
    #[must_use]
    pub fn from_env() -> Self {
        match env::var("REFLECT_API_BASE_URL") {
            Ok(raw) => Self::new(&raw).unwrap_or_else(|_| {
                tracing::warn!(url = %raw, "ignoring invalid REFLECT_API_BASE_URL");
                Self::local_default()
            }),
            Err(_) => Self::local_default(),
        }
    }

    fn local_default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid"),
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

//
// ─── AUTH ─────────────────────────────────────────────────────────────────────
//

/// How requests identify the user: Telegram init data when running inside the
/// Mini App host, otherwise a guest id captured from the backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthMode {
    Telegram { init_data: String },
    Guest { user_id: Option<UserId> },
}

impl AuthMode {
    #[must_use]
    pub fn telegram(init_data: impl Into<String>) -> Self {
        Self::Telegram {
            init_data: init_data.into(),
        }
    }

    #[must_use]
    pub fn guest() -> Self {
        Self::Guest { user_id: None }
    }

    #[must_use]
    pub fn guest_with_id(user_id: UserId) -> Self {
        Self::Guest {
            user_id: Some(user_id),
        }
    }
}

//
// ─── CLIENT ───────────────────────────────────────────────────────────────────
//

/// Profile of the calling user as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub id: UserId,
    pub username: Option<String>,
}

/// A single sphere rating from the progress endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SphereRating {
    pub sphere: SphereKey,
    pub rating: u8,
}

/// Stateless HTTP client for the reflection backend.
///
/// Resolves auth headers, base URL, and JSON (de)serialization, and maps
/// non-2xx responses to `ApiError`. Sphere keys coming off the wire are
/// validated against the catalog before they enter the domain.
pub struct ApiClient {
    client: Client,
    config: ApiConfig,
    catalog: SphereCatalog,
    auth: Mutex<AuthMode>,
}

impl ApiClient {
    #[must_use]
    pub fn new(config: ApiConfig, auth: AuthMode, catalog: SphereCatalog) -> Self {
        Self {
            client: Client::new(),
            config,
            catalog,
            auth: Mutex::new(auth),
        }
    }

    /// Snapshot of the current auth mode.
    #[must_use]
    pub fn auth(&self) -> AuthMode {
        self.auth
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The guest id in use, if any.
    #[must_use]
    pub fn guest_user_id(&self) -> Option<UserId> {
        match self.auth() {
            AuthMode::Guest { user_id } => user_id,
            AuthMode::Telegram { .. } => None,
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, self.config.endpoint(path));
        match self.auth() {
            AuthMode::Telegram { init_data } => builder.header(TELEGRAM_INIT_DATA_HEADER, init_data),
            AuthMode::Guest {
                user_id: Some(user_id),
            } => builder.header(GUEST_USER_ID_HEADER, user_id.to_string()),
            AuthMode::Guest { user_id: None } => builder,
        }
    }

    // A guest session learns its id from the first users/me response.
    fn remember_guest(&self, id: UserId) {
        let mut guard = self.auth.lock().unwrap_or_else(PoisonError::into_inner);
        if matches!(&*guard, AuthMode::Guest { user_id: None }) {
            *guard = AuthMode::guest_with_id(id);
        }
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        response: Response,
    ) -> Result<T, ApiError> {
        let status = response.status();
        if !status.is_success() {
            return Err(Self::status_error(status, response).await);
        }
        Ok(response.json().await?)
    }

    async fn ensure_success(response: Response) -> Result<(), ApiError> {
        let status = response.status();
        if !status.is_success() {
            return Err(Self::status_error(status, response).await);
        }
        Ok(())
    }

    async fn status_error(status: StatusCode, response: Response) -> ApiError {
        let body = response.text().await.unwrap_or_default();
        classify_status(status, extract_message(status, &body))
    }

    /// Fetch the calling user's profile.
    ///
    /// Guest sessions capture the returned id for subsequent requests; the
    /// caller is expected to persist it via the preferences service.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on auth, transport, or decode failures.
    pub async fn current_user(&self) -> Result<UserProfile, ApiError> {
        let response = self.request(Method::GET, "api/users/me").send().await?;
        let payload: UserPayload = Self::read_json(response).await?;
        let profile = UserProfile {
            id: UserId::new(payload.id),
            username: payload.username,
        };
        self.remember_guest(profile.id);
        Ok(profile)
    }

    /// Fetch the user's focus spheres (0–2 validated keys, order preserved).
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Decode` for unknown sphere keys or an oversized
    /// set, and the usual transport errors otherwise.
    pub async fn focus_spheres(&self) -> Result<FocusSpheres, ApiError> {
        let response = self.request(Method::GET, "api/spheres/focus").send().await?;
        let payload: Vec<FocusSpherePayload> = Self::read_json(response).await?;

        let mut keys = Vec::with_capacity(payload.len());
        for entry in payload {
            let key = self
                .catalog
                .key(&entry.sphere)
                .map_err(|err| ApiError::Decode(err.to_string()))?;
            keys.push(key);
        }
        FocusSpheres::new(keys).map_err(|err| ApiError::Decode(err.to_string()))
    }

    /// Fetch the next daily question, optionally filtered to one sphere.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` when no question remains today (the
    /// expected end-of-day outcome) and other `ApiError`s on failure.
    pub async fn next_question(&self, sphere: Option<&SphereKey>) -> Result<Question, ApiError> {
        let mut request = self.request(Method::GET, "api/questions/daily");
        if let Some(sphere) = sphere {
            request = request.query(&[("sphere", sphere.as_str())]);
        }
        let response = request.send().await?;
        let payload: QuestionPayload = Self::read_json(response).await?;
        payload.into_question(&self.catalog)
    }

    /// Submit an answer for a question.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on validation, transport, or server failures.
    pub async fn submit_answer(&self, draft: &AnswerDraft) -> Result<(), ApiError> {
        let response = self
            .request(Method::POST, "api/answers/")
            .json(&AnswerRequest {
                question_id: draft.question_id().value(),
                answer: draft.text(),
            })
            .send()
            .await?;
        Self::ensure_success(response).await
    }

    /// Fetch backend-side settings (currently the dark-theme flag).
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on transport or decode failures.
    pub async fn fetch_settings(&self) -> Result<bool, ApiError> {
        let response = self.request(Method::GET, "api/settings/").send().await?;
        let payload: SettingsPayload = Self::read_json(response).await?;
        Ok(payload.dark_theme)
    }

    /// Mirror the dark-theme flag to the backend.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on transport or server failures.
    pub async fn update_settings(&self, dark_mode: bool) -> Result<(), ApiError> {
        let response = self
            .request(Method::PUT, "api/settings/")
            .json(&SettingsPayload {
                dark_theme: dark_mode,
            })
            .send()
            .await?;
        Self::ensure_success(response).await
    }

    /// Fetch the user's current sphere ratings.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on transport or decode failures; unknown sphere
    /// keys in the payload are skipped rather than failing the whole read.
    pub async fn sphere_ratings(&self) -> Result<Vec<SphereRating>, ApiError> {
        let response = self
            .request(Method::GET, "api/spheres/ratings")
            .send()
            .await?;
        let payload: Vec<RatingPayload> = Self::read_json(response).await?;

        let mut ratings = Vec::with_capacity(payload.len());
        for entry in payload {
            match self.catalog.key(&entry.sphere) {
                Ok(sphere) => ratings.push(SphereRating {
                    sphere,
                    rating: entry.rating,
                }),
                Err(err) => tracing::debug!(error = %err, "skipping rating for unknown sphere"),
            }
        }
        Ok(ratings)
    }

    /// Fetch sphere ratings, retrying while the backend catches up.
    ///
    /// Freshly-submitted ratings are eventually consistent; this polls with a
    /// fixed delay up to `max_attempts` times and then returns the last
    /// outcome, successful or not.
    ///
    /// # Errors
    ///
    /// Returns the final attempt's `ApiError` once attempts are exhausted.
    pub async fn sphere_ratings_eventually(
        &self,
        max_attempts: u32,
        delay: Duration,
    ) -> Result<Vec<SphereRating>, ApiError> {
        let attempts = max_attempts.max(1);
        let mut attempt = 1;
        loop {
            let outcome = self.sphere_ratings().await;
            match &outcome {
                Ok(ratings) if !ratings.is_empty() => return outcome,
                _ if attempt >= attempts => return outcome,
                Ok(_) => tracing::debug!(attempt, "sphere ratings empty; retrying"),
                Err(err) => {
                    tracing::debug!(attempt, error = %err, "sphere ratings fetch failed; retrying");
                }
            }
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

fn classify_status(status: StatusCode, message: String) -> ApiError {
    match status.as_u16() {
        401 | 403 => ApiError::Auth,
        404 => ApiError::NotFound,
        422 => ApiError::Validation(message),
        code => ApiError::Server {
            status: code,
            message,
        },
    }
}

// Error bodies are JSON `{"detail": ...}` from the backend, but proxies may
// return plain text; fall back to a truncated raw body.
fn extract_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("detail")
                .or_else(|| value.get("message"))
                .and_then(Value::as_str)
                .map(ToString::to_string)
        })
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                format!("HTTP status {status}")
            } else {
                trimmed.chars().take(ERROR_BODY_LIMIT).collect()
            }
        })
}

//
// ─── WIRE TYPES ───────────────────────────────────────────────────────────────
//

#[derive(Debug, Deserialize)]
struct UserPayload {
    id: i64,
    username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FocusSpherePayload {
    sphere: String,
}

#[derive(Debug, Deserialize)]
struct QuestionPayload {
    id: i64,
    sphere: String,
    text: String,
    #[serde(rename = "type")]
    kind: String,
}

impl QuestionPayload {
    fn into_question(self, catalog: &SphereCatalog) -> Result<Question, ApiError> {
        let sphere = catalog
            .key(&self.sphere)
            .map_err(|err| ApiError::Decode(err.to_string()))?;
        let kind =
            QuestionKind::from_wire(&self.kind).map_err(|err| ApiError::Decode(err.to_string()))?;
        Question::new(QuestionId::new(self.id), sphere, self.text, kind)
            .map_err(|err| ApiError::Decode(err.to_string()))
    }
}

#[derive(Debug, Serialize)]
struct AnswerRequest<'a> {
    question_id: i64,
    answer: &'a str,
}

#[derive(Debug, Serialize, Deserialize)]
struct SettingsPayload {
    dark_theme: bool,
}

#[derive(Debug, Deserialize)]
struct RatingPayload {
    sphere: String,
    rating: u8,
}
