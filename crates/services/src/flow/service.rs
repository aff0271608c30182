use std::sync::Arc;

use reflect_core::Clock;
use reflect_core::model::{AnswerDraft, DayState, FocusSpheres};
use storage::repository::{DayStateRecord, DayStateRepository};

use super::state::{ActionSet, FlowState};
use crate::error::{ApiError, FlowError};
use crate::provider::QuestionSource;

/// Snapshot of the flow handed to the presentation layer after every
/// transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowSnapshot {
    pub state: FlowState,
    pub actions: ActionSet,
    pub skip_count: u32,
    pub not_understood_count: u32,
    pub active_sphere_index: usize,
}

/// Drives the per-day question flow.
///
/// Owns the day's counters and the current [`FlowState`], consumes a
/// [`QuestionSource`] for questions and submissions, and writes every counter
/// mutation through the day-state repository before the transition commits.
/// All methods take `&mut self`, so at most one operation is ever in flight.
pub struct DailyFlowController {
    clock: Clock,
    source: Arc<dyn QuestionSource>,
    day_states: Arc<dyn DayStateRepository>,
    focus: FocusSpheres,
    focus_loaded: bool,
    day: DayState,
    state: FlowState,
    durable: bool,
}

impl DailyFlowController {
    /// Start the flow for today: restore persisted counters, load focus
    /// spheres, and request the first question.
    ///
    /// Failures land in `FlowState::Error` rather than failing construction,
    /// so the presentation layer always gets a controller it can render and
    /// retry from.
    pub async fn start(
        clock: Clock,
        source: Arc<dyn QuestionSource>,
        day_states: Arc<dyn DayStateRepository>,
    ) -> Self {
        let today = clock.today();
        let mut durable = true;
        let day = match day_states.get_day_state(today).await {
            Ok(Some(record)) => match record.into_state() {
                Ok(state) => state.rolled_to(today),
                Err(err) => {
                    tracing::warn!(error = %err, "discarding corrupt day state");
                    DayState::fresh(today)
                }
            },
            Ok(None) => DayState::fresh(today),
            Err(err) => {
                tracing::warn!(error = %err, "day state read failed; continuing in memory");
                durable = false;
                DayState::fresh(today)
            }
        };

        let mut controller = Self {
            clock,
            source,
            day_states,
            focus: FocusSpheres::none(),
            focus_loaded: false,
            day,
            state: FlowState::Loading,
            durable,
        };
        controller.bootstrap().await;
        controller
    }

    #[must_use]
    pub fn state(&self) -> &FlowState {
        &self.state
    }

    #[must_use]
    pub fn day(&self) -> &DayState {
        &self.day
    }

    #[must_use]
    pub fn focus_spheres(&self) -> &FocusSpheres {
        &self.focus
    }

    /// False once a persistence failure dropped the session to
    /// in-memory-only counters.
    #[must_use]
    pub fn is_durable(&self) -> bool {
        self.durable
    }

    #[must_use]
    pub fn snapshot(&self) -> FlowSnapshot {
        FlowSnapshot {
            state: self.state.clone(),
            actions: ActionSet::available(&self.state, &self.day, self.focus.len()),
            skip_count: self.day.skip_count(),
            not_understood_count: self.day.not_understood_count(),
            active_sphere_index: self.day.active_sphere_index(),
        }
    }

    /// Retry after an error: refetch focus spheres if they never loaded,
    /// then request a question for the active sphere.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::Busy` while a request is in flight and
    /// `FlowError::ActionUnavailable` outside the error state.
    pub async fn reload(&mut self) -> Result<FlowSnapshot, FlowError> {
        match self.state {
            FlowState::Error { .. } => {}
            FlowState::Loading | FlowState::Submitting(_) => return Err(FlowError::Busy),
            FlowState::AwaitingAnswer(_) | FlowState::Empty => {
                return Err(FlowError::ActionUnavailable);
            }
        }
        self.roll_day().await;
        self.bootstrap().await;
        Ok(self.snapshot())
    }

    /// Submit answer text for the current question (or retry a failed
    /// submission).
    ///
    /// On success the day's counters fully reset and the next question is
    /// requested for the primary sphere; on failure the question is kept so
    /// nothing the user typed is lost.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::Answer` for blank text, `FlowError::Busy` while a
    /// request is in flight, and `FlowError::NoActiveQuestion` when there is
    /// nothing to answer.
    pub async fn submit(&mut self, text: &str) -> Result<FlowSnapshot, FlowError> {
        if self.state.is_busy() {
            return Err(FlowError::Busy);
        }
        let Some(question) = self.state.question().cloned() else {
            return Err(FlowError::NoActiveQuestion);
        };
        let draft = AnswerDraft::new(question.id(), text)?;

        self.roll_day().await;
        self.state = FlowState::Submitting(question.clone());
        match self.source.submit_answer(&draft).await {
            Ok(()) => {
                self.day.reset_after_answer();
                self.persist_day().await;
                self.fetch_question().await;
            }
            Err(err) => {
                tracing::debug!(error = %err, "answer submission failed");
                self.state = FlowState::Error {
                    message: err.to_string(),
                    question: Some(question),
                };
            }
        }
        Ok(self.snapshot())
    }

    /// Defer the current question and request a different one.
    ///
    /// The second skip advances the active sphere when two focus spheres are
    /// configured; with one sphere the action goes away at that point.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::Busy` mid-request, `FlowError::NoActiveQuestion`
    /// outside `AwaitingAnswer`, and `FlowError::ActionUnavailable` once the
    /// single-sphere skip allowance is spent.
    pub async fn skip(&mut self) -> Result<FlowSnapshot, FlowError> {
        if self.state.is_busy() {
            return Err(FlowError::Busy);
        }
        if !matches!(self.state, FlowState::AwaitingAnswer(_)) {
            return Err(FlowError::NoActiveQuestion);
        }
        self.roll_day().await;
        if !self.day.can_skip(self.focus.len()) {
            return Err(FlowError::ActionUnavailable);
        }

        self.day.record_skip(self.focus.is_pair());
        self.persist_day().await;
        self.fetch_question().await;
        Ok(self.snapshot())
    }

    /// Request a replacement question because the current one was unclear.
    ///
    /// Capped at two per day; the cap is enforced here even if the UI offers
    /// the action anyway.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::Busy` mid-request, `FlowError::NoActiveQuestion`
    /// outside `AwaitingAnswer`, and `FlowError::ActionUnavailable` past the
    /// daily cap.
    pub async fn mark_not_understood(&mut self) -> Result<FlowSnapshot, FlowError> {
        if self.state.is_busy() {
            return Err(FlowError::Busy);
        }
        if !matches!(self.state, FlowState::AwaitingAnswer(_)) {
            return Err(FlowError::NoActiveQuestion);
        }
        self.roll_day().await;
        if self
            .day
            .record_not_understood(self.focus.is_pair())
            .is_err()
        {
            return Err(FlowError::ActionUnavailable);
        }

        self.persist_day().await;
        self.fetch_question().await;
        Ok(self.snapshot())
    }

    /// Skip all remaining questions today and end the flow.
    ///
    /// A deliberate escape hatch, unlocked by two skips, distinct from
    /// running out of questions.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::Busy` mid-request and
    /// `FlowError::ActionUnavailable` before the unlock or once already
    /// empty.
    pub async fn skip_all(&mut self) -> Result<FlowSnapshot, FlowError> {
        if self.state.is_busy() {
            return Err(FlowError::Busy);
        }
        if self.state.is_empty() {
            return Err(FlowError::ActionUnavailable);
        }
        self.roll_day().await;
        if !self.day.can_skip_all() {
            return Err(FlowError::ActionUnavailable);
        }

        self.state = FlowState::Empty;
        Ok(self.snapshot())
    }

    async fn bootstrap(&mut self) {
        self.state = FlowState::Loading;
        if !self.focus_loaded {
            match self.source.focus_spheres().await {
                Ok(focus) => {
                    self.focus = focus;
                    self.focus_loaded = true;
                }
                Err(err) => {
                    tracing::debug!(error = %err, "focus sphere load failed");
                    self.state = FlowState::Error {
                        message: err.to_string(),
                        question: None,
                    };
                    return;
                }
            }
        }
        self.fetch_question().await;
    }

    async fn fetch_question(&mut self) {
        self.state = FlowState::Loading;
        let filter = self.focus.get(self.day.active_sphere_index()).cloned();
        match self.source.next_question(filter.as_ref()).await {
            Ok(question) => self.state = FlowState::AwaitingAnswer(question),
            Err(ApiError::NotFound) => self.state = FlowState::Empty,
            Err(err) => {
                tracing::debug!(error = %err, "question load failed");
                self.state = FlowState::Error {
                    message: err.to_string(),
                    question: None,
                };
            }
        }
    }

    // Counters never cross a calendar-day boundary.
    async fn roll_day(&mut self) {
        let today = self.clock.today();
        if self.day.date() != today {
            self.day = DayState::fresh(today);
            self.persist_day().await;
        }
    }

    async fn persist_day(&mut self) {
        if !self.durable {
            return;
        }
        let record = DayStateRecord::from_state(&self.day);
        if let Err(err) = self.day_states.put_day_state(&record).await {
            tracing::warn!(error = %err, "day state write failed; continuing in memory");
            self.durable = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::StaticQuestionBank;
    use reflect_core::model::{Question, QuestionId, QuestionKind, SphereCatalog};
    use reflect_core::time::fixed_clock;
    use storage::repository::InMemoryStore;

    fn question(id: i64, sphere: &str) -> Question {
        let catalog = SphereCatalog::default_catalog();
        Question::new(
            QuestionId::new(id),
            catalog.key(sphere).unwrap(),
            format!("Question {id}"),
            QuestionKind::Text,
        )
        .unwrap()
    }

    fn focus(keys: &[&str]) -> FocusSpheres {
        let catalog = SphereCatalog::default_catalog();
        FocusSpheres::new(keys.iter().map(|k| catalog.key(k).unwrap()).collect()).unwrap()
    }

    async fn controller_with(
        focus_keys: &[&str],
        questions: Vec<Question>,
    ) -> (DailyFlowController, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        let bank = Arc::new(StaticQuestionBank::new(focus(focus_keys), questions));
        let controller =
            DailyFlowController::start(fixed_clock(), bank, store.clone()).await;
        (controller, store)
    }

    #[tokio::test]
    async fn start_serves_primary_sphere_question() {
        let (controller, _store) =
            controller_with(&["career"], vec![question(1, "career")]).await;

        match controller.state() {
            FlowState::AwaitingAnswer(q) => assert_eq!(q.id(), QuestionId::new(1)),
            other => panic!("unexpected state: {other:?}"),
        }
    }

    #[tokio::test]
    async fn exhausted_source_starts_empty() {
        let (controller, _store) = controller_with(&["career"], vec![]).await;
        assert!(controller.state().is_empty());
        assert_eq!(controller.snapshot().actions, ActionSet::default());
    }

    #[tokio::test]
    async fn second_skip_requests_second_sphere() {
        let (mut controller, _store) = controller_with(
            &["career", "money"],
            vec![
                question(1, "career"),
                question(2, "career"),
                question(3, "money"),
            ],
        )
        .await;

        controller.skip().await.unwrap();
        assert_eq!(controller.day().active_sphere_index(), 0);

        let snapshot = controller.skip().await.unwrap();
        assert_eq!(snapshot.active_sphere_index, 1);
        match &snapshot.state {
            FlowState::AwaitingAnswer(q) => assert_eq!(q.sphere().as_str(), "money"),
            other => panic!("unexpected state: {other:?}"),
        }
    }

    #[tokio::test]
    async fn skip_persists_before_loading() {
        let (mut controller, store) =
            controller_with(&["career"], vec![question(1, "career"), question(2, "career")])
                .await;

        controller.skip().await.unwrap();

        let persisted = store
            .get_day_state(fixed_clock().today())
            .await
            .unwrap()
            .expect("persisted after skip");
        assert_eq!(persisted.skip_count, 1);
    }

    #[tokio::test]
    async fn submit_resets_and_serves_primary() {
        let (mut controller, store) = controller_with(
            &["career", "money"],
            vec![
                question(1, "career"),
                question(2, "career"),
                question(3, "money"),
                question(4, "career"),
            ],
        )
        .await;

        controller.skip().await.unwrap();
        controller.skip().await.unwrap();
        assert_eq!(controller.day().active_sphere_index(), 1);

        let snapshot = controller.submit("made progress").await.unwrap();
        assert_eq!(snapshot.skip_count, 0);
        assert_eq!(snapshot.active_sphere_index, 0);
        match &snapshot.state {
            FlowState::AwaitingAnswer(q) => assert_eq!(q.sphere().as_str(), "career"),
            other => panic!("unexpected state: {other:?}"),
        }

        let persisted = store
            .get_day_state(fixed_clock().today())
            .await
            .unwrap()
            .expect("persisted after submit");
        assert_eq!(persisted.skip_count, 0);
        assert_eq!(persisted.active_sphere_index, 0);
    }

    #[tokio::test]
    async fn blank_answer_is_rejected_locally() {
        let (mut controller, _store) =
            controller_with(&["career"], vec![question(1, "career")]).await;

        let err = controller.submit("   ").await.unwrap_err();
        assert!(matches!(err, FlowError::Answer(_)));
        assert!(matches!(controller.state(), FlowState::AwaitingAnswer(_)));
    }

    #[tokio::test]
    async fn skip_all_needs_two_skips() {
        let (mut controller, _store) = controller_with(
            &["career"],
            vec![
                question(1, "career"),
                question(2, "career"),
                question(3, "career"),
            ],
        )
        .await;

        let err = controller.skip_all().await.unwrap_err();
        assert!(matches!(err, FlowError::ActionUnavailable));

        controller.skip().await.unwrap();
        controller.skip().await.unwrap();
        let snapshot = controller.skip_all().await.unwrap();
        assert!(snapshot.state.is_empty());
    }

    #[tokio::test]
    async fn not_understood_cap_is_enforced() {
        let (mut controller, _store) = controller_with(
            &["career"],
            vec![
                question(1, "career"),
                question(2, "career"),
                question(3, "career"),
            ],
        )
        .await;

        controller.mark_not_understood().await.unwrap();
        controller.mark_not_understood().await.unwrap();
        let err = controller.mark_not_understood().await.unwrap_err();
        assert!(matches!(err, FlowError::ActionUnavailable));
        assert_eq!(controller.day().not_understood_count(), 2);
    }

    #[tokio::test]
    async fn empty_focus_requests_without_filter() {
        let (controller, _store) = controller_with(&[], vec![question(1, "energy")]).await;

        match controller.state() {
            FlowState::AwaitingAnswer(q) => assert_eq!(q.id(), QuestionId::new(1)),
            other => panic!("unexpected state: {other:?}"),
        }
    }
}
