use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::Duration;
use reflect_core::model::{
    AnswerDraft, FocusSpheres, Question, QuestionId, QuestionKind, SphereCatalog, SphereKey,
};
use reflect_core::time::{fixed_clock, fixed_now, fixed_today};
use services::provider::QuestionSource;
use services::{ApiError, Clock, DailyFlowController, FlowState, StaticQuestionBank};
use storage::repository::{
    DayStateRecord, DayStateRepository, InMemoryStore, StorageError,
};

fn catalog() -> SphereCatalog {
    SphereCatalog::default_catalog()
}

fn focus(keys: &[&str]) -> FocusSpheres {
    FocusSpheres::new(keys.iter().map(|k| catalog().key(k).unwrap()).collect()).unwrap()
}

fn question(id: i64, sphere: &str) -> Question {
    Question::new(
        QuestionId::new(id),
        catalog().key(sphere).unwrap(),
        format!("Question {id}"),
        QuestionKind::Text,
    )
    .unwrap()
}

/// Question source with switchable failures for exercising error paths.
struct FlakySource {
    inner: StaticQuestionBank,
    fail_focus: AtomicBool,
    fail_submit: AtomicBool,
    served_filters: std::sync::Mutex<Vec<Option<SphereKey>>>,
}

impl FlakySource {
    fn new(focus: FocusSpheres, questions: Vec<Question>) -> Self {
        Self {
            inner: StaticQuestionBank::new(focus, questions),
            fail_focus: AtomicBool::new(false),
            fail_submit: AtomicBool::new(false),
            served_filters: std::sync::Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl QuestionSource for FlakySource {
    async fn focus_spheres(&self) -> Result<FocusSpheres, ApiError> {
        if self.fail_focus.swap(false, Ordering::SeqCst) {
            return Err(ApiError::Network("connection refused".into()));
        }
        self.inner.focus_spheres().await
    }

    async fn next_question(&self, sphere: Option<&SphereKey>) -> Result<Question, ApiError> {
        self.served_filters
            .lock()
            .unwrap()
            .push(sphere.cloned());
        self.inner.next_question(sphere).await
    }

    async fn submit_answer(&self, answer: &AnswerDraft) -> Result<(), ApiError> {
        if self.fail_submit.load(Ordering::SeqCst) {
            return Err(ApiError::Server {
                status: 500,
                message: "database unavailable".into(),
            });
        }
        self.inner.submit_answer(answer).await
    }
}

/// Day-state store whose writes always fail.
#[derive(Default)]
struct BrokenStore {
    writes: AtomicU32,
}

#[async_trait]
impl DayStateRepository for BrokenStore {
    async fn get_day_state(
        &self,
        _date: chrono::NaiveDate,
    ) -> Result<Option<DayStateRecord>, StorageError> {
        Ok(None)
    }

    async fn put_day_state(&self, _record: &DayStateRecord) -> Result<(), StorageError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        Err(StorageError::Connection("disk full".into()))
    }

    async fn prune_before(&self, _date: chrono::NaiveDate) -> Result<u64, StorageError> {
        Ok(0)
    }
}

#[tokio::test]
async fn scenario_single_sphere_skip_allowance() {
    let store = Arc::new(InMemoryStore::new());
    let bank = Arc::new(StaticQuestionBank::new(
        focus(&["career"]),
        (1..=5).map(|id| question(id, "career")).collect(),
    ));
    let mut controller = DailyFlowController::start(fixed_clock(), bank, store).await;

    let snapshot = controller.skip().await.unwrap();
    assert!(snapshot.actions.skip);
    assert!(!snapshot.actions.skip_all);

    let snapshot = controller.skip().await.unwrap();
    assert!(!snapshot.actions.skip, "skip hides after 2 skips");
    assert!(snapshot.actions.skip_all, "skip-all unlocks at 2 skips");

    let err = controller.skip().await.unwrap_err();
    assert!(matches!(err, services::FlowError::ActionUnavailable));

    let snapshot = controller.skip_all().await.unwrap();
    assert!(snapshot.state.is_empty());
}

#[tokio::test]
async fn scenario_pair_advances_to_second_sphere() {
    let store = Arc::new(InMemoryStore::new());
    let source = Arc::new(FlakySource::new(
        focus(&["career", "money"]),
        vec![
            question(1, "career"),
            question(2, "career"),
            question(3, "money"),
        ],
    ));
    let mut controller = DailyFlowController::start(fixed_clock(), source.clone(), store).await;

    controller.skip().await.unwrap();
    let snapshot = controller.skip().await.unwrap();
    assert_eq!(snapshot.active_sphere_index, 1);

    let filters = source.served_filters.lock().unwrap().clone();
    let last = filters.last().unwrap().clone().unwrap();
    assert_eq!(last.as_str(), "money");
}

#[tokio::test]
async fn scenario_submit_resets_counters_persisted() {
    let store = Arc::new(InMemoryStore::new());
    let bank = Arc::new(StaticQuestionBank::new(
        focus(&["career", "money"]),
        vec![
            question(40, "career"),
            question(41, "career"),
            question(43, "career"),
            question(42, "money"),
            question(44, "career"),
        ],
    ));
    let mut controller =
        DailyFlowController::start(fixed_clock(), bank.clone(), store.clone()).await;

    controller.mark_not_understood().await.unwrap();
    controller.skip().await.unwrap();
    controller.skip().await.unwrap();
    assert_eq!(controller.day().skip_count(), 2);
    assert_eq!(controller.day().not_understood_count(), 1);
    assert_eq!(controller.day().active_sphere_index(), 1);

    let snapshot = controller.submit("done").await.unwrap();
    assert_eq!(snapshot.skip_count, 0);
    assert_eq!(snapshot.not_understood_count, 0);
    assert_eq!(snapshot.active_sphere_index, 0);

    let submitted = bank.submitted();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].question_id(), QuestionId::new(42));
    assert_eq!(submitted[0].text(), "done");

    let persisted = store
        .get_day_state(fixed_today())
        .await
        .unwrap()
        .expect("reset persisted");
    assert_eq!(persisted.skip_count, 0);
    assert_eq!(persisted.not_understood_count, 0);
    assert_eq!(persisted.active_sphere_index, 0);
}

#[tokio::test]
async fn scenario_no_question_left_goes_empty() {
    let store = Arc::new(InMemoryStore::new());
    let bank = Arc::new(StaticQuestionBank::new(focus(&["career"]), vec![]));
    let controller = DailyFlowController::start(fixed_clock(), bank, store).await;

    assert!(controller.state().is_empty());
    assert!(!controller.state().is_error(), "not-found is not an error");
    let actions = controller.snapshot().actions;
    assert!(!actions.submit && !actions.skip && !actions.skip_all && !actions.not_understood);
}

#[tokio::test]
async fn reload_reproduces_counters_after_restart() {
    let store = Arc::new(InMemoryStore::new());
    let questions: Vec<_> = (1..=6).map(|id| question(id, "career")).collect();

    let bank = Arc::new(StaticQuestionBank::new(
        focus(&["career", "money"]),
        questions.clone(),
    ));
    let mut controller =
        DailyFlowController::start(fixed_clock(), bank, store.clone()).await;
    controller.skip().await.unwrap();
    controller.mark_not_understood().await.unwrap();

    // Fresh controller over the same store stands in for a page reload.
    let bank = Arc::new(StaticQuestionBank::new(
        focus(&["career", "money"]),
        questions,
    ));
    let restarted = DailyFlowController::start(fixed_clock(), bank, store).await;

    assert_eq!(restarted.day().skip_count(), 1);
    assert_eq!(restarted.day().not_understood_count(), 1);
    assert_eq!(restarted.day().active_sphere_index(), 0);
}

#[tokio::test]
async fn stale_day_state_resets_at_boundary() {
    let store = Arc::new(InMemoryStore::new());

    let bank = Arc::new(StaticQuestionBank::new(
        focus(&["career"]),
        vec![question(1, "career"), question(2, "career")],
    ));
    let mut controller =
        DailyFlowController::start(fixed_clock(), bank, store.clone()).await;
    controller.skip().await.unwrap();

    let tomorrow = Clock::fixed(fixed_now() + Duration::days(1));
    let bank = Arc::new(StaticQuestionBank::new(
        focus(&["career"]),
        vec![question(3, "career")],
    ));
    let next_day = DailyFlowController::start(tomorrow, bank, store).await;

    assert_eq!(next_day.day().skip_count(), 0);
    assert_eq!(next_day.day().date(), fixed_today() + Duration::days(1));
}

#[tokio::test]
async fn failed_submission_keeps_question_and_counters() {
    let store = Arc::new(InMemoryStore::new());
    let source = Arc::new(FlakySource::new(
        focus(&["career"]),
        vec![question(1, "career"), question(2, "career"), question(3, "career")],
    ));
    let mut controller =
        DailyFlowController::start(fixed_clock(), source.clone(), store).await;

    controller.skip().await.unwrap();
    source.fail_submit.store(true, Ordering::SeqCst);

    let snapshot = controller.submit("my answer").await.unwrap();
    match &snapshot.state {
        FlowState::Error { question, message } => {
            assert_eq!(question.as_ref().unwrap().id(), QuestionId::new(2));
            assert!(message.contains("database unavailable"));
        }
        other => panic!("unexpected state: {other:?}"),
    }
    assert_eq!(snapshot.skip_count, 1, "counters survive a failed submit");
    assert!(snapshot.actions.submit, "retry stays available");

    source.fail_submit.store(false, Ordering::SeqCst);
    let snapshot = controller.submit("my answer").await.unwrap();
    assert!(matches!(snapshot.state, FlowState::AwaitingAnswer(_)));
    assert_eq!(snapshot.skip_count, 0);
}

#[tokio::test]
async fn focus_load_failure_is_retryable() {
    let store = Arc::new(InMemoryStore::new());
    let source = Arc::new(FlakySource::new(
        focus(&["career"]),
        vec![question(1, "career")],
    ));
    source.fail_focus.store(true, Ordering::SeqCst);

    let mut controller =
        DailyFlowController::start(fixed_clock(), source, store).await;
    assert!(controller.state().is_error());

    let snapshot = controller.reload().await.unwrap();
    assert!(matches!(snapshot.state, FlowState::AwaitingAnswer(_)));
}

#[tokio::test]
async fn broken_store_degrades_to_memory_only() {
    let store = Arc::new(BrokenStore::default());
    let bank = Arc::new(StaticQuestionBank::new(
        focus(&["career"]),
        (1..=4).map(|id| question(id, "career")).collect(),
    ));
    let mut controller =
        DailyFlowController::start(fixed_clock(), bank, store.clone()).await;

    controller.skip().await.unwrap();
    assert!(!controller.is_durable());
    assert_eq!(controller.day().skip_count(), 1);

    // Later transitions keep working and stop touching the store.
    controller.skip().await.unwrap();
    assert_eq!(controller.day().skip_count(), 2);
    assert_eq!(store.writes.load(Ordering::SeqCst), 1);
}
