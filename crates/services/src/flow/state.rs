use reflect_core::model::{DayState, Question};

//
// ─── FLOW STATE ───────────────────────────────────────────────────────────────
//

/// The daily question flow as a tagged union: exactly one of these holds at
/// any time, and illegal combinations (e.g. submitting with no question) are
/// unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowState {
    /// A question request is in flight.
    Loading,
    /// A question is on screen waiting for the user.
    AwaitingAnswer(Question),
    /// An answer submission is in flight.
    Submitting(Question),
    /// No more questions today; the summary flow takes over from here.
    Empty,
    /// A remote operation failed. `question` is preserved on submission
    /// failures so the retry loses nothing.
    Error {
        message: String,
        question: Option<Question>,
    },
}

impl FlowState {
    /// The question currently associated with the flow, if any.
    #[must_use]
    pub fn question(&self) -> Option<&Question> {
        match self {
            FlowState::AwaitingAnswer(q) | FlowState::Submitting(q) => Some(q),
            FlowState::Error { question, .. } => question.as_ref(),
            FlowState::Loading | FlowState::Empty => None,
        }
    }

    /// True while a remote call is in flight and UI events must wait.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        matches!(self, FlowState::Loading | FlowState::Submitting(_))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, FlowState::Empty)
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, FlowState::Error { .. })
    }
}

//
// ─── ACTION SET ───────────────────────────────────────────────────────────────
//

/// Which user actions the presentation layer should offer right now.
///
/// Recomputed after every transition from the flow state and the day's
/// counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActionSet {
    pub submit: bool,
    pub skip: bool,
    pub skip_all: bool,
    pub not_understood: bool,
}

impl ActionSet {
    #[must_use]
    pub fn available(state: &FlowState, day: &DayState, focus_len: usize) -> Self {
        match state {
            FlowState::AwaitingAnswer(_) => Self {
                submit: true,
                skip: day.can_skip(focus_len),
                skip_all: day.can_skip_all(),
                not_understood: day.can_mark_not_understood(),
            },
            // In submit-failure errors the preserved question makes the
            // submit action a retry; skip-all stays reachable as the escape
            // hatch.
            FlowState::Error { question, .. } => Self {
                submit: question.is_some(),
                skip: false,
                skip_all: day.can_skip_all(),
                not_understood: false,
            },
            FlowState::Loading | FlowState::Submitting(_) | FlowState::Empty => Self::default(),
        }
    }
}
