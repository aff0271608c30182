use chrono::NaiveDate;
use thiserror::Error;

/// Number of skip or not-understood actions that advances the active sphere
/// (and, for skips, unlocks "skip all questions today").
pub const SPHERE_ADVANCE_THRESHOLD: u32 = 2;

/// Maximum "didn't understand" actions per day.
pub const NOT_UNDERSTOOD_LIMIT: u32 = 2;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DayStateError {
    #[error("not-understood limit reached for today")]
    NotUnderstoodLimit,

    #[error("invalid active sphere index: {0}")]
    InvalidSphereIndex(usize),
}

/// Per-calendar-day counter state for the question flow.
///
/// Tracks how often the user skipped or flagged a question today and which
/// focus sphere is currently active. All counters reset at the day boundary
/// and after a successful answer submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayState {
    date: NaiveDate,
    skip_count: u32,
    not_understood_count: u32,
    active_sphere_index: usize,
}

impl DayState {
    /// A zeroed state for the given day.
    #[must_use]
    pub fn fresh(date: NaiveDate) -> Self {
        Self {
            date,
            skip_count: 0,
            not_understood_count: 0,
            active_sphere_index: 0,
        }
    }

    /// Rehydrate a state from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `DayStateError::InvalidSphereIndex` if the index is not 0 or 1.
    pub fn from_persisted(
        date: NaiveDate,
        skip_count: u32,
        not_understood_count: u32,
        active_sphere_index: usize,
    ) -> Result<Self, DayStateError> {
        if active_sphere_index > 1 {
            return Err(DayStateError::InvalidSphereIndex(active_sphere_index));
        }
        Ok(Self {
            date,
            skip_count,
            not_understood_count,
            active_sphere_index,
        })
    }

    /// Returns this state if it belongs to `today`, otherwise a fresh one.
    ///
    /// Counters never survive into the next calendar day.
    #[must_use]
    pub fn rolled_to(self, today: NaiveDate) -> Self {
        if self.date == today {
            self
        } else {
            Self::fresh(today)
        }
    }

    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    #[must_use]
    pub fn skip_count(&self) -> u32 {
        self.skip_count
    }

    #[must_use]
    pub fn not_understood_count(&self) -> u32 {
        self.not_understood_count
    }

    #[must_use]
    pub fn active_sphere_index(&self) -> usize {
        self.active_sphere_index
    }

    /// Whether the plain "skip" action is still offered.
    ///
    /// With two focus spheres skipping stays available (it drives sphere
    /// advancement); with one or none it disappears once the threshold is
    /// reached and only "skip all" remains.
    #[must_use]
    pub fn can_skip(&self, focus_len: usize) -> bool {
        focus_len >= 2 || self.skip_count < SPHERE_ADVANCE_THRESHOLD
    }

    /// Whether "skip all questions today" is unlocked.
    #[must_use]
    pub fn can_skip_all(&self) -> bool {
        self.skip_count >= SPHERE_ADVANCE_THRESHOLD
    }

    /// Whether "didn't understand" is still offered.
    #[must_use]
    pub fn can_mark_not_understood(&self) -> bool {
        self.not_understood_count < NOT_UNDERSTOOD_LIMIT
    }

    /// Count a skip. Returns true when the active sphere advanced.
    pub fn record_skip(&mut self, focus_is_pair: bool) -> bool {
        self.skip_count += 1;
        self.maybe_advance(self.skip_count, focus_is_pair)
    }

    /// Count a "didn't understand". Returns true when the active sphere
    /// advanced.
    ///
    /// # Errors
    ///
    /// Returns `DayStateError::NotUnderstoodLimit` once the daily cap is
    /// reached; the counter is not incremented past it.
    pub fn record_not_understood(&mut self, focus_is_pair: bool) -> Result<bool, DayStateError> {
        if self.not_understood_count >= NOT_UNDERSTOOD_LIMIT {
            return Err(DayStateError::NotUnderstoodLimit);
        }
        self.not_understood_count += 1;
        Ok(self.maybe_advance(self.not_understood_count, focus_is_pair))
    }

    /// Full reset after a successful answer: counters to zero, back to the
    /// primary sphere. The date is kept.
    pub fn reset_after_answer(&mut self) {
        self.skip_count = 0;
        self.not_understood_count = 0;
        self.active_sphere_index = 0;
    }

    // Advancement is one-directional per day: 0 -> 1, never back except via
    // reset_after_answer.
    fn maybe_advance(&mut self, counter: u32, focus_is_pair: bool) -> bool {
        if focus_is_pair && counter >= SPHERE_ADVANCE_THRESHOLD && self.active_sphere_index == 0 {
            self.active_sphere_index = 1;
            true
        } else {
            false
        }
    }
}
