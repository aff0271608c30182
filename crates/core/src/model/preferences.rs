use crate::model::ids::UserId;

/// Locally-persisted UI preferences.
///
/// The dark-mode flag is mirrored to the backend on change; the guest user id
/// identifies an unauthenticated session across reloads.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Preferences {
    pub dark_mode: bool,
    pub guest_user_id: Option<UserId>,
}

impl Preferences {
    #[must_use]
    pub fn with_dark_mode(mut self, dark_mode: bool) -> Self {
        self.dark_mode = dark_mode;
        self
    }

    #[must_use]
    pub fn with_guest_user_id(mut self, id: UserId) -> Self {
        self.guest_user_id = Some(id);
        self
    }
}
