//! Shared page header.
//!
//! Every full page renders the store title, the cart button, the signed-in
//! user's picture and first name linking to their profile, and logout. The
//! user is resolved once per page through the status-checking wrapper, so a
//! failed lookup lands in the page's error modal like any other failure.

use online_store_core::UserId;

use crate::api::{ApiSession, User};
use crate::error::set_sentry_user;

/// Header display data.
#[derive(Debug, Clone, Default)]
pub struct NavigationView {
    /// The signed-in user, if the backend recognized the request.
    pub user: Option<User>,
}

impl NavigationView {
    /// Look up the signed-in user for the header.
    pub async fn resolve(api: &ApiSession) -> Self {
        let user = api.current_user().await.ok();
        if let Some(user) = &user {
            set_sentry_user(&user.id, Some(user.email.as_str()).filter(|e| !e.is_empty()));
        }
        Self { user }
    }

    /// ID of the signed-in user.
    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        self.user.as_ref().map(|user| user.id)
    }

    /// Whether the signed-in user is `owner`.
    #[must_use]
    pub fn is(&self, owner: UserId) -> bool {
        self.user_id() == Some(owner)
    }

    /// Profile link of the signed-in user.
    #[must_use]
    pub fn profile_href(&self) -> Option<String> {
        self.user_id().map(|id| format!("/store/users/{id}"))
    }
}
