//! Session authority: the capability check consulted before guarded actions.
//!
//! Identity and session management live outside the editor. All the editor
//! needs is a yes/no answer per action.

use std::collections::HashSet;

use strum::{Display, EnumString};

/// Actions that require the session's permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum GuardedAction {
    /// Ask the generation collaborator to change or create content.
    SubmitEdit,
    /// Remove a block from the page.
    Remove,
}

/// Answers whether the current session may perform an action.
pub trait SessionAuthority: Send + Sync {
    fn authorize(&self, action: GuardedAction) -> bool;
}

/// Authority that allows everything. Used for local sessions and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl SessionAuthority for AllowAll {
    fn authorize(&self, _action: GuardedAction) -> bool {
        true
    }
}

/// A session token with an optional expiry and a set of granted actions.
#[derive(Debug, Clone)]
pub struct SessionGrant {
    token: String,
    /// Unix millis after which the grant is void.
    expires_at: Option<u64>,
    actions: HashSet<GuardedAction>,
}

impl SessionGrant {
    /// A grant for `token` with no actions yet.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            expires_at: None,
            actions: HashSet::new(),
        }
    }

    /// Add an allowed action.
    pub fn allowing(mut self, action: GuardedAction) -> Self {
        self.actions.insert(action);
        self
    }

    /// Set the expiry (Unix millis).
    pub fn with_expiry(mut self, expires_at: u64) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn is_expired_at(&self, now_millis: u64) -> bool {
        self.expires_at.is_some_and(|t| now_millis >= t)
    }
}

impl SessionAuthority for SessionGrant {
    fn authorize(&self, action: GuardedAction) -> bool {
        let allowed = !self.token.is_empty()
            && !self.is_expired_at(pagecraft_types::now_millis())
            && self.actions.contains(&action);
        if !allowed {
            tracing::debug!(%action, "session denied action");
        }
        allowed
    }
}
