//! Auth state store: session lifecycle and the authentication predicate.
//!
//! The store moves through {Initializing, Anonymous, Authenticated}.
//! Initializing resolves exactly once, from the persisted session, via
//! `bootstrap`. After that the phase is derived on demand so an expired
//! token flips the store to Anonymous without requiring a restart.

use crate::api::{Api, ApiError};
use crate::journal::Journal;
use crate::session::SessionStore;
use crate::types::{
    ChangePasswordRequest, EditProfileRequest, LoginRequest, RegisterRequest, Role, User,
};
use anyhow::Result;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPhase {
    Initializing,
    Anonymous,
    Authenticated,
}

pub struct AuthStore {
    api: Rc<dyn Api>,
    session: SessionStore,
    journal: Rc<RefCell<Journal>>,
    bootstrapped: bool,
    user: Option<User>,
}

impl AuthStore {
    pub fn new(api: Rc<dyn Api>, session: SessionStore, journal: Rc<RefCell<Journal>>) -> Self {
        Self {
            api,
            session,
            journal,
            bootstrapped: false,
            user: None,
        }
    }

    /// One-time Initializing resolution from the persisted session.
    pub fn bootstrap(&mut self) {
        if self.bootstrapped {
            return;
        }
        self.user = self.session.current_user();
        self.bootstrapped = true;
    }

    pub fn phase(&self) -> AuthPhase {
        if !self.bootstrapped {
            AuthPhase::Initializing
        } else if self.is_authenticated() {
            AuthPhase::Authenticated
        } else {
            AuthPhase::Anonymous
        }
    }

    /// True iff a user snapshot is in memory AND the persisted token is
    /// present and unexpired. Re-checked on every call, never cached, so
    /// expiry is detected without a restart. Token presence alone is not
    /// sufficient.
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some() && self.session.is_token_valid()
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn role(&self) -> Option<Role> {
        self.user.as_ref().map(|u| u.role)
    }

    pub fn login(&mut self, req: &LoginRequest) -> Result<User> {
        let resp = self
            .api
            .login(req)
            .map_err(|e| self.journal_error("auth.login", e))?;
        self.session.save(&resp.user, &resp.token)?;
        self.user = Some(resp.user.clone());
        self.bootstrapped = true;
        let _ = self.journal.borrow_mut().login(&resp.user.email);
        Ok(resp.user)
    }

    pub fn register(&mut self, req: &RegisterRequest) -> Result<User> {
        let resp = self
            .api
            .register(req)
            .map_err(|e| self.journal_error("auth.register", e))?;
        self.session.save(&resp.user, &resp.token)?;
        self.user = Some(resp.user.clone());
        self.bootstrapped = true;
        let _ = self.journal.borrow_mut().register(&resp.user.email);
        Ok(resp.user)
    }

    /// Clear the persisted session and the in-memory user. Cannot fail.
    pub fn logout(&mut self) {
        self.session.clear();
        self.user = None;
        self.bootstrapped = true;
        let _ = self.journal.borrow_mut().logout();
    }

    /// Send a partial update; keep exactly the server-returned record, not
    /// a local merge, so the snapshot cannot drift from the server.
    pub fn edit_profile(&mut self, req: &EditProfileRequest) -> Result<User> {
        let user = self
            .api
            .edit_profile(req)
            .map_err(|e| self.journal_error("auth.edit_profile", e))?;
        self.user = Some(user.clone());
        let _ = self.journal.borrow_mut().profile_update(&user.email);
        Ok(user)
    }

    /// Change the password. Does not touch the in-memory user. Returns the
    /// server's confirmation message.
    pub fn edit_password(&mut self, req: &ChangePasswordRequest) -> Result<String> {
        let message = self
            .api
            .edit_password(req)
            .map_err(|e| self.journal_error("auth.edit_password", e))?;
        let _ = self.journal.borrow_mut().password_change();
        Ok(message)
    }

    fn journal_error(&self, operation: &str, error: ApiError) -> ApiError {
        let _ = self.journal.borrow_mut().api_error(operation, &error);
        error
    }
}
