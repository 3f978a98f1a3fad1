//! Application routes and the gates that protect them.
//!
//! A gate is a pure function of the auth store's already-resolved state: it
//! never fetches, it only decides whether a view renders, redirects, or is
//! still waiting on session resolution. The CLI resolves every command
//! through its route's gate before executing.

use crate::auth::{AuthPhase, AuthStore};
use crate::types::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Home,
    Login,
    Register,
    Dashboard,
    CreatePost,
    EditPost,
    Categories,
    CategoryPosts,
    Post,
    Settings,
    Forbidden,
    NotFound,
}

impl Route {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Login => "login",
            Self::Register => "register",
            Self::Dashboard => "dashboard",
            Self::CreatePost => "create-post",
            Self::EditPost => "edit-post",
            Self::Categories => "categories",
            Self::CategoryPosts => "category-posts",
            Self::Post => "post",
            Self::Settings => "settings",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not-found",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "home" => Some(Self::Home),
            "login" => Some(Self::Login),
            "register" => Some(Self::Register),
            "dashboard" => Some(Self::Dashboard),
            "create-post" => Some(Self::CreatePost),
            "edit-post" => Some(Self::EditPost),
            "categories" => Some(Self::Categories),
            "category-posts" => Some(Self::CategoryPosts),
            "post" => Some(Self::Post),
            "settings" => Some(Self::Settings),
            "forbidden" => Some(Self::Forbidden),
            "not-found" => Some(Self::NotFound),
            _ => None,
        }
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of resolving a route against the current auth state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Session state not yet resolved; show a placeholder.
    Loading,
    Render,
    Redirect(Route),
}

/// Roles allowed into the administrative views.
pub const ADMIN_ROLES: [Role; 2] = [Role::Admin, Role::Superadmin];

/// Gate for guest-only routes (login, register): an authenticated user is
/// sent to a role-dependent landing instead of seeing the view.
pub fn guest_gate(phase: AuthPhase, role: Option<Role>) -> Resolution {
    match phase {
        AuthPhase::Initializing => Resolution::Loading,
        AuthPhase::Anonymous => Resolution::Render,
        AuthPhase::Authenticated => {
            if role.is_some_and(|r| r.is_admin()) {
                Resolution::Redirect(Route::Dashboard)
            } else {
                Resolution::Redirect(Route::Home)
            }
        }
    }
}

/// Gate for protected routes, optionally restricted to a role set.
pub fn protected_gate(phase: AuthPhase, role: Option<Role>, allowed: Option<&[Role]>) -> Resolution {
    match phase {
        AuthPhase::Initializing => Resolution::Loading,
        AuthPhase::Anonymous => Resolution::Redirect(Route::Login),
        AuthPhase::Authenticated => match (allowed, role) {
            (Some(allowed), Some(role)) if !allowed.contains(&role) => {
                Resolution::Redirect(Route::Forbidden)
            }
            _ => Resolution::Render,
        },
    }
}

/// Resolve a route through its gate. Public routes always render.
pub fn resolve(route: Route, auth: &AuthStore) -> Resolution {
    let phase = auth.phase();
    let role = auth.role();
    match route {
        Route::Login | Route::Register => guest_gate(phase, role),
        Route::Dashboard | Route::CreatePost | Route::EditPost => {
            protected_gate(phase, role, Some(&ADMIN_ROLES))
        }
        Route::Settings => protected_gate(phase, role, None),
        Route::Home
        | Route::Categories
        | Route::CategoryPosts
        | Route::Post
        | Route::Forbidden
        | Route::NotFound => Resolution::Render,
    }
}
