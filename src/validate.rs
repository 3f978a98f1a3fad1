//! Client-side form validation, run before any network call.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern"));

pub const MIN_PASSWORD_LEN: usize = 6;

/// A rejected form field with the reason.
#[derive(Debug, Clone, PartialEq)]
pub struct FormError {
    pub field: &'static str,
    pub message: String,
}

impl FormError {
    fn new(field: &'static str, message: &str) -> Self {
        Self {
            field,
            message: message.to_string(),
        }
    }
}

impl fmt::Display for FormError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

fn require(errors: &mut Vec<FormError>, field: &'static str, value: &str) {
    if value.trim().is_empty() {
        errors.push(FormError::new(field, "is required"));
    }
}

fn check_email(errors: &mut Vec<FormError>, value: &str) {
    if !value.trim().is_empty() && !is_valid_email(value) {
        errors.push(FormError::new("email", "is not a valid email address"));
    }
}

fn check_password(errors: &mut Vec<FormError>, field: &'static str, value: &str, confirm: &str) {
    if !value.is_empty() && value.len() < MIN_PASSWORD_LEN {
        errors.push(FormError::new(
            field,
            &format!("must be at least {} characters", MIN_PASSWORD_LEN),
        ));
    }
    if value != confirm {
        errors.push(FormError::new("confirm", "passwords do not match"));
    }
}

fn done(errors: Vec<FormError>) -> Result<(), Vec<FormError>> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

pub fn login(email: &str, password: &str) -> Result<(), Vec<FormError>> {
    let mut errors = Vec::new();
    require(&mut errors, "email", email);
    require(&mut errors, "password", password);
    check_email(&mut errors, email);
    done(errors)
}

pub fn registration(
    name: &str,
    email: &str,
    password: &str,
    confirm: &str,
) -> Result<(), Vec<FormError>> {
    let mut errors = Vec::new();
    require(&mut errors, "name", name);
    require(&mut errors, "email", email);
    require(&mut errors, "password", password);
    check_email(&mut errors, email);
    check_password(&mut errors, "password", password, confirm);
    done(errors)
}

/// At least one field must be present, and a present field must be usable.
pub fn profile_edit(name: &Option<String>, email: &Option<String>) -> Result<(), Vec<FormError>> {
    let mut errors = Vec::new();
    if name.is_none() && email.is_none() {
        errors.push(FormError::new("profile", "nothing to update"));
    }
    if let Some(name) = name {
        require(&mut errors, "name", name);
    }
    if let Some(email) = email {
        require(&mut errors, "email", email);
        check_email(&mut errors, email);
    }
    done(errors)
}

pub fn password_change(current: &str, new: &str, confirm: &str) -> Result<(), Vec<FormError>> {
    let mut errors = Vec::new();
    require(&mut errors, "current", current);
    require(&mut errors, "password", new);
    check_password(&mut errors, "password", new, confirm);
    done(errors)
}

pub fn category_form(name: &str) -> Result<(), Vec<FormError>> {
    let mut errors = Vec::new();
    require(&mut errors, "name", name);
    done(errors)
}

pub fn post_form(
    title: &str,
    description: &str,
    price: f64,
    category: &str,
) -> Result<(), Vec<FormError>> {
    let mut errors = Vec::new();
    require(&mut errors, "title", title);
    require(&mut errors, "description", description);
    require(&mut errors, "category", category);
    if !price.is_finite() || price < 0.0 {
        errors.push(FormError::new("price", "must be a non-negative number"));
    }
    done(errors)
}

pub fn user_form(name: &str, email: &str, password: &str) -> Result<(), Vec<FormError>> {
    registration(name, email, password, password)
}
