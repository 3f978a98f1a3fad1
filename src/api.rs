//! Typed client for the remote catalog REST API.
//!
//! The `Api` trait is the seam between the state stores and the transport:
//! production code uses `HttpApi` (ureq), tests substitute a canned double.
//! Every error surfaces as an `ApiError` so callers can show the server's
//! message and field errors instead of a bare status line.

use crate::session::SessionStore;
use crate::types::{
    AuthResponse, Category, CategoryRequest, ChangePasswordRequest, CreateUserRequest,
    EditProfileRequest, LoginRequest, Post, PostPage, PostRequest, RegisterRequest, User, UserPage,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Cooperative cancellation handle threaded through every store operation.
///
/// A cancelled token stops an operation before it dispatches a request and
/// before it patches any in-memory state. The blocking transport itself is
/// not interrupted mid-flight; the guarantee is "no effect", not "no wait".
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// One field-level error from the server's validation layer.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    /// The server answered with a non-success status.
    #[error("server error {status}: {message}")]
    Server {
        status: u16,
        message: String,
        fields: Vec<FieldError>,
    },
    /// The request never produced a response.
    #[error("request failed: {0}")]
    Transport(String),
    /// The response arrived but did not match the expected shape.
    #[error("unexpected response: {0}")]
    Decode(String),
    /// The operation was abandoned through its `CancelToken`.
    #[error("operation cancelled")]
    Cancelled,
}

impl ApiError {
    /// HTTP status, when the server produced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn fields(&self) -> &[FieldError] {
        match self {
            Self::Server { fields, .. } => fields,
            _ => &[],
        }
    }
}

/// Remote operations of the catalog API, one method per endpoint.
pub trait Api {
    fn login(&self, req: &LoginRequest) -> Result<AuthResponse, ApiError>;
    fn register(&self, req: &RegisterRequest) -> Result<AuthResponse, ApiError>;
    fn edit_profile(&self, req: &EditProfileRequest) -> Result<User, ApiError>;
    /// Returns the server's confirmation message.
    fn edit_password(&self, req: &ChangePasswordRequest) -> Result<String, ApiError>;

    fn categories(&self) -> Result<Vec<Category>, ApiError>;
    fn category(&self, id: &str) -> Result<Category, ApiError>;
    fn create_category(&self, req: &CategoryRequest) -> Result<Category, ApiError>;
    fn update_category(&self, id: &str, req: &CategoryRequest) -> Result<Category, ApiError>;
    fn delete_category(&self, id: &str) -> Result<(), ApiError>;

    fn posts(&self, page: u64, limit: u64, sort: Option<&str>) -> Result<PostPage, ApiError>;
    fn post(&self, id: &str) -> Result<Post, ApiError>;
    fn create_post(&self, req: &PostRequest) -> Result<Post, ApiError>;
    fn update_post(&self, id: &str, req: &PostRequest) -> Result<Post, ApiError>;
    fn delete_post(&self, id: &str) -> Result<(), ApiError>;

    fn admin_users(&self, page: u64, limit: u64) -> Result<UserPage, ApiError>;
    fn admin_create_user(&self, req: &CreateUserRequest) -> Result<User, ApiError>;
    fn admin_delete_user(&self, id: &str) -> Result<(), ApiError>;
}

/// `{ "message": ..., "data": ... }`, the envelope around entity payloads.
/// The message half is dropped on decode.
#[derive(Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

/// `{ "message": ..., "user": ... }`, the envelope around user payloads.
#[derive(Deserialize)]
struct UserEnvelope {
    user: User,
}

#[derive(Deserialize)]
struct MessageEnvelope {
    #[serde(default)]
    message: String,
}

pub struct HttpApi {
    base_url: String,
    agent: ureq::Agent,
    session: SessionStore,
    debug: bool,
}

impl HttpApi {
    pub fn new(base_url: &str, session: SessionStore, debug: bool) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent: ureq::Agent::new(),
            session,
            debug,
        }
    }

    fn request(
        &self,
        method: &str,
        path: &str,
        query: &[(&str, &str)],
        body: Option<Value>,
    ) -> Result<Value, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        if self.debug {
            eprintln!("[DEBUG] {} {}", method, url);
        }

        let mut req = self.agent.request(method, &url);
        for (name, value) in query {
            req = req.query(name, value);
        }
        // The bearer header rides along whenever a session token exists,
        // valid or not. The server decides what it accepts.
        if let Some(token) = self.session.token() {
            req = req.set("Authorization", &format!("Bearer {}", token));
        }

        let resp = match body {
            Some(json) => req.send_json(json),
            None => req.call(),
        };

        match resp {
            Ok(r) => {
                let text = r
                    .into_string()
                    .map_err(|e| ApiError::Transport(e.to_string()))?;
                if text.trim().is_empty() {
                    return Ok(Value::Null);
                }
                serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))
            }
            Err(ureq::Error::Status(status, r)) => {
                let body = r.into_string().unwrap_or_default();
                Err(parse_server_error(status, &body))
            }
            Err(e) => Err(ApiError::Transport(e.to_string())),
        }
    }

    fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
        serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

fn to_body<T: serde::Serialize>(req: &T) -> Result<Value, ApiError> {
    serde_json::to_value(req).map_err(|e| ApiError::Decode(e.to_string()))
}

impl Api for HttpApi {
    fn login(&self, req: &LoginRequest) -> Result<AuthResponse, ApiError> {
        let value = self.request("POST", "/auth/login", &[], Some(to_body(req)?))?;
        Self::decode(value)
    }

    fn register(&self, req: &RegisterRequest) -> Result<AuthResponse, ApiError> {
        let value =
            self.request("POST", "/auth/register", &[], Some(to_body(req)?))?;
        Self::decode(value)
    }

    fn edit_profile(&self, req: &EditProfileRequest) -> Result<User, ApiError> {
        let value = self.request(
            "PUT",
            "/auth/edit-profile",
            &[],
            Some(to_body(req)?),
        )?;
        Self::decode::<UserEnvelope>(value).map(|env| env.user)
    }

    fn edit_password(&self, req: &ChangePasswordRequest) -> Result<String, ApiError> {
        let value = self.request(
            "PUT",
            "/auth/edit-password",
            &[],
            Some(to_body(req)?),
        )?;
        Self::decode::<MessageEnvelope>(value).map(|env| env.message)
    }

    fn categories(&self) -> Result<Vec<Category>, ApiError> {
        let value = self.request("GET", "/categories", &[], None)?;
        Self::decode::<DataEnvelope<Vec<Category>>>(value).map(|env| env.data)
    }

    fn category(&self, id: &str) -> Result<Category, ApiError> {
        let value = self.request("GET", &format!("/categories/{}", id), &[], None)?;
        Self::decode::<DataEnvelope<Category>>(value).map(|env| env.data)
    }

    fn create_category(&self, req: &CategoryRequest) -> Result<Category, ApiError> {
        let value =
            self.request("POST", "/categories", &[], Some(to_body(req)?))?;
        Self::decode::<DataEnvelope<Category>>(value).map(|env| env.data)
    }

    fn update_category(&self, id: &str, req: &CategoryRequest) -> Result<Category, ApiError> {
        let value = self.request(
            "PUT",
            &format!("/categories/{}", id),
            &[],
            Some(to_body(req)?),
        )?;
        Self::decode::<DataEnvelope<Category>>(value).map(|env| env.data)
    }

    fn delete_category(&self, id: &str) -> Result<(), ApiError> {
        self.request("DELETE", &format!("/categories/{}", id), &[], None)?;
        Ok(())
    }

    fn posts(&self, page: u64, limit: u64, sort: Option<&str>) -> Result<PostPage, ApiError> {
        let page = page.to_string();
        let limit = limit.to_string();
        let mut query = vec![("page", page.as_str()), ("limit", limit.as_str())];
        if let Some(sort) = sort {
            query.push(("sort", sort));
        }
        let value = self.request("GET", "/posts", &query, None)?;
        Self::decode::<DataEnvelope<PostPage>>(value).map(|env| env.data)
    }

    fn post(&self, id: &str) -> Result<Post, ApiError> {
        let value = self.request("GET", &format!("/posts/{}", id), &[], None)?;
        Self::decode::<DataEnvelope<Post>>(value).map(|env| env.data)
    }

    fn create_post(&self, req: &PostRequest) -> Result<Post, ApiError> {
        let value = self.request("POST", "/posts", &[], Some(to_body(req)?))?;
        Self::decode::<DataEnvelope<Post>>(value).map(|env| env.data)
    }

    fn update_post(&self, id: &str, req: &PostRequest) -> Result<Post, ApiError> {
        let value = self.request(
            "PUT",
            &format!("/posts/{}", id),
            &[],
            Some(to_body(req)?),
        )?;
        Self::decode::<DataEnvelope<Post>>(value).map(|env| env.data)
    }

    fn delete_post(&self, id: &str) -> Result<(), ApiError> {
        self.request("DELETE", &format!("/posts/{}", id), &[], None)?;
        Ok(())
    }

    fn admin_users(&self, page: u64, limit: u64) -> Result<UserPage, ApiError> {
        let page = page.to_string();
        let limit = limit.to_string();
        let query = [("page", page.as_str()), ("limit", limit.as_str())];
        let value = self.request("GET", "/admin/users", &query, None)?;
        Self::decode::<DataEnvelope<UserPage>>(value).map(|env| env.data)
    }

    fn admin_create_user(&self, req: &CreateUserRequest) -> Result<User, ApiError> {
        let value = self.request(
            "POST",
            "/admin/create-user",
            &[],
            Some(to_body(req)?),
        )?;
        Self::decode::<UserEnvelope>(value).map(|env| env.user)
    }

    fn admin_delete_user(&self, id: &str) -> Result<(), ApiError> {
        self.request("DELETE", &format!("/admin/delete-user/{}", id), &[], None)?;
        Ok(())
    }
}

/// Parse an error body into a structured `ApiError::Server`.
///
/// The server usually answers `{"message": ...}` and sometimes adds an
/// `errors` array of field errors. Anything unparsable falls back to the
/// raw body (truncated) so no detail is silently lost.
fn parse_server_error(status: u16, body: &str) -> ApiError {
    let parsed: Option<Value> = serde_json::from_str(body).ok();

    let message = parsed
        .as_ref()
        .and_then(|v| {
            v.get("message")
                .or_else(|| v.get("error"))
                .and_then(Value::as_str)
        })
        .map(str::to_string)
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                format!("HTTP {}", status)
            } else {
                let mut s = trimmed.to_string();
                s.truncate(200);
                s
            }
        });

    let fields = parsed
        .as_ref()
        .and_then(|v| v.get("errors"))
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    let field = item
                        .get("path")
                        .or_else(|| item.get("param"))
                        .or_else(|| item.get("field"))
                        .and_then(Value::as_str)?
                        .to_string();
                    let message = item
                        .get("msg")
                        .or_else(|| item.get("message"))
                        .and_then(Value::as_str)?
                        .to_string();
                    Some(FieldError { field, message })
                })
                .collect()
        })
        .unwrap_or_default();

    ApiError::Server {
        status,
        message,
        fields,
    }
}

/// Canned-response `Api` double for store tests. Each slot is consumed at
/// most once; an op without a canned response panics, except deletes which
/// default to success. Dispatched calls are recorded for assertions.
#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    pub struct MockApi {
        pub calls: RefCell<Vec<String>>,
        pub login_result: RefCell<Option<Result<AuthResponse, ApiError>>>,
        pub register_result: RefCell<Option<Result<AuthResponse, ApiError>>>,
        pub edit_profile_result: RefCell<Option<Result<User, ApiError>>>,
        pub edit_password_result: RefCell<Option<Result<String, ApiError>>>,
        pub categories_result: RefCell<Option<Result<Vec<Category>, ApiError>>>,
        pub category_result: RefCell<Option<Result<Category, ApiError>>>,
        pub create_category_result: RefCell<Option<Result<Category, ApiError>>>,
        pub update_category_result: RefCell<Option<Result<Category, ApiError>>>,
        pub delete_result: RefCell<Option<Result<(), ApiError>>>,
        pub posts_result: RefCell<Option<Result<PostPage, ApiError>>>,
        pub post_result: RefCell<Option<Result<Post, ApiError>>>,
        pub create_post_result: RefCell<Option<Result<Post, ApiError>>>,
        pub update_post_result: RefCell<Option<Result<Post, ApiError>>>,
        pub admin_users_result: RefCell<Option<Result<UserPage, ApiError>>>,
        pub admin_create_user_result: RefCell<Option<Result<User, ApiError>>>,
    }

    impl MockApi {
        fn record(&self, op: &str) {
            self.calls.borrow_mut().push(op.to_string());
        }

        fn take<T>(&self, op: &str, slot: &RefCell<Option<Result<T, ApiError>>>) -> Result<T, ApiError> {
            self.record(op);
            slot.borrow_mut()
                .take()
                .unwrap_or_else(|| panic!("no canned response for {}", op))
        }

        fn take_delete(&self, op: &str) -> Result<(), ApiError> {
            self.record(op);
            self.delete_result.borrow_mut().take().unwrap_or(Ok(()))
        }
    }

    impl Api for MockApi {
        fn login(&self, _req: &LoginRequest) -> Result<AuthResponse, ApiError> {
            self.take("login", &self.login_result)
        }

        fn register(&self, _req: &RegisterRequest) -> Result<AuthResponse, ApiError> {
            self.take("register", &self.register_result)
        }

        fn edit_profile(&self, _req: &EditProfileRequest) -> Result<User, ApiError> {
            self.take("edit_profile", &self.edit_profile_result)
        }

        fn edit_password(&self, _req: &ChangePasswordRequest) -> Result<String, ApiError> {
            self.take("edit_password", &self.edit_password_result)
        }

        fn categories(&self) -> Result<Vec<Category>, ApiError> {
            self.take("categories", &self.categories_result)
        }

        fn category(&self, _id: &str) -> Result<Category, ApiError> {
            self.take("category", &self.category_result)
        }

        fn create_category(&self, _req: &CategoryRequest) -> Result<Category, ApiError> {
            self.take("create_category", &self.create_category_result)
        }

        fn update_category(&self, _id: &str, _req: &CategoryRequest) -> Result<Category, ApiError> {
            self.take("update_category", &self.update_category_result)
        }

        fn delete_category(&self, _id: &str) -> Result<(), ApiError> {
            self.take_delete("delete_category")
        }

        fn posts(&self, _page: u64, _limit: u64, _sort: Option<&str>) -> Result<PostPage, ApiError> {
            self.take("posts", &self.posts_result)
        }

        fn post(&self, _id: &str) -> Result<Post, ApiError> {
            self.take("post", &self.post_result)
        }

        fn create_post(&self, _req: &PostRequest) -> Result<Post, ApiError> {
            self.take("create_post", &self.create_post_result)
        }

        fn update_post(&self, _id: &str, _req: &PostRequest) -> Result<Post, ApiError> {
            self.take("update_post", &self.update_post_result)
        }

        fn delete_post(&self, _id: &str) -> Result<(), ApiError> {
            self.take_delete("delete_post")
        }

        fn admin_users(&self, _page: u64, _limit: u64) -> Result<UserPage, ApiError> {
            self.take("admin_users", &self.admin_users_result)
        }

        fn admin_create_user(&self, _req: &CreateUserRequest) -> Result<User, ApiError> {
            self.take("admin_create_user", &self.admin_create_user_result)
        }

        fn admin_delete_user(&self, _id: &str) -> Result<(), ApiError> {
            self.take_delete("admin_delete_user")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_token() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());

        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_parse_server_error_message() {
        let err = parse_server_error(401, r#"{"message":"Invalid credentials"}"#);
        match err {
            ApiError::Server {
                status,
                message,
                fields,
            } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Invalid credentials");
                assert!(fields.is_empty());
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_parse_server_error_field_errors() {
        let body = r#"{
            "message": "Validation failed",
            "errors": [
                {"path": "email", "msg": "must be an email"},
                {"param": "password", "msg": "too short"}
            ]
        }"#;
        let err = parse_server_error(422, body);
        assert_eq!(err.status(), Some(422));
        let fields = err.fields();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].field, "email");
        assert_eq!(fields[1].message, "too short");
    }

    #[test]
    fn test_parse_server_error_non_json_body() {
        let err = parse_server_error(502, "Bad Gateway");
        match err {
            ApiError::Server { message, .. } => assert_eq!(message, "Bad Gateway"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_parse_server_error_empty_body() {
        let err = parse_server_error(500, "");
        match err {
            ApiError::Server { message, .. } => assert_eq!(message, "HTTP 500"),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
