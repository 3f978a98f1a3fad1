use crate::api::ApiError;
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Append-only JSONL activity journal, one file per session.
///
/// Journaling is best-effort: callers drop write failures with `let _ =`
/// so a full disk never breaks an operation.
pub struct Journal {
    pub path: PathBuf,
    session_id: String,
    file: File,
}

#[derive(Serialize)]
struct Event<'a> {
    ts: DateTime<Utc>,
    session_id: &'a str,
    #[serde(rename = "type")]
    event_type: &'a str,
    #[serde(flatten)]
    data: serde_json::Value,
}

impl Journal {
    pub fn new(path: &Path, session_id: &str) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            session_id: session_id.to_string(),
            file,
        })
    }

    pub fn log(&mut self, event_type: &str, data: serde_json::Value) -> Result<()> {
        let event = Event {
            ts: Utc::now(),
            session_id: &self.session_id,
            event_type,
            data,
        };
        let line = serde_json::to_string(&event)?;
        writeln!(self.file, "{}", line)?;
        self.file.flush()?;
        Ok(())
    }

    pub fn session_start(&mut self, base_url: &str) -> Result<()> {
        self.log("session_start", serde_json::json!({ "base_url": base_url }))
    }

    pub fn login(&mut self, email: &str) -> Result<()> {
        self.log("login", serde_json::json!({ "email": email }))
    }

    pub fn register(&mut self, email: &str) -> Result<()> {
        self.log("register", serde_json::json!({ "email": email }))
    }

    pub fn logout(&mut self) -> Result<()> {
        self.log("logout", serde_json::json!({}))
    }

    pub fn profile_update(&mut self, email: &str) -> Result<()> {
        self.log("profile_update", serde_json::json!({ "email": email }))
    }

    pub fn password_change(&mut self) -> Result<()> {
        self.log("password_change", serde_json::json!({}))
    }

    /// Log a remote failure before it is rethrown to the caller.
    pub fn api_error(&mut self, operation: &str, error: &ApiError) -> Result<()> {
        self.log(
            "api_error",
            serde_json::json!({
                "operation": operation,
                "status": error.status(),
                "message": error.to_string(),
            }),
        )
    }

    pub fn upload(&mut self, url: &str) -> Result<()> {
        self.log("upload", serde_json::json!({ "url": url }))
    }

    /// Log a route resolution: rendered, redirected, or still loading.
    pub fn view(&mut self, route: &str, outcome: &str) -> Result<()> {
        self.log(
            "view",
            serde_json::json!({ "route": route, "outcome": outcome }),
        )
    }
}
