// src/report/payload.rs

use serde::Serialize;

use crate::types::{StatusEvent, UpdateStatus};

/// Path of the status webhook relative to the server URL.
pub const STATUS_PATH: &str = "/api/device/update-status";

/// Header carrying the device API key.
pub const API_KEY_HEADER: &str = "X-API-Key";

/// JSON body of a status POST.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusPayload<'a> {
    pub version: &'a str,
    pub status: UpdateStatus,
    pub message: &'a str,
    pub is_complete: bool,
}

impl<'a> StatusPayload<'a> {
    pub fn new(version: &'a str, event: &'a StatusEvent) -> Self {
        Self {
            version,
            status: event.status,
            message: &event.message,
            is_complete: event.is_complete(),
        }
    }
}

/// Join the server URL and the webhook path without doubling slashes.
pub fn status_url(server_url: &str) -> String {
    format!("{}{}", server_url.trim_end_matches('/'), STATUS_PATH)
}

/// The backend acknowledges with a body mentioning `success`.
pub fn is_acknowledged(body: &str) -> bool {
    body.contains("success")
}
