use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use restrictions_common::admin::{MarkedPage, MetaboxForm, SaveOutcome};
use restrictions_common::error::{SettingsError, StoreError};
use restrictions_common::page::{Comments, Page};
use restrictions_common::settings::{SettingKey, SettingsSnapshot};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("failed to parse request: {0}")]
    BadRequest(String),
    #[error("missing or invalid admin credentials")]
    Unauthorized,
    #[error("{0} not found")]
    NotFound(String),
    #[error("internal error")]
    Store(#[from] StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ApiError::Store(ref e) => {
                tracing::error!("store failure: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
        }
        .into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct PageView {
    #[serde(flatten)]
    pub page: Page,
    pub comments: Comments,
}

/// Admin notice shown next to a rejected setting.
#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub setting: &'static str,
    pub code: &'static str,
    pub message: String,
}

impl Notice {
    pub fn for_setting(key: SettingKey, error: &SettingsError) -> Self {
        Notice {
            setting: key.as_str(),
            code: error.code(),
            message: error.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SettingsResponse {
    pub settings: SettingsSnapshot,
    pub hidden_pages: Vec<MarkedPage>,
    pub redirected_pages: Vec<MarkedPage>,
    pub notices: Vec<Notice>,
}

/// Partial settings update, absent fields are left alone.
#[derive(Debug, Default, Deserialize)]
pub struct SettingsUpdate {
    pub filter_enabled: Option<bool>,
    pub redirect_enabled: Option<bool>,
    pub hiding_enabled: Option<bool>,
    pub redirect_destination: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MetaboxSubmission {
    #[serde(flatten)]
    pub form: MetaboxForm,
    #[serde(default)]
    pub autosave: bool,
    #[serde(default)]
    pub revision: bool,
}

#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct SaveResponse {
    pub saved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<String>,
}

impl From<SaveOutcome> for SaveResponse {
    fn from(outcome: SaveOutcome) -> Self {
        match outcome {
            SaveOutcome::Saved => SaveResponse {
                saved: true,
                skipped: None,
            },
            SaveOutcome::Skipped(reason) => SaveResponse {
                saved: false,
                skipped: Some(reason.to_string()),
            },
        }
    }
}
