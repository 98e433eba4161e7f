use thiserror::Error;

/// Failures surfaced by host storage implementations.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store lock poisoned: {0}")]
    Poisoned(&'static str),
    #[error("store backend failed: {0}")]
    Backend(String),
}

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("The entered URL was not valid. The previous URL has been re-established.")]
    InvalidUrl { input: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SettingsError {
    /// Machine readable code used for admin notices.
    pub fn code(&self) -> &'static str {
        match self {
            SettingsError::InvalidUrl { .. } => "invalid_url",
            SettingsError::Store(_) => "store_error",
        }
    }
}
