use std::sync::Arc;

use serde::Serialize;
use tracing::instrument;
use url::Url;

use crate::error::{SettingsError, StoreError};
use crate::store::OptionStore;

const STORED_TRUE: &str = "1";
const STORED_FALSE: &str = "";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    FilterEnabled,
    RedirectEnabled,
    RedirectDestination,
    HidingEnabled,
}

impl SettingKey {
    pub const ALL: [SettingKey; 4] = [
        SettingKey::FilterEnabled,
        SettingKey::RedirectEnabled,
        SettingKey::RedirectDestination,
        SettingKey::HidingEnabled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SettingKey::FilterEnabled => "filter_enabled",
            SettingKey::RedirectEnabled => "redirect_enabled",
            SettingKey::RedirectDestination => "redirect_destination",
            SettingKey::HidingEnabled => "hiding_enabled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettingsSnapshot {
    pub filter_enabled: bool,
    pub redirect_enabled: bool,
    pub redirect_destination: String,
    pub hiding_enabled: bool,
}

/// Typed access to the plugin settings, falling back to defaults for keys the
/// option store has never seen.
#[derive(Clone)]
pub struct Settings {
    options: Arc<dyn OptionStore>,
    home_url: Url,
}

impl Settings {
    pub fn new(options: Arc<dyn OptionStore>, home_url: Url) -> Self {
        Settings { options, home_url }
    }

    /// All boolean settings default to enabled.
    pub fn get_bool(&self, key: SettingKey) -> Result<bool, StoreError> {
        Ok(match self.options.get_option(key.as_str())? {
            None => true,
            Some(value) => parse_stored_bool(&value),
        })
    }

    pub fn set_bool(&self, key: SettingKey, value: bool) -> Result<(), StoreError> {
        let stored = if value { STORED_TRUE } else { STORED_FALSE };
        self.options.set_option(key.as_str(), stored)
    }

    pub fn redirect_destination(&self) -> Result<String, StoreError> {
        Ok(self
            .options
            .get_option(SettingKey::RedirectDestination.as_str())?
            .unwrap_or_else(|| self.home_url.to_string()))
    }

    /// Stores `input` as the redirect destination if it is an absolute URL.
    /// Otherwise the previously stored value stays in place.
    #[instrument(skip(self))]
    pub fn update_redirect_destination(&self, input: &str) -> Result<Url, SettingsError> {
        let destination = match validate_url(input) {
            Some(url) => url,
            None => {
                tracing::info!("rejected redirect destination");
                return Err(SettingsError::InvalidUrl {
                    input: input.to_string(),
                });
            }
        };

        self.options
            .set_option(SettingKey::RedirectDestination.as_str(), destination.as_str())?;
        Ok(destination)
    }

    pub fn snapshot(&self) -> Result<SettingsSnapshot, StoreError> {
        Ok(SettingsSnapshot {
            filter_enabled: self.get_bool(SettingKey::FilterEnabled)?,
            redirect_enabled: self.get_bool(SettingKey::RedirectEnabled)?,
            redirect_destination: self.redirect_destination()?,
            hiding_enabled: self.get_bool(SettingKey::HidingEnabled)?,
        })
    }
}

fn parse_stored_bool(value: &str) -> bool {
    !matches!(value.trim(), "" | "0" | "false")
}

// Redirect targets need a host, so `mailto:` and friends are refused.
fn validate_url(input: &str) -> Option<Url> {
    let url = Url::parse(input.trim()).ok()?;
    match url.host_str() {
        Some(host) if !host.is_empty() => Some(url),
        _ => None,
    }
}
