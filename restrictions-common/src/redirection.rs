use std::sync::Arc;

use serde::Serialize;
use tracing::instrument;

use crate::error::StoreError;
use crate::page::{Flag, PageId};
use crate::settings::Settings;
use crate::store::PageMetaStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Redirect {
    pub location: String,
}

/// Sends visitors of redirect-flagged pages to the configured destination.
/// The destination's own flags are not inspected.
pub struct RedirectionEngine {
    meta: Arc<dyn PageMetaStore>,
    settings: Settings,
}

impl RedirectionEngine {
    pub fn new(meta: Arc<dyn PageMetaStore>, settings: Settings) -> Self {
        RedirectionEngine { meta, settings }
    }

    #[instrument(skip_all)]
    pub fn redirect(&self, current: Option<PageId>) -> Result<Option<Redirect>, StoreError> {
        let Some(page) = current else {
            return Ok(None);
        };

        if !self.meta.is_flagged(page, Flag::Redirect)? {
            return Ok(None);
        }

        let location = self.settings.redirect_destination()?;
        tracing::debug!(%page, %location, "redirecting flagged page");
        Ok(Some(Redirect { location }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryHost;
    use crate::test_utils::memory_settings;

    #[test]
    fn test_flagged_page_redirects_to_destination() {
        let (host, settings) = memory_settings(MemoryHost::new());
        host.set_flag(PageId(3), Flag::Redirect, true).unwrap();
        let engine = RedirectionEngine::new(host.clone(), settings.clone());

        assert_eq!(
            engine.redirect(Some(PageId(3))).unwrap(),
            Some(Redirect {
                location: "https://example.com/".to_string()
            })
        );

        settings
            .update_redirect_destination("https://intranet.example.com/login")
            .unwrap();
        assert_eq!(
            engine.redirect(Some(PageId(3))).unwrap().unwrap().location,
            "https://intranet.example.com/login"
        );
    }

    #[test]
    fn test_unflagged_or_missing_page_does_not_redirect() {
        let (host, settings) = memory_settings(MemoryHost::new());
        host.set_flag(PageId(4), Flag::Redirect, false).unwrap();
        host.set_flag(PageId(5), Flag::Hide, true).unwrap();
        let engine = RedirectionEngine::new(host, settings);

        assert_eq!(engine.redirect(Some(PageId(4))).unwrap(), None);
        assert_eq!(engine.redirect(Some(PageId(5))).unwrap(), None);
        assert_eq!(engine.redirect(Some(PageId(6))).unwrap(), None);
        assert_eq!(engine.redirect(None).unwrap(), None);
    }
}
