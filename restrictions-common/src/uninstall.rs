use serde::Serialize;
use tracing::instrument;

use crate::error::StoreError;
use crate::page::Flag;
use crate::settings::SettingKey;
use crate::store::{OptionStore, PageMetaStore};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UninstallReport {
    pub options_deleted: usize,
    pub meta_deleted: usize,
}

/// Removes every setting and every page flag this crate ever wrote.
#[instrument(skip_all)]
pub fn uninstall(
    options: &dyn OptionStore,
    meta: &dyn PageMetaStore,
) -> Result<UninstallReport, StoreError> {
    let mut report = UninstallReport::default();

    for key in SettingKey::ALL {
        if options.delete_option(key.as_str())? {
            report.options_deleted += 1;
        }
    }
    for flag in Flag::ALL {
        report.meta_deleted += meta.delete_meta_by_key(flag.key())?;
    }

    tracing::info!(
        options = report.options_deleted,
        meta = report.meta_deleted,
        "uninstalled"
    );
    Ok(report)
}
