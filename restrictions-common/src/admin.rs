use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::StoreError;
use crate::nonce::NonceService;
use crate::page::{Flag, PageId, FLAG_ON};
use crate::store::{PageMetaStore, PageResolver};

pub const METABOX_ACTION: &str = "metabox";

/// Submitted per-page form. A checkbox that was left unticked is simply
/// absent from the submission.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetaboxForm {
    #[serde(default)]
    pub nonce: Option<String>,
    #[serde(default)]
    pub redirect_page: bool,
    #[serde(default)]
    pub hide_page: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SaveContext {
    pub user: String,
    pub is_autosave: bool,
    pub is_revision: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Autosave,
    Revision,
    MissingNonce,
    InvalidNonce,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SkipReason::Autosave => "autosave",
            SkipReason::Revision => "revision",
            SkipReason::MissingNonce => "missing_nonce",
            SkipReason::InvalidNonce => "invalid_nonce",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    Skipped(SkipReason),
}

/// What the metabox shows for a page: its flags and a nonce for the next
/// submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetaboxState {
    pub page: PageId,
    pub redirect_page: bool,
    pub hide_page: bool,
    pub nonce: String,
}

pub struct MetaboxHandler {
    meta: Arc<dyn PageMetaStore>,
    nonces: NonceService,
}

impl MetaboxHandler {
    pub fn new(meta: Arc<dyn PageMetaStore>, nonces: NonceService) -> Self {
        MetaboxHandler { meta, nonces }
    }

    pub fn state(&self, page: PageId, user: &str) -> Result<MetaboxState, StoreError> {
        Ok(MetaboxState {
            page,
            redirect_page: self.meta.is_flagged(page, Flag::Redirect)?,
            hide_page: self.meta.is_flagged(page, Flag::Hide)?,
            nonce: self.nonces.create(METABOX_ACTION, user),
        })
    }

    /// Persists both flags, or nothing at all when the submission is not a
    /// deliberate, verified save.
    #[instrument(skip_all, fields(page = %page))]
    pub fn save(
        &self,
        page: PageId,
        context: &SaveContext,
        form: &MetaboxForm,
    ) -> Result<SaveOutcome, StoreError> {
        if let Some(reason) = self.skip_reason(context, form) {
            tracing::debug!(%reason, "skipping metabox save");
            return Ok(SaveOutcome::Skipped(reason));
        }

        self.meta
            .set_flag(page, Flag::Redirect, form.redirect_page)?;
        self.meta.set_flag(page, Flag::Hide, form.hide_page)?;

        tracing::info!(
            redirect = form.redirect_page,
            hide = form.hide_page,
            "saved page flags"
        );
        Ok(SaveOutcome::Saved)
    }

    fn skip_reason(&self, context: &SaveContext, form: &MetaboxForm) -> Option<SkipReason> {
        if context.is_autosave {
            return Some(SkipReason::Autosave);
        }
        if context.is_revision {
            return Some(SkipReason::Revision);
        }

        let nonce = match form.nonce.as_deref() {
            Some(nonce) if !nonce.is_empty() => nonce,
            _ => return Some(SkipReason::MissingNonce),
        };
        match self.nonces.verify(nonce, METABOX_ACTION, &context.user) {
            Some(_) => None,
            None => Some(SkipReason::InvalidNonce),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarkedPage {
    pub id: PageId,
    pub title: String,
    pub permalink: String,
}

/// Pages with `flag` switched on, ordered by title. Flagged ids the resolver
/// no longer knows about are left out.
pub fn marked_pages(
    meta: &dyn PageMetaStore,
    resolver: &dyn PageResolver,
    flag: Flag,
) -> Result<Vec<MarkedPage>, StoreError> {
    let mut pages: Vec<MarkedPage> = meta
        .pages_with_meta(flag.key(), FLAG_ON)?
        .into_iter()
        .filter_map(|id| resolver.page(id))
        .map(|page| MarkedPage {
            id: page.id,
            title: page.title,
            permalink: page.permalink,
        })
        .collect();

    pages.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
    Ok(pages)
}
