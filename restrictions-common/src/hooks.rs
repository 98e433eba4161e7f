use std::sync::Arc;

use tracing::instrument;

use crate::error::StoreError;
use crate::gate::{ApplicabilityGate, ClientFilter, RequestContext};
use crate::hiding::HidingEngine;
use crate::page::{Comments, MenuItem, Page, PageId};
use crate::query::{PostQuery, QueryTables, SqlClauses};
use crate::redirection::{Redirect, RedirectionEngine};
use crate::settings::{SettingKey, Settings};
use crate::store::{PageMetaStore, PageResolver};

/// Extension points the host calls while serving a request. Every method
/// passes its input through unchanged unless overridden.
pub trait RequestHooks: Send + Sync {
    fn name(&self) -> &'static str;

    fn pages(&self, pages: Vec<Page>) -> Result<Vec<Page>, StoreError> {
        Ok(pages)
    }

    fn menu_items(&self, items: Vec<MenuItem>) -> Result<Vec<MenuItem>, StoreError> {
        Ok(items)
    }

    fn query_clauses(&self, clauses: SqlClauses, _query: &PostQuery) -> SqlClauses {
        clauses
    }

    fn query(&self, query: PostQuery) -> PostQuery {
        query
    }

    fn sticky(&self, ids: Vec<PageId>) -> Result<Vec<PageId>, StoreError> {
        Ok(ids)
    }

    fn comments(&self, comments: Comments) -> Result<Comments, StoreError> {
        Ok(comments)
    }

    fn template_redirect(&self, _current: Option<PageId>) -> Result<Option<Redirect>, StoreError> {
        Ok(None)
    }
}

impl RequestHooks for HidingEngine {
    fn name(&self) -> &'static str {
        "hiding"
    }

    fn pages(&self, pages: Vec<Page>) -> Result<Vec<Page>, StoreError> {
        self.propagate_hidden(pages)
    }

    fn menu_items(&self, items: Vec<MenuItem>) -> Result<Vec<MenuItem>, StoreError> {
        self.filter_menu_items(items)
    }

    fn query_clauses(&self, clauses: SqlClauses, query: &PostQuery) -> SqlClauses {
        self.filter_query(clauses, query)
    }

    fn query(&self, query: PostQuery) -> PostQuery {
        self.exclude_from_query(query)
    }

    fn sticky(&self, ids: Vec<PageId>) -> Result<Vec<PageId>, StoreError> {
        self.filter_sticky(ids)
    }

    fn comments(&self, comments: Comments) -> Result<Comments, StoreError> {
        self.filter_comments(comments)
    }
}

impl RequestHooks for RedirectionEngine {
    fn name(&self) -> &'static str {
        "redirection"
    }

    fn template_redirect(&self, current: Option<PageId>) -> Result<Option<Redirect>, StoreError> {
        self.redirect(current)
    }
}

/// Hooks active for a single request, applied in registration order.
#[derive(Default)]
pub struct Dispatcher {
    hooks: Vec<Box<dyn RequestHooks>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, hooks: Box<dyn RequestHooks>) {
        self.hooks.push(hooks);
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.hooks.iter().map(|hooks| hooks.name()).collect()
    }

    pub fn pages(&self, pages: Vec<Page>) -> Result<Vec<Page>, StoreError> {
        self.hooks
            .iter()
            .try_fold(pages, |pages, hooks| hooks.pages(pages))
    }

    pub fn menu_items(&self, items: Vec<MenuItem>) -> Result<Vec<MenuItem>, StoreError> {
        self.hooks
            .iter()
            .try_fold(items, |items, hooks| hooks.menu_items(items))
    }

    pub fn query_clauses(&self, clauses: SqlClauses, query: &PostQuery) -> SqlClauses {
        self.hooks
            .iter()
            .fold(clauses, |clauses, hooks| hooks.query_clauses(clauses, query))
    }

    pub fn query(&self, query: PostQuery) -> PostQuery {
        self.hooks
            .iter()
            .fold(query, |query, hooks| hooks.query(query))
    }

    pub fn sticky(&self, ids: Vec<PageId>) -> Result<Vec<PageId>, StoreError> {
        self.hooks
            .iter()
            .try_fold(ids, |ids, hooks| hooks.sticky(ids))
    }

    pub fn comments(&self, comments: Comments) -> Result<Comments, StoreError> {
        self.hooks
            .iter()
            .try_fold(comments, |comments, hooks| hooks.comments(comments))
    }

    /// First hook to ask for a redirect wins.
    pub fn template_redirect(&self, current: Option<PageId>) -> Result<Option<Redirect>, StoreError> {
        for hooks in &self.hooks {
            if let Some(redirect) = hooks.template_redirect(current)? {
                return Ok(Some(redirect));
            }
        }
        Ok(None)
    }
}

/// Entry point for hosts: owns the stores and settings and decides, per
/// request, which hooks to activate.
pub struct Restrictions {
    settings: Settings,
    meta: Arc<dyn PageMetaStore>,
    resolver: Arc<dyn PageResolver>,
    gate: ApplicabilityGate,
    tables: QueryTables,
}

impl Restrictions {
    pub fn new(
        settings: Settings,
        meta: Arc<dyn PageMetaStore>,
        resolver: Arc<dyn PageResolver>,
        filter: Box<dyn ClientFilter>,
    ) -> Self {
        Restrictions {
            gate: ApplicabilityGate::new(settings.clone(), filter),
            settings,
            meta,
            resolver,
            tables: QueryTables::default(),
        }
    }

    pub fn with_tables(mut self, tables: QueryTables) -> Self {
        self.tables = tables;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    #[instrument(skip_all)]
    pub fn activate(&self, request: &RequestContext) -> Result<Dispatcher, StoreError> {
        let mut dispatcher = Dispatcher::new();

        if !self.gate.is_applicable(request)? {
            tracing::debug!("restrictions not applicable to request");
            return Ok(dispatcher);
        }

        if self.settings.get_bool(SettingKey::HidingEnabled)? {
            dispatcher.register(Box::new(
                HidingEngine::new(self.meta.clone(), self.resolver.clone())
                    .with_tables(self.tables.clone()),
            ));
        }

        if self.settings.get_bool(SettingKey::RedirectEnabled)? {
            dispatcher.register(Box::new(RedirectionEngine::new(
                self.meta.clone(),
                self.settings.clone(),
            )));
        }

        tracing::debug!(hooks = ?dispatcher.names(), "activated restrictions");
        Ok(dispatcher)
    }
}
