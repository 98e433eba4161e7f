use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Deserialize;

use crate::error::StoreError;
use crate::page::{Comment, CommentId, MenuItem, Page, PageId};
use crate::store::{OptionStore, PageMetaStore, PageResolver};

/// Site content as loaded from a seed file.
#[derive(Debug, Default, Deserialize)]
pub struct SiteSeed {
    #[serde(default)]
    pub pages: Vec<Page>,
    /// Page id -> metadata key -> value.
    #[serde(default)]
    pub flags: HashMap<u64, HashMap<String, String>>,
    #[serde(default)]
    pub menus: HashMap<String, Vec<MenuItem>>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub sticky: Vec<PageId>,
    #[serde(default)]
    pub blog_page: Option<PageId>,
    #[serde(default)]
    pub options: HashMap<String, String>,
}

impl SiteSeed {
    pub fn from_json(raw: &str) -> Result<SiteSeed, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

/// In-process host: immutable content plus mutable options and page metadata.
#[derive(Debug, Default)]
pub struct MemoryHost {
    pages: Vec<Page>,
    menus: HashMap<String, Vec<MenuItem>>,
    comments: Vec<Comment>,
    sticky: Vec<PageId>,
    blog_page: Option<PageId>,
    options: RwLock<HashMap<String, String>>,
    meta: RwLock<HashMap<PageId, HashMap<String, String>>>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: SiteSeed) -> Self {
        let meta = seed
            .flags
            .into_iter()
            .map(|(id, values)| (PageId(id), values))
            .collect();

        MemoryHost {
            pages: seed.pages,
            menus: seed.menus,
            comments: seed.comments,
            sticky: seed.sticky,
            blog_page: seed.blog_page,
            options: RwLock::new(seed.options),
            meta: RwLock::new(meta),
        }
    }

    pub fn with_pages(mut self, pages: Vec<Page>) -> Self {
        self.pages = pages;
        self
    }

    pub fn with_blog_page(mut self, page: PageId) -> Self {
        self.blog_page = Some(page);
        self
    }

    pub fn pages(&self) -> Vec<Page> {
        self.pages.clone()
    }

    pub fn menu(&self, name: &str) -> Option<Vec<MenuItem>> {
        self.menus.get(name).cloned()
    }

    pub fn sticky(&self) -> Vec<PageId> {
        self.sticky.clone()
    }

    pub fn comment(&self, id: CommentId) -> Option<Comment> {
        self.comments.iter().find(|c| c.id == id).cloned()
    }

    pub fn comments_for(&self, page: PageId) -> Vec<Comment> {
        self.comments
            .iter()
            .filter(|c| c.page_id == page)
            .cloned()
            .collect()
    }

    fn options_read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, String>>, StoreError> {
        self.options
            .read()
            .map_err(|_| StoreError::Poisoned("options"))
    }

    fn options_write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, String>>, StoreError> {
        self.options
            .write()
            .map_err(|_| StoreError::Poisoned("options"))
    }

    #[allow(clippy::type_complexity)]
    fn meta_read(
        &self,
    ) -> Result<RwLockReadGuard<'_, HashMap<PageId, HashMap<String, String>>>, StoreError> {
        self.meta.read().map_err(|_| StoreError::Poisoned("meta"))
    }

    #[allow(clippy::type_complexity)]
    fn meta_write(
        &self,
    ) -> Result<RwLockWriteGuard<'_, HashMap<PageId, HashMap<String, String>>>, StoreError> {
        self.meta.write().map_err(|_| StoreError::Poisoned("meta"))
    }
}

impl OptionStore for MemoryHost {
    fn get_option(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.options_read()?.get(key).cloned())
    }

    fn set_option(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.options_write()?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete_option(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.options_write()?.remove(key).is_some())
    }
}

impl PageMetaStore for MemoryHost {
    fn get_meta(&self, page: PageId, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .meta_read()?
            .get(&page)
            .and_then(|values| values.get(key))
            .cloned())
    }

    fn set_meta(&self, page: PageId, key: &str, value: &str) -> Result<(), StoreError> {
        self.meta_write()?
            .entry(page)
            .or_default()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete_meta_by_key(&self, key: &str) -> Result<usize, StoreError> {
        let mut meta = self.meta_write()?;
        let removed = meta
            .values_mut()
            .filter_map(|values| values.remove(key))
            .count();
        meta.retain(|_, values| !values.is_empty());
        Ok(removed)
    }

    fn pages_with_meta(&self, key: &str, value: &str) -> Result<Vec<PageId>, StoreError> {
        let mut ids: Vec<PageId> = self
            .meta_read()?
            .iter()
            .filter(|(_, values)| values.get(key).map(String::as_str) == Some(value))
            .map(|(id, _)| *id)
            .collect();
        ids.sort();
        Ok(ids)
    }
}

impl PageResolver for MemoryHost {
    // Mirrors common CMS behaviour: the blog index permalink does not resolve.
    fn url_to_page_id(&self, url: &str) -> Option<PageId> {
        let wanted = url.trim_end_matches('/');
        self.pages
            .iter()
            .filter(|page| Some(page.id) != self.blog_page)
            .find(|page| page.permalink.trim_end_matches('/') == wanted)
            .map(|page| page.id)
    }

    fn blog_page(&self) -> Option<PageId> {
        self.blog_page
    }

    fn page(&self, id: PageId) -> Option<Page> {
        self.pages.iter().find(|page| page.id == id).cloned()
    }
}
