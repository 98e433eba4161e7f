use crate::error::StoreError;
use crate::page::{Flag, Page, PageId};

/// Key-value settings storage owned by the host.
pub trait OptionStore: Send + Sync {
    fn get_option(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set_option(&self, key: &str, value: &str) -> Result<(), StoreError>;
    /// Returns whether the key existed.
    fn delete_option(&self, key: &str) -> Result<bool, StoreError>;
}

/// Per-page key-value metadata owned by the host.
pub trait PageMetaStore: Send + Sync {
    fn get_meta(&self, page: PageId, key: &str) -> Result<Option<String>, StoreError>;
    fn set_meta(&self, page: PageId, key: &str, value: &str) -> Result<(), StoreError>;
    /// Removes `key` from every page, returning how many entries were dropped.
    fn delete_meta_by_key(&self, key: &str) -> Result<usize, StoreError>;
    fn pages_with_meta(&self, key: &str, value: &str) -> Result<Vec<PageId>, StoreError>;

    fn is_flagged(&self, page: PageId, flag: Flag) -> Result<bool, StoreError> {
        Ok(Flag::is_set(self.get_meta(page, flag.key())?.as_deref()))
    }

    fn set_flag(&self, page: PageId, flag: Flag, on: bool) -> Result<(), StoreError> {
        self.set_meta(page, flag.key(), Flag::stored_value(on))
    }
}

/// Lookups into the host's content tree.
pub trait PageResolver: Send + Sync {
    /// Resolves a permalink to the page it points at, `None` for external or
    /// unknown links.
    fn url_to_page_id(&self, url: &str) -> Option<PageId>;

    /// The page configured as the blog index, if any. Its permalink is not
    /// resolvable through `url_to_page_id` on most hosts.
    fn blog_page(&self) -> Option<PageId>;

    fn page(&self, id: PageId) -> Option<Page>;
}
