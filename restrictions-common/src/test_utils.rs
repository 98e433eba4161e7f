use std::sync::Arc;

use url::Url;

use crate::memory::MemoryHost;
use crate::page::{Comment, CommentId, MenuItem, MenuItemId, Page, PageId, PageKind};
use crate::settings::Settings;

pub const HOME_URL: &str = "https://example.com/";

pub fn permalink(id: u64) -> String {
    format!("https://example.com/page-{}/", id)
}

pub fn page(id: u64, parent: Option<u64>) -> Page {
    Page {
        id: PageId(id),
        parent: parent.map(PageId),
        title: format!("Page {}", id),
        slug: format!("page-{}", id),
        kind: PageKind::Page,
        permalink: permalink(id),
    }
}

pub fn menu_item(id: u64, url: &str, menu_parent: Option<u64>) -> MenuItem {
    MenuItem {
        id: MenuItemId(id),
        url: url.to_string(),
        object_id: None,
        title: format!("Item {}", id),
        menu_parent: menu_parent.map(MenuItemId),
    }
}

pub fn comment(id: u64, page_id: u64) -> Comment {
    Comment {
        id: CommentId(id),
        page_id: PageId(page_id),
        author: "visitor".to_string(),
        content: format!("comment {}", id),
    }
}

/// A host and settings pair pointing at the example.com home page.
pub fn memory_settings(host: MemoryHost) -> (Arc<MemoryHost>, Settings) {
    let host = Arc::new(host);
    let home = Url::parse(HOME_URL).expect("static url is valid");
    let settings = Settings::new(host.clone(), home);
    (host, settings)
}
