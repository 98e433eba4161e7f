use std::fmt;

use serde::{Deserialize, Serialize};

/// Value stored for a flag that is switched on. Anything else, including a
/// missing entry, reads as off.
pub const FLAG_ON: &str = "yes";
pub const FLAG_OFF: &str = "";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct PageId(pub u64);

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct MenuItemId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct CommentId(pub u64);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PageKind {
    #[default]
    Page,
    Post,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Page {
    pub id: PageId,
    #[serde(default)]
    pub parent: Option<PageId>,
    pub title: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub kind: PageKind,
    pub permalink: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MenuItem {
    pub id: MenuItemId,
    pub url: String,
    /// Page the item was created for, when the menu editor recorded one.
    /// Not used for filtering; targets are resolved from `url`.
    #[serde(default)]
    pub object_id: Option<PageId>,
    #[serde(default)]
    pub title: String,
    /// Parent item within the same menu, `None` for top level entries.
    #[serde(default)]
    pub menu_parent: Option<MenuItemId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Comment {
    pub id: CommentId,
    pub page_id: PageId,
    #[serde(default)]
    pub author: String,
    pub content: String,
}

/// Comment lookups come back either as one (possibly missing) comment or as a
/// list. Filtering keeps the shape it was given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Comments {
    Single(Option<Comment>),
    List(Vec<Comment>),
}

/// Per-page metadata switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum Flag {
    #[serde(rename = "hide_page")]
    Hide,
    #[serde(rename = "redirect_page")]
    Redirect,
}

impl Flag {
    pub const ALL: [Flag; 2] = [Flag::Redirect, Flag::Hide];

    pub fn key(&self) -> &'static str {
        match self {
            Flag::Hide => "hide_page",
            Flag::Redirect => "redirect_page",
        }
    }

    /// Whether a stored metadata value switches the flag on.
    pub fn is_set(value: Option<&str>) -> bool {
        matches!(value, Some(v) if !v.is_empty())
    }

    pub fn stored_value(on: bool) -> &'static str {
        if on {
            FLAG_ON
        } else {
            FLAG_OFF
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}
