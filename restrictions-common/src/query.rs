use crate::error::StoreError;
use crate::page::{Flag, PageId};
use crate::store::PageMetaStore;

/// Table names used when building raw SQL clauses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTables {
    pub posts: String,
    pub postmeta: String,
}

impl Default for QueryTables {
    fn default() -> Self {
        QueryTables {
            posts: "wp_posts".to_string(),
            postmeta: "wp_postmeta".to_string(),
        }
    }
}

impl QueryTables {
    pub fn with_prefix(prefix: &str) -> Self {
        QueryTables {
            posts: format!("{}posts", prefix),
            postmeta: format!("{}postmeta", prefix),
        }
    }

    /// Keeps rows with no hide flag or an empty one.
    pub fn hidden_where_clause(&self) -> String {
        format!(
            " AND ({meta}.meta_key IS NULL OR ({meta}.meta_key = '{key}' AND {meta}.meta_value = ''))",
            meta = self.postmeta,
            key = Flag::Hide.key(),
        )
    }

    pub fn hidden_join_clause(&self) -> String {
        format!(
            " LEFT JOIN {meta} ON {meta}.post_id = {posts}.ID AND {meta}.meta_key = '{key}'",
            meta = self.postmeta,
            posts = self.posts,
            key = Flag::Hide.key(),
        )
    }
}

/// WHERE and JOIN fragments of a raw listing query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SqlClauses {
    pub where_clause: String,
    pub join: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaCompare {
    NotExists,
    Equals(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaCondition {
    pub key: String,
    pub compare: MetaCompare,
}

/// Structured metadata filter attached to a listing query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaQuery {
    Condition(MetaCondition),
    And(Vec<MetaQuery>),
    Or(Vec<MetaQuery>),
}

impl MetaQuery {
    pub fn not_exists(key: &str) -> Self {
        MetaQuery::Condition(MetaCondition {
            key: key.to_string(),
            compare: MetaCompare::NotExists,
        })
    }

    pub fn equals(key: &str, value: &str) -> Self {
        MetaQuery::Condition(MetaCondition {
            key: key.to_string(),
            compare: MetaCompare::Equals(value.to_string()),
        })
    }

    /// Evaluates the filter against one page's stored metadata.
    pub fn matches(&self, meta: &dyn PageMetaStore, page: PageId) -> Result<bool, StoreError> {
        match self {
            MetaQuery::Condition(condition) => {
                let stored = meta.get_meta(page, &condition.key)?;
                Ok(match &condition.compare {
                    MetaCompare::NotExists => stored.is_none(),
                    MetaCompare::Equals(value) => stored.as_deref() == Some(value.as_str()),
                })
            }
            MetaQuery::And(clauses) => {
                for clause in clauses {
                    if !clause.matches(meta, page)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            MetaQuery::Or(clauses) => {
                for clause in clauses {
                    if clause.matches(meta, page)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostQuery {
    /// Set for single page or post views. The SQL clause filter leaves these
    /// alone, the structured filter does not.
    pub is_singular: bool,
    pub meta_query: Option<MetaQuery>,
}

impl PostQuery {
    pub fn listing() -> Self {
        PostQuery::default()
    }

    pub fn singular() -> Self {
        PostQuery {
            is_singular: true,
            meta_query: None,
        }
    }
}
