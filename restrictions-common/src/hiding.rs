use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::instrument;

use crate::error::StoreError;
use crate::page::{Comments, Flag, MenuItem, MenuItemId, Page, PageId};
use crate::query::{MetaQuery, PostQuery, QueryTables, SqlClauses};
use crate::store::{PageMetaStore, PageResolver};

/// Removes hidden pages, and everything hanging off them, from whatever the
/// host is about to show.
pub struct HidingEngine {
    meta: Arc<dyn PageMetaStore>,
    resolver: Arc<dyn PageResolver>,
    tables: QueryTables,
}

impl HidingEngine {
    pub fn new(meta: Arc<dyn PageMetaStore>, resolver: Arc<dyn PageResolver>) -> Self {
        HidingEngine {
            meta,
            resolver,
            tables: QueryTables::default(),
        }
    }

    pub fn with_tables(mut self, tables: QueryTables) -> Self {
        self.tables = tables;
        self
    }

    fn is_hidden(&self, page: PageId) -> Result<bool, StoreError> {
        self.meta.is_flagged(page, Flag::Hide)
    }

    /// Drops every page that is flagged or sits below a flagged page.
    /// Surviving pages keep their relative order.
    #[instrument(skip_all)]
    pub fn propagate_hidden(&self, pages: Vec<Page>) -> Result<Vec<Page>, StoreError> {
        let total = pages.len();
        let listed: HashSet<PageId> = pages.iter().map(|page| page.id).collect();

        // Seed with pages hidden by their own flag, or by an ancestor that is
        // not part of this listing.
        let mut seeds = Vec::new();
        for page in &pages {
            if self.is_hidden(page.id)? || self.unlisted_ancestor_hidden(page, &listed)? {
                seeds.push(page.id);
            }
        }

        let mut children: HashMap<PageId, Vec<PageId>> = HashMap::new();
        for page in &pages {
            if let Some(parent) = page.parent {
                children.entry(parent).or_default().push(page.id);
            }
        }

        let mut hidden: HashSet<PageId> = HashSet::new();
        let mut worklist = seeds;
        while let Some(id) = worklist.pop() {
            if !hidden.insert(id) {
                continue;
            }
            if let Some(below) = children.get(&id) {
                worklist.extend(below.iter().copied());
            }
        }

        let mut remaining = pages;
        remaining.retain(|page| !hidden.contains(&page.id));

        tracing::debug!(total, hidden = hidden.len(), "propagated hidden pages");
        Ok(remaining)
    }

    // Walks up from the first parent missing from the listing.
    fn unlisted_ancestor_hidden(
        &self,
        page: &Page,
        listed: &HashSet<PageId>,
    ) -> Result<bool, StoreError> {
        let mut next = match page.parent {
            Some(parent) if !listed.contains(&parent) => Some(parent),
            _ => return Ok(false),
        };
        let mut visited = HashSet::new();

        while let Some(current) = next {
            if !visited.insert(current) {
                tracing::warn!(page = %page.id, ancestor = %current, "cycle in page tree");
                return Ok(false);
            }
            if self.is_hidden(current)? {
                return Ok(true);
            }
            next = self.resolver.page(current).and_then(|ancestor| ancestor.parent);
        }
        Ok(false)
    }

    /// Drops items pointing at a hidden page and items nested under a dropped
    /// item. Items whose target cannot be resolved are always kept.
    #[instrument(skip_all)]
    pub fn filter_menu_items(&self, items: Vec<MenuItem>) -> Result<Vec<MenuItem>, StoreError> {
        let total = items.len();
        let blog = self.resolver.blog_page().and_then(|id| {
            self.resolver
                .page(id)
                .map(|page| (id, page.permalink))
        });

        let mut dropped: HashSet<MenuItemId> = HashSet::new();
        let mut kept = Vec::with_capacity(items.len());
        for item in items {
            let target = match &blog {
                Some((id, permalink)) if same_url(permalink, &item.url) => Some(*id),
                _ => self.resolver.url_to_page_id(&item.url),
            };

            let Some(target) = target else {
                tracing::warn!(item = item.id.0, url = %item.url, "menu item target not resolvable, keeping it");
                kept.push(item);
                continue;
            };

            let parent_dropped = item
                .menu_parent
                .is_some_and(|parent| dropped.contains(&parent));
            if parent_dropped || self.is_hidden(target)? {
                dropped.insert(item.id);
                continue;
            }
            kept.push(item);
        }

        tracing::debug!(total, dropped = dropped.len(), "filtered menu items");
        Ok(kept)
    }

    /// Raw SQL variant: extends a listing's WHERE and JOIN fragments so that
    /// flagged rows are skipped.
    #[instrument(skip_all)]
    pub fn filter_query(&self, clauses: SqlClauses, query: &PostQuery) -> SqlClauses {
        if query.is_singular {
            return clauses;
        }

        tracing::debug!(table = %self.tables.postmeta, "extending listing clauses");
        SqlClauses {
            where_clause: clauses.where_clause + &self.tables.hidden_where_clause(),
            join: clauses.join + &self.tables.hidden_join_clause(),
        }
    }

    /// Structured variant: adds a "not hidden" condition to the query's meta
    /// filter, keeping whatever the caller already asked for.
    #[instrument(skip_all)]
    pub fn exclude_from_query(&self, mut query: PostQuery) -> PostQuery {
        let not_hidden = MetaQuery::Or(vec![
            MetaQuery::not_exists(Flag::Hide.key()),
            MetaQuery::equals(Flag::Hide.key(), ""),
        ]);

        query.meta_query = Some(match query.meta_query.take() {
            None => not_hidden,
            Some(existing) => MetaQuery::And(vec![existing, not_hidden]),
        });
        tracing::debug!("merged hidden page condition into query");
        query
    }

    #[instrument(skip_all)]
    pub fn filter_sticky(&self, ids: Vec<PageId>) -> Result<Vec<PageId>, StoreError> {
        let total = ids.len();
        let mut kept = Vec::with_capacity(ids.len());
        for id in ids {
            if !self.is_hidden(id)? {
                kept.push(id);
            }
        }

        tracing::debug!(total, kept = kept.len(), "filtered sticky pages");
        Ok(kept)
    }

    #[instrument(skip_all)]
    pub fn filter_comments(&self, comments: Comments) -> Result<Comments, StoreError> {
        let filtered = match comments {
            Comments::Single(None) => Comments::Single(None),
            Comments::Single(Some(comment)) => {
                if self.is_hidden(comment.page_id)? {
                    Comments::Single(None)
                } else {
                    Comments::Single(Some(comment))
                }
            }
            Comments::List(list) => {
                let total = list.len();
                let mut kept = Vec::with_capacity(list.len());
                for comment in list {
                    if !self.is_hidden(comment.page_id)? {
                        kept.push(comment);
                    }
                }
                tracing::debug!(total, kept = kept.len(), "filtered comments");
                Comments::List(kept)
            }
        };
        Ok(filtered)
    }
}

fn same_url(a: &str, b: &str) -> bool {
    a.trim_end_matches('/') == b.trim_end_matches('/')
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;
    use crate::memory::MemoryHost;
    use crate::page::Comment;
    use crate::test_utils::{comment, menu_item, page, permalink};

    // 1
    // ├── 2
    // │   └── 4
    // │       └── 6
    // └── 3
    //     └── 5
    // 7
    fn tree() -> Vec<Page> {
        vec![
            page(6, Some(4)),
            page(1, None),
            page(5, Some(3)),
            page(2, Some(1)),
            page(3, Some(1)),
            page(4, Some(2)),
            page(7, None),
        ]
    }

    fn engine(host: MemoryHost, hidden: &[u64]) -> (Arc<MemoryHost>, HidingEngine) {
        let host = Arc::new(host);
        for id in hidden {
            host.set_flag(PageId(*id), Flag::Hide, true).unwrap();
        }
        (host.clone(), HidingEngine::new(host.clone(), host))
    }

    fn ids(pages: &[Page]) -> Vec<u64> {
        pages.iter().map(|page| page.id.0).collect()
    }

    // Reference answer computed by walking each page's ancestor chain.
    fn has_hidden_ancestor_or_self(pages: &[Page], hidden: &[u64], id: PageId) -> bool {
        let mut current = Some(id);
        while let Some(id) = current {
            if hidden.contains(&id.0) {
                return true;
            }
            current = pages.iter().find(|p| p.id == id).and_then(|p| p.parent);
        }
        false
    }

    #[test_case(&[] => vec![6, 1, 5, 2, 3, 4, 7]; "nothing hidden")]
    #[test_case(&[2] => vec![1, 5, 3, 7]; "inner node hides subtree")]
    #[test_case(&[1] => vec![7]; "root hides whole tree")]
    #[test_case(&[6, 5] => vec![1, 2, 3, 4, 7]; "leaves only")]
    #[test_case(&[4, 7] => vec![1, 5, 2, 3]; "mixed")]
    fn test_propagate_hidden(hidden: &[u64]) -> Vec<u64> {
        let (_, engine) = engine(MemoryHost::new(), hidden);
        ids(&engine.propagate_hidden(tree()).unwrap())
    }

    #[test]
    fn test_listing_excludes_exactly_pages_under_a_flag() {
        let flag_sets: [&[u64]; 5] = [&[], &[1], &[2, 5], &[4], &[3, 6, 7]];
        for hidden in flag_sets {
            let (_, engine) = engine(MemoryHost::new(), hidden);
            let pages = tree();
            let kept = engine.propagate_hidden(pages.clone()).unwrap();

            for page in &pages {
                let excluded = !kept.iter().any(|k| k.id == page.id);
                assert_eq!(
                    excluded,
                    has_hidden_ancestor_or_self(&pages, hidden, page.id),
                    "page {} with hidden set {:?}",
                    page.id,
                    hidden
                );
            }
        }
    }

    #[test]
    fn test_propagate_hidden_is_idempotent() {
        let (_, engine) = engine(MemoryHost::new(), &[2, 7]);

        let once = engine.propagate_hidden(tree()).unwrap();
        let twice = engine.propagate_hidden(once.clone()).unwrap();

        assert_eq!(once, twice);
    }

    #[test]
    fn test_propagate_hidden_consults_unlisted_ancestors() {
        let (_, engine) = engine(MemoryHost::new().with_pages(tree()), &[1]);

        // Only the grandchildren are listed, their flagged root is not.
        let kept = engine
            .propagate_hidden(vec![page(4, Some(2)), page(8, None)])
            .unwrap();

        assert_eq!(ids(&kept), vec![8]);
    }

    // Page 1 is the root, page `n` is the parent of page `n + 1`.
    fn chain(len: u64) -> Vec<Page> {
        (1..=len)
            .map(|id| page(id, if id == 1 { None } else { Some(id - 1) }))
            .collect()
    }

    #[test]
    fn test_propagate_hidden_handles_deep_chains() {
        let (_, engine) = engine(MemoryHost::new(), &[1]);

        let mut pages = chain(5_000);
        pages.reverse();

        assert!(engine.propagate_hidden(pages).unwrap().is_empty());
    }

    #[test]
    fn test_propagate_hidden_deep_chain_below_unlisted_root() {
        let (_, engine) = engine(MemoryHost::new().with_pages(chain(5_000)), &[1]);

        let mut listed = chain(5_000).split_off(1);
        listed.reverse();
        listed.push(page(9_999, None));

        let kept = engine.propagate_hidden(listed).unwrap();
        assert_eq!(ids(&kept), vec![9_999]);
    }

    #[test]
    fn test_menu_drops_hidden_targets_and_their_children() {
        let (_, engine) = engine(MemoryHost::new().with_pages(tree()), &[2]);

        let items = vec![
            menu_item(10, &permalink(1), None),
            menu_item(11, &permalink(2), None),
            menu_item(12, &permalink(4), Some(11)),
            menu_item(13, &permalink(3), Some(10)),
        ];

        let kept = engine.filter_menu_items(items).unwrap();

        let kept: Vec<u64> = kept.iter().map(|item| item.id.0).collect();
        assert_eq!(kept, vec![10, 13]);
    }

    #[test]
    fn test_unresolvable_menu_items_are_never_removed() {
        let (_, engine) = engine(MemoryHost::new().with_pages(tree()), &[1]);

        let items = vec![
            menu_item(10, &permalink(1), None),
            menu_item(11, "https://elsewhere.org/docs", Some(10)),
            menu_item(12, "https://elsewhere.org/", None),
        ];

        let kept = engine.filter_menu_items(items).unwrap();

        let kept: Vec<u64> = kept.iter().map(|item| item.id.0).collect();
        assert_eq!(kept, vec![11, 12]);
    }

    #[test]
    fn test_blog_index_link_maps_to_blog_page() {
        let host = MemoryHost::new()
            .with_pages(tree())
            .with_blog_page(PageId(7));
        let (host, engine) = engine(host, &[]);
        assert_eq!(host.url_to_page_id(&permalink(7)), None);

        let items = vec![menu_item(10, "https://example.com/page-7", None)];
        assert_eq!(engine.filter_menu_items(items.clone()).unwrap().len(), 1);

        host.set_flag(PageId(7), Flag::Hide, true).unwrap();
        assert!(engine.filter_menu_items(items).unwrap().is_empty());
    }

    #[test]
    fn test_external_link_ignores_recorded_object() {
        let (_, engine) = engine(MemoryHost::new().with_pages(tree()), &[3]);

        let mut item = menu_item(10, "https://elsewhere.org/docs", None);
        item.object_id = Some(PageId(3));

        let kept = engine.filter_menu_items(vec![item.clone()]).unwrap();
        assert_eq!(kept, vec![item]);
    }

    #[test]
    fn test_filter_query_only_touches_listings() {
        let (_, engine) = engine(MemoryHost::new(), &[]);
        let clauses = SqlClauses {
            where_clause: " AND wp_posts.post_type = 'page'".to_string(),
            join: String::new(),
        };

        let single = engine.filter_query(clauses.clone(), &PostQuery::singular());
        assert_eq!(single, clauses);

        let listing = engine.filter_query(clauses, &PostQuery::listing());
        assert_eq!(
            listing.where_clause,
            " AND wp_posts.post_type = 'page' AND (wp_postmeta.meta_key IS NULL OR (wp_postmeta.meta_key = 'hide_page' AND wp_postmeta.meta_value = ''))"
        );
        assert_eq!(
            listing.join,
            " LEFT JOIN wp_postmeta ON wp_postmeta.post_id = wp_posts.ID AND wp_postmeta.meta_key = 'hide_page'"
        );
    }

    #[test]
    fn test_exclude_from_query_keeps_caller_filter() {
        let (host, engine) = engine(MemoryHost::new(), &[1]);
        host.set_meta(PageId(2), "color", "red").unwrap();
        host.set_meta(PageId(1), "color", "red").unwrap();

        let fresh = engine.exclude_from_query(PostQuery::listing());
        assert!(matches!(fresh.meta_query, Some(MetaQuery::Or(_))));

        let query = PostQuery {
            is_singular: false,
            meta_query: Some(MetaQuery::equals("color", "red")),
        };
        let merged = engine.exclude_from_query(query);
        let Some(MetaQuery::And(clauses)) = &merged.meta_query else {
            panic!("expected a conjunction, got {:?}", merged.meta_query);
        };
        assert_eq!(clauses[0], MetaQuery::equals("color", "red"));

        let filter = merged.meta_query.unwrap();
        assert!(filter.matches(host.as_ref(), PageId(2)).unwrap());
        assert!(!filter.matches(host.as_ref(), PageId(1)).unwrap());
        assert!(!filter.matches(host.as_ref(), PageId(3)).unwrap());

    }

    #[test]
    fn test_exclude_from_query_filters_singular_views_too() {
        let (host, engine) = engine(MemoryHost::new(), &[1]);

        let single = engine.exclude_from_query(PostQuery::singular());
        assert!(single.is_singular);

        let filter = single.meta_query.expect("singular query left unfiltered");
        assert!(!filter.matches(host.as_ref(), PageId(1)).unwrap());
        assert!(filter.matches(host.as_ref(), PageId(2)).unwrap());
    }

    #[test]
    fn test_sticky_drops_flagged_ids() {
        let (_, engine) = engine(MemoryHost::new(), &[2]);

        let kept = engine
            .filter_sticky(vec![PageId(3), PageId(2), PageId(1)])
            .unwrap();

        assert_eq!(kept, vec![PageId(3), PageId(1)]);
    }

    #[test]
    fn test_comments_on_hidden_pages_are_removed_in_both_shapes() {
        let (_, engine) = engine(MemoryHost::new(), &[2]);

        let hidden: Comment = comment(1, 2);
        let visible: Comment = comment(2, 3);

        assert_eq!(
            engine
                .filter_comments(Comments::Single(Some(hidden.clone())))
                .unwrap(),
            Comments::Single(None)
        );
        assert_eq!(
            engine
                .filter_comments(Comments::Single(Some(visible.clone())))
                .unwrap(),
            Comments::Single(Some(visible.clone()))
        );
        assert_eq!(
            engine.filter_comments(Comments::Single(None)).unwrap(),
            Comments::Single(None)
        );
        assert_eq!(
            engine
                .filter_comments(Comments::List(vec![hidden, visible.clone()]))
                .unwrap(),
            Comments::List(vec![visible])
        );
    }
}
