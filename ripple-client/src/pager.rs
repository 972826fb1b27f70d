use ripple_types::{Comment, Conversation, Message, Notification, Page, Post, Reel, Story, User};
use std::collections::HashSet;

/// Anything held in a paged list, identified by its primary key.
pub trait Keyed {
    fn key(&self) -> &str;
}

macro_rules! keyed_by_id {
    ($($model:ty),+) => {
        $(impl Keyed for $model {
            fn key(&self) -> &str {
                &self.id
            }
        })+
    };
}

keyed_by_id!(Post, Reel, Story, Comment, Conversation, Message, Notification, User);

/// Cursor-paged list consumer.
///
/// Holds the merged items, the opaque continuation cursor, and the two
/// local safeguards the backend does not provide: a loading flag that
/// makes overlapping load-more calls a no-op, and id-based
/// de-duplication so overlap at page boundaries (or a replayed cursor)
/// never produces duplicate entries.
#[derive(Debug)]
pub struct CursorPager<T> {
    items: Vec<T>,
    seen: HashSet<String>,
    next_cursor: Option<String>,
    loading: bool,
    exhausted: bool,
}

impl<T> Default for CursorPager<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            seen: HashSet::new(),
            next_cursor: None,
            loading: false,
            exhausted: false,
        }
    }
}

impl<T: Keyed> CursorPager<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn items_mut(&mut self) -> &mut Vec<T> {
        &mut self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Claims the next fetch.
    ///
    /// Returns the cursor to send (`None` inside means "first page"),
    /// or `None` when a fetch is already in flight or the list is
    /// exhausted — the caller must then do nothing.
    pub fn begin_load(&mut self) -> Option<Option<String>> {
        if self.loading || self.exhausted {
            return None;
        }
        self.loading = true;
        Some(self.next_cursor.clone())
    }

    /// Merges a fetched page, de-duplicating by key. Absence of a next
    /// cursor marks the list exhausted.
    pub fn complete(&mut self, page: Page<T>) {
        self.loading = false;
        for item in page.items {
            if self.seen.insert(item.key().to_string()) {
                self.items.push(item);
            }
        }
        self.next_cursor = page.next_cursor;
        self.exhausted = self.next_cursor.is_none();
    }

    /// Releases the loading claim after a failed fetch, leaving the
    /// cursor untouched so the same page can be retried.
    pub fn fail(&mut self) {
        self.loading = false;
    }

    /// Drops all items and paging state (pull-to-refresh).
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn get(&self, key: &str) -> Option<&T> {
        self.items.iter().find(|item| item.key() == key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut T> {
        self.items.iter_mut().find(|item| item.key() == key)
    }

    /// Removes an item, returning it with its position so a failed
    /// delete can reinsert it where it was.
    pub fn remove(&mut self, key: &str) -> Option<(usize, T)> {
        let index = self.items.iter().position(|item| item.key() == key)?;
        Some((index, self.items.remove(index)))
    }

    /// Registers a key so later page merges treat it as already held.
    /// Used when an item enters the list outside a page merge (an
    /// optimistic insert, or a temp id swapped for a server id).
    pub fn mark_seen(&mut self, key: &str) {
        self.seen.insert(key.to_string());
    }

    /// Reinserts a previously removed item at its old position,
    /// clamping if the list shrank in the meantime.
    pub fn insert_at(&mut self, index: usize, item: T) {
        self.seen.insert(item.key().to_string());
        let index = index.min(self.items.len());
        self.items.insert(index, item);
    }
}
