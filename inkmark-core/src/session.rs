//! Annotation store scoped to one session key.
//!
//! A [`Session`] is the explicit context object every call site receives.
//! Two sessions opened under different keys share nothing, even over the
//! same backing store. Every mutation writes the whole session record before
//! returning; a failed write leaves memory authoritative and is retried on
//! the next mutation.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::error::{HighlightError, Result};
use crate::merge::{color_at, merge};
use crate::model::{Annotation, HighlightColor, TextRange};
use crate::offsets::{resolve_selection, TreeRange};
use crate::persist;
use crate::storage::{KeyValueStore, StorageError};
use crate::tree::TextTree;

/// Mutable state of a session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub annotations_by_container: BTreeMap<String, Vec<Annotation>>,
    pub active_color: HighlightColor,
}

impl SessionState {
    pub fn new(active_color: HighlightColor) -> Self {
        Self {
            annotations_by_container: BTreeMap::new(),
            active_color,
        }
    }
}

pub struct Session<S: KeyValueStore> {
    key: String,
    store_key: String,
    store: S,
    state: SessionState,
    pending_write: bool,
}

impl<S: KeyValueStore> Session<S> {
    pub fn open(store: S, key: &str) -> Self {
        Self::open_with(store, key, &SessionConfig::default())
    }

    /// Load the record stored under `key`, or start empty
    pub fn open_with(store: S, key: &str, config: &SessionConfig) -> Self {
        let store_key = config.store_key(key);
        let state = match store.get(&store_key) {
            Ok(Some(json)) => match persist::from_json(&json) {
                Ok(state) => state,
                Err(e) => {
                    warn!(session = key, error = %e, "discarding unreadable session record");
                    SessionState::new(config.default_color)
                }
            },
            Ok(None) => SessionState::new(config.default_color),
            Err(e) => {
                warn!(session = key, error = %e, "session store unavailable, starting empty");
                SessionState::new(config.default_color)
            }
        };

        info!(
            session = key,
            containers = state.annotations_by_container.len(),
            "opened highlight session"
        );

        Self {
            key: key.to_string(),
            store_key,
            store,
            state,
            pending_write: false,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn active_color(&self) -> HighlightColor {
        self.state.active_color
    }

    pub fn set_active_color(&mut self, color: HighlightColor) {
        if self.state.active_color != color {
            self.state.active_color = color;
            self.persist();
        }
    }

    /// Add a highlight and merge it into the container's set.
    ///
    /// Returns the annotation that now covers the range, which is a merged
    /// one when the new range overlapped or touched a same-color highlight.
    /// An empty range is a no-op.
    pub fn add(
        &mut self,
        container_id: &str,
        start_offset: usize,
        end_offset: usize,
        color: HighlightColor,
        text: &str,
    ) -> Option<Annotation> {
        if start_offset >= end_offset {
            debug!(container = container_id, start_offset, end_offset, "ignoring empty highlight");
            return None;
        }

        let range = TextRange::new(start_offset, end_offset);
        let annotation = Annotation::new(container_id, range, color, text);
        debug!(container = container_id, id = %annotation.id, ?range, %color, "adding highlight");

        let list = self
            .state
            .annotations_by_container
            .entry(container_id.to_string())
            .or_default();
        let mut all = std::mem::take(list);
        all.push(annotation);
        *list = merge(all);

        let result = list
            .iter()
            .find(|a| {
                a.color == color
                    && a.range.start_offset <= start_offset
                    && end_offset <= a.range.end_offset
            })
            .cloned();
        self.persist();
        result
    }

    /// Host-facing add: map a live selection and add it with `color`, or the
    /// active color when none is given
    pub fn add_selection<T: TextTree>(
        &mut self,
        tree: &T,
        container_id: &str,
        range: &TreeRange<T::Node>,
        color: Option<HighlightColor>,
    ) -> Result<Annotation> {
        let container = tree.find_container(container_id).ok_or_else(|| {
            debug!(container = container_id, "container not rendered, skipping highlight");
            HighlightError::ContainerNotFound(container_id.to_string())
        })?;
        let selection = resolve_selection(tree, &container, range)?;
        let color = color.unwrap_or(self.state.active_color);

        self.add(
            container_id,
            selection.range.start_offset,
            selection.range.end_offset,
            color,
            &selection.text,
        )
        .ok_or(HighlightError::EmptySelection)
    }

    /// Remove a highlight by id; unknown ids are ignored
    pub fn remove(&mut self, container_id: &str, id: Uuid) -> Option<Annotation> {
        let list = self.state.annotations_by_container.get_mut(container_id)?;
        let Some(index) = list.iter().position(|a| a.id == id) else {
            debug!(container = container_id, %id, "no highlight to remove");
            return None;
        };
        let removed = list.remove(index);
        if list.is_empty() {
            self.state.annotations_by_container.remove(container_id);
        }
        debug!(container = container_id, %id, "removed highlight");
        self.persist();
        Some(removed)
    }

    pub fn clear_container(&mut self, container_id: &str) {
        if self
            .state
            .annotations_by_container
            .remove(container_id)
            .is_some()
        {
            info!(session = %self.key, container = container_id, "cleared container highlights");
        }
        self.persist();
    }

    pub fn clear_all(&mut self) {
        self.state.annotations_by_container.clear();
        info!(session = %self.key, "cleared all highlights");
        self.persist();
    }

    /// Highlights of a container, sorted by start offset
    pub fn list(&self, container_id: &str) -> &[Annotation] {
        self.state
            .annotations_by_container
            .get(container_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn container_ids(&self) -> impl Iterator<Item = &str> {
        self.state.annotations_by_container.keys().map(String::as_str)
    }

    pub fn find(&self, container_id: &str, id: Uuid) -> Option<&Annotation> {
        self.list(container_id).iter().find(|a| a.id == id)
    }

    /// The highlight a reader sees at `offset`
    pub fn annotation_at(&self, container_id: &str, offset: usize) -> Option<&Annotation> {
        color_at(self.list(container_id), offset)
    }

    pub fn has_pending_write(&self) -> bool {
        self.pending_write
    }

    /// Write the current state now, reporting failure to the caller
    pub fn flush(&mut self) -> std::result::Result<(), StorageError> {
        let json = persist::to_json(&self.state)
            .map_err(|e| StorageError::Unavailable(format!("encode failed: {e}")))?;
        self.store.set(&self.store_key, &json)?;
        self.pending_write = false;
        Ok(())
    }

    fn persist(&mut self) {
        if let Err(e) = self.flush() {
            warn!(session = %self.key, error = %e, "highlight write failed, will retry on next change");
            self.pending_write = true;
        }
    }
}
