use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::merge::merge;
use crate::model::{Annotation, HighlightColor, TextRange};
use crate::session::SessionState;

/// Stored record, one per session key
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSession {
    pub active_color: HighlightColor,
    pub annotations_by_container: BTreeMap<String, Vec<PersistedAnnotation>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
}

/// Annotation as stored; the container id is the map key
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PersistedAnnotation {
    pub id: Uuid,
    pub start_offset: usize,
    pub end_offset: usize,
    pub color: HighlightColor,
    pub text: String,
}

impl From<&Annotation> for PersistedAnnotation {
    fn from(ann: &Annotation) -> Self {
        Self {
            id: ann.id,
            start_offset: ann.range.start_offset,
            end_offset: ann.range.end_offset,
            color: ann.color,
            text: ann.source_text.clone(),
        }
    }
}

impl From<&SessionState> for PersistedSession {
    fn from(state: &SessionState) -> Self {
        Self {
            active_color: state.active_color,
            annotations_by_container: state
                .annotations_by_container
                .iter()
                .filter(|(_, list)| !list.is_empty())
                .map(|(id, list)| (id.clone(), list.iter().map(PersistedAnnotation::from).collect()))
                .collect(),
            saved_at: Some(Utc::now()),
        }
    }
}

impl PersistedSession {
    /// Rebuild in-memory state. Records with an empty range are dropped and
    /// each container is re-merged, so a hand-edited record cannot break the
    /// merge invariant.
    pub fn into_state(self) -> SessionState {
        let annotations_by_container = self
            .annotations_by_container
            .into_iter()
            .map(|(container_id, records)| {
                let annotations: Vec<Annotation> = records
                    .into_iter()
                    .filter(|r| r.start_offset < r.end_offset)
                    .map(|r| Annotation {
                        id: r.id,
                        container_id: container_id.clone(),
                        range: TextRange::new(r.start_offset, r.end_offset),
                        color: r.color,
                        source_text: r.text,
                    })
                    .collect();
                (container_id, merge(annotations))
            })
            .filter(|(_, list)| !list.is_empty())
            .collect();

        SessionState {
            annotations_by_container,
            active_color: self.active_color,
        }
    }
}

pub fn to_json(state: &SessionState) -> Result<String> {
    Ok(serde_json::to_string(&PersistedSession::from(state))?)
}

pub fn from_json(json: &str) -> Result<SessionState> {
    let persisted: PersistedSession = serde_json::from_str(json)?;
    Ok(persisted.into_state())
}
