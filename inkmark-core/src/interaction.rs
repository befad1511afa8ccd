//! Gesture handling between a host UI and a [`Session`].
//!
//! Highlighting only ever happens through an explicit color pick: finishing
//! a selection opens a color prompt and nothing else. Clicking an existing
//! highlight opens a removal prompt. The two pending states exclude each
//! other; entering one drops the other.

use tracing::debug;
use uuid::Uuid;

use crate::model::{Annotation, HighlightColor, TextRange};
use crate::offsets::MappedSelection;
use crate::session::Session;
use crate::storage::KeyValueStore;

/// Where a host should place a prompt, in its own coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PromptAnchor {
    pub x: f64,
    pub y: f64,
}

impl PromptAnchor {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A finished selection waiting for a color
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionCandidate {
    pub container_id: String,
    pub range: TextRange,
    pub text: String,
    pub anchor: PromptAnchor,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    SelectionPending(SelectionCandidate),
    RemovalPending {
        container_id: String,
        annotation_id: Uuid,
        anchor: PromptAnchor,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Gesture {
    /// A selection finished; `selection` is `None` when it was empty or fell
    /// outside the container
    SelectionEnd {
        container_id: String,
        selection: Option<MappedSelection>,
        anchor: PromptAnchor,
    },
    AnnotationClick {
        container_id: String,
        annotation_id: Uuid,
        anchor: PromptAnchor,
    },
    ColorPick(HighlightColor),
    ConfirmRemove,
    Cancel,
    Escape,
    Scroll,
    OutsideClick,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Unchanged,
    Prompted,
    Committed(Annotation),
    Removed(Annotation),
    Dismissed,
}

impl Outcome {
    /// Whether the host has to re-render highlights
    pub fn changed_annotations(&self) -> bool {
        matches!(self, Outcome::Committed(_) | Outcome::Removed(_))
    }
}

/// Callbacks a host implements to show and hide its prompts
pub trait PromptSurface {
    fn show_color_prompt(&mut self, candidate: &SelectionCandidate);
    fn show_removal_prompt(&mut self, anchor: PromptAnchor, annotation: &Annotation);
    fn hide_prompts(&mut self);
}

/// Prompt surface for headless hosts
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPrompts;

impl PromptSurface for NoPrompts {
    fn show_color_prompt(&mut self, _candidate: &SelectionCandidate) {}
    fn show_removal_prompt(&mut self, _anchor: PromptAnchor, _annotation: &Annotation) {}
    fn hide_prompts(&mut self) {}
}

#[derive(Debug, Default)]
pub struct Interaction {
    state: InteractionState,
}

impl Interaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == InteractionState::Idle
    }

    pub fn pending_selection(&self) -> Option<&SelectionCandidate> {
        match &self.state {
            InteractionState::SelectionPending(candidate) => Some(candidate),
            _ => None,
        }
    }

    pub fn handle<S: KeyValueStore, P: PromptSurface + ?Sized>(
        &mut self,
        session: &mut Session<S>,
        prompts: &mut P,
        gesture: Gesture,
    ) -> Outcome {
        match gesture {
            Gesture::SelectionEnd {
                container_id,
                selection,
                anchor,
            } => {
                let Some(selection) = selection.filter(|s| !s.range.is_empty()) else {
                    return Outcome::Unchanged;
                };
                self.dismiss(prompts);
                let candidate = SelectionCandidate {
                    container_id,
                    range: selection.range,
                    text: selection.text,
                    anchor,
                };
                prompts.show_color_prompt(&candidate);
                self.state = InteractionState::SelectionPending(candidate);
                Outcome::Prompted
            }
            Gesture::AnnotationClick {
                container_id,
                annotation_id,
                anchor,
            } => {
                let Some(annotation) = session.find(&container_id, annotation_id).cloned() else {
                    debug!(container = %container_id, id = %annotation_id, "click on unknown highlight");
                    return Outcome::Unchanged;
                };
                self.dismiss(prompts);
                prompts.show_removal_prompt(anchor, &annotation);
                self.state = InteractionState::RemovalPending {
                    container_id,
                    annotation_id,
                    anchor,
                };
                Outcome::Prompted
            }
            Gesture::ColorPick(color) => {
                // Color picks never act on a passive selection
                let candidate = match std::mem::take(&mut self.state) {
                    InteractionState::SelectionPending(candidate) => candidate,
                    other => {
                        self.state = other;
                        return Outcome::Unchanged;
                    }
                };
                prompts.hide_prompts();
                session.set_active_color(color);
                match session.add(
                    &candidate.container_id,
                    candidate.range.start_offset,
                    candidate.range.end_offset,
                    color,
                    &candidate.text,
                ) {
                    Some(annotation) => Outcome::Committed(annotation),
                    None => Outcome::Dismissed,
                }
            }
            Gesture::ConfirmRemove => {
                let (container_id, annotation_id) = match std::mem::take(&mut self.state) {
                    InteractionState::RemovalPending {
                        container_id,
                        annotation_id,
                        ..
                    } => (container_id, annotation_id),
                    other => {
                        self.state = other;
                        return Outcome::Unchanged;
                    }
                };
                prompts.hide_prompts();
                match session.remove(&container_id, annotation_id) {
                    Some(annotation) => Outcome::Removed(annotation),
                    None => Outcome::Dismissed,
                }
            }
            Gesture::Cancel | Gesture::Escape | Gesture::Scroll | Gesture::OutsideClick => {
                if self.is_idle() {
                    Outcome::Unchanged
                } else {
                    self.dismiss(prompts);
                    Outcome::Dismissed
                }
            }
        }
    }

    fn dismiss<P: PromptSurface + ?Sized>(&mut self, prompts: &mut P) {
        if !self.is_idle() {
            prompts.hide_prompts();
            self.state = InteractionState::Idle;
        }
    }
}
