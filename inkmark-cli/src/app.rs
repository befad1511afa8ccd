use inkmark_core::offsets::{char_slice, flattened_text};
use inkmark_core::{
    color_at, Annotation, Gesture, HighlightColor, HighlightConfig, Interaction, KeyValueStore,
    MappedSelection, MarkupTree, Outcome, PromptAnchor, PromptSurface, Reconciler, RenderedMarkup,
    SelectionCandidate, Session, TextRange, TextTree,
};

use crate::cursor::CursorState;
use crate::io::LoadedDocument;

/// Application mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Visual,
    Help,
}

/// Prompt currently on screen
#[derive(Debug, Clone, PartialEq)]
pub enum Prompt {
    Color { text: String },
    Remove { text: String, color: HighlightColor },
}

/// Prompt surface backed by a popup slot the UI draws
#[derive(Debug, Default)]
pub struct TuiPrompts {
    pub active: Option<Prompt>,
}

impl PromptSurface for TuiPrompts {
    fn show_color_prompt(&mut self, candidate: &SelectionCandidate) {
        self.active = Some(Prompt::Color {
            text: candidate.text.clone(),
        });
    }

    fn show_removal_prompt(&mut self, _anchor: PromptAnchor, annotation: &Annotation) {
        self.active = Some(Prompt::Remove {
            text: annotation.source_text.clone(),
            color: annotation.color,
        });
    }

    fn hide_prompts(&mut self) {
        self.active = None;
    }
}

/// Reader state over one loaded document
pub struct App<S: KeyValueStore> {
    pub title: String,
    pub markup: String,
    tree: MarkupTree,
    pub containers: Vec<String>,
    pub current: usize,
    container_text: String,

    pub cursor: CursorState,
    pub mode: Mode,
    pub running: bool,

    /// Offset where visual selection started
    pub selection_start: Option<usize>,
    /// Index into the current container's highlights
    pub highlight_selected: usize,

    pub session: Session<S>,
    interaction: Interaction,
    pub prompts: TuiPrompts,
    reconciler: Reconciler,

    pub status_message: Option<String>,
}

impl<S: KeyValueStore> App<S> {
    pub fn new(
        document: LoadedDocument,
        session: Session<S>,
        config: HighlightConfig,
    ) -> inkmark_core::Result<Self> {
        let tree = MarkupTree::parse(&document.markup, &config)?;
        let containers = tree.container_ids();

        let mut app = Self {
            title: document.title,
            markup: document.markup,
            tree,
            containers,
            current: 0,
            container_text: String::new(),
            cursor: CursorState::new(),
            mode: Mode::Normal,
            running: true,
            selection_start: None,
            highlight_selected: 0,
            session,
            interaction: Interaction::new(),
            prompts: TuiPrompts::default(),
            reconciler: Reconciler::new(config),
            status_message: None,
        };
        app.load_container(0);
        Ok(app)
    }

    fn load_container(&mut self, index: usize) {
        self.current = index;
        self.container_text = self
            .current_container()
            .and_then(|id| self.tree.find_container(id))
            .map(|node| flattened_text(&self.tree, &node))
            .unwrap_or_default();
        self.cursor.set_content(&self.container_text);
        self.selection_start = None;
        self.highlight_selected = 0;
    }

    pub fn current_container(&self) -> Option<&str> {
        self.containers.get(self.current).map(String::as_str)
    }

    pub fn container_text(&self) -> &str {
        &self.container_text
    }

    /// Highlights of the current container, sorted by start
    pub fn highlights(&self) -> &[Annotation] {
        match self.current_container() {
            Some(id) => self.session.list(id),
            None => &[],
        }
    }

    /// Highlight visible at a char offset of the current container
    pub fn highlight_at(&self, offset: usize) -> Option<&Annotation> {
        color_at(self.highlights(), offset)
    }

    pub fn has_prompt(&self) -> bool {
        self.prompts.active.is_some()
    }

    pub fn next_container(&mut self) {
        if self.containers.is_empty() {
            return;
        }
        self.dismiss(Gesture::OutsideClick);
        self.load_container((self.current + 1) % self.containers.len());
    }

    pub fn prev_container(&mut self) {
        if self.containers.is_empty() {
            return;
        }
        self.dismiss(Gesture::OutsideClick);
        let len = self.containers.len();
        self.load_container((self.current + len - 1) % len);
    }

    pub fn enter_visual_mode(&mut self) {
        self.mode = Mode::Visual;
        self.selection_start = Some(self.cursor.offset());
    }

    pub fn cancel_visual_mode(&mut self) {
        self.mode = Mode::Normal;
        self.selection_start = None;
    }

    /// Selected offsets while in visual mode
    pub fn selection_range(&self) -> Option<(usize, usize)> {
        if self.mode != Mode::Visual {
            return None;
        }
        let start = self.selection_start?;
        let end = self.cursor.offset();
        Some((start.min(end), start.max(end)))
    }

    fn anchor(&self) -> PromptAnchor {
        let (row, col) = self.cursor.cursor();
        PromptAnchor::new(col as f64, row as f64)
    }

    /// End the visual selection; a non-empty one opens the color prompt
    pub fn finish_selection(&mut self) -> Outcome {
        let selection = self.selection_range().and_then(|(start, end)| {
            (start < end).then(|| MappedSelection {
                range: TextRange::new(start, end),
                text: char_slice(&self.container_text, start, end),
            })
        });
        self.cancel_visual_mode();

        let Some(container_id) = self.current_container().map(str::to_string) else {
            return Outcome::Unchanged;
        };
        let gesture = Gesture::SelectionEnd {
            container_id,
            selection,
            anchor: self.anchor(),
        };
        let outcome = self.handle(gesture);
        if outcome == Outcome::Unchanged {
            self.set_status("Empty selection");
        }
        outcome
    }

    pub fn pick_color(&mut self, color: HighlightColor) -> Outcome {
        let outcome = self.handle(Gesture::ColorPick(color));
        if let Outcome::Committed(annotation) = &outcome {
            let msg = format!(
                "Highlighted {} chars {}",
                annotation.range.len(),
                annotation.color
            );
            self.set_status(&msg);
        }
        outcome
    }

    pub fn pick_active_color(&mut self) -> Outcome {
        self.pick_color(self.session.active_color())
    }

    /// Open the removal prompt for the highlight under the cursor
    pub fn start_removal(&mut self) -> Outcome {
        let offset = self.cursor.offset();
        let Some(container_id) = self.current_container().map(str::to_string) else {
            return Outcome::Unchanged;
        };
        let Some(annotation_id) = self.highlight_at(offset).map(|a| a.id) else {
            self.set_status("No highlight under cursor");
            return Outcome::Unchanged;
        };
        let gesture = Gesture::AnnotationClick {
            container_id,
            annotation_id,
            anchor: self.anchor(),
        };
        self.handle(gesture)
    }

    pub fn confirm_removal(&mut self) -> Outcome {
        let outcome = self.handle(Gesture::ConfirmRemove);
        if let Outcome::Removed(annotation) = &outcome {
            let msg = format!("Removed \"{}\"", preview(&annotation.source_text, 20));
            self.set_status(&msg);
        }
        outcome
    }

    /// Close any prompt with `gesture` (cancel, escape, scroll or outside click)
    pub fn dismiss(&mut self, gesture: Gesture) -> Outcome {
        self.handle(gesture)
    }

    fn handle(&mut self, gesture: Gesture) -> Outcome {
        let outcome = self
            .interaction
            .handle(&mut self.session, &mut self.prompts, gesture);
        if outcome.changed_annotations() {
            self.clamp_highlight_selection();
        }
        outcome
    }

    pub fn toggle_active_color(&mut self) {
        let next = match self.session.active_color() {
            HighlightColor::Yellow => HighlightColor::Green,
            HighlightColor::Green => HighlightColor::Yellow,
        };
        self.session.set_active_color(next);
        self.set_status(&format!("Active color: {}", next));
    }

    pub fn clear_container(&mut self) {
        let Some(container_id) = self.current_container().map(str::to_string) else {
            return;
        };
        self.dismiss(Gesture::Cancel);
        self.session.clear_container(&container_id);
        self.highlight_selected = 0;
        self.set_status(&format!("Cleared highlights in {}", container_id));
    }

    pub fn next_highlight(&mut self) {
        let count = self.highlights().len();
        if count > 0 {
            self.highlight_selected = (self.highlight_selected + 1) % count;
            self.jump_to_selected_highlight();
        }
    }

    pub fn prev_highlight(&mut self) {
        let count = self.highlights().len();
        if count > 0 {
            self.highlight_selected = if self.highlight_selected == 0 {
                count - 1
            } else {
                self.highlight_selected - 1
            };
            self.jump_to_selected_highlight();
        }
    }

    fn jump_to_selected_highlight(&mut self) {
        if let Some(offset) = self
            .highlights()
            .get(self.highlight_selected)
            .map(Annotation::start_offset)
        {
            self.cursor.set_cursor_offset(offset);
        }
    }

    fn clamp_highlight_selection(&mut self) {
        let count = self.highlights().len();
        if self.highlight_selected >= count {
            self.highlight_selected = count.saturating_sub(1);
        }
    }

    /// Source markup with every container's highlights applied
    pub fn render_highlighted(&self) -> inkmark_core::Result<RenderedMarkup> {
        self.reconciler.render_markup_all(&self.markup, &self.session)
    }

    pub fn set_status(&mut self, msg: &str) {
        self.status_message = Some(msg.to_string());
    }

    pub fn clear_status(&mut self) {
        self.status_message = None;
    }

    /// Content lines for rendering
    pub fn content_lines(&self) -> Vec<&str> {
        self.container_text.split('\n').collect()
    }
}

/// First `max` chars of `text` on one line
pub fn preview(text: &str, max: usize) -> String {
    let flat = text.replace('\n', " ");
    if flat.chars().count() > max {
        format!("{}...", flat.chars().take(max).collect::<String>())
    } else {
        flat
    }
}
