//! Inkmark Web - browser binding for the highlight engine
//!
//! The host page marks containers with `data-container-id` and forwards
//! selection and click events. Highlights are painted straight into the
//! live DOM and persisted to `localStorage` under the session key.

use js_sys::Function;
use serde::Deserialize;
use tracing::{debug, warn};
use uuid::Uuid;
use wasm_bindgen::prelude::*;
use web_sys::{Element, Node, Window};

use inkmark_core::offsets::TreeRange;
use inkmark_core::{
    map_selection_to_offsets, persist, Annotation, Gesture, HighlightColor, HighlightConfig,
    HighlightError, Interaction, Outcome, PromptAnchor, PromptSurface, ReconcileReport,
    Reconciler, SelectionCandidate, Session, SessionConfig, TextTree,
};

pub mod dom;
pub mod io;

use crate::dom::DomTree;
use crate::io::LocalStorageStore;

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    init_tracing();
}

fn init_tracing() {
    use tracing::subscriber::set_global_default;
    use tracing::Level;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::Registry;

    let console_level = if cfg!(debug_assertions) {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let wasm_layer = tracing_wasm::WASMLayer::new(
        tracing_wasm::WASMLayerConfigBuilder::new()
            .set_max_level(console_level)
            .build(),
    );

    let _ = set_global_default(Registry::default().with(wasm_layer));
}

fn js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn to_js<T: serde::Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(js_error)
}

/// Constructor options; every field is optional
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Options {
    highlight: HighlightConfig,
    session: SessionConfig,
}

/// Prompt surface forwarding to host callbacks
#[derive(Default)]
struct JsPrompts {
    on_color: Option<Function>,
    on_remove: Option<Function>,
    on_hide: Option<Function>,
}

fn notify(callback: &Option<Function>, args: &[JsValue]) {
    let Some(callback) = callback else {
        return;
    };
    let args: js_sys::Array = args.iter().collect();
    if let Err(e) = callback.apply(&JsValue::NULL, &args) {
        warn!(error = ?e, "prompt callback threw");
    }
}

impl PromptSurface for JsPrompts {
    fn show_color_prompt(&mut self, candidate: &SelectionCandidate) {
        notify(
            &self.on_color,
            &[
                JsValue::from_f64(candidate.anchor.x),
                JsValue::from_f64(candidate.anchor.y),
                JsValue::from_str(&candidate.text),
            ],
        );
    }

    fn show_removal_prompt(&mut self, anchor: PromptAnchor, annotation: &Annotation) {
        let annotation = to_js(annotation).unwrap_or(JsValue::NULL);
        notify(
            &self.on_remove,
            &[JsValue::from_f64(anchor.x), JsValue::from_f64(anchor.y), annotation],
        );
    }

    fn hide_prompts(&mut self) {
        notify(&self.on_hide, &[]);
    }
}

/// Highlighter bound to the current page and one session key.
///
/// Prompt callbacks run synchronously inside the gesture methods and must
/// not call back into the highlighter.
#[wasm_bindgen]
pub struct Highlighter {
    window: Window,
    tree: DomTree,
    session: Session<LocalStorageStore>,
    interaction: Interaction,
    prompts: JsPrompts,
    reconciler: Reconciler,
}

#[wasm_bindgen]
impl Highlighter {
    /// Open the session stored under `session_key`. `options` may carry
    /// `highlight` and `session` tables overriding the defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(session_key: &str, options: JsValue) -> Result<Highlighter, JsValue> {
        let options: Options = if options.is_undefined() || options.is_null() {
            Options::default()
        } else {
            serde_wasm_bindgen::from_value(options).map_err(js_error)?
        };

        let window = web_sys::window().ok_or("No window")?;
        let document = window.document().ok_or("No document")?;

        let store = LocalStorageStore::new();
        if !store.is_available() {
            warn!("localStorage unavailable, highlights will not persist");
        }
        let session = Session::open_with(store, session_key, &options.session);

        Ok(Self {
            window,
            tree: DomTree::new(document, options.highlight.clone()),
            session,
            interaction: Interaction::new(),
            prompts: JsPrompts::default(),
            reconciler: Reconciler::new(options.highlight),
        })
    }

    #[wasm_bindgen(js_name = "setPromptCallbacks")]
    pub fn set_prompt_callbacks(&mut self, on_color: Function, on_remove: Function, on_hide: Function) {
        self.prompts = JsPrompts {
            on_color: Some(on_color),
            on_remove: Some(on_remove),
            on_hide: Some(on_hide),
        };
    }

    #[wasm_bindgen(js_name = "activeColor")]
    pub fn active_color(&self) -> String {
        self.session.active_color().to_string()
    }

    #[wasm_bindgen(js_name = "setActiveColor")]
    pub fn set_active_color(&mut self, color: &str) -> Result<(), JsValue> {
        let color: HighlightColor = color.parse().map_err(js_error)?;
        self.session.set_active_color(color);
        Ok(())
    }

    /// Forward a finished selection. Opens the color prompt and returns
    /// `true` when the selection lies inside the container.
    #[wasm_bindgen(js_name = "onSelectionEnd")]
    pub fn on_selection_end(&mut self, container_id: &str, x: f64, y: f64) -> bool {
        let selection = self.tree.find_container(container_id).and_then(|container| {
            let range = self.current_range()?;
            map_selection_to_offsets(&self.tree, &container, &range)
        });
        let gesture = Gesture::SelectionEnd {
            container_id: container_id.to_string(),
            selection,
            anchor: PromptAnchor::new(x, y),
        };
        self.handle(gesture) == Outcome::Prompted
    }

    /// Commit the pending selection with `color`. Returns the resulting
    /// annotation, or `null` when nothing was pending.
    #[wasm_bindgen(js_name = "pickColor")]
    pub fn pick_color(&mut self, color: &str) -> Result<JsValue, JsValue> {
        let color: HighlightColor = color.parse().map_err(js_error)?;
        match self.handle(Gesture::ColorPick(color)) {
            Outcome::Committed(annotation) => {
                self.clear_dom_selection();
                self.refresh(&annotation.container_id);
                to_js(&annotation)
            }
            _ => Ok(JsValue::NULL),
        }
    }

    #[wasm_bindgen(js_name = "onAnnotationClick")]
    pub fn on_annotation_click(&mut self, container_id: &str, annotation_id: &str, x: f64, y: f64) -> bool {
        let Ok(annotation_id) = annotation_id.parse::<Uuid>() else {
            debug!(id = annotation_id, "ignoring click with malformed highlight id");
            return false;
        };
        let gesture = Gesture::AnnotationClick {
            container_id: container_id.to_string(),
            annotation_id,
            anchor: PromptAnchor::new(x, y),
        };
        self.handle(gesture) == Outcome::Prompted
    }

    /// Route a click: on a highlight it opens the removal prompt, anywhere
    /// else it dismisses open prompts
    #[wasm_bindgen(js_name = "onClick")]
    pub fn on_click(&mut self, target: &Element, x: f64, y: f64) -> bool {
        match self.tree.hit_test(target) {
            Some((container_id, annotation_id)) => {
                let gesture = Gesture::AnnotationClick {
                    container_id,
                    annotation_id,
                    anchor: PromptAnchor::new(x, y),
                };
                self.handle(gesture) == Outcome::Prompted
            }
            None => {
                self.handle(Gesture::OutsideClick);
                false
            }
        }
    }

    /// Remove the highlight behind the open removal prompt
    #[wasm_bindgen(js_name = "confirmRemove")]
    pub fn confirm_remove(&mut self) -> Result<JsValue, JsValue> {
        match self.handle(Gesture::ConfirmRemove) {
            Outcome::Removed(annotation) => {
                self.refresh(&annotation.container_id);
                to_js(&annotation)
            }
            _ => Ok(JsValue::NULL),
        }
    }

    pub fn cancel(&mut self) -> bool {
        self.handle(Gesture::Cancel) == Outcome::Dismissed
    }

    pub fn escape(&mut self) -> bool {
        self.handle(Gesture::Escape) == Outcome::Dismissed
    }

    pub fn scroll(&mut self) -> bool {
        self.handle(Gesture::Scroll) == Outcome::Dismissed
    }

    #[wasm_bindgen(js_name = "outsideClick")]
    pub fn outside_click(&mut self) -> bool {
        self.handle(Gesture::OutsideClick) == Outcome::Dismissed
    }

    /// Highlight the current selection directly with `color`, or the active
    /// color when omitted
    #[wasm_bindgen(js_name = "addSelection")]
    pub fn add_selection(&mut self, container_id: &str, color: Option<String>) -> Result<JsValue, JsValue> {
        let color = color
            .map(|c| c.parse::<HighlightColor>())
            .transpose()
            .map_err(js_error)?;
        let Some(range) = self.current_range() else {
            return Ok(JsValue::NULL);
        };
        match self.session.add_selection(&self.tree, container_id, &range, color) {
            Ok(annotation) => {
                self.clear_dom_selection();
                self.refresh(container_id);
                to_js(&annotation)
            }
            Err(
                HighlightError::EmptySelection
                | HighlightError::SelectionOutOfContainer
                | HighlightError::ContainerNotFound(_),
            ) => Ok(JsValue::NULL),
            Err(e) => Err(js_error(e)),
        }
    }

    #[wasm_bindgen(js_name = "removeAnnotation")]
    pub fn remove_annotation(&mut self, container_id: &str, annotation_id: &str) -> Result<JsValue, JsValue> {
        let Ok(id) = annotation_id.parse::<Uuid>() else {
            return Ok(JsValue::NULL);
        };
        match self.session.remove(container_id, id) {
            Some(annotation) => {
                self.refresh(container_id);
                to_js(&annotation)
            }
            None => Ok(JsValue::NULL),
        }
    }

    /// Re-apply highlights after the host re-rendered a container
    pub fn reconcile(&mut self, container_id: &str) -> Result<JsValue, JsValue> {
        match self
            .reconciler
            .reconcile_live(&mut self.tree, container_id, self.session.list(container_id))
        {
            Ok(report) => to_js(&report),
            Err(HighlightError::ContainerNotFound(_)) => Ok(JsValue::NULL),
            Err(e) => Err(js_error(e)),
        }
    }

    /// Reconcile every container present in the page
    #[wasm_bindgen(js_name = "reconcileAll")]
    pub fn reconcile_all(&mut self) -> Result<JsValue, JsValue> {
        let mut total = ReconcileReport::default();
        for container_id in self.tree.container_ids() {
            if let Ok(report) =
                self.reconciler
                    .reconcile_live(&mut self.tree, &container_id, self.session.list(&container_id))
            {
                total.applied += report.applied;
                total.stripped += report.stripped;
                total.skipped.extend(report.skipped);
                total.drifted.extend(report.drifted);
            }
        }
        to_js(&total)
    }

    #[wasm_bindgen(js_name = "clearContainer")]
    pub fn clear_container(&mut self, container_id: &str) {
        self.handle(Gesture::Cancel);
        self.session.clear_container(container_id);
        self.unannotate(container_id);
    }

    #[wasm_bindgen(js_name = "clearAll")]
    pub fn clear_all(&mut self) {
        self.handle(Gesture::Cancel);
        self.session.clear_all();
        for container_id in self.tree.container_ids() {
            self.unannotate(&container_id);
        }
    }

    #[wasm_bindgen(js_name = "listAnnotations")]
    pub fn list_annotations(&self, container_id: &str) -> Result<JsValue, JsValue> {
        to_js(&self.session.list(container_id))
    }

    /// The persisted record as JSON
    #[wasm_bindgen(js_name = "exportJson")]
    pub fn export_json(&self) -> Result<String, JsValue> {
        persist::to_json(self.session.state()).map_err(js_error)
    }

    /// Whether the last write to `localStorage` failed
    #[wasm_bindgen(js_name = "hasPendingWrite")]
    pub fn has_pending_write(&self) -> bool {
        self.session.has_pending_write()
    }
}

impl Highlighter {
    fn handle(&mut self, gesture: Gesture) -> Outcome {
        self.interaction
            .handle(&mut self.session, &mut self.prompts, gesture)
    }

    fn current_range(&self) -> Option<TreeRange<Node>> {
        let selection = self.window.get_selection().ok()??;
        if selection.is_collapsed() || selection.range_count() == 0 {
            return None;
        }
        let range = selection.get_range_at(0).ok()?;
        let start = self
            .tree
            .point(range.start_container().ok()?, range.start_offset().ok()?);
        let end = self
            .tree
            .point(range.end_container().ok()?, range.end_offset().ok()?);
        Some(TreeRange::new(start, end))
    }

    fn clear_dom_selection(&self) {
        if let Ok(Some(selection)) = self.window.get_selection() {
            let _ = selection.remove_all_ranges();
        }
    }

    fn refresh(&mut self, container_id: &str) {
        // Not-rendered containers are logged by the reconciler
        let _ = self
            .reconciler
            .reconcile_live(&mut self.tree, container_id, self.session.list(container_id));
    }

    fn unannotate(&mut self, container_id: &str) {
        if let Some(container) = self.tree.find_container(container_id) {
            self.reconciler.unannotate(&mut self.tree, &container);
        }
    }
}
