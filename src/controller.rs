//! Shared handle for wiring a [`GraphEditor`] to Slint callbacks.
//!
//! # Example
//!
//! ```ignore
//! use slint_graph_connect::{EditorConfig, EditorController, FileSlot};
//!
//! slint::include_modules!();
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let window = MainWindow::new()?;
//!     let ctrl = EditorController::new(registry(), EditorConfig::from_file("editor.toml")?)?;
//!
//!     let model = Rc::new(VecModel::<ConnectorPath>::default());
//!     ctrl.bind_paths(model.clone(), |id, commands, color, width| ConnectorPath {
//!         id,
//!         commands,
//!         color,
//!         width,
//!     });
//!     window.set_connectors(ModelRc::from(model));
//!
//!     window.on_pointer_pressed(ctrl.pointer_pressed_callback());
//!     window.on_pointer_moved(ctrl.pointer_moved_callback());
//!     window.on_pointer_released(ctrl.pointer_released_callback());
//!     window.on_key_pressed(ctrl.key_pressed_callback());
//!     window.on_focus_lost(ctrl.focus_lost_callback());
//!     window.on_canvas_changed(ctrl.canvas_changed_callback());
//!
//!     let mut slot = FileSlot::new("saves");
//!     window.on_save({
//!         let ctrl = ctrl.clone();
//!         move || ctrl.save(&mut slot).unwrap_or_else(|e| eprintln!("{e}"))
//!     });
//!
//!     window.run()?;
//!     Ok(())
//! }
//! ```

use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;
use std::time::Instant;

use slint::{Color, SharedString, VecModel};

use crate::config::EditorConfig;
use crate::drag::PointerEvent;
use crate::editor::{EditorEvent, Gesture, GraphEditor};
use crate::error::Result;
use crate::geometry::{Point, Size};
use crate::graph::ConnectorId;
use crate::interaction::ConnectionOutcome;
use crate::node_type::TypeRegistry;
use crate::store::SaveSlot;

/// Cloneable handle to one editor.
///
/// Clone this controller to share it across callbacks.
#[derive(Clone)]
pub struct EditorController {
    editor: Rc<RefCell<GraphEditor>>,
    last_event: Rc<RefCell<Option<EditorEvent>>>,
}

impl EditorController {
    pub fn new(registry: TypeRegistry, config: EditorConfig) -> Result<Self> {
        Ok(Self::from_editor(GraphEditor::new(registry, config)?))
    }

    pub fn from_editor(editor: GraphEditor) -> Self {
        Self {
            editor: Rc::new(RefCell::new(editor)),
            last_event: Rc::new(RefCell::new(None)),
        }
    }

    pub fn editor(&self) -> Ref<'_, GraphEditor> {
        self.editor.borrow()
    }

    pub fn editor_mut(&self) -> RefMut<'_, GraphEditor> {
        self.editor.borrow_mut()
    }

    /// What the last pointer release changed.
    pub fn last_event(&self) -> Option<EditorEvent> {
        self.last_event.borrow().clone()
    }

    /// Mirror connector paths into a Slint model.
    pub fn bind_paths<P, F>(&self, model: Rc<VecModel<P>>, constructor: F)
    where
        P: Clone + 'static,
        F: Fn(i32, SharedString, Color, f32) -> P + 'static,
    {
        self.editor.borrow_mut().paths_mut().bind_model(model, constructor);
    }

    // === Callback factories ===

    /// Returns a callback for `pointer-pressed(x, y)`. Returns `true` when a gesture started.
    pub fn pointer_pressed_callback(&self) -> impl Fn(f32, f32) -> bool {
        let ctrl = self.clone();
        move |x, y| ctrl.pointer_pressed(PointerEvent::mouse(x, y))
    }

    /// Returns a callback for `pointer-moved(x, y)`.
    pub fn pointer_moved_callback(&self) -> impl Fn(f32, f32) {
        let ctrl = self.clone();
        move |x, y| {
            ctrl.pointer_moved(PointerEvent::mouse(x, y));
        }
    }

    /// Returns a callback for `pointer-released(x, y)`.
    pub fn pointer_released_callback(&self) -> impl Fn(f32, f32) {
        let ctrl = self.clone();
        move |x, y| {
            ctrl.pointer_released(PointerEvent::mouse(x, y));
        }
    }

    /// Returns a callback for `key-pressed(text)`.
    pub fn key_pressed_callback(&self) -> impl Fn(SharedString) -> bool {
        let editor = self.editor.clone();
        move |text| editor.borrow_mut().key_pressed(text.as_str())
    }

    /// Returns a callback for `focus-lost()`.
    pub fn focus_lost_callback(&self) -> impl Fn() {
        let editor = self.editor.clone();
        move || {
            editor.borrow_mut().blur();
        }
    }

    /// Returns a callback for `canvas-changed(x, y, width, height)`.
    pub fn canvas_changed_callback(&self) -> impl Fn(f32, f32, f32, f32) {
        let editor = self.editor.clone();
        move |x, y, width, height| {
            let result = editor
                .borrow_mut()
                .set_canvas(Point::new(x, y), Some(Size::new(width, height)));
            if let Err(err) = result {
                tracing::warn!(error = %err, "canvas change rejected");
            }
        }
    }

    /// Returns a callback for `connector-path(id)`.
    pub fn connector_path_callback(&self) -> impl Fn(i32) -> SharedString {
        let editor = self.editor.clone();
        move |id| {
            let Ok(id) = u64::try_from(id) else {
                return SharedString::default();
            };
            editor.borrow().paths().commands(ConnectorId(id)).unwrap_or_default()
        }
    }

    /// Returns a callback for a periodic timer driving connection timeouts.
    pub fn tick_callback(&self) -> impl Fn() {
        let editor = self.editor.clone();
        move || {
            editor.borrow_mut().tick(Instant::now());
        }
    }

    // === Direct handlers ===

    pub fn pointer_pressed(&self, event: PointerEvent) -> bool {
        let gesture = self.editor.borrow_mut().pointer_down(&event);
        gesture != Gesture::None
    }

    pub fn pointer_moved(&self, event: PointerEvent) -> bool {
        self.editor.borrow_mut().pointer_move(&event)
    }

    pub fn pointer_released(&self, event: PointerEvent) -> Option<EditorEvent> {
        let outcome = self.editor.borrow_mut().pointer_up(&event);
        *self.last_event.borrow_mut() = outcome.clone();
        outcome
    }

    pub fn tick(&self, now: Instant) -> Option<ConnectionOutcome> {
        self.editor.borrow_mut().tick(now)
    }

    pub fn save(&self, slot: &mut dyn SaveSlot) -> Result<()> {
        self.editor.borrow().save(slot)
    }

    pub fn load(&self, slot: &dyn SaveSlot) -> Result<bool> {
        self.editor.borrow_mut().load(slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node_type::{PinSpec, SimpleNodeType};
    use crate::store::MemorySlot;

    fn controller() -> EditorController {
        let mut registry = TypeRegistry::new();
        registry
            .register(SimpleNodeType::new("Source").with_pins(vec![PinSpec::output()]))
            .unwrap();
        registry
            .register(SimpleNodeType::new("Sink").with_pins(vec![PinSpec::input()]))
            .unwrap();
        EditorController::new(registry, EditorConfig::default()).unwrap()
    }

    #[test]
    fn test_clones_share_editor() {
        let a = controller();
        let b = a.clone();
        a.editor_mut().add_node("Source", Point::ORIGIN).unwrap();
        assert_eq!(b.editor().graph().node_count(), 1);
    }

    #[test]
    fn test_callbacks_connect_nodes() {
        let ctrl = controller();
        ctrl.editor_mut().add_node("Source", Point::new(0.0, 0.0)).unwrap();
        ctrl.editor_mut().add_node("Sink", Point::new(300.0, 0.0)).unwrap();
        let ox = ctrl.editor().canvas_origin().x;

        let pressed = ctrl.pointer_pressed_callback();
        let moved = ctrl.pointer_moved_callback();
        let released = ctrl.pointer_released_callback();
        assert!(pressed(ox + 105.0, 55.0));
        moved(ox + 200.0, 55.0);
        released(ox + 295.0, 55.0);

        assert!(matches!(ctrl.last_event(), Some(EditorEvent::Connection(o)) if o.is_committed()));
        let path = ctrl.connector_path_callback();
        assert!(path(1).starts_with("M 109 55 Q"));
        assert_eq!(path(-1), SharedString::default());
    }

    #[test]
    fn test_bound_model_receives_rows() {
        use slint::Model;

        let ctrl = controller();
        let model = Rc::new(VecModel::<(i32, SharedString)>::default());
        ctrl.bind_paths(model.clone(), |id, commands, _, _| (id, commands));

        ctrl.editor_mut().add_node("Source", Point::new(0.0, 0.0)).unwrap();
        let ox = ctrl.editor().canvas_origin().x;
        ctrl.pointer_pressed(PointerEvent::mouse(ox + 105.0, 55.0));
        ctrl.pointer_moved(PointerEvent::mouse(ox + 250.0, 80.0));
        assert_eq!(model.row_count(), 1);

        (ctrl.key_pressed_callback())(SharedString::from("\u{1b}"));
        assert_eq!(model.row_count(), 0);
    }

    #[test]
    fn test_focus_lost_cancels() {
        let ctrl = controller();
        ctrl.editor_mut().add_node("Source", Point::new(0.0, 0.0)).unwrap();
        let ox = ctrl.editor().canvas_origin().x;
        ctrl.pointer_pressed(PointerEvent::mouse(ox + 105.0, 55.0));
        (ctrl.focus_lost_callback())();
        assert!(ctrl.editor().is_idle());
        assert_eq!(ctrl.editor().graph().connector_count(), 0);
    }

    #[test]
    fn test_canvas_changed_sets_limit() {
        let ctrl = controller();
        (ctrl.canvas_changed_callback())(150.0, 0.0, 800.0, 600.0);
        assert_eq!(ctrl.editor().canvas_origin(), Point::new(150.0, 0.0));
        assert_eq!(ctrl.editor().canvas_size(), Some(Size::new(800.0, 600.0)));
    }

    #[test]
    fn test_save_and_load() {
        let ctrl = controller();
        let mut slot = MemorySlot::new();
        assert!(!ctrl.load(&slot).unwrap());

        ctrl.editor_mut().add_node("Source", Point::new(10.0, 20.0)).unwrap();
        ctrl.save(&mut slot).unwrap();
        ctrl.editor_mut().clear();
        assert!(ctrl.load(&slot).unwrap());
        assert_eq!(ctrl.editor().graph().node_count(), 1);
    }
}
