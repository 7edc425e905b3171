//! Test harness wiring an [`EditorController`] the way a host window would.
//!
//! Pointer helpers take canvas coordinates and convert them to window
//! coordinates, so tests read in the same space as node positions.

#![allow(dead_code)]

use super::CallbackTracker;
use serde_json::Value;
use slint::{Color, Model, SharedString, VecModel};
use slint_graph_connect::{
    ConnectorId, EditorConfig, EditorController, EditorEvent, NodeId, PinRef, PinSpec, Point,
    PointerEvent, SimpleNodeType, TypeRegistry,
};
use std::rc::Rc;
use std::time::Instant;

/// Row type of the bound connector model.
#[derive(Debug, Clone, PartialEq)]
pub struct PathRow {
    pub id: i32,
    pub commands: SharedString,
    pub color: Color,
    pub width: f32,
}

/// Node types used across the integration tests.
///
/// - `Source`: one output
/// - `Sink`: one input, records what it receives
/// - `Pass`: one input then one output, records what it receives
pub fn registry() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    registry
        .register(
            SimpleNodeType::new("Source")
                .with_pins(vec![PinSpec::output().with_tag("out")])
                .with_tooltip("Emits values"),
        )
        .unwrap();
    registry
        .register(
            SimpleNodeType::new("Sink")
                .with_pins(vec![PinSpec::input().with_tag("in")])
                .receiving(),
        )
        .unwrap();
    registry
        .register(
            SimpleNodeType::new("Pass")
                .with_pins(vec![PinSpec::input(), PinSpec::output()])
                .receiving(),
        )
        .unwrap();
    registry
}

pub struct EditorHarness {
    pub ctrl: EditorController,
    pub paths: Rc<VecModel<PathRow>>,
    pub tracker: CallbackTracker,
}

impl EditorHarness {
    pub fn new() -> Self {
        Self::with_config(EditorConfig::default())
    }

    pub fn with_config(config: EditorConfig) -> Self {
        Self::with_registry(registry(), config)
    }

    pub fn with_registry(registry: TypeRegistry, config: EditorConfig) -> Self {
        let ctrl = EditorController::new(registry, config).unwrap();
        let paths = Rc::new(VecModel::<PathRow>::default());
        ctrl.bind_paths(paths.clone(), |id, commands, color, width| PathRow {
            id,
            commands,
            color,
            width,
        });
        Self {
            ctrl,
            paths,
            tracker: CallbackTracker::new(),
        }
    }

    /// Source at (0, 0) and Sink at (300, 0).
    pub fn with_pair() -> (Self, NodeId, NodeId) {
        let h = Self::new();
        let a = h.add("Source", 0.0, 0.0);
        let b = h.add("Sink", 300.0, 0.0);
        (h, a, b)
    }

    pub fn add(&self, type_name: &str, x: f32, y: f32) -> NodeId {
        self.ctrl.editor_mut().add_node(type_name, Point::new(x, y)).unwrap()
    }

    // === Coordinates ===

    /// Window coordinates of a canvas point.
    pub fn window(&self, x: f32, y: f32) -> (f32, f32) {
        let editor = self.ctrl.editor();
        let origin = editor.canvas_origin();
        let zoom = editor.config().zoom;
        (origin.x + x * zoom, origin.y + y * zoom)
    }

    /// Canvas center of a pin box.
    pub fn pin_center(&self, pin: &PinRef) -> Point {
        let rect = self.ctrl.editor().graph().pin_rect(pin).unwrap();
        Point::new(
            rect.origin.x + rect.size.width / 2.0,
            rect.origin.y + rect.size.height / 2.0,
        )
    }

    /// A point on a node's header strip.
    pub fn header(&self, id: &NodeId) -> Point {
        let position = self.ctrl.editor().graph().node(id).unwrap().position();
        position.offset(10.0, 5.0)
    }

    pub fn position(&self, id: &NodeId) -> Point {
        self.ctrl.editor().graph().node(id).unwrap().position()
    }

    // === Pointer simulation (canvas coordinates) ===

    pub fn press(&self, p: Point) -> bool {
        let (x, y) = self.window(p.x, p.y);
        self.ctrl.pointer_pressed(PointerEvent::mouse(x, y))
    }

    pub fn move_to(&self, p: Point) -> bool {
        let (x, y) = self.window(p.x, p.y);
        self.ctrl.pointer_moved(PointerEvent::mouse(x, y))
    }

    pub fn release(&self, p: Point) -> Option<EditorEvent> {
        let (x, y) = self.window(p.x, p.y);
        let event = self.ctrl.pointer_released(PointerEvent::mouse(x, y));
        if let Some(event) = &event {
            self.tracker.record(event);
        }
        event
    }

    /// Press on `from`, move halfway, release on `to`.
    pub fn drag_between(&self, from: Point, to: Point) -> Option<EditorEvent> {
        self.press(from);
        self.move_to(Point::new((from.x + to.x) / 2.0, (from.y + to.y) / 2.0));
        self.move_to(to);
        self.release(to)
    }

    /// Drag a connector from one pin to another.
    pub fn connect(&self, from: &PinRef, to: &PinRef) -> Option<EditorEvent> {
        self.drag_between(self.pin_center(from), self.pin_center(to))
    }

    /// Drag a node by its header.
    pub fn drag_node(&self, id: &NodeId, dx: f32, dy: f32) -> Option<EditorEvent> {
        let start = self.header(id);
        self.drag_between(start, start.offset(dx, dy))
    }

    // === Palette (window coordinates; the palette is not part of the canvas) ===

    pub fn palette_press(&self, x: f32, y: f32) -> bool {
        self.ctrl.pointer_pressed(PointerEvent::mouse(x, y))
    }

    pub fn palette_drop(&self, x: f32, y: f32) -> Option<EditorEvent> {
        self.ctrl.pointer_moved(PointerEvent::mouse(x, y));
        let event = self.ctrl.pointer_released(PointerEvent::mouse(x, y));
        if let Some(event) = &event {
            self.tracker.record(event);
        }
        event
    }

    // === Keyboard and focus ===

    pub fn escape(&self) -> bool {
        (self.ctrl.key_pressed_callback())(SharedString::from("\u{1b}"))
    }

    pub fn key(&self, text: &str) -> bool {
        (self.ctrl.key_pressed_callback())(SharedString::from(text))
    }

    pub fn blur(&self) {
        (self.ctrl.focus_lost_callback())()
    }

    pub fn tick(&self, now: Instant) {
        if let Some(outcome) = self.ctrl.tick(now) {
            self.tracker.record_outcome(&outcome);
        }
    }

    // === Inspection ===

    pub fn connector_count(&self) -> usize {
        self.ctrl.editor().graph().connector_count()
    }

    pub fn node_count(&self) -> usize {
        self.ctrl.editor().graph().node_count()
    }

    pub fn is_idle(&self) -> bool {
        self.ctrl.editor().is_idle()
    }

    pub fn is_consistent(&self) -> bool {
        self.ctrl.editor().graph().is_consistent()
    }

    /// Path commands of a connector as the bound model shows them.
    pub fn path_row(&self, id: ConnectorId) -> Option<PathRow> {
        self.paths.iter().find(|row| row.id as u64 == id.0)
    }

    pub fn first_connector(&self) -> Option<ConnectorId> {
        self.ctrl.editor().graph().connectors().next().map(|c| c.id())
    }

    /// JSON payload of a node created from a [`SimpleNodeType`].
    pub fn payload(&self, id: &NodeId) -> Value {
        self.ctrl
            .editor()
            .graph()
            .node(id)
            .and_then(|n| n.payload().downcast_ref::<Value>().cloned())
            .unwrap_or(Value::Null)
    }
}
