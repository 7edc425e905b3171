//! The editor: one canvas with its graph, routed paths and gestures.
//!
//! [`GraphEditor`] owns everything a canvas needs and dispatches raw pointer,
//! key and focus events to the right gesture:
//!
//! - pointer-down on a pin starts a connection drag;
//! - on a node header, a node drag through that node's [`Draggable`];
//! - on a close button, a close that fires if released on the same button;
//! - on a palette entry, a palette drag that creates a node when dropped on
//!   the canvas.
//!
//! Only one gesture runs at a time. Pointer events use window coordinates;
//! the canvas starts at [`canvas_origin`](GraphEditor::canvas_origin), to the
//! right of the palette column.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{debug, warn};

use crate::config::EditorConfig;
use crate::drag::{DragElement, DragOptions, Draggable, Limit, PointerEvent};
use crate::error::{EditorError, Result};
use crate::geometry::{Point, Size};
use crate::graph::{Delivery, Graph, Node, NodeId, PinRef};
use crate::hit_test::{element_at, HitTarget, NodeChrome};
use crate::interaction::{ConnectionDrag, ConnectionOutcome, ConnectionState};
use crate::links::ConnectorPaths;
use crate::node_type::TypeRegistry;
use crate::palette::Palette;
use crate::persistence::{deserialize, serialize, Snapshot};
use crate::store::SaveSlot;

/// Gesture started by a pointer-down.
#[derive(Debug, Clone, PartialEq)]
pub enum Gesture {
    /// Nothing to drag under the pointer, or another gesture is running.
    None,
    Connecting,
    MovingNode(NodeId),
    Closing(NodeId),
    PaletteDrag(String),
}

/// What a finished gesture changed.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    Connection(ConnectionOutcome),
    NodeMoved { id: NodeId, position: Point },
    NodeCreated(NodeId),
    NodeRemoved(NodeId),
}

/// Adapts one graph node to the drag engine.
struct NodeElement<'a> {
    graph: &'a mut Graph,
    id: &'a NodeId,
    zoom: f32,
}

impl DragElement for NodeElement<'_> {
    fn position(&self) -> Point {
        self.graph.node(self.id).map_or(Point::ORIGIN, Node::position)
    }

    fn size(&self) -> Size {
        self.graph.node(self.id).map_or(Size::default(), Node::size)
    }

    fn set_position(&mut self, position: Point) {
        if let Err(err) = self.graph.move_node(self.id, position) {
            warn!(node = %self.id, error = %err, "drag moved a missing node");
        }
    }

    fn z_index(&self) -> Option<i32> {
        self.graph.node(self.id).and_then(Node::z_index)
    }

    fn set_z_index(&mut self, z_index: Option<i32>) {
        self.graph.set_z_index(self.id, z_index);
    }

    fn zoom(&self) -> f32 {
        self.zoom
    }
}

pub struct GraphEditor {
    config: EditorConfig,
    graph: Graph,
    paths: ConnectorPaths,
    draggers: HashMap<NodeId, Draggable>,
    node_drag: Option<NodeId>,
    connection: ConnectionDrag,
    palette: Palette,
    pending_close: Option<NodeId>,
    canvas_origin: Point,
    canvas_size: Option<Size>,
    chrome: NodeChrome,
}

impl std::fmt::Debug for GraphEditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphEditor")
            .field("graph", &self.graph)
            .field("connection", &self.connection)
            .field("node_drag", &self.node_drag)
            .finish_non_exhaustive()
    }
}

impl GraphEditor {
    pub fn new(registry: TypeRegistry, config: EditorConfig) -> Result<Self> {
        config.validate()?;
        let palette = Palette::new(&registry, config.palette_width, config.palette_item_height)?;
        let graph = Graph::new(registry)
            .with_pin_size(config.pin_size)
            .with_default_node_size(config.default_node_size);
        let paths = ConnectorPaths::new(config.route_power)
            .with_style(config.connector_color(), config.connector_width);
        let timeout = config.connection_timeout_ms.map(Duration::from_millis);
        let connection = ConnectionDrag::new(timeout);
        let chrome = NodeChrome {
            header_height: config.header_height,
            close_size: config.close_size,
            pin_slop: 0.0,
        };
        let canvas_origin = Point::new(config.palette_width, 0.0);

        Ok(Self {
            config,
            graph,
            paths,
            draggers: HashMap::new(),
            node_drag: None,
            connection,
            palette,
            pending_close: None,
            canvas_origin,
            canvas_size: None,
            chrome,
        })
    }

    // === Accessors ===

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn paths(&self) -> &ConnectorPaths {
        &self.paths
    }

    /// Mutable access for binding the paths to a host model.
    pub fn paths_mut(&mut self) -> &mut ConnectorPaths {
        &mut self.paths
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn connection_state(&self) -> &ConnectionState {
        self.connection.state()
    }

    pub fn dragger(&self, id: &NodeId) -> Option<&Draggable> {
        self.draggers.get(id)
    }

    pub fn canvas_origin(&self) -> Point {
        self.canvas_origin
    }

    pub fn canvas_size(&self) -> Option<Size> {
        self.canvas_size
    }

    /// No gesture is running.
    pub fn is_idle(&self) -> bool {
        self.connection.is_idle()
            && self.node_drag.is_none()
            && self.pending_close.is_none()
            && !self.palette.is_dragging()
    }

    /// Window coordinates to canvas coordinates.
    pub fn to_canvas(&self, window: Point) -> Point {
        (window - self.canvas_origin) / self.config.zoom
    }

    // === Nodes ===

    /// Place a node of `type_name` at a canvas position.
    pub fn add_node(&mut self, type_name: &str, position: Point) -> Result<NodeId> {
        self.insert_node(type_name, position, None, None)
    }

    /// Place a node with explicit size and/or id.
    pub fn insert_node(
        &mut self,
        type_name: &str,
        position: Point,
        size: Option<Size>,
        id: Option<NodeId>,
    ) -> Result<NodeId> {
        let id = self.graph.create_node(type_name, position, size, id)?;
        let options = self.node_drag_options();
        let zoom = self.config.zoom;
        let mut element = NodeElement { graph: &mut self.graph, id: &id, zoom };
        match Draggable::new(&mut element, options) {
            Ok(dragger) => {
                self.draggers.insert(id.clone(), dragger);
                Ok(id)
            }
            Err(err) => {
                self.graph.destroy_node(&id)?;
                Err(err)
            }
        }
    }

    /// Destroy a node and every connector on its pins.
    pub fn remove_node(&mut self, id: &NodeId) -> Result<()> {
        if !self.graph.contains_node(id) {
            return Err(EditorError::NodeNotFound(id.clone()));
        }
        let touches_drag = self
            .connection
            .active_connector()
            .is_some_and(|c| self.graph.connectors_of_node(id).contains(&c));
        if touches_drag {
            self.connection.cancel(&mut self.graph, &mut self.paths);
        }
        if self.node_drag.as_ref() == Some(id) {
            self.node_drag = None;
        }
        if self.pending_close.as_ref() == Some(id) {
            self.pending_close = None;
        }
        if let Some(mut dragger) = self.draggers.remove(id) {
            let zoom = self.config.zoom;
            dragger.destroy(&mut NodeElement { graph: &mut self.graph, id, zoom });
        }
        let removed = self.graph.destroy_node(id)?;
        self.paths.remove_all(&removed);
        Ok(())
    }

    /// Reposition a node through its drag limit and grid.
    pub fn move_node(&mut self, id: &NodeId, position: Point) -> Result<Point> {
        let zoom = self.config.zoom;
        let dragger = self
            .draggers
            .get_mut(id)
            .ok_or_else(|| EditorError::NodeNotFound(id.clone()))?;
        let mut element = NodeElement { graph: &mut self.graph, id, zoom };
        dragger.set_position(&mut element, position);
        let position = element.position();
        self.paths.update_node(&self.graph, id);
        Ok(position)
    }

    pub fn resize_node(&mut self, id: &NodeId, size: Size) -> Result<()> {
        self.graph.resize_node(id, size)?;
        let options = self.node_drag_options();
        let zoom = self.config.zoom;
        if let Some(dragger) = self.draggers.get_mut(id) {
            dragger.configure(&mut NodeElement { graph: &mut self.graph, id, zoom }, options)?;
        }
        self.paths.update_node(&self.graph, id);
        Ok(())
    }

    /// Fire `value` on an output pin.
    pub fn propagate(&mut self, pin: &PinRef, value: &Value) -> Delivery {
        self.graph.propagate(pin, value)
    }

    // === Canvas ===

    /// Place the canvas in the window and set the extent nodes are kept in.
    ///
    /// `None` leaves nodes unbounded.
    pub fn set_canvas(&mut self, origin: Point, size: Option<Size>) -> Result<()> {
        if let Some(size) = size {
            if !size.is_valid() {
                return Err(EditorError::Config(format!("invalid canvas size {size:?}")));
            }
        }
        self.canvas_origin = origin;
        self.canvas_size = size;
        self.reconfigure_draggers()
    }

    pub fn set_zoom(&mut self, zoom: f32) -> Result<()> {
        if !zoom.is_finite() || zoom <= 0.0 {
            return Err(EditorError::Config(format!("zoom must be positive (got {zoom})")));
        }
        self.config.zoom = zoom;
        Ok(())
    }

    fn node_drag_options(&self) -> DragOptions {
        let limit = self.canvas_size.map_or(Limit::None, Limit::Container);
        DragOptions::default()
            .with_grid(self.config.grid)
            .with_smooth_drag(self.config.smooth_drag)
            .with_threshold(self.config.drag_threshold)
            .with_limit(limit)
    }

    fn reconfigure_draggers(&mut self) -> Result<()> {
        let options = self.node_drag_options();
        let zoom = self.config.zoom;
        for (id, dragger) in self.draggers.iter_mut() {
            let mut element = NodeElement { graph: &mut self.graph, id, zoom };
            dragger.configure(&mut element, options.clone())?;
        }
        Ok(())
    }

    // === Pointer events ===

    /// Resolve what is under a pointer event.
    pub fn hit(&self, event: &PointerEvent) -> HitTarget {
        if let Some(target) = &event.target {
            return target.clone();
        }
        let window = event.position();
        if window.x < self.canvas_origin.x {
            return match self.palette.item_at(window) {
                Some(i) => HitTarget::Palette(self.palette.items()[i].type_name.clone()),
                None => HitTarget::Canvas,
            };
        }
        element_at(&self.graph, self.to_canvas(window), &self.chrome)
    }

    pub fn pointer_down(&mut self, event: &PointerEvent) -> Gesture {
        if !self.is_idle() {
            return Gesture::None;
        }
        match self.hit(event) {
            HitTarget::Pin(pin) => {
                let pointer = self.to_canvas(event.position());
                let started = self
                    .connection
                    .begin(&mut self.graph, &mut self.paths, &pin, pointer, Instant::now());
                if started {
                    Gesture::Connecting
                } else {
                    Gesture::None
                }
            }
            HitTarget::Header(id) => {
                let zoom = self.config.zoom;
                let Some(dragger) = self.draggers.get_mut(&id) else {
                    return Gesture::None;
                };
                let mut element = NodeElement { graph: &mut self.graph, id: &id, zoom };
                let outcome = dragger.pointer_down(&mut element, event);
                if outcome.is_captured() {
                    self.node_drag = Some(id.clone());
                    Gesture::MovingNode(id)
                } else {
                    Gesture::None
                }
            }
            HitTarget::Close(id) => {
                self.pending_close = Some(id.clone());
                Gesture::Closing(id)
            }
            HitTarget::Palette(type_name) => match self.palette.item_named(&type_name) {
                Some(i) if self.palette.press(i, event) => Gesture::PaletteDrag(type_name),
                _ => Gesture::None,
            },
            HitTarget::Node(_) | HitTarget::Canvas => Gesture::None,
        }
    }

    /// Returns `true` if anything moved.
    pub fn pointer_move(&mut self, event: &PointerEvent) -> bool {
        if !self.connection.is_idle() {
            let pointer = self.to_canvas(event.position());
            return self.connection.drag(&self.graph, &mut self.paths, pointer);
        }
        if let Some(id) = self.node_drag.clone() {
            let zoom = self.config.zoom;
            let Some(dragger) = self.draggers.get_mut(&id) else {
                return false;
            };
            let mut element = NodeElement { graph: &mut self.graph, id: &id, zoom };
            let step = dragger.pointer_move(&mut element, event);
            let moved = step.is_some_and(|s| s.moved);
            if moved {
                self.paths.update_node(&self.graph, &id);
            }
            return moved;
        }
        self.palette.drag(event).is_some()
    }

    pub fn pointer_up(&mut self, event: &PointerEvent) -> Option<EditorEvent> {
        if !self.connection.is_idle() {
            let target = self.hit(event);
            let outcome = self.connection.release(&mut self.graph, &mut self.paths, target.pin())?;
            return Some(EditorEvent::Connection(outcome));
        }
        if let Some(id) = self.node_drag.take() {
            let zoom = self.config.zoom;
            let dragger = self.draggers.get_mut(&id)?;
            let mut element = NodeElement { graph: &mut self.graph, id: &id, zoom };
            let release = dragger.pointer_up(&mut element, event)?;
            self.paths.update_node(&self.graph, &id);
            return release.started.then(|| EditorEvent::NodeMoved {
                id,
                position: release.position,
            });
        }
        if let Some(id) = self.pending_close.take() {
            if self.hit(event) == HitTarget::Close(id.clone()) && self.remove_node(&id).is_ok() {
                return Some(EditorEvent::NodeRemoved(id));
            }
            return None;
        }
        if self.palette.is_dragging() {
            let drop = self.palette.release(event)?;
            let position = self.to_canvas(drop.position);
            if position.x < 0.0 {
                debug!(type_name = %drop.type_name, "palette entry dropped outside the canvas");
                return None;
            }
            return match self.add_node(&drop.type_name, position) {
                Ok(id) => Some(EditorEvent::NodeCreated(id)),
                Err(err) => {
                    warn!(error = %err, "palette drop failed");
                    None
                }
            };
        }
        None
    }

    // === Cancellation ===

    /// Abort whatever gesture is running.
    ///
    /// A connection drag is discarded, a node drag stops where it is and a
    /// palette entry goes home. Returns `true` if anything was running.
    pub fn cancel_gestures(&mut self) -> bool {
        let mut cancelled = self.connection.cancel(&mut self.graph, &mut self.paths).is_some();
        if let Some(id) = self.node_drag.take() {
            let zoom = self.config.zoom;
            if let Some(dragger) = self.draggers.get_mut(&id) {
                dragger.cancel(&mut NodeElement { graph: &mut self.graph, id: &id, zoom });
            }
            self.paths.update_node(&self.graph, &id);
            cancelled = true;
        }
        cancelled |= self.pending_close.take().is_some();
        cancelled |= self.palette.cancel();
        if cancelled {
            debug!("gestures cancelled");
        }
        cancelled
    }

    /// A key was pressed; Escape cancels. Returns `true` if the key was used.
    pub fn key_pressed(&mut self, text: &str) -> bool {
        text == "\u{1b}" && self.cancel_gestures()
    }

    /// The canvas lost focus.
    pub fn blur(&mut self) -> bool {
        self.cancel_gestures()
    }

    /// Drive the dead-man timeout of a connection drag.
    pub fn tick(&mut self, now: Instant) -> Option<ConnectionOutcome> {
        self.connection.expire(&mut self.graph, &mut self.paths, now)
    }

    // === Persistence ===

    pub fn snapshot(&self) -> Snapshot {
        serialize(&self.graph)
    }

    /// Replace the graph with a snapshot's contents.
    ///
    /// On error the current graph is kept untouched.
    pub fn restore(&mut self, snapshot: &Snapshot) -> Result<()> {
        let mut graph = deserialize(snapshot, self.graph.registry(), self.config.pin_size)?
            .with_default_node_size(self.config.default_node_size);

        let options = self.node_drag_options();
        let zoom = self.config.zoom;
        let ids: Vec<NodeId> = graph.node_ids().to_vec();
        let mut draggers = HashMap::with_capacity(ids.len());
        for id in ids {
            let mut element = NodeElement { graph: &mut graph, id: &id, zoom };
            let dragger = Draggable::new(&mut element, options.clone())?;
            draggers.insert(id, dragger);
        }

        self.cancel_gestures();
        self.graph = graph;
        self.draggers = draggers;
        self.paths.rebuild(&self.graph);
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        self.snapshot().to_json()
    }

    pub fn load_json(&mut self, text: &str) -> Result<()> {
        let snapshot = Snapshot::from_json(text)?;
        self.restore(&snapshot)
    }

    /// Write the snapshot under the configured save key.
    pub fn save(&self, slot: &mut dyn SaveSlot) -> Result<()> {
        slot.write(&self.config.save_key, self.to_json()?)
    }

    /// Restore from the configured save key. `Ok(false)` if the slot is empty.
    pub fn load(&mut self, slot: &dyn SaveSlot) -> Result<bool> {
        match slot.read(&self.config.save_key)? {
            Some(text) => {
                self.load_json(&text)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Remove every node and connector.
    pub fn clear(&mut self) {
        self.cancel_gestures();
        self.graph.clear();
        self.draggers.clear();
        self.paths.clear();
    }

    /// One line per node with what each pin connects to.
    pub fn describe(&self) -> String {
        self.graph.describe()
    }
}
