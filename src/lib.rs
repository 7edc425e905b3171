//! # Slint Graph Connect
//!
//! A headless engine for node graphs whose boxes are joined by draggable
//! connectors, meant to sit behind a Slint canvas.
//!
//! The host feeds pointer, key and focus events in and reads node positions
//! and SVG path commands out. Everything geometric happens in Rust: pin
//! layout, hit testing, drag limits and grid snapping, connector routing.
//!
//! ## Features
//!
//! - **Typed pins** - Every node type declares its input and output pins; an
//!   output only ever connects to an input, and each pin holds one connector
//! - **Connection drags** - Drag from a pin to start a connector, drop it on a
//!   compatible pin to commit, or drop it anywhere else to discard it
//! - **Node types as traits** - Lifecycle hooks and value delivery live on
//!   [`NodeType`], registered by name in a [`TypeRegistry`]
//! - **Palette** - Registered types are listed in a column and dragged onto
//!   the canvas to create nodes
//! - **Snapshots** - Graphs save to versioned JSON through a [`SaveSlot`]
//!
//! ## Quick Start
//!
//! ```no_run
//! use slint_graph_connect::{
//!     EditorConfig, GraphEditor, PinSpec, Point, PointerEvent, SimpleNodeType, TypeRegistry,
//! };
//!
//! # fn main() -> slint_graph_connect::Result<()> {
//! let mut registry = TypeRegistry::new();
//! registry.register(SimpleNodeType::new("Source").with_pins(vec![PinSpec::output()]))?;
//! registry.register(SimpleNodeType::new("Sink").with_pins(vec![PinSpec::input()]))?;
//!
//! let mut editor = GraphEditor::new(registry, EditorConfig::default())?;
//! editor.add_node("Source", Point::new(0.0, 0.0))?;
//! editor.add_node("Sink", Point::new(300.0, 0.0))?;
//!
//! let o = editor.canvas_origin();
//! editor.pointer_down(&PointerEvent::mouse(o.x + 105.0, 55.0));
//! editor.pointer_move(&PointerEvent::mouse(o.x + 200.0, 55.0));
//! editor.pointer_up(&PointerEvent::mouse(o.x + 295.0, 55.0));
//! assert_eq!(editor.graph().connector_count(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`graph`] - Nodes, pins, connectors and attachment validation
//! - [`drag`] - Pointer-driven dragging with limits, grid and threshold
//! - [`interaction`] - The connection drag state machine
//! - [`path`] - Connector routing
//! - [`links`] - Routed paths per connector, mirrored into a Slint model
//! - [`persistence`] - Snapshots and the legacy import format
//! - [`editor`] - [`GraphEditor`], tying the above to one canvas
//! - [`controller`] - [`EditorController`], a shared handle for Slint callbacks

pub mod config;
pub mod controller;
pub mod drag;
pub mod editor;
pub mod error;
pub mod geometry;
pub mod graph;
pub mod grid;
pub mod interaction;
pub mod layout;
pub mod links;
pub mod node_type;
pub mod palette;
pub mod path;
pub mod persistence;
pub mod store;

pub use config::EditorConfig;
pub use controller::EditorController;
pub use drag::{
    AxisLimit, DragElement, DragOptions, DragRelease, DragStep, Draggable, Limit, PointerEvent,
    PointerSource, PressOutcome, DRAG_Z_INDEX,
};
pub use editor::{EditorEvent, Gesture, GraphEditor};
pub use error::{EditorError, Result};
pub use geometry::{Point, Rect, Size};
pub use graph::{
    Connector, ConnectorId, Delivery, Graph, Node, NodeId, Pin, PinRef, ValidationError,
    ValidationResult,
};
pub use grid::{is_on_grid, snap, snap_point};
pub use hit_test::{element_at, find_pin_at, HitTarget, NodeChrome};
pub use interaction::{ConnectionDrag, ConnectionOutcome, ConnectionState, DiscardReason};
pub use layout::layout_pins;
pub use links::ConnectorPaths;
pub use node_type::{
    NodeType, NodeView, Payload, PinDirection, PinSpec, Role, SimpleNodeType, TypeRegistry,
};
pub use palette::{Palette, PaletteDrop, PaletteItem};
pub use path::{ConnectorPath, ROUTE_POWER};
pub use persistence::{
    deserialize, serialize, ConnectorRecord, LegacySnapshot, NodeRecord, Snapshot,
    SNAPSHOT_VERSION,
};
pub use store::{FileSlot, MemorySlot, SaveSlot};
