//! Node / pin / connector graph model.
//!
//! Nodes live in an arena keyed by [`NodeId`]; they own their pins, and pins
//! refer to connectors by [`ConnectorId`]. Connectors refer back to pins by
//! [`PinRef`]. There are no in-memory pointers between the three, so removing
//! anything is an explicit cleanup over ids.
//!
//! Invariants kept by every mutation:
//!
//! - a pin holds at most one connector;
//! - a connector's source end sits on an output pin and its target end on an
//!   input pin;
//! - pin and connector references always agree in both directions.

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{EditorError, Result};
use crate::geometry::{Point, Rect, Size};
use crate::layout::layout_pins;
use crate::node_type::{NodeType, NodeView, Payload, PinDirection, Role, TypeRegistry};

/// Length of generated node ids.
pub const NODE_ID_LENGTH: usize = 8;

const ID_ALPHABET: [char; 62] = [
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i',
    'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z', 'A', 'B',
    'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R', 'S', 'T', 'U',
    'V', 'W', 'X', 'Y', 'Z',
];

/// Node size used when neither the caller nor the type gives one.
pub const DEFAULT_NODE_SIZE: Size = Size::new(100.0, 100.0);
pub const DEFAULT_PIN_SIZE: Size = Size::new(10.0, 10.0);

/// Identifier of a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// A fresh random id of [`NODE_ID_LENGTH`] alphanumeric characters.
    pub fn generate() -> Self {
        Self(nanoid::nanoid!(NODE_ID_LENGTH, &ID_ALPHABET))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Arena index of a connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectorId(pub u64);

impl fmt::Display for ConnectorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Address of a pin: owning node plus index within the node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PinRef {
    pub node: NodeId,
    pub index: usize,
}

impl PinRef {
    pub fn new(node: impl Into<NodeId>, index: usize) -> Self {
        Self { node: node.into(), index }
    }
}

impl fmt::Display for PinRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.node, self.index)
    }
}

#[derive(Debug, Clone)]
pub struct Pin {
    index: usize,
    direction: PinDirection,
    tag: Option<String>,
    /// Offset of the pin box from the node's top-left corner.
    offset: Point,
    connector: Option<ConnectorId>,
}

impl Pin {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn direction(&self) -> PinDirection {
        self.direction
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn offset(&self) -> Point {
        self.offset
    }

    pub fn connector(&self) -> Option<ConnectorId> {
        self.connector
    }

    pub fn is_occupied(&self) -> bool {
        self.connector.is_some()
    }
}

/// A placed instance of a node type.
pub struct Node {
    id: NodeId,
    type_name: String,
    position: Point,
    size: Size,
    z_index: Option<i32>,
    pins: Vec<Pin>,
    payload: Payload,
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("type_name", &self.type_name)
            .field("position", &self.position)
            .field("size", &self.size)
            .field("pins", &self.pins)
            .finish_non_exhaustive()
    }
}

impl Node {
    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.position, self.size)
    }

    pub fn z_index(&self) -> Option<i32> {
        self.z_index
    }

    pub fn pins(&self) -> &[Pin] {
        &self.pins
    }

    pub fn pin(&self, index: usize) -> Option<&Pin> {
        self.pins.get(index)
    }

    pub fn payload(&self) -> &dyn Any {
        self.payload.as_ref()
    }

    pub fn payload_mut(&mut self) -> &mut dyn Any {
        self.payload.as_mut()
    }

    pub fn view(&self) -> NodeView<'_> {
        NodeView {
            id: &self.id,
            type_name: &self.type_name,
            position: self.position,
            size: self.size,
        }
    }

    fn connectors(&self) -> impl Iterator<Item = ConnectorId> + '_ {
        self.pins.iter().filter_map(|p| p.connector)
    }
}

/// An edge from an output pin (source) to an input pin (target).
///
/// While a connection is being dragged one end may be unbound.
#[derive(Debug, Clone, PartialEq)]
pub struct Connector {
    id: ConnectorId,
    source: Option<PinRef>,
    target: Option<PinRef>,
}

impl Connector {
    pub fn id(&self) -> ConnectorId {
        self.id
    }

    pub fn source(&self) -> Option<&PinRef> {
        self.source.as_ref()
    }

    pub fn target(&self) -> Option<&PinRef> {
        self.target.as_ref()
    }

    pub fn end(&self, role: Role) -> Option<&PinRef> {
        match role {
            Role::Source => self.source.as_ref(),
            Role::Target => self.target.as_ref(),
        }
    }

    /// Both ends bound.
    pub fn is_committed(&self) -> bool {
        self.source.is_some() && self.target.is_some()
    }

    fn end_mut(&mut self, role: Role) -> &mut Option<PinRef> {
        match role {
            Role::Source => &mut self.source,
            Role::Target => &mut self.target,
        }
    }
}

// ============================================================================
// Validation
// ============================================================================

/// Outcome of checking a connector attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    Valid,
    Invalid(ValidationError),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }

    /// Combine two results (AND logic): returns first error if any
    pub fn and(self, other: ValidationResult) -> ValidationResult {
        match self {
            ValidationResult::Valid => other,
            invalid => invalid,
        }
    }

    pub fn error(&self) -> Option<&ValidationError> {
        match self {
            ValidationResult::Valid => None,
            ValidationResult::Invalid(err) => Some(err),
        }
    }
}

/// Reasons an attachment is refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    PinNotFound(PinRef),
    ConnectorNotFound(ConnectorId),
    /// Both ends would sit on the same pin.
    SamePin,
    /// The pin's direction cannot hold this end of a connector.
    IncompatibleDirection { pin: PinRef, role: Role },
    /// The pin already holds a connector.
    PinOccupied(PinRef),
    /// This end of the connector is already bound.
    EndAlreadyBound(Role),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PinNotFound(pin) => write!(f, "Pin {} not found", pin),
            Self::ConnectorNotFound(id) => write!(f, "Connector {} not found", id),
            Self::SamePin => write!(f, "Cannot connect a pin to itself"),
            Self::IncompatibleDirection { pin, role } => {
                write!(f, "Pin {} cannot hold the {:?} end of a connector", pin, role)
            }
            Self::PinOccupied(pin) => write!(f, "Pin {} already holds a connector", pin),
            Self::EndAlreadyBound(role) => write!(f, "{:?} end is already bound", role),
        }
    }
}

/// What happened to a value fired on an output pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    /// The pin has no committed connector.
    NotConnected,
    /// The connected input pin has no receiver.
    NoReceiver,
}

// ============================================================================
// Graph
// ============================================================================

/// The graph of placed nodes and their connectors.
pub struct Graph {
    registry: TypeRegistry,
    nodes: HashMap<NodeId, Node>,
    order: Vec<NodeId>,
    connectors: BTreeMap<ConnectorId, Connector>,
    next_connector: u64,
    pin_size: Size,
    default_node_size: Size,
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("nodes", &self.order)
            .field("connectors", &self.connectors.values().collect::<Vec<_>>())
            .finish()
    }
}

impl Graph {
    pub fn new(registry: TypeRegistry) -> Self {
        Self {
            registry,
            nodes: HashMap::new(),
            order: Vec::new(),
            connectors: BTreeMap::new(),
            next_connector: 1,
            pin_size: DEFAULT_PIN_SIZE,
            default_node_size: DEFAULT_NODE_SIZE,
        }
    }

    pub fn with_pin_size(mut self, pin_size: Size) -> Self {
        self.pin_size = pin_size;
        self
    }

    pub fn with_default_node_size(mut self, size: Size) -> Self {
        self.default_node_size = size;
        self
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn pin_size(&self) -> Size {
        self.pin_size
    }

    // === Queries ===

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Live nodes in creation order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.order.iter().filter_map(move |id| self.nodes.get(id))
    }

    pub fn node_ids(&self) -> &[NodeId] {
        &self.order
    }

    pub fn node_count(&self) -> usize {
        self.order.len()
    }

    pub fn connector(&self, id: ConnectorId) -> Option<&Connector> {
        self.connectors.get(&id)
    }

    /// All connectors, including a half-bound one being dragged, in id order.
    pub fn connectors(&self) -> impl Iterator<Item = &Connector> + '_ {
        self.connectors.values()
    }

    pub fn connector_count(&self) -> usize {
        self.connectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty() && self.connectors.is_empty()
    }

    pub fn pin(&self, pin: &PinRef) -> Option<&Pin> {
        self.nodes.get(&pin.node)?.pins.get(pin.index)
    }

    /// Connectors attached to any pin of the node.
    pub fn connectors_of_node(&self, id: &NodeId) -> Vec<ConnectorId> {
        self.nodes
            .get(id)
            .map(|n| n.connectors().collect())
            .unwrap_or_default()
    }

    /// Canvas rectangle of a pin box.
    pub fn pin_rect(&self, pin: &PinRef) -> Option<Rect> {
        let node = self.nodes.get(&pin.node)?;
        let p = node.pins.get(pin.index)?;
        Some(Rect::new(node.position + p.offset, self.pin_size))
    }

    /// Point where a connector meets the pin.
    ///
    /// Output pins anchor at the right edge of the pin box, input pins at the
    /// left edge, both at the vertical center.
    pub fn anchor(&self, pin: &PinRef) -> Option<Point> {
        let direction = self.pin(pin)?.direction;
        let rect = self.pin_rect(pin)?;
        let x = match direction {
            PinDirection::Output => rect.right(),
            PinDirection::Input => rect.origin.x,
        };
        Some(Point::new(x, rect.origin.y + rect.size.height / 2.0))
    }

    // === Node lifecycle ===

    /// Place a node of a registered type.
    ///
    /// Pins come from the type definition and the type's `make` hook builds the
    /// payload. An explicit id is used verbatim and must not be taken.
    pub fn create_node(
        &mut self,
        type_name: &str,
        position: Point,
        size: Option<Size>,
        explicit_id: Option<NodeId>,
    ) -> Result<NodeId> {
        let node_type = self
            .registry
            .get(type_name)
            .ok_or_else(|| EditorError::UnknownType(type_name.to_string()))?;

        let id = match explicit_id {
            Some(id) if self.nodes.contains_key(&id) => return Err(EditorError::DuplicateNode(id)),
            Some(id) => id,
            None => self.unused_id(),
        };
        let size = size
            .or_else(|| node_type.default_size())
            .unwrap_or(self.default_node_size);

        let specs = node_type.pins();
        let offsets = layout_pins(specs.iter().map(|s| s.direction), size, self.pin_size);
        let pins = specs
            .iter()
            .zip(offsets)
            .enumerate()
            .map(|(index, (spec, offset))| Pin {
                index,
                direction: spec.direction,
                tag: spec.tag.clone(),
                offset,
                connector: None,
            })
            .collect();

        let view = NodeView { id: &id, type_name, position, size };
        let payload = node_type.make(&view);

        let node = Node {
            id: id.clone(),
            type_name: type_name.to_string(),
            position,
            size,
            z_index: None,
            pins,
            payload,
        };
        self.nodes.insert(id.clone(), node);
        self.order.push(id.clone());
        debug!(node = %id, type_name, x = position.x, y = position.y, "node created");
        Ok(id)
    }

    /// Remove a node and every connector attached to its pins.
    ///
    /// Returns the ids of the removed connectors.
    pub fn destroy_node(&mut self, id: &NodeId) -> Result<Vec<ConnectorId>> {
        let attached = self
            .nodes
            .get(id)
            .map(|n| n.connectors().collect::<Vec<_>>())
            .ok_or_else(|| EditorError::NodeNotFound(id.clone()))?;

        for connector in &attached {
            self.detach_connector(*connector);
        }
        self.nodes.remove(id);
        self.order.retain(|n| n != id);
        debug!(node = %id, connectors = attached.len(), "node destroyed");
        debug_assert!(self.is_consistent());
        Ok(attached)
    }

    /// Reposition a node and run its `moved` hook.
    pub fn move_node(&mut self, id: &NodeId, position: Point) -> Result<()> {
        let node_type = self.node_type_of(id)?;
        let node = self.nodes.get_mut(id).ok_or_else(|| EditorError::NodeNotFound(id.clone()))?;
        node.position = position;
        let view = NodeView { id: &node.id, type_name: &node.type_name, position, size: node.size };
        node_type.moved(&view, node.payload.as_mut());
        Ok(())
    }

    /// Resize a node, re-lay its pins and run its `resized` hook.
    pub fn resize_node(&mut self, id: &NodeId, size: Size) -> Result<()> {
        if !size.is_valid() {
            return Err(EditorError::Config(format!("invalid node size {size:?}")));
        }
        let node_type = self.node_type_of(id)?;
        let pin_size = self.pin_size;
        let node = self.nodes.get_mut(id).ok_or_else(|| EditorError::NodeNotFound(id.clone()))?;
        node.size = size;
        let offsets = layout_pins(node.pins.iter().map(|p| p.direction), size, pin_size);
        for (pin, offset) in node.pins.iter_mut().zip(offsets) {
            pin.offset = offset;
        }
        let view = NodeView {
            id: &node.id,
            type_name: &node.type_name,
            position: node.position,
            size,
        };
        node_type.resized(&view, node.payload.as_mut());
        Ok(())
    }

    pub fn set_z_index(&mut self, id: &NodeId, z_index: Option<i32>) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.z_index = z_index;
        }
    }

    /// Run `f` with the node's view and mutable payload.
    pub fn with_payload<R>(
        &mut self,
        id: &NodeId,
        f: impl FnOnce(&NodeView<'_>, &mut dyn Any) -> R,
    ) -> Option<R> {
        let node = self.nodes.get_mut(id)?;
        let view = NodeView {
            id: &node.id,
            type_name: &node.type_name,
            position: node.position,
            size: node.size,
        };
        Some(f(&view, node.payload.as_mut()))
    }

    /// Remove every node and connector.
    pub fn clear(&mut self) {
        self.connectors.clear();
        self.nodes.clear();
        self.order.clear();
        debug!("graph cleared");
    }

    // === Connectors ===

    /// Allocate a connector with no ends bound.
    pub fn create_connector(&mut self) -> ConnectorId {
        let id = ConnectorId(self.next_connector);
        self.next_connector += 1;
        self.connectors.insert(id, Connector { id, source: None, target: None });
        id
    }

    /// Check whether `pin` could take the `role` end of `connector`.
    pub fn validate_attach(
        &self,
        connector: ConnectorId,
        pin: &PinRef,
        role: Role,
    ) -> ValidationResult {
        let Some(c) = self.connectors.get(&connector) else {
            return ValidationResult::Invalid(ValidationError::ConnectorNotFound(connector));
        };
        let Some(p) = self.pin(pin) else {
            return ValidationResult::Invalid(ValidationError::PinNotFound(pin.clone()));
        };
        if c.end(role).is_some() {
            return ValidationResult::Invalid(ValidationError::EndAlreadyBound(role));
        }
        if c.end(role.opposite()) == Some(pin) {
            return ValidationResult::Invalid(ValidationError::SamePin);
        }
        if !p.direction.accepts(role) {
            return ValidationResult::Invalid(ValidationError::IncompatibleDirection {
                pin: pin.clone(),
                role,
            });
        }
        if p.connector.is_some() {
            return ValidationResult::Invalid(ValidationError::PinOccupied(pin.clone()));
        }
        ValidationResult::Valid
    }

    /// Bind the `role` end of `connector` to `pin`.
    ///
    /// Outputs only take the source end and inputs only the target end, and an
    /// occupied pin takes nothing. On rejection the graph is left untouched.
    pub fn attach_connector(
        &mut self,
        connector: ConnectorId,
        pin: &PinRef,
        role: Role,
    ) -> ValidationResult {
        let result = self.validate_attach(connector, pin, role);
        if !result.is_valid() {
            return result;
        }
        if let Some(p) = self.nodes.get_mut(&pin.node).and_then(|n| n.pins.get_mut(pin.index)) {
            p.connector = Some(connector);
        }
        if let Some(c) = self.connectors.get_mut(&connector) {
            *c.end_mut(role) = Some(pin.clone());
        }
        debug_assert!(self.is_consistent());
        result
    }

    /// Unbind one end of a connector, keeping the connector.
    ///
    /// Returns the pin the end was bound to.
    pub fn detach_end(&mut self, connector: ConnectorId, role: Role) -> Option<PinRef> {
        let pin = self.connectors.get_mut(&connector)?.end_mut(role).take()?;
        if let Some(p) = self.nodes.get_mut(&pin.node).and_then(|n| n.pins.get_mut(pin.index)) {
            if p.connector == Some(connector) {
                p.connector = None;
            }
        }
        Some(pin)
    }

    /// Remove a connector from the pins it touches and discard it.
    pub fn detach_connector(&mut self, connector: ConnectorId) -> bool {
        if !self.connectors.contains_key(&connector) {
            return false;
        }
        self.detach_end(connector, Role::Source);
        self.detach_end(connector, Role::Target);
        self.connectors.remove(&connector);
        true
    }

    /// Deliver `value` fired on an output pin to the connected input's receiver.
    pub fn propagate(&mut self, pin: &PinRef, value: &Value) -> Delivery {
        let Some(connector) = self
            .pin(pin)
            .filter(|p| p.direction == PinDirection::Output)
            .and_then(|p| p.connector)
        else {
            return Delivery::NotConnected;
        };
        let Some(target) = self.connectors.get(&connector).and_then(|c| c.target.clone()) else {
            return Delivery::NotConnected;
        };
        let Ok(node_type) = self.node_type_of(&target.node) else {
            return Delivery::NoReceiver;
        };
        let received = self
            .with_payload(&target.node, |view, payload| {
                node_type.receive(view, payload, target.index, value)
            })
            .unwrap_or(false);
        if received {
            Delivery::Delivered
        } else {
            Delivery::NoReceiver
        }
    }

    /// The type definition a node was created from.
    pub fn node_type_of(&self, id: &NodeId) -> Result<Rc<dyn NodeType>> {
        let node = self.nodes.get(id).ok_or_else(|| EditorError::NodeNotFound(id.clone()))?;
        self.registry
            .get(&node.type_name)
            .ok_or_else(|| EditorError::UnknownType(node.type_name.clone()))
    }

    /// Every pin↔connector reference agrees in both directions and every
    /// committed connector joins an output to an input.
    pub fn is_consistent(&self) -> bool {
        for (id, c) in &self.connectors {
            for role in [Role::Source, Role::Target] {
                if let Some(pin) = c.end(role) {
                    match self.pin(pin) {
                        Some(p) if p.connector == Some(*id) && p.direction.accepts(role) => {}
                        _ => return false,
                    }
                }
            }
        }
        self.nodes.values().all(|n| {
            n.pins.iter().all(|p| match p.connector {
                None => true,
                Some(cid) => self
                    .connectors
                    .get(&cid)
                    .and_then(|c| c.end(p.direction.role()))
                    .is_some_and(|end| end.node == n.id && end.index == p.index),
            })
        })
    }

    /// Human-readable dump: one line per node listing what each pin connects to.
    ///
    /// `Adder k3J9x0aa 0:(Source 1bC8qQ2z,0) 1:n.c.`
    pub fn describe(&self) -> String {
        let mut out = String::new();
        for node in self.nodes() {
            out.push_str(&format!("{} {}", node.type_name, node.id));
            for pin in &node.pins {
                let other = pin
                    .connector
                    .and_then(|cid| self.connectors.get(&cid))
                    .filter(|c| c.is_committed())
                    .and_then(|c| c.end(pin.direction.role().opposite()))
                    .and_then(|end| self.nodes.get(&end.node).map(|n| (n, end.index)));
                match other {
                    Some((n, index)) => out.push_str(&format!(
                        " {}:({} {},{})",
                        pin.index, n.type_name, n.id, index
                    )),
                    None => out.push_str(&format!(" {}:n.c.", pin.index)),
                }
            }
            out.push('\n');
        }
        debug!(state = %out, "graph state");
        out
    }

    fn unused_id(&self) -> NodeId {
        loop {
            let id = NodeId::generate();
            if !self.nodes.contains_key(&id) {
                return id;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node_type::{PinSpec, SimpleNodeType};
    use serde_json::json;

    /// Registry with a source (one output), a sink (one input) and a
    /// pass-through node (input, output).
    fn registry() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        registry
            .register(SimpleNodeType::new("Source").with_pins(vec![PinSpec::output()]))
            .unwrap();
        registry
            .register(SimpleNodeType::new("Sink").with_pins(vec![PinSpec::input()]).receiving())
            .unwrap();
        registry
            .register(
                SimpleNodeType::new("Pass").with_pins(vec![PinSpec::input(), PinSpec::output()]),
            )
            .unwrap();
        registry
    }

    fn setup() -> (Graph, NodeId, NodeId) {
        let mut graph = Graph::new(registry());
        let a = graph.create_node("Source", Point::new(0.0, 0.0), None, Some("A".into())).unwrap();
        let b = graph.create_node("Sink", Point::new(300.0, 0.0), None, Some("B".into())).unwrap();
        (graph, a, b)
    }

    fn connect(graph: &mut Graph, source: &PinRef, target: &PinRef) -> ConnectorId {
        let c = graph.create_connector();
        assert!(graph.attach_connector(c, source, Role::Source).is_valid());
        assert!(graph.attach_connector(c, target, Role::Target).is_valid());
        c
    }

    // ========================================================================
    // Node creation
    // ========================================================================

    #[test]
    fn test_create_node_instantiates_pins() {
        let (graph, a, _) = setup();
        let node = graph.node(&a).unwrap();
        assert_eq!(node.type_name(), "Source");
        assert_eq!(node.size(), DEFAULT_NODE_SIZE);
        assert_eq!(node.pins().len(), 1);
        assert_eq!(node.pins()[0].direction(), PinDirection::Output);
        assert_eq!(node.pins()[0].offset(), Point::new(99.0, 50.0));
    }

    #[test]
    fn test_generated_ids_are_eight_chars_and_unique() {
        let mut graph = Graph::new(registry());
        let ids: Vec<NodeId> = (0..50)
            .map(|_| graph.create_node("Source", Point::ORIGIN, None, None).unwrap())
            .collect();
        assert!(ids.iter().all(|id| id.as_str().len() == NODE_ID_LENGTH));
        assert!(ids.iter().all(|id| id.as_str().chars().all(|c| c.is_ascii_alphanumeric())));
        assert_eq!(graph.node_count(), 50);
    }

    #[test]
    fn test_explicit_id_collision_rejected() {
        let (mut graph, a, _) = setup();
        let err = graph.create_node("Sink", Point::ORIGIN, None, Some(a.clone())).unwrap_err();
        assert_eq!(err, EditorError::DuplicateNode(a));
        assert_eq!(graph.node_count(), 2);
    }

    #[test]
    fn test_unknown_type_rejected() {
        let mut graph = Graph::new(registry());
        let err = graph.create_node("Nope", Point::ORIGIN, None, None).unwrap_err();
        assert_eq!(err, EditorError::UnknownType("Nope".into()));
    }

    #[test]
    fn test_size_precedence() {
        let mut registry = registry();
        registry
            .register(SimpleNodeType::new("Wide").with_size(Size::new(200.0, 50.0)))
            .unwrap();
        let mut graph = Graph::new(registry).with_default_node_size(Size::new(60.0, 60.0));

        let typed = graph.create_node("Wide", Point::ORIGIN, None, None).unwrap();
        let explicit = graph
            .create_node("Wide", Point::ORIGIN, Some(Size::new(10.0, 10.0)), None)
            .unwrap();
        let fallback = graph.create_node("Source", Point::ORIGIN, None, None).unwrap();

        assert_eq!(graph.node(&typed).unwrap().size(), Size::new(200.0, 50.0));
        assert_eq!(graph.node(&explicit).unwrap().size(), Size::new(10.0, 10.0));
        assert_eq!(graph.node(&fallback).unwrap().size(), Size::new(60.0, 60.0));
    }

    #[test]
    fn test_nodes_iterate_in_creation_order() {
        let mut graph = Graph::new(registry());
        for id in ["z", "a", "m"] {
            graph.create_node("Source", Point::ORIGIN, None, Some(id.into())).unwrap();
        }
        let ids: Vec<&str> = graph.nodes().map(|n| n.id().as_str()).collect();
        assert_eq!(ids, vec!["z", "a", "m"]);
    }

    // ========================================================================
    // Attach / detach
    // ========================================================================

    #[test]
    fn test_attach_commits_connector() {
        let (mut graph, a, b) = setup();
        let c = connect(&mut graph, &PinRef::new(a.clone(), 0), &PinRef::new(b.clone(), 0));

        let connector = graph.connector(c).unwrap();
        assert!(connector.is_committed());
        assert_eq!(connector.source(), Some(&PinRef::new(a.clone(), 0)));
        assert_eq!(connector.target(), Some(&PinRef::new(b, 0)));
        assert_eq!(graph.pin(&PinRef::new(a, 0)).unwrap().connector(), Some(c));
        assert!(graph.is_consistent());
    }

    #[test]
    fn test_attach_rejects_occupied_pin() {
        let (mut graph, a, b) = setup();
        let out = PinRef::new(a, 0);
        connect(&mut graph, &out, &PinRef::new(b, 0));

        let second = graph.create_connector();
        let result = graph.attach_connector(second, &out, Role::Source);
        assert_eq!(result, ValidationResult::Invalid(ValidationError::PinOccupied(out.clone())));
        assert_eq!(graph.connector(second).unwrap().source(), None);
        assert!(graph.is_consistent());
    }

    #[test]
    fn test_attach_rejects_wrong_direction() {
        let (mut graph, a, b) = setup();
        let c = graph.create_connector();

        let result = graph.attach_connector(c, &PinRef::new(a.clone(), 0), Role::Target);
        assert!(matches!(
            result,
            ValidationResult::Invalid(ValidationError::IncompatibleDirection {
                role: Role::Target,
                ..
            })
        ));
        let result = graph.attach_connector(c, &PinRef::new(b, 0), Role::Source);
        assert!(!result.is_valid());
        assert!(!graph.pin(&PinRef::new(a, 0)).unwrap().is_occupied());
    }

    #[test]
    fn test_two_outputs_cannot_connect() {
        let mut graph = Graph::new(registry());
        let a = graph.create_node("Source", Point::ORIGIN, None, None).unwrap();
        let b = graph.create_node("Source", Point::new(300.0, 0.0), None, None).unwrap();
        let c = graph.create_connector();

        assert!(graph.attach_connector(c, &PinRef::new(a, 0), Role::Source).is_valid());
        assert!(!graph.attach_connector(c, &PinRef::new(b, 0), Role::Target).is_valid());
        assert!(!graph.connector(c).unwrap().is_committed());
    }

    #[test]
    fn test_attach_rejects_bound_end_and_missing_refs() {
        let (mut graph, a, _) = setup();
        let c = graph.create_connector();
        assert!(graph.attach_connector(c, &PinRef::new(a.clone(), 0), Role::Source).is_valid());

        let pass = graph.create_node("Pass", Point::ORIGIN, None, None).unwrap();
        assert_eq!(
            graph.attach_connector(c, &PinRef::new(pass, 1), Role::Source),
            ValidationResult::Invalid(ValidationError::EndAlreadyBound(Role::Source))
        );
        assert_eq!(
            graph.attach_connector(c, &PinRef::new(a.clone(), 7), Role::Target),
            ValidationResult::Invalid(ValidationError::PinNotFound(PinRef::new(a, 7)))
        );
        assert_eq!(
            graph.attach_connector(ConnectorId(999), &PinRef::new("B", 0), Role::Target),
            ValidationResult::Invalid(ValidationError::ConnectorNotFound(ConnectorId(999)))
        );
    }

    #[test]
    fn test_same_node_loop_allowed() {
        let mut graph = Graph::new(registry());
        let p = graph.create_node("Pass", Point::ORIGIN, None, None).unwrap();
        let c = graph.create_connector();
        assert!(graph.attach_connector(c, &PinRef::new(p.clone(), 1), Role::Source).is_valid());
        assert!(graph.attach_connector(c, &PinRef::new(p, 0), Role::Target).is_valid());
    }

    #[test]
    fn test_detach_end_keeps_connector() {
        let (mut graph, a, b) = setup();
        let c = connect(&mut graph, &PinRef::new(a, 0), &PinRef::new(b.clone(), 0));

        assert_eq!(graph.detach_end(c, Role::Target), Some(PinRef::new(b.clone(), 0)));
        assert!(graph.connector(c).is_some());
        assert!(!graph.pin(&PinRef::new(b, 0)).unwrap().is_occupied());
        assert!(graph.is_consistent());
    }

    #[test]
    fn test_detach_connector_clears_both_pins() {
        let (mut graph, a, b) = setup();
        let c = connect(&mut graph, &PinRef::new(a.clone(), 0), &PinRef::new(b.clone(), 0));

        assert!(graph.detach_connector(c));
        assert!(!graph.detach_connector(c));
        assert_eq!(graph.connector_count(), 0);
        assert!(!graph.pin(&PinRef::new(a, 0)).unwrap().is_occupied());
        assert!(!graph.pin(&PinRef::new(b, 0)).unwrap().is_occupied());
    }

    // ========================================================================
    // Destroy
    // ========================================================================

    #[test]
    fn test_destroy_node_cascades_connectors() {
        let mut graph = Graph::new(registry());
        let a = graph.create_node("Source", Point::ORIGIN, None, None).unwrap();
        let p = graph.create_node("Pass", Point::ORIGIN, None, None).unwrap();
        let b = graph.create_node("Sink", Point::ORIGIN, None, None).unwrap();
        connect(&mut graph, &PinRef::new(a.clone(), 0), &PinRef::new(p.clone(), 0));
        connect(&mut graph, &PinRef::new(p.clone(), 1), &PinRef::new(b.clone(), 0));

        let removed = graph.destroy_node(&p).unwrap();
        assert_eq!(removed.len(), 2);
        assert_eq!(graph.connector_count(), 0);
        assert!(graph.connectors().all(|c| c.source().map(|s| &s.node) != Some(&p)));
        assert!(!graph.pin(&PinRef::new(a, 0)).unwrap().is_occupied());
        assert!(!graph.pin(&PinRef::new(b, 0)).unwrap().is_occupied());
        assert_eq!(graph.node_ids().len(), 2);
    }

    #[test]
    fn test_destroy_missing_node() {
        let mut graph = Graph::new(registry());
        let err = graph.destroy_node(&"ghost".into()).unwrap_err();
        assert_eq!(err, EditorError::NodeNotFound("ghost".into()));
    }

    // ========================================================================
    // Geometry
    // ========================================================================

    #[test]
    fn test_anchors() {
        let (graph, a, b) = setup();
        // Output: node x + offset (99) + pin width (10), y + 50 + 5
        assert_eq!(graph.anchor(&PinRef::new(a, 0)), Some(Point::new(109.0, 55.0)));
        // Input: node x + offset (-11), y + 50 + 5
        assert_eq!(graph.anchor(&PinRef::new(b, 0)), Some(Point::new(289.0, 55.0)));
    }

    #[test]
    fn test_resize_relays_pins() {
        let (mut graph, a, _) = setup();
        graph.resize_node(&a, Size::new(200.0, 40.0)).unwrap();
        let pin = &graph.node(&a).unwrap().pins()[0];
        assert_eq!(pin.offset(), Point::new(199.0, 20.0));
        assert!(graph.resize_node(&a, Size::new(-1.0, 1.0)).is_err());
    }

    #[test]
    fn test_move_node_updates_position() {
        let (mut graph, a, _) = setup();
        graph.move_node(&a, Point::new(40.0, 60.0)).unwrap();
        assert_eq!(graph.node(&a).unwrap().position(), Point::new(40.0, 60.0));
        assert_eq!(graph.anchor(&PinRef::new(a, 0)), Some(Point::new(149.0, 115.0)));
    }

    // ========================================================================
    // Propagation
    // ========================================================================

    #[test]
    fn test_propagate_delivers_to_receiver() {
        let (mut graph, a, b) = setup();
        let out = PinRef::new(a, 0);
        assert_eq!(graph.propagate(&out, &json!(1)), Delivery::NotConnected);

        connect(&mut graph, &out, &PinRef::new(b.clone(), 0));
        assert_eq!(graph.propagate(&out, &json!(42)), Delivery::Delivered);

        let payload = graph.node(&b).unwrap().payload().downcast_ref::<Value>().cloned();
        assert_eq!(payload, Some(json!({"inputs": {"0": 42}})));
    }

    #[test]
    fn test_propagate_without_receiver() {
        let mut graph = Graph::new(registry());
        let a = graph.create_node("Source", Point::ORIGIN, None, None).unwrap();
        let p = graph.create_node("Pass", Point::ORIGIN, None, None).unwrap();
        connect(&mut graph, &PinRef::new(a.clone(), 0), &PinRef::new(p.clone(), 0));

        assert_eq!(graph.propagate(&PinRef::new(a, 0), &json!(1)), Delivery::NoReceiver);
        // Input pins do not fire.
        assert_eq!(graph.propagate(&PinRef::new(p, 0), &json!(1)), Delivery::NotConnected);
    }

    // ========================================================================
    // Describe
    // ========================================================================

    #[test]
    fn test_describe() {
        let (mut graph, a, b) = setup();
        connect(&mut graph, &PinRef::new(a, 0), &PinRef::new(b, 0));
        graph.create_node("Pass", Point::ORIGIN, None, Some("P".into())).unwrap();

        let text = graph.describe();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Source A 0:(Sink B,0)");
        assert_eq!(lines[1], "Sink B 0:(Source A,0)");
        assert_eq!(lines[2], "Pass P 0:n.c. 1:n.c.");
    }

    #[test]
    fn test_validation_result_and() {
        let ok = ValidationResult::Valid;
        let bad = ValidationResult::Invalid(ValidationError::SamePin);
        assert!(ok.clone().and(ValidationResult::Valid).is_valid());
        assert_eq!(ok.and(bad.clone()), bad);
        assert_eq!(bad.error(), Some(&ValidationError::SamePin));
    }
}
