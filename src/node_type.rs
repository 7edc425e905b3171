//! Node type definitions.
//!
//! Every kind of node the editor can place implements [`NodeType`]. The trait
//! describes the node's pins and default size and carries the lifecycle hooks
//! the editor calls: `make` once per instance, `save`/`load` from the
//! persistence codec, `moved`/`resized` on every reposition or resize, and
//! `receive` when a value reaches one of its input pins.
//!
//! Types are collected in a [`TypeRegistry`], keyed by name. The registry's
//! order is the palette order.

use std::any::Any;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{EditorError, Result};
use crate::geometry::{Point, Size};
use crate::graph::NodeId;

/// Direction tag of a pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinDirection {
    Input,
    Output,
}

impl PinDirection {
    /// The connector end this pin can hold: outputs are sources, inputs targets.
    pub fn role(self) -> Role {
        match self {
            PinDirection::Output => Role::Source,
            PinDirection::Input => Role::Target,
        }
    }

    pub fn accepts(self, role: Role) -> bool {
        self.role() == role
    }
}

/// Which end of a connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Source,
    Target,
}

impl Role {
    pub fn opposite(self) -> Role {
        match self {
            Role::Source => Role::Target,
            Role::Target => Role::Source,
        }
    }
}

/// Declaration of one pin on a node type.
#[derive(Debug, Clone, PartialEq)]
pub struct PinSpec {
    pub direction: PinDirection,
    /// Free-form label, shown as a tooltip by hosts.
    pub tag: Option<String>,
}

impl PinSpec {
    pub fn input() -> Self {
        Self { direction: PinDirection::Input, tag: None }
    }

    pub fn output() -> Self {
        Self { direction: PinDirection::Output, tag: None }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }
}

/// Read-only view of a node handed to lifecycle hooks.
#[derive(Debug, Clone, Copy)]
pub struct NodeView<'a> {
    pub id: &'a NodeId,
    pub type_name: &'a str,
    pub position: Point,
    pub size: Size,
}

/// Per-instance state produced by [`NodeType::make`]. Opaque to the editor.
pub type Payload = Box<dyn Any>;

/// Capability interface of a node type.
pub trait NodeType {
    fn name(&self) -> &str;

    fn pins(&self) -> &[PinSpec];

    fn default_size(&self) -> Option<Size> {
        None
    }

    fn tooltip(&self) -> Option<&str> {
        None
    }

    /// Name of the host template the node embeds as its content.
    fn template(&self) -> Option<&str> {
        None
    }

    /// Build the payload of a new instance.
    fn make(&self, node: &NodeView<'_>) -> Payload;

    /// Persistable state of an instance. `None` omits the payload from snapshots.
    fn save(&self, _node: &NodeView<'_>, _payload: &dyn Any) -> Option<Value> {
        None
    }

    /// Restore state written by [`save`](Self::save).
    fn load(
        &self,
        _node: &NodeView<'_>,
        _payload: &mut dyn Any,
        _saved: &Value,
    ) -> Result<(), String> {
        Ok(())
    }

    fn moved(&self, _node: &NodeView<'_>, _payload: &mut dyn Any) {}

    fn resized(&self, _node: &NodeView<'_>, _payload: &mut dyn Any) {}

    /// A value arrived on input pin `pin`. Return `false` if the pin has no receiver.
    fn receive(
        &self,
        _node: &NodeView<'_>,
        _payload: &mut dyn Any,
        _pin: usize,
        _value: &Value,
    ) -> bool {
        false
    }
}

/// Registered node types, in registration order.
#[derive(Clone, Default)]
pub struct TypeRegistry {
    types: Vec<Rc<dyn NodeType>>,
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a type. Names must be unique.
    pub fn register<T: NodeType + 'static>(&mut self, node_type: T) -> Result<()> {
        self.register_rc(Rc::new(node_type))
    }

    pub fn register_rc(&mut self, node_type: Rc<dyn NodeType>) -> Result<()> {
        if self.get(node_type.name()).is_some() {
            return Err(EditorError::DuplicateType(node_type.name().to_string()));
        }
        self.types.push(node_type);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Rc<dyn NodeType>> {
        self.types.iter().find(|t| t.name() == name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.types.iter().map(|t| t.name())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rc<dyn NodeType>> + '_ {
        self.types.iter()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Ready-made [`NodeType`] whose payload is a JSON value.
///
/// The payload starts as the configured initial value, is saved and loaded
/// verbatim, and, when receiving is enabled, records the last value delivered
/// to each input pin under `"inputs"`.
#[derive(Debug, Clone)]
pub struct SimpleNodeType {
    name: String,
    pins: Vec<PinSpec>,
    size: Option<Size>,
    tooltip: Option<String>,
    initial: Value,
    receives: bool,
}

impl SimpleNodeType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pins: Vec::new(),
            size: None,
            tooltip: None,
            initial: Value::Null,
            receives: false,
        }
    }

    pub fn with_pins(mut self, pins: Vec<PinSpec>) -> Self {
        self.pins = pins;
        self
    }

    pub fn with_size(mut self, size: Size) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_tooltip(mut self, tooltip: impl Into<String>) -> Self {
        self.tooltip = Some(tooltip.into());
        self
    }

    pub fn with_initial(mut self, initial: Value) -> Self {
        self.initial = initial;
        self
    }

    pub fn receiving(mut self) -> Self {
        self.receives = true;
        self
    }
}

impl NodeType for SimpleNodeType {
    fn name(&self) -> &str {
        &self.name
    }

    fn pins(&self) -> &[PinSpec] {
        &self.pins
    }

    fn default_size(&self) -> Option<Size> {
        self.size
    }

    fn tooltip(&self) -> Option<&str> {
        self.tooltip.as_deref()
    }

    fn make(&self, _node: &NodeView<'_>) -> Payload {
        Box::new(self.initial.clone())
    }

    fn save(&self, _node: &NodeView<'_>, payload: &dyn Any) -> Option<Value> {
        payload.downcast_ref::<Value>().filter(|v| !v.is_null()).cloned()
    }

    fn load(
        &self,
        _node: &NodeView<'_>,
        payload: &mut dyn Any,
        saved: &Value,
    ) -> Result<(), String> {
        let state = payload
            .downcast_mut::<Value>()
            .ok_or_else(|| format!("payload of '{}' is not a JSON value", self.name))?;
        *state = saved.clone();
        Ok(())
    }

    fn receive(
        &self,
        _node: &NodeView<'_>,
        payload: &mut dyn Any,
        pin: usize,
        value: &Value,
    ) -> bool {
        if !self.receives {
            return false;
        }
        let Some(state) = payload.downcast_mut::<Value>() else {
            return false;
        };
        if !state.is_object() {
            *state = Value::Object(Default::default());
        }
        if let Some(map) = state.as_object_mut() {
            let inputs = map
                .entry("inputs")
                .or_insert_with(|| Value::Object(Default::default()));
            if let Some(inputs) = inputs.as_object_mut() {
                inputs.insert(pin.to_string(), value.clone());
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn view(id: &NodeId) -> NodeView<'_> {
        NodeView { id, type_name: "T", position: Point::ORIGIN, size: Size::new(10.0, 10.0) }
    }

    #[test]
    fn test_direction_roles() {
        assert_eq!(PinDirection::Output.role(), Role::Source);
        assert_eq!(PinDirection::Input.role(), Role::Target);
        assert!(PinDirection::Input.accepts(Role::Target));
        assert!(!PinDirection::Input.accepts(Role::Source));
        assert_eq!(Role::Source.opposite(), Role::Target);
    }

    #[test]
    fn test_direction_serializes_lowercase() {
        assert_eq!(serde_json::to_value(PinDirection::Output).unwrap(), json!("output"));
    }

    #[test]
    fn test_registry_rejects_duplicate_names() {
        let mut registry = TypeRegistry::new();
        registry.register(SimpleNodeType::new("A")).unwrap();
        let err = registry.register(SimpleNodeType::new("A")).unwrap_err();
        assert_eq!(err, EditorError::DuplicateType("A".into()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_registry_keeps_registration_order() {
        let mut registry = TypeRegistry::new();
        for name in ["Zeta", "Alpha", "Mid"] {
            registry.register(SimpleNodeType::new(name)).unwrap();
        }
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["Zeta", "Alpha", "Mid"]);
        assert!(registry.get("Alpha").is_some());
        assert!(registry.get("Missing").is_none());
    }

    #[test]
    fn test_simple_type_save_load() {
        let t = SimpleNodeType::new("T").with_initial(json!({"k": 1}));
        let id = NodeId::from("n1");
        let mut payload = t.make(&view(&id));
        assert_eq!(t.save(&view(&id), payload.as_ref()), Some(json!({"k": 1})));

        t.load(&view(&id), payload.as_mut(), &json!({"k": 2})).unwrap();
        assert_eq!(t.save(&view(&id), payload.as_ref()), Some(json!({"k": 2})));
    }

    #[test]
    fn test_simple_type_null_payload_not_saved() {
        let t = SimpleNodeType::new("T");
        let id = NodeId::from("n1");
        let payload = t.make(&view(&id));
        assert_eq!(t.save(&view(&id), payload.as_ref()), None);
    }

    #[test]
    fn test_simple_type_receive() {
        let id = NodeId::from("n1");
        let silent = SimpleNodeType::new("T");
        let mut payload = silent.make(&view(&id));
        assert!(!silent.receive(&view(&id), payload.as_mut(), 0, &json!(5)));

        let listening = SimpleNodeType::new("T").receiving();
        let mut payload = listening.make(&view(&id));
        assert!(listening.receive(&view(&id), payload.as_mut(), 1, &json!(5)));
        assert_eq!(payload.downcast_ref::<Value>(), Some(&json!({"inputs": {"1": 5}})));
    }

    #[test]
    fn test_load_rejects_foreign_payload() {
        let t = SimpleNodeType::new("T");
        let id = NodeId::from("n1");
        let mut payload: Payload = Box::new(42_u32);
        assert!(t.load(&view(&id), payload.as_mut(), &json!(1)).is_err());
    }
}
