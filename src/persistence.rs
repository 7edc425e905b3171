//! Snapshot codec.
//!
//! A [`Snapshot`] is a flat record of a graph: node records carrying id, type,
//! geometry and the type's saved payload, and connector records referring to
//! nodes by id and pins by index. It serializes to JSON with camelCase keys:
//!
//! ```json
//! {
//!   "version": 1,
//!   "nodes": [
//!     { "id": "k3J9x0aa", "typeName": "Source",
//!       "position": { "x": 0.0, "y": 0.0 },
//!       "size": { "width": 100.0, "height": 100.0 } }
//!   ],
//!   "connectors": [
//!     { "sourceNodeId": "k3J9x0aa", "sourcePinIndex": 0,
//!       "targetNodeId": "1bC8qQ2z", "targetPinIndex": 0 }
//!   ]
//! }
//! ```
//!
//! Documents without `version` are read as version 0 and accepted. The older
//! `{objs, lines}` layout is imported through [`LegacySnapshot`].

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{EditorError, Result};
use crate::geometry::{Point, Size};
use crate::graph::{Graph, NodeId, PinRef};
use crate::node_type::{Role, TypeRegistry};

/// Version written by [`serialize`].
pub const SNAPSHOT_VERSION: u32 = 1;

/// Border width the legacy format included in node sizes, per side.
const LEGACY_BORDER: f32 = 1.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    pub id: NodeId,
    pub type_name: String,
    pub position: Point,
    pub size: Size,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opaque_payload: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorRecord {
    pub source_node_id: NodeId,
    pub source_pin_index: usize,
    pub target_node_id: NodeId,
    pub target_pin_index: usize,
}

impl ConnectorRecord {
    pub fn source(&self) -> PinRef {
        PinRef::new(self.source_node_id.clone(), self.source_pin_index)
    }

    pub fn target(&self) -> PinRef {
        PinRef::new(self.target_node_id.clone(), self.target_pin_index)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
    #[serde(default)]
    pub connectors: Vec<ConnectorRecord>,
}

impl Snapshot {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a snapshot document, current or legacy layout.
    pub fn from_json(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        let snapshot = if value.get("objs").is_some() {
            let legacy: LegacySnapshot = serde_json::from_value(value)?;
            legacy.into_snapshot()
        } else {
            serde_json::from_value(value)?
        };
        snapshot.check_version()?;
        Ok(snapshot)
    }

    pub fn check_version(&self) -> Result<()> {
        if self.version > SNAPSHOT_VERSION {
            return Err(EditorError::UnsupportedVersion {
                found: self.version,
                supported: SNAPSHOT_VERSION,
            });
        }
        Ok(())
    }

    /// Connector endpoint pairs, for order-independent comparison.
    pub fn connector_set(&self) -> HashSet<&ConnectorRecord> {
        self.connectors.iter().collect()
    }
}

/// Record every live node (creation order) and every committed connector.
///
/// A connector still being dragged has a free end and is left out.
pub fn serialize(graph: &Graph) -> Snapshot {
    let nodes = graph
        .nodes()
        .map(|node| {
            let opaque_payload = graph
                .registry()
                .get(node.type_name())
                .and_then(|t| t.save(&node.view(), node.payload()));
            NodeRecord {
                id: node.id().clone(),
                type_name: node.type_name().to_string(),
                position: node.position(),
                size: node.size(),
                opaque_payload,
            }
        })
        .collect();

    let connectors = graph
        .connectors()
        .filter_map(|c| {
            let (source, target) = (c.source()?, c.target()?);
            Some(ConnectorRecord {
                source_node_id: source.node.clone(),
                source_pin_index: source.index,
                target_node_id: target.node.clone(),
                target_pin_index: target.index,
            })
        })
        .collect();

    Snapshot {
        version: SNAPSHOT_VERSION,
        nodes,
        connectors,
    }
}

/// Rebuild a graph from a snapshot.
///
/// Nodes are created with their recorded ids, sizes and positions, then handed
/// their saved payload. Connectors are attached straight to both pins. The
/// graph is built from scratch, so a failure leaves nothing half-restored.
pub fn deserialize(snapshot: &Snapshot, registry: &TypeRegistry, pin_size: Size) -> Result<Graph> {
    snapshot.check_version()?;
    let mut graph = Graph::new(registry.clone()).with_pin_size(pin_size);

    for record in &snapshot.nodes {
        if !record.size.is_valid() || !record.position.is_finite() {
            return Err(EditorError::Convert(format!("node '{}' has invalid geometry", record.id)));
        }
        let id = graph.create_node(
            &record.type_name,
            record.position,
            Some(record.size),
            Some(record.id.clone()),
        )?;
        if let Some(saved) = &record.opaque_payload {
            let node_type = graph.node_type_of(&id)?;
            graph
                .with_payload(&id, |view, payload| node_type.load(view, payload, saved))
                .unwrap_or(Ok(()))
                .map_err(|message| EditorError::Load { id: id.clone(), message })?;
        }
    }

    for (index, record) in snapshot.connectors.iter().enumerate() {
        for node in [&record.source_node_id, &record.target_node_id] {
            if !graph.contains_node(node) {
                return Err(EditorError::DanglingReference(node.clone()));
            }
        }
        let connector = graph.create_connector();
        let result = graph
            .attach_connector(connector, &record.source(), Role::Source)
            .and(graph.attach_connector(connector, &record.target(), Role::Target));
        if let Some(reason) = result.error() {
            return Err(EditorError::InvalidConnector {
                index,
                reason: reason.clone(),
            });
        }
    }

    debug!(
        nodes = graph.node_count(),
        connectors = graph.connector_count(),
        version = snapshot.version,
        "snapshot restored"
    );
    Ok(graph)
}

// ============================================================================
// Legacy layout
// ============================================================================

/// Node entry of the legacy layout. Sizes include a 1px border on each side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyObject {
    pub name: String,
    pub id: NodeId,
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save: Option<Value>,
}

/// Connector entry of the legacy layout: `id1/pin1` is the input side,
/// `id2/pin2` the output side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyLine {
    pub id1: NodeId,
    pub pin1: usize,
    pub id2: NodeId,
    pub pin2: usize,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LegacySnapshot {
    #[serde(default)]
    pub objs: Vec<LegacyObject>,
    #[serde(default)]
    pub lines: Vec<LegacyLine>,
}

impl LegacySnapshot {
    pub fn into_snapshot(self) -> Snapshot {
        let border = 2.0 * LEGACY_BORDER;
        let nodes = self
            .objs
            .into_iter()
            .map(|o| NodeRecord {
                id: o.id,
                type_name: o.name,
                position: Point::new(o.left, o.top),
                size: Size::new((o.width - border).max(0.0), (o.height - border).max(0.0)),
                opaque_payload: o.save,
            })
            .collect();
        let connectors = self
            .lines
            .into_iter()
            .map(|l| ConnectorRecord {
                source_node_id: l.id2,
                source_pin_index: l.pin2,
                target_node_id: l.id1,
                target_pin_index: l.pin1,
            })
            .collect();
        Snapshot {
            version: 0,
            nodes,
            connectors,
        }
    }
}

impl From<LegacySnapshot> for Snapshot {
    fn from(legacy: LegacySnapshot) -> Self {
        legacy.into_snapshot()
    }
}
