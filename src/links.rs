//! Rendered connector paths.
//!
//! [`ConnectorPaths`] keeps one routed [`ConnectorPath`] per connector and
//! mirrors them into a Slint `VecModel` when one is bound.
//!
//! ```ignore
//! let model = Rc::new(VecModel::<ConnectorPathRow>::default());
//! paths.bind_model(model.clone(), |id, commands, color, width| ConnectorPathRow {
//!     id,
//!     commands,
//!     color,
//!     width,
//! });
//! window.set_connectors(ModelRc::from(model));
//! ```

use std::collections::BTreeMap;
use std::rc::Rc;

use slint::{Color, Model, SharedString, VecModel};
use tracing::trace;

use crate::geometry::Point;
use crate::graph::{ConnectorId, Graph, NodeId};
use crate::node_type::Role;
use crate::path::{ConnectorPath, ROUTE_POWER};

/// Internal trait for auto-syncing to Slint models.
trait ModelSyncer {
    fn sync(&self, paths: &BTreeMap<ConnectorId, ConnectorPath>, color: Color, width: f32);
}

/// Concrete implementation of ModelSyncer for a specific row type.
struct ConcreteModelSyncer<P, F> {
    model: Rc<VecModel<P>>,
    constructor: F,
}

impl<P, F> ModelSyncer for ConcreteModelSyncer<P, F>
where
    P: Clone + 'static,
    F: Fn(i32, SharedString, Color, f32) -> P,
{
    fn sync(&self, paths: &BTreeMap<ConnectorId, ConnectorPath>, color: Color, width: f32) {
        // Update existing rows or add new ones
        for (i, (id, path)) in paths.iter().enumerate() {
            let row_id = i32::try_from(id.0).unwrap_or(i32::MAX);
            let commands = SharedString::from(path.commands());
            let item = (self.constructor)(row_id, commands, color, width);
            if i < self.model.row_count() {
                self.model.set_row_data(i, item);
            } else {
                self.model.push(item);
            }
        }
        // Remove excess rows
        while self.model.row_count() > paths.len() {
            self.model.remove(self.model.row_count() - 1);
        }
    }
}

/// Routed paths of every visible connector, keyed by connector id.
pub struct ConnectorPaths {
    paths: BTreeMap<ConnectorId, ConnectorPath>,
    power: f32,
    color: Color,
    line_width: f32,
    syncer: Option<Box<dyn ModelSyncer>>,
}

impl Default for ConnectorPaths {
    fn default() -> Self {
        Self::new(ROUTE_POWER)
    }
}

impl ConnectorPaths {
    pub fn new(power: f32) -> Self {
        Self {
            paths: BTreeMap::new(),
            power,
            color: Color::from_rgb_u8(0, 0, 0),
            line_width: 2.0,
            syncer: None,
        }
    }

    pub fn with_style(mut self, color: Color, line_width: f32) -> Self {
        self.color = color;
        self.line_width = line_width;
        self
    }

    /// Bind to a Slint model for automatic synchronization.
    ///
    /// Rows are `(id, path_commands, color, line_width)` in connector id order
    /// and are refreshed after every change.
    pub fn bind_model<P, F>(&mut self, model: Rc<VecModel<P>>, constructor: F)
    where
        P: Clone + 'static,
        F: Fn(i32, SharedString, Color, f32) -> P + 'static,
    {
        self.syncer = Some(Box::new(ConcreteModelSyncer { model, constructor }));
        self.sync();
    }

    pub fn power(&self) -> f32 {
        self.power
    }

    /// Route one connector from pin geometry.
    ///
    /// `pointer` stands in for whichever end is unbound; with no pointer a
    /// half-bound connector collapses onto its bound anchor. Returns `None`
    /// (and drops any stale path) when the connector no longer exists.
    pub fn route(
        &mut self,
        graph: &Graph,
        id: ConnectorId,
        pointer: Option<Point>,
    ) -> Option<ConnectorPath> {
        let path = self.compute(graph, id, pointer);
        match path {
            Some(path) => {
                trace!(connector = %id, commands = %path, "connector routed");
                self.paths.insert(id, path);
            }
            None => {
                self.paths.remove(&id);
            }
        }
        self.sync();
        path
    }

    /// Re-route every connector attached to a node.
    pub fn update_node(&mut self, graph: &Graph, node: &NodeId) {
        for id in graph.connectors_of_node(node) {
            if let Some(path) = self.compute(graph, id, None) {
                self.paths.insert(id, path);
            }
        }
        self.sync();
    }

    /// Drop every path and route all committed connectors again.
    pub fn rebuild(&mut self, graph: &Graph) {
        self.paths.clear();
        for connector in graph.connectors().filter(|c| c.is_committed()) {
            if let Some(path) = self.compute(graph, connector.id(), None) {
                self.paths.insert(connector.id(), path);
            }
        }
        self.sync();
    }

    pub fn remove(&mut self, id: ConnectorId) -> bool {
        let removed = self.paths.remove(&id).is_some();
        if removed {
            self.sync();
        }
        removed
    }

    pub fn remove_all(&mut self, ids: &[ConnectorId]) {
        for id in ids {
            self.paths.remove(id);
        }
        self.sync();
    }

    pub fn clear(&mut self) {
        self.paths.clear();
        self.sync();
    }

    pub fn get(&self, id: ConnectorId) -> Option<&ConnectorPath> {
        self.paths.get(&id)
    }

    /// SVG commands of a connector's path.
    pub fn commands(&self, id: ConnectorId) -> Option<SharedString> {
        self.paths.get(&id).map(|p| SharedString::from(p.commands()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (ConnectorId, &ConnectorPath)> + '_ {
        self.paths.iter().map(|(id, p)| (*id, p))
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    fn compute(
        &self,
        graph: &Graph,
        id: ConnectorId,
        pointer: Option<Point>,
    ) -> Option<ConnectorPath> {
        let connector = graph.connector(id)?;
        let source = connector.source().and_then(|pin| graph.anchor(pin));
        let target = connector.target().and_then(|pin| graph.anchor(pin));
        let (start, end) = match (source, target) {
            (Some(s), Some(t)) => (s, t),
            (Some(s), None) => (s, pointer.unwrap_or(s)),
            (None, Some(t)) => (pointer.unwrap_or(t), t),
            (None, None) => return None,
        };
        Some(ConnectorPath::route(start, end, self.power))
    }

    fn sync(&self) {
        if let Some(syncer) = &self.syncer {
            syncer.sync(&self.paths, self.color, self.line_width);
        }
    }
}

/// Which end of a half-bound connector follows the pointer.
pub fn free_end(graph: &Graph, id: ConnectorId) -> Option<Role> {
    let connector = graph.connector(id)?;
    match (connector.source(), connector.target()) {
        (Some(_), None) => Some(Role::Target),
        (None, Some(_)) => Some(Role::Source),
        _ => None,
    }
}
