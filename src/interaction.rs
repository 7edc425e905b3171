//! Connection interaction state machine.
//!
//! ```text
//!            pointer-down on pin
//!   IDLE ─────────────────────────▶ DRAGGING_NEW_END ──┐ pointer-move:
//!    ▲                                   │   ▲         │ re-route free end
//!    │  pointer-up (commit or discard),  │   └─────────┘
//!    └── cancel, blur, timeout ──────────┘
//! ```
//!
//! Grabbing a free pin creates a connector bound on that pin whose other end
//! follows the pointer. Grabbing an occupied pin picks the existing connector
//! up: the grabbed end comes loose and follows the pointer while the far end
//! stays put. Releasing over a compatible free pin commits the connector;
//! releasing anywhere else discards it.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::geometry::Point;
use crate::graph::{ConnectorId, Graph, PinRef, ValidationError};
use crate::links::ConnectorPaths;
use crate::node_type::Role;

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionState {
    Idle,
    DraggingNewEnd {
        connector: ConnectorId,
        /// The end that follows the pointer.
        role: Role,
        pointer: Point,
        started_at: Instant,
    },
}

/// Why a dragged connector was thrown away.
#[derive(Debug, Clone, PartialEq)]
pub enum DiscardReason {
    /// Released over something that is not a pin.
    NoTarget,
    Rejected(ValidationError),
    Cancelled,
    TimedOut,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionOutcome {
    Committed {
        connector: ConnectorId,
        source: PinRef,
        target: PinRef,
    },
    Discarded {
        connector: ConnectorId,
        reason: DiscardReason,
    },
}

impl ConnectionOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, ConnectionOutcome::Committed { .. })
    }

    pub fn connector(&self) -> ConnectorId {
        match self {
            ConnectionOutcome::Committed { connector, .. }
            | ConnectionOutcome::Discarded { connector, .. } => *connector,
        }
    }
}

/// Explicit per-canvas connection session.
#[derive(Debug, Clone)]
pub struct ConnectionDrag {
    state: ConnectionState,
    timeout: Option<Duration>,
}

impl Default for ConnectionDrag {
    fn default() -> Self {
        Self::new(None)
    }
}

impl ConnectionDrag {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            state: ConnectionState::Idle,
            timeout,
        }
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == ConnectionState::Idle
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    /// The connector currently following the pointer.
    pub fn active_connector(&self) -> Option<ConnectorId> {
        match self.state {
            ConnectionState::Idle => None,
            ConnectionState::DraggingNewEnd { connector, .. } => Some(connector),
        }
    }

    /// Pointer went down on a pin. Returns `false` if a drag is already
    /// running or the pin does not exist.
    pub fn begin(
        &mut self,
        graph: &mut Graph,
        paths: &mut ConnectorPaths,
        pin: &PinRef,
        pointer: Point,
        now: Instant,
    ) -> bool {
        if !self.is_idle() {
            return false;
        }
        let Some((direction, occupant)) = graph.pin(pin).map(|p| (p.direction(), p.connector()))
        else {
            return false;
        };

        let (connector, role) = match occupant {
            Some(connector) => {
                graph.detach_end(connector, direction.role());
                debug!(connector = %connector, pin = %pin, "connector picked up");
                (connector, direction.role())
            }
            None => {
                let connector = graph.create_connector();
                let attached = graph.attach_connector(connector, pin, direction.role());
                if !attached.is_valid() {
                    graph.detach_connector(connector);
                    return false;
                }
                debug!(connector = %connector, pin = %pin, "connector started");
                (connector, direction.role().opposite())
            }
        };

        paths.route(graph, connector, Some(pointer));
        self.state = ConnectionState::DraggingNewEnd {
            connector,
            role,
            pointer,
            started_at: now,
        };
        true
    }

    /// Pointer moved: the free end follows it.
    pub fn drag(&mut self, graph: &Graph, paths: &mut ConnectorPaths, pointer: Point) -> bool {
        let ConnectionState::DraggingNewEnd { connector, pointer: last, .. } = &mut self.state
        else {
            return false;
        };
        *last = pointer;
        paths.route(graph, *connector, Some(pointer));
        true
    }

    /// Pointer released over `target` (`None` when not over a pin).
    pub fn release(
        &mut self,
        graph: &mut Graph,
        paths: &mut ConnectorPaths,
        target: Option<&PinRef>,
    ) -> Option<ConnectionOutcome> {
        let ConnectionState::DraggingNewEnd { connector, role, .. } =
            std::mem::replace(&mut self.state, ConnectionState::Idle)
        else {
            return None;
        };

        let Some(target) = target else {
            return Some(discard(graph, paths, connector, DiscardReason::NoTarget));
        };
        let result = graph.attach_connector(connector, target, role);
        if let Some(err) = result.error() {
            return Some(discard(graph, paths, connector, DiscardReason::Rejected(err.clone())));
        }

        paths.route(graph, connector, None);
        let (source, target) = graph
            .connector(connector)
            .and_then(|c| Some((c.source()?.clone(), c.target()?.clone())))?;
        debug!(connector = %connector, source = %source, target = %target, "connector committed");
        Some(ConnectionOutcome::Committed { connector, source, target })
    }

    /// Abort a running drag (Escape, focus loss).
    pub fn cancel(
        &mut self,
        graph: &mut Graph,
        paths: &mut ConnectorPaths,
    ) -> Option<ConnectionOutcome> {
        self.abort(graph, paths, DiscardReason::Cancelled)
    }

    /// Abort a drag that has outlived the timeout.
    pub fn expire(
        &mut self,
        graph: &mut Graph,
        paths: &mut ConnectorPaths,
        now: Instant,
    ) -> Option<ConnectionOutcome> {
        let ConnectionState::DraggingNewEnd { started_at, .. } = self.state else {
            return None;
        };
        let timeout = self.timeout?;
        if now.saturating_duration_since(started_at) < timeout {
            return None;
        }
        self.abort(graph, paths, DiscardReason::TimedOut)
    }

    fn abort(
        &mut self,
        graph: &mut Graph,
        paths: &mut ConnectorPaths,
        reason: DiscardReason,
    ) -> Option<ConnectionOutcome> {
        match std::mem::replace(&mut self.state, ConnectionState::Idle) {
            ConnectionState::Idle => None,
            ConnectionState::DraggingNewEnd { connector, .. } => {
                Some(discard(graph, paths, connector, reason))
            }
        }
    }
}

fn discard(
    graph: &mut Graph,
    paths: &mut ConnectorPaths,
    connector: ConnectorId,
    reason: DiscardReason,
) -> ConnectionOutcome {
    graph.detach_connector(connector);
    paths.remove(connector);
    debug!(connector = %connector, reason = ?reason, "connector discarded");
    ConnectionOutcome::Discarded { connector, reason }
}
