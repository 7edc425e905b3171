//! Common test utilities for integration tests.

#![allow(dead_code)]

pub mod harness;

use std::cell::RefCell;
use std::rc::Rc;

use slint_graph_connect::{
    ConnectionOutcome, DiscardReason, EditorEvent, NodeId, PinRef, Point,
};

/// Tracks what finished gestures reported.
///
/// Each field records one kind of [`EditorEvent`] with its arguments.
#[derive(Default, Clone)]
pub struct CallbackTracker {
    /// (source, target)
    pub committed: Rc<RefCell<Vec<(PinRef, PinRef)>>>,
    pub discarded: Rc<RefCell<Vec<DiscardReason>>>,
    /// (node, final position)
    pub moved: Rc<RefCell<Vec<(NodeId, Point)>>>,
    pub created: Rc<RefCell<Vec<NodeId>>>,
    pub removed: Rc<RefCell<Vec<NodeId>>>,
}

impl CallbackTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, event: &EditorEvent) {
        match event {
            EditorEvent::Connection(outcome) => self.record_outcome(outcome),
            EditorEvent::NodeMoved { id, position } => {
                self.moved.borrow_mut().push((id.clone(), *position))
            }
            EditorEvent::NodeCreated(id) => self.created.borrow_mut().push(id.clone()),
            EditorEvent::NodeRemoved(id) => self.removed.borrow_mut().push(id.clone()),
        }
    }

    pub fn record_outcome(&self, outcome: &ConnectionOutcome) {
        match outcome {
            ConnectionOutcome::Committed { source, target, .. } => {
                self.committed.borrow_mut().push((source.clone(), target.clone()))
            }
            ConnectionOutcome::Discarded { reason, .. } => {
                self.discarded.borrow_mut().push(reason.clone())
            }
        }
    }

    /// Clear all recorded events.
    pub fn clear(&self) {
        self.committed.borrow_mut().clear();
        self.discarded.borrow_mut().clear();
        self.moved.borrow_mut().clear();
        self.created.borrow_mut().clear();
        self.removed.borrow_mut().clear();
    }
}
