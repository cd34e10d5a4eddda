use std::collections::HashMap;

use crate::behaviors::column_map::ColumnMapBinding;
use crate::dom::NodeId;

/// Native event handlers a behavior can attach to a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Handler {
    ColumnMap(ColumnMapBinding),
    SkipLink,
}

impl Handler {
    pub(crate) fn label(&self) -> &'static str {
        match self {
            Self::ColumnMap(_) => "column-map",
            Self::SkipLink => "skip-link",
        }
    }
}

#[derive(Debug, Default, Clone)]
pub(crate) struct ListenerStore {
    map: HashMap<NodeId, HashMap<String, Vec<Handler>>>,
}

impl ListenerStore {
    pub(crate) fn add(&mut self, node_id: NodeId, event: &str, handler: Handler) {
        let listeners = self
            .map
            .entry(node_id)
            .or_default()
            .entry(event.to_string())
            .or_default();
        // addEventListener ignores an identical registration.
        if !listeners.contains(&handler) {
            listeners.push(handler);
        }
    }

    pub(crate) fn remove(&mut self, node_id: NodeId, event: &str, handler: &Handler) -> bool {
        let Some(events) = self.map.get_mut(&node_id) else {
            return false;
        };
        let Some(listeners) = events.get_mut(event) else {
            return false;
        };

        if let Some(pos) = listeners.iter().position(|current| current == handler) {
            listeners.remove(pos);
            if listeners.is_empty() {
                events.remove(event);
            }
            if events.is_empty() {
                self.map.remove(&node_id);
            }
            return true;
        }

        false
    }

    pub(crate) fn get(&self, node_id: NodeId, event: &str) -> Vec<Handler> {
        self.map
            .get(&node_id)
            .and_then(|events| events.get(event))
            .cloned()
            .unwrap_or_default()
    }

    pub(crate) fn count(&self, node_id: NodeId, event: &str) -> usize {
        self.map
            .get(&node_id)
            .and_then(|events| events.get(event))
            .map_or(0, Vec::len)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct EventState {
    pub(crate) event_type: String,
    pub(crate) target: NodeId,
    pub(crate) current_target: NodeId,
}

impl EventState {
    pub(crate) fn new(event_type: &str, target: NodeId) -> Self {
        Self {
            event_type: event_type.to_string(),
            target,
            current_target: target,
        }
    }
}
