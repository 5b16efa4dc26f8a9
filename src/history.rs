use std::collections::VecDeque;

use tracing::trace;

use crate::constants::{CLIENT_ACTIVITY_COUNTERS, MAX_HISTORY};
use crate::status::{NodeId, NodeStatus};

/// Keeps the most recent statuses of a single node so that instantaneous
/// rates can be shown without querying time series.
#[derive(Debug, Clone)]
pub struct NodeHistory {
    // Most recent first
    status_history: VecDeque<NodeStatus>,
    client_activity_rate: f64,
}

impl NodeHistory {
    pub fn new(initial_status: NodeStatus) -> Self {
        let mut status_history = VecDeque::with_capacity(MAX_HISTORY + 1);
        status_history.push_back(initial_status);
        let mut history = Self {
            status_history,
            client_activity_rate: 0.0,
        };
        history.compute_client_activity_rate();
        history
    }

    /// Records `next_status` if it is newer than the latest held status.
    /// Stale and duplicate statuses are dropped; returns whether it was kept.
    pub fn update(&mut self, next_status: NodeStatus) -> bool {
        if next_status.updated_at <= self.latest().updated_at {
            trace!(
                node_id = next_status.desc.node_id,
                updated_at = next_status.updated_at.nanos(),
                "dropping stale node status"
            );
            return false;
        }

        self.status_history.push_front(next_status);
        if self.status_history.len() > MAX_HISTORY {
            self.status_history.pop_back();
        }
        self.compute_client_activity_rate();
        true
    }

    pub fn id(&self) -> NodeId {
        self.latest().desc.node_id
    }

    pub fn latest(&self) -> &NodeStatus {
        // Never empty: seeded on construction and only ever trimmed to MAX_HISTORY
        &self.status_history[0]
    }

    /// SQL operations per second between the two most recent statuses.
    pub fn client_activity_rate(&self) -> f64 {
        self.client_activity_rate
    }

    pub fn samples(&self) -> impl Iterator<Item = &NodeStatus> {
        self.status_history.iter()
    }

    fn compute_client_activity_rate(&mut self) {
        self.client_activity_rate = 0.0;
        if self.status_history.len() < 2 {
            return;
        }

        let latest = &self.status_history[0];
        let prev = &self.status_history[1];
        let seconds = latest.updated_at.seconds_since(prev.updated_at);
        let total_ops: f64 = CLIENT_ACTIVITY_COUNTERS
            .iter()
            .map(|name| latest.metric(name) - prev.metric(name))
            .sum();

        // Not guarded against zero: update only accepts strictly newer statuses
        self.client_activity_rate = total_ops / seconds;
    }
}
