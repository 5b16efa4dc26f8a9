use std::{collections::HashMap, fmt};

use chrono::{DateTime, Local};

use crate::constants::NANOS_PER_MILLI;
use crate::locality::LocalityTier;

pub type NodeId = i32;

/// Wall-clock instant in nanoseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn from_millis(millis: i64) -> Self {
        Timestamp(millis.saturating_mul(1_000_000))
    }

    pub fn now() -> Self {
        Timestamp(Local::now().timestamp_nanos_opt().unwrap_or_default())
    }

    pub fn nanos(self) -> i64 {
        self.0
    }

    /// Seconds elapsed since `earlier`, keeping the sub-second fraction.
    pub fn seconds_since(self, earlier: Timestamp) -> f64 {
        let millis = (i128::from(self.0) - i128::from(earlier.0)) as f64 / NANOS_PER_MILLI;
        millis / 1000.0
    }

    pub fn add_millis(self, millis: i64) -> Self {
        Timestamp(self.0.saturating_add(millis.saturating_mul(1_000_000)))
    }

    pub fn to_local(self) -> DateTime<Local> {
        DateTime::from_timestamp_nanos(self.0).with_timezone(&Local)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_local().format("%H:%M:%S%.3f"))
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodeDescriptor {
    pub node_id: NodeId,
    pub address: String,
    pub locality: Vec<LocalityTier>,
}

/// One timestamped observation of a node's counters.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodeStatus {
    pub desc: NodeDescriptor,
    pub updated_at: Timestamp,
    pub metrics: HashMap<String, f64>,
}

impl NodeStatus {
    pub fn new(node_id: NodeId, updated_at: Timestamp) -> Self {
        Self {
            desc: NodeDescriptor {
                node_id,
                ..Default::default()
            },
            updated_at,
            metrics: HashMap::new(),
        }
    }

    pub fn with_metric(mut self, name: &str, value: f64) -> Self {
        self.metrics.insert(name.to_string(), value);
        self
    }

    pub fn with_locality(mut self, locality: Vec<LocalityTier>) -> Self {
        self.desc.locality = locality;
        self
    }

    /// Missing counters read as zero.
    pub fn metric(&self, name: &str) -> f64 {
        self.metrics.get(name).copied().unwrap_or(0.0)
    }
}

/// One batch of node statuses as delivered by the nodes endpoint.
#[derive(Debug, Clone, Default)]
pub struct NodesSummary {
    pub node_statuses: Vec<NodeStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seconds_since_keeps_fraction() {
        let a = Timestamp(0);
        let b = Timestamp(1_500_250_000);
        assert!((b.seconds_since(a) - 1.50025).abs() < 1e-12);
    }

    #[test]
    fn missing_metric_reads_zero() {
        let status = NodeStatus::new(1, Timestamp(0)).with_metric("sql.select.count", 4.0);
        assert_eq!(status.metric("sql.select.count"), 4.0);
        assert_eq!(status.metric("sql.delete.count"), 0.0);
    }

    #[test]
    fn seconds_since_spans_full_range() {
        let elapsed = Timestamp(i64::MAX).seconds_since(Timestamp(-1));
        assert!(elapsed > 0.0);
        assert!((elapsed - 9_223_372_036.854_775_808).abs() < 1e-3);
        assert!(Timestamp(i64::MIN).seconds_since(Timestamp(i64::MAX)) < 0.0);
    }

    #[test]
    fn millis_saturate_instead_of_wrapping() {
        assert_eq!(Timestamp::from_millis(i64::MAX), Timestamp(i64::MAX));
        assert_eq!(Timestamp(i64::MAX - 5).add_millis(1), Timestamp(i64::MAX));
        assert_eq!(Timestamp::from_millis(i64::MIN), Timestamp(i64::MIN));
    }

    #[test]
    fn timestamps_order_by_nanos() {
        assert!(Timestamp::from_millis(1) > Timestamp(999_999));
        assert_eq!(Timestamp::from_millis(2).add_millis(3), Timestamp::from_millis(5));
    }
}
