use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::{debug, info};

use crate::constants::CLIENT_ACTIVITY_COUNTERS;
use crate::locality::{LivenessMap, LivenessStatus, LocalityTier, LocalityTree, Location, LocationTree};
use crate::simulator::{Refresh, SimulatorProps};
use crate::status::{NodeId, NodeStatus, NodesSummary, Timestamp};

// (name, latitude, longitude)
const REGIONS: [(&str, f64, f64); 4] = [
    ("us-east", 37.5, -77.4),
    ("us-west", 45.6, -121.2),
    ("eu-west", 53.3, -6.3),
    ("ap-northeast", 35.7, 139.7),
];
const ZONES: [&str; 3] = ["a", "b", "c"];

// Per-tick chances, out of 1000
const OUTAGE_PER_MILLE: u32 = 8;
const RECOVERY_PER_MILLE: u32 = 200;
const REPLAY_PER_MILLE: u32 = 50;

#[derive(Debug, Clone, Copy, Default)]
pub struct RequestStatus {
    pub valid: bool,
    pub in_flight: bool,
}

#[derive(Debug)]
struct SimNode {
    // Operations per second for each activity counter
    base_rates: [f64; 4],
    liveness: LivenessStatus,
    current: NodeStatus,
    previous: Option<NodeStatus>,
}

/// Stand-in for the cluster's nodes, liveness and locations endpoints.
/// Requests are answered on the next `advance`.
#[derive(Debug)]
pub struct SimulatedCluster {
    rng: StdRng,
    clock: Timestamp,
    nodes: Vec<SimNode>,
    tier_keys: Vec<String>,

    nodes_request: RequestStatus,
    liveness_request: RequestStatus,
    locations_request: RequestStatus,

    summary: NodesSummary,
    liveness: LivenessMap,
    locations: LocationTree,
}

impl SimulatedCluster {
    pub fn new(node_count: usize, tier_keys: Vec<String>, seed: u64, start: Timestamp) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let nodes = (0..node_count)
            .map(|i| {
                let id = (i + 1) as NodeId;
                let locality = locality_for(i, &tier_keys);
                let mut status = NodeStatus::new(id, start).with_locality(locality);
                status.desc.address = format!("node{}:26257", id);
                for name in CLIENT_ACTIVITY_COUNTERS {
                    status = status.with_metric(name, 0.0);
                }
                let base_rates = [
                    rng.gen_range(50.0..400.0),
                    rng.gen_range(10.0..80.0),
                    rng.gen_range(5.0..60.0),
                    rng.gen_range(0.0..20.0),
                ];
                SimNode {
                    base_rates,
                    liveness: LivenessStatus::Live,
                    current: status,
                    previous: None,
                }
            })
            .collect();
        info!(node_count, seed, "simulated cluster started");

        Self {
            rng,
            clock: start,
            nodes,
            tier_keys,
            nodes_request: RequestStatus::default(),
            liveness_request: RequestStatus::default(),
            locations_request: RequestStatus::default(),
            summary: NodesSummary::default(),
            liveness: LivenessMap::new(),
            locations: LocationTree::default(),
        }
    }

    /// Moves simulated time forward and answers outstanding requests.
    pub fn advance(&mut self, elapsed_ms: u64) {
        self.clock = self.clock.add_millis(i64::try_from(elapsed_ms).unwrap_or(i64::MAX));
        let seconds = elapsed_ms as f64 / 1000.0;
        for node in &mut self.nodes {
            step_node(&mut self.rng, node, self.clock, seconds);
        }
        self.complete_requests();
    }

    pub fn props(&self) -> SimulatorProps {
        SimulatorProps {
            locality_tree: LocalityTree::build(&self.summary.node_statuses),
            nodes_summary: self.summary.clone(),
            location_tree: self.locations.clone(),
            liveness: self.liveness.clone(),
            data_is_valid: self.nodes_request.valid
                && self.liveness_request.valid
                && self.locations_request.valid,
        }
    }

    pub fn clock(&self) -> Timestamp {
        self.clock
    }

    pub fn request_statuses(&self) -> [RequestStatus; 3] {
        [self.nodes_request, self.liveness_request, self.locations_request]
    }

    fn complete_requests(&mut self) {
        if self.nodes_request.in_flight {
            let rng = &mut self.rng;
            let node_statuses = self
                .nodes
                .iter()
                .map(|node| match &node.previous {
                    // Occasionally hand back an older status, as a lagging gateway would
                    Some(prev) if rng.gen_range(0..1000) < REPLAY_PER_MILLE => prev.clone(),
                    _ => node.current.clone(),
                })
                .collect();
            self.summary = NodesSummary { node_statuses };
            self.nodes_request = RequestStatus { valid: true, in_flight: false };
        }
        if self.liveness_request.in_flight {
            self.liveness = self
                .nodes
                .iter()
                .map(|node| (node.current.desc.node_id, node.liveness))
                .collect();
            self.liveness_request = RequestStatus { valid: true, in_flight: false };
        }
        if self.locations_request.in_flight {
            self.locations = self.location_tree();
            self.locations_request = RequestStatus { valid: true, in_flight: false };
        }
    }

    fn location_tree(&self) -> LocationTree {
        let Some(key) = self.tier_keys.first() else {
            return LocationTree::default();
        };
        LocationTree::from_locations(REGIONS.iter().map(|(name, latitude, longitude)| Location {
            locality_key: key.clone(),
            locality_value: name.to_string(),
            latitude: *latitude,
            longitude: *longitude,
        }))
    }
}

impl Refresh for SimulatedCluster {
    fn refresh_nodes(&mut self) {
        self.nodes_request.in_flight = true;
    }

    fn refresh_liveness(&mut self) {
        self.liveness_request.in_flight = true;
    }

    fn refresh_locations(&mut self) {
        self.locations_request.in_flight = true;
    }
}

fn step_node(rng: &mut StdRng, node: &mut SimNode, now: Timestamp, seconds: f64) {
    let id = node.current.desc.node_id;
    match node.liveness {
        LivenessStatus::Live if rng.gen_range(0..1000) < OUTAGE_PER_MILLE => {
            debug!(node_id = id, "simulated node went down");
            node.liveness = LivenessStatus::Dead;
        }
        LivenessStatus::Dead if rng.gen_range(0..1000) < RECOVERY_PER_MILLE => {
            debug!(node_id = id, "simulated node recovered");
            node.liveness = LivenessStatus::Live;
        }
        _ => {}
    }

    // A dead node keeps reporting its last status
    if node.liveness != LivenessStatus::Live {
        return;
    }

    let mut next = node.current.clone();
    next.updated_at = now;
    for (name, base) in CLIENT_ACTIVITY_COUNTERS.iter().zip(node.base_rates) {
        let ops = (base * seconds * rng.gen_range(0.5..1.5)).round();
        let total = next.metric(name) + ops;
        next.metrics.insert(name.to_string(), total);
    }
    node.previous = Some(std::mem::replace(&mut node.current, next));
}

fn locality_for(index: usize, tier_keys: &[String]) -> Vec<LocalityTier> {
    let region = index % REGIONS.len();
    let zone = (index / REGIONS.len()) % ZONES.len();
    tier_keys
        .iter()
        .enumerate()
        .map(|(depth, key)| match depth {
            0 => LocalityTier::new(key, REGIONS[region].0),
            1 => LocalityTier::new(key, ZONES[zone]),
            _ => LocalityTier::new(key, &format!("{}{}", key, index % 2)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cluster(seed: u64) -> SimulatedCluster {
        SimulatedCluster::new(6, vec!["region".into(), "zone".into()], seed, Timestamp(0))
    }

    fn refresh(cluster: &mut SimulatedCluster) {
        cluster.refresh_nodes();
        cluster.refresh_liveness();
        cluster.refresh_locations();
    }

    #[test]
    fn invalid_until_all_requests_answer() {
        let mut cluster = cluster(1);
        assert!(!cluster.props().data_is_valid);

        cluster.refresh_nodes();
        cluster.advance(1000);
        assert!(!cluster.props().data_is_valid);

        cluster.refresh_liveness();
        cluster.refresh_locations();
        cluster.advance(1000);
        let props = cluster.props();
        assert!(props.data_is_valid);
        assert_eq!(props.nodes_summary.node_statuses.len(), 6);
        assert_eq!(props.liveness.len(), 6);
        assert_eq!(props.location_tree.locations["region"].len(), REGIONS.len());
    }

    #[test]
    fn same_seed_same_workload() {
        let mut a = cluster(7);
        let mut b = cluster(7);
        for _ in 0..5 {
            refresh(&mut a);
            refresh(&mut b);
            a.advance(500);
            b.advance(500);
        }
        assert_eq!(a.props().nodes_summary.node_statuses, b.props().nodes_summary.node_statuses);
        assert_eq!(a.clock(), Timestamp::from_millis(2500));
    }

    #[test]
    fn counters_never_decrease() {
        let mut cluster = cluster(3);
        let mut last: Vec<f64> = vec![0.0; 6];
        for _ in 0..20 {
            refresh(&mut cluster);
            cluster.advance(1000);
            for (i, node) in cluster.nodes.iter().enumerate() {
                let total: f64 = CLIENT_ACTIVITY_COUNTERS.iter().map(|n| node.current.metric(n)).sum();
                assert!(total >= last[i]);
                last[i] = total;
            }
        }
    }

    #[test]
    fn huge_advance_never_moves_clock_back() {
        let mut cluster = cluster(5);
        cluster.advance(u64::MAX);
        assert_eq!(cluster.clock(), Timestamp(i64::MAX));
        cluster.advance(1000);
        assert_eq!(cluster.clock(), Timestamp(i64::MAX));
    }

    #[test]
    fn localities_spread_across_regions() {
        let keys = vec!["region".to_string(), "zone".to_string(), "rack".to_string()];
        assert_eq!(
            locality_for(5, &keys),
            vec![
                LocalityTier::new("region", "us-west"),
                LocalityTier::new("zone", "b"),
                LocalityTier::new("rack", "rack1"),
            ]
        );
        assert!(locality_for(0, &[]).is_empty());
    }
}
