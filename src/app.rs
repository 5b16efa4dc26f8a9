use std::time::Instant;

use chrono::{DateTime, Local};
use tracing::debug;

use crate::config::Config;
use crate::constants::CLIENT_ACTIVITY_COUNTERS;
use crate::history::NodeHistory;
use crate::locality::LivenessStatus;
use crate::simulator::{NodeSimulator, SimulatorProps};
use crate::source::SimulatedCluster;
use crate::status::{NodeId, Timestamp};
use crate::util::format_locality;

// Cluster-wide activity samples kept for the graph
pub const ACTIVITY_HISTORY_LEN: usize = 120;

// One table row per tracked node
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRow {
    pub node_id: NodeId,
    pub address: String,
    pub locality: String,
    pub activity_rate: f64,
    pub total_ops: f64,
    pub liveness: LivenessStatus,
    pub updated_at: Timestamp,
}

// Main application state
pub struct App {
    pub cluster: SimulatedCluster,
    pub simulator: NodeSimulator,
    pub props: SimulatorProps,

    pub activity_history: Vec<f64>,
    pub peak_activity: (f64, DateTime<Local>),
    pub tick_ms: u64,
    pub ticks: u64,
    pub last_tick: Instant,
}

impl App {
    pub fn new(config: &Config) -> App {
        Self::with_start(config, Timestamp::now())
    }

    pub fn with_start(config: &Config, start: Timestamp) -> App {
        let mut cluster = SimulatedCluster::new(config.nodes, config.tiers.clone(), config.seed, start);
        let mut simulator = NodeSimulator::new(config.display_tiers());
        let props = cluster.props();
        simulator.mount(&props, &mut cluster);

        App {
            cluster,
            simulator,
            props,
            activity_history: vec![0.0; ACTIVITY_HISTORY_LEN],
            peak_activity: (0.0, Local::now()),
            tick_ms: config.tick_ms,
            ticks: 0,
            last_tick: Instant::now(),
        }
    }

    pub fn on_tick(&mut self) {
        self.cluster.advance(self.tick_ms);
        self.props = self.cluster.props();
        self.simulator.receive_props(&self.props, &mut self.cluster);
        self.ticks += 1;

        let total = self.cluster_activity_rate();
        self.activity_history.remove(0);
        self.activity_history.push(total);
        if total > self.peak_activity.0 {
            self.peak_activity = (total, Local::now());
        }
        debug!(tick = self.ticks, activity = total, "tick");
    }

    /// Summed client activity of all nodes, skipping non-finite rates.
    pub fn cluster_activity_rate(&self) -> f64 {
        self.simulator
            .node_histories()
            .values()
            .map(NodeHistory::client_activity_rate)
            .filter(|rate| rate.is_finite())
            .sum()
    }

    pub fn node_rows(&self) -> Vec<NodeRow> {
        let mut rows: Vec<NodeRow> = self
            .simulator
            .node_histories()
            .values()
            .map(|history| {
                let latest = history.latest();
                NodeRow {
                    node_id: history.id(),
                    address: latest.desc.address.clone(),
                    locality: format_locality(&latest.desc.locality),
                    activity_rate: history.client_activity_rate(),
                    total_ops: CLIENT_ACTIVITY_COUNTERS.iter().map(|n| latest.metric(n)).sum(),
                    liveness: self.props.liveness.get(&history.id()).copied().unwrap_or_default(),
                    updated_at: latest.updated_at,
                }
            })
            .collect();

        rows.sort_by(|a, b| b.activity_rate.total_cmp(&a.activity_rate).then(a.node_id.cmp(&b.node_id)));
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::SQL_SELECT_COUNT;
    use crate::status::NodeStatus;
    use clap::Parser;

    fn app(nodes: usize) -> App {
        let config = Config::parse_from(["cluster_viz", "--nodes", &nodes.to_string(), "--seed", "11"]);
        App::with_start(&config, Timestamp::from_millis(1_000_000))
    }

    #[test]
    fn first_tick_seeds_histories() {
        let mut app = app(4);
        assert!(app.simulator.node_histories().is_empty());

        app.on_tick();
        assert!(app.props.data_is_valid);
        assert_eq!(app.simulator.node_histories().len(), 4);
        assert_eq!(app.cluster_activity_rate(), 0.0);
    }

    #[test]
    fn non_finite_rates_are_left_out_of_total() {
        let mut app = app(3);
        for _ in 0..4 {
            app.on_tick();
        }
        let before = app.cluster_activity_rate();

        let mut props = app.props.clone();
        props.nodes_summary.node_statuses = vec![NodeStatus::new(99, Timestamp(0))];
        app.simulator.accumulate_history(&props);
        props.nodes_summary.node_statuses =
            vec![NodeStatus::new(99, Timestamp::from_millis(1000)).with_metric(SQL_SELECT_COUNT, f64::NAN)];
        app.simulator.accumulate_history(&props);
        assert!(app.simulator.node_histories()[&99].client_activity_rate().is_nan());

        let total = app.cluster_activity_rate();
        assert!(total.is_finite());
        assert_eq!(total, before);

        let rows = app.node_rows();
        assert_eq!(rows.len(), 4);
        assert!(rows.windows(2).all(|w| w[0].activity_rate.total_cmp(&w[1].activity_rate).is_ge()));
    }

    #[test]
    fn later_ticks_produce_rates() {
        let mut app = app(4);
        for _ in 0..6 {
            app.on_tick();
        }
        let rows = app.node_rows();
        assert_eq!(rows.len(), 4);
        assert!(rows.windows(2).all(|w| w[0].activity_rate >= w[1].activity_rate));
        assert!(rows.iter().all(|row| row.activity_rate >= 0.0));
        assert!(app.cluster_activity_rate() > 0.0);
        assert_eq!(app.activity_history.len(), ACTIVITY_HISTORY_LEN);
    }
}
