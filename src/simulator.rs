use std::collections::BTreeMap;

use tracing::debug;

use crate::history::NodeHistory;
use crate::locality::{LivenessMap, LocalityTier, LocalityTree, LocationTree};
use crate::status::{NodeId, NodesSummary};

/// Re-requests the three data sources the map view depends on.
pub trait Refresh {
    fn refresh_nodes(&mut self);
    fn refresh_liveness(&mut self);
    fn refresh_locations(&mut self);
}

/// Everything the map view reads from the data layer.
#[derive(Debug, Clone, Default)]
pub struct SimulatorProps {
    pub nodes_summary: NodesSummary,
    pub locality_tree: LocalityTree,
    pub location_tree: LocationTree,
    pub liveness: LivenessMap,
    /// True only once nodes, liveness and locations have all loaded.
    pub data_is_valid: bool,
}

pub type NodeHistories = BTreeMap<NodeId, NodeHistory>;

/// What the rendering layer should draw.
#[derive(Debug)]
pub enum MapView<'a> {
    Loading,
    Localities(LocalitiesView<'a>),
}

#[derive(Debug)]
pub struct LocalitiesView<'a> {
    pub node_histories: &'a NodeHistories,
    pub locality_tree: &'a LocalityTree,
    pub location_tree: &'a LocationTree,
    pub liveness: &'a LivenessMap,
    pub tiers: &'a [LocalityTier],
}

/// Augments node statuses with per-node history so the map can show
/// client activity rates.
#[derive(Debug, Default)]
pub struct NodeSimulator {
    node_histories: NodeHistories,
    tiers: Vec<LocalityTier>,
}

impl NodeSimulator {
    pub fn new(tiers: Vec<LocalityTier>) -> Self {
        Self {
            node_histories: BTreeMap::new(),
            tiers,
        }
    }

    pub fn mount<R: Refresh>(&mut self, props: &SimulatorProps, refresher: &mut R) {
        self.accumulate_history(props);
        Self::refresh_all(refresher);
    }

    pub fn receive_props<R: Refresh>(&mut self, props: &SimulatorProps, refresher: &mut R) {
        self.accumulate_history(props);
        Self::refresh_all(refresher);
    }

    /// Feeds every status of a valid batch to its node's history.
    pub fn accumulate_history(&mut self, props: &SimulatorProps) {
        if !props.data_is_valid {
            return;
        }

        for status in &props.nodes_summary.node_statuses {
            let id = status.desc.node_id;
            match self.node_histories.get_mut(&id) {
                Some(history) => {
                    history.update(status.clone());
                }
                None => {
                    debug!(node_id = id, "tracking new node");
                    self.node_histories.insert(id, NodeHistory::new(status.clone()));
                }
            }
        }
    }

    pub fn render<'a>(&'a self, props: &'a SimulatorProps) -> MapView<'a> {
        if !props.data_is_valid {
            return MapView::Loading;
        }
        MapView::Localities(LocalitiesView {
            node_histories: &self.node_histories,
            locality_tree: &props.locality_tree,
            location_tree: &props.location_tree,
            liveness: &props.liveness,
            tiers: &self.tiers,
        })
    }

    pub fn node_histories(&self) -> &NodeHistories {
        &self.node_histories
    }

    fn refresh_all<R: Refresh>(refresher: &mut R) {
        refresher.refresh_nodes();
        refresher.refresh_liveness();
        refresher.refresh_locations();
    }
}

impl LocalitiesView<'_> {
    /// Summed activity rate of every tracked node in `tree`.
    pub fn locality_activity_rate(&self, tree: &LocalityTree) -> f64 {
        tree.all_nodes()
            .iter()
            .filter_map(|status| self.node_histories.get(&status.desc.node_id))
            .map(NodeHistory::client_activity_rate)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::SQL_SELECT_COUNT;
    use crate::status::{NodeStatus, Timestamp};

    #[derive(Default)]
    struct CountingRefresher {
        nodes: usize,
        liveness: usize,
        locations: usize,
    }

    impl Refresh for CountingRefresher {
        fn refresh_nodes(&mut self) {
            self.nodes += 1;
        }
        fn refresh_liveness(&mut self) {
            self.liveness += 1;
        }
        fn refresh_locations(&mut self) {
            self.locations += 1;
        }
    }

    fn props(valid: bool, statuses: Vec<NodeStatus>) -> SimulatorProps {
        SimulatorProps {
            locality_tree: LocalityTree::build(&statuses),
            nodes_summary: NodesSummary { node_statuses: statuses },
            data_is_valid: valid,
            ..Default::default()
        }
    }

    fn status(id: NodeId, millis: i64, selects: f64) -> NodeStatus {
        NodeStatus::new(id, Timestamp::from_millis(millis)).with_metric(SQL_SELECT_COUNT, selects)
    }

    #[test]
    fn invalid_data_is_not_accumulated() {
        let mut sim = NodeSimulator::default();
        let mut refresher = CountingRefresher::default();
        sim.mount(&props(false, vec![status(1, 0, 0.0)]), &mut refresher);

        assert!(sim.node_histories().is_empty());
        assert_eq!((refresher.nodes, refresher.liveness, refresher.locations), (1, 1, 1));
    }

    #[test]
    fn histories_follow_batches() {
        let mut sim = NodeSimulator::default();
        let mut refresher = CountingRefresher::default();
        sim.mount(&props(true, vec![status(1, 0, 0.0), status(2, 0, 0.0)]), &mut refresher);
        sim.receive_props(&props(true, vec![status(1, 1000, 30.0), status(2, 2000, 10.0)]), &mut refresher);
        sim.receive_props(&props(true, vec![status(1, 500, 99.0)]), &mut refresher);

        let histories = sim.node_histories();
        assert_eq!(histories.len(), 2);
        assert_eq!(histories[&1].client_activity_rate(), 30.0);
        assert_eq!(histories[&2].client_activity_rate(), 5.0);
        assert_eq!(refresher.nodes, 3);
        assert_eq!(refresher.locations, 3);
    }

    #[test]
    fn render_waits_for_valid_data() {
        let sim = NodeSimulator::new(vec![LocalityTier::new("region", "")]);
        let loading = props(false, vec![]);
        assert!(matches!(sim.render(&loading), MapView::Loading));

        let ready = props(true, vec![]);
        match sim.render(&ready) {
            MapView::Localities(view) => assert_eq!(view.tiers.len(), 1),
            MapView::Loading => panic!("expected localities view"),
        }
    }

    #[test]
    fn locality_rate_sums_nodes() {
        let mut sim = NodeSimulator::default();
        let mut refresher = CountingRefresher::default();
        sim.mount(&props(true, vec![status(1, 0, 0.0), status(2, 0, 0.0)]), &mut refresher);
        let latest = props(true, vec![status(1, 1000, 4.0), status(2, 1000, 6.0)]);
        sim.receive_props(&latest, &mut refresher);

        let MapView::Localities(view) = sim.render(&latest) else {
            panic!("expected localities view");
        };
        assert_eq!(view.locality_activity_rate(view.locality_tree), 10.0);
    }
}
