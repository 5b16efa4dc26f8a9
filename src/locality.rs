use std::{collections::BTreeMap, fmt};

use crate::status::{NodeId, NodeStatus};

/// One `key=value` level of a node's locality, e.g. `region=us-east`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LocalityTier {
    pub key: String,
    pub value: String,
}

impl LocalityTier {
    pub fn new(key: &str, value: &str) -> Self {
        Self {
            key: key.to_string(),
            value: value.to_string(),
        }
    }
}

impl fmt::Display for LocalityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// Nodes grouped by the successive tiers of their locality.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalityTree {
    pub tiers: Vec<LocalityTier>,
    pub localities: BTreeMap<String, BTreeMap<String, LocalityTree>>,
    pub nodes: Vec<NodeStatus>,
}

impl LocalityTree {
    pub fn build(statuses: &[NodeStatus]) -> Self {
        Self::build_at(Vec::new(), statuses.iter().collect())
    }

    fn build_at(tiers: Vec<LocalityTier>, statuses: Vec<&NodeStatus>) -> Self {
        let depth = tiers.len();
        let mut tree = LocalityTree {
            tiers,
            ..Default::default()
        };

        let mut children: BTreeMap<&LocalityTier, Vec<&NodeStatus>> = BTreeMap::new();
        for status in statuses {
            match status.desc.locality.get(depth) {
                Some(tier) => children.entry(tier).or_default().push(status),
                None => tree.nodes.push(status.clone()),
            }
        }

        for (tier, members) in children {
            let mut child_tiers = tree.tiers.clone();
            child_tiers.push(tier.clone());
            let child = Self::build_at(child_tiers, members);
            tree.localities
                .entry(tier.key.clone())
                .or_default()
                .insert(tier.value.clone(), child);
        }
        tree
    }

    pub fn children(&self) -> impl Iterator<Item = &LocalityTree> {
        self.localities.values().flat_map(|values| values.values())
    }

    /// Every node at or below this locality.
    pub fn all_nodes(&self) -> Vec<&NodeStatus> {
        let mut nodes: Vec<&NodeStatus> = self.nodes.iter().collect();
        for child in self.children() {
            nodes.extend(child.all_nodes());
        }
        nodes
    }

    pub fn name(&self) -> String {
        match self.tiers.last() {
            Some(tier) => tier.to_string(),
            None => "cluster".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub locality_key: String,
    pub locality_value: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Map coordinates keyed by locality key, then value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationTree {
    pub locations: BTreeMap<String, BTreeMap<String, Location>>,
}

impl LocationTree {
    pub fn from_locations(locations: impl IntoIterator<Item = Location>) -> Self {
        let mut tree = LocationTree::default();
        for location in locations {
            tree.locations
                .entry(location.locality_key.clone())
                .or_default()
                .insert(location.locality_value.clone(), location);
        }
        tree
    }

    /// Location of the most specific tier of `tiers`.
    pub fn locate(&self, tiers: &[LocalityTier]) -> Option<&Location> {
        let last = tiers.last()?;
        self.locations.get(&last.key)?.get(&last.value)
    }

    /// Location of a locality; falls back to the nearest located ancestor.
    pub fn locate_nearest(&self, tiers: &[LocalityTier]) -> Option<&Location> {
        (1..=tiers.len())
            .rev()
            .find_map(|len| self.locate(&tiers[..len]))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LivenessStatus {
    #[default]
    Unknown,
    Dead,
    Unavailable,
    Live,
    Decommissioning,
    Decommissioned,
}

impl LivenessStatus {
    pub fn label(self) -> &'static str {
        match self {
            LivenessStatus::Unknown => "unknown",
            LivenessStatus::Dead => "dead",
            LivenessStatus::Unavailable => "suspect",
            LivenessStatus::Live => "live",
            LivenessStatus::Decommissioning => "decommissioning",
            LivenessStatus::Decommissioned => "decommissioned",
        }
    }
}

pub type LivenessMap = BTreeMap<NodeId, LivenessStatus>;
