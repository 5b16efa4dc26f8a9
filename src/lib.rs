//! Simulated cluster map: node statuses are tracked per node to derive
//! client activity rates, which are drawn on a terminal map.

pub mod app;
pub mod config;
pub mod constants;
pub mod error;
pub mod history;
pub mod locality;
pub mod simulator;
pub mod source;
pub mod status;
pub mod ui;
pub mod util;

pub use error::{Error, Result};
pub use history::NodeHistory;
pub use simulator::{MapView, NodeSimulator, Refresh, SimulatorProps};
pub use status::{NodeId, NodeStatus, NodesSummary, Timestamp};
