pub const TICK_RATE_MS: u64 = 1000;
pub const MAX_TICK_RATE_MS: u64 = 3_600_000;
pub const DEFAULT_NODE_COUNT: usize = 9;

// Node statuses kept per node; two are enough for an instantaneous rate
pub const MAX_HISTORY: usize = 2;

// Counters summed into the client activity rate
pub const SQL_SELECT_COUNT: &str = "sql.select.count";
pub const SQL_UPDATE_COUNT: &str = "sql.update.count";
pub const SQL_INSERT_COUNT: &str = "sql.insert.count";
pub const SQL_DELETE_COUNT: &str = "sql.delete.count";

pub const CLIENT_ACTIVITY_COUNTERS: [&str; 4] = [
    SQL_SELECT_COUNT,
    SQL_UPDATE_COUNT,
    SQL_INSERT_COUNT,
    SQL_DELETE_COUNT,
];

pub const NANOS_PER_MILLI: f64 = 1_000_000.0;
