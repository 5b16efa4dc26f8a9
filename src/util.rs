use crate::locality::LocalityTier;

// Format function: SQL operations per second for display
pub fn format_rate(ops_per_sec: f64) -> String {
    const K: f64 = 1000.0;
    const M: f64 = 1000.0 * K;

    if !ops_per_sec.is_finite() {
        "-".to_string()
    } else if ops_per_sec.abs() >= M {
        format!("{:.2}M ops/s", ops_per_sec / M)
    } else if ops_per_sec.abs() >= K {
        format!("{:.2}k ops/s", ops_per_sec / K)
    } else {
        format!("{:.1} ops/s", ops_per_sec)
    }
}

pub fn format_count(count: f64) -> String {
    const K: f64 = 1000.0;
    const M: f64 = 1000.0 * K;
    const G: f64 = 1000.0 * M;
    if count >= G {
        format!("{:.2}G", count / G)
    } else if count >= M {
        format!("{:.2}M", count / M)
    } else if count >= K {
        format!("{:.2}k", count / K)
    } else {
        format!("{:.0}", count)
    }
}

pub fn format_locality(tiers: &[LocalityTier]) -> String {
    tiers
        .iter()
        .map(|tier| tier.to_string())
        .collect::<Vec<_>>()
        .join(",")
}
