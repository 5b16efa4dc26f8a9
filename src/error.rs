use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to install Ctrl-C handler: {0}")]
    Signal(#[from] ctrlc::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_convert() {
        let missing = std::fs::File::create("/nonexistent-dir/cluster_viz.log").map_err(Error::from);
        match missing {
            Err(err @ Error::Io(_)) => assert!(err.to_string().starts_with("I/O error: ")),
            other => panic!("expected an I/O error, got {:?}", other),
        }
    }
}
