//! Error types for weight mutation policies

use thiserror::Error;

/// Errors raised while configuring or running a policy
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch { expected: Vec<usize>, actual: Vec<usize> },

    #[error("Unknown layer: {0}")]
    UnknownLayer(String),

    #[error("Failed to parse policy config: {0}")]
    ConfigParse(String),

    #[error("Host model error: {0}")]
    Host(String),
}

/// Result type for policy operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidConfig("volatility_ratio".to_string());
        assert!(format!("{err}").contains("Invalid configuration"));
        assert!(format!("{err}").contains("volatility_ratio"));

        let err = Error::ShapeMismatch { expected: vec![2, 2], actual: vec![4] };
        assert!(format!("{err}").contains("[2, 2]"));
        assert!(format!("{err}").contains("[4]"));

        let err = Error::UnknownLayer("dense_3".to_string());
        assert!(format!("{err}").contains("dense_3"));

        let err = Error::ConfigParse("bad yaml".to_string());
        assert!(format!("{err}").contains("Failed to parse"));

        let err = Error::Host("device lost".to_string());
        assert!(format!("{err}").contains("Host model error"));
    }
}
