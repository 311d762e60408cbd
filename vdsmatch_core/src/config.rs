//! Matching configuration.
//!
//! Cell dimension and worker count are inputs, never computed by the
//! matchers themselves. [`CellSizing`] resolves the dimension against a
//! concrete network before the grid is built.

use crate::error::MatchError;
use crate::network::Network;
use serde::{Deserialize, Serialize};

/// Which matching strategy to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Scan every link for every sensor
    Exhaustive,
    /// Scan only the links of the sensor's grid cell, in parallel
    Grid,
}

impl Strategy {
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Exhaustive => "exhaustive",
            Strategy::Grid => "grid",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "exhaustive" | "greedy" | "naive" => Ok(Strategy::Exhaustive),
            "grid" | "pic" => Ok(Strategy::Grid),
            _ => Err(format!("Unknown strategy: {}", s)),
        }
    }
}

/// How the grid's cell edge length is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellSizing {
    /// Fixed edge length in degrees
    Fixed(f64),
    /// Longest link length divided by this factor
    DivideMaxLinkLength(f64),
}

impl CellSizing {
    /// Resolves the edge length for a concrete network.
    pub fn resolve(&self, network: &Network) -> Result<f64, MatchError> {
        let dimension = match *self {
            CellSizing::Fixed(d) => d,
            CellSizing::DivideMaxLinkLength(divisor) => network.max_link_length()? / divisor,
        };
        if !(dimension.is_finite() && dimension > 0.0) {
            return Err(MatchError::config(format!(
                "cell dimension resolved to {} (sizing {:?})",
                dimension, self
            )));
        }
        Ok(dimension)
    }
}

/// Configuration for a matching run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Strategy to run (default: grid)
    pub strategy: Strategy,

    /// Cell edge length (default: max link length / 10)
    pub cell_sizing: CellSizing,

    /// Worker threads for the grid strategy (default: available parallelism)
    pub workers: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::Grid,
            cell_sizing: CellSizing::DivideMaxLinkLength(10.0),
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        }
    }
}

impl MatchConfig {
    /// Parses a JSON configuration; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, MatchError> {
        let config: MatchConfig =
            serde_json::from_str(json).map_err(|e| MatchError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks values that do not depend on the network.
    pub fn validate(&self) -> Result<(), MatchError> {
        if self.workers == 0 {
            return Err(MatchError::config("workers must be at least 1"));
        }
        match self.cell_sizing {
            CellSizing::Fixed(d) if !(d.is_finite() && d > 0.0) => {
                Err(MatchError::config(format!("cell size must be positive, got {}", d)))
            }
            CellSizing::DivideMaxLinkLength(n) if !(n.is_finite() && n > 0.0) => {
                Err(MatchError::config(format!("divisor must be positive, got {}", n)))
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GeoPosition;
    use crate::network::{LinkId, NetworkBuilder, NodeId};
    use approx::assert_relative_eq;

    #[test]
    fn test_default_is_valid() {
        let config = MatchConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.strategy, Strategy::Grid);
        assert!(config.workers >= 1);
    }

    #[test]
    fn test_json_partial_override() {
        let config = MatchConfig::from_json_str(
            r#"{ "strategy": "exhaustive", "cell_sizing": { "fixed": 0.05 }, "workers": 3 }"#,
        )
        .unwrap();
        assert_eq!(config.strategy, Strategy::Exhaustive);
        assert_eq!(config.cell_sizing, CellSizing::Fixed(0.05));
        assert_eq!(config.workers, 3);

        let config = MatchConfig::from_json_str(r#"{ "workers": 2 }"#).unwrap();
        assert_eq!(config.strategy, Strategy::Grid);
    }

    #[test]
    fn test_zero_workers_rejected() {
        let err = MatchConfig::from_json_str(r#"{ "workers": 0 }"#).unwrap_err();
        assert!(matches!(err, MatchError::InvalidConfig(_)));
    }

    #[test]
    fn test_strategy_aliases() {
        assert_eq!("PIC".parse::<Strategy>().unwrap(), Strategy::Grid);
        assert_eq!("greedy".parse::<Strategy>().unwrap(), Strategy::Exhaustive);
        assert!("fast".parse::<Strategy>().is_err());
    }

    #[test]
    fn test_divide_max_link_length() {
        let mut b = NetworkBuilder::new();
        b.add_link_with_nodes(
            LinkId(1),
            (NodeId(1), GeoPosition::new(0.0, 0.0)),
            (NodeId(2), GeoPosition::new(0.0, 2.0)),
        );
        let net = b.build().unwrap();

        let d = CellSizing::DivideMaxLinkLength(4.0).resolve(&net).unwrap();
        assert_relative_eq!(d, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_divide_on_empty_network_fails() {
        let net = NetworkBuilder::new().build().unwrap();
        assert!(CellSizing::DivideMaxLinkLength(4.0).resolve(&net).is_err());
    }
}
