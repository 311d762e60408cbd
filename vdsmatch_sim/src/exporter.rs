//! JSON exporter for scenario runs.
//!
//! Writes the full set of results of one `scenario` invocation so CI can
//! archive and diff them across commits.

use crate::runner::ScenarioResult;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;

/// Complete export of a batch of scenario runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioReport {
    /// First seed of the batch
    pub base_seed: u64,

    /// Worker threads used by the grid strategy
    pub workers: usize,

    pub total: usize,
    pub passed: usize,
    pub failed: usize,

    /// Mean recall over all runs
    pub mean_recall: f64,

    pub results: Vec<ScenarioResult>,
}

impl ScenarioReport {
    /// Creates an empty report.
    pub fn new(base_seed: u64, workers: usize) -> Self {
        Self {
            base_seed,
            workers,
            total: 0,
            passed: 0,
            failed: 0,
            mean_recall: 0.0,
            results: Vec::new(),
        }
    }

    /// Adds a result and updates the totals.
    pub fn add(&mut self, result: ScenarioResult) {
        self.total += 1;
        if result.passed {
            self.passed += 1;
        } else {
            self.failed += 1;
        }
        self.mean_recall += (result.recall - self.mean_recall) / self.total as f64;
        self.results.push(result);
    }

    /// Results that did not pass.
    pub fn failures(&self) -> impl Iterator<Item = &ScenarioResult> {
        self.results.iter().filter(|r| !r.passed)
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: &str) -> std::io::Result<()> {
        let json = self.to_json()?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::ScenarioTimings;
    use crate::scenarios::ScenarioId;

    fn result(passed: bool, recall: f64) -> ScenarioResult {
        ScenarioResult {
            scenario: ScenarioId::Lattice,
            seed: 1,
            passed,
            sensors: 10,
            matched: 8,
            agreement: 0.8,
            recall,
            failure_reason: (!passed).then(|| "boom".to_string()),
            timings: ScenarioTimings::default(),
        }
    }

    #[test]
    fn test_totals() {
        let mut report = ScenarioReport::new(42, 4);
        report.add(result(true, 1.0));
        report.add(result(false, 0.5));

        assert_eq!(report.total, 2);
        assert_eq!(report.passed, 1);
        assert_eq!(report.failed, 1);
        assert!((report.mean_recall - 0.75).abs() < 1e-12);
        assert_eq!(report.failures().count(), 1);
    }

    #[test]
    fn test_json_shape() {
        let mut report = ScenarioReport::new(7, 1);
        report.add(result(true, 1.0));
        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

        assert_eq!(value["base_seed"], 7);
        assert_eq!(value["results"][0]["scenario"], "lattice");
        assert!(value["results"][0]["failure_reason"].is_null());
    }
}
