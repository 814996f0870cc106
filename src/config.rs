/* Copyright (C) 2022 Antmicro
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     https://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RrGraphError};

/// Node-order optimizations applied after partitioning.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReorderAlgorithm {
    #[default]
    None,
    /// Sort by total degree, ties broken by breadth-first discovery order.
    DegreeBfs,
    /// Seeded shuffle, for checking that nothing depends on node order.
    RandomShuffle,
}

impl std::str::FromStr for ReorderAlgorithm {
    type Err = RrGraphError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(ReorderAlgorithm::None),
            "degree_bfs" => Ok(ReorderAlgorithm::DegreeBfs),
            "random_shuffle" => Ok(ReorderAlgorithm::RandomShuffle),
            _ => Err(RrGraphError::Config(format!("unknown reorder algorithm `{}`", s))),
        }
    }
}

/// Knobs of `RrGraphBuilder::finalize`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RrGraphOptions {
    pub reorder: ReorderAlgorithm,
    /// Graphs with fewer nodes are never reordered.
    pub reorder_threshold: usize,
    pub reorder_seed: u64,
    pub compute_fan_in: bool,
    pub build_in_edges: bool,
    pub validate: bool,
}

impl Default for RrGraphOptions {
    fn default() -> Self {
        Self {
            reorder: ReorderAlgorithm::None,
            reorder_threshold: 0,
            reorder_seed: 1,
            compute_fan_in: true,
            build_in_edges: false,
            validate: true,
        }
    }
}

impl RrGraphOptions {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| RrGraphError::Config(e.to_string()))
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| RrGraphError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_yaml_str(&yaml)
    }

    /// Applies `RRGRAPH_REORDER`, `RRGRAPH_REORDER_THRESHOLD` and
    /// `RRGRAPH_REORDER_SEED` on top of the current values.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    pub(crate) fn with_overrides<F>(mut self, var: F) -> Result<Self> where
        F: Fn(&str) -> Option<String>
    {
        if let Some(reorder) = var("RRGRAPH_REORDER") {
            self.reorder = reorder.parse()?;
        }
        if let Some(threshold) = var("RRGRAPH_REORDER_THRESHOLD") {
            self.reorder_threshold = threshold.parse().map_err(|_| RrGraphError::Config(
                format!("RRGRAPH_REORDER_THRESHOLD is not a number: `{}`", threshold)
            ))?;
        }
        if let Some(seed) = var("RRGRAPH_REORDER_SEED") {
            self.reorder_seed = seed.parse().map_err(|_| RrGraphError::Config(
                format!("RRGRAPH_REORDER_SEED is not a number: `{}`", seed)
            ))?;
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let options = RrGraphOptions::from_yaml_str(
            "reorder: degree_bfs\nreorder_threshold: 1000\n"
        ).unwrap();

        assert_eq!(options.reorder, ReorderAlgorithm::DegreeBfs);
        assert_eq!(options.reorder_threshold, 1000);
        assert_eq!(options.reorder_seed, 1);
        assert!(options.validate);
        assert!(!options.build_in_edges);
    }

    #[test]
    fn test_bad_yaml() {
        assert!(matches!(
            RrGraphOptions::from_yaml_str("reorder: sideways\n"),
            Err(RrGraphError::Config(_))
        ));
    }

    #[test]
    fn test_overrides() {
        let vars = |name: &str| match name {
            "RRGRAPH_REORDER" => Some("random_shuffle".to_string()),
            "RRGRAPH_REORDER_SEED" => Some("42".to_string()),
            _ => None,
        };
        let options = RrGraphOptions::default().with_overrides(vars).unwrap();
        assert_eq!(options.reorder, ReorderAlgorithm::RandomShuffle);
        assert_eq!(options.reorder_seed, 42);

        let bad = |name: &str| (name == "RRGRAPH_REORDER_THRESHOLD").then(|| "many".to_string());
        assert!(RrGraphOptions::default().with_overrides(bad).is_err());
    }
}
