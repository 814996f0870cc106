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

use std::collections::BTreeMap;
use std::ops::Range;

use serde::Serialize;

use crate::common::split_range_nicely;
use crate::ids::NodeId;
use crate::view::RrGraphView;

/// Summary of a finalized graph, gathered by several reader threads at once.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct GraphStats {
    pub num_nodes: usize,
    pub num_edges: usize,
    pub nodes_per_type: BTreeMap<&'static str, usize>,
    pub configurable_edges: usize,
    pub non_configurable_edges: usize,
    pub max_fan_out: usize,
    /// Only known when fan-in was computed.
    pub max_fan_in: Option<u32>,
    pub num_switches: usize,
    pub num_segments: usize,
    pub num_non_configurable_sets: usize,
}

impl GraphStats {
    fn collect_range(view: RrGraphView<'_>, range: Range<usize>) -> Self {
        let mut stats = Self::default();
        for node in range.map(NodeId::new) {
            view.prefetch_node(NodeId::new(node.index() + 1));

            *stats.nodes_per_type.entry(view.node_type_string(node)).or_insert(0) += 1;
            let configurable = view.num_configurable_edges(node);
            let total = view.num_edges(node);
            stats.configurable_edges += configurable;
            stats.non_configurable_edges += total - configurable;
            stats.max_fan_out = stats.max_fan_out.max(total);
            if view.has_fan_in() {
                let fan_in = view.node_fan_in(node);
                stats.max_fan_in = Some(stats.max_fan_in.map_or(fan_in, |max| max.max(fan_in)));
            }
        }
        stats
    }

    fn merge(mut self, other: Self) -> Self {
        for (ty, count) in other.nodes_per_type {
            *self.nodes_per_type.entry(ty).or_insert(0) += count;
        }
        self.configurable_edges += other.configurable_edges;
        self.non_configurable_edges += other.non_configurable_edges;
        self.max_fan_out = self.max_fan_out.max(other.max_fan_out);
        self.max_fan_in = match (self.max_fan_in, other.max_fan_in) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        self
    }

    /// Walks all nodes, splitting them evenly between `threads` workers.
    pub fn collect(view: RrGraphView<'_>, threads: usize) -> Self {
        let partial: Vec<Self> = std::thread::scope(|s| {
            let workers: Vec<_> = split_range_nicely(0 .. view.num_nodes(), threads)
                .map(|range| s.spawn(move || Self::collect_range(view, range)))
                .collect();
            workers.into_iter()
                .map(|worker| worker.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
                .collect()
        });

        let mut stats = partial.into_iter().fold(Self::default(), Self::merge);
        stats.num_nodes = view.num_nodes();
        stats.num_edges = view.edge_count();
        stats.num_switches = view.switches().len();
        stats.num_segments = view.segments().len();
        stats.num_non_configurable_sets = view.num_non_configurable_sets();
        stats
    }
}

impl std::fmt::Display for GraphStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Routing resource graph:")?;
        writeln!(f, "    No. of nodes:                     {}", self.num_nodes)?;
        for (ty, count) in &self.nodes_per_type {
            writeln!(f, "        {:<6}                        {}", ty, count)?;
        }
        writeln!(f, "    No. of edges:                     {}", self.num_edges)?;
        writeln!(f, "        configurable                  {}", self.configurable_edges)?;
        writeln!(f, "        non-configurable              {}", self.non_configurable_edges)?;
        writeln!(f, "    Max. fan-out:                     {}", self.max_fan_out)?;
        if let Some(fan_in) = self.max_fan_in {
            writeln!(f, "    Max. fan-in:                      {}", fan_in)?;
        }
        writeln!(f, "    No. of switches:                  {}", self.num_switches)?;
        writeln!(f, "    No. of segments:                  {}", self.num_segments)?;
        write!(f, "    No. of non-configurable sets:     {}", self.num_non_configurable_sets)
    }
}
