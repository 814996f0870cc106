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

/* Post-construction graph surgery (e.g. cutting wires at interposer
 * boundaries). Both operations drop the builder back to `Remapped`: fan-in and
 * edge ranges have to be computed again before the graph can be read. */

use std::collections::HashSet;

use crate::error::{Result, RrGraphError};
use crate::ids::*;
use crate::log::*;
use crate::metadata::EdgeKey;
use crate::nonconfig::NonConfigurableSets;

use super::{Partitioned, Remapped, RrGraphBuilder};

/// Old to new node ids after `remove_nodes`. Surviving nodes keep their
/// relative order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeRenumbering {
    old_to_new: Vec<NodeId>,
    removed: usize,
}

impl NodeRenumbering {
    /// New id of `old`, `None` if it was removed.
    pub fn new_id(&self, old: NodeId) -> Option<NodeId> {
        self.old_to_new.get(old.index()).copied().filter(|node| node.is_valid())
    }

    pub fn num_removed(&self) -> usize {
        self.removed
    }
}

impl RrGraphBuilder<Partitioned> {
    /// Drops the given edges. Ids refer to the current partitioned order.
    pub fn remove_edges(mut self, edges: &[EdgeId]) -> Result<RrGraphBuilder<Remapped>> {
        if let Some(bad) = edges.iter().find(|e| e.index() >= self.data.edges.len()) {
            return Err(RrGraphError::contract(format!(
                "removing edge {} out of range ({} edges)", bad, self.data.edges.len()
            )));
        }

        let removed = self.data.edges.remove_edges(edges);
        self.data.non_config = NonConfigurableSets::default();

        let remaining: HashSet<EdgeKey> = self.data.edges.iter()
            .map(|(src, dest, switch, _)| (src, dest, SwitchId::from_raw(switch)))
            .collect();
        self.data.metadata.retain_edges(|key| remaining.contains(&key));

        dbg_log!(DBG_INFO, "Removed {} edges", removed);

        Ok(self.into_state())
    }

    /// Drops the given nodes together with every edge touching them and
    /// renumbers the survivors densely.
    pub fn remove_nodes(mut self, nodes: &[NodeId])
        -> Result<(RrGraphBuilder<Remapped>, NodeRenumbering)>
    {
        let num_nodes = self.data.nodes.len();
        let mut keep = vec![true; num_nodes];
        for node in nodes {
            match keep.get_mut(node.index()) {
                Some(slot) => *slot = false,
                None => return Err(RrGraphError::contract(format!(
                    "removing node {} out of range ({} nodes)", node, num_nodes
                ))),
            }
        }

        let mut next = 0;
        let old_to_new: Vec<NodeId> = keep.iter()
            .map(|keep| if *keep {
                next += 1;
                NodeId::new(next - 1)
            } else {
                NodeId::INVALID
            })
            .collect();
        let removed = num_nodes - next;

        self.data.nodes.compact(&old_to_new);
        let removed_edges = self.data.edges.remove_nodes(&old_to_new);
        self.data.spatial.reorder(&old_to_new);
        self.data.metadata.remap_nodes(|node| {
            old_to_new.get(node.index()).copied().filter(|node| node.is_valid())
        });
        self.data.non_config = NonConfigurableSets::default();

        dbg_log!(DBG_INFO, "Removed {} nodes and {} edges", removed, removed_edges);

        Ok((self.into_state(), NodeRenumbering { old_to_new, removed }))
    }
}
