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

use std::collections::VecDeque;

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::config::ReorderAlgorithm;
use crate::error::Result;
use crate::ids::*;
use crate::log::*;
use crate::storage::EdgeStore;

use super::{Partitioned, RrGraphBuilder};

/// A node renumbering applied by `reorder_nodes`. Every id obtained before
/// the reorder has to be translated through it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodePermutation {
    new_to_old: Vec<NodeId>,
    old_to_new: Vec<NodeId>,
}

impl NodePermutation {
    fn from_new_to_old(new_to_old: Vec<NodeId>) -> Self {
        let mut old_to_new = vec![NodeId::INVALID; new_to_old.len()];
        for (new, old) in new_to_old.iter().enumerate() {
            old_to_new[old.index()] = NodeId::new(new);
        }
        Self { new_to_old, old_to_new }
    }

    pub fn new_id(&self, old: NodeId) -> NodeId {
        self.old_to_new[old.index()]
    }

    pub fn old_id(&self, new: NodeId) -> NodeId {
        self.new_to_old[new.index()]
    }

    pub fn len(&self) -> usize {
        self.new_to_old.len()
    }

    pub fn is_empty(&self) -> bool {
        self.new_to_old.is_empty()
    }

    pub fn is_identity(&self) -> bool {
        self.new_to_old.iter().enumerate().all(|(new, old)| old.index() == new)
    }
}

/* Walks the graph breadth-first from every yet unvisited node, in id order.
 * Each visited node gets its out-degree added to its own counter and one
 * added to each of its successors, which adds up to the total degree. */
fn degree_bfs_order(edges: &EdgeStore, num_nodes: usize) -> Vec<NodeId> {
    const UNVISITED: usize = usize::MAX;

    let mut bfs_idx = vec![UNVISITED; num_nodes];
    let mut degree = vec![0usize; num_nodes];
    let mut queue = VecDeque::new();
    let mut cur_idx = 0;

    for root in 0 .. num_nodes {
        if bfs_idx[root] != UNVISITED {
            continue;
        }
        bfs_idx[root] = cur_idx;
        cur_idx += 1;
        queue.push_back(NodeId::new(root));

        while let Some(node) = queue.pop_front() {
            let range = edges.edge_range(node);
            degree[node.index()] += range.len();
            for edge in range {
                let next = edges.edge_dest(edge).index();
                degree[next] += 1;
                if bfs_idx[next] == UNVISITED {
                    bfs_idx[next] = cur_idx;
                    cur_idx += 1;
                    queue.push_back(NodeId::new(next));
                }
            }
        }
    }

    let mut order: Vec<NodeId> = (0 .. num_nodes).map(NodeId::new).collect();
    order.sort_by(|a, b| {
        degree[b.index()].cmp(&degree[a.index()])
            .then(bfs_idx[a.index()].cmp(&bfs_idx[b.index()]))
    });
    order
}

fn random_order(num_nodes: usize, seed: u64) -> Vec<NodeId> {
    let mut order: Vec<NodeId> = (0 .. num_nodes).map(NodeId::new).collect();
    let mut rng = SmallRng::seed_from_u64(seed);
    order.shuffle(&mut rng);
    order
}

impl RrGraphBuilder<Partitioned> {
    /// Renumbers nodes for better cache locality. Graphs with fewer than
    /// `threshold` nodes are left alone, in which case `None` is returned.
    ///
    /// Edges are partitioned again and every id-keyed structure is remapped,
    /// so the graph means the same thing afterwards. Ids handed out earlier
    /// are invalidated.
    pub fn reorder_nodes(&mut self, algorithm: ReorderAlgorithm, threshold: usize, seed: u64)
        -> Result<Option<NodePermutation>>
    {
        let num_nodes = self.data.nodes.len();
        if algorithm == ReorderAlgorithm::None || num_nodes < threshold {
            return Ok(None);
        }

        let new_to_old = match algorithm {
            ReorderAlgorithm::DegreeBfs => degree_bfs_order(&self.data.edges, num_nodes),
            ReorderAlgorithm::RandomShuffle => random_order(num_nodes, seed),
            ReorderAlgorithm::None => return Ok(None),
        };
        let permutation = NodePermutation::from_new_to_old(new_to_old);

        dbg_log!(DBG_INFO, "Reordering {} nodes with {:?}", num_nodes, algorithm);

        self.apply_permutation(&permutation)?;
        Ok(Some(permutation))
    }

    fn apply_permutation(&mut self, permutation: &NodePermutation) -> Result<()> {
        let old_to_new = &permutation.old_to_new;
        let had_in_edges = self.data.edges.has_in_edges();

        self.data.nodes.reorder(&permutation.new_to_old, old_to_new);
        self.data.edges.permute_nodes(old_to_new);
        self.repartition()?;
        self.data.spatial.reorder(old_to_new);
        self.data.metadata.remap_nodes(|node| old_to_new.get(node.index()).copied());

        if had_in_edges {
            self.build_in_edges()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permutation_inverse() {
        let n = NodeId::new;
        let perm = NodePermutation::from_new_to_old(vec![n(2), n(0), n(1)]);

        assert_eq!(perm.new_id(n(2)), n(0));
        assert_eq!(perm.old_id(n(2)), n(1));
        assert!(!perm.is_identity());
    }

    #[test]
    fn test_random_order_is_seeded() {
        assert_eq!(random_order(50, 7), random_order(50, 7));
        assert_ne!(random_order(50, 7), random_order(50, 8));

        let mut order = random_order(50, 7);
        order.sort();
        assert_eq!(order, (0 .. 50).map(NodeId::new).collect::<Vec<_>>());
    }
}
