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

//! Groups of nodes tied together by non-configurable edges. The router has to
//! treat every such group as a single electrical net.

use crate::error::{Result, RrGraphError};
use crate::ids::*;
use crate::storage::EdgeStore;
use crate::tables::SwitchTable;

#[derive(Clone, Debug, Default)]
pub struct NonConfigurableSets {
    sets: Vec<Vec<NodeId>>,
    node_to_set: Vec<NonConfigSetId>,
}

fn find_root(parent: &mut [usize], mut node: usize) -> usize {
    while parent[node] != node {
        parent[node] = parent[parent[node]];
        node = parent[node];
    }
    node
}

impl NonConfigurableSets {
    /// Unions the endpoints of every non-configurable edge. Nodes without any
    /// such edge belong to no set.
    pub fn build(edges: &EdgeStore, switches: &SwitchTable, num_nodes: usize) -> Result<Self> {
        let mut parent: Vec<usize> = (0 .. num_nodes).collect();
        let mut touched = vec![false; num_nodes];

        for (src, dest, switch, _) in edges.iter() {
            let configurable = switches.is_configurable_raw(switch)
                .ok_or(RrGraphError::SwitchOutOfRange(switch as usize))?;
            if configurable {
                continue;
            }
            if src.index() >= num_nodes || dest.index() >= num_nodes {
                return Err(RrGraphError::structural("non_configurable_edge", src.index()));
            }
            touched[src.index()] = true;
            touched[dest.index()] = true;
            let (a, b) = (find_root(&mut parent, src.index()), find_root(&mut parent, dest.index()));
            if a != b {
                parent[a.max(b)] = a.min(b);
            }
        }

        /* Walking nodes in order keeps every set sorted and numbers sets by
         * their lowest member */
        let mut sets: Vec<Vec<NodeId>> = Vec::new();
        let mut node_to_set = vec![NonConfigSetId::INVALID; num_nodes];
        let mut root_to_set = vec![NonConfigSetId::INVALID; num_nodes];
        for node in (0 .. num_nodes).filter(|n| touched[*n]) {
            let root = find_root(&mut parent, node);
            if !root_to_set[root].is_valid() {
                root_to_set[root] = NonConfigSetId::new(sets.len());
                sets.push(Vec::new());
            }
            let set = root_to_set[root];
            sets[set.index()].push(NodeId::new(node));
            node_to_set[node] = set;
        }

        dbg_log!(crate::log::DBG_INFO, "Found {} non-configurable node sets", sets.len());

        let sets = Self { sets, node_to_set };
        sets.verify()?;
        Ok(sets)
    }

    pub fn verify(&self) -> Result<()> {
        for (idx, set) in self.sets.iter().enumerate() {
            if set.is_empty() || set.windows(2).any(|w| w[0] >= w[1]) {
                return Err(RrGraphError::structural("non_configurable_set", idx));
            }
            for node in set {
                if self.node_to_set.get(node.index()) != Some(&NonConfigSetId::new(idx)) {
                    return Err(RrGraphError::structural("non_configurable_set", idx));
                }
            }
        }
        let members: usize = self.sets.iter().map(Vec::len).sum();
        if members != self.node_to_set.iter().filter(|s| s.is_valid()).count() {
            return Err(RrGraphError::structural("non_configurable_set", self.sets.len()));
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn set_of(&self, node: NodeId) -> Option<NonConfigSetId> {
        self.node_to_set.get(node.index()).copied().filter(|s| s.is_valid())
    }

    pub fn nodes(&self, set: NonConfigSetId) -> &[NodeId] {
        self.sets.get(set.index()).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (NonConfigSetId, &[NodeId])> {
        self.sets.iter().enumerate().map(|(idx, set)| (NonConfigSetId::new(idx), set.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::EdgeSwitch;
    use crate::tables::{RrSwitch, SwitchKind};

    #[test]
    fn test_sets_follow_shorts() {
        let mut switches = SwitchTable::new();
        switches.add(RrSwitch::new("mux", SwitchKind::Mux, 0.0));
        switches.add(RrSwitch::new("short", SwitchKind::Short, 0.0));

        let n = NodeId::new;
        let short = EdgeSwitch::Graph(SwitchId::new(1));
        let mux = EdgeSwitch::Graph(SwitchId::new(0));

        let mut edges = EdgeStore::new();
        edges.push(n(4), n(1), short).unwrap();
        edges.push(n(1), n(5), short).unwrap();
        edges.push(n(0), n(2), mux).unwrap();
        edges.push(n(3), n(2), short).unwrap();
        edges.mark_already_resolved().unwrap();

        let sets = NonConfigurableSets::build(&edges, &switches, 6).unwrap();
        assert_eq!(sets.len(), 2);
        assert_eq!(sets.set_of(n(0)), None);
        assert_eq!(sets.nodes(sets.set_of(n(4)).unwrap()), &[n(1), n(4), n(5)]);
        assert_eq!(sets.nodes(sets.set_of(n(2)).unwrap()), &[n(2), n(3)]);
        assert_eq!(sets.set_of(n(1)), Some(NonConfigSetId::new(0)));
    }
}
