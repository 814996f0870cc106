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

//! Pass-through annotations (FASM features and the like) attached to nodes
//! and edges. Nothing in the graph algorithms reads them.

use std::collections::HashMap;

use crate::ids::*;
use crate::strings::{StringId, StringPool};

type Attributes = Vec<(StringId, StringId)>;

/// Edges are keyed by endpoints and switch, so metadata survives edge
/// renumbering during partitioning.
pub type EdgeKey = (NodeId, NodeId, SwitchId);

#[derive(Clone, Debug, Default)]
pub struct MetadataStore {
    strings: StringPool,
    nodes: HashMap<NodeId, Attributes>,
    edges: HashMap<EdgeKey, Attributes>,
}

fn set_attribute(attrs: &mut Attributes, key: StringId, value: StringId) {
    match attrs.iter_mut().find(|(k, _)| *k == key) {
        Some((_, v)) => *v = value,
        None => attrs.push((key, value)),
    }
}

impl MetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key` of `node`, replacing an earlier value.
    pub fn add_node_metadata(&mut self, node: NodeId, key: &str, value: &str) {
        let key = self.strings.create_string(key);
        let value = self.strings.create_string(value);
        set_attribute(self.nodes.entry(node).or_default(), key, value);
    }

    pub fn add_edge_metadata(&mut self, edge: EdgeKey, key: &str, value: &str) {
        let key = self.strings.create_string(key);
        let value = self.strings.create_string(value);
        set_attribute(self.edges.entry(edge).or_default(), key, value);
    }

    fn lookup<'s>(&'s self, attrs: Option<&'s Attributes>, key: &str) -> Option<&'s str> {
        let key = self.strings.find(key)?;
        attrs?.iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| self.strings.get_string(*v))
    }

    pub fn node_metadata(&self, node: NodeId, key: &str) -> Option<&str> {
        self.lookup(self.nodes.get(&node), key)
    }

    pub fn edge_metadata(&self, edge: EdgeKey, key: &str) -> Option<&str> {
        self.lookup(self.edges.get(&edge), key)
    }

    pub fn node_attributes(&self, node: NodeId) -> impl Iterator<Item = (&str, &str)> {
        self.nodes.get(&node)
            .into_iter()
            .flatten()
            .map(|(k, v)| (self.strings.get_string(*k), self.strings.get_string(*v)))
    }

    pub fn edge_attributes(&self, edge: EdgeKey) -> impl Iterator<Item = (&str, &str)> {
        self.edges.get(&edge)
            .into_iter()
            .flatten()
            .map(|(k, v)| (self.strings.get_string(*k), self.strings.get_string(*v)))
    }

    pub fn annotated_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    pub fn annotated_edges(&self) -> impl Iterator<Item = EdgeKey> + '_ {
        self.edges.keys().copied()
    }

    /// Rekeys every entry through `remap`. Entries whose node (or either
    /// endpoint, for edges) maps to `None` are dropped.
    pub fn remap_nodes<F>(&mut self, remap: F) where
        F: Fn(NodeId) -> Option<NodeId>
    {
        self.nodes = std::mem::take(&mut self.nodes)
            .into_iter()
            .filter_map(|(node, attrs)| Some((remap(node)?, attrs)))
            .collect();
        self.edges = std::mem::take(&mut self.edges)
            .into_iter()
            .filter_map(|((src, dest, switch), attrs)| {
                Some(((remap(src)?, remap(dest)?, switch), attrs))
            })
            .collect();
    }

    /// Drops edge entries for which `keep` returns `false`.
    pub fn retain_edges<F>(&mut self, keep: F) where
        F: Fn(EdgeKey) -> bool
    {
        self.edges.retain(|key, _| keep(*key));
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
