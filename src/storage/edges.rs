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

use std::collections::HashMap;

use replace_with::replace_with_or_abort;

use crate::error::{Result, RrGraphError};
use crate::ids::*;
use crate::log::*;
use crate::tables::{ArchSwitch, FanInBucket, SwitchFanInTable, SwitchTable};

/// Switch of a staged edge. A staging run uses only one of the two.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum EdgeSwitch {
    /// Architecture switch, resolved later by fan-in remapping.
    Arch(ArchSwitchId),
    /// Graph switch, already resolved by whoever produced the edge.
    Graph(SwitchId),
}

impl EdgeSwitch {
    fn raw(self) -> u16 {
        match self {
            EdgeSwitch::Arch(id) => id.index() as u16,
            EdgeSwitch::Graph(id) => id.index() as u16,
        }
    }

    fn convention(self) -> SwitchConvention {
        match self {
            EdgeSwitch::Arch(_) => SwitchConvention::Arch,
            EdgeSwitch::Graph(_) => SwitchConvention::Graph,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum SwitchConvention {
    Arch,
    Graph,
}

/// Reverse-edge index in CSR form: edges entering node `n` are
/// `edges[offsets[n] .. offsets[n + 1]]`.
#[derive(Clone, Debug, Default)]
struct InEdges {
    offsets: Vec<u32>,
    edges: Vec<EdgeId>,
}

/// Edge columns plus everything derived from them during finalization.
///
/// Edges are staged in arbitrary order. Finalization resolves their switches,
/// sorts them by source with the configurable edges of every node first, and
/// derives per-node edge ranges. Reading any of that latches the store, so it
/// has to be unlocked explicitly before edges can be appended again.
#[derive(Clone, Debug, Default)]
pub struct EdgeStore {
    src: Vec<NodeId>,
    dest: Vec<NodeId>,
    switch: Vec<u16>,
    remapped: Vec<bool>,

    /* `num_nodes + 1` entries once partitioned, empty otherwise */
    first_edge: Vec<EdgeId>,
    fan_in: Vec<u32>,
    fan_in_valid: bool,
    in_edges: Option<InEdges>,

    edges_read: bool,
    partitioned: bool,
    convention: Option<SwitchConvention>,
}

impl EdgeStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.src.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.src.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.src.capacity()
    }

    #[inline]
    pub fn edges_read(&self) -> bool {
        self.edges_read
    }

    #[inline]
    pub fn is_partitioned(&self) -> bool {
        self.partitioned
    }

    pub fn is_fan_in_valid(&self) -> bool {
        self.fan_in_valid
    }

    pub fn has_in_edges(&self) -> bool {
        self.in_edges.is_some()
    }

    /// True when the current staging run appended architecture switches.
    pub fn stages_arch_switches(&self) -> bool {
        self.convention == Some(SwitchConvention::Arch)
    }

    /// Highest node id any staged edge refers to.
    pub fn max_endpoint(&self) -> Option<NodeId> {
        self.src.iter().chain(self.dest.iter()).max().copied()
    }

    /// True when every edge holds a graph switch.
    pub fn all_remapped(&self) -> bool {
        self.remapped.iter().all(|r| *r)
    }

    fn check_mutable(&self, op: &str) -> Result<()> {
        if self.edges_read {
            return Err(RrGraphError::contract(format!(
                "{} after the edges have been read, unlock the edge store first", op
            )));
        }
        Ok(())
    }

    /* Anything that adds or removes edges makes derived data stale */
    fn invalidate_derived(&mut self) {
        self.partitioned = false;
        self.first_edge.clear();
        self.fan_in_valid = false;
        self.in_edges = None;
    }

    fn adopt_convention(&mut self, convention: SwitchConvention) -> Result<()> {
        match self.convention {
            Some(current) if current != convention => Err(RrGraphError::contract(format!(
                "edge switch convention mixed within one staging run: {:?} after {:?}",
                convention, current
            ))),
            _ => {
                self.convention = Some(convention);
                Ok(())
            },
        }
    }

    /* --- Staging --- */

    pub fn reserve(&mut self, additional: usize) -> Result<()> {
        self.check_mutable("reserving edges")?;
        self.src.reserve(additional);
        self.dest.reserve(additional);
        self.switch.reserve(additional);
        self.remapped.reserve(additional);
        Ok(())
    }

    fn reserve_exact(&mut self, additional: usize) {
        self.src.reserve_exact(additional);
        self.dest.reserve_exact(additional);
        self.switch.reserve_exact(additional);
        self.remapped.reserve_exact(additional);
    }

    pub fn push(&mut self, src: NodeId, dest: NodeId, switch: EdgeSwitch) -> Result<()> {
        self.check_mutable("appending an edge")?;
        self.adopt_convention(switch.convention())?;
        self.invalidate_derived();

        self.src.push(src);
        self.dest.push(dest);
        self.switch.push(switch.raw());
        self.remapped.push(false);
        Ok(())
    }

    /// Appends a batch of edges. Capacity starts at the smaller of the current
    /// capacity and ten edges per node, then doubles until the batch fits.
    pub fn bulk_load(&mut self, edges: &[(NodeId, NodeId, EdgeSwitch)], num_nodes: usize)
        -> Result<()>
    {
        self.check_mutable("loading edges")?;
        if let Some((_, _, first)) = edges.first() {
            let convention = first.convention();
            if let Some((_, _, odd)) = edges.iter().find(|(_, _, sw)| sw.convention() != convention) {
                return Err(RrGraphError::contract(format!(
                    "edge batch mixes switch conventions ({:?} and {:?})", first, odd
                )));
            }
            self.adopt_convention(convention)?;
        }

        let required = self.len() + edges.len();
        if self.capacity() < required {
            let mut new_capacity = self.capacity().min(num_nodes * 10).max(1);
            while new_capacity < required {
                new_capacity *= 2;
            }
            self.reserve_exact(new_capacity - self.len());
        }

        self.invalidate_derived();
        for (src, dest, switch) in edges {
            self.src.push(*src);
            self.dest.push(*dest);
            self.switch.push(switch.raw());
            self.remapped.push(false);
        }
        Ok(())
    }

    /// Re-enables appending. Derived ranges are dropped and the pipeline has to
    /// run again. Edges resolved so far keep their remapped flag.
    pub fn unlock(&mut self) {
        self.edges_read = false;
        self.convention = None;
        self.invalidate_derived();
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /* --- Fan-in --- */

    pub fn compute_fan_in(&mut self, num_nodes: usize) {
        self.edges_read = true;
        self.fan_in.clear();
        self.fan_in.resize(num_nodes, 0);
        for dest in &self.dest {
            self.fan_in[dest.index()] += 1;
        }
        self.fan_in_valid = true;
    }

    pub fn fan_in(&self, node: NodeId) -> u32 {
        if !self.fan_in_valid {
            return contract_violation!(0, "fan-in of node {} read before it was computed", node);
        }
        self.fan_in[node.index()]
    }

    /* --- Switch resolution --- */

    fn check_arch_convention(&self, op: &str) -> Result<()> {
        if self.convention == Some(SwitchConvention::Graph) {
            return Err(RrGraphError::contract(format!(
                "{} on edges staged with graph switches", op
            )));
        }
        Ok(())
    }

    fn arch_switch_of(&self, edge: usize, arch_switches: &[ArchSwitch]) -> Result<usize> {
        let arch = self.switch[edge] as usize;
        if arch >= arch_switches.len() {
            return Err(RrGraphError::SwitchOutOfRange(arch));
        }
        Ok(arch)
    }

    /* Number of unresolved incoming edges per (destination, arch switch) */
    fn per_switch_fan_in(&self, arch_switches: &[ArchSwitch])
        -> Result<HashMap<(NodeId, usize), u32>>
    {
        let mut counts = HashMap::new();
        for edge in (0 .. self.len()).filter(|e| !self.remapped[*e]) {
            let arch = self.arch_switch_of(edge, arch_switches)?;
            *counts.entry((self.dest[edge], arch)).or_insert(0) += 1;
        }
        Ok(counts)
    }

    fn bucket(arch: &ArchSwitch, fan_in: u32) -> FanInBucket {
        if arch.fixed_delay() {
            FanInBucket::Independent
        } else {
            FanInBucket::Count(fan_in)
        }
    }

    /// Works out which graph switches the unresolved edges need. Ids are handed
    /// out starting at `first_id`, in order of first appearance while walking
    /// the edges sorted by destination.
    pub fn count_switches_needed(&mut self, arch_switches: &[ArchSwitch], first_id: usize)
        -> Result<SwitchFanInTable>
    {
        self.check_arch_convention("counting switches")?;
        self.edges_read = true;
        self.partitioned = false;
        self.first_edge.clear();
        self.in_edges = None;

        let mut order: Vec<usize> = (0 .. self.len()).collect();
        order.sort_by_key(|e| self.dest[*e]);
        if order.iter().enumerate().any(|(pos, e)| pos != *e) {
            self.apply_order(&order);
        }

        let mut table = SwitchFanInTable::new(arch_switches.len(), first_id);
        let mut begin = 0;
        while begin < self.len() {
            let dest = self.dest[begin];
            let mut end = begin;
            while end < self.len() && self.dest[end] == dest {
                end += 1;
            }

            /* Count per switch type, keeping the order in which types show up */
            let mut counts: Vec<(usize, u32)> = Vec::new();
            for edge in (begin .. end).filter(|e| !self.remapped[*e]) {
                let arch = self.arch_switch_of(edge, arch_switches)?;
                match counts.iter_mut().find(|(a, _)| *a == arch) {
                    Some((_, count)) => *count += 1,
                    None => counts.push((arch, 1)),
                }
            }
            for (arch, count) in counts {
                table.intern(ArchSwitchId::new(arch), Self::bucket(&arch_switches[arch], count));
            }

            begin = end;
        }

        dbg_log!(
            DBG_INFO,
            "{} graph switches needed for {} architecture switches",
            table.num_switches_needed(), arch_switches.len()
        );

        Ok(table)
    }

    /// Rewrites every unresolved edge to the graph switch `table` assigns to
    /// its (architecture switch, fan-in) pair. Nothing is changed on error.
    pub fn remap_switch_indices(
        &mut self,
        arch_switches: &[ArchSwitch],
        table: &SwitchFanInTable
    ) -> Result<()> {
        self.check_arch_convention("remapping switches")?;
        self.edges_read = true;

        let counts = self.per_switch_fan_in(arch_switches)?;
        let mut resolved = Vec::new();
        for edge in (0 .. self.len()).filter(|e| !self.remapped[*e]) {
            let arch = self.switch[edge] as usize;
            let bucket = Self::bucket(&arch_switches[arch], counts[&(self.dest[edge], arch)]);
            let arch_switch = ArchSwitchId::new(arch);
            let id = table.lookup(arch_switch, bucket)
                .ok_or(RrGraphError::UnknownSwitch { arch_switch, bucket })?;
            resolved.push((edge, id));
        }

        dbg_log!(DBG_INFO, "Remapped switches of {} edges", resolved.len());

        for (edge, id) in resolved {
            self.switch[edge] = id.index() as u16;
            self.remapped[edge] = true;
        }
        Ok(())
    }

    /// Declares the staged switch indices to be graph switches already.
    pub fn mark_already_resolved(&mut self) -> Result<()> {
        if self.convention == Some(SwitchConvention::Arch) {
            return Err(RrGraphError::contract(
                "edges staged with architecture switches cannot be marked as resolved"
            ));
        }
        self.edges_read = true;
        self.remapped.iter_mut().for_each(|r| *r = true);
        Ok(())
    }

    /* --- Partitioning --- */

    fn apply_order(&mut self, order: &[usize]) {
        replace_with_or_abort(&mut self.src, |v| order.iter().map(|e| v[*e]).collect());
        replace_with_or_abort(&mut self.dest, |v| order.iter().map(|e| v[*e]).collect());
        replace_with_or_abort(&mut self.switch, |v| order.iter().map(|e| v[*e]).collect());
        replace_with_or_abort(&mut self.remapped, |v| order.iter().map(|e| v[*e]).collect());
    }

    /// Sorts edges by source, putting the configurable edges of each node
    /// before the non-configurable ones, and derives the per-node ranges.
    ///
    /// Returns `false` if the edges were already partitioned, in which case
    /// nothing is touched.
    pub fn partition(&mut self, switches: &SwitchTable, num_nodes: usize) -> Result<bool> {
        if self.partitioned && self.first_edge.len() == num_nodes + 1 {
            return Ok(false);
        }
        if let Some(edge) = self.remapped.iter().position(|r| !*r) {
            return Err(RrGraphError::contract(format!(
                "partitioning with unresolved switch on edge {}", edge
            )));
        }
        if let Some(bad) = self.switch.iter().find(|sw| (**sw as usize) >= switches.len()) {
            return Err(RrGraphError::SwitchOutOfRange(*bad as usize));
        }
        if let Some(edge) = self.dest.iter().position(|dest| dest.index() >= num_nodes) {
            return Err(RrGraphError::structural("edge_dest", edge));
        }
        self.edges_read = true;

        let configurable: Vec<bool> = self.switch.iter()
            .map(|sw| switches.is_configurable_raw(*sw).unwrap_or(false))
            .collect();
        let mut order: Vec<usize> = (0 .. self.len()).collect();
        order.sort_by_key(|e| (self.src[*e], !configurable[*e], self.dest[*e], self.switch[*e]));
        if order.iter().enumerate().any(|(pos, e)| pos != *e) {
            self.apply_order(&order);
        }

        /* Edge ids changed, the reverse index points at stale positions */
        self.in_edges = None;

        self.assign_first_edges(num_nodes)?;
        self.verify_first_edges()?;
        self.partitioned = true;

        dbg_log!(DBG_EXTRA, "Partitioned {} edges of {} nodes", self.len(), num_nodes);

        Ok(true)
    }

    /// Derives `first_edge` in one scan. Edges must be sorted by source.
    pub(crate) fn assign_first_edges(&mut self, num_nodes: usize) -> Result<()> {
        self.first_edge.clear();
        self.first_edge.reserve(num_nodes + 1);

        let mut edge = 0;
        for node in 0 .. num_nodes {
            self.first_edge.push(EdgeId::new(edge));
            while edge < self.len() && self.src[edge].index() == node {
                edge += 1;
            }
        }
        self.first_edge.push(EdgeId::new(edge));

        if edge != self.len() {
            self.first_edge.clear();
            return Err(RrGraphError::structural("first_edge", edge));
        }
        Ok(())
    }

    /// Checks that every edge lies within its source node's range.
    pub fn verify_first_edges(&self) -> Result<()> {
        let num_nodes = self.first_edge.len().saturating_sub(1);
        for node in 0 .. num_nodes {
            let (first, last) = (self.first_edge[node], self.first_edge[node + 1]);
            if first > last {
                return Err(RrGraphError::structural("first_edge", node));
            }
            for edge in first.index() .. last.index() {
                if self.src[edge].index() != node {
                    return Err(RrGraphError::structural("first_edge", edge));
                }
            }
        }
        Ok(())
    }

    /// Walks every node's range and checks the configurable prefix.
    pub fn validate_partition(&self, switches: &SwitchTable) -> Result<()> {
        if !self.partitioned {
            return Err(RrGraphError::contract("validating edges that are not partitioned"));
        }
        self.verify_first_edges()?;
        for window in self.first_edge.windows(2) {
            let mut seen_non_configurable = false;
            for edge in window[0].index() .. window[1].index() {
                let configurable = switches.is_configurable_raw(self.switch[edge])
                    .ok_or(RrGraphError::SwitchOutOfRange(self.switch[edge] as usize))?;
                if configurable && seen_non_configurable {
                    return Err(RrGraphError::structural("edge_partition", edge));
                }
                seen_non_configurable |= !configurable;
            }
        }
        Ok(())
    }

    /* --- Range queries --- */

    pub fn edge_range(&self, node: NodeId) -> EdgeRange {
        if !self.partitioned {
            return contract_violation!(
                EdgeRange { first: EdgeId::new(0), last: EdgeId::new(0) },
                "edge range of node {} read before partitioning", node
            );
        }
        EdgeRange {
            first: self.first_edge[node.index()],
            last: self.first_edge[node.index() + 1],
        }
    }

    #[inline]
    pub fn first_edge(&self, node: NodeId) -> EdgeId {
        self.edge_range(node).first
    }

    #[inline]
    pub fn num_edges(&self, node: NodeId) -> usize {
        self.edge_range(node).len()
    }

    pub fn num_configurable_edges(&self, node: NodeId, switches: &SwitchTable) -> usize {
        let range = self.edge_range(node);
        self.switch[range.first.index() .. range.last.index()]
            .partition_point(|sw| switches.is_configurable_raw(*sw).unwrap_or(false))
    }

    pub fn num_non_configurable_edges(&self, node: NodeId, switches: &SwitchTable) -> usize {
        self.num_edges(node) - self.num_configurable_edges(node, switches)
    }

    pub fn edges_between(&self, src: NodeId, dest: NodeId)
        -> impl Iterator<Item = EdgeId> + '_
    {
        self.edge_range(src).filter(move |edge| self.dest[edge.index()] == dest)
    }

    pub fn find_edge(&self, src: NodeId, dest: NodeId) -> Option<EdgeId> {
        self.edges_between(src, dest).next()
    }

    /* --- Per-edge columns --- */

    #[inline]
    pub fn edge_src(&self, edge: EdgeId) -> NodeId {
        self.src[edge.index()]
    }

    #[inline]
    pub fn edge_dest(&self, edge: EdgeId) -> NodeId {
        self.dest[edge.index()]
    }

    #[inline]
    pub fn edge_switch(&self, edge: EdgeId) -> SwitchId {
        if !self.remapped[edge.index()] {
            return contract_violation!(
                SwitchId::INVALID,
                "graph switch of edge {} read before it was resolved", edge
            );
        }
        SwitchId::new(self.switch[edge.index()] as usize)
    }

    /// Architecture switch of an edge that has not been remapped yet.
    pub fn edge_arch_switch(&self, edge: EdgeId) -> Option<ArchSwitchId> {
        (!self.remapped[edge.index()])
            .then(|| ArchSwitchId::new(self.switch[edge.index()] as usize))
    }

    pub fn edge_remapped(&self, edge: EdgeId) -> bool {
        self.remapped[edge.index()]
    }

    /// Every edge as (source, destination, raw switch, remapped).
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, NodeId, u16, bool)> + '_ {
        (0 .. self.len()).map(move |e| (self.src[e], self.dest[e], self.switch[e], self.remapped[e]))
    }

    /* --- Reverse edges --- */

    pub fn build_in_edges(&mut self, num_nodes: usize) -> Result<()> {
        if !self.partitioned {
            return Err(RrGraphError::contract("building in-edges before partitioning"));
        }

        let mut offsets = vec![0u32; num_nodes + 1];
        for dest in &self.dest {
            offsets[dest.index() + 1] += 1;
        }
        for node in 0 .. num_nodes {
            offsets[node + 1] += offsets[node];
        }

        let mut cursor = offsets.clone();
        let mut edges = vec![EdgeId::INVALID; self.len()];
        for (edge, dest) in self.dest.iter().enumerate() {
            let slot = &mut cursor[dest.index()];
            edges[*slot as usize] = EdgeId::new(edge);
            *slot += 1;
        }

        self.in_edges = Some(InEdges { offsets, edges });
        Ok(())
    }

    pub fn in_edges(&self, node: NodeId) -> Option<&[EdgeId]> {
        let in_edges = self.in_edges.as_ref()?;
        let begin = in_edges.offsets[node.index()] as usize;
        let end = in_edges.offsets[node.index() + 1] as usize;
        Some(&in_edges.edges[begin .. end])
    }

    /* --- Renumbering --- */

    /// Rewrites edge endpoints after nodes were moved. Edges have to be
    /// partitioned again afterwards.
    pub(crate) fn permute_nodes(&mut self, old_to_new: &[NodeId]) {
        for node in self.src.iter_mut().chain(self.dest.iter_mut()) {
            *node = old_to_new[node.index()];
        }

        let fan_in_valid = self.fan_in_valid;
        if fan_in_valid {
            let mut fan_in = vec![0; self.fan_in.len()];
            for (old, count) in self.fan_in.iter().enumerate() {
                fan_in[old_to_new[old].index()] = *count;
            }
            self.fan_in = fan_in;
        }
        self.invalidate_derived();
        self.fan_in_valid = fan_in_valid;
    }

    /// Drops the given edges. Returns how many were removed.
    pub(crate) fn remove_edges(&mut self, edges: &[EdgeId]) -> usize {
        let mut drop = vec![false; self.len()];
        let len = drop.len();
        for edge in edges.iter().filter(|e| e.index() < len) {
            drop[edge.index()] = true;
        }
        let order: Vec<usize> = (0 .. self.len()).filter(|e| !drop[*e]).collect();
        let removed = self.len() - order.len();
        self.apply_order(&order);
        self.invalidate_derived();
        removed
    }

    /// Drops edges touching removed nodes and renumbers the rest.
    pub(crate) fn remove_nodes(&mut self, old_to_new: &[NodeId]) -> usize {
        let order: Vec<usize> = (0 .. self.len())
            .filter(|e| {
                old_to_new[self.src[*e].index()].is_valid()
                    && old_to_new[self.dest[*e].index()].is_valid()
            })
            .collect();
        let removed = self.len() - order.len();
        self.apply_order(&order);
        for node in self.src.iter_mut().chain(self.dest.iter_mut()) {
            *node = old_to_new[node.index()];
        }
        self.invalidate_derived();
        removed
    }
}
