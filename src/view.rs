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

use crate::builder::RrGraphData;
use crate::error::{Result, RrGraphError};
use crate::ids::*;
use crate::metadata::MetadataStore;
use crate::spatial::SpatialIndex;
use crate::tables::*;
use crate::types::*;

/// Read-only window into a finalized graph. It only borrows the builder, so
/// it is cheap to copy and can be shared between reader threads.
#[derive(Copy, Clone)]
pub struct RrGraphView<'a> {
    data: &'a RrGraphData,
}

impl<'a> std::fmt::Debug for RrGraphView<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RrGraphView")
            .field("nodes", &self.num_nodes())
            .field("edges", &self.edge_count())
            .field("switches", &self.data.switches.len())
            .finish()
    }
}

impl<'a> RrGraphView<'a> {
    pub(crate) fn new(data: &'a RrGraphData) -> Self {
        Self { data }
    }

    pub fn num_nodes(&self) -> usize {
        self.data.nodes.len()
    }

    /// Total number of edges. Per-node counts are `num_edges(node)`.
    pub fn edge_count(&self) -> usize {
        self.data.edges.len()
    }

    pub fn nodes(&self) -> impl ExactSizeIterator<Item = NodeId> + 'a {
        self.data.nodes.ids()
    }

    #[inline]
    pub fn prefetch_node(&self, node: NodeId) {
        self.data.nodes.prefetch(node)
    }

    /* --- Nodes --- */

    #[inline]
    pub fn node_type(&self, node: NodeId) -> NodeType {
        self.data.nodes.node_type(node)
    }

    #[inline]
    pub fn node_xlow(&self, node: NodeId) -> i16 {
        self.data.nodes.xlow(node)
    }

    #[inline]
    pub fn node_ylow(&self, node: NodeId) -> i16 {
        self.data.nodes.ylow(node)
    }

    #[inline]
    pub fn node_xhigh(&self, node: NodeId) -> i16 {
        self.data.nodes.xhigh(node)
    }

    #[inline]
    pub fn node_yhigh(&self, node: NodeId) -> i16 {
        self.data.nodes.yhigh(node)
    }

    pub fn node_layer_low(&self, node: NodeId) -> u8 {
        self.data.nodes.layer_low(node)
    }

    pub fn node_layer_high(&self, node: NodeId) -> u8 {
        self.data.nodes.layer_high(node)
    }

    pub fn node_length(&self, node: NodeId) -> u16 {
        self.data.nodes.length(node)
    }

    #[inline]
    pub fn node_capacity(&self, node: NodeId) -> u16 {
        self.data.nodes.capacity(node)
    }

    #[inline]
    pub fn node_cost_index(&self, node: NodeId) -> CostIndex {
        self.data.nodes.cost_index(node)
    }

    pub fn node_rc_index(&self, node: NodeId) -> RcIndex {
        self.data.nodes.rc_index(node)
    }

    pub fn node_r(&self, node: NodeId) -> f32 {
        self.data.rc.get(self.node_rc_index(node)).map(|rc| rc.r).unwrap_or(0.0)
    }

    pub fn node_c(&self, node: NodeId) -> f32 {
        self.data.rc.get(self.node_rc_index(node)).map(|rc| rc.c).unwrap_or(0.0)
    }

    pub fn node_direction(&self, node: NodeId) -> Direction {
        self.data.nodes.direction(node)
    }

    pub fn node_sides(&self, node: NodeId) -> SideSet {
        self.data.nodes.sides(node)
    }

    pub fn is_node_on_side(&self, node: NodeId, side: Side) -> bool {
        self.data.nodes.is_on_side(node, side)
    }

    pub fn node_ptc_num(&self, node: NodeId) -> i16 {
        self.data.nodes.ptc(node)
    }

    pub fn node_pin_num(&self, node: NodeId) -> i16 {
        self.data.nodes.pin_num(node)
    }

    pub fn node_track_num(&self, node: NodeId) -> i16 {
        self.data.nodes.track_num(node)
    }

    pub fn node_class_num(&self, node: NodeId) -> i16 {
        self.data.nodes.class_num(node)
    }

    pub fn node_mux_num(&self, node: NodeId) -> i16 {
        self.data.nodes.mux_num(node)
    }

    pub fn node_ptc_nums(&self, node: NodeId) -> Vec<i16> {
        self.data.nodes.ptc_nums(node)
    }

    pub fn node_ptc_nums_to_string(&self, node: NodeId) -> String {
        self.data.nodes.ptc_nums_to_string(node)
    }

    pub fn node_contain_multiple_ptc(&self, node: NodeId) -> bool {
        self.data.nodes.contains_multiple_ptc(node)
    }

    pub fn node_bend_start(&self, node: NodeId) -> i16 {
        self.data.nodes.bend_start(node)
    }

    pub fn node_bend_end(&self, node: NodeId) -> i16 {
        self.data.nodes.bend_end(node)
    }

    pub fn node_name(&self, node: NodeId) -> Option<&'a str> {
        self.data.nodes.name(node)
    }

    pub fn node_type_string(&self, node: NodeId) -> &'static str {
        self.data.nodes.type_string(node)
    }

    pub fn node_side_string(&self, node: NodeId) -> String {
        self.data.nodes.side_string(node)
    }

    pub fn node_coordinate_to_string(&self, node: NodeId) -> String {
        self.data.nodes.coordinate_to_string(node)
    }

    /* --- Edges --- */

    #[inline]
    pub fn edge_range(&self, node: NodeId) -> EdgeRange {
        self.data.edges.edge_range(node)
    }

    #[inline]
    pub fn first_edge(&self, node: NodeId) -> EdgeId {
        self.data.edges.first_edge(node)
    }

    /// One past the last edge of `node`.
    #[inline]
    pub fn last_edge(&self, node: NodeId) -> EdgeId {
        self.data.edges.edge_range(node).last
    }

    #[inline]
    pub fn num_edges(&self, node: NodeId) -> usize {
        self.data.edges.num_edges(node)
    }

    pub fn num_configurable_edges(&self, node: NodeId) -> usize {
        self.data.edges.num_configurable_edges(node, &self.data.switches)
    }

    pub fn num_non_configurable_edges(&self, node: NodeId) -> usize {
        self.data.edges.num_non_configurable_edges(node, &self.data.switches)
    }

    pub fn edges(&self, node: NodeId) -> EdgeRange {
        self.edge_range(node)
    }

    pub fn configurable_edges(&self, node: NodeId) -> EdgeRange {
        let range = self.edge_range(node);
        EdgeRange {
            first: range.first,
            last: EdgeId::new(range.first.index() + self.num_configurable_edges(node)),
        }
    }

    pub fn non_configurable_edges(&self, node: NodeId) -> EdgeRange {
        let range = self.edge_range(node);
        EdgeRange {
            first: EdgeId::new(range.first.index() + self.num_configurable_edges(node)),
            last: range.last,
        }
    }

    #[inline]
    pub fn edge_src_node(&self, edge: EdgeId) -> NodeId {
        self.data.edges.edge_src(edge)
    }

    #[inline]
    pub fn edge_sink_node(&self, edge: EdgeId) -> NodeId {
        self.data.edges.edge_dest(edge)
    }

    #[inline]
    pub fn edge_switch(&self, edge: EdgeId) -> SwitchId {
        self.data.edges.edge_switch(edge)
    }

    pub fn edge_is_configurable(&self, edge: EdgeId) -> bool {
        self.data.switches.get(self.edge_switch(edge)).map(RrSwitch::configurable).unwrap_or(false)
    }

    /// Every edge from `src` to `dest`. There may be several, through
    /// different switches.
    pub fn edges_between(&self, src: NodeId, dest: NodeId) -> impl Iterator<Item = EdgeId> + 'a {
        self.data.edges.edges_between(src, dest)
    }

    pub fn find_edge(&self, src: NodeId, dest: NodeId) -> Option<EdgeId> {
        self.data.edges.find_edge(src, dest)
    }

    /// Whether `node_fan_in` may be called.
    pub fn has_fan_in(&self) -> bool {
        self.data.edges.is_fan_in_valid()
    }

    pub fn node_fan_in(&self, node: NodeId) -> u32 {
        self.data.edges.fan_in(node)
    }

    /// Edges entering `node`, if the reverse index was built.
    pub fn node_in_edges(&self, node: NodeId) -> Option<&'a [EdgeId]> {
        self.data.edges.in_edges(node)
    }

    /* --- Flyweights and side tables --- */

    pub fn switches(&self) -> &'a SwitchTable {
        &self.data.switches
    }

    pub fn switch(&self, id: SwitchId) -> &'a RrSwitch {
        &self.data.switches[id]
    }

    pub fn segments(&self) -> &'a SegmentTable {
        &self.data.segments
    }

    pub fn segment(&self, id: SegmentId) -> &'a RrSegment {
        &self.data.segments[id]
    }

    pub fn rc_table(&self) -> &'a RcTable {
        &self.data.rc
    }

    pub fn node_lookup(&self) -> &'a SpatialIndex {
        &self.data.spatial
    }

    pub fn metadata(&self) -> &'a MetadataStore {
        &self.data.metadata
    }

    pub fn non_configurable_set_id(&self, node: NodeId) -> Option<NonConfigSetId> {
        self.data.non_config.set_of(node)
    }

    pub fn non_configurable_set(&self, set: NonConfigSetId) -> &'a [NodeId] {
        self.data.non_config.nodes(set)
    }

    pub fn num_non_configurable_sets(&self) -> usize {
        self.data.non_config.len()
    }

    /* --- Validation --- */

    /// Walks partition boundaries, edge ranges and node sets. The first
    /// mismatch is logged and returned.
    pub fn validate(&self) -> Result<()> {
        self.data.edges.validate_partition(&self.data.switches)?;
        self.data.non_config.verify()?;

        let num_nodes = self.num_nodes();
        for (edge, (_, dest, _, _)) in self.data.edges.iter().enumerate() {
            if dest.index() >= num_nodes {
                return Err(RrGraphError::structural("edge_dest", edge));
            }
        }
        for node in self.nodes() {
            let rc = self.node_rc_index(node);
            if rc.is_valid() && rc.index() >= self.data.rc.len() {
                return Err(RrGraphError::structural("node_rc_index", node.index()));
            }
        }
        Ok(())
    }
}
