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

//! The builder owns every store of the graph and is the only way to mutate
//! them. Its type parameter tracks how far finalization has progressed:
//!
//! ```text
//! Staging --remap_switch_indices / mark_already_resolved--> Remapped
//! Remapped --partition_edges--> Partitioned
//! Partitioned --unlock--> Staging
//! Partitioned --remove_edges / remove_nodes--> Remapped
//! ```
//!
//! Only a `Partitioned` builder hands out an `RrGraphView`.

mod reorder;
mod surgery;

#[cfg(test)]
mod tests;

use std::marker::PhantomData;

use crate::config::RrGraphOptions;
use crate::error::{Result, RrGraphError};
use crate::ids::*;
use crate::log::*;
use crate::metadata::MetadataStore;
use crate::nonconfig::NonConfigurableSets;
use crate::spatial::SpatialIndex;
use crate::storage::{EdgeStore, EdgeSwitch, NodeStore};
use crate::tables::*;
use crate::types::*;
use crate::view::RrGraphView;

pub use reorder::NodePermutation;
pub use surgery::NodeRenumbering;

/// Edges are being staged.
#[derive(Debug)]
pub struct Staging;

/// Every edge holds a graph switch.
#[derive(Debug)]
pub struct Remapped;

/// Edges are sorted and per-node ranges are available.
#[derive(Debug)]
pub struct Partitioned;

#[derive(Clone, Debug, Default)]
pub(crate) struct RrGraphData {
    pub(crate) nodes: NodeStore,
    pub(crate) edges: EdgeStore,
    pub(crate) switches: SwitchTable,
    pub(crate) segments: SegmentTable,
    pub(crate) rc: RcTable,
    pub(crate) spatial: SpatialIndex,
    pub(crate) metadata: MetadataStore,
    pub(crate) non_config: NonConfigurableSets,
}

#[derive(Debug)]
pub struct RrGraphBuilder<S> {
    data: RrGraphData,
    _state: PhantomData<S>,
}

/// Everything needed to create a node and file it in the spatial index.
#[derive(Clone, Debug)]
pub struct NodeSpec {
    pub node_type: NodeType,
    pub low: (i16, i16),
    pub high: (i16, i16),
    pub layer: u8,
    pub ptc: i16,
    pub capacity: i32,
    pub cost_index: usize,
    /// Channels only.
    pub direction: Direction,
    /// Pins only.
    pub sides: SideSet,
    pub r: f32,
    pub c: f32,
}

impl NodeSpec {
    pub fn new(node_type: NodeType, x: i16, y: i16) -> Self {
        Self {
            node_type,
            low: (x, y),
            high: (x, y),
            layer: 0,
            ptc: 0,
            capacity: 1,
            cost_index: 0,
            direction: Direction::None,
            sides: SideSet::empty(),
            r: 0.0,
            c: 0.0,
        }
    }
}

impl<S> RrGraphBuilder<S> {
    fn into_state<T>(self) -> RrGraphBuilder<T> {
        RrGraphBuilder { data: self.data, _state: PhantomData }
    }

    pub fn num_nodes(&self) -> usize {
        self.data.nodes.len()
    }

    pub fn num_edges(&self) -> usize {
        self.data.edges.len()
    }

    pub fn nodes(&self) -> &NodeStore {
        &self.data.nodes
    }

    pub fn edges(&self) -> &EdgeStore {
        &self.data.edges
    }

    pub fn switches(&self) -> &SwitchTable {
        &self.data.switches
    }

    pub fn segments(&self) -> &SegmentTable {
        &self.data.segments
    }

    pub fn rc_table(&self) -> &RcTable {
        &self.data.rc
    }

    pub fn node_lookup(&self) -> &SpatialIndex {
        &self.data.spatial
    }

    pub fn metadata(&self) -> &MetadataStore {
        &self.data.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut MetadataStore {
        &mut self.data.metadata
    }

    /* --- Flyweights --- */

    pub fn add_switch(&mut self, switch: RrSwitch) -> SwitchId {
        self.data.switches.add(switch)
    }

    pub fn add_segment(&mut self, segment: RrSegment) -> SegmentId {
        self.data.segments.add(segment)
    }

    pub fn find_or_insert_rc(&mut self, r: f32, c: f32) -> RcIndex {
        self.data.rc.find_or_insert(r, c)
    }

    /* --- Node attributes --- */

    pub fn set_node_type(&mut self, node: NodeId, node_type: NodeType) -> Result<()> {
        self.data.nodes.set_type(node, node_type)
    }

    pub fn set_node_coordinates(&mut self, node: NodeId, x1: i16, y1: i16, x2: i16, y2: i16)
        -> Result<()>
    {
        self.data.nodes.set_coordinates(node, x1, y1, x2, y2)
    }

    pub fn set_node_layer(&mut self, node: NodeId, low: u8, high: u8) -> Result<()> {
        self.data.nodes.set_layer(node, low, high)
    }

    pub fn set_node_capacity(&mut self, node: NodeId, capacity: i32) -> Result<()> {
        self.data.nodes.set_capacity(node, capacity)
    }

    pub fn set_node_cost_index(&mut self, node: NodeId, cost_index: usize) -> Result<()> {
        self.data.nodes.set_cost_index(node, cost_index)
    }

    pub fn set_node_rc_index(&mut self, node: NodeId, rc_index: RcIndex) -> Result<()> {
        if rc_index.index() >= self.data.rc.len() {
            return Err(RrGraphError::contract(format!(
                "rc index {} of node {} is not in the rc table", rc_index, node
            )));
        }
        self.data.nodes.set_rc_index(node, rc_index)
    }

    pub fn set_node_direction(&mut self, node: NodeId, direction: Direction) -> Result<()> {
        self.data.nodes.set_direction(node, direction)
    }

    pub fn add_node_side(&mut self, node: NodeId, side: Side) -> Result<()> {
        self.data.nodes.add_side(node, side)
    }

    pub fn set_node_ptc_num(&mut self, node: NodeId, ptc: i16) -> Result<()> {
        self.data.nodes.set_ptc(node, ptc)
    }

    pub fn set_node_pin_num(&mut self, node: NodeId, pin: i16) -> Result<()> {
        self.data.nodes.set_pin_num(node, pin)
    }

    pub fn set_node_track_num(&mut self, node: NodeId, track: i16) -> Result<()> {
        self.data.nodes.set_track_num(node, track)
    }

    pub fn set_node_class_num(&mut self, node: NodeId, class: i16) -> Result<()> {
        self.data.nodes.set_class_num(node, class)
    }

    pub fn set_node_mux_num(&mut self, node: NodeId, mux: i16) -> Result<()> {
        self.data.nodes.set_mux_num(node, mux)
    }

    pub fn add_node_track_num(&mut self, node: NodeId, loc: (i16, i16), track: i16) -> Result<()> {
        self.data.nodes.add_track_num(node, loc, track)
    }

    pub fn set_node_ptc_nums(&mut self, node: NodeId, ptcs: &str) -> Result<()> {
        self.data.nodes.set_ptc_nums(node, ptcs)
    }

    pub fn set_node_bend_start(&mut self, node: NodeId, bend: i16) -> Result<()> {
        self.data.nodes.set_bend_start(node, bend)
    }

    pub fn set_node_bend_end(&mut self, node: NodeId, bend: i16) -> Result<()> {
        self.data.nodes.set_bend_end(node, bend)
    }

    pub fn set_node_name(&mut self, node: NodeId, name: &str) -> Result<()> {
        self.data.nodes.set_name(node, name)
    }

    /* --- Spatial index --- */

    /// Files `node` under a single cell. The type is taken from the node.
    pub fn add_node_to_lookup(
        &mut self,
        node: NodeId,
        layer: u8,
        x: i16,
        y: i16,
        ptc: i16,
        side: Option<Side>
    ) -> Result<()> {
        let node_type = self.checked_node_type(node)?;
        self.data.spatial.add_node(node, layer, x, y, node_type, ptc, side)
    }

    pub fn remove_node_from_lookup(
        &mut self,
        node: NodeId,
        layer: u8,
        x: i16,
        y: i16,
        ptc: i16,
        side: Option<Side>
    ) -> Result<bool> {
        let node_type = self.checked_node_type(node)?;
        Ok(self.data.spatial.remove_node(node, layer, x, y, node_type, ptc, side))
    }

    pub fn reserve_lookup_nodes(
        &mut self,
        layer: u8,
        x: i16,
        y: i16,
        node_type: NodeType,
        count: usize,
        side: Option<Side>
    ) -> Result<()> {
        self.data.spatial.reserve_nodes(layer, x, y, node_type, count, side)
    }

    pub fn mirror_lookup_nodes(
        &mut self,
        layer: u8,
        src: (i16, i16),
        dest: (i16, i16),
        node_type: NodeType,
        side: Side
    ) -> Result<()> {
        self.data.spatial.mirror_nodes(layer, src, dest, node_type, side)
    }

    /// Files `node` at every cell of its bounding box and layer range.
    /// Channels use the ptc of each offset along the wire, pins are filed once
    /// per side they sit on.
    pub fn add_node_to_all_locs(&mut self, node: NodeId) -> Result<()> {
        let node_type = self.checked_node_type(node)?;
        let nodes = &self.data.nodes;
        let (xlow, ylow) = (nodes.xlow(node), nodes.ylow(node));
        let (xhigh, yhigh) = (nodes.xhigh(node), nodes.yhigh(node));

        let sides: Vec<Option<Side>> = if node_type.is_pin() {
            let sides = nodes.try_sides(node)?;
            if sides.is_empty() {
                return Err(RrGraphError::contract(format!(
                    "pin node {} does not sit on any side", node
                )));
            }
            sides.iter().map(Some).collect()
        } else {
            vec![None]
        };

        for layer in nodes.layer_low(node) ..= nodes.layer_high(node) {
            for x in xlow ..= xhigh {
                for y in ylow ..= yhigh {
                    let ptc = if node_type.is_channel() {
                        let offset = (x as i32 - xlow as i32) as usize + (y as i32 - ylow as i32) as usize;
                        self.data.nodes.ptc_at_offset(node, offset)
                    } else {
                        self.data.nodes.ptc(node)
                    };
                    for side in &sides {
                        self.data.spatial.add_node(node, layer, x, y, node_type, ptc, *side)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn checked_node_type(&self, node: NodeId) -> Result<NodeType> {
        if !self.data.nodes.contains(node) {
            return Err(RrGraphError::contract(format!(
                "node {} out of range ({} nodes)", node, self.data.nodes.len()
            )));
        }
        Ok(self.data.nodes.node_type(node))
    }

    /* --- Derived edge data --- */

    /// Counts incoming edges of every node. Has to be redone after any edge
    /// is added or removed.
    pub fn compute_fan_in(&mut self) {
        let num_nodes = self.data.nodes.len();
        self.data.edges.compute_fan_in(num_nodes);
    }

    fn check_endpoints(&self, src: NodeId, dest: NodeId) -> Result<()> {
        let len = self.data.nodes.len();
        if src.index() >= len || dest.index() >= len {
            return Err(RrGraphError::contract(format!(
                "edge {} -> {} references a node out of range ({} nodes)", src, dest, len
            )));
        }
        Ok(())
    }
}

impl Default for RrGraphBuilder<Staging> {
    fn default() -> Self {
        Self::new()
    }
}

impl RrGraphBuilder<Staging> {
    pub fn new() -> Self {
        Self { data: RrGraphData::default(), _state: PhantomData }
    }

    fn check_nodes_resizable(&self, op: &str) -> Result<()> {
        if self.data.edges.edges_read() {
            return Err(RrGraphError::contract(format!(
                "{} after the edges have been read", op
            )));
        }
        Ok(())
    }

    pub fn reserve_nodes(&mut self, additional: usize) -> Result<()> {
        self.check_nodes_resizable("reserving nodes")?;
        self.data.nodes.reserve(additional);
        Ok(())
    }

    /// Sets the node count directly, for readers that fill nodes in by id.
    /// Shrinking drops the lookup entries and metadata of the truncated nodes
    /// and is rejected while staged edges still refer to them.
    pub fn resize_nodes(&mut self, len: usize) -> Result<()> {
        self.check_nodes_resizable("resizing nodes")?;
        if let Some(max) = self.data.edges.max_endpoint().filter(|max| max.index() >= len) {
            return Err(RrGraphError::contract(format!(
                "resizing to {} nodes while edges refer to node {}", len, max
            )));
        }

        let old_len = self.data.nodes.len();
        self.data.nodes.resize(len);
        if len < old_len {
            let keep: Vec<NodeId> = (0 .. old_len)
                .map(|node| if node < len { NodeId::new(node) } else { NodeId::INVALID })
                .collect();
            self.data.spatial.reorder(&keep);
            self.data.metadata.remap_nodes(|node| {
                keep.get(node.index()).copied().filter(|node| node.is_valid())
            });
        }
        Ok(())
    }

    /// Appends a node with default attributes. It is not filed in the spatial
    /// index.
    pub fn create_node(&mut self, node_type: NodeType) -> Result<NodeId> {
        self.check_nodes_resizable("creating a node")?;
        Ok(self.data.nodes.create(node_type))
    }

    /// Creates a node from `spec` and files it at every location it covers.
    pub fn add_node(&mut self, spec: &NodeSpec) -> Result<NodeId> {
        let node = self.create_node(spec.node_type)?;
        let nodes = &mut self.data.nodes;
        nodes.set_coordinates(node, spec.low.0, spec.low.1, spec.high.0, spec.high.1)?;
        nodes.set_layer(node, spec.layer, spec.layer)?;
        nodes.set_ptc(node, spec.ptc)?;
        nodes.set_capacity(node, spec.capacity)?;
        nodes.set_cost_index(node, spec.cost_index)?;
        if spec.node_type.is_channel() {
            nodes.set_direction(node, spec.direction)?;
        }
        if spec.node_type.is_pin() {
            nodes.set_sides(node, spec.sides)?;
        }
        let rc = self.data.rc.find_or_insert(spec.r, spec.c);
        self.data.nodes.set_rc_index(node, rc)?;

        self.add_node_to_all_locs(node)?;
        Ok(node)
    }

    pub fn reserve_edges(&mut self, additional: usize) -> Result<()> {
        self.data.edges.reserve(additional)
    }

    pub fn add_edge(&mut self, src: NodeId, dest: NodeId, switch: EdgeSwitch) -> Result<()> {
        self.check_endpoints(src, dest)?;
        self.data.edges.push(src, dest, switch)
    }

    pub fn add_edges(&mut self, edges: &[(NodeId, NodeId, EdgeSwitch)]) -> Result<()> {
        for (src, dest, _) in edges {
            self.check_endpoints(*src, *dest)?;
        }
        let num_nodes = self.data.nodes.len();
        self.data.edges.bulk_load(edges, num_nodes)
    }

    /// Drops every staged edge.
    pub fn clear_edges(&mut self) {
        self.data.edges.clear();
    }

    /// Re-enables edge staging after fan-in was computed on this builder.
    pub fn unlock_edges(&mut self) {
        self.data.edges.unlock();
    }

    /// Works out the graph switches the staged edges need. New switches are
    /// numbered after the ones already in the switch table.
    pub fn count_switches_needed(&mut self, arch_switches: &[ArchSwitch])
        -> Result<SwitchFanInTable>
    {
        let first_id = self.data.switches.len();
        self.data.edges.count_switches_needed(arch_switches, first_id)
    }

    /// Rewrites edges to graph switches and appends the switches `table`
    /// describes to the switch table.
    pub fn remap_switch_indices(mut self, arch_switches: &[ArchSwitch], table: &SwitchFanInTable)
        -> Result<RrGraphBuilder<Remapped>>
    {
        if table.first_id().index() != self.data.switches.len()
            || table.num_arch_switches() != arch_switches.len()
        {
            return Err(RrGraphError::contract(
                "switch fan-in table does not match the switch table, count switches again"
            ));
        }
        self.data.edges.remap_switch_indices(arch_switches, table)?;

        for (id, arch_id, bucket) in table.entries() {
            let arch = &arch_switches[arch_id.index()];
            let added = self.data.switches.add(RrSwitch::from_arch(arch, arch_id, bucket));
            debug_assert_eq!(added, id);
        }

        dbg_log!(
            DBG_INFO,
            "Switch table holds {} switches after remapping",
            self.data.switches.len()
        );

        Ok(self.into_state())
    }

    /// Declares that the staged edges already refer to the switch table.
    pub fn mark_already_resolved(mut self) -> Result<RrGraphBuilder<Remapped>> {
        self.data.edges.mark_already_resolved()?;
        Ok(self.into_state())
    }

    /// Runs the whole finalization pipeline as configured by `options`.
    pub fn finalize(mut self, arch_switches: &[ArchSwitch], options: &RrGraphOptions)
        -> Result<RrGraphBuilder<Partitioned>>
    {
        let remapped = if self.data.edges.stages_arch_switches() {
            let table = self.count_switches_needed(arch_switches)?;
            self.remap_switch_indices(arch_switches, &table)?
        } else {
            self.mark_already_resolved()?
        };
        let mut graph = remapped.partition_edges()?;

        if options.reorder != crate::config::ReorderAlgorithm::None {
            graph.reorder_nodes(options.reorder, options.reorder_threshold, options.reorder_seed)?;
        }
        if options.compute_fan_in {
            graph.compute_fan_in();
        }
        if options.build_in_edges {
            graph.build_in_edges()?;
        }
        if options.validate {
            graph.validate()?;
        }

        dbg_log!(
            DBG_INFO,
            "Finalized graph with {} nodes, {} edges and {} switches",
            graph.num_nodes(), graph.num_edges(), graph.data.switches.len()
        );

        Ok(graph)
    }
}

impl RrGraphBuilder<Remapped> {
    /// Sorts edges configurable-first, derives per-node ranges and groups
    /// nodes tied by non-configurable edges.
    pub fn partition_edges(mut self) -> Result<RrGraphBuilder<Partitioned>> {
        self.repartition()?;
        Ok(self.into_state())
    }
}

impl<S> RrGraphBuilder<S> {
    fn repartition(&mut self) -> Result<bool> {
        let num_nodes = self.data.nodes.len();
        let moved = self.data.edges.partition(&self.data.switches, num_nodes)?;
        if moved {
            self.data.non_config =
                NonConfigurableSets::build(&self.data.edges, &self.data.switches, num_nodes)?;
        }
        Ok(moved)
    }
}

impl RrGraphBuilder<Partitioned> {
    pub fn view(&self) -> RrGraphView<'_> {
        RrGraphView::new(&self.data)
    }

    /// Partitions again if anything invalidated the edge ranges. Returns
    /// `false` when there was nothing to do.
    pub fn partition_edges(&mut self) -> Result<bool> {
        self.repartition()
    }

    pub fn build_in_edges(&mut self) -> Result<()> {
        let num_nodes = self.data.nodes.len();
        self.data.edges.build_in_edges(num_nodes)
    }

    /// Checks every derived structure against the edges it came from.
    pub fn validate(&self) -> Result<()> {
        self.view().validate()
    }

    /// Re-enables edge staging, e.g. to add intra-cluster edges once the
    /// global ones are final. The whole pipeline has to run again.
    pub fn unlock(mut self) -> RrGraphBuilder<Staging> {
        self.data.edges.unlock();
        self.data.non_config = NonConfigurableSets::default();
        self.into_state()
    }
}
