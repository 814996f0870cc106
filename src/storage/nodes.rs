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

use crate::common::join_comma;
use crate::error::{Result, RrGraphError};
use crate::ids::*;
use crate::types::*;

/* Fields touched on every router expansion. Kept small and `Copy` so a node
 * fits comfortably within a cache line. */
#[derive(Copy, Clone, Debug)]
pub(crate) struct NodeHot {
    xlow: i16,
    ylow: i16,
    xhigh: i16,
    yhigh: i16,
    node_type: NodeType,
    cost_index: CostIndex,
    rc_index: RcIndex,
    capacity: u16,
    /* Direction bits for channels, side bits for pins */
    dir_side: u8,
}

impl NodeHot {
    fn new(node_type: NodeType) -> Self {
        Self {
            xlow: 0,
            ylow: 0,
            xhigh: 0,
            yhigh: 0,
            node_type,
            cost_index: CostIndex::INVALID,
            rc_index: RcIndex::INVALID,
            capacity: 1,
            dir_side: default_dir_side(node_type),
        }
    }
}

fn default_dir_side(node_type: NodeType) -> u8 {
    if node_type.is_channel() {
        Direction::None.to_bits()
    } else {
        0
    }
}

#[derive(Clone, Debug, Default)]
pub(crate) struct NodeCold {
    ptc: i16,
    layer_low: u8,
    layer_high: u8,
    /* Per-offset ptc numbers of tileable channel nodes, empty otherwise */
    tileable_ptcs: Vec<i16>,
    bend_start: i16,
    bend_end: i16,
}

/// Columnar node storage. Attributes read on the hot path live in one array,
/// everything else in a second array indexed by the same id.
#[derive(Clone, Debug, Default)]
pub struct NodeStore {
    hot: Vec<NodeHot>,
    cold: Vec<NodeCold>,
    names: HashMap<NodeId, String>,
}

macro_rules! check_type {
    ($self:ident, $node:expr, $pred:expr, $what:literal) => {{
        let ty = $self.node_type($node);
        if !$pred(ty) {
            return Err(RrGraphError::contract(format!(
                concat!($what, " is not valid for node {} of type {}"), $node, ty
            )));
        }
    }};
}

impl NodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.hot.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.hot.is_empty()
    }

    #[inline]
    pub fn contains(&self, node: NodeId) -> bool {
        node.index() < self.hot.len()
    }

    pub fn reserve(&mut self, additional: usize) {
        self.hot.reserve(additional);
        self.cold.reserve(additional);
    }

    /// Grows or shrinks the store. New slots are `Source` nodes with default
    /// attributes, a graph-file reader overwrites them field by field.
    pub fn resize(&mut self, len: usize) {
        let shrinking = len < self.hot.len();
        self.hot.resize(len, NodeHot::new(NodeType::Source));
        self.cold.resize(len, NodeCold::default());
        if shrinking {
            self.names.retain(|node, _| node.index() < len);
        }
    }

    pub fn create(&mut self, node_type: NodeType) -> NodeId {
        let id = NodeId::new(self.hot.len());
        self.hot.push(NodeHot::new(node_type));
        self.cold.push(NodeCold::default());
        id
    }

    pub fn clear(&mut self) {
        self.hot.clear();
        self.cold.clear();
        self.names.clear();
    }

    pub fn ids(&self) -> impl ExactSizeIterator<Item = NodeId> {
        (0 .. self.hot.len()).map(NodeId::new)
    }

    /// Hints the CPU that `node` is about to be read.
    #[inline]
    pub fn prefetch(&self, node: NodeId) {
        #[cfg(target_arch = "x86_64")]
        if let Some(hot) = self.hot.get(node.index()) {
            use std::arch::x86_64::{_mm_prefetch, _MM_HINT_T0};
            unsafe { _mm_prefetch::<_MM_HINT_T0>(hot as *const NodeHot as *const i8) };
        }
        #[cfg(not(target_arch = "x86_64"))]
        let _ = node;
    }

    #[inline]
    fn hot(&self, node: NodeId) -> &NodeHot {
        &self.hot[node.index()]
    }

    #[inline]
    fn cold(&self, node: NodeId) -> &NodeCold {
        &self.cold[node.index()]
    }

    fn hot_mut(&mut self, node: NodeId) -> Result<&mut NodeHot> {
        let len = self.hot.len();
        self.hot.get_mut(node.index()).ok_or_else(|| {
            RrGraphError::contract(format!("node {} out of range ({} nodes)", node, len))
        })
    }

    fn cold_mut(&mut self, node: NodeId) -> Result<&mut NodeCold> {
        let len = self.cold.len();
        self.cold.get_mut(node.index()).ok_or_else(|| {
            RrGraphError::contract(format!("node {} out of range ({} nodes)", node, len))
        })
    }

    /* --- Geometry and flyweight references --- */

    #[inline]
    pub fn node_type(&self, node: NodeId) -> NodeType {
        self.hot(node).node_type
    }

    #[inline]
    pub fn xlow(&self, node: NodeId) -> i16 {
        self.hot(node).xlow
    }

    #[inline]
    pub fn ylow(&self, node: NodeId) -> i16 {
        self.hot(node).ylow
    }

    #[inline]
    pub fn xhigh(&self, node: NodeId) -> i16 {
        self.hot(node).xhigh
    }

    #[inline]
    pub fn yhigh(&self, node: NodeId) -> i16 {
        self.hot(node).yhigh
    }

    pub fn layer_low(&self, node: NodeId) -> u8 {
        self.cold(node).layer_low
    }

    pub fn layer_high(&self, node: NodeId) -> u8 {
        self.cold(node).layer_high
    }

    #[inline]
    pub fn capacity(&self, node: NodeId) -> u16 {
        self.hot(node).capacity
    }

    #[inline]
    pub fn cost_index(&self, node: NodeId) -> CostIndex {
        self.hot(node).cost_index
    }

    #[inline]
    pub fn rc_index(&self, node: NodeId) -> RcIndex {
        self.hot(node).rc_index
    }

    /// Longest extent of the bounding box.
    pub fn length(&self, node: NodeId) -> u16 {
        let hot = self.hot(node);
        let dx = hot.xhigh as i32 - hot.xlow as i32;
        let dy = hot.yhigh as i32 - hot.ylow as i32;
        dx.max(dy) as u16
    }

    pub fn set_type(&mut self, node: NodeId, node_type: NodeType) -> Result<()> {
        let hot = self.hot_mut(node)?;
        if hot.node_type.is_channel() != node_type.is_channel()
            || hot.node_type.is_pin() != node_type.is_pin()
        {
            hot.dir_side = default_dir_side(node_type);
        }
        hot.node_type = node_type;
        Ok(())
    }

    /// Sets the bounding box. The corners may be passed in any order.
    pub fn set_coordinates(&mut self, node: NodeId, x1: i16, y1: i16, x2: i16, y2: i16)
        -> Result<()>
    {
        let hot = self.hot_mut(node)?;
        hot.xlow = x1.min(x2);
        hot.xhigh = x1.max(x2);
        hot.ylow = y1.min(y2);
        hot.yhigh = y1.max(y2);
        Ok(())
    }

    pub fn set_layer(&mut self, node: NodeId, low: u8, high: u8) -> Result<()> {
        let cold = self.cold_mut(node)?;
        cold.layer_low = low.min(high);
        cold.layer_high = low.max(high);
        Ok(())
    }

    pub fn set_capacity(&mut self, node: NodeId, capacity: i32) -> Result<()> {
        let capacity = u16::try_from(capacity).map_err(|_| {
            RrGraphError::contract(format!("capacity {} of node {} out of range", capacity, node))
        })?;
        self.hot_mut(node)?.capacity = capacity;
        Ok(())
    }

    pub fn set_cost_index(&mut self, node: NodeId, cost_index: usize) -> Result<()> {
        if cost_index >= CostIndex::INVALID.index() {
            return Err(RrGraphError::contract(format!(
                "cost index {} of node {} does not fit the node storage", cost_index, node
            )));
        }
        self.hot_mut(node)?.cost_index = CostIndex::new(cost_index);
        Ok(())
    }

    pub fn set_rc_index(&mut self, node: NodeId, rc_index: RcIndex) -> Result<()> {
        self.hot_mut(node)?.rc_index = rc_index;
        Ok(())
    }

    /* --- Type-specific attributes --- */

    pub fn direction(&self, node: NodeId) -> Direction {
        let hot = self.hot(node);
        if !hot.node_type.is_channel() {
            return contract_violation!(
                Direction::None,
                "direction queried on node {} of type {}", node, hot.node_type
            );
        }
        Direction::from_bits(hot.dir_side)
    }

    pub fn try_direction(&self, node: NodeId) -> Result<Direction> {
        check_type!(self, node, NodeType::is_channel, "direction");
        Ok(Direction::from_bits(self.hot(node).dir_side))
    }

    pub fn set_direction(&mut self, node: NodeId, direction: Direction) -> Result<()> {
        self.hot_mut(node)?;
        check_type!(self, node, NodeType::is_channel, "direction");
        self.hot[node.index()].dir_side = direction.to_bits();
        Ok(())
    }

    pub fn sides(&self, node: NodeId) -> SideSet {
        let hot = self.hot(node);
        if !hot.node_type.is_pin() {
            return contract_violation!(
                SideSet::empty(),
                "sides queried on node {} of type {}", node, hot.node_type
            );
        }
        SideSet::from_bits(hot.dir_side)
    }

    pub fn try_sides(&self, node: NodeId) -> Result<SideSet> {
        check_type!(self, node, NodeType::is_pin, "side");
        Ok(SideSet::from_bits(self.hot(node).dir_side))
    }

    pub fn is_on_side(&self, node: NodeId, side: Side) -> bool {
        self.sides(node).contains(side)
    }

    pub fn add_side(&mut self, node: NodeId, side: Side) -> Result<()> {
        self.hot_mut(node)?;
        check_type!(self, node, NodeType::is_pin, "side");
        let mut sides = SideSet::from_bits(self.hot[node.index()].dir_side);
        sides.insert(side);
        self.hot[node.index()].dir_side = sides.bits();
        Ok(())
    }

    pub fn set_sides(&mut self, node: NodeId, sides: SideSet) -> Result<()> {
        self.hot_mut(node)?;
        check_type!(self, node, NodeType::is_pin, "side");
        self.hot[node.index()].dir_side = sides.bits();
        Ok(())
    }

    /// Raw disambiguator number, whatever its meaning for the node's type.
    #[inline]
    pub fn ptc(&self, node: NodeId) -> i16 {
        self.cold(node).ptc
    }

    pub fn set_ptc(&mut self, node: NodeId, ptc: i16) -> Result<()> {
        self.cold_mut(node)?.ptc = ptc;
        Ok(())
    }

    fn typed_ptc(&self, node: NodeId, pred: fn(NodeType) -> bool, what: &str) -> i16 {
        let ty = self.node_type(node);
        if !pred(ty) {
            return contract_violation!(-1, "{} queried on node {} of type {}", what, node, ty);
        }
        self.cold(node).ptc
    }

    fn set_typed_ptc(&mut self, node: NodeId, pred: fn(NodeType) -> bool, what: &str, ptc: i16)
        -> Result<()>
    {
        self.cold_mut(node)?;
        let ty = self.node_type(node);
        if !pred(ty) {
            return Err(RrGraphError::contract(format!(
                "{} is not valid for node {} of type {}", what, node, ty
            )));
        }
        self.cold[node.index()].ptc = ptc;
        Ok(())
    }

    pub fn pin_num(&self, node: NodeId) -> i16 {
        self.typed_ptc(node, NodeType::is_pin, "pin number")
    }

    pub fn track_num(&self, node: NodeId) -> i16 {
        self.typed_ptc(node, NodeType::is_channel, "track number")
    }

    pub fn class_num(&self, node: NodeId) -> i16 {
        self.typed_ptc(node, NodeType::is_class, "class number")
    }

    pub fn mux_num(&self, node: NodeId) -> i16 {
        self.typed_ptc(node, |ty| ty == NodeType::Mux, "mux number")
    }

    pub fn set_pin_num(&mut self, node: NodeId, pin: i16) -> Result<()> {
        self.set_typed_ptc(node, NodeType::is_pin, "pin number", pin)
    }

    pub fn set_track_num(&mut self, node: NodeId, track: i16) -> Result<()> {
        self.set_typed_ptc(node, NodeType::is_channel, "track number", track)
    }

    pub fn set_class_num(&mut self, node: NodeId, class: i16) -> Result<()> {
        self.set_typed_ptc(node, NodeType::is_class, "class number", class)
    }

    pub fn set_mux_num(&mut self, node: NodeId, mux: i16) -> Result<()> {
        self.set_typed_ptc(node, |ty| ty == NodeType::Mux, "mux number", mux)
    }

    /* --- Tileable ptc lists --- */

    /// Records the track a tileable channel node uses at grid location `loc`.
    /// The slot is the Manhattan offset of `loc` from the low corner.
    pub fn add_track_num(&mut self, node: NodeId, loc: (i16, i16), track: i16) -> Result<()> {
        self.hot_mut(node)?;
        check_type!(self, node, NodeType::is_channel, "track number");

        let hot = *self.hot(node);
        let span = (hot.xhigh as i32 - hot.xlow as i32) as usize
            + (hot.yhigh as i32 - hot.ylow as i32) as usize;
        let offset = (loc.0 as i32 - hot.xlow as i32) + (loc.1 as i32 - hot.ylow as i32);
        if offset < 0 || offset as usize > span {
            return Err(RrGraphError::contract(format!(
                "location ({}, {}) is outside of node {}", loc.0, loc.1, node
            )));
        }

        let cold = &mut self.cold[node.index()];
        if cold.tileable_ptcs.len() != span + 1 {
            cold.tileable_ptcs.resize(span + 1, cold.ptc);
        }
        cold.tileable_ptcs[offset as usize] = track;
        if offset == 0 {
            cold.ptc = track;
        }
        Ok(())
    }

    /// Parses a comma-separated ptc list. A single value is stored as a plain
    /// ptc number.
    pub fn set_ptc_nums(&mut self, node: NodeId, ptcs: &str) -> Result<()> {
        let parsed = ptcs.split(',')
            .map(|ptc| ptc.trim().parse::<i16>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|_| RrGraphError::InvalidPtcList(ptcs.to_string()))?;

        let cold = self.cold_mut(node)?;
        match parsed.as_slice() {
            [] => return Err(RrGraphError::InvalidPtcList(ptcs.to_string())),
            [single] => {
                cold.ptc = *single;
                cold.tileable_ptcs.clear();
            },
            [first, ..] => {
                cold.ptc = *first;
                cold.tileable_ptcs = parsed;
            },
        }
        Ok(())
    }

    pub fn ptc_nums(&self, node: NodeId) -> Vec<i16> {
        let cold = self.cold(node);
        if cold.tileable_ptcs.is_empty() {
            vec![cold.ptc]
        } else {
            cold.tileable_ptcs.clone()
        }
    }

    pub fn ptc_nums_to_string(&self, node: NodeId) -> String {
        let cold = self.cold(node);
        if cold.tileable_ptcs.is_empty() {
            cold.ptc.to_string()
        } else {
            join_comma(cold.tileable_ptcs.iter())
        }
    }

    pub fn contains_multiple_ptc(&self, node: NodeId) -> bool {
        self.cold(node).tileable_ptcs.len() > 1
    }

    /// Ptc number used at `offset` cells away from the low corner.
    pub fn ptc_at_offset(&self, node: NodeId, offset: usize) -> i16 {
        let cold = self.cold(node);
        cold.tileable_ptcs.get(offset).copied().unwrap_or(cold.ptc)
    }

    /* --- Cold extras --- */

    pub fn bend_start(&self, node: NodeId) -> i16 {
        self.cold(node).bend_start
    }

    pub fn bend_end(&self, node: NodeId) -> i16 {
        self.cold(node).bend_end
    }

    pub fn set_bend_start(&mut self, node: NodeId, bend: i16) -> Result<()> {
        self.cold_mut(node)?.bend_start = bend;
        Ok(())
    }

    pub fn set_bend_end(&mut self, node: NodeId, bend: i16) -> Result<()> {
        self.cold_mut(node)?.bend_end = bend;
        Ok(())
    }

    pub fn name(&self, node: NodeId) -> Option<&str> {
        self.names.get(&node).map(String::as_str)
    }

    pub fn set_name(&mut self, node: NodeId, name: &str) -> Result<()> {
        self.hot_mut(node)?;
        self.names.insert(node, name.to_string());
        Ok(())
    }

    /* --- Diagnostics --- */

    pub fn type_string(&self, node: NodeId) -> &'static str {
        self.node_type(node).as_str()
    }

    pub fn side_string(&self, node: NodeId) -> String {
        let sides: Vec<_> = self.sides(node).iter().map(Side::as_str).collect();
        sides.join(",")
    }

    pub fn coordinate_to_string(&self, node: NodeId) -> String {
        let hot = self.hot(node);
        let cold = self.cold(node);
        format!(
            "{}:{} ({},{},{})->({},{},{})",
            hot.node_type, node,
            hot.xlow, hot.ylow, cold.layer_low,
            hot.xhigh, hot.yhigh, cold.layer_high
        )
    }

    /* --- Whole-store permutations --- */

    /// Moves node records so that slot `i` holds what used to be
    /// `new_to_old[i]`.
    pub(crate) fn reorder(&mut self, new_to_old: &[NodeId], old_to_new: &[NodeId]) {
        debug_assert_eq!(new_to_old.len(), self.hot.len());

        replace_with_or_abort(&mut self.hot, |hot| {
            new_to_old.iter().map(|old| hot[old.index()]).collect()
        });
        replace_with_or_abort(&mut self.cold, |mut cold| {
            new_to_old.iter().map(|old| std::mem::take(&mut cold[old.index()])).collect()
        });
        replace_with_or_abort(&mut self.names, |names| {
            names.into_iter()
                .filter_map(|(node, name)| old_to_new.get(node.index()).map(|new| (*new, name)))
                .collect()
        });
    }

    /// Drops every node that `old_to_new` maps to `INVALID`, keeping the
    /// relative order of the survivors.
    pub(crate) fn compact(&mut self, old_to_new: &[NodeId]) {
        let mut idx = 0;
        self.hot.retain(|_| { idx += 1; old_to_new[idx - 1].is_valid() });
        let mut idx = 0;
        self.cold.retain(|_| { idx += 1; old_to_new[idx - 1].is_valid() });
        replace_with_or_abort(&mut self.names, |names| {
            names.into_iter()
                .filter_map(|(node, name)| {
                    let new = old_to_new[node.index()];
                    new.is_valid().then(|| (new, name))
                })
                .collect()
        });
    }
}
