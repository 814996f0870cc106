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

//! Location lookup: which node of a given type and disambiguator number sits
//! at a grid cell, on a given side of the tile.

use crate::error::{Result, RrGraphError};
use crate::ids::*;
use crate::types::*;

#[cfg(test)]
mod tests;

/* Node ids of one cell, per side, indexed by ptc number */
type Cell = [Vec<NodeId>; 4];

/* [layer][x][y] */
type Grid = Vec<Vec<Vec<Cell>>>;

#[derive(Clone, Debug, Default)]
pub struct SpatialIndex {
    grids: [Grid; NodeType::COUNT],
}

/// Side a node of `node_type` is filed under. Pins need an explicit side,
/// every other type shares `Side::CANONICAL`.
fn resolve_side(node_type: NodeType, side: Option<Side>) -> Option<Side> {
    if node_type.is_pin() {
        side
    } else {
        Some(Side::CANONICAL)
    }
}

fn coord(value: i16) -> Option<usize> {
    usize::try_from(value).ok()
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn cell(&self, layer: u8, x: i16, y: i16, node_type: NodeType) -> Option<&Cell> {
        self.grids[node_type.index()]
            .get(layer as usize)?
            .get(coord(x)?)?
            .get(coord(y)?)
    }

    fn cell_mut(&mut self, layer: u8, x: usize, y: usize, node_type: NodeType) -> &mut Cell {
        let grid = &mut self.grids[node_type.index()];
        if grid.len() <= layer as usize {
            grid.resize_with(layer as usize + 1, Vec::new);
        }
        let columns = &mut grid[layer as usize];
        if columns.len() <= x {
            columns.resize_with(x + 1, Vec::new);
        }
        let cells = &mut columns[x];
        if cells.len() <= y {
            cells.resize_with(y + 1, Default::default);
        }
        &mut cells[y]
    }

    fn checked_location(
        node_type: NodeType,
        x: i16,
        y: i16,
        side: Option<Side>
    ) -> Result<(usize, usize, Side)> {
        let side = resolve_side(node_type, side).ok_or_else(|| RrGraphError::contract(format!(
            "{} nodes need an explicit side in the spatial index", node_type
        )))?;
        match (coord(x), coord(y)) {
            (Some(x), Some(y)) => Ok((x, y, side)),
            _ => Err(RrGraphError::contract(format!(
                "negative location ({}, {}) in the spatial index", x, y
            ))),
        }
    }

    /// Files `node` under (type, layer, x, y, side, ptc). Backing storage
    /// grows to fit and never shrinks.
    pub fn add_node(
        &mut self,
        node: NodeId,
        layer: u8,
        x: i16,
        y: i16,
        node_type: NodeType,
        ptc: i16,
        side: Option<Side>
    ) -> Result<()> {
        let (x, y, side) = Self::checked_location(node_type, x, y, side)?;
        let ptc = usize::try_from(ptc).map_err(|_| RrGraphError::contract(format!(
            "negative ptc {} of node {} in the spatial index", ptc, node
        )))?;

        let slots = &mut self.cell_mut(layer, x, y, node_type)[side.index()];
        if slots.len() <= ptc {
            slots.resize(ptc + 1, NodeId::INVALID);
        }
        slots[ptc] = node;
        Ok(())
    }

    /// Pre-sizes the ptc slots of one cell.
    pub fn reserve_nodes(
        &mut self,
        layer: u8,
        x: i16,
        y: i16,
        node_type: NodeType,
        count: usize,
        side: Option<Side>
    ) -> Result<()> {
        let (x, y, side) = Self::checked_location(node_type, x, y, side)?;
        self.cell_mut(layer, x, y, node_type)[side.index()].reserve(count);
        Ok(())
    }

    pub fn find_node(
        &self,
        layer: u8,
        x: i16,
        y: i16,
        node_type: NodeType,
        ptc: i16,
        side: Option<Side>
    ) -> Option<NodeId> {
        let side = match resolve_side(node_type, side) {
            Some(side) => side,
            None => return contract_violation!(
                None, "{} lookup at ({}, {}) without a side", node_type, x, y
            ),
        };
        let ptc = usize::try_from(ptc).ok()?;
        self.cell(layer, x, y, node_type)?[side.index()]
            .get(ptc)
            .copied()
            .filter(|node| node.is_valid())
    }

    /// Clears the entry if it currently holds `node`. Returns whether anything
    /// was removed.
    pub fn remove_node(
        &mut self,
        node: NodeId,
        layer: u8,
        x: i16,
        y: i16,
        node_type: NodeType,
        ptc: i16,
        side: Option<Side>
    ) -> bool {
        if self.find_node(layer, x, y, node_type, ptc, side) != Some(node) {
            return false;
        }
        /* The lookup above proved every coordinate to be in range */
        let side = resolve_side(node_type, side).unwrap_or(Side::CANONICAL);
        self.grids[node_type.index()][layer as usize][x as usize][y as usize]
            [side.index()][ptc as usize] = NodeId::INVALID;
        true
    }

    /// Copies the node list of one cell side to another cell. Used for
    /// sources and sinks of tiles spanning several grid locations.
    pub fn mirror_nodes(
        &mut self,
        layer: u8,
        src: (i16, i16),
        dest: (i16, i16),
        node_type: NodeType,
        side: Side
    ) -> Result<()> {
        if !node_type.is_class() {
            return Err(RrGraphError::contract(format!(
                "mirroring {} nodes, only sources and sinks can be mirrored", node_type
            )));
        }
        let (x, y, side) = Self::checked_location(node_type, dest.0, dest.1, Some(side))?;
        let nodes = self.cell(layer, src.0, src.1, node_type)
            .map(|cell| cell[side.index()].clone())
            .unwrap_or_default();
        self.cell_mut(layer, x, y, node_type)[side.index()] = nodes;
        Ok(())
    }

    /// Every track of a channel cell, in ptc order.
    pub fn find_channel_nodes(&self, layer: u8, x: i16, y: i16, node_type: NodeType)
        -> Vec<NodeId>
    {
        if !node_type.is_channel() {
            return contract_violation!(
                Vec::new(), "channel lookup with node type {}", node_type
            );
        }
        self.cell(layer, x, y, node_type)
            .map(|cell| valid_nodes(&cell[Side::CANONICAL.index()]).collect())
            .unwrap_or_default()
    }

    /// All nodes of a cell, side by side. Pins on several sides show up once
    /// per side.
    pub fn find_grid_nodes_at_all_sides(&self, layer: u8, x: i16, y: i16, node_type: NodeType)
        -> Vec<NodeId>
    {
        self.cell(layer, x, y, node_type)
            .map(|cell| cell.iter().flat_map(|slots| valid_nodes(slots)).collect())
            .unwrap_or_default()
    }

    /// The node with `ptc` on each side of a cell.
    pub fn find_nodes_at_all_sides(&self, layer: u8, x: i16, y: i16, node_type: NodeType, ptc: i16)
        -> Vec<NodeId>
    {
        if !node_type.is_pin() {
            return self.find_node(layer, x, y, node_type, ptc, None).into_iter().collect();
        }
        Side::ALL.iter()
            .filter_map(|side| self.find_node(layer, x, y, node_type, ptc, Some(*side)))
            .collect()
    }

    /// Distinct nodes found at any cell of the inclusive rectangle, sorted by
    /// id.
    pub fn find_nodes_in_range(
        &self,
        layer: u8,
        low: (i16, i16),
        high: (i16, i16),
        node_type: NodeType,
        ptc: i16,
        side: Option<Side>
    ) -> Vec<NodeId> {
        let mut nodes = Vec::new();
        for x in low.0.min(high.0) ..= low.0.max(high.0) {
            for y in low.1.min(high.1) ..= low.1.max(high.1) {
                nodes.extend(self.find_node(layer, x, y, node_type, ptc, side));
            }
        }
        nodes.sort();
        nodes.dedup();
        nodes
    }

    fn slots_mut(&mut self) -> impl Iterator<Item = &mut NodeId> {
        self.grids.iter_mut()
            .flatten()
            .flatten()
            .flatten()
            .flatten()
            .flatten()
    }

    /// Rewrites every stored id through `old_to_new`. Ids mapped to `INVALID`
    /// disappear from the index.
    pub fn reorder(&mut self, old_to_new: &[NodeId]) {
        for slot in self.slots_mut() {
            if slot.is_valid() {
                *slot = old_to_new.get(slot.index()).copied().unwrap_or(NodeId::INVALID);
            }
        }
    }

    /// Number of occupied entries.
    pub fn count_entries(&self) -> usize {
        self.grids.iter()
            .flatten()
            .flatten()
            .flatten()
            .flatten()
            .flatten()
            .filter(|node| node.is_valid())
            .count()
    }

    /// Extent of the grid of one node type as (layers, width, height).
    pub fn dims(&self, node_type: NodeType) -> (usize, usize, usize) {
        let grid = &self.grids[node_type.index()];
        let width = grid.iter().map(Vec::len).max().unwrap_or(0);
        let height = grid.iter().flatten().map(Vec::len).max().unwrap_or(0);
        (grid.len(), width, height)
    }

    pub fn is_empty(&self) -> bool {
        self.count_entries() == 0
    }

    pub fn clear(&mut self) {
        for grid in self.grids.iter_mut() {
            grid.clear();
        }
    }
}

fn valid_nodes(slots: &[NodeId]) -> impl Iterator<Item = NodeId> + '_ {
    slots.iter().copied().filter(|node| node.is_valid())
}
