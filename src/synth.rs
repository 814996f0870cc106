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

//! Generator of a small island-style fabric. Logic tiles sit at
//! `(1 ..= width, 1 ..= height)`, surrounded by unit-length horizontal and
//! vertical channels. Used by the command-line front end and by tests.

use serde::{Deserialize, Serialize};

use crate::builder::{NodeSpec, RrGraphBuilder, Staging};
use crate::error::{Result, RrGraphError};
use crate::ids::*;
use crate::storage::EdgeSwitch;
use crate::tables::*;
use crate::types::*;

pub const DELAYLESS: ArchSwitchId = ArchSwitchId::from_raw(0);
pub const MUX: ArchSwitchId = ArchSwitchId::from_raw(1);
pub const SHORT: ArchSwitchId = ArchSwitchId::from_raw(2);

const COST_SOURCE: usize = 0;
const COST_SINK: usize = 1;
const COST_OPIN: usize = 2;
const COST_IPIN: usize = 3;
const COST_CHANX: usize = 4;
const COST_CHANY: usize = 5;

const OPIN: i16 = 0;
const IPIN_LEFT_TOP: i16 = 1;
const IPIN_BOTTOM: i16 = 2;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FabricParams {
    pub width: i16,
    pub height: i16,
    pub channel_width: i16,
    /// Tie the last track of neighbouring horizontal wires with shorts.
    pub shorts: bool,
}

impl Default for FabricParams {
    fn default() -> Self {
        Self { width: 4, height: 4, channel_width: 4, shorts: true }
    }
}

/// Architecture switches referenced by the staged edges.
pub fn arch_switches() -> Vec<ArchSwitch> {
    let mut mux = ArchSwitch::new(
        "mux",
        SwitchKind::Mux,
        DelayModel::FanInDependent(vec![
            (1, 50e-12),
            (2, 58e-12),
            (4, 71e-12),
            (8, 90e-12),
        ])
    );
    mux.r = 551.0;
    mux.c_out = 7.7e-15;
    mux.mux_trans_size = 2.63;
    mux.buf_size = 27.6;

    vec![
        ArchSwitch::new("__vpr_delayless_switch__", SwitchKind::Mux, DelayModel::Fixed(0.0)),
        mux,
        ArchSwitch::new("short", SwitchKind::Short, DelayModel::Fixed(0.0)),
    ]
}

struct Fabric<'p> {
    params: &'p FabricParams,
    builder: RrGraphBuilder<Staging>,
}

impl<'p> Fabric<'p> {
    fn node(&self, node_type: NodeType, x: i16, y: i16, ptc: i16, side: Option<Side>)
        -> Result<NodeId>
    {
        self.builder.node_lookup()
            .find_node(0, x, y, node_type, ptc, side)
            .ok_or_else(|| RrGraphError::contract(format!(
                "no {} with ptc {} at ({}, {})", node_type, ptc, x, y
            )))
    }

    fn edge(&mut self, src: NodeId, dest: NodeId, switch: ArchSwitchId) -> Result<()> {
        self.builder.add_edge(src, dest, EdgeSwitch::Arch(switch))
    }

    fn tiles(&self) -> impl Iterator<Item = (i16, i16)> {
        let (width, height) = (self.params.width, self.params.height);
        (1 ..= width).flat_map(move |x| (1 ..= height).map(move |y| (x, y)))
    }

    fn chanx_locs(&self) -> impl Iterator<Item = (i16, i16)> {
        let (width, height) = (self.params.width, self.params.height);
        (1 ..= width).flat_map(move |x| (0 ..= height).map(move |y| (x, y)))
    }

    fn chany_locs(&self) -> impl Iterator<Item = (i16, i16)> {
        let (width, height) = (self.params.width, self.params.height);
        (0 ..= width).flat_map(move |x| (1 ..= height).map(move |y| (x, y)))
    }

    fn track_direction(track: i16) -> Direction {
        if track % 2 == 0 {
            Direction::Increasing
        } else {
            Direction::Decreasing
        }
    }

    fn create_nodes(&mut self) -> Result<()> {
        let tiles: Vec<_> = self.tiles().collect();
        for (x, y) in tiles {
            let source = self.builder.add_node(&NodeSpec {
                cost_index: COST_SOURCE,
                ..NodeSpec::new(NodeType::Source, x, y)
            })?;
            self.builder.set_node_class_num(source, 0)?;
            self.builder.add_node(&NodeSpec {
                ptc: 1,
                capacity: 2,
                cost_index: COST_SINK,
                ..NodeSpec::new(NodeType::Sink, x, y)
            })?;
            self.builder.add_node(&NodeSpec {
                ptc: OPIN,
                cost_index: COST_OPIN,
                sides: SideSet::single(Side::Right),
                ..NodeSpec::new(NodeType::OutputPin, x, y)
            })?;
            let ipin = self.builder.add_node(&NodeSpec {
                ptc: IPIN_LEFT_TOP,
                cost_index: COST_IPIN,
                sides: [Side::Left, Side::Top].into_iter().collect(),
                ..NodeSpec::new(NodeType::InputPin, x, y)
            })?;
            let feature = format!("X{}Y{}.IMUX{}", x, y, IPIN_LEFT_TOP);
            self.builder.metadata_mut().add_node_metadata(ipin, "fasm_features", &feature);
            self.builder.add_node(&NodeSpec {
                ptc: IPIN_BOTTOM,
                cost_index: COST_IPIN,
                sides: SideSet::single(Side::Bottom),
                ..NodeSpec::new(NodeType::InputPin, x, y)
            })?;
        }

        let wire = |node_type: NodeType, x: i16, y: i16, track: i16, cost_index: usize| NodeSpec {
            ptc: track,
            cost_index,
            direction: Self::track_direction(track),
            r: 101.0,
            c: 22.5e-15,
            ..NodeSpec::new(node_type, x, y)
        };
        let chanx: Vec<_> = self.chanx_locs().collect();
        let chany: Vec<_> = self.chany_locs().collect();
        for track in 0 .. self.params.channel_width {
            for (x, y) in &chanx {
                self.builder.add_node(&wire(NodeType::ChanX, *x, *y, track, COST_CHANX))?;
            }
            for (x, y) in &chany {
                self.builder.add_node(&wire(NodeType::ChanY, *x, *y, track, COST_CHANY))?;
            }
        }
        Ok(())
    }

    fn create_edges(&mut self) -> Result<()> {
        let channel_width = self.params.channel_width;
        let (width, height) = (self.params.width, self.params.height);

        let tiles: Vec<_> = self.tiles().collect();
        for (x, y) in tiles {
            let source = self.node(NodeType::Source, x, y, 0, None)?;
            let sink = self.node(NodeType::Sink, x, y, 1, None)?;
            let opin = self.node(NodeType::OutputPin, x, y, OPIN, Some(Side::Right))?;
            let ipin_lt = self.node(NodeType::InputPin, x, y, IPIN_LEFT_TOP, Some(Side::Left))?;
            let ipin_b = self.node(NodeType::InputPin, x, y, IPIN_BOTTOM, Some(Side::Bottom))?;

            self.edge(source, opin, DELAYLESS)?;
            self.edge(ipin_lt, sink, DELAYLESS)?;
            self.edge(ipin_b, sink, DELAYLESS)?;

            for track in 0 .. channel_width {
                /* Output pins drive every other track of the channel to the right */
                if track % 2 == 0 {
                    let wire = self.node(NodeType::ChanY, x, y, track, None)?;
                    self.edge(opin, wire, MUX)?;
                }
                let above = self.node(NodeType::ChanX, x, y, track, None)?;
                let left = self.node(NodeType::ChanY, x - 1, y, track, None)?;
                self.edge(above, ipin_lt, MUX)?;
                self.edge(left, ipin_lt, MUX)?;
                if track % 2 == 1 {
                    let below = self.node(NodeType::ChanX, x, y - 1, track, None)?;
                    self.edge(below, ipin_b, MUX)?;
                }
            }
        }

        /* Switch boxes: wires continue straight and turn at every crossing */
        for track in 0 .. channel_width {
            let step = if Self::track_direction(track) == Direction::Increasing { 1 } else { -1 };

            let chanx: Vec<_> = self.chanx_locs().collect();
            for (x, y) in chanx {
                let wire = self.node(NodeType::ChanX, x, y, track, None)?;
                if (1 ..= width).contains(&(x + step)) {
                    let next = self.node(NodeType::ChanX, x + step, y, track, None)?;
                    self.edge(wire, next, MUX)?;
                }
                if (1 ..= height).contains(&y) {
                    let turn = self.node(NodeType::ChanY, x, y, track, None)?;
                    self.edge(wire, turn, MUX)?;
                }
                if self.params.shorts && track == channel_width - 1 && x < width {
                    let next = self.node(NodeType::ChanX, x + 1, y, track, None)?;
                    self.edge(wire, next, SHORT)?;
                    self.edge(next, wire, SHORT)?;
                }
            }

            let chany: Vec<_> = self.chany_locs().collect();
            for (x, y) in chany {
                let wire = self.node(NodeType::ChanY, x, y, track, None)?;
                if (1 ..= height).contains(&(y + step)) {
                    let next = self.node(NodeType::ChanY, x, y + step, track, None)?;
                    self.edge(wire, next, MUX)?;
                }
                if (1 ..= width).contains(&x) {
                    let turn = self.node(NodeType::ChanX, x, y, track, None)?;
                    self.edge(wire, turn, MUX)?;
                }
            }
        }
        Ok(())
    }
}

/// Builds the nodes and stages the edges of a fabric. Edges refer to
/// `arch_switches()` and still need to be finalized.
pub fn island_fabric(params: &FabricParams) -> Result<RrGraphBuilder<Staging>> {
    if params.width < 1 || params.height < 1 || params.channel_width < 1 {
        return Err(RrGraphError::Config(format!(
            "fabric needs at least one tile and one track, got {}x{} with {} tracks",
            params.width, params.height, params.channel_width
        )));
    }

    let mut builder = RrGraphBuilder::new();
    builder.add_segment(RrSegment::new("L1", 1, 101.0, 22.5e-15));

    let mut fabric = Fabric { params, builder };
    fabric.create_nodes()?;
    fabric.create_edges()?;
    Ok(fabric.builder)
}

/// Node count of a fabric built from `params`.
pub fn expected_num_nodes(params: &FabricParams) -> usize {
    let (w, h, t) = (params.width as usize, params.height as usize, params.channel_width as usize);
    5 * w * h + t * (w * (h + 1) + (w + 1) * h)
}
