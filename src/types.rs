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

use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NodeType {
    Source,
    Sink,
    InputPin,
    OutputPin,
    ChanX,
    ChanY,
    ChanZ,
    Mux,
}

impl NodeType {
    pub const COUNT: usize = 8;
    pub const ALL: [NodeType; NodeType::COUNT] = [
        NodeType::Source,
        NodeType::Sink,
        NodeType::InputPin,
        NodeType::OutputPin,
        NodeType::ChanX,
        NodeType::ChanY,
        NodeType::ChanZ,
        NodeType::Mux,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Pins are the only nodes that live on a tile side.
    #[inline]
    pub fn is_pin(self) -> bool {
        matches!(self, NodeType::InputPin | NodeType::OutputPin)
    }

    #[inline]
    pub fn is_channel(self) -> bool {
        matches!(self, NodeType::ChanX | NodeType::ChanY | NodeType::ChanZ)
    }

    #[inline]
    pub fn is_class(self) -> bool {
        matches!(self, NodeType::Source | NodeType::Sink)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NodeType::Source => "SOURCE",
            NodeType::Sink => "SINK",
            NodeType::InputPin => "IPIN",
            NodeType::OutputPin => "OPIN",
            NodeType::ChanX => "CHANX",
            NodeType::ChanY => "CHANY",
            NodeType::ChanZ => "CHANZ",
            NodeType::Mux => "MUX",
        }
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Increasing,
    Decreasing,
    Bidirectional,
    None,
}

impl Direction {
    pub(crate) fn to_bits(self) -> u8 {
        match self {
            Direction::Increasing => 0,
            Direction::Decreasing => 1,
            Direction::Bidirectional => 2,
            Direction::None => 3,
        }
    }

    pub(crate) fn from_bits(bits: u8) -> Self {
        match bits {
            0 => Direction::Increasing,
            1 => Direction::Decreasing,
            2 => Direction::Bidirectional,
            _ => Direction::None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Increasing => "INC_DIR",
            Direction::Decreasing => "DEC_DIR",
            Direction::Bidirectional => "BI_DIR",
            Direction::None => "NONE",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Side {
    Top,
    Right,
    Bottom,
    Left,
}

impl Side {
    pub const ALL: [Side; 4] = [Side::Top, Side::Right, Side::Bottom, Side::Left];

    /// Side under which every non-pin node is registered in the spatial index.
    pub const CANONICAL: Side = Side::Top;

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Top => "TOP",
            Side::Right => "RIGHT",
            Side::Bottom => "BOTTOM",
            Side::Left => "LEFT",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set of tile sides a pin is reachable from. Packed into the low nibble so
/// it fits the shared direction/side byte of the hot node record.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct SideSet(u8);

impl SideSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn single(side: Side) -> Self {
        Self(1 << side.index())
    }

    pub(crate) fn from_bits(bits: u8) -> Self {
        Self(bits & 0xf)
    }

    pub(crate) fn bits(self) -> u8 {
        self.0
    }

    pub fn insert(&mut self, side: Side) {
        self.0 |= 1 << side.index();
    }

    pub fn remove(&mut self, side: Side) {
        self.0 &= !(1 << side.index());
    }

    pub fn contains(self, side: Side) -> bool {
        self.0 & (1 << side.index()) != 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Side> {
        Side::ALL.into_iter().filter(move |side| self.contains(*side))
    }
}

impl FromIterator<Side> for SideSet {
    fn from_iter<I: IntoIterator<Item = Side>>(iter: I) -> Self {
        let mut set = SideSet::empty();
        for side in iter {
            set.insert(side);
        }
        set
    }
}

impl std::fmt::Debug for SideSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl Serialize for SideSet {
    fn serialize<S: serde::Serializer>(&self, ser: S) -> Result<S::Ok, S::Error> {
        ser.collect_seq(self.iter())
    }
}
