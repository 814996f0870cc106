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

/* Dense ids are plain indices into the columnar stores. They are renumbered
 * by reordering and graph surgery, so nothing holds on to them across those. */
macro_rules! dense_id {
    ($(#[$meta:meta])* $name:ident, $repr:ty) => {
        $(#[$meta])*
        #[derive(
            Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize
        )]
        #[serde(transparent)]
        pub struct $name($repr);

        impl $name {
            pub const INVALID: Self = Self(<$repr>::MAX);

            #[inline]
            pub fn new(idx: usize) -> Self {
                debug_assert!(idx < <$repr>::MAX as usize, "{} overflow", stringify!($name));
                Self(idx as $repr)
            }

            pub const fn from_raw(raw: $repr) -> Self {
                Self(raw)
            }

            #[inline]
            pub fn index(self) -> usize {
                self.0 as usize
            }

            #[inline]
            pub fn is_valid(self) -> bool {
                self != Self::INVALID
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

dense_id!(
    /// Routing resource node.
    NodeId, u32
);
dense_id!(
    /// Position of an edge in the edge store. Only stable between two
    /// partitioning passes.
    EdgeId, u32
);
dense_id!(
    /// Graph-space switch, i.e. an index into the `SwitchTable`.
    SwitchId, u16
);
dense_id!(
    /// Architecture-space switch as supplied by the architecture description,
    /// before fan-in dependent remapping.
    ArchSwitchId, u16
);
dense_id!(SegmentId, u16);
dense_id!(RcIndex, u16);
dense_id!(
    /// Index into externally owned cost tables.
    CostIndex, u16
);
dense_id!(NonConfigSetId, u32);

/// Half-open range of edges `[first, last)` owned by a single source node.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct EdgeRange {
    pub first: EdgeId,
    pub last: EdgeId,
}

impl EdgeRange {
    pub fn len(&self) -> usize {
        self.last.index() - self.first.index()
    }

    pub fn is_empty(&self) -> bool {
        self.first == self.last
    }

    pub fn contains(&self, edge: EdgeId) -> bool {
        edge >= self.first && edge < self.last
    }
}

impl Iterator for EdgeRange {
    type Item = EdgeId;

    fn next(&mut self) -> Option<EdgeId> {
        if self.first >= self.last {
            return None;
        }
        let edge = self.first;
        self.first = EdgeId::new(edge.index() + 1);
        Some(edge)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.last.index().saturating_sub(self.first.index());
        (len, Some(len))
    }
}

impl ExactSizeIterator for EdgeRange {}
