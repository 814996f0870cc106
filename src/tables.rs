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

//! Flyweight catalogs referenced from nodes and edges by small ids.
//!
//! Switches and segments are interned without deduplication: callers may rely
//! on the position at which they added a record. RC pairs are deduplicated by
//! value.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::ids::*;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SwitchKind {
    Mux,
    Tristate,
    PassGate,
    /// Permanent electrical short between two wires.
    Short,
    /// Non-configurable buffer.
    Buffer,
}

impl SwitchKind {
    pub fn configurable(self) -> bool {
        !matches!(self, SwitchKind::Short | SwitchKind::Buffer)
    }

    pub fn buffered(self) -> bool {
        matches!(self, SwitchKind::Mux | SwitchKind::Tristate | SwitchKind::Buffer)
    }
}

/// Intrinsic delay of an architecture switch, as given by the architecture
/// description. Fan-in dependent switches list (fan-in, Tdel) pairs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum DelayModel {
    Fixed(f32),
    FanInDependent(Vec<(u32, f32)>),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArchSwitch {
    pub name: String,
    pub kind: SwitchKind,
    pub r: f32,
    pub c_in: f32,
    pub c_out: f32,
    pub c_internal: f32,
    pub delay: DelayModel,
    pub mux_trans_size: f32,
    pub buf_size: f32,
}

impl ArchSwitch {
    pub fn new(name: &str, kind: SwitchKind, delay: DelayModel) -> Self {
        Self {
            name: name.to_string(),
            kind,
            r: 0.0,
            c_in: 0.0,
            c_out: 0.0,
            c_internal: 0.0,
            delay,
            mux_trans_size: 1.0,
            buf_size: 0.0,
        }
    }

    pub fn fixed_delay(&self) -> bool {
        match &self.delay {
            DelayModel::Fixed(_) => true,
            /* A table with a single entry does not depend on fan-in either */
            DelayModel::FanInDependent(table) => table.len() <= 1,
        }
    }

    /// Picks the supplied Tdel entry for `fan_in`: the entry with the largest
    /// fan-in not exceeding the requested one, or the smallest entry.
    pub fn delay_for_fan_in(&self, fan_in: FanInBucket) -> f32 {
        match (&self.delay, fan_in) {
            (DelayModel::Fixed(tdel), _) => *tdel,
            (DelayModel::FanInDependent(table), FanInBucket::Count(fan_in)) => table.iter()
                .filter(|(f, _)| *f <= fan_in)
                .max_by_key(|(f, _)| *f)
                .or_else(|| table.iter().min_by_key(|(f, _)| *f))
                .map(|(_, tdel)| *tdel)
                .unwrap_or(0.0),
            (DelayModel::FanInDependent(table), FanInBucket::Independent) =>
                table.first().map(|(_, tdel)| *tdel).unwrap_or(0.0),
        }
    }
}

/// Fan-in key used when resolving architecture switches. Fan-in independent
/// switches collapse into the `Independent` bucket.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FanInBucket {
    Independent,
    Count(u32),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RrSwitch {
    pub name: String,
    pub kind: SwitchKind,
    pub r: f32,
    pub c_in: f32,
    pub c_out: f32,
    pub c_internal: f32,
    pub t_del: f32,
    pub mux_trans_size: f32,
    pub buf_size: f32,
    /// Architecture switch this one was derived from, if any.
    pub arch_switch: Option<ArchSwitchId>,
    pub fan_in: FanInBucket,
}

impl RrSwitch {
    pub fn from_arch(arch: &ArchSwitch, arch_id: ArchSwitchId, fan_in: FanInBucket) -> Self {
        Self {
            name: arch.name.clone(),
            kind: arch.kind,
            r: arch.r,
            c_in: arch.c_in,
            c_out: arch.c_out,
            c_internal: arch.c_internal,
            t_del: arch.delay_for_fan_in(fan_in),
            mux_trans_size: arch.mux_trans_size,
            buf_size: arch.buf_size,
            arch_switch: Some(arch_id),
            fan_in,
        }
    }

    /// A switch record that did not come out of fan-in remapping, e.g. one
    /// read back from a graph file.
    pub fn new(name: &str, kind: SwitchKind, t_del: f32) -> Self {
        Self {
            name: name.to_string(),
            kind,
            r: 0.0,
            c_in: 0.0,
            c_out: 0.0,
            c_internal: 0.0,
            t_del,
            mux_trans_size: 1.0,
            buf_size: 0.0,
            arch_switch: None,
            fan_in: FanInBucket::Independent,
        }
    }

    #[inline]
    pub fn configurable(&self) -> bool {
        self.kind.configurable()
    }

    #[inline]
    pub fn buffered(&self) -> bool {
        self.kind.buffered()
    }
}

#[derive(Clone, Debug, Default)]
pub struct SwitchTable {
    switches: Vec<RrSwitch>,
}

impl SwitchTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, switch: RrSwitch) -> SwitchId {
        let id = SwitchId::new(self.switches.len());
        self.switches.push(switch);
        id
    }

    pub fn reserve(&mut self, additional: usize) {
        self.switches.reserve(additional);
    }

    pub fn get(&self, id: SwitchId) -> Option<&RrSwitch> {
        self.switches.get(id.index())
    }

    pub fn len(&self) -> usize {
        self.switches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.switches.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SwitchId, &RrSwitch)> {
        self.switches.iter().enumerate().map(|(idx, sw)| (SwitchId::new(idx), sw))
    }

    pub(crate) fn is_configurable_raw(&self, raw: u16) -> Option<bool> {
        self.switches.get(raw as usize).map(RrSwitch::configurable)
    }
}

impl std::ops::Index<SwitchId> for SwitchTable {
    type Output = RrSwitch;

    fn index(&self, id: SwitchId) -> &RrSwitch {
        &self.switches[id.index()]
    }
}

/// Mapping from (architecture switch, fan-in bucket) to the graph switch
/// created for that pair. Produced by `count_switches_needed`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SwitchFanInTable {
    buckets: Vec<BTreeMap<FanInBucket, SwitchId>>,
    first_id: usize,
    num_switches: usize,
}

impl SwitchFanInTable {
    pub(crate) fn new(num_arch_switches: usize, first_id: usize) -> Self {
        Self {
            buckets: vec![BTreeMap::new(); num_arch_switches],
            first_id,
            num_switches: 0,
        }
    }

    /// Returns the graph switch for the pair, creating a fresh id on first use.
    pub(crate) fn intern(&mut self, arch: ArchSwitchId, bucket: FanInBucket) -> SwitchId {
        let next = SwitchId::new(self.first_id + self.num_switches);
        let id = *self.buckets[arch.index()].entry(bucket).or_insert(next);
        if id == next {
            self.num_switches += 1;
        }
        id
    }

    pub fn lookup(&self, arch: ArchSwitchId, bucket: FanInBucket) -> Option<SwitchId> {
        let buckets = self.buckets.get(arch.index())?;
        /* The sentinel bucket wins, it means the arch switch ignores fan-in */
        buckets.get(&FanInBucket::Independent)
            .or_else(|| buckets.get(&bucket))
            .copied()
    }

    pub fn num_arch_switches(&self) -> usize {
        self.buckets.len()
    }

    /// Number of graph switches the table allocates.
    pub fn num_switches_needed(&self) -> usize {
        self.num_switches
    }

    pub fn first_id(&self) -> SwitchId {
        SwitchId::new(self.first_id)
    }

    /// All (graph switch, arch switch, bucket) triples in graph switch order.
    pub fn entries(&self) -> Vec<(SwitchId, ArchSwitchId, FanInBucket)> {
        let mut entries: Vec<_> = self.buckets.iter()
            .enumerate()
            .flat_map(|(arch, buckets)| {
                buckets.iter().map(move |(bucket, id)| (*id, ArchSwitchId::new(arch), *bucket))
            })
            .collect();
        entries.sort_by_key(|(id, _, _)| *id);
        entries
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParallelAxis {
    X,
    Y,
    Both,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RrSegment {
    pub name: String,
    pub length: u32,
    pub r_metal: f32,
    pub c_metal: f32,
    pub frequency: u32,
    pub parallel_axis: ParallelAxis,
}

impl RrSegment {
    pub fn new(name: &str, length: u32, r_metal: f32, c_metal: f32) -> Self {
        Self {
            name: name.to_string(),
            length,
            r_metal,
            c_metal,
            frequency: 1,
            parallel_axis: ParallelAxis::Both,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct SegmentTable {
    segments: Vec<RrSegment>,
}

impl SegmentTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, segment: RrSegment) -> SegmentId {
        let id = SegmentId::new(self.segments.len());
        self.segments.push(segment);
        id
    }

    pub fn get(&self, id: SegmentId) -> Option<&RrSegment> {
        self.segments.get(id.index())
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SegmentId, &RrSegment)> {
        self.segments.iter().enumerate().map(|(idx, seg)| (SegmentId::new(idx), seg))
    }
}

impl std::ops::Index<SegmentId> for SegmentTable {
    type Output = RrSegment;

    fn index(&self, id: SegmentId) -> &RrSegment {
        &self.segments[id.index()]
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RcData {
    pub r: f32,
    pub c: f32,
}

/// Deduplicated resistance/capacitance pairs. Two pairs are equal when their
/// bit patterns are, so `-0.0` and `0.0` are kept apart.
#[derive(Clone, Debug, Default)]
pub struct RcTable {
    data: Vec<RcData>,
    index: HashMap<(u32, u32), RcIndex>,
}

impl RcTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find_or_insert(&mut self, r: f32, c: f32) -> RcIndex {
        let key = (r.to_bits(), c.to_bits());
        if let Some(idx) = self.index.get(&key) {
            return *idx;
        }
        let idx = RcIndex::new(self.data.len());
        self.data.push(RcData { r, c });
        self.index.insert(key, idx);
        idx
    }

    pub fn get(&self, idx: RcIndex) -> Option<&RcData> {
        self.data.get(idx.index())
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rc_table_dedups_by_value() {
        let mut table = RcTable::new();
        let a = table.find_or_insert(1.5, 2.0e-15);
        let b = table.find_or_insert(3.0, 2.0e-15);
        let c = table.find_or_insert(1.5, 2.0e-15);

        assert_eq!(a, c);
        assert_ne!(a, b);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(b).unwrap().r, 3.0);
    }

    #[test]
    fn test_switch_table_keeps_duplicates() {
        let mut table = SwitchTable::new();
        let a = table.add(RrSwitch::new("mux", SwitchKind::Mux, 1e-10));
        let b = table.add(RrSwitch::new("mux", SwitchKind::Mux, 1e-10));

        assert_ne!(a, b);
        assert_eq!(table.len(), 2);
        assert!(table[a].configurable());
    }

    #[test]
    fn test_short_and_buffer_are_not_configurable() {
        assert!(!SwitchKind::Short.configurable());
        assert!(!SwitchKind::Buffer.configurable());
        assert!(SwitchKind::PassGate.configurable());
        assert!(!SwitchKind::PassGate.buffered());
    }

    #[test]
    fn test_fan_in_table_interning() {
        let mut table = SwitchFanInTable::new(2, 3);
        let a = table.intern(ArchSwitchId::new(0), FanInBucket::Count(2));
        let b = table.intern(ArchSwitchId::new(0), FanInBucket::Count(4));
        let c = table.intern(ArchSwitchId::new(0), FanInBucket::Count(2));
        let d = table.intern(ArchSwitchId::new(1), FanInBucket::Independent);

        assert_eq!(a, SwitchId::new(3));
        assert_eq!(b, SwitchId::new(4));
        assert_eq!(a, c);
        assert_eq!(d, SwitchId::new(5));
        assert_eq!(table.num_switches_needed(), 3);
        assert_eq!(
            table.lookup(ArchSwitchId::new(1), FanInBucket::Count(17)),
            Some(d)
        );
        assert_eq!(table.lookup(ArchSwitchId::new(0), FanInBucket::Count(3)), None);
    }

    #[test]
    fn test_delay_lookup() {
        let sw = ArchSwitch::new(
            "mux",
            SwitchKind::Mux,
            DelayModel::FanInDependent(vec![(2, 10.0), (4, 20.0), (8, 30.0)])
        );

        assert!(!sw.fixed_delay());
        assert_eq!(sw.delay_for_fan_in(FanInBucket::Count(1)), 10.0);
        assert_eq!(sw.delay_for_fan_in(FanInBucket::Count(5)), 20.0);
        assert_eq!(sw.delay_for_fan_in(FanInBucket::Count(64)), 30.0);
    }
}
