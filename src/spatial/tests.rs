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

use proptest::prelude::*;

use super::*;

fn n(idx: usize) -> NodeId {
    NodeId::new(idx)
}

#[test]
fn test_register_lookup_remove() {
    let mut index = SpatialIndex::new();
    index.add_node(n(7), 0, 3, 4, NodeType::ChanX, 2, None).unwrap();

    assert_eq!(index.find_node(0, 3, 4, NodeType::ChanX, 2, None), Some(n(7)));
    /* Channels ignore the side they are queried with */
    assert_eq!(index.find_node(0, 3, 4, NodeType::ChanX, 2, Some(Side::Left)), Some(n(7)));
    assert_eq!(index.find_node(0, 3, 4, NodeType::ChanY, 2, None), None);

    assert!(!index.remove_node(n(8), 0, 3, 4, NodeType::ChanX, 2, None));
    assert!(index.remove_node(n(7), 0, 3, 4, NodeType::ChanX, 2, None));
    assert!(!index.remove_node(n(7), 0, 3, 4, NodeType::ChanX, 2, None));
    assert_eq!(index.find_node(0, 3, 4, NodeType::ChanX, 2, None), None);
}

proptest! {
    #[test]
    fn prop_register_round_trip(
        layer in 0u8 .. 3,
        x in 0i16 .. 40,
        y in 0i16 .. 40,
        ptc in 0i16 .. 16,
        side in 0usize .. 4,
        node in 0usize .. 10_000
    ) {
        let side = Side::ALL[side];
        let mut index = SpatialIndex::new();
        index.add_node(n(node), layer, x, y, NodeType::InputPin, ptc, Some(side)).unwrap();

        prop_assert_eq!(
            index.find_node(layer, x, y, NodeType::InputPin, ptc, Some(side)),
            Some(n(node))
        );
        prop_assert!(index.remove_node(n(node), layer, x, y, NodeType::InputPin, ptc, Some(side)));
        prop_assert_eq!(index.find_node(layer, x, y, NodeType::InputPin, ptc, Some(side)), None);
    }
}

#[test]
fn test_out_of_range_lookups() {
    let mut index = SpatialIndex::new();
    index.add_node(n(1), 0, 1, 1, NodeType::Source, 0, None).unwrap();

    assert_eq!(index.find_node(0, -1, 1, NodeType::Source, 0, None), None);
    assert_eq!(index.find_node(0, 1, -3, NodeType::Source, 0, None), None);
    assert_eq!(index.find_node(0, 1, 1, NodeType::Source, -1, None), None);
    assert_eq!(index.find_node(2, 1, 1, NodeType::Source, 0, None), None);
    assert_eq!(index.find_node(0, 100, 1, NodeType::Source, 0, None), None);
    assert_eq!(index.find_node(0, 1, 1, NodeType::Source, 9, None), None);
}

#[test]
fn test_pins_need_a_side() {
    let mut index = SpatialIndex::new();
    assert!(index.add_node(n(0), 0, 0, 0, NodeType::OutputPin, 0, None).is_err());
    assert!(index.add_node(n(0), 0, -1, 0, NodeType::Sink, 0, None).is_err());
}

#[cfg(debug_assertions)]
#[test]
#[should_panic(expected = "contract violation")]
fn test_pin_lookup_without_side_panics() {
    let index = SpatialIndex::new();
    index.find_node(0, 0, 0, NodeType::InputPin, 0, None);
}

#[test]
fn test_pin_on_two_sides() {
    let mut index = SpatialIndex::new();
    index.add_node(n(3), 0, 2, 2, NodeType::InputPin, 5, Some(Side::Left)).unwrap();
    index.add_node(n(3), 0, 2, 2, NodeType::InputPin, 5, Some(Side::Top)).unwrap();

    assert_eq!(index.find_nodes_at_all_sides(0, 2, 2, NodeType::InputPin, 5), vec![n(3), n(3)]);
    assert_eq!(index.find_node(0, 2, 2, NodeType::InputPin, 5, Some(Side::Right)), None);
    assert_eq!(index.find_grid_nodes_at_all_sides(0, 2, 2, NodeType::InputPin).len(), 2);
}

#[test]
fn test_growth_never_shrinks() {
    let mut index = SpatialIndex::new();
    index.add_node(n(0), 1, 5, 7, NodeType::Mux, 0, None).unwrap();
    index.add_node(n(1), 0, 1, 1, NodeType::Mux, 0, None).unwrap();

    assert_eq!(index.dims(NodeType::Mux), (2, 6, 8));
    assert_eq!(index.dims(NodeType::ChanX), (0, 0, 0));
}

#[test]
fn test_mirror_class_nodes() {
    let mut index = SpatialIndex::new();
    index.add_node(n(4), 0, 1, 1, NodeType::Sink, 0, None).unwrap();
    index.add_node(n(5), 0, 1, 1, NodeType::Sink, 1, None).unwrap();
    index.mirror_nodes(0, (1, 1), (1, 2), NodeType::Sink, Side::Top).unwrap();

    assert_eq!(index.find_node(0, 1, 2, NodeType::Sink, 1, None), Some(n(5)));
    assert!(index.mirror_nodes(0, (1, 1), (1, 2), NodeType::ChanX, Side::Top).is_err());
}

#[test]
fn test_channel_and_range_queries() {
    let mut index = SpatialIndex::new();
    for x in 1 .. 4 {
        index.add_node(n(10), 0, x, 1, NodeType::ChanX, 0, None).unwrap();
        index.add_node(n(11), 0, x, 1, NodeType::ChanX, 2, None).unwrap();
    }

    assert_eq!(index.find_channel_nodes(0, 2, 1, NodeType::ChanX), vec![n(10), n(11)]);
    assert_eq!(index.find_nodes_in_range(0, (3, 1), (0, 1), NodeType::ChanX, 2, None), vec![n(11)]);
    assert_eq!(index.count_entries(), 6);
}

#[test]
fn test_reorder_and_clear() {
    let mut index = SpatialIndex::new();
    index.add_node(n(0), 0, 0, 0, NodeType::ChanY, 0, None).unwrap();
    index.add_node(n(1), 0, 0, 0, NodeType::ChanY, 1, None).unwrap();
    index.add_node(n(2), 0, 0, 0, NodeType::ChanY, 2, None).unwrap();

    index.reorder(&[n(2), NodeId::INVALID, n(0)]);
    assert_eq!(index.find_channel_nodes(0, 0, 0, NodeType::ChanY), vec![n(2), n(0)]);

    index.clear();
    assert!(index.is_empty());
}
