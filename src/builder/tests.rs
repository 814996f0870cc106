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

use crate::config::{ReorderAlgorithm, RrGraphOptions};
use crate::error::RrGraphError;
use crate::export::GraphDump;
use crate::ids::*;
use crate::stats::GraphStats;
use crate::storage::EdgeSwitch;
use crate::synth::{self, FabricParams};
use crate::tables::*;
use crate::types::*;
use crate::view::RrGraphView;
use super::*;

fn fixed_mux() -> Vec<ArchSwitch> {
    vec![ArchSwitch::new("mux", SwitchKind::Mux, DelayModel::Fixed(1e-11))]
}

fn wire(track: i16, x: i16) -> NodeSpec {
    NodeSpec {
        ptc: track,
        direction: Direction::Increasing,
        ..NodeSpec::new(NodeType::ChanX, x, 1)
    }
}

/// SOURCE -> CHANX -> CHANX -> SINK
fn chain() -> (RrGraphBuilder<Staging>, [NodeId; 4]) {
    let mut builder = RrGraphBuilder::new();
    let source = builder.add_node(&NodeSpec::new(NodeType::Source, 1, 1)).unwrap();
    let a = builder.add_node(&wire(0, 1)).unwrap();
    let b = builder.add_node(&wire(0, 2)).unwrap();
    let sink = builder.add_node(&NodeSpec::new(NodeType::Sink, 2, 1)).unwrap();

    let mux = EdgeSwitch::Arch(ArchSwitchId::new(0));
    builder.add_edge(source, a, mux).unwrap();
    builder.add_edge(a, b, mux).unwrap();
    builder.add_edge(b, sink, mux).unwrap();
    (builder, [source, a, b, sink])
}

fn small_fabric() -> FabricParams {
    FabricParams { width: 3, height: 2, channel_width: 4, shorts: true }
}

fn finalized(params: &FabricParams, options: &RrGraphOptions) -> RrGraphBuilder<Partitioned> {
    synth::island_fabric(params).unwrap()
        .finalize(&synth::arch_switches(), options)
        .unwrap()
}

type Geometry = (NodeType, i16, i16, i16, i16, i16);

fn geometry(view: &RrGraphView<'_>, node: NodeId) -> Geometry {
    (
        view.node_type(node),
        view.node_xlow(node), view.node_ylow(node),
        view.node_xhigh(node), view.node_yhigh(node),
        view.node_ptc_num(node),
    )
}

/* Edges described by what they connect, independent of node numbering */
fn edge_multiset(view: &RrGraphView<'_>) -> Vec<(Geometry, Geometry, SwitchId)> {
    let mut edges: Vec<_> = view.nodes()
        .flat_map(|node| view.edges(node))
        .map(|edge| (
            geometry(view, view.edge_src_node(edge)),
            geometry(view, view.edge_sink_node(edge)),
            view.edge_switch(edge),
        ))
        .collect();
    edges.sort_by_key(|(src, dest, sw)| {
        (src.0.index(), src.1, src.2, src.5, dest.0.index(), dest.1, dest.2, dest.5, *sw)
    });
    edges
}

#[test]
fn test_chain_finalizes() {
    let (builder, [source, a, b, sink]) = chain();
    let graph = builder.finalize(&fixed_mux(), &RrGraphOptions::default()).unwrap();
    let view = graph.view();

    assert_eq!(view.first_edge(source), EdgeId::new(0));
    assert_eq!(view.num_edges(source), 1);
    assert_eq!(view.edge_sink_node(view.first_edge(source)), a);
    assert_eq!(view.num_edges(sink), 0);

    /* A fixed-delay switch needs a single graph switch regardless of fan-in */
    assert_eq!(view.switches().len(), 1);
    assert_eq!(view.switch(SwitchId::new(0)).arch_switch, Some(ArchSwitchId::new(0)));
    assert!(view.edge_is_configurable(view.first_edge(a)));

    assert_eq!(view.node_fan_in(source), 0);
    assert_eq!(view.node_fan_in(b), 1);
    assert_eq!(view.find_edge(a, b), Some(view.first_edge(a)));
    assert_eq!(view.find_edge(b, a), None);
    assert_eq!(view.num_non_configurable_sets(), 0);
}

#[test]
fn test_pin_on_two_sides() {
    let mut builder = RrGraphBuilder::new();
    let pin = builder.add_node(&NodeSpec {
        ptc: 5,
        sides: [Side::Left, Side::Top].into_iter().collect(),
        ..NodeSpec::new(NodeType::InputPin, 2, 3)
    }).unwrap();

    let graph = builder.finalize(&[], &RrGraphOptions::default()).unwrap();
    let view = graph.view();

    assert!(view.is_node_on_side(pin, Side::Left));
    assert!(view.is_node_on_side(pin, Side::Top));
    assert!(!view.is_node_on_side(pin, Side::Right));
    assert_eq!(view.node_side_string(pin), "TOP,LEFT");

    let lookup = view.node_lookup();
    assert_eq!(lookup.find_node(0, 2, 3, NodeType::InputPin, 5, Some(Side::Left)), Some(pin));
    assert_eq!(lookup.find_node(0, 2, 3, NodeType::InputPin, 5, Some(Side::Top)), Some(pin));
    assert_eq!(lookup.find_node(0, 2, 3, NodeType::InputPin, 5, Some(Side::Right)), None);
}

#[test]
fn test_pin_without_side_is_rejected() {
    let mut builder = RrGraphBuilder::new();
    let result = builder.add_node(&NodeSpec::new(NodeType::OutputPin, 1, 1));
    assert!(matches!(result, Err(RrGraphError::ContractViolation(_))));
}

#[test]
fn test_fabric_node_count() {
    let params = small_fabric();
    let builder = synth::island_fabric(&params).unwrap();
    assert_eq!(builder.num_nodes(), synth::expected_num_nodes(&params));

    let bad = FabricParams { width: 0, ..params };
    assert!(matches!(synth::island_fabric(&bad), Err(RrGraphError::Config(_))));
}

#[test]
fn test_configurable_edges_come_first() {
    let graph = finalized(&small_fabric(), &RrGraphOptions::default());
    let view = graph.view();

    let mut non_configurable = 0;
    for node in view.nodes() {
        assert!(view.configurable_edges(node).all(|e| view.edge_is_configurable(e)));
        assert!(view.non_configurable_edges(node).all(|e| !view.edge_is_configurable(e)));
        assert_eq!(
            view.num_configurable_edges(node) + view.num_non_configurable_edges(node),
            view.num_edges(node)
        );
        assert!(view.edges(node).all(|e| view.edge_src_node(e) == node));
        non_configurable += view.num_non_configurable_edges(node);
    }
    assert!(non_configurable > 0);
}

#[test]
fn test_fan_in_dependent_switches() {
    let graph = finalized(&small_fabric(), &RrGraphOptions::default());
    let view = graph.view();

    for node in view.nodes() {
        for edge in view.edges(node) {
            let switch = view.switch(view.edge_switch(edge));
            if switch.arch_switch != Some(synth::MUX) {
                continue;
            }
            let dest = view.edge_sink_node(edge);
            let mux_fan_in = view.nodes()
                .flat_map(|n| view.edges(n))
                .filter(|e| view.edge_sink_node(*e) == dest)
                .filter(|e| view.switch(view.edge_switch(*e)).arch_switch == Some(synth::MUX))
                .count() as u32;
            assert_eq!(switch.fan_in, FanInBucket::Count(mux_fan_in));
        }
    }
}

#[test]
fn test_shorts_form_non_configurable_sets() {
    let params = small_fabric();
    let graph = finalized(&params, &RrGraphOptions::default());
    let view = graph.view();

    /* One chain of shorted wires per horizontal channel row */
    assert_eq!(view.num_non_configurable_sets(), (params.height + 1) as usize);

    let lookup = view.node_lookup();
    let track = params.channel_width - 1;
    let first = lookup.find_node(0, 1, 0, NodeType::ChanX, track, None).unwrap();
    let last = lookup.find_node(0, params.width, 0, NodeType::ChanX, track, None).unwrap();
    let set = view.non_configurable_set_id(first).unwrap();
    assert_eq!(view.non_configurable_set_id(last), Some(set));
    assert_eq!(view.non_configurable_set(set).len(), params.width as usize);

    let other = lookup.find_node(0, 1, 0, NodeType::ChanX, 0, None).unwrap();
    assert_eq!(view.non_configurable_set_id(other), None);
}

#[test]
fn test_partition_is_idempotent() {
    let mut graph = finalized(&small_fabric(), &RrGraphOptions::default());
    let before = edge_multiset(&graph.view());
    let first: Vec<_> = graph.view().nodes().map(|n| graph.view().first_edge(n)).collect();

    assert_eq!(graph.partition_edges(), Ok(false));
    assert_eq!(edge_multiset(&graph.view()), before);
    let again: Vec<_> = graph.view().nodes().map(|n| graph.view().first_edge(n)).collect();
    assert_eq!(first, again);
    assert!(graph.validate().is_ok());
}

#[test]
fn test_staging_locked_after_fan_in() {
    let (mut builder, [source, _, b, _]) = chain();
    builder.compute_fan_in();

    let result = builder.add_edge(source, b, EdgeSwitch::Arch(ArchSwitchId::new(0)));
    assert!(matches!(result, Err(RrGraphError::ContractViolation(_))));
    assert!(matches!(builder.create_node(NodeType::ChanY), Err(RrGraphError::ContractViolation(_))));

    builder.unlock_edges();
    assert!(!builder.edges().is_fan_in_valid());
    builder.add_edge(source, b, EdgeSwitch::Arch(ArchSwitchId::new(0))).unwrap();
    assert_eq!(builder.num_edges(), 4);
}

#[test]
fn test_fan_in_and_in_edges() {
    let options = RrGraphOptions { build_in_edges: true, ..RrGraphOptions::default() };
    let graph = finalized(&small_fabric(), &options);
    let view = graph.view();

    let mut fan_in = vec![0u32; view.num_nodes()];
    for node in view.nodes() {
        for edge in view.edges(node) {
            fan_in[view.edge_sink_node(edge).index()] += 1;
        }
    }
    for node in view.nodes() {
        assert_eq!(view.node_fan_in(node), fan_in[node.index()]);
        let in_edges = view.node_in_edges(node).unwrap();
        assert_eq!(in_edges.len() as u32, fan_in[node.index()]);
        assert!(in_edges.iter().all(|e| view.edge_sink_node(*e) == node));
    }
}

#[test]
fn test_unlock_and_append() {
    let params = small_fabric();
    let graph = finalized(&params, &RrGraphOptions::default());
    let num_edges = graph.num_edges();
    let num_switches = graph.switches().len();

    let (source, sink) = {
        let lookup = graph.node_lookup();
        (
            lookup.find_node(0, 1, 1, NodeType::Source, 0, None).unwrap(),
            lookup.find_node(0, 1, 1, NodeType::Sink, 1, None).unwrap(),
        )
    };

    let mut staging = graph.unlock();
    staging.add_edge(source, sink, EdgeSwitch::Arch(synth::DELAYLESS)).unwrap();
    let graph = staging.finalize(&synth::arch_switches(), &RrGraphOptions::default()).unwrap();
    let view = graph.view();

    assert_eq!(view.edge_count(), num_edges + 1);
    let edge = view.find_edge(source, sink).unwrap();
    let switch = view.switch(view.edge_switch(edge));
    assert_eq!(switch.name, "__vpr_delayless_switch__");
    /* Edges resolved before the unlock kept their switches */
    assert_eq!(view.switches().len(), num_switches + 1);
    assert_eq!(view.node_fan_in(sink), 3);
}

#[test]
fn test_remove_nodes() {
    let params = small_fabric();
    let graph = finalized(&params, &RrGraphOptions::default());

    let victim = graph.node_lookup().find_node(0, 2, 1, NodeType::ChanX, 0, None).unwrap();
    let (num_nodes, num_edges) = (graph.num_nodes(), graph.num_edges());
    let touching = {
        let view = graph.view();
        view.num_edges(victim) + view.node_fan_in(victim) as usize
    };

    let (remapped, renumbering) = graph.remove_nodes(&[victim]).unwrap();
    let mut graph = remapped.partition_edges().unwrap();
    graph.compute_fan_in();

    assert_eq!(renumbering.num_removed(), 1);
    assert_eq!(renumbering.new_id(victim), None);
    assert_eq!(graph.num_nodes(), num_nodes - 1);
    assert_eq!(graph.num_edges(), num_edges - touching);
    assert!(graph.validate().is_ok());

    let view = graph.view();
    assert_eq!(view.node_lookup().find_node(0, 2, 1, NodeType::ChanX, 0, None), None);
    let neighbour = view.node_lookup().find_node(0, 3, 1, NodeType::ChanX, 0, None).unwrap();
    assert_eq!(geometry(&view, neighbour), (NodeType::ChanX, 3, 1, 3, 1, 0));
}

#[test]
fn test_remove_edges() {
    let graph = finalized(&small_fabric(), &RrGraphOptions::default());
    let num_edges = graph.num_edges();
    let (src, dest) = {
        let view = graph.view();
        let edge = EdgeId::new(0);
        (view.edge_src_node(edge), view.edge_sink_node(edge))
    };

    let graph = graph.remove_edges(&[EdgeId::new(0)]).unwrap().partition_edges().unwrap();
    assert_eq!(graph.num_edges(), num_edges - 1);
    assert_eq!(graph.view().find_edge(src, dest), None);
    assert!(!graph.view().has_fan_in());

    let out_of_range = graph.remove_edges(&[EdgeId::new(num_edges)]);
    assert!(matches!(out_of_range, Err(RrGraphError::ContractViolation(_))));
}

#[test]
fn test_shrink_forgets_truncated_nodes() {
    let mut builder = RrGraphBuilder::new();
    builder.add_node(&NodeSpec::new(NodeType::Source, 1, 1)).unwrap();
    builder.add_node(&NodeSpec::new(NodeType::Sink, 1, 1)).unwrap();
    let clk = builder.create_node(NodeType::Sink).unwrap();
    builder.set_node_name(clk, "clk").unwrap();
    builder.metadata_mut().add_node_metadata(clk, "fasm_features", "CLK");

    builder.resize_nodes(1).unwrap();
    builder.resize_nodes(3).unwrap();

    assert_eq!(builder.nodes().name(clk), None);
    assert_eq!(builder.metadata().node_metadata(clk, "fasm_features"), None);
    assert_eq!(builder.node_lookup().find_node(0, 1, 1, NodeType::Sink, 0, None), None);

    let options = RrGraphOptions { reorder: ReorderAlgorithm::RandomShuffle, ..RrGraphOptions::default() };
    let graph = builder.finalize(&[], &options).unwrap();
    assert_eq!(graph.num_nodes(), 3);
    assert!((0 .. 3).all(|n| graph.view().node_name(NodeId::new(n)).is_none()));
}

#[test]
fn test_shrink_below_staged_edges_is_rejected() {
    let mut builder = RrGraphBuilder::new();
    let nodes: Vec<NodeId> = (0 .. 3)
        .map(|_| builder.create_node(NodeType::ChanX).unwrap())
        .collect();
    builder.add_edge(nodes[0], nodes[2], EdgeSwitch::Arch(ArchSwitchId::new(0))).unwrap();

    let result = builder.resize_nodes(2);
    assert!(matches!(result, Err(RrGraphError::ContractViolation(_))));
    assert_eq!(builder.num_nodes(), 3);

    let graph = builder.finalize(&fixed_mux(), &RrGraphOptions::default()).unwrap();
    assert_eq!(graph.view().node_fan_in(nodes[2]), 1);
}

#[test]
fn test_remove_edges_drops_their_metadata() {
    let mut graph = finalized(&small_fabric(), &RrGraphOptions::default());
    let key = |graph: &RrGraphBuilder<Partitioned>, edge: usize| {
        let view = graph.view();
        let edge = EdgeId::new(edge);
        (view.edge_src_node(edge), view.edge_sink_node(edge), view.edge_switch(edge))
    };
    let (removed, kept) = (key(&graph, 0), key(&graph, 1));
    graph.metadata_mut().add_edge_metadata(removed, "fasm_features", "A");
    graph.metadata_mut().add_edge_metadata(kept, "fasm_features", "B");

    let graph = graph.remove_edges(&[EdgeId::new(0)]).unwrap();

    assert_eq!(graph.metadata().edge_metadata(removed, "fasm_features"), None);
    assert_eq!(graph.metadata().edge_metadata(kept, "fasm_features"), Some("B"));
    assert_eq!(graph.metadata().annotated_edges().count(), 1);
}

#[test]
fn test_degree_bfs_orders_by_degree() {
    let options = RrGraphOptions { reorder: ReorderAlgorithm::DegreeBfs, ..RrGraphOptions::default() };
    let graph = finalized(&small_fabric(), &options);
    let view = graph.view();

    let degrees: Vec<usize> = view.nodes()
        .map(|n| view.num_edges(n) + view.node_fan_in(n) as usize)
        .collect();
    assert!(degrees.windows(2).all(|w| w[0] >= w[1]));
}

/* Every node has one in- and one out-edge, so only discovery order decides */
#[test]
fn test_degree_bfs_ties_follow_discovery() {
    let mut builder = RrGraphBuilder::new();
    let mux = builder.add_switch(RrSwitch::new("mux", SwitchKind::Mux, 1e-11));
    let nodes: Vec<NodeId> = (0 .. 4)
        .map(|_| builder.create_node(NodeType::ChanX).unwrap())
        .collect();
    for (src, dest) in [(0, 2), (2, 1), (1, 3), (3, 0)] {
        builder.add_edge(nodes[src], nodes[dest], EdgeSwitch::Graph(mux)).unwrap();
    }

    let mut graph = builder.mark_already_resolved().unwrap().partition_edges().unwrap();
    let permutation = graph.reorder_nodes(ReorderAlgorithm::DegreeBfs, 0, 0)
        .unwrap()
        .unwrap();

    let order: Vec<NodeId> = (0 .. 4).map(|new| permutation.old_id(NodeId::new(new))).collect();
    assert_eq!(order, vec![nodes[0], nodes[2], nodes[1], nodes[3]]);

    let view = graph.view();
    assert!(view.find_edge(NodeId::new(0), NodeId::new(1)).is_some());
    assert!(view.find_edge(NodeId::new(1), NodeId::new(2)).is_some());
    assert!(view.find_edge(NodeId::new(3), NodeId::new(0)).is_some());
    assert_eq!(view.find_edge(NodeId::new(0), NodeId::new(2)), None);
}

#[test]
fn test_reorder_below_threshold() {
    let mut graph = finalized(&small_fabric(), &RrGraphOptions::default());
    let threshold = graph.num_nodes() + 1;
    assert_eq!(graph.reorder_nodes(ReorderAlgorithm::DegreeBfs, threshold, 0), Ok(None));
    assert_eq!(graph.reorder_nodes(ReorderAlgorithm::None, 0, 0), Ok(None));
}

#[test]
fn test_metadata_follows_reorder() {
    let mut graph = finalized(&small_fabric(), &RrGraphOptions::default());
    let ipin = graph.node_lookup()
        .find_node(0, 2, 1, NodeType::InputPin, 1, Some(Side::Left))
        .unwrap();

    let permutation = graph.reorder_nodes(ReorderAlgorithm::RandomShuffle, 0, 3)
        .unwrap()
        .unwrap();
    let moved = permutation.new_id(ipin);
    assert_eq!(permutation.old_id(moved), ipin);

    let view = graph.view();
    assert_eq!(
        view.node_lookup().find_node(0, 2, 1, NodeType::InputPin, 1, Some(Side::Top)),
        Some(moved)
    );
    assert_eq!(view.metadata().node_metadata(moved, "fasm_features"), Some("X2Y1.IMUX1"));
    assert!(view.validate().is_ok());
}

#[test]
fn test_view_shared_between_threads() {
    let graph = finalized(&small_fabric(), &RrGraphOptions::default());
    let view = graph.view();

    let counts: Vec<usize> = std::thread::scope(|s| {
        let workers: Vec<_> = (0 .. 3)
            .map(|_| s.spawn(move || view.nodes().map(|n| view.num_edges(n)).sum::<usize>()))
            .collect();
        workers.into_iter().map(|w| w.join().unwrap()).collect()
    });
    assert!(counts.iter().all(|c| *c == view.edge_count()));

    let single = GraphStats::collect(view, 1);
    assert_eq!(GraphStats::collect(view, 4), single);
    assert_eq!(single.num_nodes, view.num_nodes());
    assert_eq!(single.nodes_per_type.values().sum::<usize>(), view.num_nodes());
    assert_eq!(single.configurable_edges + single.non_configurable_edges, view.edge_count());
}

#[test]
fn test_export_json() {
    let graph = finalized(&small_fabric(), &RrGraphOptions::default());
    let view = graph.view();

    let json = GraphDump::new(view).to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert_eq!(value["nodes"].as_array().unwrap().len(), view.num_nodes());
    assert_eq!(value["edges"].as_array().unwrap().len(), view.edge_count());
    assert_eq!(value["switches"].as_array().unwrap().len(), view.switches().len());
    assert_eq!(value["segments"][0]["name"], "L1");
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_shuffle_keeps_connectivity(seed in any::<u64>()) {
        let params = FabricParams { width: 2, height: 2, channel_width: 2, shorts: true };
        let reference = finalized(&params, &RrGraphOptions::default());
        let options = RrGraphOptions {
            reorder: ReorderAlgorithm::RandomShuffle,
            reorder_seed: seed,
            ..RrGraphOptions::default()
        };
        let shuffled = finalized(&params, &options);

        prop_assert_eq!(edge_multiset(&shuffled.view()), edge_multiset(&reference.view()));
        prop_assert_eq!(
            shuffled.view().num_non_configurable_sets(),
            reference.view().num_non_configurable_sets()
        );
        prop_assert!(shuffled.validate().is_ok());
    }

    #[test]
    fn prop_degree_bfs_keeps_connectivity(
        width in 1i16 .. 4, height in 1i16 .. 4, channel_width in 1i16 .. 4
    ) {
        let params = FabricParams { width, height, channel_width, shorts: true };
        let reference = finalized(&params, &RrGraphOptions::default());
        let options = RrGraphOptions {
            reorder: ReorderAlgorithm::DegreeBfs,
            ..RrGraphOptions::default()
        };
        let reordered = finalized(&params, &options);

        prop_assert_eq!(edge_multiset(&reordered.view()), edge_multiset(&reference.view()));
        prop_assert_eq!(
            reordered.view().num_non_configurable_sets(),
            reference.view().num_non_configurable_sets()
        );
        prop_assert!(reordered.validate().is_ok());
    }
}
