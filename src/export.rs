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

//! JSON dump of a finalized graph.

use serde::{Serialize, Serializer, ser::SerializeStruct, ser::SerializeSeq};

use crate::ids::*;
use crate::view::RrGraphView;

pub struct GraphDump<'a> {
    view: RrGraphView<'a>,
}

impl<'a> GraphDump<'a> {
    pub fn new(view: RrGraphView<'a>) -> Self {
        Self { view }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

struct NodeDump<'a> {
    view: RrGraphView<'a>,
    node: NodeId,
}

impl<'a> Serialize for NodeDump<'a> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error> where
        S: Serializer
    {
        let (view, node) = (self.view, self.node);
        let node_type = view.node_type(node);

        let mut s = serializer.serialize_struct("Node", 9)?;
        s.serialize_field("id", &node)?;
        s.serialize_field("type", node_type.as_str())?;
        s.serialize_field("capacity", &view.node_capacity(node))?;
        s.serialize_field("loc", &(
            view.node_xlow(node), view.node_ylow(node),
            view.node_xhigh(node), view.node_yhigh(node),
            view.node_layer_low(node)
        ))?;
        s.serialize_field("ptc", &view.node_ptc_nums_to_string(node))?;
        s.serialize_field("cost_index", &view.node_cost_index(node))?;
        if node_type.is_channel() {
            s.serialize_field("direction", view.node_direction(node).as_str())?;
        } else {
            s.skip_field("direction")?;
        }
        if node_type.is_pin() {
            s.serialize_field("sides", &view.node_sides(node))?;
        } else {
            s.skip_field("sides")?;
        }
        let metadata: Vec<_> = view.metadata().node_attributes(node).collect();
        s.serialize_field("metadata", &metadata)?;
        s.end()
    }
}

struct EdgeDump<'a> {
    view: RrGraphView<'a>,
    edge: EdgeId,
}

impl<'a> Serialize for EdgeDump<'a> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error> where
        S: Serializer
    {
        let mut s = serializer.serialize_struct("Edge", 3)?;
        s.serialize_field("src", &self.view.edge_src_node(self.edge))?;
        s.serialize_field("sink", &self.view.edge_sink_node(self.edge))?;
        s.serialize_field("switch", &self.view.edge_switch(self.edge))?;
        s.end()
    }
}

/* Walks nodes and their edge ranges without collecting them first */
struct Nodes<'a>(RrGraphView<'a>);
struct Edges<'a>(RrGraphView<'a>);

impl<'a> Serialize for Nodes<'a> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.num_nodes()))?;
        for node in self.0.nodes() {
            seq.serialize_element(&NodeDump { view: self.0, node })?;
        }
        seq.end()
    }
}

impl<'a> Serialize for Edges<'a> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.edge_count()))?;
        for node in self.0.nodes() {
            for edge in self.0.edges(node) {
                seq.serialize_element(&EdgeDump { view: self.0, edge })?;
            }
        }
        seq.end()
    }
}

impl<'a> Serialize for GraphDump<'a> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error> where
        S: Serializer
    {
        let switches: Vec<_> = self.view.switches().iter().map(|(_, sw)| sw).collect();
        let segments: Vec<_> = self.view.segments().iter().map(|(_, seg)| seg).collect();

        let mut s = serializer.serialize_struct("RrGraph", 4)?;
        s.serialize_field("switches", &switches)?;
        s.serialize_field("segments", &segments)?;
        s.serialize_field("nodes", &Nodes(self.view))?;
        s.serialize_field("edges", &Edges(self.view))?;
        s.end()
    }
}
