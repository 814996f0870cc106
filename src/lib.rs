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

//! Routing resource graph of an FPGA: the nodes and switch edges of its
//! programmable routing fabric, the builder that constructs and finalizes the
//! graph, and the spatial index resolving physical locations to nodes.

#[macro_use]
extern crate lazy_static;

#[macro_use]
pub mod log;
#[macro_use]
pub mod error;
pub mod common;
pub mod strings;
pub mod ids;
pub mod types;
pub mod tables;
pub mod storage;
pub mod nonconfig;
pub mod spatial;
pub mod metadata;
pub mod config;
pub mod builder;
pub mod view;
pub mod synth;
pub mod stats;
pub mod export;

pub use builder::{
    NodePermutation,
    NodeRenumbering,
    NodeSpec,
    Partitioned,
    Remapped,
    RrGraphBuilder,
    Staging,
};
pub use config::{ReorderAlgorithm, RrGraphOptions};
pub use error::{Result, RrGraphError};
pub use ids::*;
pub use storage::EdgeSwitch;
pub use tables::*;
pub use types::*;
pub use view::RrGraphView;
