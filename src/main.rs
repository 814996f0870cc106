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

use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use rrgraph::export::GraphDump;
use rrgraph::stats::GraphStats;
use rrgraph::synth::{self, FabricParams};
use rrgraph::{RrGraphBuilder, Partitioned, RrGraphError, RrGraphOptions};

#[derive(Parser, Debug)]
#[command(
    author = "Antmicro",
    version = "0.1.0",
    about = "rrgraph - routing resource graph builder",
    long_about = None
)]
struct Args {
    #[arg(long, default_value = "4", help = "Number of logic tiles in a row")]
    width: i16,
    #[arg(long, default_value = "4", help = "Number of logic tiles in a column")]
    height: i16,
    #[arg(long, default_value = "4", help = "Number of tracks per channel")]
    channel_width: i16,
    #[arg(long, help = "Do not tie horizontal wires with shorts")]
    no_shorts: bool,
    #[arg(long, help = "YAML file with graph finalization options")]
    options: Option<PathBuf>,
    #[command(subcommand)]
    command: SubCommands,
}

#[derive(Parser, Debug)]
struct StatsCmd {
    #[arg(
        long,
        default_value = "1",
        help = "Number of threads reading the finalized graph"
    )]
    threads: usize,
    #[arg(long, help = "Print statistics as JSON")]
    json: bool,
}

#[derive(Parser, Debug)]
struct DumpCmd {
    #[arg(help = "Output file, stdout if not given")]
    output: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum SubCommands {
    /// Print node and edge statistics of the generated graph
    Stats(StatsCmd),
    /// Write the generated graph as JSON
    Dump(DumpCmd),
}

fn build_graph(args: &Args) -> Result<RrGraphBuilder<Partitioned>, RrGraphError> {
    let options = match &args.options {
        Some(path) => RrGraphOptions::from_yaml_file(path)?,
        None => RrGraphOptions::default(),
    }.with_env_overrides()?;

    let params = FabricParams {
        width: args.width,
        height: args.height,
        channel_width: args.channel_width,
        shorts: !args.no_shorts,
    };

    synth::island_fabric(&params)?.finalize(&synth::arch_switches(), &options)
}

fn stats(args: StatsCmd, graph: &RrGraphBuilder<Partitioned>) -> Result<(), String> {
    let stats = GraphStats::collect(graph.view(), args.threads);
    if args.json {
        let json = serde_json::to_string_pretty(&stats).map_err(|e| e.to_string())?;
        println!("{}", json);
    } else {
        println!("{}", stats);
    }
    Ok(())
}

fn dump(args: DumpCmd, graph: &RrGraphBuilder<Partitioned>) -> Result<(), String> {
    let json = GraphDump::new(graph.view()).to_json().map_err(|e| e.to_string())?;
    match args.output {
        Some(path) => {
            let mut file = File::create(&path)
                .map_err(|e| format!("{}: {}", path.display(), e))?;
            file.write_all(json.as_bytes())
                .map_err(|e| format!("{}: {}", path.display(), e))
        },
        None => {
            println!("{}", json);
            Ok(())
        },
    }
}

fn main() {
    let args = Args::parse();

    if let SubCommands::Stats(stats_cmd) = &args.command {
        if stats_cmd.threads == 0 {
            eprintln!("error: --threads must be at least 1");
            std::process::exit(2);
        }
    }

    let graph = match build_graph(&args) {
        Ok(graph) => graph,
        Err(e) => {
            eprintln!("error: failed to build the routing resource graph: {}", e);
            std::process::exit(1);
        }
    };

    let result = match args.command {
        SubCommands::Stats(cmd) => stats(cmd, &graph),
        SubCommands::Dump(cmd) => dump(cmd, &graph),
    };
    if let Err(e) = result {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
