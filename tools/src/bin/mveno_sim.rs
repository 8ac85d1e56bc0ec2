// Copyright (c) 2023 The TQUIC Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::fs::File;
use std::io::BufWriter;
use std::io::Write;

use clap::error::ErrorKind;
use clap::CommandFactory;
use clap::Parser;
use log::info;

use mveno::Config;
use mveno::CongestionControlAlgorithm;
use mveno_tools::PathProfile;
use mveno_tools::Result;
use mveno_tools::Simulator;

#[derive(Parser, Debug, Clone)]
#[clap(name = "mveno_sim")]
pub struct SimOpt {
    /// Synthetic paths, one subflow per path, separated by ",".
    /// Each path is RTT_MS:CAPACITY:BUFFER:LOSS, e.g. 40:50:20:0.01
    #[clap(
        short,
        long,
        value_delimiter = ',',
        default_value = "40:50:20:0.01,80:30:20:0",
        value_name = "PATH"
    )]
    pub paths: Vec<PathProfile>,

    /// Number of rounds to simulate.
    #[clap(short, long, default_value = "1000", value_name = "NUM")]
    pub rounds: u64,

    /// Seed of the random loss generator.
    #[clap(long, default_value = "0", value_name = "NUM")]
    pub seed: u64,

    /// Congestion control algorithm.
    #[clap(long, default_value = "MVENO")]
    pub congestion_control_algor: CongestionControlAlgorithm,

    /// Disable multipath, every subflow behaves as a single-path flow.
    #[clap(long)]
    pub disable_multipath: bool,

    /// Initial congestion window in packets.
    #[clap(long, default_value = "10", value_name = "NUM")]
    pub initial_congestion_window: u32,

    /// Upper bound of the congestion window in packets.
    #[clap(long, default_value = "10000", value_name = "NUM")]
    pub congestion_window_clamp: u32,

    /// Mveno loss sensitivity weight.
    #[clap(long, default_value = "3", value_name = "NUM")]
    pub mveno_beta: u32,

    /// Mveno minimum share denominator.
    #[clap(long, default_value = "5", value_name = "NUM")]
    pub mveno_min_share_denominator: u32,

    /// Mveno relaxed rate factor.
    #[clap(long, default_value = "2", value_name = "NUM")]
    pub mveno_relaxed_factor: u32,

    /// Print the state of every subflow after each round as JSON lines.
    #[clap(long)]
    pub print_rounds: bool,

    /// Dump the final summary into the given file instead of `stdout`.
    #[clap(long, value_name = "FILE")]
    pub summary_file: Option<String>,

    /// Log level, support OFF/ERROR/WARN/INFO/DEBUG/TRACE.
    #[clap(long, default_value = "INFO", value_name = "STR")]
    pub log_level: log::LevelFilter,

    /// Log file path. If no file is specified, logs will be written to `stderr`.
    #[clap(long, value_name = "FILE")]
    pub log_file: Option<String>,
}

fn parse_option() -> std::result::Result<SimOpt, clap::error::Error> {
    let option = SimOpt::parse();

    if option.paths.is_empty() {
        return Err(SimOpt::command().error(
            ErrorKind::MissingRequiredArgument,
            "Specify at least one path",
        ));
    }

    Ok(option)
}

fn process_option(option: &SimOpt) -> Result<Config> {
    env_logger::builder()
        .target(mveno_tools::log_target(&option.log_file)?)
        .filter_level(option.log_level)
        .format_timestamp_millis()
        .init();

    let mut conf = Config::new();
    conf.set_congestion_control_algorithm(option.congestion_control_algor);
    conf.enable_multipath(!option.disable_multipath);
    conf.set_max_subflows(option.paths.len());
    conf.set_initial_congestion_window(option.initial_congestion_window);
    conf.set_congestion_window_clamp(option.congestion_window_clamp);
    conf.set_mveno_beta(option.mveno_beta);
    conf.set_mveno_min_share_denominator(option.mveno_min_share_denominator);
    conf.set_mveno_relaxed_factor(option.mveno_relaxed_factor);
    Ok(conf)
}

fn main() -> Result<()> {
    // Parse simulator option.
    let option = match parse_option() {
        Ok(option) => option,
        Err(e) => e.exit(),
    };

    // Process simulator option.
    let conf = process_option(&option)?;

    let mut sim = Simulator::new(&conf, &option.paths, option.seed)?;
    info!(
        "simulate {} rounds over {} paths with {:?}",
        option.rounds,
        option.paths.len(),
        option.congestion_control_algor
    );

    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for _ in 0..option.rounds {
        let records = sim.step()?;
        if option.print_rounds {
            for record in records {
                writeln!(out, "{}", serde_json::to_string(&record)?)?;
            }
        }
    }

    let summary = serde_json::to_string_pretty(&sim.summary()?)?;
    match &option.summary_file {
        Some(path) => {
            let mut file = File::create(path)?;
            writeln!(file, "{}", summary)?;
        }
        None => writeln!(out, "{}", summary)?,
    }
    out.flush()?;

    Ok(())
}
