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

//! Simulation of a multipath connection over synthetic paths.
//!
//! Time advances in rounds. In every round each subflow sends a full window
//! over its path. A path has a base RTT, a bottleneck capacity per base RTT
//! and a bottleneck buffer: packets beyond the capacity queue up and see a
//! longer RTT, packets beyond the buffer are dropped. Every packet is also
//! dropped at random with the configured probability.

use std::fs::File;
use std::str::FromStr;

use log::debug;
use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use serde::Serialize;

use mveno::congestion_control::CaState;
use mveno::congestion_control::CongestionStats;
use mveno::connection::SubflowStats;
use mveno::Config;
use mveno::Connection;

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Return the target of logs. Logs are written to `stderr` without a file.
pub fn log_target(log_file: &Option<String>) -> Result<env_logger::Target> {
    match log_file {
        Some(path) => Ok(env_logger::Target::Pipe(Box::new(File::create(path)?))),
        None => Ok(env_logger::Target::Stderr),
    }
}

/// A synthetic network path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PathProfile {
    /// Propagation RTT in microseconds.
    pub base_rtt_us: u32,

    /// Bottleneck capacity in packets per base RTT.
    pub capacity: u32,

    /// Bottleneck buffer in packets.
    pub buffer: u32,

    /// Probability of a random loss of each packet.
    pub random_loss: f64,
}

impl FromStr for PathProfile {
    type Err = String;

    /// Parse `RTT_MS:CAPACITY:BUFFER:LOSS`, e.g. `40:50:20:0.01`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split(':').collect();
        if fields.len() != 4 {
            return Err(format!("invalid path {}, expect RTT_MS:CAPACITY:BUFFER:LOSS", s));
        }

        let rtt_ms: u32 = fields[0]
            .parse()
            .map_err(|e| format!("invalid rtt {}: {}", fields[0], e))?;
        let capacity: u32 = fields[1]
            .parse()
            .map_err(|e| format!("invalid capacity {}: {}", fields[1], e))?;
        let buffer: u32 = fields[2]
            .parse()
            .map_err(|e| format!("invalid buffer {}: {}", fields[2], e))?;
        let random_loss: f64 = fields[3]
            .parse()
            .map_err(|e| format!("invalid loss {}: {}", fields[3], e))?;

        if rtt_ms == 0 || capacity == 0 {
            return Err(format!("invalid path {}, zero rtt or capacity", s));
        }
        if !(0.0..=1.0).contains(&random_loss) {
            return Err(format!("invalid path {}, loss out of [0, 1]", s));
        }

        Ok(Self {
            base_rtt_us: rtt_ms.saturating_mul(1000),
            capacity,
            buffer,
            random_loss,
        })
    }
}

impl PathProfile {
    /// RTT in microseconds seen by the `i`-th packet of a window.
    pub fn rtt_of(&self, i: u32) -> u32 {
        let queued = i.saturating_sub(self.capacity) as u64;
        let delay = self.base_rtt_us as u64 * queued / self.capacity as u64;
        (self.base_rtt_us as u64 + delay).min(u32::MAX as u64) as u32
    }

    /// Whether the `i`-th packet of a window overflows the bottleneck buffer.
    pub fn overflows(&self, i: u32) -> bool {
        i >= self.capacity.saturating_add(self.buffer)
    }
}

/// The state of a subflow at the end of a round.
#[derive(Debug, Clone, Serialize)]
pub struct RoundRecord {
    pub round: u64,
    pub subflow_id: usize,
    pub cwnd: u32,
    pub ssthresh: u32,
    pub srtt_us: u64,
    pub delivered: u32,
    pub random_losses: u32,
    pub overflow_losses: u32,
}

/// Summary of a subflow after the simulation.
#[derive(Debug, Clone, Serialize)]
pub struct SubflowSummary {
    pub subflow_id: usize,
    pub path: PathProfile,
    pub delivered: u64,
    pub stats: SubflowStats,
    pub congestion: CongestionStats,
}

/// A multipath connection driven over synthetic paths.
pub struct Simulator {
    conn: Connection,

    /// Subflow id and path of each subflow.
    subflows: Vec<(usize, PathProfile)>,

    /// Packets delivered per subflow.
    delivered: Vec<u64>,

    /// Packets outstanding per subflow at the start of a round.
    in_flight: Vec<u32>,

    rng: StdRng,

    round: u64,
}

impl Simulator {
    /// Create a connection with one multipath capable subflow per path.
    pub fn new(conf: &Config, paths: &[PathProfile], seed: u64) -> Result<Self> {
        let mut conn = Connection::new(conf, "sim");
        let mut subflows = Vec::with_capacity(paths.len());
        for path in paths {
            let id = conn.add_subflow(true)?;
            conn.set_established(id, true)?;
            subflows.push((id, *path));
        }

        Ok(Self {
            conn,
            delivered: vec![0; subflows.len()],
            in_flight: vec![0; subflows.len()],
            subflows,
            rng: StdRng::seed_from_u64(seed),
            round: 0,
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Run one round on every subflow.
    pub fn step(&mut self) -> Result<Vec<RoundRecord>> {
        let mut records = Vec::with_capacity(self.subflows.len());
        for i in 0..self.subflows.len() {
            records.push(self.step_subflow(i)?);
        }
        self.round += 1;
        Ok(records)
    }

    fn step_subflow(&mut self, i: usize) -> Result<RoundRecord> {
        let (id, path) = self.subflows[i];

        let cwnd = self.conn.subflow(id)?.cwnd();
        let first_seq = self.conn.subflow(id)?.transport_state().snd_nxt;
        self.conn.on_sent(id, cwnd, self.in_flight[i])?;

        let mut delivered = 0;
        let mut random_losses = 0;
        let mut overflow_losses = 0;
        for pkt in 0..cwnd {
            if path.overflows(pkt) {
                overflow_losses += 1;
                continue;
            }
            if path.random_loss > 0.0 && self.rng.gen_bool(path.random_loss) {
                random_losses += 1;
                continue;
            }

            delivered += 1;
            self.conn.on_rtt_sample(id, path.rtt_of(pkt) as i64)?;
            self.conn.on_ack(id, first_seq.wrapping_add(pkt + 1), cwnd)?;
        }

        if random_losses + overflow_losses > 0 {
            self.conn.on_loss(id, delivered == 0)?;
            debug!(
                "round {} subflow {} lost {} random and {} overflow packets",
                self.round, id, random_losses, overflow_losses
            );
            // Recovery completes within the round.
            self.conn.on_state_change(id, CaState::Open)?;
        }

        self.delivered[i] += delivered as u64;
        self.in_flight[i] = self.conn.subflow(id)?.cwnd();

        let subflow = self.conn.subflow(id)?;
        Ok(RoundRecord {
            round: self.round,
            subflow_id: id,
            cwnd: subflow.cwnd(),
            ssthresh: subflow.ssthresh(),
            srtt_us: subflow.rtt().smoothed_rtt().as_micros() as u64,
            delivered,
            random_losses,
            overflow_losses,
        })
    }

    /// Summaries of all subflows.
    pub fn summary(&mut self) -> Result<Vec<SubflowSummary>> {
        let mut summaries = Vec::with_capacity(self.subflows.len());
        for (i, (id, path)) in self.subflows.iter().enumerate() {
            let subflow = self.conn.subflow_mut(*id)?;
            let congestion = subflow.congestion_stats().clone();
            summaries.push(SubflowSummary {
                subflow_id: *id,
                path: *path,
                delivered: self.delivered[i],
                stats: subflow.stats().clone(),
                congestion,
            });
        }
        Ok(summaries)
    }
}
