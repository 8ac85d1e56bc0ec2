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

//! Per-subflow RTT sampling within one measurement round.
//!
//! A round is the interval between two send sequence boundaries. Every
//! acknowledgment carries an RTT sample which is folded into the round's
//! minimum and sum. At the end of the round the controller reads the
//! statistics and resets them.

use serde::Serialize;

/// Placeholder for "no RTT observed in this round", in microseconds.
pub const RTT_INFINITE: u32 = 0x7fff_ffff;

/// Return whether sequence number `a` is after `b`, taking wrap-around into
/// account.
pub fn seq_after(a: u32, b: u32) -> bool {
    (b.wrapping_sub(a) as i32) < 0
}

/// RTT statistics of one subflow for the current measurement round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SubflowState {
    /// The send sequence marker delimiting the current round.
    round_boundary: u32,

    /// Whether the subflow currently participates in the multipath algorithm.
    active: bool,

    /// Number of RTT samples observed in the current round.
    sample_count: u32,

    /// Minimum RTT observed in the current round, in microseconds.
    min_rtt: u32,

    /// Sum of RTT samples observed in the current round, in microseconds.
    sum_rtt: u64,

    /// Largest congestion window observed, in packets. The window may
    /// fluctuate within a round.
    cwnd_high_water: u32,
}

impl SubflowState {
    pub fn new() -> Self {
        Self {
            round_boundary: 0,
            active: false,
            sample_count: 0,
            min_rtt: RTT_INFINITE,
            sum_rtt: 0,
            cwnd_high_water: 0,
        }
    }

    /// Restart sampling from a clean round.
    ///
    /// Prior RTT history is stale whenever this is called: on connection
    /// establishment, after a retransmission timeout, after fast recovery and
    /// when an idle connection resumes sending.
    pub fn enable(&mut self, snd_nxt: u32, cwnd: u32) {
        self.active = true;
        self.round_boundary = snd_nxt;
        self.min_rtt = RTT_INFINITE;
        self.sample_count = 0;
        self.sum_rtt = 0;
        self.cwnd_high_water = cwnd;
    }

    /// Stop participating in the multipath algorithm.
    pub fn disable(&mut self) {
        self.active = false;
    }

    /// Fold an RTT sample into the round.
    ///
    /// Negative samples are discarded and `false` is returned. Zero is
    /// raised to one microsecond so the base RTT never degenerates.
    pub fn on_sample(&mut self, rtt_us: i64, cwnd: u32) -> bool {
        if rtt_us < 0 {
            return false;
        }

        let rtt = rtt_us.clamp(1, RTT_INFINITE as i64) as u32;
        self.min_rtt = self.min_rtt.min(rtt);
        self.sum_rtt = self.sum_rtt.saturating_add(rtt as u64);
        self.sample_count = self.sample_count.saturating_add(1);
        self.cwnd_high_water = self.cwnd_high_water.max(cwnd);

        true
    }

    /// Wipe the round statistics for the next round.
    pub fn reset_round(&mut self) {
        self.sample_count = 0;
        self.sum_rtt = 0;
        self.min_rtt = RTT_INFINITE;
    }

    /// Move the round boundary to the given send sequence.
    pub fn set_round_boundary(&mut self, snd_nxt: u32) {
        self.round_boundary = snd_nxt;
    }

    /// Return whether `ack` closes the current round.
    pub fn round_ended(&self, ack: u32) -> bool {
        seq_after(ack, self.round_boundary)
    }

    /// Average RTT of the round in microseconds, zero without samples.
    pub fn round_average_rtt(&self) -> u32 {
        if self.sample_count == 0 {
            return 0;
        }
        (self.sum_rtt / self.sample_count as u64) as u32
    }

    /// Veno congestion signal: an estimate of the packets queued in the
    /// network, `cwnd * (avg - min) / avg`.
    pub fn diff(&self, cwnd: u32) -> u64 {
        let avg = self.round_average_rtt() as u64;
        if avg == 0 {
            return 0;
        }
        let queueing = avg.saturating_sub(self.min_rtt as u64);
        cwnd as u64 * queueing / avg
    }

    pub fn round_boundary(&self) -> u32 {
        self.round_boundary
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    pub fn min_rtt(&self) -> u32 {
        self.min_rtt
    }

    pub fn sum_rtt(&self) -> u64 {
        self.sum_rtt
    }

    pub fn cwnd_high_water(&self) -> u32 {
        self.cwnd_high_water
    }
}

impl Default for SubflowState {
    fn default() -> Self {
        Self::new()
    }
}
