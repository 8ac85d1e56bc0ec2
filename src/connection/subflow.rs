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

use std::time::Duration;

use serde::Serialize;

use super::rtt::RttEstimator;
use crate::congestion_control::CaState;
use crate::congestion_control::CongestionController;
use crate::congestion_control::CongestionStats;
use crate::congestion_control::SubflowState;
use crate::congestion_control::MIN_CWND;

/// Slow start threshold of a subflow that has not experienced any loss.
pub const INFINITE_SSTHRESH: u32 = 0x7fff_ffff;

/// Default initial congestion window in packets.
pub const INITIAL_CWND: u32 = 10;

/// Room in packets under which the window is still considered fully used.
const CWND_LIMITED_SLACK: u32 = 3;

/// Live window state of a subflow.
///
/// The host owns it and lends it to the congestion controller for the
/// duration of a callback. All window quantities are in packets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransportState {
    /// Congestion window.
    pub snd_cwnd: u32,

    /// Slow start threshold.
    pub snd_ssthresh: u32,

    /// Upper bound of the congestion window.
    pub snd_cwnd_clamp: u32,

    /// Round-trip cycle counter used for additive increase.
    pub snd_cwnd_cnt: u32,

    /// Next send sequence number.
    pub snd_nxt: u32,

    /// Whether the subflow belongs to a multipath capable connection.
    pub mp_capable: bool,

    /// Congestion avoidance state.
    pub ca_state: CaState,
}

impl TransportState {
    /// Return whether the window, and not the application, limits sending.
    pub fn is_cwnd_limited(&self, in_flight: u32) -> bool {
        in_flight >= self.snd_cwnd || self.snd_cwnd - in_flight <= CWND_LIMITED_SLACK
    }

    pub fn in_slow_start(&self) -> bool {
        self.snd_cwnd <= self.snd_ssthresh
    }

    /// Bring the window back to `[MIN_CWND, snd_cwnd_clamp]`.
    pub fn clamp_cwnd(&mut self) {
        self.snd_cwnd = self
            .snd_cwnd
            .clamp(MIN_CWND, self.snd_cwnd_clamp.max(MIN_CWND));
    }
}

impl Default for TransportState {
    fn default() -> Self {
        Self {
            snd_cwnd: INITIAL_CWND,
            snd_ssthresh: INFINITE_SSTHRESH,
            snd_cwnd_clamp: u32::MAX,
            snd_cwnd_cnt: 0,
            snd_nxt: 0,
            mp_capable: false,
            ca_state: CaState::Open,
        }
    }
}

/// Statistics about a subflow.
#[derive(Debug, Default, Clone, Serialize)]
pub struct SubflowStats {
    /// The number of packets sent.
    pub sent_count: u64,

    /// The number of acknowledgments received.
    pub ack_count: u64,

    /// The number of loss events.
    pub loss_count: u64,

    /// The number of retransmission timeouts.
    pub timeout_count: u64,

    /// Current congestion window in packets.
    pub cwnd: u32,

    /// Current slow start threshold in packets.
    pub ssthresh: u32,

    /// Smoothed RTT in microseconds.
    pub srtt: u64,
}

/// A subflow of a multipath connection.
pub struct Subflow {
    /// Live window state.
    pub(super) tp: TransportState,

    /// RTT estimator.
    pub(super) rtt: RttEstimator,

    /// Congestion controller.
    pub(super) cc: Box<dyn CongestionController>,

    /// Whether the subflow is established.
    pub(super) established: bool,

    /// Statistics.
    pub(super) stats: SubflowStats,

    /// Trace id.
    trace_id: String,
}

impl Subflow {
    pub fn new(
        tp: TransportState,
        initial_rtt: Duration,
        cc: Box<dyn CongestionController>,
        trace_id: &str,
    ) -> Self {
        Self {
            tp,
            rtt: RttEstimator::new(initial_rtt),
            cc,
            established: false,
            stats: SubflowStats::default(),
            trace_id: trace_id.to_string(),
        }
    }

    /// Append the subflow id to the trace id.
    pub fn update_trace_id(&mut self, subflow_id: usize) {
        self.trace_id.push_str(&(format!("-{}", subflow_id)));
        self.cc.set_trace_id(&self.trace_id);
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    /// Live window state.
    pub fn transport_state(&self) -> &TransportState {
        &self.tp
    }

    pub fn cwnd(&self) -> u32 {
        self.tp.snd_cwnd
    }

    pub fn ssthresh(&self) -> u32 {
        self.tp.snd_ssthresh
    }

    pub fn rtt(&self) -> &RttEstimator {
        &self.rtt
    }

    pub fn is_established(&self) -> bool {
        self.established
    }

    /// Name of the congestion control algorithm.
    pub fn congestion_control_name(&self) -> &str {
        self.cc.name()
    }

    /// Congestion control statistics.
    pub fn congestion_stats(&self) -> &CongestionStats {
        self.cc.stats()
    }

    /// Round statistics, if the algorithm keeps any.
    pub fn subflow_state(&self) -> Option<&SubflowState> {
        self.cc.subflow_state()
    }

    /// Whether the subflow may take part in connection-wide aggregation.
    pub fn is_eligible(&self) -> bool {
        self.tp.mp_capable
            && self.established
            && self.rtt.has_sample()
            && self.subflow_state().map_or(false, |s| s.is_active())
    }

    /// Subflow statistics.
    pub fn stats(&mut self) -> &SubflowStats {
        self.stats.cwnd = self.tp.snd_cwnd;
        self.stats.ssthresh = self.tp.snd_ssthresh;
        self.stats.srtt = self.rtt.smoothed_rtt().as_micros() as u64;
        &self.stats
    }
}

impl std::fmt::Debug for Subflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "cwnd={} ", self.tp.snd_cwnd)?;
        write!(f, "ssthresh={} ", self.tp.snd_ssthresh)?;
        write!(f, "srtt={:?} ", self.rtt.smoothed_rtt())?;
        write!(f, "cc={:?}", self.cc)
    }
}
