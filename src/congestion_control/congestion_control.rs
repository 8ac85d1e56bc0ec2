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

#![allow(unused_variables)]

use core::str::FromStr;
use std::fmt;

use serde::Serialize;

use crate::connection::TransportState;
use crate::Config;
use crate::Error;
use crate::Result;
pub use aggregator::ConnectionAggregates;
pub use aggregator::ConnectionView;
pub use aggregator::SubflowView;
pub use estimator::Estimate;
pub use mveno::LossClass;
pub use mveno::Mveno;
pub use mveno::MvenoConfig;
pub use mveno::RoundOutcome;
pub use reno::Reno;
pub use reno::MIN_CWND;
pub use sampler::SubflowState;
pub use sampler::RTT_INFINITE;

/// Available congestion control algorithm
#[repr(C)]
#[derive(Eq, PartialEq, Debug, Clone, Copy, Default)]
pub enum CongestionControlAlgorithm {
    /// Reno is the standard additive-increase/multiplicative-decrease
    /// algorithm. Each subflow behaves as an independent single-path flow.
    Reno,

    /// Mveno couples the subflows of a multipath connection. It classifies
    /// each loss as random or congestive from the queueing delay observed in
    /// the last round, and scales the growth rate of each subflow so that the
    /// connection as a whole stays fair to competing single-path flows.
    #[default]
    Mveno,
}

impl FromStr for CongestionControlAlgorithm {
    type Err = Error;

    fn from_str(algor: &str) -> Result<CongestionControlAlgorithm> {
        if algor.eq_ignore_ascii_case("reno") {
            Ok(CongestionControlAlgorithm::Reno)
        } else if algor.eq_ignore_ascii_case("mveno") {
            Ok(CongestionControlAlgorithm::Mveno)
        } else {
            Err(Error::InvalidConfig("unknown".into()))
        }
    }
}

/// Congestion avoidance state of a subflow, maintained by the host.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Default, Serialize)]
pub enum CaState {
    /// Nothing bad has been observed.
    #[default]
    Open,

    /// Duplicate acknowledgments or selective acknowledgments were received.
    Disorder,

    /// The window was reduced due to a congestion notification.
    Cwr,

    /// Fast retransmission is in progress.
    Recovery,

    /// The retransmission timer fired.
    Loss,
}

/// Window related events raised by the host.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum CaEvent {
    /// First transmission when no packet is in flight.
    TxStart,

    /// The window is restarted after an idle period.
    CwndRestart,

    /// The window reduction completed.
    CompleteCwr,

    /// The retransmission timer fired.
    Loss,

    /// In-sequence acknowledgment.
    FastAck,

    /// Other acknowledgment.
    SlowAck,
}

/// Congestion control statistics.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct CongestionStats {
    /// Number of RTT samples accepted.
    pub rtt_samples: u64,

    /// Number of negative RTT samples discarded.
    pub rtt_samples_discarded: u64,

    /// Number of acknowledgments handled by the single-path algorithm.
    pub fallback_acks: u64,

    /// Number of rounds ended while the multipath algorithm was active.
    pub rounds_total: u64,

    /// Number of rounds with too few RTT samples to be evaluated.
    pub rounds_insufficient_samples: u64,

    /// Number of rounds classified as random loss regime.
    pub rounds_random: u64,

    /// Number of rounds classified as congestive regime.
    pub rounds_congestive: u64,

    /// Number of losses classified as random.
    pub random_losses: u64,

    /// Number of losses classified as congestive.
    pub congestive_losses: u64,
}

/// Congestion control interfaces shared by different algorithms.
///
/// All window quantities are in packets. The host owns the live window state
/// in `TransportState` and lends it to the algorithm for the duration of a
/// callback.
pub trait CongestionController {
    /// Name of congestion control algorithm.
    fn name(&self) -> &str;

    /// Set the trace id used as log prefix.
    fn set_trace_id(&mut self, trace_id: &str) {}

    /// Callback on connection or subflow setup.
    fn init(&mut self, tp: &TransportState) {}

    /// Return the reduced slow start threshold on a loss event.
    fn ssthresh(&mut self, tp: &TransportState) -> u32;

    /// Callback for each acknowledgment that advances the window.
    ///
    /// `view` holds the subflows of the connection that are eligible for
    /// aggregation.
    fn cong_avoid(
        &mut self,
        tp: &mut TransportState,
        ack: u32,
        in_flight: u32,
        view: &ConnectionView,
    );

    /// Callback for each acknowledgment carrying an RTT sample in
    /// microseconds. A negative sample means no valid estimate.
    fn pkts_acked(&mut self, tp: &TransportState, cnt: u32, rtt_us: i64) {}

    /// Callback on a congestion avoidance state change.
    fn set_state(&mut self, tp: &TransportState, ca_state: CaState) {}

    /// Callback on a window event.
    fn cwnd_event(&mut self, tp: &TransportState, event: CaEvent) {}

    /// Round statistics exposed for connection-wide aggregation. Algorithms
    /// without per-round statistics return `None`.
    fn subflow_state(&self) -> Option<&SubflowState> {
        None
    }

    /// Congestion stats.
    fn stats(&self) -> &CongestionStats;
}

impl fmt::Debug for dyn CongestionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "congestion controller {}.", self.name())
    }
}

/// Build a congestion controller.
pub fn build_congestion_controller(conf: &Config) -> Box<dyn CongestionController> {
    match conf.congestion_control_algorithm {
        CongestionControlAlgorithm::Reno => Box::new(Reno::new()),
        CongestionControlAlgorithm::Mveno => Box::new(Mveno::new(conf.mveno.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn congestion_control_name() {
        let cases = [
            ("reno", Ok(CongestionControlAlgorithm::Reno)),
            ("Reno", Ok(CongestionControlAlgorithm::Reno)),
            ("RENO", Ok(CongestionControlAlgorithm::Reno)),
            ("mveno", Ok(CongestionControlAlgorithm::Mveno)),
            ("Mveno", Ok(CongestionControlAlgorithm::Mveno)),
            ("MVENO", Ok(CongestionControlAlgorithm::Mveno)),
            ("veno", Err(Error::InvalidConfig("unknown".into()))),
        ];

        for (name, algor) in cases {
            assert_eq!(CongestionControlAlgorithm::from_str(name), algor);
        }
    }

    #[test]
    fn congestion_control_build() {
        let mut conf = Config::new();
        assert_eq!(build_congestion_controller(&conf).name(), "MVENO");

        conf.set_congestion_control_algorithm(CongestionControlAlgorithm::Reno);
        let cc = build_congestion_controller(&conf);
        assert_eq!(cc.name(), "RENO");
        assert_eq!(format!("{:?}", cc), "congestion controller RENO.");
        assert_eq!(cc.stats(), &CongestionStats::default());
    }
}

mod aggregator;
mod estimator;
mod mveno;
mod reno;
mod sampler;
