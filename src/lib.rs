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

//! Mveno is a multipath variant of the Veno congestion control algorithm.
//!
//! ## Features
//!
//! * **Loss differentiation**: Once per round trip every subflow estimates the
//!   number of its packets queued in the network. Losses seen with a small
//!   backlog are treated as random (e.g. wireless) losses and only cut the
//!   slow start threshold by one fifth.
//! * **Coupled growth**: The growth rate of each subflow is derived from
//!   connection-wide RTT and throughput statistics, so that a multipath
//!   connection stays fair to single-path flows sharing a bottleneck.
//! * **Graceful degradation**: Subflows of a connection that is not multipath
//!   capable, or rounds with too few RTT samples, fall back to Reno.
//!
//! ## Get started
//!
//! ```
//! use mveno::Config;
//! use mveno::Connection;
//!
//! let mut conf = Config::new();
//! conf.enable_multipath(true);
//!
//! let mut conn = Connection::new(&conf, "conn");
//! let id = conn.add_subflow(true)?;
//! conn.set_established(id, true)?;
//!
//! conn.on_sent(id, 10, 0)?;
//! conn.on_rtt_sample(id, 20_000)?;
//! conn.on_ack(id, 1, 10)?;
//! # Ok::<(), mveno::error::Error>(())
//! ```
//!
//! The `tools` directory contains a simulator driving a connection over
//! synthetic paths.

use std::cmp;
use std::time::Duration;

use crate::congestion_control::MvenoConfig;
use crate::congestion_control::MIN_CWND;
use crate::connection::INFINITE_SSTHRESH;
use crate::connection::INITIAL_CWND;

/// Default maximum number of subflows of a connection.
const DEFAULT_MAX_SUBFLOWS: usize = 8;

/// Default upper bound of the congestion window in packets.
const DEFAULT_CWND_CLAMP: u32 = 10_000;

/// The initial RTT, used before a real RTT is estimated.
const INITIAL_RTT: Duration = Duration::from_millis(333);

/// Result type for operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Configurations about a multipath connection and its congestion control.
#[derive(Debug, Clone)]
pub struct Config {
    /// The congestion control algorithm used for a subflow.
    pub(crate) congestion_control_algorithm: CongestionControlAlgorithm,

    /// Mveno parameters.
    pub(crate) mveno: MvenoConfig,

    /// Whether subflows may be multipath capable.
    pub(crate) multipath: bool,

    /// The initial congestion window in packets.
    pub(crate) initial_congestion_window: u32,

    /// The initial slow start threshold in packets.
    pub(crate) initial_ssthresh: u32,

    /// The upper bound of the congestion window in packets.
    pub(crate) cwnd_clamp: u32,

    /// The maximum number of subflows of a connection.
    pub(crate) max_subflows: usize,

    /// The initial rtt, used before real rtt is estimated.
    pub(crate) initial_rtt: Duration,
}

impl Config {
    /// Create default configuration.
    ///
    /// The configuration may be customized by calling related set methods.
    ///
    /// ## Examples:
    ///
    /// ```
    /// let mut conf = mveno::Config::new();
    /// conf.enable_multipath(true);
    /// conf.set_mveno_beta(4);
    /// ```
    pub fn new() -> Self {
        Self {
            congestion_control_algorithm: CongestionControlAlgorithm::Mveno,
            mveno: MvenoConfig::default(),
            multipath: false,
            initial_congestion_window: INITIAL_CWND,
            initial_ssthresh: INFINITE_SSTHRESH,
            cwnd_clamp: DEFAULT_CWND_CLAMP,
            max_subflows: DEFAULT_MAX_SUBFLOWS,
            initial_rtt: INITIAL_RTT,
        }
    }

    /// Set congestion control algorithm that the subflows would use.
    /// The default value is Mveno.
    pub fn set_congestion_control_algorithm(&mut self, cca: CongestionControlAlgorithm) {
        self.congestion_control_algorithm = cca;
    }

    /// Enable multipath. Subflows of a connection without multipath behave as
    /// independent single-path flows.
    /// The default value is false.
    pub fn enable_multipath(&mut self, v: bool) {
        self.multipath = v;
    }

    /// Set the initial congestion window in packets.
    /// The default value is 10. Values below 2 are raised to 2.
    pub fn set_initial_congestion_window(&mut self, packets: u32) {
        self.initial_congestion_window = cmp::max(packets, MIN_CWND);
    }

    /// Set the initial slow start threshold in packets.
    /// The default value is `0x7fffffff`.
    pub fn set_initial_ssthresh(&mut self, packets: u32) {
        self.initial_ssthresh = cmp::max(packets, MIN_CWND);
    }

    /// Set the upper bound of the congestion window in packets.
    /// The default value is 10000. Values below 2 are raised to 2.
    pub fn set_congestion_window_clamp(&mut self, packets: u32) {
        self.cwnd_clamp = cmp::max(packets, MIN_CWND);
    }

    /// Set the maximum number of subflows of a connection.
    /// The default value is 8. Zero is raised to 1.
    pub fn set_max_subflows(&mut self, v: usize) {
        self.max_subflows = cmp::max(v, 1);
    }

    /// Set the initial RTT in milliseconds, used before a real RTT sample.
    /// The default value is 333ms.
    pub fn set_initial_rtt(&mut self, millis: u64) {
        self.initial_rtt = cmp::max(Duration::from_millis(millis), Duration::from_millis(1));
    }

    /// Set the Mveno loss sensitivity weight. A round whose estimated backlog
    /// is below `beta` packets is considered to see random losses only.
    /// The default value is 3.
    pub fn set_mveno_beta(&mut self, v: u32) {
        self.mveno.set_beta(v);
    }

    /// Set the Mveno minimum share denominator `n`. Responsiveness shares
    /// never drop below `1/n`.
    /// The default value is 5. Zero is raised to 1.
    pub fn set_mveno_min_share_denominator(&mut self, v: u32) {
        self.mveno.set_n(v);
    }

    /// Set the Mveno relaxed rate factor `m` used on congested paths.
    /// The default value is 2.
    pub fn set_mveno_relaxed_factor(&mut self, v: u32) {
        self.mveno.set_m(v);
    }

    /// Set the minimum number of RTT samples in a round for it to be
    /// evaluated. Rounds with fewer samples use Reno.
    /// The default value is 3.
    pub fn set_mveno_min_round_samples(&mut self, v: u32) {
        self.mveno.set_min_round_samples(v);
    }

    /// Mveno parameters.
    pub fn mveno(&self) -> &MvenoConfig {
        &self.mveno
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}


pub use crate::congestion_control::CongestionControlAlgorithm;
pub use crate::connection::Connection;
pub use crate::error::Error;

#[path = "connection/connection.rs"]
pub mod connection;

#[path = "congestion_control/congestion_control.rs"]
pub mod congestion_control;

pub mod error;
