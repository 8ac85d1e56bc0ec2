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

/// RTT estimation for a subflow.
/// See RFC 6298 Section 2
#[derive(Debug)]
pub struct RttEstimator {
    /// The most recent RTT sample, or the initial RTT before any sample.
    latest_rtt: Duration,

    /// The smoothed RTT of the subflow is an exponentially weighted moving
    /// average of the RTT samples. It is `None` until the first sample.
    smoothed_rtt: Option<Duration>,
}

impl RttEstimator {
    pub fn new(initial_rtt: Duration) -> Self {
        Self {
            latest_rtt: initial_rtt,
            smoothed_rtt: None,
        }
    }

    /// Return the current best RTT estimation.
    pub fn smoothed_rtt(&self) -> Duration {
        self.smoothed_rtt.unwrap_or(self.latest_rtt)
    }

    /// Return whether the smoothed RTT is derived from at least one sample.
    /// Subflows without a valid smoothed RTT are not aggregated.
    pub fn has_sample(&self) -> bool {
        self.smoothed_rtt.is_some()
    }

    /// Update estimator with the given RTT sample
    pub fn update(&mut self, rtt: Duration) {
        self.latest_rtt = rtt;
        self.smoothed_rtt = Some(match self.smoothed_rtt {
            Some(smoothed_rtt) => (7 * smoothed_rtt + rtt) / 8,
            None => rtt,
        });
    }
}
