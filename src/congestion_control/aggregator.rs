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

//! Connection-wide aggregation of per-subflow round statistics.
//!
//! The aggregates are pure functions of the subflows that are eligible at the
//! end of a round. They are recomputed every round and never cached.

use serde::Serialize;
use smallvec::SmallVec;

use super::sampler::SubflowState;
use super::sampler::RTT_INFINITE;

/// Read-only snapshot of one subflow taken by the host.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SubflowView {
    /// Subflow identifier within the connection.
    pub subflow_id: usize,

    /// Live congestion window in packets.
    pub cwnd: u32,

    /// Round statistics of the subflow.
    pub state: SubflowState,
}

/// Snapshot of the subflows of a connection that are eligible for
/// aggregation, as enumerated by the host.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConnectionView {
    subflows: SmallVec<[SubflowView; 8]>,
}

impl ConnectionView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subflow to the view.
    pub fn push(&mut self, view: SubflowView) {
        self.subflows.push(view);
    }

    /// Iterate over the subflows that participate in the algorithm.
    pub fn active(&self) -> impl Iterator<Item = &SubflowView> {
        self.subflows.iter().filter(|v| v.state.is_active())
    }

    /// Number of subflows that participate in the algorithm.
    pub fn active_count(&self) -> usize {
        self.active().count()
    }

    /// Number of subflows in the view.
    pub fn len(&self) -> usize {
        self.subflows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subflows.is_empty()
    }
}

impl FromIterator<SubflowView> for ConnectionView {
    fn from_iter<I: IntoIterator<Item = SubflowView>>(iter: I) -> Self {
        Self {
            subflows: iter.into_iter().collect(),
        }
    }
}

/// Throughput proxy of one subflow, `(cwnd / samples)^2`.
pub fn subflow_throughput(cwnd: u32, sample_count: u32) -> f64 {
    let x = cwnd as f64 / sample_count.max(1) as f64;
    x * x
}

/// Minimum of the round minimum RTTs. `RTT_INFINITE` if no subflow is active.
pub fn base_rtt(view: &ConnectionView) -> u32 {
    view.active()
        .map(|v| v.state.min_rtt())
        .min()
        .unwrap_or(RTT_INFINITE)
}

/// Ratio of the summed RTT sums to the summed sample counts. Zero when no
/// sample was taken.
pub fn average_rtt(view: &ConnectionView) -> u32 {
    let (sum, cnt) = view.active().fold((0_u64, 0_u64), |(sum, cnt), v| {
        (
            sum.saturating_add(v.state.sum_rtt()),
            cnt + v.state.sample_count() as u64,
        )
    });

    if cnt == 0 {
        return 0;
    }
    (sum / cnt) as u32
}

/// Throughput proxy of the whole connection, `(sum cwnd)^2 / (sum rtt)^2`.
pub fn aggregate_throughput(view: &ConnectionView) -> f64 {
    let (cwnd, rtt) = view.active().fold((0_u64, 0_u64), |(cwnd, rtt), v| {
        (cwnd + v.cwnd as u64, rtt.saturating_add(v.state.sum_rtt()))
    });

    let y = cwnd as f64 / rtt.max(1) as f64;
    y * y
}

/// The largest subflow throughput proxy.
pub fn max_subflow_throughput(view: &ConnectionView) -> f64 {
    view.active()
        .map(|v| subflow_throughput(v.cwnd, v.state.sample_count()))
        .fold(0.0, f64::max)
}

/// The largest live congestion window.
pub fn max_cwnd(view: &ConnectionView) -> u32 {
    view.active().map(|v| v.cwnd).max().unwrap_or(0)
}

/// Connection level statistics derived at the end of a round.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConnectionAggregates {
    /// Minimum RTT over all active subflows, in microseconds.
    pub base_rtt: u32,

    /// Average RTT over all samples of active subflows, in microseconds.
    pub average_rtt: u32,

    /// Throughput proxy of the whole connection.
    pub aggregate_throughput: f64,

    /// Largest throughput proxy of a single subflow.
    pub max_subflow_throughput: f64,

    /// Largest live congestion window, in packets.
    pub max_cwnd: u32,

    /// Number of active subflows.
    pub subflow_count: usize,
}

impl ConnectionAggregates {
    /// Aggregate the view. Returns `None` if no subflow is active.
    pub fn from_view(view: &ConnectionView) -> Option<Self> {
        let subflow_count = view.active_count();
        if subflow_count == 0 {
            return None;
        }

        Some(Self {
            base_rtt: base_rtt(view),
            average_rtt: average_rtt(view),
            aggregate_throughput: aggregate_throughput(view),
            max_subflow_throughput: max_subflow_throughput(view),
            max_cwnd: max_cwnd(view),
            subflow_count,
        })
    }
}
