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

//! Fairness and responsiveness estimation.
//!
//! The estimator derives, from the connection aggregates and the statistics
//! of a single subflow, the bandwidth share `gamma` the subflow may claim and
//! the responsiveness-corrected share `theta`. The larger of both sets the
//! growth rate of the subflow during congestion avoidance.
//!
//! Shares are computed in floating point so that the constants `1/2` and
//! `1/n` keep their rational values.

use super::aggregator::subflow_throughput;
use super::aggregator::ConnectionAggregates;
use super::sampler::SubflowState;

/// Floor applied to a responsiveness share that collapsed to exactly zero.
const RESPONSIVENESS_ZERO_FLOOR: f64 = 0.5;

/// Normalized load term `beta * avg / (cwnd * (avg - base))`, with the
/// denominator raised to one when it is not positive.
fn load(beta: u32, avg: u32, base: u32, cwnd: u32) -> f64 {
    let denom = cwnd as f64 * (avg as f64 - base as f64);
    beta as f64 * avg as f64 / denom.max(1.0)
}

/// Congestion-probability-like share `p`.
///
/// The share is zero when the RTT shows no queueing, and approaches one as
/// the queueing delay dominates.
pub fn congestion_share(beta: u32, avg: u32, base: u32, cwnd: u32) -> f64 {
    let raw = if avg == base {
        1.0
    } else {
        load(beta, avg, base, cwnd)
    };

    1.0 - raw.min(1.0)
}

/// Lower bound of a raw responsiveness share.
///
/// A share that is exactly zero is replaced by `0.5`, anything else not above
/// `1/n` is raised to `1/n`. This keeps the estimator from collapsing to
/// "never grow".
pub fn responsiveness_floor(raw: f64, n: u32) -> f64 {
    let min_share = 1.0 / n.max(1) as f64;
    if raw > min_share {
        raw
    } else if raw == 0.0 {
        RESPONSIVENESS_ZERO_FLOOR
    } else {
        min_share
    }
}

/// Responsiveness share `e`.
pub fn responsiveness_share(beta: u32, n: u32, avg: u32, base: u32, cwnd: u32) -> f64 {
    let min_share = 1.0 / n.max(1) as f64;
    let raw = if avg == base {
        min_share
    } else {
        0.5 - (0.5 - min_share) * load(beta, avg, base, cwnd)
    };

    responsiveness_floor(raw, n)
}

/// Bandwidth share target of the connection.
pub fn gamma(aggregate_throughput: f64, max_subflow_throughput: f64) -> f64 {
    if max_subflow_throughput == 0.0 {
        return aggregate_throughput;
    }
    aggregate_throughput / max_subflow_throughput
}

/// Responsiveness-corrected share of a subflow.
///
/// `subflow_rtt` is the subflow's own round average. Falls back to the
/// numerator when any denominator factor is zero.
pub fn theta(
    e_s: f64,
    e_sr: f64,
    average_rtt: u32,
    aggregate_throughput: f64,
    subflow_rtt: u32,
    sample_count: u32,
    subflow_throughput: f64,
) -> f64 {
    let numerator = e_s * average_rtt as f64 * aggregate_throughput;
    if e_sr == 0.0 || subflow_rtt == 0 || sample_count == 0 || subflow_throughput == 0.0 {
        return numerator;
    }

    let r = subflow_rtt as f64;
    numerator / (e_sr * r * r * subflow_throughput)
}

/// Estimator constants.
#[derive(Debug, Clone, Copy)]
pub struct EstimatorParams {
    /// Loss sensitivity weight.
    pub beta: u32,

    /// Minimum share denominator.
    pub n: u32,
}

/// Per-round estimates for one subflow.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimate {
    /// Connection congestion share.
    pub p_s: f64,

    /// Subflow congestion share.
    pub p_sr: f64,

    /// Connection responsiveness share.
    pub e_s: f64,

    /// Subflow responsiveness share.
    pub e_sr: f64,

    /// Subflow throughput proxy.
    pub x_sr: f64,

    /// Bandwidth share target.
    pub gamma: f64,

    /// Responsiveness-corrected share.
    pub theta: f64,
}

impl Estimate {
    /// Estimate for a connection with a single active subflow, which behaves
    /// as an ordinary single-path flow.
    pub fn single_path(cwnd: u32, sample_count: u32) -> Self {
        Self {
            p_s: 0.0,
            p_sr: 0.0,
            e_s: 1.0,
            e_sr: 1.0,
            x_sr: subflow_throughput(cwnd, sample_count),
            gamma: 1.0,
            theta: 1.0,
        }
    }

    /// Compute the estimate of a subflow whose round statistics are `state`
    /// and whose live window is `cwnd`.
    pub fn compute(
        params: EstimatorParams,
        agg: &ConnectionAggregates,
        state: &SubflowState,
        cwnd: u32,
    ) -> Self {
        let sample_count = state.sample_count();
        let x_sr = subflow_throughput(cwnd, sample_count);

        if agg.subflow_count <= 1 {
            return Self::single_path(cwnd, sample_count);
        }

        let rtt = state.round_average_rtt();
        let min_rtt = state.min_rtt();
        let high_water = state.cwnd_high_water();

        let p_s = congestion_share(params.beta, agg.average_rtt, agg.base_rtt, agg.max_cwnd);
        let p_sr = congestion_share(params.beta, rtt, min_rtt, high_water);
        let e_s = responsiveness_share(
            params.beta,
            params.n,
            agg.average_rtt,
            agg.base_rtt,
            agg.max_cwnd,
        );
        let e_sr = responsiveness_share(params.beta, params.n, rtt, min_rtt, high_water);

        let gamma = gamma(agg.aggregate_throughput, agg.max_subflow_throughput);
        let theta = theta(
            e_s,
            e_sr,
            agg.average_rtt,
            agg.aggregate_throughput,
            rtt,
            sample_count,
            x_sr,
        );

        Self {
            p_s,
            p_sr,
            e_s,
            e_sr,
            x_sr,
            gamma,
            theta,
        }
    }

    /// Rate used while the subflow sees random losses only.
    pub fn target_rate(&self) -> f64 {
        self.gamma.max(self.theta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::congestion_control::aggregator::tests::new_view;
    use crate::congestion_control::aggregator::ConnectionView;

    const PARAMS: EstimatorParams = EstimatorParams { beta: 3, n: 5 };

    #[test]
    fn congestion_share_no_queueing() {
        assert_eq!(congestion_share(3, 100, 100, 10), 0.0);
    }

    #[test]
    fn congestion_share_queueing() {
        // 3 * 200 / (10 * 100) = 0.6
        let p = congestion_share(3, 200, 100, 10);
        assert!((p - 0.4).abs() < 1e-9);

        // Heavily loaded path saturates the raw value at one.
        assert_eq!(congestion_share(3, 101, 100, 1), 0.0);

        // Zero window raises the denominator to one.
        assert_eq!(congestion_share(3, 200, 100, 0), 0.0);
    }

    #[test]
    fn responsiveness_floors() {
        assert_eq!(responsiveness_floor(0.0, 5), 0.5);
        assert_eq!(responsiveness_floor(0.1, 5), 0.2);
        assert_eq!(responsiveness_floor(-3.0, 5), 0.2);
        assert_eq!(responsiveness_floor(0.3, 5), 0.3);
        // A zero denominator behaves as one.
        assert_eq!(responsiveness_floor(0.5, 0), 1.0);
    }

    #[test]
    fn responsiveness_share_shape() {
        // No queueing: the lower bound 1/n.
        assert_eq!(responsiveness_share(3, 5, 100, 100, 10), 0.2);

        // Light load approaches 1/2.
        let e = responsiveness_share(3, 5, 1000, 100, 1000);
        assert!(e > 0.49 && e < 0.5);

        // Heavy load is bounded by 1/n.
        assert_eq!(responsiveness_share(3, 5, 200, 100, 1), 0.2);
    }

    #[test]
    fn gamma_guard() {
        assert_eq!(gamma(8.0, 4.0), 2.0);
        assert_eq!(gamma(8.0, 0.0), 8.0);
    }

    #[test]
    fn theta_fallback() {
        assert_eq!(theta(0.5, 0.0, 100, 2.0, 100, 3, 4.0), 100.0);
        assert_eq!(theta(0.5, 0.25, 100, 2.0, 0, 3, 4.0), 100.0);
        assert_eq!(theta(0.5, 0.25, 100, 2.0, 100, 0, 4.0), 100.0);
        assert_eq!(theta(0.5, 0.25, 100, 2.0, 100, 3, 0.0), 100.0);

        // 0.5 * 100 * 2 / (0.25 * 100^2 * 4)
        assert_eq!(theta(0.5, 0.25, 100, 2.0, 100, 3, 4.0), 0.01);
    }

    #[test]
    fn estimate_single_subflow() {
        for (cwnd, rtts) in [(10, vec![100, 100, 100]), (400, vec![10, 90_000, 50, 7])] {
            let view: ConnectionView = [new_view(0, cwnd, &rtts, true)].into_iter().collect();
            let agg = ConnectionAggregates::from_view(&view).unwrap();
            let state = view.active().next().unwrap().state;

            let est = Estimate::compute(PARAMS, &agg, &state, cwnd);
            assert_eq!(est.gamma, 1.0);
            assert_eq!(est.theta, 1.0);
            assert_eq!(est.target_rate(), 1.0);
        }
    }

    #[test]
    fn estimate_two_subflows() {
        let view: ConnectionView = [
            new_view(0, 10, &[100, 100, 100, 100], true),
            new_view(1, 20, &[200, 200, 300, 300], true),
        ]
        .into_iter()
        .collect();
        let agg = ConnectionAggregates::from_view(&view).unwrap();
        let state = view.active().next().unwrap().state;

        let est = Estimate::compute(PARAMS, &agg, &state, 10);

        // Subflow 0 sees no queueing.
        assert_eq!(est.p_sr, 0.0);
        assert_eq!(est.e_sr, 0.2);
        assert_eq!(est.x_sr, 6.25);
        // Connection: avg 175, base 100, max cwnd 20.
        assert!(est.p_s > 0.0 && est.p_s < 1.0);
        assert!(est.e_s >= 0.2 && est.e_s <= 0.5);
        assert_eq!(
            est.gamma,
            agg.aggregate_throughput / agg.max_subflow_throughput
        );
        assert!(est.theta > 0.0);
        assert_eq!(est.target_rate(), est.gamma.max(est.theta));
    }
}
