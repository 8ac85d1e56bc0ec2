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

//! Mveno: multipath Veno.
//!
//! Mveno extends Veno to multipath transport. Once per round trip each
//! subflow estimates the number of its packets queued in the network
//! (`diff`). A small backlog means losses are most likely random (e.g. caused
//! by a wireless link) rather than a sign of congestion: the subflow keeps
//! growing at its full coupled rate and a loss only cuts the slow start
//! threshold by one fifth. A large backlog means the path is congested: the
//! subflow grows at a relaxed rate and a loss halves the threshold.
//!
//! The coupled rate is derived from connection-wide RTT and throughput
//! statistics so that all subflows together behave like a single fair flow.

use log::*;

use super::aggregator::ConnectionAggregates;
use super::aggregator::ConnectionView;
use super::estimator::Estimate;
use super::estimator::EstimatorParams;
use super::reno;
use super::reno::MIN_CWND;
use super::sampler::SubflowState;
use super::CaEvent;
use super::CaState;
use super::CongestionController;
use super::CongestionStats;
use crate::connection::TransportState;

/// Default loss sensitivity weight. A round whose backlog is below `beta`
/// packets is in the random loss regime.
const BETA: u32 = 3;

/// Default minimum share denominator. Responsiveness shares never drop below
/// `1/n`.
const N: u32 = 5;

/// Default relaxed rate factor used in the congestive regime.
const M: u32 = 2;

/// Minimum number of RTT samples in a round required to evaluate it.
const MIN_ROUND_SAMPLES: u32 = 3;

/// Mveno configurable parameters.
#[derive(Debug, Clone)]
pub struct MvenoConfig {
    /// Loss sensitivity weight.
    beta: u32,

    /// Minimum share denominator.
    n: u32,

    /// Relaxed rate factor.
    m: u32,

    /// Minimum number of RTT samples to evaluate a round.
    min_round_samples: u32,
}

impl MvenoConfig {
    pub fn new(beta: u32, n: u32, m: u32, min_round_samples: u32) -> Self {
        Self {
            beta,
            n: n.max(1),
            m,
            min_round_samples,
        }
    }

    /// Update beta.
    pub fn set_beta(&mut self, beta: u32) -> &mut Self {
        self.beta = beta;
        self
    }

    /// Update the minimum share denominator. Zero is raised to one.
    pub fn set_n(&mut self, n: u32) -> &mut Self {
        self.n = n.max(1);
        self
    }

    /// Update the relaxed rate factor.
    pub fn set_m(&mut self, m: u32) -> &mut Self {
        self.m = m;
        self
    }

    /// Update the minimum number of RTT samples per round.
    pub fn set_min_round_samples(&mut self, v: u32) -> &mut Self {
        self.min_round_samples = v;
        self
    }

    pub fn beta(&self) -> u32 {
        self.beta
    }

    pub fn n(&self) -> u32 {
        self.n
    }

    pub fn m(&self) -> u32 {
        self.m
    }

    pub fn min_round_samples(&self) -> u32 {
        self.min_round_samples
    }
}

impl Default for MvenoConfig {
    fn default() -> Self {
        Self::new(BETA, N, M, MIN_ROUND_SAMPLES)
    }
}

/// Loss classification of a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LossClass {
    /// The backlog is small, losses are most likely not caused by congestion.
    Random,

    /// The backlog is large, the path is congested.
    Congestive,
}

impl LossClass {
    /// Classify a Veno backlog estimate.
    pub fn classify(diff: u64, beta: u32) -> Self {
        if diff < beta as u64 {
            LossClass::Random
        } else {
            LossClass::Congestive
        }
    }

    /// Slow start threshold after a loss of this class.
    pub fn ssthresh(&self, cwnd: u32) -> u32 {
        match self {
            // Cut by one fifth.
            LossClass::Random => (cwnd as u64 * 4 / 5) as u32,

            // Cut by half.
            LossClass::Congestive => cwnd >> 1,
        }
        .max(MIN_CWND)
    }
}

/// Result of the evaluation of one round, consumed immediately.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundOutcome {
    /// Loss regime of the round.
    pub classification: LossClass,

    /// Number of round ends per one packet of window growth.
    pub growth_rate: f64,

    /// Slow start threshold that a loss would set now.
    pub ssthresh_cut: u32,

    /// Estimates the rate was derived from.
    pub estimate: Estimate,
}

/// Mveno congestion control algorithm.
#[derive(Debug)]
pub struct Mveno {
    /// Configuration.
    config: MvenoConfig,

    /// Round statistics of the subflow.
    state: SubflowState,

    /// Congestion statistics.
    stats: CongestionStats,

    /// Trace id.
    trace_id: String,
}

impl Mveno {
    pub fn new(config: MvenoConfig) -> Self {
        Self {
            config,
            state: SubflowState::new(),
            stats: Default::default(),
            trace_id: String::new(),
        }
    }

    fn enable(&mut self, tp: &TransportState) {
        self.state.enable(tp.snd_nxt, tp.snd_cwnd);
        debug!(
            "{} mveno enabled, round boundary {} cwnd {}",
            self.trace_id, tp.snd_nxt, tp.snd_cwnd
        );
    }

    fn disable(&mut self) {
        if self.state.is_active() {
            debug!("{} mveno disabled", self.trace_id);
        }
        self.state.disable();
    }

    /// Evaluate the round that just ended. Returns `None` if no subflow of
    /// the connection is active.
    fn evaluate_round(&self, tp: &TransportState, view: &ConnectionView) -> Option<RoundOutcome> {
        let agg = ConnectionAggregates::from_view(view)?;

        let params = EstimatorParams {
            beta: self.config.beta,
            n: self.config.n,
        };
        let estimate = Estimate::compute(params, &agg, &self.state, tp.snd_cwnd);

        let classification = LossClass::classify(self.state.diff(tp.snd_cwnd), self.config.beta);

        let growth_rate = if agg.subflow_count <= 1 {
            // Plain Reno pacing.
            tp.snd_cwnd as f64
        } else {
            let target_rate = estimate.target_rate();
            match classification {
                LossClass::Random => target_rate,
                LossClass::Congestive => self.config.m as f64 / target_rate.max(1.0),
            }
        };

        trace!(
            "{} mveno round: base_rtt={} avg_rtt={} subflows={} diff={} {:?}",
            self.trace_id,
            agg.base_rtt,
            agg.average_rtt,
            agg.subflow_count,
            self.state.diff(tp.snd_cwnd),
            estimate
        );

        Some(RoundOutcome {
            classification,
            growth_rate,
            ssthresh_cut: classification.ssthresh(tp.snd_cwnd),
            estimate,
        })
    }

    /// Apply one round of window growth at the given rate. Only whole rounds
    /// count, so a rate below one grows the window on every round end.
    fn grow(tp: &mut TransportState, rate: f64) {
        if tp.snd_cwnd_cnt as f64 >= rate.floor() {
            if tp.snd_cwnd < tp.snd_cwnd_clamp {
                tp.snd_cwnd += 1;
            }
            tp.snd_cwnd_cnt = 0;
        } else {
            tp.snd_cwnd_cnt += 1;
        }
    }

    /// Handle the acknowledgment that ends the current round.
    fn on_round_end(&mut self, tp: &mut TransportState, in_flight: u32, view: &ConnectionView) {
        self.state.set_round_boundary(tp.snd_nxt);
        self.stats.rounds_total = self.stats.rounds_total.saturating_add(1);

        if self.state.sample_count() < self.config.min_round_samples {
            // Not enough RTT samples to evaluate the round.
            self.stats.rounds_insufficient_samples =
                self.stats.rounds_insufficient_samples.saturating_add(1);
            reno::cong_avoid(tp, in_flight);
        } else if let Some(outcome) = self.evaluate_round(tp, view) {
            match outcome.classification {
                LossClass::Random => {
                    self.stats.rounds_random = self.stats.rounds_random.saturating_add(1)
                }
                LossClass::Congestive => {
                    self.stats.rounds_congestive = self.stats.rounds_congestive.saturating_add(1)
                }
            }

            if tp.in_slow_start() {
                reno::slow_start(tp);
            } else {
                Self::grow(tp, outcome.growth_rate);
            }

            tp.snd_cwnd = tp.snd_cwnd.clamp(MIN_CWND, tp.snd_cwnd_clamp.max(MIN_CWND));
        } else {
            reno::cong_avoid(tp, in_flight);
        }

        self.state.reset_round();
    }

    /// Round statistics of the subflow.
    pub fn state(&self) -> &SubflowState {
        &self.state
    }

    /// Configuration.
    pub fn config(&self) -> &MvenoConfig {
        &self.config
    }
}

impl Default for Mveno {
    fn default() -> Self {
        Self::new(MvenoConfig::default())
    }
}

impl CongestionController for Mveno {
    fn name(&self) -> &str {
        "MVENO"
    }

    fn set_trace_id(&mut self, trace_id: &str) {
        self.trace_id = trace_id.to_string();
    }

    fn init(&mut self, tp: &TransportState) {
        // Without multipath, behave like Reno.
        if tp.mp_capable {
            self.enable(tp);
        }
    }

    fn ssthresh(&mut self, tp: &TransportState) -> u32 {
        let diff = self.state.diff(tp.snd_cwnd);
        let class = LossClass::classify(diff, self.config.beta);
        match class {
            LossClass::Random => {
                self.stats.random_losses = self.stats.random_losses.saturating_add(1)
            }
            LossClass::Congestive => {
                self.stats.congestive_losses = self.stats.congestive_losses.saturating_add(1)
            }
        }

        let ssthresh = class.ssthresh(tp.snd_cwnd);
        debug!(
            "{} mveno {:?} loss: diff={} cwnd={} ssthresh={}",
            self.trace_id, class, diff, tp.snd_cwnd, ssthresh
        );
        ssthresh
    }

    fn cong_avoid(
        &mut self,
        tp: &mut TransportState,
        ack: u32,
        in_flight: u32,
        view: &ConnectionView,
    ) {
        if !tp.mp_capable || !self.state.is_active() {
            self.stats.fallback_acks = self.stats.fallback_acks.saturating_add(1);
            reno::cong_avoid(tp, in_flight);
            return;
        }

        // Limited by the application.
        if !tp.is_cwnd_limited(in_flight) {
            return;
        }

        if self.state.round_ended(ack) {
            self.on_round_end(tp, in_flight, view);
        } else if tp.in_slow_start() {
            reno::slow_start(tp);
        }
    }

    fn pkts_acked(&mut self, tp: &TransportState, _cnt: u32, rtt_us: i64) {
        if self.state.on_sample(rtt_us, tp.snd_cwnd) {
            self.stats.rtt_samples = self.stats.rtt_samples.saturating_add(1);
        } else {
            self.stats.rtt_samples_discarded = self.stats.rtt_samples_discarded.saturating_add(1);
        }
    }

    fn set_state(&mut self, tp: &TransportState, ca_state: CaState) {
        if !tp.mp_capable {
            return;
        }

        if ca_state == CaState::Open {
            self.enable(tp);
        } else {
            self.disable();
        }
    }

    fn cwnd_event(&mut self, tp: &TransportState, event: CaEvent) {
        if event == CaEvent::CwndRestart || event == CaEvent::TxStart {
            self.init(tp);
        }
    }

    fn subflow_state(&self) -> Option<&SubflowState> {
        Some(&self.state)
    }

    fn stats(&self) -> &CongestionStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::congestion_control::aggregator::tests::new_view;
    use crate::congestion_control::aggregator::SubflowView;
    use rand::rngs::StdRng;
    use rand::Rng;
    use rand::SeedableRng;

    fn new_tp(cwnd: u32, ssthresh: u32) -> TransportState {
        TransportState {
            snd_cwnd: cwnd,
            snd_ssthresh: ssthresh,
            snd_cwnd_clamp: 1000,
            snd_nxt: 100,
            mp_capable: true,
            ..TransportState::default()
        }
    }

    fn new_mveno(tp: &TransportState) -> Mveno {
        let mut mveno = Mveno::default();
        mveno.init(tp);
        mveno
    }

    fn feed(mveno: &mut Mveno, tp: &TransportState, rtts: &[i64]) {
        for rtt in rtts {
            mveno.pkts_acked(tp, 1, *rtt);
        }
    }

    /// Snapshot of the subflow itself plus the given siblings.
    fn view_with(mveno: &Mveno, tp: &TransportState, siblings: &[SubflowView]) -> ConnectionView {
        let own = SubflowView {
            subflow_id: 0,
            cwnd: tp.snd_cwnd,
            state: *mveno.state(),
        };
        std::iter::once(own)
            .chain(siblings.iter().copied())
            .collect()
    }

    #[test]
    fn mveno_init() {
        let tp = new_tp(10, 20);
        let mveno = new_mveno(&tp);
        assert_eq!(mveno.name(), "MVENO");
        assert!(mveno.state().is_active());
        assert_eq!(mveno.state().round_boundary(), 100);
        assert_eq!(mveno.state().cwnd_high_water(), 10);
        assert_eq!(mveno.subflow_state(), Some(mveno.state()));

        // Not multipath capable.
        let mut tp = new_tp(10, 20);
        tp.mp_capable = false;
        let mveno = new_mveno(&tp);
        assert!(!mveno.state().is_active());
    }

    #[test]
    fn mveno_config() {
        let mut conf = MvenoConfig::default();
        assert_eq!(conf.beta(), 3);
        assert_eq!(conf.n(), 5);
        assert_eq!(conf.m(), 2);
        assert_eq!(conf.min_round_samples(), 3);

        conf.set_beta(4).set_n(0).set_m(3).set_min_round_samples(5);
        assert_eq!(conf.beta(), 4);
        assert_eq!(conf.n(), 1);
        assert_eq!(conf.m(), 3);
        assert_eq!(conf.min_round_samples(), 5);

        assert_eq!(MvenoConfig::new(3, 0, 2, 3).n(), 1);
    }

    #[test]
    fn mveno_ssthresh_random_loss() {
        let tp = new_tp(10, 20);
        let mut mveno = new_mveno(&tp);
        feed(&mut mveno, &tp, &[100, 100, 100]);

        assert_eq!(mveno.state().diff(tp.snd_cwnd), 0);
        assert_eq!(mveno.ssthresh(&tp), 8);
        assert_eq!(mveno.stats().random_losses, 1);
    }

    #[test]
    fn mveno_ssthresh_congestive_loss() {
        let tp = new_tp(10, 20);
        let mut mveno = new_mveno(&tp);
        feed(&mut mveno, &tp, &[100, 150, 200]);

        assert_eq!(mveno.state().diff(tp.snd_cwnd), 3);
        assert_eq!(mveno.ssthresh(&tp), 5);
        assert_eq!(mveno.stats().congestive_losses, 1);
    }

    #[test]
    fn mveno_ssthresh_floor() {
        assert_eq!(LossClass::Random.ssthresh(2), 2);
        assert_eq!(LossClass::Congestive.ssthresh(3), 2);
        assert_eq!(LossClass::Random.ssthresh(u32::MAX), 3435973836);
    }

    #[test]
    fn mveno_classification_deterministic() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..200 {
            let cwnd = rng.gen_range(2..500);
            let min = rng.gen_range(1..10_000);
            let rtts = [min, min + rng.gen_range(0..5_000), min + rng.gen_range(0..5_000)];

            let mut classes = Vec::new();
            for _ in 0..2 {
                let mut s = SubflowState::new();
                s.enable(0, cwnd);
                for rtt in rtts {
                    s.on_sample(rtt as i64, cwnd);
                }
                classes.push(LossClass::classify(s.diff(cwnd), 3));
            }
            assert_eq!(classes[0], classes[1]);
        }
    }

    #[test]
    fn mveno_fallback_when_disabled() {
        let mut tp = new_tp(10, 5);
        let mut mveno = new_mveno(&tp);
        mveno.set_state(&tp, CaState::Recovery);
        assert!(!mveno.state().is_active());

        // Reno congestion avoidance on every acknowledgment.
        let view = ConnectionView::new();
        for ack in 0..11 {
            mveno.cong_avoid(&mut tp, ack, 10, &view);
        }
        assert_eq!(tp.snd_cwnd, 11);
        assert_eq!(mveno.stats().fallback_acks, 11);
        assert_eq!(mveno.stats().rounds_total, 0);

        // Back to open.
        mveno.set_state(&tp, CaState::Open);
        assert!(mveno.state().is_active());
    }

    #[test]
    fn mveno_fallback_without_multipath() {
        let mut tp = new_tp(10, 20);
        tp.mp_capable = false;
        let mut mveno = new_mveno(&tp);

        // State changes are ignored.
        mveno.set_state(&tp, CaState::Open);
        assert!(!mveno.state().is_active());

        mveno.cong_avoid(&mut tp, 1000, 10, &ConnectionView::new());
        assert_eq!(tp.snd_cwnd, 11);
        assert_eq!(mveno.stats().fallback_acks, 1);
    }

    #[test]
    fn mveno_app_limited() {
        let mut tp = new_tp(10, 20);
        let mut mveno = new_mveno(&tp);
        feed(&mut mveno, &tp, &[100, 100, 100]);

        let view = view_with(&mveno, &tp, &[]);
        mveno.cong_avoid(&mut tp, 1000, 1, &view);
        assert_eq!(tp.snd_cwnd, 10);
        assert_eq!(mveno.state().sample_count(), 3);
        assert_eq!(mveno.state().round_boundary(), 100);
    }

    #[test]
    fn mveno_within_round() {
        // Slow start grows on every acknowledgment.
        let mut tp = new_tp(10, 20);
        let mut mveno = new_mveno(&tp);
        let view = view_with(&mveno, &tp, &[]);
        mveno.cong_avoid(&mut tp, 50, 10, &view);
        mveno.cong_avoid(&mut tp, 100, 11, &view);
        assert_eq!(tp.snd_cwnd, 12);

        // Congestion avoidance waits for the end of the round.
        let mut tp = new_tp(10, 5);
        let mut mveno = new_mveno(&tp);
        for ack in [10, 50, 100] {
            mveno.cong_avoid(&mut tp, ack, 10, &view);
        }
        assert_eq!(tp.snd_cwnd, 10);
        assert_eq!(tp.snd_cwnd_cnt, 0);
        assert_eq!(mveno.stats().rounds_total, 0);
    }

    #[test]
    fn mveno_insufficient_samples() {
        let mut tp = new_tp(10, 5);
        tp.snd_cwnd_cnt = 2;
        let mut mveno = new_mveno(&tp);
        feed(&mut mveno, &tp, &[100, 300]);
        let sibling = new_view(1, 10, &[100, 100, 100], true);
        let view = view_with(&mveno, &tp, &[sibling]);

        // With two samples enough, the same round is congestive with a
        // relaxed rate of two and grows the window.
        let mut lowered = MvenoConfig::default();
        lowered.set_min_round_samples(2);
        let mut evaluated = Mveno::new(lowered);
        evaluated.init(&tp);
        feed(&mut evaluated, &tp, &[100, 300]);
        let outcome = evaluated.evaluate_round(&tp, &view).unwrap();
        assert_eq!(outcome.classification, LossClass::Congestive);
        assert_eq!(outcome.growth_rate, 2.0);

        let mut evaluated_tp = tp.clone();
        evaluated_tp.snd_nxt = 200;
        evaluated.cong_avoid(&mut evaluated_tp, 101, 10, &view);
        assert_eq!(evaluated_tp.snd_cwnd, 11);
        assert_eq!(evaluated.stats().rounds_congestive, 1);

        // Too few samples: Reno additive increase, the view is not used.
        tp.snd_nxt = 200;
        mveno.cong_avoid(&mut tp, 101, 10, &view);
        assert_eq!(tp.snd_cwnd, 10);
        assert_eq!(tp.snd_cwnd_cnt, 3);
        assert_eq!(mveno.stats().rounds_total, 1);
        assert_eq!(mveno.stats().rounds_insufficient_samples, 1);
        assert_eq!(mveno.stats().rounds_random, 0);
        assert_eq!(mveno.stats().rounds_congestive, 0);

        // The round was reset and the boundary advanced.
        assert_eq!(mveno.state().sample_count(), 0);
        assert_eq!(mveno.state().round_boundary(), 200);
    }

    #[test]
    fn mveno_grow_fractional_rate() {
        let mut tp = new_tp(10, 5);
        let mut cwnds = Vec::new();
        for _ in 0..4 {
            Mveno::grow(&mut tp, 0.0001);
            cwnds.push(tp.snd_cwnd);
        }
        assert_eq!(cwnds, [11, 12, 13, 14]);
        assert_eq!(tp.snd_cwnd_cnt, 0);

        // A rate of 2.5 waits for two whole rounds.
        let mut tp = new_tp(10, 5);
        let mut cwnds = Vec::new();
        for _ in 0..6 {
            Mveno::grow(&mut tp, 2.5);
            cwnds.push(tp.snd_cwnd);
        }
        assert_eq!(cwnds, [10, 10, 11, 11, 11, 12]);

        // Growth stops at the clamp.
        let mut tp = new_tp(1000, 5);
        Mveno::grow(&mut tp, 0.5);
        assert_eq!(tp.snd_cwnd, 1000);
        assert_eq!(tp.snd_cwnd_cnt, 0);
    }

    #[test]
    fn mveno_single_subflow_round() {
        let mut tp = new_tp(10, 5);
        let mut mveno = new_mveno(&tp);

        // Single subflow: one packet every cwnd rounds, like Reno.
        let mut ack = 100;
        for round in 0..11 {
            feed(&mut mveno, &tp, &[100, 100, 100]);
            let view = view_with(&mveno, &tp, &[]);
            let outcome = mveno.evaluate_round(&tp, &view).unwrap();
            assert_eq!(outcome.estimate.gamma, 1.0);
            assert_eq!(outcome.estimate.theta, 1.0);
            assert_eq!(outcome.classification, LossClass::Random);
            assert_eq!(outcome.growth_rate, 10.0);
            assert_eq!(outcome.ssthresh_cut, 8);

            ack += 100;
            tp.snd_nxt = ack;
            mveno.cong_avoid(&mut tp, ack, 10, &view);
            if round < 10 {
                assert_eq!(tp.snd_cwnd, 10);
            }
        }
        assert_eq!(tp.snd_cwnd, 11);
        assert_eq!(mveno.stats().rounds_random, 11);
    }

    #[test]
    fn mveno_two_subflows_random_regime() {
        let mut tp = new_tp(10, 5);
        let mut mveno = new_mveno(&tp);
        feed(&mut mveno, &tp, &[100, 100, 100, 100]);

        let sibling = new_view(1, 10, &[100, 100, 100, 100], true);
        let view = view_with(&mveno, &tp, &[sibling]);

        let outcome = mveno.evaluate_round(&tp, &view).unwrap();
        assert_eq!(outcome.classification, LossClass::Random);
        // gamma = (20 / 800)^2 / (10 / 4)^2
        let y = 20.0_f64 / 800.0;
        assert_eq!(outcome.estimate.gamma, y * y / 6.25);
        assert!(outcome.estimate.theta < outcome.estimate.gamma);
        assert_eq!(outcome.growth_rate, outcome.estimate.target_rate());
        assert!(outcome.growth_rate < 1.0);

        // The rate is below one round: grow on every round end.
        tp.snd_nxt = 300;
        mveno.cong_avoid(&mut tp, 200, 10, &view);
        assert_eq!(tp.snd_cwnd, 11);
        assert_eq!(mveno.stats().rounds_random, 1);
    }

    #[test]
    fn mveno_two_subflows_congestive_regime() {
        let mut tp = new_tp(30, 5);
        let mut mveno = new_mveno(&tp);
        feed(&mut mveno, &tp, &[100, 200, 300]);

        let sibling = new_view(1, 10, &[100, 100, 100], true);
        let view = view_with(&mveno, &tp, &[sibling]);

        let outcome = mveno.evaluate_round(&tp, &view).unwrap();
        // 30 * (200 - 100) / 200 = 15 packets queued.
        assert_eq!(outcome.classification, LossClass::Congestive);
        let target = outcome.estimate.target_rate();
        assert_eq!(outcome.growth_rate, 2.0 / target.max(1.0));
        assert_eq!(outcome.ssthresh_cut, 15);

        // Rate two: grow once every three round ends.
        let mut ack = 100;
        for _ in 0..3 {
            feed(&mut mveno, &tp, &[100, 200, 300]);
            let view = view_with(&mveno, &tp, &[sibling]);
            ack += 100;
            tp.snd_nxt = ack;
            mveno.cong_avoid(&mut tp, ack, 30, &view);
        }
        assert_eq!(tp.snd_cwnd, 31);
        assert_eq!(mveno.stats().rounds_congestive, 3);
    }

    #[test]
    fn mveno_slow_start_round_end() {
        let mut tp = new_tp(10, 20);
        let mut mveno = new_mveno(&tp);
        feed(&mut mveno, &tp, &[100, 150, 200]);
        let view = view_with(&mveno, &tp, &[new_view(1, 10, &[100, 100, 100], true)]);

        tp.snd_nxt = 200;
        mveno.cong_avoid(&mut tp, 101, 10, &view);
        assert_eq!(tp.snd_cwnd, 11);
        assert_eq!(tp.snd_cwnd_cnt, 0);
    }

    #[test]
    fn mveno_no_active_subflow_in_view() {
        let mut tp = new_tp(10, 5);
        tp.snd_cwnd_cnt = 10;
        let mut mveno = new_mveno(&tp);
        feed(&mut mveno, &tp, &[100, 100, 100]);

        tp.snd_nxt = 200;
        mveno.cong_avoid(&mut tp, 101, 10, &ConnectionView::new());
        assert_eq!(tp.snd_cwnd, 11);
        assert_eq!(mveno.stats().rounds_random, 0);
        assert_eq!(mveno.state().sample_count(), 0);
    }

    #[test]
    fn mveno_cwnd_event() {
        let mut tp = new_tp(10, 20);
        let mut mveno = new_mveno(&tp);
        feed(&mut mveno, &tp, &[100, 100]);
        mveno.set_state(&tp, CaState::Loss);
        assert!(!mveno.state().is_active());

        // Events other than a restart are ignored.
        mveno.cwnd_event(&tp, CaEvent::FastAck);
        assert!(!mveno.state().is_active());

        tp.snd_nxt = 500;
        mveno.cwnd_event(&tp, CaEvent::CwndRestart);
        assert!(mveno.state().is_active());
        assert_eq!(mveno.state().round_boundary(), 500);
        assert_eq!(mveno.state().sample_count(), 0);

        tp.snd_nxt = 700;
        mveno.cwnd_event(&tp, CaEvent::TxStart);
        assert_eq!(mveno.state().round_boundary(), 700);
    }

    #[test]
    fn mveno_discarded_samples() {
        let tp = new_tp(10, 20);
        let mut mveno = new_mveno(&tp);
        feed(&mut mveno, &tp, &[-1, 100, -5]);
        assert_eq!(mveno.stats().rtt_samples, 1);
        assert_eq!(mveno.stats().rtt_samples_discarded, 2);
        assert_eq!(mveno.state().sample_count(), 1);
    }

    #[test]
    fn mveno_window_bounds() {
        let mut rng = StdRng::seed_from_u64(23);
        let clamp = 64;
        let mut tp = new_tp(2, 4);
        tp.snd_cwnd_clamp = clamp;
        let mut mveno = new_mveno(&tp);
        let sibling = new_view(1, 20, &[100, 120, 140], true);
        let mut ack = tp.snd_nxt;

        for _ in 0..5000 {
            match rng.gen_range(0..10) {
                0 => {
                    tp.snd_ssthresh = mveno.ssthresh(&tp);
                    tp.snd_cwnd = tp.snd_ssthresh;
                    mveno.set_state(&tp, CaState::Recovery);
                }
                1 => mveno.set_state(&tp, CaState::Open),
                2..=4 => mveno.pkts_acked(&tp, 1, rng.gen_range(-100..5_000)),
                _ => {
                    ack = ack.wrapping_add(rng.gen_range(1..30));
                    tp.snd_nxt = ack.wrapping_add(tp.snd_cwnd);
                    let view = view_with(&mveno, &tp, &[sibling]);
                    let in_flight = tp.snd_cwnd;
                    mveno.cong_avoid(&mut tp, ack, in_flight, &view);
                }
            }
            assert!(tp.snd_cwnd >= MIN_CWND, "cwnd {}", tp.snd_cwnd);
            assert!(tp.snd_cwnd <= clamp, "cwnd {}", tp.snd_cwnd);
        }
    }
}
