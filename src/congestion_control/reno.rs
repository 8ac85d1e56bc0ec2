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

use super::CaEvent;
use super::CaState;
use super::CongestionController;
use super::CongestionStats;
use super::ConnectionView;
use crate::connection::TransportState;

/// Minimal congestion window in packets.
pub const MIN_CWND: u32 = 2;

/// Slow start: grow the window by one packet per acknowledgment, which
/// doubles it every round trip.
pub fn slow_start(tp: &mut TransportState) {
    tp.snd_cwnd = tp.snd_cwnd.saturating_add(1).min(tp.snd_cwnd_clamp);
}

/// Additive increase: grow the window by one packet once the round-trip cycle
/// counter reaches `w`.
pub fn cong_avoid_ai(tp: &mut TransportState, w: u32) {
    if tp.snd_cwnd_cnt >= w {
        if tp.snd_cwnd < tp.snd_cwnd_clamp {
            tp.snd_cwnd += 1;
        }
        tp.snd_cwnd_cnt = 0;
    } else {
        tp.snd_cwnd_cnt += 1;
    }
}

/// Standard Reno window update for an acknowledgment.
pub fn cong_avoid(tp: &mut TransportState, in_flight: u32) {
    if !tp.is_cwnd_limited(in_flight) {
        return;
    }

    if tp.in_slow_start() {
        slow_start(tp);
    } else {
        cong_avoid_ai(tp, tp.snd_cwnd);
    }
}

/// Multiplicative decrease: halve the window.
pub fn ssthresh(tp: &TransportState) -> u32 {
    (tp.snd_cwnd >> 1).max(MIN_CWND)
}

/// Reno congestion control, the single-path algorithm.
///
/// See <https://www.rfc-editor.org/rfc/rfc5681.html>.
#[derive(Debug, Default)]
pub struct Reno {
    /// Congestion statistics.
    stats: CongestionStats,
}

impl Reno {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CongestionController for Reno {
    fn name(&self) -> &str {
        "RENO"
    }

    fn ssthresh(&mut self, tp: &TransportState) -> u32 {
        self.stats.congestive_losses = self.stats.congestive_losses.saturating_add(1);
        ssthresh(tp)
    }

    fn cong_avoid(
        &mut self,
        tp: &mut TransportState,
        ack: u32,
        in_flight: u32,
        view: &ConnectionView,
    ) {
        self.stats.fallback_acks = self.stats.fallback_acks.saturating_add(1);
        cong_avoid(tp, in_flight);
    }

    fn pkts_acked(&mut self, tp: &TransportState, cnt: u32, rtt_us: i64) {
        if rtt_us < 0 {
            self.stats.rtt_samples_discarded = self.stats.rtt_samples_discarded.saturating_add(1);
        } else {
            self.stats.rtt_samples = self.stats.rtt_samples.saturating_add(1);
        }
    }

    fn stats(&self) -> &CongestionStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_tp(cwnd: u32, ssthresh: u32) -> TransportState {
        TransportState {
            snd_cwnd: cwnd,
            snd_ssthresh: ssthresh,
            snd_cwnd_clamp: 100,
            mp_capable: false,
            ..TransportState::default()
        }
    }

    #[test]
    fn reno_slow_start() {
        let mut tp = new_tp(10, 20);
        for _ in 0..5 {
            let in_flight = tp.snd_cwnd;
            cong_avoid(&mut tp, in_flight);
        }
        assert_eq!(tp.snd_cwnd, 15);
        assert_eq!(tp.snd_cwnd_cnt, 0);

        // Bounded by the clamp.
        let mut tp = new_tp(99, u32::MAX);
        cong_avoid(&mut tp, 99);
        cong_avoid(&mut tp, 100);
        assert_eq!(tp.snd_cwnd, 100);
    }

    #[test]
    fn reno_congestion_avoidance() {
        let mut tp = new_tp(4, 2);

        // One packet per window of acknowledgments.
        for _ in 0..4 {
            cong_avoid(&mut tp, 4);
            assert_eq!(tp.snd_cwnd, 4);
        }
        cong_avoid(&mut tp, 4);
        assert_eq!(tp.snd_cwnd, 5);
        assert_eq!(tp.snd_cwnd_cnt, 0);
    }

    #[test]
    fn reno_cwnd_clamp() {
        let mut tp = new_tp(100, 2);
        tp.snd_cwnd_cnt = 100;
        cong_avoid_ai(&mut tp, 100);
        assert_eq!(tp.snd_cwnd, 100);
        assert_eq!(tp.snd_cwnd_cnt, 0);
    }

    #[test]
    fn reno_app_limited() {
        let mut tp = new_tp(10, 20);
        cong_avoid(&mut tp, 2);
        assert_eq!(tp.snd_cwnd, 10);
    }

    #[test]
    fn reno_ssthresh() {
        let mut reno = Reno::new();
        assert_eq!(reno.name(), "RENO");
        assert_eq!(reno.ssthresh(&new_tp(10, 20)), 5);
        assert_eq!(reno.ssthresh(&new_tp(3, 20)), 2);
        assert_eq!(reno.ssthresh(&new_tp(0, 20)), 2);
        assert_eq!(reno.stats().congestive_losses, 3);
        assert!(reno.subflow_state().is_none());
    }

    #[test]
    fn reno_controller() {
        let mut reno = Reno::new();
        let mut tp = new_tp(10, 5);
        let view = ConnectionView::new();

        reno.init(&tp);
        reno.pkts_acked(&tp, 1, 100);
        reno.pkts_acked(&tp, 1, -1);
        for _ in 0..11 {
            reno.cong_avoid(&mut tp, 1, 10, &view);
        }
        assert_eq!(tp.snd_cwnd, 11);
        assert_eq!(reno.stats().rtt_samples, 1);
        assert_eq!(reno.stats().rtt_samples_discarded, 1);
        assert_eq!(reno.stats().fallback_acks, 11);

        reno.set_state(&tp, CaState::Loss);
        reno.cwnd_event(&tp, CaEvent::TxStart);
        assert_eq!(tp.snd_cwnd, 11);
    }
}
