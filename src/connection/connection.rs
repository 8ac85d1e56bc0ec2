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

//! A minimal multipath connection model.
//!
//! The connection owns the live window state of every subflow and delivers
//! transport events to the congestion controllers. Packet transmission,
//! scheduling and path selection are left to the caller.

use std::time::Duration;

use log::*;
use slab::Slab;

use crate::congestion_control::build_congestion_controller;
use crate::congestion_control::CaEvent;
use crate::congestion_control::CaState;
use crate::congestion_control::ConnectionView;
use crate::congestion_control::SubflowView;
use crate::congestion_control::MIN_CWND;
use crate::Config;
use crate::Error;
use crate::Result;

pub use rtt::RttEstimator;
pub use subflow::Subflow;
pub use subflow::SubflowStats;
pub use subflow::TransportState;
pub use subflow::INFINITE_SSTHRESH;
pub use subflow::INITIAL_CWND;

/// A multipath connection.
pub struct Connection {
    /// Subflows of the connection. Each subflow is identified by its slab key.
    subflows: Slab<Subflow>,

    /// Configuration.
    config: Config,

    /// Unique trace id for debug logging.
    trace_id: String,
}

impl Connection {
    pub fn new(conf: &Config, trace_id: &str) -> Self {
        Self {
            subflows: Slab::with_capacity(conf.max_subflows),
            config: conf.clone(),
            trace_id: trace_id.to_string(),
        }
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    /// Whether subflows of the connection couple their windows.
    pub fn is_multipath(&self) -> bool {
        self.config.multipath
    }

    /// Add a subflow and initialize its congestion controller.
    ///
    /// The subflow is multipath capable if the connection enables multipath
    /// and `mp_capable` is set.
    pub fn add_subflow(&mut self, mp_capable: bool) -> Result<usize> {
        if self.subflows.len() >= self.config.max_subflows {
            return Err(Error::SubflowLimitReached);
        }

        let tp = TransportState {
            snd_cwnd: self.config.initial_congestion_window,
            snd_ssthresh: self.config.initial_ssthresh,
            snd_cwnd_clamp: self.config.cwnd_clamp,
            mp_capable: mp_capable && self.config.multipath,
            ..TransportState::default()
        };
        let cc = build_congestion_controller(&self.config);
        let mut subflow = Subflow::new(tp, self.config.initial_rtt, cc, &self.trace_id);

        let entry = self.subflows.vacant_entry();
        let subflow_id = entry.key();
        subflow.update_trace_id(subflow_id);
        subflow.cc.init(&subflow.tp);
        entry.insert(subflow);

        debug!(
            "{} add subflow {} mp_capable={}",
            self.trace_id, subflow_id, mp_capable
        );
        Ok(subflow_id)
    }

    /// Remove a subflow. Its statistics no longer take part in aggregation.
    pub fn remove_subflow(&mut self, subflow_id: usize) -> Result<Subflow> {
        if !self.subflows.contains(subflow_id) {
            return Err(Error::UnknownSubflow(subflow_id));
        }

        debug!("{} remove subflow {}", self.trace_id, subflow_id);
        Ok(self.subflows.remove(subflow_id))
    }

    /// Return a reference to the subflow with the given id.
    pub fn subflow(&self, subflow_id: usize) -> Result<&Subflow> {
        self.subflows
            .get(subflow_id)
            .ok_or(Error::UnknownSubflow(subflow_id))
    }

    /// Return a mutable reference to the subflow with the given id.
    pub fn subflow_mut(&mut self, subflow_id: usize) -> Result<&mut Subflow> {
        self.subflows
            .get_mut(subflow_id)
            .ok_or(Error::UnknownSubflow(subflow_id))
    }

    /// Iterate over the subflows.
    pub fn subflows(&self) -> slab::Iter<Subflow> {
        self.subflows.iter()
    }

    /// Return the number of subflows.
    pub fn subflow_count(&self) -> usize {
        self.subflows.len()
    }

    /// Mark the subflow as established or not.
    pub fn set_established(&mut self, subflow_id: usize, established: bool) -> Result<()> {
        let subflow = self.subflow_mut(subflow_id)?;
        subflow.established = established;
        Ok(())
    }

    /// Snapshot of the subflows that are multipath capable, established, have
    /// a valid smoothed RTT and an active congestion controller.
    pub fn active_subflows(&self) -> ConnectionView {
        self.subflows
            .iter()
            .filter(|(_, s)| s.is_eligible())
            .filter_map(|(subflow_id, s)| {
                s.subflow_state().map(|state| SubflowView {
                    subflow_id,
                    cwnd: s.tp.snd_cwnd,
                    state: *state,
                })
            })
            .collect()
    }

    /// Handle an RTT sample in microseconds. A negative sample means that no
    /// valid RTT could be measured.
    pub fn on_rtt_sample(&mut self, subflow_id: usize, rtt_us: i64) -> Result<()> {
        let subflow = self.subflow_mut(subflow_id)?;
        if rtt_us >= 0 {
            subflow.rtt.update(Duration::from_micros(rtt_us as u64));
        }
        subflow.cc.pkts_acked(&subflow.tp, 1, rtt_us);
        Ok(())
    }

    /// Handle an acknowledgment of sequence `ack` with `in_flight` packets
    /// outstanding.
    pub fn on_ack(&mut self, subflow_id: usize, ack: u32, in_flight: u32) -> Result<()> {
        // The snapshot is taken before the subflow is borrowed mutably.
        let view = self.active_subflows();

        let subflow = self.subflow_mut(subflow_id)?;
        subflow.stats.ack_count = subflow.stats.ack_count.saturating_add(1);
        subflow
            .cc
            .cong_avoid(&mut subflow.tp, ack, in_flight, &view);

        trace!(
            "{} on ack {} in_flight={} cwnd={} ssthresh={}",
            subflow.trace_id(),
            ack,
            in_flight,
            subflow.tp.snd_cwnd,
            subflow.tp.snd_ssthresh
        );
        Ok(())
    }

    /// Handle a congestion avoidance state change.
    pub fn on_state_change(&mut self, subflow_id: usize, ca_state: CaState) -> Result<()> {
        let subflow = self.subflow_mut(subflow_id)?;
        subflow.tp.ca_state = ca_state;
        subflow.cc.set_state(&subflow.tp, ca_state);
        Ok(())
    }

    /// Handle a window event.
    pub fn on_restart_event(&mut self, subflow_id: usize, event: CaEvent) -> Result<()> {
        let subflow = self.subflow_mut(subflow_id)?;
        subflow.cc.cwnd_event(&subflow.tp, event);
        Ok(())
    }

    /// Return the slow start threshold the subflow would adopt after a loss,
    /// without applying it.
    pub fn compute_ssthresh(&mut self, subflow_id: usize) -> Result<u32> {
        let subflow = self.subflow_mut(subflow_id)?;
        Ok(subflow.cc.ssthresh(&subflow.tp))
    }

    /// Handle the transmission of `packets` new packets. `in_flight` is the
    /// number of packets outstanding before the transmission.
    pub fn on_sent(&mut self, subflow_id: usize, packets: u32, in_flight: u32) -> Result<()> {
        let subflow = self.subflow_mut(subflow_id)?;
        if packets == 0 {
            return Err(Error::Done);
        }

        if in_flight == 0 {
            subflow.cc.cwnd_event(&subflow.tp, CaEvent::TxStart);
        }
        subflow.tp.snd_nxt = subflow.tp.snd_nxt.wrapping_add(packets);
        subflow.stats.sent_count = subflow.stats.sent_count.saturating_add(packets as u64);
        Ok(())
    }

    /// Handle a loss event.
    ///
    /// On fast retransmission the window is reduced to the new slow start
    /// threshold and the subflow enters recovery. On a retransmission
    /// timeout the window collapses to the minimum and the subflow enters the
    /// loss state.
    pub fn on_loss(&mut self, subflow_id: usize, is_timeout: bool) -> Result<()> {
        let subflow = self.subflow_mut(subflow_id)?;
        subflow.stats.loss_count = subflow.stats.loss_count.saturating_add(1);

        let ssthresh = subflow.cc.ssthresh(&subflow.tp);
        subflow.tp.snd_ssthresh = ssthresh;
        subflow.tp.snd_cwnd_cnt = 0;

        let ca_state = if is_timeout {
            subflow.stats.timeout_count = subflow.stats.timeout_count.saturating_add(1);
            subflow.tp.snd_cwnd = MIN_CWND;
            CaState::Loss
        } else {
            subflow.tp.snd_cwnd = ssthresh;
            CaState::Recovery
        };
        subflow.tp.clamp_cwnd();

        subflow.tp.ca_state = ca_state;
        subflow.cc.set_state(&subflow.tp, ca_state);

        debug!(
            "{} on loss timeout={} cwnd={} ssthresh={}",
            subflow.trace_id(),
            is_timeout,
            subflow.tp.snd_cwnd,
            ssthresh
        );
        Ok(())
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} subflows=[", self.trace_id)?;
        for (subflow_id, subflow) in self.subflows.iter() {
            write!(f, "{}: {:?}; ", subflow_id, subflow)?;
        }
        write!(f, "]")
    }
}


mod rtt;
mod subflow;
