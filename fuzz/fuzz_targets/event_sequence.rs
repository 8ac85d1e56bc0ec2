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

#![no_main]

use libfuzzer_sys::fuzz_target;

use mveno::congestion_control::CaEvent;
use mveno::congestion_control::CaState;
use mveno::congestion_control::MIN_CWND;
use mveno::Config;
use mveno::Connection;

const MAX_SUBFLOWS: usize = 4;
const CWND_CLAMP: u32 = 1000;

fuzz_target!(|data: &[u8]| {
    let mut conf = Config::new();
    conf.enable_multipath(true);
    conf.set_max_subflows(MAX_SUBFLOWS);
    conf.set_congestion_window_clamp(CWND_CLAMP);
    let mut conn = Connection::new(&conf, "fuzz");

    // Each event is encoded in three bytes: opcode, subflow and argument.
    for ev in data.chunks_exact(3) {
        let id = (ev[1] as usize) % MAX_SUBFLOWS;
        let arg = ev[2] as u32;

        let _ = match ev[0] % 11 {
            0 => conn.add_subflow(ev[2] & 1 == 0).map(|_| ()),
            1 => conn.remove_subflow(id).map(|_| ()),
            2 => conn.set_established(id, ev[2] & 1 == 0),
            3 => conn.on_rtt_sample(id, (arg as i64 - 16) * 1000),
            4 => conn.on_sent(id, arg % 16, arg / 16),
            5 => {
                let ack = conn
                    .subflow(id)
                    .map(|s| s.transport_state().snd_nxt)
                    .unwrap_or(0);
                conn.on_ack(id, ack.wrapping_sub(arg % 8), arg)
            }
            6 => conn.on_loss(id, ev[2] & 1 == 0),
            7 => conn.on_state_change(id, CaState::Open),
            8 => conn.on_state_change(id, CaState::Disorder),
            9 => conn.on_restart_event(id, CaEvent::CwndRestart),
            _ => conn.compute_ssthresh(id).map(|_| ()),
        };

        for (_, subflow) in conn.subflows() {
            assert!(subflow.cwnd() >= MIN_CWND);
            assert!(subflow.cwnd() <= CWND_CLAMP);
        }
    }
});
