/*
Copyright (c) 2022 VMware, Inc.
SPDX-License-Identifier: MIT
Permission is hereby granted, free of charge, to any person obtaining a copy
of this software and associated documentation files (the "Software"), to deal
in the Software without restriction, including without limitation the rights
to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
copies of the Software, and to permit persons to whom the Software is
furnished to do so, subject to the following conditions:
The above copyright notice and this permission notice shall be included in all
copies or substantial portions of the Software.
THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
SOFTWARE.
 */
//! C2: negotiates a Geneve tunnel-metadata option slot with the switch before any flow is
//! installed, and drives the `CLEAR_FLOWS` → `UPDATE_FLOWS` handoff into steady state.

use tracing::{info, warn};

use crate::channel::OfChannel;
use crate::error::Error;
use crate::flow::FlowStore;
use crate::group::{GroupStore, Which};
use crate::ratelimit::RateLimiter;
use crate::wire::{self, ErrorKind, Inbound, TlvMapping};

pub const MAX_SLOTS: u16 = 64;
pub const BASE_TUN_METADATA: u32 = 64;

/// The fixed Geneve option this system looks for, matching OVN's own `NXM_NX_TUN_METADATA0`
/// convention for the first tunnel-metadata option.
pub const OPTION_CLASS: u16 = 0x0102;
pub const OPTION_TYPE: u8 = 0x80;
pub const OPTION_LEN: u8 = 4;

const DRAIN_LIMIT: usize = 50;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    New,
    TlvTableRequested,
    TlvTableModSent,
    ClearFlows,
    UpdateFlows,
}

/// Owns the negotiation state machine: which xids are in flight, the last-seen connection
/// generation, and the negotiated field id (0 while Geneve is disabled or not yet negotiated).
pub struct Geneve {
    state: State,
    xid: Option<u32>,
    xid2: Option<u32>,
    pending_index: Option<u16>,
    last_generation: Option<u64>,
    field_id: u32,
    next_xid: u32,
    rate_limit: RateLimiter,
}

impl Default for Geneve {
    fn default() -> Self {
        Geneve {
            state: State::New,
            xid: None,
            xid2: None,
            pending_index: None,
            last_generation: None,
            field_id: 0,
            next_xid: 1,
            rate_limit: RateLimiter::default(),
        }
    }
}

impl Geneve {
    pub fn new() -> Self {
        Geneve::default()
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn field_id(&self) -> u32 {
        self.field_id
    }

    fn alloc_xid(&mut self) -> u32 {
        let xid = self.next_xid;
        self.next_xid = self.next_xid.wrapping_add(1);
        xid
    }

    /// Advances the state machine by one tick: resets on reconnection, runs entry actions to a
    /// fixpoint, then drains up to [`DRAIN_LIMIT`] inbound messages or until the state changes.
    /// Returns the negotiated field id, 0 unless past negotiation.
    pub fn run<C: OfChannel>(
        &mut self,
        channel: &mut C,
        installed: &mut FlowStore,
        existing_groups: &mut GroupStore,
    ) -> u32 {
        channel.run_once();

        let generation = channel.connection_generation();
        if self.last_generation != Some(generation) {
            self.last_generation = Some(generation);
            self.state = State::New;
            self.xid = None;
            self.xid2 = None;
            self.pending_index = None;
        }

        loop {
            let before = self.state;
            self.run_entry(channel, installed, existing_groups);
            if self.state == before {
                break;
            }
        }

        let entry_state = self.state;
        for _ in 0..DRAIN_LIMIT {
            let msg = match channel.recv() {
                Some(msg) => msg,
                None => break,
            };
            self.handle_inbound(channel, &msg);
            if self.state != entry_state {
                break;
            }
        }

        self.field_id
    }

    fn run_entry<C: OfChannel>(
        &mut self,
        channel: &mut C,
        installed: &mut FlowStore,
        existing_groups: &mut GroupStore,
    ) {
        match self.state {
            State::New => {
                let xid = self.alloc_xid();
                channel.send(wire::encode_tlv_table_request(xid));
                self.xid = Some(xid);
                self.state = State::TlvTableRequested;
            }
            State::ClearFlows => {
                channel.send(wire::encode_flow_mod_delete_all(self.alloc_xid()));
                channel.send(wire::encode_group_mod_delete_all(self.alloc_xid()));
                installed.clear();
                existing_groups.clear(Which::Existing);
                self.state = State::UpdateFlows;
            }
            State::TlvTableRequested | State::TlvTableModSent | State::UpdateFlows => {}
        }
    }

    fn handle_inbound<C: OfChannel>(&mut self, channel: &mut C, msg: &[u8]) {
        let decoded = match wire::decode(msg) {
            Ok(d) => d,
            Err(e) => {
                if self.rate_limit.allow() {
                    warn!(error = %e, "failed to decode inbound OpenFlow frame");
                }
                return;
            }
        };
        match decoded {
            Inbound::EchoRequest { xid, data } => {
                channel.send(wire::encode_echo_reply(xid, &data));
            }
            Inbound::TlvTableReply { xid, mappings } if self.state == State::TlvTableRequested => {
                if Some(xid) != self.xid {
                    self.common_receive(None);
                    return;
                }
                self.on_tlv_table_reply(channel, &mappings);
            }
            Inbound::Error { xid, kind } if self.state == State::TlvTableRequested => {
                if Some(xid) != self.xid {
                    self.common_receive(Some(kind));
                    return;
                }
                if self.rate_limit.allow() {
                    let err = Error::Negotiation { xid, detail: format!("{kind:?}") };
                    warn!(error = %err, "disabling Geneve");
                }
                self.field_id = 0;
                self.state = State::ClearFlows;
            }
            Inbound::Error { xid, kind } if self.state == State::TlvTableModSent => {
                if Some(xid) != self.xid {
                    self.common_receive(Some(kind));
                    return;
                }
                match kind {
                    ErrorKind::AlreadyMapped | ErrorKind::DupEntry => {
                        info!("lost a negotiation race for the tunnel-metadata slot, retrying");
                        self.state = State::New;
                        self.xid = None;
                        self.xid2 = None;
                        self.pending_index = None;
                    }
                    ErrorKind::Other => {
                        if self.rate_limit.allow() {
                            let err = Error::Negotiation { xid, detail: format!("{kind:?}") };
                            warn!(error = %err, "disabling Geneve");
                        }
                        self.field_id = 0;
                        self.state = State::ClearFlows;
                    }
                }
            }
            Inbound::BarrierReply { xid } if self.state == State::TlvTableModSent => {
                if Some(xid) != self.xid2 {
                    self.common_receive(None);
                    return;
                }
                if let Some(index) = self.pending_index.take() {
                    self.field_id = BASE_TUN_METADATA + index as u32;
                }
                self.state = State::ClearFlows;
            }
            Inbound::Error { kind, .. } => self.common_receive(Some(kind)),
            _ => self.common_receive(None),
        }
    }

    /// The handler §4.2 calls out for inbound messages that aren't a reply we're synchronously
    /// awaiting: a reply whose xid matches neither `xid` nor `xid2` in flight, or any message that
    /// arrives outside negotiation altogether. Errors are logged but not fatal (§7) — they belong
    /// to some other in-flight request we aren't tracking, such as the reconciler's own
    /// `flow_mod`s; everything else (echoes handled above, packet-ins, port-status,
    /// flow-removed, stray barrier/TLV replies) is silently ignored.
    fn common_receive(&mut self, kind: Option<ErrorKind>) {
        if let Some(kind) = kind {
            if self.rate_limit.allow() {
                warn!(?kind, "error reply for an in-flight request we're not tracking");
            }
        }
    }

    fn on_tlv_table_reply<C: OfChannel>(&mut self, channel: &mut C, mappings: &[TlvMapping]) {
        let used: Vec<u16> = mappings.iter().map(|m| m.index).collect();

        if let Some(m) = mappings.iter().find(|m| {
            m.option_class == OPTION_CLASS
                && m.option_type == OPTION_TYPE
                && m.option_len == OPTION_LEN
                && m.index < MAX_SLOTS
        }) {
            self.field_id = BASE_TUN_METADATA + m.index as u32;
            self.state = State::ClearFlows;
            return;
        }

        match (0..MAX_SLOTS).find(|idx| !used.contains(idx)) {
            Some(index) => {
                let mod_xid = self.alloc_xid();
                let mapping = TlvMapping {
                    option_class: OPTION_CLASS,
                    option_type: OPTION_TYPE,
                    option_len: OPTION_LEN,
                    index,
                };
                channel.send(wire::encode_tlv_table_mod(mod_xid, wire::NXTTMC_ADD, mapping));
                let barrier_xid = self.alloc_xid();
                channel.send(wire::encode_barrier_request(barrier_xid));
                self.xid = Some(mod_xid);
                self.xid2 = Some(barrier_xid);
                self.pending_index = Some(index);
                self.state = State::TlvTableModSent;
            }
            None => {
                if self.rate_limit.allow() {
                    let err = Error::Negotiation {
                        xid: self.xid.unwrap_or(0),
                        detail: "no free tunnel-metadata slots".into(),
                    };
                    warn!(error = %err, "disabling Geneve");
                }
                self.field_id = 0;
                self.state = State::ClearFlows;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    #[derive(Default)]
    struct FakeChannel {
        sent: Vec<Vec<u8>>,
        inbound: VecDeque<Vec<u8>>,
        generation: u64,
    }

    impl OfChannel for FakeChannel {
        fn send(&mut self, msg: Vec<u8>) {
            self.sent.push(msg);
        }
        fn recv(&mut self) -> Option<Vec<u8>> {
            self.inbound.pop_front()
        }
        fn is_connected(&self) -> bool {
            true
        }
        fn connection_generation(&self) -> u64 {
            self.generation
        }
        fn outstanding(&self) -> u32 {
            0
        }
        fn run_once(&mut self) {}
        fn current_target(&self) -> String {
            "fake".into()
        }
        fn protocol_version(&self) -> Option<u8> {
            Some(4)
        }
    }

    #[test]
    fn new_connection_sends_tlv_table_request() {
        let mut geneve = Geneve::new();
        let mut channel = FakeChannel::default();
        let mut installed = FlowStore::new();
        let mut groups = GroupStore::new();
        let field = geneve.run(&mut channel, &mut installed, &mut groups);
        assert_eq!(field, 0);
        assert_eq!(geneve.state(), State::TlvTableRequested);
        assert_eq!(channel.sent.len(), 1);
    }

    #[test]
    fn new_slot_negotiation_completes_s1() {
        let mut geneve = Geneve::new();
        let mut channel = FakeChannel::default();
        let mut installed = FlowStore::new();
        let mut groups = GroupStore::new();
        geneve.run(&mut channel, &mut installed, &mut groups);
        let xid = geneve.xid.unwrap();

        let mut body = vec![];
        body.extend_from_slice(&wire::NX_VENDOR_ID.to_be_bytes());
        body.extend_from_slice(&wire::NXT_TLV_TABLE_REPLY.to_be_bytes());
        for (class, ty, idx) in [(0x0001u16, 0x01u8, 0u16), (0x0001, 0x01, 2)] {
            body.extend_from_slice(&class.to_be_bytes());
            body.push(ty);
            body.push(0);
            body.push(4);
            body.push(0);
            body.extend_from_slice(&idx.to_be_bytes());
        }
        let mut frame = vec![wire::OFP_VERSION, wire::OFPT_EXPERIMENTER, 0, 0];
        frame.extend_from_slice(&xid.to_be_bytes());
        frame.extend_from_slice(&body);
        let len = frame.len() as u16;
        frame[2..4].copy_from_slice(&len.to_be_bytes());
        channel.inbound.push_back(frame);

        geneve.run(&mut channel, &mut installed, &mut groups);
        assert_eq!(geneve.state(), State::TlvTableModSent);
        assert_eq!(geneve.pending_index, Some(1));
    }

    #[test]
    fn reconnect_resets_to_new() {
        let mut geneve = Geneve::new();
        let mut channel = FakeChannel::default();
        let mut installed = FlowStore::new();
        let mut groups = GroupStore::new();
        geneve.run(&mut channel, &mut installed, &mut groups);
        assert_eq!(geneve.state(), State::TlvTableRequested);

        channel.generation = 1;
        geneve.run(&mut channel, &mut installed, &mut groups);
        assert_eq!(geneve.state(), State::TlvTableRequested);
        assert_eq!(channel.sent.len(), 2, "a fresh TLV table request was sent after reset");
    }
}
