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
//! Integration coverage for the negotiation state machine (`geneve`) and the reconciliation
//! algorithm (`reconciler`) driven together through [`ofctrl::OfChannel`]'s fake implementation.

use std::collections::VecDeque;

use ofctrl::{
    geneve::{Geneve, State},
    group::{GroupStore, Which},
    reconciler,
    wire::{self, ErrorKind, Inbound},
    FlowStore, Match, MatchField, OfChannel, RateLimiter,
};
use uuid::Uuid;

#[derive(Default)]
struct FakeChannel {
    sent: Vec<Vec<u8>>,
    inbound: VecDeque<Vec<u8>>,
    generation: u64,
    outstanding: u32,
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
        self.outstanding
    }
    fn run_once(&mut self) {}
    fn current_target(&self) -> String {
        "fake".into()
    }
    fn protocol_version(&self) -> Option<u8> {
        Some(4)
    }
}

fn uuid(n: u8) -> Uuid {
    Uuid::from_bytes([n; 16])
}

fn frame_of_type(type_: u8, xid: u32, body: &[u8]) -> Vec<u8> {
    let mut frame = vec![wire::OFP_VERSION, type_, 0, 0];
    frame.extend_from_slice(&xid.to_be_bytes());
    frame.extend_from_slice(body);
    let len = frame.len() as u16;
    frame[2..4].copy_from_slice(&len.to_be_bytes());
    frame
}

fn tlv_reply(xid: u32, mappings: &[(u16, u8, u16)]) -> Vec<u8> {
    let mut body = vec![];
    body.extend_from_slice(&wire::NX_VENDOR_ID.to_be_bytes());
    body.extend_from_slice(&wire::NXT_TLV_TABLE_REPLY.to_be_bytes());
    for (class, ty, idx) in mappings {
        body.extend_from_slice(&class.to_be_bytes());
        body.push(*ty);
        body.push(0);
        body.push(4);
        body.push(0);
        body.extend_from_slice(&idx.to_be_bytes());
    }
    frame_of_type(wire::OFPT_EXPERIMENTER, xid, &body)
}

fn tlv_error(xid: u32, code: u16) -> Vec<u8> {
    let mut body = vec![];
    body.extend_from_slice(&0x1001u16.to_be_bytes());
    body.extend_from_slice(&code.to_be_bytes());
    frame_of_type(wire::OFPT_ERROR, xid, &body)
}

fn barrier_reply(xid: u32) -> Vec<u8> {
    frame_of_type(wire::OFPT_BARRIER_REPLY, xid, &[])
}

/// `flow_mod`'s `command` field sits after the 8-byte header, 8-byte cookie, 8-byte
/// cookie_mask, and 1-byte table_id, at offset 25.
fn flow_mod_command(msg: &[u8]) -> u8 {
    msg[25]
}

/// `group_mod`'s 16-bit `command` field sits right after the 8-byte header.
fn group_mod_command(msg: &[u8]) -> u16 {
    u16::from_be_bytes([msg[8], msg[9]])
}

/// Drives `geneve`/`channel` through negotiation and the CLEAR_FLOWS handoff so later scenarios
/// start from a settled `UPDATE_FLOWS` state. `CLEAR_FLOWS`'s entry action only runs on the tick
/// after the reply that puts us there, so this polls a few ticks rather than assuming one suffices.
fn negotiate_to_update_flows(
    geneve: &mut Geneve,
    channel: &mut FakeChannel,
    installed: &mut FlowStore,
    groups: &mut GroupStore,
) {
    geneve.run(channel, installed, groups);
    let xid = channel.sent.last().and_then(|msg| {
        Some(u32::from_be_bytes(msg[4..8].try_into().unwrap()))
    }).unwrap();
    channel.inbound.push_back(tlv_reply(xid, &[(0x0102, 0x80, 0)]));
    for _ in 0..4 {
        geneve.run(channel, installed, groups);
        if geneve.state() == State::UpdateFlows {
            break;
        }
    }
    assert_eq!(geneve.state(), State::UpdateFlows);
}

#[test]
fn s1_negotiation_success_new_slot() {
    let mut geneve = Geneve::new();
    let mut channel = FakeChannel::default();
    let mut installed = FlowStore::new();
    let mut groups = GroupStore::new();

    geneve.run(&mut channel, &mut installed, &mut groups);
    let request_xid = u32::from_be_bytes(channel.sent[0][4..8].try_into().unwrap());

    // Two slots already taken by someone else's options; we should claim the next free one.
    channel.inbound.push_back(tlv_reply(request_xid, &[(0x0001, 0x01, 0), (0x0001, 0x01, 2)]));
    geneve.run(&mut channel, &mut installed, &mut groups);
    assert_eq!(geneve.state(), State::TlvTableModSent);
    assert_eq!(channel.sent.len(), 3, "tlv table mod and barrier were sent");

    let mod_xid = u32::from_be_bytes(channel.sent[1][4..8].try_into().unwrap());
    let barrier_xid = u32::from_be_bytes(channel.sent[2][4..8].try_into().unwrap());
    channel.inbound.push_back(barrier_reply(barrier_xid));
    geneve.run(&mut channel, &mut installed, &mut groups); // processes the barrier reply, now CLEAR_FLOWS
    let field = geneve.run(&mut channel, &mut installed, &mut groups); // CLEAR_FLOWS's entry action, now UPDATE_FLOWS
    assert_eq!(geneve.state(), State::UpdateFlows);
    assert_eq!(field, 64 + 1);
    let _ = mod_xid;
}

#[test]
fn s2_negotiation_race_retries_from_new() {
    let mut geneve = Geneve::new();
    let mut channel = FakeChannel::default();
    let mut installed = FlowStore::new();
    let mut groups = GroupStore::new();

    geneve.run(&mut channel, &mut installed, &mut groups);
    let request_xid = u32::from_be_bytes(channel.sent[0][4..8].try_into().unwrap());
    channel.inbound.push_back(tlv_reply(request_xid, &[(0x0001, 0x01, 0)]));
    geneve.run(&mut channel, &mut installed, &mut groups);
    assert_eq!(geneve.state(), State::TlvTableModSent);
    let mod_xid = u32::from_be_bytes(channel.sent[1][4..8].try_into().unwrap());

    channel.inbound.push_back(tlv_error(mod_xid, 1)); // ALREADY_MAPPED
    geneve.run(&mut channel, &mut installed, &mut groups); // processes the error, resets to NEW
    geneve.run(&mut channel, &mut installed, &mut groups); // NEW's entry action: a fresh request
    assert_eq!(geneve.state(), State::TlvTableRequested);
    assert_eq!(channel.sent.len(), 4, "a fresh TLV table request was issued");
}

#[test]
fn s3_no_free_slots_disables_geneve() {
    let mut geneve = Geneve::new();
    let mut channel = FakeChannel::default();
    let mut installed = FlowStore::new();
    let mut groups = GroupStore::new();

    geneve.run(&mut channel, &mut installed, &mut groups);
    let request_xid = u32::from_be_bytes(channel.sent[0][4..8].try_into().unwrap());
    let all_slots: Vec<(u16, u8, u16)> = (0..64).map(|i| (0x0201, 0x00, i)).collect();
    channel.inbound.push_back(tlv_reply(request_xid, &all_slots));

    geneve.run(&mut channel, &mut installed, &mut groups); // processes the reply, now CLEAR_FLOWS
    let field = geneve.run(&mut channel, &mut installed, &mut groups); // CLEAR_FLOWS's entry action
    assert_eq!(field, 0);
    assert_eq!(geneve.state(), State::UpdateFlows);
    assert!(channel.sent.iter().skip(1).all(|msg| msg[1] != wire::OFPT_EXPERIMENTER));
}

#[test]
fn s4_identical_duplicate_add_collapses_to_one_flow_mod() {
    let mut geneve = Geneve::new();
    let mut channel = FakeChannel::default();
    let mut installed = FlowStore::new();
    let mut groups = GroupStore::new();
    let mut desired = FlowStore::new();
    let mut rate_limit = RateLimiter::new(100.0, 100.0);
    let mut next_xid = 1000u32;

    negotiate_to_update_flows(&mut geneve, &mut channel, &mut installed, &mut groups);
    channel.sent.clear();

    let m = Match::new(vec![MatchField { field: 0, value: vec![1], mask: None }]);
    desired.add_flow(0, 100, m.clone(), vec![9], uuid(1), &mut rate_limit);
    desired.add_flow(0, 100, m, vec![9], uuid(1), &mut rate_limit);
    assert_eq!(desired.len(), 1);

    reconciler::put(
        &mut channel,
        geneve.state(),
        &mut next_xid,
        &mut installed,
        &desired,
        &mut groups,
        &mut rate_limit,
    );
    let adds: Vec<&Vec<u8>> = channel.sent.iter().filter(|m| m[1] == wire::OFPT_FLOW_MOD).collect();
    assert_eq!(adds.len(), 1);
}

#[test]
fn s5_tie_break_then_modify_on_removal() {
    let mut geneve = Geneve::new();
    let mut channel = FakeChannel::default();
    let mut installed = FlowStore::new();
    let mut groups = GroupStore::new();
    let mut desired = FlowStore::new();
    let mut rate_limit = RateLimiter::new(100.0, 100.0);
    let mut next_xid = 2000u32;

    negotiate_to_update_flows(&mut geneve, &mut channel, &mut installed, &mut groups);
    channel.sent.clear();

    let m = Match::new(vec![MatchField { field: 0, value: vec![7], mask: None }]);
    let (u1, u2) = (uuid(1), uuid(2));
    desired.add_flow(0, 50, m.clone(), vec![1], u1, &mut rate_limit);
    desired.add_flow(0, 50, m.clone(), vec![2], u2, &mut rate_limit);

    reconciler::put(&mut channel, geneve.state(), &mut next_xid, &mut installed, &desired, &mut groups, &mut rate_limit);
    assert_eq!(installed.len(), 1);
    let (_, flow) = installed.iter().next().unwrap();
    assert_eq!(flow.uuid, u1);
    assert_eq!(flow.actions, vec![1]);

    desired.remove_flows(u1);
    channel.sent.clear();
    reconciler::put(&mut channel, geneve.state(), &mut next_xid, &mut installed, &desired, &mut groups, &mut rate_limit);
    let (_, flow) = installed.iter().next().unwrap();
    assert_eq!(flow.uuid, u2);
    assert_eq!(flow.actions, vec![2]);
    let modifies: Vec<&Vec<u8>> = channel
        .sent
        .iter()
        .filter(|m| m[1] == wire::OFPT_FLOW_MOD && flow_mod_command(m) == wire::OFPFC_MODIFY_STRICT)
        .collect();
    assert_eq!(modifies.len(), 1, "only a MODIFY_STRICT should be emitted, no DELETE/ADD pair");
}

#[test]
fn s6_reconnect_clears_installed_state_and_reconverges() {
    let mut geneve = Geneve::new();
    let mut channel = FakeChannel::default();
    let mut installed = FlowStore::new();
    let mut groups = GroupStore::new();
    let mut desired = FlowStore::new();
    let mut rate_limit = RateLimiter::new(100.0, 100.0);
    let mut next_xid = 3000u32;

    negotiate_to_update_flows(&mut geneve, &mut channel, &mut installed, &mut groups);

    let m1 = Match::new(vec![MatchField { field: 0, value: vec![1], mask: None }]);
    let m2 = Match::new(vec![MatchField { field: 0, value: vec![2], mask: None }]);
    desired.add_flow(0, 10, m1, vec![1], uuid(1), &mut rate_limit);
    desired.add_flow(0, 10, m2, vec![2], uuid(2), &mut rate_limit);
    reconciler::put(&mut channel, geneve.state(), &mut next_xid, &mut installed, &desired, &mut groups, &mut rate_limit);
    assert_eq!(installed.len(), 2);

    channel.generation += 1;
    channel.inbound.clear();
    geneve.run(&mut channel, &mut installed, &mut groups);
    assert_eq!(geneve.state(), State::TlvTableRequested, "the reconnect reset fires immediately");

    negotiate_to_update_flows(&mut geneve, &mut channel, &mut installed, &mut groups);
    assert_eq!(installed.len(), 0, "CLEAR_FLOWS's entry action emptied the installed shadow store");

    reconciler::put(&mut channel, geneve.state(), &mut next_xid, &mut installed, &desired, &mut groups, &mut rate_limit);
    assert_eq!(installed.len(), 2, "both flows re-converge after reconnect");
}

#[test]
fn invariant_idempotence_emits_nothing_once_converged() {
    let mut geneve = Geneve::new();
    let mut channel = FakeChannel::default();
    let mut installed = FlowStore::new();
    let mut groups = GroupStore::new();
    let mut desired = FlowStore::new();
    let mut rate_limit = RateLimiter::new(100.0, 100.0);
    let mut next_xid = 4000u32;

    negotiate_to_update_flows(&mut geneve, &mut channel, &mut installed, &mut groups);
    let m = Match::new(vec![MatchField { field: 0, value: vec![9], mask: None }]);
    desired.add_flow(0, 1, m, vec![1], uuid(1), &mut rate_limit);
    reconciler::put(&mut channel, geneve.state(), &mut next_xid, &mut installed, &desired, &mut groups, &mut rate_limit);

    channel.sent.clear();
    reconciler::put(&mut channel, geneve.state(), &mut next_xid, &mut installed, &desired, &mut groups, &mut rate_limit);
    assert!(channel.sent.is_empty());
}

#[test]
fn invariant_back_pressure_defers_and_drains_desired_groups() {
    let mut geneve = Geneve::new();
    let mut channel = FakeChannel::default();
    let mut installed = FlowStore::new();
    let mut groups = GroupStore::new();
    let desired = FlowStore::new();
    let mut rate_limit = RateLimiter::new(100.0, 100.0);
    let mut next_xid = 5000u32;

    negotiate_to_update_flows(&mut geneve, &mut channel, &mut installed, &mut groups);
    channel.outstanding = 3;
    groups.insert_desired(7, "type=all;bucket=0102".into());

    reconciler::put(&mut channel, geneve.state(), &mut next_xid, &mut installed, &desired, &mut groups, &mut rate_limit);
    assert!(channel.sent.is_empty());
    assert_eq!(groups.len(Which::Desired), 0, "desired groups are drained even when deferred");
    assert_eq!(groups.len(Which::Existing), 0, "but never promoted without back-pressure clearing");
}

#[test]
fn invariant_message_ordering_within_one_put() {
    let mut geneve = Geneve::new();
    let mut channel = FakeChannel::default();
    let mut installed = FlowStore::new();
    let mut groups = GroupStore::new();
    let mut desired = FlowStore::new();
    let mut rate_limit = RateLimiter::new(100.0, 100.0);
    let mut next_xid = 6000u32;

    negotiate_to_update_flows(&mut geneve, &mut channel, &mut installed, &mut groups);

    // Seed installed with a flow that will be deleted, and a group that will be removed.
    groups.insert_desired(1, "type=all;bucket=00".into());
    reconciler::put(&mut channel, geneve.state(), &mut next_xid, &mut installed, &desired, &mut groups, &mut rate_limit);
    channel.sent.clear();

    let stale = Match::new(vec![MatchField { field: 0, value: vec![5], mask: None }]);
    installed.add_flow(0, 1, stale, vec![0], uuid(9), &mut rate_limit);
    groups.insert_desired(2, "type=all;bucket=01".into()); // new group add
    // group 1 is absent from desired now, so it will be deleted this round.

    reconciler::put(&mut channel, geneve.state(), &mut next_xid, &mut installed, &desired, &mut groups, &mut rate_limit);

    let types: Vec<(u8, u16)> = channel
        .sent
        .iter()
        .map(|m| (m[1], if m[1] == wire::OFPT_GROUP_MOD { group_mod_command(m) } else { flow_mod_command(m) as u16 }))
        .collect();
    let group_add_pos = types.iter().position(|(t, c)| *t == wire::OFPT_GROUP_MOD && *c == wire::OFPGC11_ADD);
    let flow_delete_pos =
        types.iter().position(|(t, c)| *t == wire::OFPT_FLOW_MOD && *c == wire::OFPFC_DELETE_STRICT as u16);
    let group_delete_pos = types.iter().position(|(t, c)| *t == wire::OFPT_GROUP_MOD && *c == wire::OFPGC11_DELETE);
    assert!(group_add_pos.unwrap() < flow_delete_pos.unwrap());
    assert!(flow_delete_pos.unwrap() < group_delete_pos.unwrap());
}

#[test]
fn invariant_uuid_index_consistency_after_churn() {
    let mut store = FlowStore::new();
    let mut rate_limit = RateLimiter::new(100.0, 100.0);
    let m1 = Match::new(vec![MatchField { field: 0, value: vec![1], mask: None }]);
    let m2 = Match::new(vec![MatchField { field: 1, value: vec![2], mask: None }]);
    store.add_flow(0, 1, m1.clone(), vec![1], uuid(1), &mut rate_limit);
    store.add_flow(0, 2, m2, vec![2], uuid(1), &mut rate_limit);
    store.set_flow(0, 1, m1, vec![3], uuid(1), &mut rate_limit);
    assert_eq!(store.len(), 1, "set_flow drops the old owner's whole flow set first");

    let matched_via_uuid: usize = store.iter().filter(|(_, f)| f.uuid == uuid(1)).count();
    assert_eq!(matched_via_uuid, store.len());
}

#[test]
fn inbound_error_on_barrier_wait_is_not_silently_dropped() {
    let mut geneve = Geneve::new();
    let mut channel = FakeChannel::default();
    let mut installed = FlowStore::new();
    let mut groups = GroupStore::new();

    geneve.run(&mut channel, &mut installed, &mut groups);
    let request_xid = u32::from_be_bytes(channel.sent[0][4..8].try_into().unwrap());
    channel.inbound.push_back(tlv_reply(request_xid, &[]));
    geneve.run(&mut channel, &mut installed, &mut groups);
    let mod_xid = u32::from_be_bytes(channel.sent[1][4..8].try_into().unwrap());

    channel.inbound.push_back(tlv_error(mod_xid, 0xdead)); // ErrorKind::Other
    geneve.run(&mut channel, &mut installed, &mut groups); // processes the error, now CLEAR_FLOWS
    let field = geneve.run(&mut channel, &mut installed, &mut groups); // CLEAR_FLOWS's entry action
    assert_eq!(field, 0);
    assert_eq!(geneve.state(), State::UpdateFlows);
}

#[test]
fn decode_error_kind_matches_wire_codes() {
    let frame = tlv_error(1, 2);
    match wire::decode(&frame).unwrap() {
        Inbound::Error { kind, .. } => assert_eq!(kind, ErrorKind::DupEntry),
        other => panic!("unexpected: {other:?}"),
    }
}
