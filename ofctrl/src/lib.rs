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
//! OpenFlow control subsystem of a hypervisor-local virtual-network agent: negotiates a Geneve
//! tunnel-metadata slot with the local switch, then reconciles a desired flow/group table against
//! what the switch actually holds.
//!
//! The core runs on a single thread inside the host agent's event loop. Producers mutate the
//! desired flow and group stores between ticks via [`OfCtrl::add_flow`], [`OfCtrl::remove_flows`],
//! [`OfCtrl::set_flow`] and [`OfCtrl::add_group`]; the driver calls [`OfCtrl::run`] once per tick
//! to advance negotiation and drain inbound messages, then [`OfCtrl::put`] to reconcile.

pub mod channel;
pub mod error;
pub mod flow;
pub mod geneve;
pub mod group;
pub mod ratelimit;
pub mod reconciler;
pub mod transport;
pub mod wire;

use uuid::Uuid;

pub use channel::OfChannel;
pub use error::{Error, Result};
pub use flow::{Flow, FlowKey, FlowStore, Match, MatchField, Priority, TableId};
pub use geneve::{Geneve, State};
pub use group::{GroupId, GroupStore, Which};
pub use ratelimit::RateLimiter;
use transport::Transport;

/// The façade a driver holds: one negotiator, one desired store, one installed store, one group
/// store, and a connection to the switch.
pub struct OfCtrl {
    channel: Transport,
    geneve: Geneve,
    desired_flows: FlowStore,
    installed_flows: FlowStore,
    groups: GroupStore,
    rate_limit: RateLimiter,
    next_xid: u32,
}

impl OfCtrl {
    /// Connects (reliably, auto-reconnecting) to `target`, e.g.
    /// `unix:/var/run/openvswitch/br-int.mgmt`. The string is opaque to this crate.
    pub fn init(target: &str) -> OfCtrl {
        OfCtrl {
            channel: Transport::new(target),
            geneve: Geneve::new(),
            desired_flows: FlowStore::new(),
            installed_flows: FlowStore::new(),
            groups: GroupStore::new(),
            rate_limit: RateLimiter::default(),
            next_xid: 1,
        }
    }

    /// Tears down the connection. The desired store is dropped with `self`; nothing is persisted.
    pub fn destroy(self) {}

    /// Advances C2 by one tick and returns the negotiated tunnel-metadata field id (0 if Geneve is
    /// disabled or negotiation hasn't reached `CLEAR_FLOWS` yet). Callers use 0 to suppress
    /// emission of Geneve-dependent desired flows.
    pub fn run(&mut self) -> u32 {
        self.geneve.run(&mut self.channel, &mut self.installed_flows, &mut self.groups)
    }

    /// Registers the channel's next readiness wakeup with the caller's event loop.
    pub fn wait(&mut self) {
        self.channel.wait();
    }

    /// Reconciles installed flows/groups against desired state (§4.5). A no-op, other than
    /// draining the desired group set, unless negotiation has completed and the channel has no
    /// outstanding messages.
    pub fn put(&mut self) {
        reconciler::put(
            &mut self.channel,
            self.geneve.state(),
            &mut self.next_xid,
            &mut self.installed_flows,
            &self.desired_flows,
            &mut self.groups,
            &mut self.rate_limit,
        );
    }

    pub fn state(&self) -> State {
        self.geneve.state()
    }

    pub fn field_id(&self) -> u32 {
        self.geneve.field_id()
    }

    pub fn connection_generation(&self) -> u64 {
        self.channel.connection_generation()
    }

    pub fn current_target(&self) -> String {
        self.channel.current_target()
    }

    pub fn protocol_version(&self) -> Option<u8> {
        self.channel.protocol_version()
    }

    pub fn add_flow(
        &mut self,
        table_id: TableId,
        priority: Priority,
        matches: Match,
        actions: Vec<u8>,
        uuid: Uuid,
    ) {
        self.desired_flows.add_flow(table_id, priority, matches, actions, uuid, &mut self.rate_limit);
    }

    pub fn remove_flows(&mut self, uuid: Uuid) {
        self.desired_flows.remove_flows(uuid);
    }

    pub fn set_flow(
        &mut self,
        table_id: TableId,
        priority: Priority,
        matches: Match,
        actions: Vec<u8>,
        uuid: Uuid,
    ) {
        self.desired_flows.set_flow(table_id, priority, matches, actions, uuid, &mut self.rate_limit);
    }

    pub fn add_group(&mut self, group_id: GroupId, spec: String) {
        self.groups.insert_desired(group_id, spec);
    }

    pub fn desired_flow_count(&self) -> usize {
        self.desired_flows.len()
    }

    pub fn installed_flow_count(&self) -> usize {
        self.installed_flows.len()
    }
}
