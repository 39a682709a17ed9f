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
//! The desired/installed flow table (§3, §4.3 of the design spec) and its double index.

use std::collections::HashMap;

use tracing::{info, warn};
use uuid::Uuid;

use crate::ratelimit::RateLimiter;

pub type TableId = u8;
pub type Priority = u16;

/// One `field=value[/mask]` term of a structured OpenFlow match. `field` is an OXM field number
/// (opaque to this layer, interpreted only when the match is encoded to the wire); `mask` is
/// `None` for an exact match, matching `ovs::ofp_flow`'s treatment of unmasked fields.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MatchField {
    pub field: u32,
    pub value: Vec<u8>,
    pub mask: Option<Vec<u8>>,
}

/// A match key: an unordered set of field terms, canonicalized by sorting so that two matches
/// built from the same terms in different orders hash and compare equal.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Match(pub Vec<MatchField>);

impl Match {
    pub fn new(mut fields: Vec<MatchField>) -> Self {
        fields.sort_by_key(|f| f.field);
        Match(fields)
    }
}

/// The part of a flow that determines its identity in the switch: everything but the actions and
/// the owning UUID. Two flows with equal `FlowKey`s compete for the same slot in the switch table
/// (§3 invariant 2); the reconciler breaks the tie by UUID.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FlowKey {
    pub table_id: TableId,
    pub priority: Priority,
    pub matches: Match,
}

#[derive(Clone, Debug)]
pub struct Flow {
    pub key: FlowKey,
    pub actions: Vec<u8>,
    pub uuid: Uuid,
}

/// Desired (or installed) flow set, double-indexed by match key and by owner UUID (§4.3,
/// §9 "dual indexing"). Flows live in a slab so that both indexes can reference them by a stable
/// `usize` without aliasing a heap object through two intrusive list nodes.
#[derive(Default)]
pub struct FlowStore {
    slab: Vec<Option<Flow>>,
    free: Vec<usize>,
    by_key: HashMap<FlowKey, Vec<usize>>,
    by_uuid: HashMap<Uuid, Vec<usize>>,
}

impl FlowStore {
    pub fn new() -> Self {
        FlowStore::default()
    }

    pub fn len(&self) -> usize {
        self.by_uuid.values().map(|v| v.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &Flow)> {
        self.slab.iter().enumerate().filter_map(|(i, f)| f.as_ref().map(|f| (i, f)))
    }

    pub fn get(&self, idx: usize) -> Option<&Flow> {
        self.slab.get(idx).and_then(|f| f.as_ref())
    }

    pub fn keys(&self) -> impl Iterator<Item = &FlowKey> {
        self.by_key.keys()
    }

    pub fn matching(&self, key: &FlowKey) -> impl Iterator<Item = (usize, &Flow)> {
        self.by_key
            .get(key)
            .into_iter()
            .flatten()
            .filter_map(move |&idx| self.get(idx).map(|f| (idx, f)))
    }

    /// The flow matching `key` with the numerically smallest UUID (§3 invariant 2, §4.5).
    pub fn smallest_uuid(&self, key: &FlowKey) -> Option<(usize, &Flow)> {
        self.matching(key).min_by_key(|(_, f)| f.uuid)
    }

    /// Inserts `flow` without any duplicate checking, for use by the reconciler when populating
    /// the installed store from a desired-store winner, or by tests seeding a store directly.
    /// Producers must go through [`FlowStore::add_flow`] instead.
    pub fn insert_raw(&mut self, flow: Flow) -> usize {
        let idx = match self.free.pop() {
            Some(idx) => {
                self.slab[idx] = Some(flow);
                idx
            }
            None => {
                self.slab.push(Some(flow));
                self.slab.len() - 1
            }
        };
        let flow = self.slab[idx].as_ref().unwrap();
        self.by_key.entry(flow.key.clone()).or_default().push(idx);
        self.by_uuid.entry(flow.uuid).or_default().push(idx);
        idx
    }

    /// Removes the entry at `idx` from both indexes and the slab, returning it.
    pub fn remove_index(&mut self, idx: usize) -> Option<Flow> {
        let flow = self.slab.get_mut(idx)?.take()?;
        self.free.push(idx);
        if let Some(bucket) = self.by_key.get_mut(&flow.key) {
            bucket.retain(|&i| i != idx);
            if bucket.is_empty() {
                self.by_key.remove(&flow.key);
            }
        }
        if let Some(bucket) = self.by_uuid.get_mut(&flow.uuid) {
            bucket.retain(|&i| i != idx);
            if bucket.is_empty() {
                self.by_uuid.remove(&flow.uuid);
            }
        }
        Some(flow)
    }

    /// Replaces the actions of the installed entry at `idx` in place (§4.5 phase 2), without
    /// touching either index (the key and UUID of an installed entry can both change without a
    /// reinsertion: the UUID changes when a new desired owner wins the key, §9 open question).
    pub fn set_actions(&mut self, idx: usize, actions: Vec<u8>) {
        if let Some(flow) = self.slab.get_mut(idx).and_then(|f| f.as_mut()) {
            flow.actions = actions;
        }
    }

    /// Records a new owner for the installed entry at `idx` without emitting a wire message (the
    /// switch has no notion of UUID ownership) and keeps the UUID index consistent.
    pub fn set_owner(&mut self, idx: usize, uuid: Uuid) {
        let old_uuid = match self.slab.get(idx).and_then(|f| f.as_ref()) {
            Some(flow) if flow.uuid != uuid => flow.uuid,
            _ => return,
        };
        if let Some(bucket) = self.by_uuid.get_mut(&old_uuid) {
            bucket.retain(|&i| i != idx);
            if bucket.is_empty() {
                self.by_uuid.remove(&old_uuid);
            }
        }
        self.by_uuid.entry(uuid).or_default().push(idx);
        if let Some(flow) = self.slab.get_mut(idx).and_then(|f| f.as_mut()) {
            flow.uuid = uuid;
        }
    }

    /// The producer API (§4.3, §6). Handles duplicate `(table_id, priority, match)` keys owned by
    /// the same UUID per §3 invariant 1 and §7's error-disposition table.
    pub fn add_flow(
        &mut self,
        table_id: TableId,
        priority: Priority,
        matches: Match,
        actions: Vec<u8>,
        uuid: Uuid,
        rate_limit: &mut RateLimiter,
    ) {
        let key = FlowKey { table_id, priority, matches };
        if let Some(existing_idx) = self
            .by_key
            .get(&key)
            .into_iter()
            .flatten()
            .copied()
            .find(|&idx| self.slab[idx].as_ref().map(|f| f.uuid) == Some(uuid))
        {
            let same_actions = self.slab[existing_idx].as_ref().unwrap().actions == actions;
            if same_actions {
                if rate_limit.allow() {
                    info!(uuid = %uuid, table_id, priority, "duplicate flow add with identical actions, dropping");
                }
            } else {
                if rate_limit.allow() {
                    warn!(uuid = %uuid, table_id, priority, "duplicate flow add with differing actions, overwriting");
                }
                self.set_actions(existing_idx, actions);
            }
            return;
        }
        self.insert_raw(Flow { key, actions, uuid });
    }

    /// Removes every flow owned by `uuid`, O(k) in the number of flows it owns (§4.3).
    pub fn remove_flows(&mut self, uuid: Uuid) {
        let indexes = self.by_uuid.remove(&uuid).unwrap_or_default();
        for idx in indexes {
            if let Some(flow) = self.slab.get_mut(idx).and_then(|f| f.take()) {
                self.free.push(idx);
                if let Some(bucket) = self.by_key.get_mut(&flow.key) {
                    bucket.retain(|&i| i != idx);
                    if bucket.is_empty() {
                        self.by_key.remove(&flow.key);
                    }
                }
            }
        }
    }

    pub fn set_flow(
        &mut self,
        table_id: TableId,
        priority: Priority,
        matches: Match,
        actions: Vec<u8>,
        uuid: Uuid,
        rate_limit: &mut RateLimiter,
    ) {
        self.remove_flows(uuid);
        self.add_flow(table_id, priority, matches, actions, uuid, rate_limit);
    }

    pub fn clear(&mut self) {
        self.slab.clear();
        self.free.clear();
        self.by_key.clear();
        self.by_uuid.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uuid(n: u8) -> Uuid {
        Uuid::from_bytes([n; 16])
    }

    fn key() -> (TableId, Priority, Match) {
        (0, 100, Match::new(vec![MatchField { field: 0, value: vec![1], mask: None }]))
    }

    #[test]
    fn duplicate_identical_actions_is_dropped() {
        let mut store = FlowStore::new();
        let mut rl = RateLimiter::new(100.0, 100.0);
        let (t, p, m) = key();
        store.add_flow(t, p, m.clone(), vec![1, 2, 3], uuid(1), &mut rl);
        store.add_flow(t, p, m, vec![1, 2, 3], uuid(1), &mut rl);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn duplicate_differing_actions_overwrites() {
        let mut store = FlowStore::new();
        let mut rl = RateLimiter::new(100.0, 100.0);
        let (t, p, m) = key();
        store.add_flow(t, p, m.clone(), vec![1], uuid(1), &mut rl);
        store.add_flow(t, p, m.clone(), vec![2], uuid(1), &mut rl);
        assert_eq!(store.len(), 1);
        let (_, flow) = store.matching(&FlowKey { table_id: t, priority: p, matches: m }).next().unwrap();
        assert_eq!(flow.actions, vec![2]);
    }

    #[test]
    fn key_collision_across_uuids_is_legal() {
        let mut store = FlowStore::new();
        let mut rl = RateLimiter::new(100.0, 100.0);
        let (t, p, m) = key();
        store.add_flow(t, p, m.clone(), vec![1], uuid(1), &mut rl);
        store.add_flow(t, p, m.clone(), vec![2], uuid(2), &mut rl);
        assert_eq!(store.len(), 2);
        let winner = store.smallest_uuid(&FlowKey { table_id: t, priority: p, matches: m }).unwrap();
        assert_eq!(winner.1.uuid, uuid(1));
    }

    #[test]
    fn remove_flows_is_index_consistent() {
        let mut store = FlowStore::new();
        let mut rl = RateLimiter::new(100.0, 100.0);
        let (t, p, m) = key();
        store.add_flow(t, p, m.clone(), vec![1], uuid(1), &mut rl);
        store.add_flow(1, 1, Match::default(), vec![9], uuid(1), &mut rl);
        store.remove_flows(uuid(1));
        assert_eq!(store.len(), 0);
        assert!(store.by_key.is_empty());
        assert!(store.by_uuid.is_empty());
    }

    #[test]
    fn set_flow_replaces_owners_whole_set() {
        let mut store = FlowStore::new();
        let mut rl = RateLimiter::new(100.0, 100.0);
        let (t, p, m) = key();
        store.add_flow(t, p, m.clone(), vec![1], uuid(1), &mut rl);
        store.set_flow(t, p, m.clone(), vec![2], uuid(1), &mut rl);
        assert_eq!(store.len(), 1);
        let (_, flow) = store.matching(&FlowKey { table_id: t, priority: p, matches: m }).next().unwrap();
        assert_eq!(flow.actions, vec![2]);
    }
}
