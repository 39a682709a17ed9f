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
//! C5: diffs the installed flow/group state against desired state and emits the minimal set of
//! mods, in the fixed order group-adds, flow-deletes, flow-modifies, flow-adds, group-deletes.

use tracing::warn;

use crate::channel::OfChannel;
use crate::error::Error;
use crate::flow::{Flow, FlowKey, FlowStore};
use crate::geneve::State;
use crate::group::{GroupId, GroupStore, Which};
use crate::ratelimit::RateLimiter;
use crate::wire::{self, OFPFC_ADD, OFPFC_DELETE_STRICT, OFPFC_MODIFY_STRICT, OFPGC11_ADD, OFPGC11_DELETE};

/// Parses a minimal OVS-style group spec, `type=<all|select|indirect|ff>;bucket=<hex>;...`, into
/// a group type and the encoded bucket sequence `encode_group_mod` expects. Each `bucket=` clause
/// is the hex-encoded action list for one bucket; buckets otherwise take default weight and
/// watch_port/watch_group.
fn parse_group_spec(spec: &str) -> anyhow::Result<(u8, Vec<u8>)> {
    let mut group_type = None;
    let mut buckets = Vec::new();
    for clause in spec.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        let (key, value) = clause
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("clause {:?} missing '='", clause))?;
        match key {
            "type" => {
                group_type = Some(match value {
                    "all" => wire::OFPGT11_ALL,
                    "select" => wire::OFPGT11_SELECT,
                    "indirect" => wire::OFPGT11_INDIRECT,
                    "ff" => wire::OFPGT11_FF,
                    other => anyhow::bail!("unknown group type {:?}", other),
                });
            }
            "bucket" => {
                let actions = hex_decode(value)?;
                buckets.extend_from_slice(&wire::encode_bucket(&actions));
            }
            other => anyhow::bail!("unknown group spec clause {:?}", other),
        }
    }
    let group_type = group_type.ok_or_else(|| anyhow::anyhow!("missing 'type=' clause"))?;
    Ok((group_type, buckets))
}

fn hex_decode(s: &str) -> anyhow::Result<Vec<u8>> {
    if s.len() % 2 != 0 {
        anyhow::bail!("odd-length hex string {:?}", s);
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).map_err(anyhow::Error::from))
        .collect()
}

/// Runs one reconciliation cycle (§4.5). Declines to emit anything unless `state == UPDATE_FLOWS`
/// and `channel.outstanding() == 0`, but always drains `groups`'s desired set either way, per the
/// invariant that a `put` consumes it.
pub fn put<C: OfChannel>(
    channel: &mut C,
    state: State,
    next_xid: &mut u32,
    installed: &mut FlowStore,
    desired: &FlowStore,
    groups: &mut GroupStore,
    rate_limit: &mut RateLimiter,
) {
    let eligible = state == State::UpdateFlows && channel.outstanding() == 0;
    if !eligible {
        groups.clear(Which::Desired);
        return;
    }

    let mut xid = move || {
        *next_xid = next_xid.wrapping_add(1);
        *next_xid
    };

    // Phase 1: group additions.
    let additions: Vec<(GroupId, String)> = groups
        .desired()
        .iter()
        .filter(|entry| groups.lookup(Which::Existing, *entry.0).is_none())
        .map(|(id, spec)| (*id, spec.clone()))
        .collect();
    for (group_id, spec) in additions {
        match parse_group_spec(&spec) {
            Ok((group_type, buckets)) => {
                let msg = wire::encode_group_mod(xid(), OFPGC11_ADD, group_type, group_id, &buckets);
                channel.send(msg);
            }
            Err(source) => {
                let err = Error::GroupSpec { spec: spec.clone(), source };
                if rate_limit.allow() {
                    warn!(group_id, error = %err, "skipping group mod");
                }
            }
        }
    }

    // Phase 2: flow reconciliation (delete/modify against the installed store).
    let installed_keys: Vec<(usize, FlowKey)> =
        installed.iter().map(|(idx, flow)| (idx, flow.key.clone())).collect();
    for (idx, key) in installed_keys {
        let winner = desired.smallest_uuid(&key).map(|(_, f)| (f.uuid, f.actions.clone()));
        match winner {
            None => {
                let msg = wire::encode_flow_mod(
                    xid(),
                    key.table_id,
                    key.priority,
                    OFPFC_DELETE_STRICT,
                    &key.matches,
                    &[],
                );
                channel.send(msg);
                installed.remove_index(idx);
            }
            Some((uuid, actions)) => {
                let entry = installed.get(idx).expect("idx came from installed.iter()");
                if entry.uuid != uuid {
                    installed.set_owner(idx, uuid);
                }
                let entry = installed.get(idx).expect("idx still present");
                if entry.actions != actions {
                    let msg = wire::encode_flow_mod(
                        xid(),
                        key.table_id,
                        key.priority,
                        OFPFC_MODIFY_STRICT,
                        &key.matches,
                        &actions,
                    );
                    channel.send(msg);
                    installed.set_actions(idx, actions);
                }
            }
        }
    }

    // Phase 3: flow insertions.
    let installed_keys: std::collections::HashSet<FlowKey> =
        installed.keys().cloned().collect();
    let missing: Vec<FlowKey> = desired
        .keys()
        .filter(|k| !installed_keys.contains(*k))
        .cloned()
        .collect();
    for key in missing {
        if let Some((_, flow)) = desired.smallest_uuid(&key) {
            let msg = wire::encode_flow_mod(
                xid(),
                key.table_id,
                key.priority,
                OFPFC_ADD,
                &key.matches,
                &flow.actions,
            );
            channel.send(msg);
            installed.insert_raw(Flow { key, actions: flow.actions.clone(), uuid: flow.uuid });
        }
    }

    // Phase 4: group deletions, then promote desired into existing.
    let deletions: Vec<GroupId> = groups
        .existing()
        .keys()
        .filter(|id| groups.lookup(Which::Desired, **id).is_none())
        .copied()
        .collect();
    for group_id in deletions {
        let msg = wire::encode_group_mod(xid(), OFPGC11_DELETE, wire::OFPGT11_ALL, group_id, &[]);
        channel.send(msg);
        groups.remove_existing(group_id);
    }
    groups.promote_desired();
}
