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
//! The desired/existing group table and its id allocator (§3, §4.4).

use std::collections::HashMap;

pub type GroupId = u32;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Group {
    pub group_id: GroupId,
    pub spec: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Which {
    Desired,
    Existing,
}

/// A growable bitmap over the 32-bit group-id space, the Rust equivalent of OVS's own
/// hand-rolled `struct bitmap` (`lib/bitmap.h`): it only allocates words for ids actually in use,
/// rather than the 512MiB a dense `[bool; 1 << 32]` would need.
#[derive(Default)]
struct IdBitmap {
    words: Vec<u64>,
}

impl IdBitmap {
    fn word_index(id: GroupId) -> usize {
        (id / 64) as usize
    }

    fn is_set(&self, id: GroupId) -> bool {
        self.words
            .get(Self::word_index(id))
            .map(|w| w & (1u64 << (id % 64)) != 0)
            .unwrap_or(false)
    }

    fn set(&mut self, id: GroupId) {
        let idx = Self::word_index(id);
        if idx >= self.words.len() {
            self.words.resize(idx + 1, 0);
        }
        self.words[idx] |= 1u64 << (id % 64);
    }

    fn clear(&mut self, id: GroupId) {
        if let Some(word) = self.words.get_mut(Self::word_index(id)) {
            *word &= !(1u64 << (id % 64));
        }
    }

    fn first_free(&self) -> GroupId {
        for (i, word) in self.words.iter().enumerate() {
            if *word != u64::MAX {
                let bit = word.trailing_ones();
                return (i as u32) * 64 + bit;
            }
        }
        (self.words.len() as u32) * 64
    }
}

/// Holds the desired and existing group sets plus the shared id allocator (§3, §4.4). Invariant:
/// a `group_id` is marked allocated iff it appears in `desired` or `existing`; every mutator here
/// keeps the bitmap in lockstep with the two maps rather than recomputing it, since the allocator
/// needs to answer "what's the next free id" in better than O(n) over both maps.
#[derive(Default)]
pub struct GroupStore {
    desired: HashMap<GroupId, String>,
    existing: HashMap<GroupId, String>,
    ids: IdBitmap,
}

impl GroupStore {
    pub fn new() -> Self {
        GroupStore::default()
    }

    fn set_of(&self, which: Which) -> &HashMap<GroupId, String> {
        match which {
            Which::Desired => &self.desired,
            Which::Existing => &self.existing,
        }
    }

    fn set_of_mut(&mut self, which: Which) -> &mut HashMap<GroupId, String> {
        match which {
            Which::Desired => &mut self.desired,
            Which::Existing => &mut self.existing,
        }
    }

    pub fn desired(&self) -> &HashMap<GroupId, String> {
        &self.desired
    }

    pub fn existing(&self) -> &HashMap<GroupId, String> {
        &self.existing
    }

    pub fn lookup(&self, which: Which, group_id: GroupId) -> Option<&str> {
        self.set_of(which).get(&group_id).map(String::as_str)
    }

    /// The next unused group id. Purely advisory: nothing in this crate calls it (group ids are
    /// assigned upstream, per §1's "producers" boundary), but it's part of the allocator's
    /// contract with callers that mint new ids (§4.4).
    pub fn allocate_id(&self) -> GroupId {
        self.ids.first_free()
    }

    pub fn insert_desired(&mut self, group_id: GroupId, spec: String) {
        self.ids.set(group_id);
        self.desired.insert(group_id, spec);
    }

    /// Moves every desired group into existing, dropping duplicates, and leaves `desired` empty
    /// (§4.5 phase 4, "promotion").
    pub fn promote_desired(&mut self) {
        self.existing.extend(self.desired.drain());
    }

    /// Empties `which`, deallocating ids that don't also appear in the other set.
    pub fn clear(&mut self, which: Which) {
        let removed: Vec<GroupId> = self.set_of_mut(which).drain().map(|(id, _)| id).collect();
        let other = match which {
            Which::Desired => &self.existing,
            Which::Existing => &self.desired,
        };
        for id in removed {
            if !other.contains_key(&id) {
                self.ids.clear(id);
            }
        }
    }

    pub fn remove_existing(&mut self, group_id: GroupId) {
        self.existing.remove(&group_id);
        if !self.desired.contains_key(&group_id) {
            self.ids.clear(group_id);
        }
    }

    pub fn is_allocated(&self, group_id: GroupId) -> bool {
        self.ids.is_set(group_id)
    }

    pub fn len(&self, which: Which) -> usize {
        self.set_of(which).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocated_iff_in_either_set() {
        let mut gs = GroupStore::new();
        gs.insert_desired(5, "bucket=output:1".into());
        assert!(gs.is_allocated(5));
        gs.promote_desired();
        assert!(gs.is_allocated(5));
        gs.clear(Which::Existing);
        assert!(!gs.is_allocated(5));
    }

    #[test]
    fn id_kept_allocated_while_in_either_set() {
        let mut gs = GroupStore::new();
        gs.insert_desired(7, "a".into());
        gs.existing.insert(7, "a".into());
        gs.clear(Which::Desired);
        assert!(gs.is_allocated(7), "still present in existing");
        gs.clear(Which::Existing);
        assert!(!gs.is_allocated(7));
    }

    #[test]
    fn first_free_skips_allocated() {
        let mut gs = GroupStore::new();
        gs.insert_desired(0, "a".into());
        gs.insert_desired(1, "b".into());
        assert_eq!(gs.allocate_id(), 2);
    }
}
