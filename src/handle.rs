// SPDX-License-Identifier: BSD-3-Clause
use std::hash::Hash;

use rustc_hash::FxHashMap;

/// Declares a small, copyable index into one of the analysis arenas.
macro_rules! handle {
    ($(#[$attr:meta])* $name:ident) => {
        $(#[$attr])*
        #[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, serde::Serialize)]
        pub struct $name(pub(crate) u32);

        impl $name {
            #[inline]
            pub fn index(self) -> usize {
                self.0 as usize
            }

            #[allow(dead_code)]
            #[inline]
            pub(crate) fn from_index(index: usize) -> Self {
                Self(index as u32)
            }
        }
    };
}

pub(crate) use handle;

/// Hash-consing table handing out dense indices in insertion order.
#[derive(Clone, Debug)]
pub struct Interner<K> {
    index: FxHashMap<K, u32>,
    items: Vec<K>,
}

impl<K> Default for Interner<K> {
    fn default() -> Self {
        Interner {
            index: FxHashMap::default(),
            items: Vec::new(),
        }
    }
}

impl<K: Clone + Eq + Hash> Interner<K> {
    /// Returns the index of `key` and whether it was newly inserted.
    pub fn intern(&mut self, key: K) -> (u32, bool) {
        if let Some(&i) = self.index.get(&key) {
            return (i, false);
        }
        let i = self.items.len() as u32;
        self.items.push(key.clone());
        self.index.insert(key, i);
        (i, true)
    }

    #[inline]
    pub fn get(&self, i: u32) -> &K {
        &self.items[i as usize]
    }

    pub fn lookup(&self, key: &K) -> Option<u32> {
        self.index.get(key).copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &K)> {
        self.items.iter().enumerate().map(|(i, k)| (i as u32, k))
    }
}
