// SPDX-License-Identifier: BSD-3-Clause
use rustc_hash::FxHashSet;

use crate::element::CsObjId;

/// A set of context-sensitive objects. Sets held by the solver only grow.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PointsToSet(FxHashSet<CsObjId>);

impl PointsToSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn singleton(obj: CsObjId) -> Self {
        let mut s = Self::new();
        s.add(obj);
        s
    }

    /// Returns whether `obj` was not yet in the set.
    #[inline]
    pub fn add(&mut self, obj: CsObjId) -> bool {
        self.0.insert(obj)
    }

    /// Adds all of `other`, returning the objects that were new.
    pub fn add_all_diff(&mut self, other: &PointsToSet) -> PointsToSet {
        let mut diff = PointsToSet::new();
        for &o in &other.0 {
            if self.0.insert(o) {
                diff.0.insert(o);
            }
        }
        diff
    }

    #[inline]
    pub fn contains(&self, obj: CsObjId) -> bool {
        self.0.contains(&obj)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = CsObjId> + '_ {
        self.0.iter().copied()
    }

    /// The objects in ascending order.
    pub fn to_sorted_vec(&self) -> Vec<CsObjId> {
        let mut v: Vec<CsObjId> = self.iter().collect();
        v.sort_unstable();
        v
    }
}

impl FromIterator<CsObjId> for PointsToSet {
    fn from_iter<I: IntoIterator<Item = CsObjId>>(iter: I) -> Self {
        PointsToSet(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diff() {
        let mut s = PointsToSet::singleton(CsObjId(1));
        let other: PointsToSet = [CsObjId(1), CsObjId(2), CsObjId(3)].into_iter().collect();
        let d = s.add_all_diff(&other);
        assert_eq!(d.to_sorted_vec(), vec![CsObjId(2), CsObjId(3)]);
        assert_eq!(s.len(), 3);
        assert!(s.add_all_diff(&other).is_empty());
        assert!(!s.add(CsObjId(2)));
    }
}
