// SPDX-License-Identifier: BSD-3-Clause
use std::collections::VecDeque;
use std::fmt::Display;

/// A bounded sequence, most recent element first.
///
/// The bound is not part of the value: it is given to [`KLimited::pushed`]
/// and [`KLimited::truncated`], so that the empty sequence is unique.
#[derive(Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct KLimited<T> {
    elems: VecDeque<T>,
}

impl<T> KLimited<T> {
    pub fn empty() -> Self {
        KLimited {
            elems: VecDeque::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.elems.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elems.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.elems.iter()
    }
}

impl<T: Clone> KLimited<T> {
    /// `t` followed by at most `k - 1` elements of `self`.
    pub fn pushed(&self, t: T, k: usize) -> Self {
        if k == 0 {
            return KLimited::empty();
        }
        let mut elems = VecDeque::with_capacity(k);
        elems.push_back(t);
        elems.extend(self.elems.iter().take(k - 1).cloned());
        KLimited { elems }
    }

    /// The `k` most recent elements.
    pub fn truncated(&self, k: usize) -> Self {
        KLimited {
            elems: self.elems.iter().take(k).cloned().collect(),
        }
    }
}

impl<T: Display> Display for KLimited<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (i, e) in self.elems.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{e}")?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounded() {
        let e = KLimited::empty();
        let one = e.pushed(1, 2);
        let two = one.pushed(2, 2);
        let three = two.pushed(3, 2);
        assert_eq!(three.iter().copied().collect::<Vec<_>>(), vec![3, 2]);
        assert_eq!(three.truncated(1), KLimited::empty().pushed(3, 1));
        assert_eq!(three.truncated(0), KLimited::empty());
        assert_eq!(e.pushed(7, 0), KLimited::empty());
        assert_eq!(three.to_string(), "[3, 2]");
    }
}
