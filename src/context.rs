// SPDX-License-Identifier: BSD-3-Clause
//! Calling and heap contexts.

use std::fmt::Display;
use std::str::FromStr;

use crate::element::{CSManager, ContextId, CsObjId};
use crate::error::Error;
use crate::heap::{HeapModel, ObjId};
use crate::ir::{Program, StmtRef};
use crate::klimited::KLimited;
use crate::name::Name;

#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum ContextElem {
    CallSite(StmtRef),
    Obj(ObjId),
    Type(Name),
}

impl Display for ContextElem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContextElem::CallSite(s) => write!(f, "{s}"),
            ContextElem::Obj(o) => write!(f, "o{}", o.index()),
            ContextElem::Type(t) => write!(f, "{t}"),
        }
    }
}

pub type Context = KLimited<ContextElem>;

/// How callee and heap contexts are chosen.
///
/// `k` bounds method contexts, `hk` (at most `k`) bounds heap contexts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ContextSelector {
    #[default]
    Insensitive,
    CallSite { k: usize, hk: usize },
    Object { k: usize, hk: usize },
    Type { k: usize, hk: usize },
}

/// Parses `ci`, `<k>-call`, `<k>-obj` and `<k>-type`, optionally followed by
/// `:<hk>`. The heap depth defaults to `k - 1`.
impl FromStr for ContextSelector {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || Error::Config(format!("Unknown context selector: {s}"));
        if s == "ci" {
            return Ok(ContextSelector::Insensitive);
        }
        let (sel, hk) = match s.split_once(':') {
            Some((sel, hk)) => (sel, Some(hk.parse::<usize>().map_err(|_| bad())?)),
            None => (s, None),
        };
        let (k, kind) = sel.split_once('-').ok_or_else(bad)?;
        let k = k.parse::<usize>().map_err(|_| bad())?;
        if k == 0 {
            return Err(Error::Config(format!(
                "Context depth must be positive in {s}, use `ci` for no contexts"
            )));
        }
        let hk = hk.unwrap_or(k - 1);
        if hk > k {
            return Err(Error::Config(format!(
                "Heap context depth {hk} exceeds method context depth {k}"
            )));
        }
        match kind {
            "call" => Ok(ContextSelector::CallSite { k, hk }),
            "obj" => Ok(ContextSelector::Object { k, hk }),
            "type" => Ok(ContextSelector::Type { k, hk }),
            _ => Err(bad()),
        }
    }
}

impl Display for ContextSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContextSelector::Insensitive => write!(f, "ci"),
            ContextSelector::CallSite { k, hk } => write!(f, "{k}-call:{hk}"),
            ContextSelector::Object { k, hk } => write!(f, "{k}-obj:{hk}"),
            ContextSelector::Type { k, hk } => write!(f, "{k}-type:{hk}"),
        }
    }
}

impl ContextSelector {
    fn push(csm: &mut CSManager, ctx: ContextId, elem: ContextElem, k: usize) -> ContextId {
        let ctx = csm.context(ctx).pushed(elem, k);
        csm.get_context(ctx)
    }

    /// Context of the callee of a static call.
    pub fn select_static(&self, csm: &mut CSManager, caller: ContextId, site: StmtRef) -> ContextId {
        match *self {
            ContextSelector::Insensitive => ContextId::EMPTY,
            ContextSelector::CallSite { k, .. } => {
                Self::push(csm, caller, ContextElem::CallSite(site), k)
            }
            ContextSelector::Object { .. } | ContextSelector::Type { .. } => caller,
        }
    }

    /// Context of the callee of an instance call on `recv`.
    pub fn select_instance(
        &self,
        csm: &mut CSManager,
        heap: &HeapModel,
        program: &Program,
        caller: ContextId,
        site: StmtRef,
        recv: CsObjId,
    ) -> ContextId {
        match *self {
            ContextSelector::Insensitive => ContextId::EMPTY,
            ContextSelector::CallSite { k, .. } => {
                Self::push(csm, caller, ContextElem::CallSite(site), k)
            }
            ContextSelector::Object { k, .. } => {
                let (hctx, obj) = csm.cs_obj(recv);
                Self::push(csm, hctx, ContextElem::Obj(obj), k)
            }
            ContextSelector::Type { k, .. } => {
                let (hctx, obj) = csm.cs_obj(recv);
                let ty = heap.container_type(obj, program);
                Self::push(csm, hctx, ContextElem::Type(ty), k)
            }
        }
    }

    /// Heap context for objects allocated in a method running in `ctx`.
    pub fn select_heap(&self, csm: &mut CSManager, ctx: ContextId) -> ContextId {
        match *self {
            ContextSelector::Insensitive => ContextId::EMPTY,
            ContextSelector::CallSite { hk, .. }
            | ContextSelector::Object { hk, .. }
            | ContextSelector::Type { hk, .. } => {
                let ctx = csm.context(ctx).truncated(hk);
                csm.get_context(ctx)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::MethodId;

    #[test]
    fn parse() {
        assert_eq!("ci".parse::<ContextSelector>().unwrap(), ContextSelector::Insensitive);
        assert_eq!(
            "2-obj".parse::<ContextSelector>().unwrap(),
            ContextSelector::Object { k: 2, hk: 1 }
        );
        assert_eq!(
            "1-call:1".parse::<ContextSelector>().unwrap(),
            ContextSelector::CallSite { k: 1, hk: 1 }
        );
        assert_eq!(
            "3-type:0".parse::<ContextSelector>().unwrap().to_string(),
            "3-type:0"
        );
        assert!("2-obj:3".parse::<ContextSelector>().is_err());
        assert!("0-call".parse::<ContextSelector>().is_err());
        assert!("2-site".parse::<ContextSelector>().is_err());
        assert!("fancy".parse::<ContextSelector>().is_err());
    }

    #[test]
    fn call_site_contexts() {
        let mut csm = CSManager::default();
        let sel = ContextSelector::CallSite { k: 2, hk: 1 };
        let m = MethodId(0);
        let c1 = sel.select_static(&mut csm, ContextId::EMPTY, StmtRef::new(m, 1));
        let c2 = sel.select_static(&mut csm, c1, StmtRef::new(m, 2));
        let c3 = sel.select_static(&mut csm, c2, StmtRef::new(m, 3));
        assert_eq!(csm.context(c3).len(), 2);
        assert_ne!(c2, c3);
        // Same call string, same context
        assert_eq!(sel.select_static(&mut csm, ContextId::EMPTY, StmtRef::new(m, 1)), c1);
        let h = sel.select_heap(&mut csm, c3);
        assert_eq!(csm.context(h).len(), 1);
        assert_eq!(
            ContextSelector::Insensitive.select_static(&mut csm, c3, StmtRef::new(m, 4)),
            ContextId::EMPTY
        );
    }
}
