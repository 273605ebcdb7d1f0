// SPDX-License-Identifier: BSD-3-Clause
//! Callgraph, discovered on the fly by the solver.

use std::collections::BTreeSet;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::element::{CSManager, CsCallSiteId, CsMethodId};
use crate::ir::{InvokeKind, MethodId, StmtRef, VarId};

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, serde::Serialize)]
pub enum CallKind {
    Static,
    Special,
    Virtual,
    Interface,
    /// Calls through `Method.invoke`, `Class.newInstance` and the like
    Reflective,
}

impl From<InvokeKind> for CallKind {
    fn from(kind: InvokeKind) -> Self {
        match kind {
            InvokeKind::Static => CallKind::Static,
            InvokeKind::Special => CallKind::Special,
            InvokeKind::Virtual => CallKind::Virtual,
            InvokeKind::Interface => CallKind::Interface,
        }
    }
}

impl std::fmt::Display for CallKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallKind::Static => write!(f, "static"),
            CallKind::Special => write!(f, "special"),
            CallKind::Virtual => write!(f, "virtual"),
            CallKind::Interface => write!(f, "interface"),
            CallKind::Reflective => write!(f, "reflective"),
        }
    }
}

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct CallEdge {
    pub call_site: CsCallSiteId,
    pub callee: CsMethodId,
    pub kind: CallKind,
    /// For reflective calls, the variable holding the argument array
    pub args: Option<VarId>,
}

#[derive(Debug, Default)]
pub struct CallGraph {
    entries: Vec<CsMethodId>,
    reachable: FxHashSet<CsMethodId>,
    reachable_methods: FxHashSet<MethodId>,
    /// Methods in the order they became reachable
    method_order: Vec<MethodId>,
    edges: FxHashSet<(CsCallSiteId, CsMethodId, CallKind)>,
    by_call_site: FxHashMap<CsCallSiteId, Vec<CallEdge>>,
    by_callee: FxHashMap<CsMethodId, Vec<CallEdge>>,
}

impl CallGraph {
    pub fn add_entry(&mut self, entry: CsMethodId) {
        if !self.entries.contains(&entry) {
            self.entries.push(entry);
        }
    }

    pub fn entries(&self) -> &[CsMethodId] {
        &self.entries
    }

    /// Returns whether the context-sensitive method, and the method in any
    /// context, are newly reachable.
    pub fn add_reachable(&mut self, cs_method: CsMethodId, method: MethodId) -> (bool, bool) {
        if !self.reachable.insert(cs_method) {
            return (false, false);
        }
        let new_method = self.reachable_methods.insert(method);
        if new_method {
            self.method_order.push(method);
        }
        (true, new_method)
    }

    /// Returns whether the edge is new. Edges are identified by call site,
    /// callee and kind.
    pub fn add_edge(&mut self, edge: CallEdge) -> bool {
        if !self.edges.insert((edge.call_site, edge.callee, edge.kind)) {
            return false;
        }
        self.by_call_site
            .entry(edge.call_site)
            .or_default()
            .push(edge.clone());
        self.by_callee.entry(edge.callee).or_default().push(edge);
        true
    }

    #[inline]
    pub fn is_reachable(&self, cs_method: CsMethodId) -> bool {
        self.reachable.contains(&cs_method)
    }

    #[inline]
    pub fn is_method_reachable(&self, method: MethodId) -> bool {
        self.reachable_methods.contains(&method)
    }

    pub fn reachable_cs_methods(&self) -> impl Iterator<Item = CsMethodId> + '_ {
        self.reachable.iter().copied()
    }

    pub fn reachable_methods(&self) -> &[MethodId] {
        &self.method_order
    }

    pub fn edges_out_of(&self, call_site: CsCallSiteId) -> &[CallEdge] {
        self.by_call_site
            .get(&call_site)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn edges_into(&self, callee: CsMethodId) -> &[CallEdge] {
        self.by_callee.get(&callee).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn edges(&self) -> impl Iterator<Item = &CallEdge> + '_ {
        self.by_call_site.values().flatten()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Call edges with contexts removed.
    pub fn context_insensitive(&self, csm: &CSManager) -> BTreeSet<(StmtRef, MethodId, CallKind)> {
        self.edges()
            .map(|e| {
                let (_, site) = csm.cs_call_site(e.call_site);
                let (_, callee) = csm.cs_method(e.callee);
                (site, callee, e.kind)
            })
            .collect()
    }
}
