// SPDX-License-Identifier: BSD-3-Clause
//! Pointer flow graph.

use rustc_hash::FxHashMap;

use crate::element::PointerId;
use crate::name::Name;
use crate::pts::PointsToSet;

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, serde::Serialize)]
pub enum FlowKind {
    LocalAssign,
    Cast,
    InstanceLoad,
    InstanceStore,
    ArrayLoad,
    ArrayStore,
    StaticLoad,
    StaticStore,
    ParameterPassing,
    Return,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PointerFlowEdge {
    pub source: PointerId,
    pub target: PointerId,
    pub kind: FlowKind,
    /// Only objects assignable to one of these types flow along the edge.
    /// `None` lets everything through.
    pub filter: Option<Vec<Name>>,
}

impl PointerFlowEdge {
    /// Whether the edge lets through what a filter of `ty` does.
    fn covers(&self, ty: Option<&Name>) -> bool {
        match (&self.filter, ty) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(tys), Some(ty)) => tys.contains(ty),
        }
    }
}

#[derive(Debug, Default)]
struct Node {
    pts: PointsToSet,
    out: Vec<PointerFlowEdge>,
}

#[derive(Debug, Default)]
pub struct PointerFlowGraph {
    nodes: Vec<Node>,
    /// Position of each edge among the out-edges of its source
    edges: FxHashMap<(PointerId, PointerId, FlowKind), usize>,
    empty: PointsToSet,
}

impl PointerFlowGraph {
    fn node_mut(&mut self, p: PointerId) -> &mut Node {
        if p.index() >= self.nodes.len() {
            self.nodes.resize_with(p.index() + 1, Node::default);
        }
        &mut self.nodes[p.index()]
    }

    /// Returns whether the edge now lets through objects that it did not
    /// before. Edges are identified by source, target and kind; adding one
    /// again with another filter widens the existing edge.
    pub fn add_edge(
        &mut self,
        source: PointerId,
        target: PointerId,
        kind: FlowKind,
        filter: Option<Name>,
    ) -> bool {
        if let Some(&i) = self.edges.get(&(source, target, kind)) {
            let edge = &mut self.node_mut(source).out[i];
            if edge.covers(filter.as_ref()) {
                return false;
            }
            match (&mut edge.filter, filter) {
                (Some(tys), Some(ty)) => tys.push(ty),
                (f, None) => *f = None,
                (None, Some(_)) => {}
            }
            return true;
        }
        let out = &mut self.node_mut(source).out;
        let i = out.len();
        out.push(PointerFlowEdge {
            source,
            target,
            kind,
            filter: filter.map(|ty| vec![ty]),
        });
        self.edges.insert((source, target, kind), i);
        true
    }

    pub fn out_edges(&self, p: PointerId) -> &[PointerFlowEdge] {
        self.nodes
            .get(p.index())
            .map(|n| n.out.as_slice())
            .unwrap_or(&[])
    }

    pub fn points_to(&self, p: PointerId) -> &PointsToSet {
        self.nodes.get(p.index()).map(|n| &n.pts).unwrap_or(&self.empty)
    }

    /// Adds `pts` to the set of `p`, returning the objects that were new.
    pub fn merge(&mut self, p: PointerId, pts: &PointsToSet) -> PointsToSet {
        self.node_mut(p).pts.add_all_diff(pts)
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}
