// SPDX-License-Identifier: BSD-3-Clause
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;

use tracing::trace_span;

use crate::analysis::callgraph::{CallGraph, CallKind};
use crate::analysis::graph::PointerFlowGraph;
use crate::analysis::plugin::Plugin;
use crate::analysis::reflection::ReflectionAnalysis;
use crate::analysis::solver::Solver;
use crate::analysis::Options;
use crate::context::ContextSelector;
use crate::element::{CSManager, ContextId, Pointer};
use crate::error::Error;
use crate::heap::{HeapModel, ObjId};
use crate::ir::{FieldId, InvokeKind, MethodId, Program, Stmt, StmtRef, VarId};
use crate::pts::PointsToSet;

/// Metrics about the precision of the points-to analysis. Lower is better.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct Metrics {
    /// Number of callgraph edges with contexts removed, that is, pairs of an
    /// invocation statement and a possible callee. A more precise analysis
    /// resolves virtual and reflective calls more accurately, leading to a
    /// smaller callgraph.
    pub callgraph_size: usize,
    /// Number of reachable methods.
    pub reachable_methods: usize,
    /// Virtual and interface call sites with more than one callee.
    pub poly_call_sites: usize,
    /// Reachable instance call sites without any callee. Either the receiver
    /// points to nothing or dispatch failed.
    pub unresolved_call_sites: usize,
    /// Casts where some object reaching the operand is not an instance of the
    /// target type. Unless the program really throws `ClassCastException`,
    /// this reflects an imprecision in the analysis.
    pub may_fail_casts: usize,
    /// Sum of the sizes of the context-insensitive points-to sets of all
    /// variables.
    pub var_points_to_size: usize,
}

/// Outcome of the analysis.
pub struct PointerAnalysis<'p> {
    program: &'p Program,
    selector: ContextSelector,
    heap: HeapModel,
    csm: CSManager,
    pfg: PointerFlowGraph,
    call_graph: CallGraph,
    iterations: usize,
    metrics: Option<Metrics>,
    empty: PointsToSet,
}

#[derive(Debug, serde::Serialize)]
pub struct ReportEdge {
    pub site: String,
    pub caller: String,
    pub callee: String,
    pub kind: CallKind,
}

/// Context-insensitive summary of the results, for printing.
#[derive(Debug, serde::Serialize)]
pub struct Report {
    pub context: String,
    pub reachable: Vec<String>,
    pub call_edges: Vec<ReportEdge>,
    pub var_points_to: BTreeMap<String, Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Metrics>,
}

pub fn analysis<'p>(program: &'p Program, opts: &Options) -> Result<PointerAnalysis<'p>, Error> {
    analysis_with(program, opts, Vec::new())
}

/// Runs the analysis with additional plugins, which see events after the
/// built-in ones.
pub fn analysis_with<'p>(
    program: &'p Program,
    opts: &Options,
    plugins: Vec<Box<dyn Plugin + 'p>>,
) -> Result<PointerAnalysis<'p>, Error> {
    let span = trace_span!("pointer");
    let _span = span.enter();

    let mut solver = Solver::new(program, opts)?;
    if opts.reflection {
        solver.add_plugin(Box::new(ReflectionAnalysis::default()));
    }
    for plugin in plugins {
        solver.add_plugin(plugin);
    }
    solver.solve()?;

    let parts = solver.into_parts();
    let mut out = PointerAnalysis {
        program,
        selector: parts.selector,
        heap: parts.heap,
        csm: parts.csm,
        pfg: parts.pfg,
        call_graph: parts.call_graph,
        iterations: parts.iterations,
        metrics: None,
        empty: PointsToSet::new(),
    };
    if opts.metrics {
        out.metrics = Some(out.compute_metrics());
    }
    if opts.debug {
        eprintln!("{}", out.summary());
    }
    Ok(out)
}

impl<'p> PointerAnalysis<'p> {
    #[inline]
    pub fn program(&self) -> &'p Program {
        self.program
    }

    #[inline]
    pub fn heap(&self) -> &HeapModel {
        &self.heap
    }

    #[inline]
    pub fn cs_manager(&self) -> &CSManager {
        &self.csm
    }

    #[inline]
    pub fn call_graph(&self) -> &CallGraph {
        &self.call_graph
    }

    pub fn metrics(&self) -> Option<&Metrics> {
        self.metrics.as_ref()
    }

    /// The set of `var` in context `ctx`.
    pub fn points_to(&self, ctx: ContextId, var: VarId) -> &PointsToSet {
        match self.csm.lookup_pointer(Pointer::Var(ctx, var)) {
            Some(p) => self.pfg.points_to(p),
            None => &self.empty,
        }
    }

    fn project<'a>(&'a self, pointers: impl Iterator<Item = Pointer> + 'a) -> BTreeSet<ObjId> {
        pointers
            .filter_map(|p| self.csm.lookup_pointer(p))
            .flat_map(|p| self.pfg.points_to(p).iter())
            .map(|o| self.csm.obj(o))
            .collect()
    }

    /// Objects `var` may point to in any context.
    pub fn var_points_to(&self, var: VarId) -> BTreeSet<ObjId> {
        self.csm
            .var_pointers(var)
            .iter()
            .flat_map(|&p| self.pfg.points_to(p).iter())
            .map(|o| self.csm.obj(o))
            .collect()
    }

    /// Objects `field` of `obj` may point to, in any heap context of `obj`.
    pub fn field_points_to(&self, obj: ObjId, field: FieldId) -> BTreeSet<ObjId> {
        let pointers: Vec<Pointer> = self
            .csm
            .pointers()
            .filter_map(|(_, p)| match p {
                Pointer::InstanceField(o, f) if f == field && self.csm.obj(o) == obj => Some(p),
                _ => None,
            })
            .collect();
        self.project(pointers.into_iter())
    }

    pub fn static_field_points_to(&self, field: FieldId) -> BTreeSet<ObjId> {
        self.project(std::iter::once(Pointer::StaticField(field)))
    }

    /// Objects stored in the array `obj`, in any heap context.
    pub fn array_points_to(&self, obj: ObjId) -> BTreeSet<ObjId> {
        let pointers: Vec<Pointer> = self
            .csm
            .pointers()
            .filter_map(|(_, p)| match p {
                Pointer::ArrayIndex(o) if self.csm.obj(o) == obj => Some(p),
                _ => None,
            })
            .collect();
        self.project(pointers.into_iter())
    }

    /// In the order they became reachable.
    pub fn reachable_methods(&self) -> &[MethodId] {
        self.call_graph.reachable_methods()
    }

    #[inline]
    pub fn is_reachable(&self, method: MethodId) -> bool {
        self.call_graph.is_method_reachable(method)
    }

    /// Call edges with contexts removed.
    pub fn call_edges(&self) -> BTreeSet<(StmtRef, MethodId, CallKind)> {
        self.call_graph.context_insensitive(&self.csm)
    }

    /// Methods the invocation at `site` may call, in any context.
    pub fn callees(&self, site: StmtRef) -> BTreeSet<MethodId> {
        self.call_graph
            .edges()
            .filter(|e| self.csm.cs_call_site(e.call_site).1 == site)
            .map(|e| self.csm.cs_method(e.callee).1)
            .collect()
    }

    pub fn obj_string(&self, obj: ObjId) -> String {
        self.heap.obj(obj).to_string()
    }

    fn compute_metrics(&self) -> Metrics {
        let program = self.program;
        let mut callees: BTreeMap<StmtRef, usize> = BTreeMap::new();
        let edges = self.call_edges();
        for (site, _, kind) in &edges {
            if *kind != CallKind::Reflective {
                *callees.entry(*site).or_default() += 1;
            }
        }
        let mut metrics = Metrics {
            callgraph_size: edges.len(),
            reachable_methods: self.reachable_methods().len(),
            ..Metrics::default()
        };
        for &m in self.reachable_methods() {
            for (i, stmt) in program.method(m).stmts().iter().enumerate() {
                match stmt {
                    Stmt::Invoke(invoke) if invoke.kind != InvokeKind::Static => {
                        let n = callees
                            .get(&StmtRef::new(m, i))
                            .copied()
                            .unwrap_or_default();
                        if n == 0 {
                            metrics.unresolved_call_sites += 1;
                        } else if n > 1 && invoke.kind != InvokeKind::Special {
                            metrics.poly_call_sites += 1;
                        }
                    }
                    Stmt::Cast { rhs, ty, .. } => {
                        let fails = self.var_points_to(*rhs).into_iter().any(|o| {
                            !program.is_subtype(ty.as_str(), self.heap.type_of(o).as_str())
                        });
                        if fails {
                            metrics.may_fail_casts += 1;
                        }
                    }
                    _ => {}
                }
            }
        }
        metrics.var_points_to_size = program
            .vars()
            .iter()
            .map(|v| self.var_points_to(v.id).len())
            .sum();
        metrics
    }

    pub fn report(&self) -> Report {
        let program = self.program;
        let reachable = self
            .reachable_methods()
            .iter()
            .map(|&m| program.method(m).to_string())
            .collect();
        let call_edges = self
            .call_edges()
            .into_iter()
            .map(|(site, callee, kind)| ReportEdge {
                site: site.to_string(),
                caller: program.method(site.method).to_string(),
                callee: program.method(callee).to_string(),
                kind,
            })
            .collect();
        let mut var_points_to = BTreeMap::new();
        for v in program.vars() {
            let pts = self.var_points_to(v.id);
            if !pts.is_empty() {
                var_points_to.insert(
                    program.describe_var(v.id),
                    pts.into_iter().map(|o| self.obj_string(o)).collect(),
                );
            }
        }
        Report {
            context: self.selector.to_string(),
            reachable,
            call_edges,
            var_points_to,
            metrics: self.metrics.clone(),
        }
    }

    /// Sizes of the results, as printed with `debug`.
    pub fn summary(&self) -> String {
        let mut s = String::new();
        let _ = writeln!(s, "context selector: {}", self.selector);
        let _ = writeln!(s, "worklist entries: {}", self.iterations);
        let _ = writeln!(s, "objects: {}", self.heap.len());
        let _ = writeln!(s, "contexts: {}", self.csm.context_count());
        let _ = writeln!(s, "cs objects: {}", self.csm.cs_obj_count());
        let _ = writeln!(s, "pointers: {}", self.csm.pointer_count());
        let _ = writeln!(s, "pointer flow edges: {}", self.pfg.edge_count());
        let _ = writeln!(s, "cs methods: {}", self.csm.cs_method_count());
        let _ = writeln!(
            s,
            "reachable methods: {}",
            self.call_graph.reachable_methods().len()
        );
        let _ = write!(s, "call edges: {}", self.call_graph.edge_count());
        s
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::ir::testing::{method, program, var};

    fn shapes() -> Program {
        program(json!({
            "classes": [
                {"name": "Shape", "abstract": true, "methods": [
                    {"name": "<init>", "body": [{"op": "return"}]},
                    {"name": "self", "ret": "Shape", "abstract": true}
                ]},
                {"name": "Square", "super": "Shape", "methods": [
                    {"name": "<init>", "body": [{"op": "return"}]},
                    {"name": "self", "ret": "Shape", "body": [{"op": "return", "value": "this"}]}
                ]},
                {"name": "Circle", "super": "Shape", "methods": [
                    {"name": "<init>", "body": [{"op": "return"}]},
                    {"name": "self", "ret": "Shape", "body": [{"op": "return", "value": "this"}]}
                ]},
                {"name": "Main", "methods": [
                    {"name": "id", "static": true, "params": ["Shape"], "param-names": ["s"],
                     "ret": "Shape", "body": [{"op": "return", "value": "s"}]},
                    {"name": "main", "static": true, "params": ["java.lang.String[]"],
                     "param-names": ["args"],
                     "vars": {"a": "Shape", "b": "Shape", "x": "Shape", "y": "Shape",
                              "z": "Shape", "q": "Square"},
                     "body": [
                        {"op": "new", "lhs": "a", "type": "Square"},
                        {"op": "new", "lhs": "b", "type": "Circle"},
                        {"op": "invoke", "kind": "static", "method": "<Main: Shape id(Shape)>",
                         "args": ["a"], "result": "x"},
                        {"op": "invoke", "kind": "static", "method": "<Main: Shape id(Shape)>",
                         "args": ["b"], "result": "y"},
                        {"op": "invoke", "kind": "virtual", "method": "<Shape: Shape self()>",
                         "base": "x", "result": "z"},
                        {"op": "cast", "lhs": "q", "rhs": "z", "type": "Square"},
                        {"op": "return"}
                     ]}
                ]}
            ]
        }))
    }

    fn run<'p>(p: &'p Program, context: &str) -> PointerAnalysis<'p> {
        let opts = Options {
            context: context.to_string(),
            metrics: true,
            ..Options::default()
        };
        analysis(p, &opts).unwrap()
    }

    #[test]
    fn insensitive() {
        let p = shapes();
        let out = run(&p, "ci");
        let main = "<Main: void main(java.lang.String[])>";
        // Both calls to `id` share one context
        assert_eq!(out.var_points_to(var(&p, main, "x")).len(), 2);
        assert_eq!(out.var_points_to(var(&p, main, "q")).len(), 1);
        let m = out.metrics().unwrap();
        assert_eq!(m.poly_call_sites, 1);
        assert_eq!(m.may_fail_casts, 1);
        assert!(out.is_reachable(method(&p, "<Circle: Shape self()>")));
    }

    #[test]
    fn call_site_sensitive() {
        let p = shapes();
        let out = run(&p, "1-call");
        let main = "<Main: void main(java.lang.String[])>";
        let x = out.var_points_to(var(&p, main, "x"));
        let y = out.var_points_to(var(&p, main, "y"));
        assert_eq!(x.len(), 1);
        assert!(x.is_disjoint(&y));
        let m = out.metrics().unwrap();
        assert_eq!(m.poly_call_sites, 0);
        assert_eq!(m.may_fail_casts, 0);
        assert!(!out.is_reachable(method(&p, "<Circle: Shape self()>")));
        let site = StmtRef::new(method(&p, main), 4);
        assert_eq!(
            out.callees(site).into_iter().collect::<Vec<_>>(),
            vec![method(&p, "<Square: Shape self()>")]
        );
    }

    #[test]
    fn report() {
        let p = shapes();
        let out = run(&p, "ci");
        let report = out.report();
        assert_eq!(report.context, "ci");
        assert_eq!(report.reachable[0], "<Main: void main(java.lang.String[])>");
        let json = serde_json::to_value(&report).unwrap();
        assert!(json["metrics"]["callgraph_size"].as_u64().unwrap() >= 4);
    }
}
