// SPDX-License-Identifier: BSD-3-Clause
//! Worklist fixpoint computing points-to sets and the call graph together.

use std::collections::VecDeque;

use rustc_hash::FxHashSet;
use tracing::{debug, trace, trace_span};

use crate::analysis::callgraph::{CallEdge, CallGraph, CallKind};
use crate::analysis::count;
use crate::analysis::graph::{FlowKind, PointerFlowGraph};
use crate::analysis::plugin::Plugin;
use crate::analysis::Options;
use crate::context::ContextSelector;
use crate::element::{CSManager, ContextId, CsMethodId, CsObjId, CsVar, Pointer, PointerId};
use crate::error::Error;
use crate::heap::{HeapModel, ObjId};
use crate::ir::{ClassId, Invoke, InvokeKind, Literal, Program, Stmt, StmtRef, VarId};
use crate::name::{self, Name};
use crate::pts::PointsToSet;

#[derive(Debug)]
enum WorkItem {
    Points(PointerId, PointsToSet),
    Call(CallEdge),
    InitClass(ClassId),
}

pub struct Solver<'p> {
    program: &'p Program,
    selector: ContextSelector,
    max_iterations: Option<usize>,
    heap: HeapModel,
    csm: CSManager,
    pfg: PointerFlowGraph,
    call_graph: CallGraph,
    worklist: VecDeque<WorkItem>,
    plugins: Vec<Box<dyn Plugin + 'p>>,
    in_callback: bool,
    initialized: FxHashSet<ClassId>,
    iterations: usize,
    empty: PointsToSet,
}

/// Everything the solver computed.
pub(crate) struct Parts {
    pub(crate) selector: ContextSelector,
    pub(crate) heap: HeapModel,
    pub(crate) csm: CSManager,
    pub(crate) pfg: PointerFlowGraph,
    pub(crate) call_graph: CallGraph,
    pub(crate) iterations: usize,
}

impl<'p> Solver<'p> {
    pub fn new(program: &'p Program, options: &Options) -> Result<Self, Error> {
        let selector = options.validate()?;
        Ok(Solver {
            program,
            selector,
            max_iterations: options.max_iterations,
            heap: HeapModel::new(options.merge_policy()),
            csm: CSManager::default(),
            pfg: PointerFlowGraph::default(),
            call_graph: CallGraph::default(),
            worklist: VecDeque::new(),
            plugins: Vec::new(),
            in_callback: false,
            initialized: FxHashSet::default(),
            iterations: 0,
            empty: PointsToSet::new(),
        })
    }

    pub fn add_plugin(&mut self, plugin: Box<dyn Plugin + 'p>) {
        self.plugins.push(plugin);
    }

    // ------------------------------------------------------------------
    // Queries

    #[inline]
    pub fn program(&self) -> &'p Program {
        self.program
    }

    #[inline]
    pub fn selector(&self) -> ContextSelector {
        self.selector
    }

    #[inline]
    pub fn heap(&self) -> &HeapModel {
        &self.heap
    }

    #[inline]
    pub fn heap_mut(&mut self) -> &mut HeapModel {
        &mut self.heap
    }

    #[inline]
    pub fn cs_manager(&self) -> &CSManager {
        &self.csm
    }

    #[inline]
    pub fn cs_manager_mut(&mut self) -> &mut CSManager {
        &mut self.csm
    }

    #[inline]
    pub fn call_graph(&self) -> &CallGraph {
        &self.call_graph
    }

    pub fn cs_var(&mut self, ctx: ContextId, var: VarId) -> CsVar {
        self.csm.get_cs_var(ctx, var)
    }

    pub fn cs_obj(&mut self, heap_ctx: ContextId, obj: ObjId) -> CsObjId {
        self.csm.get_cs_obj(heap_ctx, obj)
    }

    /// Callee context of a static call at `site`.
    pub fn select_static_context(&mut self, caller: ContextId, site: StmtRef) -> ContextId {
        self.selector.select_static(&mut self.csm, caller, site)
    }

    /// Callee context of an instance call at `site` on `recv`.
    pub fn select_instance_context(
        &mut self,
        caller: ContextId,
        site: StmtRef,
        recv: CsObjId,
    ) -> ContextId {
        self.selector
            .select_instance(&mut self.csm, &self.heap, self.program, caller, site, recv)
    }

    /// Heap context of objects allocated by a method running in `ctx`.
    pub fn heap_context(&mut self, ctx: ContextId) -> ContextId {
        self.selector.select_heap(&mut self.csm, ctx)
    }

    pub fn points_to(&self, p: PointerId) -> &PointsToSet {
        self.pfg.points_to(p)
    }

    /// The current set of `var` in `ctx`, without creating its pointer.
    pub fn var_points_to(&self, ctx: ContextId, var: VarId) -> &PointsToSet {
        match self.csm.lookup_pointer(Pointer::Var(ctx, var)) {
            Some(p) => self.pfg.points_to(p),
            None => &self.empty,
        }
    }

    pub fn obj_type(&self, obj: CsObjId) -> &Name {
        self.heap.type_of(self.csm.obj(obj))
    }

    /// Whether a location of type `ty` may hold `obj`. Types the program
    /// never mentions admit everything.
    pub fn admits(&self, ty: &Name, obj: CsObjId) -> bool {
        let program = self.program;
        let obj_ty = self.obj_type(obj);
        program.is_subtype(ty.as_str(), obj_ty.as_str())
            || (name::element_type(ty.as_str()).is_none()
                && !name::is_primitive(ty.as_str())
                && program.class_by_name(ty.as_str()).is_none())
    }

    /// The objects of `pts` admitted by at least one of `filter`.
    fn filtered(&self, pts: &PointsToSet, filter: Option<&[Name]>) -> PointsToSet {
        match filter {
            None => pts.clone(),
            Some(tys) => pts
                .iter()
                .filter(|&o| tys.iter().any(|ty| self.admits(ty, o)))
                .collect(),
        }
    }

    // ------------------------------------------------------------------
    // Work. Nothing here runs plugins, so plugins may call all of it.

    pub fn add_points_to(&mut self, p: PointerId, pts: PointsToSet) {
        if !pts.is_empty() {
            self.worklist.push_back(WorkItem::Points(p, pts));
        }
    }

    pub fn add_var_points_to(&mut self, ctx: ContextId, var: VarId, obj: CsObjId) {
        let v = self.csm.get_cs_var(ctx, var);
        self.add_points_to(v.pointer, PointsToSet::singleton(obj));
    }

    /// Adds an edge to the pointer flow graph. A new or widened edge
    /// immediately schedules the current set of `source`, as admitted by
    /// `filter`, for `target`.
    pub fn add_pfg_edge(
        &mut self,
        source: PointerId,
        target: PointerId,
        kind: FlowKind,
        filter: Option<Name>,
    ) {
        if self.pfg.add_edge(source, target, kind, filter.clone()) {
            let filter = filter.as_ref().map(std::slice::from_ref);
            let pts = self.filtered(self.pfg.points_to(source), filter);
            self.add_points_to(target, pts);
        }
    }

    /// Flow from a variable into a location of type `ty`. Does nothing for
    /// primitive locations.
    pub fn add_typed_edge(&mut self, source: PointerId, target: PointerId, kind: FlowKind, ty: &Name) {
        if name::is_reference(ty.as_str()) {
            self.add_pfg_edge(source, target, kind, Some(ty.clone()));
        }
    }

    pub fn add_call_edge(&mut self, edge: CallEdge) {
        self.worklist.push_back(WorkItem::Call(edge));
    }

    pub fn initialize_class(&mut self, class: ClassId) {
        if !self.initialized.contains(&class) {
            self.worklist.push_back(WorkItem::InitClass(class));
        }
    }

    /// Binds `recv` to the `this` variable of `callee`.
    pub fn bind_this(&mut self, recv: CsObjId, callee: CsMethodId) {
        let (ctx, method) = self.csm.cs_method(callee);
        if let Some(this) = self.program.method(method).this_var() {
            self.add_var_points_to(ctx, this, recv);
        }
    }

    // ------------------------------------------------------------------
    // Fixpoint

    fn emit<F>(&mut self, mut f: F) -> Result<(), Error>
    where
        F: FnMut(&mut (dyn Plugin + 'p), &mut Solver<'p>) -> Result<(), Error>,
    {
        if self.in_callback {
            return Err(Error::Invariant(
                "plugin event raised during a plugin callback".to_string(),
            ));
        }
        if self.plugins.is_empty() {
            return Ok(());
        }
        let mut plugins = std::mem::take(&mut self.plugins);
        self.in_callback = true;
        let mut result = Ok(());
        for plugin in plugins.iter_mut() {
            result = f(plugin.as_mut(), self);
            if result.is_err() {
                break;
            }
        }
        self.in_callback = false;
        self.plugins = plugins;
        result
    }

    /// Runs the analysis to its fixpoint.
    pub fn solve(&mut self) -> Result<(), Error> {
        let span = trace_span!("solve");
        let _span = span.enter();
        self.start()?;
        self.run()?;
        self.emit(|p, s| p.on_finish(s))?;
        self.run()?;
        debug!(
            iterations = self.iterations,
            objects = self.heap.len(),
            pointers = self.csm.pointer_count(),
            methods = self.call_graph.reachable_methods().len(),
            call_edges = self.call_graph.edge_count(),
            "solved"
        );
        Ok(())
    }

    fn start(&mut self) -> Result<(), Error> {
        self.emit(|p, s| p.on_start(s))?;
        let program = self.program;
        for &entry in program.entries() {
            let m = program.method(entry);
            let cs_method = self.csm.get_cs_method(ContextId::EMPTY, entry);
            self.call_graph.add_entry(cs_method);
            self.initialize_class(m.class);
            for (&param, ty) in m.param_vars().iter().zip(&m.params) {
                if name::element_type(ty.as_str()) == Some(name::STRING) {
                    let args = self.heap.main_args();
                    let elem = self.heap.main_args_elem();
                    let args = self.csm.get_cs_obj(ContextId::EMPTY, args);
                    let elem = self.csm.get_cs_obj(ContextId::EMPTY, elem);
                    let index = self.csm.get_array_index(args);
                    self.add_points_to(index, PointsToSet::singleton(elem));
                    self.add_var_points_to(ContextId::EMPTY, param, args);
                }
            }
            self.add_reachable(cs_method)?;
        }
        Ok(())
    }

    fn run(&mut self) -> Result<(), Error> {
        while let Some(item) = self.worklist.pop_front() {
            self.iterations += 1;
            if let Some(max) = self.max_iterations {
                if self.iterations > max {
                    return Err(Error::IterationLimit(max));
                }
            }
            match item {
                WorkItem::Points(p, pts) => {
                    count("points_to");
                    self.process_points_to(p, pts)?;
                }
                WorkItem::Call(edge) => {
                    count("call_edge");
                    self.process_call_edge(edge)?;
                }
                WorkItem::InitClass(class) => {
                    count("init_class");
                    self.process_init_class(class)?;
                }
            }
        }
        Ok(())
    }

    fn process_points_to(&mut self, p: PointerId, pts: PointsToSet) -> Result<(), Error> {
        let diff = self.pfg.merge(p, &pts);
        if diff.is_empty() {
            return Ok(());
        }
        let var = match self.csm.pointer(p) {
            Pointer::Var(context, var) => Some(CsVar {
                pointer: p,
                context,
                var,
            }),
            Pointer::InstanceField(..) | Pointer::StaticField(_) | Pointer::ArrayIndex(_) => None,
        };
        if let Some(v) = var {
            self.emit(|plugin, s| plugin.on_new_points_to_set(s, v, &diff))?;
        }
        let flows: Vec<(PointerId, PointsToSet)> = self
            .pfg
            .out_edges(p)
            .iter()
            .map(|e| (e.target, self.filtered(&diff, e.filter.as_deref())))
            .collect();
        for (target, flow) in flows {
            self.add_points_to(target, flow);
        }
        if let Some(v) = var {
            self.process_var(v, &diff)?;
        }
        Ok(())
    }

    /// Field and array accesses and instance calls through `v`, for the new
    /// objects in `diff`.
    fn process_var(&mut self, v: CsVar, diff: &PointsToSet) -> Result<(), Error> {
        let program = self.program;
        let uses = program.uses(v.var);
        let ctx = v.context;
        for obj in diff.to_sorted_vec() {
            for &(field, rhs) in &uses.stores {
                let source = self.csm.get_cs_var(ctx, rhs).pointer;
                let target = self.csm.get_instance_field(obj, field);
                self.add_typed_edge(source, target, FlowKind::InstanceStore, &program.field(field).ty);
            }
            for &(lhs, field) in &uses.loads {
                let source = self.csm.get_instance_field(obj, field);
                let target = self.csm.get_cs_var(ctx, lhs).pointer;
                self.add_pfg_edge(source, target, FlowKind::InstanceLoad, None);
            }
            let elem = name::element_type(self.obj_type(obj).as_str()).map(Name::from);
            if let Some(elem) = elem {
                for &rhs in &uses.array_stores {
                    let source = self.csm.get_cs_var(ctx, rhs).pointer;
                    let target = self.csm.get_array_index(obj);
                    self.add_typed_edge(source, target, FlowKind::ArrayStore, &elem);
                }
                for &lhs in &uses.array_loads {
                    let source = self.csm.get_array_index(obj);
                    let target = self.csm.get_cs_var(ctx, lhs).pointer;
                    self.add_pfg_edge(source, target, FlowKind::ArrayLoad, None);
                }
            }
            for &site in &uses.invokes {
                self.process_instance_call(ctx, obj, site)?;
            }
        }
        Ok(())
    }

    fn process_instance_call(
        &mut self,
        ctx: ContextId,
        recv: CsObjId,
        site: StmtRef,
    ) -> Result<(), Error> {
        let program = self.program;
        let invoke = program
            .invoke(site)
            .ok_or_else(|| Error::Invariant(format!("No invocation at {site}")))?;
        let callee = match invoke.kind {
            InvokeKind::Special => program.resolve_method(invoke),
            InvokeKind::Virtual | InvokeKind::Interface => {
                program.dispatch(self.obj_type(recv).as_str(), invoke.subsig)
            }
            InvokeKind::Static => None,
        };
        match callee.filter(|m| !program.method(*m).is_static) {
            Some(callee) => {
                let callee_ctx = self.select_instance_context(ctx, site, recv);
                let callee = self.csm.get_cs_method(callee_ctx, callee);
                let call_site = self.csm.get_cs_call_site(ctx, site);
                self.bind_this(recv, callee);
                self.add_call_edge(CallEdge {
                    call_site,
                    callee,
                    kind: invoke.kind.into(),
                    args: None,
                });
            }
            None => {
                trace!(
                    "unresolved call to {} on {}",
                    invoke.method,
                    self.heap.obj(self.csm.obj(recv))
                );
                self.emit(|p, s| p.on_unresolved_call(s, recv, ctx, site))?;
            }
        }
        Ok(())
    }

    fn process_static_call(&mut self, ctx: ContextId, site: StmtRef, invoke: &Invoke) {
        let program = self.program;
        let Some(callee) = program.resolve_method(invoke) else {
            trace!("unresolved static call to {}", invoke.method);
            return;
        };
        self.initialize_class(program.method(callee).class);
        let callee_ctx = self.select_static_context(ctx, site);
        let callee = self.csm.get_cs_method(callee_ctx, callee);
        let call_site = self.csm.get_cs_call_site(ctx, site);
        self.add_call_edge(CallEdge {
            call_site,
            callee,
            kind: CallKind::Static,
            args: None,
        });
    }

    fn process_call_edge(&mut self, edge: CallEdge) -> Result<(), Error> {
        if !self.call_graph.add_edge(edge.clone()) {
            return Ok(());
        }
        self.add_reachable(edge.callee)?;
        if edge.kind != CallKind::Reflective {
            let program = self.program;
            let (caller_ctx, site) = self.csm.cs_call_site(edge.call_site);
            let (callee_ctx, callee) = self.csm.cs_method(edge.callee);
            let invoke = program
                .invoke(site)
                .ok_or_else(|| Error::Invariant(format!("No invocation at {site}")))?;
            let m = program.method(callee);
            for ((&arg, &param), ty) in invoke.args.iter().zip(m.param_vars()).zip(&m.params) {
                let source = self.csm.get_cs_var(caller_ctx, arg).pointer;
                let target = self.csm.get_cs_var(callee_ctx, param).pointer;
                self.add_typed_edge(source, target, FlowKind::ParameterPassing, ty);
            }
            if let Some(result) = invoke.result {
                if name::is_reference(m.ret.as_str()) {
                    let target = self.csm.get_cs_var(caller_ctx, result).pointer;
                    for &ret in m.return_vars() {
                        let source = self.csm.get_cs_var(callee_ctx, ret).pointer;
                        self.add_pfg_edge(source, target, FlowKind::Return, None);
                    }
                }
            }
        }
        self.emit(|p, s| p.on_new_call_edge(s, &edge))
    }

    fn process_init_class(&mut self, class: ClassId) -> Result<(), Error> {
        if !self.initialized.insert(class) {
            return Ok(());
        }
        let c = self.program.class(class);
        if let Some(superclass) = c.superclass {
            self.process_init_class(superclass)?;
        }
        if let Some(clinit) = c.clinit {
            trace!("initializing {}", c.name);
            let cs_method = self.csm.get_cs_method(ContextId::EMPTY, clinit);
            self.add_reachable(cs_method)?;
        }
        Ok(())
    }

    fn allocate(&mut self, heap_ctx: ContextId, obj: ObjId, ctx: ContextId, lhs: VarId) {
        let obj = self.csm.get_cs_obj(heap_ctx, obj);
        self.add_var_points_to(ctx, lhs, obj);
    }

    fn add_reachable(&mut self, cs_method: CsMethodId) -> Result<(), Error> {
        let (ctx, method) = self.csm.cs_method(cs_method);
        let (new_cs_method, new_method) = self.call_graph.add_reachable(cs_method, method);
        if !new_cs_method {
            return Ok(());
        }
        let program = self.program;
        let m = program.method(method);
        trace!("reachable {} in {}", m, self.csm.context(ctx));
        if new_method {
            self.emit(|p, s| p.on_new_method(s, method))?;
        }
        self.emit(|p, s| p.on_new_cs_method(s, cs_method))?;

        let heap_ctx = self.heap_context(ctx);
        for (i, stmt) in m.stmts().iter().enumerate() {
            let site = StmtRef::new(method, i);
            match stmt {
                Stmt::New { lhs, ty } => {
                    if let Some(class) = program.class_by_name(ty.as_str()) {
                        self.initialize_class(class);
                    }
                    let obj = self.heap.get_obj(site, ty, program);
                    self.allocate(heap_ctx, obj, ctx, *lhs);
                }
                Stmt::NewArray { lhs, ty, .. } => {
                    let obj = self.heap.get_obj(site, ty, program);
                    self.allocate(heap_ctx, obj, ctx, *lhs);
                }
                Stmt::Literal { lhs, value } => {
                    let obj = match value {
                        Literal::String(s) => self.heap.string_constant(s),
                        Literal::Class(c) => self.heap.class_constant(c),
                        Literal::Null | Literal::Int(_) => continue,
                    };
                    self.allocate(ContextId::EMPTY, obj, ctx, *lhs);
                }
                Stmt::Copy { lhs, rhs } => {
                    let source = self.csm.get_cs_var(ctx, *rhs).pointer;
                    let target = self.csm.get_cs_var(ctx, *lhs).pointer;
                    self.add_pfg_edge(source, target, FlowKind::LocalAssign, None);
                }
                Stmt::Cast { lhs, rhs, ty } => {
                    let source = self.csm.get_cs_var(ctx, *rhs).pointer;
                    let target = self.csm.get_cs_var(ctx, *lhs).pointer;
                    self.add_typed_edge(source, target, FlowKind::Cast, ty);
                }
                Stmt::LoadStatic { lhs, field } => {
                    self.initialize_class(program.field(*field).class);
                    let source = self.csm.get_static_field(*field);
                    let target = self.csm.get_cs_var(ctx, *lhs).pointer;
                    self.add_pfg_edge(source, target, FlowKind::StaticLoad, None);
                }
                Stmt::StoreStatic { field, rhs } => {
                    let f = program.field(*field);
                    self.initialize_class(f.class);
                    let source = self.csm.get_cs_var(ctx, *rhs).pointer;
                    let target = self.csm.get_static_field(*field);
                    self.add_typed_edge(source, target, FlowKind::StaticStore, &f.ty);
                }
                Stmt::Invoke(invoke) if invoke.kind == InvokeKind::Static => {
                    self.process_static_call(ctx, site, invoke);
                }
                // Handled as the base variable gets objects
                Stmt::Load { .. }
                | Stmt::Store { .. }
                | Stmt::LoadArray { .. }
                | Stmt::StoreArray { .. }
                | Stmt::Invoke(_)
                | Stmt::Return { .. } => {}
            }
        }
        Ok(())
    }

    pub(crate) fn into_parts(self) -> Parts {
        Parts {
            selector: self.selector,
            heap: self.heap,
            csm: self.csm,
            pfg: self.pfg,
            call_graph: self.call_graph,
            iterations: self.iterations,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use serde_json::json;

    use super::*;
    use crate::ir::testing::{method, program, var};

    fn chain() -> Program {
        program(json!({
            "classes": [
                {"name": "Box",
                 "fields": [{"name": "val", "type": "java.lang.Object"}],
                 "methods": [
                    {"name": "<init>", "body": [{"op": "return"}]},
                    {"name": "set", "params": ["java.lang.Object"], "param-names": ["v"],
                     "body": [
                        {"op": "store", "base": "this", "field": "<Box: java.lang.Object val>", "rhs": "v"},
                        {"op": "return"}
                     ]},
                    {"name": "get", "ret": "java.lang.Object",
                     "vars": {"r": "java.lang.Object"},
                     "body": [
                        {"op": "load", "lhs": "r", "base": "this", "field": "<Box: java.lang.Object val>"},
                        {"op": "return", "value": "r"}
                     ]}
                 ]},
                {"name": "Main",
                 "fields": [{"name": "g", "type": "java.lang.Object", "static": true}],
                 "methods": [
                    {"name": "<clinit>", "vars": {"o": "java.lang.Object"}, "body": [
                        {"op": "new", "lhs": "o", "type": "java.lang.Object"},
                        {"op": "store-static", "field": "<Main: java.lang.Object g>", "rhs": "o"},
                        {"op": "return"}
                    ]},
                    {"name": "main", "static": true, "params": ["java.lang.String[]"],
                     "param-names": ["args"],
                     "vars": {"b": "Box", "o": "java.lang.Object", "r": "java.lang.Object",
                              "s": "java.lang.String"},
                     "body": [
                        {"op": "new", "lhs": "b", "type": "Box"},
                        {"op": "invoke", "kind": "special", "method": "<Box: void <init>()>", "base": "b"},
                        {"op": "load-static", "lhs": "o", "field": "<Main: java.lang.Object g>"},
                        {"op": "invoke", "kind": "virtual", "method": "<Box: void set(java.lang.Object)>",
                         "base": "b", "args": ["o"]},
                        {"op": "invoke", "kind": "virtual", "method": "<Box: java.lang.Object get()>",
                         "base": "b", "result": "r"},
                        {"op": "load-array", "lhs": "s", "base": "args"},
                        {"op": "return"}
                     ]}
                 ]}
            ]
        }))
    }

    fn solve(p: &Program) -> Solver<'_> {
        let mut solver = Solver::new(p, &Options::default()).unwrap();
        solver.solve().unwrap();
        solver
    }

    fn objs(s: &Solver<'_>, v: VarId) -> Vec<String> {
        let mut out: Vec<String> = s
            .var_points_to(ContextId::EMPTY, v)
            .iter()
            .map(|o| s.heap().obj(s.cs_manager().obj(o)).to_string())
            .collect();
        out.sort();
        out
    }

    #[test]
    fn fields_calls_and_statics() {
        let p = chain();
        let s = solve(&p);
        let main = "<Main: void main(java.lang.String[])>";
        let r = var(&p, main, "r");
        let o = var(&p, main, "o");
        assert_eq!(objs(&s, r), objs(&s, o));
        assert_eq!(objs(&s, r).len(), 1);
        assert!(s
            .call_graph()
            .is_method_reachable(method(&p, "<Main: void <clinit>()>")));
        assert!(s
            .call_graph()
            .is_method_reachable(method(&p, "<Box: java.lang.Object get()>")));
        assert_eq!(objs(&s, var(&p, main, "s")), vec!["MainArgsElem[]: java.lang.String"]);
    }

    #[test]
    fn iteration_limit() {
        let p = chain();
        let opts = Options {
            max_iterations: Some(3),
            ..Options::default()
        };
        let mut solver = Solver::new(&p, &opts).unwrap();
        assert_eq!(solver.solve(), Err(Error::IterationLimit(3)));
    }

    #[derive(Default)]
    struct Events(Vec<String>);

    struct Recorder(Rc<RefCell<Events>>);

    impl Plugin for Recorder {
        fn on_new_method(&mut self, solver: &mut Solver<'_>, method: crate::ir::MethodId) -> Result<(), Error> {
            let m = solver.program().method(method);
            self.0.borrow_mut().0.push(format!("method {}", m.name));
            Ok(())
        }

        fn on_new_call_edge(&mut self, solver: &mut Solver<'_>, edge: &CallEdge) -> Result<(), Error> {
            let (_, callee) = solver.cs_manager().cs_method(edge.callee);
            let m = solver.program().method(callee);
            self.0.borrow_mut().0.push(format!("edge {}", m.name));
            Ok(())
        }

        fn on_unresolved_call(
            &mut self,
            solver: &mut Solver<'_>,
            recv: CsObjId,
            _context: ContextId,
            site: StmtRef,
        ) -> Result<(), Error> {
            let ty = solver.obj_type(recv).to_string();
            self.0.borrow_mut().0.push(format!("unresolved {site} on {ty}"));
            Ok(())
        }

        fn on_finish(&mut self, _solver: &mut Solver<'_>) -> Result<(), Error> {
            self.0.borrow_mut().0.push("finish".to_string());
            Ok(())
        }
    }

    #[test]
    fn plugin_events() {
        let p = chain();
        let events = Rc::new(RefCell::new(Events::default()));
        let mut solver = Solver::new(&p, &Options::default()).unwrap();
        solver.add_plugin(Box::new(Recorder(events.clone())));
        solver.solve().unwrap();
        let events = &events.borrow().0;
        assert_eq!(events.first().map(String::as_str), Some("method main"));
        assert_eq!(events.last().map(String::as_str), Some("finish"));
        // The method is reachable before the edge into it is reported
        let method = events.iter().position(|e| e == "method get").unwrap();
        let edge = events.iter().position(|e| e == "edge get").unwrap();
        assert!(method < edge);
        assert_eq!(events.iter().filter(|e| *e == "method <clinit>").count(), 1);
    }

    #[test]
    fn unresolved_calls() {
        // Blob implements Shape without defining area()
        let p = program(json!({
            "classes": [
                {"name": "Shape", "interface": true, "methods": [
                    {"name": "area", "ret": "int", "abstract": true}
                ]},
                {"name": "Blob", "interfaces": ["Shape"], "methods": [
                    {"name": "<init>", "body": [{"op": "return"}]}
                ]},
                {"name": "Main", "methods": [
                    {"name": "main", "static": true, "params": ["java.lang.String[]"],
                     "param-names": ["args"],
                     "vars": {"s": "Shape", "n": "int"},
                     "body": [
                        {"op": "new", "lhs": "s", "type": "Blob"},
                        {"op": "invoke", "kind": "special", "method": "<Blob: void <init>()>", "base": "s"},
                        {"op": "invoke", "kind": "interface", "method": "<Shape: int area()>",
                         "base": "s", "result": "n"},
                        {"op": "return"}
                     ]}
                ]}
            ]
        }));
        let events = Rc::new(RefCell::new(Events::default()));
        let mut solver = Solver::new(&p, &Options::default()).unwrap();
        solver.add_plugin(Box::new(Recorder(events.clone())));
        solver.solve().unwrap();
        let events = &events.borrow().0;
        let unresolved: Vec<&String> =
            events.iter().filter(|e| e.starts_with("unresolved")).collect();
        assert_eq!(unresolved.len(), 1, "{events:#?}");
        assert!(unresolved[0].ends_with("on Blob"));
        assert!(!events.iter().any(|e| e == "edge area"));
    }

    struct Failing;

    impl Plugin for Failing {
        fn on_start(&mut self, _solver: &mut Solver<'_>) -> Result<(), Error> {
            Err(Error::Plugin("nope".to_string()))
        }
    }

    #[test]
    fn plugin_errors_abort() {
        let p = chain();
        let mut solver = Solver::new(&p, &Options::default()).unwrap();
        solver.add_plugin(Box::new(Failing));
        assert_eq!(solver.solve(), Err(Error::Plugin("nope".to_string())));
    }
}
