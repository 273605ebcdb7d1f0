// SPDX-License-Identifier: BSD-3-Clause
//! Reflection inference.
//!
//! [`ReflectionAnalysis`] is a [`Plugin`] modelling the reflection API
//! (`Class.forName`, `getMethod`, `Method.invoke` and friends). Calls to it
//! are tracked through the variables they read: whenever one of those gets
//! new objects, the call is reconsidered with the new objects and the
//! current sets of its other variables.
//!
//! Metaobjects whose target is not fully known are [`UJMethod`]s. Where the
//! receiver, the argument array or a cast of the result tells more about the
//! method, more specific descriptors are inferred and fed back into the
//! variable holding the metaobject.

use rustc_hash::FxHashMap;
use tracing::trace;

use crate::analysis::callgraph::{CallEdge, CallKind};
use crate::analysis::graph::FlowKind;
use crate::analysis::plugin::Plugin;
use crate::analysis::solver::Solver;
use crate::element::{ContextId, CsMethodId, CsObjId, CsVar};
use crate::error::Error;
use crate::heap::{MockDesc, MockValue, ObjId};
use crate::ir::{ClassId, Invoke, InvokeKind, Literal, MethodId, Stmt, StmtRef, VarId};
use crate::name::{self, Name};
use crate::pts::PointsToSet;

mod action;
mod infer;
mod meta;
mod ujmethod;

pub use ujmethod::UJMethod;

const STRING_COPY: &str = "<java.lang.String: void <init>(java.lang.String)>";

/// A modelled method of the reflection API.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
enum Api {
    ForName,
    GetMethod,
    GetMethods,
    GetDeclaredMethod,
    GetConstructor,
    GetDeclaredConstructor,
    GetField,
    GetDeclaredField,
    ClassNewInstance,
    ConstructorNewInstance,
    MethodInvoke,
    FieldGet,
    FieldSet,
    ArrayNewInstance,
}

/// A variable of an invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Slot {
    Base,
    Arg(usize),
}

impl Slot {
    fn var(self, invoke: &Invoke) -> Option<VarId> {
        match self {
            Slot::Base => invoke.base,
            Slot::Arg(i) => invoke.args.get(i).copied(),
        }
    }
}

const APIS: &[(&str, Api, &[Slot])] = &[
    (
        "<java.lang.Class: java.lang.Class forName(java.lang.String)>",
        Api::ForName,
        &[Slot::Arg(0)],
    ),
    (
        "<java.lang.Class: java.lang.Class forName(java.lang.String,boolean,java.lang.ClassLoader)>",
        Api::ForName,
        &[Slot::Arg(0)],
    ),
    (
        "<java.lang.Class: java.lang.reflect.Method getMethod(java.lang.String,java.lang.Class[])>",
        Api::GetMethod,
        &[Slot::Base, Slot::Arg(0)],
    ),
    (
        "<java.lang.Class: java.lang.reflect.Method[] getMethods()>",
        Api::GetMethods,
        &[Slot::Base],
    ),
    (
        "<java.lang.Class: java.lang.reflect.Method getDeclaredMethod(java.lang.String,java.lang.Class[])>",
        Api::GetDeclaredMethod,
        &[Slot::Base, Slot::Arg(0)],
    ),
    (
        "<java.lang.Class: java.lang.reflect.Constructor getConstructor(java.lang.Class[])>",
        Api::GetConstructor,
        &[Slot::Base],
    ),
    (
        "<java.lang.Class: java.lang.reflect.Constructor getDeclaredConstructor(java.lang.Class[])>",
        Api::GetDeclaredConstructor,
        &[Slot::Base],
    ),
    (
        "<java.lang.Class: java.lang.reflect.Field getField(java.lang.String)>",
        Api::GetField,
        &[Slot::Base, Slot::Arg(0)],
    ),
    (
        "<java.lang.Class: java.lang.reflect.Field getDeclaredField(java.lang.String)>",
        Api::GetDeclaredField,
        &[Slot::Base, Slot::Arg(0)],
    ),
    (
        "<java.lang.Class: java.lang.Object newInstance()>",
        Api::ClassNewInstance,
        &[Slot::Base],
    ),
    (
        "<java.lang.reflect.Constructor: java.lang.Object newInstance(java.lang.Object[])>",
        Api::ConstructorNewInstance,
        &[Slot::Base],
    ),
    (
        "<java.lang.reflect.Method: java.lang.Object invoke(java.lang.Object,java.lang.Object[])>",
        Api::MethodInvoke,
        &[Slot::Base, Slot::Arg(0), Slot::Arg(1)],
    ),
    (
        "<java.lang.reflect.Field: java.lang.Object get(java.lang.Object)>",
        Api::FieldGet,
        &[Slot::Base, Slot::Arg(0)],
    ),
    (
        "<java.lang.reflect.Field: void set(java.lang.Object,java.lang.Object)>",
        Api::FieldSet,
        &[Slot::Base, Slot::Arg(0)],
    ),
    (
        "<java.lang.reflect.Array: java.lang.Object newInstance(java.lang.Class,int)>",
        Api::ArrayNewInstance,
        &[Slot::Arg(0)],
    ),
];

/// An invocation of the reflection API, in the context of its caller.
#[derive(Clone, Copy)]
pub(super) struct ApiCall<'p> {
    pub(super) ctx: ContextId,
    pub(super) site: StmtRef,
    pub(super) invoke: &'p Invoke,
}

pub struct ReflectionAnalysis {
    apis: FxHashMap<&'static str, (Api, &'static [Slot])>,
    /// Invocations of the API reading each variable
    relevant: FxHashMap<VarId, Vec<(StmtRef, Api)>>,
    /// Reflective call edges by the variable holding their argument array
    reflective_args: FxHashMap<VarId, Vec<CallEdge>>,
}

impl Default for ReflectionAnalysis {
    fn default() -> Self {
        ReflectionAnalysis {
            apis: APIS
                .iter()
                .map(|&(sig, api, slots)| (sig, (api, slots)))
                .collect(),
            relevant: FxHashMap::default(),
            reflective_args: FxHashMap::default(),
        }
    }
}

impl ReflectionAnalysis {
    fn slots(&self, api: Api) -> &'static [Slot] {
        APIS.iter()
            .find(|(_, a, _)| *a == api)
            .map(|(_, _, slots)| *slots)
            .unwrap_or(&[])
    }

    fn handle(
        &mut self,
        solver: &mut Solver<'_>,
        api: Api,
        call: ApiCall<'_>,
        args: &[PointsToSet],
    ) -> Result<(), Error> {
        trace!("{:?} at {}", api, call.site);
        // No `_` pattern to ensure this is updated if the type changes
        match api {
            Api::ForName => meta::for_name(solver, call, &args[0]),
            Api::GetMethod => meta::get_method(solver, call, &args[0], &args[1]),
            Api::GetMethods => meta::get_methods(solver, call, &args[0]),
            Api::GetDeclaredMethod => meta::get_declared_method(solver, call, &args[0], &args[1]),
            Api::GetConstructor | Api::GetDeclaredConstructor => {
                meta::get_constructor(solver, call, &args[0])
            }
            Api::GetField => meta::get_field(solver, call, &args[0], &args[1], false),
            Api::GetDeclaredField => meta::get_field(solver, call, &args[0], &args[1], true),
            Api::ClassNewInstance => action::class_new_instance(solver, call, &args[0]),
            Api::ConstructorNewInstance => {
                action::constructor_new_instance(solver, call, &args[0])
            }
            Api::MethodInvoke => action::method_invoke(solver, call, &args[0], &args[1]),
            Api::FieldGet => action::field_get(solver, call, &args[0], &args[1]),
            Api::FieldSet => action::field_set(solver, call, &args[0], &args[1]),
            Api::ArrayNewInstance => action::array_new_instance(solver, call, &args[0]),
        }
    }

    fn register(&mut self, var: VarId, site: StmtRef, api: Api) {
        let entries = self.relevant.entry(var).or_default();
        if !entries.contains(&(site, api)) {
            entries.push((site, api));
        }
    }
}

impl Plugin for ReflectionAnalysis {
    fn on_new_method(&mut self, solver: &mut Solver<'_>, method: MethodId) -> Result<(), Error> {
        let program = solver.program();
        for (i, stmt) in program.method(method).stmts().iter().enumerate() {
            let Stmt::Invoke(invoke) = stmt else {
                continue;
            };
            let sig = invoke.method.to_string();
            let Some(&(api, slots)) = self.apis.get(sig.as_str()) else {
                continue;
            };
            let site = StmtRef::new(method, i);
            for slot in slots {
                if let Some(var) = slot.var(invoke) {
                    self.register(var, site, api);
                }
            }
        }
        Ok(())
    }

    fn on_new_cs_method(
        &mut self,
        solver: &mut Solver<'_>,
        method: CsMethodId,
    ) -> Result<(), Error> {
        let program = solver.program();
        let (ctx, method) = solver.cs_manager().cs_method(method);
        for (i, stmt) in program.method(method).stmts().iter().enumerate() {
            match stmt {
                Stmt::NewArray {
                    lhs,
                    ty,
                    length: Some(length),
                } => {
                    let Some(Literal::Int(len)) = program.var(*length).constant else {
                        continue;
                    };
                    if len < 0 {
                        continue;
                    }
                    let obj = solver.heap_mut().get_mock_obj(
                        MockDesc::ArrayLength,
                        MockValue::Int(len),
                        Some(StmtRef::new(method, i)),
                        ty.clone(),
                    );
                    let obj = solver.cs_obj(ContextId::EMPTY, obj);
                    solver.add_var_points_to(ctx, *lhs, obj);
                }
                Stmt::Invoke(invoke) if invoke.kind == InvokeKind::Special => {
                    if invoke.method.to_string() != STRING_COPY {
                        continue;
                    }
                    if let (Some(&arg), Some(base)) = (invoke.args.first(), invoke.base) {
                        let source = solver.cs_var(ctx, arg).pointer;
                        let target = solver.cs_var(ctx, base).pointer;
                        solver.add_pfg_edge(source, target, FlowKind::LocalAssign, None);
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn on_new_points_to_set(
        &mut self,
        solver: &mut Solver<'_>,
        var: CsVar,
        diff: &PointsToSet,
    ) -> Result<(), Error> {
        let program = solver.program();
        let entries = self.relevant.get(&var.var).cloned().unwrap_or_default();
        for (site, api) in entries {
            let invoke = program
                .invoke(site)
                .ok_or_else(|| Error::Invariant(format!("No invocation at {site}")))?;
            let args: Vec<PointsToSet> = self
                .slots(api)
                .iter()
                .map(|slot| match slot.var(invoke) {
                    Some(v) if v == var.var => diff.clone(),
                    Some(v) => solver.var_points_to(var.context, v).clone(),
                    None => PointsToSet::new(),
                })
                .collect();
            let call = ApiCall {
                ctx: var.context,
                site,
                invoke,
            };
            self.handle(solver, api, call, &args)?;
        }
        if let Some(edges) = self.reflective_args.get(&var.var) {
            for edge in edges.clone() {
                let (caller_ctx, _) = solver.cs_manager().cs_call_site(edge.call_site);
                if caller_ctx == var.context {
                    pass_args(solver, &edge, diff);
                }
            }
        }
        Ok(())
    }

    fn on_new_call_edge(&mut self, solver: &mut Solver<'_>, edge: &CallEdge) -> Result<(), Error> {
        if edge.kind != CallKind::Reflective {
            return Ok(());
        }
        let program = solver.program();
        let (caller_ctx, site) = solver.cs_manager().cs_call_site(edge.call_site);
        if let Some(args) = edge.args {
            let arrays = solver.var_points_to(caller_ctx, args).clone();
            pass_args(solver, edge, &arrays);
            self.reflective_args.entry(args).or_default().push(edge.clone());
        }
        let (callee_ctx, callee) = solver.cs_manager().cs_method(edge.callee);
        let m = program.method(callee);
        let result = program.invoke(site).and_then(|i| i.result);
        if let Some(result) = result {
            if name::is_reference(m.ret.as_str()) && !m.is_constructor() {
                let target = solver.cs_var(caller_ctx, result).pointer;
                for &ret in m.return_vars() {
                    let source = solver.cs_var(callee_ctx, ret).pointer;
                    solver.add_pfg_edge(source, target, FlowKind::Return, None);
                }
            }
        }
        Ok(())
    }
}

/// Passes the elements of the argument arrays of a reflective call to the
/// parameters of its callee. Any element may end up in any parameter whose
/// type admits it.
fn pass_args(solver: &mut Solver<'_>, edge: &CallEdge, arrays: &PointsToSet) {
    let program = solver.program();
    let (callee_ctx, callee) = solver.cs_manager().cs_method(edge.callee);
    let m = program.method(callee);
    for array in arrays.to_sorted_vec() {
        if name::element_type(solver.obj_type(array).as_str()).is_none() {
            continue;
        }
        let index = solver.cs_manager_mut().get_array_index(array);
        for (&param, ty) in m.param_vars().iter().zip(&m.params) {
            let target = solver.cs_var(callee_ctx, param).pointer;
            solver.add_typed_edge(index, target, FlowKind::ParameterPassing, ty);
        }
    }
}

/// Adds a reflective call from `site` to `callee`. Instance methods are
/// dispatched on `recv`, which must be an instance of the declaring class.
pub(super) fn add_reflective_call_edge(
    solver: &mut Solver<'_>,
    call: ApiCall<'_>,
    recv: Option<CsObjId>,
    callee: MethodId,
    args: Option<VarId>,
) {
    let program = solver.program();
    let m = program.method(callee);
    let (callee, recv) = if m.is_static {
        (callee, None)
    } else {
        let Some(recv) = recv else {
            return;
        };
        let declaring = &program.class(m.class).name;
        if !program.is_subtype(declaring.as_str(), solver.obj_type(recv).as_str()) {
            return;
        }
        let target = if m.is_constructor() {
            Some(callee)
        } else {
            program.dispatch(solver.obj_type(recv).as_str(), m.subsig)
        };
        match target {
            Some(target) => (target, Some(recv)),
            None => return,
        }
    };
    let callee_ctx = match recv {
        Some(recv) => solver.select_instance_context(call.ctx, call.site, recv),
        None => {
            solver.initialize_class(program.method(callee).class);
            solver.select_static_context(call.ctx, call.site)
        }
    };
    let csm = solver.cs_manager_mut();
    let cs_callee = csm.get_cs_method(callee_ctx, callee);
    let call_site = csm.get_cs_call_site(call.ctx, call.site);
    if let Some(recv) = recv {
        solver.bind_this(recv, cs_callee);
    }
    trace!("reflective call {} -> {}", call.site, program.method(callee));
    solver.add_call_edge(CallEdge {
        call_site,
        callee: cs_callee,
        kind: CallKind::Reflective,
        args,
    });
}

/// A mock object in the empty heap context.
pub(super) fn meta_obj(
    solver: &mut Solver<'_>,
    desc: MockDesc,
    value: MockValue,
    anchor: Option<StmtRef>,
    ty: &str,
) -> CsObjId {
    let obj = solver
        .heap_mut()
        .get_mock_obj(desc, value, anchor, Name::from(ty));
    solver.cs_obj(ContextId::EMPTY, obj)
}

/// An object of type `ty` created reflectively at the site of `call`.
pub(super) fn reflective_obj(solver: &mut Solver<'_>, call: ApiCall<'_>, ty: Name) -> CsObjId {
    let obj = solver.heap_mut().get_mock_obj(
        MockDesc::ReflectiveObj,
        MockValue::Empty,
        Some(call.site),
        ty,
    );
    let heap_ctx = solver.heap_context(call.ctx);
    solver.cs_obj(heap_ctx, obj)
}

pub(super) fn add_result(solver: &mut Solver<'_>, call: ApiCall<'_>, obj: CsObjId) {
    if let Some(result) = call.invoke.result {
        solver.add_var_points_to(call.ctx, result, obj);
    }
}

/// The class denoted by a class literal object, if the program has it.
pub(super) fn class_of(solver: &Solver<'_>, obj: CsObjId) -> Option<ClassId> {
    let id: ObjId = solver.cs_manager().obj(obj);
    let name = solver.heap().class_value(id)?;
    solver.program().class_by_name(name.as_str())
}

pub(super) fn mock_value<'a>(solver: &'a Solver<'_>, obj: CsObjId) -> Option<&'a MockValue> {
    let id = solver.cs_manager().obj(obj);
    solver.heap().mock(id).map(|m| &m.value)
}
