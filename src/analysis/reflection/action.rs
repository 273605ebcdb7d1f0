// SPDX-License-Identifier: BSD-3-Clause
//! Calls acting through metaobjects: reflective instantiation, invocation
//! and field access.

use std::collections::BTreeSet;

use super::infer::{self, InvokeFacts};
use super::{
    add_reflective_call_edge, add_result, class_of, meta_obj, mock_value, reflective_obj,
    ApiCall,
};
use crate::analysis::graph::FlowKind;
use crate::analysis::solver::Solver;
use crate::error::Error;
use crate::heap::{MockDesc, MockValue};
use crate::ir::MethodId;
use crate::name::{self, Name};
use crate::pts::PointsToSet;

/// `Class.newInstance()`: an instance of each class with a no-argument
/// constructor, which is called.
pub(super) fn class_new_instance(
    solver: &mut Solver<'_>,
    call: ApiCall<'_>,
    classes: &PointsToSet,
) -> Result<(), Error> {
    let program = solver.program();
    for class in classes.to_sorted_vec() {
        let Some(class) = class_of(solver, class) else {
            continue;
        };
        let c = program.class(class);
        if c.is_interface || c.is_abstract {
            continue;
        }
        let Some(init) = program
            .declared_methods(class, name::INIT)
            .find(|&m| program.method(m).params.is_empty())
        else {
            continue;
        };
        solver.initialize_class(class);
        let obj = reflective_obj(solver, call, c.name.clone());
        add_result(solver, call, obj);
        add_reflective_call_edge(solver, call, Some(obj), init, None);
    }
    Ok(())
}

/// `Constructor.newInstance(args)`
pub(super) fn constructor_new_instance(
    solver: &mut Solver<'_>,
    call: ApiCall<'_>,
    constructors: &PointsToSet,
) -> Result<(), Error> {
    let program = solver.program();
    for ctor in constructors.to_sorted_vec() {
        let Some(&MockValue::Member(init)) = mock_value(solver, ctor) else {
            continue;
        };
        let m = program.method(init);
        let c = program.class(m.class);
        if !m.is_constructor() || c.is_abstract {
            continue;
        }
        solver.initialize_class(m.class);
        let obj = reflective_obj(solver, call, c.name.clone());
        add_result(solver, call, obj);
        add_reflective_call_edge(solver, call, Some(obj), init, call.invoke.args.first().copied());
    }
    Ok(())
}

fn add_invoke_edges(
    solver: &mut Solver<'_>,
    call: ApiCall<'_>,
    target: MethodId,
    recvs: &PointsToSet,
) {
    let args = call.invoke.args.get(1).copied();
    if solver.program().method(target).is_static {
        add_reflective_call_edge(solver, call, None, target, args);
    } else {
        for recv in recvs.to_sorted_vec() {
            add_reflective_call_edge(solver, call, Some(recv), target, args);
        }
    }
}

/// `Method.invoke(recv, args)`: calls the methods the metaobjects stand for
/// on each receiver, and infers more specific metaobjects for those that
/// are not resolvable yet.
pub(super) fn method_invoke(
    solver: &mut Solver<'_>,
    call: ApiCall<'_>,
    methods: &PointsToSet,
    recvs: &PointsToSet,
) -> Result<(), Error> {
    let program = solver.program();
    let length = match call.invoke.args.get(1) {
        Some(&args) => infer::array_length(solver, call.ctx, args)?,
        None => None,
    };
    let mut facts: Option<InvokeFacts> = None;
    let mut inferred = BTreeSet::new();
    for m in methods.to_sorted_vec() {
        match mock_value(solver, m).cloned() {
            Some(MockValue::Member(target)) => {
                if !program.method(target).is_constructor() {
                    add_invoke_edges(solver, call, target, recvs);
                }
            }
            Some(MockValue::Method(uj)) if uj.is_resolvable() => {
                for target in infer::candidates(program, &uj, length) {
                    add_invoke_edges(solver, call, target, recvs);
                }
            }
            Some(MockValue::Method(uj)) => {
                let facts =
                    facts.get_or_insert_with(|| InvokeFacts::new(program, call.invoke, length));
                let recv_types: Vec<Name> = recvs
                    .to_sorted_vec()
                    .into_iter()
                    .map(|r| solver.obj_type(r).clone())
                    .collect();
                inferred.extend(infer::refine(program, &uj, &recv_types, facts));
            }
            _ => {}
        }
    }
    let Some(base) = call.invoke.base else {
        return Ok(());
    };
    for uj in inferred {
        let obj = meta_obj(
            solver,
            MockDesc::ReflectionMetaObj,
            MockValue::Method(uj),
            Some(call.site),
            name::METHOD,
        );
        solver.add_var_points_to(call.ctx, base, obj);
    }
    Ok(())
}

/// `Field.get(obj)`
pub(super) fn field_get(
    solver: &mut Solver<'_>,
    call: ApiCall<'_>,
    fields: &PointsToSet,
    bases: &PointsToSet,
) -> Result<(), Error> {
    let Some(result) = call.invoke.result else {
        return Ok(());
    };
    let program = solver.program();
    let target = solver.cs_var(call.ctx, result).pointer;
    for f in fields.to_sorted_vec() {
        let Some(&MockValue::Field(field)) = mock_value(solver, f) else {
            continue;
        };
        let fd = program.field(field);
        if fd.is_static {
            solver.initialize_class(fd.class);
            let source = solver.cs_manager_mut().get_static_field(field);
            solver.add_pfg_edge(source, target, FlowKind::StaticLoad, None);
            continue;
        }
        let declaring = &program.class(fd.class).name;
        for base in bases.to_sorted_vec() {
            if program.is_subtype(declaring.as_str(), solver.obj_type(base).as_str()) {
                let source = solver.cs_manager_mut().get_instance_field(base, field);
                solver.add_pfg_edge(source, target, FlowKind::InstanceLoad, None);
            }
        }
    }
    Ok(())
}

/// `Field.set(obj, value)`
pub(super) fn field_set(
    solver: &mut Solver<'_>,
    call: ApiCall<'_>,
    fields: &PointsToSet,
    bases: &PointsToSet,
) -> Result<(), Error> {
    let Some(&value) = call.invoke.args.get(1) else {
        return Ok(());
    };
    let program = solver.program();
    let source = solver.cs_var(call.ctx, value).pointer;
    for f in fields.to_sorted_vec() {
        let Some(&MockValue::Field(field)) = mock_value(solver, f) else {
            continue;
        };
        let fd = program.field(field);
        if fd.is_static {
            solver.initialize_class(fd.class);
            let target = solver.cs_manager_mut().get_static_field(field);
            solver.add_typed_edge(source, target, FlowKind::StaticStore, &fd.ty);
            continue;
        }
        let declaring = &program.class(fd.class).name;
        for base in bases.to_sorted_vec() {
            if program.is_subtype(declaring.as_str(), solver.obj_type(base).as_str()) {
                let target = solver.cs_manager_mut().get_instance_field(base, field);
                solver.add_typed_edge(source, target, FlowKind::InstanceStore, &fd.ty);
            }
        }
    }
    Ok(())
}

/// `Array.newInstance(class, length)`
pub(super) fn array_new_instance(
    solver: &mut Solver<'_>,
    call: ApiCall<'_>,
    classes: &PointsToSet,
) -> Result<(), Error> {
    for class in classes.to_sorted_vec() {
        let elem = solver
            .heap()
            .class_value(solver.cs_manager().obj(class))
            .cloned();
        let Some(elem) = elem else {
            continue;
        };
        if elem == name::VOID || elem == name::UNKNOWN_CLASS {
            continue;
        }
        let obj = reflective_obj(solver, call, elem.array_of());
        add_result(solver, call, obj);
    }
    Ok(())
}
