// SPDX-License-Identifier: BSD-3-Clause
//! Calls producing metaobjects: class literals, methods, constructors and
//! fields.

use tracing::debug;

use super::{add_result, class_of, meta_obj, ApiCall, UJMethod};
use crate::analysis::solver::Solver;
use crate::element::{ContextId, CsObjId};
use crate::error::Error;
use crate::heap::{MockDesc, MockValue};
use crate::ir::ClassId;
use crate::name::{self, Name};
use crate::pts::PointsToSet;

/// `Class.forName(name)`: initializes the named class and returns its class
/// literal. Names that are not constants give the unknown class literal.
pub(super) fn for_name(
    solver: &mut Solver<'_>,
    call: ApiCall<'_>,
    names: &PointsToSet,
) -> Result<(), Error> {
    let program = solver.program();
    for obj in names.to_sorted_vec() {
        let value = solver.heap().string_value(solver.cs_manager().obj(obj)).cloned();
        let class_name = match value {
            None => Name::from(name::UNKNOWN_CLASS),
            Some(s) => match program.class_by_name(s.as_str()) {
                Some(class) => {
                    solver.initialize_class(class);
                    s
                }
                None => {
                    debug!("Class.forName of missing class {s} at {}", call.site);
                    continue;
                }
            },
        };
        let literal = solver.heap_mut().class_constant(&class_name);
        let literal = solver.cs_obj(ContextId::EMPTY, literal);
        add_result(solver, call, literal);
    }
    Ok(())
}

/// The declaring class of a descriptor built from a class literal.
fn known_class(solver: &Solver<'_>, obj: CsObjId) -> Option<Name> {
    class_of(solver, obj).map(|c| solver.program().class(c).name.clone())
}

/// `Class.getMethod(name, ..)`: one descriptor per class and name, with
/// whatever parts of them are constants.
pub(super) fn get_method(
    solver: &mut Solver<'_>,
    call: ApiCall<'_>,
    classes: &PointsToSet,
    names: &PointsToSet,
) -> Result<(), Error> {
    if call.invoke.result.is_none() {
        return Ok(());
    }
    for class in classes.to_sorted_vec() {
        let declaring = known_class(solver, class);
        for name_obj in names.to_sorted_vec() {
            let name = solver
                .heap()
                .string_value(solver.cs_manager().obj(name_obj))
                .cloned();
            let uj = UJMethod::new(declaring.clone(), None, name, None);
            let obj = meta_obj(
                solver,
                MockDesc::ReflectionMetaObj,
                MockValue::Method(uj),
                Some(call.site),
                name::METHOD,
            );
            add_result(solver, call, obj);
        }
    }
    Ok(())
}

/// `Class.getMethods()`: an array holding a descriptor standing for all
/// methods of the class.
pub(super) fn get_methods(
    solver: &mut Solver<'_>,
    call: ApiCall<'_>,
    classes: &PointsToSet,
) -> Result<(), Error> {
    if call.invoke.result.is_none() {
        return Ok(());
    }
    for class in classes.to_sorted_vec() {
        let Some(declaring) = known_class(solver, class) else {
            continue;
        };
        let array = meta_obj(
            solver,
            MockDesc::MethodsArray,
            MockValue::Empty,
            Some(call.site),
            &format!("{}[]", name::METHOD),
        );
        let uj = UJMethod::new(Some(declaring), None, None, None).with_in_methods();
        let elem = meta_obj(
            solver,
            MockDesc::ReflectionMetaObj,
            MockValue::Method(uj),
            Some(call.site),
            name::METHOD,
        );
        let index = solver.cs_manager_mut().get_array_index(array);
        solver.add_points_to(index, PointsToSet::singleton(elem));
        add_result(solver, call, array);
    }
    Ok(())
}

fn add_members(
    solver: &mut Solver<'_>,
    call: ApiCall<'_>,
    class: ClassId,
    name: &str,
    ty: &str,
) {
    let program = solver.program();
    for m in program.declared_methods(class, name) {
        let obj = meta_obj(
            solver,
            MockDesc::ReflectionMetaObj,
            MockValue::Member(m),
            None,
            ty,
        );
        add_result(solver, call, obj);
    }
}

/// `Class.getDeclaredMethod(name, ..)`: the methods of that name declared in
/// the class.
pub(super) fn get_declared_method(
    solver: &mut Solver<'_>,
    call: ApiCall<'_>,
    classes: &PointsToSet,
    names: &PointsToSet,
) -> Result<(), Error> {
    if call.invoke.result.is_none() {
        return Ok(());
    }
    for class in classes.to_sorted_vec() {
        let Some(class) = class_of(solver, class) else {
            continue;
        };
        for name_obj in names.to_sorted_vec() {
            let name = solver
                .heap()
                .string_value(solver.cs_manager().obj(name_obj))
                .cloned();
            if let Some(name) = name {
                add_members(solver, call, class, name.as_str(), name::METHOD);
            }
        }
    }
    Ok(())
}

/// `Class.getConstructor(..)` and `Class.getDeclaredConstructor(..)`
pub(super) fn get_constructor(
    solver: &mut Solver<'_>,
    call: ApiCall<'_>,
    classes: &PointsToSet,
) -> Result<(), Error> {
    if call.invoke.result.is_none() {
        return Ok(());
    }
    for class in classes.to_sorted_vec() {
        if let Some(class) = class_of(solver, class) {
            add_members(solver, call, class, name::INIT, name::CONSTRUCTOR);
        }
    }
    Ok(())
}

/// `Class.getField(name)` looks in superclasses too,
/// `Class.getDeclaredField(name)` does not.
pub(super) fn get_field(
    solver: &mut Solver<'_>,
    call: ApiCall<'_>,
    classes: &PointsToSet,
    names: &PointsToSet,
    declared: bool,
) -> Result<(), Error> {
    if call.invoke.result.is_none() {
        return Ok(());
    }
    let program = solver.program();
    for class in classes.to_sorted_vec() {
        let Some(class) = class_of(solver, class) else {
            continue;
        };
        for name_obj in names.to_sorted_vec() {
            let Some(name) = solver
                .heap()
                .string_value(solver.cs_manager().obj(name_obj))
                .cloned()
            else {
                continue;
            };
            let field = if declared {
                program
                    .class(class)
                    .fields
                    .iter()
                    .copied()
                    .find(|&f| program.field(f).name == name)
            } else {
                program.field_by_name(class, name.as_str())
            };
            if let Some(field) = field {
                let obj = meta_obj(
                    solver,
                    MockDesc::ReflectionMetaObj,
                    MockValue::Field(field),
                    None,
                    name::FIELD,
                );
                add_result(solver, call, obj);
            }
        }
    }
    Ok(())
}
