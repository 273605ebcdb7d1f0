// SPDX-License-Identifier: BSD-3-Clause
//! What a `Method.invoke` call site tells about the invoked method.

use std::collections::BTreeSet;

use rustc_hash::FxHashSet;

use super::UJMethod;
use crate::analysis::solver::Solver;
use crate::element::ContextId;
use crate::error::Error;
use crate::heap::{MockDesc, MockObj, MockValue};
use crate::ir::{ClassId, Invoke, Literal, MethodId, Program, Stmt, VarId};
use crate::name::{self, Name};

fn int_constant(program: &Program, var: VarId) -> Option<i64> {
    match program.var(var).constant {
        Some(Literal::Int(n)) => Some(n),
        _ => None,
    }
}

/// Length of the arrays `var` points to: the unique length recorded by
/// constant-length allocations, or the constant length of the array
/// allocated into `var` itself.
pub(super) fn array_length(
    solver: &Solver<'_>,
    ctx: ContextId,
    var: VarId,
) -> Result<Option<usize>, Error> {
    let program = solver.program();
    let lengths: BTreeSet<i64> = solver
        .var_points_to(ctx, var)
        .iter()
        .filter_map(|o| match solver.heap().mock(solver.cs_manager().obj(o)) {
            Some(MockObj {
                desc: MockDesc::ArrayLength,
                value: MockValue::Int(n),
                ..
            }) => Some(*n),
            _ => None,
        })
        .collect();
    let length = match lengths.len() {
        0 => program
            .method(program.var(var).method)
            .stmts()
            .iter()
            .find_map(|s| match s {
                Stmt::NewArray {
                    lhs,
                    length: Some(len),
                    ..
                } if *lhs == var => int_constant(program, *len),
                _ => None,
            }),
        1 => lengths.first().copied(),
        _ => None,
    };
    match length {
        Some(n) if n < 0 => Err(Error::Invariant(format!(
            "negative length {n} of {}",
            program.describe_var(var)
        ))),
        Some(n) => Ok(usize::try_from(n).ok()),
        None => Ok(None),
    }
}

/// Types of the values stored into the argument array `var`. With a known
/// length and constant indices they are positional, with missing positions
/// typed `Object`; otherwise in the order of the stores.
fn arg_types(program: &Program, var: Option<VarId>, length: Option<usize>) -> Vec<Name> {
    let Some(var) = var else {
        return Vec::new();
    };
    let stores: Vec<(Option<i64>, &Name)> = program
        .method(program.var(var).method)
        .stmts()
        .iter()
        .filter_map(|s| match s {
            Stmt::StoreArray { base, index, rhs } if *base == var => Some((
                index.and_then(|i| int_constant(program, i)),
                &program.var(*rhs).ty,
            )),
            _ => None,
        })
        .collect();
    if let Some(length) = length {
        if stores.iter().all(|(i, _)| i.is_some()) {
            let mut types = vec![Name::from(name::OBJECT); length];
            for (index, ty) in stores {
                let slot = index
                    .and_then(|i| usize::try_from(i).ok())
                    .and_then(|i| types.get_mut(i));
                if let Some(slot) = slot {
                    *slot = ty.clone();
                }
            }
            return types;
        }
    }
    stores.into_iter().map(|(_, ty)| ty.clone()).collect()
}

/// `class`, its superclasses from the nearest up, then the interfaces it
/// implements ordered by id.
fn supertypes(program: &Program, class: ClassId) -> Vec<ClassId> {
    let mut chain: Vec<ClassId> = program.superclasses(class).collect();
    let mut rest: Vec<ClassId> = program
        .hierarchy()
        .supertypes(class)
        .filter(|c| !chain.contains(c))
        .collect();
    rest.sort_unstable();
    chain.append(&mut rest);
    chain
}

/// All parameter type tuples the arguments fit: each argument type or one
/// of its supertypes.
pub(super) fn ptp(program: &Program, types: &[Name]) -> Vec<Vec<Name>> {
    let mut tuples: Vec<Vec<Name>> = vec![Vec::new()];
    for ty in types {
        let options: Vec<Name> = match program.class_by_name(ty.as_str()) {
            Some(class) => supertypes(program, class)
                .into_iter()
                .map(|c| program.class(c).name.clone())
                .collect(),
            None => vec![ty.clone()],
        };
        tuples = tuples
            .iter()
            .flat_map(|prefix| {
                options.iter().map(move |o| {
                    let mut t = prefix.clone();
                    t.push(o.clone());
                    t
                })
            })
            .collect();
    }
    tuples
}

/// Supertypes and subtypes of each of `types`.
fn related(program: &Program, types: &[Name]) -> BTreeSet<Name> {
    let mut out = BTreeSet::new();
    for ty in types {
        let Some(class) = program.class_by_name(ty.as_str()) else {
            out.insert(ty.clone());
            continue;
        };
        out.extend(
            supertypes(program, class)
                .into_iter()
                .map(|c| program.class(c).name.clone()),
        );
        out.extend(
            program
                .hierarchy()
                .subtypes(class)
                .iter()
                .map(|&c| program.class(c).name.clone()),
        );
    }
    out
}

/// Facts about a `Method.invoke` call site, independent of the objects
/// flowing into it.
#[derive(Debug)]
pub(super) struct InvokeFacts {
    pub(super) ptp: Vec<Vec<Name>>,
    /// Types the result is cast to
    pub(super) casts: Vec<Name>,
    pub(super) returns: BTreeSet<Name>,
}

impl InvokeFacts {
    pub(super) fn new(program: &Program, invoke: &Invoke, length: Option<usize>) -> Self {
        let types = arg_types(program, invoke.args.get(1).copied(), length);
        let mut casts = Vec::new();
        if let Some(result) = invoke.result {
            for s in program.method(program.var(result).method).stmts() {
                if let Stmt::Cast { rhs, ty, .. } = s {
                    if *rhs == result && !casts.contains(ty) {
                        casts.push(ty.clone());
                    }
                }
            }
        }
        InvokeFacts {
            ptp: ptp(program, &types),
            returns: related(program, &casts),
            casts,
        }
    }
}

/// Methods a resolvable descriptor stands for, looked up in its declaring
/// class and superclasses. Without known parameters, `length` filters by
/// arity.
pub(super) fn candidates(program: &Program, uj: &UJMethod, length: Option<usize>) -> Vec<MethodId> {
    let Some(class) = uj
        .declaring_class()
        .and_then(|c| program.class_by_name(c.as_str()))
    else {
        return Vec::new();
    };
    let mut seen = FxHashSet::default();
    let mut out = Vec::new();
    for c in program.superclasses(class) {
        for &m in &program.class(c).methods {
            let method = program.method(m);
            if method.is_constructor() || method.is_clinit() {
                continue;
            }
            if uj.name().is_some_and(|n| *n != method.name) {
                continue;
            }
            let params_match = match uj.parameters() {
                Some(ps) => ps == method.params.as_slice(),
                None => length.map_or(true, |n| n == method.params.len()),
            };
            if !params_match || uj.return_type().is_some_and(|r| *r != method.ret) {
                continue;
            }
            // Overridden methods are found through dispatch
            if seen.insert(method.subsig) {
                out.push(m);
            }
        }
    }
    out
}

/// More specific descriptors for an unresolvable one.
///
/// - Without a declaring class: one per receiver type, and, when the
///   receiver says nothing or the result is cast, one per class declaring
///   a matching method.
/// - Without parameters: one per parameter tuple the arguments fit and
///   return type related to the casts.
pub(super) fn refine(
    program: &Program,
    uj: &UJMethod,
    recv_types: &[Name],
    facts: &InvokeFacts,
) -> BTreeSet<UJMethod> {
    let mut out = BTreeSet::new();
    if uj.declaring_class().is_none() {
        for ty in recv_types {
            if program.class_by_name(ty.as_str()).is_some() {
                out.insert(uj.with_declaring_class(ty.clone()));
            }
        }
        let recv_unknown = recv_types.is_empty()
            || recv_types
                .iter()
                .any(|t| program.class_by_name(t.as_str()).is_none());
        if let (Some(name), Some(params)) = (uj.name(), uj.parameters()) {
            let fits = facts.ptp.iter().any(|t| t.as_slice() == params);
            if fits && (recv_unknown || !facts.casts.is_empty()) {
                for m in program.methods() {
                    if m.name != *name || m.params.as_slice() != params || m.is_constructor() {
                        continue;
                    }
                    if !facts.casts.is_empty() && !facts.returns.contains(&m.ret) {
                        continue;
                    }
                    if uj.return_type().is_some_and(|r| *r != m.ret) {
                        continue;
                    }
                    out.insert(uj.with_declaring_class(program.class(m.class).name.clone()));
                }
            }
        }
    }
    if uj.parameters().is_none() {
        let returns: Vec<Option<Name>> = if facts.returns.is_empty() {
            vec![None]
        } else {
            facts.returns.iter().cloned().map(Some).collect()
        };
        for tuple in &facts.ptp {
            for ret in &returns {
                out.insert(uj.with_signature(ret.clone(), tuple.clone()));
            }
        }
    }
    out
}
