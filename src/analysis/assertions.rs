// SPDX-License-Identifier: BSD-3-Clause
//! Assertions embedded in analysed programs.
//!
//! A program states facts about its own analysis results by calling static
//! methods of a class named `Assert`, which need not be declared:
//!
//! - `assert_may_alias(a, b)`: the sets of `a` and `b` intersect
//! - `assert_disjoint(a, b)`: they do not
//! - `assert_points_to_nothing(a, ...)`, `assert_points_to_something(a, ...)`
//! - `assert_reachable()`, `assert_unreachable()`: about the calling method
//!
//! Points-to assertions are only checked in reachable methods.

use std::fmt::Display;

use crate::analysis::pointer::PointerAnalysis;
use crate::ir::{InvokeKind, Stmt, StmtRef};
use crate::name::Name;

pub const ASSERT_CLASS: &str = "Assert";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Failure {
    pub site: StmtRef,
    pub assertion: Name,
    pub message: String,
}

impl Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at {}: {}", self.assertion, self.site, self.message)
    }
}

/// Evaluates every assertion of the program, returning those that do not
/// hold.
pub fn check(out: &PointerAnalysis<'_>) -> Vec<Failure> {
    let program = out.program();
    let mut failures = Vec::new();
    for m in program.methods() {
        let reachable = out.is_reachable(m.id);
        for (i, stmt) in m.stmts().iter().enumerate() {
            let Stmt::Invoke(invoke) = stmt else {
                continue;
            };
            if invoke.kind != InvokeKind::Static
                || invoke.method.class != ASSERT_CLASS
                || !invoke.method.name.as_str().starts_with("assert_")
            {
                continue;
            }
            let site = StmtRef::new(m.id, i);
            let mut fail = |message: String| {
                failures.push(Failure {
                    site,
                    assertion: invoke.method.name.clone(),
                    message,
                })
            };
            let describe = |v| program.describe_var(v);
            match invoke.method.name.as_str() {
                "assert_reachable" => {
                    if !reachable {
                        fail(format!("{m} is unreachable"));
                    }
                }
                "assert_unreachable" => {
                    if reachable {
                        fail(format!("{m} is reachable"));
                    }
                }
                _ if !reachable => {}
                "assert_points_to_nothing" => {
                    for &a in &invoke.args {
                        let pts = out.var_points_to(a);
                        if let Some(&o) = pts.iter().next() {
                            fail(format!("{} points to {}", describe(a), out.obj_string(o)));
                        }
                    }
                }
                "assert_points_to_something" => {
                    for &a in &invoke.args {
                        if out.var_points_to(a).is_empty() {
                            fail(format!("{} points to nothing", describe(a)));
                        }
                    }
                }
                name @ ("assert_may_alias" | "assert_disjoint") => {
                    let [a, b] = invoke.args[..] else {
                        fail(format!("expected two arguments, got {}", invoke.args.len()));
                        continue;
                    };
                    let disjoint = out.var_points_to(a).is_disjoint(&out.var_points_to(b));
                    if name == "assert_may_alias" && disjoint {
                        fail(format!("{} and {} do not alias", describe(a), describe(b)));
                    } else if name == "assert_disjoint" && !disjoint {
                        fail(format!("{} and {} may alias", describe(a), describe(b)));
                    }
                }
                other => fail(format!("Unknown assertion: {other}")),
            }
        }
    }
    failures
}
