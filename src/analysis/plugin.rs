// SPDX-License-Identifier: BSD-3-Clause
//! Extension points of the solver.
//!
//! Plugins observe the analysis as it runs and may add facts of their own.
//! They get the [`Solver`] mutably, but its public API only enqueues work:
//! nothing a plugin does is processed before its callback has returned, and
//! no callback is ever invoked from inside another one.
//!
//! Ordering guarantees:
//!
//! - [`Plugin::on_new_method`] and then [`Plugin::on_new_cs_method`] run
//!   before any other event concerning statements of that method.
//! - [`Plugin::on_new_points_to_set`] runs after the new objects were merged
//!   into the set of the variable, and before they are propagated further.

use crate::analysis::callgraph::CallEdge;
use crate::analysis::solver::Solver;
use crate::element::{ContextId, CsMethodId, CsObjId, CsVar};
use crate::error::Error;
use crate::ir::{MethodId, StmtRef};
use crate::pts::PointsToSet;

#[allow(unused_variables)]
pub trait Plugin {
    /// Before the entry methods are made reachable
    fn on_start(&mut self, solver: &mut Solver<'_>) -> Result<(), Error> {
        Ok(())
    }

    /// The first time `method` is reachable, in any context
    fn on_new_method(&mut self, solver: &mut Solver<'_>, method: MethodId) -> Result<(), Error> {
        Ok(())
    }

    fn on_new_cs_method(
        &mut self,
        solver: &mut Solver<'_>,
        method: CsMethodId,
    ) -> Result<(), Error> {
        Ok(())
    }

    /// `diff` holds only the objects that are new for `var`.
    fn on_new_points_to_set(
        &mut self,
        solver: &mut Solver<'_>,
        var: CsVar,
        diff: &PointsToSet,
    ) -> Result<(), Error> {
        Ok(())
    }

    fn on_new_call_edge(&mut self, solver: &mut Solver<'_>, edge: &CallEdge) -> Result<(), Error> {
        Ok(())
    }

    /// Dispatching the invocation at `site` on `recv` found no target.
    fn on_unresolved_call(
        &mut self,
        solver: &mut Solver<'_>,
        recv: CsObjId,
        context: ContextId,
        site: StmtRef,
    ) -> Result<(), Error> {
        Ok(())
    }

    /// When the worklist is empty. Work enqueued here is still processed,
    /// without calling this again.
    fn on_finish(&mut self, solver: &mut Solver<'_>) -> Result<(), Error> {
        Ok(())
    }
}
