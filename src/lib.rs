// SPDX-License-Identifier: BSD-3-Clause
//! Context-sensitive points-to analysis for object-oriented programs, with
//! on-the-fly callgraph construction and reflection inference.
//!
//! Programs are read from JSON (see [`ir::json`]) into a [`Program`], then
//! analysed with [`analysis`]:
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let text = std::fs::read_to_string("program.json")?;
//! let def: yapoo::ProgramDef = serde_json::from_str(&text)?;
//! let program = yapoo::Program::new(&def)?;
//! let out = yapoo::analysis(&program, &yapoo::Options::default())?;
//! for m in out.reachable_methods() {
//!     println!("{}", program.method(*m));
//! }
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod context;
pub mod element;
pub mod error;
mod handle;
pub mod heap;
pub mod hierarchy;
pub mod ir;
pub mod klimited;
pub mod name;
pub mod pts;

pub use analysis::assertions;
pub use analysis::plugin::Plugin;
pub use analysis::pointer::{self, analysis, analysis_with, Metrics, PointerAnalysis, Report};
pub use analysis::reflection::{ReflectionAnalysis, UJMethod};
pub use analysis::solver::Solver;
pub use analysis::Options;
pub use error::Error;
pub use ir::json::ProgramDef;
pub use ir::{Program, SignaturePatterns};
