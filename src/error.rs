// SPDX-License-Identifier: BSD-3-Clause
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Program(#[from] crate::ir::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Internal invariant violated: {0}")]
    Invariant(String),

    #[error("Gave up after {0} worklist entries")]
    IterationLimit(usize),

    /// Raised by plugins outside this crate
    #[error("Plugin failed: {0}")]
    Plugin(String),
}
