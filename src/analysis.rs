// SPDX-License-Identifier: BSD-3-Clause
pub mod assertions;
pub mod callgraph;
pub mod graph;
pub mod plugin;
pub mod pointer;
pub mod reflection;
pub mod solver;

use crate::context::ContextSelector;
use crate::error::Error;
use crate::heap::MergePolicy;

#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct Options {
    /// `ci`, `<k>-call`, `<k>-obj` or `<k>-type`, optionally followed by
    /// `:<heap depth>`
    pub context: String,
    pub merge_string_objects: bool,
    pub merge_string_builders: bool,
    pub merge_exception_objects: bool,
    pub merge_string_constants: bool,
    /// Run the reflection inference plugin
    pub reflection: bool,
    /// Abort after this many worklist entries
    pub max_iterations: Option<usize>,
    pub debug: bool,
    pub metrics: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            context: "ci".to_string(),
            merge_string_objects: true,
            merge_string_builders: true,
            merge_exception_objects: true,
            merge_string_constants: false,
            reflection: true,
            max_iterations: None,
            debug: false,
            metrics: false,
        }
    }
}

impl Options {
    /// Checks the options, returning the parsed context selector.
    pub fn validate(&self) -> Result<ContextSelector, Error> {
        if self.max_iterations == Some(0) {
            return Err(Error::Config(
                "max-iterations must be positive".to_string(),
            ));
        }
        self.context.parse()
    }

    pub fn merge_policy(&self) -> MergePolicy {
        MergePolicy {
            string_objects: self.merge_string_objects,
            string_builders: self.merge_string_builders,
            exception_objects: self.merge_exception_objects,
            string_constants: self.merge_string_constants,
        }
    }
}

// Profiling machinery
#[inline]
#[allow(unused_variables)]
pub(crate) fn count(what: &str) -> bool {
    #[cfg(feature = "count")]
    eprintln!("{} 1", what);
    true
}
