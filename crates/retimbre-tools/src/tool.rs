//! The external tool capability.

use crate::error::Result;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Named input files and the output path for one tool run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    inputs: BTreeMap<String, PathBuf>,
    output: PathBuf,
}

impl Invocation {
    /// Placeholder name bound to the output path.
    pub const OUTPUT: &'static str = "output";

    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            inputs: BTreeMap::new(),
            output: output.into(),
        }
    }

    /// Bind `name` to `path`.
    pub fn input(mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.inputs.insert(name.into(), path.into());
        self
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Path bound to `name`, including `output`.
    pub fn get(&self, name: &str) -> Option<&Path> {
        if name == Self::OUTPUT {
            return Some(&self.output);
        }
        self.inputs.get(name).map(PathBuf::as_path)
    }

    pub fn inputs(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.inputs.iter().map(|(k, v)| (k.as_str(), v.as_path()))
    }
}

/// A process that reads input files and produces one output file.
///
/// Implementations must either leave a non-empty file at
/// [`Invocation::output`] and return its path, or fail.
pub trait ExternalTool {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    fn run(&self, invocation: &Invocation) -> Result<PathBuf>;
}

impl<T: ExternalTool + ?Sized> ExternalTool for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn run(&self, invocation: &Invocation) -> Result<PathBuf> {
        (**self).run(invocation)
    }
}

impl<T: ExternalTool + ?Sized> ExternalTool for &T {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn run(&self, invocation: &Invocation) -> Result<PathBuf> {
        (**self).run(invocation)
    }
}
