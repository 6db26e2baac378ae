use std::fmt;

use thiserror::Error;

/// Pipeline step a compile failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileStage {
    Vertex,
    Fragment,
    Link,
}

impl fmt::Display for CompileStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CompileStage::Vertex => "vertex",
            CompileStage::Fragment => "fragment",
            CompileStage::Link => "link",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{stage} stage failed: {log}")]
pub struct CompileError {
    pub stage: CompileStage,
    /// Driver diagnostics, verbatim.
    pub log: String,
}

impl CompileError {
    pub fn new(stage: CompileStage, log: impl Into<String>) -> Self {
        Self {
            stage,
            log: log.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("no shader source registered for id {0}")]
    ShaderSourceMissing(i64),
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error("graphics context unavailable: {0}")]
    ContextUnavailable(String),
}
