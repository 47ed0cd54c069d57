use std::io;

/// Errors that can occur while planning or running a conversion.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    /// A format tag outside the six supported ones.
    #[error("unrecognized format: {0}")]
    UnrecognizedFormat(String),

    /// An input path with no extension to deduce the format from.
    #[error("cannot determine the format of `{0}`")]
    MissingExtension(String),

    /// No input files were supplied.
    #[error("no input files")]
    MissingInputs,

    /// Requested outputs that no chain of conversions can produce.
    #[error("unable to generate the following files: {}", .0.join(" "))]
    UnreachableOutputs(Vec<String>),

    /// An external tool could not be started at all.
    #[error("failed to run {tool}: {source}")]
    Spawn {
        tool: &'static str,
        #[source]
        source: io::Error,
    },

    /// An external tool exited with a nonzero status.
    #[error("{tool} conversion failed:\nOutput from {tool}:\n{detail}")]
    ToolFailure { tool: &'static str, detail: String },

    /// A tool exited cleanly but a declared output file is absent.
    #[error("{tool} failed to generate {files}:\nOutput from {tool}:\n{detail}")]
    MissingOutputs {
        tool: &'static str,
        files: String,
        detail: String,
    },

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl ConvertError {
    pub(crate) fn spawn(tool: &'static str, source: io::Error) -> Self {
        ConvertError::Spawn { tool, source }
    }
}
