//! Conversion operations and the external tool adapters behind them.
//!
//! Each graph vertex carries one of these operations; the executor hands
//! it the files flowing along the vertex's incoming and outgoing edges.
//! FontForge, sfntly and the woff2 pair are driven as child processes;
//! an adapter fails when its tool exits nonzero or leaves a declared
//! output file missing.

use std::env;
use std::fs;
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use crate::error::ConvertError;
use crate::format::FontFile;

/// Environment variable overriding the classpath used to reach sfntly and
/// the `ConvertFont` wrapper.
pub const SFNTLY_CLASSPATH_VAR: &str = "FONTROUTE_SFNTLY_CLASSPATH";

/// The operations a graph vertex can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Noop,
    Copy,
    FontForge,
    Sfntly,
    Woff2Compress,
    Woff2Decompress,
}

impl Operation {
    /// Identifier used in `--dot` labels.
    pub fn name(self) -> &'static str {
        match self {
            Operation::Noop => "noop",
            Operation::Copy => "copy",
            Operation::FontForge => "fontforge",
            Operation::Sfntly => "sfntly",
            Operation::Woff2Compress => "woff2_compress",
            Operation::Woff2Decompress => "woff2_decompress",
        }
    }

    /// Run the operation. `inputs` and `outputs` are the files on the
    /// vertex's incoming and outgoing edges, in adjacency order; every
    /// adapter consumes the first input and produces all outputs in a
    /// single tool invocation.
    pub fn run(self, inputs: &[&FontFile], outputs: &[&FontFile]) -> Result<(), ConvertError> {
        // A tool vertex with several incoming file edges is a planner bug.
        debug_assert!(self == Operation::Noop || inputs.len() <= 1);
        match self {
            Operation::Noop => Ok(()),
            Operation::Copy => copy_file(inputs, outputs),
            Operation::FontForge => convert_with_fontforge(inputs, outputs),
            Operation::Sfntly => convert_with_sfntly(inputs, outputs),
            Operation::Woff2Compress => convert_with_woff2(inputs, outputs, "woff2_compress"),
            Operation::Woff2Decompress => convert_with_woff2(inputs, outputs, "woff2_decompress"),
        }
    }
}

fn copy_file(inputs: &[&FontFile], outputs: &[&FontFile]) -> Result<(), ConvertError> {
    let (Some(input), Some(output)) = (inputs.first(), outputs.first()) else {
        return Ok(());
    };
    log::info!(
        "copying {} to {}",
        input.path().display(),
        output.path().display()
    );
    // Copying a file onto itself counts as done.
    if is_same_file(input.path(), output.path()) {
        return Ok(());
    }
    ensure_parent_exists(output.path())?;
    fs::copy(input.path(), output.path())?;
    Ok(())
}

fn is_same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn convert_with_fontforge(inputs: &[&FontFile], outputs: &[&FontFile]) -> Result<(), ConvertError> {
    let Some(input) = inputs.first() else {
        return Ok(());
    };
    log::info!(
        "using FontForge to convert {} to {}",
        input.path().display(),
        join_paths(outputs)
    );
    ensure_output_dirs(outputs)?;
    let mut script = String::new();
    // CIDFlatten merges the sub-fonts of a CID-keyed font into one, so
    // Generate sees a single font regardless of the input flavor.
    script.push_str(&format!(
        "Open(\"{}\")\nCIDFlatten()\n",
        ff_escape(input.path())
    ));
    for output in outputs {
        script.push_str(&format!("Generate(\"{}\")\n", ff_escape(output.path())));
    }
    let mut child = Command::new("fontforge")
        .args(["-lang=ff", "-script", "-"])
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| ConvertError::spawn("FontForge", e))?;
    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(script.as_bytes())?;
    }
    let result = child.wait_with_output()?;
    finish_tool("FontForge", result, outputs)
}

// Paths are spliced into the FontForge script between double quotes.
fn ff_escape(path: &Path) -> String {
    path.display().to_string().replace('"', "\\\"")
}

fn convert_with_sfntly(inputs: &[&FontFile], outputs: &[&FontFile]) -> Result<(), ConvertError> {
    let Some(input) = inputs.first() else {
        return Ok(());
    };
    log::info!(
        "using sfntly to convert {} to {}",
        input.path().display(),
        join_paths(outputs)
    );
    ensure_output_dirs(outputs)?;
    let mut command = Command::new("java");
    command
        .arg("-cp")
        .arg(sfntly_classpath())
        .arg("ConvertFont")
        .arg(input.path());
    for output in outputs {
        command.arg("-o").arg(output.path());
    }
    run_tool(command, "sfntly", outputs)
}

fn sfntly_classpath() -> String {
    if let Ok(classpath) = env::var(SFNTLY_CLASSPATH_VAR) {
        return classpath;
    }
    let base = installed_base_dir();
    [
        base.join("share").join("java"),
        base.join("vendor")
            .join("sfntly")
            .join("java")
            .join("target")
            .join("classes"),
    ]
    .map(|p| p.display().to_string())
    .join(":")
}

fn convert_with_woff2(
    inputs: &[&FontFile],
    outputs: &[&FontFile],
    tool: &'static str,
) -> Result<(), ConvertError> {
    let Some(input) = inputs.first() else {
        return Ok(());
    };
    log::info!("using {} to convert {}", tool, input.path().display());
    ensure_output_dirs(outputs)?;
    // The tool writes its output next to the input; the planner only feeds
    // it files that already sit in the output directory.
    let mut command = Command::new(woff2_binary(tool));
    command.arg(input.path());
    run_tool(command, tool, outputs)
}

fn woff2_binary(tool: &str) -> PathBuf {
    let vendored = installed_base_dir().join("vendor").join("woff2").join(tool);
    if vendored.is_file() {
        vendored
    } else {
        PathBuf::from(tool)
    }
}

// The conversion tools live next to the installed binary: the executable
// goes to <base>/bin, sfntly and woff2 builds to <base>/vendor.
fn installed_base_dir() -> PathBuf {
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().and_then(Path::parent).map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn run_tool(
    mut command: Command,
    tool: &'static str,
    outputs: &[&FontFile],
) -> Result<(), ConvertError> {
    let result = command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| ConvertError::spawn(tool, e))?;
    finish_tool(tool, result, outputs)
}

fn finish_tool(
    tool: &'static str,
    result: Output,
    outputs: &[&FontFile],
) -> Result<(), ConvertError> {
    let stderr = String::from_utf8_lossy(&result.stderr);
    if !result.status.success() {
        return Err(ConvertError::ToolFailure {
            tool,
            detail: indent(&stderr, "  "),
        });
    }
    let missing: Vec<String> = outputs
        .iter()
        .filter(|f| !f.path().is_file())
        .map(|f| f.path().display().to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ConvertError::MissingOutputs {
            tool,
            files: missing.join(", "),
            detail: indent(&stderr, "  "),
        });
    }
    Ok(())
}

fn ensure_output_dirs(outputs: &[&FontFile]) -> io::Result<()> {
    for output in outputs {
        ensure_parent_exists(output.path())?;
    }
    Ok(())
}

fn ensure_parent_exists(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => fs::create_dir_all(dir),
        _ => Ok(()),
    }
}

fn join_paths(files: &[&FontFile]) -> String {
    files
        .iter()
        .map(|f| f.path().display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn indent(text: &str, tab: &str) -> String {
    text.split('\n')
        .map(|line| format!("{tab}{line}"))
        .collect::<Vec<_>>()
        .join("\n")
}
