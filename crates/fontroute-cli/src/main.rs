//! Command-line front end for the fontroute converter.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Result, bail};
use clap::Parser;

use fontroute::{
    ConvertError, DependencyGraph, FontFile, Format, Graph, VertexId, convert_files, generate_css,
    make_file_tables,
};

/// Convert font files to web-friendly font formats.
#[derive(Debug, Parser)]
#[command(name = "fontroute")]
struct Cli {
    /// Input font files (ttf, otf, svg, eot, woff, woff2); the converter
    /// copies matching inputs and converts to fill in the gaps.
    #[arg(value_name = "input-file")]
    inputs: Vec<PathBuf>,

    /// Destination directory for converted files. Needed even when only
    /// inline fonts are generated, to hold intermediate files.
    #[arg(short, long, value_name = "dir")]
    output: Option<PathBuf>,

    /// Comma-separated output formats; suffix a format with `:inline` to
    /// embed it in the CSS as a base64 data URL instead of a file URL.
    #[arg(
        short,
        long,
        value_name = "formats",
        default_value = "eot,woff2,woff,ttf,svg"
    )]
    format: String,

    /// Write a CSS @font-face stylesheet to this file (`-` for stdout).
    /// Omit to generate no CSS.
    #[arg(short, long, value_name = "file")]
    css: Option<PathBuf>,

    /// Prefix of the file URLs in the generated CSS. Defaults to the
    /// output directory with a trailing slash.
    #[arg(short, long, value_name = "prefix")]
    prefix: Option<String>,

    /// Font family name used in the CSS. Defaults to the stem of the
    /// first input file.
    #[arg(long, visible_alias = "family", value_name = "name")]
    font_family: Option<String>,

    /// Log each conversion step.
    #[arg(long)]
    verbose: bool,

    /// Print Graphviz dot code for the planning graph instead of
    /// converting.
    #[arg(long)]
    dot: bool,

    /// Print version.
    #[arg(short = 'v', long = "version")]
    version: bool,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let failed = err.use_stderr();
            let _ = err.print();
            return if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS };
        }
    };
    env_logger::Builder::new()
        .filter_level(if cli.verbose {
            log::LevelFilter::Info
        } else {
            log::LevelFilter::Warn
        })
        .format_timestamp(None)
        .format_target(false)
        .init();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    if cli.version {
        println!("{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }
    if cli.inputs.is_empty() {
        bail!("no input files");
    }
    let Some(output_dir) = &cli.output else {
        bail!("no output directory");
    };
    let mut input_files = Vec::with_capacity(cli.inputs.len());
    for path in &cli.inputs {
        input_files.push(FontFile::from_path(path)?);
    }
    let requested = parse_format_list(&cli.format)?;

    // Inline formats already covered by an input file need no conversion;
    // the CSS embeds the original bytes. Everything else gets produced.
    let inline_pool: BTreeMap<Format, FontFile> = input_files
        .iter()
        .map(|f| (f.format(), f.clone()))
        .collect();
    let output_formats: BTreeSet<Format> = requested
        .iter()
        .filter(|(format, inline)| !inline || !inline_pool.contains_key(format))
        .map(|(format, _)| *format)
        .collect();

    if cli.dot {
        let (inputs, outputs) = make_file_tables(&input_files, output_dir)?;
        let dependencies = DependencyGraph::build(&inputs, &outputs);
        print_dot(
            &mut io::stdout().lock(),
            &dependencies.graph,
            dependencies.source,
        )?;
        return Ok(());
    }

    let produced = convert_files(&input_files, output_dir, &output_formats)?;

    if let Some(css_path) = &cli.css {
        let prefix = cli
            .prefix
            .clone()
            .unwrap_or_else(|| default_prefix(output_dir));
        let font_family = cli
            .font_family
            .clone()
            .unwrap_or_else(|| default_family(&cli.inputs[0]));
        let mut pool = inline_pool;
        pool.extend(produced);
        if css_path.as_os_str() == "-" {
            generate_css(
                &mut io::stdout().lock(),
                &requested,
                &pool,
                &prefix,
                &font_family,
            )?;
        } else {
            let mut file = File::create(css_path)?;
            generate_css(&mut file, &requested, &pool, &prefix, &font_family)?;
        }
    }
    Ok(())
}

/// Parse the `-f` value: comma-separated tags, each optionally suffixed
/// with `:inline`.
fn parse_format_list(value: &str) -> Result<Vec<(Format, bool)>, ConvertError> {
    value.split(',')
        .map(|entry| {
            let (tag, inline) = match entry.strip_suffix(":inline") {
                Some(tag) => (tag, true),
                None => (entry, false),
            };
            Ok((tag.parse()?, inline))
        })
        .collect()
}

/// The default URL prefix: the output directory with `/` separators and a
/// trailing slash.
fn default_prefix(output_dir: &Path) -> String {
    let dir = output_dir.to_string_lossy();
    let mut parts: Vec<&str> = dir.split(std::path::MAIN_SEPARATOR).collect();
    if parts.last().is_some_and(|p| p.is_empty()) {
        parts.pop();
    }
    let mut prefix = parts.join("/");
    if !prefix.is_empty() {
        prefix.push('/');
    }
    prefix
}

fn default_family(first_input: &Path) -> String {
    first_input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Print the planning graph (not the executed tree) as Graphviz dot.
fn print_dot(out: &mut impl Write, graph: &Graph, root: VertexId) -> io::Result<()> {
    writeln!(out, "digraph {{")?;
    for vertex in graph.depth_first(root) {
        writeln!(
            out,
            "\tv{} [label=\"{}\"];",
            vertex.index(),
            graph.operation(vertex).name()
        )?;
        for edge in graph.outgoing_edges(vertex) {
            write!(out, "\tv{} -> v{}", vertex.index(), edge.to.index())?;
            if let Some(file) = &edge.file {
                write!(out, " [label=\"{}\"]", file.path().display())?;
            }
            writeln!(out, ";")?;
        }
    }
    writeln!(out, "}}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_lists_parse_with_inline_suffixes() {
        assert_eq!(
            parse_format_list("eot,woff2,woff,ttf,svg").unwrap(),
            vec![
                (Format::Eot, false),
                (Format::Woff2, false),
                (Format::Woff, false),
                (Format::Ttf, false),
                (Format::Svg, false),
            ]
        );
        assert_eq!(
            parse_format_list("woff:inline,ttf").unwrap(),
            vec![(Format::Woff, true), (Format::Ttf, false)]
        );
    }

    #[test]
    fn unknown_format_tags_are_rejected() {
        assert!(matches!(
            parse_format_list("woff,web"),
            Err(ConvertError::UnrecognizedFormat(tag)) if tag == "web"
        ));
        assert!(parse_format_list("woff:online").is_err());
    }

    #[test]
    fn default_prefix_ends_with_a_slash() {
        assert_eq!(default_prefix(Path::new("out")), "out/");
        assert_eq!(default_prefix(Path::new("a/b")), "a/b/");
        assert_eq!(default_prefix(Path::new("a/b/")), "a/b/");
    }

    #[test]
    fn default_family_is_the_first_input_stem() {
        assert_eq!(default_family(Path::new("fonts/Open Sans.ttf")), "Open Sans");
    }

    #[test]
    fn dot_output_describes_the_planning_graph() {
        let input_files = [FontFile::from_path(Path::new("a.ttf")).unwrap()];
        let (inputs, outputs) = make_file_tables(&input_files, Path::new("out")).unwrap();
        let dependencies = DependencyGraph::build(&inputs, &outputs);
        let mut buffer = Vec::new();
        print_dot(&mut buffer, &dependencies.graph, dependencies.source).unwrap();
        let dot = String::from_utf8(buffer).unwrap();
        assert!(dot.starts_with("digraph {\n"));
        assert!(dot.ends_with("}\n"));
        assert!(dot.contains("[label=\"fontforge\"]"));
        assert!(dot.contains("[label=\"woff2_compress\"]"));
        assert!(dot.contains("[label=\"out/a.svg\"]"));
    }
}
