//! Fontroute: route-planning web font converter.
//!
//! Fontroute turns a set of input font files into the web font formats a
//! stylesheet needs (TTF, OTF, SVG, EOT, WOFF, WOFF2). Rather than
//! hard-coding tool pipelines, it builds a weighted graph of every
//! conversion the external tools can perform, solves for the cheapest
//! paths, and executes the resulting dependency tree. It can also emit a
//! CSS `@font-face` block referencing the produced files.

mod css;
mod error;
mod format;
mod graph;
mod ops;
mod planner;
mod weight;

pub use css::generate_css;
pub use error::ConvertError;
pub use format::{FontFile, Format};
pub use graph::{Edge, Graph, VertexId};
pub use ops::{Operation, SFNTLY_CLASSPATH_VAR};
pub use planner::{DependencyGraph, Plan, convert_files, make_file_tables};
pub use weight::Weight;
