//! Builds the conversion dependency graph, solves it, and executes the
//! resulting plan.
//!
//! The graph has a rendezvous vertex per format on the input side and on
//! the output side, plus one vertex per tool. Structural edges are free;
//! edges out of a tool cost one unit in the component reflecting how
//! expensive the tool is. A single shortest-paths run from the
//! super-source then picks the cheapest way to reach every requested
//! output format at once.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::error::ConvertError;
use crate::format::{FontFile, Format};
use crate::graph::{Edge, Graph, VertexId};
use crate::ops::Operation;
use crate::weight::Weight;

// What FontForge reads and what it writes.
const FONTFORGE_SOURCES: [Format; 4] = [Format::Ttf, Format::Otf, Format::Woff, Format::Svg];
const FONTFORGE_TARGETS: [Format; 3] = [Format::Ttf, Format::Otf, Format::Svg];
const SFNTLY_TARGETS: [Format; 2] = [Format::Woff, Format::Eot];

/// Derive the per-format file tables from the input files: the inputs
/// keyed by format (the last file of a format wins) and one prospective
/// output file per format, named after the first input's stem.
pub fn make_file_tables(
    input_files: &[FontFile],
    output_dir: &Path,
) -> Result<(BTreeMap<Format, FontFile>, BTreeMap<Format, FontFile>), ConvertError> {
    let first = input_files.first().ok_or(ConvertError::MissingInputs)?;
    let inputs = input_files
        .iter()
        .map(|f| (f.format(), f.clone()))
        .collect();
    let outputs = Format::ALL
        .into_iter()
        .map(|f| (f, first.moved_and_converted_to(output_dir, f)))
        .collect();
    Ok((inputs, outputs))
}

/// The planning graph together with its rendezvous vertices.
pub struct DependencyGraph {
    pub graph: Graph,
    pub source: VertexId,
    output_vertices: BTreeMap<Format, VertexId>,
    output_files: BTreeMap<Format, FontFile>,
}

impl DependencyGraph {
    /// Build the graph describing which tools can produce which formats
    /// from the given inputs.
    pub fn build(
        inputs: &BTreeMap<Format, FontFile>,
        outputs: &BTreeMap<Format, FontFile>,
    ) -> DependencyGraph {
        let mut graph = Graph::new();
        let source = graph.add_vertex(Operation::Noop);
        let input_vertices: BTreeMap<Format, VertexId> = Format::ALL
            .into_iter()
            .map(|f| (f, graph.add_vertex(Operation::Noop)))
            .collect();
        // Wire the super-source to every format that is present among the
        // inputs; BTreeMap iteration keeps the order deterministic.
        for format in inputs.keys() {
            graph.add_edge(Edge {
                from: source,
                to: input_vertices[format],
                weight: Weight::ZERO,
                file: None,
            });
        }
        let output_vertices: BTreeMap<Format, VertexId> = Format::ALL
            .into_iter()
            .map(|f| (f, graph.add_vertex(Operation::Noop)))
            .collect();
        // Any output can be satisfied by copying an input of the same
        // format.
        for format in Format::ALL {
            let copy = graph.add_vertex(Operation::Copy);
            if let Some(input_file) = inputs.get(&format) {
                graph.add_edge(Edge {
                    from: input_vertices[&format],
                    to: copy,
                    weight: Weight::ZERO,
                    file: Some(input_file.clone()),
                });
            }
            graph.add_edge(Edge {
                from: copy,
                to: output_vertices[&format],
                weight: Weight(0, 0, 1),
                file: Some(outputs[&format].clone()),
            });
        }
        // FontForge converts any of its source formats to ttf, otf or svg.
        // The output-side edges let it consume a file produced earlier in
        // the plan rather than an original input.
        let fontforge = graph.add_vertex(Operation::FontForge);
        for format in FONTFORGE_SOURCES {
            if let Some(input_file) = inputs.get(&format) {
                graph.add_edge(Edge {
                    from: input_vertices[&format],
                    to: fontforge,
                    weight: Weight::ZERO,
                    file: Some(input_file.clone()),
                });
            }
        }
        for format in FONTFORGE_TARGETS {
            graph.add_edge(Edge {
                from: output_vertices[&format],
                to: fontforge,
                weight: Weight::ZERO,
                file: Some(outputs[&format].clone()),
            });
        }
        for format in FONTFORGE_TARGETS {
            graph.add_edge(Edge {
                from: fontforge,
                to: output_vertices[&format],
                weight: Weight(1, 0, 0),
                file: Some(outputs[&format].clone()),
            });
        }
        // sfntly converts ttf to woff or eot.
        let sfntly = graph.add_vertex(Operation::Sfntly);
        if let Some(input_file) = inputs.get(&Format::Ttf) {
            graph.add_edge(Edge {
                from: input_vertices[&Format::Ttf],
                to: sfntly,
                weight: Weight::ZERO,
                file: Some(input_file.clone()),
            });
        }
        graph.add_edge(Edge {
            from: output_vertices[&Format::Ttf],
            to: sfntly,
            weight: Weight::ZERO,
            file: Some(outputs[&Format::Ttf].clone()),
        });
        for format in SFNTLY_TARGETS {
            graph.add_edge(Edge {
                from: sfntly,
                to: output_vertices[&format],
                weight: Weight(0, 1, 0),
                file: Some(outputs[&format].clone()),
            });
        }
        // woff2_compress converts ttf to woff2. It needs its input inside
        // the output directory, so only the produced ttf feeds it.
        let woff2_compress = graph.add_vertex(Operation::Woff2Compress);
        graph.add_edge(Edge {
            from: output_vertices[&Format::Ttf],
            to: woff2_compress,
            weight: Weight::ZERO,
            file: Some(outputs[&Format::Ttf].clone()),
        });
        graph.add_edge(Edge {
            from: woff2_compress,
            to: output_vertices[&Format::Woff2],
            weight: Weight(0, 1, 0),
            file: Some(outputs[&Format::Woff2].clone()),
        });
        // woff2_decompress converts woff2 back to ttf.
        let woff2_decompress = graph.add_vertex(Operation::Woff2Decompress);
        graph.add_edge(Edge {
            from: output_vertices[&Format::Woff2],
            to: woff2_decompress,
            weight: Weight::ZERO,
            file: Some(outputs[&Format::Woff2].clone()),
        });
        graph.add_edge(Edge {
            from: woff2_decompress,
            to: output_vertices[&Format::Ttf],
            weight: Weight(0, 1, 0),
            file: Some(outputs[&Format::Ttf].clone()),
        });
        DependencyGraph {
            graph,
            source,
            output_vertices,
            output_files: outputs.clone(),
        }
    }

    /// Solve for the cheapest way to reach every requested format and
    /// materialize the executable tree. Fails with the list of expected
    /// output paths when some format cannot be produced.
    pub fn plan(&mut self, output_formats: &BTreeSet<Format>) -> Result<Plan, ConvertError> {
        let destinations: Vec<VertexId> = output_formats
            .iter()
            .map(|f| self.output_vertices[f])
            .collect();
        let completed = self.graph.compute_shortest_paths(self.source, &destinations);
        let unreachable: BTreeSet<String> = output_formats
            .iter()
            .filter(|f| !completed.contains(&self.output_vertices[*f]))
            .map(|f| self.output_files[f].path().display().to_string())
            .collect();
        if !unreachable.is_empty() {
            return Err(ConvertError::UnreachableOutputs(
                unreachable.into_iter().collect(),
            ));
        }
        let (tree, root) = self.graph.shortest_paths_subtree(self.source, &destinations);
        Ok(Plan { tree, root })
    }
}

/// An executable dependency tree: operations at the vertices, files on
/// the edges.
#[derive(Debug)]
pub struct Plan {
    tree: Graph,
    root: VertexId,
}

impl Plan {
    /// Run every operation in preorder, so each file exists on disk before
    /// the operation consuming it is visited.
    pub fn execute(&self) -> Result<(), ConvertError> {
        for vertex in self.tree.preorder(self.root) {
            let inputs: Vec<&FontFile> = self
                .tree
                .incoming_edges(vertex)
                .filter_map(|e| e.file.as_ref())
                .collect();
            let outputs: Vec<&FontFile> = self
                .tree
                .outgoing_edges(vertex)
                .filter_map(|e| e.file.as_ref())
                .collect();
            self.tree.operation(vertex).run(&inputs, &outputs)?;
        }
        Ok(())
    }

    /// The operations in execution order.
    pub fn operations(&self) -> Vec<Operation> {
        self.tree
            .preorder(self.root)
            .into_iter()
            .map(|v| self.tree.operation(v))
            .collect()
    }

    /// Sum of all edge weights in the tree.
    pub fn total_weight(&self) -> Weight {
        self.tree
            .preorder(self.root)
            .into_iter()
            .flat_map(|v| self.tree.outgoing_edges(v))
            .fold(Weight::ZERO, |total, edge| total + edge.weight)
    }
}

/// Convert `input_files` into every format in `output_formats`, writing
/// into `output_dir`. Returns the produced file per requested format.
pub fn convert_files(
    input_files: &[FontFile],
    output_dir: &Path,
    output_formats: &BTreeSet<Format>,
) -> Result<BTreeMap<Format, FontFile>, ConvertError> {
    let (inputs, outputs) = make_file_tables(input_files, output_dir)?;
    let mut dependencies = DependencyGraph::build(&inputs, &outputs);
    dependencies.plan(output_formats)?.execute()?;
    Ok(output_formats
        .iter()
        .map(|f| (*f, outputs[f].clone()))
        .collect())
}
