//! Directed graph with deterministic iteration order, plus the
//! shortest-paths machinery the planner runs over it.
//!
//! Vertices live in an arena and are addressed by stable indices, so the
//! planning graph and the executable tree derived from it can share one
//! representation.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;

use crate::format::FontFile;
use crate::ops::Operation;
use crate::weight::Weight;

/// Stable index of a vertex in a [`Graph`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexId(usize);

impl VertexId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A directed edge annotated with the file that flows along it when the
/// graph is executed. Only super-source edges carry no file.
#[derive(Debug, Clone)]
pub struct Edge {
    pub from: VertexId,
    pub to: VertexId,
    pub weight: Weight,
    pub file: Option<FontFile>,
}

#[derive(Debug)]
struct Vertex {
    op: Operation,
    // Keyed by the far vertex so a parallel edge to the same destination
    // coalesces (last writer wins) while iteration stays insertion-ordered.
    outgoing: IndexMap<VertexId, Edge>,
    incoming: IndexMap<VertexId, Edge>,
    // Shortest-paths scratch, filled in by compute_shortest_paths.
    length: Option<Weight>,
    parent_edge: Option<Edge>,
}

impl Vertex {
    fn new(op: Operation) -> Vertex {
        Vertex {
            op,
            outgoing: IndexMap::new(),
            incoming: IndexMap::new(),
            length: None,
            parent_edge: None,
        }
    }
}

/// A directed graph of conversion operations.
#[derive(Debug, Default)]
pub struct Graph {
    vertices: Vec<Vertex>,
}

impl Graph {
    pub fn new() -> Graph {
        Graph::default()
    }

    pub fn add_vertex(&mut self, op: Operation) -> VertexId {
        self.vertices.push(Vertex::new(op));
        VertexId(self.vertices.len() - 1)
    }

    pub fn add_edge(&mut self, edge: Edge) {
        self.vertices[edge.to.0].incoming.insert(edge.from, edge.clone());
        self.vertices[edge.from.0].outgoing.insert(edge.to, edge);
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn operation(&self, v: VertexId) -> Operation {
        self.vertices[v.0].op
    }

    pub fn outgoing_edges(&self, v: VertexId) -> impl Iterator<Item = &Edge> {
        self.vertices[v.0].outgoing.values()
    }

    pub fn incoming_edges(&self, v: VertexId) -> impl Iterator<Item = &Edge> {
        self.vertices[v.0].incoming.values()
    }

    /// Best known total weight from the source, after a solver run.
    pub fn length(&self, v: VertexId) -> Option<Weight> {
        self.vertices[v.0].length
    }

    pub fn parent_edge(&self, v: VertexId) -> Option<&Edge> {
        self.vertices[v.0].parent_edge.as_ref()
    }

    /// Pre-order traversal of the tree hanging off `root`: every vertex is
    /// visited before any of its descendants, children in adjacency order.
    pub fn preorder(&self, root: VertexId) -> Vec<VertexId> {
        let mut order = Vec::with_capacity(self.vertices.len());
        self.preorder_into(root, &mut order);
        order
    }

    fn preorder_into(&self, v: VertexId, order: &mut Vec<VertexId>) {
        order.push(v);
        for edge in self.outgoing_edges(v) {
            self.preorder_into(edge.to, order);
        }
    }

    /// Depth-first traversal from `root` with a visited set, for graphs
    /// that are not trees.
    pub fn depth_first(&self, root: VertexId) -> Vec<VertexId> {
        let mut queued = HashSet::from([root]);
        let mut agenda = vec![root];
        let mut order = Vec::with_capacity(self.vertices.len());
        while let Some(v) = agenda.pop() {
            order.push(v);
            for edge in self.outgoing_edges(v) {
                if queued.insert(edge.to) {
                    agenda.push(edge.to);
                }
            }
        }
        order
    }

    /// Dijkstra's algorithm from `source` over the lexicographic weights.
    ///
    /// Fills in each reached vertex's `length` and parent backpointer and
    /// returns the set of settled vertices; the run stops early once every
    /// destination is settled. The priority structure is a linear-scan map
    /// in which the earliest-inserted vertex wins ties, which pins down
    /// which of two equal-cost plans the backpointers describe.
    pub fn compute_shortest_paths(
        &mut self,
        source: VertexId,
        destinations: &[VertexId],
    ) -> HashSet<VertexId> {
        self.vertices[source.0].length = Some(Weight::ZERO);
        let mut heap: IndexMap<VertexId, Weight> = IndexMap::new();
        heap.insert(source, Weight::ZERO);
        let mut completed: HashSet<VertexId> = HashSet::new();
        let mut unseen: HashSet<VertexId> = destinations.iter().copied().collect();
        while !unseen.is_empty() {
            let Some((u, length)) = take_min(&mut heap) else {
                break;
            };
            completed.insert(u);
            unseen.remove(&u);
            let edges: Vec<Edge> = self.vertices[u.0].outgoing.values().cloned().collect();
            for edge in edges {
                let v = edge.to;
                let new_length = length + edge.weight;
                match self.vertices[v.0].length {
                    None => {
                        self.vertices[v.0].length = Some(new_length);
                        self.vertices[v.0].parent_edge = Some(edge);
                        heap.insert(v, new_length);
                    }
                    Some(current) if !completed.contains(&v) && new_length < current => {
                        self.vertices[v.0].length = Some(new_length);
                        self.vertices[v.0].parent_edge = Some(edge);
                        heap.insert(v, new_length);
                    }
                    _ => {}
                }
            }
        }
        completed
    }

    /// Copy the tree selected by the shortest-path backpointers into a
    /// fresh graph. Each distinct vertex is copied once (operation kept,
    /// adjacency rebuilt from the used edges only); a walk stops as soon as
    /// it stitches into an already-copied branch. Returns the new graph
    /// and the copy of `source`, which roots the tree.
    pub fn shortest_paths_subtree(
        &self,
        source: VertexId,
        destinations: &[VertexId],
    ) -> (Graph, VertexId) {
        let mut tree = Graph::new();
        let mut copies: HashMap<VertexId, VertexId> = HashMap::new();
        for &dest in destinations {
            if copies.contains_key(&dest) {
                continue;
            }
            let mut to = tree.add_vertex(self.operation(dest));
            copies.insert(dest, to);
            let mut vertex = dest;
            while let Some(edge) = self.vertices[vertex.0].parent_edge.clone() {
                match copies.get(&edge.from) {
                    None => {
                        let from = tree.add_vertex(self.operation(edge.from));
                        copies.insert(edge.from, from);
                        tree.add_edge(Edge {
                            from,
                            to,
                            weight: edge.weight,
                            file: edge.file.clone(),
                        });
                        to = from;
                    }
                    Some(&from) => {
                        tree.add_edge(Edge {
                            from,
                            to,
                            weight: edge.weight,
                            file: edge.file.clone(),
                        });
                        break;
                    }
                }
                vertex = edge.from;
            }
        }
        let root = copies
            .get(&source)
            .copied()
            .unwrap_or_else(|| tree.add_vertex(self.operation(source)));
        (tree, root)
    }
}

fn take_min(heap: &mut IndexMap<VertexId, Weight>) -> Option<(VertexId, Weight)> {
    let mut best: Option<(usize, VertexId, Weight)> = None;
    for (i, (&v, &w)) in heap.iter().enumerate() {
        if best.is_none_or(|(_, _, bw)| w < bw) {
            best = Some((i, v, w));
        }
    }
    let (i, v, w) = best?;
    heap.shift_remove_index(i);
    Some((v, w))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(from: VertexId, to: VertexId, weight: Weight) -> Edge {
        Edge {
            from,
            to,
            weight,
            file: None,
        }
    }

    #[test]
    fn parallel_edges_coalesce() {
        let mut graph = Graph::new();
        let a = graph.add_vertex(Operation::Noop);
        let b = graph.add_vertex(Operation::Noop);
        graph.add_edge(edge(a, b, Weight(1, 0, 0)));
        graph.add_edge(edge(a, b, Weight(0, 0, 1)));
        let edges: Vec<_> = graph.outgoing_edges(a).collect();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].weight, Weight(0, 0, 1));
    }

    #[test]
    fn preorder_visits_parents_first() {
        let mut graph = Graph::new();
        let root = graph.add_vertex(Operation::Noop);
        let left = graph.add_vertex(Operation::Noop);
        let right = graph.add_vertex(Operation::Noop);
        let leaf = graph.add_vertex(Operation::Noop);
        graph.add_edge(edge(root, left, Weight::ZERO));
        graph.add_edge(edge(root, right, Weight::ZERO));
        graph.add_edge(edge(left, leaf, Weight::ZERO));
        assert_eq!(graph.preorder(root), vec![root, left, leaf, right]);
    }

    #[test]
    fn depth_first_visits_each_vertex_once() {
        let mut graph = Graph::new();
        let a = graph.add_vertex(Operation::Noop);
        let b = graph.add_vertex(Operation::Noop);
        let c = graph.add_vertex(Operation::Noop);
        graph.add_edge(edge(a, b, Weight::ZERO));
        graph.add_edge(edge(a, c, Weight::ZERO));
        graph.add_edge(edge(b, c, Weight::ZERO));
        graph.add_edge(edge(c, a, Weight::ZERO));
        let order = graph.depth_first(a);
        assert_eq!(order.len(), 3);
        assert_eq!(order[0], a);
    }

    #[test]
    fn shortest_paths_prefer_smaller_vectors() {
        // Two routes from source to sink: a (1,0,0) edge and a chain of
        // two cheaper edges. The chain must win.
        let mut graph = Graph::new();
        let source = graph.add_vertex(Operation::Noop);
        let mid = graph.add_vertex(Operation::Noop);
        let sink = graph.add_vertex(Operation::Noop);
        graph.add_edge(edge(source, sink, Weight(1, 0, 0)));
        graph.add_edge(edge(source, mid, Weight(0, 1, 0)));
        graph.add_edge(edge(mid, sink, Weight(0, 0, 1)));
        let completed = graph.compute_shortest_paths(source, &[sink]);
        assert!(completed.contains(&sink));
        assert_eq!(graph.length(sink), Some(Weight(0, 1, 1)));
        assert_eq!(graph.parent_edge(sink).map(|e| e.from), Some(mid));
    }

    #[test]
    fn equal_lengths_keep_the_earlier_parent() {
        let mut graph = Graph::new();
        let source = graph.add_vertex(Operation::Noop);
        let a = graph.add_vertex(Operation::Noop);
        let b = graph.add_vertex(Operation::Noop);
        let sink = graph.add_vertex(Operation::Noop);
        graph.add_edge(edge(source, a, Weight::ZERO));
        graph.add_edge(edge(source, b, Weight::ZERO));
        graph.add_edge(edge(a, sink, Weight(0, 0, 1)));
        graph.add_edge(edge(b, sink, Weight(0, 0, 1)));
        graph.compute_shortest_paths(source, &[sink]);
        // `a` settles before `b` (earlier heap insertion), so its edge is
        // the recorded parent and the later equal-cost edge never replaces
        // it.
        assert_eq!(graph.parent_edge(sink).map(|e| e.from), Some(a));
    }

    #[test]
    fn solver_reports_unreachable_destinations() {
        let mut graph = Graph::new();
        let source = graph.add_vertex(Operation::Noop);
        let island = graph.add_vertex(Operation::Noop);
        let completed = graph.compute_shortest_paths(source, &[island]);
        assert!(completed.contains(&source));
        assert!(!completed.contains(&island));
        assert_eq!(graph.length(island), None);
    }

    #[test]
    fn subtree_shares_the_common_prefix() {
        // source -> mid -> {x, y}: both destinations route through mid,
        // which must be copied exactly once.
        let mut graph = Graph::new();
        let source = graph.add_vertex(Operation::Noop);
        let mid = graph.add_vertex(Operation::Copy);
        let x = graph.add_vertex(Operation::Noop);
        let y = graph.add_vertex(Operation::Noop);
        graph.add_edge(edge(source, mid, Weight::ZERO));
        graph.add_edge(edge(mid, x, Weight(0, 0, 1)));
        graph.add_edge(edge(mid, y, Weight(0, 0, 1)));
        graph.compute_shortest_paths(source, &[x, y]);
        let (tree, root) = graph.shortest_paths_subtree(source, &[x, y]);
        assert_eq!(tree.len(), 4);
        let order = tree.preorder(root);
        assert_eq!(order.len(), 4);
        assert_eq!(tree.operation(order[0]), Operation::Noop);
        assert_eq!(tree.operation(order[1]), Operation::Copy);
    }

    #[test]
    fn subtree_without_destinations_is_a_lone_root() {
        let mut graph = Graph::new();
        let source = graph.add_vertex(Operation::Noop);
        let other = graph.add_vertex(Operation::Copy);
        graph.add_edge(edge(source, other, Weight::ZERO));
        let (tree, root) = graph.shortest_paths_subtree(source, &[]);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.preorder(root), vec![root]);
    }
}
