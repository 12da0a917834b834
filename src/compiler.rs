use std::collections::HashMap;
use std::iter;

use itertools::Itertools;
use unordered_pair::UnorderedPair;
use varisat::{CnfFormula, ExtendFormula, Lit, Var};

use crate::arith::Distance;
use crate::config::{CompileOptions, DistanceEncoding};
use crate::dimacs;
use crate::error::CompileError;
use crate::gates::Encoder;
use crate::problem::{Color, Graph, Problem};
use crate::symbols::{Ident, SymbolTable, VarKey};

/// Summary of what a [`Compilation`] was built from.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Meta {
    /// Active colors, ascending.
    pub colors: Vec<Color>,
    /// Width of each binary distance vector, `ceil(log2(N + 1))`, reported whichever encoding was used.
    pub k_bits: usize,
    /// Largest distance any node may take, `N - 1`.
    pub max_distance: usize,
    /// Node identifiers in input order.
    pub nodes: Vec<String>,
    /// Edges after merging duplicates.
    pub edges: Vec<(String, String)>,
    /// The distance encoding used.
    pub encoding: DistanceEncoding,
}

/// Per-node and per-edge variables of a compilation, indexed by node.
#[derive(Clone, Debug)]
pub(crate) struct Layout {
    pub(crate) index: HashMap<String, usize>,
    // roots[i] is the root of meta.colors[i]
    pub(crate) roots: Vec<usize>,
    // colors[node][color index]
    pub(crate) colors: Vec<Vec<Var>>,
    // parents[child] = [(parent, var)], in neighbor order
    pub(crate) parents: Vec<Vec<(usize, Var)>>,
    pub(crate) keeps: HashMap<UnorderedPair<usize>, Var>,
    pub(crate) distances: Vec<Distance>,
}

/// The CNF instance for one [`Problem`], with everything needed to read a model back.
///
/// A compilation is immutable and independent of any other.
#[derive(Clone, Debug)]
pub struct Compilation {
    symbols: SymbolTable,
    clauses: Vec<Vec<Lit>>,
    trivially_unsat: bool,
    meta: Meta,
    pub(crate) layout: Layout,
}

impl Compilation {
    /// Number of variables, i.e. the largest DIMACS variable index.
    pub fn num_vars(&self) -> usize {
        self.symbols.len()
    }

    /// The clauses, in emission order.
    pub fn clauses(&self) -> &[Vec<Lit>] {
        &self.clauses
    }

    /// The clauses as signed DIMACS integers.
    pub fn dimacs_clauses(&self) -> Vec<Vec<isize>> {
        self.clauses.iter()
            .map(|clause| clause.iter().map(|lit| lit.to_dimacs()).collect_vec())
            .collect_vec()
    }

    /// The full symbol table.
    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// The variable called `name`, e.g. `col(a)=0` or `par(b)->(a)`.
    pub fn var_of(&self, name: &str) -> Option<Var> {
        self.symbols.var_of(name)
    }

    /// The name of `var`.
    pub fn name_of(&self, var: Var) -> Option<&str> {
        self.symbols.name_of(var)
    }

    /// See [`Meta`].
    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    /// Whether the empty clause was emitted, i.e. some lower bound can never be met.
    /// Such an instance is still well-formed; any solver will report it unsatisfiable.
    pub fn is_trivially_unsat(&self) -> bool {
        self.trivially_unsat
    }

    /// Render as DIMACS CNF text.
    pub fn to_dimacs(&self) -> String {
        dimacs::write(self.num_vars(), &self.clauses)
    }

    /// The clauses as a [`CnfFormula`] covering every variable, ready for an in-process solver.
    pub fn formula(&self) -> CnfFormula {
        let mut formula = CnfFormula::new();
        self.clauses.iter().for_each(|clause| formula.add_clause(clause));
        while formula.var_count() < self.num_vars() {
            formula.new_var();
        }

        formula
    }

    /// The variable stating `node` has `color`.
    pub fn color_var(&self, node: &str, color: Color) -> Option<Var> {
        let node = *self.layout.index.get(node)?;
        let color = self.meta.colors.iter().position(|c| *c == color)?;
        Some(self.layout.colors[node][color])
    }

    /// The variable stating `parent` is the parent of `child`.
    pub fn parent_var(&self, child: &str, parent: &str) -> Option<Var> {
        let child = *self.layout.index.get(child)?;
        let parent = *self.layout.index.get(parent)?;
        self.layout.parents[child].iter().find(|(p, _)| *p == parent).map(|(_, var)| *var)
    }

    /// The variable stating the edge between `a` and `b` is in the forest.
    pub fn keep_var(&self, a: &str, b: &str) -> Option<Var> {
        let a = *self.layout.index.get(a)?;
        let b = *self.layout.index.get(b)?;
        self.layout.keeps.get(&UnorderedPair(a, b)).copied()
    }

    /// The distance representation of `node`.
    pub fn distance(&self, node: &str) -> Option<&Distance> {
        self.layout.index.get(node).map(|ix| &self.layout.distances[*ix])
    }
}

/// Compile `problem` into CNF.
///
/// Fails only if `problem` is malformed, before any clause is produced.
/// A well-formed problem with a lower bound no tree could meet compiles to an instance containing the empty clause;
/// see [`Compilation::is_trivially_unsat`].
///
/// # Logical setup
/// Let N be the number of nodes.
///
/// ## Nodes
/// Every node has exactly one active color, and a hinted node has its hinted color.
/// A root has its color and distance 0. Every distance is at most N - 1.
/// A node which is not the root of its color has exactly one parent, is at distance at least 1,
/// and a node with no neighbors can only take colors it is the root of.
/// A root of any color has no parent.
///
/// ## Edges
/// Every edge has a "kept" variable and one "parent" variable per direction.
/// Either parent direction implies the edge is kept, a kept edge has a parent direction, and both directions are never chosen at once.
/// A kept edge joins nodes of the same color.
///
/// ## Parent relations
/// If P is the parent of C, they share every color and dist(C) = dist(P) + 1.
/// Since distance strictly decreases along parent pointers and only roots sit at distance 0,
/// following parents from any node reaches the root of its color.
pub fn compile(problem: &Problem, options: CompileOptions) -> Result<Compilation, CompileError> {
    let graph = problem.validate()?;
    let _span = tracing::debug_span!(
        "compile",
        nodes = graph.node_count(),
        edges = graph.graph.edge_count(),
        colors = graph.colors.len(),
        encoding = %options.encoding
    ).entered();

    let mut compiler = Compiler::new(&graph, options);
    compiler.emit_colors();
    compiler.emit_roots();
    compiler.emit_distance_caps();
    compiler.emit_edges();
    compiler.emit_parent_links();
    compiler.emit_parent_choices();
    compiler.emit_lower_bounds();

    let compilation = compiler.finish();
    tracing::debug!(
        vars = compilation.num_vars(),
        clauses = compilation.clauses().len(),
        trivially_unsat = compilation.is_trivially_unsat(),
        "compiled"
    );

    Ok(compilation)
}

struct Compiler<'a> {
    graph: &'a Graph,
    encoding: DistanceEncoding,
    encoder: Encoder,
    k_bits: usize,
    colors: Vec<Vec<Var>>,
    parents: HashMap<(usize, usize), Var>,
    keeps: HashMap<UnorderedPair<usize>, Var>,
    distances: Vec<Distance>,
    // sum bits of dist(node) + 1, shared by all children of node
    increments: HashMap<usize, Vec<Lit>>,
}

impl<'a> Compiler<'a> {
    fn new(graph: &'a Graph, options: CompileOptions) -> Self {
        let n = graph.node_count();
        // bits needed to hold N, i.e. ceil(log2(N + 1))
        let k_bits = (usize::BITS - n.leading_zeros()) as usize;
        let mut encoder = Encoder::new();

        let colors = graph.names.iter()
            .map(|node| graph.colors.iter()
                .map(|color| encoder.symbols.key(VarKey::Color { node, color: *color }))
                .collect_vec())
            .collect_vec();

        let distances = graph.names.iter()
            .map(|node| match options.encoding {
                DistanceEncoding::Binary => Distance::Binary((0..k_bits)
                    .map(|bit| encoder.symbols.key(VarKey::DistanceBit { node, bit }).positive())
                    .collect_vec()),
                DistanceEncoding::Unary => Distance::Unary((1..=n)
                    .map(|threshold| encoder.symbols.key(VarKey::DistanceAtLeast { node, threshold }).positive())
                    .collect_vec()),
            })
            .collect_vec();

        let mut parents = HashMap::with_capacity(graph.graph.edge_count() * 2);
        let mut keeps = HashMap::with_capacity(graph.graph.edge_count());
        for (a, b, _) in graph.graph.all_edges() {
            let (a_name, b_name) = (graph.names[a].as_str(), graph.names[b].as_str());
            parents.insert((a, b), encoder.symbols.key(VarKey::Parent { child: a_name, parent: b_name }));
            parents.insert((b, a), encoder.symbols.key(VarKey::Parent { child: b_name, parent: a_name }));
            keeps.insert(UnorderedPair(a, b), encoder.symbols.key(VarKey::Keep { a: a_name, b: b_name }));
        }

        Self {
            graph,
            encoding: options.encoding,
            encoder,
            k_bits,
            colors,
            parents,
            keeps,
            distances,
            increments: HashMap::new(),
        }
    }

    #[inline]
    fn max_distance(&self) -> usize {
        self.graph.node_count() - 1
    }

    #[inline]
    fn color_lit(&self, node: usize, color: usize) -> Lit {
        self.colors[node][color].positive()
    }

    #[inline]
    fn name(&self, node: usize) -> &'a str {
        &self.graph.names[node]
    }

    fn emit_colors(&mut self) {
        for node in 0..self.graph.node_count() {
            let lits = self.colors[node].iter().map(|var| var.positive()).collect_vec();
            self.encoder.exactly_one(&lits);

            if let Some(color) = self.graph.hints[node] {
                let hinted = self.color_lit(node, color);
                self.encoder.unit(hinted);
            }
        }

        tracing::trace!(clauses = self.encoder.clauses.len(), "color constraints");
    }

    fn emit_roots(&mut self) {
        for (color, root) in self.graph.roots.iter().enumerate() {
            let rooted = self.color_lit(*root, color);
            self.encoder.unit(rooted);
            self.distances[*root].assert_eq(&mut self.encoder, 0, None);
        }

        tracing::trace!(clauses = self.encoder.clauses.len(), "root constraints");
    }

    fn emit_distance_caps(&mut self) {
        let cap = self.max_distance() as i64;
        for node in 0..self.graph.node_count() {
            if let Distance::Unary(at_least) = &self.distances[node] {
                self.encoder.unary_chain(at_least);
            }

            // without this, a binary distance could wrap around to 0 through the incrementer
            let tag = format!("cap({})", Ident(self.name(node)));
            self.distances[node].assert_at_most(&mut self.encoder, &tag, cap, None);
        }

        tracing::trace!(clauses = self.encoder.clauses.len(), "distance caps");
    }

    fn emit_edges(&mut self) {
        for (a, b, _) in self.graph.graph.all_edges() {
            let ab = self.parents[&(a, b)].positive();
            let ba = self.parents[&(b, a)].positive();
            let keep = self.keeps[&UnorderedPair(a, b)].positive();

            self.encoder.implies(ab, keep);
            self.encoder.implies(ba, keep);
            self.encoder.clause([!keep, ab, ba]);
            // a 2-cycle is not two tree edges
            self.encoder.clause([!ab, !ba]);

            for color in 0..self.graph.colors.len() {
                let (ca, cb) = (self.color_lit(a, color), self.color_lit(b, color));
                self.encoder.clause([!keep, !ca, cb]);
                self.encoder.clause([!keep, ca, !cb]);
            }
        }

        tracing::trace!(clauses = self.encoder.clauses.len(), "edge constraints");
    }

    fn emit_parent_links(&mut self) {
        for (a, b, _) in self.graph.graph.all_edges() {
            for (child, parent) in [(a, b), (b, a)] {
                let edge = self.parents[&(child, parent)].positive();

                for color in 0..self.graph.colors.len() {
                    let (cc, cp) = (self.color_lit(child, color), self.color_lit(parent, color));
                    self.encoder.clause([!edge, !cc, cp]);
                    self.encoder.clause([!edge, cc, !cp]);
                }

                self.link_distance(edge, child, parent);
            }
        }

        tracing::trace!(clauses = self.encoder.clauses.len(), "parent links");
    }

    /// `edge => dist(child) = dist(parent) + 1`
    fn link_distance(&mut self, edge: Lit, child: usize, parent: usize) {
        match (&self.distances[child], &self.distances[parent]) {
            (Distance::Unary(child_at_least), Distance::Unary(parent_at_least)) => {
                self.encoder.unary_successor(edge, child_at_least, parent_at_least);
            }
            (Distance::Binary(child_bits), Distance::Binary(parent_bits)) => {
                if !self.increments.contains_key(&parent) {
                    let tag = format!("inc({})", Ident(self.name(parent)));
                    let sum = self.encoder.increment(&tag, parent_bits);
                    self.increments.insert(parent, sum);
                }

                for (bit, sum) in child_bits.iter().zip(&self.increments[&parent]) {
                    self.encoder.clause([!edge, !*bit, *sum]);
                    self.encoder.clause([!edge, *bit, !*sum]);
                }
            }
            // every node is allocated with the same encoding
            _ => unreachable!("mixed distance encodings"),
        }
    }

    fn emit_parent_choices(&mut self) {
        for node in 0..self.graph.node_count() {
            let choices = self.graph.graph.neighbors(node)
                .map(|neighbor| self.parents[&(node, neighbor)].positive())
                .collect_vec();

            if self.graph.colors_rooted_at(node).next().is_some() {
                // a root has no parent
                choices.iter().for_each(|choice| self.encoder.unit(!*choice));
            } else {
                self.encoder.at_most_one(&choices);
            }

            for (color, root) in self.graph.roots.iter().enumerate() {
                if *root == node {
                    continue;
                }
                let has_color = self.color_lit(node, color);

                if choices.is_empty() {
                    // nothing to hang from
                    self.encoder.unit(!has_color);
                    continue;
                }

                self.encoder.clause(iter::once(!has_color).chain(choices.iter().copied()));

                let tag = format!("nonroot({},{})", Ident(self.name(node)), self.graph.colors[color]);
                self.distances[node].assert_at_least(&mut self.encoder, &tag, 1, Some(has_color));
            }
        }

        tracing::trace!(clauses = self.encoder.clauses.len(), "parent choices");
    }

    fn emit_lower_bounds(&mut self) {
        let max = self.max_distance() as i64;
        for (i, (node, bound)) in self.graph.lower_bounds.iter().enumerate() {
            if *bound > max {
                tracing::debug!(node = self.name(*node), bound, max, "lower bound can never be met");
                self.encoder.clauses.add_empty();
                continue;
            }

            let tag = format!("lb{i}({})", Ident(self.name(*node)));
            self.distances[*node].assert_at_least(&mut self.encoder, &tag, *bound, None);
        }
    }

    fn finish(self) -> Compilation {
        let graph = self.graph;
        let meta = Meta {
            colors: graph.colors.clone(),
            k_bits: self.k_bits,
            max_distance: graph.node_count() - 1,
            nodes: graph.names.clone(),
            edges: graph.graph.all_edges()
                .map(|(a, b, _)| (graph.names[a].clone(), graph.names[b].clone()))
                .collect_vec(),
            encoding: self.encoding,
        };

        let parents = (0..graph.node_count())
            .map(|child| graph.graph.neighbors(child)
                .map(|parent| (parent, self.parents[&(child, parent)]))
                .collect_vec())
            .collect_vec();

        let layout = Layout {
            index: graph.names.iter().cloned().enumerate().map(|(i, name)| (name, i)).collect(),
            roots: graph.roots.clone(),
            colors: self.colors,
            parents,
            keeps: self.keeps,
            distances: self.distances,
        };

        Compilation {
            trivially_unsat: self.encoder.clauses.contains_empty(),
            symbols: self.encoder.symbols,
            clauses: self.encoder.clauses.into_inner(),
            meta,
            layout,
        }
    }
}
