use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::str::FromStr;

use itertools::Itertools;
use petgraph::graphmap::UnGraphMap;

use crate::error::{CompileError, ParseError};

/// Identifier of a color class.
pub type Color = u32;

/// Hint value leaving a node's color up to the solver.
pub const UNCONSTRAINED: i64 = -1;

/// A colored forest problem: partition `nodes` into color classes, each a tree over `edges` rooted at the color's root.
///
/// Built with chained calls, in the manner of
/// ```
/// use arbor::Problem;
///
/// let mut problem = Problem::new();
/// problem
///     .add_nodes(["a", "b", "c"])
///     .add_edge("a", "b")
///     .add_edge("b", "c")
///     .set_root(0, "a")
///     .require_distance("c", 2);
/// ```
///
/// Nothing is checked until the problem is handed to [`compile`](crate::compile).
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Problem {
    nodes: Vec<String>,
    node_set: HashSet<String>,
    edges: Vec<(String, String)>,
    roots: BTreeMap<Color, String>,
    hints: BTreeMap<String, i64>,
    lower_bounds: Vec<(String, i64)>,
}

impl Problem {
    /// Construct an empty problem.
    pub fn new() -> Self {
        Default::default()
    }

    /// Add a node. Adding a node twice has no further effect.
    pub fn add_node(&mut self, node: impl Into<String>) -> &mut Self {
        let node = node.into();
        if self.node_set.insert(node.clone()) {
            self.nodes.push(node);
        }

        self
    }

    /// Shorthand for multiple calls to [`Self::add_node`].
    pub fn add_nodes<S: Into<String>>(&mut self, nodes: impl IntoIterator<Item=S>) -> &mut Self {
        nodes.into_iter().for_each(|node| { self.add_node(node); });
        self
    }

    /// Add an undirected edge. Repeated edges, in either orientation, are merged.
    pub fn add_edge(&mut self, a: impl Into<String>, b: impl Into<String>) -> &mut Self {
        self.edges.push((a.into(), b.into()));
        self
    }

    /// Make `node` the root of `color`, activating that color. A later call for the same color replaces the root.
    pub fn set_root(&mut self, color: Color, node: impl Into<String>) -> &mut Self {
        self.roots.insert(color, node.into());
        self
    }

    /// Require `node` to take `color`, or leave it free with [`UNCONSTRAINED`].
    pub fn hint(&mut self, node: impl Into<String>, color: i64) -> &mut Self {
        self.hints.insert(node.into(), color);
        self
    }

    /// Require `node` to be at least `min` edges away from the root of its color.
    pub fn require_distance(&mut self, node: impl Into<String>, min: i64) -> &mut Self {
        self.lower_bounds.push((node.into(), min));
        self
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    /// Edges as given, before merging.
    pub fn edges(&self) -> &[(String, String)] {
        &self.edges
    }

    /// The root of each rooted color.
    pub fn roots(&self) -> &BTreeMap<Color, String> {
        &self.roots
    }

    /// Check this problem, producing the index-based form the compiler works on.
    pub(crate) fn validate(&self) -> Result<Graph, CompileError> {
        if self.nodes.is_empty() {
            return Err(CompileError::NoNodes);
        }

        let index: HashMap<&str, usize> = self.nodes.iter()
            .enumerate()
            .map(|(i, node)| (node.as_str(), i))
            .collect();

        let mut hinted = Vec::with_capacity(self.hints.len());
        for (node, hint) in &self.hints {
            let Some(ix) = index.get(node.as_str()) else {
                return Err(CompileError::UnknownHintNode { node: node.clone() });
            };
            match *hint {
                UNCONSTRAINED => {}
                hint if hint < 0 || hint > Color::MAX as i64 => {
                    return Err(CompileError::InvalidHint { node: node.clone(), hint });
                }
                hint => hinted.push((*ix, hint as Color)),
            }
        }

        // a color is active once it is rooted or hinted
        let colors = self.roots.keys()
            .copied()
            .chain(hinted.iter().map(|(_, color)| *color))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect_vec();
        if colors.is_empty() {
            return Err(CompileError::NoColors);
        }

        let mut roots = Vec::with_capacity(colors.len());
        for color in &colors {
            let Some(root) = self.roots.get(color) else {
                return Err(CompileError::MissingRoot { color: *color });
            };
            let Some(ix) = index.get(root.as_str()) else {
                return Err(CompileError::UnknownRoot { color: *color, node: root.clone() });
            };
            roots.push(*ix);
        }

        let mut graph = UnGraphMap::with_capacity(self.nodes.len(), self.edges.len());
        for ix in 0..self.nodes.len() {
            graph.add_node(ix);
        }
        let endpoint = |node: &String| index.get(node.as_str())
            .copied()
            .ok_or_else(|| CompileError::UnknownEdgeEndpoint { node: node.clone() });
        for (a, b) in &self.edges {
            let (a_ix, b_ix) = (endpoint(a)?, endpoint(b)?);
            if a_ix == b_ix {
                return Err(CompileError::SelfLoop { node: a.clone() });
            }

            graph.add_edge(a_ix, b_ix, ());
        }

        let color_index: HashMap<Color, usize> = colors.iter().enumerate().map(|(i, c)| (*c, i)).collect();
        let mut hints = vec![None; self.nodes.len()];
        for (ix, color) in hinted {
            hints[ix] = color_index.get(&color).copied();
        }

        let mut lower_bounds = Vec::with_capacity(self.lower_bounds.len());
        for (node, bound) in &self.lower_bounds {
            let Some(ix) = index.get(node.as_str()) else {
                return Err(CompileError::UnknownBoundNode { node: node.clone() });
            };
            if *bound < 0 {
                return Err(CompileError::NegativeBound { node: node.clone(), bound: *bound });
            }
            lower_bounds.push((*ix, *bound));
        }

        Ok(Graph {
            names: self.nodes.clone(),
            graph,
            colors,
            roots,
            hints,
            lower_bounds,
        })
    }
}

/// A validated [`Problem`], with nodes and colors replaced by their indices.
#[derive(Clone, Debug)]
pub(crate) struct Graph {
    pub(crate) names: Vec<String>,
    // nodes are indices into `names`; duplicate edges are merged by the map
    pub(crate) graph: UnGraphMap<usize, ()>,
    // ascending
    pub(crate) colors: Vec<Color>,
    // roots[i] is the root of colors[i]
    pub(crate) roots: Vec<usize>,
    // index into `colors`
    pub(crate) hints: Vec<Option<usize>>,
    pub(crate) lower_bounds: Vec<(usize, i64)>,
}

impl Graph {
    pub(crate) fn node_count(&self) -> usize {
        self.names.len()
    }

    /// Color indices rooted at `node`.
    pub(crate) fn colors_rooted_at(&self, node: usize) -> impl Iterator<Item=usize> + '_ {
        self.roots.iter().positions(move |root| *root == node)
    }
}

/// Reads the line-oriented problem format:
///
/// ```text
/// # comment
/// node a b c
/// edge a b
/// root 0 a
/// hint b -1
/// bound c 2
/// ```
impl FromStr for Problem {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut problem = Problem::new();

        for (line, text) in s.lines().enumerate().map(|(i, text)| (i + 1, text)) {
            let text = text.split('#').next().unwrap_or_default();
            let mut words = text.split_whitespace();
            let Some(directive) = words.next() else {
                continue;
            };
            let args = words.collect_vec();

            let arity = |expected: usize| if args.len() == expected {
                Ok(())
            } else {
                Err(ParseError::Arity { line, directive: directive.to_owned() })
            };
            let number = |token: &str| token.parse::<i64>()
                .map_err(|_| ParseError::BadNumber { line, token: token.to_owned() });

            match directive {
                "node" => {
                    problem.add_nodes(args.iter().copied());
                }
                "edge" => {
                    arity(2)?;
                    problem.add_edge(args[0], args[1]);
                }
                "root" => {
                    arity(2)?;
                    let color = args[0].parse::<Color>()
                        .map_err(|_| ParseError::BadNumber { line, token: args[0].to_owned() })?;
                    problem.set_root(color, args[1]);
                }
                "hint" => {
                    arity(2)?;
                    problem.hint(args[0], number(args[1])?);
                }
                "bound" => {
                    arity(2)?;
                    problem.require_distance(args[0], number(args[1])?);
                }
                _ => return Err(ParseError::UnknownDirective { line, directive: directive.to_owned() }),
            }
        }

        Ok(problem)
    }
}

#[cfg(test)]
mod tests {
    use crate::error::{CompileError, ParseError};

    use super::{Problem, UNCONSTRAINED};

    fn path() -> Problem {
        let mut problem = Problem::new();
        problem.add_nodes(["a", "b", "c"]).add_edge("a", "b").add_edge("b", "c");
        problem
    }

    #[test]
    fn duplicate_edges_merge() {
        let mut problem = path();
        problem.add_edge("b", "a").add_edge("a", "b").add_node("a").set_root(0, "a");
        let graph = problem.validate().unwrap();
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.graph.edge_count(), 2);
    }

    #[test]
    fn rejects_empty() {
        assert_eq!(Problem::new().validate().unwrap_err(), CompileError::NoNodes);
    }

    #[test]
    fn rejects_no_colors() {
        let mut problem = path();
        problem.hint("a", UNCONSTRAINED);
        assert_eq!(problem.validate().unwrap_err(), CompileError::NoColors);
    }

    #[test]
    fn rejects_hinted_color_without_root() {
        let mut problem = path();
        problem.set_root(0, "a").hint("c", 1);
        assert_eq!(problem.validate().unwrap_err(), CompileError::MissingRoot { color: 1 });
    }

    #[test]
    fn rejects_unknown_root() {
        let mut problem = path();
        problem.set_root(3, "z");
        assert_eq!(problem.validate().unwrap_err(), CompileError::UnknownRoot { color: 3, node: "z".into() });
    }

    #[test]
    fn rejects_bad_edges() {
        let mut problem = path();
        problem.set_root(0, "a").add_edge("c", "q");
        assert_eq!(problem.validate().unwrap_err(), CompileError::UnknownEdgeEndpoint { node: "q".into() });

        let mut problem = path();
        problem.set_root(0, "a").add_edge("b", "b");
        assert_eq!(problem.validate().unwrap_err(), CompileError::SelfLoop { node: "b".into() });
    }

    #[test]
    fn rejects_bad_hints() {
        let mut problem = path();
        problem.set_root(0, "a").hint("b", -2);
        assert_eq!(problem.validate().unwrap_err(), CompileError::InvalidHint { node: "b".into(), hint: -2 });

        let mut problem = path();
        problem.set_root(0, "a").hint("x", 0);
        assert_eq!(problem.validate().unwrap_err(), CompileError::UnknownHintNode { node: "x".into() });
    }

    #[test]
    fn rejects_bad_bounds() {
        let mut problem = path();
        problem.set_root(0, "a").require_distance("c", -1);
        assert_eq!(problem.validate().unwrap_err(), CompileError::NegativeBound { node: "c".into(), bound: -1 });

        let mut problem = path();
        problem.set_root(0, "a").require_distance("d", 1);
        assert_eq!(problem.validate().unwrap_err(), CompileError::UnknownBoundNode { node: "d".into() });
    }

    #[test]
    fn hints_index_colors() {
        let mut problem = path();
        problem.set_root(4, "a").set_root(2, "c").hint("b", 4).hint("a", UNCONSTRAINED);
        let graph = problem.validate().unwrap();
        assert_eq!(graph.colors, vec![2, 4]);
        assert_eq!(graph.roots, vec![2, 0]);
        assert_eq!(graph.hints, vec![None, Some(1), None]);
        assert_eq!(graph.colors_rooted_at(2).collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn parse_text() {
        let problem: Problem = "
            # a path
            node a b
            node c
            edge a b
            edge b c   # trailing comment
            root 0 a
            hint c 0
            bound c 2
        ".parse().unwrap();

        let mut expected = path();
        expected.set_root(0, "a").hint("c", 0).require_distance("c", 2);
        assert_eq!(problem, expected);
    }

    #[test]
    fn parse_errors() {
        assert_eq!("edge a".parse::<Problem>().unwrap_err(), ParseError::Arity { line: 1, directive: "edge".into() });
        assert_eq!("node a\nbound a x".parse::<Problem>().unwrap_err(), ParseError::BadNumber { line: 2, token: "x".into() });
        assert_eq!("colour a 1".parse::<Problem>().unwrap_err(), ParseError::UnknownDirective { line: 1, directive: "colour".into() });
    }
}
