use std::collections::{HashMap, HashSet};
use std::fmt::{Display, Formatter};

use varisat::{Lit, Var};

use crate::compiler::Compilation;
use crate::error::DecodeError;
use crate::problem::Color;

/// One node of a decoded [`Forest`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Membership {
    /// The color class of this node.
    pub color: Color,
    /// Index (into [`Forest::nodes`]) of this node's parent, or `None` for the root of its color.
    pub parent: Option<usize>,
    /// Edges between this node and its root.
    pub distance: u64,
}

/// A coloring of the nodes together with a rooted spanning tree per color, read from a satisfying model.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Forest {
    nodes: Vec<String>,
    index: HashMap<String, usize>,
    members: Vec<Membership>,
    roots: HashMap<Color, usize>,
    max_distance: u64,
}

impl Forest {
    /// Node identifiers, in input order.
    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    /// Per-node results, parallel to [`Self::nodes`].
    pub fn members(&self) -> &[Membership] {
        &self.members
    }

    fn member(&self, node: &str) -> Option<&Membership> {
        self.index.get(node).map(|ix| &self.members[*ix])
    }

    /// The color of `node`.
    pub fn color_of(&self, node: &str) -> Option<Color> {
        self.member(node).map(|m| m.color)
    }

    /// The parent of `node`; `None` for roots and unknown nodes.
    pub fn parent_of(&self, node: &str) -> Option<&str> {
        self.member(node)?.parent.map(|ix| self.nodes[ix].as_str())
    }

    /// The distance of `node` from the root of its color.
    pub fn distance_of(&self, node: &str) -> Option<u64> {
        self.member(node).map(|m| m.distance)
    }

    /// Check the decoded structure really is a forest of the promised shape:
    /// parents share their child's color and sit one step closer to the root,
    /// only roots lack a parent, and every parent chain reaches the root of its color within the distance cap.
    pub fn check(&self) -> Result<(), DecodeError> {
        let node_err = |ix: usize| self.nodes[ix].clone();

        for (ix, member) in self.members.iter().enumerate() {
            let is_root = self.roots.get(&member.color) == Some(&ix);
            match member.parent {
                None if is_root => {
                    if member.distance != 0 {
                        return Err(DecodeError::DistanceMismatch { node: node_err(ix) });
                    }
                }
                None => return Err(DecodeError::NoParent { node: node_err(ix) }),
                Some(_) if is_root => return Err(DecodeError::RootHasParent { node: node_err(ix) }),
                Some(parent) => {
                    let parent = &self.members[parent];
                    if parent.color != member.color {
                        return Err(DecodeError::ColorMismatch { node: node_err(ix) });
                    }
                    if parent.distance + 1 != member.distance {
                        return Err(DecodeError::DistanceMismatch { node: node_err(ix) });
                    }
                }
            }

            // walk up; more than max_distance hops means we are going around in circles
            let mut current = ix;
            let mut hops = 0;
            while let Some(parent) = self.members[current].parent {
                current = parent;
                hops += 1;
                if hops > self.max_distance {
                    return Err(DecodeError::Cycle { node: node_err(ix) });
                }
            }
            if self.roots.get(&member.color) != Some(&current) {
                return Err(DecodeError::Cycle { node: node_err(ix) });
            }
        }

        Ok(())
    }
}

impl Display for Forest {
    /// One line per node: `<node> color <c> parent <p|-> dist <d>`.
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (node, member) in self.nodes.iter().zip(&self.members) {
            let parent = member.parent.map_or("-", |ix| self.nodes[ix].as_str());
            writeln!(f, "{node} color {} parent {parent} dist {}", member.color, member.distance)?;
        }

        Ok(())
    }
}

impl Compilation {
    /// Read a solver model back into a [`Forest`].
    ///
    /// `model` lists literals which hold, in any order; variables not mentioned are taken to be false.
    /// This only extracts the structure; use [`Forest::check`] to validate it.
    pub fn decode(&self, model: &[Lit]) -> Result<Forest, DecodeError> {
        let true_vars: HashSet<Var> = model.iter()
            .filter(|lit| lit.is_positive())
            .map(|lit| lit.var())
            .collect();
        let meta = self.meta();
        let layout = &self.layout;
        let node_err = |ix: usize| meta.nodes[ix].clone();

        let mut members = Vec::with_capacity(meta.nodes.len());
        for ix in 0..meta.nodes.len() {
            let mut colors = layout.colors[ix].iter()
                .enumerate()
                .filter(|(_, var)| true_vars.contains(*var))
                .map(|(color, _)| color);
            let color = colors.next().ok_or_else(|| DecodeError::NoColor { node: node_err(ix) })?;
            if colors.next().is_some() {
                return Err(DecodeError::ManyColors { node: node_err(ix) });
            }

            let mut parents = layout.parents[ix].iter()
                .filter(|(_, var)| true_vars.contains(var))
                .map(|(parent, _)| *parent);
            let parent = parents.next();
            if parents.next().is_some() {
                return Err(DecodeError::ManyParents { node: node_err(ix) });
            }

            members.push(Membership {
                color: meta.colors[color],
                parent,
                distance: layout.distances[ix].value(&true_vars),
            });
        }

        Ok(Forest {
            nodes: meta.nodes.clone(),
            index: layout.index.clone(),
            members,
            roots: meta.colors.iter().copied().zip(layout.roots.iter().copied()).collect(),
            max_distance: meta.max_distance as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use varisat::Lit;

    use crate::compiler::compile;
    use crate::config::CompileOptions;
    use crate::error::DecodeError;
    use crate::problem::Problem;

    fn pair() -> Problem {
        let mut problem = Problem::new();
        problem.add_nodes(["a", "b"]).add_edge("a", "b").set_root(0, "a");
        problem
    }

    fn model(compilation: &crate::Compilation, true_names: &[&str]) -> Vec<Lit> {
        true_names.iter().map(|name| compilation.var_of(name).unwrap().positive()).collect()
    }

    #[test]
    fn decode_hand_written_model() {
        let compilation = compile(&pair(), CompileOptions::default()).unwrap();
        let forest = compilation.decode(&model(&compilation, &["col(a)=0", "col(b)=0", "par(b)->(a)", "dist(b)>=1"])).unwrap();

        assert_eq!(forest.color_of("b"), Some(0));
        assert_eq!(forest.parent_of("b"), Some("a"));
        assert_eq!(forest.parent_of("a"), None);
        assert_eq!(forest.distance_of("b"), Some(1));
        assert_eq!(forest.distance_of("a"), Some(0));
        assert_eq!(forest.check(), Ok(()));
        assert_eq!(forest.to_string(), "a color 0 parent - dist 0\nb color 0 parent a dist 1\n");
    }

    #[test]
    fn decode_rejects_colorless_node() {
        let compilation = compile(&pair(), CompileOptions::default()).unwrap();
        let err = compilation.decode(&model(&compilation, &["col(a)=0"])).unwrap_err();
        assert_eq!(err, DecodeError::NoColor { node: "b".into() });
    }

    #[test]
    fn check_catches_bad_structure() {
        let compilation = compile(&pair(), CompileOptions::default()).unwrap();

        let orphan = compilation.decode(&model(&compilation, &["col(a)=0", "col(b)=0", "dist(b)>=1"])).unwrap();
        assert_eq!(orphan.check(), Err(DecodeError::NoParent { node: "b".into() }));

        let flat = compilation.decode(&model(&compilation, &["col(a)=0", "col(b)=0", "par(b)->(a)"])).unwrap();
        assert_eq!(flat.check(), Err(DecodeError::DistanceMismatch { node: "b".into() }));

        let inverted = compilation.decode(&model(&compilation, &["col(a)=0", "col(b)=0", "par(a)->(b)", "dist(a)>=1"])).unwrap();
        assert_eq!(inverted.check(), Err(DecodeError::RootHasParent { node: "a".into() }));
    }
}
