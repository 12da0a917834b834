use thiserror::Error;

use crate::problem::Color;

/// Reasons [`compile`](crate::compile) may reject a [`Problem`](crate::Problem) before emitting any clause.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum CompileError {
    /// The problem has no nodes at all.
    #[error("the problem has no nodes")]
    NoNodes,
    /// No color appears in any root mapping or hint.
    #[error("no active colors: every color needs a root or a hint")]
    NoColors,
    /// A color is used by a hint but was never given a root.
    #[error("color {color} has no root")]
    MissingRoot {
        /// The hinted color.
        color: Color,
    },
    /// A color was rooted at a node which is not in the node set.
    #[error("color {color} is rooted at unknown node `{node}`")]
    UnknownRoot {
        /// The rooted color.
        color: Color,
        /// The unknown root.
        node: String,
    },
    /// An edge names a node which is not in the node set.
    #[error("edge endpoint `{node}` is not a known node")]
    UnknownEdgeEndpoint {
        /// The unknown endpoint.
        node: String,
    },
    /// An edge connects a node to itself.
    #[error("self-loop on node `{node}`")]
    SelfLoop {
        /// Both endpoints of the edge.
        node: String,
    },
    /// A color hint names a node which is not in the node set.
    #[error("color hint for unknown node `{node}`")]
    UnknownHintNode {
        /// The unknown node.
        node: String,
    },
    /// A color hint is neither `-1` (unconstrained) nor an active color.
    #[error("color hint {hint} on node `{node}` is neither -1 nor an active color")]
    InvalidHint {
        /// The hinted node.
        node: String,
        /// The hint as given.
        hint: i64,
    },
    /// A distance lower bound names a node which is not in the node set.
    #[error("distance bound for unknown node `{node}`")]
    UnknownBoundNode {
        /// The unknown node.
        node: String,
    },
    /// A distance lower bound is negative.
    #[error("distance bound {bound} on node `{node}` is negative")]
    NegativeBound {
        /// The bounded node.
        node: String,
        /// The bound as given.
        bound: i64,
    },
}

/// Reasons a solver model cannot be read back as a colored forest.
///
/// A model satisfying a [`Compilation`](crate::Compilation) never produces these;
/// they indicate a model for some other instance or a broken solver.
/// Each variant names the first offending node, in input order.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum DecodeError {
    /// No color variable of the node is true.
    #[error("node `{node}` has no color")]
    NoColor {
        /// The offending node.
        node: String,
    },
    /// Several color variables of the node are true.
    #[error("node `{node}` has more than one color")]
    ManyColors {
        /// The offending node.
        node: String,
    },
    /// A node which roots no color has no parent.
    #[error("non-root node `{node}` has no parent")]
    NoParent {
        /// The offending node.
        node: String,
    },
    /// Several parent variables of the node are true.
    #[error("node `{node}` has more than one parent")]
    ManyParents {
        /// The offending node.
        node: String,
    },
    /// The root of the node's color has a parent.
    #[error("root node `{node}` has a parent")]
    RootHasParent {
        /// The offending root.
        node: String,
    },
    /// The node and its parent have different colors.
    #[error("node `{node}` does not share the color of its parent")]
    ColorMismatch {
        /// The child of the mismatched pair.
        node: String,
    },
    /// The node's distance is not its parent's plus one, or a root's distance is not 0.
    #[error("distance of node `{node}` is not one more than its parent's")]
    DistanceMismatch {
        /// The offending node.
        node: String,
    },
    /// Following parents from the node loops or ends somewhere other than its root.
    #[error("parent chain from `{node}` does not reach its root within the distance cap")]
    Cycle {
        /// Where the walk started.
        node: String,
    },
}

/// Reasons text input (DIMACS or a problem description) failed to parse.
///
/// Line numbers start at 1.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ParseError {
    /// DIMACS text ended before any `p cnf` line.
    #[error("missing `p cnf` header")]
    MissingHeader,
    /// The first non-comment DIMACS line is not `p cnf <vars> <clauses>`.
    #[error("line {line}: malformed header")]
    BadHeader {
        /// Line of the header.
        line: usize,
    },
    /// A token which should be an integer is not one.
    #[error("line {line}: `{token}` is not a number")]
    BadNumber {
        /// Line of the token.
        line: usize,
        /// The token as read.
        token: String,
    },
    /// A DIMACS literal names a variable above the header's count.
    #[error("line {line}: literal {lit} exceeds the declared variable count")]
    VarOutOfRange {
        /// Line of the literal.
        line: usize,
        /// The literal, signed.
        lit: isize,
    },
    /// DIMACS text ended in the middle of a clause.
    #[error("last clause is not terminated by 0")]
    UnterminatedClause,
    /// The number of DIMACS clauses read differs from the header.
    #[error("header declares {expected} clauses but {found} were read")]
    ClauseCountMismatch {
        /// Count from the header.
        expected: usize,
        /// Count actually read.
        found: usize,
    },
    /// A problem line starts with something other than `node`, `edge`, `root`, `hint` or `bound`.
    #[error("line {line}: unknown directive `{directive}`")]
    UnknownDirective {
        /// Line of the directive.
        line: usize,
        /// The directive as read.
        directive: String,
    },
    /// A problem directive has the wrong number of arguments.
    #[error("line {line}: wrong number of arguments to `{directive}`")]
    Arity {
        /// Line of the directive.
        line: usize,
        /// The directive as read.
        directive: String,
    },
}
