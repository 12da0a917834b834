#![warn(missing_docs)]

//! # `arbor`
//!
//! A compiler from rooted colored spanning forest problems on graphs to Boolean satisfiability (SAT) instances in CNF.
//! Describe the graph, which node roots each color, and any color hints or minimum distances with a [`Problem`],
//! then call [`compile()`], yielding a [`Compilation`] which can be written out as DIMACS for any SAT solver.
//! A model returned by the solver goes back through [`Compilation::decode`] to become a [`Forest`]:
//! a color per node, a parent pointer per non-root node, and each node's distance from its root.
//!
//! ```
//! use arbor::{compile, CompileOptions, Problem};
//!
//! let mut problem = Problem::new();
//! problem.add_nodes(["a", "b"]).add_edge("a", "b").set_root(0, "a");
//!
//! let compilation = compile(&problem, CompileOptions::default()).unwrap();
//! assert!(compilation.to_dimacs().starts_with("p cnf "));
//! ```
//!
//! # Internals
//! Solving is left to the caller; this crate only builds the instance.
//! The problem is: partition the nodes into color classes so that each class is a tree rooted at its color's root,
//! optionally with some nodes at least a given number of edges from their root.
//!
//! Trees are encoded as parent pointers with distances.
//! Every non-root node picks exactly one neighbor of its own color as parent, and its distance is its parent's plus one.
//! Distances are capped at N - 1 and only roots may sit at 0, so parent pointers can't form cycles
//! and every node is connected to the root of its color.
//!
//! Distances are either a thermometer of "at least d" variables ([`DistanceEncoding::Unary`], the default)
//! or a binary number compared and incremented by small circuits ([`DistanceEncoding::Binary`]).
//! Both are built from the gates in [`Encoder`], which hands out every variable through a [`SymbolTable`]
//! so each one has a readable name such as `col(a)=0` or `par(b)->(a)`.

pub use arith::Distance;
pub use clauses::Clauses;
pub use compiler::{compile, Compilation, Meta};
pub use config::{CompileOptions, DistanceEncoding};
pub use error::{CompileError, DecodeError, ParseError};
pub use forest::{Forest, Membership};
pub use gates::Encoder;
pub use problem::{Color, Problem, UNCONSTRAINED};
pub use symbols::SymbolTable;

pub(crate) mod arith;
pub(crate) mod clauses;
pub(crate) mod compiler;
pub(crate) mod config;
pub mod dimacs;
pub(crate) mod error;
pub(crate) mod forest;
pub(crate) mod gates;
pub(crate) mod problem;
pub(crate) mod symbols;
