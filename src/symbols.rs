use std::collections::HashMap;
use std::fmt::{Display, Formatter};

use varisat::Var;

use crate::problem::Color;

/// Bijection between human-readable variable names and solver variables.
///
/// Variables are numbered in the order their names are first seen, starting at DIMACS index 1.
/// Nothing is ever removed or renumbered, so a model from any solver can always be mapped back to names.
#[derive(Clone, Debug, Default)]
pub struct SymbolTable {
    ids: HashMap<String, Var>,
    // names[var.index()]
    names: Vec<String>,
}

impl SymbolTable {
    /// Construct an empty table.
    pub fn new() -> Self {
        Default::default()
    }

    /// Look up `name`, allocating the next variable if it has not been seen before.
    pub fn intern(&mut self, name: &str) -> Var {
        if let Some(var) = self.ids.get(name) {
            return *var;
        }

        let var = Var::from_index(self.names.len());
        self.ids.insert(name.to_owned(), var);
        self.names.push(name.to_owned());
        var
    }

    /// Like [`Self::intern`], but `name` is expected to be new.
    /// Reusing a name here would silently alias two unrelated gate outputs.
    pub(crate) fn intern_fresh(&mut self, name: &str) -> Var {
        debug_assert!(!self.ids.contains_key(name), "variable `{name}` allocated twice");
        self.intern(name)
    }

    /// The variable called `name`, if any.
    pub fn var_of(&self, name: &str) -> Option<Var> {
        self.ids.get(name).copied()
    }

    /// The name of `var`, if it was allocated by this table.
    pub fn name_of(&self, var: Var) -> Option<&str> {
        self.names.get(var.index()).map(String::as_str)
    }

    /// Number of variables allocated so far.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether no variable has been allocated.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// All variables with their names, in allocation order.
    pub fn iter(&self) -> impl Iterator<Item=(Var, &str)> + '_ {
        self.names.iter()
            .enumerate()
            .map(|(index, name)| (Var::from_index(index), name.as_str()))
    }
}

/// Structured names for the variables the compiler allocates per node, edge and color.
/// The [`Display`] form is what ends up in the [`SymbolTable`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub(crate) enum VarKey<'a> {
    /// `node` belongs to color class `color`.
    Color { node: &'a str, color: Color },
    /// `parent` is the parent of `child` in its tree.
    Parent { child: &'a str, parent: &'a str },
    /// The undirected edge is part of some tree.
    Keep { a: &'a str, b: &'a str },
    /// Bit `bit` (LSB = 0) of the binary distance of `node`.
    DistanceBit { node: &'a str, bit: usize },
    /// The distance of `node` is at least `threshold`.
    DistanceAtLeast { node: &'a str, threshold: usize },
}

impl Display for VarKey<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match *self {
            VarKey::Color { node, color } => write!(f, "col({})={color}", Ident(node)),
            VarKey::Parent { child, parent } => write!(f, "par({})->({})", Ident(child), Ident(parent)),
            VarKey::Keep { a, b } => write!(f, "keep({},{})", Ident(a), Ident(b)),
            VarKey::DistanceBit { node, bit } => write!(f, "dist({})_b{bit}", Ident(node)),
            VarKey::DistanceAtLeast { node, threshold } => write!(f, "dist({})>={threshold}", Ident(node)),
        }
    }
}

/// A node id as it appears inside a variable name.
///
/// Ids made only of ASCII alphanumerics, `_` and `.` are written as is; anything else is written as a quoted,
/// escaped string literal, so `keep("x,y",z)` and `keep(x,"y,z")` stay apart.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Ident<'a>(pub(crate) &'a str);

impl Display for Ident<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let plain = !self.0.is_empty() && self.0.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
        if plain {
            f.write_str(self.0)
        } else {
            write!(f, "{:?}", self.0)
        }
    }
}

impl SymbolTable {
    /// Allocate the variable for `key`. Each key is allocated once per compilation.
    pub(crate) fn key(&mut self, key: VarKey) -> Var {
        self.intern_fresh(&key.to_string())
    }
}
