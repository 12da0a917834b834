use itertools::Itertools;
use varisat::Lit;

/// An append-only list of clauses, each a set of literals read as their disjunction.
///
/// Repeated literals are collapsed and clauses containing both a literal and its negation are never stored.
#[derive(Clone, Debug, Default)]
pub struct Clauses {
    clauses: Vec<Vec<Lit>>,
    has_empty: bool,
}

impl Clauses {
    /// Construct an empty clause list.
    pub fn new() -> Self {
        Default::default()
    }

    /// Store the disjunction of `lits`, returning whether anything was stored.
    ///
    /// A tautology (some `v` together with `!v`) is dropped.
    /// No literals at all stores the empty clause, making the whole instance unsatisfiable.
    pub fn add_clause(&mut self, lits: impl IntoIterator<Item=Lit>) -> bool {
        let clause = lits.into_iter().unique().collect_vec();

        if clause.iter().any(|lit| clause.contains(&!*lit)) {
            return false;
        }

        self.has_empty |= clause.is_empty();
        self.clauses.push(clause);
        true
    }

    /// Store the clause consisting of only `lit`.
    pub fn add_unit(&mut self, lit: Lit) {
        self.add_clause([lit]);
    }

    /// Store the empty clause.
    pub fn add_empty(&mut self) {
        self.add_clause(std::iter::empty());
    }

    /// Whether the empty clause has been stored.
    pub fn contains_empty(&self) -> bool {
        self.has_empty
    }

    /// Number of stored clauses.
    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    /// Whether no clause has been stored.
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Stored clauses, in emission order.
    pub fn iter(&self) -> impl Iterator<Item=&[Lit]> + '_ {
        self.clauses.iter().map(Vec::as_slice)
    }

    pub(crate) fn into_inner(self) -> Vec<Vec<Lit>> {
        self.clauses
    }
}
