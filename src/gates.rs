use std::ops::Index;

use itertools::Itertools;
use varisat::{Lit, Var};

use crate::clauses::Clauses;
use crate::symbols::SymbolTable;

/// Clauses stating exactly one of `lits` holds.
pub(crate) fn exactly_one(lits: &[Lit]) -> Vec<Vec<Lit>> {
    let mut clauses = at_most_one(lits);
    // at least one lit is true; A + B + C + ...
    clauses.push(lits.to_vec());

    clauses
}

/// Clauses stating no two of `lits` hold.
pub(crate) fn at_most_one(lits: &[Lit]) -> Vec<Vec<Lit>> {
    let mut clauses = Vec::with_capacity(lits.len() * (lits.len() + 1) / 2 + 1);

    // no two are true; (!A + !B) * (!A + !C) * ...
    clauses.extend(lits.iter()
        .combinations(2)
        .map(|pair| vec![!**pair.index(0), !**pair.index(1)])
    );

    clauses
}

/// A [`SymbolTable`] and [`Clauses`] under construction together, with Tseitin gates on top.
///
/// Every variable comes from the symbol table so models can always be read back by name.
#[derive(Clone, Debug, Default)]
pub struct Encoder {
    pub(crate) symbols: SymbolTable,
    pub(crate) clauses: Clauses,
}

impl Encoder {
    /// Construct an empty encoder.
    pub fn new() -> Self {
        Default::default()
    }

    /// Look up or allocate the variable called `name`.
    pub fn var(&mut self, name: &str) -> Var {
        self.symbols.intern(name)
    }

    /// See [`Clauses::add_clause`].
    pub fn clause(&mut self, lits: impl IntoIterator<Item=Lit>) -> bool {
        self.clauses.add_clause(lits)
    }

    /// Force `lit` to hold.
    pub fn unit(&mut self, lit: Lit) {
        self.clauses.add_unit(lit)
    }

    /// `a => b`, i.e. `!a + b`.
    pub fn implies(&mut self, a: Lit, b: Lit) {
        self.clause([!a, b]);
    }

    /// `a <=> b`.
    pub fn equivalent(&mut self, a: Lit, b: Lit) {
        self.implies(a, b);
        self.implies(b, a);
    }

    /// Exactly one of `lits` holds. With no `lits` this is the empty clause.
    pub fn exactly_one(&mut self, lits: &[Lit]) {
        exactly_one(lits).into_iter().for_each(|clause| { self.clause(clause); });
    }

    /// At most one of `lits` holds.
    pub fn at_most_one(&mut self, lits: &[Lit]) {
        at_most_one(lits).into_iter().for_each(|clause| { self.clause(clause); });
    }

    /// A fresh variable `x` named `tag` with `x <=> a * b`.
    ///
    /// `tag` must not have been used before.
    pub fn and_gate(&mut self, tag: &str, a: Lit, b: Lit) -> Lit {
        let x = self.symbols.intern_fresh(tag).positive();

        // X => AB = (!X + A)(!X + B)
        // AB => X = !A + !B + X
        self.clause([!x, a]);
        self.clause([!x, b]);
        self.clause([!a, !b, x]);

        x
    }

    /// A fresh variable `x` named `tag` with `x <=> a ^ b`.
    ///
    /// `tag` must not have been used before.
    pub fn xor_gate(&mut self, tag: &str, a: Lit, b: Lit) -> Lit {
        let x = self.symbols.intern_fresh(tag).positive();

        // one clause per input combination, ruling out the wrong output for it
        self.clause([!x, !a, !b]);
        self.clause([!x, a, b]);
        self.clause([x, !a, b]);
        self.clause([x, a, !b]);

        x
    }

    /// Read-only view of the symbols allocated so far.
    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Read-only view of the clauses emitted so far.
    pub fn clauses(&self) -> &Clauses {
        &self.clauses
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashSet;

    use itertools::Itertools;
    use varisat::{ExtendFormula, Lit, Solver, Var};

    use super::Encoder;

    /// Every model of `encoder`'s clauses, projected onto `vars`.
    pub(crate) fn models(encoder: &Encoder, vars: &[Var]) -> HashSet<Vec<bool>> {
        let mut solver = Solver::new();
        encoder.clauses.iter().for_each(|clause| solver.add_clause(clause));

        let mut found = HashSet::new();
        while solver.solve().unwrap() {
            let model: HashSet<Lit> = solver.model().unwrap().into_iter().collect();
            let projection = vars.iter().map(|var| model.contains(&var.positive())).collect_vec();

            // block this projection and look for another
            let blocking = vars.iter().zip(&projection).map(|(var, value)| var.lit(!*value)).collect_vec();
            solver.add_clause(&blocking);
            found.insert(projection);
        }

        found
    }

    #[test]
    fn exactly_one_of_four() {
        let mut encoder = Encoder::new();
        let vars = (0..4).map(|i| encoder.var(&format!("v{i}"))).collect_vec();
        encoder.exactly_one(&vars.iter().map(|v| v.positive()).collect_vec());

        let found = models(&encoder, &vars);
        assert_eq!(found.len(), 4);
        assert!(found.iter().all(|model| model.iter().filter(|b| **b).count() == 1));
    }

    #[test]
    fn exactly_one_of_nothing_is_unsat() {
        let mut encoder = Encoder::new();
        encoder.exactly_one(&[]);
        assert!(encoder.clauses.contains_empty());
    }

    #[test]
    fn gate_truth_tables() {
        let mut encoder = Encoder::new();
        let a = encoder.var("a");
        let b = encoder.var("b");
        let and = encoder.and_gate("and", a.positive(), b.positive());
        let xor = encoder.xor_gate("xor", a.positive(), b.positive());

        let found = models(&encoder, &[a, b, and.var(), xor.var()]);
        let expected: HashSet<Vec<bool>> = [(false, false), (false, true), (true, false), (true, true)]
            .into_iter()
            .map(|(a, b)| vec![a, b, a && b, a != b])
            .collect();
        assert_eq!(found, expected);
    }

    #[test]
    fn gates_accept_negated_inputs() {
        let mut encoder = Encoder::new();
        let a = encoder.var("a");
        let b = encoder.var("b");
        let nor = encoder.and_gate("nor", a.negative(), b.negative());

        let found = models(&encoder, &[a, b, nor.var()]);
        assert!(found.iter().all(|m| m[2] == (!m[0] && !m[1])));
        assert_eq!(found.len(), 4);
    }

    #[test]
    fn equivalence_both_ways() {
        let mut encoder = Encoder::new();
        let a = encoder.var("a");
        let b = encoder.var("b");
        encoder.equivalent(a.positive(), b.negative());

        let found = models(&encoder, &[a, b]);
        assert_eq!(found, [vec![true, false], vec![false, true]].into_iter().collect());
    }
}
