use std::collections::HashSet;

use varisat::{Lit, Var};

use crate::gates::Encoder;

/// Largest value a `width`-bit unsigned vector can hold.
pub(crate) fn bits_max(width: usize) -> u64 {
    if width >= 64 { u64::MAX } else { (1 << width) - 1 }
}

/// The literal stating `bit` has the value `value`.
#[inline]
fn bit_is(bit: Lit, value: bool) -> Lit {
    if value { bit } else { !bit }
}

impl Encoder {
    /// Emit the disjunction of `lits`, or `guard => (disjunction of lits)` if there is a guard.
    fn clause_when(&mut self, guard: Option<Lit>, lits: impl IntoIterator<Item=Lit>) {
        self.clause(guard.map(|g| !g).into_iter().chain(lits));
    }

    fn conjoin(&mut self, tag: String, acc: Option<Lit>, lit: Lit) -> Lit {
        match acc {
            None => lit,
            Some(acc) => self.and_gate(&tag, acc, lit),
        }
    }

    /// `bits` (least significant first) equal `value`.
    ///
    /// A `value` the bits cannot hold makes the constraint unsatisfiable.
    pub fn bits_eq_const(&mut self, bits: &[Lit], value: i64, guard: Option<Lit>) {
        if value < 0 || value as u64 > bits_max(bits.len()) {
            self.clause_when(guard, std::iter::empty());
            return;
        }

        for (i, bit) in bits.iter().enumerate() {
            self.clause_when(guard, [bit_is(*bit, value >> i & 1 == 1)]);
        }
    }

    /// `bits` (least significant first), read as an unsigned number, are at least `bound`.
    ///
    /// Built from the most significant bit down: `eq_above` holds while every bit seen so far matches `bound`,
    /// and the bits would be smaller than `bound` exactly if, at the first bit which doesn't match, `bound` has a 1.
    /// Each such witness is ruled out.
    /// Gate variables are named after `tag`, which must be unique per call.
    pub fn bits_ge_const(&mut self, tag: &str, bits: &[Lit], bound: i64, guard: Option<Lit>) {
        if bound <= 0 {
            return;
        }
        if bound as u64 > bits_max(bits.len()) {
            self.clause_when(guard, std::iter::empty());
            return;
        }
        let bound = bound as u64;

        let mut eq_above = None;
        for (i, bit) in bits.iter().enumerate().rev() {
            let bound_bit = bound >> i & 1 == 1;
            if bound_bit {
                // first difference is here, with a 0 where bound has a 1
                let less = self.conjoin(format!("{tag}.lt{i}"), eq_above, !*bit);
                // asserting !(less_1 + less_2 + ...) is asserting every !less_i
                self.clause_when(guard, [!less]);
            }

            if i > 0 {
                eq_above = Some(self.conjoin(format!("{tag}.eq{i}"), eq_above, bit_is(*bit, bound_bit)));
            }
        }
    }

    /// `bits` (least significant first), read as an unsigned number, are at most `bound`.
    ///
    /// Mirror image of [`Self::bits_ge_const`]: a witness is a first mismatch where the bits have a 1 and `bound` a 0.
    /// A `bound` at or above the largest representable value emits nothing; a negative one is unsatisfiable.
    pub fn bits_le_const(&mut self, tag: &str, bits: &[Lit], bound: i64, guard: Option<Lit>) {
        if bound < 0 {
            self.clause_when(guard, std::iter::empty());
            return;
        }
        if bound as u64 >= bits_max(bits.len()) {
            return;
        }
        let bound = bound as u64;

        let mut eq_above = None;
        for (i, bit) in bits.iter().enumerate().rev() {
            let bound_bit = bound >> i & 1 == 1;
            if !bound_bit {
                let greater = self.conjoin(format!("{tag}.gt{i}"), eq_above, *bit);
                self.clause_when(guard, [!greater]);
            }

            if i > 0 {
                eq_above = Some(self.conjoin(format!("{tag}.eq{i}"), eq_above, bit_is(*bit, bound_bit)));
            }
        }
    }

    /// Ripple-carry `bits + 1`, returning the sum bits (least significant first), wrapping on overflow.
    ///
    /// `sum[i] = bits[i] ^ carry[i]` and `carry[i + 1] = bits[i] * carry[i]` with `carry[0] = 1`,
    /// which for bit 0 reduces to `sum[0] = !bits[0]` and `carry[1] = bits[0]`.
    pub fn increment(&mut self, tag: &str, bits: &[Lit]) -> Vec<Lit> {
        let mut sum = Vec::with_capacity(bits.len());
        let Some((first, rest)) = bits.split_first() else {
            return sum;
        };

        sum.push(!*first);
        let mut carry = *first;
        for (i, bit) in rest.iter().enumerate().map(|(i, bit)| (i + 1, *bit)) {
            sum.push(self.xor_gate(&format!("{tag}.sum{i}"), bit, carry));
            // the carry out of the top bit is never read
            if i + 1 < bits.len() {
                carry = self.and_gate(&format!("{tag}.carry{}", i + 1), bit, carry);
            }
        }

        sum
    }

    /// `at_least[d - 1]` means "at least `d`", so each threshold implies the one below it.
    pub fn unary_chain(&mut self, at_least: &[Lit]) {
        for pair in at_least.windows(2) {
            self.implies(pair[1], pair[0]);
        }
    }

    /// The thermometer `at_least` reads exactly `value`.
    pub fn unary_eq_const(&mut self, at_least: &[Lit], value: i64, guard: Option<Lit>) {
        if value < 0 || value as u64 > at_least.len() as u64 {
            self.clause_when(guard, std::iter::empty());
            return;
        }

        for (i, lit) in at_least.iter().enumerate() {
            self.clause_when(guard, [bit_is(*lit, (i as i64) < value)]);
        }
    }

    /// The thermometer `at_least` reads at least `bound`.
    pub fn unary_ge_const(&mut self, at_least: &[Lit], bound: i64, guard: Option<Lit>) {
        if bound <= 0 {
            return;
        }
        match at_least.get(bound as usize - 1) {
            Some(lit) => self.clause_when(guard, [*lit]),
            None => self.clause_when(guard, std::iter::empty()),
        }
    }

    /// The thermometer `at_least` reads at most `bound`.
    pub fn unary_le_const(&mut self, at_least: &[Lit], bound: i64, guard: Option<Lit>) {
        if bound < 0 {
            self.clause_when(guard, std::iter::empty());
            return;
        }
        if let Some(lit) = at_least.get(bound as usize) {
            self.clause_when(guard, [!*lit]);
        }
    }

    /// If `edge` holds, the thermometer `child` reads one more than `parent`.
    ///
    /// Stated directly on thresholds as `child >= d + 1 <=> parent >= d`, so no adder is needed.
    /// A parent at the top of the scale leaves no room for the child, so `edge` rules that out.
    pub fn unary_successor(&mut self, edge: Lit, child: &[Lit], parent: &[Lit]) {
        // parent >= 0 always, so child >= 1
        if let Some(child_one) = child.first() {
            self.implies(edge, *child_one);
        } else {
            self.clause([!edge]);
        }

        for (d, parent_at_least) in parent.iter().enumerate().map(|(i, lit)| (i + 1, *lit)) {
            match child.get(d) {
                Some(child_at_least) => {
                    // parent >= d => child >= d + 1
                    self.clause([!edge, !parent_at_least, *child_at_least]);
                    // child >= d + 1 => parent >= d
                    self.clause([!edge, !*child_at_least, parent_at_least]);
                }
                None => {
                    self.clause([!edge, !parent_at_least]);
                }
            }
        }

        // child thresholds beyond what parent can reach
        for child_at_least in child.iter().skip(parent.len() + 1) {
            self.clause([!edge, !*child_at_least]);
        }
    }
}

/// How one node's distance from its root is represented.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Distance {
    /// Unsigned bit vector, least significant bit first.
    Binary(Vec<Lit>),
    /// Thermometer code: element `d - 1` holds iff the distance is at least `d`.
    Unary(Vec<Lit>),
}

impl Distance {
    /// Largest distance this representation can hold.
    pub fn max_value(&self) -> u64 {
        match self {
            Distance::Binary(bits) => bits_max(bits.len()),
            Distance::Unary(at_least) => at_least.len() as u64,
        }
    }

    /// The variables making up this distance.
    pub fn vars(&self) -> impl Iterator<Item=Var> + '_ {
        match self {
            Distance::Binary(lits) | Distance::Unary(lits) => lits.iter().map(|lit| lit.var()),
        }
    }

    /// Read this distance out of the set of variables a model makes true.
    pub fn value(&self, true_vars: &HashSet<Var>) -> u64 {
        let holds = |lit: &Lit| true_vars.contains(&lit.var()) == lit.is_positive();
        match self {
            Distance::Binary(bits) => bits.iter()
                .enumerate()
                .filter(|(_, bit)| holds(*bit))
                .map(|(i, _)| 1u64 << i)
                .sum(),
            // the chain keeps thresholds monotone, so counting is enough
            Distance::Unary(at_least) => at_least.iter().filter(|lit| holds(*lit)).count() as u64,
        }
    }

    pub(crate) fn assert_eq(&self, encoder: &mut Encoder, value: i64, guard: Option<Lit>) {
        match self {
            Distance::Binary(bits) => encoder.bits_eq_const(bits, value, guard),
            Distance::Unary(at_least) => encoder.unary_eq_const(at_least, value, guard),
        }
    }

    pub(crate) fn assert_at_least(&self, encoder: &mut Encoder, tag: &str, bound: i64, guard: Option<Lit>) {
        match self {
            Distance::Binary(bits) => encoder.bits_ge_const(tag, bits, bound, guard),
            Distance::Unary(at_least) => encoder.unary_ge_const(at_least, bound, guard),
        }
    }

    pub(crate) fn assert_at_most(&self, encoder: &mut Encoder, tag: &str, bound: i64, guard: Option<Lit>) {
        match self {
            Distance::Binary(bits) => encoder.bits_le_const(tag, bits, bound, guard),
            Distance::Unary(at_least) => encoder.unary_le_const(at_least, bound, guard),
        }
    }
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;
    use proptest::prelude::*;
    use varisat::{Lit, Var};

    use crate::gates::tests::models;
    use crate::gates::Encoder;

    use super::Distance;

    fn vector(encoder: &mut Encoder, name: &str, width: usize) -> (Vec<Var>, Vec<Lit>) {
        let vars = (0..width).map(|i| encoder.var(&format!("{name}{i}"))).collect_vec();
        let lits = vars.iter().map(|v| v.positive()).collect_vec();
        (vars, lits)
    }

    fn read(bits: &[bool]) -> i64 {
        bits.iter().enumerate().filter(|(_, b)| **b).map(|(i, _)| 1 << i).sum()
    }

    /// Values of a `width`-bit vector satisfying whatever `constrain` emits.
    fn admitted(width: usize, constrain: impl FnOnce(&mut Encoder, &[Lit])) -> Vec<i64> {
        let mut encoder = Encoder::new();
        let (vars, lits) = vector(&mut encoder, "x", width);
        constrain(&mut encoder, &lits);
        models(&encoder, &vars).iter().map(|m| read(m)).sorted().collect_vec()
    }

    #[test]
    fn ge_truth_table() {
        for width in 1..=4 {
            let max = (1i64 << width) - 1;
            for bound in -1..=max + 1 {
                let values = admitted(width, |enc, bits| enc.bits_ge_const("ge", bits, bound, None));
                let expected = (0..=max).filter(|v| *v >= bound).collect_vec();
                assert_eq!(values, expected, "width {width}, bits >= {bound}");
            }
        }
    }

    #[test]
    fn le_truth_table() {
        for width in 1..=4 {
            let max = (1i64 << width) - 1;
            for bound in -1..=max + 1 {
                let values = admitted(width, |enc, bits| enc.bits_le_const("le", bits, bound, None));
                let expected = (0..=max).filter(|v| *v <= bound).collect_vec();
                assert_eq!(values, expected, "width {width}, bits <= {bound}");
            }
        }
    }

    #[test]
    fn eq_truth_table() {
        for value in -1..=8 {
            let values = admitted(3, |enc, bits| enc.bits_eq_const(bits, value, None));
            let expected = (0..=7).filter(|v| *v == value).collect_vec();
            assert_eq!(values, expected);
        }
    }

    #[test]
    fn guard_only_applies_when_set() {
        let mut encoder = Encoder::new();
        let (mut vars, bits) = vector(&mut encoder, "x", 3);
        let guard = encoder.var("g");
        encoder.bits_ge_const("ge", &bits, 5, Some(guard.positive()));
        vars.push(guard);

        for model in models(&encoder, &vars) {
            if model[3] {
                assert!(read(&model[..3]) >= 5);
            }
        }
        // unguarded, every value remains possible
        assert_eq!(models(&encoder, &vars).iter().filter(|m| !m[3]).count(), 8);
    }

    #[test]
    fn unary_successor_steps_by_one() {
        let n = 4;
        let mut encoder = Encoder::new();
        let (child_vars, child) = vector(&mut encoder, "c", n);
        let (parent_vars, parent) = vector(&mut encoder, "p", n);
        let edge = encoder.var("e");
        encoder.unary_chain(&child);
        encoder.unary_chain(&parent);
        encoder.unary_successor(edge.positive(), &child, &parent);

        let vars = child_vars.into_iter().chain(parent_vars).chain([edge]).collect_vec();
        let count = |bits: &[bool]| bits.iter().filter(|b| **b).count();
        let found = models(&encoder, &vars);
        for model in &found {
            if model[2 * n] {
                assert_eq!(count(&model[..n]), count(&model[n..2 * n]) + 1);
            }
        }
        // parent can be 0..=3 with an edge, and anything without
        assert_eq!(found.iter().filter(|m| m[2 * n]).count(), n);
        assert_eq!(found.iter().filter(|m| !m[2 * n]).count(), (n + 1) * (n + 1));
    }

    #[test]
    fn unary_bounds() {
        let mut encoder = Encoder::new();
        let (vars, at_least) = vector(&mut encoder, "d", 4);
        encoder.unary_chain(&at_least);
        encoder.unary_ge_const(&at_least, 1, None);
        encoder.unary_le_const(&at_least, 2, None);

        let distance = Distance::Unary(at_least);
        let values = models(&encoder, &vars).iter()
            .map(|m| distance.value(&vars.iter().zip(m).filter(|(_, b)| **b).map(|(v, _)| *v).collect()))
            .sorted()
            .collect_vec();
        assert_eq!(values, vec![1, 2]);
    }

    proptest! {
        #[test]
        fn increment_adds_one(width in 1usize..6, value in 0i64..32) {
            let max = (1i64 << width) - 1;
            let value = value % (max + 1);

            let mut encoder = Encoder::new();
            let (_, bits) = vector(&mut encoder, "x", width);
            encoder.bits_eq_const(&bits, value, None);
            let sum = encoder.increment("inc", &bits);
            let (out_vars, out) = vector(&mut encoder, "y", width);
            for (o, s) in out.iter().zip(&sum) {
                encoder.equivalent(*o, *s);
            }

            let found = models(&encoder, &out_vars);
            prop_assert_eq!(found.len(), 1);
            let result = read(found.iter().next().unwrap());
            prop_assert_eq!(result, (value + 1) & max);
        }
    }
}
