//! DIMACS CNF text, the exchange format understood by practically every SAT solver.

use std::fmt::Write;

use itertools::Itertools;
use varisat::Lit;

use crate::error::ParseError;

/// Render `clauses` over `num_vars` variables as DIMACS text:
/// a `p cnf <vars> <clauses>` header, then one line of space-separated literals per clause, each ending in `0`.
pub fn write(num_vars: usize, clauses: &[Vec<Lit>]) -> String {
    let mut out = String::with_capacity(32 + clauses.iter().map(|c| 4 * c.len() + 2).sum::<usize>());
    // writing to a String cannot fail
    let _ = writeln!(out, "p cnf {} {}", num_vars, clauses.len());
    for clause in clauses {
        for lit in clause {
            let _ = write!(out, "{} ", lit.to_dimacs());
        }
        out.push_str("0\n");
    }

    out
}

/// A CNF instance read from DIMACS text.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Dimacs {
    /// Variable count from the header.
    pub var_count: usize,
    /// Clauses in file order.
    pub clauses: Vec<Vec<Lit>>,
}

/// Read DIMACS text. Comment lines (`c ...`) are skipped and clauses may span lines.
pub fn parse(text: &str) -> Result<Dimacs, ParseError> {
    let mut lines = text.lines().enumerate().map(|(i, line)| (i + 1, line.trim()));

    let (var_count, clause_count) = loop {
        let Some((line, content)) = lines.next() else {
            return Err(ParseError::MissingHeader);
        };
        if content.is_empty() || content.starts_with('c') {
            continue;
        }

        let parts = content.split_whitespace().collect_vec();
        if parts.len() != 4 || parts[0] != "p" || parts[1] != "cnf" {
            return Err(ParseError::BadHeader { line });
        }
        let count = |token: &str| token.parse::<usize>()
            .map_err(|_| ParseError::BadNumber { line, token: token.to_owned() });
        break (count(parts[2])?, count(parts[3])?);
    };

    let mut clauses = Vec::with_capacity(clause_count);
    let mut clause = Vec::new();
    for (line, content) in lines {
        if content.starts_with('c') {
            continue;
        }

        for token in content.split_whitespace() {
            let lit = token.parse::<isize>()
                .map_err(|_| ParseError::BadNumber { line, token: token.to_owned() })?;
            if lit == 0 {
                clauses.push(std::mem::take(&mut clause));
                continue;
            }
            if lit.unsigned_abs() > var_count {
                return Err(ParseError::VarOutOfRange { line, lit });
            }

            clause.push(Lit::from_dimacs(lit));
        }
    }

    if !clause.is_empty() {
        return Err(ParseError::UnterminatedClause);
    }
    if clauses.len() != clause_count {
        return Err(ParseError::ClauseCountMismatch { expected: clause_count, found: clauses.len() });
    }

    Ok(Dimacs { var_count, clauses })
}
