use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{bail, Context};
use arbor::{compile, CompileOptions, DistanceEncoding, Problem};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use varisat::Solver;

/// Compile a colored forest problem to DIMACS CNF, or solve it directly.
#[derive(Parser, Debug)]
#[command(name = "arbor", version)]
struct Args {
    /// Problem file (`node`, `edge`, `root`, `hint` and `bound` lines)
    #[arg(value_name = "FILE")]
    problem: PathBuf,

    /// Distance encoding: unary or binary
    #[arg(short, long, default_value_t = DistanceEncoding::Unary)]
    encoding: DistanceEncoding,

    /// Solve with the bundled SAT solver and print the forest instead of the CNF
    #[arg(short, long)]
    solve: bool,

    /// Write output here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let text = fs::read_to_string(&args.problem)
        .with_context(|| format!("reading {}", args.problem.display()))?;
    let problem: Problem = text.parse()
        .with_context(|| format!("parsing {}", args.problem.display()))?;

    let compilation = compile(&problem, CompileOptions::with_encoding(args.encoding))?;
    info!(vars = compilation.num_vars(), clauses = compilation.clauses().len(), "compiled");

    let out = if args.solve {
        let mut solver = Solver::new();
        solver.add_formula(&compilation.formula());
        if solver.solve().context("running solver")? {
            let Some(model) = solver.model() else {
                bail!("solver reported sat without a model");
            };
            let forest = compilation.decode(&model)?;
            forest.check()?;
            format!("s SATISFIABLE\n{forest}")
        } else {
            "s UNSATISFIABLE\n".to_owned()
        }
    } else {
        compilation.to_dimacs()
    };

    match args.output {
        Some(path) => fs::write(&path, out).with_context(|| format!("writing {}", path.display()))?,
        None => io::stdout().lock().write_all(out.as_bytes())?,
    }

    Ok(())
}
