use std::{fs, path::PathBuf, time::Instant};

use anyhow::{bail, Context, Result};
use auto_enums::auto_enum;
use clap::Parser;
use itertools::Itertools;

use fifteen_solver::{parse_board, parse_boards, solve_with, Board, SearchConfig};

// Input format:
// 16 whitespace-separated tiles per board in row-major order, 0 is the blank.
// The goal is 0 1 2 ... 15. A file may hold several boards; `#` starts a comment.
#[derive(Parser)]
#[command(name = "fifteen-solver")]
#[command(about = "Solves the 15-puzzle with iterative-deepening A*")]
struct Cli {
    /// Files holding one or more boards
    #[arg(required_unless_present = "board", conflicts_with = "board")]
    files: Vec<PathBuf>,

    /// A single board given inline, e.g. "4 1 2 3 0 5 6 7 8 9 10 11 12 13 14 15"
    #[arg(long)]
    board: Option<String>,

    /// Heuristic weight; above 1 trades optimality for speed
    #[arg(long, default_value_t = 1.0)]
    weight: f64,
}

#[auto_enum(Iterator)]
fn inputs(cli: &Cli) -> impl Iterator<Item = Result<(String, Vec<Board>)>> + '_ {
    match &cli.board {
        Some(tiles) => std::iter::once(
            parse_board(tiles)
                .map(|board| ("--board".to_owned(), vec![board]))
                .context("invalid --board"),
        ),
        None => cli.files.iter().map(|path| -> Result<(String, Vec<Board>)> {
            let text = fs::read_to_string(path)
                .with_context(|| format!("could not open {}", path.display()))?;
            let boards =
                parse_boards(&text).with_context(|| format!("invalid board in {}", path.display()))?;
            Ok((path.display().to_string(), boards))
        }),
    }
}

fn run(board: &Board, config: &SearchConfig) -> Result<()> {
    println!("Initial State:");
    println!("{}", board);
    println!("Initial Estimate: {}", board.manhattan());

    let start = Instant::now();
    let solution = solve_with(board, config)?;
    let elapsed = start.elapsed();

    println!("Threshold = {}", solution.thresholds.iter().join(" "));
    println!("Solution = {}", solution.cost);
    if solution.cost != solution.bound {
        println!("Final bound = {}", solution.bound);
    }
    println!("Generated = {}", solution.stats.generated);
    println!("Expanded = {}", solution.stats.expanded);
    println!("Time = {:.2}", elapsed.as_secs_f64());
    println!(
        "Expanded/Second = {:.0}",
        solution.stats.expanded_per_second(elapsed)
    );

    Ok(())
}

fn run_all(cli: &Cli) -> Result<()> {
    let config = SearchConfig::new(cli.weight)?;

    for input in inputs(cli) {
        let (name, boards) = input?;
        if boards.is_empty() {
            bail!("no boards in {}", name);
        }

        for (ix, board) in boards.iter().enumerate() {
            println!("---- {} #{}", name, ix + 1);
            run(board, &config).with_context(|| format!("{} #{}", name, ix + 1))?;
            println!();
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    run_all(&cli)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn solves_inline_board() {
        let cli = Cli::parse_from([
            "fifteen-solver",
            "--board",
            "4 1 2 3 0 5 6 7 8 9 10 11 12 13 14 15",
        ]);
        assert!(run_all(&cli).is_ok());
    }

    #[test]
    fn failures_reach_the_caller() {
        let cli = Cli::parse_from(["fifteen-solver", "does/not/exist.txt"]);
        let err = run_all(&cli).unwrap_err();
        assert!(err.to_string().contains("could not open"));

        let cli = Cli::parse_from(["fifteen-solver", "--board", "0 1 2", "--weight", "1e10"]);
        assert!(run_all(&cli).is_err());

        let cli = Cli::parse_from(["fifteen-solver", "--board", "0 1 2"]);
        assert!(run_all(&cli).is_err());
    }
}
