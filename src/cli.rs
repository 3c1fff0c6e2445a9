use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use strum::IntoEnumIterator;
use crate::core::Error;
use crate::debug::{DbgObserver, Sample};
use crate::solver::{Engine, StepObserver};
use crate::sudoku::GridPuzzle;
use crate::visited::VisitedRegistry;

pub const USAGE: &str = "Usage: grid-solve <bfs|dfs> <puzzle-file> [--exclude <solution-file>] [--unique] [--trace <N>] [--max-steps <N>]";

/// Command line for the grid-solve binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    pub engine: Engine,
    pub puzzle: PathBuf,
    pub exclude: Option<PathBuf>,
    pub unique: bool,
    pub trace: Option<usize>,
    pub max_steps: Option<usize>,
}

fn usage_error(problem: String) -> Error {
    Error::new(format!("{}\n{}", problem, USAGE))
}

fn count_arg(flag: &str, value: Option<String>) -> Result<usize, Error> {
    let value = value.ok_or_else(|| usage_error(format!("{} needs a value", flag)))?;
    match value.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(usage_error(format!("{} expects a positive integer, got {:?}", flag, value))),
    }
}

impl Args {
    /// Parse arguments, not including the program name.
    pub fn parse<I: IntoIterator<Item = String>>(args: I) -> Result<Self, Error> {
        let mut args = args.into_iter();
        let mut positional = Vec::new();
        let mut exclude = None;
        let mut unique = false;
        let mut trace = None;
        let mut max_steps = None;
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--exclude" => {
                    let file = args.next().ok_or_else(|| usage_error("--exclude needs a value".to_string()))?;
                    exclude = Some(PathBuf::from(file));
                },
                "--unique" => unique = true,
                "--trace" => trace = Some(count_arg("--trace", args.next())?),
                "--max-steps" => max_steps = Some(count_arg("--max-steps", args.next())?),
                flag if flag.starts_with("--") => {
                    return Err(usage_error(format!("Unknown flag {}", flag)));
                },
                _ => positional.push(arg),
            }
        }
        let [engine, puzzle]: [String; 2] = positional.try_into().map_err(|p: Vec<String>| {
            usage_error(format!("Expected an engine and a puzzle file, got {} arguments", p.len()))
        })?;
        let engine = Engine::from_str(&engine)
            .map_err(|_| {
                let known = Engine::iter().map(|e| e.to_string()).collect::<Vec<_>>();
                usage_error(format!("Unknown engine {:?} (expected one of {})", engine, known.join(", ")))
            })?;
        Ok(Self { engine, puzzle: PathBuf::from(puzzle), exclude, unique, trace, max_steps })
    }
}

pub fn load(path: &Path) -> Result<GridPuzzle, Error> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| Error::new(format!("Couldn't read {}: {}", path.display(), e)))?;
    GridPuzzle::parse_standard(&text)
}

/// Everything grid-solve has to say about one puzzle.
#[derive(Debug, Clone)]
pub struct Report {
    pub path: Vec<GridPuzzle>,
    pub unique: Option<bool>,
    pub stats: Option<String>,
}

impl Report {
    pub fn solved(&self) -> bool {
        !self.path.is_empty()
    }
}

impl Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            writeln!(f, "No solution")?;
        } else {
            for (i, state) in self.path.iter().enumerate() {
                writeln!(f, "Step {}:\n{}", i, state)?;
            }
        }
        if let Some(unique) = self.unique {
            writeln!(f, "Unique solution: {}", if unique { "yes" } else { "no" })?;
        }
        if let Some(stats) = &self.stats {
            write!(f, "{}", stats)?;
        }
        Ok(())
    }
}

pub fn run(args: &Args) -> Result<Report, Error> {
    let puzzle = load(&args.puzzle)?;
    let mut seen = match &args.exclude {
        Some(file) => VisitedRegistry::excluding([&load(file)?]),
        None => VisitedRegistry::new(),
    };
    let mut dbg: Option<DbgObserver<GridPuzzle>> = args.trace.map(|n| {
        let mut dbg = DbgObserver::new();
        dbg.sample_print(Sample::every_n(n));
        dbg
    });
    let path = args.engine.run(
        args.max_steps,
        &puzzle,
        &mut seen,
        dbg.as_mut().map(|d| d as &mut dyn StepObserver<GridPuzzle>),
    )?;
    let unique = match args.unique {
        true => Some(puzzle.has_unique_solution_within(args.max_steps)?),
        false => None,
    };
    Ok(Report { path, unique, stats: dbg.map(|d| d.summary()) })
}

#[cfg(test)]
mod test {
    use crate::solver::STEP_BUDGET_EXCEEDED;
    use super::*;

    fn args(s: &str) -> Vec<String> {
        s.split_whitespace().map(|a| a.to_string()).collect()
    }

    fn temp_file(name: &str, contents: &str) -> Result<PathBuf, Error> {
        let path = std::env::temp_dir().join(format!("grid-solve-{}-{}", std::process::id(), name));
        std::fs::write(&path, contents).map_err(|e| Error::new(e.to_string()))?;
        Ok(path)
    }

    #[test]
    fn test_parse_minimal() -> Result<(), Error> {
        let parsed = Args::parse(args("bfs puzzle.txt"))?;
        assert_eq!(parsed, Args {
            engine: Engine::Bfs,
            puzzle: PathBuf::from("puzzle.txt"),
            exclude: None,
            unique: false,
            trace: None,
            max_steps: None,
        });
        Ok(())
    }

    #[test]
    fn test_parse_all_flags() -> Result<(), Error> {
        let parsed = Args::parse(args("--unique dfs p.txt --exclude s.txt --trace 10 --max-steps 5000"))?;
        assert_eq!(parsed.engine, Engine::Dfs);
        assert_eq!(parsed.puzzle, PathBuf::from("p.txt"));
        assert_eq!(parsed.exclude, Some(PathBuf::from("s.txt")));
        assert!(parsed.unique);
        assert_eq!(parsed.trace, Some(10));
        assert_eq!(parsed.max_steps, Some(5000));
        Ok(())
    }

    #[test]
    fn test_parse_errors() {
        for (input, problem) in [
            ("bfs", "Expected an engine and a puzzle file, got 1 arguments"),
            ("bfs a b", "Expected an engine and a puzzle file, got 3 arguments"),
            ("astar p.txt", "Unknown engine \"astar\" (expected one of bfs, dfs)"),
            ("bfs p.txt --trace", "--trace needs a value"),
            ("bfs p.txt --trace 0", "--trace expects a positive integer, got \"0\""),
            ("bfs p.txt --max-steps lots", "--max-steps expects a positive integer, got \"lots\""),
            ("bfs p.txt --verbose", "Unknown flag --verbose"),
        ] {
            let err = Args::parse(args(input)).unwrap_err();
            assert_eq!(err.message(), format!("{}\n{}", problem, USAGE));
        }
    }

    #[test]
    fn test_run_with_exclusion() -> Result<(), Error> {
        let puzzle = temp_file("puzzle", "12..\n3...\n....\n....\n")?;
        let parsed = Args::parse(vec!["dfs".to_string(), puzzle.display().to_string(), "--unique".to_string()])?;
        let report = run(&parsed)?;
        assert!(report.solved());
        assert_eq!(report.unique, Some(false));
        let first = temp_file("first", &report.path.last().unwrap().to_string())?;

        let mut parsed = parsed.clone();
        parsed.exclude = Some(first.clone());
        parsed.trace = Some(1000);
        let second = run(&parsed)?;
        assert!(second.solved());
        assert_ne!(second.path.last(), report.path.last());
        assert!(second.stats.unwrap().starts_with("Steps: "));
        let _ = std::fs::remove_file(puzzle);
        let _ = std::fs::remove_file(first);
        Ok(())
    }

    #[test]
    fn test_unique_check_shares_step_budget() -> Result<(), Error> {
        let puzzle = temp_file("budget", "1...\n...3\n.42.\n....\n")?;
        let mut parsed = Args::parse(vec!["dfs".to_string(), puzzle.display().to_string(), "--max-steps".to_string(), "31".to_string()])?;
        // The path alone fits in the budget.
        assert!(run(&parsed)?.solved());
        parsed.unique = true;
        assert_eq!(run(&parsed).err(), Some(STEP_BUDGET_EXCEEDED));
        parsed.max_steps = None;
        assert_eq!(run(&parsed)?.unique, Some(true));
        let _ = std::fs::remove_file(puzzle);
        Ok(())
    }

    #[test]
    fn test_report_display() -> Result<(), Error> {
        let report = Report { path: vec![], unique: Some(true), stats: None };
        assert!(!report.solved());
        assert_eq!(report.to_string(), "No solution\nUnique solution: yes\n");
        let solved = GridPuzzle::parse_standard("12\n21\n")?;
        let report = Report { path: vec![solved], unique: None, stats: None };
        assert_eq!(report.to_string(), "Step 0:\n12\n21\n\n");
        Ok(())
    }

    #[test]
    fn test_missing_file() {
        let parsed = Args::parse(args("bfs /nonexistent/grid.txt")).unwrap();
        assert!(run(&parsed).unwrap_err().message().starts_with("Couldn't read /nonexistent/grid.txt"));
    }
}
