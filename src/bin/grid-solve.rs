use puzzle_search::cli::{self, Args};

// Example: grid-solve dfs puzzles/four.txt --unique --trace 100
pub fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let args = Args::parse(std::env::args().skip(1))?;
    let report = cli::run(&args)?;
    print!("{}", report);
    if !report.solved() {
        std::process::exit(1);
    }
    Ok(())
}
