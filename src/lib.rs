pub mod core;
pub mod visited;
pub mod solver;
pub mod debug;
pub mod sudoku;
pub mod cli;
#[cfg(any(test, feature = "test-util"))]
pub mod test_util;
