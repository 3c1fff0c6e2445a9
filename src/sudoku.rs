use std::collections::BTreeSet;
use std::fmt::Display;
use std::sync::Arc;
use bit_set::BitSet;
use num::integer::Roots;
use crate::core::{Error, Fingerprint, State};
use crate::solver::BfsSolver;
use crate::visited::VisitedRegistry;

pub const EMPTY_CELL: char = '.';
pub const MAX_DIMENSION: usize = 255;
const STANDARD_SYMBOLS: &str = "123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

pub const ZERO_DIMENSION_ERROR: Error = Error::new_const("Grid dimension must be positive");
pub const OUT_OF_BOUNDS_ERROR: Error = Error::new_const("Out of bounds");
pub const ALREADY_FILLED_ERROR: Error = Error::new_const("Cell already filled");

/// The symbols 1-9 followed by A-Z, truncated to `n`.
pub fn standard_alphabet(n: usize) -> Result<BTreeSet<char>, Error> {
    if n == 0 {
        return Err(ZERO_DIMENSION_ERROR);
    } else if n > STANDARD_SYMBOLS.len() {
        return Err(Error::new(format!(
            "No standard alphabet for dimension {} (max {})", n, STANDARD_SYMBOLS.len(),
        )));
    }
    Ok(STANDARD_SYMBOLS.chars().take(n).collect())
}

/// A row, column, or sub-block of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Group {
    Row(usize),
    Col(usize),
    Block(usize),
}

impl Display for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Group::Row(r) => write!(f, "row {}", r),
            Group::Col(c) => write!(f, "col {}", c),
            Group::Block(b) => write!(f, "block {}", b),
        }
    }
}

/// Reason a grid can't be completed, as found by GridPuzzle::contradiction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Contradiction {
    Duplicate { symbol: char, group: Group },
    // Every symbol is already used by the cell's row, column or block.
    NoCandidates { row: usize, col: usize },
}

impl Display for Contradiction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Contradiction::Duplicate { symbol, group } => {
                write!(f, "Duplicate value {} in {}", symbol, group)
            },
            Contradiction::NoCandidates { row, col } => {
                write!(f, "No value fits at ({}, {})", row, col)
            },
        }
    }
}

// Symbols already placed in each group, as alphabet ordinals.
struct Houses {
    rows: Vec<BitSet>,
    cols: Vec<BitSet>,
    blocks: Vec<BitSet>,
}

impl Houses {
    fn new(n: usize, has_blocks: bool) -> Self {
        let empty = || vec![BitSet::with_capacity(n); n];
        Self {
            rows: empty(),
            cols: empty(),
            blocks: if has_blocks { empty() } else { Vec::new() },
        }
    }
}

/// An N×N grid where every row, column and (when N is a perfect square)
/// every sqrt(N)×sqrt(N) block must contain each alphabet symbol exactly
/// once. Grids are immutable; filling a cell produces a new grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridPuzzle {
    n: usize,
    block: Option<usize>,
    // Row-major ordinals into `alphabet`.
    cells: Box<[Option<u8>]>,
    alphabet: Arc<[char]>,
}

impl GridPuzzle {
    pub fn new(n: usize, cells: Vec<Vec<Option<char>>>, alphabet: &BTreeSet<char>) -> Result<Self, Error> {
        if n == 0 {
            return Err(ZERO_DIMENSION_ERROR);
        } else if n > MAX_DIMENSION {
            return Err(Error::new(format!(
                "Grid dimension {} exceeds the maximum of {}", n, MAX_DIMENSION,
            )));
        } else if alphabet.len() != n {
            return Err(Error::new(format!(
                "Alphabet has {} symbols but the grid needs {}", alphabet.len(), n,
            )));
        }
        if let Some(bad) = alphabet.iter().find(|c| **c == EMPTY_CELL || c.is_whitespace()) {
            return Err(Error::new(format!("Symbol {:?} can't be used in an alphabet", bad)));
        }
        if cells.len() != n {
            return Err(Error::new(format!("Expected {} rows but got {}", n, cells.len())));
        }
        let alphabet: Arc<[char]> = alphabet.iter().copied().collect();
        let mut grid = Vec::with_capacity(n * n);
        for (r, row) in cells.iter().enumerate() {
            if row.len() != n {
                return Err(Error::new(format!(
                    "Row {} has {} cells but the grid needs {}", r, row.len(), n,
                )));
            }
            for (c, cell) in row.iter().enumerate() {
                grid.push(match cell {
                    None => None,
                    Some(sym) => match alphabet.iter().position(|a| a == sym) {
                        // n <= MAX_DIMENSION, so ordinals fit.
                        Some(ord) => Some(ord as u8),
                        None => return Err(Error::new(format!(
                            "Symbol {:?} at ({}, {}) is not in the alphabet", sym, r, c,
                        ))),
                    },
                });
            }
        }
        Ok(Self {
            n,
            block: Self::block_for(n),
            cells: grid.into_boxed_slice(),
            alphabet,
        })
    }

    pub fn empty(n: usize, alphabet: &BTreeSet<char>) -> Result<Self, Error> {
        Self::new(n, vec![vec![None; n]; n], alphabet)
    }

    /// Parse the canonical text form: one line per row, `.` for empty
    /// cells. The dimension comes from the alphabet size.
    pub fn parse(s: &str, alphabet: &BTreeSet<char>) -> Result<Self, Error> {
        let cells = s.lines()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
            .map(|line| {
                line.chars().map(|c| if c == EMPTY_CELL { None } else { Some(c) }).collect()
            })
            .collect::<Vec<Vec<_>>>();
        Self::new(alphabet.len(), cells, alphabet)
    }

    /// Parse with the standard alphabet, inferring the dimension from the
    /// number of rows.
    pub fn parse_standard(s: &str) -> Result<Self, Error> {
        let n = s.lines().filter(|line| !line.trim().is_empty()).count();
        Self::parse(s, &standard_alphabet(n)?)
    }

    fn block_for(n: usize) -> Option<usize> {
        let root = n.sqrt();
        if root * root == n { Some(root) } else { None }
    }

    pub fn dimension(&self) -> usize {
        self.n
    }

    /// Side length of the sub-blocks, if N is a perfect square.
    pub fn block_size(&self) -> Option<usize> {
        self.block
    }

    pub fn alphabet(&self) -> &[char] {
        &self.alphabet
    }

    pub fn get(&self, row: usize, col: usize) -> Option<char> {
        if row >= self.n || col >= self.n {
            return None;
        }
        self.cells[row * self.n + col].map(|ord| self.alphabet[ord as usize])
    }

    pub fn empty_cells(&self) -> usize {
        self.cells.iter().filter(|c| c.is_none()).count()
    }

    fn first_empty(&self) -> Option<usize> {
        self.cells.iter().position(|c| c.is_none())
    }

    fn block_of(&self, row: usize, col: usize) -> Option<usize> {
        self.block.map(|b| (row / b) * b + col / b)
    }

    fn with_ordinal(&self, index: usize, ord: u8) -> Self {
        let mut cells = self.cells.clone();
        cells[index] = Some(ord);
        Self {
            n: self.n,
            block: self.block,
            cells,
            alphabet: self.alphabet.clone(),
        }
    }

    /// Copy of this grid with one more cell filled in.
    pub fn place(&self, row: usize, col: usize, symbol: char) -> Result<Self, Error> {
        if row >= self.n || col >= self.n {
            return Err(OUT_OF_BOUNDS_ERROR);
        }
        let index = row * self.n + col;
        if self.cells[index].is_some() {
            return Err(ALREADY_FILLED_ERROR);
        }
        match self.alphabet.iter().position(|a| *a == symbol) {
            Some(ord) => Ok(self.with_ordinal(index, ord as u8)),
            None => Err(Error::new(format!("Symbol {:?} is not in the alphabet", symbol))),
        }
    }

    fn houses(&self) -> Result<Houses, Contradiction> {
        let mut houses = Houses::new(self.n, self.block.is_some());
        for r in 0..self.n {
            for c in 0..self.n {
                let Some(ord) = self.cells[r * self.n + c] else {
                    continue;
                };
                let v = ord as usize;
                let dupe = |group| Contradiction::Duplicate { symbol: self.alphabet[v], group };
                if !houses.rows[r].insert(v) {
                    return Err(dupe(Group::Row(r)));
                }
                if !houses.cols[c].insert(v) {
                    return Err(dupe(Group::Col(c)));
                }
                if let Some(b) = self.block_of(r, c) {
                    if !houses.blocks[b].insert(v) {
                        return Err(dupe(Group::Block(b)));
                    }
                }
            }
        }
        Ok(houses)
    }

    fn blocked(&self, houses: &Houses, row: usize, col: usize) -> BitSet {
        let mut used = houses.rows[row].clone();
        used.union_with(&houses.cols[col]);
        if let Some(b) = self.block_of(row, col) {
            used.union_with(&houses.blocks[b]);
        }
        used
    }

    /// Symbols that could go in an empty cell without an immediate clash.
    /// Empty for filled cells, out-of-bounds cells, and grids that already
    /// contain a duplicate.
    pub fn candidates(&self, row: usize, col: usize) -> Vec<char> {
        if row >= self.n || col >= self.n || self.cells[row * self.n + col].is_some() {
            return Vec::new();
        }
        let Ok(houses) = self.houses() else {
            return Vec::new();
        };
        let used = self.blocked(&houses, row, col);
        (0..self.n).filter(|v| !used.contains(*v)).map(|v| self.alphabet[v]).collect()
    }

    /// First contradiction visible without making any further assignment:
    /// a symbol repeated within a group, or an empty cell that every symbol
    /// is locked out of by its row, column and block together. The second
    /// case covers a group whose one remaining cell needs a symbol that a
    /// crossing group already holds. Contradictions that only show up after
    /// more cells are filled are not detected.
    pub fn contradiction(&self) -> Option<Contradiction> {
        let houses = match self.houses() {
            Ok(h) => h,
            Err(c) => return Some(c),
        };
        for r in 0..self.n {
            for c in 0..self.n {
                if self.cells[r * self.n + c].is_some() {
                    continue;
                }
                if self.blocked(&houses, r, c).len() >= self.n {
                    return Some(Contradiction::NoCandidates { row: r, col: c });
                }
            }
        }
        None
    }

    /// True iff a full BFS enumeration reaches exactly one solved grid.
    pub fn has_unique_solution(&self) -> bool {
        // Unbudgeted, so the enumeration can't fail.
        self.has_unique_solution_within(None).unwrap_or(false)
    }

    /// Same as has_unique_solution(), but gives up with
    /// STEP_BUDGET_EXCEEDED once `max_steps` frontier entries are examined.
    pub fn has_unique_solution_within(&self, max_steps: Option<usize>) -> Result<bool, Error> {
        let solver = match max_steps {
            Some(n) => BfsSolver::new().with_max_steps(n),
            None => BfsSolver::new(),
        };
        let solutions = solver.all_solutions(self, &mut VisitedRegistry::new(), None)?;
        Ok(solutions.len() == 1)
    }
}

impl State for GridPuzzle {
    fn is_solved(&self) -> bool {
        self.first_empty().is_none() && self.houses().is_ok()
    }

    fn fail_fast(&self) -> bool {
        self.contradiction().is_some()
    }

    fn extensions(&self) -> Vec<Self> {
        match self.first_empty() {
            Some(index) => (0..self.n).map(|ord| self.with_ordinal(index, ord as u8)).collect(),
            None => Vec::new(),
        }
    }

    fn fingerprint(&self) -> Fingerprint {
        Fingerprint::new(self.to_string())
    }
}

impl Display for GridPuzzle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        for row in self.cells.chunks(self.n) {
            for cell in row {
                match cell {
                    Some(ord) => write!(f, "{}", self.alphabet[*ord as usize])?,
                    None => write!(f, "{}", EMPTY_CELL)?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

pub fn four_standard_parse(s: &str) -> Result<GridPuzzle, Error> {
    GridPuzzle::parse(s, &standard_alphabet(4)?)
}

pub fn nine_standard_parse(s: &str) -> Result<GridPuzzle, Error> {
    GridPuzzle::parse(s, &standard_alphabet(9)?)
}
