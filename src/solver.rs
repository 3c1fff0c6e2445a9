use std::collections::VecDeque;
use strum_macros::{EnumIter, EnumString};
use crate::core::{Error, State};
use crate::visited::VisitedRegistry;

pub const STEP_BUDGET_EXCEEDED: Error = Error::new_const("Step budget exceeded before the search finished");

/// What happened to a single frontier entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchEvent {
    // Fingerprint was already in the registry.
    Skipped,
    // fail_fast() ruled it out.
    Pruned,
    Solved,
    Expanded { children: usize },
}

/// Snapshot handed to a StepObserver after each frontier entry is examined.
#[derive(Debug)]
pub struct StepView<'a, S: State> {
    pub step: usize,
    pub event: SearchEvent,
    pub depth: usize,
    // Entries still waiting to be examined.
    pub frontier: usize,
    pub visited: usize,
    pub state: &'a S,
}

// Mostly for debugging purposes, a StepObserver lets the caller dump or
// otherwise inspect the search after each step without inverting control.
// Observers only watch; they have no way to reorder the traversal.
pub trait StepObserver<S: State> {
    fn after_step(&mut self, view: &StepView<S>);

    /// Called once when the search ends, whether it found a solution or ran
    /// out of states. Not called when the step budget runs out.
    fn after_search(&mut self, _steps: usize, _solved: bool) {}
}

fn notify<S: State>(observer: &mut Option<&mut dyn StepObserver<S>>, view: StepView<S>) {
    if let Some(o) = observer {
        o.after_step(&view);
    }
}

fn finish<S: State>(observer: &mut Option<&mut dyn StepObserver<S>>, steps: usize, solved: bool) {
    if let Some(o) = observer {
        o.after_search(steps, solved);
    }
}

enum Visit<S> {
    Skipped,
    Pruned,
    Solved,
    Expanded(Vec<S>),
}

impl <S> Visit<S> {
    fn event(&self) -> SearchEvent {
        match self {
            Visit::Skipped => SearchEvent::Skipped,
            Visit::Pruned => SearchEvent::Pruned,
            Visit::Solved => SearchEvent::Solved,
            Visit::Expanded(children) => SearchEvent::Expanded { children: children.len() },
        }
    }
}

// The check order every engine applies to a frontier entry: registry, then
// pruning, then goal test, and only then is the state marked and expanded.
fn visit<S: State>(state: &S, seen: &mut VisitedRegistry) -> Visit<S> {
    let fp = state.fingerprint();
    if seen.contains(&fp) {
        Visit::Skipped
    } else if state.fail_fast() {
        Visit::Pruned
    } else if state.is_solved() {
        Visit::Solved
    } else {
        seen.insert(fp);
        Visit::Expanded(state.extensions())
    }
}

struct StepBudget {
    steps: usize,
    max: Option<usize>,
}

impl StepBudget {
    fn new(max: Option<usize>) -> Self {
        Self { steps: 0, max }
    }

    fn tick(&mut self) -> Result<usize, Error> {
        if let Some(max) = self.max {
            if self.steps >= max {
                return Err(STEP_BUDGET_EXCEEDED);
            }
        }
        self.steps += 1;
        Ok(self.steps)
    }
}

/// Common interface of the search engines. Neither engine treats an
/// unsolvable puzzle as an error: that is just an empty path. The only error
/// is running out of a configured step budget.
pub trait Solver {
    /// Search from `puzzle`, never expanding anything in `seen`, and return
    /// the path from `puzzle` to a solved state (both inclusive) or an empty
    /// vector. Every expanded state is added to `seen`.
    fn run<S: State>(
        &self,
        puzzle: &S,
        seen: &mut VisitedRegistry,
        observer: Option<&mut dyn StepObserver<S>>,
    ) -> Result<Vec<S>, Error>;

    /// Same as run(), using a fresh registry unless one is supplied.
    fn solve<S: State>(&self, puzzle: &S, seen: Option<&mut VisitedRegistry>) -> Result<Vec<S>, Error> {
        let mut fresh = VisitedRegistry::new();
        self.run(puzzle, seen.unwrap_or(&mut fresh), None)
    }
}

// Only expanded states keep their `state` once examined; they are the only
// ones a path can run through.
struct Node<S> {
    state: Option<S>,
    parent: Option<usize>,
    depth: usize,
}

fn path_to<S: Clone>(arena: &[Node<S>], index: usize) -> Vec<S> {
    let mut path = Vec::new();
    let mut next = Some(index);
    while let Some(i) = next {
        path.extend(arena[i].state.clone());
        next = arena[i].parent;
    }
    path.reverse();
    path
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BfsMode {
    FirstSolution,
    AllSolutions,
}

/// Breadth-first solver. Explores layer by layer, so the path it returns is
/// a shortest one in number of steps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BfsSolver {
    max_steps: Option<usize>,
}

impl BfsSolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = Some(max_steps);
        self
    }

    /// Every distinct solved state reachable from `puzzle`. Unlike run(),
    /// this never stops early; the frontier is always drained.
    pub fn all_solutions<S: State>(
        &self,
        puzzle: &S,
        seen: &mut VisitedRegistry,
        observer: Option<&mut dyn StepObserver<S>>,
    ) -> Result<Vec<S>, Error> {
        self.traverse(puzzle, seen, observer, BfsMode::AllSolutions)
    }

    fn traverse<S: State>(
        &self,
        puzzle: &S,
        seen: &mut VisitedRegistry,
        mut observer: Option<&mut dyn StepObserver<S>>,
        mode: BfsMode,
    ) -> Result<Vec<S>, Error> {
        let mut budget = StepBudget::new(self.max_steps);
        let mut arena = vec![Node { state: Some(puzzle.clone()), parent: None, depth: 0 }];
        let mut frontier = VecDeque::from([0]);
        let mut found = Vec::new();
        while let Some(i) = frontier.pop_front() {
            let Some(state) = arena[i].state.take() else {
                continue;
            };
            let step = budget.tick()?;
            let outcome = visit(&state, seen);
            let event = outcome.event();
            let depth = arena[i].depth;
            let mut keep = false;
            let mut solved = false;
            match outcome {
                Visit::Solved => match mode {
                    BfsMode::FirstSolution => {
                        keep = true;
                        solved = true;
                    },
                    BfsMode::AllSolutions => {
                        // Count each solution once, however it's reached.
                        seen.insert(state.fingerprint());
                        found.push(state.clone());
                    },
                },
                Visit::Expanded(children) => {
                    keep = true;
                    for child in children {
                        arena.push(Node { state: Some(child), parent: Some(i), depth: depth + 1 });
                        frontier.push_back(arena.len() - 1);
                    }
                },
                Visit::Skipped | Visit::Pruned => {},
            }
            notify(&mut observer, StepView {
                step,
                event,
                depth,
                frontier: frontier.len(),
                visited: seen.len(),
                state: &state,
            });
            if keep {
                arena[i].state = Some(state);
            }
            if solved {
                finish(&mut observer, step, true);
                return Ok(path_to(&arena, i));
            }
        }
        finish(&mut observer, budget.steps, !found.is_empty());
        Ok(found)
    }
}

impl Solver for BfsSolver {
    fn run<S: State>(
        &self,
        puzzle: &S,
        seen: &mut VisitedRegistry,
        observer: Option<&mut dyn StepObserver<S>>,
    ) -> Result<Vec<S>, Error> {
        self.traverse(puzzle, seen, observer, BfsMode::FirstSolution)
    }
}

struct Frame<S> {
    state: S,
    children: std::vec::IntoIter<S>,
}

/// Depth-first solver. Returns whichever solution it reaches first when
/// descending through extensions() in order; not necessarily the shortest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DfsSolver {
    max_steps: Option<usize>,
}

impl DfsSolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = Some(max_steps);
        self
    }
}

impl Solver for DfsSolver {
    fn run<S: State>(
        &self,
        puzzle: &S,
        seen: &mut VisitedRegistry,
        mut observer: Option<&mut dyn StepObserver<S>>,
    ) -> Result<Vec<S>, Error> {
        let mut budget = StepBudget::new(self.max_steps);
        // The stack holds the current path; each frame remembers which of
        // its children are still untried.
        let mut stack: Vec<Frame<S>> = Vec::new();
        let mut next = Some(puzzle.clone());
        loop {
            let candidate = match next.take() {
                Some(s) => s,
                None => {
                    let Some(top) = stack.last_mut() else {
                        finish(&mut observer, budget.steps, false);
                        return Ok(vec![]);
                    };
                    match top.children.next() {
                        Some(child) => child,
                        None => {
                            stack.pop();
                            continue;
                        },
                    }
                },
            };
            let step = budget.tick()?;
            let outcome = visit(&candidate, seen);
            notify(&mut observer, StepView {
                step,
                event: outcome.event(),
                depth: stack.len(),
                frontier: stack.iter().map(|f| f.children.len()).sum::<usize>() + match &outcome {
                    Visit::Expanded(children) => children.len(),
                    _ => 0,
                },
                visited: seen.len(),
                state: &candidate,
            });
            match outcome {
                Visit::Solved => {
                    let mut path = stack.into_iter().map(|f| f.state).collect::<Vec<_>>();
                    path.push(candidate);
                    finish(&mut observer, step, true);
                    return Ok(path);
                },
                Visit::Expanded(children) => {
                    stack.push(Frame { state: candidate, children: children.into_iter() });
                },
                Visit::Skipped | Visit::Pruned => {},
            }
        }
    }
}

/// Runtime choice of engine, e.g. from a command line flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, EnumIter, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Engine {
    Bfs,
    Dfs,
}

impl Engine {
    pub fn run<S: State>(
        &self,
        max_steps: Option<usize>,
        puzzle: &S,
        seen: &mut VisitedRegistry,
        observer: Option<&mut dyn StepObserver<S>>,
    ) -> Result<Vec<S>, Error> {
        match self {
            Engine::Bfs => BfsSolver { max_steps }.run(puzzle, seen, observer),
            Engine::Dfs => DfsSolver { max_steps }.run(puzzle, seen, observer),
        }
    }
}
