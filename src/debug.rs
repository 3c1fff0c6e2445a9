use std::collections::HashMap;
use std::fmt::Display;
use std::time::{Duration, SystemTime};

use rand::{distr::{Bernoulli, Distribution}, rng, rngs::ThreadRng};
use crate::core::{Error, State};
use crate::solver::{SearchEvent, StepObserver, StepView};

#[derive(PartialEq, Clone, Debug)]
pub struct DistStat {
    pub total: i32,
    pub count: i32,
    pub max: i32,
    pub max_count: i32,
    pub mean: f32,
    pub median: f32,
}

impl DistStat {
    pub fn from_histogram(hist: &HashMap<usize, usize>) -> DistStat {
        let mut val_counts = hist.iter().map(|(v, c)| (*v as i32, *c as i32)).collect::<Vec<_>>();
        val_counts.sort();
        let total = val_counts.iter().fold(0, |n, (v, c)| n + v*c);
        let count = val_counts.iter().fold(0, |n, (_, c)| n + c);
        let max = val_counts.iter().fold(0, |n, (v, _)| std::cmp::max(*v, n));
        let max_count = val_counts.iter().fold(0, |n, (_, c)| std::cmp::max(*c, n));
        let mean = if count == 0 { 0.0 } else { (total as f32)/(count as f32) };
        let mut median_lo = None;
        let mut median_hi = None;
        let mut n = 0;
        for (v, c) in val_counts {
            let next_n = n + c;
            if median_lo.is_none() && (count - 1) / 2 < next_n {
                median_lo = Some(v);
            }
            if median_hi.is_none() && count / 2 < next_n {
                median_hi = Some(v);
            }
            n = next_n;
            if median_lo.is_some() && median_hi.is_some() {
                break;
            }
        }
        let median = (median_lo.unwrap_or(0) as f32 + median_hi.unwrap_or(0) as f32)/2.0;
        DistStat { total, count, max, max_count, mean, median }
    }
}

impl Display for DistStat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f, "n = {}, E = {:.3}, med = {:.1}, max = {}",
            self.count, self.mean, self.median, self.max,
        )
    }
}

enum SampleState {
    Never,
    AtEnd,
    EveryN(usize, usize),
    Probability(Bernoulli, ThreadRng),
    Time(Duration, SystemTime),
}

/// Decides which steps an observer reacts to. Every policy except never()
/// also fires on the step that finds a solution, and when the search ends.
pub struct Sample {
    state: SampleState,
}

impl Sample {
    pub fn never() -> Self {
        Self { state: SampleState::Never }
    }

    pub fn at_end() -> Self {
        Self { state: SampleState::AtEnd }
    }

    pub fn every_n(n: usize) -> Self {
        Self { state: SampleState::EveryN(n, 0) }
    }

    pub fn probability(p: f64) -> Result<Self, Error> {
        let d = Bernoulli::new(p).map_err(|e| Error::new(format!("Bad sampling probability {}: {}", p, e)))?;
        Ok(Self { state: SampleState::Probability(d, rng()) })
    }

    pub fn time(every: Duration) -> Self {
        Self { state: SampleState::Time(every, SystemTime::now()) }
    }

    pub fn sample_end(&self) -> bool {
        !matches!(self.state, SampleState::Never)
    }

    pub fn sample<S: State>(&mut self, view: &StepView<S>) -> bool {
        let done = view.event == SearchEvent::Solved;
        match &mut self.state {
            SampleState::Never => false,
            SampleState::AtEnd => done,
            SampleState::EveryN(n, count) => {
                *count += 1;
                if count >= n || done {
                    *count = 0;
                    true
                } else {
                    false
                }
            },
            SampleState::Probability(d, rng) => {
                d.sample(rng) || done
            },
            SampleState::Time(duration, last) => {
                let now = SystemTime::now();
                let elapsed = now.duration_since(*last).unwrap_or_default();
                if elapsed >= *duration || done {
                    *last = now;
                    true
                } else {
                    false
                }
            },
        }
    }
}

/// Observer that prints sampled steps to stdout and keeps running
/// statistics about the search.
pub struct DbgObserver<S: State + Display> {
    print_sample: Sample,
    stat: Option<(String, Sample)>,
    steps: usize,
    skipped: usize,
    pruned: usize,
    solved: usize,
    max_frontier: usize,
    // Depth of each expanded state.
    depth_hist: HashMap<usize, usize>,
    // Number of children per expansion.
    width_hist: HashMap<usize, usize>,
    _marker: std::marker::PhantomData<S>,
}

impl <S: State + Display> DbgObserver<S> {
    pub fn new() -> Self {
        DbgObserver {
            print_sample: Sample::every_n(1),
            stat: None,
            steps: 0,
            skipped: 0,
            pruned: 0,
            solved: 0,
            max_frontier: 0,
            depth_hist: HashMap::new(),
            width_hist: HashMap::new(),
            _marker: std::marker::PhantomData,
        }
    }

    pub fn sample_print(&mut self, sample: Sample) -> &mut Self {
        self.print_sample = sample;
        self
    }

    pub fn sample_stats<Str: Into<String>>(&mut self, filename: Str, sample: Sample) -> &mut Self {
        self.stat = Some((filename.into(), sample));
        self
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn expanded(&self) -> usize {
        self.width_hist.values().sum()
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn pruned(&self) -> usize {
        self.pruned
    }

    pub fn solved(&self) -> usize {
        self.solved
    }

    pub fn depth_stat(&self) -> DistStat {
        DistStat::from_histogram(&self.depth_hist)
    }

    pub fn width_stat(&self) -> DistStat {
        DistStat::from_histogram(&self.width_hist)
    }

    fn update_stats(&mut self, view: &StepView<S>) {
        match view.event {
            SearchEvent::Skipped => self.skipped += 1,
            SearchEvent::Pruned => self.pruned += 1,
            SearchEvent::Solved => self.solved += 1,
            SearchEvent::Expanded { children } => {
                *self.depth_hist.entry(view.depth).or_default() += 1;
                *self.width_hist.entry(children).or_default() += 1;
            },
        }
        self.max_frontier = self.max_frontier.max(view.frontier);
        self.steps += 1;
    }

    pub fn summary(&self) -> String {
        format!(
            "Steps: {}\nExpanded: {}\nSkipped: {}\nPruned: {}\nSolved: {}\nMax frontier: {}\nDepth: {}\nBranching: {}\n",
            self.steps, self.expanded(), self.skipped, self.pruned, self.solved,
            self.max_frontier, self.depth_stat(), self.width_stat(),
        )
    }

    pub fn dump_stats(&self, filename: &str) -> Result<(), Box<dyn std::error::Error>> {
        std::fs::write(filename, self.summary())?;
        Ok(())
    }

    pub fn describe(view: &StepView<S>) -> String {
        let header = match view.event {
            SearchEvent::Skipped => "SKIPPED".to_string(),
            SearchEvent::Pruned => "PRUNED".to_string(),
            SearchEvent::Solved => "SOLVED".to_string(),
            SearchEvent::Expanded { children } => format!("EXPANDED ({} children)", children),
        };
        format!(
            "STEP {}: {} depth={} frontier={} visited={}\n{}",
            view.step, header, view.depth, view.frontier, view.visited, view.state,
        )
    }

    pub fn print(&self, view: &StepView<S>) {
        print!("{}\n", Self::describe(view));
    }
}

impl <S: State + Display> StepObserver<S> for DbgObserver<S> {
    fn after_step(&mut self, view: &StepView<S>) {
        self.update_stats(view);
        if self.print_sample.sample(view) {
            self.print(view);
        }
        if let Some((f, s)) = &mut self.stat {
            let filename = f.clone();
            if s.sample(view) {
                self.dump_stats(&filename)
                    .unwrap_or_else(|e| {
                        eprintln!("Failed to dump stats: {}\n", e)
                    });
            }
        }
    }

    fn after_search(&mut self, steps: usize, solved: bool) {
        // A solution was already printed by its own step.
        if !solved && self.print_sample.sample_end() {
            print!("UNSOLVABLE after {} steps\n", steps);
        }
        if let Some((f, s)) = &self.stat {
            if s.sample_end() {
                self.dump_stats(f)
                    .unwrap_or_else(|e| {
                        eprintln!("Failed to dump stats: {}\n", e)
                    });
            }
        }
    }
}

#[cfg(test)]
mod test {
    use crate::solver::{BfsSolver, DfsSolver, Solver};
    use crate::sudoku::{four_standard_parse, GridPuzzle};
    use crate::visited::VisitedRegistry;
    use super::*;

    #[test]
    fn test_dist_stat() {
        for (vals, stat) in vec![
            (
                vec![2, 2, 3, 4, 4],
                DistStat {
                    total: 15,
                    count: 5,
                    max: 4,
                    max_count: 2,
                    mean: 3.0,
                    median: 3.0,
                },
            ),
            (
                vec![2, 3, 3, 4, 4, 4],
                DistStat {
                    total: 20,
                    count: 6,
                    max: 4,
                    max_count: 3,
                    mean: 20.0/6.0,
                    median: 3.5,
                },
            ),
        ] {
            let mut hist = HashMap::new();
            for v in vals {
                *hist.entry(v).or_default() += 1;
            }
            assert_eq!(DistStat::from_histogram(&hist), stat);
        }
    }

    #[test]
    fn test_dist_stat_empty() {
        let stat = DistStat::from_histogram(&HashMap::new());
        assert_eq!(stat.count, 0);
        assert_eq!(stat.mean, 0.0);
        assert_eq!(stat.median, 0.0);
    }

    fn view(step: usize, event: SearchEvent, state: &GridPuzzle) -> StepView<'_, GridPuzzle> {
        StepView { step, event, depth: 0, frontier: 0, visited: 0, state }
    }

    #[test]
    fn test_sample_every_n() -> Result<(), Error> {
        let state = four_standard_parse("1...\n....\n....\n....\n")?;
        let mut sample = Sample::every_n(3);
        let fired = (1..=7)
            .map(|i| sample.sample(&view(i, SearchEvent::Pruned, &state)))
            .collect::<Vec<_>>();
        assert_eq!(fired, vec![false, false, true, false, false, true, false]);
        // A solution always fires.
        assert!(sample.sample(&view(8, SearchEvent::Solved, &state)));
        Ok(())
    }

    #[test]
    fn test_sample_never_and_at_end() -> Result<(), Error> {
        let state = four_standard_parse("1...\n....\n....\n....\n")?;
        let expanded = SearchEvent::Expanded { children: 4 };
        assert!(!Sample::never().sample(&view(1, SearchEvent::Solved, &state)));
        let mut at_end = Sample::at_end();
        assert!(!at_end.sample(&view(1, expanded, &state)));
        assert!(at_end.sample(&view(2, SearchEvent::Solved, &state)));
        Ok(())
    }

    #[test]
    fn test_sample_probability() -> Result<(), Error> {
        let state = four_standard_parse("1...\n....\n....\n....\n")?;
        assert!(Sample::probability(1.5).is_err());
        let mut always = Sample::probability(1.0)?;
        let mut rarely = Sample::probability(0.0)?;
        for i in 1..10 {
            assert!(always.sample(&view(i, SearchEvent::Pruned, &state)));
            assert!(!rarely.sample(&view(i, SearchEvent::Pruned, &state)));
        }
        assert!(rarely.sample(&view(10, SearchEvent::Solved, &state)));
        Ok(())
    }

    #[test]
    fn test_observer_stats() -> Result<(), Error> {
        let puzzle = four_standard_parse("1...\n...3\n.42.\n....\n")?;
        let mut dbg: DbgObserver<GridPuzzle> = DbgObserver::new();
        dbg.sample_print(Sample::never());
        let mut seen = VisitedRegistry::new();
        let path = DfsSolver::new().run(&puzzle, &mut seen, Some(&mut dbg))?;
        assert_eq!(path.len(), 13);
        assert_eq!(dbg.solved(), 1);
        assert_eq!(dbg.expanded(), seen.len());
        assert_eq!(dbg.steps(), dbg.expanded() + dbg.pruned() + dbg.skipped() + dbg.solved());
        // Every expansion of a 4x4 grid offers 4 symbols.
        assert_eq!(dbg.width_stat().max, 4);
        assert_eq!(dbg.width_stat().mean, 4.0);
        assert_eq!(dbg.depth_stat().max, 11);
        assert!(dbg.summary().starts_with(&format!("Steps: {}\n", dbg.steps())));
        Ok(())
    }

    #[test]
    fn test_observer_counts_skips() -> Result<(), Error> {
        let puzzle = four_standard_parse("1...\n...3\n.42.\n....\n")?;
        let first = BfsSolver::new().solve(&puzzle, None)?;
        let mut seen = VisitedRegistry::excluding(first.last());
        let mut dbg: DbgObserver<GridPuzzle> = DbgObserver::new();
        dbg.sample_print(Sample::never());
        let path = BfsSolver::new().run(&puzzle, &mut seen, Some(&mut dbg))?;
        assert!(path.is_empty());
        assert_eq!(dbg.skipped(), 1);
        assert_eq!(dbg.solved(), 0);
        Ok(())
    }

    #[test]
    fn test_stats_dumped_when_unsolvable() -> Result<(), Error> {
        let puzzle = four_standard_parse(".1..\n....\n2...\n4...\n")?;
        let file = std::env::temp_dir().join(format!("dbg-stats-{}.txt", std::process::id()));
        let _ = std::fs::remove_file(&file);
        let mut dbg: DbgObserver<GridPuzzle> = DbgObserver::new();
        dbg.sample_print(Sample::never())
            .sample_stats(file.display().to_string(), Sample::at_end());
        let path = BfsSolver::new().run(&puzzle, &mut VisitedRegistry::new(), Some(&mut dbg))?;
        assert!(path.is_empty());
        assert_eq!(dbg.solved(), 0);
        let written = std::fs::read_to_string(&file).map_err(|e| Error::new(e.to_string()))?;
        assert_eq!(written, dbg.summary());
        assert!(written.starts_with(&format!("Steps: {}\n", dbg.steps())));
        let _ = std::fs::remove_file(&file);
        Ok(())
    }

    #[test]
    fn test_sample_end() -> Result<(), Error> {
        assert!(!Sample::never().sample_end());
        assert!(Sample::at_end().sample_end());
        assert!(Sample::every_n(50).sample_end());
        assert!(Sample::probability(0.0)?.sample_end());
        assert!(Sample::time(Duration::from_secs(3600)).sample_end());
        Ok(())
    }

    #[test]
    fn test_describe() -> Result<(), Error> {
        let state = four_standard_parse("1...\n....\n....\n....\n")?;
        let v = StepView { step: 3, event: SearchEvent::Expanded { children: 4 }, depth: 1, frontier: 5, visited: 2, state: &state };
        assert_eq!(
            DbgObserver::describe(&v),
            "STEP 3: EXPANDED (4 children) depth=1 frontier=5 visited=2\n1...\n....\n....\n....\n",
        );
        Ok(())
    }
}
