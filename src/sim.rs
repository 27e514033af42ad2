use std::{collections::HashSet, fmt::Display};

use rayon::prelude::*;

use crate::{
    lab::{self, Direction, Laboratory, Position, Tile},
    Error,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Guard {
    pos: Position,
    dir: Direction,
}

impl Display for Guard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.dir, self.pos)
    }
}

impl Guard {
    pub fn new(pos: Position, dir: Direction) -> Self {
        Self { pos, dir }
    }

    pub fn pos(&self) -> &Position {
        &self.pos
    }

    pub fn dir(&self) -> Direction {
        self.dir
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Trace,
    DetectLoop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Exited,
    Turned,
    Moved,
    Looped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Exited,
    Looped,
}

/// One guard walking one laboratory, with everything it has seen in the
/// current run.
pub struct Patrol<'a> {
    lab: &'a Laboratory,
    mode: Mode,
    guard: Guard,
    visited_positions: HashSet<Position>,
    visited_states: HashSet<Guard>,
}

impl<'a> Patrol<'a> {
    pub fn new(lab: &'a Laboratory, mode: Mode) -> Result<Self, Error> {
        let mut patrol = Self {
            lab,
            mode,
            guard: Guard::new(lab.locate_start()?, Direction::Up),
            visited_positions: HashSet::new(),
            visited_states: HashSet::new(),
        };
        patrol.log_current();

        Ok(patrol)
    }

    /// Puts the guard back on the start facing up and forgets the old run.
    pub fn reset(&mut self) -> Result<(), Error> {
        self.guard = Guard::new(self.lab.locate_start()?, Direction::Up);
        self.visited_positions.clear();
        self.visited_states.clear();
        self.log_current();

        Ok(())
    }

    pub fn guard(&self) -> &Guard {
        &self.guard
    }

    pub fn visited_positions(&self) -> &HashSet<Position> {
        &self.visited_positions
    }

    pub fn into_visited_positions(self) -> HashSet<Position> {
        self.visited_positions
    }

    pub fn visited_states(&self) -> &HashSet<Guard> {
        &self.visited_states
    }

    fn log_current(&mut self) {
        self.visited_positions.insert(self.guard.pos);
        self.visited_states.insert(self.guard);
    }

    pub fn advance_once(&mut self) -> Result<Step, Error> {
        // Stepping below row or column zero is leaving the laboratory too.
        let Some(ahead) = lab::step(self.guard.dir, &self.guard.pos) else {
            return Ok(Step::Exited);
        };

        // Checked before bounds: a repeated (position, facing) means the
        // rest of the walk repeats forever.
        if self.mode == Mode::DetectLoop
            && self
                .visited_states
                .contains(&Guard::new(ahead, self.guard.dir))
        {
            return Ok(Step::Looped);
        }

        if self.lab.is_out_of_bounds(&ahead) {
            return Ok(Step::Exited);
        }

        match self.lab.tile(&ahead)? {
            Tile::Blocked => {
                self.guard.dir = lab::turn_right(self.guard.dir);
                // Turning in place never reaches a new cell, so a guard
                // walled in on all sides only shows up as a repeated turn.
                if self.mode == Mode::DetectLoop && !self.visited_states.insert(self.guard) {
                    return Ok(Step::Looped);
                }

                Ok(Step::Turned)
            }
            Tile::Open | Tile::Start => {
                self.guard.pos = ahead;
                self.log_current();
                Ok(Step::Moved)
            }
        }
    }

    /// Advances until the guard leaves the laboratory or, when detecting
    /// loops, until a loop is found.
    pub fn run(&mut self) -> Result<Outcome, Error> {
        loop {
            match self.advance_once()? {
                Step::Exited => return Ok(Outcome::Exited),
                Step::Looped => return Ok(Outcome::Looped),
                Step::Turned | Step::Moved => (),
            }
        }
    }
}

/// Positions the guard walks through on the unmodified laboratory, start
/// included.
pub fn patrol_positions(lab: &Laboratory) -> Result<HashSet<Position>, Error> {
    let mut patrol = Patrol::new(lab, Mode::Trace)?;
    patrol.run()?;

    Ok(patrol.into_visited_positions())
}

pub fn run_to_exit(lab: &Laboratory) -> Result<usize, Error> {
    let patrol_n = patrol_positions(lab)?.len();
    tracing::info!(patrol_n, "Guard left the laboratory");

    Ok(patrol_n)
}

/// Cells worth blocking: the baseline path without the start, row-major.
pub fn loop_candidates(lab: &Laboratory) -> Result<Vec<Position>, Error> {
    let start = lab.locate_start()?;
    let mut candidates = patrol_positions(lab)?
        .into_iter()
        .filter(|pos| *pos != start)
        .collect::<Vec<_>>();
    candidates.sort_unstable();

    Ok(candidates)
}

pub fn is_loop_with_obstacle(lab: &mut Laboratory, pos: &Position) -> Result<bool, Error> {
    let blocked = lab.place_temp_obstacle(pos)?;
    let outcome = Patrol::new(&blocked, Mode::DetectLoop)?.run()?;
    tracing::trace!(%pos, ?outcome, "Trial finished");

    Ok(outcome == Outcome::Looped)
}

pub trait SweepObserver {
    fn on_trial(&mut self, _ind: usize, _total: usize, _pos: &Position, _is_loop: bool) {}
}

impl SweepObserver for () {}

pub struct LogProgress {
    every: usize,
}

impl LogProgress {
    /// `every` of 0 never reports.
    pub fn new(every: usize) -> Self {
        Self { every }
    }
}

impl SweepObserver for LogProgress {
    fn on_trial(&mut self, ind: usize, total: usize, _pos: &Position, _is_loop: bool) {
        if self.every != 0 && ind % self.every == 0 {
            tracing::info!("Checking position {}/{}", ind, total);
        }
    }
}

/// Counts the candidates which trap the guard once blocked, testing them one
/// at a time on `lab`. `lab` is the same as before when this returns.
pub fn count_loop_obstacles<O: SweepObserver>(
    lab: &mut Laboratory,
    observer: &mut O,
) -> Result<usize, Error> {
    let candidates = loop_candidates(lab)?;
    tracing::debug!(candidate_n = candidates.len(), "Testing obstacle candidates");
    let mut loop_n = 0;
    for (ind, pos) in candidates.iter().enumerate() {
        let is_loop = is_loop_with_obstacle(lab, pos)?;
        if is_loop {
            loop_n += 1;
        }
        observer.on_trial(ind, candidates.len(), pos, is_loop);
    }

    tracing::info!(loop_n, candidate_n = candidates.len(), "Sweep finished");
    Ok(loop_n)
}

/// Same count as [`count_loop_obstacles`], each trial on its own copy of `lab`.
pub fn count_loop_obstacles_parallel(lab: &Laboratory) -> Result<usize, Error> {
    let candidates = loop_candidates(lab)?;
    let loops = candidates
        .par_iter()
        .map(|pos| is_loop_with_obstacle(&mut lab.clone(), pos))
        .collect::<Result<Vec<_>, _>>()?;
    let loop_n = loops.into_iter().filter(|is_loop| *is_loop).count();

    tracing::info!(loop_n, candidate_n = candidates.len(), "Parallel sweep finished");
    Ok(loop_n)
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use test_case::test_case;

    use super::*;

    const SAMPLE: &str = indoc! {"
        ....#.....
        .........#
        ..........
        ..#.......
        .......#..
        ..........
        .#..^.....
        ........#.
        #.........
        ......#...
    "};

    fn lab(text: &str) -> Laboratory {
        text.parse().unwrap()
    }

    #[test]
    fn sample_run_to_exit() {
        assert_eq!(run_to_exit(&lab(SAMPLE)).unwrap(), 41);
    }

    #[test]
    fn sample_loop_obstacles() {
        let mut lab = lab(SAMPLE);
        let before = lab.clone();
        assert_eq!(count_loop_obstacles(&mut lab, &mut ()).unwrap(), 6);
        assert_eq!(lab, before);
    }

    #[test]
    fn sample_loop_obstacles_parallel() {
        assert_eq!(count_loop_obstacles_parallel(&lab(SAMPLE)).unwrap(), 6);
    }

    #[test]
    fn sample_known_loop_positions() {
        let mut lab = lab(SAMPLE);
        let loops = loop_candidates(&lab)
            .unwrap()
            .into_iter()
            .filter(|pos| is_loop_with_obstacle(&mut lab, pos).unwrap())
            .collect::<Vec<_>>();
        assert_eq!(
            loops,
            vec![
                Position::new(6, 3),
                Position::new(7, 6),
                Position::new(7, 7),
                Position::new(8, 1),
                Position::new(8, 3),
                Position::new(9, 7),
            ]
        );
    }

    #[test]
    fn run_to_exit_is_repeatable() {
        let lab = lab(SAMPLE);
        assert_eq!(run_to_exit(&lab).unwrap(), run_to_exit(&lab).unwrap());
    }

    #[test_case(".^.\n...\n", 1; "start on top edge")]
    #[test_case("^\n", 1; "single cell")]
    #[test_case("...\n...\n.^.\n", 3; "straight up")]
    #[test_case("#..\n...\n^..\n", 4; "turn at wall then exit right")]
    fn exit_counts(text: &str, expect: usize) {
        assert_eq!(run_to_exit(&lab(text)).unwrap(), expect);
    }

    #[test_case(SAMPLE, 6; "sample")]
    #[test_case(".#.\n#^#\n...\n", 1; "new obstacle walls guard in")]
    #[test_case("..^..\n.....\n", 0; "no candidates")]
    fn sweep_counts(text: &str, expect: usize) {
        let mut lab = lab(text);
        assert_eq!(count_loop_obstacles(&mut lab, &mut ()).unwrap(), expect);
        assert_eq!(count_loop_obstacles_parallel(&lab).unwrap(), expect);
    }

    #[test]
    fn walled_in_guard_loops_after_full_turn() {
        let lab = lab(".#.\n#^#\n.#.\n");
        let mut patrol = Patrol::new(&lab, Mode::DetectLoop).unwrap();
        for dir in [Direction::Right, Direction::Down, Direction::Left] {
            assert_eq!(patrol.advance_once().unwrap(), Step::Turned);
            assert_eq!(patrol.guard().dir(), dir);
        }
        assert_eq!(patrol.advance_once().unwrap(), Step::Looped);
        assert_eq!(*patrol.guard().pos(), Position::new(1, 1));
        assert_eq!(patrol.visited_positions().len(), 1);
    }

    #[test]
    fn candidates_exclude_start_and_stay_on_path() {
        let lab = lab(SAMPLE);
        let start = lab.locate_start().unwrap();
        let baseline = patrol_positions(&lab).unwrap();
        let candidates = loop_candidates(&lab).unwrap();
        assert_eq!(candidates.len(), baseline.len() - 1);
        assert!(!candidates.contains(&start));
        assert!(candidates.iter().all(|pos| baseline.contains(pos)));
        assert!(candidates.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn enclosed_loop_detected_within_bound() {
        let lab = lab(indoc! {"
            .#...
            ....#
            .^...
            #....
            ...#.
        "});
        let mut patrol = Patrol::new(&lab, Mode::DetectLoop).unwrap();
        let bound = lab.row_n() * lab.col_n() * 4;
        let mut steps = 0;
        let outcome = loop {
            steps += 1;
            assert!(steps <= bound, "no loop after {} steps", bound);
            match patrol.advance_once().unwrap() {
                Step::Looped => break Outcome::Looped,
                Step::Exited => break Outcome::Exited,
                Step::Turned | Step::Moved => (),
            }
        };
        assert_eq!(outcome, Outcome::Looped);
    }

    #[test]
    fn trace_mode_never_reports_loop() {
        let lab = lab(".#.\n..#\n^..\n");
        let mut patrol = Patrol::new(&lab, Mode::Trace).unwrap();
        assert_eq!(patrol.run().unwrap(), Outcome::Exited);
    }

    #[test]
    fn advance_once_steps() {
        let lab = lab("#..\n...\n^..\n");
        let mut patrol = Patrol::new(&lab, Mode::Trace).unwrap();
        assert_eq!(patrol.advance_once().unwrap(), Step::Moved);
        assert_eq!(*patrol.guard(), Guard::new(Position::new(1, 0), Direction::Up));
        assert_eq!(patrol.advance_once().unwrap(), Step::Turned);
        assert_eq!(*patrol.guard().pos(), Position::new(1, 0));
        assert_eq!(patrol.guard().dir(), Direction::Right);
        assert_eq!(patrol.advance_once().unwrap(), Step::Moved);
        assert_eq!(patrol.advance_once().unwrap(), Step::Moved);
        assert_eq!(patrol.advance_once().unwrap(), Step::Exited);
        assert_eq!(patrol.visited_positions().len(), 4);
        assert_eq!(patrol.visited_states().len(), 4);
    }

    #[test]
    fn reset_clears_previous_run() {
        let lab = lab(SAMPLE);
        let mut patrol = Patrol::new(&lab, Mode::Trace).unwrap();
        patrol.run().unwrap();
        patrol.reset().unwrap();
        assert_eq!(*patrol.guard(), Guard::new(Position::new(6, 4), Direction::Up));
        assert_eq!(patrol.visited_positions().len(), 1);
        assert_eq!(patrol.visited_states().len(), 1);
        patrol.run().unwrap();
        assert_eq!(patrol.visited_positions().len(), 41);
    }

    #[test]
    fn loop_replays_deterministically() {
        let mut lab = lab(SAMPLE);
        let pos = Position::new(6, 3);
        let blocked = lab.place_temp_obstacle(&pos).unwrap();
        let trace = || {
            let mut patrol = Patrol::new(&blocked, Mode::DetectLoop).unwrap();
            let mut guards = vec![*patrol.guard()];
            while patrol.advance_once().unwrap() != Step::Looped {
                guards.push(*patrol.guard());
            }
            guards
        };
        assert_eq!(trace(), trace());
    }

    #[test]
    fn observer_sees_every_candidate() {
        struct Record(Vec<(usize, usize, bool)>);
        impl SweepObserver for Record {
            fn on_trial(&mut self, ind: usize, total: usize, _pos: &Position, is_loop: bool) {
                self.0.push((ind, total, is_loop));
            }
        }

        let mut lab = lab(SAMPLE);
        let mut record = Record(Vec::new());
        let loop_n = count_loop_obstacles(&mut lab, &mut record).unwrap();
        assert_eq!(record.0.len(), 40);
        assert!(record.0.iter().enumerate().all(|(i, (ind, total, _))| i == *ind && *total == 40));
        assert_eq!(record.0.iter().filter(|(_, _, l)| *l).count(), loop_n);
    }
}
