//! Match detection, gravity/refill and the cascade loop that chains them.

use crate::board::{BOARD_SIZE, Cell, Grid, Position, Symbol};
use rand::Rng;
use std::collections::BTreeSet;

/// Minimum run length that counts as a match.
pub const MIN_RUN: usize = 3;

/// Points per tile removed by a match.
pub const SCORE_PER_TILE: u32 = 10;

/// Coins per tile removed by a match.
pub const COINS_PER_TILE: u32 = 1;

/// Default bound on detect/remove/refill passes for a single action.
pub const DEFAULT_MAX_PASSES: u32 = 100;

/// Positions taking part in at least one run. Overlapping runs (L/T shapes) contribute
/// each position once.
pub type MatchSet = BTreeSet<Position>;

/// Every horizontal and vertical run of `MIN_RUN` or more equal, non-empty cells.
pub fn find_matches(grid: &Grid) -> MatchSet {
    let mut matches = MatchSet::new();
    for r in 0..BOARD_SIZE {
        collect_runs(
            (0..BOARD_SIZE).map(|c| Position::new(r, c)),
            grid,
            &mut matches,
        );
    }
    for c in 0..BOARD_SIZE {
        collect_runs(
            (0..BOARD_SIZE).map(|r| Position::new(r, c)),
            grid,
            &mut matches,
        );
    }
    matches
}

/// Walk one line of positions and add every run of `MIN_RUN`+ equal symbols to `out`.
fn collect_runs(line: impl Iterator<Item = Position>, grid: &Grid, out: &mut MatchSet) {
    let mut run: Vec<Position> = Vec::with_capacity(BOARD_SIZE);
    let mut run_symbol: Option<Symbol> = None;
    for pos in line {
        let sym = grid.get(pos).symbol();
        if sym.is_some() && sym == run_symbol {
            run.push(pos);
            continue;
        }
        if run.len() >= MIN_RUN {
            out.extend(run.iter().copied());
        }
        run.clear();
        run.push(pos);
        run_symbol = sym;
    }
    if run.len() >= MIN_RUN && run_symbol.is_some() {
        out.extend(run);
    }
}

/// Per column: slide non-empty cells to the bottom keeping their order, then refill the
/// vacated top cells with independent draws from the active set. Refills are not checked
/// for matches; new runs formed here feed the next cascade pass.
pub fn apply_gravity<R: Rng + ?Sized>(grid: &mut Grid, set_size: usize, rng: &mut R) {
    for c in 0..BOARD_SIZE {
        let mut write = BOARD_SIZE;
        for r in (0..BOARD_SIZE).rev() {
            let cell = grid.get(Position::new(r, c));
            if !cell.is_empty() {
                write -= 1;
                if write != r {
                    grid.set(Position::new(write, c), cell);
                    grid.set(Position::new(r, c), Cell::Empty);
                }
            }
        }
        for r in (0..write).rev() {
            grid.set(Position::new(r, c), Cell::Symbol(Symbol::random(rng, set_size)));
        }
    }
}

/// What a cascade did to the board and the economy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CascadeReport {
    /// Tiles removed across all passes.
    pub removed: u32,
    pub score_delta: u32,
    pub coin_delta: u32,
    /// Positions cleared by each pass, in order. One entry per animation stage.
    pub passes: Vec<MatchSet>,
    /// The pass limit was reached before the board settled.
    pub capped: bool,
}

/// Detect, remove, refill, repeat until no run remains or `max_passes` is reached.
pub fn resolve<R: Rng + ?Sized>(
    grid: &mut Grid,
    set_size: usize,
    rng: &mut R,
    max_passes: u32,
) -> CascadeReport {
    let mut report = CascadeReport::default();
    loop {
        let matches = find_matches(grid);
        if matches.is_empty() {
            break;
        }
        if report.passes.len() as u32 >= max_passes {
            tracing::warn!(
                passes = report.passes.len(),
                pending = matches.len(),
                "cascade pass limit reached; leaving remaining runs on the board"
            );
            report.capped = true;
            break;
        }

        let mut cleared = 0u32;
        for &pos in &matches {
            if !grid.get(pos).is_empty() {
                grid.set(pos, Cell::Empty);
                cleared += 1;
            }
        }
        report.removed += cleared;
        report.score_delta += cleared * SCORE_PER_TILE;
        report.coin_delta += cleared * COINS_PER_TILE;
        tracing::debug!(pass = report.passes.len() + 1, cleared, "cascade pass");
        report.passes.push(matches);

        apply_gravity(grid, set_size, rng);
    }
    report
}
