//! Bomb power-up rules: charges, recharge levels and the 3x3 blast.

use crate::board::{BOARD_SIZE, Cell, Grid, Position};
use crate::cascade::CascadeReport;
use rand::Rng;

pub use crate::progress::MAX_BOMBS;

/// Points per tile destroyed by a blast.
pub const SCORE_PER_BLAST_TILE: u32 = 15;

/// Coins per tile destroyed by a blast.
pub const COINS_PER_BLAST_TILE: u32 = 2;

/// Bombs refill every this many levels (on entering 11, 21, 31, ...).
pub const RECHARGE_EVERY: u32 = 10;

/// True when arriving at `level` refills the bomb charges.
pub fn recharges_on_entering(level: u32) -> bool {
    level > 1 && (level - 1) % RECHARGE_EVERY == 0
}

/// First level at or after `level` that refills charges: `ceil(level / 10) * 10 + 1`.
pub fn next_recharge_level(level: u32) -> u32 {
    level
        .div_ceil(RECHARGE_EVERY)
        .saturating_mul(RECHARGE_EVERY)
        .saturating_add(1)
}

/// Uniform blast centre whose 3x3 window stays on the board (both coordinates in 1..=6).
pub fn random_center<R: Rng + ?Sized>(rng: &mut R) -> Position {
    Position::new(
        rng.random_range(1..BOARD_SIZE - 1),
        rng.random_range(1..BOARD_SIZE - 1),
    )
}

/// Tiles destroyed by one blast and what they paid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Blast {
    pub center: Position,
    pub destroyed: u32,
    pub score: u32,
    pub coins: u32,
}

/// Empty the 3x3 window around `center`. Cells that were already empty pay nothing.
pub fn blast(grid: &mut Grid, center: Position) -> Blast {
    let mut destroyed = 0u32;
    for r in center.row.saturating_sub(1)..=(center.row + 1).min(BOARD_SIZE - 1) {
        for c in center.col.saturating_sub(1)..=(center.col + 1).min(BOARD_SIZE - 1) {
            let pos = Position::new(r, c);
            if !grid.get(pos).is_empty() {
                grid.set(pos, Cell::Empty);
                destroyed += 1;
            }
        }
    }
    Blast {
        center,
        destroyed,
        score: destroyed * SCORE_PER_BLAST_TILE,
        coins: destroyed * COINS_PER_BLAST_TILE,
    }
}

/// Outcome of a successful detonation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BombReport {
    pub blast: Blast,
    /// Chain reaction after the refill.
    pub cascade: CascadeReport,
}

impl BombReport {
    pub fn score_delta(&self) -> u32 {
        self.blast.score + self.cascade.score_delta
    }

    pub fn coin_delta(&self) -> u32 {
        self.blast.coins + self.cascade.coin_delta
    }
}
