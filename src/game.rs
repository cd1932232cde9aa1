//! Game session: level state, tap/swap turn handling, bomb, shuffle and progress.

use crate::GameConfig;
use crate::board::{self, Grid, Position};
use crate::bomb::{self, BombReport, MAX_BOMBS};
use crate::cascade::{self, CascadeReport};
use crate::progress::{PlayerProfile, ProgressError, ProgressStore};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use thiserror::Error;

/// Fewest moves any level gets.
const MIN_MOVES: u32 = 10;

/// Moves at level 0; one is taken away every three levels.
const BASE_MOVES: u32 = 25;

/// Per-level numbers. Replaced whenever a level (re)starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelSession {
    pub level: u32,
    pub moves: u32,
    pub score: u32,
    pub target: u32,
}

impl LevelSession {
    /// Fresh state for `level`: target `200 + 100 * level`, moves `max(10, 25 - level / 3)`.
    pub fn start(level: u32) -> Self {
        let level = level.max(1);
        Self {
            level,
            moves: BASE_MOVES.saturating_sub(level / 3).max(MIN_MOVES),
            score: 0,
            target: level.saturating_mul(100).saturating_add(200),
        }
    }

    pub fn symbol_set_size(&self) -> usize {
        board::symbol_set_size(self.level)
    }
}

/// Tap state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    Idle,
    Selected(Position),
    Swapping,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelStatus {
    Playing,
    /// Target reached; `level` already points at the next level.
    LevelComplete,
    /// Out of moves below target.
    GameOver,
}

/// What a tap did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TapOutcome {
    /// Dropped: out of moves, level over, busy, or off the board.
    Ignored,
    /// First tile armed.
    Selected(Position),
    /// Second tap was not next to the first; selection cleared, nothing else changed.
    InvalidAdjacency,
    /// Swap made no run and was swapped back; no move spent.
    NoLegalSwapMatch,
    /// Swap made a run; one move spent and the cascade resolved.
    Committed(CascadeReport),
}

#[derive(Debug, Error)]
pub enum GameError {
    #[error("another action is still resolving")]
    Busy,
    #[error("the level is over; start the next one first")]
    LevelFinished,
    #[error("no bombs left; they recharge at level {next_recharge_level}")]
    NoChargesAvailable { next_recharge_level: u32 },
    #[error(transparent)]
    Persist(#[from] ProgressError),
}

/// Everything one player's game needs. Owned by a single caller; every operation runs to
/// completion before returning.
pub struct GameSession {
    player: String,
    grid: Grid,
    level: LevelSession,
    coins: u32,
    bombs: u32,
    phase: TurnPhase,
    status: LevelStatus,
    /// Held for the whole of a swap, blast or shuffle.
    processing: bool,
    rng: SmallRng,
    store: Box<dyn ProgressStore>,
    max_cascade_passes: u32,
}

impl std::fmt::Debug for GameSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameSession")
            .field("player", &self.player)
            .field("level", &self.level)
            .field("coins", &self.coins)
            .field("bombs", &self.bombs)
            .field("phase", &self.phase)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

impl GameSession {
    /// Load the player's profile (defaults when none is saved) and start their level.
    pub fn new(
        player: impl Into<String>,
        store: Box<dyn ProgressStore>,
        config: &GameConfig,
    ) -> Result<Self, GameError> {
        let player = player.into();
        let profile = store.load(&player)?.unwrap_or_default().sanitized();
        let rng = match config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_os_rng(),
        };
        tracing::info!(
            player = %player,
            level = profile.level,
            coins = profile.coins,
            bombs = profile.bombs,
            "session started"
        );
        let mut session = Self {
            player,
            grid: Grid::empty(),
            level: LevelSession::start(profile.level),
            coins: profile.coins,
            bombs: profile.bombs.min(MAX_BOMBS),
            phase: TurnPhase::Idle,
            status: LevelStatus::Playing,
            processing: false,
            rng,
            store,
            max_cascade_passes: config.max_cascade_passes,
        };
        session.start_level();
        Ok(session)
    }

    pub fn player(&self) -> &str {
        &self.player
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn level(&self) -> &LevelSession {
        &self.level
    }

    pub fn coins(&self) -> u32 {
        self.coins
    }

    pub fn bombs(&self) -> u32 {
        self.bombs
    }

    pub fn status(&self) -> LevelStatus {
        self.status
    }

    pub fn selection(&self) -> Option<Position> {
        match self.phase {
            TurnPhase::Selected(p) => Some(p),
            _ => None,
        }
    }

    pub fn profile(&self) -> PlayerProfile {
        PlayerProfile {
            level: self.level.level,
            coins: self.coins,
            bombs: self.bombs,
        }
    }

    /// (Re)start the current level: new target and move budget, zero score, fresh board.
    /// Serves as "next level" after a win and "retry" after running out of moves.
    pub fn start_level(&mut self) {
        self.level = LevelSession::start(self.level.level);
        self.grid = board::generate(self.level.symbol_set_size(), &mut self.rng);
        self.phase = TurnPhase::Idle;
        self.status = LevelStatus::Playing;
        self.processing = false;
        tracing::info!(
            level = self.level.level,
            target = self.level.target,
            moves = self.level.moves,
            symbols = self.level.symbol_set_size(),
            "level started"
        );
    }

    fn accepts_input(&self) -> bool {
        !self.processing
            && self.phase != TurnPhase::Swapping
            && self.status == LevelStatus::Playing
            && self.level.moves > 0
    }

    /// Tap a tile. The first tap arms it; the second either swaps with an orthogonal
    /// neighbour or, for any other tile, just drops the selection.
    pub fn tap(&mut self, pos: Position) -> Result<TapOutcome, GameError> {
        if !pos.in_bounds() || !self.accepts_input() {
            return Ok(TapOutcome::Ignored);
        }
        let first = match self.phase {
            TurnPhase::Selected(first) => first,
            _ => {
                self.phase = TurnPhase::Selected(pos);
                return Ok(TapOutcome::Selected(pos));
            }
        };

        if !first.is_adjacent(pos) {
            self.phase = TurnPhase::Idle;
            tracing::debug!(?first, second = ?pos, "non-adjacent tap cleared selection");
            self.check_status()?;
            return Ok(TapOutcome::InvalidAdjacency);
        }

        self.phase = TurnPhase::Swapping;
        self.processing = true;
        self.grid.swap(first, pos);
        let outcome = if cascade::find_matches(&self.grid).is_empty() {
            self.grid.swap(first, pos);
            tracing::debug!(?first, second = ?pos, "swap made no match; reverted");
            TapOutcome::NoLegalSwapMatch
        } else {
            self.level.moves -= 1;
            let report = self.run_cascade();
            tracing::debug!(
                ?first,
                second = ?pos,
                removed = report.removed,
                passes = report.passes.len(),
                moves_left = self.level.moves,
                "swap committed"
            );
            TapOutcome::Committed(report)
        };
        self.phase = TurnPhase::Idle;
        self.processing = false;
        self.check_status()?;
        Ok(outcome)
    }

    /// Spend a bomb: blast a random 3x3 window, refill, then let any chain play out.
    /// Does not cost a move.
    pub fn detonate(&mut self) -> Result<BombReport, GameError> {
        if self.processing || self.phase == TurnPhase::Swapping {
            return Err(GameError::Busy);
        }
        if self.status != LevelStatus::Playing {
            return Err(GameError::LevelFinished);
        }
        if self.bombs == 0 {
            return Err(GameError::NoChargesAvailable {
                next_recharge_level: bomb::next_recharge_level(self.level.level),
            });
        }

        self.processing = true;
        self.bombs -= 1;
        let center = bomb::random_center(&mut self.rng);
        let blast = bomb::blast(&mut self.grid, center);
        self.level.score += blast.score;
        self.coins += blast.coins;
        cascade::apply_gravity(&mut self.grid, self.level.symbol_set_size(), &mut self.rng);
        let cascade = self.run_cascade();
        tracing::info!(
            ?center,
            destroyed = blast.destroyed,
            chained = cascade.removed,
            bombs_left = self.bombs,
            "bomb detonated"
        );
        self.processing = false;
        self.check_status()?;
        Ok(BombReport { blast, cascade })
    }

    /// Replace the board with a fresh one for the current symbol set. Costs no move.
    pub fn shuffle(&mut self) -> Result<CascadeReport, GameError> {
        if self.processing || self.phase == TurnPhase::Swapping {
            return Err(GameError::Busy);
        }
        if self.status != LevelStatus::Playing {
            return Err(GameError::LevelFinished);
        }
        self.processing = true;
        self.phase = TurnPhase::Idle;
        self.grid = board::generate(self.level.symbol_set_size(), &mut self.rng);
        let report = self.run_cascade();
        tracing::debug!(removed = report.removed, "board shuffled");
        self.processing = false;
        if report.removed > 0 {
            self.check_status()?;
        }
        Ok(report)
    }

    /// Back to level 1 with no coins and full bombs, and forget the saved profile.
    pub fn reset_progress(&mut self) -> Result<(), GameError> {
        self.level = LevelSession::start(1);
        self.coins = 0;
        self.bombs = MAX_BOMBS;
        self.start_level();
        tracing::info!(player = %self.player, "progress reset");
        self.store.clear(&self.player)?;
        Ok(())
    }

    /// Settle the level after a turn or blast: advance on reaching the target (refilling
    /// bombs on 11, 21, ... and saving), or end the level when moves run out.
    pub fn check_status(&mut self) -> Result<LevelStatus, GameError> {
        if self.status != LevelStatus::Playing {
            return Ok(self.status);
        }
        if self.level.score >= self.level.target {
            self.level.level = self.level.level.saturating_add(1);
            if bomb::recharges_on_entering(self.level.level) {
                self.bombs = MAX_BOMBS;
            }
            self.status = LevelStatus::LevelComplete;
            tracing::info!(
                next_level = self.level.level,
                score = self.level.score,
                coins = self.coins,
                bombs = self.bombs,
                "level complete"
            );
            self.store.save(&self.player, &self.profile())?;
        } else if self.level.moves == 0 {
            self.status = LevelStatus::GameOver;
            tracing::info!(
                level = self.level.level,
                score = self.level.score,
                target = self.level.target,
                "out of moves"
            );
        }
        Ok(self.status)
    }

    /// Resolve every run on the board and bank the payout.
    fn run_cascade(&mut self) -> CascadeReport {
        let report = cascade::resolve(
            &mut self.grid,
            self.level.symbol_set_size(),
            &mut self.rng,
            self.max_cascade_passes,
        );
        debug_assert!(self.grid.is_full());
        self.level.score += report.score_delta;
        self.coins += report.coin_delta;
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::tests::grid_from_strs;
    use crate::progress::MemoryProgressStore;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Store that records saves and can be shared with the test after boxing.
    #[derive(Default, Clone)]
    struct SharedStore(Rc<RefCell<MemoryProgressStore>>);

    impl ProgressStore for SharedStore {
        fn load(&self, player: &str) -> Result<Option<PlayerProfile>, ProgressError> {
            self.0.borrow().load(player)
        }
        fn save(&mut self, player: &str, profile: &PlayerProfile) -> Result<(), ProgressError> {
            self.0.borrow_mut().save(player, profile)
        }
        fn clear(&mut self, player: &str) -> Result<(), ProgressError> {
            self.0.borrow_mut().clear(player)
        }
    }

    struct FailingStore;

    impl ProgressStore for FailingStore {
        fn load(&self, _: &str) -> Result<Option<PlayerProfile>, ProgressError> {
            Ok(None)
        }
        fn save(&mut self, _: &str, _: &PlayerProfile) -> Result<(), ProgressError> {
            Err(read_only())
        }
        fn clear(&mut self, _: &str) -> Result<(), ProgressError> {
            Err(read_only())
        }
    }

    fn read_only() -> ProgressError {
        ProgressError::Io {
            path: "saves/test.json".into(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
        }
    }

    fn config() -> GameConfig {
        GameConfig {
            seed: Some(1234),
            max_cascade_passes: cascade::DEFAULT_MAX_PASSES,
            no_animation: true,
        }
    }

    /// Row 3 holds C C D at cols 2..4 with a C at (4, 4): swapping (3, 4) and (4, 4)
    /// completes a horizontal triple. Nothing else matches before or after.
    fn swappable_triple() -> Grid {
        grid_from_strs([
            "AABBAABB", "BBAABBAA", "AABBAABB", "BBCCDBAA", "AABBCABB", "BBAABBAA", "AABBAABB",
            "BBAABBAA",
        ])
    }

    fn session_with(store: impl ProgressStore + 'static, grid: Grid) -> GameSession {
        let mut s = GameSession::new("tester", Box::new(store), &config()).unwrap();
        s.grid = grid;
        s
    }

    #[test]
    fn level_parameters_follow_level() {
        let l1 = LevelSession::start(1);
        assert_eq!((l1.target, l1.moves, l1.score), (300, 25, 0));
        let l9 = LevelSession::start(9);
        assert_eq!((l9.target, l9.moves), (1100, 22));
        let l60 = LevelSession::start(60);
        assert_eq!(l60.moves, 10);
        let top = LevelSession::start(u32::MAX);
        assert_eq!((top.target, top.moves), (u32::MAX, 10));
    }

    #[test]
    fn new_session_uses_saved_profile_or_defaults() {
        let s = GameSession::new("fresh", Box::new(MemoryProgressStore::default()), &config())
            .unwrap();
        assert_eq!(s.profile(), PlayerProfile { level: 1, coins: 0, bombs: 3 });
        assert!(s.grid().is_full());
        assert!(cascade::find_matches(s.grid()).is_empty());

        let mut store = MemoryProgressStore::default();
        store
            .save("vet", &PlayerProfile { level: 12, coins: 80, bombs: 1 })
            .unwrap();
        let s = GameSession::new("vet", Box::new(store), &config()).unwrap();
        assert_eq!(s.level().level, 12);
        assert_eq!(s.level().target, 1400);
        assert_eq!(s.coins(), 80);
        assert_eq!(s.bombs(), 1);
    }

    #[test]
    fn first_tap_selects() {
        let mut s = session_with(MemoryProgressStore::default(), swappable_triple());
        let p = Position::new(2, 2);
        assert_eq!(s.tap(p).unwrap(), TapOutcome::Selected(p));
        assert_eq!(s.selection(), Some(p));
    }

    #[test]
    fn non_adjacent_swap_changes_nothing_and_clears_selection() {
        let mut s = session_with(MemoryProgressStore::default(), swappable_triple());
        let before = s.grid().clone();
        let moves = s.level().moves;

        s.tap(Position::new(3, 4)).unwrap();
        let out = s.tap(Position::new(5, 6)).unwrap();
        assert_eq!(out, TapOutcome::InvalidAdjacency);
        assert_eq!(s.grid(), &before);
        assert_eq!(s.level().moves, moves);
        assert_eq!(s.selection(), None);

        // Tapping the armed tile again also just clears it.
        s.tap(Position::new(3, 4)).unwrap();
        assert_eq!(s.tap(Position::new(3, 4)).unwrap(), TapOutcome::InvalidAdjacency);
        assert_eq!(s.selection(), None);
    }

    #[test]
    fn swap_without_match_is_reverted_and_free() {
        let mut s = session_with(MemoryProgressStore::default(), swappable_triple());
        let before = s.grid().clone();
        s.tap(Position::new(0, 1)).unwrap();
        assert_eq!(s.tap(Position::new(0, 2)).unwrap(), TapOutcome::NoLegalSwapMatch);
        assert_eq!(s.grid(), &before);
        assert_eq!(s.level().moves, 25);
        assert_eq!(s.level().score, 0);
        assert_eq!(s.selection(), None);
    }

    #[test]
    fn matching_swap_spends_one_move_and_pays_out() {
        let mut s = session_with(MemoryProgressStore::default(), swappable_triple());
        s.tap(Position::new(3, 4)).unwrap();
        let out = s.tap(Position::new(4, 4)).unwrap();

        let TapOutcome::Committed(report) = out else {
            panic!("expected a committed swap, got {out:?}");
        };
        assert!(report.removed >= 3);
        assert!(report.passes[0].contains(&Position::new(3, 2)));
        assert_eq!(s.level().moves, 24);
        assert!(s.level().score >= 30);
        assert!(s.coins() >= 3);
        assert_eq!(s.level().score, report.score_delta);
        assert!(s.grid().is_full());
        assert!(cascade::find_matches(s.grid()).is_empty());
        assert_eq!(s.status(), LevelStatus::Playing);
    }

    #[test]
    fn running_out_of_moves_ends_level_and_blocks_taps() {
        let mut s = session_with(MemoryProgressStore::default(), swappable_triple());
        s.level.moves = 1;
        s.tap(Position::new(3, 4)).unwrap();
        s.tap(Position::new(4, 4)).unwrap();
        assert_eq!(s.level().moves, 0);
        assert_eq!(s.status(), LevelStatus::GameOver);

        let frozen = s.grid().clone();
        assert_eq!(s.tap(Position::new(0, 0)).unwrap(), TapOutcome::Ignored);
        assert_eq!(s.tap(Position::new(0, 1)).unwrap(), TapOutcome::Ignored);
        assert_eq!(s.grid(), &frozen);
        assert_eq!(s.selection(), None);

        s.start_level();
        assert_eq!(s.status(), LevelStatus::Playing);
        assert_eq!(s.level().level, 1);
        assert_eq!(s.level().moves, 25);
    }

    #[test]
    fn reaching_target_advances_and_saves() {
        let store = SharedStore::default();
        let mut s = session_with(store.clone(), swappable_triple());
        s.level.score = s.level.target - 30;
        s.tap(Position::new(3, 4)).unwrap();
        s.tap(Position::new(4, 4)).unwrap();

        assert_eq!(s.status(), LevelStatus::LevelComplete);
        assert_eq!(s.level().level, 2);
        let saved = store.load("tester").unwrap().expect("profile saved on level up");
        assert_eq!(saved, s.profile());

        // Further taps wait for the next level.
        assert_eq!(s.tap(Position::new(0, 0)).unwrap(), TapOutcome::Ignored);
        s.start_level();
        assert_eq!(s.level().target, 400);
        assert_eq!(s.level().score, 0);
    }

    #[test]
    fn completing_level_ten_recharges_bombs() {
        let store = SharedStore::default();
        let mut s = session_with(store.clone(), swappable_triple());
        s.level = LevelSession::start(10);
        s.bombs = 0;
        s.level.score = s.level.target;
        assert_eq!(s.check_status().unwrap(), LevelStatus::LevelComplete);
        assert_eq!(s.level().level, 11);
        assert_eq!(s.bombs(), 3);
        assert_eq!(store.load("tester").unwrap().unwrap().bombs, 3);
    }

    #[test]
    fn completing_other_levels_keeps_bomb_count() {
        let mut s = session_with(MemoryProgressStore::default(), swappable_triple());
        s.level = LevelSession::start(11);
        s.bombs = 1;
        s.level.score = s.level.target;
        s.check_status().unwrap();
        assert_eq!(s.level().level, 12);
        assert_eq!(s.bombs(), 1);
    }

    #[test]
    fn bomb_without_charges_is_refused_untouched() {
        let mut s = session_with(MemoryProgressStore::default(), swappable_triple());
        s.bombs = 0;
        let before = s.grid().clone();
        let err = s.detonate().unwrap_err();
        assert!(matches!(err, GameError::NoChargesAvailable { next_recharge_level: 11 }));
        assert_eq!(s.grid(), &before);
        assert_eq!(s.bombs(), 0);
        assert_eq!(s.level().score, 0);
    }

    #[test]
    fn bomb_spends_a_charge_not_a_move() {
        let mut s = session_with(MemoryProgressStore::default(), swappable_triple());
        let report = s.detonate().unwrap();
        assert_eq!(s.bombs(), 2);
        assert_eq!(s.level().moves, 25);
        assert_eq!(report.blast.destroyed, 9);
        assert!((1..=6).contains(&report.blast.center.row));
        assert!((1..=6).contains(&report.blast.center.col));
        assert_eq!(s.level().score, report.score_delta());
        assert_eq!(s.coins(), report.coin_delta());
        assert!(s.level().score >= 135);
        assert!(s.grid().is_full());
        assert!(cascade::find_matches(s.grid()).is_empty());
    }

    #[test]
    fn bomb_can_finish_a_level() {
        let mut s = session_with(MemoryProgressStore::default(), swappable_triple());
        s.level.score = s.level.target - 100;
        s.detonate().unwrap();
        assert_eq!(s.status(), LevelStatus::LevelComplete);
        assert!(matches!(s.detonate(), Err(GameError::LevelFinished)));
    }

    #[test]
    fn shuffle_replaces_board_without_spending_moves() {
        let mut s = session_with(MemoryProgressStore::default(), swappable_triple());
        s.tap(Position::new(0, 0)).unwrap();
        let before = s.grid().clone();
        s.shuffle().unwrap();
        assert_ne!(s.grid(), &before);
        assert_eq!(s.level().moves, 25);
        assert_eq!(s.selection(), None);
        assert!(cascade::find_matches(s.grid()).is_empty());
    }

    #[test]
    fn reset_returns_to_level_one_and_forgets_save() {
        let store = SharedStore::default();
        let mut s = session_with(store.clone(), swappable_triple());
        s.level = LevelSession::start(14);
        s.coins = 500;
        s.bombs = 0;
        s.level.score = s.level.target;
        s.check_status().unwrap();
        assert!(store.load("tester").unwrap().is_some());

        s.reset_progress().unwrap();
        assert_eq!(s.profile(), PlayerProfile { level: 1, coins: 0, bombs: 3 });
        assert_eq!(s.level().score, 0);
        assert_eq!(s.status(), LevelStatus::Playing);
        assert!(store.load("tester").unwrap().is_none());
    }

    #[test]
    fn save_failure_is_surfaced_after_advancing() {
        let mut s = session_with(FailingStore, swappable_triple());
        s.level.score = s.level.target;
        let err = s.check_status().unwrap_err();
        assert!(matches!(err, GameError::Persist(ProgressError::Io { .. })));
        assert_eq!(s.level().level, 2);
        assert_eq!(s.status(), LevelStatus::LevelComplete);
    }

    #[test]
    fn shuffle_is_refused_after_a_win() {
        let mut s = session_with(SharedStore::default(), swappable_triple());
        s.level.score = s.level.target;
        s.check_status().unwrap();
        let before = s.grid().clone();
        assert!(matches!(s.shuffle(), Err(GameError::LevelFinished)));
        assert_eq!(s.grid(), &before);
        assert_eq!(s.status(), LevelStatus::LevelComplete);
    }

    #[test]
    fn failed_clear_still_leaves_a_fresh_level_one() {
        let mut s = session_with(FailingStore, swappable_triple());
        s.level = LevelSession::start(7);
        s.coins = 40;
        s.bombs = 0;
        let err = s.reset_progress().unwrap_err();
        assert!(matches!(err, GameError::Persist(ProgressError::Io { .. })));
        assert_eq!(s.level().level, 1);
        assert_eq!((s.coins(), s.bombs()), (0, MAX_BOMBS));
        assert_eq!(s.status(), LevelStatus::Playing);
        assert!(s.grid().is_full());
        assert_eq!(s.tap(Position::new(0, 0)).unwrap(), TapOutcome::Selected(Position::new(0, 0)));
    }
}
