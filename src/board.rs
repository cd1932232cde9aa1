//! Board model: symbols, cells, positions, the 8x8 grid and match-free board generation.

use rand::Rng;

/// Side length of the square board.
pub const BOARD_SIZE: usize = 8;

/// Symbols in play at level 1.
const BASE_SYMBOL_COUNT: usize = 4;

/// One extra symbol kind joins the set every this many levels.
const LEVELS_PER_EXTRA_SYMBOL: u32 = 6;

/// Fruit kinds. The active set for a level is always a prefix of `ALL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Symbol {
    Apple,
    Grape,
    Orange,
    Banana,
    Melon,
    Kiwi,
    Strawberry,
    Pineapple,
}

impl Symbol {
    pub const ALL: [Self; 8] = [
        Self::Apple,
        Self::Grape,
        Self::Orange,
        Self::Banana,
        Self::Melon,
        Self::Kiwi,
        Self::Strawberry,
        Self::Pineapple,
    ];

    /// Index into `ALL` (and into the theme's symbol colours).
    pub fn index(self) -> usize {
        self as usize
    }

    /// Single-width glyph drawn on the tile.
    pub fn glyph(self) -> char {
        match self {
            Self::Apple => '●',
            Self::Grape => '♣',
            Self::Orange => '◉',
            Self::Banana => '☾',
            Self::Melon => '◆',
            Self::Kiwi => '✿',
            Self::Strawberry => '♥',
            Self::Pineapple => '★',
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Apple => "apple",
            Self::Grape => "grape",
            Self::Orange => "orange",
            Self::Banana => "banana",
            Self::Melon => "melon",
            Self::Kiwi => "kiwi",
            Self::Strawberry => "strawberry",
            Self::Pineapple => "pineapple",
        }
    }

    /// Uniform draw from the first `set_size` kinds.
    pub fn random<R: Rng + ?Sized>(rng: &mut R, set_size: usize) -> Self {
        let n = set_size.clamp(1, Self::ALL.len());
        Self::ALL[rng.random_range(0..n)]
    }
}

/// Number of symbol kinds in play for `level`: `min(4 + level / 6, 8)`.
pub fn symbol_set_size(level: u32) -> usize {
    let extra = (level / LEVELS_PER_EXTRA_SYMBOL) as usize;
    (BASE_SYMBOL_COUNT + extra).min(Symbol::ALL.len())
}

/// A board cell. `Empty` only exists between removal and refill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Symbol(Symbol),
}

impl Cell {
    #[inline]
    pub fn symbol(self) -> Option<Symbol> {
        match self {
            Self::Symbol(s) => Some(s),
            Self::Empty => None,
        }
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// Board coordinate; row 0 is the top row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    pub fn in_bounds(self) -> bool {
        self.row < BOARD_SIZE && self.col < BOARD_SIZE
    }

    /// True if the two positions share an edge (Manhattan distance 1).
    pub fn is_adjacent(self, other: Self) -> bool {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col) == 1
    }

    /// Step by (dr, dc), staying on the board.
    pub fn offset(self, dr: isize, dc: isize) -> Self {
        let clamp = |v: usize, d: isize| {
            v.saturating_add_signed(d).min(BOARD_SIZE - 1)
        };
        Self {
            row: clamp(self.row, dr),
            col: clamp(self.col, dc),
        }
    }
}

/// 8x8 grid, row-major. `cells[row][col]`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Grid {
    cells: [[Cell; BOARD_SIZE]; BOARD_SIZE],
}

impl Grid {
    /// All-empty grid.
    pub fn empty() -> Self {
        Self::default()
    }

    #[inline]
    pub fn get(&self, pos: Position) -> Cell {
        self.cells[pos.row][pos.col]
    }

    #[inline]
    pub fn set(&mut self, pos: Position, cell: Cell) {
        self.cells[pos.row][pos.col] = cell;
    }

    /// Exchange two cells in place.
    pub fn swap(&mut self, a: Position, b: Position) {
        let tmp = self.get(a);
        self.set(a, self.get(b));
        self.set(b, tmp);
    }

    pub fn rows(&self) -> &[[Cell; BOARD_SIZE]; BOARD_SIZE] {
        &self.cells
    }

    /// Every position, row-major.
    pub fn positions() -> impl Iterator<Item = Position> {
        (0..BOARD_SIZE).flat_map(|r| (0..BOARD_SIZE).map(move |c| Position::new(r, c)))
    }

    pub fn is_full(&self) -> bool {
        Self::positions().all(|p| !self.get(p).is_empty())
    }

    /// Positions whose cell differs from `other`.
    pub fn diff(&self, other: &Self) -> Vec<Position> {
        Self::positions()
            .filter(|&p| self.get(p) != other.get(p))
            .collect()
    }
}

/// Fill a fresh grid row by row. A candidate is redrawn while it would complete a triple
/// with its two left neighbours or its two upper neighbours, so the result has no
/// pre-existing run of three. This does not promise that a legal move exists.
pub fn generate<R: Rng + ?Sized>(set_size: usize, rng: &mut R) -> Grid {
    // Two forbidden neighbours leave a valid choice as long as three kinds are in play.
    let set_size = set_size.clamp(3, Symbol::ALL.len());
    let mut grid = Grid::empty();
    for r in 0..BOARD_SIZE {
        for c in 0..BOARD_SIZE {
            let sym = loop {
                let candidate = Symbol::random(rng, set_size);
                let completes_row = c >= 2
                    && grid.cells[r][c - 1] == Cell::Symbol(candidate)
                    && grid.cells[r][c - 2] == Cell::Symbol(candidate);
                let completes_col = r >= 2
                    && grid.cells[r - 1][c] == Cell::Symbol(candidate)
                    && grid.cells[r - 2][c] == Cell::Symbol(candidate);
                if !completes_row && !completes_col {
                    break candidate;
                }
            };
            grid.cells[r][c] = Cell::Symbol(sym);
        }
    }
    grid
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    /// Parse a compact board: one string per row, `A`..`H` for symbols, `.` for empty.
    pub(crate) fn grid_from_strs(rows: [&str; BOARD_SIZE]) -> Grid {
        let mut grid = Grid::empty();
        for (r, line) in rows.iter().enumerate() {
            for (c, ch) in line.chars().take(BOARD_SIZE).enumerate() {
                let cell = match ch {
                    'A'..='H' => Cell::Symbol(Symbol::ALL[(ch as u8 - b'A') as usize]),
                    _ => Cell::Empty,
                };
                grid.set(Position::new(r, c), cell);
            }
        }
        grid
    }

    fn has_triple(grid: &Grid) -> bool {
        for r in 0..BOARD_SIZE {
            for c in 0..BOARD_SIZE {
                let here = grid.get(Position::new(r, c));
                if here.is_empty() {
                    continue;
                }
                if c + 2 < BOARD_SIZE
                    && grid.get(Position::new(r, c + 1)) == here
                    && grid.get(Position::new(r, c + 2)) == here
                {
                    return true;
                }
                if r + 2 < BOARD_SIZE
                    && grid.get(Position::new(r + 1, c)) == here
                    && grid.get(Position::new(r + 2, c)) == here
                {
                    return true;
                }
            }
        }
        false
    }

    #[test]
    fn generated_boards_have_no_triples() {
        for seed in 0..200u64 {
            let mut rng = SmallRng::seed_from_u64(seed);
            for set_size in 4..=8 {
                let grid = generate(set_size, &mut rng);
                assert!(grid.is_full());
                assert!(!has_triple(&grid), "seed {seed} size {set_size}:\n{grid:?}");
            }
        }
    }

    #[test]
    fn generated_boards_only_use_active_symbols() {
        let mut rng = SmallRng::seed_from_u64(7);
        let grid = generate(4, &mut rng);
        for p in Grid::positions() {
            let sym = grid.get(p).symbol().unwrap();
            assert!(sym.index() < 4, "{sym:?} outside the 4-symbol set");
        }
    }

    #[test]
    fn symbol_set_grows_every_six_levels_and_caps_at_eight() {
        assert_eq!(symbol_set_size(1), 4);
        assert_eq!(symbol_set_size(5), 4);
        assert_eq!(symbol_set_size(6), 5);
        assert_eq!(symbol_set_size(12), 6);
        assert_eq!(symbol_set_size(24), 8);
        assert_eq!(symbol_set_size(500), 8);
    }

    #[test]
    fn adjacency_is_orthogonal_distance_one() {
        let p = Position::new(3, 3);
        assert!(p.is_adjacent(Position::new(2, 3)));
        assert!(p.is_adjacent(Position::new(3, 4)));
        assert!(!p.is_adjacent(Position::new(4, 4)));
        assert!(!p.is_adjacent(p));
        assert!(!p.is_adjacent(Position::new(3, 5)));
    }

    #[test]
    fn offset_stays_on_board() {
        assert_eq!(Position::new(0, 0).offset(-1, -1), Position::new(0, 0));
        assert_eq!(Position::new(7, 7).offset(1, 1), Position::new(7, 7));
        assert_eq!(Position::new(3, 3).offset(1, -1), Position::new(4, 2));
    }

    #[test]
    fn diff_lists_changed_cells() {
        let a = grid_from_strs([
            "ABABABAB", "BABABABA", "ABABABAB", "BABABABA", "ABABABAB", "BABABABA",
            "ABABABAB", "BABABABA",
        ]);
        let mut b = a.clone();
        b.swap(Position::new(0, 0), Position::new(0, 1));
        assert_eq!(a.diff(&b), vec![Position::new(0, 0), Position::new(0, 1)]);
    }
}
