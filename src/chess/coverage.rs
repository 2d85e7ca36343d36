use shakmaty::{Bitboard, File, Rank, Role, Square};
use std::fmt;

pub const TOTAL_SQUARES: usize = 64 * Role::ALL.len();
pub const PROMOTION_SQUARES: usize = 16;

fn slot(role: Role) -> usize {
    match role {
        Role::Pawn => 0,
        Role::Knight => 1,
        Role::Bishop => 2,
        Role::Rook => 3,
        Role::Queen => 4,
        Role::King => 5,
    }
}

/// Squares ever reached, one board per piece kind.
///
/// Squares are absolute (A1 = 0); a square only ever goes from unreached to
/// reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoverageGrid {
    boards: [Bitboard; 6],
}

impl Default for CoverageGrid {
    fn default() -> Self {
        Self {
            boards: [Bitboard::EMPTY; 6],
        }
    }
}

impl CoverageGrid {
    pub fn board(&self, role: Role) -> Bitboard {
        self.boards[slot(role)]
    }

    pub fn contains(&self, role: Role, square: Square) -> bool {
        self.boards[slot(role)].contains(square)
    }

    fn mark(&mut self, role: Role, square: Square) -> bool {
        let board = &mut self.boards[slot(role)];
        if board.contains(square) {
            return false;
        }
        board.add(square);
        true
    }

    /// Squares covered over all six piece kinds, `0..=384`.
    pub fn total(&self) -> usize {
        self.boards.iter().map(|b| b.count()).sum()
    }

    /// Pawn squares reached on ranks 1 and 8, `0..=16`.
    pub fn promotion_squares(&self) -> usize {
        (self.board(Role::Pawn) & Bitboard::BACKRANKS).count()
    }

    /// 8x8 diagram of one piece kind, rank 8 first.
    pub fn diagram(&self, role: Role) -> String {
        let board = self.board(role);
        let letter = role.upper_char();
        let mut out = String::with_capacity(8 * 16);

        for rank in Rank::ALL.into_iter().rev() {
            let row: Vec<String> = File::ALL
                .into_iter()
                .map(|file| {
                    if board.contains(Square::from_coords(file, rank)) {
                        letter.to_string()
                    } else {
                        ".".to_string()
                    }
                })
                .collect();
            out.push_str(&row.join(" "));
            out.push('\n');
        }

        out
    }
}

impl fmt::Display for CoverageGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, role) in Role::ALL.into_iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", self.diagram(role))?;
        }
        Ok(())
    }
}

/// First-touch tracker over a [`CoverageGrid`].
///
/// Also remembers which squares the game currently being folded added, for
/// the highlight overlay of the rendering side.
#[derive(Debug, Clone, Default)]
pub struct CoverageTracker {
    grid: CoverageGrid,
    touched: Vec<(Role, Square)>,
}

impl CoverageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets the newly touched list; the grid is kept.
    pub fn begin_game(&mut self) {
        self.touched.clear();
    }

    /// Marks `square` for `role`; `true` iff it was not reached before.
    pub fn record_if_new(&mut self, role: Role, square: Square) -> bool {
        let new = self.grid.mark(role, square);
        if new {
            self.touched.push((role, square));
        }
        new
    }

    pub fn newly_touched(&self) -> &[(Role, Square)] {
        &self.touched
    }

    pub fn grid(&self) -> &CoverageGrid {
        &self.grid
    }
}
