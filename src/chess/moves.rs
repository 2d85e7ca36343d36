use super::error::MalformedGame;

use pgn_reader::{Nag, RawComment, Reader, SanPlus, Skip, Visitor};
use shakmaty::{Chess, Color, Position, Role, Square};
use smallvec::SmallVec;
use std::io;
use std::ops::ControlFlow;
use std::sync::LazyLock;

static CLOCK_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"\[%clk\s+(\d+):(\d{1,2}):(\d{1,2})(?:\.\d+)?\s*\]").expect("valid clock regex")
});

/// One ply of the mainline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveEvent {
    /// 0-based; White's first move is ply 0.
    pub ply: u32,
    /// Destination square. For castling, the king's destination.
    pub square: Square,
    /// Kind of the piece that moved. A promotion reports `Role::Pawn`.
    pub role: Role,
    pub promotion: bool,
    /// Mover's remaining clock right after the ply, in seconds.
    pub clock: u32,
}

impl MoveEvent {
    pub fn mover(&self) -> Color {
        if self.ply.is_multiple_of(2) {
            Color::White
        } else {
            Color::Black
        }
    }
}

pub type MoveList = SmallVec<[MoveEvent; 128]>;

type AnnotatedSans = SmallVec<[(SanPlus, Option<u32>); 128]>;

/// Seconds of the first `[%clk H:MM:SS]` annotation in a comment.
pub fn parse_clock(comment: &str) -> Option<u32> {
    let caps = CLOCK_RE.captures(comment)?;
    let field = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());
    let (h, m, s) = (field(1)?, field(2)?, field(3)?);
    h.checked_mul(3600)?.checked_add(m * 60 + s)
}

/// Collects mainline SANs, each paired with the clock of the comment that
/// follows it.
#[derive(Default)]
struct ClockVisitor {
    sans: AnnotatedSans,
}

impl Visitor for ClockVisitor {
    type Tags = ();
    type Movetext = ();
    type Output = ();

    fn begin_tags(&mut self) -> ControlFlow<Self::Output, Self::Tags> {
        self.sans.clear();
        ControlFlow::Continue(())
    }

    fn begin_movetext(&mut self, _tags: Self::Tags) -> ControlFlow<Self::Output, Self::Movetext> {
        ControlFlow::Continue(())
    }

    fn san(
        &mut self,
        _movetext: &mut Self::Movetext,
        san_plus: SanPlus,
    ) -> ControlFlow<Self::Output> {
        self.sans.push((san_plus, None));
        ControlFlow::Continue(())
    }

    fn nag(&mut self, _movetext: &mut Self::Movetext, _nag: Nag) -> ControlFlow<Self::Output> {
        ControlFlow::Continue(())
    }

    fn comment(
        &mut self,
        _movetext: &mut Self::Movetext,
        comment: RawComment<'_>,
    ) -> ControlFlow<Self::Output> {
        if let Some((_, slot @ None)) = self.sans.last_mut() {
            *slot = parse_clock(&String::from_utf8_lossy(comment.as_bytes()));
        }
        ControlFlow::Continue(())
    }

    fn begin_variation(
        &mut self,
        _movetext: &mut Self::Movetext,
    ) -> ControlFlow<Self::Output, Skip> {
        ControlFlow::Continue(Skip(true))
    }

    fn end_game(&mut self, _movetext: Self::Movetext) -> Self::Output {}
}

/// Decodes the mainline of `movetext` into one event per ply.
///
/// Every ply must carry a clock annotation; the moves are replayed from the
/// standard starting position, so an illegal move also fails the game.
pub fn decode_moves(movetext: &str) -> Result<MoveList, MalformedGame> {
    if movetext.trim().is_empty() {
        return Ok(MoveList::new());
    }

    let mut reader = Reader::new(io::Cursor::new(movetext.as_bytes()));
    let mut visitor = ClockVisitor::default();
    reader
        .read_game(&mut visitor)
        .map_err(|e| MalformedGame::Unreadable(e.to_string()))?;

    let mut pos = Chess::default();
    let mut events = MoveList::new();

    for (ply, (san_plus, clock)) in (0u32..).zip(visitor.sans) {
        let m = san_plus
            .san
            .to_move(&pos)
            .map_err(|_| MalformedGame::IllegalMove {
                ply,
                san: san_plus.to_string(),
            })?;
        let clock = clock.ok_or(MalformedGame::MissingClock { ply })?;

        let square = match m.castling_side() {
            Some(side) => side.king_to(pos.turn()),
            None => m.to(),
        };

        events.push(MoveEvent {
            ply,
            square,
            role: m.role(),
            promotion: m.is_promotion(),
            clock,
        });

        pos.play_unchecked(m);
    }

    Ok(events)
}
