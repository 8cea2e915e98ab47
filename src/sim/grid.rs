//! Board index, match scanning and gravity
//!
//! The grid maps signed coordinates (centered on the origin) to tokens.
//! Every token the session ever created lives here; tokens that are being
//! cleared or waiting in the refill pool are simply not in the index.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::sprite::{EntityId, Rgb};
use crate::config::EngineConfig;
use crate::error::GridError;

/// Board coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coord {
    pub x: i32,
    pub y: i32,
}

impl Coord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Orthogonal neighbours only: exactly one axis differs, by exactly one
    pub fn is_adjacent(self, other: Coord) -> bool {
        (self.x - other.x).abs() + (self.y - other.y).abs() == 1
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Seed type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TokenKind {
    Green,
    Red,
    Yellow,
    Blue,
    White,
    /// Turned by the monster; not a color
    Corrupted,
}

impl TokenKind {
    /// Kinds that refills draw from
    pub const COLORS: [TokenKind; 5] = [
        TokenKind::Green,
        TokenKind::Red,
        TokenKind::Yellow,
        TokenKind::Blue,
        TokenKind::White,
    ];

    /// Tint used for the token sprite and its particles
    pub fn tint(self) -> Rgb {
        match self {
            TokenKind::Green => Rgb(128, 255, 128),
            TokenKind::Red => Rgb(255, 128, 128),
            TokenKind::Yellow => Rgb(255, 255, 128),
            TokenKind::Blue => Rgb(128, 128, 255),
            TokenKind::White => Rgb(255, 128, 255),
            TokenKind::Corrupted => Rgb(96, 32, 128),
        }
    }

    pub fn is_color(self) -> bool {
        self != TokenKind::Corrupted
    }
}

/// Stable token handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TokenId(pub u32);

/// A seed and the sprite that shows it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub id: TokenId,
    pub kind: TokenKind,
    /// `None` while unplaced (in flight or waiting for refill)
    pub coord: Option<Coord>,
    pub entity: EntityId,
}

impl Token {
    pub fn is_free(&self) -> bool {
        self.coord.is_none()
    }
}

/// Result of a board query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    /// Past the board edge
    OutOfBounds,
    /// On the board, no token
    Empty,
    Occupied(TokenId),
}

/// Run direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    /// Along a column, toward +y
    Up,
    /// Along a row, toward +x
    Right,
}

impl Axis {
    fn step(self) -> (i32, i32) {
        match self {
            Axis::Up => (0, 1),
            Axis::Right => (1, 0),
        }
    }
}

/// One qualifying run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub kind: TokenKind,
    pub axis: Axis,
    pub cells: Vec<Coord>,
    pub score: u64,
}

/// Token selected for clearing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Matched {
    pub id: TokenId,
    pub coord: Coord,
    pub kind: TokenKind,
}

/// Everything one scan found.
///
/// Score is accumulated per run, so a token where a row and a column run
/// cross scores for both; it still appears only once in `members`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchSet {
    pub runs: Vec<Run>,
    /// Unique matched tokens in discovery order
    pub members: Vec<Matched>,
    pub score: u64,
}

impl MatchSet {
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn contains(&self, id: TokenId) -> bool {
        self.members.iter().any(|m| m.id == id)
    }

    /// Matched coordinates, sorted
    pub fn coords(&self) -> Vec<Coord> {
        let mut coords: Vec<Coord> = self.members.iter().map(|m| m.coord).collect();
        coords.sort();
        coords
    }

    /// Matched token count per kind
    pub fn counts(&self) -> BTreeMap<TokenKind, u32> {
        let mut counts = BTreeMap::new();
        for m in &self.members {
            *counts.entry(m.kind).or_insert(0) += 1;
        }
        counts
    }
}

/// A token moved down by gravity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fall {
    pub id: TokenId,
    pub from: Coord,
    pub to: Coord,
}

/// Serializable coordinate → kind view of the board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSnapshot {
    pub half_extent: i32,
    pub cells: Vec<(Coord, TokenKind)>,
}

/// The board
#[derive(Debug, Clone)]
pub struct Grid {
    half_extent: i32,
    index: BTreeMap<Coord, TokenId>,
    /// All tokens, indexed by `TokenId`
    tokens: Vec<Token>,
}

impl Grid {
    pub fn new(half_extent: i32) -> Self {
        Self {
            half_extent,
            index: BTreeMap::new(),
            tokens: Vec::new(),
        }
    }

    pub fn half_extent(&self) -> i32 {
        self.half_extent
    }

    /// Cells per side
    pub fn side(&self) -> usize {
        (self.half_extent * 2 + 1) as usize
    }

    pub fn in_bounds(&self, c: Coord) -> bool {
        c.x.abs() <= self.half_extent && c.y.abs() <= self.half_extent
    }

    /// Every board coordinate, column by column, bottom to top
    pub fn coords(&self) -> impl Iterator<Item = Coord> + use<> {
        let h = self.half_extent;
        (-h..=h).flat_map(move |x| (-h..=h).map(move |y| Coord::new(x, y)))
    }

    /// Create an unplaced token
    pub fn add_token(&mut self, kind: TokenKind, entity: EntityId) -> TokenId {
        let id = TokenId(self.tokens.len() as u32);
        self.tokens.push(Token {
            id,
            kind,
            coord: None,
            entity,
        });
        id
    }

    pub fn token(&self, id: TokenId) -> Option<&Token> {
        self.tokens.get(id.0 as usize)
    }

    /// All tokens, placed or not
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Number of placed tokens
    pub fn placed(&self) -> usize {
        self.index.len()
    }

    pub fn is_full(&self) -> bool {
        self.index.len() == self.side() * self.side()
    }

    pub fn query(&self, c: Coord) -> Cell {
        if !self.in_bounds(c) {
            return Cell::OutOfBounds;
        }
        match self.index.get(&c) {
            Some(&id) => Cell::Occupied(id),
            None => Cell::Empty,
        }
    }

    /// Token at a coordinate
    pub fn get(&self, c: Coord) -> Result<&Token, GridError> {
        match self.query(c) {
            Cell::OutOfBounds => Err(GridError::OutOfBounds(c)),
            Cell::Empty => Err(GridError::CellMissing(c)),
            Cell::Occupied(id) => Ok(&self.tokens[id.0 as usize]),
        }
    }

    pub fn kind_at(&self, c: Coord) -> Option<TokenKind> {
        self.get(c).ok().map(|t| t.kind)
    }

    /// Put a token on an empty cell, lifting it from its old cell first
    pub fn place(&mut self, id: TokenId, c: Coord) -> Result<(), GridError> {
        if self.token(id).is_none() {
            return Err(GridError::UnknownToken(id));
        }
        match self.query(c) {
            Cell::OutOfBounds => return Err(GridError::OutOfBounds(c)),
            Cell::Occupied(other) if other != id => return Err(GridError::CellOccupied(c)),
            _ => {}
        }
        self.free(id);
        let Some(token) = self.tokens.get_mut(id.0 as usize) else {
            return Err(GridError::UnknownToken(id));
        };
        token.coord = Some(c);
        self.index.insert(c, id);
        Ok(())
    }

    /// Lift a token off the board. It keeps its sprite.
    pub fn free(&mut self, id: TokenId) {
        let Some(token) = self.tokens.get_mut(id.0 as usize) else {
            return;
        };
        if let Some(c) = token.coord.take() {
            self.index.remove(&c);
        }
    }

    /// Change a token's kind in place
    pub fn set_kind(&mut self, id: TokenId, kind: TokenKind) {
        if let Some(token) = self.tokens.get_mut(id.0 as usize) {
            token.kind = kind;
        }
    }

    /// Swap two orthogonally adjacent tokens.
    ///
    /// Leaves the board untouched on any error.
    pub fn swap(&mut self, a: Coord, b: Coord) -> Result<(TokenId, TokenId), GridError> {
        let first = self.get(a)?.id;
        let second = self.get(b)?.id;
        if !a.is_adjacent(b) {
            return Err(GridError::InvalidSwap { from: a, to: b });
        }
        self.index.insert(a, second);
        self.index.insert(b, first);
        self.tokens[first.0 as usize].coord = Some(b);
        self.tokens[second.0 as usize].coord = Some(a);
        Ok((first, second))
    }

    /// Find every qualifying run on the board.
    ///
    /// Runs are extended upward and rightward from each coordinate whose
    /// predecessor on that axis holds a different kind. The board edge ends a
    /// run; an empty in-bounds cell means tokens are still moving and the
    /// whole scan is abandoned with [`GridError::BoardUnsettled`].
    pub fn scan(&self, config: &EngineConfig) -> Result<MatchSet, GridError> {
        let mut set = MatchSet::default();

        for origin in self.coords() {
            let kind = self.settled_kind(origin)?;
            for axis in [Axis::Up, Axis::Right] {
                let (dx, dy) = axis.step();
                if let Cell::Occupied(prev) = self.query(origin.offset(-dx, -dy)) {
                    if self.tokens[prev.0 as usize].kind == kind {
                        continue;
                    }
                }

                let mut cells = vec![origin];
                loop {
                    let next = origin.offset(dx * cells.len() as i32, dy * cells.len() as i32);
                    match self.query(next) {
                        Cell::OutOfBounds => break,
                        Cell::Empty => return Err(GridError::BoardUnsettled(next)),
                        Cell::Occupied(id) if self.tokens[id.0 as usize].kind == kind => {
                            cells.push(next)
                        }
                        Cell::Occupied(_) => break,
                    }
                }

                if cells.len() < config.min_run {
                    continue;
                }
                let score = config.score_for_run(cells.len());
                set.score += score;
                for &c in &cells {
                    let id = self.index[&c];
                    if !set.contains(id) {
                        set.members.push(Matched { id, coord: c, kind });
                    }
                }
                set.runs.push(Run {
                    kind,
                    axis,
                    cells,
                    score,
                });
            }
        }

        Ok(set)
    }

    fn settled_kind(&self, c: Coord) -> Result<TokenKind, GridError> {
        match self.query(c) {
            Cell::Occupied(id) => Ok(self.tokens[id.0 as usize].kind),
            Cell::Empty => Err(GridError::BoardUnsettled(c)),
            Cell::OutOfBounds => Err(GridError::OutOfBounds(c)),
        }
    }

    /// Compact each column downward.
    ///
    /// A token's new row drops by the number of empty cells below it in its
    /// column. Returns the moves in column order, bottom to top.
    pub fn compact(&mut self) -> Vec<Fall> {
        let h = self.half_extent;
        let mut falls = Vec::new();
        for x in -h..=h {
            let mut gap = 0;
            for y in -h..=h {
                let from = Coord::new(x, y);
                match self.index.get(&from).copied() {
                    None => gap += 1,
                    Some(id) if gap > 0 => {
                        let to = Coord::new(x, y - gap);
                        self.index.remove(&from);
                        self.index.insert(to, id);
                        self.tokens[id.0 as usize].coord = Some(to);
                        falls.push(Fall { id, from, to });
                    }
                    Some(_) => {}
                }
            }
        }
        falls
    }

    /// Empty cells per column, bottom to top
    pub fn empty_cells(&self) -> Vec<Coord> {
        self.coords().filter(|c| !self.index.contains_key(c)).collect()
    }

    /// Coordinate → kind view of the board
    pub fn snapshot(&self) -> GridSnapshot {
        GridSnapshot {
            half_extent: self.half_extent,
            cells: self
                .index
                .iter()
                .map(|(&c, &id)| (c, self.tokens[id.0 as usize].kind))
                .collect(),
        }
    }

    /// Rebuild a board from a snapshot; `spawn` creates the sprite for each
    /// token.
    pub fn from_snapshot(
        snapshot: &GridSnapshot,
        mut spawn: impl FnMut(Coord, TokenKind) -> EntityId,
    ) -> Result<Self, GridError> {
        let mut grid = Grid::new(snapshot.half_extent);
        for &(c, kind) in &snapshot.cells {
            let id = grid.add_token(kind, spawn(c, kind));
            grid.place(id, c)?;
        }
        Ok(grid)
    }

    /// Every index entry points at a token that agrees on its coordinate,
    /// and every placed token is indexed
    pub fn is_consistent(&self) -> bool {
        let indexed = self
            .index
            .iter()
            .all(|(&c, &id)| self.tokens.get(id.0 as usize).and_then(|t| t.coord) == Some(c));
        let placed = self.tokens.iter().filter(|t| t.coord.is_some()).count();
        indexed && placed == self.index.len()
    }
}
