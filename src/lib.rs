use std::{
    fmt::{Display, Write},
    ops::Index,
    str::FromStr,
};

use itertools::Itertools;
use smallvec::SmallVec;
use thiserror::Error;

pub mod search;

pub use search::{solve, solve_with, Node, SearchConfig, SearchError, Solution, Stats};

pub const SIDE: usize = 4;
pub const CELLS: usize = SIDE * SIDE;

const BLANK: u8 = 0;

fn row(cell: usize) -> usize {
    cell / SIDE
}

fn col(cell: usize) -> usize {
    cell % SIDE
}

/// A 4x4 board in row-major order. Tile `0` is the blank, and the goal
/// has tile `i` in cell `i`.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub struct Board {
    cells: [u8; CELLS],
}

#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Move generation order. When several optimal solutions exist, the
    /// first one found in this order is returned.
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (-1, 0),
            Direction::Down => (1, 0),
            Direction::Left => (0, -1),
            Direction::Right => (0, 1),
        }
    }

    pub fn step_from(self, cell: usize) -> Option<usize> {
        let (dr, dc) = self.delta();
        let r = row(cell) as i32 + dr;
        let c = col(cell) as i32 + dc;
        let on_board = 0..SIDE as i32;
        if on_board.contains(&r) && on_board.contains(&c) {
            Some(r as usize * SIDE + c as usize)
        } else {
            None
        }
    }
}

/// Outcome of [`Board::slide`].
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum Slide {
    /// The blank moved. `came_from` is the blank's old cell, which becomes
    /// the reversal marker of the new board.
    Moved { board: Board, came_from: usize },
    /// The target was the cell the blank just left; the board is unchanged.
    Reversal(Board),
}

impl Slide {
    pub fn board(&self) -> &Board {
        match self {
            Slide::Moved { board, .. } | Slide::Reversal(board) => board,
        }
    }
}

impl Board {
    /// Builds a board without checking that `cells` is a permutation of `0..16`.
    /// Use `Board::try_from` for untrusted input.
    pub fn new(cells: [u8; CELLS]) -> Board {
        Board { cells }
    }

    pub fn goal() -> Board {
        let mut cells = [BLANK; CELLS];
        for (ix, c) in cells.iter_mut().enumerate() {
            *c = ix as u8;
        }

        Board { cells }
    }

    pub fn cells(&self) -> &[u8; CELLS] {
        &self.cells
    }

    pub fn blank(&self) -> usize {
        // a well-formed board has exactly one blank
        self.cells.iter().position(|&c| c == BLANK).unwrap_or(0)
    }

    pub fn is_goal(&self) -> bool {
        self.cells.iter().enumerate().all(|(ix, &c)| c as usize == ix)
    }

    /// Cells the blank can move to, one slot per entry of [`Direction::ALL`].
    /// Moves that would leave the board are `None`.
    pub fn moves(&self) -> [Option<usize>; 4] {
        let blank = self.blank();
        Direction::ALL.map(|d| d.step_from(blank))
    }

    /// Zero exactly when the board is the goal.
    pub fn manhattan(&self) -> u32 {
        self.cells
            .iter()
            .enumerate()
            .map(|(cell, &tile)| tile_distance(tile, cell))
            .sum()
    }

    /// Moves the blank to `target`, unless `target` is where the blank
    /// came from on the previous move.
    ///
    /// `target` must be adjacent to the blank, as returned by [`Board::moves`].
    pub fn slide(&self, target: usize, came_from: Option<usize>) -> Slide {
        if came_from == Some(target) {
            return Slide::Reversal(*self);
        }

        let blank = self.blank();
        let mut board = *self;
        board.cells[blank] = self.cells[target];
        board.cells[target] = BLANK;

        Slide::Moved {
            board,
            came_from: blank,
        }
    }

    pub fn neighbours(&self) -> SmallVec<[Board; 4]> {
        self.moves()
            .into_iter()
            .flatten()
            .map(|target| *self.slide(target, None).board())
            .collect()
    }

    /// Walks the blank along `directions`, skipping steps that would leave the board.
    pub fn walk(&self, directions: impl IntoIterator<Item = Direction>) -> Board {
        directions.into_iter().fold(*self, |board, d| {
            match d.step_from(board.blank()) {
                Some(target) => *board.slide(target, None).board(),
                None => board,
            }
        })
    }
}

fn tile_distance(tile: u8, cell: usize) -> u32 {
    if tile == BLANK {
        return 0;
    }

    let goal = tile as usize;
    (row(cell).abs_diff(row(goal)) + col(cell).abs_diff(col(goal))) as u32
}

impl Display for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for r in 0..SIDE {
            if !first {
                f.write_char('\n')?;
            } else {
                first = false;
            }

            for c in 0..SIDE {
                write!(f, "{:3}", self[(r, c)])?;
            }
        }

        Ok(())
    }
}

impl Index<(usize, usize)> for Board {
    type Output = u8;
    fn index(&self, index: (usize, usize)) -> &Self::Output {
        &self.cells[index.0 * SIDE + index.1]
    }
}

#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ParseBoardError {
    #[error("`{0}` is not a tile number")]
    InvalidTile(String),
    #[error("tile {0} is out of range, tiles are 0 to 15")]
    TileOutOfRange(u32),
    #[error("tile {0} appears more than once")]
    DuplicateTile(u8),
    #[error("expected 16 tiles per board, found {0}")]
    WrongTileCount(usize),
}

impl TryFrom<[u8; CELLS]> for Board {
    type Error = ParseBoardError;

    fn try_from(cells: [u8; CELLS]) -> Result<Self, Self::Error> {
        if let Some(&tile) = cells.iter().find(|&&t| t as usize >= CELLS) {
            return Err(ParseBoardError::TileOutOfRange(tile as u32));
        }

        if let Some(&tile) = cells.iter().duplicates().next() {
            return Err(ParseBoardError::DuplicateTile(tile));
        }

        Ok(Board::new(cells))
    }
}

impl FromStr for Board {
    type Err = ParseBoardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_board(s)
    }
}

// whitespace-separated numbers; anything after a `#` is a comment
fn tokens(text: &str) -> impl Iterator<Item = &str> {
    text.lines()
        .flat_map(|line| line.split('#').next().unwrap_or("").split_whitespace())
}

fn parse_tile(token: &str) -> Result<u8, ParseBoardError> {
    let value: u32 = token
        .parse()
        .map_err(|_| ParseBoardError::InvalidTile(token.to_owned()))?;

    u8::try_from(value)
        .ok()
        .filter(|&t| (t as usize) < CELLS)
        .ok_or(ParseBoardError::TileOutOfRange(value))
}

fn board_from_tiles(tiles: &[u8]) -> Result<Board, ParseBoardError> {
    let cells: [u8; CELLS] = tiles
        .try_into()
        .map_err(|_| ParseBoardError::WrongTileCount(tiles.len()))?;

    Board::try_from(cells)
}

pub fn parse_board(text: &str) -> Result<Board, ParseBoardError> {
    let tiles = tokens(text)
        .map(parse_tile)
        .collect::<Result<Vec<_>, _>>()?;
    board_from_tiles(&tiles)
}

/// Parses any number of boards, 16 tiles each, back to back.
pub fn parse_boards(text: &str) -> Result<Vec<Board>, ParseBoardError> {
    let tiles = tokens(text)
        .map(parse_tile)
        .collect::<Result<Vec<_>, _>>()?;
    tiles.chunks(CELLS).map(board_from_tiles).collect()
}
