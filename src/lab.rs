use std::{
    fmt::Display,
    ops::{Deref, Range},
};

use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Right,
    Down,
    Left,
}

impl Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Up => write!(f, "^"),
            Direction::Right => write!(f, ">"),
            Direction::Down => write!(f, "v"),
            Direction::Left => write!(f, "<"),
        }
    }
}

/// Next direction clockwise, Up -> Right -> Down -> Left -> Up.
pub fn turn_right(dir: Direction) -> Direction {
    match dir {
        Direction::Up => Direction::Right,
        Direction::Right => Direction::Down,
        Direction::Down => Direction::Left,
        Direction::Left => Direction::Up,
    }
}

/// One unit ahead of `pos` facing `dir`.
///
/// Returns `None` when the step would leave the non-negative quadrant (row or
/// column below zero), which is always outside any laboratory.
pub fn step(dir: Direction, pos: &Position) -> Option<Position> {
    match dir {
        Direction::Up if pos.r > 0 => Some(Position::new(pos.r - 1, pos.c)),
        Direction::Right => Some(Position::new(pos.r, pos.c + 1)),
        Direction::Down => Some(Position::new(pos.r + 1, pos.c)),
        Direction::Left if pos.c > 0 => Some(Position::new(pos.r, pos.c - 1)),
        _ => None,
    }
}

// Field order gives row-major ordering for the derived Ord.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub r: usize,
    pub c: usize,
}

impl Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.r, self.c)
    }
}

impl Position {
    pub fn new(r: usize, c: usize) -> Self {
        Self { r, c }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tile {
    Open,
    Blocked,
    Start,
}

impl Tile {
    pub fn from_char(c: char) -> Result<Self, Error> {
        match c {
            '.' => Ok(Tile::Open),
            '#' => Ok(Tile::Blocked),
            '^' => Ok(Tile::Start),
            other => Err(Error::InvalidChar(other)),
        }
    }

    pub fn to_char(self) -> char {
        match self {
            Tile::Open => '.',
            Tile::Blocked => '#',
            Tile::Start => '^',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Laboratory {
    tiles: Vec<Tile>,
    row_n: usize,
    col_n: usize,
}

impl Display for Laboratory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for r in 0..self.row_n {
            for tile in &self.tiles[self.row_range(r)] {
                write!(f, "{}", tile.to_char())?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}

impl Laboratory {
    pub fn row_n(&self) -> usize {
        self.row_n
    }

    pub fn col_n(&self) -> usize {
        self.col_n
    }

    pub fn is_out_of_bounds(&self, pos: &Position) -> bool {
        pos.r >= self.row_n || pos.c >= self.col_n
    }

    pub fn tile(&self, pos: &Position) -> Result<Tile, Error> {
        self.index(pos).map(|ind| self.tiles[ind])
    }

    /// First start tile in row-major order.
    pub fn locate_start(&self) -> Result<Position, Error> {
        self.tiles
            .iter()
            .position(|t| *t == Tile::Start)
            .map(|ind| Position::new(ind / self.col_n, ind % self.col_n))
            .ok_or(Error::NoGuard)
    }

    /// Marks the tile at `pos` as blocked, whatever it was before.
    pub fn place_obstacle(&mut self, pos: &Position) -> Result<(), Error> {
        self.set_tile(pos, Tile::Blocked).map(|_| ())
    }

    /// Marks the tile at `pos` as open, whatever it was before.
    pub fn clear_obstacle(&mut self, pos: &Position) -> Result<(), Error> {
        self.set_tile(pos, Tile::Open).map(|_| ())
    }

    /// Blocks `pos` until the returned guard is dropped, then puts back the
    /// tile that was there.
    pub fn place_temp_obstacle(&mut self, pos: &Position) -> Result<TempObstacle<'_>, Error> {
        let prev = self.set_tile(pos, Tile::Blocked)?;
        Ok(TempObstacle {
            lab: self,
            pos: *pos,
            prev,
        })
    }

    fn set_tile(&mut self, pos: &Position, tile: Tile) -> Result<Tile, Error> {
        let ind = self.index(pos)?;
        Ok(std::mem::replace(&mut self.tiles[ind], tile))
    }

    fn index(&self, pos: &Position) -> Result<usize, Error> {
        if self.is_out_of_bounds(pos) {
            Err(Error::OutOfRange(*pos, self.row_n, self.col_n))
        } else {
            Ok(pos.r * self.col_n + pos.c)
        }
    }

    fn row_range(&self, r: usize) -> Range<usize> {
        (r * self.col_n)..((r + 1) * self.col_n)
    }
}

pub struct TempObstacle<'a> {
    lab: &'a mut Laboratory,
    pos: Position,
    prev: Tile,
}

impl TempObstacle<'_> {
    pub fn pos(&self) -> &Position {
        &self.pos
    }
}

impl Deref for TempObstacle<'_> {
    type Target = Laboratory;

    fn deref(&self) -> &Self::Target {
        &*self.lab
    }
}

impl Drop for TempObstacle<'_> {
    fn drop(&mut self) {
        // pos was validated when the obstacle was placed.
        let ind = self.pos.r * self.lab.col_n + self.pos.c;
        self.lab.tiles[ind] = self.prev;
    }
}

pub struct LaboratoryBuilder {
    tiles: Vec<Tile>,
    row_n: usize,
    col_n: Option<usize>,
    start: Option<Position>,
}

impl Default for LaboratoryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LaboratoryBuilder {
    pub fn new() -> Self {
        Self {
            tiles: Vec::new(),
            row_n: 0,
            col_n: None,
            start: None,
        }
    }

    pub fn add_row(&mut self, row_text: &str) -> Result<(), Error> {
        let row_text = row_text.strip_suffix('\r').unwrap_or(row_text);
        let this_col_n = row_text.chars().count();
        let col_n = *self.col_n.get_or_insert(this_col_n);
        if col_n != this_col_n {
            return Err(Error::InconsistentRow(col_n, this_col_n));
        }

        for (ind, c) in row_text.chars().enumerate() {
            let tile = Tile::from_char(c)?;
            if tile == Tile::Start {
                let pos = Position::new(self.row_n, ind);
                if let Some(prev) = self.start {
                    return Err(Error::MultipleGuards(prev, pos));
                }

                self.start = Some(pos);
            }
            self.tiles.push(tile);
        }
        self.row_n += 1;

        Ok(())
    }

    pub fn build(self) -> Result<Laboratory, Error> {
        if self.start.is_none() {
            return Err(Error::NoGuard);
        }

        Ok(Laboratory {
            tiles: self.tiles,
            row_n: self.row_n,
            col_n: self.col_n.unwrap_or(0),
        })
    }
}
