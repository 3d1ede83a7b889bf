use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;

use serde::{Serialize, Serializer};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub const BOTH: [Color; 2] = [Color::White, Color::Black];

    pub fn as_str(self) -> &'static str {
        match self {
            Color::White => "white",
            Color::Black => "black",
        }
    }
}

/// Move-quality classification assigned by the review engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Brilliant,
    Great,
    Book,
    Best,
    Excellent,
    Good,
    Inaccuracy,
    Mistake,
    Miss,
    Blunder,
}

impl Category {
    pub const ALL: [Category; 10] = [
        Category::Brilliant,
        Category::Great,
        Category::Book,
        Category::Best,
        Category::Excellent,
        Category::Good,
        Category::Inaccuracy,
        Category::Mistake,
        Category::Miss,
        Category::Blunder,
    ];

    /// Token used in the review page's `data-cy` tally attributes.
    pub fn token(self) -> &'static str {
        match self {
            Category::Brilliant => "Brilliant",
            Category::Great => "GreatFind",
            Category::Book => "Book",
            Category::Best => "BestMove",
            Category::Excellent => "Excellent",
            Category::Good => "Good",
            Category::Inaccuracy => "Inaccuracy",
            Category::Mistake => "Mistake",
            Category::Miss => "Miss",
            Category::Blunder => "Blunder",
        }
    }

    /// Column prefix in the `games` table and key in JSON output.
    pub fn column(self) -> &'static str {
        match self {
            Category::Brilliant => "brilliant",
            Category::Great => "great",
            Category::Book => "book",
            Category::Best => "best",
            Category::Excellent => "excellent",
            Category::Good => "good",
            Category::Inaccuracy => "inaccuracy",
            Category::Mistake => "mistake",
            Category::Miss => "miss",
            Category::Blunder => "blunder",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub white: u32,
    pub black: u32,
}

impl Tally {
    pub fn get(&self, color: Color) -> u32 {
        match color {
            Color::White => self.white,
            Color::Black => self.black,
        }
    }

    pub fn set(&mut self, color: Color, count: u32) {
        match color {
            Color::White => self.white = count,
            Color::Black => self.black = count,
        }
    }
}

/// One value per [`Category`], serialized as a map keyed by column name.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PerCategory<T>([T; 10]);

pub type Tallies = PerCategory<Tally>;

impl<T: Copy> PerCategory<T> {
    pub fn from_fn(f: impl FnMut(Category) -> T) -> Self {
        PerCategory(Category::ALL.map(f))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, T)> + '_ {
        Category::ALL.iter().map(move |&c| (c, self[c]))
    }
}

impl<T> Index<Category> for PerCategory<T> {
    type Output = T;

    fn index(&self, category: Category) -> &T {
        &self.0[category.index()]
    }
}

impl<T> IndexMut<Category> for PerCategory<T> {
    fn index_mut(&mut self, category: Category) -> &mut T {
        &mut self.0[category.index()]
    }
}

impl<T: Serialize> Serialize for PerCategory<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(Category::ALL.len()))?;
        for category in Category::ALL {
            map.serialize_entry(category.column(), &self[category])?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameResult {
    WhiteWins,
    BlackWins,
    Draw,
    Ongoing,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid game result {0:?} (expected 1-0, 0-1, 1/2-1/2 or *)")]
pub struct ParseResultError(pub String);

impl GameResult {
    pub fn as_str(self) -> &'static str {
        match self {
            GameResult::WhiteWins => "1-0",
            GameResult::BlackWins => "0-1",
            GameResult::Draw => "1/2-1/2",
            GameResult::Ongoing => "*",
        }
    }

    /// Lenient variant of `from_str`: trims, undoes JSON-escaped slashes and
    /// drops anything outside the closed set.
    pub fn normalize(raw: &str) -> Option<GameResult> {
        raw.trim().replace("\\/", "/").parse().ok()
    }

    pub fn winner(self) -> Option<Color> {
        match self {
            GameResult::WhiteWins => Some(Color::White),
            GameResult::BlackWins => Some(Color::Black),
            GameResult::Draw | GameResult::Ongoing => None,
        }
    }
}

impl FromStr for GameResult {
    type Err = ParseResultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1-0" => Ok(GameResult::WhiteWins),
            "0-1" => Ok(GameResult::BlackWins),
            "1/2-1/2" => Ok(GameResult::Draw),
            "*" => Ok(GameResult::Ongoing),
            other => Err(ParseResultError(other.to_string())),
        }
    }
}

impl fmt::Display for GameResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn serialize_result<S: Serializer>(
    result: &Option<GameResult>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(result.map(GameResult::as_str).unwrap_or(""))
}

/// One reviewed game, keyed by `game_id`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GameRecord {
    pub game_id: String,
    pub white_username: String,
    pub black_username: String,
    pub white_rating: u32,
    pub black_rating: u32,
    pub white_accuracy: f64,
    pub black_accuracy: f64,
    #[serde(serialize_with = "serialize_result")]
    pub result: Option<GameResult>,
    pub tallies: Tallies,
}

impl GameRecord {
    pub fn new(game_id: impl Into<String>) -> Self {
        GameRecord {
            game_id: game_id.into(),
            ..Default::default()
        }
    }

    pub fn username(&self, color: Color) -> &str {
        match color {
            Color::White => &self.white_username,
            Color::Black => &self.black_username,
        }
    }

    pub fn rating(&self, color: Color) -> u32 {
        match color {
            Color::White => self.white_rating,
            Color::Black => self.black_rating,
        }
    }

    pub fn accuracy(&self, color: Color) -> f64 {
        match color {
            Color::White => self.white_accuracy,
            Color::Black => self.black_accuracy,
        }
    }

    pub fn result_str(&self) -> &'static str {
        self.result.map(GameResult::as_str).unwrap_or("")
    }
}
