use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};
use std::fmt;

use crate::stone::Stone;

/// Stone color for scoring purposes, with an explicit empty state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr)]
#[repr(i8)]
pub enum Color {
    Empty = 0,
    Black = 1,
    White = -1,
}

impl Color {
    /// Opponent of a colored point. Calling this on `Empty` is a logic error
    /// in every pass that uses it, so it panics rather than returning `Empty`.
    pub fn opp(self) -> Self {
        match self {
            Color::Black => Color::White,
            Color::White => Color::Black,
            Color::Empty => panic!("opp() called on Color::Empty"),
        }
    }

    pub fn is_empty(self) -> bool {
        matches!(self, Color::Empty)
    }
}

impl From<Stone> for Color {
    fn from(s: Stone) -> Self {
        match s {
            Stone::Black => Color::Black,
            Stone::White => Color::White,
        }
    }
}

impl TryFrom<i8> for Color {
    type Error = i8;

    fn try_from(v: i8) -> Result<Self, i8> {
        match v {
            0 => Ok(Color::Empty),
            1 => Ok(Color::Black),
            -1 => Ok(Color::White),
            other => Err(other),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::Empty => write!(f, "Empty"),
            Color::Black => write!(f, "Black"),
            Color::White => write!(f, "White"),
        }
    }
}

/// Final score for both players, as returned by `final_territory_score` and
/// `final_area_score`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorScore {
    pub black: f64,
    pub white: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opponent() {
        assert_eq!(Color::Black.opp(), Color::White);
        assert_eq!(Color::White.opp(), Color::Black);
    }

    #[test]
    #[should_panic]
    fn opp_of_empty_panics() {
        Color::Empty.opp();
    }

    #[test]
    fn from_stone() {
        assert_eq!(Color::from(Stone::Black), Color::Black);
        assert_eq!(Color::from(Stone::White), Color::White);
    }

    #[test]
    fn try_from_i8() {
        assert_eq!(Color::try_from(0), Ok(Color::Empty));
        assert_eq!(Color::try_from(1), Ok(Color::Black));
        assert_eq!(Color::try_from(-1), Ok(Color::White));
        assert_eq!(Color::try_from(7), Err(7));
    }

    #[test]
    fn display() {
        assert_eq!(Color::Empty.to_string(), "Empty");
        assert_eq!(Color::Black.to_string(), "Black");
        assert_eq!(Color::White.to_string(), "White");
    }
}
