use serde::{Deserialize, Serialize};
use std::fmt;

use crate::stone::Stone;
use crate::Point;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Move {
    Play,
    Pass,
    Resign,
}

impl std::str::FromStr for Move {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "play" => Ok(Move::Play),
            "pass" => Ok(Move::Pass),
            "resign" => Ok(Move::Resign),
            _ => Err(format!("invalid move: {s}")),
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Move::Play => write!(f, "play"),
            Move::Pass => write!(f, "pass"),
            Move::Resign => write!(f, "resign"),
        }
    }
}

/// Represents a single turn in a game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub kind: Move,
    pub stone: Stone,
    pub pos: Option<Point>,
}

impl Turn {
    pub fn play(stone: Stone, point: Point) -> Self {
        Turn {
            kind: Move::Play,
            stone,
            pos: Some(point),
        }
    }

    pub fn pass(stone: Stone) -> Self {
        Turn {
            kind: Move::Pass,
            stone,
            pos: None,
        }
    }

    pub fn resign(stone: Stone) -> Self {
        Turn {
            kind: Move::Resign,
            stone,
            pos: None,
        }
    }

    pub fn is_play(&self) -> bool {
        self.kind == Move::Play
    }

    pub fn is_pass(&self) -> bool {
        self.kind == Move::Pass
    }

    pub fn is_resign(&self) -> bool {
        self.kind == Move::Resign
    }
}
