use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Point;
use crate::error::GoError;
use crate::goban::{Captures, Goban};
use crate::handicap;
use crate::ko::Ko;
use crate::stone::Stone;
use crate::turn::Turn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Unstarted,
    BlackToPlay,
    WhiteToPlay,
    TerritoryReview,
    Done,
}

impl Stage {
    pub fn is_play(&self) -> bool {
        matches!(self, Stage::BlackToPlay | Stage::WhiteToPlay)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Unstarted => write!(f, "unstarted"),
            Stage::BlackToPlay => write!(f, "black_to_play"),
            Stage::WhiteToPlay => write!(f, "white_to_play"),
            Stage::TerritoryReview => write!(f, "territory_review"),
            Stage::Done => write!(f, "done"),
        }
    }
}

impl std::str::FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unstarted" => Ok(Stage::Unstarted),
            "black_to_play" => Ok(Stage::BlackToPlay),
            "white_to_play" => Ok(Stage::WhiteToPlay),
            "territory_review" => Ok(Stage::TerritoryReview),
            "done" => Ok(Stage::Done),
            _ => Err(format!("unknown stage: {s}")),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GameState {
    pub board: Vec<i8>,
    pub cols: u8,
    pub rows: u8,
    pub captures: Captures,
    pub ko: Option<Ko>,
}

#[derive(Debug, Clone)]
pub struct Engine {
    cols: u8,
    rows: u8,
    handicap: u8,
    moves: Vec<Turn>,
    goban: Goban,
    result: Option<String>,
}

impl Engine {
    pub fn new(cols: u8, rows: u8) -> Self {
        Self::create(cols, rows, 0, Vec::new())
    }

    pub fn with_moves(cols: u8, rows: u8, moves: Vec<Turn>) -> Self {
        Self::create(cols, rows, 0, moves)
    }

    pub fn with_handicap(cols: u8, rows: u8, handicap: u8) -> Self {
        Self::create(cols, rows, handicap, Vec::new())
    }

    pub fn with_handicap_and_moves(cols: u8, rows: u8, handicap: u8, moves: Vec<Turn>) -> Self {
        Self::create(cols, rows, handicap, moves)
    }

    fn create(cols: u8, rows: u8, handicap: u8, moves: Vec<Turn>) -> Self {
        let mut goban = Goban::with_dimensions(cols, rows);
        if handicap >= 2 {
            if let Some(pts) = handicap::handicap_points(cols, rows, handicap) {
                for pt in pts {
                    goban.set_stone(pt, Stone::Black);
                }
            }
        }
        let goban = goban.replay_moves(&moves);
        let result = Self::result_from_moves(&moves);
        Engine {
            cols,
            rows,
            handicap,
            moves,
            goban,
            result,
        }
    }

    fn result_from_moves(moves: &[Turn]) -> Option<String> {
        moves.last().and_then(|t| {
            if t.is_resign() {
                Some(format!("{}+R", t.stone.opp()))
            } else {
                None
            }
        })
    }

    // -- Accessors --

    pub fn cols(&self) -> u8 {
        self.cols
    }

    pub fn rows(&self) -> u8 {
        self.rows
    }

    pub fn handicap(&self) -> u8 {
        self.handicap
    }

    pub fn moves(&self) -> &[Turn] {
        &self.moves
    }

    pub fn goban(&self) -> &Goban {
        &self.goban
    }

    pub fn board(&self) -> &[i8] {
        self.goban.board()
    }

    pub fn ko(&self) -> &Option<Ko> {
        self.goban.ko()
    }

    pub fn captures(&self) -> &Captures {
        self.goban.captures()
    }

    pub fn stone_captures(&self, stone: Stone) -> u32 {
        self.goban.captures().get(stone)
    }

    pub fn stone_at(&self, point: Point) -> Option<Stone> {
        self.goban.stone_at(point)
    }

    pub fn current_turn_stone(&self) -> Stone {
        match self.moves.last() {
            None if self.handicap >= 2 => Stone::White,
            None => Stone::Black,
            Some(m) => m.stone.opp(),
        }
    }

    pub fn result(&self) -> Option<&str> {
        self.result.as_deref()
    }

    pub fn set_result(&mut self, result: String) {
        self.result = Some(result);
    }

    // -- Game actions --

    pub fn try_play(&mut self, stone: Stone, point: Point) -> Result<Stage, GoError> {
        if stone != self.current_turn_stone() {
            return Err(GoError::OutOfTurn);
        }

        self.goban = self.goban.play(point, stone)?;
        self.moves.push(Turn::play(stone, point));
        Ok(self.stage())
    }

    pub fn try_pass(&mut self, stone: Stone) -> Result<Stage, GoError> {
        if stone != self.current_turn_stone() {
            return Err(GoError::OutOfTurn);
        }

        self.goban.pass();
        self.moves.push(Turn::pass(stone));
        Ok(self.stage())
    }

    pub fn try_resign(&mut self, stone: Stone) -> Stage {
        if self.result.is_none() {
            self.result = Some(format!("{}+R", stone.opp()));
        }
        self.stage()
    }

    pub fn is_legal(&self, point: Point, stone: Stone) -> bool {
        self.goban.is_legal_move(point, stone)
    }

    pub fn stage(&self) -> Stage {
        if self.moves.is_empty() {
            Stage::Unstarted
        } else if self.result.is_some() {
            Stage::Done
        } else if matches!(
            self.moves.as_slice(),
            [.., a, b] if a.is_pass() && b.is_pass()
        ) {
            Stage::TerritoryReview
        } else {
            match self.current_turn_stone() {
                Stone::Black => Stage::BlackToPlay,
                Stone::White => Stage::WhiteToPlay,
            }
        }
    }

    // -- Serialization --

    pub fn game_state(&self) -> GameState {
        GameState {
            board: self.goban.board().to_vec(),
            cols: self.cols,
            rows: self.rows,
            captures: self.goban.captures().clone(),
            ko: self.goban.ko().clone(),
        }
    }

    pub fn from_game_state(
        cols: u8,
        rows: u8,
        handicap: u8,
        moves: Vec<Turn>,
        state: GameState,
    ) -> Self {
        let goban = Goban::from_state(state);
        let result = Self::result_from_moves(&moves);

        Engine {
            cols,
            rows,
            handicap,
            moves,
            goban,
            result,
        }
    }
}
