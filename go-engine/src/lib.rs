pub mod dead_stones;
pub mod engine;
pub mod error;
pub mod game_tree;
pub mod goban;
pub mod ko;
pub mod replay;
pub mod scoring;
pub mod sgf;
pub mod stone;
pub mod turn;

pub type Point = (u8, u8);

pub use engine::{Engine, GameState, Stage};
pub use error::GoError;
pub use game_tree::{GameTree, NodeId, TreeNode};
pub use goban::Goban;
pub use ko::Ko;
pub use replay::Replay;
pub use scoring::{Color as ScoringColor, ColorScore, LocScore, ScoringError};
pub use stone::Stone;
pub use turn::{Move, Turn};
