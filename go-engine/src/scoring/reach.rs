//! P2: reachability under connection blockers.

use super::color::Color;
use super::grid::{Board, Pt};

/// Per-color reachability grids, strict and blocked.
pub(super) struct Reach {
    pub strict: [Vec<bool>; 2],
    pub blocked: [Vec<bool>; 2],
}

fn slot(c: Color) -> usize {
    match c {
        Color::Black => 0,
        Color::White => 1,
        Color::Empty => unreachable!("reach is only indexed by Black/White"),
    }
}

impl Reach {
    pub fn strict_reaches(&self, pla: Color, p: Pt, board: &Board) -> bool {
        self.strict[slot(pla)][board.idx(p)]
    }

    pub fn reaches(&self, pla: Color, p: Pt, board: &Board) -> bool {
        self.blocked[slot(pla)][board.idx(p)]
    }
}

/// Flood from every living-pla stone. `blockers`, when given, stops
/// propagation *through* a cell blocked for `pla` (the blocker is still
/// marked reached, it just doesn't propagate further).
fn flood(board: &Board, pla: Color, blockers: Option<&[Option<Color>]>) -> Vec<bool> {
    let mut reached = vec![false; board.ysize * board.xsize];
    let mut stack: Vec<Pt> = Vec::new();

    for p in board.points() {
        if board.is_living_pla(p, pla) {
            let i = board.idx(p);
            if !reached[i] {
                reached[i] = true;
                stack.push(p);
            }
        }
    }

    while let Some(p) = stack.pop() {
        let is_blocker = blockers
            .map(|b| b[board.idx(p)] == Some(pla))
            .unwrap_or(false);
        if is_blocker && !board.is_living_pla(p, pla) {
            // a blocker cell is reached but does not propagate further,
            // unless it's also a living-pla stone itself (can't happen:
            // blockers only ever mark empty cells).
            continue;
        }
        for n in board.neighbors(p) {
            if board.is_living_pla(n, pla.opp()) {
                continue;
            }
            let ni = board.idx(n);
            if reached[ni] {
                continue;
            }
            reached[ni] = true;
            stack.push(n);
        }
    }

    reached
}

pub(super) fn mark_reachability(board: &Board, blocks: &[Option<Color>]) -> Reach {
    let mut strict = [Vec::new(), Vec::new()];
    let mut blocked = [Vec::new(), Vec::new()];

    for pla in [Color::Black, Color::White] {
        strict[slot(pla)] = flood(board, pla, None);
        blocked[slot(pla)] = flood(board, pla, Some(blocks));
    }

    Reach { strict, blocked }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::patterns::mark_connection_blocks;

    fn board_from_rows(rows: &[&str]) -> Board {
        let stones: Vec<Vec<Color>> = rows
            .iter()
            .map(|r| {
                r.chars()
                    .map(|c| match c {
                        'x' | 'b' => Color::Black,
                        'o' | 'w' => Color::White,
                        _ => Color::Empty,
                    })
                    .collect()
            })
            .collect();
        let dead = rows
            .iter()
            .map(|r| r.chars().map(|c| c == 'b' || c == 'w').collect())
            .collect();
        Board::build(&stones, &dead).unwrap()
    }

    #[test]
    fn empty_board_nobody_reaches() {
        let board = board_from_rows(&["...", "...", "..."]);
        let blocks = mark_connection_blocks(&board);
        let reach = mark_reachability(&board, &blocks);
        for p in board.points() {
            assert!(!reach.strict_reaches(Color::Black, p, &board));
            assert!(!reach.strict_reaches(Color::White, p, &board));
        }
    }

    #[test]
    fn single_stone_reaches_whole_board_strictly() {
        let board = board_from_rows(&["x..", "...", "..."]);
        let blocks = mark_connection_blocks(&board);
        let reach = mark_reachability(&board, &blocks);
        for p in board.points() {
            assert!(reach.strict_reaches(Color::Black, p, &board));
            assert!(!reach.strict_reaches(Color::White, p, &board));
        }
    }

    #[test]
    fn opponent_wall_stops_reach() {
        let board = board_from_rows(&["x.o"]);
        let blocks = mark_connection_blocks(&board);
        let reach = mark_reachability(&board, &blocks);
        assert!(reach.strict_reaches(Color::Black, (0, 1), &board));
        assert!(reach.strict_reaches(Color::White, (0, 1), &board));
        assert!(!reach.strict_reaches(Color::Black, (0, 2), &board));
        assert!(!reach.strict_reaches(Color::White, (0, 0), &board));
    }
}
