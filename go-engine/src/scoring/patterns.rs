//! P1: connection-block marking.
//!
//! Six base shapes, each tried in all eight dihedral orientations and for
//! both players, matched against the board via a small data table rather
//! than hand-unrolled per-orientation code (see `handicap.rs` for the same
//! "drive fixed shapes from a table" idiom applied to hoshi points).

use super::color::Color;
use super::grid::{Board, Pt};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Cell {
    /// `p` — living-pla stone.
    Pla,
    /// `e` — empty, living-pla, or dead-opp.
    Eish,
    /// `@` — empty; the cell to mark.
    Mark,
    /// `?` — anything on-board.
    Any,
    /// trailing `x` row/col — must be off-board (edge anchor).
    Edge,
}

struct Pattern {
    /// rows top-to-bottom, each a slice of cells left-to-right.
    rows: &'static [&'static [Cell]],
}

use Cell::*;

const PATTERNS: &[Pattern] = &[
    // 1. pp / @e / pe
    Pattern {
        rows: &[&[Pla, Pla], &[Mark, Eish], &[Pla, Eish]],
    },
    // 2. ep? / e@e / ep?
    Pattern {
        rows: &[
            &[Eish, Pla, Any],
            &[Eish, Mark, Eish],
            &[Eish, Pla, Any],
        ],
    },
    // 3. pee / e@p / pee
    Pattern {
        rows: &[
            &[Pla, Eish, Eish],
            &[Eish, Mark, Pla],
            &[Pla, Eish, Eish],
        ],
    },
    // 4. ?e? / p@p / xxx
    Pattern {
        rows: &[
            &[Any, Eish, Any],
            &[Pla, Mark, Pla],
            &[Edge, Edge, Edge],
        ],
    },
    // 5. pp / @e / xx
    Pattern {
        rows: &[&[Pla, Pla], &[Mark, Eish], &[Edge, Edge]],
    },
    // 6. ep? / e@e / xxx
    Pattern {
        rows: &[
            &[Eish, Pla, Any],
            &[Eish, Mark, Eish],
            &[Edge, Edge, Edge],
        ],
    },
];

/// One entry per transformed cell: `(dy, dx, cell)` relative to a local
/// origin at the pattern's top-left corner.
type Entry = (isize, isize, Cell);

fn entries(p: &Pattern) -> (Vec<Entry>, isize, isize) {
    let h = p.rows.len() as isize;
    let w = p.rows.iter().map(|r| r.len()).max().unwrap_or(0) as isize;
    let mut out = Vec::new();
    for (dy, row) in p.rows.iter().enumerate() {
        for (dx, &cell) in row.iter().enumerate() {
            out.push((dy as isize, dx as isize, cell));
        }
    }
    (out, h, w)
}

/// Apply one of the 8 dihedral transforms to a coordinate within an `h x w`
/// bounding box. Returns the transformed coordinate.
fn transform(orientation: usize, dy: isize, dx: isize, h: isize, w: isize) -> (isize, isize) {
    let (dy, dx) = if orientation >= 4 {
        // mirror columns first
        (dy, w - 1 - dx)
    } else {
        (dy, dx)
    };
    match orientation % 4 {
        0 => (dy, dx),
        1 => (dx, h - 1 - dy),
        2 => (h - 1 - dy, w - 1 - dx),
        3 => (w - 1 - dx, dy),
        _ => unreachable!(),
    }
}

fn matches_cell(board: &Board, cell: Cell, pla: Color, y: isize, x: isize) -> Option<Option<Pt>> {
    let on_board = board.on_board(y, x);
    match cell {
        Edge => {
            if on_board {
                None
            } else {
                Some(None)
            }
        }
        Any => {
            if on_board {
                Some(None)
            } else {
                None
            }
        }
        Pla => {
            if on_board && board.is_living_pla((y as usize, x as usize), pla) {
                Some(None)
            } else {
                None
            }
        }
        Eish => {
            if !on_board {
                return None;
            }
            let p = (y as usize, x as usize);
            let color = board.color_at(p);
            let ok = color.is_empty()
                || (color == pla && !board.is_dead(p))
                || (color == pla.opp() && board.is_dead(p));
            if ok {
                Some(None)
            } else {
                None
            }
        }
        Mark => {
            if !on_board {
                return None;
            }
            let p = (y as usize, x as usize);
            if board.color_at(p).is_empty() {
                Some(Some(p))
            } else {
                None
            }
        }
    }
}

/// Returns, for every cell, the player it is blocked for (if any).
pub(super) fn mark_connection_blocks(board: &Board) -> Vec<Option<Color>> {
    let mut blocks = vec![None; board.ysize * board.xsize];

    for pla in [Color::Black, Color::White] {
        for pattern in PATTERNS {
            let (cells, h, w) = entries(pattern);
            for orientation in 0..8 {
                let transformed: Vec<(isize, isize, Cell)> = cells
                    .iter()
                    .map(|&(dy, dx, c)| {
                        let (ty, tx) = transform(orientation, dy, dx, h, w);
                        (ty, tx, c)
                    })
                    .collect();

                let min_y = transformed.iter().map(|&(y, _, _)| y).min().unwrap_or(0);
                let max_y = transformed.iter().map(|&(y, _, _)| y).max().unwrap_or(0);
                let min_x = transformed.iter().map(|&(_, x, _)| x).min().unwrap_or(0);
                let max_x = transformed.iter().map(|&(_, x, _)| x).max().unwrap_or(0);

                let ay_lo = -max_y;
                let ay_hi = board.ysize as isize - 1 - min_y;
                let ax_lo = -max_x;
                let ax_hi = board.xsize as isize - 1 - min_x;

                for ay in ay_lo..=ay_hi {
                    for ax in ax_lo..=ax_hi {
                        let mut mark_point: Option<Pt> = None;
                        let mut ok = true;
                        for &(dy, dx, cell) in &transformed {
                            match matches_cell(board, cell, pla, ay + dy, ax + dx) {
                                Some(maybe_mark) => {
                                    if let Some(p) = maybe_mark {
                                        mark_point = Some(p);
                                    }
                                }
                                None => {
                                    ok = false;
                                    break;
                                }
                            }
                        }
                        if ok {
                            if let Some(p) = mark_point {
                                blocks[board.idx(p)] = Some(pla);
                            }
                        }
                    }
                }
            }
        }
    }

    blocks
}
