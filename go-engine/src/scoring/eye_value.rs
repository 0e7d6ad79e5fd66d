//! P8: eye-value estimation.

use indexmap::IndexMap;

use super::color::Color;
use super::eyes::Eyes;
use super::grid::{Board, Pt};

#[derive(Debug, Clone, Copy)]
struct PointInfo {
    /// Number of this point's 4-neighbors that are also real points of the
    /// same eye, regardless of their color.
    adj_eye_count: usize,
    num_empty_adj_false: usize,
    num_opp_adj_false: usize,
    is_false_eye_poke: bool,
}

/// Raw stone-color liberty count for the chain touching `p`, ignoring the
/// dead-flag grid entirely — pseudo-legality approximates actual capture
/// mechanics, where a "dead" stone is still physically on the board.
fn raw_chain_liberties(board: &Board, p: Pt) -> usize {
    let color = board.color_at(p);
    if color.is_empty() {
        return 0;
    }
    let mut visited = vec![false; board.ysize * board.xsize];
    let mut libs = indexmap::IndexSet::new();
    let mut stack = vec![p];
    visited[board.idx(p)] = true;
    while let Some(q) = stack.pop() {
        for n in board.neighbors(q) {
            if board.color_at(n) == color {
                if !visited[board.idx(n)] {
                    visited[board.idx(n)] = true;
                    stack.push(n);
                }
            } else if board.color_at(n).is_empty() {
                libs.insert(n);
            }
        }
    }
    libs.len()
}

fn is_pseudolegal(board: &Board, p: Pt, pla: Color) -> bool {
    if !board.color_at(p).is_empty() {
        return false;
    }
    let opp = pla.opp();
    board
        .neighbors(p)
        .iter()
        .any(|&n| board.color_at(n) != opp || raw_chain_liberties(board, n) <= 1)
}

fn components(board: &Board, points: &indexmap::IndexSet<Pt>, deleted: &[Pt]) -> Vec<Vec<Pt>> {
    let mut remaining: indexmap::IndexSet<Pt> = points.clone();
    for d in deleted {
        remaining.shift_remove(d);
    }
    let mut visited: indexmap::IndexSet<Pt> = indexmap::IndexSet::new();
    let mut pieces = Vec::new();

    for &start in &remaining {
        if visited.contains(&start) {
            continue;
        }
        let mut piece = Vec::new();
        let mut stack = vec![start];
        visited.insert(start);
        while let Some(p) = stack.pop() {
            piece.push(p);
            for n in board.neighbors(p) {
                if remaining.contains(&n) && !visited.contains(&n) {
                    visited.insert(n);
                    stack.push(n);
                }
            }
        }
        pieces.push(piece);
    }

    pieces
}

fn opp_adj_false_count(board: &Board, p: Pt, opp: Color, false_ld: &[bool]) -> usize {
    board
        .neighbors(p)
        .iter()
        .filter(|&&n| board.color_at(n) == opp && false_ld[board.idx(n)])
        .count()
}

pub(super) fn mark_eye_values(board: &Board, eyes: &mut Eyes, false_ld: &[bool]) {
    for eye in eyes.info.iter_mut() {
        eye.real_points = eye
            .potential_points
            .iter()
            .copied()
            .filter(|&p| !false_ld[board.idx(p)])
            .collect();
    }

    let values: Vec<u8> = (0..eyes.info.len())
        .map(|i| compute_eye_value(board, &eyes.info[i], false_ld))
        .collect();

    for (eye, v) in eyes.info.iter_mut().zip(values) {
        eye.eye_value = v;
    }
}

fn compute_eye_value(board: &Board, eye: &super::eyes::EyeInfo, false_ld: &[bool]) -> u8 {
    let pla = eye.pla;
    let opp = pla.opp();
    let real = &eye.real_points;

    let mut point_info: IndexMap<Pt, PointInfo> = IndexMap::new();
    for &p in real {
        let adj_eye_count = board
            .neighbors(p)
            .iter()
            .filter(|&&n| real.contains(&n))
            .count();
        let num_empty_adj_false = board
            .neighbors(p)
            .iter()
            .filter(|&&n| board.color_at(n).is_empty() && false_ld[board.idx(n)])
            .count();
        let num_opp_adj_false = opp_adj_false_count(board, p, opp, false_ld);
        let is_false_eye_poke =
            board.color_at(p) == opp && (num_opp_adj_false >= 1 || num_empty_adj_false >= 2);

        point_info.insert(
            p,
            PointInfo {
                adj_eye_count,
                num_empty_adj_false,
                num_opp_adj_false,
                is_false_eye_poke,
            },
        );
    }

    let mut moves: IndexMap<Pt, u32> = IndexMap::new();
    for &p in real {
        let mut total = 0u32;
        for n in board.neighbors(p) {
            let ncolor = board.color_at(n);
            if ncolor.is_empty() && !real.contains(&n) {
                total += 1;
            }
            if ncolor.is_empty() && real.contains(&n) {
                if let Some(npi) = point_info.get(&n) {
                    if npi.num_opp_adj_false >= 1 {
                        total += 1;
                    }
                }
            }
            if ncolor == opp && real.contains(&n) {
                if let Some(npi) = point_info.get(&n) {
                    if npi.num_empty_adj_false >= 1 {
                        total += 1;
                    }
                }
            }
            if ncolor == opp && false_ld[board.idx(n)] {
                total += 1000;
            }
            if ncolor == opp && real.contains(&n) {
                if let Some(npi) = point_info.get(&n) {
                    if npi.is_false_eye_poke {
                        total += 1000;
                    }
                }
            }
        }
        moves.insert(p, total);
    }

    let mut value: u8 = 0;

    // Base 1: any real point that's a single move away from capture.
    if real.iter().any(|p| moves[p] <= 1) {
        value = value.max(1);
    }

    // Bottleneck: deleting one pseudo-legal empty point should not split the
    // eye into more pieces than it can afford to lose.
    for &dyx in &eye.potential_points {
        if board.color_at(dyx).is_empty() && is_pseudolegal(board, dyx, pla) {
            let threshold = if opp_adj_false_count(board, dyx, opp, false_ld) == 1 {
                1u32
            } else {
                0u32
            };
            let pieces = components(board, real, &[dyx]);
            let count = pieces
                .iter()
                .filter(|piece| piece.iter().any(|p| moves[p] <= threshold))
                .count();
            value = value.max(count.min(2) as u8);
        }
    }

    // Dead-stone bulk.
    let dead_opp_real = real.iter().filter(|&&p| board.color_at(p) == opp).count();
    if dead_opp_real >= 8 {
        value = value.max(2);
    } else if dead_opp_real >= 5 {
        value = value.max(1);
    }

    // Size minus weaknesses.
    let ge1 = real.iter().filter(|&&p| moves[&p] >= 1).count();
    let ge2 = real.iter().filter(|&&p| moves[&p] >= 2).count();
    let opp_with_2_in_eye = real
        .iter()
        .filter(|&&p| board.color_at(p) == opp && point_info[&p].adj_eye_count >= 2)
        .count();
    if real.len() as i64 - ge1 as i64 - ge2 as i64 - opp_with_2_in_eye as i64 >= 6 {
        value = value.max(2);
    }

    // Many interior empties.
    let deg4 = real
        .iter()
        .filter(|&&p| board.color_at(p).is_empty() && point_info[&p].adj_eye_count >= 4)
        .count();
    let deg3 = real
        .iter()
        .filter(|&&p| board.color_at(p).is_empty() && point_info[&p].adj_eye_count >= 3)
        .count();
    if deg4 + deg3 >= 6 {
        value = value.max(2);
    }

    // Dual-bottleneck: two adjacent weak points that together still hold.
    for &p1 in real {
        if !(board.color_at(p1).is_empty() && board.neighbors(p1).len() == 4) {
            continue;
        }
        let pi1 = point_info[&p1];
        if pi1.adj_eye_count < 3 || moves[&p1] > 1 {
            continue;
        }
        for &p2 in board.neighbors(p1).iter() {
            if p1 == p2 || !real.contains(&p2) {
                continue;
            }
            let pi2 = point_info[&p2];
            if pi2.adj_eye_count < 3 || moves[&p2] > 1 {
                continue;
            }
            let p2_empty = board.color_at(p2).is_empty();
            let p2_ok = p2_empty || {
                let extra_empty_in_eye = board
                    .neighbors(p2)
                    .iter()
                    .filter(|&&n| n != p1 && real.contains(&n) && board.color_at(n).is_empty())
                    .count();
                extra_empty_in_eye >= 2
            };
            if !p2_ok {
                continue;
            }

            let pieces = components(board, real, &[p1, p2]);
            let qualifying: Vec<usize> = pieces
                .iter()
                .map(|piece| piece.iter().filter(|&&p| moves[&p] == 0).count())
                .collect();
            let qualifying_pieces = qualifying.iter().filter(|&&c| c >= 1).count();
            let any_piece_with_two = qualifying.iter().any(|&c| c >= 2);
            let pieces_with_two = qualifying.iter().filter(|&&c| c >= 2).count();

            let ok = qualifying_pieces >= 2
                && any_piece_with_two
                && (p2_empty || pieces_with_two >= 2);
            if ok {
                value = value.max(2);
            }
        }
    }

    value.min(2)
}
