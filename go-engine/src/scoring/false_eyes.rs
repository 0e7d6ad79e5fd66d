//! P7: false-eye detection. Run twice with an eye-value lookup parameter —
//! once with every eye valued at 0 (producing life-and-death false eyes),
//! once after P8 has filled in real eye values (producing unscorable false
//! eyes) — rather than duplicating the search for each pass.

use indexmap::IndexSet;

use super::eyes::{EyeId, Eyes};
use super::grid::{Board, Pt};
use super::macrochains::{MacroChainId, MacroChains};
use super::regions::Regions;

/// Tests whether `point`, inside `origin_eye`, is false from the
/// perspective of the bordering macro-chain `entry_macro`.
#[allow(clippy::too_many_arguments)]
fn search(
    board: &Board,
    regions: &Regions,
    eyes: &Eyes,
    macrochains: &MacroChains,
    origin_eye: EyeId,
    point: Pt,
    entry_macro: MacroChainId,
    eye_value_of: &impl Fn(EyeId) -> u8,
) -> bool {
    let eye = &eyes.info[origin_eye];

    // Condition 1: more than one in-eye neighbor means it's not a cut point.
    let in_eye_degree = board
        .neighbors(point)
        .iter()
        .filter(|n| eye.potential_points.contains(n))
        .count();
    if in_eye_degree > 1 {
        return false;
    }

    let target_sides = board
        .neighbors(point)
        .iter()
        .filter(|&&n| regions.region_id_at(n, board) == Some(eye.region_id))
        .count();

    let mut visited_macro: IndexSet<MacroChainId> = IndexSet::new();
    let mut visited_other_eye: IndexSet<EyeId> = IndexSet::new();
    let mut visited_origin_points: IndexSet<Pt> = IndexSet::new();
    visited_origin_points.insert(point);
    let mut sides_reached = 0usize;

    let mut macro_queue = vec![entry_macro];
    visited_macro.insert(entry_macro);

    while let Some(mid) = macro_queue.pop() {
        if let Some(border_points) = macrochains.info[mid].eye_neighbors_from.get(&origin_eye) {
            for &bp in border_points {
                if board.neighbors(point).contains(&bp) {
                    sides_reached += 1;
                }
            }
            if sides_reached >= target_sides {
                return false;
            }
        }

        if let Some(entry_points) = eye.macrochain_neighbors_from.get(&mid) {
            let mut local_stack: Vec<Pt> = entry_points
                .iter()
                .copied()
                .filter(|p| !visited_origin_points.contains(p))
                .collect();
            for &p in &local_stack {
                visited_origin_points.insert(p);
            }
            let mut newly_reached = Vec::new();
            while let Some(p) = local_stack.pop() {
                newly_reached.push(p);
                for n in board.neighbors(p) {
                    if eye.potential_points.contains(&n) && !visited_origin_points.contains(&n) {
                        visited_origin_points.insert(n);
                        local_stack.push(n);
                    }
                }
            }

            if !newly_reached.is_empty() {
                if eye_value_of(origin_eye) > 0 {
                    return false;
                }
                for &p in &newly_reached {
                    if board.neighbors(point).contains(&p) {
                        sides_reached += 1;
                    }
                }
                if sides_reached >= target_sides {
                    return false;
                }
                for &p in &newly_reached {
                    for n in board.neighbors(p) {
                        if let Some(m2) = macrochains.macro_id_at(n, board) {
                            if visited_macro.insert(m2) {
                                macro_queue.push(m2);
                            }
                        }
                    }
                }
            }
        }

        for (&e2, _pts) in macrochains.info[mid].eye_neighbors_from.iter() {
            if e2 == origin_eye || visited_other_eye.contains(&e2) {
                continue;
            }
            visited_other_eye.insert(e2);
            if eye_value_of(e2) > 0 {
                return false;
            }
            for &m3 in eyes.info[e2].macrochain_neighbors_from.keys() {
                if visited_macro.insert(m3) {
                    macro_queue.push(m3);
                }
            }
        }
    }

    true
}

/// Runs the false-eye search over every eye/macro-chain/point triple.
/// `eye_value_of` is `|_| 0` for the life-and-death-false pass, and the
/// real per-eye value lookup for the unscorable-false pass.
pub(super) fn mark_false_eye_points(
    board: &Board,
    regions: &Regions,
    eyes: &Eyes,
    macrochains: &MacroChains,
    eye_value_of: impl Fn(EyeId) -> u8,
) -> Vec<bool> {
    let mut false_grid = vec![false; board.ysize * board.xsize];

    for (eye_id, eye) in eyes.info.iter().enumerate() {
        for (&mid, points) in eye.macrochain_neighbors_from.iter() {
            for &p in points {
                if false_grid[board.idx(p)] {
                    continue;
                }
                let is_false = search(
                    board,
                    regions,
                    eyes,
                    macrochains,
                    eye_id,
                    p,
                    mid,
                    &eye_value_of,
                );
                if is_false {
                    false_grid[board.idx(p)] = true;
                }
            }
        }
    }

    false_grid
}
