//! P9: final per-cell scoring synthesis.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use super::chains::Chains;
use super::color::Color;
use super::eyes::Eyes;
use super::grid::{Board, Pt};
use super::reach::Reach;
use super::regions::Regions;

/// Per-intersection scoring judgement, the engine's primary output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocScore {
    pub is_territory_for: Color,
    pub belongs_to_seki_group: Color,
    pub is_false_eye: bool,
    pub is_unscorable_false_eye: bool,
    pub is_dame: bool,
    pub eye_value: u8,
}

fn slot(c: Color) -> usize {
    match c {
        Color::Black => 0,
        Color::White => 1,
        Color::Empty => unreachable!("extra-unscorable sets are only keyed by Black/White"),
    }
}

#[allow(clippy::too_many_arguments)]
pub(super) fn synth_scores(
    board: &Board,
    regions: &Regions,
    chains: &Chains,
    reach: &Reach,
    eyes: &Eyes,
    false_ld1: &[bool],
    false_ld2: &[bool],
    score_false_eyes: bool,
) -> Vec<LocScore> {
    let total_eyes: Vec<u32> = regions
        .info
        .iter()
        .map(|r| r.eyes.iter().map(|&eid| eyes.info[eid].eye_value as u32).sum())
        .collect();

    let mut extra_unscoreable: [IndexSet<Pt>; 2] = [IndexSet::new(), IndexSet::new()];
    for p in board.points() {
        if !false_ld2[board.idx(p)] {
            continue;
        }
        let c = board.color_at(p);
        if c.is_empty() || !board.is_dead(p) {
            continue;
        }
        let owner = c.opp();
        for n in board.neighbors(p) {
            extra_unscoreable[slot(owner)].insert(n);
        }
    }

    let mut out = Vec::with_capacity(board.ysize * board.xsize);
    for p in board.points() {
        let idx = board.idx(p);
        let cell_region = regions.region_id_at(p, board);
        let is_dame = cell_region.is_none();

        let mut color = Color::Empty;
        let mut belongs_to_seki_group = Color::Empty;
        if let Some(rid) = cell_region {
            color = regions.info[rid].color;
            if total_eyes[rid] <= 1 {
                belongs_to_seki_group = color;
            }
        }

        let is_false_eye = false_ld1[idx];
        let mut is_unscorable_false_eye = false_ld2[idx];
        if !is_unscorable_false_eye
            && (board.color_at(p).is_empty() || board.is_dead(p))
            && color != Color::Empty
            && extra_unscoreable[slot(color)].contains(&p)
        {
            is_unscorable_false_eye = true;
        }

        let eye_value = eyes
            .eye_id_at(p, board)
            .map(|eid| eyes.info[eid].eye_value)
            .unwrap_or(0);

        let is_territory_for = cell_region
            .filter(|&rid| {
                let is_living_region_stone = board.color_at(p) == color && !board.is_dead(p);
                let seki_ok = belongs_to_seki_group == Color::Empty;
                let fe_ok = score_false_eyes || !is_unscorable_false_eye;
                let chain_region_matches = chains.info[chains.id[idx]].region_id == Some(rid);
                let opp_strict = reach.strict_reaches(color.opp(), p, board);
                !is_living_region_stone && seki_ok && fe_ok && chain_region_matches && !opp_strict
            })
            .map(|_| color)
            .unwrap_or(Color::Empty);

        out.push(LocScore {
            is_territory_for,
            belongs_to_seki_group,
            is_false_eye,
            is_unscorable_false_eye,
            is_dame,
            eye_value,
        });
    }

    out
}

pub(super) fn area_grid(board: &Board, reach: &Reach) -> Vec<Vec<Color>> {
    let mut out = vec![vec![Color::Empty; board.xsize]; board.ysize];
    for p in board.points() {
        let b = reach.strict_reaches(Color::Black, p, board);
        let w = reach.strict_reaches(Color::White, p, board);
        out[p.0][p.1] = if b && !w {
            Color::Black
        } else if w && !b {
            Color::White
        } else {
            Color::Empty
        };
    }
    out
}
