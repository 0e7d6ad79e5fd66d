//! P4: chain decomposition.

use indexmap::IndexSet;

use super::color::Color;
use super::grid::{Board, Pt};
use super::regions::{RegionId, Regions};

pub type ChainId = usize;

#[derive(Debug)]
pub struct ChainInfo {
    pub color: Color,
    pub is_marked_dead: bool,
    pub region_id: Option<RegionId>,
    pub points: IndexSet<Pt>,
    pub neighbors: IndexSet<ChainId>,
    pub adjacents: IndexSet<Pt>,
    pub liberties: IndexSet<Pt>,
}

pub(super) struct Chains {
    pub id: Vec<ChainId>,
    pub info: Vec<ChainInfo>,
}

pub(super) fn mark_chains(board: &Board, regions: &Regions) -> Chains {
    let mut id = vec![usize::MAX; board.ysize * board.xsize];
    let mut info: Vec<ChainInfo> = Vec::new();

    for start in board.points() {
        if id[board.idx(start)] != usize::MAX {
            continue;
        }

        let color = board.color_at(start);
        let dead = board.is_dead(start);
        let chain_id = info.len();

        let mut points: IndexSet<Pt> = IndexSet::new();
        let mut adjacents: IndexSet<Pt> = IndexSet::new();
        let mut region_id: Option<RegionId> = regions.region_id_at(start, board);
        let mut region_mismatch = false;

        let mut stack = vec![start];
        id[board.idx(start)] = chain_id;

        while let Some(p) = stack.pop() {
            points.insert(p);

            let p_region = regions.region_id_at(p, board);
            if p_region != region_id {
                region_mismatch = true;
            }

            for n in board.neighbors(p) {
                if board.color_at(n) == color && board.is_dead(n) == dead {
                    if id[board.idx(n)] == usize::MAX {
                        id[board.idx(n)] = chain_id;
                        stack.push(n);
                    }
                } else {
                    adjacents.insert(n);
                }
            }
        }

        if region_mismatch {
            region_id = None;
        }

        let liberties: IndexSet<Pt> = adjacents
            .iter()
            .copied()
            .filter(|&p| board.color_at(p).is_empty())
            .collect();

        info.push(ChainInfo {
            color,
            is_marked_dead: dead,
            region_id,
            points,
            neighbors: IndexSet::new(),
            adjacents,
            liberties,
        });
    }

    // second pass: fill neighbor chain ids now that every point has an id.
    for chain_id in 0..info.len() {
        let adjacents: Vec<Pt> = info[chain_id].adjacents.iter().copied().collect();
        let mut neighbors = IndexSet::new();
        for p in adjacents {
            neighbors.insert(id[board.idx(p)]);
        }
        info[chain_id].neighbors = neighbors;
    }

    Chains { id, info }
}
