//! P6: potential-eye enumeration.

use indexmap::IndexSet;

use super::color::Color;
use super::grid::{Board, Pt};
use super::macrochains::MacroChains;
use super::reach::Reach;
use super::regions::Regions;

pub type EyeId = usize;

#[derive(Debug)]
pub struct EyeInfo {
    pub pla: Color,
    pub region_id: super::regions::RegionId,
    pub potential_points: IndexSet<Pt>,
    /// Filled by P8: `potential_points` minus life-and-death false points.
    pub real_points: IndexSet<Pt>,
    pub macrochain_neighbors_from: indexmap::IndexMap<super::macrochains::MacroChainId, IndexSet<Pt>>,
    pub is_loose: bool,
    pub eye_value: u8,
}

pub(super) struct Eyes {
    pub id: Vec<Option<EyeId>>,
    pub info: Vec<EyeInfo>,
}

impl Eyes {
    pub fn eye_id_at(&self, p: Pt, board: &Board) -> Option<EyeId> {
        self.id[board.idx(p)]
    }
}

pub(super) fn mark_potential_eyes(
    board: &Board,
    regions: &mut Regions,
    macrochains: &mut MacroChains,
    reach: &Reach,
) -> Eyes {
    let mut eye_id_grid: Vec<Option<EyeId>> = vec![None; board.ysize * board.xsize];
    let mut info: Vec<EyeInfo> = Vec::new();
    let mut visited = vec![false; board.ysize * board.xsize];

    let is_candidate = |board: &Board, p: Pt| board.color_at(p).is_empty() || board.is_dead(p);

    for start in board.points() {
        if visited[board.idx(start)] {
            continue;
        }
        let region_id = match regions.region_id_at(start, board) {
            Some(r) => r,
            None => continue,
        };
        if !is_candidate(board, start) {
            continue;
        }

        let eye_id = info.len();
        let pla = regions.info[region_id].color;
        let mut potential_points: IndexSet<Pt> = IndexSet::new();
        let mut macrochain_neighbors_from: indexmap::IndexMap<
            super::macrochains::MacroChainId,
            IndexSet<Pt>,
        > = indexmap::IndexMap::new();
        let mut is_loose = false;

        let mut stack = vec![start];
        visited[board.idx(start)] = true;

        while let Some(p) = stack.pop() {
            eye_id_grid[board.idx(p)] = Some(eye_id);
            potential_points.insert(p);

            if reach.strict_reaches(Color::Black, p, board)
                && reach.strict_reaches(Color::White, p, board)
            {
                is_loose = true;
            }

            for n in board.neighbors(p) {
                if let Some(mid) = macrochains.macro_id_at(n, board) {
                    if regions.region_id_at(n, board) == Some(region_id) {
                        macrochain_neighbors_from
                            .entry(mid)
                            .or_default()
                            .insert(p);
                        macrochains.info[mid]
                            .eye_neighbors_from
                            .entry(eye_id)
                            .or_default()
                            .insert(n);
                    }
                }

                if visited[board.idx(n)] {
                    continue;
                }
                if regions.region_id_at(n, board) != Some(region_id) {
                    continue;
                }
                if !is_candidate(board, n) {
                    continue;
                }
                visited[board.idx(n)] = true;
                stack.push(n);
            }
        }

        regions.info[region_id].eyes.push(eye_id);
        info.push(EyeInfo {
            pla,
            region_id,
            potential_points,
            real_points: IndexSet::new(),
            macrochain_neighbors_from,
            is_loose,
            eye_value: 0,
        });
    }

    Eyes {
        id: eye_id_grid,
        info,
    }
}
