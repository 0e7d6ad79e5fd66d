//! P3: region decomposition.

use indexmap::IndexSet;

use super::color::Color;
use super::eyes::EyeId;
use super::grid::{Board, Pt};
use super::reach::Reach;

pub type RegionId = usize;

#[derive(Debug)]
pub struct RegionInfo {
    pub color: Color,
    pub region_and_dame: IndexSet<Pt>,
    pub eyes: Vec<EyeId>,
}

pub(super) struct Regions {
    pub id: Vec<Option<RegionId>>,
    pub info: Vec<RegionInfo>,
}

impl Regions {
    pub fn region_id_at(&self, p: Pt, board: &Board) -> Option<RegionId> {
        self.id[board.idx(p)]
    }
}

pub(super) fn mark_regions(board: &Board, blocks: &[Option<Color>], reach: &Reach) -> Regions {
    let mut id = vec![None; board.ysize * board.xsize];
    let mut info: Vec<RegionInfo> = Vec::new();

    for start in board.points() {
        if id[board.idx(start)].is_some() {
            continue;
        }

        let pla = if reach.reaches(Color::Black, start, board) && !reach.reaches(Color::White, start, board) {
            Color::Black
        } else if reach.reaches(Color::White, start, board) && !reach.reaches(Color::Black, start, board) {
            Color::White
        } else {
            continue;
        };
        let opp = pla.opp();

        let region_id = info.len();
        let mut region_and_dame: IndexSet<Pt> = IndexSet::new();
        let mut visited = vec![false; board.ysize * board.xsize];
        let mut stack = vec![start];
        visited[board.idx(start)] = true;

        while let Some(p) = stack.pop() {
            region_and_dame.insert(p);

            let is_pla_only =
                reach.reaches(pla, p, board) && !reach.reaches(opp, p, board);
            if is_pla_only {
                id[board.idx(p)] = Some(region_id);
            }

            if blocks[board.idx(p)] == Some(opp) {
                // blocker cell: recorded above, but does not propagate.
                continue;
            }

            for n in board.neighbors(p) {
                if board.is_living_pla(n, opp) {
                    continue;
                }
                let ni = board.idx(n);
                if visited[ni] {
                    continue;
                }
                visited[ni] = true;
                stack.push(n);
            }
        }

        info.push(RegionInfo {
            color: pla,
            region_and_dame,
            eyes: Vec::new(),
        });
    }

    Regions { id, info }
}
