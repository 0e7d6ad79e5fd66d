//! P5: macro-chain unification.

use indexmap::{IndexMap, IndexSet};

use super::chains::{ChainId, Chains};
use super::color::Color;
use super::eyes::EyeId;
use super::grid::{Board, Pt};
use super::regions::RegionId;

pub type MacroChainId = usize;

#[derive(Debug)]
pub struct MacroChainInfo {
    pub color: Color,
    pub region_id: RegionId,
    pub points: IndexSet<Pt>,
    pub chains: Vec<ChainId>,
    pub eye_neighbors_from: IndexMap<EyeId, IndexSet<Pt>>,
}

pub(super) struct MacroChains {
    pub id: Vec<Option<MacroChainId>>,
    pub info: Vec<MacroChainInfo>,
}

impl MacroChains {
    pub fn macro_id_at(&self, p: Pt, board: &Board) -> Option<MacroChainId> {
        self.id[board.idx(p)]
    }
}

/// Unions each living chain with the region-less corridors that connect it
/// to other same-color living chains. Black's macro-chains are built before
/// White's, so a contested dame cell that both colors could absorb ends up
/// claimed by White in the `id` grid — the same last-writer-wins rule P1
/// uses for connection blocks.
pub(super) fn mark_macrochains(
    board: &Board,
    blocks: &[Option<Color>],
    chains: &Chains,
) -> MacroChains {
    let mut id: Vec<Option<MacroChainId>> = vec![None; board.ysize * board.xsize];
    let mut info: Vec<MacroChainInfo> = Vec::new();
    let mut chain_absorbed = vec![false; chains.info.len()];

    for pla in [Color::Black, Color::White] {
        for start in board.points() {
            let start_chain = chains.id[board.idx(start)];
            if chain_absorbed[start_chain] {
                continue;
            }
            let color = chains.info[start_chain].color;
            if color != pla || chains.info[start_chain].is_marked_dead {
                continue;
            }
            let region_id = match chains.info[start_chain].region_id {
                Some(r) => r,
                None => continue,
            };

            let macro_id = info.len();
            let mut points: IndexSet<Pt> = IndexSet::new();
            let mut member_chains: Vec<ChainId> = Vec::new();
            let mut seen_chains: IndexSet<ChainId> = IndexSet::new();

            let mut stack = vec![start];
            let mut local_visited: IndexSet<Pt> = IndexSet::new();
            local_visited.insert(start);

            while let Some(p) = stack.pop() {
                let p_chain = chains.id[board.idx(p)];
                let p_is_living_pla = chains.info[p_chain].color == color
                    && !chains.info[p_chain].is_marked_dead;

                if p_is_living_pla {
                    points.insert(p);
                    id[board.idx(p)] = Some(macro_id);
                    if seen_chains.insert(p_chain) {
                        chain_absorbed[p_chain] = true;
                        member_chains.push(p_chain);
                    }
                }

                for n in board.neighbors(p) {
                    if local_visited.contains(&n) {
                        continue;
                    }
                    let n_chain = chains.id[board.idx(n)];
                    let is_living_pla = chains.info[n_chain].color == color
                        && !chains.info[n_chain].is_marked_dead;
                    let is_corridor = chains.info[n_chain].region_id.is_none()
                        && blocks[board.idx(n)] != Some(color.opp());
                    if is_living_pla || is_corridor {
                        local_visited.insert(n);
                        stack.push(n);
                    }
                }
            }

            info.push(MacroChainInfo {
                color,
                region_id,
                points,
                chains: member_chains,
                eye_neighbors_from: IndexMap::new(),
            });
        }
    }

    MacroChains { id, info }
}
