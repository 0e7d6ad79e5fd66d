//! Territory and area scoring for a finished (or paused) game position.
//!
//! The pipeline runs nine passes over the board, each in its own submodule,
//! every one of them deterministic and re-run from scratch per call — there
//! is no incremental update path, matching how the rest of this crate treats
//! `Goban` as a value rather than a mutation log.

mod chains;
mod color;
mod error;
mod eye_value;
mod eyes;
mod false_eyes;
mod grid;
mod macrochains;
mod patterns;
mod reach;
mod regions;
mod synth;

pub use color::{Color, ColorScore};
pub use error::ScoringError;
pub use synth::LocScore;

use grid::Board;

/// Builds a `stones` grid (row-major, `Color`) from a live `Goban`, for
/// callers bridging into the scoring pipeline.
pub fn color_grid_from_goban(goban: &crate::goban::Goban) -> Vec<Vec<Color>> {
    let cols = goban.cols() as usize;
    let rows = goban.rows() as usize;
    let mut out = vec![vec![Color::Empty; cols]; rows];
    for y in 0..rows {
        for x in 0..cols {
            out[y][x] = match goban.stone_at((x as u8, y as u8)) {
                Some(s) => Color::from(s),
                None => Color::Empty,
            };
        }
    }
    out
}

/// Builds a `marked_dead` grid (row-major) from a live `Goban` and a
/// `(col, row)`-keyed set of dead points.
pub fn dead_grid_from_points(
    goban: &crate::goban::Goban,
    dead_stones: &std::collections::HashSet<crate::Point>,
) -> Vec<Vec<bool>> {
    let cols = goban.cols() as usize;
    let rows = goban.rows() as usize;
    let mut out = vec![vec![false; cols]; rows];
    for &(x, y) in dead_stones {
        out[y as usize][x as usize] = true;
    }
    out
}

fn run_passes(
    stones: &[Vec<Color>],
    marked_dead: &[Vec<bool>],
) -> Result<(Board, regions::Regions, chains::Chains, reach::Reach, eyes::Eyes, Vec<bool>, Vec<bool>), ScoringError>
{
    let board = Board::build(stones, marked_dead)?;

    let blocks = patterns::mark_connection_blocks(&board);
    let reach = reach::mark_reachability(&board, &blocks);
    let mut regions = regions::mark_regions(&board, &blocks, &reach);
    let chains = chains::mark_chains(&board, &regions);
    let mut macrochains = macrochains::mark_macrochains(&board, &blocks, &chains);
    let mut eyes = eyes::mark_potential_eyes(&board, &mut regions, &mut macrochains, &reach);

    let false_ld1 =
        false_eyes::mark_false_eye_points(&board, &regions, &eyes, &macrochains, |_| 0u8);
    eye_value::mark_eye_values(&board, &mut eyes, &false_ld1);
    let false_ld2 = false_eyes::mark_false_eye_points(&board, &regions, &eyes, &macrochains, |eid| {
        eyes.info[eid].eye_value
    });

    Ok((board, regions, chains, reach, eyes, false_ld1, false_ld2))
}

/// Runs the full nine-pass pipeline and returns a per-intersection judgement
/// grid, row-major like the input `stones` grid.
///
/// `score_false_eyes`, when false, withholds territory credit for points
/// behind an unscorable false eye (matching conservative Chinese-rules
/// scoring); when true, such points still count as territory.
pub fn territory_scoring(
    stones: &[Vec<Color>],
    marked_dead: &[Vec<bool>],
    score_false_eyes: bool,
) -> Result<Vec<Vec<LocScore>>, ScoringError> {
    let (board, regions, chains, reach, eyes, false_ld1, false_ld2) =
        run_passes(stones, marked_dead)?;

    let flat = synth::synth_scores(
        &board,
        &regions,
        &chains,
        &reach,
        &eyes,
        &false_ld1,
        &false_ld2,
        score_false_eyes,
    );

    let mut out = Vec::with_capacity(board.ysize);
    let mut it = flat.into_iter();
    for _ in 0..board.ysize {
        out.push(it.by_ref().take(board.xsize).collect());
    }
    Ok(out)
}

/// Simpler area-scoring collaborator: a cell belongs to a color if that
/// color alone strictly reaches it (no connection-block logic involved).
pub fn area_scoring(
    stones: &[Vec<Color>],
    marked_dead: &[Vec<bool>],
) -> Result<Vec<Vec<Color>>, ScoringError> {
    let board = Board::build(stones, marked_dead)?;
    let blocks = patterns::mark_connection_blocks(&board);
    let reach = reach::mark_reachability(&board, &blocks);
    Ok(synth::area_grid(&board, &reach))
}

/// Final territory-rules score: territory-for counts, plus a prisoner point
/// per dead stone left on the board for the opponent, plus supplied captures
/// and komi.
pub fn final_territory_score(
    stones: &[Vec<Color>],
    marked_dead: &[Vec<bool>],
    black_captures: f64,
    white_captures: f64,
    komi: f64,
    score_false_eyes: bool,
) -> Result<ColorScore, ScoringError> {
    let grid = territory_scoring(stones, marked_dead, score_false_eyes)?;

    let mut black = black_captures;
    let mut white = white_captures + komi;

    for (y, row) in grid.iter().enumerate() {
        for (x, loc) in row.iter().enumerate() {
            match loc.is_territory_for {
                Color::Black => black += 1.0,
                Color::White => white += 1.0,
                Color::Empty => {}
            }
            if marked_dead[y][x] {
                match stones[y][x] {
                    Color::Black => white += 1.0,
                    Color::White => black += 1.0,
                    Color::Empty => {}
                }
            }
        }
    }

    Ok(ColorScore { black, white })
}

/// Final area-rules score: stone count plus strictly-reached empty points,
/// plus komi.
pub fn final_area_score(
    stones: &[Vec<Color>],
    marked_dead: &[Vec<bool>],
    komi: f64,
) -> Result<ColorScore, ScoringError> {
    let grid = area_scoring(stones, marked_dead)?;

    let mut black = 0.0;
    let mut white = komi;

    for row in &grid {
        for &c in row {
            match c {
                Color::Black => black += 1.0,
                Color::White => white += 1.0,
                Color::Empty => {}
            }
        }
    }

    Ok(ColorScore { black, white })
}
