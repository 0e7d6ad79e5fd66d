use arrayvec::ArrayVec;

use super::color::Color;
use super::error::ScoringError;

/// A point on the scoring grid, row-major: `(y, x)`.
pub(super) type Pt = (usize, usize);

/// Flat board representation shared by every pass, mirroring `Goban`'s
/// `Vec<i8>` + `cols`/`rows` flat-storage idiom.
pub(super) struct Board {
    pub color: Vec<Color>,
    pub dead: Vec<bool>,
    pub ysize: usize,
    pub xsize: usize,
}

impl Board {
    pub fn build(stones: &[Vec<Color>], marked_dead: &[Vec<bool>]) -> Result<Self, ScoringError> {
        let ysize = stones.len();
        let xsize = if ysize == 0 { 0 } else { stones[0].len() };

        for (row, r) in stones.iter().enumerate() {
            if r.len() != xsize {
                return Err(ScoringError::RowLengthMismatch {
                    row,
                    expected: xsize,
                    found: r.len(),
                });
            }
        }

        if marked_dead.len() != ysize {
            return Err(ScoringError::DeadGridSizeMismatch {
                expected_rows: ysize,
                found_rows: marked_dead.len(),
            });
        }
        for (row, r) in marked_dead.iter().enumerate() {
            if r.len() != xsize {
                return Err(ScoringError::RowLengthMismatch {
                    row,
                    expected: xsize,
                    found: r.len(),
                });
            }
        }

        let mut color = Vec::with_capacity(ysize * xsize);
        for r in stones {
            color.extend_from_slice(r);
        }
        let mut dead = Vec::with_capacity(ysize * xsize);
        for r in marked_dead {
            dead.extend_from_slice(r);
        }

        Ok(Board {
            color,
            dead,
            ysize,
            xsize,
        })
    }

    #[inline]
    pub fn idx(&self, (y, x): Pt) -> usize {
        y * self.xsize + x
    }

    #[inline]
    pub fn on_board(&self, y: isize, x: isize) -> bool {
        y >= 0 && x >= 0 && (y as usize) < self.ysize && (x as usize) < self.xsize
    }

    #[inline]
    pub fn color_at(&self, p: Pt) -> Color {
        self.color[self.idx(p)]
    }

    #[inline]
    pub fn is_dead(&self, p: Pt) -> bool {
        self.dead[self.idx(p)]
    }

    #[inline]
    pub fn is_living_pla(&self, p: Pt, pla: Color) -> bool {
        self.color_at(p) == pla && !self.is_dead(p)
    }

    pub fn neighbors(&self, (y, x): Pt) -> ArrayVec<Pt, 4> {
        let mut result = ArrayVec::new();
        if y > 0 {
            result.push((y - 1, x));
        }
        if y + 1 < self.ysize {
            result.push((y + 1, x));
        }
        if x > 0 {
            result.push((y, x - 1));
        }
        if x + 1 < self.xsize {
            result.push((y, x + 1));
        }
        result
    }

    /// All points in row-major order — the iteration order every
    /// id-allocation pass walks to keep output deterministic.
    pub fn points(&self) -> impl Iterator<Item = Pt> + '_ {
        let xsize = self.xsize;
        (0..self.ysize).flat_map(move |y| (0..xsize).map(move |x| (y, x)))
    }
}
