//! Guillotine free-rectangle packer for a single sheet.

use serde::{Deserialize, Serialize};

use crate::types::Rect;

/// Tolerance for coordinate comparisons, in inches.
const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy)]
pub struct FreeRect {
    pub x: f64,
    pub y: f64,
    pub rect: Rect,
}

/// A panel position on the sheet, with its dimensions as placed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fit {
    pub rect: Rect,
    pub x: f64,
    pub y: f64,
    pub rotated: bool,
}

#[derive(Debug, Clone)]
pub struct GuillotineBin {
    blade_width: f64,
    pub free_rects: Vec<FreeRect>,
    pub fits: Vec<Fit>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[allow(clippy::enum_variant_names)]
pub enum ScoreStrategy {
    BestAreaFit,
    BestShortSideFit,
    BestLongSideFit,
}

impl ScoreStrategy {
    pub const ALL: [ScoreStrategy; 3] = [
        ScoreStrategy::BestAreaFit,
        ScoreStrategy::BestShortSideFit,
        ScoreStrategy::BestLongSideFit,
    ];
}

#[derive(Debug, Clone, Copy)]
pub struct ScoredPlacement {
    pub free_idx: usize,
    pub rotated: bool,
    pub score: (f64, f64),
}

impl GuillotineBin {
    pub fn new(sheet: Rect, blade_width: f64) -> Self {
        Self {
            blade_width,
            free_rects: vec![FreeRect {
                x: 0.0,
                y: 0.0,
                rect: sheet,
            }],
            fits: Vec::new(),
        }
    }

    pub fn used_area(&self) -> f64 {
        self.fits.iter().map(|f| f.rect.area()).sum()
    }

    /// Best free rectangle for `piece` under `strategy`, lowest score wins.
    /// The unrotated orientation and earlier free rectangles win ties.
    pub fn find_best(
        &self,
        piece: Rect,
        allow_rotate: bool,
        strategy: ScoreStrategy,
    ) -> Option<ScoredPlacement> {
        let mut best: Option<ScoredPlacement> = None;

        let mut consider = |idx: usize, rotated: bool, oriented: Rect, free: Rect| {
            if !fits_with_tolerance(oriented, free) {
                return;
            }
            let score = Self::score(oriented, free, strategy);
            if best.is_none_or(|b| score < b.score) {
                best = Some(ScoredPlacement {
                    free_idx: idx,
                    rotated,
                    score,
                });
            }
        };

        for (idx, free) in self.free_rects.iter().enumerate() {
            consider(idx, false, piece, free.rect);
            if allow_rotate && piece.w != piece.h {
                consider(idx, true, piece.rotated(), free.rect);
            }
        }

        best
    }

    fn score(piece: Rect, free: Rect, strategy: ScoreStrategy) -> (f64, f64) {
        let dw = (free.w - piece.w).max(0.0);
        let dh = (free.h - piece.h).max(0.0);
        let short = dw.min(dh);
        let long = dw.max(dh);
        match strategy {
            ScoreStrategy::BestAreaFit => (free.area() - piece.area(), short),
            ScoreStrategy::BestShortSideFit => (short, long),
            ScoreStrategy::BestLongSideFit => (long, short),
        }
    }

    pub fn place(&mut self, scored: ScoredPlacement, piece: Rect) -> Fit {
        let free = self.free_rects[scored.free_idx];
        let placed = if scored.rotated {
            piece.rotated()
        } else {
            piece
        };

        let fit = Fit {
            rect: placed,
            x: free.x,
            y: free.y,
            rotated: scored.rotated,
        };

        self.free_rects.swap_remove(scored.free_idx);
        self.split(free, placed);
        self.fits.push(fit);
        self.merge_free_rects();

        fit
    }

    /// Splits the leftover of `free` into a right and a bottom remainder, each
    /// one blade width away from the placed panel. The cut runs along the
    /// shorter leftover axis.
    fn split(&mut self, free: FreeRect, placed: Rect) {
        let blade = self.blade_width;
        let right_w = free.rect.w - placed.w - blade;
        let bottom_h = free.rect.h - placed.h - blade;
        let right_x = free.x + placed.w + blade;
        let bottom_y = free.y + placed.h + blade;

        let has_right = right_w > EPSILON;
        let has_bottom = bottom_h > EPSILON;

        if has_right && has_bottom {
            if free.rect.w - placed.w < free.rect.h - placed.h {
                // Horizontal cut: bottom spans the full width.
                self.push_free(right_x, free.y, right_w, placed.h);
                self.push_free(free.x, bottom_y, free.rect.w, bottom_h);
            } else {
                // Vertical cut: right spans the full height.
                self.push_free(right_x, free.y, right_w, free.rect.h);
                self.push_free(free.x, bottom_y, placed.w, bottom_h);
            }
        } else if has_right {
            self.push_free(right_x, free.y, right_w, free.rect.h);
        } else if has_bottom {
            self.push_free(free.x, bottom_y, free.rect.w, bottom_h);
        }
    }

    fn push_free(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.free_rects.push(FreeRect {
            x,
            y,
            rect: Rect::new(w, h),
        });
    }

    fn merge_free_rects(&mut self) {
        let mut merged = true;
        while merged {
            merged = false;
            'outer: for i in 0..self.free_rects.len() {
                for j in (i + 1)..self.free_rects.len() {
                    if let Some(m) = Self::try_merge(self.free_rects[i], self.free_rects[j]) {
                        self.free_rects[i] = m;
                        self.free_rects.swap_remove(j);
                        merged = true;
                        break 'outer;
                    }
                }
            }
        }
    }

    fn try_merge(a: FreeRect, b: FreeRect) -> Option<FreeRect> {
        // Side by side: same row band.
        if close(a.y, b.y) && close(a.rect.h, b.rect.h) {
            let (left, right) = if a.x <= b.x { (a, b) } else { (b, a) };
            if close(left.x + left.rect.w, right.x) {
                return Some(FreeRect {
                    x: left.x,
                    y: left.y,
                    rect: Rect::new(left.rect.w + right.rect.w, left.rect.h),
                });
            }
        }
        // Stacked: same column band.
        if close(a.x, b.x) && close(a.rect.w, b.rect.w) {
            let (top, bottom) = if a.y <= b.y { (a, b) } else { (b, a) };
            if close(top.y + top.rect.h, bottom.y) {
                return Some(FreeRect {
                    x: top.x,
                    y: top.y,
                    rect: Rect::new(top.rect.w, top.rect.h + bottom.rect.h),
                });
            }
        }
        None
    }
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= EPSILON
}

fn fits_with_tolerance(piece: Rect, free: Rect) -> bool {
    piece.w <= free.w + EPSILON && piece.h <= free.h + EPSILON
}
