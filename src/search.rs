//! Stock size searches used by the "auto" modes.
//!
//! Each candidate size is evaluated by running the real packing engine with a
//! single synthetic stock type of effectively unlimited quantity.

use crate::config::{
    LengthRange, OPTIMIZATION_QTY, STANDARD_BAR_LENGTHS, STANDARD_SHEET_SIZES, SheetRange,
};
use crate::linear::{EPSILON, optimize_bars};
use crate::panel::optimize_panels;
use crate::types::{
    Bar, LengthSearchResult, OptimalBar, Panel, Part, Rect, Sheet, SheetSearchResult,
};

/// Finds the bar length in `range` that needs the fewest bars for `parts`,
/// then the least waste. The result is never shorter than the longest part.
pub fn find_best_bar_length(parts: &[Part], range: &LengthRange, kerf: f64) -> LengthSearchResult {
    let longest = parts.iter().map(|p| p.length).fold(0.0_f64, f64::max);
    let min_length = range.min_length.max(longest);

    let mut best: Option<LengthSearchResult> = None;

    for length in candidate_lengths(min_length, range.max_length, range.step_size) {
        let bar = Bar {
            id: 1,
            length,
            qty: OPTIMIZATION_QTY,
            part_no: None,
            description: format!("{length}\" search candidate"),
        };
        let result = optimize_bars(parts, std::slice::from_ref(&bar), kerf);
        if !result.summary.is_complete() {
            continue;
        }

        let bars_needed = result.summary.total_bars;
        let waste_length = bars_needed as f64 * length - result.summary.used_length;
        tracing::trace!(length, bars_needed, waste_length, "bar length candidate");

        let better = best.is_none_or(|b| {
            bars_needed < b.bars_needed || (bars_needed == b.bars_needed && waste_length < b.waste_length)
        });
        if better {
            best = Some(LengthSearchResult {
                length,
                bars_needed,
                waste_length,
            });
        }
    }

    let best = best.unwrap_or_else(|| {
        let length = range.max_length.max(longest);
        tracing::debug!(length, "no candidate length placed every part, using the maximum");
        LengthSearchResult {
            length,
            bars_needed: 0,
            waste_length: 0.0,
        }
    });
    tracing::debug!(length = best.length, bars = best.bars_needed, "best bar length");
    best
}

/// `min, min + step, ... <= max` merged with the standard lengths inside the
/// range, ascending and deduplicated.
pub fn candidate_lengths(min_length: f64, max_length: f64, step_size: f64) -> Vec<f64> {
    let mut candidates = if min_length <= max_length + EPSILON {
        candidate_steps(min_length, max_length, step_size)
    } else {
        Vec::new()
    };

    candidates.extend(
        STANDARD_BAR_LENGTHS
            .iter()
            .copied()
            .filter(|&l| l >= min_length && l <= max_length + EPSILON),
    );

    candidates.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    candidates.dedup_by(|a, b| (*a - *b).abs() <= EPSILON);
    candidates
}

/// Runs [`find_best_bar_length`] once per part number.
///
/// Parts without a part number form a fallback group that is only searched
/// when no part in the input carries a part number.
pub fn find_optimal_bars_by_part_no(parts: &[Part], range: &LengthRange, kerf: f64) -> Vec<OptimalBar> {
    let mut groups: Vec<(&str, Vec<Part>)> = Vec::new();
    for part in parts {
        let key = part.part_no.as_deref().unwrap_or("");
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, members)) => members.push(part.clone()),
            None => groups.push((key, vec![part.clone()])),
        }
    }

    let has_specific = groups.iter().any(|(k, _)| !k.is_empty());

    groups
        .into_iter()
        .filter(|(key, _)| {
            let skip = key.is_empty() && has_specific;
            if skip {
                tracing::debug!("skipping parts without a part number in mixed input");
            }
            !skip
        })
        .map(|(key, members)| {
            let best = find_best_bar_length(&members, range, kerf);
            OptimalBar {
                part_no: (!key.is_empty()).then(|| key.to_string()),
                length: best.length,
            }
        })
        .collect()
}

/// Finds the sheet size in `range` that needs the fewest sheets for
/// `panels`, then the least waste area.
pub fn find_best_sheet_size(
    panels: &[Panel],
    range: &SheetRange,
    blade_width: f64,
    allow_rotation: bool,
) -> SheetSearchResult {
    let mut best: Option<SheetSearchResult> = None;

    for (width, height) in candidate_sheet_sizes(panels, range, allow_rotation) {
        let sheet = Sheet::new(1, width, height, OPTIMIZATION_QTY);
        let result = optimize_panels(panels, std::slice::from_ref(&sheet), blade_width, allow_rotation);
        if !result.summary.is_complete() {
            continue;
        }

        let sheets_needed = result.summary.total_sheets;
        let waste_area = result.summary.total_area - result.summary.used_area;
        tracing::trace!(width, height, sheets_needed, waste_area, "sheet size candidate");

        let better = best.is_none_or(|b| {
            sheets_needed < b.sheets_needed || (sheets_needed == b.sheets_needed && waste_area < b.waste_area)
        });
        if better {
            best = Some(SheetSearchResult {
                width,
                height,
                sheets_needed,
                waste_area,
            });
        }
    }

    best.unwrap_or_else(|| {
        let widest = panels.iter().map(|p| p.width).fold(0.0_f64, f64::max);
        let tallest = panels.iter().map(|p| p.height).fold(0.0_f64, f64::max);
        tracing::debug!("no candidate sheet held every panel, using the maximum size");
        SheetSearchResult {
            width: range.max_width.max(widest),
            height: range.max_height.max(tallest),
            sheets_needed: 0,
            waste_area: 0.0,
        }
    })
}

/// Grid sizes from `range` plus the standard sizes inside it, keeping only
/// sizes every panel fits on. Ordered by area, then width.
pub fn candidate_sheet_sizes(panels: &[Panel], range: &SheetRange, allow_rotation: bool) -> Vec<(f64, f64)> {
    let widths = candidate_steps(range.min_width, range.max_width, range.step_size);
    let heights = candidate_steps(range.min_height, range.max_height, range.step_size);

    let mut sizes: Vec<(f64, f64)> = widths
        .iter()
        .flat_map(|&w| heights.iter().map(move |&h| (w, h)))
        .collect();
    sizes.extend(STANDARD_SHEET_SIZES.iter().copied().filter(|&(w, h)| {
        w + EPSILON >= range.min_width
            && w <= range.max_width + EPSILON
            && h + EPSILON >= range.min_height
            && h <= range.max_height + EPSILON
    }));

    sizes.retain(|&(w, h)| {
        let sheet = Rect::new(w, h);
        panels.iter().all(|p| p.rect().fits_in_any(&sheet, allow_rotation))
    });
    sizes.sort_by(|a, b| {
        (a.0 * a.1, a.0)
            .partial_cmp(&(b.0 * b.1, b.0))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    sizes.dedup_by(|a, b| (a.0 - b.0).abs() <= EPSILON && (a.1 - b.1).abs() <= EPSILON);
    sizes
}

fn candidate_steps(min: f64, max: f64, step: f64) -> Vec<f64> {
    if step <= 0.0 {
        return vec![min];
    }
    (0u32..)
        .map(|i| min + step * f64::from(i))
        .take_while(|&v| v <= max + EPSILON)
        .collect()
}
