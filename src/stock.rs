//! Turns search results into stock definitions the engines can consume.

use std::collections::HashSet;

use crate::config::OPTIMIZATION_QTY;
use crate::linear::EPSILON;
use crate::types::{Bar, OptimalBar, Sheet, SheetSearchResult};

/// Merges `results` into `default_bars`.
///
/// A bar that already has the result's length and part number is raised to at
/// least [`OPTIMIZATION_QTY`]; anything else is appended with that quantity
/// and the next free id.
pub fn create_bars_from_optimal_results(default_bars: &[Bar], results: &[OptimalBar]) -> Vec<Bar> {
    let mut bars = default_bars.to_vec();

    for result in results {
        let existing = bars
            .iter_mut()
            .find(|b| (b.length - result.length).abs() <= EPSILON && b.part_no == result.part_no);

        match existing {
            Some(bar) => bar.qty = bar.qty.max(OPTIMIZATION_QTY),
            None => {
                let id = next_id(bars.iter().map(|b| b.id));
                let description = match &result.part_no {
                    Some(part_no) => format!("Optimal {}\" bar for {part_no}", result.length),
                    None => format!("Optimal {}\" bar", result.length),
                };
                tracing::debug!(id, length = result.length, part_no = ?result.part_no, "adding optimal bar");
                bars.push(Bar {
                    id,
                    length: result.length,
                    qty: OPTIMIZATION_QTY,
                    part_no: result.part_no.clone(),
                    description,
                });
            }
        }
    }

    bars
}

/// Sheet counterpart of [`create_bars_from_optimal_results`], keyed by size.
pub fn create_sheets_from_optimal_size(default_sheets: &[Sheet], size: &SheetSearchResult) -> Vec<Sheet> {
    let mut sheets = default_sheets.to_vec();

    let existing = sheets.iter_mut().find(|s| {
        (s.width - size.width).abs() <= EPSILON && (s.height - size.height).abs() <= EPSILON
    });

    match existing {
        Some(sheet) => {
            sheet.qty = sheet.qty.max(OPTIMIZATION_QTY);
            sheet.max_qty = sheet.max_qty.map(|cap| cap.max(OPTIMIZATION_QTY));
        }
        None => {
            let id = next_id(sheets.iter().map(|s| s.id));
            sheets.push(Sheet::new(id, size.width, size.height, OPTIMIZATION_QTY));
        }
    }

    sheets
}

/// One past the highest id in use, or the lowest free id once the highest
/// is `u32::MAX`.
fn next_id(ids: impl Iterator<Item = u32> + Clone) -> u32 {
    match ids.clone().max() {
        None => 1,
        Some(max) => max.checked_add(1).unwrap_or_else(|| {
            let used: HashSet<u32> = ids.collect();
            (1..=u32::MAX).find(|id| !used.contains(id)).unwrap_or(0)
        }),
    }
}
