//! Panel nesting onto stock sheets.
//!
//! Mirrors the linear engine: panels are grouped by `(part_no, finish)` in
//! first-occurrence order and sorted by area, largest first. The largest
//! remaining panel opens the smallest sheet it fits on; the sheet is then
//! filled with a guillotine packer by scanning the rest of the queue in order.
//! The run is repeated once per [`ScoreStrategy`] and the best outcome kept.

use std::collections::HashSet;

use crate::guillotine::{GuillotineBin, ScoreStrategy};
use crate::types::{
    CutSheet, Panel, PanelOptimizationResult, PanelSummary, Placement, Sheet, UnplacedItem,
    waste_percent,
};

const NO_PART_NO: &str = "NO_PART_NO";
const NO_FINISH: &str = "NO_FINISH";

#[derive(Debug, Clone, Copy)]
struct PoolSheet<'a> {
    sheet: &'a Sheet,
    sheet_no: u32,
}

#[derive(Debug, Clone)]
struct PanelGroup<'a> {
    key: (&'a str, &'a str),
    queue: Vec<&'a Panel>,
}

/// Packs `panels` onto `sheets`, trying every score strategy and keeping the
/// result that places the most panels, then uses the fewest sheets, then
/// wastes the least area.
pub fn optimize_panels(
    panels: &[Panel],
    sheets: &[Sheet],
    blade_width: f64,
    allow_rotation: bool,
) -> PanelOptimizationResult {
    let mut best: Option<PanelOptimizationResult> = None;

    for strategy in ScoreStrategy::ALL {
        let result =
            optimize_panels_with_strategy(panels, sheets, blade_width, allow_rotation, strategy);
        tracing::trace!(
            ?strategy,
            sheets = result.summary.total_sheets,
            placed = result.summary.total_panels_placed,
            "strategy finished"
        );
        if best.as_ref().is_none_or(|b| is_better(&result.summary, &b.summary)) {
            best = Some(result);
        }
    }

    best.unwrap_or_default()
}

fn is_better(candidate: &PanelSummary, current: &PanelSummary) -> bool {
    if candidate.total_panels_placed != current.total_panels_placed {
        return candidate.total_panels_placed > current.total_panels_placed;
    }
    if candidate.total_sheets != current.total_sheets {
        return candidate.total_sheets < current.total_sheets;
    }
    let candidate_waste = candidate.total_area - candidate.used_area;
    let current_waste = current.total_area - current.used_area;
    candidate_waste < current_waste
}

/// Single pass of the panel engine under one score strategy.
pub fn optimize_panels_with_strategy(
    panels: &[Panel],
    sheets: &[Sheet],
    blade_width: f64,
    allow_rotation: bool,
    strategy: ScoreStrategy,
) -> PanelOptimizationResult {
    let mut pool = expand_pool(sheets);
    let total_panels_needed: u32 = panels.iter().map(|p| p.qty).sum();

    let mut placements: Vec<Placement> = Vec::new();
    let mut cut_sheets: Vec<CutSheet> = Vec::new();
    let mut leftovers: Vec<&Panel> = Vec::new();

    for group in group_panels(panels) {
        tracing::debug!(
            part_no = group.key.0,
            finish = group.key.1,
            panels = group.queue.len(),
            ?strategy,
            "packing panel group"
        );
        let mut queue = group.queue;

        while let Some(&head) = queue.first() {
            let Some(idx) = select_sheet(&pool, head, allow_rotation) else {
                tracing::debug!(
                    part_no = group.key.0,
                    width = head.width,
                    height = head.height,
                    unplaced = queue.len(),
                    "no sheet can hold the largest remaining panel"
                );
                break;
            };
            let stock = pool.remove(idx);
            let mut bin = GuillotineBin::new(stock.sheet.rect(), blade_width);
            let mut rest = Vec::with_capacity(queue.len());

            for &panel in &queue {
                match bin.find_best(panel.rect(), allow_rotation, strategy) {
                    Some(scored) => {
                        let fit = bin.place(scored, panel.rect());
                        placements.push(Placement {
                            panel_id: panel.id,
                            sheet_id: stock.sheet.id,
                            sheet_no: stock.sheet_no,
                            x: fit.x,
                            y: fit.y,
                            width: fit.rect.w,
                            height: fit.rect.h,
                            rotated: fit.rotated,
                            mark: panel.mark_no.clone(),
                        });
                    }
                    None => rest.push(panel),
                }
            }

            let sheet_area = stock.sheet.rect().area();
            let used_area = bin.used_area();
            cut_sheets.push(CutSheet {
                sheet_id: stock.sheet.id,
                sheet_no: stock.sheet_no,
                width: stock.sheet.width,
                height: stock.sheet.height,
                used_area,
                waste_percentage: waste_percent(sheet_area, used_area),
            });
            queue = rest;
        }

        leftovers.extend(queue);
    }

    let summary = summarize(&cut_sheets, placements.len() as u32, total_panels_needed);
    PanelOptimizationResult {
        placements,
        sheets: cut_sheets,
        summary,
        unplaced: collect_unplaced(panels, &leftovers),
    }
}

fn expand_pool(sheets: &[Sheet]) -> Vec<PoolSheet<'_>> {
    sheets
        .iter()
        .flat_map(|sheet| (1..=sheet.available()).map(move |sheet_no| PoolSheet { sheet, sheet_no }))
        .collect()
}

fn group_panels(panels: &[Panel]) -> Vec<PanelGroup<'_>> {
    let mut groups: Vec<PanelGroup<'_>> = Vec::new();

    for panel in panels {
        let key = (
            panel.part_no.as_deref().unwrap_or(NO_PART_NO),
            panel.finish.as_deref().unwrap_or(NO_FINISH),
        );
        let idx = match groups.iter().position(|g| g.key == key) {
            Some(i) => i,
            None => {
                groups.push(PanelGroup {
                    key,
                    queue: Vec::new(),
                });
                groups.len() - 1
            }
        };
        groups[idx]
            .queue
            .extend(std::iter::repeat_n(panel, panel.qty as usize));
    }

    for group in &mut groups {
        group.queue.sort_by(|a, b| {
            b.rect()
                .area()
                .partial_cmp(&a.rect().area())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    }

    groups
}

/// Smallest-area pool sheet that can hold `panel`, ties by pool order.
fn select_sheet(pool: &[PoolSheet<'_>], panel: &Panel, allow_rotation: bool) -> Option<usize> {
    let piece = panel.rect();
    let mut best: Option<(usize, f64)> = None;

    for (idx, entry) in pool.iter().enumerate() {
        let sheet = entry.sheet.rect();
        if !piece.fits_in_any(&sheet, allow_rotation) {
            continue;
        }
        if best.is_none_or(|(_, area)| sheet.area() < area) {
            best = Some((idx, sheet.area()));
        }
    }

    best.map(|(idx, _)| idx)
}

fn summarize(sheets: &[CutSheet], placed: u32, needed: u32) -> PanelSummary {
    let total_area: f64 = sheets.iter().map(|s| s.width * s.height).sum();
    let used_area: f64 = sheets.iter().map(|s| s.used_area).sum();
    let sheet_types_used = sheets.iter().map(|s| s.sheet_id).collect::<HashSet<_>>().len();

    PanelSummary {
        total_sheets: sheets.len(),
        total_area,
        used_area,
        waste_percentage: waste_percent(total_area, used_area),
        total_panels_placed: placed,
        total_panels_needed: needed,
        sheet_types_used,
    }
}

fn collect_unplaced(panels: &[Panel], leftovers: &[&Panel]) -> Vec<UnplacedItem> {
    panels
        .iter()
        .filter_map(|panel| {
            let qty = leftovers.iter().filter(|p| std::ptr::eq(**p, panel)).count() as u32;
            (qty > 0).then(|| UnplacedItem {
                id: panel.id,
                mark_no: panel.mark_no.clone(),
                qty,
            })
        })
        .collect()
}
