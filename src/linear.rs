//! Greedy first-fit-decreasing allocation of linear parts onto stock bars.
//!
//! Parts are grouped by `(part_no, finish)` in first-occurrence order. Each
//! group is sorted longest first; the longest remaining part opens the best
//! fitting bar from the shared pool and the rest of the queue is scanned in
//! order to fill what is left of that bar.

use std::collections::HashSet;

use crate::types::{
    Bar, BarCut, BarOptimizationResult, BarSummary, CutBar, Part, UnplacedItem, waste_percent,
};

const NO_PART_NO: &str = "NO_PART_NO";
const NO_FINISH: &str = "NO_FINISH";

/// Tolerance for length comparisons.
pub(crate) const EPSILON: f64 = 1e-9;

/// One available bar instance.
#[derive(Debug, Clone, Copy)]
struct PoolBar<'a> {
    bar: &'a Bar,
    bar_no: u32,
}

#[derive(Debug)]
struct PartGroup<'a> {
    key: (&'a str, &'a str),
    part_no: Option<&'a str>,
    queue: Vec<&'a Part>,
}

/// Runs the linear optimizer. Never fails: parts that cannot be placed are
/// listed in `unplaced` and counted in the summary.
pub fn optimize_bars(parts: &[Part], bars: &[Bar], kerf: f64) -> BarOptimizationResult {
    let mut pool = expand_pool(bars);
    let groups = group_parts(parts);
    let total_parts_needed: u32 = parts.iter().map(|p| p.qty).sum();

    let mut cut_bars: Vec<CutBar> = Vec::new();
    let mut leftovers: Vec<&Part> = Vec::new();

    for group in groups {
        tracing::debug!(
            part_no = group.key.0,
            finish = group.key.1,
            parts = group.queue.len(),
            "packing part group"
        );
        let mut queue = group.queue;

        while let Some(&head) = queue.first() {
            let Some(idx) = select_bar(&pool, head.length, group.part_no) else {
                tracing::debug!(
                    part_no = group.key.0,
                    length = head.length,
                    unplaced = queue.len(),
                    "no bar can hold the longest remaining part"
                );
                break;
            };
            let stock = pool.remove(idx);
            let (cut_bar, rest) = fill_bar(stock, &queue, kerf);
            cut_bars.push(cut_bar);
            queue = rest;
        }

        leftovers.extend(queue);
    }

    let cuts: Vec<BarCut> = cut_bars.iter().flat_map(|b| b.cuts.iter().cloned()).collect();
    let summary = summarize(&cut_bars, cuts.len() as u32, total_parts_needed);

    BarOptimizationResult {
        cuts,
        bars: cut_bars,
        summary,
        unplaced: collect_unplaced(parts, &leftovers),
    }
}

fn expand_pool(bars: &[Bar]) -> Vec<PoolBar<'_>> {
    bars.iter()
        .flat_map(|bar| (1..=bar.qty).map(move |bar_no| PoolBar { bar, bar_no }))
        .collect()
}

fn group_parts(parts: &[Part]) -> Vec<PartGroup<'_>> {
    let mut groups: Vec<PartGroup<'_>> = Vec::new();

    for part in parts {
        let key = (
            part.part_no.as_deref().unwrap_or(NO_PART_NO),
            part.finish.as_deref().unwrap_or(NO_FINISH),
        );
        let idx = match groups.iter().position(|g| g.key == key) {
            Some(i) => i,
            None => {
                groups.push(PartGroup {
                    key,
                    part_no: part.part_no.as_deref(),
                    queue: Vec::new(),
                });
                groups.len() - 1
            }
        };
        groups[idx]
            .queue
            .extend(std::iter::repeat_n(part, part.qty as usize));
    }

    for group in &mut groups {
        // Stable: equal lengths keep input order.
        group
            .queue
            .sort_by(|a, b| b.length.partial_cmp(&a.length).unwrap_or(std::cmp::Ordering::Equal));
    }

    groups
}

/// Picks the pool entry for a part of `length` in a group keyed by `part_no`.
///
/// Bars restricted to the group's part number beat universal bars; within the
/// same preference the shortest bar wins, then pool order.
fn select_bar(pool: &[PoolBar<'_>], length: f64, part_no: Option<&str>) -> Option<usize> {
    let mut best: Option<(usize, bool, f64)> = None;

    for (idx, entry) in pool.iter().enumerate() {
        if entry.bar.length + EPSILON < length {
            continue;
        }
        let exact = match entry.bar.part_no.as_deref() {
            None => false,
            Some(bar_part_no) if Some(bar_part_no) == part_no => true,
            Some(_) => continue,
        };

        let better = match best {
            None => true,
            Some((_, best_exact, best_len)) => {
                (exact && !best_exact) || (exact == best_exact && entry.bar.length < best_len)
            }
        };
        if better {
            best = Some((idx, exact, entry.bar.length));
        }
    }

    best.map(|(idx, _, _)| idx)
}

/// Places the queue head at position 0, then every later part that still fits
/// after one kerf. Returns the cut bar and the parts left over, in order.
fn fill_bar<'a>(stock: PoolBar<'_>, queue: &[&'a Part], kerf: f64) -> (CutBar, Vec<&'a Part>) {
    let bar = stock.bar;
    let mut cuts = Vec::new();
    let mut rest = Vec::with_capacity(queue.len());

    let head = queue[0];
    cuts.push(make_cut(head, stock, 0.0));
    let mut cursor = head.length;
    let mut remaining = bar.length - head.length;

    for &part in &queue[1..] {
        if part.length + kerf <= remaining + EPSILON {
            let position = cursor + kerf;
            cuts.push(make_cut(part, stock, position));
            cursor = position + part.length;
            remaining -= kerf + part.length;
        } else {
            rest.push(part);
        }
    }

    let remaining = remaining.max(0.0);
    let cut_bar = CutBar {
        bar_id: bar.id,
        bar_no: stock.bar_no,
        length: bar.length,
        used_length: bar.length - remaining,
        waste_percentage: if bar.length > 0.0 {
            remaining / bar.length * 100.0
        } else {
            0.0
        },
        cuts,
        part_no: bar.part_no.clone(),
        description: bar.description.clone(),
    };
    (cut_bar, rest)
}

fn make_cut(part: &Part, stock: PoolBar<'_>, position: f64) -> BarCut {
    BarCut {
        part_id: part.id,
        bar_id: stock.bar.id,
        bar_no: stock.bar_no,
        position,
        length: part.length,
        mark_no: part.mark_no.clone(),
        finish: part.finish.clone(),
        fab: part.fab.clone(),
        part_no: part.part_no.clone(),
    }
}

fn summarize(bars: &[CutBar], placed: u32, needed: u32) -> BarSummary {
    let total_length: f64 = bars.iter().map(|b| b.length).sum();
    let used_length: f64 = bars.iter().map(|b| b.used_length).sum();
    let bar_types_used = bars.iter().map(|b| b.bar_id).collect::<HashSet<_>>().len();

    BarSummary {
        total_bars: bars.len(),
        total_length,
        used_length,
        waste_percentage: waste_percent(total_length, used_length),
        total_parts_placed: placed,
        total_parts_needed: needed,
        bar_types_used,
    }
}

/// Aggregates leftover unit instances back into one entry per input part.
fn collect_unplaced(parts: &[Part], leftovers: &[&Part]) -> Vec<UnplacedItem> {
    let mut unplaced: Vec<UnplacedItem> = Vec::new();
    for part in parts {
        let qty = leftovers.iter().filter(|p| std::ptr::eq(**p, part)).count() as u32;
        if qty > 0 {
            unplaced.push(UnplacedItem {
                id: part.id,
                mark_no: part.mark_no.clone(),
                qty,
            });
        }
    }
    unplaced
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const KERF: f64 = 0.125;

    fn assert_result_valid(result: &BarOptimizationResult, kerf: f64) {
        for bar in &result.bars {
            let mut cuts = bar.cuts.clone();
            cuts.sort_by(|a, b| a.position.partial_cmp(&b.position).unwrap());
            for pair in cuts.windows(2) {
                assert!(
                    pair[0].position + pair[0].length + kerf <= pair[1].position + 1e-9,
                    "bar {}#{}: cut at {} overlaps cut at {}",
                    bar.bar_id,
                    bar.bar_no,
                    pair[0].position,
                    pair[1].position
                );
            }
            if let Some(last) = cuts.last() {
                assert!(last.position + last.length <= bar.length + 1e-9);
            }
            assert!(bar.used_length <= bar.length + 1e-9);
            assert!((0.0..=100.0).contains(&bar.waste_percentage));
        }
        assert_eq!(result.summary.total_bars, result.bars.len());
        assert_eq!(result.summary.total_parts_placed as usize, result.cuts.len());
    }

    #[test]
    fn test_empty_parts() {
        let result = optimize_bars(&[], &[Bar::new(1, 240.0, 5)], KERF);
        assert!(result.cuts.is_empty());
        assert!(result.bars.is_empty());
        assert_eq!(result.summary.total_bars, 0);
        assert_eq!(result.summary.waste_percentage, 0.0);
        assert!(result.unplaced.is_empty());
    }

    #[test]
    fn test_two_long_parts_and_a_short_one() {
        let parts = vec![Part::new(1, 100.0, 2), Part::new(2, 50.0, 1)];
        let bars = vec![Bar::new(1, 120.0, 10)];
        let result = optimize_bars(&parts, &bars, KERF);

        assert_result_valid(&result, KERF);
        assert_eq!(result.summary.total_bars, 3);
        assert_eq!(result.summary.total_parts_placed, 3);
        assert_eq!(result.summary.total_parts_needed, 3);
        assert!((result.bars[0].waste_percentage - 16.6667).abs() < 1e-3);
        assert_eq!(result.bars[2].cuts[0].part_id, 2);
        let bar_nos: Vec<u32> = result.bars.iter().map(|b| b.bar_no).collect();
        assert_eq!(bar_nos, vec![1, 2, 3]);
    }

    #[test]
    fn test_kerf_between_cuts_not_after_last() {
        // 60 + 0.125 + 59.875 = 120 exactly.
        let parts = vec![Part::new(1, 60.0, 1), Part::new(2, 59.875, 1)];
        let result = optimize_bars(&parts, &[Bar::new(1, 120.0, 1)], KERF);
        assert_result_valid(&result, KERF);
        assert_eq!(result.bars.len(), 1);
        assert_eq!(result.bars[0].cuts[1].position, 60.125);
        assert!(result.bars[0].waste_percentage.abs() < 1e-9);
    }

    #[test]
    fn test_queue_scanned_in_order_after_head() {
        // Head 70 leaves 50: 60 is skipped, 45 and 3 fill the bar, 60 opens the next one.
        let parts = vec![
            Part::new(1, 70.0, 1),
            Part::new(2, 60.0, 1),
            Part::new(3, 45.0, 1),
            Part::new(4, 3.0, 1),
        ];
        let result = optimize_bars(&parts, &[Bar::new(1, 120.0, 2)], 1.0);
        assert_result_valid(&result, 1.0);
        let first: Vec<u32> = result.bars[0].cuts.iter().map(|c| c.part_id).collect();
        assert_eq!(first, vec![1, 3, 4]);
        assert!((result.bars[0].used_length - 120.0).abs() < 1e-9);
        assert_eq!(result.bars[1].cuts[0].part_id, 2);
        assert_eq!(result.bars.len(), 2);
    }

    #[test]
    fn test_prefers_matching_part_no_over_universal() {
        let parts = vec![Part::new(1, 90.0, 1).with_part_no("HSS-4")];
        let bars = vec![
            Bar::new(1, 120.0, 1),
            Bar::new(2, 240.0, 1).with_part_no("HSS-4"),
        ];
        let result = optimize_bars(&parts, &bars, KERF);
        assert_eq!(result.bars[0].bar_id, 2);
        assert_eq!(result.bars[0].part_no.as_deref(), Some("HSS-4"));
    }

    #[test]
    fn test_restricted_bars_ignored_by_other_groups() {
        let parts = vec![Part::new(1, 90.0, 1)];
        let bars = vec![Bar::new(1, 240.0, 3).with_part_no("HSS-4")];
        let result = optimize_bars(&parts, &bars, KERF);
        assert!(result.bars.is_empty());
        assert_eq!(result.summary.total_parts_placed, 0);
        assert_eq!(result.summary.total_parts_needed, 1);
        assert_eq!(result.unplaced[0].id, 1);
    }

    #[rstest]
    #[case(vec![144.0, 120.0, 240.0], 120.0)]
    #[case(vec![240.0, 144.0], 144.0)]
    #[case(vec![240.0], 240.0)]
    fn test_smallest_fitting_bar_selected(#[case] lengths: Vec<f64>, #[case] expected: f64) {
        let bars: Vec<Bar> = lengths
            .iter()
            .enumerate()
            .map(|(i, &len)| Bar::new(i as u32 + 1, len, 1))
            .collect();
        let result = optimize_bars(&[Part::new(1, 100.0, 1)], &bars, KERF);
        assert_eq!(result.bars[0].length, expected);
    }

    #[test]
    fn test_equal_bars_use_pool_order() {
        let bars = vec![Bar::new(7, 120.0, 2), Bar::new(3, 120.0, 2)];
        let result = optimize_bars(&[Part::new(1, 100.0, 3)], &bars, KERF);
        let used: Vec<(u32, u32)> = result.bars.iter().map(|b| (b.bar_id, b.bar_no)).collect();
        assert_eq!(used, vec![(7, 1), (7, 2), (3, 1)]);
        assert_eq!(result.summary.bar_types_used, 2);
    }

    #[test]
    fn test_pool_exhaustion_reports_unplaced() {
        let parts = vec![Part::new(1, 100.0, 3).with_mark("C1")];
        let result = optimize_bars(&parts, &[Bar::new(1, 120.0, 2)], KERF);
        assert_eq!(result.summary.total_parts_placed, 2);
        assert_eq!(result.summary.total_parts_needed, 3);
        assert!(!result.summary.is_complete());
        assert_eq!(
            result.unplaced,
            vec![UnplacedItem {
                id: 1,
                mark_no: "C1".into(),
                qty: 1
            }]
        );
    }

    #[test]
    fn test_longest_part_too_long_stops_group() {
        let parts = vec![Part::new(1, 300.0, 1), Part::new(2, 10.0, 1)];
        let result = optimize_bars(&parts, &[Bar::new(1, 120.0, 5)], KERF);
        assert!(result.bars.is_empty());
        assert_eq!(result.unplaced.len(), 2);
    }

    #[test]
    fn test_groups_do_not_share_bars() {
        let parts = vec![
            Part::new(1, 40.0, 1).with_finish("GALV"),
            Part::new(2, 40.0, 1).with_finish("PAINT"),
        ];
        let result = optimize_bars(&parts, &[Bar::new(1, 240.0, 5)], KERF);
        assert_eq!(result.bars.len(), 2);
        assert_eq!(result.bars[0].cuts[0].finish.as_deref(), Some("GALV"));
        assert_eq!(result.bars[1].cuts[0].finish.as_deref(), Some("PAINT"));
    }

    #[test]
    fn test_group_order_follows_first_occurrence() {
        let parts = vec![
            Part::new(1, 10.0, 1).with_part_no("Z"),
            Part::new(2, 10.0, 1).with_part_no("A"),
            Part::new(3, 10.0, 1).with_part_no("Z"),
        ];
        let result = optimize_bars(&parts, &[Bar::new(1, 120.0, 5)], KERF);
        assert_eq!(result.bars.len(), 2);
        assert_eq!(result.bars[0].cuts.len(), 2);
        assert_eq!(result.bars[0].cuts[0].part_no.as_deref(), Some("Z"));
        assert_eq!(result.bars[1].cuts[0].part_no.as_deref(), Some("A"));
    }

    #[test]
    fn test_summary_totals() {
        let parts = vec![Part::new(1, 50.0, 5)];
        let result = optimize_bars(&parts, &[Bar::new(1, 120.0, 10)], KERF);
        assert_result_valid(&result, KERF);
        let total: f64 = result.bars.iter().map(|b| b.length).sum();
        let used: f64 = result.bars.iter().map(|b| b.used_length).sum();
        assert_eq!(result.summary.total_length, total);
        assert!((result.summary.used_length - used).abs() < 1e-9);
        let expected = 100.0 * (1.0 - used / total);
        assert!((result.summary.waste_percentage - expected).abs() < 1e-9);
        assert!((result.summary.yield_percentage() + result.summary.waste_percentage - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_deterministic() {
        let parts = vec![
            Part::new(1, 37.5, 4).with_part_no("L2x2"),
            Part::new(2, 81.25, 3),
            Part::new(3, 12.0, 7).with_part_no("L2x2"),
        ];
        let bars = vec![Bar::new(1, 144.0, 20), Bar::new(2, 96.0, 20)];
        assert_eq!(optimize_bars(&parts, &bars, KERF), optimize_bars(&parts, &bars, KERF));
    }
}
