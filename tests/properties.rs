use cutlist_optimizer::types::{Bar, Panel, Part, Sheet};
use cutlist_optimizer::{LengthRange, find_best_bar_length, optimize_bars, optimize_panels};
use proptest::prelude::*;

const TOL: f64 = 1e-6;

/// Lengths on a 1/8" grid, up to `max_eighths / 8` inches.
fn parts_strategy(max_eighths: u32) -> impl Strategy<Value = Vec<Part>> {
    prop::collection::vec((8u32..max_eighths, 1u32..4, 0usize..3), 1..10).prop_map(|specs| {
        specs
            .into_iter()
            .zip(1u32..)
            .map(|((eighths, qty, group), id)| {
                let part = Part::new(id, eighths as f64 / 8.0, qty);
                match group {
                    0 => part,
                    1 => part.with_part_no("W8x31"),
                    _ => part.with_part_no("HSS4x4"),
                }
            })
            .collect()
    })
}

fn panels_strategy() -> impl Strategy<Value = Vec<Panel>> {
    prop::collection::vec((4u32..70, 4u32..110, 1u32..4), 1..8).prop_map(|specs| {
        specs
            .into_iter()
            .zip(1u32..)
            .map(|((w, h, qty), id)| Panel::new(id, w as f64, h as f64, qty))
            .collect()
    })
}

fn stock_bars() -> Vec<Bar> {
    vec![
        Bar::new(1, 240.0, 6),
        Bar::new(2, 144.0, 4).with_part_no("W8x31"),
        Bar::new(3, 288.0, 2).with_part_no("HSS4x4"),
    ]
}

fn stock_sheets() -> Vec<Sheet> {
    vec![Sheet::new(1, 48.0, 96.0, 4), Sheet::new(2, 60.0, 120.0, 2)]
}

proptest! {
    #[test]
    fn bar_cuts_stay_apart_and_inside(parts in parts_strategy(2400), kerf in 0u32..4) {
        let kerf = kerf as f64 / 8.0;
        let result = optimize_bars(&parts, &stock_bars(), kerf);

        for bar in &result.bars {
            prop_assert!(!bar.cuts.is_empty());
            prop_assert_eq!(bar.cuts[0].position, 0.0);
            for pair in bar.cuts.windows(2) {
                prop_assert!(pair[0].position + pair[0].length + kerf <= pair[1].position + TOL);
            }
            let last = &bar.cuts[bar.cuts.len() - 1];
            prop_assert!(last.position + last.length <= bar.length + TOL);
            prop_assert!(bar.used_length <= bar.length + TOL);
            prop_assert!((0.0..=100.0).contains(&bar.waste_percentage));
        }
    }

    #[test]
    fn bar_summary_accounts_for_every_part(parts in parts_strategy(2400)) {
        let result = optimize_bars(&parts, &stock_bars(), 0.125);
        let summary = &result.summary;
        let unplaced: u32 = result.unplaced.iter().map(|u| u.qty).sum();

        prop_assert_eq!(summary.total_bars, result.bars.len());
        prop_assert_eq!(summary.total_parts_placed as usize, result.cuts.len());
        prop_assert_eq!(summary.total_parts_placed + unplaced, summary.total_parts_needed);
        prop_assert!(summary.used_length <= summary.total_length + TOL);
        prop_assert!((0.0..=100.0).contains(&summary.waste_percentage));
    }

    #[test]
    fn restricted_bars_only_hold_their_part_no(parts in parts_strategy(2400)) {
        let result = optimize_bars(&parts, &stock_bars(), 0.125);
        for bar in &result.bars {
            if let Some(part_no) = &bar.part_no {
                prop_assert!(bar.cuts.iter().all(|c| c.part_no.as_ref() == Some(part_no)));
            }
        }
    }

    #[test]
    fn bar_runs_are_deterministic(parts in parts_strategy(2400)) {
        let first = optimize_bars(&parts, &stock_bars(), 0.125);
        let second = optimize_bars(&parts, &stock_bars(), 0.125);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn searched_length_holds_longest_part(parts in parts_strategy(4800)) {
        let longest = parts.iter().map(|p| p.length).fold(0.0, f64::max);
        let best = find_best_bar_length(&parts, &LengthRange::default(), 0.125);
        prop_assert!(best.length + TOL >= longest);
        if best.bars_needed > 0 {
            let bar = Bar::new(1, best.length, 1000);
            let check = optimize_bars(&parts, &[bar], 0.125);
            prop_assert!(check.summary.is_complete());
            prop_assert_eq!(check.summary.total_bars, best.bars_needed);
        }
    }

    #[test]
    fn panel_placements_stay_inside_and_apart(panels in panels_strategy(), rotate in any::<bool>()) {
        let result = optimize_panels(&panels, &stock_sheets(), 0.125, rotate);

        for sheet in &result.sheets {
            let on_sheet = result.placements_on(sheet);
            prop_assert!(!on_sheet.is_empty());
            for p in &on_sheet {
                prop_assert!(p.x >= 0.0 && p.y >= 0.0);
                prop_assert!(p.x + p.width <= sheet.width + TOL);
                prop_assert!(p.y + p.height <= sheet.height + TOL);
                prop_assert!(rotate || !p.rotated);
            }
            for (i, a) in on_sheet.iter().enumerate() {
                for b in &on_sheet[i + 1..] {
                    let apart = a.x + a.width <= b.x + TOL
                        || b.x + b.width <= a.x + TOL
                        || a.y + a.height <= b.y + TOL
                        || b.y + b.height <= a.y + TOL;
                    prop_assert!(apart, "{:?} overlaps {:?}", a, b);
                }
            }
        }

        let unplaced: u32 = result.unplaced.iter().map(|u| u.qty).sum();
        prop_assert_eq!(result.summary.total_panels_placed as usize, result.placements.len());
        prop_assert_eq!(result.summary.total_panels_placed + unplaced, result.summary.total_panels_needed);
    }
}
