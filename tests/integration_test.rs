use cutlist_optimizer::render::{render_bar, render_sheet};
use cutlist_optimizer::types::{Bar, Panel, Part, Sheet};
use cutlist_optimizer::{
    BarJob, LengthRange, OptimizerConfig, PanelJob, StockMode, create_bars_from_optimal_results,
    find_best_bar_length, find_optimal_bars_by_part_no, optimize_bars, optimize_panels,
};

#[test]
fn two_long_parts_and_a_short_one_use_three_bars() {
    let parts = vec![Part::new(1, 100.0, 2), Part::new(2, 50.0, 1)];
    let bars = vec![Bar::new(1, 120.0, 10)];

    let result = optimize_bars(&parts, &bars, 0.125);

    assert_eq!(result.summary.total_bars, 3);
    assert_eq!(result.summary.total_parts_placed, 3);
    assert_eq!(result.summary.total_parts_needed, 3);
    assert!(result.unplaced.is_empty());
    let bar_nos: Vec<u32> = result.bars.iter().map(|b| b.bar_no).collect();
    assert_eq!(bar_nos, vec![1, 2, 3]);
    assert!((result.bars[0].waste_percentage - 100.0 * 20.0 / 120.0).abs() < 1e-9);
}

#[test]
fn empty_parts_give_empty_result() {
    let result = optimize_bars(&[], &[Bar::new(1, 240.0, 5)], 0.125);
    assert!(result.cuts.is_empty());
    assert!(result.bars.is_empty());
    assert_eq!(result.summary.total_bars, 0);
    assert_eq!(result.summary.waste_percentage, 0.0);
}

#[test]
fn length_search_respects_longest_part() {
    let range = LengthRange {
        min_length: 120.0,
        ..LengthRange::default()
    };
    let best = find_best_bar_length(&[Part::new(1, 200.0, 1)], &range, 0.125);
    assert!(best.length >= 200.0);
    assert_eq!(best.bars_needed, 1);
}

#[test]
fn auto_flow_synthesizes_bars_per_part_no() {
    let parts = vec![
        Part::new(1, 96.0, 4).with_part_no("W8x31").with_mark("B1"),
        Part::new(2, 150.0, 2).with_part_no("L3x3").with_mark("A1"),
    ];
    let optimal = find_optimal_bars_by_part_no(&parts, &LengthRange::default(), 0.125);
    assert_eq!(optimal.len(), 2);

    let bars = create_bars_from_optimal_results(&[Bar::new(1, 240.0, 2)], &optimal);
    assert_eq!(bars.len(), 3);
    assert_eq!(bars[0].qty, 2);

    let result = optimize_bars(&parts, &bars, 0.125);
    assert!(result.summary.is_complete());
    for bar in &result.bars {
        assert!(bar.cuts.iter().all(|c| c.part_no == bar.part_no || bar.part_no.is_none()));
    }
}

#[test]
fn bar_job_json_round_trip_matches_direct_call() {
    let job: BarJob = serde_json::from_str(
        r#"{
            "parts": [
                {"id": 1, "length": 60, "qty": 3, "markNo": "P1", "partNo": "C6x8.2"},
                {"id": 2, "length": 30.5, "qty": 2, "mark_no": "P2"}
            ],
            "bars": [{"id": 7, "length": 240, "qty": 4}],
            "kerf": 0.25
        }"#,
    )
    .unwrap();
    assert_eq!(job.mode, StockMode::Fixed);

    let from_job = job.run(&OptimizerConfig::default()).unwrap();
    let direct = optimize_bars(&job.parts, &job.bars, 0.25);
    assert_eq!(from_job, direct);

    let json = serde_json::to_value(&from_job).unwrap();
    assert!(json["summary"]["totalPartsPlaced"].is_number());
    assert!(json["bars"][0]["wastePercentage"].is_number());
}

#[test]
fn panel_job_fixed_stock() {
    let job = PanelJob {
        panels: vec![
            Panel::new(1, 24.0, 48.0, 4).with_mark("D1"),
            Panel::new(2, 30.0, 30.0, 2).with_mark("D2"),
        ],
        sheets: vec![Sheet::new(1, 48.0, 96.0, 5)],
        blade_width: Some(0.0),
        ..PanelJob::default()
    };
    let result = job.run(&OptimizerConfig::default()).unwrap();
    assert!(result.summary.is_complete());
    assert_eq!(result.summary.total_sheets, 2);

    let direct = optimize_panels(&job.panels, &job.sheets, 0.0, true);
    assert_eq!(result, direct);
}

#[test]
fn config_defaults_flow_into_jobs() {
    let config = OptimizerConfig::default().with_kerf(1.0);
    let job = BarJob {
        parts: vec![Part::new(1, 60.0, 2)],
        bars: vec![Bar::new(1, 120.0, 2)],
        ..BarJob::default()
    };
    // 60 + 1 + 60 does not fit in 120.
    let result = job.run(&config).unwrap();
    assert_eq!(result.summary.total_bars, 2);
}

#[test]
fn layouts_render_for_results() {
    let bars = optimize_bars(&[Part::new(1, 100.0, 1).with_mark("B1")], &[Bar::new(1, 240.0, 1)], 0.125);
    let strip = render_bar(&bars.bars[0]);
    assert!(strip.contains("B1"));

    let panels = optimize_panels(&[Panel::new(1, 40.0, 80.0, 1).with_mark("S1")], &[Sheet::new(1, 48.0, 96.0, 1)], 0.125, true);
    let sheet = &panels.sheets[0];
    let grid = render_sheet(sheet, &panels.placements_on(sheet));
    assert!(grid.contains("S1"));
}
