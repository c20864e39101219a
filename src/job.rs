//! Job documents: a full optimization request as read from JSON.
//!
//! Jobs validate their input before anything reaches the engines, which do no
//! validation of their own.

use serde::{Deserialize, Serialize};

use crate::config::{LengthRange, MAX_EXPANDED_UNITS, OptimizerConfig, SheetRange};
use crate::error::{OptimizerError, Result, ensure_non_negative, ensure_positive};
use crate::guillotine::ScoreStrategy;
use crate::linear::optimize_bars;
use crate::panel::{optimize_panels, optimize_panels_with_strategy};
use crate::search::{find_best_bar_length, find_best_sheet_size, find_optimal_bars_by_part_no};
use crate::stock::{create_bars_from_optimal_results, create_sheets_from_optimal_size};
use crate::types::{
    Bar, BarOptimizationResult, LengthSearchResult, Panel, PanelOptimizationResult, Part, Sheet,
};

/// How stock sizes are chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockMode {
    /// Use the supplied stock as-is.
    #[default]
    Fixed,
    /// Search for optimal stock sizes and merge them into the supplied stock.
    Auto,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BarJob {
    pub parts: Vec<Part>,
    #[serde(default)]
    pub bars: Vec<Bar>,
    #[serde(default)]
    pub mode: StockMode,
    #[serde(default)]
    pub kerf: Option<f64>,
    #[serde(default)]
    pub search: Option<LengthRange>,
}

impl BarJob {
    pub fn validate(&self) -> Result<()> {
        for part in &self.parts {
            ensure_positive(|| describe("part", part.id, &part.mark_no), "length", part.length)?;
        }
        for bar in &self.bars {
            ensure_positive(|| describe("bar", bar.id, &bar.description), "length", bar.length)?;
        }
        ensure_unit_limit("parts", self.parts.iter().map(|p| p.qty))?;
        ensure_unit_limit("bars", self.bars.iter().map(|b| b.qty))?;
        if let Some(kerf) = self.kerf {
            ensure_non_negative("kerf", kerf)?;
        }
        if let Some(range) = &self.search {
            range.validate()?;
        }
        Ok(())
    }

    pub fn kerf(&self, config: &OptimizerConfig) -> f64 {
        self.kerf.unwrap_or(config.kerf)
    }

    pub fn search_range(&self, config: &OptimizerConfig) -> LengthRange {
        self.search.unwrap_or(config.bar_search)
    }

    /// Stock the engine will run with: the supplied bars, plus the searched
    /// optimal bars in auto mode.
    pub fn stock(&self, config: &OptimizerConfig) -> Vec<Bar> {
        match self.mode {
            StockMode::Fixed => self.bars.clone(),
            StockMode::Auto => {
                let optimal =
                    find_optimal_bars_by_part_no(&self.parts, &self.search_range(config), self.kerf(config));
                create_bars_from_optimal_results(&self.bars, &optimal)
            }
        }
    }

    pub fn run(&self, config: &OptimizerConfig) -> Result<BarOptimizationResult> {
        self.validate()?;
        let bars = self.stock(config);
        let result = optimize_bars(&self.parts, &bars, self.kerf(config));
        tracing::info!(
            mode = ?self.mode,
            bars = result.summary.total_bars,
            placed = result.summary.total_parts_placed,
            needed = result.summary.total_parts_needed,
            waste = result.summary.waste_percentage,
            "bar job finished"
        );
        Ok(result)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelJob {
    pub panels: Vec<Panel>,
    #[serde(default)]
    pub sheets: Vec<Sheet>,
    #[serde(default)]
    pub mode: StockMode,
    #[serde(default, alias = "blade_width")]
    pub blade_width: Option<f64>,
    #[serde(default, alias = "allow_rotation")]
    pub allow_rotation: Option<bool>,
    #[serde(default)]
    pub search: Option<SheetRange>,
    /// Packs with this score strategy only instead of keeping the best of all.
    #[serde(default)]
    pub strategy: Option<ScoreStrategy>,
}

impl PanelJob {
    pub fn validate(&self) -> Result<()> {
        for panel in &self.panels {
            ensure_positive(|| describe("panel", panel.id, &panel.mark_no), "width", panel.width)?;
            ensure_positive(|| describe("panel", panel.id, &panel.mark_no), "height", panel.height)?;
        }
        for sheet in &self.sheets {
            ensure_positive(|| describe("sheet", sheet.id, ""), "width", sheet.width)?;
            ensure_positive(|| describe("sheet", sheet.id, ""), "height", sheet.height)?;
        }
        ensure_unit_limit("panels", self.panels.iter().map(|p| p.qty))?;
        ensure_unit_limit("sheets", self.sheets.iter().map(|s| s.available()))?;
        if let Some(blade_width) = self.blade_width {
            ensure_non_negative("bladeWidth", blade_width)?;
        }
        if let Some(range) = &self.search {
            range.validate()?;
        }
        Ok(())
    }

    pub fn blade_width(&self, config: &OptimizerConfig) -> f64 {
        self.blade_width.unwrap_or(config.blade_width)
    }

    pub fn allow_rotation(&self, config: &OptimizerConfig) -> bool {
        self.allow_rotation.unwrap_or(config.allow_rotation)
    }

    pub fn stock(&self, config: &OptimizerConfig) -> Vec<Sheet> {
        match self.mode {
            StockMode::Fixed => self.sheets.clone(),
            StockMode::Auto => {
                let range = self.search.unwrap_or(config.sheet_search);
                let size = find_best_sheet_size(
                    &self.panels,
                    &range,
                    self.blade_width(config),
                    self.allow_rotation(config),
                );
                tracing::debug!(width = size.width, height = size.height, "best sheet size");
                create_sheets_from_optimal_size(&self.sheets, &size)
            }
        }
    }

    pub fn run(&self, config: &OptimizerConfig) -> Result<PanelOptimizationResult> {
        self.validate()?;
        let sheets = self.stock(config);
        let (blade_width, allow_rotation) = (self.blade_width(config), self.allow_rotation(config));
        let result = match self.strategy {
            Some(strategy) => optimize_panels_with_strategy(
                &self.panels,
                &sheets,
                blade_width,
                allow_rotation,
                strategy,
            ),
            None => optimize_panels(&self.panels, &sheets, blade_width, allow_rotation),
        };
        tracing::info!(
            mode = ?self.mode,
            sheets = result.summary.total_sheets,
            placed = result.summary.total_panels_placed,
            needed = result.summary.total_panels_needed,
            waste = result.summary.waste_percentage,
            "panel job finished"
        );
        Ok(result)
    }
}

/// Standalone bar length search request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LengthSearchJob {
    pub parts: Vec<Part>,
    #[serde(default)]
    pub kerf: Option<f64>,
    #[serde(default)]
    pub search: Option<LengthRange>,
}

impl LengthSearchJob {
    pub fn run(&self, config: &OptimizerConfig) -> Result<LengthSearchResult> {
        let job = BarJob {
            parts: self.parts.clone(),
            kerf: self.kerf,
            search: self.search,
            ..BarJob::default()
        };
        job.validate()?;
        Ok(find_best_bar_length(&job.parts, &job.search_range(config), job.kerf(config)))
    }
}

fn ensure_unit_limit(what: &'static str, quantities: impl Iterator<Item = u32>) -> Result<()> {
    let total: u64 = quantities.map(u64::from).sum();
    if total > MAX_EXPANDED_UNITS {
        return Err(OptimizerError::TooManyUnits {
            what,
            total,
            limit: MAX_EXPANDED_UNITS,
        });
    }
    Ok(())
}

fn describe(kind: &str, id: u32, label: &str) -> String {
    if label.is_empty() {
        format!("{kind} {id}")
    } else {
        format!("{kind} {id} ({label})")
    }
}
