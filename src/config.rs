//! Optimizer settings shared by the CLI, the HTTP service and job documents.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{OptimizerError, Result, ensure_non_negative, ensure_positive};

/// Saw kerf for bar cutting, 1/8".
pub const DEFAULT_KERF: f64 = 0.125;

/// Blade width for panel cutting, 1/8".
pub const DEFAULT_BLADE_WIDTH: f64 = 0.125;

/// Quantity given to synthesized stock so that a search never runs out of it.
pub const OPTIMIZATION_QTY: u32 = 1000;

/// Upper bound on the candidate sizes one search range may produce.
pub const MAX_SEARCH_CANDIDATES: usize = 10_000;

/// Upper bound on the unit instances one job may expand its demand or its
/// stock into.
pub const MAX_EXPANDED_UNITS: u64 = 100_000;

/// Mill lengths always tried by the bar length search, in inches.
pub const STANDARD_BAR_LENGTHS: [f64; 7] = [120.0, 144.0, 192.0, 240.0, 288.0, 360.0, 480.0];

/// Stock sheet sizes (width, height) always tried by the sheet size search.
pub const STANDARD_SHEET_SIZES: [(f64, f64); 6] = [
    (48.0, 96.0),
    (48.0, 120.0),
    (48.0, 144.0),
    (60.0, 96.0),
    (60.0, 120.0),
    (60.0, 144.0),
];

/// Arithmetic range of candidate bar lengths.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LengthRange {
    pub min_length: f64,
    pub max_length: f64,
    pub step_size: f64,
}

impl Default for LengthRange {
    fn default() -> Self {
        Self {
            min_length: 120.0,
            max_length: 480.0,
            step_size: 12.0,
        }
    }
}

impl LengthRange {
    pub fn new(min_length: f64, max_length: f64, step_size: f64) -> Self {
        Self {
            min_length,
            max_length,
            step_size,
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure_positive(|| "bar search".into(), "minLength", self.min_length)?;
        ensure_positive(|| "bar search".into(), "maxLength", self.max_length)?;
        ensure_positive(|| "bar search".into(), "stepSize", self.step_size)?;
        if self.max_length < self.min_length {
            return Err(OptimizerError::InvalidRange(format!(
                "maxLength {} is below minLength {}",
                self.max_length, self.min_length
            )));
        }
        let count = step_count(self.min_length, self.max_length, self.step_size);
        if count > MAX_SEARCH_CANDIDATES as f64 {
            return Err(OptimizerError::InvalidRange(format!(
                "stepSize {} gives {count} candidate lengths, limit is {MAX_SEARCH_CANDIDATES}",
                self.step_size
            )));
        }
        Ok(())
    }
}

/// Grid of candidate sheet sizes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SheetRange {
    pub min_width: f64,
    pub max_width: f64,
    pub min_height: f64,
    pub max_height: f64,
    pub step_size: f64,
}

impl Default for SheetRange {
    fn default() -> Self {
        Self {
            min_width: 48.0,
            max_width: 60.0,
            min_height: 96.0,
            max_height: 144.0,
            step_size: 12.0,
        }
    }
}

impl SheetRange {
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("minWidth", self.min_width),
            ("maxWidth", self.max_width),
            ("minHeight", self.min_height),
            ("maxHeight", self.max_height),
            ("stepSize", self.step_size),
        ] {
            ensure_positive(|| "sheet search".into(), field, value)?;
        }
        if self.max_width < self.min_width || self.max_height < self.min_height {
            return Err(OptimizerError::InvalidRange(format!(
                "sheet range {}..{} x {}..{} is inverted",
                self.min_width, self.max_width, self.min_height, self.max_height
            )));
        }
        let count = step_count(self.min_width, self.max_width, self.step_size)
            * step_count(self.min_height, self.max_height, self.step_size);
        if count > MAX_SEARCH_CANDIDATES as f64 {
            return Err(OptimizerError::InvalidRange(format!(
                "stepSize {} gives {count} candidate sheet sizes, limit is {MAX_SEARCH_CANDIDATES}",
                self.step_size
            )));
        }
        Ok(())
    }
}

/// Number of values in `min, min + step, ... <= max`.
fn step_count(min: f64, max: f64, step: f64) -> f64 {
    ((max - min) / step).floor() + 1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OptimizerConfig {
    /// Material lost per cut on a bar.
    pub kerf: f64,
    /// Gap left between adjacent panels on a sheet.
    pub blade_width: f64,
    pub allow_rotation: bool,
    pub bar_search: LengthRange,
    pub sheet_search: SheetRange,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            kerf: DEFAULT_KERF,
            blade_width: DEFAULT_BLADE_WIDTH,
            allow_rotation: true,
            bar_search: LengthRange::default(),
            sheet_search: SheetRange::default(),
        }
    }
}

impl OptimizerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_kerf(mut self, kerf: f64) -> Self {
        self.kerf = kerf;
        self
    }

    pub fn with_blade_width(mut self, blade_width: f64) -> Self {
        self.blade_width = blade_width;
        self
    }

    pub fn with_rotation(mut self, allow_rotation: bool) -> Self {
        self.allow_rotation = allow_rotation;
        self
    }

    pub fn with_bar_search(mut self, range: LengthRange) -> Self {
        self.bar_search = range;
        self
    }

    pub fn with_sheet_search(mut self, range: SheetRange) -> Self {
        self.sheet_search = range;
        self
    }

    /// Reads a JSON config file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| OptimizerError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure_non_negative("kerf", self.kerf)?;
        ensure_non_negative("bladeWidth", self.blade_width)?;
        self.bar_search.validate()?;
        self.sheet_search.validate()
    }
}
