use serde::{Deserialize, Deserializer, Serialize, de};

/// Width/height pair in inches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub fn new(w: f64, h: f64) -> Self {
        Self { w, h }
    }

    pub fn area(&self) -> f64 {
        self.w * self.h
    }

    pub fn rotated(&self) -> Self {
        Self {
            w: self.h,
            h: self.w,
        }
    }

    pub fn fits_in(&self, other: &Rect) -> bool {
        self.w <= other.w && self.h <= other.h
    }

    /// True if `self` fits in `other` as-is, or turned when `allow_rotate` is set.
    pub fn fits_in_any(&self, other: &Rect, allow_rotate: bool) -> bool {
        self.fits_in(other) || (allow_rotate && self.rotated().fits_in(other))
    }
}

impl std::fmt::Display for Rect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.w, self.h)
    }
}

/// Accepts any JSON number that holds a non-negative whole value (`3` or `3.0`).
pub fn deserialize_u32_from_number<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    whole_u32(f64::deserialize(deserializer)?)
}

/// [`deserialize_u32_from_number`] for optional fields; `null` stays `None`.
pub fn deserialize_optional_u32_from_number<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<f64>::deserialize(deserializer)?.map(whole_u32).transpose()
}

fn whole_u32<E: de::Error>(value: f64) -> Result<u32, E> {
    if !value.is_finite() || value < 0.0 || value.fract() != 0.0 || value > u32::MAX as f64 {
        return Err(E::custom(format!(
            "expected a non-negative whole number, got {value}"
        )));
    }
    Ok(value as u32)
}

fn default_qty() -> u32 {
    1
}

/// One line of linear demand. `qty` is expanded into unit instances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    pub id: u32,
    #[serde(default, alias = "part_no")]
    pub part_no: Option<String>,
    pub length: f64,
    #[serde(default, alias = "mark_no")]
    pub mark_no: String,
    #[serde(default)]
    pub finish: Option<String>,
    #[serde(default)]
    pub fab: Option<String>,
    #[serde(default = "default_qty", deserialize_with = "deserialize_u32_from_number")]
    pub qty: u32,
}

impl Part {
    pub fn new(id: u32, length: f64, qty: u32) -> Self {
        Self {
            id,
            part_no: None,
            length,
            mark_no: String::new(),
            finish: None,
            fab: None,
            qty,
        }
    }

    pub fn with_part_no(mut self, part_no: impl Into<String>) -> Self {
        self.part_no = Some(part_no.into());
        self
    }

    pub fn with_mark(mut self, mark_no: impl Into<String>) -> Self {
        self.mark_no = mark_no.into();
        self
    }

    pub fn with_finish(mut self, finish: impl Into<String>) -> Self {
        self.finish = Some(finish.into());
        self
    }
}

/// A stock bar definition. Without `part_no` it serves any part group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bar {
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    pub id: u32,
    pub length: f64,
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    pub qty: u32,
    #[serde(default, alias = "part_no")]
    pub part_no: Option<String>,
    #[serde(default)]
    pub description: String,
}

impl Bar {
    pub fn new(id: u32, length: f64, qty: u32) -> Self {
        Self {
            id,
            length,
            qty,
            part_no: None,
            description: String::new(),
        }
    }

    pub fn with_part_no(mut self, part_no: impl Into<String>) -> Self {
        self.part_no = Some(part_no.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BarCut {
    pub part_id: u32,
    pub bar_id: u32,
    pub bar_no: u32,
    pub position: f64,
    pub length: f64,
    pub mark_no: String,
    pub finish: Option<String>,
    pub fab: Option<String>,
    pub part_no: Option<String>,
}

/// A single consumed bar instance and the cuts placed on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CutBar {
    pub bar_id: u32,
    pub bar_no: u32,
    pub length: f64,
    pub used_length: f64,
    pub waste_percentage: f64,
    pub cuts: Vec<BarCut>,
    pub part_no: Option<String>,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BarSummary {
    pub total_bars: usize,
    pub total_length: f64,
    pub used_length: f64,
    pub waste_percentage: f64,
    pub total_parts_placed: u32,
    pub total_parts_needed: u32,
    pub bar_types_used: usize,
}

impl BarSummary {
    pub fn yield_percentage(&self) -> f64 {
        100.0 - self.waste_percentage
    }

    pub fn is_complete(&self) -> bool {
        self.total_parts_placed == self.total_parts_needed
    }
}

/// Demand that could not be placed, aggregated per input line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnplacedItem {
    pub id: u32,
    pub mark_no: String,
    pub qty: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BarOptimizationResult {
    pub cuts: Vec<BarCut>,
    pub bars: Vec<CutBar>,
    pub summary: BarSummary,
    pub unplaced: Vec<UnplacedItem>,
}

/// Winning candidate of a bar length search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LengthSearchResult {
    pub length: f64,
    pub bars_needed: usize,
    pub waste_length: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimalBar {
    pub part_no: Option<String>,
    pub length: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Panel {
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    pub id: u32,
    #[serde(default = "default_qty", deserialize_with = "deserialize_u32_from_number")]
    pub qty: u32,
    #[serde(default, alias = "part_no")]
    pub part_no: Option<String>,
    pub width: f64,
    pub height: f64,
    #[serde(default, alias = "mark_no")]
    pub mark_no: String,
    #[serde(default)]
    pub finish: Option<String>,
}

impl Panel {
    pub fn new(id: u32, width: f64, height: f64, qty: u32) -> Self {
        Self {
            id,
            qty,
            part_no: None,
            width,
            height,
            mark_no: String::new(),
            finish: None,
        }
    }

    pub fn with_mark(mut self, mark_no: impl Into<String>) -> Self {
        self.mark_no = mark_no.into();
        self
    }

    pub fn with_part_no(mut self, part_no: impl Into<String>) -> Self {
        self.part_no = Some(part_no.into());
        self
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.width, self.height)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sheet {
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    pub id: u32,
    pub width: f64,
    pub height: f64,
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    pub qty: u32,
    #[serde(
        default,
        alias = "max_qty",
        deserialize_with = "deserialize_optional_u32_from_number"
    )]
    pub max_qty: Option<u32>,
}

impl Sheet {
    pub fn new(id: u32, width: f64, height: f64, qty: u32) -> Self {
        Self {
            id,
            width,
            height,
            qty,
            max_qty: None,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.width, self.height)
    }

    /// Number of instances this definition contributes to a run.
    pub fn available(&self) -> u32 {
        self.max_qty.map_or(self.qty, |cap| self.qty.min(cap))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    pub panel_id: u32,
    pub sheet_id: u32,
    pub sheet_no: u32,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub rotated: bool,
    pub mark: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CutSheet {
    pub sheet_id: u32,
    pub sheet_no: u32,
    pub width: f64,
    pub height: f64,
    pub used_area: f64,
    pub waste_percentage: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelSummary {
    pub total_sheets: usize,
    pub total_area: f64,
    pub used_area: f64,
    pub waste_percentage: f64,
    pub total_panels_placed: u32,
    pub total_panels_needed: u32,
    pub sheet_types_used: usize,
}

impl PanelSummary {
    pub fn yield_percentage(&self) -> f64 {
        100.0 - self.waste_percentage
    }

    pub fn is_complete(&self) -> bool {
        self.total_panels_placed == self.total_panels_needed
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelOptimizationResult {
    pub placements: Vec<Placement>,
    pub sheets: Vec<CutSheet>,
    pub summary: PanelSummary,
    pub unplaced: Vec<UnplacedItem>,
}

impl PanelOptimizationResult {
    /// Placements on one consumed sheet instance.
    pub fn placements_on(&self, sheet: &CutSheet) -> Vec<&Placement> {
        self.placements
            .iter()
            .filter(|p| p.sheet_id == sheet.sheet_id && p.sheet_no == sheet.sheet_no)
            .collect()
    }
}

/// Winning candidate of a sheet size search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetSearchResult {
    pub width: f64,
    pub height: f64,
    pub sheets_needed: usize,
    pub waste_area: f64,
}

/// Waste share of `total` left after `used`, in percent. Zero when `total` is zero.
pub(crate) fn waste_percent(total: f64, used: f64) -> f64 {
    if total > 0.0 {
        (total - used) / total * 100.0
    } else {
        0.0
    }
}
