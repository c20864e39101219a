//! Cutting-stock optimization for construction takeoffs.
//!
//! Two engines share one shape: demand (parts or panels) is grouped by part
//! number and finish, sorted largest first, and packed greedily onto a pool
//! of stock instances (bars or sheets) expanded from the caller's stock list.
//!
//! - [`linear::optimize_bars`] cuts parts from bars, with kerf between cuts.
//! - [`panel::optimize_panels`] nests panels on sheets with a guillotine
//!   packer, optional rotation and a blade-width gap.
//! - [`search`] finds stock sizes for the "auto" modes and [`stock`] turns
//!   those into stock definitions.
//! - [`job`] wraps all of it behind validated JSON job documents.
//!
//! The engines never fail: demand that cannot be placed shows up in the
//! result's `unplaced` list and summary counts.

pub mod config;
pub mod error;
pub mod guillotine;
pub mod job;
pub mod linear;
pub mod panel;
pub mod render;
pub mod search;
pub mod stock;
pub mod types;

pub use config::{LengthRange, OptimizerConfig, SheetRange};
pub use error::{OptimizerError, Result};
pub use job::{BarJob, LengthSearchJob, PanelJob, StockMode};
pub use linear::optimize_bars;
pub use panel::optimize_panels;
pub use search::{find_best_bar_length, find_best_sheet_size, find_optimal_bars_by_part_no};
pub use stock::{create_bars_from_optimal_results, create_sheets_from_optimal_size};
