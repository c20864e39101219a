//! ASCII layouts for terminal output.

use crate::types::{CutBar, CutSheet, Placement};

const MAX_WIDTH: f64 = 80.0;
const MAX_HEIGHT: f64 = 40.0;

/// Draws a cut bar as a single scaled strip. Cuts are `=` runs separated by
/// `|`, labelled with their mark where there is room; offcut is `.`.
pub fn render_bar(bar: &CutBar) -> String {
    if bar.length <= 0.0 {
        return String::new();
    }
    let scale = MAX_WIDTH / bar.length;
    let cols = MAX_WIDTH as usize;
    let mut strip = vec!['.'; cols];

    for cut in &bar.cuts {
        let start = ((cut.position * scale).round() as usize).min(cols);
        let end = (((cut.position + cut.length) * scale).round() as usize).clamp(start, cols);
        if start == end {
            continue;
        }
        for cell in &mut strip[start..end] {
            *cell = '=';
        }
        strip[start] = '|';
        write_label(&mut strip[start + 1..end], &cut.mark_no);
    }

    let mut out = String::with_capacity(cols + 2);
    out.push('[');
    out.extend(strip);
    out.push(']');
    out.push('\n');
    out
}

/// Centers `label` inside `cells`, leaving it out if it does not fit.
fn write_label(cells: &mut [char], label: &str) {
    let chars: Vec<char> = label.chars().collect();
    if chars.is_empty() || chars.len() > cells.len() {
        return;
    }
    let start = (cells.len() - chars.len()) / 2;
    cells[start..start + chars.len()].copy_from_slice(&chars);
}

/// Draws a sheet and its placements as boxes, labelled with each mark (or the
/// placed size when the mark is empty).
pub fn render_sheet(sheet: &CutSheet, placements: &[&Placement]) -> String {
    if sheet.width <= 0.0 || sheet.height <= 0.0 {
        return String::new();
    }
    let scale = f64::min(MAX_WIDTH / sheet.width, MAX_HEIGHT / sheet.height);
    let grid_w = (sheet.width * scale).round() as usize;
    let grid_h = (sheet.height * scale).round() as usize;

    if grid_w == 0 || grid_h == 0 {
        return String::new();
    }

    let mut grid = vec![vec![' '; grid_w + 1]; grid_h + 1];

    draw_rect(&mut grid, 0, 0, grid_w, grid_h);

    for p in placements {
        let sx = (p.x * scale).round() as usize;
        let sy = (p.y * scale).round() as usize;
        let sw = (p.width * scale).round() as usize;
        let sh = (p.height * scale).round() as usize;

        if sw == 0 || sh == 0 {
            continue;
        }

        draw_rect(&mut grid, sx, sy, sw, sh);

        let label = if p.mark.is_empty() {
            format!("{}x{}", p.width, p.height)
        } else {
            p.mark.clone()
        };
        let label_chars: Vec<char> = label.chars().collect();

        if sw > 2 && sh > 0 {
            let cx = sx + sw / 2;
            let cy = sy + sh / 2;
            let start_x = cx.saturating_sub(label_chars.len() / 2);

            for (i, &ch) in label_chars.iter().enumerate() {
                let x = start_x + i;
                if x > sx && x < sx + sw && cy > sy && cy < sy + sh {
                    grid[cy][x] = ch;
                }
            }
        }
    }

    let mut result = String::new();
    for row in &grid {
        let line: String = row.iter().collect();
        result.push_str(line.trim_end());
        result.push('\n');
    }
    result
}

fn edge(current: char, along: char, across: char) -> char {
    if current == across || current == '+' {
        '+'
    } else {
        along
    }
}

fn draw_rect(grid: &mut [Vec<char>], x: usize, y: usize, w: usize, h: usize) {
    let rows = grid.len();
    let cols = match grid.first() {
        Some(row) => row.len(),
        None => return,
    };

    for i in x..=(x + w).min(cols - 1) {
        for j in [y, y + h] {
            if j < rows {
                grid[j][i] = edge(grid[j][i], '-', '|');
            }
        }
    }

    for j in y..=(y + h).min(rows - 1) {
        for i in [x, x + w] {
            if i < cols {
                grid[j][i] = edge(grid[j][i], '|', '-');
            }
        }
    }

    for cx in [x, x + w] {
        for cy in [y, y + h] {
            if cy < rows && cx < cols {
                grid[cy][cx] = '+';
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BarCut;

    fn sheet(width: f64, height: f64) -> CutSheet {
        CutSheet {
            sheet_id: 1,
            sheet_no: 1,
            width,
            height,
            used_area: 0.0,
            waste_percentage: 100.0,
        }
    }

    fn placement(x: f64, y: f64, width: f64, height: f64, mark: &str) -> Placement {
        Placement {
            panel_id: 1,
            sheet_id: 1,
            sheet_no: 1,
            x,
            y,
            width,
            height,
            rotated: false,
            mark: mark.to_string(),
        }
    }

    fn cut(position: f64, length: f64, mark: &str) -> BarCut {
        BarCut {
            part_id: 1,
            bar_id: 1,
            bar_no: 1,
            position,
            length,
            mark_no: mark.to_string(),
            finish: None,
            fab: None,
            part_no: None,
        }
    }

    #[test]
    fn test_render_single_panel() {
        let p = placement(0.0, 0.0, 96.0, 48.0, "");
        let output = render_sheet(&sheet(96.0, 48.0), &[&p]);
        assert!(output.contains('+'));
        assert!(output.contains('-'));
        assert!(output.contains('|'));
        assert!(output.contains("96x48"));
    }

    #[test]
    fn test_render_marks() {
        let a = placement(0.0, 0.0, 48.0, 96.0, "W-101");
        let b = placement(48.0, 0.0, 48.0, 96.0, "W-102");
        let output = render_sheet(&sheet(96.0, 96.0), &[&a, &b]);
        assert!(output.contains("W-101"));
        assert!(output.contains("W-102"));
    }

    #[test]
    fn test_render_empty_sheet() {
        let output = render_sheet(&sheet(48.0, 96.0), &[]);
        assert!(output.contains('+'));
    }

    #[test]
    fn test_render_bar() {
        let bar = CutBar {
            bar_id: 1,
            bar_no: 1,
            length: 240.0,
            used_length: 180.125,
            waste_percentage: 24.9,
            cuts: vec![cut(0.0, 120.0, "B12"), cut(120.125, 60.0, "B7")],
            part_no: None,
            description: String::new(),
        };
        let output = render_bar(&bar);
        assert!(output.starts_with("[|"));
        assert!(output.trim_end().ends_with(".]"));
        assert!(output.contains("B12"));
        assert!(output.contains("B7"));
        assert_eq!(output.trim_end().chars().count(), 82);
    }
}
