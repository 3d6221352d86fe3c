use crate::scale::CaseScale;
use std::fmt::Write;

const SHAPE_WIDTH: f64 = 7.5;
const SHAPE_HEIGHT: f64 = 13.0;

/// One legend swatch: its sampled domain value, ramp color, and label text
/// when the labeling policy selects this cell.
pub struct LegendCell {
    pub value: f64,
    pub color: String,
    pub label: Option<String>,
}

/// Generate legend cells, values spaced linearly across the scale domain.
///
/// Labeling declutters the stack to sparse ticks: cell 0 is labeled "0"
/// (an override; the true domain minimum is 1), the last cell always shows
/// its value, and an interior cell shows its value only when it rounds to a
/// multiple of 10.
pub fn generate(scale: &CaseScale, cells: usize) -> Vec<LegendCell> {
    let (min, max) = scale.domain();
    let step = if cells > 1 {
        (max - min) / (cells - 1) as f64
    } else {
        0.0
    };

    (0..cells)
        .map(|i| {
            let value = min + step * i as f64;
            let rounded = value.round() as i64;
            let label = if i == 0 {
                Some("0".to_string())
            } else if i == cells - 1 {
                Some(format_thousands(rounded))
            } else if rounded % 10 == 0 {
                Some(format_thousands(rounded))
            } else {
                None
            };
            LegendCell {
                value,
                color: scale.color_at(value),
                label,
            }
        })
        .collect()
}

/// Render the cells as a vertical swatch stack, for embedding in an SVG
/// under a translate to the map's lower right.
pub fn to_svg_group(cells: &[LegendCell]) -> String {
    let mut out = String::new();
    for (i, cell) in cells.iter().enumerate() {
        let y = i as f64 * SHAPE_HEIGHT;
        let _ = write!(
            out,
            "<rect x=\"0\" y=\"{y}\" width=\"{SHAPE_WIDTH}\" height=\"{SHAPE_HEIGHT}\" fill=\"{}\"/>",
            cell.color
        );
        if let Some(label) = &cell.label {
            let _ = write!(
                out,
                "<text x=\"{}\" y=\"{:.1}\" font-size=\"10\">{}</text>",
                SHAPE_WIDTH + 4.0,
                y + SHAPE_HEIGHT - 3.0,
                label
            );
        }
    }
    out
}

/// Height of the rendered stack, for positioning.
pub fn stack_height(cells: usize) -> f64 {
    cells as f64 * SHAPE_HEIGHT
}

fn format_thousands(value: i64) -> String {
    let digits = value.abs().to_string();
    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if value < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}
