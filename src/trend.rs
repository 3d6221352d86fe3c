use crate::config::TrendConfig;
use crate::render::{format_date, xml_escape};
use crate::types::CaseReport;
use anyhow::{anyhow, Result};
use std::fmt::Write as _;

/// The target state's reports in chronological order, independent of input
/// order. Note this is the opposite sort direction from the latest-value
/// lookup.
pub fn state_series<'a>(reports: &'a [CaseReport], state: &str) -> Vec<&'a CaseReport> {
    let mut series: Vec<&CaseReport> = reports.iter().filter(|r| r.state == state).collect();
    series.sort_by_key(|r| r.date);
    series
}

/// Render the cumulative-cases line chart for the configured state: time
/// axis with one tick per report, linear case axis, basis-smoothed line,
/// and an interactive point per report showing that single day's count.
pub fn render_trend(reports: &[CaseReport], cfg: &TrendConfig) -> Result<String> {
    let series = state_series(reports, &cfg.state);
    if series.is_empty() {
        return Err(anyhow!("No case reports for state '{}'", cfg.state));
    }

    let pad = cfg.padding;
    let (width, height) = (cfg.width, cfg.height);

    let first_day = series[0].date;
    let last_day = series[series.len() - 1].date;
    let day_span = (last_day - first_day).num_days().max(1) as f64;
    let x = |report: &CaseReport| {
        let t = (report.date - first_day).num_days() as f64 / day_span;
        pad + t * (width - 2.0 * pad)
    };

    let min_cases = series.iter().map(|r| r.cases).min().unwrap_or(0) as f64;
    let max_cases = series.iter().map(|r| r.cases).max().unwrap_or(0) as f64;
    let case_span = max_cases - min_cases;
    let y = |cases: f64| {
        let t = if case_span > 0.0 {
            (cases - min_cases) / case_span
        } else {
            0.0
        };
        height - pad - t * (height - 2.0 * pad)
    };

    let mut svg = format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">",
        w = width,
        h = height
    );

    // X axis: baseline plus one dated tick per report, labels rotated so
    // they stay readable when the series grows long.
    let _ = write!(
        svg,
        "<g class=\"x-axis\"><line x1=\"{pad}\" y1=\"{base}\" x2=\"{right}\" y2=\"{base}\" stroke=\"black\"/>",
        pad = pad,
        base = height - pad,
        right = width - pad
    );
    for report in &series {
        let tx = x(report);
        let _ = write!(
            svg,
            "<line x1=\"{tx:.2}\" y1=\"{y0:.2}\" x2=\"{tx:.2}\" y2=\"{y1:.2}\" stroke=\"black\"/>\
             <text transform=\"translate({tx:.2},{ty:.2}) rotate(-65)\" text-anchor=\"end\" font-size=\"10\">{label}</text>",
            y0 = height - pad,
            y1 = height - pad + 10.0,
            ty = height - pad + 14.0,
            label = report.date.format("%m/%d/%y"),
        );
    }
    svg.push_str("</g>");

    // Y axis with ~10 round-valued ticks.
    let _ = write!(
        svg,
        "<g class=\"y-axis\"><line x1=\"{pad}\" y1=\"{top}\" x2=\"{pad}\" y2=\"{base}\" stroke=\"black\"/>",
        pad = pad,
        top = pad,
        base = height - pad
    );
    for tick in ticks(min_cases, max_cases, 10) {
        let ty = y(tick);
        let _ = write!(
            svg,
            "<line x1=\"{x0:.2}\" y1=\"{ty:.2}\" x2=\"{pad}\" y2=\"{ty:.2}\" stroke=\"black\"/>\
             <text x=\"{lx:.2}\" y=\"{ly:.2}\" text-anchor=\"end\" font-size=\"10\">{label}</text>",
            x0 = pad - 6.0,
            lx = pad - 8.0,
            ly = ty + 3.0,
            label = tick as i64,
        );
    }
    svg.push_str("</g>");

    let points: Vec<(f64, f64)> = series.iter().map(|r| (x(r), y(r.cases as f64))).collect();
    let _ = write!(
        svg,
        "<path class=\"line\" d=\"{}\" fill=\"none\" stroke=\"steelblue\" stroke-width=\"1.5\"/>",
        basis_path(&points)
    );

    for (report, (cx, cy)) in series.iter().zip(&points) {
        let _ = write!(
            svg,
            "<circle class=\"dot\" cx=\"{cx:.2}\" cy=\"{cy:.2}\" r=\"5\"><title>{title}</title></circle>",
            title = xml_escape(&format!("{} cases\n{}", report.cases, format_date(report.date))),
        );
    }

    svg.push_str("</svg>");
    Ok(svg)
}

/// Cubic B-spline smoothing for the trend line. Cosmetic only; the
/// interactive points carry the exact values.
fn basis_path(points: &[(f64, f64)]) -> String {
    let mut d = String::new();
    let (mut x0, mut y0, mut x1, mut y1) = (0.0f64, 0.0f64, 0.0f64, 0.0f64);
    let mut seen = 0usize;

    for &(px, py) in points {
        match seen {
            0 => {
                let _ = write!(d, "M{:.2},{:.2}", px, py);
            }
            1 => {}
            2 => {
                let _ = write!(d, "L{:.2},{:.2}", (5.0 * x0 + x1) / 6.0, (5.0 * y0 + y1) / 6.0);
                bezier_to(&mut d, x0, y0, x1, y1, px, py);
            }
            _ => {
                bezier_to(&mut d, x0, y0, x1, y1, px, py);
            }
        }
        seen += 1;
        x0 = x1;
        y0 = y1;
        x1 = px;
        y1 = py;
    }

    // End rule: re-emit the final control point, then run the line to it.
    if seen >= 3 {
        bezier_to(&mut d, x0, y0, x1, y1, x1, y1);
    }
    if seen >= 2 {
        let _ = write!(d, "L{:.2},{:.2}", x1, y1);
    }
    d
}

fn bezier_to(d: &mut String, x0: f64, y0: f64, x1: f64, y1: f64, x: f64, y: f64) {
    let _ = write!(
        d,
        "C{:.2},{:.2},{:.2},{:.2},{:.2},{:.2}",
        (2.0 * x0 + x1) / 3.0,
        (2.0 * y0 + y1) / 3.0,
        (x0 + 2.0 * x1) / 3.0,
        (y0 + 2.0 * y1) / 3.0,
        (x0 + 4.0 * x1 + x) / 6.0,
        (y0 + 4.0 * y1 + y) / 6.0
    );
}

/// Round-valued axis ticks covering [min, max], roughly `count` of them.
fn ticks(min: f64, max: f64, count: usize) -> Vec<f64> {
    let span = max - min;
    if span <= 0.0 {
        return vec![min];
    }
    let step = tick_step(span, count);
    let mut ticks = Vec::new();
    let mut value = (min / step).ceil() * step;
    while value <= max + step * 1e-9 {
        ticks.push(value);
        value += step;
    }
    ticks
}

fn tick_step(span: f64, count: usize) -> f64 {
    let raw = span / count.max(1) as f64;
    let power = 10f64.powf(raw.log10().floor());
    let fraction = raw / power;
    let nice = if fraction <= 1.0 {
        1.0
    } else if fraction <= 2.0 {
        2.0
    } else if fraction <= 5.0 {
        5.0
    } else {
        10.0
    };
    nice * power
}
