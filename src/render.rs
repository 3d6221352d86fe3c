use crate::config::{MapConfig, OutputConfig};
use crate::index::CaseIndex;
use crate::legend;
use crate::scale::CaseScale;
use crate::types::{CaseReport, Region};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use geo::algorithm::bounding_rect::BoundingRect;
use geo::MultiPolygon;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// Which feed a map renders; decides tooltip wording and stroke styling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MapLevel {
    County,
    State,
}

/// Uniform scale-and-translate fitting data coordinates into the viewport.
///
/// The upstream US topology is pre-projected to a 960x600 plane with y
/// increasing downward, so at the default viewport this is the identity.
/// Invertible so the server can map a pointer position back to data space.
#[derive(Debug, Clone, Copy)]
pub struct Fit {
    scale: f64,
    tx: f64,
    ty: f64,
}

impl Fit {
    pub fn compute(regions: &[Region], width: f64, height: f64) -> Self {
        let mut min_x = f64::INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut max_y = f64::NEG_INFINITY;

        for region in regions {
            if let Some(rect) = region.geometry.bounding_rect() {
                min_x = min_x.min(rect.min().x);
                min_y = min_y.min(rect.min().y);
                max_x = max_x.max(rect.max().x);
                max_y = max_y.max(rect.max().y);
            }
        }

        if !min_x.is_finite() || max_x <= min_x || max_y <= min_y {
            return Self { scale: 1.0, tx: 0.0, ty: 0.0 };
        }

        let scale = (width / (max_x - min_x)).min(height / (max_y - min_y));
        Self {
            scale,
            tx: -min_x * scale,
            ty: -min_y * scale,
        }
    }

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (x * self.scale + self.tx, y * self.scale + self.ty)
    }

    pub fn invert(&self, px: f64, py: f64) -> (f64, f64) {
        ((px - self.tx) / self.scale, (py - self.ty) / self.scale)
    }
}

/// Render one choropleth SVG: a path per region filled by its latest case
/// count, an optional outline layer, the legend stack, and a <title>
/// tooltip per shape.
pub fn render_choropleth(
    regions: &[Region],
    outlines: Option<&[Region]>,
    index: &CaseIndex,
    scale: &CaseScale,
    cfg: &MapConfig,
    level: MapLevel,
) -> String {
    let fit = Fit::compute(regions, cfg.width, cfg.height);

    let mut svg = format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">",
        w = cfg.width,
        h = cfg.height
    );

    let group_class = match level {
        MapLevel::County => "counties",
        MapLevel::State => "states",
    };
    let _ = write!(svg, "<g class=\"{}\">", group_class);

    for region in regions {
        let latest = index.latest(region.id);
        let fill = latest
            .and_then(|r| scale.color(r.cases))
            .unwrap_or_else(|| cfg.no_data_fill.clone());

        let stroke = match level {
            MapLevel::County => "",
            MapLevel::State => " stroke=\"black\"",
        };

        let _ = write!(
            svg,
            "<path class=\"{}\" d=\"{}\" fill=\"{}\"{}>",
            match level {
                MapLevel::County => "county",
                MapLevel::State => "state-outline",
            },
            region_path(&region.geometry, &fit),
            fill,
            stroke
        );

        match (latest, level) {
            (Some(report), _) => {
                let _ = write!(svg, "<title>{}</title>", xml_escape(&tooltip_text(report, level)));
            }
            (None, MapLevel::State) => {
                svg.push_str("<title>No cases reported yet</title>");
            }
            (None, MapLevel::County) => {}
        }
        svg.push_str("</path>");
    }
    svg.push_str("</g>");

    if let Some(outlines) = outlines {
        svg.push_str("<g id=\"state-borders\" fill=\"none\" stroke=\"black\">");
        for region in outlines {
            let _ = write!(svg, "<path d=\"{}\"/>", region_path(&region.geometry, &fit));
        }
        svg.push_str("</g>");
    }

    let cells = legend::generate(scale, cfg.legend_cells);
    let _ = write!(
        svg,
        "<g class=\"legend\" transform=\"translate({:.1},{:.1})\">{}</g>",
        cfg.width - cfg.padding_right,
        cfg.height - cfg.padding_bottom - legend::stack_height(cfg.legend_cells),
        legend::to_svg_group(&cells)
    );

    svg.push_str("</svg>");
    svg
}

/// SVG path data for a multipolygon, rings closed with Z.
pub fn region_path(geometry: &MultiPolygon<f64>, fit: &Fit) -> String {
    let mut d = String::new();
    for polygon in &geometry.0 {
        for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors()) {
            for (i, coord) in ring.coords().enumerate() {
                let (x, y) = fit.apply(coord.x, coord.y);
                if i == 0 {
                    let _ = write!(d, "M{:.2},{:.2}", x, y);
                } else {
                    let _ = write!(d, "L{:.2},{:.2}", x, y);
                }
            }
            d.push('Z');
        }
    }
    d
}

fn tooltip_text(report: &CaseReport, level: MapLevel) -> String {
    let name = match level {
        MapLevel::County => format!("{} County", report.display_name()),
        MapLevel::State => report.state.clone(),
    };
    format!(
        "{}\n{} {} reported, {} {} reported\n(as of {})",
        name,
        report.cases,
        if report.cases == 1 { "case" } else { "cases" },
        report.deaths,
        if report.deaths == 1 { "death" } else { "deaths" },
        format_date(report.date)
    )
}

/// "Month DD, YYYY", the tooltip date format.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%B %d, %Y").to_string()
}

pub fn xml_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Write the rendered documents plus the hosting page. A pipeline that
/// failed upstream passes None and its file is simply not written.
pub fn write_outputs(
    cfg: &OutputConfig,
    county_svg: Option<&str>,
    state_svg: Option<&str>,
    trend_svg: Option<&str>,
    trend_state: &str,
) -> Result<()> {
    fs::create_dir_all(&cfg.dir)
        .with_context(|| format!("Failed to create output directory {:?}", cfg.dir))?;

    let documents = [
        ("counties.svg", county_svg),
        ("states.svg", state_svg),
        ("trend.svg", trend_svg),
    ];
    for (file, content) in documents {
        if let Some(content) = content {
            write_file(&cfg.dir, file, content)?;
        }
    }

    write_file(&cfg.dir, "index.html", &hosting_page(trend_state))
}

fn write_file(dir: &Path, name: &str, content: &str) -> Result<()> {
    let path = dir.join(name);
    fs::write(&path, content).with_context(|| format!("Failed to write {:?}", path))
}

fn hosting_page(trend_state: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>COVID-19 Atlas</title>
</head>
<body>
<h2>COVID-19 Cases in the USA, by County</h2>
<div id="countyGraph"><object type="image/svg+xml" data="counties.svg"></object></div>
<h2>COVID-19 Cases in the USA, by State</h2>
<div id="stateGraph"><object type="image/svg+xml" data="states.svg"></object></div>
<div id="title">
<h3>Total Number of COVID-19 Cases in {state}, by day</h3>
<p><em>(mouse-over/tap to get more information)</em></p>
</div>
<div id="trendGraph"><object type="image/svg+xml" data="trend.svg"></object></div>
</body>
</html>
"#,
        state = xml_escape(trend_state)
    )
}
