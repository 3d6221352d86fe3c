use chrono::NaiveDate;
use geo::MultiPolygon;

/// One row of the NYT case feed: cumulative counts for a region on a date.
#[derive(Debug, Clone)]
pub struct CaseReport {
    pub date: NaiveDate,
    /// County name; absent in the state-level feed.
    pub county: Option<String>,
    pub state: String,
    /// FIPS code. None when the upstream field is blank or unparseable
    /// (e.g. "Unknown" county rows); such rows never match a boundary shape.
    pub fips: Option<u32>,
    pub cases: u32,
    pub deaths: u32,
}

impl CaseReport {
    /// Display name for tooltips: county name if present, else state name.
    pub fn display_name(&self) -> &str {
        self.county.as_deref().unwrap_or(&self.state)
    }
}

/// A boundary shape with the FIPS id used to join it to case reports.
#[derive(Debug, Clone)]
pub struct Region {
    pub id: u32,
    pub name: Option<String>,
    pub geometry: MultiPolygon<f64>,
}
