use crate::types::{CaseReport, Region};
use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use csv::ReaderBuilder;
use geo::MultiPolygon;
use geojson::GeoJson;
use topojson::{to_geojson, TopoJson};

/// FIPS assigned to the "New York City" aggregate rows, whose upstream fips
/// field is blank. The boundary file has no shape under this id; the five
/// borough shapes resolve to it through the alias table.
pub const NYC_AGGREGATE_FIPS: u32 = 36000;

/// Parse a NYT case CSV (`date,county?,state,fips,cases,deaths`) into
/// reports. The county column is present in the county feed and absent in
/// the state feed; both go through this one code path.
///
/// Malformed counts degrade to 0 and a row with an unparseable date is
/// dropped; neither fails the load.
pub fn parse_case_csv(text: &str) -> Result<Vec<CaseReport>> {
    let mut rdr = ReaderBuilder::new().from_reader(text.as_bytes());
    let headers = rdr.headers()?.clone();

    let col = |name: &str| headers.iter().position(|h| h == name);
    let date_idx = col("date").ok_or_else(|| anyhow!("Column 'date' not found in case CSV"))?;
    let state_idx = col("state").ok_or_else(|| anyhow!("Column 'state' not found in case CSV"))?;
    let fips_idx = col("fips").ok_or_else(|| anyhow!("Column 'fips' not found in case CSV"))?;
    let cases_idx = col("cases").ok_or_else(|| anyhow!("Column 'cases' not found in case CSV"))?;
    let deaths_idx = col("deaths").ok_or_else(|| anyhow!("Column 'deaths' not found in case CSV"))?;
    let county_idx = col("county");

    let mut reports = Vec::new();
    let mut skipped = 0usize;

    for result in rdr.records() {
        let record = result?;

        let date = match NaiveDate::parse_from_str(record.get(date_idx).unwrap_or(""), "%Y-%m-%d")
        {
            Ok(d) => d,
            Err(_) => {
                skipped += 1;
                continue;
            }
        };

        let county = county_idx
            .and_then(|i| record.get(i))
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string());

        let fips = if county.as_deref() == Some("New York City") {
            Some(NYC_AGGREGATE_FIPS)
        } else {
            record.get(fips_idx).and_then(|s| s.parse::<u32>().ok())
        };

        let cases: u32 = record.get(cases_idx).unwrap_or("0").parse().unwrap_or(0);
        let deaths: u32 = record.get(deaths_idx).unwrap_or("0").parse().unwrap_or(0);

        reports.push(CaseReport {
            date,
            county,
            state: record.get(state_idx).unwrap_or("").to_string(),
            fips,
            cases,
            deaths,
        });
    }

    if skipped > 0 {
        tracing::debug!("Skipped {} case rows with unparseable dates", skipped);
    }

    Ok(reports)
}

/// Load boundary shapes from a TopoJSON topology (extracting the named
/// object) or a plain GeoJSON FeatureCollection, dispatching on content.
pub fn parse_boundaries(text: &str, object: &str) -> Result<Vec<Region>> {
    let collection = match text.parse::<TopoJson>() {
        Ok(TopoJson::Topology(topology)) => {
            let converted = to_geojson(&topology, object)
                .map_err(|e| anyhow!("Failed to convert topology object '{}': {:?}", object, e))?;
            // topojson resolves its own geojson version; round-trip through
            // JSON so the rest of the pipeline stays on ours.
            let json = serde_json::to_string(&converted)
                .context("Failed to serialize converted topology")?;
            match json
                .parse::<GeoJson>()
                .context("Converted topology is not valid GeoJSON")?
            {
                GeoJson::FeatureCollection(fc) => fc,
                _ => return Err(anyhow!("Converted topology must be a FeatureCollection")),
            }
        }
        Ok(_) => return Err(anyhow!("Boundary TopoJSON must be a Topology")),
        Err(_) => {
            match text
                .parse::<GeoJson>()
                .context("Boundary data is neither TopoJSON nor GeoJSON")?
            {
                GeoJson::FeatureCollection(fc) => fc,
                _ => return Err(anyhow!("Boundary GeoJSON must be a FeatureCollection")),
            }
        }
    };

    let mut regions = Vec::new();

    for feature in collection.features {
        // 1. Get the FIPS id. Upstream files carry it as the feature id,
        // sometimes a number, sometimes a zero-padded string.
        let id = match &feature.id {
            Some(geojson::feature::Id::Number(n)) => match n.as_u64() {
                Some(v) => v as u32,
                None => continue,
            },
            Some(geojson::feature::Id::String(s)) => match s.parse::<u32>() {
                Ok(v) => v,
                Err(_) => continue,
            },
            None => continue,
        };

        let name = feature
            .properties
            .as_ref()
            .and_then(|props| props.get("name"))
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());

        // 2. Get geometry: Polygon or MultiPolygon only.
        let geometry = match feature.geometry {
            Some(geo) => {
                let valid_geo: geo::Geometry<f64> = geo
                    .value
                    .try_into()
                    .map_err(|e| anyhow!("Failed to convert geojson geometry: {:?}", e))?;

                match valid_geo {
                    geo::Geometry::MultiPolygon(mp) => mp,
                    geo::Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
                    _ => continue,
                }
            }
            None => continue,
        };

        regions.push(Region { id, name, geometry });
    }

    Ok(regions)
}

#[cfg(test)]
mod tests {
    use super::*;

    const COUNTY_CSV: &str = "\
date,county,state,fips,cases,deaths
2020-03-10,New York,New York,36061,100,2
2020-03-12,New York,New York,36061,150,5
2020-03-12,New York City,New York,,223,9
2020-03-12,Unknown,Rhode Island,,3,0
";

    const STATE_CSV: &str = "\
date,state,fips,cases,deaths
2020-03-01,Washington,53,13,1
2020-03-02,Washington,53,18,4
";

    #[test]
    fn parses_county_feed() {
        let reports = parse_case_csv(COUNTY_CSV).unwrap();
        assert_eq!(reports.len(), 4);
        assert_eq!(reports[0].fips, Some(36061));
        assert_eq!(reports[0].date, NaiveDate::from_ymd_opt(2020, 3, 10).unwrap());
        assert_eq!(reports[1].cases, 150);
        assert_eq!(reports[0].display_name(), "New York");
    }

    #[test]
    fn nyc_rows_get_the_aggregate_fips() {
        let reports = parse_case_csv(COUNTY_CSV).unwrap();
        let nyc = &reports[2];
        assert_eq!(nyc.county.as_deref(), Some("New York City"));
        assert_eq!(nyc.fips, Some(NYC_AGGREGATE_FIPS));
        assert_eq!(nyc.cases, 223);
    }

    #[test]
    fn blank_fips_stays_unmatched() {
        let reports = parse_case_csv(COUNTY_CSV).unwrap();
        assert_eq!(reports[3].fips, None);
    }

    #[test]
    fn parses_state_feed_without_county_column() {
        let reports = parse_case_csv(STATE_CSV).unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].county, None);
        assert_eq!(reports[0].fips, Some(53));
        assert_eq!(reports[0].display_name(), "Washington");
    }

    #[test]
    fn malformed_counts_degrade_to_zero() {
        let csv = "date,state,fips,cases,deaths\n2020-03-01,Washington,53,oops,1\n";
        let reports = parse_case_csv(csv).unwrap();
        assert_eq!(reports[0].cases, 0);
        assert_eq!(reports[0].deaths, 1);
    }

    #[test]
    fn malformed_dates_drop_the_row() {
        let csv = "date,state,fips,cases,deaths\nnot-a-date,Washington,53,10,1\n2020-03-01,Washington,53,13,1\n";
        let reports = parse_case_csv(csv).unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].cases, 13);
    }

    #[test]
    fn missing_required_column_is_an_error() {
        let csv = "date,state,cases,deaths\n2020-03-01,Washington,13,1\n";
        assert!(parse_case_csv(csv).is_err());
    }

    const BOUNDARY_GEOJSON: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "id": 36061,
                "properties": {"name": "New York"},
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0], [0.0, 0.0]]]
                }
            },
            {
                "type": "Feature",
                "id": "53",
                "properties": {},
                "geometry": {
                    "type": "MultiPolygon",
                    "coordinates": [[[[20.0, 0.0], [30.0, 0.0], [30.0, 10.0], [20.0, 10.0], [20.0, 0.0]]]]
                }
            },
            {
                "type": "Feature",
                "properties": {},
                "geometry": {
                    "type": "Point",
                    "coordinates": [1.0, 1.0]
                }
            }
        ]
    }"#;

    #[test]
    fn parses_geojson_boundaries() {
        let regions = parse_boundaries(BOUNDARY_GEOJSON, "counties").unwrap();
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].id, 36061);
        assert_eq!(regions[0].name.as_deref(), Some("New York"));
        assert_eq!(regions[1].id, 53);
        assert_eq!(regions[1].name, None);
    }

    const BOUNDARY_TOPOJSON: &str = r#"{
        "type": "Topology",
        "objects": {
            "counties": {
                "type": "GeometryCollection",
                "geometries": [
                    {
                        "type": "Polygon",
                        "id": 1001,
                        "arcs": [[0]]
                    }
                ]
            }
        },
        "arcs": [
            [[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0], [0.0, 0.0]]
        ]
    }"#;

    #[test]
    fn parses_topojson_boundaries() {
        let regions = parse_boundaries(BOUNDARY_TOPOJSON, "counties").unwrap();
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].id, 1001);
    }

    #[test]
    fn unknown_topology_object_is_an_error() {
        assert!(parse_boundaries(BOUNDARY_TOPOJSON, "states").is_err());
    }

    #[test]
    fn garbage_boundary_data_is_an_error() {
        assert!(parse_boundaries("not json at all", "counties").is_err());
    }
}
