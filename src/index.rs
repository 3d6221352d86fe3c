use crate::data::NYC_AGGREGATE_FIPS;
use crate::types::CaseReport;
use once_cell::sync::Lazy;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// The five NYC borough counties, which the case feed never reports
/// directly. Their shapes resolve to the city-wide aggregate record.
pub static NYC_BOROUGH_ALIASES: Lazy<HashMap<u32, u32>> = Lazy::new(|| {
    HashMap::from([
        (36005, NYC_AGGREGATE_FIPS), // Bronx
        (36047, NYC_AGGREGATE_FIPS), // Kings
        (36061, NYC_AGGREGATE_FIPS), // New York
        (36081, NYC_AGGREGATE_FIPS), // Queens
        (36085, NYC_AGGREGATE_FIPS), // Richmond
    ])
});

/// Per-region latest reports, folded from the raw record set in one pass.
///
/// Lookup falls back through the alias table when a region id has no direct
/// reports. Ties on date resolve to the record seen last in the input.
pub struct CaseIndex {
    latest: HashMap<u32, CaseReport>,
    aliases: HashMap<u32, u32>,
    max_cases: u32,
}

impl CaseIndex {
    pub fn build(reports: &[CaseReport], aliases: HashMap<u32, u32>) -> Self {
        let mut latest: HashMap<u32, CaseReport> = HashMap::new();
        let mut max_cases = 0u32;

        for report in reports {
            let Some(fips) = report.fips else { continue };
            max_cases = max_cases.max(report.cases);

            match latest.entry(fips) {
                Entry::Occupied(mut entry) => {
                    if report.date >= entry.get().date {
                        entry.insert(report.clone());
                    }
                }
                Entry::Vacant(entry) => {
                    entry.insert(report.clone());
                }
            }
        }

        Self { latest, aliases, max_cases }
    }

    /// The most recent report for a region id, via the alias table when the
    /// id has no direct reports, else None.
    pub fn latest(&self, id: u32) -> Option<&CaseReport> {
        self.latest.get(&id).or_else(|| {
            self.aliases
                .get(&id)
                .and_then(|aggregate| self.latest.get(aggregate))
        })
    }

    /// Latest case count for a region id; zero when nothing was reported.
    pub fn latest_cases(&self, id: u32) -> u32 {
        self.latest(id).map(|r| r.cases).unwrap_or(0)
    }

    /// Maximum case count over every report carrying a FIPS id. This is the
    /// color scale's upper domain bound.
    pub fn max_cases(&self) -> u32 {
        self.max_cases
    }

    pub fn is_empty(&self) -> bool {
        self.latest.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn report(fips: Option<u32>, date: (i32, u32, u32), cases: u32, deaths: u32) -> CaseReport {
        CaseReport {
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            county: None,
            state: "New York".to_string(),
            fips,
            cases,
            deaths,
        }
    }

    #[test]
    fn returns_the_most_recent_report() {
        let reports = vec![
            report(Some(36061), (2020, 3, 10), 100, 2),
            report(Some(36061), (2020, 3, 12), 150, 5),
            report(Some(36061), (2020, 3, 11), 120, 3),
        ];
        let index = CaseIndex::build(&reports, HashMap::new());

        let latest = index.latest(36061).unwrap();
        assert_eq!(latest.cases, 150);
        assert_eq!(latest.date, NaiveDate::from_ymd_opt(2020, 3, 12).unwrap());
    }

    #[test]
    fn equal_dates_keep_the_last_seen_record() {
        let reports = vec![
            report(Some(36061), (2020, 3, 12), 150, 5),
            report(Some(36061), (2020, 3, 12), 152, 5),
        ];
        let index = CaseIndex::build(&reports, HashMap::new());
        assert_eq!(index.latest(36061).unwrap().cases, 152);
    }

    #[test]
    fn alias_falls_back_to_the_aggregate() {
        let reports = vec![
            report(Some(NYC_AGGREGATE_FIPS), (2020, 3, 10), 100, 2),
            report(Some(NYC_AGGREGATE_FIPS), (2020, 3, 12), 150, 5),
        ];
        let index = CaseIndex::build(&reports, NYC_BOROUGH_ALIASES.clone());

        // Queens has no direct reports; it resolves to the NYC aggregate.
        let latest = index.latest(36081).unwrap();
        assert_eq!(latest.cases, 150);
        assert_eq!(latest.date, NaiveDate::from_ymd_opt(2020, 3, 12).unwrap());
    }

    #[test]
    fn alias_target_and_direct_lookup_agree() {
        let reports = vec![
            report(Some(36061), (2020, 3, 10), 100, 2),
            report(Some(36061), (2020, 3, 12), 150, 5),
        ];
        let index = CaseIndex::build(&reports, HashMap::from([(36005, 36061)]));

        assert_eq!(index.latest(36061).unwrap().cases, 150);
        // An alias pointing at 36061 resolves to the same record.
        assert_eq!(index.latest(36005).unwrap().cases, 150);
    }

    #[test]
    fn direct_reports_win_over_the_alias() {
        let reports = vec![
            report(Some(NYC_AGGREGATE_FIPS), (2020, 3, 12), 150, 5),
            report(Some(36061), (2020, 3, 10), 7, 0),
        ];
        let index = CaseIndex::build(&reports, NYC_BOROUGH_ALIASES.clone());
        assert_eq!(index.latest(36061).unwrap().cases, 7);
    }

    #[test]
    fn unknown_regions_return_none() {
        let reports = vec![report(Some(36061), (2020, 3, 10), 100, 2)];
        let index = CaseIndex::build(&reports, NYC_BOROUGH_ALIASES.clone());
        assert!(index.latest(6075).is_none());
        assert_eq!(index.latest_cases(6075), 0);
    }

    #[test]
    fn rows_without_fips_are_not_indexed() {
        let reports = vec![report(None, (2020, 3, 10), 9999, 2)];
        let index = CaseIndex::build(&reports, HashMap::new());
        assert!(index.is_empty());
        assert_eq!(index.max_cases(), 0);
    }

    #[test]
    fn max_cases_spans_all_reports_with_an_id() {
        let reports = vec![
            report(Some(36061), (2020, 3, 10), 100, 2),
            report(Some(53), (2020, 3, 12), 400, 5),
            report(None, (2020, 3, 12), 9999, 5),
        ];
        let index = CaseIndex::build(&reports, HashMap::new());
        assert_eq!(index.max_cases(), 400);
    }
}
