use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;

use csv::ReaderBuilder;
use tracing::{debug, warn};

use crate::error::Result;
use crate::types::{PerformanceRecord, RawRow};
use crate::util::{parse_f64_safe, parse_i32_safe, parse_month_safe};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub total_rows: usize,
    pub loaded_rows: usize,
    pub parse_errors: usize,
    pub entities: usize,
}

pub fn load_and_clean<P: AsRef<Path>>(path: P) -> Result<(Vec<PerformanceRecord>, LoadReport)> {
    let path = path.as_ref();
    debug!(path = %path.display(), "loading performance records");
    let file = std::fs::File::open(path)?;
    read_records(file)
}

/// Reads and cleans records from any CSV source.
///
/// Rows without a client, a year, or a valid month are skipped and
/// counted. Unparsable numeric cells become `0`.
pub fn read_records<R: Read>(reader: R) -> Result<(Vec<PerformanceRecord>, LoadReport)> {
    let mut rdr = ReaderBuilder::new().flexible(true).trim(csv::Trim::Headers).from_reader(reader);
    let mut total_rows = 0usize;
    let mut parse_errors = 0usize;
    let mut records: Vec<PerformanceRecord> = Vec::new();

    for (line, result) in rdr.deserialize::<RawRow>().enumerate() {
        total_rows += 1;
        let row = match result {
            Ok(r) => r,
            Err(e) => {
                warn!(row = line + 1, error = %e, "skipping malformed row");
                parse_errors += 1;
                continue;
            }
        };
        match clean_row(row) {
            Some(record) => records.push(record),
            None => {
                warn!(row = line + 1, "skipping row without client, year or month");
                parse_errors += 1;
            }
        }
    }

    let entities = records
        .iter()
        .map(|r| r.entity_id.as_str())
        .collect::<BTreeSet<_>>()
        .len();
    let report = LoadReport {
        total_rows,
        loaded_rows: records.len(),
        parse_errors,
        entities,
    };
    debug!(?report, "records loaded");
    Ok((records, report))
}

fn clean_row(row: RawRow) -> Option<PerformanceRecord> {
    let entity_id = row
        .client
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())?
        .to_string();
    let year = parse_i32_safe(row.year.as_deref())?;
    let month = parse_month_safe(row.month.as_deref())?;
    let amount = |cell: &Option<String>| parse_f64_safe(cell.as_deref()).unwrap_or(0.0);
    let days_of_data = parse_i32_safe(row.days_of_data.as_deref())
        .and_then(|d| u32::try_from(d).ok());

    Some(PerformanceRecord {
        entity_id,
        year,
        month,
        revenue: amount(&row.revenue),
        orders: amount(&row.orders),
        orders_canceled: amount(&row.orders_canceled),
        profit: amount(&row.profit),
        ad_spend: amount(&row.ad_spend),
        sessions: amount(&row.sessions),
        avg_fulfillment_days: amount(&row.avg_fulfillment_days),
        days_of_data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_aliased_headers_and_skips_bad_rows() {
        let csv = "\
Account,Year,Month,Sales,Orders,Spend,Sessions,Days of Data
acme,2024,Jun,\"$1,000\",10,250,400,15
acme,2024,5,900,9,,380,
,2024,5,1,1,1,1,
globex,2024,13,1,1,1,1,
";
        let (records, report) = read_records(csv.as_bytes()).unwrap();
        assert_eq!(report.total_rows, 4);
        assert_eq!(report.loaded_rows, 2);
        assert_eq!(report.parse_errors, 2);
        assert_eq!(report.entities, 1);

        let june = &records[0];
        assert_eq!(june.entity_id, "acme");
        assert_eq!(june.month, 6);
        assert_eq!(june.revenue, 1_000.0);
        assert_eq!(june.ad_spend, 250.0);
        assert_eq!(june.days_of_data, Some(15));
        assert_eq!(june.profit, 0.0);

        assert_eq!(records[1].ad_spend, 0.0);
        assert_eq!(records[1].days_of_data, None);
    }

    #[test]
    fn negative_days_of_data_are_ignored() {
        let csv = "Client,Year,Month,Revenue,DaysOfData\nacme,2024,6,10,-3\n";
        let (records, _) = read_records(csv.as_bytes()).unwrap();
        assert_eq!(records[0].days_of_data, None);
    }
}
