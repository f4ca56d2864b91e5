//! CSV text to [`Table`].

use crate::dates::{DateFormats, detect_datetime, is_date_column, parse_with};
use crate::numeric::{is_numeric_column, parse_number};
use crate::table::{Cell, Table};
use crate::TransformError;

/// Name the canonical timestamp column is renamed to.
pub const TIMESTAMP: &str = "timestamp";

/// Date column that is parsed but never promoted to the timestamp.
const VINTAGE_DATE: &str = "Vintage Date";

/// Parses CSV text with the embedded date formats.
///
/// # Errors
///
/// See [`parse_with_formats`].
pub fn parse(raw: &str) -> Result<Table, TransformError> {
    parse_with_formats(raw, &DateFormats::default())
}

/// Parses CSV text, detecting date/time columns with `formats`.
///
/// # Errors
///
/// Returns [`TransformError::Empty`] for blank input or a header with no
/// rows, and [`TransformError::Csv`] for malformed CSV.
pub fn parse_with_formats(raw: &str, formats: &DateFormats) -> Result<Table, TransformError> {
    if raw.trim().is_empty() {
        return Err(TransformError::Empty);
    }

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(raw.as_bytes());

    let columns: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(
            record
                .iter()
                .map(|field| {
                    if field.is_empty() {
                        Cell::Null
                    } else {
                        Cell::Text(field.to_string())
                    }
                })
                .collect(),
        );
    }

    if rows.is_empty() {
        return Err(TransformError::Empty);
    }

    let mut table = Table::new(columns, rows);

    parse_dates(&mut table, formats);
    drop_untimed_rows(&mut table);
    coerce_numbers(&mut table);

    log::info!("Parsed {} rows", table.len());

    Ok(table)
}

fn parse_dates(table: &mut Table, formats: &DateFormats) {
    let date_columns: Vec<(usize, String)> = table
        .columns()
        .iter()
        .enumerate()
        .filter(|(_, name)| is_date_column(name))
        .map(|(idx, name)| (idx, name.clone()))
        .collect();

    let mut main_timestamp = None;

    for (idx, name) in date_columns {
        let texts: Vec<String> = table
            .rows()
            .filter_map(|row| match row.get(&name) {
                Some(Cell::Text(s)) => Some(s.clone()),
                _ => None,
            })
            .collect();

        let format = formats.select(texts.iter().map(String::as_str)).map(String::from);

        match format {
            Some(fmt) => {
                for cell in table.column_cells_mut(idx) {
                    if let Cell::Text(s) = &*cell {
                        let parsed = parse_with(s, &fmt).map_or(Cell::Null, Cell::DateTime);
                        *cell = parsed;
                    }
                }
            }
            None if texts.iter().any(|t| detect_datetime(t).is_some()) => {
                log::debug!("{name}: no configured format matched, detecting per value");
                for cell in table.column_cells_mut(idx) {
                    if let Cell::Text(s) = &*cell {
                        let parsed = detect_datetime(s).map_or(Cell::Null, Cell::DateTime);
                        *cell = parsed;
                    }
                }
            }
            None => log::debug!("{name}: no date values, keeping text"),
        }

        if name == VINTAGE_DATE || main_timestamp.is_some() {
            continue;
        }
        let lower = name.to_lowercase();
        if lower.contains(TIMESTAMP) || lower == "time stamp" || name == "Forecast Date" {
            main_timestamp = Some(idx);
        }
    }

    if let Some(idx) = main_timestamp {
        table.rename_column(idx, TIMESTAMP);
    }
}

fn drop_untimed_rows(table: &mut Table) {
    let Some(idx) = table.column_index(TIMESTAMP) else {
        return;
    };

    let before = table.len();
    table.retain_rows(|row| matches!(row.get(idx), Some(Cell::DateTime(_))));
    let dropped = before - table.len();
    if dropped > 0 {
        log::warn!("Removed {dropped} rows with null timestamps");
    }
}

fn coerce_numbers(table: &mut Table) {
    let numeric: Vec<usize> = table
        .columns()
        .iter()
        .enumerate()
        .filter(|(_, name)| is_numeric_column(name))
        .map(|(idx, _)| idx)
        .collect();

    for idx in numeric {
        for cell in table.column_cells_mut(idx) {
            if let Cell::Text(s) = &*cell {
                let coerced = parse_number(s).map_or(Cell::Null, Cell::Number);
                *cell = coerced;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn rejects_empty_input() {
        assert!(matches!(parse("  \n"), Err(TransformError::Empty)));
        assert!(matches!(parse("Time Stamp,Name\n"), Err(TransformError::Empty)));
    }

    #[test]
    fn promotes_time_stamp_and_coerces_prices() {
        let table = parse(
            "Time Stamp,Name,PTID,LBMP ($/MWHr)\n\
             11/13/2025 00:05:00,WEST,61752,\"$1,024.50\"\n\
             11/13/2025 00:10:00, CAPITL ,61757,n/a\n",
        )
        .unwrap();

        assert_eq!(table.columns()[0], TIMESTAMP);
        let rows: Vec<_> = table.rows().collect();
        assert_eq!(
            rows[0].datetime(TIMESTAMP),
            NaiveDate::from_ymd_opt(2025, 11, 13).unwrap().and_hms_opt(0, 5, 0)
        );
        assert_eq!(rows[0].get("LBMP ($/MWHr)"), Some(&Cell::Number(1024.5)));
        assert_eq!(rows[1].get("LBMP ($/MWHr)"), Some(&Cell::Null));
        assert_eq!(rows[1].text("Name").as_deref(), Some("CAPITL"));
        // PTID is not a numeric keyword column but still reads as a number.
        assert_eq!(rows[0].number("PTID"), Some(61752.0));
    }

    #[test]
    fn drops_rows_with_unparseable_timestamp() {
        let table = parse(
            "Time Stamp,Name\n\
             11/13/2025 00:05:00,WEST\n\
             not a date,EAST\n",
        )
        .unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn keeps_time_zone_text() {
        let table = parse(
            "Time Stamp,Time Zone,Name,Load\n\
             11/13/2025 00:05:00,EST,WEST,1500.2\n",
        )
        .unwrap();
        let row = table.rows().next().unwrap();
        assert_eq!(row.text("Time Zone").as_deref(), Some("EST"));
        assert_eq!(row.number("Load"), Some(1500.2));
    }

    #[test]
    fn weather_uses_forecast_date_and_keeps_vintage_date() {
        let table = parse(
            "Forecast Date,Vintage Date,Vintage,Station ID,Max Temp\n\
             11/14/2025,11/13/2025,Forecast,ALB,50\n",
        )
        .unwrap();
        assert!(table.has_column(TIMESTAMP));
        assert!(table.has_column("Vintage Date"));
        let row = table.rows().next().unwrap();
        assert!(row.datetime("Vintage Date").is_some());
    }

    #[test]
    fn falls_back_to_value_detection() {
        let table = parse("Time Stamp,Name\n2025-11-13T05:00:00Z,WEST\n").unwrap();
        let row = table.rows().next().unwrap();
        assert_eq!(
            row.datetime(TIMESTAMP),
            NaiveDate::from_ymd_opt(2025, 11, 13).unwrap().and_hms_opt(5, 0, 0)
        );
    }

    #[test]
    fn applies_override_formats() {
        let formats = DateFormats::new(vec!["%d.%m.%Y %H:%M".to_string()]);
        let table = parse_with_formats("Time Stamp,Name\n13.11.2025 01:00,WEST\n", &formats).unwrap();
        assert_eq!(table.len(), 1);
    }
}
