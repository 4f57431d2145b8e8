//! Flux range queries and CSV result parsing.

use chrono::{DateTime, SecondsFormat, Utc};

use super::line::{MEASUREMENT, PRICE_FIELD, SYMBOL_TAG};
use crate::application::ports::SourceError;
use crate::domain::tick::{HistoryPoint, TimeRange};

/// Build the Flux query for `symbol`'s prices inside `range`.
///
/// Flux's `stop` bound is exclusive, so it is set one millisecond past
/// `range.until`.
#[must_use]
pub fn range_query(bucket: &str, symbol: &str, range: TimeRange) -> String {
    let start = range.since_utc().to_rfc3339_opts(SecondsFormat::Millis, true);
    let stop = DateTime::<Utc>::from_timestamp_millis(range.until.saturating_add(1))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
        .to_rfc3339_opts(SecondsFormat::Millis, true);

    format!(
        "from(bucket: \"{bucket}\")\n  \
         |> range(start: {start}, stop: {stop})\n  \
         |> filter(fn: (r) => r._measurement == \"{MEASUREMENT}\" and r.{SYMBOL_TAG} == \"{symbol}\" and r._field == \"{PRICE_FIELD}\")\n  \
         |> keep(columns: [\"_time\", \"_value\"])\n  \
         |> sort(columns: [\"_time\"])",
        bucket = escape_string(bucket),
        symbol = escape_string(symbol),
    )
}

/// Escape a Flux string literal body.
fn escape_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '"' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Parse a CSV query response into points.
///
/// The response may hold several tables, each introduced by its own header
/// row. Only the `_time` and `_value` columns are read.
///
/// # Errors
///
/// Returns `SourceError::Malformed` if the response reports an error,
/// a data row precedes any header, or a cell cannot be parsed.
pub fn parse_csv_points(body: &str) -> Result<Vec<HistoryPoint>, SourceError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .from_reader(body.as_bytes());

    let mut columns: Option<(usize, usize)> = None;
    let mut error_column: Option<usize> = None;
    let mut points = Vec::new();

    for record in reader.records() {
        let record = record.map_err(|e| malformed(e.to_string()))?;
        if record.iter().all(str::is_empty) {
            continue;
        }

        if let Some(idx) = error_column {
            let message = record.get(idx).unwrap_or("unknown error");
            return Err(malformed(format!("query error: {message}")));
        }

        let time_idx = record.iter().position(|f| f == "_time");
        let value_idx = record.iter().position(|f| f == "_value");
        if let (Some(t), Some(v)) = (time_idx, value_idx) {
            columns = Some((t, v));
            continue;
        }
        if let Some(idx) = record.iter().position(|f| f == "error") {
            error_column = Some(idx);
            continue;
        }

        let Some((t, v)) = columns else {
            return Err(malformed("data row before header".to_string()));
        };

        let time = record
            .get(t)
            .ok_or_else(|| malformed("missing _time cell".to_string()))?;
        let value = record
            .get(v)
            .ok_or_else(|| malformed("missing _value cell".to_string()))?;

        let time = DateTime::parse_from_rfc3339(time)
            .map_err(|e| malformed(format!("bad _time {time:?}: {e}")))?
            .timestamp_millis();
        let price = value
            .parse::<f64>()
            .map_err(|e| malformed(format!("bad _value {value:?}: {e}")))?;

        points.push(HistoryPoint::new(time, price));
    }

    Ok(points)
}

const fn malformed(message: String) -> SourceError {
    SourceError::Malformed { message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_filters_measurement_symbol_and_field() {
        let query = range_query("ticks", "BTC-USD", TimeRange::new(0, 1_000));
        assert!(query.starts_with("from(bucket: \"ticks\")"));
        assert!(query.contains("r._measurement == \"ticks\""));
        assert!(query.contains("r.symbol == \"BTC-USD\""));
        assert!(query.contains("r._field == \"price\""));
        assert!(query.contains("sort(columns: [\"_time\"])"));
    }

    #[test]
    fn stop_bound_is_one_millisecond_past_until() {
        let query = range_query("ticks", "BTC-USD", TimeRange::new(0, 1_000));
        assert!(query.contains("start: 1970-01-01T00:00:00.000Z"));
        assert!(query.contains("stop: 1970-01-01T00:00:01.001Z"));
    }

    #[test]
    fn symbol_quotes_are_escaped() {
        let query = range_query("ticks", r#"X"Y\Z"#, TimeRange::new(0, 1));
        assert!(query.contains(r#"r.symbol == "X\"Y\\Z""#));
    }

    #[test]
    fn parses_single_table() {
        let body = ",result,table,_time,_value\r\n\
                    ,_result,0,2023-11-14T22:13:20Z,74250.65\r\n\
                    ,_result,0,2023-11-14T22:13:20.5Z,74251\r\n";
        let points = parse_csv_points(body).unwrap();
        assert_eq!(
            points,
            vec![
                HistoryPoint::new(1_700_000_000_000, 74250.65),
                HistoryPoint::new(1_700_000_000_500, 74251.0),
            ]
        );
    }

    #[test]
    fn parses_multiple_tables() {
        let body = ",result,table,_time,_value\r\n\
                    ,_result,0,1970-01-01T00:00:00.001Z,1\r\n\
                    \r\n\
                    ,result,table,_value,_time\r\n\
                    ,_result,1,2,1970-01-01T00:00:00.002Z\r\n";
        let points = parse_csv_points(body).unwrap();
        assert_eq!(
            points,
            vec![HistoryPoint::new(1, 1.0), HistoryPoint::new(2, 2.0)]
        );
    }

    #[test]
    fn empty_body_is_no_points() {
        assert!(parse_csv_points("").unwrap().is_empty());
        assert!(parse_csv_points("\r\n").unwrap().is_empty());
    }

    #[test]
    fn annotation_rows_are_skipped() {
        let body = "#datatype,string,long,dateTime:RFC3339,double\r\n\
                    ,result,table,_time,_value\r\n\
                    ,_result,0,1970-01-01T00:00:00.010Z,3.5\r\n";
        assert_eq!(
            parse_csv_points(body).unwrap(),
            vec![HistoryPoint::new(10, 3.5)]
        );
    }

    #[test]
    fn error_table_is_malformed() {
        let body = ",error,reference\r\n,bucket not found,\r\n";
        let err = parse_csv_points(body).unwrap_err();
        assert!(matches!(err, SourceError::Malformed { ref message } if message.contains("bucket not found")));
    }

    #[test]
    fn bad_value_is_malformed() {
        let body = ",result,table,_time,_value\r\n,_result,0,1970-01-01T00:00:00Z,abc\r\n";
        assert!(matches!(
            parse_csv_points(body).unwrap_err(),
            SourceError::Malformed { .. }
        ));
    }

    #[test]
    fn headerless_data_is_malformed() {
        assert!(parse_csv_points(",_result,0,1970-01-01T00:00:00Z,1\r\n").is_err());
    }
}
