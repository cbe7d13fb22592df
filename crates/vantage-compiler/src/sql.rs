//! Warehouse-dialect SQL generation
//!
//! Each family has exactly one date-truncation idiom. The match below is
//! exhaustive over [`AdapterType`] on purpose: adding a family without an
//! idiom is a compile error, not a runtime surprise.

use vantage_core::{AdapterType, DimensionType};

/// Calendar buckets a date/timestamp dimension expands into
pub const DATE_INTERVALS: [&str; 4] = ["DAY", "WEEK", "MONTH", "YEAR"];

/// Sentinel interval: the column value untouched
pub const RAW_INTERVAL: &str = "RAW";

/// True for the calendar buckets that force a `date`-typed result
pub fn is_date_interval(interval: &str) -> bool {
    DATE_INTERVALS
        .iter()
        .any(|candidate| candidate.eq_ignore_ascii_case(interval))
}

pub fn is_raw_interval(interval: &str) -> bool {
    interval.eq_ignore_ascii_case(RAW_INTERVAL)
}

/// Render the family-specific truncation of `sql` to `interval`.
///
/// The interval name is upper-cased before substitution. BigQuery needs a
/// different function for bare timestamps than for dates; Snowflake pins
/// the timezone before truncating; MySQL has no native truncation and
/// falls back to time-field extraction.
pub fn date_trunc_sql(
    adapter: AdapterType,
    interval: &str,
    sql: &str,
    dimension_type: DimensionType,
) -> String {
    let interval = interval.to_uppercase();
    match adapter {
        AdapterType::Bigquery => {
            if dimension_type == DimensionType::Timestamp {
                format!("DATETIME_TRUNC({sql}, {interval})")
            } else {
                format!("DATE_TRUNC({sql}, {interval})")
            }
        }
        AdapterType::Snowflake => format!(
            "TO_TIMESTAMP_NTZ(DATE_TRUNC('{interval}', CONVERT_TIMEZONE('UTC', {sql})))"
        ),
        AdapterType::Redshift | AdapterType::Postgres | AdapterType::Databricks => {
            format!("DATE_TRUNC('{interval}', {sql})")
        }
        AdapterType::Mysql => format!("EXTRACT({interval} FROM {sql})"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bigquery_picks_function_by_type() {
        assert_eq!(
            date_trunc_sql(
                AdapterType::Bigquery,
                "day",
                "${TABLE}.created_at",
                DimensionType::Timestamp
            ),
            "DATETIME_TRUNC(${TABLE}.created_at, DAY)"
        );
        assert_eq!(
            date_trunc_sql(
                AdapterType::Bigquery,
                "month",
                "${TABLE}.created_at",
                DimensionType::Date
            ),
            "DATE_TRUNC(${TABLE}.created_at, MONTH)"
        );
    }

    #[test]
    fn snowflake_converts_timezone_first() {
        assert_eq!(
            date_trunc_sql(
                AdapterType::Snowflake,
                "week",
                "${TABLE}.created_at",
                DimensionType::Timestamp
            ),
            "TO_TIMESTAMP_NTZ(DATE_TRUNC('WEEK', CONVERT_TIMEZONE('UTC', ${TABLE}.created_at)))"
        );
    }

    #[test]
    fn postgres_family_shares_one_idiom() {
        for adapter in [AdapterType::Postgres, AdapterType::Redshift, AdapterType::Databricks] {
            assert_eq!(
                date_trunc_sql(adapter, "year", "${TABLE}.created_at", DimensionType::Date),
                "DATE_TRUNC('YEAR', ${TABLE}.created_at)"
            );
        }
    }

    #[test]
    fn mysql_extracts_the_time_field() {
        assert_eq!(
            date_trunc_sql(
                AdapterType::Mysql,
                "day",
                "${TABLE}.created_at",
                DimensionType::Timestamp
            ),
            "EXTRACT(DAY FROM ${TABLE}.created_at)"
        );
    }

    #[test]
    fn intervals_are_case_normalised() {
        assert_eq!(
            date_trunc_sql(AdapterType::Postgres, "Month", "${TABLE}.d", DimensionType::Date),
            "DATE_TRUNC('MONTH', ${TABLE}.d)"
        );
        assert!(is_date_interval("week"));
        assert!(!is_date_interval("raw"));
        assert!(is_raw_interval("raw"));
    }
}
