use chrono::NaiveDate;
use sqlx::PgPool;

use crate::database::models::UsageCounter;
use crate::database::DatabaseError;

/// Longest span a usage report may cover
pub const MAX_REPORT_DAYS: i64 = 366;

/// Check a `from..=to` report range, returning the problem if any
pub fn check_range(from: NaiveDate, to: NaiveDate) -> Result<(), String> {
    if from > to {
        return Err("from must not be after to".to_string());
    }
    if (to - from).num_days() > MAX_REPORT_DAYS {
        return Err(format!("range may span at most {} days", MAX_REPORT_DAYS));
    }
    Ok(())
}

pub async fn increment(pool: &PgPool, day: NaiveDate, metric: &str) -> Result<(), DatabaseError> {
    sqlx::query(
        "INSERT INTO usage_counters (day, metric, count) VALUES ($1, $2, 1)
         ON CONFLICT (day, metric) DO UPDATE SET count = usage_counters.count + 1",
    )
    .bind(day)
    .bind(metric)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn report(
    pool: &PgPool,
    from: NaiveDate,
    to: NaiveDate,
    metric: Option<&str>,
) -> Result<Vec<UsageCounter>, DatabaseError> {
    Ok(sqlx::query_as::<_, UsageCounter>(
        "SELECT day, metric, count FROM usage_counters
         WHERE day BETWEEN $1 AND $2 AND ($3::text IS NULL OR metric = $3)
         ORDER BY day, metric",
    )
    .bind(from)
    .bind(to)
    .bind(metric)
    .fetch_all(pool)
    .await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn validates_ranges() {
        assert!(check_range(day("2025-01-01"), day("2025-01-01")).is_ok());
        assert!(check_range(day("2024-01-01"), day("2025-01-01")).is_ok());
        assert!(check_range(day("2024-01-01"), day("2025-01-03")).is_err());
        assert!(check_range(day("2025-02-01"), day("2025-01-01")).is_err());
    }
}
