// Shared DuckDB plumbing for the archives: the compound record key, the
// deduplicating insert and the time-of-day aggregation.

use std::collections::HashSet;
use std::fmt;

use duckdb::{
    params_from_iter,
    types::{Type, Value, ValueRef},
    Connection, Row,
};
use jiff::civil::{Date, Time};
use log::{debug, info};
use rust_decimal::{prelude::FromPrimitive, Decimal, RoundingStrategy};

/// Identifies one half-hour observation for one region.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey {
    pub time: Time,
    pub date: Date,
    pub region: String,
}

impl RecordKey {
    pub fn new(time: Time, date: Date, region: &str) -> RecordKey {
        RecordKey {
            time,
            date,
            region: region.to_string(),
        }
    }
}

/// Format as `HH:MM DD-MM-YYYY region`, e.g. `00:30 21-04-2024 London`.
impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.time.strftime("%H:%M"),
            self.date.strftime("%d-%m-%Y"),
            self.region
        )
    }
}

/// A row that can be stored in a table keyed by (half_hour_start, date, region).
pub trait StoredRecord {
    const TABLE: &'static str;

    /// Value columns (name, DuckDB type) that follow the key columns.
    const COLUMNS: &'static [(&'static str, &'static str)];

    fn key(&self) -> RecordKey;

    /// One value for each of the `COLUMNS`, in order.
    fn values(&self) -> Vec<Value>;
}

fn insert_sql<R: StoredRecord>() -> String {
    let names: Vec<&str> = R::COLUMNS.iter().map(|(name, _)| *name).collect();
    let casts: Vec<String> = R::COLUMNS
        .iter()
        .map(|(_, sql_type)| format!("CAST(? AS {})", sql_type))
        .collect();
    format!(
        "INSERT OR IGNORE INTO {} (region, date, half_hour_start, {}) VALUES (?, CAST(? AS DATE), CAST(? AS TIME), {});",
        R::TABLE,
        names.join(", "),
        casts.join(", ")
    )
}

/// Insert the records whose key is not in the table yet, in one
/// transaction.  Return the number of rows inserted.
pub fn upsert<R: StoredRecord>(conn: &mut Connection, records: &[R]) -> duckdb::Result<usize> {
    insert_new(conn, records, None)
}

/// Same as [`upsert`] but insert at most `limit` new records.  Records whose
/// key is already stored (or repeated in the batch) are skipped and don't
/// count towards the limit.
pub fn upsert_with_limit<R: StoredRecord>(
    conn: &mut Connection,
    records: &[R],
    limit: usize,
) -> duckdb::Result<usize> {
    insert_new(conn, records, Some(limit))
}

fn insert_new<R: StoredRecord>(
    conn: &mut Connection,
    records: &[R],
    limit: Option<usize>,
) -> duckdb::Result<usize> {
    let tx = conn.transaction()?;
    let mut existing = existing_keys(&tx, R::TABLE)?;
    let before = count(&tx, R::TABLE)?;
    {
        let mut stmt = tx.prepare(&insert_sql::<R>())?;
        let mut inserted = 0;
        for record in records {
            if limit.is_some_and(|n| inserted >= n) {
                break;
            }
            let key = record.key();
            if existing.contains(&key) {
                debug!("{} already in {}, skipping", key, R::TABLE);
                continue;
            }
            let mut params = vec![
                Value::Text(key.region.clone()),
                Value::Text(key.date.to_string()),
                Value::Text(key.time.strftime("%H:%M:%S").to_string()),
            ];
            params.extend(record.values());
            stmt.execute(params_from_iter(params))?;
            existing.insert(key);
            inserted += 1;
        }
    }
    let after = count(&tx, R::TABLE)?;
    tx.commit()?;
    info!("inserted {} new rows into {}", after - before, R::TABLE);
    Ok(after - before)
}

pub fn count(conn: &Connection, table: &str) -> duckdb::Result<usize> {
    let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {};", table), [], |row| {
        row.get(0)
    })?;
    Ok(n as usize)
}

pub fn existing_keys(conn: &Connection, table: &str) -> duckdb::Result<HashSet<RecordKey>> {
    let query = format!(
        "SELECT region, CAST(date AS VARCHAR), CAST(half_hour_start AS VARCHAR) FROM {};",
        table
    );
    let mut stmt = conn.prepare(&query)?;
    let keys = stmt
        .query_map([], |row| {
            Ok(RecordKey {
                region: row.get(0)?,
                date: date_at(row, 1)?,
                time: time_at(row, 2)?,
            })
        })?
        .collect::<duckdb::Result<HashSet<RecordKey>>>()?;
    Ok(keys)
}

/// Mean of each of the `columns` for every distinct time of day, see
/// [`mean_at`].  If `region` is given, only the rows of that region are used.
/// Times of day without rows don't show up at all.
pub fn average_by_time_of_day(
    conn: &Connection,
    table: &str,
    columns: &[&str],
    region: Option<&str>,
) -> duckdb::Result<Vec<(Time, Vec<Decimal>)>> {
    let means: Vec<String> = columns.iter().map(|c| mean_sql(c)).collect();
    let query = format!(
        r#"
SELECT
    CAST(half_hour_start AS VARCHAR),
    {}
FROM {}
{}
GROUP BY half_hour_start
ORDER BY half_hour_start;
    "#,
        means.join(",\n    "),
        table,
        match region {
            Some(_) => "WHERE region = ?",
            None => "",
        },
    );
    let mut stmt = conn.prepare(&query)?;
    let res = stmt
        .query_map(params_from_iter(region), |row| {
            let time = time_at(row, 0)?;
            let values = (0..columns.len())
                .map(|i| mean_at(row, 1 + 2 * i))
                .collect::<Option<Vec<Decimal>>>();
            Ok((time, values))
        })?
        .collect::<duckdb::Result<Vec<_>>>()?;
    Ok(res
        .into_iter()
        .filter_map(|(time, values)| values.map(|vs| (time, vs)))
        .collect())
}

/// Select the sum and the count of a column, to be read back with [`mean_at`].
/// Takes two columns of the result.
pub fn mean_sql(column: &str) -> String {
    format!("SUM({0})::DECIMAL(18,6), COUNT({0})", column)
}

/// The mean from the sum at `idx` and the count at `idx + 1`, rounded once to
/// 2 decimals.  `None` if there are no values.
pub fn mean_at(row: &Row, idx: usize) -> Option<Decimal> {
    let sum = decimal_at(row, idx)?;
    let n = decimal_at(row, idx + 1)?;
    if n.is_zero() {
        return None;
    }
    sum.checked_div(n).map(round2)
}

/// Round half away from zero to 2 decimals, e.g. 2.345 -> 2.35.
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Read a numeric column as a decimal.  `None` for NULL.
pub fn decimal_at(row: &Row, idx: usize) -> Option<Decimal> {
    match row.get_ref_unwrap(idx) {
        ValueRef::Decimal(v) => Some(v),
        ValueRef::Double(v) => Decimal::from_f64(v),
        ValueRef::Int(v) => Some(Decimal::from(v)),
        ValueRef::BigInt(v) => Some(Decimal::from(v)),
        _ => None,
    }
}

/// Read a `CAST(date AS VARCHAR)` column.
pub fn date_at(row: &Row, idx: usize) -> duckdb::Result<Date> {
    let s: String = row.get(idx)?;
    s.parse::<Date>()
        .map_err(|e| duckdb::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Read a `CAST(time AS VARCHAR)` column.
pub fn time_at(row: &Row, idx: usize) -> duckdb::Result<Time> {
    let s: String = row.get(idx)?;
    s.parse::<Time>()
        .map_err(|e| duckdb::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

#[cfg(test)]
mod tests {
    use jiff::civil::{date, time};
    use rust_decimal_macros::dec;

    use super::*;

    struct Reading {
        region: &'static str,
        date: Date,
        time: Time,
        value: i32,
    }

    impl StoredRecord for Reading {
        const TABLE: &'static str = "readings";
        const COLUMNS: &'static [(&'static str, &'static str)] = &[("value", "INTEGER")];

        fn key(&self) -> RecordKey {
            RecordKey::new(self.time, self.date, self.region)
        }

        fn values(&self) -> Vec<Value> {
            vec![Value::Int(self.value)]
        }
    }

    fn setup() -> duckdb::Result<Connection> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(
            r"
    CREATE TABLE readings (
        region VARCHAR NOT NULL,
        date DATE NOT NULL,
        half_hour_start TIME NOT NULL,
        value INTEGER NOT NULL,
        PRIMARY KEY (half_hour_start, date, region)
    );",
        )?;
        Ok(conn)
    }

    fn reading(day: i8, hour: i8, minute: i8, value: i32) -> Reading {
        Reading {
            region: "London",
            date: date(2024, 4, day),
            time: time(hour, minute, 0, 0),
            value,
        }
    }

    #[test]
    fn key_display() {
        let key = RecordKey::new(time(0, 30, 0, 0), date(2024, 4, 21), "London");
        assert_eq!(key.to_string(), "00:30 21-04-2024 London");
    }

    #[test]
    fn upsert_is_idempotent() -> duckdb::Result<()> {
        let mut conn = setup()?;
        let rows = vec![reading(21, 0, 0, 10), reading(21, 0, 30, 20), reading(21, 0, 30, 99)];
        assert_eq!(upsert(&mut conn, &rows)?, 2);
        assert_eq!(upsert(&mut conn, &rows)?, 0);
        assert_eq!(count(&conn, "readings")?, 2);

        let keys = existing_keys(&conn, "readings")?;
        assert!(keys.contains(&RecordKey::new(time(0, 30, 0, 0), date(2024, 4, 21), "London")));
        Ok(())
    }

    #[test]
    fn upsert_limit_skips_existing() -> duckdb::Result<()> {
        let mut conn = setup()?;
        let rows: Vec<Reading> = (0..10).map(|h| reading(21, h, 0, h as i32)).collect();
        assert_eq!(upsert_with_limit(&mut conn, &rows, 4)?, 4);
        assert_eq!(upsert_with_limit(&mut conn, &rows, 4)?, 4);
        assert_eq!(upsert_with_limit(&mut conn, &rows, 4)?, 2);
        assert_eq!(upsert_with_limit(&mut conn, &rows, 4)?, 0);
        assert_eq!(count(&conn, "readings")?, 10);
        Ok(())
    }

    #[test]
    fn average_by_time() -> duckdb::Result<()> {
        let mut conn = setup()?;
        let rows = vec![
            reading(21, 0, 30, 10),
            reading(22, 0, 30, 20),
            reading(23, 0, 30, 30),
            reading(21, 1, 0, 1),
            reading(22, 1, 0, 2),
        ];
        upsert(&mut conn, &rows)?;
        let avg = average_by_time_of_day(&conn, "readings", &["value"], None)?;
        assert_eq!(
            avg,
            vec![
                (time(0, 30, 0, 0), vec![dec!(20.00)]),
                (time(1, 0, 0, 0), vec![dec!(1.50)]),
            ]
        );
        let other = average_by_time_of_day(&conn, "readings", &["value"], Some("Yorkshire"))?;
        assert!(other.is_empty());
        Ok(())
    }

    #[test]
    fn average_of_empty_table() -> duckdb::Result<()> {
        let conn = setup()?;
        assert!(average_by_time_of_day(&conn, "readings", &["value"], None)?.is_empty());
        Ok(())
    }

    #[test]
    fn rounding() {
        assert_eq!(round2(dec!(2.345)), dec!(2.35));
        assert_eq!(round2(dec!(20)), dec!(20.00));
        assert_eq!(round2(dec!(-1.005)), dec!(-1.01));
    }
}
