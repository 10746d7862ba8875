use chrono::{NaiveDate, Utc};

/// Wall-clock milliseconds since the Unix epoch, the unit of every stored timestamp.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}
