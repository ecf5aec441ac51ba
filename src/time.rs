//! Timestamps for log lines and the `Date` response header.

use std::time::SystemTime;

use tracing_subscriber::fmt::time::ChronoLocal;

/// Local wall clock format used in log lines, e.g. `2024/04/22 23:59:59`.
pub const LOCAL_TIME_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// Current time as an HTTP date, e.g. `Wed, 06 Nov 2024 21:12:07 GMT`.
pub fn server_date() -> String {
    http_date(SystemTime::now())
}

pub fn http_date(time: SystemTime) -> String {
    httpdate::fmt_http_date(time)
}

/// Timer for the log formatter, rendering local time in [`LOCAL_TIME_FORMAT`].
pub fn local_timer() -> ChronoLocal {
    ChronoLocal::new(LOCAL_TIME_FORMAT.to_string())
}
