//! UK tax-year windows and day-key helpers.

use chrono::{Datelike, Duration, NaiveDate};

/// Start of the UK tax year beginning in calendar year `y` (6 April, UTC midnight).
pub fn tax_year_start(y: i32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, 4, 6).expect("valid tax year start")
}

/// End of the UK tax year beginning in calendar year `y` (5 April of `y + 1`).
pub fn tax_year_end(y: i32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y + 1, 4, 5).expect("valid tax year end")
}

/// True iff `date` falls within the tax year beginning in `y`, inclusive of both bounds.
pub fn in_tax_year(date: NaiveDate, y: i32) -> bool {
    date >= tax_year_start(y) && date <= tax_year_end(y)
}

/// The tax year (its start year) that `date` falls within.
pub fn tax_year_of(date: NaiveDate) -> i32 {
    let year = date.year();
    if date.month() < 4 || (date.month() == 4 && date.day() < 6) {
        year - 1
    } else {
        year
    }
}

/// The 30 days immediately following `date`, in order: `D+1 ..= D+30`.
/// Handles month and year boundaries, including leap days, by construction
/// (each step is a `chrono::Duration::days(1)` addition).
pub fn bnb_window(date: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    (1..=30).map(move |offset| date + Duration::days(offset))
}

/// The epoch the calculation driver begins its day walk from (1 Jan 2010).
pub fn engine_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(2010, 1, 1).expect("valid epoch")
}
