//! Cell values and locale-aware number/date parsing

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::config::DateSystem;

/// Largest serial Excel can represent (9999-12-31)
const MAX_SERIAL: f64 = 2_958_465.0;

/// A single decoded cell
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    /// Date already resolved by the workbook reader (its own 1900/1904 epoch applied)
    Date(NaiveDate),
}

/// Shared empty cell for absent columns
pub static EMPTY_CELL: Cell = Cell::Empty;

impl Cell {
    /// Build a text cell, mapping blank text to `Empty`
    pub fn text(s: impl Into<String>) -> Self {
        let s = s.into();
        if s.trim().is_empty() {
            Cell::Empty
        } else {
            Cell::Text(s)
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(_) | Cell::Date(_) => false,
        }
    }

    /// Trimmed text form. Whole numbers render without a fraction so order
    /// ids stored as numbers keep their digits.
    pub fn as_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.trim().to_string(),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            Cell::Number(n) => n.to_string(),
            Cell::Date(d) => d.format("%Y-%m-%d").to_string(),
        }
    }

    /// Non-empty trimmed text, if any
    pub fn non_empty_text(&self) -> Option<String> {
        let text = self.as_text();
        (!text.is_empty()).then_some(text)
    }
}

/// Parse a money/number cell.
///
/// Typed numbers are taken as is. Text is stripped of everything but digits,
/// sign and the decimal separator; `(123)` means negative. When the decimal
/// separator appears more than once it is taken as digit grouping.
pub fn parse_amount(cell: &Cell, decimal_separator: char) -> Option<Decimal> {
    match cell {
        Cell::Empty | Cell::Date(_) => None,
        Cell::Number(n) => {
            if n.is_finite() {
                Decimal::try_from(*n).ok().map(|d| d.normalize())
            } else {
                None
            }
        }
        Cell::Text(s) => parse_amount_text(s, decimal_separator),
    }
}

fn parse_amount_text(s: &str, decimal_separator: char) -> Option<Decimal> {
    let s = s.trim();

    let (negated, s) = if s.starts_with('(') && s.ends_with(')') && s.len() > 2 {
        (true, &s[1..s.len() - 1])
    } else {
        (false, s)
    };

    let separators = s.chars().filter(|c| *c == decimal_separator).count();
    let cleaned: String = s
        .chars()
        .filter_map(|c| {
            if c.is_ascii_digit() || c == '-' || c == '+' {
                Some(c)
            } else if c == decimal_separator && separators == 1 {
                Some('.')
            } else {
                None
            }
        })
        .collect();

    if !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let amount: Decimal = cleaned.parse().ok()?;
    Some(if negated && amount > Decimal::ZERO { -amount } else { amount })
}

/// Round a non-negative decimal to a whole count, half away from zero
pub fn round_count(value: Decimal) -> u32 {
    value
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u32()
        .unwrap_or(0)
}

/// Convert a spreadsheet date serial to a calendar date.
///
/// The 1900 system counts 1900-01-01 as serial 1 and keeps the phantom
/// 1900-02-29 at serial 60, which has no real date. The time-of-day fraction
/// is dropped.
pub fn serial_to_date(serial: f64, system: DateSystem) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 0.0 || serial > MAX_SERIAL {
        return None;
    }
    let days = serial.floor() as i64;

    let (base, days) = match system {
        DateSystem::Excel1900 => {
            if days < 1 || days == 60 {
                return None;
            }
            if days < 60 {
                (NaiveDate::from_ymd_opt(1899, 12, 31)?, days)
            } else {
                (NaiveDate::from_ymd_opt(1899, 12, 30)?, days)
            }
        }
        DateSystem::Excel1904 => (NaiveDate::from_ymd_opt(1904, 1, 1)?, days),
    };

    base.checked_add_signed(Duration::days(days))
}

/// Parse a date cell.
///
/// Order: workbook date, serial number, slash pattern (`YYYY/MM/DD` or `DD/MM/YYYY`, time
/// suffix ignored), then a handful of generic formats.
pub fn parse_date(cell: &Cell, system: DateSystem) -> Option<NaiveDate> {
    match cell {
        Cell::Empty => None,
        Cell::Number(n) => serial_to_date(*n, system),
        Cell::Date(d) => Some(*d),
        Cell::Text(s) => parse_date_text(s.trim(), system),
    }
}

fn parse_date_text(s: &str, system: DateSystem) -> Option<NaiveDate> {
    if s.is_empty() {
        return None;
    }

    // Serial exported as text
    if s.chars().all(|c| c.is_ascii_digit() || c == '.') {
        if let Ok(serial) = s.parse::<f64>() {
            return serial_to_date(serial, system);
        }
    }

    let date_part = s.split_whitespace().next().unwrap_or(s);
    if let Some(date) = parse_separated(date_part, '/').or_else(|| parse_separated(date_part, '-')) {
        return Some(date);
    }

    parse_generic(s)
}

/// `YYYY<sep>MM<sep>DD` or `DD<sep>MM<sep>YYYY`
fn parse_separated(s: &str, sep: char) -> Option<NaiveDate> {
    let parts: Vec<&str> = s.split(sep).collect();
    if parts.len() != 3 || parts.iter().any(|p| p.is_empty() || !p.chars().all(|c| c.is_ascii_digit())) {
        return None;
    }

    let nums: Vec<u32> = parts.iter().map(|p| p.parse().ok()).collect::<Option<_>>()?;
    if parts[0].len() == 4 {
        NaiveDate::from_ymd_opt(nums[0] as i32, nums[1], nums[2])
    } else if parts[2].len() == 4 {
        NaiveDate::from_ymd_opt(nums[2] as i32, nums[1], nums[0])
    } else {
        None
    }
}

fn parse_generic(s: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }

    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
    ];
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }

    const DATE_FORMATS: &[&str] = &["%d %b %Y", "%d %B %Y", "%b %d, %Y", "%B %d, %Y", "%Y.%m.%d", "%d.%m.%Y"];
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_amount_text() {
        assert_eq!(parse_amount(&Cell::text("Rp 196,250"), '.'), Some(dec("196250")));
        assert_eq!(parse_amount(&Cell::text("12,345.67"), '.'), Some(dec("12345.67")));
        assert_eq!(parse_amount(&Cell::text("-5000"), '.'), Some(dec("-5000")));
        assert_eq!(parse_amount(&Cell::text("(2,500)"), '.'), Some(dec("-2500")));
    }

    #[test]
    fn test_parse_amount_comma_decimal_locale() {
        assert_eq!(parse_amount(&Cell::text("1.234,56"), ','), Some(dec("1234.56")));
        assert_eq!(parse_amount(&Cell::text("Rp 1.234.567"), ','), Some(dec("1234567")));
    }

    #[test]
    fn test_parse_amount_repeated_separator_is_grouping() {
        assert_eq!(parse_amount(&Cell::text("1.234.567"), '.'), Some(dec("1234567")));
    }

    #[test]
    fn test_parse_amount_malformed() {
        assert_eq!(parse_amount(&Cell::Empty, '.'), None);
        assert_eq!(parse_amount(&Cell::text("n/a"), '.'), None);
        assert_eq!(parse_amount(&Cell::text("12-34"), '.'), None);
        assert_eq!(parse_amount(&Cell::Number(f64::NAN), '.'), None);
    }

    #[test]
    fn test_parse_amount_number_cell() {
        assert_eq!(parse_amount(&Cell::Number(83218.0), '.'), Some(dec("83218")));
        assert_eq!(parse_amount(&Cell::Number(-1500.5), '.'), Some(dec("-1500.5")));
    }

    #[test]
    fn test_serial_1900_system() {
        assert_eq!(serial_to_date(1.0, DateSystem::Excel1900), Some(ymd(1900, 1, 1)));
        assert_eq!(serial_to_date(59.0, DateSystem::Excel1900), Some(ymd(1900, 2, 28)));
        assert_eq!(serial_to_date(60.0, DateSystem::Excel1900), None);
        assert_eq!(serial_to_date(61.0, DateSystem::Excel1900), Some(ymd(1900, 3, 1)));
        assert_eq!(serial_to_date(45672.0, DateSystem::Excel1900), Some(ymd(2025, 1, 15)));
        assert_eq!(serial_to_date(45678.0, DateSystem::Excel1900), Some(ymd(2025, 1, 21)));
        // time of day is dropped
        assert_eq!(serial_to_date(45672.75, DateSystem::Excel1900), Some(ymd(2025, 1, 15)));
    }

    #[test]
    fn test_serial_1904_system() {
        assert_eq!(serial_to_date(0.0, DateSystem::Excel1904), Some(ymd(1904, 1, 1)));
        assert_eq!(serial_to_date(44216.0, DateSystem::Excel1904), Some(ymd(2025, 1, 21)));
    }

    #[test]
    fn test_serial_out_of_range() {
        assert_eq!(serial_to_date(-1.0, DateSystem::Excel1900), None);
        assert_eq!(serial_to_date(3_000_000.0, DateSystem::Excel1900), None);
    }

    #[test]
    fn test_parse_date_slash_patterns() {
        let sys = DateSystem::Excel1900;
        assert_eq!(parse_date(&Cell::text("2025/01/15"), sys), Some(ymd(2025, 1, 15)));
        assert_eq!(parse_date(&Cell::text("01/02/2024"), sys), Some(ymd(2024, 2, 1)));
        assert_eq!(parse_date(&Cell::text("29/10/2025 14:22:05"), sys), Some(ymd(2025, 10, 29)));
        assert_eq!(parse_date(&Cell::text("2025-10-20"), sys), Some(ymd(2025, 10, 20)));
    }

    #[test]
    fn test_parse_date_serial_cell_matches_text() {
        let sys = DateSystem::Excel1900;
        assert_eq!(
            parse_date(&Cell::Number(45672.0), sys),
            parse_date(&Cell::text("2025/01/15"), sys)
        );
        assert_eq!(parse_date(&Cell::text("45672"), sys), Some(ymd(2025, 1, 15)));
    }

    #[test]
    fn test_workbook_date_ignores_configured_system() {
        let cell = Cell::Date(ymd(2025, 1, 21));
        assert_eq!(parse_date(&cell, DateSystem::Excel1900), Some(ymd(2025, 1, 21)));
        assert_eq!(parse_date(&cell, DateSystem::Excel1904), Some(ymd(2025, 1, 21)));
        assert_eq!(parse_amount(&cell, '.'), None);
    }

    #[test]
    fn test_parse_date_generic() {
        let sys = DateSystem::Excel1900;
        assert_eq!(parse_date(&Cell::text("2025-03-04T10:00:00+07:00"), sys), Some(ymd(2025, 3, 4)));
        assert_eq!(parse_date(&Cell::text("4 Mar 2025"), sys), Some(ymd(2025, 3, 4)));
        assert_eq!(parse_date(&Cell::text("not a date"), sys), None);
        assert_eq!(parse_date(&Cell::text("32/13/2025"), sys), None);
    }

    #[test]
    fn test_cell_text_forms() {
        assert_eq!(Cell::Number(577123456789.0).as_text(), "577123456789");
        assert_eq!(Cell::text("  abc ").as_text(), "abc");
        assert!(Cell::text("   ").is_empty());
        assert_eq!(Cell::Empty.non_empty_text(), None);
        assert_eq!(Cell::Date(ymd(2025, 1, 21)).as_text(), "2025-01-21");
    }

    #[test]
    fn test_round_count() {
        assert_eq!(round_count(dec("2.5")), 3);
        assert_eq!(round_count(dec("0.4")), 0);
        assert_eq!(round_count(dec("-3")), 0);
    }
}
