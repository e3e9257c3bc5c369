//! Rupiah formatting

use rust_decimal::{Decimal, RoundingStrategy};

/// Format an amount as whole rupiah with `.` grouping: `Rp 1.234.567`
pub fn format_rupiah(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    let digits = rounded.abs().trunc().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    if rounded.is_sign_negative() && !rounded.is_zero() {
        format!("Rp -{}", grouped)
    } else {
        format!("Rp {}", grouped)
    }
}
