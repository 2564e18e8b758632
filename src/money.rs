use std::str::FromStr;

use rust_decimal::Decimal;

pub fn format_money(amount: Decimal) -> String {
    format!("${:.2}", amount)
}

/// Sum of `amounts`, or `None` once it leaves the range a `Decimal` holds.
pub fn checked_total(amounts: impl IntoIterator<Item = Decimal>) -> Option<Decimal> {
    amounts
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, amount| acc.checked_add(amount))
}

/// Parses a form amount. Blank input is zero, anything unparsable is `None`.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim().trim_start_matches('$').replace(',', "");
    if trimmed.is_empty() {
        return Some(Decimal::ZERO);
    }
    Decimal::from_str(&trimmed).ok()
}
