//! Per-model token costs in USD.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// USD cost per (input, output) token for a model.
///
/// Unknown models cost zero rather than erroring — cost tracking is
/// advisory and must never block a completion.
pub(crate) fn cost_per_token(model: &str) -> (Decimal, Decimal) {
    match model {
        m if m.starts_with("gpt-4o-mini") => (dec!(0.00000015), dec!(0.0000006)),
        m if m.starts_with("gpt-4o") => (dec!(0.0000025), dec!(0.00001)),
        m if m.starts_with("gpt-4.1-mini") => (dec!(0.0000004), dec!(0.0000016)),
        m if m.starts_with("gpt-4.1") => (dec!(0.000002), dec!(0.000008)),
        m if m.contains("haiku") => (dec!(0.0000008), dec!(0.000004)),
        m if m.contains("sonnet") => (dec!(0.000003), dec!(0.000015)),
        m if m.contains("opus") => (dec!(0.000015), dec!(0.000075)),
        _ => (Decimal::ZERO, Decimal::ZERO),
    }
}
