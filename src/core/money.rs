//! 金額運算一律走 `Decimal`，儲存與比較固定兩位小數，
//! 中間計算保留完整精度，最後才捨入。

use crate::utils::error::{Result, SyncError};
use rust_decimal::{Decimal, RoundingStrategy};

/// 金額儲存位數（分）
pub const DECIMAL_PLACES: u32 = 2;

/// 固定增值稅率 20%
pub const VAT_RATE: Decimal = Decimal::from_parts(20, 0, 0, false, 2);

/// 會計系統的稅別代碼
pub const VAT_CLASS: &str = "KM20";

/// 捨入到分，四捨五入（half-up）
pub fn round_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// 兩個金額在分的精度上是否相等
pub fn money_eq(a: Decimal, b: Decimal) -> bool {
    round_cents(a) == round_cents(b)
}

/// 行金額：單價 × 數量，捨入到分
pub fn line_total(unit_price: Decimal, quantity: u32) -> Decimal {
    round_cents(unit_price * Decimal::from(quantity))
}

/// 含稅金額換算為稅前金額；不捨入，由呼叫端決定捨入點
pub fn gross_to_net(gross: Decimal) -> Decimal {
    gross / (Decimal::ONE + VAT_RATE)
}

/// 某稅前金額的增值稅，捨入到分
pub fn vat_on(net: Decimal) -> Decimal {
    round_cents(net * VAT_RATE)
}

/// 除法；除以零是錯誤而不是默默回 0
pub fn checked_div(numerator: Decimal, denominator: Decimal, context: &str) -> Result<Decimal> {
    if denominator.is_zero() {
        return Err(SyncError::DivisionByZero {
            context: context.to_string(),
        });
    }
    Ok(numerator / denominator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_vat_rate_constant() {
        assert_eq!(VAT_RATE, d("0.20"));
    }

    #[test]
    fn test_round_cents_half_up() {
        assert_eq!(round_cents(d("1.005")), d("1.01"));
        assert_eq!(round_cents(d("1.004")), d("1.00"));
        assert_eq!(round_cents(d("-1.005")), d("-1.01"));
        assert_eq!(round_cents(d("8.333333")), d("8.33"));
    }

    #[test]
    fn test_money_eq_at_cent_precision() {
        assert!(money_eq(d("8.333"), d("8.329")));
        assert!(!money_eq(d("8.33"), d("8.34")));
    }

    #[test]
    fn test_line_total() {
        assert_eq!(line_total(d("2.15"), 4), d("8.60"));
        assert_eq!(line_total(d("1.205"), 1), d("1.21"));
    }

    #[test]
    fn test_gross_to_net_keeps_precision() {
        // 10.00 / 1.2 不在這裡捨入
        let net = gross_to_net(d("10.00"));
        assert_ne!(net, d("8.33"));
        assert_eq!(round_cents(net), d("8.33"));
    }

    #[test]
    fn test_checked_div_zero_is_error() {
        assert!(checked_div(d("1.00"), Decimal::ZERO, "reference value").is_err());
        assert_eq!(
            checked_div(d("1.00"), d("2.00"), "x").unwrap(),
            d("0.50")
        );
    }
}
