//! 強迫會計系統算出來的總額與來源訂單分毫不差。
//!
//! 會計系統是逐行計稅（每行的稅各自捨入到分），而不是對小計整筆計稅，
//! 所以這裡用兩種互補的修正：調整一行的單價，加上發票上的尾差欄位。

use crate::core::money::{line_total, money_eq, round_cents, vat_on, VAT_RATE};
use crate::domain::model::{CanonicalInvoiceLine, ReconciliationResult};
use crate::utils::error::{Result, SyncError};
use rust_decimal::Decimal;

pub fn reconcile(
    order_id: u64,
    source_total: Decimal,
    mut lines: Vec<CanonicalInvoiceLine>,
) -> Result<ReconciliationResult> {
    if lines.is_empty() {
        // 全退化訂單：只有總額也是零才說得通
        if source_total.is_zero() {
            return Ok(ReconciliationResult {
                lines,
                subtotal: Decimal::ZERO,
                tax_amount: Decimal::ZERO,
                rounding: Decimal::ZERO,
                total: Decimal::ZERO,
            });
        }
        return Err(SyncError::OrderValidationError {
            order_id,
            message: format!(
                "cannot reconcile total {} against an order with no invoice lines",
                source_total
            ),
        });
    }

    let subtotal: Decimal = lines.iter().map(|l| line_total(l.unit_price, l.quantity)).sum();
    let naive_tax = vat_on(subtotal);
    let naive_total = subtotal + naive_tax;
    let difference = round_cents(source_total - naive_total);

    if !difference.is_zero() {
        // 整筆稅前調整放到金額最大的那一行（平手時取先出現者）
        let mut target = 0;
        let mut largest = Decimal::MIN;
        for (i, line) in lines.iter().enumerate() {
            let total = line_total(line.unit_price, line.quantity);
            if total > largest {
                largest = total;
                target = i;
            }
        }

        let target_subtotal = round_cents(source_total / (Decimal::ONE + VAT_RATE));
        let adjustment = target_subtotal - subtotal;

        let line = &mut lines[target];
        let old_total = line_total(line.unit_price, line.quantity);
        let new_total = old_total + adjustment;
        line.unit_price = round_cents(new_total / Decimal::from(line.quantity));

        tracing::debug!(
            order_id,
            %difference,
            %adjustment,
            line = %line.code,
            "adjusted largest line to close pre-tax gap"
        );
    }

    // 調整之後重算；預期稅額照會計系統的方式逐行捨入
    let subtotal: Decimal = lines.iter().map(|l| line_total(l.unit_price, l.quantity)).sum();
    let naive_tax = vat_on(subtotal);
    let naive_total = subtotal + naive_tax;
    let predicted_tax: Decimal = lines
        .iter()
        .map(|l| vat_on(line_total(l.unit_price, l.quantity)))
        .sum();

    // 逐行捨入與整筆捨入的差
    let tax_drift = predicted_tax - naive_tax;
    let rounding = round_cents((source_total - naive_total) - tax_drift);

    if !money_eq(subtotal + predicted_tax + rounding, source_total) {
        return Err(SyncError::ReconciliationMismatch {
            order_id,
            subtotal,
            tax: predicted_tax,
            rounding,
            source_total,
        });
    }

    Ok(ReconciliationResult {
        lines,
        subtotal,
        tax_amount: predicted_tax,
        rounding,
        total: source_total,
    })
}
