//! 把來源訂單的各種行項（商品、運費、折扣、虛擬組合包）
//! 正規化成稅前的發票行。

use crate::core::catalog::{BundleComponent, Catalog};
use crate::core::money::{
    checked_div, gross_to_net, line_total, round_cents, VAT_CLASS,
};
use crate::domain::model::{CanonicalInvoiceLine, SourceLineItem, SourceOrder};
use crate::utils::error::{Result, SyncError};
use rust_decimal::Decimal;

pub const DEFAULT_UNIT: &str = "tk";
pub const LOCATION_CODE: u32 = 1;

const SHIPPING_CODE: &str = "TRANSPORT";
const DISCOUNT_CODE: &str = "ALLAHINDLUS";

/// 輸出順序固定：商品行、運費行、折扣行。
/// 後面的對帳器挑「最大行」時靠這個順序決定平手時的贏家。
pub fn normalize_order(catalog: &Catalog, order: &SourceOrder) -> Result<Vec<CanonicalInvoiceLine>> {
    let mut lines = Vec::new();

    for item in &order.line_items {
        if item.quantity == 0 {
            return Err(SyncError::OrderValidationError {
                order_id: order.id,
                message: format!("line item '{}' has zero quantity", item.name),
            });
        }
        if !item.has_any_pricing() {
            return Err(SyncError::OrderValidationError {
                order_id: order.id,
                message: format!("line item '{}' carries no pricing fields", item.name),
            });
        }

        let unit_net = pre_tax_unit_price(item, order.prices_include_tax);

        if let Some(components) = catalog.bundle(&item.name) {
            let bundle_total = line_total(unit_net, item.quantity);
            lines.extend(expand_bundle(components, bundle_total, item.quantity)?);
            continue;
        }

        let unit_price = round_cents(unit_net);
        if unit_price.is_zero() {
            // 退化行：照樣輸出但金額為零
            tracing::warn!(
                order_id = order.id,
                item = %item.name,
                "line item resolved to zero price"
            );
        }

        let (code, description, unit) = match catalog.lookup(&item.name, item.sku.as_deref()) {
            Some(info) => (info.code.clone(), info.description.clone(), info.unit.clone()),
            None => {
                // 對照表沒有的商品：代碼退回 SKU（沒有 SKU 就用商品 ID）
                let code = item
                    .sku
                    .clone()
                    .filter(|s| !s.trim().is_empty())
                    .or_else(|| item.product_id.map(|id| id.to_string()))
                    .unwrap_or_else(|| item.name.clone());
                (code, item.name.clone(), DEFAULT_UNIT.to_string())
            }
        };

        lines.push(CanonicalInvoiceLine {
            code,
            description,
            quantity: item.quantity,
            unit_price,
            tax_class: VAT_CLASS.to_string(),
            unit,
            location_code: LOCATION_CODE,
        });
    }

    for shipping in &order.shipping_lines {
        let net = round_cents(amount_net(
            shipping.total,
            shipping.total_tax,
            order.prices_include_tax,
        ));
        // 零或負的運費不開行
        if net <= Decimal::ZERO {
            continue;
        }
        let description = if shipping.method_title.trim().is_empty() {
            "Transport".to_string()
        } else {
            shipping.method_title.clone()
        };
        lines.push(CanonicalInvoiceLine {
            code: SHIPPING_CODE.to_string(),
            description,
            quantity: 1,
            unit_price: net,
            tax_class: VAT_CLASS.to_string(),
            unit: DEFAULT_UNIT.to_string(),
            location_code: LOCATION_CODE,
        });
    }

    for coupon in &order.coupon_lines {
        let net = round_cents(amount_net(
            coupon.discount,
            coupon.discount_tax,
            order.prices_include_tax,
        ));
        if net <= Decimal::ZERO {
            continue;
        }
        lines.push(CanonicalInvoiceLine {
            code: DISCOUNT_CODE.to_string(),
            description: format!("Kupong {}", coupon.code),
            quantity: 1,
            unit_price: -net,
            tax_class: VAT_CLASS.to_string(),
            unit: DEFAULT_UNIT.to_string(),
            location_code: LOCATION_CODE,
        });
    }

    Ok(lines)
}

/// 稅前單價，保留完整精度。欄位優先序：
/// 小計+小計稅 → 小計 → 單價 → 0（退化）
fn pre_tax_unit_price(item: &SourceLineItem, prices_include_tax: bool) -> Decimal {
    let quantity = Decimal::from(item.quantity);

    if let (Some(subtotal), Some(subtotal_tax)) = (item.subtotal, item.subtotal_tax) {
        return (subtotal - subtotal_tax) / quantity;
    }

    if let Some(subtotal) = item.subtotal {
        let net = if prices_include_tax {
            gross_to_net(subtotal)
        } else {
            subtotal
        };
        return net / quantity;
    }

    if let Some(price) = item.price {
        return if prices_include_tax {
            gross_to_net(price)
        } else {
            price
        };
    }

    Decimal::ZERO
}

/// 含稅與否的金額正規化（運費與折扣行用）
fn amount_net(amount: Decimal, tax: Option<Decimal>, prices_include_tax: bool) -> Decimal {
    if prices_include_tax {
        match tax {
            Some(t) => amount - t,
            None => gross_to_net(amount),
        }
    } else {
        amount
    }
}

/// 把虛擬組合包展開成實際商品行。
/// 展開後各行的稅前合計必須正好等於組合包自己的稅前金額。
fn expand_bundle(
    components: &[BundleComponent],
    bundle_total: Decimal,
    bundle_quantity: u32,
) -> Result<Vec<CanonicalInvoiceLine>> {
    // 參考零售總值
    let reference_total: Decimal = components
        .iter()
        .map(|c| c.reference_price * Decimal::from(c.units_per_bundle * bundle_quantity))
        .sum();

    let discount_factor = checked_div(bundle_total, reference_total, "bundle reference value")?;

    let mut lines: Vec<CanonicalInvoiceLine> = components
        .iter()
        .map(|c| CanonicalInvoiceLine {
            code: c.code.clone(),
            description: c.description.clone(),
            quantity: c.units_per_bundle * bundle_quantity,
            unit_price: round_cents(c.reference_price * discount_factor),
            tax_class: VAT_CLASS.to_string(),
            unit: c.unit.clone(),
            location_code: LOCATION_CODE,
        })
        .collect();

    let expanded_total: Decimal = lines
        .iter()
        .map(|l| line_total(l.unit_price, l.quantity))
        .sum();

    let residual = bundle_total - expanded_total;
    if !residual.is_zero() {
        // 尾差整筆放到參考值占比最大的成分上。
        // 這一行的單價不再捨到分，這樣行金額捨入後才吸收得掉尾差。
        let mut designated = 0;
        let mut best_share = Decimal::MIN;
        for (i, c) in components.iter().enumerate() {
            let share = c.reference_price * Decimal::from(c.units_per_bundle);
            // 嚴格大於：平手時第一個成分贏
            if share > best_share {
                best_share = share;
                designated = i;
            }
        }

        let line = &mut lines[designated];
        let new_total = line_total(line.unit_price, line.quantity) + residual;
        line.unit_price = checked_div(new_total, Decimal::from(line.quantity), "bundle quantity")?;

        tracing::debug!(
            %residual,
            component = %line.code,
            "bundle residual folded into largest component"
        );
    }

    Ok(lines)
}
