//! 商品對照表：網店品名/SKU 對應會計系統的商品代碼，
//! 以及「虛擬組合包」展開成實際商品的定義。

use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct ProductInfo {
    pub code: String,
    pub description: String,
    pub unit: String,
}

/// 組合包的單一成分：每一個組合包單位換多少件、零售參考單價
#[derive(Debug, Clone)]
pub struct BundleComponent {
    pub code: String,
    pub description: String,
    pub unit: String,
    pub units_per_bundle: u32,
    pub reference_price: Decimal,
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    products: HashMap<String, ProductInfo>,
    bundles: HashMap<String, Vec<BundleComponent>>,
}

/// 查找鍵一律小寫、去除前後空白
fn key(s: &str) -> String {
    s.trim().to_lowercase()
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_product(mut self, names: &[&str], info: ProductInfo) -> Self {
        for name in names {
            self.products.insert(key(name), info.clone());
        }
        self
    }

    pub fn with_bundle(mut self, name: &str, components: Vec<BundleComponent>) -> Self {
        self.bundles.insert(key(name), components);
        self
    }

    /// 先以品名查，再以 SKU 查
    pub fn lookup(&self, name: &str, sku: Option<&str>) -> Option<&ProductInfo> {
        self.products
            .get(&key(name))
            .or_else(|| sku.and_then(|s| self.products.get(&key(s))))
    }

    pub fn bundle(&self, name: &str) -> Option<&[BundleComponent]> {
        self.bundles.get(&key(name)).map(|c| c.as_slice())
    }

    /// 目前的店面商品資料
    pub fn plant_shop() -> Self {
        let soil = ProductInfo {
            code: "MULD-3L".to_string(),
            description: "Istutusmuld toataimedele 3L".to_string(),
            unit: "tk".to_string(),
        };
        let concentrate = ProductInfo {
            code: "TOIT-250".to_string(),
            description: "Taimetoidu kontsentraat 250ml".to_string(),
            unit: "tk".to_string(),
        };

        Catalog::new()
            .with_product(&["Istutusmuld 3L", "MULD-3L"], soil.clone())
            .with_product(&["Taimetoidu kontsentraat", "TOIT-250"], concentrate.clone())
            .with_bundle(
                "Toataimede Uus Algus",
                vec![
                    BundleComponent {
                        code: soil.code.clone(),
                        description: soil.description.clone(),
                        unit: soil.unit.clone(),
                        units_per_bundle: 4,
                        reference_price: Decimal::from_str("2.15").unwrap(),
                    },
                    BundleComponent {
                        code: concentrate.code.clone(),
                        description: concentrate.description.clone(),
                        unit: concentrate.unit.clone(),
                        units_per_bundle: 2,
                        reference_price: Decimal::from_str("2.99").unwrap(),
                    },
                ],
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_name_and_sku() {
        let catalog = Catalog::plant_shop();
        assert_eq!(
            catalog.lookup("Istutusmuld 3L", None).unwrap().code,
            "MULD-3L"
        );
        // 品名沒中時退回 SKU
        assert_eq!(
            catalog.lookup("Muld eritellimus", Some("MULD-3L")).unwrap().code,
            "MULD-3L"
        );
        assert!(catalog.lookup("Tundmatu toode", None).is_none());
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let catalog = Catalog::plant_shop();
        assert!(catalog.lookup("istutusmuld 3l", None).is_some());
        assert!(catalog.bundle("TOATAIMEDE UUS ALGUS").is_some());
    }

    #[test]
    fn test_bundle_definition() {
        let catalog = Catalog::plant_shop();
        let components = catalog.bundle("Toataimede Uus Algus").unwrap();
        assert_eq!(components.len(), 2);
        assert_eq!(components[0].units_per_bundle, 4);
        assert_eq!(components[1].units_per_bundle, 2);
    }
}
