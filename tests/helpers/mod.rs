// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 提供集成测试所需的产品目录、车辆布局、订单条目构造
// ==========================================

use pallet_loading_planner::config::Settings;
use pallet_loading_planner::domain::item::Item;
use pallet_loading_planner::domain::product::{
    Factor, PackingGroup, PalletSetting, Product, ProductCatalog,
};
use pallet_loading_planner::domain::space::Space;
use pallet_loading_planner::domain::types::{ContainerKind, Side, SpaceSize};
use pallet_loading_planner::engine::context::Context;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::Arc;

/// 全尺寸同值系数表
pub fn uniform_factors(value: Decimal) -> HashMap<SpaceSize, Factor> {
    let mut factors = HashMap::new();
    for size in SpaceSize::descending() {
        factors.insert(
            size,
            Factor {
                value,
                quantity: dec!(1),
            },
        );
    }
    factors
}

/// 创建测试用产品
pub fn create_test_product(
    code: &str,
    kind: ContainerKind,
    group_code: &str,
    factor_value: Decimal,
    gross_weight: Decimal,
) -> Product {
    Product {
        code: code.to_string(),
        description: format!("测试产品 {}", code),
        kind,
        packing_group: PackingGroup {
            group_code: group_code.to_string(),
            sub_group_code: "01".to_string(),
            packing_code: format!("PC-{}", group_code),
        },
        pallet_setting: PalletSetting {
            quantity: dec!(50),
            quantity_dozen: dec!(50),
            quantity_ballast_min: dec!(10),
            layers: 5,
            include_top_of_pallet: false,
        },
        factors: uniform_factors(factor_value),
        gross_weight,
        calculate_additional_occupation: false,
        units_per_box: None,
        litrage: None,
        layer_coded: false,
    }
}

/// 创建测试用桶装生啤产品
pub fn create_chopp_product(code: &str, litrage: Decimal, per_pallet: Decimal) -> Product {
    let mut product = create_test_product(code, ContainerKind::Chopp, "CHP", dec!(2), dec!(60));
    product.litrage = Some(litrage);
    product.pallet_setting.quantity = per_pallet;
    product.pallet_setting.quantity_dozen = per_pallet;
    product.pallet_setting.quantity_ballast_min = Decimal::ZERO;
    product
}

/// 创建测试用层板产品
pub fn create_layer_product(code: &str, kind: ContainerKind) -> Product {
    let mut product = create_test_product(code, kind, "LAY", dec!(1), dec!(8));
    product.layer_coded = true;
    product.pallet_setting.quantity = dec!(60);
    product.pallet_setting.quantity_dozen = dec!(60);
    product.pallet_setting.quantity_ballast_min = dec!(12);
    product
}

/// 成对仓位布局: 每个编号一对 (驾驶侧 + 副驾侧), 统一尺寸
pub fn paired_layout(pairs: u32, size: SpaceSize) -> Vec<Space> {
    let mut spaces = Vec::new();
    let mut id = 1;
    for number in 1..=pairs {
        spaces.push(Space::new(id, size, number, Side::Driver));
        id += 1;
        spaces.push(Space::new(id, size, number, Side::Helper));
        id += 1;
    }
    spaces
}

/// 创建运行上下文
pub fn create_context(
    spaces: Vec<Space>,
    items: Vec<Item>,
    products: Vec<Product>,
    settings: Settings,
) -> Context {
    let catalog: Arc<ProductCatalog> = ProductCatalog::from_products(products).into_shared();
    Context::new(spaces, items, catalog, settings)
}

/// 条目在全车的装载数量合计
pub fn mounted_amount_of(ctx: &Context, item_code: &str) -> Decimal {
    ctx.mounted
        .iter()
        .flat_map(|ms| ms.containers.iter())
        .flat_map(|c| c.products.iter())
        .filter(|p| p.item_code == item_code)
        .map(|p| p.amount)
        .sum()
}
