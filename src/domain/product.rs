// ==========================================
// 整车托盘装载规划系统 - 产品主数据
// ==========================================
// 依据: Loading_Engine_Specs_v1.0.md - 2. 数据模型 / Product
// 职责: 产品目录只读元数据, 整个运行期共享
// 红线: 引擎不修改产品主数据
// ==========================================

use crate::domain::types::{ContainerKind, SpaceSize};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

// ==========================================
// PackingGroup - 码放分组
// ==========================================
// 同组/同子组的产品允许共用一个托盘
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackingGroup {
    pub group_code: String,     // 分组代码
    pub sub_group_code: String, // 子组代码
    pub packing_code: String,   // 码放代码 (层板规则按此归组)
}

// ==========================================
// PalletSetting - 托盘参数
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PalletSetting {
    pub quantity: Decimal,             // 整托数量 (标准装)
    pub quantity_dozen: Decimal,       // 整托数量 (打装)
    pub quantity_ballast_min: Decimal, // 单层最小码放数量 (压舱层)
    pub layers: u32,                   // 层数
    pub include_top_of_pallet: bool,   // 是否计入顶层
}

impl Default for PalletSetting {
    fn default() -> Self {
        Self {
            quantity: Decimal::ZERO,
            quantity_dozen: Decimal::ZERO,
            quantity_ballast_min: Decimal::ZERO,
            layers: 0,
            include_top_of_pallet: false,
        }
    }
}

impl PalletSetting {
    /// 单层数量 (整托数量 / 层数)
    ///
    /// 层数为 0 时返回整托数量, 避免除零
    pub fn quantity_per_layer(&self) -> Decimal {
        if self.layers == 0 {
            return self.quantity;
        }
        self.quantity / Decimal::from(self.layers)
    }

    /// 打装与标准装数量是否不一致
    ///
    /// 不一致时 FactorConverter 需要对数量做换算
    pub fn has_dozen_mismatch(&self) -> bool {
        !self.quantity_dozen.is_zero()
            && !self.quantity.is_zero()
            && self.quantity_dozen != self.quantity
    }
}

// ==========================================
// Factor - 码放系数
// ==========================================
// (产品, 仓位尺寸) 二元组的占用系数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Factor {
    pub value: Decimal,    // 系数值
    pub quantity: Decimal, // 系数标定数量; 目录透传字段, 占用换算只用 value
}

impl Default for Factor {
    fn default() -> Self {
        Self {
            value: Decimal::ZERO,
            quantity: Decimal::ZERO,
        }
    }
}

// ==========================================
// Product - 产品
// ==========================================
// 只读目录行, 由外部目录加载器在规则运行前补全
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub code: String,                          // SKU 代码
    pub description: String,                   // 描述
    pub kind: ContainerKind,                   // 产品基础类型
    pub packing_group: PackingGroup,           // 码放分组
    pub pallet_setting: PalletSetting,         // 托盘参数
    pub factors: HashMap<SpaceSize, Factor>,   // 每档仓位的码放系数
    pub gross_weight: Decimal,                 // 单件毛重 (kg)
    pub calculate_additional_occupation: bool, // 是否参与附加占用计算
    pub units_per_box: Option<Decimal>,        // 每箱件数 (电商包裹/箱装)
    pub litrage: Option<Decimal>,              // 升数 (生啤桶)
    pub layer_coded: bool,                     // 是否按层板码放
}

impl Product {
    /// 指定仓位尺寸的码放系数
    pub fn factor(&self, size: SpaceSize) -> Option<&Factor> {
        self.factors.get(&size)
    }

    /// 是否为桶装生啤
    pub fn is_chopp(&self) -> bool {
        self.kind == ContainerKind::Chopp
    }

    /// 压舱层元数据是否已补全
    pub fn has_ballast_metadata(&self) -> bool {
        !self.pallet_setting.quantity_ballast_min.is_zero()
    }
}

// ==========================================
// ProductCatalog - 产品目录
// ==========================================
// 运行期共享的只读目录, Context 经 Arc 持有
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductCatalog {
    products: HashMap<String, Product>,
}

impl ProductCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从产品列表构建目录
    pub fn from_products(products: Vec<Product>) -> Self {
        Self {
            products: products.into_iter().map(|p| (p.code.clone(), p)).collect(),
        }
    }

    /// 按 SKU 代码查询产品
    pub fn get(&self, code: &str) -> Option<&Product> {
        self.products.get(code)
    }

    /// 目录规模
    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// 包装为运行期共享句柄
    pub fn into_shared(self) -> Arc<ProductCatalog> {
        Arc::new(self)
    }
}
