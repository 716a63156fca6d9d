// ==========================================
// 整车托盘装载规划系统 - 托盘与装载明细
// ==========================================
// 依据: Loading_Engine_Specs_v1.0.md - 2. 数据模型 / Container, MountedProduct
// 职责: 托盘(容器)及其上的产品装载明细
// 红线: 数量为 0 的装载明细必须移除
// ==========================================

use crate::domain::types::ContainerKind;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ==========================================
// MountedProduct - 装载明细
// ==========================================
// 连接实体: 某条目的某数量落在某托盘上
// 单件毛重在放置时从目录抄录, 目录在运行期不可变
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MountedProduct {
    pub item_code: String,               // 来源条目 SKU 代码
    pub product_code: String,            // 产品代码
    pub amount: Decimal,                 // 装载数量
    pub package: Option<String>,         // 包裹标识 (电商包裹)
    pub assembly_sequence: u32,          // 组装顺序
    pub quantity_of_layers: u32,         // 占用层数
    pub first_layer_index: u32,          // 起始层索引
    pub splitted: bool,                  // 是否来自拆分
    pub customer: Option<String>,        // 客户标识
    pub occupation: Decimal,             // 占用度
    pub additional_occupation: Decimal,  // 附加占用度
    pub unit_gross_weight: Decimal,      // 单件毛重 (kg)
    pub kind_tag: ContainerKind,         // 产品基础类型 (放置时抄录)
}

impl MountedProduct {
    /// 总占用度 (含附加占用)
    pub fn total_occupation(&self) -> Decimal {
        self.occupation + self.additional_occupation
    }

    /// 明细毛重 (kg)
    pub fn weight(&self) -> Decimal {
        self.amount * self.unit_gross_weight
    }
}

// ==========================================
// Container - 托盘
// ==========================================
// 一个托盘承载同一码放分组的装载明细
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Container {
    pub kind: ContainerKind,          // 容器类型
    pub group_code: String,           // 码放分组
    pub sub_group_code: String,       // 码放子组
    pub layer: bool,                  // 层板托盘
    pub keg_exclusive: bool,          // 生啤专用托盘
    pub bulk: bool,                   // 散装托盘
    pub products: Vec<MountedProduct>, // 装载明细 (独占所有权)
}

impl Container {
    /// 创建空托盘
    pub fn new(kind: ContainerKind, group_code: &str, sub_group_code: &str) -> Self {
        Self {
            kind,
            group_code: group_code.to_string(),
            sub_group_code: sub_group_code.to_string(),
            layer: false,
            keg_exclusive: false,
            bulk: false,
            products: Vec::new(),
        }
    }

    /// 托盘占用度 (明细占用度之和, 未截断)
    pub fn occupation(&self) -> Decimal {
        self.products
            .iter()
            .map(MountedProduct::total_occupation)
            .sum()
    }

    /// 托盘毛重 (kg)
    pub fn weight(&self) -> Decimal {
        self.products.iter().map(MountedProduct::weight).sum()
    }

    /// 是否为"返装托盘"
    ///
    /// 可回收产品与一次性/等渗水/生啤产品混装的托盘,
    /// 是拆分/重建规则的消除目标
    pub fn is_remount(&self) -> bool {
        let has_returnable = self
            .products
            .iter()
            .any(|p| p.item_kind_is(ContainerKind::Returnable));
        let has_conflicting = self
            .products
            .iter()
            .any(|p| p.mounted_kind().conflicts_with_returnable());
        has_returnable && has_conflicting
    }

    /// 按产品代码查找明细
    pub fn find_product(&self, product_code: &str) -> Option<&MountedProduct> {
        self.products.iter().find(|p| p.product_code == product_code)
    }

    /// 按产品代码查找可变明细
    pub fn find_product_mut(&mut self, product_code: &str) -> Option<&mut MountedProduct> {
        self.products
            .iter_mut()
            .find(|p| p.product_code == product_code)
    }

    /// 移除数量为 0 的明细
    pub fn prune_empty(&mut self) {
        self.products.retain(|p| p.amount > Decimal::ZERO);
    }

    /// 托盘是否为空
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

impl MountedProduct {
    /// 明细的产品基础类型 (放置时从目录抄录)
    pub fn mounted_kind(&self) -> ContainerKind {
        self.kind_tag
    }

    pub fn item_kind_is(&self, kind: ContainerKind) -> bool {
        self.kind_tag == kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn mounted(product_code: &str, kind: ContainerKind, amount: Decimal) -> MountedProduct {
        MountedProduct {
            item_code: product_code.to_string(),
            product_code: product_code.to_string(),
            amount,
            package: None,
            assembly_sequence: 0,
            quantity_of_layers: 0,
            first_layer_index: 0,
            splitted: false,
            customer: None,
            occupation: dec!(10),
            additional_occupation: Decimal::ZERO,
            unit_gross_weight: dec!(2),
            kind_tag: kind,
        }
    }

    #[test]
    fn test_container_occupation_and_weight() {
        let mut container = Container::new(ContainerKind::Disposable, "G1", "S1");
        container
            .products
            .push(mounted("100", ContainerKind::Disposable, dec!(10)));
        container
            .products
            .push(mounted("200", ContainerKind::Disposable, dec!(5)));
        assert_eq!(container.occupation(), dec!(20));
        assert_eq!(container.weight(), dec!(30));
    }

    #[test]
    fn test_remount_detection() {
        let mut container = Container::new(ContainerKind::Returnable, "G1", "S1");
        container
            .products
            .push(mounted("100", ContainerKind::Returnable, dec!(10)));
        assert!(!container.is_remount());

        container
            .products
            .push(mounted("200", ContainerKind::Disposable, dec!(5)));
        assert!(container.is_remount());
    }

    #[test]
    fn test_returnable_pair_is_not_remount() {
        let mut container = Container::new(ContainerKind::Returnable, "G1", "S1");
        container
            .products
            .push(mounted("100", ContainerKind::Returnable, dec!(10)));
        container
            .products
            .push(mounted("200", ContainerKind::Returnable, dec!(5)));
        assert!(!container.is_remount());
    }

    #[test]
    fn test_prune_empty() {
        let mut container = Container::new(ContainerKind::Disposable, "G1", "S1");
        container
            .products
            .push(mounted("100", ContainerKind::Disposable, dec!(0)));
        container
            .products
            .push(mounted("200", ContainerKind::Disposable, dec!(5)));
        container.prune_empty();
        assert_eq!(container.products.len(), 1);
        assert_eq!(container.products[0].product_code, "200");
    }
}
