// ==========================================
// 整车托盘装载规划系统 - 运行上下文
// ==========================================
// 依据: Loading_Engine_Specs_v1.0.md - 4.5 RuleChain / Context
// ==========================================
// 职责: 持有一次请求的全部运行状态, 提供变更基元
// 红线: 违反容量/兼容约束的变更一律拒绝 (返回 false), 不抛错
// 红线: 快照是值语义深拷贝, 回退即丢弃, 没有撤销日志
// ==========================================

use crate::config::Settings;
use crate::domain::container::{Container, MountedProduct};
use crate::domain::item::Item;
use crate::domain::product::{Product, ProductCatalog};
use crate::domain::space::{MountedSpace, Space, SpaceConstraint};
use crate::domain::types::{ContainerKind, Side};
use crate::engine::factor_converter::{FactorConverter, OccupationRequest};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

// ==========================================
// ExecutionLogEntry - 执行日志条目
// ==========================================
// 追加型业务侧日志, 与 tracing 诊断日志分离
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionLogEntry {
    pub timestamp: DateTime<Utc>,
    pub rule: String,
    pub message: String,
}

// ==========================================
// PlacementMeta - 放置附加信息
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct PlacementMeta {
    pub package: Option<String>,
    pub splitted: bool,
    pub layer: bool,
    pub quantity_of_layers: u32,
    pub first_layer_index: u32,
}

// ==========================================
// ContextMetrics - 方案质量度量
// ==========================================
// 快照试算后按此度量决定是否并回
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextMetrics {
    pub remounts: usize,        // 返装托盘数
    pub non_palletized: usize,  // 未上托条目数
}

impl ContextMetrics {
    /// 是否劣于对照方案 (返装优先, 其次未上托)
    pub fn is_worse_than(&self, other: &ContextMetrics) -> bool {
        if self.remounts != other.remounts {
            return self.remounts > other.remounts;
        }
        self.non_palletized > other.non_palletized
    }
}

// ==========================================
// Context - 运行上下文
// ==========================================
// 每次请求构造一次, 结果映射后即丢弃;
// 实体以扁平集合持有, 相互引用一律用索引/代码
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Context {
    pub plan_id: Uuid,
    pub spaces: Vec<Space>,
    pub mounted: Vec<MountedSpace>, // 与 spaces 按索引对齐
    pub items: Vec<Item>,
    pub catalog: Arc<ProductCatalog>,
    pub settings: Settings,
    pub log: Vec<ExecutionLogEntry>,
    pub snapshot: Option<Box<Context>>,
    assembly_sequence: u32,
}

impl Context {
    /// 构造运行上下文
    ///
    /// # 参数
    /// - spaces: 车辆仓位布局
    /// - items: 待装条目 (由外部装载器构建)
    /// - catalog: 已补全的产品目录
    /// - settings: 运行参数
    pub fn new(
        spaces: Vec<Space>,
        items: Vec<Item>,
        catalog: Arc<ProductCatalog>,
        settings: Settings,
    ) -> Self {
        let mounted = spaces.iter().map(|s| MountedSpace::new(s.id)).collect();
        Self {
            plan_id: Uuid::new_v4(),
            spaces,
            mounted,
            items,
            catalog,
            settings,
            log: Vec::new(),
            snapshot: None,
            assembly_sequence: 0,
        }
    }

    // ==========================================
    // 查询
    // ==========================================

    /// 条目对应的产品
    pub fn product_of_item(&self, item_idx: usize) -> Option<&Product> {
        self.items
            .get(item_idx)
            .and_then(|item| self.catalog.get(&item.code))
    }

    /// 待装条目索引 (剩余数量 > 0)
    pub fn pending_item_indices(&self) -> Vec<usize> {
        self.items
            .iter()
            .enumerate()
            .filter(|(_, item)| item.is_pending())
            .map(|(idx, _)| idx)
            .collect()
    }

    /// 按产品谓词过滤的待装条目索引
    pub fn pending_items_where<F>(&self, predicate: F) -> Vec<usize>
    where
        F: Fn(&Product) -> bool,
    {
        self.pending_item_indices()
            .into_iter()
            .filter(|&idx| self.product_of_item(idx).map(&predicate).unwrap_or(false))
            .collect()
    }

    /// 空闲仓位索引 (未装载且未封锁)
    pub fn empty_space_indices(&self) -> Vec<usize> {
        self.spaces
            .iter()
            .enumerate()
            .filter(|(idx, space)| !space.blocked && !self.mounted[*idx].is_mounted())
            .map(|(idx, _)| idx)
            .collect()
    }

    /// 已装载仓位索引
    pub fn mounted_space_indices(&self) -> Vec<usize> {
        self.mounted
            .iter()
            .enumerate()
            .filter(|(_, ms)| ms.is_mounted())
            .map(|(idx, _)| idx)
            .collect()
    }

    /// 仓位剩余容量
    pub fn remaining_capacity(&self, space_idx: usize) -> Decimal {
        let capacity = self.spaces[space_idx].capacity();
        self.mounted[space_idx].remaining_capacity(capacity)
    }

    /// 仓位占用率 (0-100)
    pub fn occupation_percentage(&self, space_idx: usize) -> Decimal {
        let capacity = self.spaces[space_idx].capacity();
        self.mounted[space_idx].occupation_percentage(capacity)
    }

    /// 指定侧的总重量 (kg)
    pub fn side_weight(&self, side: Side) -> Decimal {
        self.mounted
            .iter()
            .enumerate()
            .filter(|(idx, _)| self.spaces[*idx].side == side)
            .map(|(_, ms)| ms.weight())
            .sum()
    }

    /// 驾驶侧重量占比 (0-100); 空载返回 50
    pub fn driver_percentage(&self) -> Decimal {
        let driver = self.side_weight(Side::Driver);
        let total = driver + self.side_weight(Side::Helper);
        if total.is_zero() {
            return Decimal::from(50);
        }
        driver * Decimal::from(100) / total
    }

    /// 全车返装托盘数
    pub fn remount_total(&self) -> usize {
        self.mounted.iter().map(MountedSpace::remount_count).sum()
    }

    /// 未上托条目数 (剩余数量 > 0)
    pub fn non_palletized_count(&self) -> usize {
        self.items.iter().filter(|i| i.is_pending()).count()
    }

    /// 方案质量度量
    pub fn metrics(&self) -> ContextMetrics {
        ContextMetrics {
            remounts: self.remount_total(),
            non_palletized: self.non_palletized_count(),
        }
    }

    /// 容量不变量: 所有已装载仓位占用度 <= 容量
    ///
    /// 规则执行间歇的静止状态必须满足
    pub fn capacity_invariant_holds(&self) -> bool {
        self.mounted
            .iter()
            .enumerate()
            .all(|(idx, ms)| ms.occupation() <= self.spaces[idx].capacity())
    }

    // ==========================================
    // 变更基元
    // ==========================================

    /// 指定数量能否放入仓位 (不变更)
    pub fn can_add(&self, space_idx: usize, item_idx: usize, amount: Decimal) -> bool {
        if amount <= Decimal::ZERO {
            return false;
        }
        let space = match self.spaces.get(space_idx) {
            Some(s) if !s.blocked => s,
            _ => return false,
        };
        let item = match self.items.get(item_idx) {
            Some(i) => i,
            None => return false,
        };
        if amount > item.amount_remaining {
            return false;
        }
        let product = match self.catalog.get(&item.code) {
            Some(p) => p,
            None => return false,
        };
        let occupation = match self.occupation_for(product, space_idx, amount) {
            Some(o) => o,
            None => return false,
        };
        self.mounted[space_idx].can_hold(occupation, space.capacity())
    }

    /// 放置数量到仓位
    ///
    /// 成功时: 创建/合并托盘与明细, 消耗条目剩余量
    /// 拒绝时: 返回 false, 状态不变
    pub fn add_product(
        &mut self,
        space_idx: usize,
        item_idx: usize,
        amount: Decimal,
        meta: PlacementMeta,
    ) -> bool {
        if !self.can_add(space_idx, item_idx, amount) {
            return false;
        }

        let item = &self.items[item_idx];
        let product = self.catalog.get(&item.code).cloned();
        let product = match product {
            Some(p) => p,
            None => return false,
        };
        let item_code = item.code.clone();
        let customer = item.customer.clone();

        let occupation = match self.occupation_for(&product, space_idx, amount) {
            Some(o) => o,
            None => return false,
        };

        self.assembly_sequence += 1;
        let sequence = self.assembly_sequence;

        // 先在只读阶段算好合并后的占用, 再进入可变阶段
        let existing_amount: Option<Decimal> = self.mounted[space_idx]
            .containers
            .iter()
            .filter(|c| {
                c.kind == product.kind
                    && c.group_code == product.packing_group.group_code
                    && c.sub_group_code == product.packing_group.sub_group_code
            })
            .flat_map(|c| c.products.iter())
            .find(|p| p.product_code == product.code && p.item_code == item_code)
            .map(|p| p.amount);
        let merged_occupation = existing_amount
            .and_then(|prev| self.occupation_for_amount(&product, space_idx, prev + amount));

        let mounted_space = &mut self.mounted[space_idx];
        let container = match mounted_space.find_container_mut(
            product.kind,
            &product.packing_group.group_code,
            &product.packing_group.sub_group_code,
        ) {
            Some(c) => c,
            None => {
                mounted_space.containers.push(Container::new(
                    product.kind,
                    &product.packing_group.group_code,
                    &product.packing_group.sub_group_code,
                ));
                mounted_space.containers.last_mut().unwrap()
            }
        };
        if meta.layer {
            container.layer = true;
        }

        // 同产品同条目合并为一条明细, 按合计数量整体重算占用,
        // 保证截断语义不随拆分次数漂移
        match container
            .products
            .iter_mut()
            .find(|p| p.product_code == product.code && p.item_code == item_code)
        {
            Some(existing) => {
                existing.amount += amount;
                existing.splitted = existing.splitted || meta.splitted;
                existing.quantity_of_layers += meta.quantity_of_layers;
                if let Some(merged) = merged_occupation {
                    existing.occupation = merged;
                }
            }
            None => {
                container.products.push(MountedProduct {
                    item_code: item_code.clone(),
                    product_code: product.code.clone(),
                    amount,
                    package: meta.package,
                    assembly_sequence: sequence,
                    quantity_of_layers: meta.quantity_of_layers,
                    first_layer_index: meta.first_layer_index,
                    splitted: meta.splitted,
                    customer,
                    occupation,
                    additional_occupation: Decimal::ZERO,
                    unit_gross_weight: product.gross_weight,
                    kind_tag: product.kind,
                });
            }
        }

        self.items[item_idx].drain(amount);
        if meta.splitted {
            self.items[item_idx].splitted = true;
        }

        debug!(
            space = self.spaces[space_idx].number,
            item = %item_code,
            %amount,
            "放置成功"
        );
        true
    }

    /// 从仓位取下数量, 归还给条目
    ///
    /// # 返回
    /// 实际取下的数量 (明细不足时取到多少算多少)
    pub fn unmount_product(
        &mut self,
        space_idx: usize,
        product_code: &str,
        amount: Decimal,
    ) -> Decimal {
        let mut removed = Decimal::ZERO;
        let mut item_codes: Vec<(String, Decimal)> = Vec::new();

        {
            let mounted_space = &mut self.mounted[space_idx];
            for container in &mut mounted_space.containers {
                if removed >= amount {
                    break;
                }
                if let Some(product) = container.find_product_mut(product_code) {
                    let take = (amount - removed).min(product.amount);
                    product.amount -= take;
                    removed += take;
                    item_codes.push((product.item_code.clone(), take));
                }
            }
            mounted_space.prune();
        }

        // 重算留存明细的占用
        self.recompute_space_occupations(space_idx);

        for (item_code, take) in item_codes {
            if let Some(item) = self.items.iter_mut().find(|i| i.code == item_code) {
                item.restore(take);
            }
        }
        removed
    }

    /// 在两个仓位间移动部分数量
    ///
    /// 目标仓位按其自身尺寸重算占用; 放不下则拒绝
    pub fn move_mounted_product(
        &mut self,
        from_idx: usize,
        to_idx: usize,
        product_code: &str,
        amount: Decimal,
    ) -> bool {
        if from_idx == to_idx || amount <= Decimal::ZERO {
            return false;
        }
        let product = match self.catalog.get(product_code).cloned() {
            Some(p) => p,
            None => return false,
        };
        let available: Decimal = self.mounted[from_idx]
            .containers
            .iter()
            .filter_map(|c| c.find_product(product_code))
            .map(|p| p.amount)
            .sum();
        if available < amount {
            return false;
        }
        let occupation = match self.occupation_for_amount(&product, to_idx, amount) {
            Some(o) => o,
            None => return false,
        };
        let capacity = self.spaces[to_idx].capacity();
        if self.spaces[to_idx].blocked || !self.mounted[to_idx].can_hold(occupation, capacity) {
            return false;
        }

        // 源侧扣减
        let item_code = {
            let mounted_space = &mut self.mounted[from_idx];
            let mut remaining = amount;
            let mut code = None;
            for container in &mut mounted_space.containers {
                if remaining.is_zero() {
                    break;
                }
                if let Some(p) = container.find_product_mut(product_code) {
                    let take = remaining.min(p.amount);
                    p.amount -= take;
                    p.splitted = true;
                    remaining -= take;
                    code = Some(p.item_code.clone());
                }
            }
            mounted_space.prune();
            match code {
                Some(c) => c,
                None => return false,
            }
        };
        self.recompute_space_occupations(from_idx);

        // 目标侧放置
        let detached_code = item_code.clone();
        self.assembly_sequence += 1;
        let sequence = self.assembly_sequence;
        let mounted_space = &mut self.mounted[to_idx];
        let container = match mounted_space.find_container_mut(
            product.kind,
            &product.packing_group.group_code,
            &product.packing_group.sub_group_code,
        ) {
            Some(c) => c,
            None => {
                mounted_space.containers.push(Container::new(
                    product.kind,
                    &product.packing_group.group_code,
                    &product.packing_group.sub_group_code,
                ));
                mounted_space.containers.last_mut().unwrap()
            }
        };
        match container
            .products
            .iter_mut()
            .find(|p| p.product_code == product.code && p.item_code == item_code)
        {
            Some(existing) => {
                existing.amount += amount;
                existing.splitted = true;
            }
            None => container.products.push(MountedProduct {
                item_code,
                product_code: product.code.clone(),
                amount,
                package: None,
                assembly_sequence: sequence,
                quantity_of_layers: 0,
                first_layer_index: 0,
                splitted: true,
                customer: None,
                occupation: Decimal::ZERO,
                additional_occupation: Decimal::ZERO,
                unit_gross_weight: product.gross_weight,
                kind_tag: product.kind,
            }),
        }
        self.recompute_space_occupations(to_idx);

        // 条目侧拆分簿记
        if let Some(item) = self.items.iter_mut().find(|i| i.code == detached_code) {
            item.detach(amount);
            item.splitted = true;
        }
        true
    }

    /// 交换两个仓位的全部托盘
    ///
    /// 双方都按对方尺寸重算占用; 任一方放不下则拒绝
    pub fn switch_spaces(&mut self, a_idx: usize, b_idx: usize) -> bool {
        if a_idx == b_idx {
            return false;
        }
        if self.spaces[a_idx].blocked || self.spaces[b_idx].blocked {
            return false;
        }
        let occ_a_at_b = match self.occupation_of_containers(a_idx, b_idx) {
            Some(o) => o,
            None => return false,
        };
        let occ_b_at_a = match self.occupation_of_containers(b_idx, a_idx) {
            Some(o) => o,
            None => return false,
        };
        if occ_a_at_b > self.spaces[b_idx].capacity() || occ_b_at_a > self.spaces[a_idx].capacity()
        {
            return false;
        }

        self.mounted.swap(a_idx, b_idx);
        let a_id = self.spaces[a_idx].id;
        let b_id = self.spaces[b_idx].id;
        self.mounted[a_idx].space_id = a_id;
        self.mounted[b_idx].space_id = b_id;
        self.recompute_space_occupations(a_idx);
        self.recompute_space_occupations(b_idx);
        true
    }

    /// 清空仓位, 数量归还条目
    pub fn clear_space(&mut self, space_idx: usize) {
        let products: Vec<(String, Decimal)> = self.mounted[space_idx]
            .containers
            .iter()
            .flat_map(|c| c.products.iter())
            .map(|p| (p.item_code.clone(), p.amount))
            .collect();
        for (item_code, amount) in products {
            if let Some(item) = self.items.iter_mut().find(|i| i.code == item_code) {
                item.restore(amount);
            }
        }
        self.mounted[space_idx].clear();
    }

    // ==========================================
    // 快照
    // ==========================================

    /// 建立快照 (值语义深拷贝)
    pub fn take_snapshot(&mut self) {
        let mut fork = self.fork();
        fork.log.clear();
        self.snapshot = Some(Box::new(fork));
    }

    /// 在快照槽上开辟试算副本, 返回其可变借用
    ///
    /// 槽内旧快照被当前状态的派生副本覆盖; 试算规则在副本上
    /// 变更, 之后用 adopt_snapshot_* 决定并回或丢弃
    pub fn begin_trial(&mut self) -> &mut Context {
        let mut fork = self.fork();
        fork.log.clear();
        &mut **self.snapshot.insert(Box::new(fork))
    }

    /// 快照试算并回: 快照度量严格改善当前状态才采纳
    ///
    /// 无论采纳与否, 快照槽随之清空 (回退即丢弃)
    pub fn adopt_snapshot_if_improved(&mut self) -> bool {
        let improved = self
            .snapshot
            .as_ref()
            .map(|trial| self.metrics().is_worse_than(&trial.metrics()))
            .unwrap_or(false);
        if let Some(trial) = self.snapshot.take() {
            if improved {
                self.adopt(*trial);
            }
        }
        improved
    }

    /// 快照试算并回: 度量不劣化即采纳 (结构整理类规则使用)
    pub fn adopt_snapshot_unless_worse(&mut self) -> bool {
        let acceptable = self
            .snapshot
            .as_ref()
            .map(|trial| !trial.metrics().is_worse_than(&self.metrics()))
            .unwrap_or(false);
        if let Some(trial) = self.snapshot.take() {
            if acceptable {
                self.adopt(*trial);
            }
        }
        acceptable
    }

    /// 派生试算上下文 (不含嵌套快照)
    pub fn fork(&self) -> Context {
        let mut fork = self.clone();
        fork.snapshot = None;
        fork
    }

    /// 以试算结果替换当前状态 (试算日志并入)
    pub fn adopt(&mut self, trial: Context) {
        let mut trial = trial;
        self.spaces = std::mem::take(&mut trial.spaces);
        self.mounted = std::mem::take(&mut trial.mounted);
        self.items = std::mem::take(&mut trial.items);
        self.assembly_sequence = trial.assembly_sequence;
        self.log.append(&mut trial.log);
    }

    // ==========================================
    // 执行日志
    // ==========================================

    /// 追加执行日志 (追加型侧信道, 不参与业务结果)
    pub fn log_entry(&mut self, rule: &str, message: impl Into<String>) {
        self.log.push(ExecutionLogEntry {
            timestamp: Utc::now(),
            rule: rule.to_string(),
            message: message.into(),
        });
    }

    // ==========================================
    // 内部换算
    // ==========================================

    /// 产品在指定仓位下 amount 件的占用度
    fn occupation_for(&self, product: &Product, space_idx: usize, amount: Decimal) -> Option<Decimal> {
        self.occupation_for_amount(product, space_idx, amount)
    }

    fn occupation_for_amount(
        &self,
        product: &Product,
        space_idx: usize,
        amount: Decimal,
    ) -> Option<Decimal> {
        let size = self.spaces.get(space_idx)?.size;
        let factor = product.factor(size)?;
        Some(FactorConverter::occupation(
            OccupationRequest::ByQuantityFactorPalletSetting {
                quantity: amount,
                factor,
                pallet_setting: &product.pallet_setting,
                calculate_additional: product.calculate_additional_occupation
                    && product.has_ballast_metadata(),
            },
        ))
    }

    /// 仓位内全部明细在目标尺寸下的占用度合计
    fn occupation_of_containers(&self, source_idx: usize, target_idx: usize) -> Option<Decimal> {
        let size = self.spaces.get(target_idx)?.size;
        let mut total = Decimal::ZERO;
        for container in &self.mounted[source_idx].containers {
            for mounted in &container.products {
                let product = self.catalog.get(&mounted.product_code)?;
                let factor = product.factor(size)?;
                total += FactorConverter::occupation(
                    OccupationRequest::ByQuantityFactorPalletSetting {
                        quantity: mounted.amount,
                        factor,
                        pallet_setting: &product.pallet_setting,
                        calculate_additional: product.calculate_additional_occupation
                            && product.has_ballast_metadata(),
                    },
                );
            }
        }
        Some(total.trunc_with_scale(2))
    }

    /// 按仓位当前尺寸重算全部明细占用
    fn recompute_space_occupations(&mut self, space_idx: usize) {
        let size = self.spaces[space_idx].size;
        let catalog = Arc::clone(&self.catalog);
        for container in &mut self.mounted[space_idx].containers {
            for mounted in &mut container.products {
                if let Some(product) = catalog.get(&mounted.product_code) {
                    // 缺系数档的明细保持原占用, 与放置路径的拒绝语义一致
                    if product.factor(size).is_some() {
                        let recomputed = FactorConverter::occupation(
                            OccupationRequest::ByMountedProduct {
                                mounted: &*mounted,
                                product,
                                size,
                            },
                        );
                        mounted.occupation = recomputed;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::product::{Factor, PackingGroup, PalletSetting};
    use crate::domain::types::SpaceSize;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn test_product(code: &str, kind: ContainerKind) -> Product {
        let mut factors = HashMap::new();
        for size in SpaceSize::descending() {
            factors.insert(
                size,
                Factor {
                    value: dec!(1),
                    quantity: dec!(1),
                },
            );
        }
        Product {
            code: code.to_string(),
            description: String::new(),
            kind,
            packing_group: PackingGroup {
                group_code: "G1".to_string(),
                sub_group_code: "S1".to_string(),
                packing_code: "P1".to_string(),
            },
            pallet_setting: PalletSetting {
                quantity: dec!(50),
                quantity_dozen: dec!(50),
                quantity_ballast_min: dec!(10),
                layers: 5,
                include_top_of_pallet: false,
            },
            factors,
            gross_weight: dec!(10),
            calculate_additional_occupation: false,
            units_per_box: None,
            litrage: None,
            layer_coded: false,
        }
    }

    fn test_context() -> Context {
        let catalog = ProductCatalog::from_products(vec![
            test_product("100", ContainerKind::Disposable),
            test_product("200", ContainerKind::Returnable),
        ])
        .into_shared();
        let spaces = vec![
            Space::new(1, SpaceSize::S42, 1, Side::Driver),
            Space::new(2, SpaceSize::S42, 1, Side::Helper),
            Space::new(3, SpaceSize::S14, 2, Side::Driver),
        ];
        let items = vec![
            Item::new("100", dec!(50), 5),
            Item::new("200", dec!(30), 5),
        ];
        Context::new(spaces, items, catalog, Settings::new())
    }

    #[test]
    fn test_add_product_drains_item() {
        let mut ctx = test_context();
        assert!(ctx.add_product(0, 0, dec!(50), PlacementMeta::default()));
        assert_eq!(ctx.items[0].amount_remaining, dec!(0));
        assert_eq!(ctx.mounted[0].occupation(), dec!(25.00));
        assert!(ctx.capacity_invariant_holds());
    }

    #[test]
    fn test_add_product_refuses_over_capacity() {
        let mut ctx = test_context();
        // S14 容量 14, 50 件需要 25 → 拒绝
        assert!(!ctx.add_product(2, 0, dec!(50), PlacementMeta::default()));
        assert_eq!(ctx.items[0].amount_remaining, dec!(50));
        assert!(!ctx.mounted[2].is_mounted());
    }

    #[test]
    fn test_add_product_refuses_blocked_space() {
        let mut ctx = test_context();
        ctx.spaces[0].blocked = true;
        assert!(!ctx.add_product(0, 0, dec!(10), PlacementMeta::default()));
    }

    #[test]
    fn test_conservation_after_unmount() {
        let mut ctx = test_context();
        assert!(ctx.add_product(0, 0, dec!(50), PlacementMeta::default()));
        let removed = ctx.unmount_product(0, "100", dec!(20));
        assert_eq!(removed, dec!(20));
        assert_eq!(ctx.items[0].amount_remaining, dec!(20));
        let mounted_total: Decimal = ctx.mounted[0]
            .containers
            .iter()
            .flat_map(|c| c.products.iter())
            .map(|p| p.amount)
            .sum();
        assert_eq!(mounted_total + ctx.items[0].amount_remaining, dec!(50));
    }

    #[test]
    fn test_move_mounted_product_respects_capacity() {
        let mut ctx = test_context();
        assert!(ctx.add_product(0, 0, dec!(50), PlacementMeta::default()));
        // S14 只能容纳 28 件 (28×1/2 = 14)
        assert!(!ctx.move_mounted_product(0, 2, "100", dec!(30)));
        assert!(ctx.move_mounted_product(0, 2, "100", dec!(20)));
        assert_eq!(ctx.mounted[2].occupation(), dec!(10.00));
        assert!(ctx.capacity_invariant_holds());
    }

    #[test]
    fn test_switch_spaces_recomputes_occupation() {
        let mut ctx = test_context();
        assert!(ctx.add_product(0, 0, dec!(20), PlacementMeta::default()));
        assert!(ctx.switch_spaces(0, 1));
        assert!(!ctx.mounted[0].is_mounted());
        assert_eq!(ctx.mounted[1].occupation(), dec!(10.00));
        assert_eq!(ctx.mounted[1].space_id, 2);
    }

    #[test]
    fn test_switch_spaces_refuses_when_target_too_small() {
        let mut ctx = test_context();
        assert!(ctx.add_product(0, 0, dec!(50), PlacementMeta::default()));
        // 25 占用度放不进 S14
        assert!(!ctx.switch_spaces(0, 2));
        assert!(ctx.mounted[0].is_mounted());
    }

    #[test]
    fn test_snapshot_fork_and_adopt() {
        let mut ctx = test_context();
        assert!(ctx.add_product(0, 0, dec!(20), PlacementMeta::default()));

        let mut trial = ctx.fork();
        assert!(trial.add_product(1, 1, dec!(30), PlacementMeta::default()));
        assert_eq!(ctx.non_palletized_count(), 2);

        let trial_metrics = trial.metrics();
        assert!(!trial_metrics.is_worse_than(&ctx.metrics()));
        ctx.adopt(trial);
        assert_eq!(ctx.non_palletized_count(), 1);
    }

    #[test]
    fn test_trial_through_snapshot_adopted_on_improvement() {
        let mut ctx = test_context();
        let trial = ctx.begin_trial();
        assert!(trial.add_product(0, 0, dec!(50), PlacementMeta::default()));

        assert!(ctx.adopt_snapshot_if_improved());
        assert_eq!(ctx.non_palletized_count(), 1);
        assert!(ctx.snapshot.is_none());
    }

    #[test]
    fn test_trial_discarded_without_improvement() {
        let mut ctx = test_context();
        let _ = ctx.begin_trial();
        // 试算没有任何改善 → 丢弃, 槽清空
        assert!(!ctx.adopt_snapshot_if_improved());
        assert!(ctx.snapshot.is_none());
        assert_eq!(ctx.non_palletized_count(), 2);
    }

    #[test]
    fn test_trial_kept_when_not_worse() {
        let mut ctx = test_context();
        assert!(ctx.add_product(0, 0, dec!(50), PlacementMeta::default()));

        let trial = ctx.begin_trial();
        assert!(trial.switch_spaces(0, 1));
        // 度量相等的结构调整也允许并回
        assert!(ctx.adopt_snapshot_unless_worse());
        assert!(ctx.mounted[1].is_mounted());
        assert!(!ctx.mounted[0].is_mounted());
    }

    #[test]
    fn test_move_tracks_detached_amount() {
        let mut ctx = test_context();
        assert!(ctx.add_product(0, 0, dec!(50), PlacementMeta::default()));
        assert!(ctx.move_mounted_product(0, 2, "100", dec!(20)));

        assert_eq!(ctx.items[0].detached_amount, dec!(20));
        assert!(ctx.items[0].splitted);
    }

    #[test]
    fn test_clear_space_restores_items() {
        let mut ctx = test_context();
        assert!(ctx.add_product(0, 0, dec!(50), PlacementMeta::default()));
        ctx.clear_space(0);
        assert_eq!(ctx.items[0].amount_remaining, dec!(50));
        assert!(!ctx.mounted[0].is_mounted());
    }

    #[test]
    fn test_metrics_ordering() {
        let better = ContextMetrics {
            remounts: 0,
            non_palletized: 2,
        };
        let worse = ContextMetrics {
            remounts: 1,
            non_palletized: 0,
        };
        assert!(worse.is_worse_than(&better));
        assert!(!better.is_worse_than(&worse));
    }
}
