// ==========================================
// 整车托盘装载规划系统 - 返装拆分规则族
// ==========================================
// 依据: Loading_Engine_Specs_v1.0.md - 4.3 拆分/返装/重建规则
// ==========================================
// 职责: 消除可回收与一次性混装的"返装托盘"
//   - ReturnableAndDisposableSplitRule: 把少数派明细移到同类纯托盘
//   - RemountRule: 快照试算版拆分, 严格改善才并回
//   - NonLayerOnLayerPalletRule: 把非层板产品移出层板托盘
//   - RemountSplittedRebuildPalletRule: 清空拆分返装仓位后重建
// 红线: 试算一律在快照槽的派生副本上进行, 度量不劣化才并回
// ==========================================

use crate::domain::types::ContainerKind;
use crate::engine::context::Context;
use crate::engine::error::EngineError;
use crate::engine::factor_converter::FactorConverter;
use crate::engine::rule_chain::AllocationRule;
use crate::engine::rules::pallet_group::PalletGroupSubGroupRule;
use rust_decimal::Decimal;
use tracing::debug;

/// 返装托盘里的少数派明细 (待移出)
struct MinorityProduct {
    space_idx: usize,
    product_code: String,
    amount: Decimal,
    kind: ContainerKind,
}

/// 收集全车返装托盘的少数派明细
///
/// 少数派 = 托盘内占用度合计较小的一侧
/// (可回收 vs 与其冲突的类型)
fn collect_minority_products(ctx: &Context) -> Vec<MinorityProduct> {
    let mut minorities = Vec::new();
    for (space_idx, mounted_space) in ctx.mounted.iter().enumerate() {
        for container in &mounted_space.containers {
            if !container.is_remount() {
                continue;
            }
            let returnable_occ: Decimal = container
                .products
                .iter()
                .filter(|p| p.item_kind_is(ContainerKind::Returnable))
                .map(|p| p.total_occupation())
                .sum();
            let conflicting_occ: Decimal = container
                .products
                .iter()
                .filter(|p| p.mounted_kind().conflicts_with_returnable())
                .map(|p| p.total_occupation())
                .sum();
            let move_returnable = returnable_occ < conflicting_occ;

            for product in &container.products {
                let is_minority = if move_returnable {
                    product.item_kind_is(ContainerKind::Returnable)
                } else {
                    product.mounted_kind().conflicts_with_returnable()
                };
                if is_minority {
                    minorities.push(MinorityProduct {
                        space_idx,
                        product_code: product.product_code.clone(),
                        amount: product.amount,
                        kind: product.mounted_kind(),
                    });
                }
            }
        }
    }
    minorities
}

/// 为少数派明细挑选接收仓位
///
/// 优先: 无返装、已有同类托盘的仓位, 占用率低者优先;
/// 退而求其次: 空仓位
fn recipient_candidates(ctx: &Context, from_idx: usize, kind: ContainerKind) -> Vec<usize> {
    let mut pure: Vec<usize> = ctx
        .mounted_space_indices()
        .into_iter()
        .filter(|&idx| {
            idx != from_idx
                && ctx.mounted[idx].remount_count() == 0
                && ctx.mounted[idx].has_container_kind(kind)
        })
        .collect();
    pure.sort_by_key(|&idx| ctx.occupation_percentage(idx));

    let empties = ctx
        .empty_space_indices()
        .into_iter()
        .filter(|&idx| idx != from_idx);
    pure.into_iter().chain(empties).collect()
}

/// 以均衡供受双方占用率为目标折算的搬运数量
///
/// 受方已不比供方空时不搬 (继续搬会反向拉开差距);
/// 否则取供方超出均衡点的占用度折算成整件数,
/// 上限不超过少数派总量 (整托能容下时即完整移出)
fn equalized_move_amount(ctx: &Context, minority: &MinorityProduct, to_idx: usize) -> Decimal {
    let donor_pct = ctx.occupation_percentage(minority.space_idx);
    let recipient_pct = ctx.occupation_percentage(to_idx);
    if donor_pct <= recipient_pct {
        return Decimal::ZERO;
    }
    let product = match ctx.catalog.get(&minority.product_code) {
        Some(p) => p,
        None => return Decimal::ZERO,
    };
    let donor_size = ctx.spaces[minority.space_idx].size;
    let factor = match product.factor(donor_size) {
        Some(f) => f,
        None => return Decimal::ZERO,
    };
    let target_pct = (donor_pct + recipient_pct) / Decimal::TWO;
    let surplus = (donor_pct - target_pct) * donor_size.capacity() / Decimal::from(100);
    FactorConverter::quantity(surplus, factor, &product.pallet_setting)
        .trunc()
        .min(minority.amount)
}

/// 执行一轮拆分搬运
///
/// # 返回
/// 成功搬出的明细条数
fn split_pass(ctx: &mut Context, rule: &str) -> usize {
    let mut moved = 0;
    for minority in collect_minority_products(ctx) {
        let candidates = recipient_candidates(ctx, minority.space_idx, minority.kind);
        let mut relocated = Decimal::ZERO;
        for to_idx in candidates {
            let amount = equalized_move_amount(ctx, &minority, to_idx);
            if amount > Decimal::ZERO
                && ctx.move_mounted_product(
                    minority.space_idx,
                    to_idx,
                    &minority.product_code,
                    amount,
                )
            {
                relocated = amount;
                break;
            }
        }
        if relocated > Decimal::ZERO {
            moved += 1;
            debug!(
                rule,
                product = %minority.product_code,
                amount = %relocated,
                "返装少数派移出"
            );
        }
    }
    moved
}

// ==========================================
// ReturnableAndDisposableSplitRule - 混装拆分规则
// ==========================================
pub struct ReturnableAndDisposableSplitRule;

impl AllocationRule for ReturnableAndDisposableSplitRule {
    fn name(&self) -> &'static str {
        "ReturnableAndDisposableSplitRule"
    }

    fn should_execute(&self, ctx: &Context) -> bool {
        ctx.remount_total() > 0
    }

    fn execute(&self, ctx: &mut Context) -> Result<(), EngineError> {
        // 每轮搬运可能腾出新的接收位, 循环到不再有进展
        loop {
            if split_pass(ctx, self.name()) == 0 {
                break;
            }
        }
        Ok(())
    }
}

// ==========================================
// RemountRule - 返装消除规则 (试算版)
// ==========================================
// 在派生上下文上做拆分试算, 严格改善才并回
pub struct RemountRule;

impl AllocationRule for RemountRule {
    fn name(&self) -> &'static str {
        "RemountRule"
    }

    fn should_execute(&self, ctx: &Context) -> bool {
        ctx.remount_total() > 0
    }

    fn execute(&self, ctx: &mut Context) -> Result<(), EngineError> {
        let before = ctx.remount_total();
        let trial = ctx.begin_trial();
        loop {
            if split_pass(trial, "RemountRule") == 0 {
                break;
            }
        }
        let after = trial.remount_total();
        if ctx.adopt_snapshot_if_improved() {
            debug!(before, after, "返装试算改善, 并回");
        }
        Ok(())
    }
}

// ==========================================
// NonLayerOnLayerPalletRule - 层板纯化规则
// ==========================================
// 层板托盘上混入的非层板产品移到别处
pub struct NonLayerOnLayerPalletRule;

impl NonLayerOnLayerPalletRule {
    /// 层板托盘上的非层板明细
    fn misplaced_products(ctx: &Context) -> Vec<MinorityProduct> {
        let mut misplaced = Vec::new();
        for (space_idx, mounted_space) in ctx.mounted.iter().enumerate() {
            for container in &mounted_space.containers {
                if !container.layer {
                    continue;
                }
                for product in &container.products {
                    let layer_coded = ctx
                        .catalog
                        .get(&product.product_code)
                        .map(|p| p.layer_coded)
                        .unwrap_or(true);
                    if !layer_coded {
                        misplaced.push(MinorityProduct {
                            space_idx,
                            product_code: product.product_code.clone(),
                            amount: product.amount,
                            kind: product.mounted_kind(),
                        });
                    }
                }
            }
        }
        misplaced
    }

    /// 接收仓位: 无层板托盘的已装载仓位优先, 其次空仓位
    fn non_layer_candidates(ctx: &Context, from_idx: usize) -> Vec<usize> {
        let mut mounted: Vec<usize> = ctx
            .mounted_space_indices()
            .into_iter()
            .filter(|&idx| {
                idx != from_idx
                    && !ctx.mounted[idx].containers.iter().any(|c| c.layer)
            })
            .collect();
        mounted.sort_by_key(|&idx| ctx.occupation_percentage(idx));
        let empties = ctx
            .empty_space_indices()
            .into_iter()
            .filter(|&idx| idx != from_idx);
        mounted.into_iter().chain(empties).collect()
    }
}

impl AllocationRule for NonLayerOnLayerPalletRule {
    fn name(&self) -> &'static str {
        "NonLayerOnLayerPalletRule"
    }

    fn should_execute(&self, ctx: &Context) -> bool {
        !Self::misplaced_products(ctx).is_empty()
    }

    fn execute(&self, ctx: &mut Context) -> Result<(), EngineError> {
        let trial = ctx.begin_trial();
        let mut moved = 0usize;
        for misplaced in Self::misplaced_products(trial) {
            let candidates = Self::non_layer_candidates(trial, misplaced.space_idx);
            let relocated = candidates.into_iter().any(|to_idx| {
                trial.move_mounted_product(
                    misplaced.space_idx,
                    to_idx,
                    &misplaced.product_code,
                    misplaced.amount,
                )
            });
            if relocated {
                moved += 1;
            }
        }
        if ctx.adopt_snapshot_unless_worse() && moved > 0 {
            debug!(moved, "层板纯化试算并回");
        }
        Ok(())
    }
}

// ==========================================
// RemountSplittedRebuildPalletRule - 拆分返装重建规则
// ==========================================
// 含拆分明细的返装仓位整体清空, 数量归还后重走主分配
pub struct RemountSplittedRebuildPalletRule;

impl RemountSplittedRebuildPalletRule {
    /// 含拆分明细的返装仓位
    fn splitted_remount_spaces(ctx: &Context) -> Vec<usize> {
        ctx.mounted
            .iter()
            .enumerate()
            .filter(|(_, ms)| {
                ms.containers
                    .iter()
                    .any(|c| c.is_remount() && c.products.iter().any(|p| p.splitted))
            })
            .map(|(idx, _)| idx)
            .collect()
    }
}

impl AllocationRule for RemountSplittedRebuildPalletRule {
    fn name(&self) -> &'static str {
        "RemountSplittedRebuildPalletRule"
    }

    fn should_execute(&self, ctx: &Context) -> bool {
        !Self::splitted_remount_spaces(ctx).is_empty()
    }

    fn execute(&self, ctx: &mut Context) -> Result<(), EngineError> {
        let spaces = Self::splitted_remount_spaces(ctx);
        let trial = ctx.begin_trial();
        for space_idx in &spaces {
            trial.clear_space(*space_idx);
        }
        PalletGroupSubGroupRule.execute(trial)?;

        if ctx.adopt_snapshot_if_improved() {
            debug!(cleared = spaces.len(), "返装仓位重建改善, 并回");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::domain::container::{Container, MountedProduct};
    use crate::domain::item::Item;
    use crate::domain::product::{Factor, PackingGroup, PalletSetting, Product, ProductCatalog};
    use crate::domain::space::Space;
    use crate::domain::types::{Side, SpaceSize};
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn test_product(code: &str, kind: ContainerKind, layer_coded: bool) -> Product {
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
            layer_coded,
        }
    }

    fn mounted_detail(
        product_code: &str,
        kind: ContainerKind,
        amount: Decimal,
        occupation: Decimal,
        splitted: bool,
    ) -> MountedProduct {
        MountedProduct {
            item_code: product_code.to_string(),
            product_code: product_code.to_string(),
            amount,
            package: None,
            assembly_sequence: 0,
            quantity_of_layers: 0,
            first_layer_index: 0,
            splitted,
            customer: None,
            occupation,
            additional_occupation: Decimal::ZERO,
            unit_gross_weight: dec!(10),
            kind_tag: kind,
        }
    }

    /// 仓位 0 上放一个混装返装托盘: 可回收 30 件 + 一次性 10 件
    fn remount_context() -> Context {
        let catalog = ProductCatalog::from_products(vec![
            test_product("RET", ContainerKind::Returnable, false),
            test_product("DIS", ContainerKind::Disposable, false),
        ])
        .into_shared();
        let spaces = vec![
            Space::new(1, SpaceSize::S42, 1, Side::Driver),
            Space::new(2, SpaceSize::S42, 1, Side::Helper),
            Space::new(3, SpaceSize::S42, 2, Side::Driver),
        ];
        let mut items = vec![Item::new("RET", dec!(30), 0), Item::new("DIS", dec!(10), 0)];
        for item in &mut items {
            let amount = item.amount;
            item.drain(amount);
        }
        let mut ctx = Context::new(spaces, items, catalog, Settings::new());

        let mut container = Container::new(ContainerKind::Returnable, "G1", "S1");
        container
            .products
            .push(mounted_detail("RET", ContainerKind::Returnable, dec!(30), dec!(15), false));
        container
            .products
            .push(mounted_detail("DIS", ContainerKind::Disposable, dec!(10), dec!(5), false));
        ctx.mounted[0].containers.push(container);

        // 仓位 1 是一次性纯托盘, 可作接收位
        let mut pure = Container::new(ContainerKind::Disposable, "G1", "S1");
        pure.products
            .push(mounted_detail("DIS", ContainerKind::Disposable, dec!(10), dec!(5), false));
        ctx.mounted[1].containers.push(pure);
        ctx
    }

    #[test]
    fn test_split_moves_minority_to_pure_recipient() {
        let mut ctx = remount_context();
        assert_eq!(ctx.remount_total(), 1);

        let rule = ReturnableAndDisposableSplitRule;
        assert!(rule.should_execute(&ctx));
        rule.execute(&mut ctx).unwrap();

        // 一次性 10 件 (少数派) 移到仓位 1 的纯托盘
        assert_eq!(ctx.remount_total(), 0);
        assert!(!ctx.mounted[0].has_container_kind(ContainerKind::Disposable));
        let dis_amount: Decimal = ctx.mounted[1]
            .containers
            .iter()
            .flat_map(|c| c.products.iter())
            .filter(|p| p.product_code == "DIS")
            .map(|p| p.amount)
            .sum();
        assert_eq!(dis_amount, dec!(20));
        assert!(ctx.capacity_invariant_holds());
    }

    #[test]
    fn test_remount_rule_adopts_only_on_improvement() {
        let mut ctx = remount_context();
        let rule = RemountRule;
        assert!(rule.should_execute(&ctx));
        rule.execute(&mut ctx).unwrap();
        // 试算能消除返装 → 并回
        assert_eq!(ctx.remount_total(), 0);
        assert!(!rule.should_execute(&ctx));
    }

    #[test]
    fn test_split_equalizes_donor_and_recipient_occupancy() {
        // 供方 95.24% (可回收 20 + 一次性 20), 受方纯一次性 23.81%
        let mut dense = test_product("DIS", ContainerKind::Disposable, false);
        for factor in dense.factors.values_mut() {
            factor.value = dec!(2);
        }
        let catalog = ProductCatalog::from_products(vec![
            test_product("RET", ContainerKind::Returnable, false),
            dense,
        ])
        .into_shared();
        let spaces = vec![
            Space::new(1, SpaceSize::S42, 1, Side::Driver),
            Space::new(2, SpaceSize::S42, 1, Side::Helper),
        ];
        let mut ctx = Context::new(spaces, Vec::new(), catalog, Settings::new());

        let mut donor = Container::new(ContainerKind::Returnable, "G1", "S1");
        donor
            .products
            .push(mounted_detail("RET", ContainerKind::Returnable, dec!(40), dec!(20), false));
        donor
            .products
            .push(mounted_detail("DIS", ContainerKind::Disposable, dec!(20), dec!(20), false));
        ctx.mounted[0].containers.push(donor);

        let mut recipient = Container::new(ContainerKind::Disposable, "G1", "S1");
        recipient
            .products
            .push(mounted_detail("DIS", ContainerKind::Disposable, dec!(10), dec!(10), false));
        ctx.mounted[1].containers.push(recipient);

        ReturnableAndDisposableSplitRule.execute(&mut ctx).unwrap();

        // 只搬 15 件: 供受双方占用率拉平到 59.52%, 剩余 5 件留在供方
        assert_eq!(ctx.mounted[0].occupation(), dec!(25.00));
        assert_eq!(ctx.mounted[1].occupation(), dec!(25.00));
        let gap = (ctx.occupation_percentage(0) - ctx.occupation_percentage(1)).abs();
        assert!(gap <= dec!(5));
        let recipient_dis: Decimal = ctx.mounted[1]
            .containers
            .iter()
            .flat_map(|c| c.products.iter())
            .filter(|p| p.product_code == "DIS")
            .map(|p| p.amount)
            .sum();
        assert_eq!(recipient_dis, dec!(25));
        assert!(ctx.capacity_invariant_holds());
    }

    #[test]
    fn test_split_noop_when_no_recipient_fits() {
        let mut ctx = remount_context();
        // 封锁全部备选仓位, 少数派无处可去
        ctx.spaces[1].blocked = true;
        ctx.spaces[2].blocked = true;
        ReturnableAndDisposableSplitRule.execute(&mut ctx).unwrap();
        assert_eq!(ctx.remount_total(), 1);
    }

    #[test]
    fn test_non_layer_product_moved_off_layer_pallet() {
        let catalog = ProductCatalog::from_products(vec![
            test_product("LAY", ContainerKind::Returnable, true),
            test_product("NLY", ContainerKind::Returnable, false),
        ])
        .into_shared();
        let spaces = vec![
            Space::new(1, SpaceSize::S42, 1, Side::Driver),
            Space::new(2, SpaceSize::S42, 1, Side::Helper),
        ];
        let mut ctx = Context::new(spaces, Vec::new(), catalog, Settings::new());

        let mut container = Container::new(ContainerKind::Returnable, "G1", "S1");
        container.layer = true;
        container
            .products
            .push(mounted_detail("LAY", ContainerKind::Returnable, dec!(24), dec!(12), false));
        container
            .products
            .push(mounted_detail("NLY", ContainerKind::Returnable, dec!(10), dec!(5), false));
        ctx.mounted[0].containers.push(container);

        let rule = NonLayerOnLayerPalletRule;
        assert!(rule.should_execute(&ctx));
        rule.execute(&mut ctx).unwrap();

        // 非层板 NLY 移到空仓位 1
        assert!(!rule.should_execute(&ctx));
        assert!(ctx.mounted[1].is_mounted());
    }

    #[test]
    fn test_rebuild_clears_splitted_remount_spaces() {
        let mut ctx = remount_context();
        // 把返装托盘的一次性明细标记为拆分产物
        ctx.mounted[0].containers[0].products[1].splitted = true;

        let rule = RemountSplittedRebuildPalletRule;
        assert!(rule.should_execute(&ctx));
        rule.execute(&mut ctx).unwrap();

        // 重建后返装消除 (主分配按类型分托重装)
        assert_eq!(ctx.remount_total(), 0);
        assert!(ctx.capacity_invariant_holds());
    }
}
