// ==========================================
// 整车托盘装载规划系统 - 主分配规则
// ==========================================
// 依据: Loading_Engine_Specs_v1.0.md - 4.3 PalletGroupSubGroupRule
// ==========================================
// 职责: 按 (分组, 子组) 归组的通用分配器
// 算法: 逐档尺寸降序 + 子序列搜索, 选剩余容量最小的组合
// 红线: 降档检查在占用率相等时拒绝降档 (保持现状策略)
// ==========================================

use crate::domain::types::{ContainerKind, SpaceSize};
use crate::engine::context::{Context, PlacementMeta};
use crate::engine::error::EngineError;
use crate::engine::factor_converter::{FactorConverter, OccupationRequest};
use crate::engine::rule_chain::AllocationRule;
use crate::engine::subsequence::SubsequenceGenerator;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::debug;

// ==========================================
// PalletGroupSubGroupRule - 主分配规则
// ==========================================
pub struct PalletGroupSubGroupRule;

/// 子序列搜索的择优结果
struct SubsetChoice {
    item_indices: Vec<usize>,
    total_occupation: Decimal,
}

impl PalletGroupSubGroupRule {
    /// 参与主分配的产品类型
    fn is_palletizable(kind: ContainerKind) -> bool {
        matches!(
            kind,
            ContainerKind::Disposable | ContainerKind::Returnable | ContainerKind::IsotonicWater
        )
    }

    /// 待装条目按 (分组, 子组) 归组
    fn groups(ctx: &Context) -> BTreeMap<(String, String), Vec<usize>> {
        let mut groups: BTreeMap<(String, String), Vec<usize>> = BTreeMap::new();
        for item_idx in
            ctx.pending_items_where(|p| Self::is_palletizable(p.kind) && !p.layer_coded)
        {
            if let Some(product) = ctx.product_of_item(item_idx) {
                groups
                    .entry((
                        product.packing_group.group_code.clone(),
                        product.packing_group.sub_group_code.clone(),
                    ))
                    .or_default()
                    .push(item_idx);
            }
        }
        groups
    }

    /// 条目剩余量在指定尺寸下的占用度
    fn remaining_occupation(ctx: &Context, item_idx: usize, size: SpaceSize) -> Option<Decimal> {
        let item = &ctx.items[item_idx];
        let product = ctx.product_of_item(item_idx)?;
        let factor = product.factor(size)?;
        Some(FactorConverter::occupation(
            OccupationRequest::ByQuantityFactorPalletSetting {
                quantity: item.amount_remaining,
                factor,
                pallet_setting: &product.pallet_setting,
                calculate_additional: product.calculate_additional_occupation
                    && product.has_ballast_metadata(),
            },
        ))
    }

    /// 子序列搜索: 在指定尺寸下为本组择优
    ///
    /// 1) 丢弃超出容量的组合
    /// 2) 优先在达到最小占用率的组合中选剩余容量最小者
    /// 3) 无组合达标时退而求其次, 选装得下的最满组合
    ///    (避免可放条目全部滞留为残余)
    fn best_subset(
        ctx: &Context,
        indices: &[usize],
        size: SpaceSize,
        minimum_pct: Decimal,
    ) -> Option<SubsetChoice> {
        let capacity = size.capacity();
        let generator = SubsequenceGenerator::new(ctx.settings.subsequence_limit());

        let mut best_qualified: Option<SubsetChoice> = None;
        let mut best_fitting: Option<SubsetChoice> = None;

        for subset in generator.subsequences(indices) {
            if subset.is_empty() {
                continue;
            }
            let mut total = Decimal::ZERO;
            let mut feasible = true;
            for &item_idx in &subset {
                match Self::remaining_occupation(ctx, item_idx, size) {
                    Some(occ) => total += occ,
                    None => {
                        feasible = false;
                        break;
                    }
                }
            }
            if !feasible || total.is_zero() || total > capacity {
                continue;
            }

            let pct = total * Decimal::from(100) / capacity;
            let choice = SubsetChoice {
                item_indices: subset,
                total_occupation: total,
            };
            if pct >= minimum_pct {
                let better = match &best_qualified {
                    Some(current) => total > current.total_occupation,
                    None => true,
                };
                if better {
                    best_qualified = Some(choice);
                    continue;
                }
            } else {
                let better = match &best_fitting {
                    Some(current) => total > current.total_occupation,
                    None => true,
                };
                if better {
                    best_fitting = Some(choice);
                }
            }
        }

        best_qualified.or(best_fitting)
    }

    /// 把选中组合落到指定仓位
    fn commit(ctx: &mut Context, space_idx: usize, choice: &SubsetChoice) -> bool {
        let mut placed_any = false;
        for &item_idx in &choice.item_indices {
            let remaining_capacity = ctx.remaining_capacity(space_idx);
            let amount = {
                let item = &ctx.items[item_idx];
                let product = match ctx.product_of_item(item_idx) {
                    Some(p) => p,
                    None => continue,
                };
                let factor = match product.factor(ctx.spaces[space_idx].size) {
                    Some(f) => f,
                    None => continue,
                };
                FactorConverter::quantity_per_factor(
                    remaining_capacity,
                    item.amount_remaining,
                    factor,
                    &product.pallet_setting,
                    product.calculate_additional_occupation && product.has_ballast_metadata(),
                )
            };
            if amount <= Decimal::ZERO {
                continue;
            }
            if ctx.add_product(space_idx, item_idx, amount, PlacementMeta::default()) {
                placed_any = true;
            }
        }
        placed_any
    }

    /// 空仓位的不同尺寸, 降序
    fn distinct_empty_sizes(ctx: &Context) -> Vec<SpaceSize> {
        let mut sizes: Vec<SpaceSize> = ctx
            .empty_space_indices()
            .into_iter()
            .map(|idx| ctx.spaces[idx].size)
            .collect();
        sizes.sort_by(|a, b| b.cmp(a));
        sizes.dedup();
        sizes
    }

    /// 指定尺寸的一个空仓位
    fn empty_space_of_size(ctx: &Context, size: SpaceSize) -> Option<usize> {
        ctx.empty_space_indices()
            .into_iter()
            .find(|&idx| ctx.spaces[idx].size == size)
    }
}

impl AllocationRule for PalletGroupSubGroupRule {
    fn name(&self) -> &'static str {
        "PalletGroupSubGroupRule"
    }

    fn should_execute(&self, ctx: &Context) -> bool {
        !Self::groups(ctx).is_empty() && !ctx.empty_space_indices().is_empty()
    }

    fn execute(&self, ctx: &mut Context) -> Result<(), EngineError> {
        let minimum_pct = ctx.settings.minimum_occupation_percentage();

        // 外层循环: 每轮每组最多开一个托盘, 直到无进展
        loop {
            let mut progressed = false;

            for ((group_code, sub_group_code), indices) in Self::groups(ctx) {
                let sizes = Self::distinct_empty_sizes(ctx);
                for (pos, &size) in sizes.iter().enumerate() {
                    let choice = match Self::best_subset(ctx, &indices, size, minimum_pct) {
                        Some(c) => c,
                        None => continue,
                    };
                    let current_pct =
                        choice.total_occupation * Decimal::from(100) / size.capacity();

                    // 降档检查: 空仓位中的下一档占用率必须严格更高才值得降档;
                    // 相等时保持当前档 (现状策略)
                    if let Some(&next_size) = sizes.get(pos + 1) {
                        if let Some(next_choice) =
                            Self::best_subset(ctx, &indices, next_size, minimum_pct)
                        {
                            let next_pct = next_choice.total_occupation * Decimal::from(100)
                                / next_size.capacity();
                            if next_pct > current_pct {
                                debug!(
                                    %group_code,
                                    %sub_group_code,
                                    %size,
                                    %current_pct,
                                    %next_pct,
                                    "下一档占用率更高, 跳过当前档"
                                );
                                continue;
                            }
                        }
                    }

                    let space_idx = match Self::empty_space_of_size(ctx, size) {
                        Some(idx) => idx,
                        None => continue,
                    };
                    if Self::commit(ctx, space_idx, &choice) {
                        debug!(
                            %group_code,
                            %sub_group_code,
                            space = ctx.spaces[space_idx].number,
                            %size,
                            occupation = %ctx.mounted[space_idx].occupation(),
                            "主分配落位"
                        );
                        progressed = true;
                        break; // 本组本轮完成, 换下一组
                    }
                }
            }

            if !progressed {
                break;
            }
        }
        Ok(())
    }
}
