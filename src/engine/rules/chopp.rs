// ==========================================
// 整车托盘装载规划系统 - 桶装生啤规则
// ==========================================
// 依据: Loading_Engine_Specs_v1.0.md - 4.3 ChoppPalletizationRule
// ==========================================
// 职责: 桶装生啤 (chopp) 五阶段落位
//   1) 整托闭合: 剩余量够一整托的先按整托落位
//   2) 拼托: 不同升数的条目组合成一托, 子序列搜索取最满组合
//   3) 残桶落空位: 剩余量多者优先
//   4) 已装桶位补满
//   5) 按参数标记桶装专托
// 红线: 拼托至少两个不同升数的条目
// ==========================================

use crate::domain::types::ContainerKind;
use crate::engine::context::{Context, PlacementMeta};
use crate::engine::error::EngineError;
use crate::engine::factor_converter::{FactorConverter, OccupationRequest};
use crate::engine::rule_chain::AllocationRule;
use crate::engine::subsequence::SubsequenceGenerator;
use rust_decimal::Decimal;
use tracing::debug;

// ==========================================
// ChoppPalletizationRule - 桶装生啤规则
// ==========================================
pub struct ChoppPalletizationRule;

impl ChoppPalletizationRule {
    fn pending_chopp(ctx: &Context) -> Vec<usize> {
        ctx.pending_items_where(|p| p.is_chopp())
    }

    /// 条目剩余量在指定仓位下的占用度
    fn remaining_occupation(ctx: &Context, item_idx: usize, space_idx: usize) -> Option<Decimal> {
        let item = &ctx.items[item_idx];
        let product = ctx.product_of_item(item_idx)?;
        let factor = product.factor(ctx.spaces[space_idx].size)?;
        Some(FactorConverter::occupation(
            OccupationRequest::ByQuantityFactorPalletSetting {
                quantity: item.amount_remaining,
                factor,
                pallet_setting: &product.pallet_setting,
                calculate_additional: false,
            },
        ))
    }

    /// 阶段 1: 整托闭合
    ///
    /// 剩余量 >= 单托码放数量的条目, 按整托倍数落进空仓位
    fn place_closed_pallets(ctx: &mut Context) {
        for item_idx in Self::pending_chopp(ctx) {
            loop {
                let per_pallet = match ctx.product_of_item(item_idx) {
                    Some(p) => p.pallet_setting.quantity,
                    None => break,
                };
                if per_pallet <= Decimal::ZERO
                    || ctx.items[item_idx].amount_remaining < per_pallet
                {
                    break;
                }
                let mut empties = ctx.empty_space_indices();
                // 大仓位优先
                empties.sort_by_key(|&idx| std::cmp::Reverse(ctx.spaces[idx].size));
                let placed = empties.iter().any(|&space_idx| {
                    ctx.add_product(space_idx, item_idx, per_pallet, PlacementMeta::default())
                });
                if !placed {
                    break;
                }
            }
        }
    }

    /// 阶段 2: 拼托
    ///
    /// 至少两个不同升数的条目组合, 子序列搜索取装得下的最满组合;
    /// 成功即重复, 直到无可拼组合
    fn co_pack(ctx: &mut Context) {
        loop {
            let mut empties = ctx.empty_space_indices();
            empties.sort_by_key(|&idx| std::cmp::Reverse(ctx.spaces[idx].size));
            let space_idx = match empties.first() {
                Some(&idx) => idx,
                None => break,
            };
            let capacity = ctx.spaces[space_idx].capacity();

            let candidates = Self::pending_chopp(ctx);
            if candidates.len() < 2 {
                break;
            }

            let generator = SubsequenceGenerator::new(ctx.settings.subsequence_limit());
            let mut best: Option<(Vec<usize>, Decimal)> = None;
            for subset in generator.subsequences(&candidates) {
                if subset.len() < 2 {
                    continue;
                }
                // 升数必须有差异, 同升数的应走整托或残桶阶段
                let litrages: Vec<Option<Decimal>> = subset
                    .iter()
                    .filter_map(|&idx| ctx.product_of_item(idx))
                    .map(|p| p.litrage)
                    .collect();
                let distinct = {
                    let mut seen = litrages.clone();
                    seen.sort();
                    seen.dedup();
                    seen.len()
                };
                if distinct < 2 {
                    continue;
                }

                let mut total = Decimal::ZERO;
                let mut feasible = true;
                for &idx in &subset {
                    match Self::remaining_occupation(ctx, idx, space_idx) {
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
                let better = match &best {
                    Some((_, current)) => total > *current,
                    None => true,
                };
                if better {
                    best = Some((subset, total));
                }
            }

            let (subset, total) = match best {
                Some(b) => b,
                None => break,
            };
            let mut placed_any = false;
            for &item_idx in &subset {
                let amount = ctx.items[item_idx].amount_remaining;
                if ctx.add_product(space_idx, item_idx, amount, PlacementMeta::default()) {
                    placed_any = true;
                }
            }
            if !placed_any {
                break;
            }
            debug!(
                space = ctx.spaces[space_idx].number,
                %total,
                items = subset.len(),
                "桶装拼托落位"
            );
        }
    }

    /// 阶段 3: 残桶落空位, 剩余量多者优先
    fn place_residual_kegs(ctx: &mut Context) {
        loop {
            let mut pending = Self::pending_chopp(ctx);
            pending.sort_by_key(|&idx| std::cmp::Reverse(ctx.items[idx].amount_remaining));
            let item_idx = match pending.first() {
                Some(&idx) => idx,
                None => break,
            };

            let mut empties = ctx.empty_space_indices();
            empties.sort_by_key(|&idx| std::cmp::Reverse(ctx.spaces[idx].size));
            let mut placed = false;
            for &space_idx in &empties {
                let amount = match Self::admissible_amount(ctx, item_idx, space_idx) {
                    Some(a) if a > Decimal::ZERO => a,
                    _ => continue,
                };
                if ctx.add_product(space_idx, item_idx, amount, PlacementMeta::default()) {
                    placed = true;
                    break;
                }
            }
            if !placed {
                break;
            }
        }
    }

    /// 阶段 4: 已装桶位补满
    fn top_up_mounted(ctx: &mut Context) {
        let keg_spaces: Vec<usize> = ctx
            .mounted_space_indices()
            .into_iter()
            .filter(|&idx| ctx.mounted[idx].has_container_kind(ContainerKind::Chopp))
            .collect();
        for space_idx in keg_spaces {
            for item_idx in Self::pending_chopp(ctx) {
                let amount = match Self::admissible_amount(ctx, item_idx, space_idx) {
                    Some(a) if a > Decimal::ZERO => a,
                    _ => continue,
                };
                ctx.add_product(space_idx, item_idx, amount, PlacementMeta::default());
            }
        }
    }

    /// 剩余容量允许的最大放置数量
    fn admissible_amount(ctx: &Context, item_idx: usize, space_idx: usize) -> Option<Decimal> {
        let item = &ctx.items[item_idx];
        let product = ctx.product_of_item(item_idx)?;
        let factor = product.factor(ctx.spaces[space_idx].size)?;
        Some(FactorConverter::quantity_per_factor(
            ctx.remaining_capacity(space_idx),
            item.amount_remaining,
            factor,
            &product.pallet_setting,
            false,
        ))
    }

    /// 阶段 5: 标记桶装专托
    fn mark_keg_exclusive(ctx: &mut Context) {
        if !ctx.settings.keg_exclusive_pallet() {
            return;
        }
        for mounted_space in &mut ctx.mounted {
            for container in &mut mounted_space.containers {
                if container.kind == ContainerKind::Chopp {
                    container.keg_exclusive = true;
                }
            }
        }
    }
}

impl AllocationRule for ChoppPalletizationRule {
    fn name(&self) -> &'static str {
        "ChoppPalletizationRule"
    }

    fn should_execute(&self, ctx: &Context) -> bool {
        !Self::pending_chopp(ctx).is_empty()
    }

    fn execute(&self, ctx: &mut Context) -> Result<(), EngineError> {
        Self::place_closed_pallets(ctx);
        Self::co_pack(ctx);
        Self::place_residual_kegs(ctx);
        Self::top_up_mounted(ctx);
        Self::mark_keg_exclusive(ctx);
        Ok(())
    }
}
