// ==========================================
// 整车托盘装载规划系统 - 层板规则
// ==========================================
// 依据: Loading_Engine_Specs_v1.0.md - 4.3 LayerRule
// ==========================================
// 职责: 层板编码条目沿固定尺寸链 42→35→28→21→14 落位
// 排序: 非一次性优先, 剩余层数多者优先
// 红线: 只有占用率不回退才允许降档
// ==========================================

use crate::domain::types::{ContainerKind, SpaceSize};
use crate::engine::context::{Context, PlacementMeta};
use crate::engine::error::EngineError;
use crate::engine::factor_converter::{FactorConverter, OccupationRequest};
use crate::engine::rule_chain::AllocationRule;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::debug;

// ==========================================
// LayerRule - 层板规则
// ==========================================
pub struct LayerRule;

impl LayerRule {
    /// 待装的层板条目索引, 按码放代码归组
    fn layer_groups(ctx: &Context) -> BTreeMap<String, Vec<usize>> {
        let mut groups: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for item_idx in ctx.pending_items_where(|p| p.layer_coded) {
            if ctx.items[item_idx].layers_remaining == 0 {
                continue;
            }
            if let Some(product) = ctx.product_of_item(item_idx) {
                groups
                    .entry(product.packing_group.packing_code.clone())
                    .or_default()
                    .push(item_idx);
            }
        }
        groups
    }

    /// 组内候选排序: 非一次性优先, 剩余层数降序
    fn sort_candidates(ctx: &Context, indices: &mut [usize]) {
        indices.sort_by_key(|&idx| {
            let disposable = ctx
                .product_of_item(idx)
                .map(|p| p.kind == ContainerKind::Disposable)
                .unwrap_or(true);
            (disposable, std::cmp::Reverse(ctx.items[idx].layers_remaining))
        });
    }

    /// 本组剩余量在指定尺寸下可达到的占用率预估
    fn projected_percentage(ctx: &Context, indices: &[usize], size: SpaceSize) -> Decimal {
        let capacity = size.capacity();
        let mut total = Decimal::ZERO;
        for &idx in indices {
            let item = &ctx.items[idx];
            if !item.is_pending() {
                continue;
            }
            if let Some(product) = ctx.product_of_item(idx) {
                if let Some(factor) = product.factor(size) {
                    total += FactorConverter::occupation(
                        OccupationRequest::ByQuantityFactorPalletSetting {
                            quantity: item.amount_remaining,
                            factor,
                            pallet_setting: &product.pallet_setting,
                            calculate_additional: false,
                        },
                    );
                }
            }
        }
        if capacity.is_zero() {
            return Decimal::ZERO;
        }
        total.min(capacity) * Decimal::from(100) / capacity
    }

    /// 用本组条目按压舱倍数填满一个空仓位
    ///
    /// 整层放完后, 按参数或产品档允许时把不满一层的零头
    /// 作为顶层并入同仓位
    ///
    /// # 返回
    /// 是否放入过任何数量
    fn fill_space(ctx: &mut Context, space_idx: usize, indices: &[usize]) -> bool {
        let mut placed_any = false;
        for &item_idx in indices {
            let mut layers_here = false;
            loop {
                let item = &ctx.items[item_idx];
                if !item.is_pending() || item.layers_remaining == 0 {
                    break;
                }
                let product = match ctx.product_of_item(item_idx) {
                    Some(p) => p,
                    None => break,
                };
                // 压舱倍数: 单层码放数量
                let ballast = product.pallet_setting.quantity_per_layer();
                if ballast <= Decimal::ZERO {
                    break;
                }
                let amount = ballast.min(item.amount_remaining);
                if amount < ballast {
                    // 不满一层的零头交给后续规则
                    break;
                }
                if !ctx.can_add(space_idx, item_idx, amount) {
                    break;
                }
                let first_layer = ctx.items[item_idx].layers_remaining;
                if !ctx.add_product(
                    space_idx,
                    item_idx,
                    amount,
                    PlacementMeta {
                        layer: true,
                        quantity_of_layers: 1,
                        first_layer_index: first_layer,
                        ..PlacementMeta::default()
                    },
                ) {
                    break;
                }
                ctx.items[item_idx].drain_layers(1);
                layers_here = true;
                placed_any = true;
            }

            // 顶层零头: 整层之上叠不满一层的剩余量
            let top_allowed = ctx.settings.include_top_of_pallet()
                || ctx
                    .product_of_item(item_idx)
                    .map(|p| p.pallet_setting.include_top_of_pallet)
                    .unwrap_or(false);
            if layers_here && top_allowed {
                let remainder = ctx.items[item_idx].amount_remaining;
                if remainder > Decimal::ZERO
                    && ctx.can_add(space_idx, item_idx, remainder)
                    && ctx.add_product(
                        space_idx,
                        item_idx,
                        remainder,
                        PlacementMeta {
                            layer: true,
                            ..PlacementMeta::default()
                        },
                    )
                {
                    placed_any = true;
                }
            }
        }
        placed_any
    }
}

impl AllocationRule for LayerRule {
    fn name(&self) -> &'static str {
        "LayerRule"
    }

    fn should_execute(&self, ctx: &Context) -> bool {
        !Self::layer_groups(ctx).is_empty() && !ctx.empty_space_indices().is_empty()
    }

    fn execute(&self, ctx: &mut Context) -> Result<(), EngineError> {
        for (packing_code, mut indices) in Self::layer_groups(ctx) {
            Self::sort_candidates(ctx, &mut indices);

            let mut committed_pct: Option<Decimal> = None;
            for size in SpaceSize::descending() {
                // 降档前检查: 在更小尺寸上的预估占用率不得低于已达成占用率
                let projected = Self::projected_percentage(ctx, &indices, size);
                if let Some(prev) = committed_pct {
                    if projected < prev {
                        debug!(
                            %packing_code,
                            %size,
                            %projected,
                            %prev,
                            "降档会使占用率回退, 停止本组"
                        );
                        break;
                    }
                }

                let empty: Vec<usize> = ctx
                    .empty_space_indices()
                    .into_iter()
                    .filter(|&idx| ctx.spaces[idx].size == size)
                    .collect();
                for space_idx in empty {
                    if Self::fill_space(ctx, space_idx, &indices) {
                        committed_pct = Some(ctx.occupation_percentage(space_idx));
                    }
                }
            }
        }
        Ok(())
    }
}
