// ==========================================
// 整车托盘装载规划系统 - 兜底散装规则
// ==========================================
// 依据: Loading_Engine_Specs_v1.0.md - 4.3 NonPalletizedProductsRule
// ==========================================
// 职责: 前序规则跑完后残余条目的最后落位
// 排序: 同分组仓位优先, 其次同类型, 最后任意可用仓位
// 红线: 本规则之后仍有剩余的条目即为"未上托"残余
// ==========================================

use crate::engine::context::{Context, PlacementMeta};
use crate::engine::error::EngineError;
use crate::engine::factor_converter::FactorConverter;
use crate::engine::rule_chain::AllocationRule;
use rust_decimal::Decimal;
use tracing::debug;

// ==========================================
// NonPalletizedProductsRule - 兜底散装规则
// ==========================================
pub struct NonPalletizedProductsRule;

impl NonPalletizedProductsRule {
    /// 候选仓位排序: 同分组 > 同类型 > 其余, 组内按剩余容量降序
    fn ranked_spaces(ctx: &Context, item_idx: usize) -> Vec<usize> {
        let (group_code, kind) = match ctx.product_of_item(item_idx) {
            Some(p) => (p.packing_group.group_code.clone(), p.kind),
            None => return Vec::new(),
        };

        let mut candidates: Vec<usize> = (0..ctx.spaces.len())
            .filter(|&idx| !ctx.spaces[idx].blocked)
            .collect();
        candidates.sort_by_key(|&idx| {
            let same_group = ctx.mounted[idx]
                .containers
                .iter()
                .any(|c| !c.is_empty() && c.group_code == group_code);
            let same_kind = ctx.mounted[idx].has_container_kind(kind);
            (
                std::cmp::Reverse(same_group),
                std::cmp::Reverse(same_kind),
                std::cmp::Reverse(ctx.remaining_capacity(idx)),
            )
        });
        candidates
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
            product.calculate_additional_occupation && product.has_ballast_metadata(),
        ))
    }

    /// 放置后把承接托盘标记为散装
    fn mark_bulk(ctx: &mut Context, space_idx: usize, item_idx: usize) {
        let (kind, group_code, sub_group_code) = match ctx.product_of_item(item_idx) {
            Some(p) => (
                p.kind,
                p.packing_group.group_code.clone(),
                p.packing_group.sub_group_code.clone(),
            ),
            None => return,
        };
        if let Some(container) =
            ctx.mounted[space_idx].find_container_mut(kind, &group_code, &sub_group_code)
        {
            container.bulk = true;
        }
    }
}

impl AllocationRule for NonPalletizedProductsRule {
    fn name(&self) -> &'static str {
        "NonPalletizedProductsRule"
    }

    fn should_execute(&self, ctx: &Context) -> bool {
        ctx.non_palletized_count() > 0
    }

    fn execute(&self, ctx: &mut Context) -> Result<(), EngineError> {
        for item_idx in ctx.pending_item_indices() {
            for space_idx in Self::ranked_spaces(ctx, item_idx) {
                if !ctx.items[item_idx].is_pending() {
                    break;
                }
                let amount = match Self::admissible_amount(ctx, item_idx, space_idx) {
                    Some(a) if a > Decimal::ZERO => a,
                    _ => continue,
                };
                if ctx.add_product(space_idx, item_idx, amount, PlacementMeta::default()) {
                    Self::mark_bulk(ctx, space_idx, item_idx);
                }
            }
            if ctx.items[item_idx].is_pending() {
                debug!(
                    item = %ctx.items[item_idx].code,
                    remaining = %ctx.items[item_idx].amount_remaining,
                    "兜底后仍有残余, 保留为未上托"
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::domain::item::Item;
    use crate::domain::product::{Factor, PackingGroup, PalletSetting, Product, ProductCatalog};
    use crate::domain::space::Space;
    use crate::domain::types::{ContainerKind, Side, SpaceSize};
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn bulk_product(code: &str, group: &str) -> Product {
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
            kind: ContainerKind::Disposable,
            packing_group: PackingGroup {
                group_code: group.to_string(),
                sub_group_code: "S1".to_string(),
                packing_code: String::new(),
            },
            pallet_setting: PalletSetting {
                quantity: dec!(50),
                quantity_dozen: dec!(50),
                quantity_ballast_min: Decimal::ZERO,
                layers: 0,
                include_top_of_pallet: false,
            },
            factors,
            gross_weight: dec!(5),
            calculate_additional_occupation: false,
            units_per_box: None,
            litrage: None,
            layer_coded: false,
        }
    }

    #[test]
    fn test_places_residual_and_marks_bulk() {
        let catalog = ProductCatalog::from_products(vec![bulk_product("100", "G1")]).into_shared();
        let mut ctx = Context::new(
            vec![Space::new(1, SpaceSize::S14, 1, Side::Driver)],
            vec![Item::new("100", dec!(20), 0)],
            catalog,
            Settings::new(),
        );

        let rule = NonPalletizedProductsRule;
        assert!(rule.should_execute(&ctx));
        rule.execute(&mut ctx).unwrap();

        // 20 件占 10 ≤ 14, 全部落位且托盘标记散装
        assert_eq!(ctx.items[0].amount_remaining, dec!(0));
        assert!(ctx.mounted[0].containers.iter().all(|c| c.bulk));
        assert!(ctx.capacity_invariant_holds());
    }

    #[test]
    fn test_overflow_left_as_residual() {
        let catalog = ProductCatalog::from_products(vec![bulk_product("100", "G1")]).into_shared();
        let mut ctx = Context::new(
            vec![Space::new(1, SpaceSize::S14, 1, Side::Driver)],
            vec![Item::new("100", dec!(40), 0)],
            catalog,
            Settings::new(),
        );

        NonPalletizedProductsRule.execute(&mut ctx).unwrap();

        // S14 只装得下 28 件 (占 14), 残余 12 件
        assert_eq!(ctx.items[0].amount_remaining, dec!(12));
        assert_eq!(ctx.mounted[0].occupation(), dec!(14.00));
        assert_eq!(ctx.non_palletized_count(), 1);
    }

    #[test]
    fn test_prefers_space_with_same_group() {
        let catalog = ProductCatalog::from_products(vec![
            bulk_product("100", "G1"),
            bulk_product("200", "G1"),
        ])
        .into_shared();
        let mut ctx = Context::new(
            vec![
                Space::new(1, SpaceSize::S42, 1, Side::Driver),
                Space::new(2, SpaceSize::S42, 1, Side::Helper),
            ],
            vec![Item::new("100", dec!(10), 0), Item::new("200", dec!(10), 0)],
            catalog,
            Settings::new(),
        );
        // 先把 100 放进仓位 1, 让它成为 G1 分组仓位
        assert!(ctx.add_product(1, 0, dec!(10), PlacementMeta::default()));

        NonPalletizedProductsRule.execute(&mut ctx).unwrap();

        // 200 跟随同分组仓位 1, 仓位 0 保持空
        assert!(!ctx.mounted[0].is_mounted());
        assert_eq!(ctx.items[1].amount_remaining, dec!(0));
    }
}
