// ==========================================
// 整车托盘装载规划系统 - 包裹/箱装规则
// ==========================================
// 依据: Loading_Engine_Specs_v1.0.md - 4.3 PackageRule / BoxTemplateRule
// ==========================================
// 职责: 电商包裹与箱装模板 SKU 按整箱批量落位
// 排序: 已有同类托盘的仓位优先, 其次按占用度降序
// ==========================================

use crate::domain::types::ContainerKind;
use crate::engine::context::{Context, PlacementMeta};
use crate::engine::error::EngineError;
use crate::engine::rule_chain::AllocationRule;
use rust_decimal::Decimal;
use tracing::debug;

/// 按整箱批量放置指定类型的待装条目
///
/// 共用核心: PackageRule 与 BoxTemplateRule 只差容器类型
fn place_boxed(ctx: &mut Context, kind: ContainerKind, rule: &str) {
    let item_indices = ctx.pending_items_where(|p| p.kind == kind);

    for item_idx in item_indices {
        let (batch, package_tag) = match ctx.product_of_item(item_idx) {
            Some(product) => {
                let batch = product
                    .units_per_box
                    .filter(|b| *b > Decimal::ZERO)
                    .unwrap_or(Decimal::ONE);
                (batch, format!("BOX-{}", product.code))
            }
            None => continue,
        };

        loop {
            if ctx.items[item_idx].amount_remaining < batch {
                break;
            }

            // 候选仓位: 已有同类托盘优先, 其次占用度降序
            let mut candidates: Vec<usize> = ctx
                .spaces
                .iter()
                .enumerate()
                .filter(|(_, s)| !s.blocked)
                .map(|(idx, _)| idx)
                .collect();
            candidates.sort_by_key(|&idx| {
                let has_kind = ctx.mounted[idx].has_container_kind(kind);
                let occupation = ctx.mounted[idx].occupation();
                (std::cmp::Reverse(has_kind), std::cmp::Reverse(occupation))
            });

            let placed = candidates.iter().any(|&space_idx| {
                ctx.add_product(
                    space_idx,
                    item_idx,
                    batch,
                    PlacementMeta {
                        package: Some(package_tag.clone()),
                        ..PlacementMeta::default()
                    },
                )
            });

            if !placed {
                debug!(
                    rule,
                    item = %ctx.items[item_idx].code,
                    %batch,
                    "整箱批量无处可放, 留作残余"
                );
                break;
            }
        }
    }
}

fn has_pending_of_kind(ctx: &Context, kind: ContainerKind) -> bool {
    !ctx.pending_items_where(|p| p.kind == kind).is_empty()
        && ctx.spaces.iter().any(|s| !s.blocked)
}

// ==========================================
// PackageRule - 电商包裹规则
// ==========================================
pub struct PackageRule;

impl AllocationRule for PackageRule {
    fn name(&self) -> &'static str {
        "PackageRule"
    }

    fn should_execute(&self, ctx: &Context) -> bool {
        has_pending_of_kind(ctx, ContainerKind::Package)
    }

    fn execute(&self, ctx: &mut Context) -> Result<(), EngineError> {
        place_boxed(ctx, ContainerKind::Package, self.name());
        Ok(())
    }
}

// ==========================================
// BoxTemplateRule - 箱装模板规则
// ==========================================
pub struct BoxTemplateRule;

impl AllocationRule for BoxTemplateRule {
    fn name(&self) -> &'static str {
        "BoxTemplateRule"
    }

    fn should_execute(&self, ctx: &Context) -> bool {
        has_pending_of_kind(ctx, ContainerKind::BoxTemplate)
    }

    fn execute(&self, ctx: &mut Context) -> Result<(), EngineError> {
        place_boxed(ctx, ContainerKind::BoxTemplate, self.name());
        Ok(())
    }
}
