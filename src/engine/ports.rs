// ==========================================
// 整车托盘装载规划系统 - 引擎层外部接口
// ==========================================
// 依据: Loading_Engine_Specs_v1.0.md - 6. 外部接口
// 职责: 定义装载器/目录/结果映射 trait, 实现依赖倒置
// 说明: Engine 层定义 trait, 外层 (CSV/Excel/JSON) 实现适配器
// ==========================================
// 红线: 引擎不持有文件格式、网络协议或 CLI 表面
// ==========================================

use crate::config::Settings;
use crate::domain::item::Item;
use crate::domain::product::ProductCatalog;
use crate::domain::space::Space;
use crate::domain::types::Side;
use crate::engine::context::Context;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ==========================================
// 装载器 Trait
// ==========================================

/// 订单装载器
///
/// 外层实现: 读入仓配订单, 产出初始待装条目与车辆布局
pub trait OrderLoader {
    /// 装载一次请求的初始输入
    fn load(&self) -> anyhow::Result<(Vec<Item>, Vec<Space>, Settings)>;
}

/// 产品目录装载器
///
/// 每进程注入一次; 延迟初始化由适配器自己负责,
/// 规则运行前目录必须已补全 (分组/托盘参数/系数表/毛重)
pub trait CatalogLoader {
    fn load_catalog(&self) -> anyhow::Result<ProductCatalog>;
}

// ==========================================
// 结果映射 Trait
// ==========================================

/// 结果映射器
///
/// 读取最终上下文 (已装载仓位 + 残余条目), 产出调用方模式
pub trait ResultMapper {
    type Output;

    fn map(&self, ctx: &Context) -> anyhow::Result<Self::Output>;
}

// ==========================================
// PlanSummary - 参考映射结果
// ==========================================
// 测试与示例用的最小输出模式

/// 单仓位装载摘要
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpaceSummary {
    pub space_number: u32,
    pub side: Side,
    pub size: String,
    pub occupation: Decimal,
    pub weight: Decimal,
    pub pallets: usize,
    pub products: Vec<(String, Decimal)>, // (产品代码, 数量)
}

/// 残余条目 (未上托)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResidualItem {
    pub code: String,
    pub amount_remaining: Decimal,
}

/// 装载方案摘要
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanSummary {
    pub plan_id: String,
    pub spaces: Vec<SpaceSummary>,
    pub non_palletized: Vec<ResidualItem>,
    pub driver_weight: Decimal,
    pub helper_weight: Decimal,
    pub driver_percentage: Decimal,
}

/// 参考映射器: 把最终上下文读成 PlanSummary
#[derive(Debug, Clone, Default)]
pub struct PlanSummaryMapper;

impl ResultMapper for PlanSummaryMapper {
    type Output = PlanSummary;

    fn map(&self, ctx: &Context) -> anyhow::Result<PlanSummary> {
        let mut spaces = Vec::new();
        for idx in ctx.mounted_space_indices() {
            let space = &ctx.spaces[idx];
            let mounted = &ctx.mounted[idx];
            let mut products: Vec<(String, Decimal)> = Vec::new();
            for container in &mounted.containers {
                for product in &container.products {
                    match products.iter_mut().find(|(code, _)| code == &product.product_code) {
                        Some((_, amount)) => *amount += product.amount,
                        None => products.push((product.product_code.clone(), product.amount)),
                    }
                }
            }
            spaces.push(SpaceSummary {
                space_number: space.number,
                side: space.side,
                size: space.size.to_string(),
                occupation: mounted.occupation(),
                weight: mounted.weight(),
                pallets: mounted.containers.len(),
                products,
            });
        }

        let non_palletized = ctx
            .items
            .iter()
            .filter(|i| i.is_pending())
            .map(|i| ResidualItem {
                code: i.code.clone(),
                amount_remaining: i.amount_remaining,
            })
            .collect();

        Ok(PlanSummary {
            plan_id: ctx.plan_id.to_string(),
            spaces,
            non_palletized,
            driver_weight: ctx.side_weight(Side::Driver),
            helper_weight: ctx.side_weight(Side::Helper),
            driver_percentage: ctx.driver_percentage(),
        })
    }
}
