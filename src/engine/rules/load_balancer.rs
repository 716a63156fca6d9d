// ==========================================
// 整车托盘装载规划系统 - 负载均衡规则
// ==========================================
// 依据: Loading_Engine_Specs_v1.0.md - 4.4 LoadBalancerRule
// ==========================================
// 职责: 侧别配重停用时的替代配平
// 算法: 带重试上限的互换循环, 只换相邻两个编号以内的对子;
//       重头/轻头两个次序各试一遍, 取更接近 50 的方案
// 红线: 不比初始状态更好就不动
// ==========================================

use crate::domain::types::Side;
use crate::engine::context::Context;
use crate::engine::error::EngineError;
use crate::engine::rule_chain::AllocationRule;
use rust_decimal::Decimal;
use tracing::debug;

/// 互换对子允许的仓位编号跨度
const MAX_NUMBER_DISTANCE: u32 = 2;

// ==========================================
// LoadBalancerRule - 负载均衡规则
// ==========================================
pub struct LoadBalancerRule;

impl LoadBalancerRule {
    fn deviation(ctx: &Context) -> Decimal {
        (ctx.driver_percentage() - Decimal::from(50)).abs()
    }

    /// 交换后的偏差预估 (不变更)
    fn deviation_after_switch(ctx: &Context, a_idx: usize, b_idx: usize) -> Decimal {
        let w_a = ctx.mounted[a_idx].weight();
        let w_b = ctx.mounted[b_idx].weight();
        let mut driver = ctx.side_weight(Side::Driver);
        let total = driver + ctx.side_weight(Side::Helper);
        if total.is_zero() {
            return Decimal::ZERO;
        }
        match (ctx.spaces[a_idx].side, ctx.spaces[b_idx].side) {
            (Side::Driver, Side::Helper) => driver = driver - w_a + w_b,
            (Side::Helper, Side::Driver) => driver = driver + w_a - w_b,
            _ => {}
        }
        (driver * Decimal::from(100) / total - Decimal::from(50)).abs()
    }

    /// 一轮带重试上限的配平
    ///
    /// heavy_first 控制重侧候选的访问次序 (重头/轻头)
    fn balance_pass(ctx: &mut Context, heavy_first: bool) {
        let tolerance = ctx.settings.load_balancer_tolerance_percentage();
        let max_retries = ctx.settings.load_balancer_max_retries();

        for _ in 0..max_retries {
            let deviation = Self::deviation(ctx);
            if deviation <= tolerance {
                break;
            }
            let heavy_side = if ctx.side_weight(Side::Driver) >= ctx.side_weight(Side::Helper) {
                Side::Driver
            } else {
                Side::Helper
            };

            let mut heavy: Vec<usize> = ctx
                .mounted_space_indices()
                .into_iter()
                .filter(|&idx| ctx.spaces[idx].side == heavy_side && !ctx.spaces[idx].blocked)
                .collect();
            heavy.sort_by_key(|&idx| ctx.mounted[idx].weight());
            if heavy_first {
                heavy.reverse();
            }

            let mut swapped = false;
            'outer: for &a_idx in &heavy {
                let a_number = ctx.spaces[a_idx].number;
                let mut partners: Vec<usize> = (0..ctx.spaces.len())
                    .filter(|&idx| {
                        ctx.spaces[idx].side == heavy_side.opposite()
                            && !ctx.spaces[idx].blocked
                            && ctx.spaces[idx].number.abs_diff(a_number) <= MAX_NUMBER_DISTANCE
                    })
                    .collect();
                partners.sort_by_key(|&idx| ctx.mounted[idx].weight());

                for &b_idx in &partners {
                    if Self::deviation_after_switch(ctx, a_idx, b_idx) >= deviation {
                        continue;
                    }
                    if ctx.switch_spaces(a_idx, b_idx) {
                        swapped = true;
                        break 'outer;
                    }
                }
            }
            if !swapped {
                break;
            }
        }
    }
}

impl AllocationRule for LoadBalancerRule {
    fn name(&self) -> &'static str {
        "LoadBalancerRule"
    }

    fn should_execute(&self, ctx: &Context) -> bool {
        !ctx.settings.side_balance_enabled()
            && ctx.mounted_space_indices().len()
                > ctx.settings.load_balancer_minimum_mounted_spaces()
            && ctx.side_weight(Side::Driver) + ctx.side_weight(Side::Helper) > Decimal::ZERO
    }

    fn execute(&self, ctx: &mut Context) -> Result<(), EngineError> {
        let start = Self::deviation(ctx);

        let mut heavy_trial = ctx.fork();
        Self::balance_pass(&mut heavy_trial, true);
        let mut light_trial = ctx.fork();
        Self::balance_pass(&mut light_trial, false);

        let heavy_dev = Self::deviation(&heavy_trial);
        let light_dev = Self::deviation(&light_trial);
        let (best, best_dev) = if heavy_dev <= light_dev {
            (heavy_trial, heavy_dev)
        } else {
            (light_trial, light_dev)
        };

        if best_dev < start {
            debug!(%start, %best_dev, "负载均衡试算改善, 并回");
            ctx.adopt(best);
        }
        Ok(())
    }
}
