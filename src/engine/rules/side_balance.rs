// ==========================================
// 整车托盘装载规划系统 - 侧别配重规则
// ==========================================
// 依据: Loading_Engine_Specs_v1.0.md - 4.4 SideBalanceRule
// ==========================================
// 职责: 驾驶侧/副驾侧重量配平
// 算法: 多数侧重仓位与少数侧仓位互换, 偏差收窄才落锤;
//       直换被拒按"迁空-链换-同尺寸"梯次回退;
//       末段按仓位编号成对强制校正
// 红线: 收尾后驾驶侧总重不得低于副驾侧
// ==========================================

use crate::domain::types::Side;
use crate::engine::context::Context;
use crate::engine::error::EngineError;
use crate::engine::rule_chain::AllocationRule;
use rust_decimal::Decimal;
use tracing::debug;

// ==========================================
// SideBalanceRule - 侧别配重规则
// ==========================================
pub struct SideBalanceRule;

impl SideBalanceRule {
    /// 当前驾驶侧占比对 50 的偏差
    fn deviation(ctx: &Context) -> Decimal {
        (ctx.driver_percentage() - Decimal::from(50)).abs()
    }

    /// 交换后的驾驶侧占比偏差 (解析预估, 不变更)
    fn deviation_after_switch(ctx: &Context, a_idx: usize, b_idx: usize) -> Decimal {
        let w_a = ctx.mounted[a_idx].weight();
        let w_b = ctx.mounted[b_idx].weight();
        let mut driver = ctx.side_weight(Side::Driver);
        let total = driver + ctx.side_weight(Side::Helper);
        if total.is_zero() {
            return Decimal::ZERO;
        }
        // 重量随托盘过侧; 同侧交换不改变占比
        match (ctx.spaces[a_idx].side, ctx.spaces[b_idx].side) {
            (Side::Driver, Side::Helper) => driver = driver - w_a + w_b,
            (Side::Helper, Side::Driver) => driver = driver + w_a - w_b,
            _ => {}
        }
        (driver * Decimal::from(100) / total - Decimal::from(50)).abs()
    }

    /// 多数侧 (总重较大的一侧)
    fn majority_side(ctx: &Context) -> Side {
        if ctx.side_weight(Side::Driver) >= ctx.side_weight(Side::Helper) {
            Side::Driver
        } else {
            Side::Helper
        }
    }

    /// 指定侧的可换仓位: 未封锁未配重, 含空仓位
    fn swap_candidates(ctx: &Context, side: Side) -> Vec<usize> {
        (0..ctx.spaces.len())
            .filter(|&idx| {
                ctx.spaces[idx].side == side
                    && !ctx.spaces[idx].blocked
                    && !ctx.spaces[idx].balanced
            })
            .collect()
    }

    /// 互换落锤, 直换被拒时按梯次回退
    ///
    /// 回退一: 目标占用托盘先迁往少数侧空仓位, 腾出后再承接重托;
    /// 回退二: 目标与少数侧第三仓位链式互换, 重托落到腾出的兼容仓位;
    /// 回退三: 少数侧任一未封锁同尺寸仓位直换.
    /// 回退一/二在派生副本上试算, 偏差实际收窄才并回
    fn switch_with_fallbacks(ctx: &mut Context, a_idx: usize, b_idx: usize) -> Option<usize> {
        if ctx.switch_spaces(a_idx, b_idx) {
            return Some(b_idx);
        }
        let current = Self::deviation(ctx);
        let minority = ctx.spaces[b_idx].side;

        if ctx.mounted[b_idx].is_mounted() {
            // 回退一: 迁空
            let empties: Vec<usize> = Self::swap_candidates(ctx, minority)
                .into_iter()
                .filter(|&idx| idx != b_idx && !ctx.mounted[idx].is_mounted())
                .collect();
            for &e_idx in &empties {
                let mut trial = ctx.fork();
                if trial.switch_spaces(b_idx, e_idx)
                    && trial.switch_spaces(a_idx, b_idx)
                    && Self::deviation(&trial) < current
                {
                    ctx.adopt(trial);
                    return Some(b_idx);
                }
            }

            // 回退二: 链式换, 重托落点分别尝试目标仓位与第三仓位
            let thirds: Vec<usize> = Self::swap_candidates(ctx, minority)
                .into_iter()
                .filter(|&idx| idx != b_idx && ctx.mounted[idx].is_mounted())
                .collect();
            for &c_idx in &thirds {
                let mut trial = ctx.fork();
                if trial.switch_spaces(b_idx, c_idx)
                    && trial.switch_spaces(a_idx, b_idx)
                    && Self::deviation(&trial) < current
                {
                    ctx.adopt(trial);
                    return Some(b_idx);
                }
                let mut trial = ctx.fork();
                if trial.switch_spaces(b_idx, c_idx)
                    && trial.switch_spaces(a_idx, c_idx)
                    && Self::deviation(&trial) < current
                {
                    ctx.adopt(trial);
                    return Some(c_idx);
                }
            }
        }

        // 回退三: 同尺寸直换 (已配重仓位也可承接)
        let size = ctx.spaces[a_idx].size;
        for d_idx in 0..ctx.spaces.len() {
            if d_idx == b_idx
                || ctx.spaces[d_idx].side != minority
                || ctx.spaces[d_idx].size != size
                || ctx.spaces[d_idx].blocked
            {
                continue;
            }
            if Self::deviation_after_switch(ctx, a_idx, d_idx) >= current {
                continue;
            }
            if ctx.switch_spaces(a_idx, d_idx) {
                return Some(d_idx);
            }
        }
        None
    }

    /// 主配平循环: 多数侧重仓位找少数侧对象互换
    fn balance_pass(ctx: &mut Context) {
        loop {
            let majority = Self::majority_side(ctx);
            let current = Self::deviation(ctx);

            let mut heavy: Vec<usize> = Self::swap_candidates(ctx, majority)
                .into_iter()
                .filter(|&idx| ctx.mounted[idx].is_mounted())
                .collect();
            heavy.sort_by_key(|&idx| std::cmp::Reverse(ctx.mounted[idx].weight()));

            let mut progressed = false;
            'outer: for &a_idx in &heavy {
                // 少数侧候选轻者优先, 空仓位排在最前
                let mut light = Self::swap_candidates(ctx, majority.opposite());
                light.sort_by_key(|&idx| ctx.mounted[idx].weight());

                for &b_idx in &light {
                    if Self::deviation_after_switch(ctx, a_idx, b_idx) >= current {
                        continue;
                    }
                    if let Some(swapped_idx) = Self::switch_with_fallbacks(ctx, a_idx, b_idx) {
                        ctx.spaces[a_idx].balanced = true;
                        ctx.spaces[swapped_idx].balanced = true;
                        debug!(
                            from = ctx.spaces[a_idx].number,
                            to = ctx.spaces[swapped_idx].number,
                            deviation = %Self::deviation(ctx),
                            "侧别配重互换"
                        );
                        progressed = true;
                        break 'outer;
                    }
                }
            }
            if !progressed {
                break;
            }
        }
    }

    /// 末段强制校正: 驾驶侧总重偏轻时, 按同编号成对仓位逐对过侧
    ///
    /// 副驾侧成员更重的对子做互换, 驾驶侧总重不再偏轻即停;
    /// 保证收尾后驾驶侧总重 >= 副驾侧
    fn forced_pair_pass(ctx: &mut Context) {
        let numbers: Vec<u32> = {
            let mut ns: Vec<u32> = ctx.spaces.iter().map(|s| s.number).collect();
            ns.sort_unstable();
            ns.dedup();
            ns
        };
        for number in numbers {
            if ctx.side_weight(Side::Driver) >= ctx.side_weight(Side::Helper) {
                break;
            }
            let driver_idx = ctx
                .spaces
                .iter()
                .position(|s| s.number == number && s.side == Side::Driver && !s.blocked);
            let helper_idx = ctx
                .spaces
                .iter()
                .position(|s| s.number == number && s.side == Side::Helper && !s.blocked);
            if let (Some(d_idx), Some(h_idx)) = (driver_idx, helper_idx) {
                if ctx.mounted[h_idx].weight() > ctx.mounted[d_idx].weight() {
                    if ctx.switch_spaces(d_idx, h_idx) {
                        debug!(number, "成对强制校正, 重托过驾驶侧");
                    }
                }
            }
        }
    }
}

impl AllocationRule for SideBalanceRule {
    fn name(&self) -> &'static str {
        "SideBalanceRule"
    }

    fn should_execute(&self, ctx: &Context) -> bool {
        ctx.settings.side_balance_enabled()
            && ctx.mounted_space_indices().len() >= 2
            && ctx.side_weight(Side::Driver) + ctx.side_weight(Side::Helper) > Decimal::ZERO
    }

    fn execute(&self, ctx: &mut Context) -> Result<(), EngineError> {
        Self::balance_pass(ctx);
        Self::forced_pair_pass(ctx);
        Ok(())
    }
}
