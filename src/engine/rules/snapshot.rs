// ==========================================
// 整车托盘装载规划系统 - 快照规则
// ==========================================
// 依据: Loading_Engine_Specs_v1.0.md - 4.3 SnapshotRule
// 职责: 规则链首位建立初始状态快照, 供回退对照
// 红线: 已有快照时不再重建
// ==========================================

use crate::engine::context::Context;
use crate::engine::error::EngineError;
use crate::engine::rule_chain::AllocationRule;

pub struct SnapshotRule;

impl AllocationRule for SnapshotRule {
    fn name(&self) -> &'static str {
        "SnapshotRule"
    }

    fn should_execute(&self, ctx: &Context) -> bool {
        ctx.snapshot.is_none() && !ctx.items.is_empty()
    }

    fn execute(&self, ctx: &mut Context) -> Result<(), EngineError> {
        ctx.take_snapshot();
        Ok(())
    }
}
