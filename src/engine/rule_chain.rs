// ==========================================
// 整车托盘装载规划系统 - 规则链编排器
// ==========================================
// 依据: Loading_Engine_Specs_v1.0.md - 4.5 RuleChain / Context
// 用途: 按固定顺序驱动分配规则
// ==========================================
// 红线: should_execute 幂等且不得变更上下文;
//       跳过是正常负路径, 记入执行日志后继续
// ==========================================

use crate::engine::context::Context;
use crate::engine::error::EngineError;
use crate::engine::rules::{
    BoxTemplateRule, ChoppPalletizationRule, LayerRule, LoadBalancerRule, NonLayerOnLayerPalletRule,
    NonPalletizedProductsRule, PackageRule, PalletGroupSubGroupRule, RemountRule,
    RemountSplittedRebuildPalletRule, ReturnableAndDisposableSplitRule, SideBalanceRule,
    SnapshotRule,
};
use tracing::{debug, info};

// ==========================================
// Trait: AllocationRule
// ==========================================
// 每条策略一个规则对象, 读写共享上下文
pub trait AllocationRule {
    /// 规则名 (执行日志与诊断日志共用)
    fn name(&self) -> &'static str;

    /// 前置条件检查
    ///
    /// 必须廉价、幂等、无副作用; 返回 false 表示无事可做
    fn should_execute(&self, ctx: &Context) -> bool;

    /// 执行规则
    ///
    /// 放置被拒由规则自行换下一个候选;
    /// 逃逸出来的错误交由外层驱动决定中止或降级
    fn execute(&self, ctx: &mut Context) -> Result<(), EngineError>;
}

// ==========================================
// RuleChain - 规则链
// ==========================================
pub struct RuleChain {
    rules: Vec<Box<dyn AllocationRule>>,
}

impl RuleChain {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// 生产规则顺序
    ///
    /// 快照 → 生啤 → 包裹 → 箱装 → 层板 → 主分配 →
    /// 层板混装清理 → 拆分 → 返装消除 → 返装重建 →
    /// 散装兜底 → 配重 (侧别规则或负载均衡, 按参数二选一)
    pub fn default_chain() -> Self {
        let mut chain = Self::new();
        chain.push(Box::new(SnapshotRule));
        chain.push(Box::new(ChoppPalletizationRule));
        chain.push(Box::new(PackageRule));
        chain.push(Box::new(BoxTemplateRule));
        chain.push(Box::new(LayerRule));
        chain.push(Box::new(PalletGroupSubGroupRule));
        chain.push(Box::new(NonLayerOnLayerPalletRule));
        chain.push(Box::new(ReturnableAndDisposableSplitRule));
        chain.push(Box::new(RemountRule));
        chain.push(Box::new(RemountSplittedRebuildPalletRule));
        chain.push(Box::new(NonPalletizedProductsRule));
        chain.push(Box::new(SideBalanceRule));
        chain.push(Box::new(LoadBalancerRule));
        chain
    }

    /// 追加规则
    pub fn push(&mut self, rule: Box<dyn AllocationRule>) {
        self.rules.push(rule);
    }

    /// 规则数
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// 顺序执行全部规则
    ///
    /// 单线程同步执行; 规则间的静止状态满足容量不变量
    pub fn run(&self, ctx: &mut Context) -> Result<(), EngineError> {
        // 准入检查: 布局与目录不完整属于致命错误, 规则无从恢复
        if ctx.spaces.is_empty() {
            return Err(EngineError::EmptyLayout);
        }
        if let Some(item) = ctx.items.iter().find(|i| ctx.catalog.get(&i.code).is_none()) {
            return Err(EngineError::UnknownProduct(item.code.clone()));
        }

        info!(plan_id = %ctx.plan_id, rules = self.rules.len(), "开始执行规则链");

        for rule in &self.rules {
            if !rule.should_execute(ctx) {
                debug!(rule = rule.name(), "前置条件不满足, 跳过");
                ctx.log_entry(rule.name(), "前置条件不满足, 跳过");
                continue;
            }

            info!(rule = rule.name(), "执行规则");
            ctx.log_entry(rule.name(), "开始执行");
            rule.execute(ctx)?;

            debug_assert!(
                ctx.capacity_invariant_holds(),
                "规则 {} 执行后违反容量不变量",
                rule.name()
            );
        }

        info!(
            plan_id = %ctx.plan_id,
            non_palletized = ctx.non_palletized_count(),
            remounts = ctx.remount_total(),
            driver_pct = %ctx.driver_percentage(),
            "规则链执行完成"
        );
        Ok(())
    }
}

impl Default for RuleChain {
    fn default() -> Self {
        Self::default_chain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::domain::item::Item;
    use crate::domain::product::ProductCatalog;
    use crate::domain::space::Space;
    use crate::domain::types::{Side, SpaceSize};
    use rust_decimal_macros::dec;
    use std::cell::Cell;

    struct CountingRule {
        executed: Cell<usize>,
        precondition: bool,
    }

    impl AllocationRule for CountingRule {
        fn name(&self) -> &'static str {
            "CountingRule"
        }

        fn should_execute(&self, _ctx: &Context) -> bool {
            self.precondition
        }

        fn execute(&self, _ctx: &mut Context) -> Result<(), EngineError> {
            self.executed.set(self.executed.get() + 1);
            Ok(())
        }
    }

    fn bare_context() -> Context {
        Context::new(
            vec![Space::new(1, SpaceSize::S42, 1, Side::Driver)],
            Vec::new(),
            ProductCatalog::new().into_shared(),
            Settings::new(),
        )
    }

    #[test]
    fn test_skip_is_logged_not_fatal() {
        let mut chain = RuleChain::new();
        chain.push(Box::new(CountingRule {
            executed: Cell::new(0),
            precondition: false,
        }));
        let mut ctx = bare_context();
        chain.run(&mut ctx).unwrap();
        assert!(ctx
            .log
            .iter()
            .any(|e| e.rule == "CountingRule" && e.message.contains("跳过")));
    }

    #[test]
    fn test_default_chain_order() {
        let chain = RuleChain::default_chain();
        assert_eq!(chain.len(), 13);
    }

    #[test]
    fn test_run_fails_on_empty_layout() {
        let mut ctx = Context::new(
            Vec::new(),
            Vec::new(),
            ProductCatalog::new().into_shared(),
            Settings::new(),
        );
        let result = RuleChain::new().run(&mut ctx);
        assert!(matches!(result, Err(EngineError::EmptyLayout)));
    }

    #[test]
    fn test_run_fails_on_unknown_product() {
        let mut ctx = Context::new(
            vec![Space::new(1, SpaceSize::S42, 1, Side::Driver)],
            vec![Item::new("GHOST", dec!(10), 0)],
            ProductCatalog::new().into_shared(),
            Settings::new(),
        );
        let err = RuleChain::new().run(&mut ctx).unwrap_err();
        assert!(matches!(err, EngineError::UnknownProduct(code) if code == "GHOST"));
    }
}
