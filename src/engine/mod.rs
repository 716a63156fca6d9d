// ==========================================
// 整车托盘装载规划系统 - 引擎层
// ==========================================
// 依据: Loading_Engine_Specs_v1.0.md - 4. 组件设计
// ==========================================
// 职责: 实现分配规则与占用算术, 不做 I/O
// 红线: 所有跳过与拒绝必须可解释 (执行日志)
// ==========================================

pub mod context;
pub mod error;
pub mod factor_converter;
pub mod ports;
pub mod rule_chain;
pub mod rules;
pub mod subsequence;

// 重导出核心引擎类型
pub use context::{Context, ContextMetrics, ExecutionLogEntry, PlacementMeta};
pub use error::EngineError;
pub use factor_converter::{FactorConverter, OccupationRequest, ADDITIONAL_OCCUPATION_PER_BALLAST};
pub use ports::{CatalogLoader, OrderLoader, PlanSummary, PlanSummaryMapper, ResultMapper};
pub use rule_chain::{AllocationRule, RuleChain};
pub use subsequence::{SubsequenceGenerator, DEFAULT_SUBSEQUENCE_LIMIT};
