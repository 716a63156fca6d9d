// ==========================================
// 整车托盘装载规划系统 - 引擎层错误类型
// ==========================================
// 依据: Loading_Engine_Specs_v1.0.md - 7. 错误处理
// 工具: thiserror 派生宏
// ==========================================
// 红线: 放置被拒不是错误 (返回 false);
//       错误仅用于规则无法自行恢复的致命路径
// ==========================================

use thiserror::Error;

/// 引擎层错误类型
///
/// 规则链运行前的准入检查抛出; 规则内部一律走拒绝/跳过路径
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("产品目录缺失 SKU: {0}")]
    UnknownProduct(String),

    #[error("车辆布局为空, 无法分配")]
    EmptyLayout,
}
