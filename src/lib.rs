// ==========================================
// 整车托盘装载规划系统 - 核心库
// ==========================================
// 依据: Loading_Engine_Specs_v1.0.md - 系统总览
// 系统定位: 托盘分配引擎 (决策核心, 无 I/O)
// 技术栈: Rust + rust_decimal 定点运算
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 引擎层 - 分配规则
pub mod engine;

// 配置层 - 运行参数
pub mod config;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{ContainerKind, Side, SpaceSize};

// 领域实体
pub use domain::{
    Container, Factor, Item, MountedProduct, MountedSpace, PackingGroup, PalletSetting, Product,
    ProductCatalog, Space,
};

// 引擎
pub use engine::{
    AllocationRule, Context, EngineError, FactorConverter, OccupationRequest, RuleChain,
    SubsequenceGenerator,
};

// 外部接口
pub use engine::ports::{CatalogLoader, OrderLoader, PlanSummary, ResultMapper};

// 配置
pub use config::{setting_keys, SettingValue, Settings};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "整车托盘装载规划系统";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
