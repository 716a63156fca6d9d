// ==========================================
// 整车托盘装载规划系统 - 配置层
// ==========================================
// 依据: Loading_Engine_Specs_v1.0.md - 6. 外部接口 / Settings
// ==========================================
// 职责: 运行参数管理, 引擎不直接读取文件
// ==========================================

pub mod settings;

// 重导出核心配置类型
pub use settings::{setting_keys, SettingValue, Settings};
