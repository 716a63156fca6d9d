// ==========================================
// 整车托盘装载规划系统 - 运行参数
// ==========================================
// 依据: Loading_Engine_Specs_v1.0.md - 6. 外部接口 / Settings
// ==========================================
// 职责: 命名参数的加载、查询、默认值管理
// 存储: 内存 key-value (由外部装载器一次性注入)
// ==========================================

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ==========================================
// 参数键全集
// ==========================================
pub mod setting_keys {
    /// 主分配规则的最小占用率 (%)
    pub const MINIMUM_OCCUPATION_PERCENTAGE: &str = "MinimumOccupationPercentage";
    /// 占用计算是否计入顶层
    pub const INCLUDE_TOP_OF_PALLET: &str = "IncludeTopOfPallet";
    /// 是否启用侧别配重规则
    pub const SIDE_BALANCE_RULE: &str = "SideBalanceRule";
    /// 生啤托盘是否专用
    pub const KEG_EXCLUSIVE_PALLET: &str = "KegExclusivePallet";
    /// 负载均衡规则的最小已装载仓位数
    pub const LOAD_BALANCER_MINIMUM_MOUNTED_SPACES: &str = "LoadBalancerMinimumMountedSpaces";
    /// 负载均衡允许的偏差带宽 (%)
    pub const LOAD_BALANCER_TOLERANCE_PERCENTAGE: &str = "LoadBalancerTolerancePercentage";
    /// 负载均衡重试上限
    pub const LOAD_BALANCER_MAX_RETRIES: &str = "LoadBalancerMaxRetries";
    /// 子序列枚举上限 (尾组合展开次数)
    pub const SUBSEQUENCE_LIMIT: &str = "SubsequenceLimit";
}

// ==========================================
// SettingValue - 参数值
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Int(i64),
    Number(Decimal),
    Text(String),
}

impl SettingValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SettingValue::Bool(v) => Some(*v),
            SettingValue::Text(s) => match s.to_lowercase().as_str() {
                "true" | "1" | "yes" => Some(true),
                "false" | "0" | "no" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            SettingValue::Int(v) => Some(*v),
            SettingValue::Number(d) => (*d).try_into().ok(),
            SettingValue::Text(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            SettingValue::Number(d) => Some(*d),
            SettingValue::Int(v) => Some(Decimal::from(*v)),
            SettingValue::Text(s) => s.parse().ok(),
            _ => None,
        }
    }
}

// ==========================================
// Settings - 运行参数集
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    values: HashMap<String, SettingValue>,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从 JSON 字符串加载参数集
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let values: HashMap<String, SettingValue> = serde_json::from_str(json)?;
        Ok(Self { values })
    }

    /// 写入参数
    pub fn set(&mut self, key: &str, value: SettingValue) {
        self.values.insert(key.to_string(), value);
    }

    /// 读取原始参数值
    pub fn get(&self, key: &str) -> Option<&SettingValue> {
        self.values.get(key)
    }

    /// 读取布尔参数, 带默认值
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        self.values
            .get(key)
            .and_then(SettingValue::as_bool)
            .unwrap_or(default)
    }

    /// 读取整数参数, 带默认值
    pub fn get_int(&self, key: &str, default: i64) -> i64 {
        self.values
            .get(key)
            .and_then(SettingValue::as_int)
            .unwrap_or(default)
    }

    /// 读取定点数参数, 带默认值
    pub fn get_decimal(&self, key: &str, default: Decimal) -> Decimal {
        self.values
            .get(key)
            .and_then(SettingValue::as_decimal)
            .unwrap_or(default)
    }

    // ==========================================
    // 业务参数读取 (带系统默认值)
    // ==========================================

    /// 主分配规则的最小占用率 (%), 默认 70
    pub fn minimum_occupation_percentage(&self) -> Decimal {
        self.get_decimal(setting_keys::MINIMUM_OCCUPATION_PERCENTAGE, dec!(70))
    }

    /// 占用计算是否计入顶层, 默认 false
    pub fn include_top_of_pallet(&self) -> bool {
        self.get_bool(setting_keys::INCLUDE_TOP_OF_PALLET, false)
    }

    /// 是否启用侧别配重规则, 默认 true
    pub fn side_balance_enabled(&self) -> bool {
        self.get_bool(setting_keys::SIDE_BALANCE_RULE, true)
    }

    /// 生啤托盘是否专用, 默认 false
    pub fn keg_exclusive_pallet(&self) -> bool {
        self.get_bool(setting_keys::KEG_EXCLUSIVE_PALLET, false)
    }

    /// 负载均衡规则的最小已装载仓位数, 默认 6
    pub fn load_balancer_minimum_mounted_spaces(&self) -> usize {
        self.get_int(setting_keys::LOAD_BALANCER_MINIMUM_MOUNTED_SPACES, 6)
            .max(0) as usize
    }

    /// 负载均衡允许的偏差带宽 (%), 默认 5
    pub fn load_balancer_tolerance_percentage(&self) -> Decimal {
        self.get_decimal(setting_keys::LOAD_BALANCER_TOLERANCE_PERCENTAGE, dec!(5))
    }

    /// 负载均衡重试上限, 默认 20
    pub fn load_balancer_max_retries(&self) -> usize {
        self.get_int(setting_keys::LOAD_BALANCER_MAX_RETRIES, 20).max(0) as usize
    }

    /// 子序列枚举上限, 默认 30000
    pub fn subsequence_limit(&self) -> usize {
        self.get_int(setting_keys::SUBSEQUENCE_LIMIT, 30000).max(0) as usize
    }
}
