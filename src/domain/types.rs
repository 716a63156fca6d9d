// ==========================================
// 整车托盘装载规划系统 - 领域类型定义
// ==========================================
// 依据: Loading_Engine_Specs_v1.0.md - 2. 数据模型
// 红线: 仓位尺寸为枚举集合, 不是任意数值
// ==========================================

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 仓位尺寸 (Space Size)
// ==========================================
// 车辆仓位的容量档位, 单位为占用度 (无量纲)
// 顺序: S14 < S21 < S28 < S35 < S42
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SpaceSize {
    S14,
    S21,
    S28,
    S35,
    S42,
}

impl SpaceSize {
    /// 档位的容量值 (占用度)
    pub fn capacity(&self) -> Decimal {
        match self {
            SpaceSize::S14 => Decimal::from(14),
            SpaceSize::S21 => Decimal::from(21),
            SpaceSize::S28 => Decimal::from(28),
            SpaceSize::S35 => Decimal::from(35),
            SpaceSize::S42 => Decimal::from(42),
        }
    }

    /// 从容量值解析档位
    pub fn from_capacity(value: u32) -> Option<Self> {
        match value {
            14 => Some(SpaceSize::S14),
            21 => Some(SpaceSize::S21),
            28 => Some(SpaceSize::S28),
            35 => Some(SpaceSize::S35),
            42 => Some(SpaceSize::S42),
            _ => None,
        }
    }

    /// 全部档位, 从大到小
    ///
    /// 层板规则与主分配规则都按此顺序扫描仓位
    pub fn descending() -> [SpaceSize; 5] {
        [
            SpaceSize::S42,
            SpaceSize::S35,
            SpaceSize::S28,
            SpaceSize::S21,
            SpaceSize::S14,
        ]
    }

    /// 下一个更小的档位
    pub fn next_smaller(&self) -> Option<SpaceSize> {
        match self {
            SpaceSize::S42 => Some(SpaceSize::S35),
            SpaceSize::S35 => Some(SpaceSize::S28),
            SpaceSize::S28 => Some(SpaceSize::S21),
            SpaceSize::S21 => Some(SpaceSize::S14),
            SpaceSize::S14 => None,
        }
    }
}

impl fmt::Display for SpaceSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpaceSize::S14 => write!(f, "14"),
            SpaceSize::S21 => write!(f, "21"),
            SpaceSize::S28 => write!(f, "28"),
            SpaceSize::S35 => write!(f, "35"),
            SpaceSize::S42 => write!(f, "42"),
        }
    }
}

// ==========================================
// 车辆侧别 (Side)
// ==========================================
// 红线: 配重后驾驶侧重量 >= 副手侧重量
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    Driver, // 驾驶侧
    Helper, // 副手侧
}

impl Side {
    /// 对侧
    pub fn opposite(&self) -> Side {
        match self {
            Side::Driver => Side::Helper,
            Side::Helper => Side::Driver,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Driver => write!(f, "DRIVER"),
            Side::Helper => write!(f, "HELPER"),
        }
    }
}

// ==========================================
// 容器类型 (Container Kind)
// ==========================================
// 产品基础类型, 同时决定托盘(容器)的类型归属
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContainerKind {
    Disposable,    // 一次性包装
    Returnable,    // 可回收包装
    Chopp,         // 桶装生啤
    IsotonicWater, // 等渗水
    Package,       // 电商包裹
    BoxTemplate,   // 箱装模板
}

impl ContainerKind {
    /// 是否属于可回收类
    pub fn is_returnable(&self) -> bool {
        matches!(self, ContainerKind::Returnable)
    }

    /// 是否与可回收类混装构成"返装托盘"
    ///
    /// 可回收 + (一次性/等渗水/生啤) 的混装托盘是后续规则的消除目标
    pub fn conflicts_with_returnable(&self) -> bool {
        matches!(
            self,
            ContainerKind::Disposable | ContainerKind::IsotonicWater | ContainerKind::Chopp
        )
    }
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerKind::Disposable => write!(f, "DISPOSABLE"),
            ContainerKind::Returnable => write!(f, "RETURNABLE"),
            ContainerKind::Chopp => write!(f, "CHOPP"),
            ContainerKind::IsotonicWater => write!(f, "ISOTONIC_WATER"),
            ContainerKind::Package => write!(f, "PACKAGE"),
            ContainerKind::BoxTemplate => write!(f, "BOX_TEMPLATE"),
        }
    }
}
