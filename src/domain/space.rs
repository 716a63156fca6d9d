// ==========================================
// 整车托盘装载规划系统 - 仓位领域模型
// ==========================================
// 依据: Loading_Engine_Specs_v1.0.md - 2. 数据模型 / Space, MountedSpace
// 红线: 静止状态下占用度不得超过仓位容量
// ==========================================

use crate::domain::container::Container;
use crate::domain::types::{ContainerKind, Side, SpaceSize};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ==========================================
// Space - 仓位
// ==========================================
// 车辆布局中的一个舱格, 每次运行创建一次;
// balanced 为终态标志, 仅由配重规则置位, 置位后本轮不再复位
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Space {
    pub id: u32,          // 仓位ID
    pub size: SpaceSize,  // 容量档位
    pub number: u32,      // 仓位编号 (同编号跨侧成对)
    pub side: Side,       // 所在侧
    pub blocked: bool,    // 是否封锁 (不参与分配)
    pub balanced: bool,   // 是否已配重 (终态)
}

impl Space {
    pub fn new(id: u32, size: SpaceSize, number: u32, side: Side) -> Self {
        Self {
            id,
            size,
            number,
            side,
            blocked: false,
            balanced: false,
        }
    }

    /// 仓位容量 (占用度)
    pub fn capacity(&self) -> Decimal {
        self.size.capacity()
    }
}

// ==========================================
// Trait: SpaceConstraint
// ==========================================
// 用途: 规则侧的容量约束检查接口
pub trait SpaceConstraint {
    /// 检查是否可再放入指定占用度
    fn can_hold(&self, occupation: Decimal, capacity: Decimal) -> bool;

    /// 剩余容量
    fn remaining_capacity(&self, capacity: Decimal) -> Decimal;

    /// 占用率 (0-100)
    fn occupation_percentage(&self, capacity: Decimal) -> Decimal;
}

// ==========================================
// MountedSpace - 已装载仓位
// ==========================================
// "某仓位当前装着这些托盘"; 每个仓位整轮存在一个实例,
// 清空即"未装载", 不删除
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MountedSpace {
    pub space_id: u32,                // 所属仓位ID
    pub containers: Vec<Container>,   // 托盘 (独占所有权)
}

impl MountedSpace {
    pub fn new(space_id: u32) -> Self {
        Self {
            space_id,
            containers: Vec::new(),
        }
    }

    /// 是否已装载
    pub fn is_mounted(&self) -> bool {
        self.containers.iter().any(|c| !c.is_empty())
    }

    /// 仓位占用度
    ///
    /// 派生值: 汇总明细占用度后截断到 2 位小数,
    /// 永远重算, 不作为主存储
    pub fn occupation(&self) -> Decimal {
        self.containers
            .iter()
            .map(Container::occupation)
            .sum::<Decimal>()
            .trunc_with_scale(2)
    }

    /// 仓位毛重 (kg)
    pub fn weight(&self) -> Decimal {
        self.containers.iter().map(Container::weight).sum()
    }

    /// 是否含指定类型的托盘
    pub fn has_container_kind(&self, kind: ContainerKind) -> bool {
        self.containers.iter().any(|c| !c.is_empty() && c.kind == kind)
    }

    /// 查找匹配 (类型, 分组, 子组) 的托盘
    pub fn find_container_mut(
        &mut self,
        kind: ContainerKind,
        group_code: &str,
        sub_group_code: &str,
    ) -> Option<&mut Container> {
        self.containers.iter_mut().find(|c| {
            c.kind == kind && c.group_code == group_code && c.sub_group_code == sub_group_code
        })
    }

    /// 返装托盘数
    pub fn remount_count(&self) -> usize {
        self.containers.iter().filter(|c| c.is_remount()).count()
    }

    /// 清空仓位 (清除, 不删除)
    pub fn clear(&mut self) {
        self.containers.clear();
    }

    /// 移除空托盘与空明细
    pub fn prune(&mut self) {
        for container in &mut self.containers {
            container.prune_empty();
        }
        self.containers.retain(|c| !c.is_empty());
    }
}

impl SpaceConstraint for MountedSpace {
    /// 检查放入 occupation 后是否仍在容量内
    fn can_hold(&self, occupation: Decimal, capacity: Decimal) -> bool {
        self.occupation() + occupation <= capacity
    }

    /// 剩余容量, 不为负
    fn remaining_capacity(&self, capacity: Decimal) -> Decimal {
        (capacity - self.occupation()).max(Decimal::ZERO)
    }

    /// 占用率 (0-100); 容量为 0 时返回 0
    fn occupation_percentage(&self, capacity: Decimal) -> Decimal {
        if capacity <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        self.occupation() * Decimal::from(100) / capacity
    }
}
