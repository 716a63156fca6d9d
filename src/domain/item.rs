// ==========================================
// 整车托盘装载规划系统 - 订单条目
// ==========================================
// 依据: Loading_Engine_Specs_v1.0.md - 2. 数据模型 / Item
// 职责: 单个 SKU 的待装需求, 规则逐步消耗
// 红线: 条目只消耗不删除, 剩余量即"未上托"报告
// ==========================================

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ==========================================
// Item - 待装条目
// ==========================================
// amount_remaining 单调递减到 0, 或在管线结束后作为残余上报
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub code: String,                 // SKU 代码 (与产品目录一致)
    pub amount: Decimal,              // 原始需求数量
    pub amount_remaining: Decimal,    // 剩余数量
    pub detached_amount: Decimal,     // 拆散数量 (托盘间搬运的累计量)
    pub layers_remaining: u32,        // 剩余层数 (层板规则用)
    pub splitted: bool,               // 是否被拆分到多个托盘
    pub customer: Option<String>,     // 客户标识 (定向托盘)
}

impl Item {
    /// 创建新的待装条目
    ///
    /// # 参数
    /// - code: SKU 代码
    /// - amount: 需求数量
    /// - layers: 产品托盘层数 (剩余层数初值)
    pub fn new(code: &str, amount: Decimal, layers: u32) -> Self {
        Self {
            code: code.to_string(),
            amount,
            amount_remaining: amount,
            detached_amount: Decimal::ZERO,
            layers_remaining: layers,
            splitted: false,
            customer: None,
        }
    }

    /// 条目是否仍有待装数量
    pub fn is_pending(&self) -> bool {
        self.amount_remaining > Decimal::ZERO
    }

    /// 消耗数量
    ///
    /// # 返回
    /// - 实际消耗的数量 (不超过剩余数量, 不会为负)
    pub fn drain(&mut self, amount: Decimal) -> Decimal {
        if amount <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        let taken = amount.min(self.amount_remaining);
        self.amount_remaining -= taken;
        taken
    }

    /// 归还数量 (快照回退/托盘重建时使用)
    ///
    /// 归还以原始需求为上限, 保证守恒
    pub fn restore(&mut self, amount: Decimal) -> Decimal {
        if amount <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        let headroom = self.amount - self.amount_remaining;
        let returned = amount.min(headroom);
        self.amount_remaining += returned;
        returned
    }

    /// 记录拆分搬运数量 (明细从一个托盘挪到另一个时累计)
    pub fn detach(&mut self, amount: Decimal) {
        if amount > Decimal::ZERO {
            self.detached_amount += amount;
        }
    }

    /// 消耗层数
    pub fn drain_layers(&mut self, layers: u32) -> u32 {
        let taken = layers.min(self.layers_remaining);
        self.layers_remaining -= taken;
        taken
    }
}
