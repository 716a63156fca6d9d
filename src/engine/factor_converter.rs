// ==========================================
// 整车托盘装载规划系统 - 占用度换算引擎
// ==========================================
// 依据: Loading_Engine_Specs_v1.0.md - 4.1 FactorConverter
// 红线: 定点运算 + 向零截断, 反复加减不得漂移
// ==========================================
// 职责: 数量 ⇄ 占用度的纯算术换算
// 输入: 数量/占用度 + 码放系数 + 托盘参数
// 输出: Decimal (截断到 2 位小数)
// ==========================================

use crate::domain::container::MountedProduct;
use crate::domain::product::{Factor, PalletSetting, Product};
use crate::domain::types::SpaceSize;
use rust_decimal::Decimal;

// 每个压舱层的附加占用度。
// 观测到的生产数据从未填充该比较值, 行为等价于恒零;
// 由 additional_occupation_is_pinned_to_zero 测试钉死。
pub const ADDITIONAL_OCCUPATION_PER_BALLAST: Decimal = Decimal::ZERO;

// ==========================================
// OccupationRequest - 占用度换算请求
// ==========================================
// 三种请求形态, 由 occupation() 内的 match 统一分派
#[derive(Debug, Clone, Copy)]
pub enum OccupationRequest<'a> {
    /// 按装载明细换算 (重算已放置明细在某档仓位下的占用)
    ByMountedProduct {
        mounted: &'a MountedProduct,
        product: &'a Product,
        size: SpaceSize,
    },
    /// 按数量与系数换算 (无托盘参数修正)
    ByQuantityAndFactor {
        quantity: Decimal,
        factor: &'a Factor,
    },
    /// 按数量、系数与托盘参数换算 (完整路径)
    ByQuantityFactorPalletSetting {
        quantity: Decimal,
        factor: &'a Factor,
        pallet_setting: &'a PalletSetting,
        calculate_additional: bool,
    },
}

// ==========================================
// FactorConverter - 占用度换算引擎
// ==========================================
pub struct FactorConverter;

impl FactorConverter {
    /// 占用度换算
    ///
    /// 结果 = 截断2位( 换算数量 × 系数值 / 2 ) + 附加占用度
    ///
    /// - 换算数量: 打装与标准装数量不一致时按 QuantityDozen/Quantity 重标定
    /// - 附加占用度: 仅当产品选择参与且压舱层元数据已补全时计入, 否则为 0
    /// - 截断而非四舍五入: 同一明细反复换算不得漂移
    pub fn occupation(request: OccupationRequest<'_>) -> Decimal {
        match request {
            OccupationRequest::ByMountedProduct {
                mounted,
                product,
                size,
            } => {
                let factor = match product.factor(size) {
                    Some(f) => f,
                    None => return Decimal::ZERO,
                };
                Self::occupation_value(
                    mounted.amount,
                    factor,
                    Some(&product.pallet_setting),
                    product.calculate_additional_occupation
                        && product.has_ballast_metadata(),
                )
            }
            OccupationRequest::ByQuantityAndFactor { quantity, factor } => {
                Self::occupation_value(quantity, factor, None, false)
            }
            OccupationRequest::ByQuantityFactorPalletSetting {
                quantity,
                factor,
                pallet_setting,
                calculate_additional,
            } => Self::occupation_value(
                quantity,
                factor,
                Some(pallet_setting),
                calculate_additional,
            ),
        }
    }

    /// 数量换算 (occupation 的代数逆, 不含附加占用项)
    ///
    /// # 参数
    /// - occupation_value: 可用/目标占用度
    /// - factor: 码放系数
    /// - pallet_setting: 托盘参数 (打装重标定的逆)
    pub fn quantity(
        occupation_value: Decimal,
        factor: &Factor,
        pallet_setting: &PalletSetting,
    ) -> Decimal {
        let factor_value = Self::non_zero(factor.value);
        let mut quantity = occupation_value * Decimal::TWO / factor_value;

        // 打装重标定的逆变换
        if pallet_setting.has_dozen_mismatch() {
            let dozen = Self::non_zero(pallet_setting.quantity_dozen);
            quantity = quantity * pallet_setting.quantity / dozen;
        }

        quantity.trunc_with_scale(2)
    }

    /// 可用占用度内能放下的数量
    ///
    /// 分配规则询问"这里还能放多少件"的统一入口:
    /// 1) 请求数量本身放得下 → 原样返回
    /// 2) 参与附加占用计算 → 扣除附加项后向下取整件数
    /// 3) 否则 → 按 quantity() 向下取整件数
    pub fn quantity_per_factor(
        available_occupation: Decimal,
        requested_quantity: Decimal,
        factor: &Factor,
        pallet_setting: &PalletSetting,
        calculate_additional: bool,
    ) -> Decimal {
        if available_occupation <= Decimal::ZERO || requested_quantity <= Decimal::ZERO {
            return Decimal::ZERO;
        }

        let requested_occupation = Self::occupation_value(
            requested_quantity,
            factor,
            Some(pallet_setting),
            calculate_additional,
        );
        if requested_occupation <= available_occupation {
            return requested_quantity;
        }

        let usable = if calculate_additional {
            // 附加占用感知: 先扣除请求量对应的附加项
            let additional = Self::additional_occupation(
                requested_quantity,
                Some(pallet_setting),
                calculate_additional,
            );
            (available_occupation - additional).max(Decimal::ZERO)
        } else {
            available_occupation
        };

        Self::quantity(usable, factor, pallet_setting)
            .trunc_with_scale(0)
            .min(requested_quantity)
            .max(Decimal::ZERO)
    }

    /// 单件占用度 (附加占用运算的基元)
    pub fn unitary_occupation(
        factor: &Factor,
        pallet_setting: &PalletSetting,
        calculate_additional: bool,
    ) -> Decimal {
        Self::occupation_value(Decimal::ONE, factor, Some(pallet_setting), calculate_additional)
    }

    // ==========================================
    // 内部算术
    // ==========================================

    fn occupation_value(
        quantity: Decimal,
        factor: &Factor,
        pallet_setting: Option<&PalletSetting>,
        calculate_additional: bool,
    ) -> Decimal {
        let adjusted = Self::adjusted_quantity(quantity, pallet_setting);
        let base = (adjusted * factor.value / Decimal::TWO).trunc_with_scale(2);
        base + Self::additional_occupation(quantity, pallet_setting, calculate_additional)
    }

    /// 打装重标定: 打装与标准装数量不一致时,
    /// 按 QuantityDozen/Quantity 比例换算数量
    fn adjusted_quantity(quantity: Decimal, pallet_setting: Option<&PalletSetting>) -> Decimal {
        match pallet_setting {
            Some(ps) if ps.has_dozen_mismatch() => {
                let divisor = Self::non_zero(ps.quantity);
                quantity * ps.quantity_dozen / divisor
            }
            _ => quantity,
        }
    }

    /// 附加占用度: 每满一个压舱层计入一次比较值
    fn additional_occupation(
        quantity: Decimal,
        pallet_setting: Option<&PalletSetting>,
        calculate_additional: bool,
    ) -> Decimal {
        if !calculate_additional {
            return Decimal::ZERO;
        }
        let ps = match pallet_setting {
            Some(ps) if !ps.quantity_ballast_min.is_zero() => ps,
            _ => return Decimal::ZERO,
        };
        let ballast_layers = (quantity / ps.quantity_ballast_min).trunc_with_scale(0);
        ballast_layers * ADDITIONAL_OCCUPATION_PER_BALLAST
    }

    /// 除零防护: 零除数替换为 1
    fn non_zero(value: Decimal) -> Decimal {
        if value.is_zero() {
            Decimal::ONE
        } else {
            value
        }
    }
}
