// ==========================================
// 整车托盘装载规划系统 - 分配规则族
// ==========================================
// 依据: Loading_Engine_Specs_v1.0.md - 4.3 分配规则
// ==========================================
// 职责: 每条策略一个规则对象, 组成有序规则链
// 红线: 放置被拒绝时换下一个候选, 不抛错
// ==========================================

pub mod chopp;
pub mod layer;
pub mod load_balancer;
pub mod non_palletized;
pub mod package;
pub mod pallet_group;
pub mod side_balance;
pub mod snapshot;
pub mod split_remount;

// 重导出全部规则
pub use chopp::ChoppPalletizationRule;
pub use layer::LayerRule;
pub use load_balancer::LoadBalancerRule;
pub use non_palletized::NonPalletizedProductsRule;
pub use package::{BoxTemplateRule, PackageRule};
pub use pallet_group::PalletGroupSubGroupRule;
pub use side_balance::SideBalanceRule;
pub use snapshot::SnapshotRule;
pub use split_remount::{
    NonLayerOnLayerPalletRule, RemountRule, RemountSplittedRebuildPalletRule,
    ReturnableAndDisposableSplitRule,
};
