// ==========================================
// 整车托盘装载规划系统 - 领域模型层
// ==========================================
// 依据: Loading_Engine_Specs_v1.0.md - 2. 数据模型
// ==========================================
// 职责: 定义领域实体、类型、容量约束接口
// 红线: 不含规则逻辑, 不含 I/O
// ==========================================

pub mod container;
pub mod item;
pub mod product;
pub mod space;
pub mod types;

// 重导出核心类型
pub use container::{Container, MountedProduct};
pub use item::Item;
pub use product::{Factor, PackingGroup, PalletSetting, Product, ProductCatalog};
pub use space::{MountedSpace, Space, SpaceConstraint};
pub use types::{ContainerKind, Side, SpaceSize};
