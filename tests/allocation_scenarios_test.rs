// ==========================================
// 分配场景验收测试
// ==========================================
// 依据: Loading_Engine_Specs_v1.0.md - 8. 验收场景
// 职责: 主分配/拼托/配重/子序列四个验收场景
// ==========================================

mod helpers;

use helpers::{
    create_chopp_product, create_context, create_test_product, mounted_amount_of, paired_layout,
};
use pallet_loading_planner::config::Settings;
use pallet_loading_planner::domain::item::Item;
use pallet_loading_planner::domain::types::{ContainerKind, Side, SpaceSize};
use pallet_loading_planner::engine::context::PlacementMeta;
use pallet_loading_planner::engine::rule_chain::AllocationRule;
use pallet_loading_planner::engine::rules::{ChoppPalletizationRule, SideBalanceRule};
use pallet_loading_planner::engine::subsequence::SubsequenceGenerator;
use pallet_loading_planner::engine::RuleChain;
use pallet_loading_planner::Space;
use rust_decimal_macros::dec;

// ==========================================
// 场景 A: 单条目单仓位主分配
// ==========================================
// Item(100, 50 件, 托盘装 50, 系数 1) + 空 S42 仓位
// → 仓位 1 装载, 占用 25, 条目清零
#[test]
fn test_scenario_single_item_single_space() {
    let product = create_test_product("100", ContainerKind::Disposable, "G1", dec!(1), dec!(10));
    let mut ctx = create_context(
        vec![Space::new(1, SpaceSize::S42, 1, Side::Driver)],
        vec![Item::new("100", dec!(50), 5)],
        vec![product],
        Settings::new(),
    );

    RuleChain::default_chain().run(&mut ctx).unwrap();

    assert!(ctx.mounted[0].is_mounted());
    assert_eq!(ctx.mounted[0].occupation(), dec!(25.00));
    assert_eq!(ctx.items[0].amount_remaining, dec!(0));
    assert_eq!(ctx.non_palletized_count(), 0);
}

// ==========================================
// 场景 B: 不同升数桶装拼托
// ==========================================
// 两个不同升数的 chopp 条目, 合计占用 ≤ 42
// → 拼进同一个空 S42 仓位
#[test]
fn test_scenario_chopp_co_pack() {
    let products = vec![
        create_chopp_product("C30", dec!(30), dec!(40)),
        create_chopp_product("C50", dec!(50), dec!(40)),
    ];
    let mut ctx = create_context(
        vec![
            Space::new(1, SpaceSize::S42, 1, Side::Driver),
            Space::new(2, SpaceSize::S42, 1, Side::Helper),
        ],
        vec![Item::new("C30", dec!(18), 0), Item::new("C50", dec!(20), 0)],
        products,
        Settings::new(),
    );

    ChoppPalletizationRule.execute(&mut ctx).unwrap();

    // 系数 2: 18+20 桶占 38 ≤ 42, 同一仓位
    assert_eq!(ctx.mounted_space_indices().len(), 1);
    assert_eq!(ctx.mounted[0].occupation(), dec!(38.00));
    assert_eq!(mounted_amount_of(&ctx, "C30"), dec!(18));
    assert_eq!(mounted_amount_of(&ctx, "C50"), dec!(20));
}

// ==========================================
// 场景 C: 侧别配重
// ==========================================
// 驾驶侧 600 kg / 副驾侧 400 kg (60%)
// → 配重后占比向 50% 靠拢, 占用度不超容量
#[test]
fn test_scenario_side_balance_moves_toward_fifty() {
    let products = vec![
        create_test_product("HVY", ContainerKind::Disposable, "G1", dec!(1), dec!(25)),
        create_test_product("MID", ContainerKind::Disposable, "G1", dec!(1), dec!(20)),
        create_test_product("LGT", ContainerKind::Disposable, "G1", dec!(1), dec!(5)),
    ];
    let items = vec![
        Item::new("HVY", dec!(20), 0),
        Item::new("MID", dec!(20), 0),
        Item::new("LGT", dec!(20), 0),
    ];
    let mut ctx = create_context(paired_layout(2, SpaceSize::S42), items, products, Settings::new());
    // 驾驶侧: 500 + 100 = 600 kg, 副驾侧: 400 kg
    assert!(ctx.add_product(0, 0, dec!(20), PlacementMeta::default()));
    assert!(ctx.add_product(2, 2, dec!(20), PlacementMeta::default()));
    assert!(ctx.add_product(1, 1, dec!(20), PlacementMeta::default()));
    assert_eq!(ctx.driver_percentage(), dec!(60));

    let rule = SideBalanceRule;
    assert!(rule.should_execute(&ctx));
    rule.execute(&mut ctx).unwrap();

    let deviation = (ctx.driver_percentage() - dec!(50)).abs();
    assert!(deviation < dec!(10));
    assert!(ctx.side_weight(Side::Driver) >= ctx.side_weight(Side::Helper));
    assert!(ctx.capacity_invariant_holds());
}

// ==========================================
// 场景 D: 子序列完备枚举
// ==========================================
// limit=5 对 [1,2,3] 产出全部 8 个子集, 头/尾递归序, 不触顶
#[test]
fn test_scenario_subsequence_limit_five() {
    let generator = SubsequenceGenerator::new(5);
    let subsets: Vec<Vec<i32>> = generator.subsequences(&[1, 2, 3]).collect();

    let expected: Vec<Vec<i32>> = vec![
        vec![],
        vec![1],
        vec![2],
        vec![1, 2],
        vec![3],
        vec![1, 3],
        vec![2, 3],
        vec![1, 2, 3],
    ];
    assert_eq!(subsets, expected);
    assert!(generator.is_exhaustive_for(3));
}
