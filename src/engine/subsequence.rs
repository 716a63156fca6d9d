// ==========================================
// 整车托盘装载规划系统 - 子序列枚举引擎
// ==========================================
// 依据: Loading_Engine_Specs_v1.0.md - 4.2 SubsequenceGenerator
// 红线: 相同输入必须产生相同序列, 无隐藏随机性
// ==========================================
// 职责: 小规模有序列表的子集惰性枚举
// 用途: 规则搜索"哪组 SKU 组合最能填满剩余容量"
// ==========================================

// 枚举顺序为头/尾递归序: 对 [head, ...tail],
// 先枚举 tail 的子集 comb, 依次产出 comb 与 [head]+comb;
// 空表产出 []。等价于二进制计数 (元素 i ↔ 位 i), [] 恒为首个。
//
// 上限计数的是尾组合展开次数: 每次展开产出一对
// (comb, [head]+comb), 故最多产出 2×limit 个子集;
// 列表长度 n 满足 2^(n-1) <= limit 时枚举完备 (共 2^n 个)。
// 触顶后提前终止, 返回部分而非空结果, 调用方必须容忍次优。

/// 默认尾组合展开上限
pub const DEFAULT_SUBSEQUENCE_LIMIT: usize = 30000;

// ==========================================
// SubsequenceGenerator - 子序列枚举器
// ==========================================
#[derive(Debug, Clone, Copy)]
pub struct SubsequenceGenerator {
    limit: usize,
}

impl Default for SubsequenceGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_SUBSEQUENCE_LIMIT)
    }
}

impl SubsequenceGenerator {
    /// 创建枚举器
    ///
    /// # 参数
    /// - limit: 尾组合展开上限 (0 表示不产出任何子集)
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }

    /// 惰性枚举子集
    ///
    /// 返回可重启的迭代器; 重新调用得到同一序列
    pub fn subsequences<'a, T: Clone>(&self, source: &'a [T]) -> SubsequenceIter<'a, T> {
        SubsequenceIter {
            source,
            mask: 0,
            expansions: 0,
            limit: self.limit,
        }
    }

    /// 枚举为向量 (便捷入口, 小列表用)
    pub fn collect<T: Clone>(&self, source: &[T]) -> Vec<Vec<T>> {
        self.subsequences(source).collect()
    }

    /// 是否能在上限内完备枚举长度为 n 的列表
    pub fn is_exhaustive_for(&self, n: usize) -> bool {
        if n == 0 {
            return true;
        }
        // 2^(n-1) <= limit, 防溢出写法
        n - 1 < usize::BITS as usize && (1usize << (n - 1)) <= self.limit
    }
}

// ==========================================
// SubsequenceIter - 惰性迭代器
// ==========================================
pub struct SubsequenceIter<'a, T> {
    source: &'a [T],
    mask: u128,
    expansions: usize,
    limit: usize,
}

impl<'a, T: Clone> Iterator for SubsequenceIter<'a, T> {
    type Item = Vec<T>;

    fn next(&mut self) -> Option<Vec<T>> {
        let n = self.source.len();
        debug_assert!(n < 128, "子序列枚举仅用于小列表");

        if n >= 128 || self.mask >= (1u128 << n) {
            return None;
        }

        // mask 偶数位是一次新的尾组合展开
        if self.mask % 2 == 0 {
            if self.expansions >= self.limit {
                return None;
            }
            self.expansions += 1;
        }

        let subset = self
            .source
            .iter()
            .enumerate()
            .filter(|(i, _)| self.mask & (1u128 << i) != 0)
            .map(|(_, v)| v.clone())
            .collect();
        self.mask += 1;
        Some(subset)
    }
}
