//! 馆藏条目与页面

use std::fmt::Display;

/// BHL 条目 ID
pub type ItemId = u64;

/// BHL 页面 ID
pub type PageId = u64;

/// 待分析的扫描条目
///
/// 页面顺序即元数据服务返回的顺序，整个运行期间不变
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub item_id: ItemId,
    pub page_ids: Vec<PageId>,
}

impl Item {
    /// 创建条目，重复的页面 ID 只保留第一次出现的位置
    pub fn new(item_id: ItemId, page_ids: Vec<PageId>) -> Self {
        let mut seen = std::collections::HashSet::new();
        let page_ids = page_ids.into_iter().filter(|id| seen.insert(*id)).collect();
        Self { item_id, page_ids }
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }
}

impl Display for Item {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[条目 #{} 共 {} 页]", self.item_id, self.page_ids.len())
    }
}
