//! 页面处理上下文
//!
//! 封装"我正在处理哪个条目的第几页"这一信息

use crate::models::{ItemId, PageId};
use std::fmt::Display;

/// 页面处理上下文
#[derive(Debug, Clone)]
pub struct PageCtx {
    /// 条目ID
    pub item_id: ItemId,

    /// 页面ID
    pub page_id: PageId,

    /// 页面在条目中的序号（从1开始，仅用于日志显示）
    pub page_index: usize,

    /// 条目总页数
    pub page_total: usize,
}

impl PageCtx {
    /// 创建新的页面上下文
    pub fn new(item_id: ItemId, page_id: PageId, page_index: usize, page_total: usize) -> Self {
        Self {
            item_id,
            page_id,
            page_index,
            page_total,
        }
    }
}

impl Display for PageCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[页 {} ({}/{})]",
            self.page_id, self.page_index, self.page_total
        )
    }
}
