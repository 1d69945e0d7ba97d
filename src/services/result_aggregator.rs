//! 结果汇总服务 - 业务能力层
//!
//! 所有页面处理完成后，扫描每页的学名产物，生成条目级 TSV 汇总。
//! 缺失或无法解析的产物按"该页没有学名"处理，只记录警告。

use crate::error::AppResult;
use crate::infrastructure::{read_artifact, write_lines, OutputLayout};
use crate::models::{parse_finder_output, parse_reference_names, ItemId, NameRecord, PageId};
use std::path::Path;
use tracing::{info, warn};

/// TSV 表头
pub const SUMMARY_HEADER: &str = "PageID\tName";

/// 一份汇总的统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SummaryStats {
    pub rows: usize,
    pub pages_with_names: usize,
    pub unreadable_pages: Vec<PageId>,
}

/// 结果汇总服务
pub struct ResultAggregator<'a> {
    layout: &'a OutputLayout,
}

impl<'a> ResultAggregator<'a> {
    pub fn new(layout: &'a OutputLayout) -> Self {
        Self { layout }
    }

    /// 收集参考学名（`original/<page>_names.xml`）
    pub async fn collect_original(&self, page_ids: &[PageId]) -> (Vec<NameRecord>, SummaryStats) {
        self.collect(page_ids, |id| self.layout.original_names(id), |content| {
            parse_reference_names(content).map_err(|e| e.to_string())
        })
        .await
    }

    /// 收集识别学名（`new/<page>_names.json`）
    pub async fn collect_new(&self, page_ids: &[PageId]) -> (Vec<NameRecord>, SummaryStats) {
        self.collect(page_ids, |id| self.layout.new_names(id), |content| {
            parse_finder_output(content).map_err(|e| e.to_string())
        })
        .await
    }

    /// 写入 `original/AllOriginalNames<item>.tsv`
    pub async fn write_original_summary(
        &self,
        item_id: ItemId,
        page_ids: &[PageId],
    ) -> AppResult<SummaryStats> {
        let (records, stats) = self.collect_original(page_ids).await;
        let path = self.layout.original_summary(item_id);
        write_summary(&path, &records).await?;
        info!("📄 参考学名汇总: {} 条 → {}", stats.rows, path.display());
        Ok(stats)
    }

    /// 写入 `new/AllNewNames<item>.tsv`
    pub async fn write_new_summary(
        &self,
        item_id: ItemId,
        page_ids: &[PageId],
    ) -> AppResult<SummaryStats> {
        let (records, stats) = self.collect_new(page_ids).await;
        let path = self.layout.new_summary(item_id);
        write_summary(&path, &records).await?;
        info!("📄 识别学名汇总: {} 条 → {}", stats.rows, path.display());
        Ok(stats)
    }

    async fn collect(
        &self,
        page_ids: &[PageId],
        path_for: impl Fn(PageId) -> std::path::PathBuf,
        parse: impl Fn(&str) -> Result<Vec<String>, String>,
    ) -> (Vec<NameRecord>, SummaryStats) {
        let mut records = Vec::new();
        let mut stats = SummaryStats::default();

        for &page_id in page_ids {
            let path = path_for(page_id);
            let content = match read_artifact(&path).await {
                Ok(Some(content)) => content,
                Ok(None) => continue,
                Err(e) => {
                    warn!("[页 {}] ⚠️ 无法读取 {}: {}", page_id, path.display(), e);
                    stats.unreadable_pages.push(page_id);
                    continue;
                }
            };

            match parse(&content) {
                Ok(names) => {
                    if !names.is_empty() {
                        stats.pages_with_names += 1;
                    }
                    records.extend(names.into_iter().map(|name| NameRecord::new(page_id, name)));
                }
                Err(e) => {
                    warn!(
                        "[页 {}] ⚠️ 学名文件无法解析，按无学名处理 ({}): {}",
                        page_id,
                        path.display(),
                        e
                    );
                    stats.unreadable_pages.push(page_id);
                }
            }
        }

        stats.rows = records.len();
        (records, stats)
    }
}

/// 写入汇总文件：表头 + 每个 (页, 学名) 一行
pub async fn write_summary(path: &Path, records: &[NameRecord]) -> AppResult<()> {
    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(SUMMARY_HEADER.to_string());
    lines.extend(records.iter().map(NameRecord::to_tsv_row));
    write_lines(path, &lines).await
}
