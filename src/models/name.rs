//! 学名记录及 gnfinder 输出解析

use super::item::PageId;
use serde_json::Value as JsonValue;

/// 某一页上的一个学名
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameRecord {
    pub page_id: PageId,
    pub name: String,
}

impl NameRecord {
    pub fn new(page_id: PageId, name: impl Into<String>) -> Self {
        Self {
            page_id,
            name: name.into(),
        }
    }

    /// TSV 行（不含换行）
    pub fn to_tsv_row(&self) -> String {
        format!("{}\t{}", self.page_id, sanitize_cell(&self.name))
    }
}

/// gnfinder 输出中的单个条目
///
/// 不同版本的 gnfinder 字段不同：旧版直接给出 `name`，
/// 新版可能只给出 `verification.bestResult.matchedName`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameEntry {
    RawFound(String),
    VerifiedMatch(String),
    Unrecognized,
}

impl NameEntry {
    pub fn from_json(entry: &JsonValue) -> Self {
        if let Some(name) = non_empty_str(entry.get("name")) {
            return NameEntry::RawFound(name);
        }

        let best = entry.get("verification").and_then(|v| {
            v.get("bestResult")
                .or_else(|| v.get("BestResult"))
                .or_else(|| v.get("best_result"))
        });
        let matched = best.and_then(|b| {
            non_empty_str(b.get("matchedName")).or_else(|| non_empty_str(b.get("matched_name")))
        });

        match matched {
            Some(name) => NameEntry::VerifiedMatch(name),
            None => NameEntry::Unrecognized,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            NameEntry::RawFound(name) | NameEntry::VerifiedMatch(name) => Some(name),
            NameEntry::Unrecognized => None,
        }
    }
}

/// 解析 gnfinder 的 JSON 输出，返回按出现顺序排列的学名
///
/// `metadata.total_names` 为 0 时直接返回空列表
pub fn parse_finder_output(json: &str) -> Result<Vec<String>, serde_json::Error> {
    let doc: JsonValue = serde_json::from_str(json)?;

    let total = doc.get("metadata").and_then(|m| {
        m.get("total_names")
            .or_else(|| m.get("totalNames"))
            .and_then(|v| v.as_u64())
    });
    if total == Some(0) {
        return Ok(Vec::new());
    }

    let names = doc
        .get("names")
        .and_then(|n| n.as_array())
        .map(|entries| {
            entries
                .iter()
                .map(NameEntry::from_json)
                .filter_map(|entry| entry.name().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    Ok(names)
}

fn non_empty_str(value: Option<&JsonValue>) -> Option<String> {
    value
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn sanitize_cell(value: &str) -> String {
    value
        .chars()
        .map(|c| if matches!(c, '\t' | '\r' | '\n') { ' ' } else { c })
        .collect()
}
