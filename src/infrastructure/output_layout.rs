//! 输出目录布局 - 基础设施层
//!
//! 持有唯一的共享可变资源（输出目录），只暴露"路径"和"读写产物"的能力。
//! 文件命名与旧版工具保持一致：
//!
//! ```text
//! <output>/original/<page>.txt
//! <output>/original/<page>_names.xml
//! <output>/original/AllOriginalNames<item>.tsv
//! <output>/new/<page>.txt
//! <output>/new/<page>_names.json
//! <output>/new/AllNewNames<item>.tsv
//! <output>/FailedPages<item>.tsv
//! ```

use crate::error::{AppError, AppResult, FileError};
use crate::models::{ItemId, PageId};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// 输出目录布局
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
    original_dir: PathBuf,
    new_dir: PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            original_dir: root.join("original"),
            new_dir: root.join("new"),
            root,
        }
    }

    /// 创建输出目录（已存在则忽略）
    pub async fn ensure_dirs(&self) -> AppResult<()> {
        for dir in [&self.root, &self.original_dir, &self.new_dir] {
            fs::create_dir_all(dir).await.map_err(|source| {
                AppError::File(FileError::CreateDirFailed {
                    path: dir.display().to_string(),
                    source,
                })
            })?;
        }
        Ok(())
    }

    pub fn original_text(&self, page_id: PageId) -> PathBuf {
        self.original_dir.join(format!("{}.txt", page_id))
    }

    pub fn original_names(&self, page_id: PageId) -> PathBuf {
        self.original_dir.join(format!("{}_names.xml", page_id))
    }

    pub fn new_text(&self, page_id: PageId) -> PathBuf {
        self.new_dir.join(format!("{}.txt", page_id))
    }

    pub fn new_names(&self, page_id: PageId) -> PathBuf {
        self.new_dir.join(format!("{}_names.json", page_id))
    }

    pub fn original_summary(&self, item_id: ItemId) -> PathBuf {
        self.original_dir
            .join(format!("AllOriginalNames{}.tsv", item_id))
    }

    pub fn new_summary(&self, item_id: ItemId) -> PathBuf {
        self.new_dir.join(format!("AllNewNames{}.tsv", item_id))
    }

    pub fn failure_report(&self, item_id: ItemId) -> PathBuf {
        self.root.join(format!("FailedPages{}.tsv", item_id))
    }
}

/// 产物是否已存在
pub async fn artifact_exists(path: &Path) -> bool {
    fs::try_exists(path).await.unwrap_or(false)
}

/// 写入产物（覆盖，不追加）
///
/// 先写同目录下的临时文件再改名，中途崩溃不会留下半截的产物
pub async fn write_artifact(path: &Path, contents: impl AsRef<[u8]>) -> AppResult<()> {
    let partial = partial_path(path);
    let write_failed =
        |source| AppError::file_write_failed(path.display().to_string(), source);

    if let Err(source) = fs::write(&partial, contents).await {
        let _ = fs::remove_file(&partial).await;
        return Err(write_failed(source));
    }
    if let Err(source) = fs::rename(&partial, path).await {
        let _ = fs::remove_file(&partial).await;
        return Err(write_failed(source));
    }

    debug!("已写入: {}", path.display());
    Ok(())
}

/// `<dir>/<name>` 对应的临时文件 `<dir>/.<name>.partial`
fn partial_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.partial", name))
}

/// 读取产物；文件不存在时返回 None
pub async fn read_artifact(path: &Path) -> AppResult<Option<String>> {
    match fs::read(path).await {
        Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(AppError::file_read_failed(
            path.display().to_string(),
            source,
        )),
    }
}

/// 以 `\n` 结尾的多行写入（表头 + 数据行）
pub async fn write_lines(path: &Path, lines: &[String]) -> AppResult<()> {
    let mut contents = String::new();
    for line in lines {
        contents.push_str(line);
        contents.push('\n');
    }
    write_artifact(path, contents).await
}
