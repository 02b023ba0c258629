//! 产物存储
//! 每个分类输出一对文件：merged-<prefix>-<category>.json / .srs
//! 写入采用临时文件 + rename，失败时不会留下截断的旧产物

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::GlobalConfig;
use crate::error::{MergeResult, RuleMergeError};
use crate::rule::encoder::EncodedRuleSet;

/// JSON 产物扩展名
pub const DOCUMENT_EXTENSION: &str = "json";
/// 二进制产物扩展名
pub const BINARY_EXTENSION: &str = "srs";

/// 产物保留策略
/// - Overwrite：固定文件名，新产物原子替换旧产物；失败分类保留上次产物
/// - Unique：每次运行生成唯一文件名，从不清理，目录会持续增长
/// - Purge：运行开始前清空输出目录再生成；失败分类不再有任何产物
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RetentionPolicy {
    Overwrite,
    Unique,
    Purge,
}

impl fmt::Display for RetentionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overwrite => write!(f, "overwrite"),
            Self::Unique => write!(f, "unique"),
            Self::Purge => write!(f, "purge"),
        }
    }
}

/// 单个分类的产物路径
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryArtifact {
    pub document_path: PathBuf,
    pub binary_path: PathBuf,
}

/// 产物存储
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    output_dir: PathBuf,
    retention: RetentionPolicy,
    prefix: String,
}

impl ArtifactStore {
    pub fn new(output_dir: impl Into<PathBuf>, retention: RetentionPolicy, prefix: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            retention,
            prefix: prefix.into(),
        }
    }

    pub fn from_config(config: &GlobalConfig) -> Self {
        Self::new(&config.output_dir, config.retention, &config.artifact_prefix)
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn retention(&self) -> RetentionPolicy {
        self.retention
    }

    /// 运行开始前调用一次：创建输出目录，Purge 策略下清空目录
    pub async fn prepare(&self) -> MergeResult<()> {
        tokio::fs::create_dir_all(&self.output_dir).await?;
        if self.retention == RetentionPolicy::Purge {
            self.purge().await?;
        }
        Ok(())
    }

    async fn purge(&self) -> MergeResult<()> {
        let target = tokio::fs::canonicalize(&self.output_dir).await?;
        let cwd = std::env::current_dir()?;
        if cwd.starts_with(&target) {
            return Err(RuleMergeError::ArtifactError(format!(
                "拒绝清空输出目录 {}：它包含当前工作目录",
                target.display()
            )));
        }

        let mut entries = tokio::fs::read_dir(&target).await?;
        let mut removed = 0usize;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if entry.file_type().await?.is_dir() {
                tokio::fs::remove_dir_all(&path).await?;
            } else {
                tokio::fs::remove_file(&path).await?;
            }
            removed += 1;
        }
        info!("已清空输出目录 {}，删除 {} 项", target.display(), removed);
        Ok(())
    }

    /// 产物文件名主干：merged-<prefix>-<category>[-<uuid>]
    pub fn artifact_stem(&self, category: &str) -> String {
        let base = if self.prefix.is_empty() {
            format!("merged-{}", category)
        } else {
            format!("merged-{}-{}", self.prefix, category)
        };
        match self.retention {
            RetentionPolicy::Unique => format!("{}-{}", base, Uuid::new_v4()),
            RetentionPolicy::Overwrite | RetentionPolicy::Purge => base,
        }
    }

    /// 落盘一个分类的 JSON 与二进制产物
    pub async fn persist(&self, category: &str, encoded: &EncodedRuleSet) -> MergeResult<CategoryArtifact> {
        let stem = self.artifact_stem(category);
        let document_path = self.output_dir.join(format!("{}.{}", stem, DOCUMENT_EXTENSION));
        let binary_path = self.output_dir.join(format!("{}.{}", stem, BINARY_EXTENSION));

        write_atomic(&document_path, &encoded.document).await?;
        write_atomic(&binary_path, &encoded.binary).await?;

        info!(
            "已生成 {} 和 {}",
            document_path.display(),
            binary_path.display()
        );
        Ok(CategoryArtifact {
            document_path,
            binary_path,
        })
    }
}

/// 原子写入：先写同目录临时文件，再 rename 覆盖目标
async fn write_atomic(path: &Path, content: &[u8]) -> MergeResult<()> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| RuleMergeError::ArtifactError(format!("非法产物路径：{}", path.display())))?;
    let tmp_path = path.with_file_name(format!(".{}.{}.tmp", file_name, Uuid::new_v4().simple()));

    if let Err(e) = tokio::fs::write(&tmp_path, content).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(RuleMergeError::ArtifactError(format!(
            "写入 {} 失败：{}",
            tmp_path.display(),
            e
        )));
    }

    // Windows 下目标存在时 rename 会失败
    #[cfg(target_os = "windows")]
    {
        let _ = tokio::fs::remove_file(path).await;
    }

    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        warn!("重命名 {} 失败，清理临时文件", tmp_path.display());
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(RuleMergeError::ArtifactError(format!(
            "替换 {} 失败：{}",
            path.display(),
            e
        )));
    }
    debug!("写入 {}，{} 字节", path.display(), content.len());
    Ok(())
}
