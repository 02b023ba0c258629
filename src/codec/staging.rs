//! 临时文件暂存区
//! 外部工具只接受文件路径，这里把字节落到临时目录；
//! 目录随 StagingArea 一起释放，成功、失败、提前返回都会清理

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::error::MergeResult;

/// 作用域内的临时目录句柄
#[derive(Debug)]
pub struct StagingArea {
    dir: TempDir,
}

impl StagingArea {
    /// 在系统临时目录下创建暂存区
    pub fn new() -> MergeResult<Self> {
        let dir = tempfile::Builder::new().prefix("srs-merger-").tempdir()?;
        Ok(Self { dir })
    }

    /// 暂存区根目录
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// 暂存区内的文件路径（不创建文件）
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// 写入字节并返回文件路径
    pub async fn stage(&self, name: &str, bytes: &[u8]) -> MergeResult<PathBuf> {
        let path = self.file(name);
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }

    /// 读取暂存区内的文件
    pub async fn read(&self, name: &str) -> MergeResult<Vec<u8>> {
        Ok(tokio::fs::read(self.file(name)).await?)
    }
}
