//! sing-box 外部编解码实现
//! 通过 `sing-box rule-set decompile/compile` 子命令完成格式转换

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::{RuleSetCodec, StagingArea};
use crate::error::{MergeResult, RuleMergeError};

/// 默认外部工具名（从 PATH 查找）
pub const DEFAULT_CODEC_BINARY: &str = "sing-box";

/// 调用方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CodecDirection {
    Decompile,
    Compile,
}

impl CodecDirection {
    fn subcommand(self) -> &'static str {
        match self {
            Self::Decompile => "decompile",
            Self::Compile => "compile",
        }
    }

    fn into_error(self, message: String) -> RuleMergeError {
        match self {
            Self::Decompile => RuleMergeError::DecodeError(message),
            Self::Compile => RuleMergeError::EncodeError(message),
        }
    }
}

/// sing-box 编解码器
#[derive(Debug, Clone)]
pub struct SingBoxCodec {
    binary: PathBuf,
}

impl Default for SingBoxCodec {
    fn default() -> Self {
        Self::new(DEFAULT_CODEC_BINARY)
    }
}

impl SingBoxCodec {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// 暂存输入 -> 调用外部工具 -> 读取输出；暂存区在返回时释放
    async fn run(
        &self,
        direction: CodecDirection,
        input_name: &str,
        output_name: &str,
        input: &[u8],
    ) -> MergeResult<Vec<u8>> {
        let staging = StagingArea::new()?;
        let input_path = staging.stage(input_name, input).await?;
        let output_path = staging.file(output_name);

        debug!(
            "调用 {} rule-set {}：{} -> {}",
            self.binary.display(),
            direction.subcommand(),
            input_path.display(),
            output_path.display()
        );

        let output = Command::new(&self.binary)
            .arg("rule-set")
            .arg(direction.subcommand())
            .arg(&input_path)
            .arg("-o")
            .arg(&output_path)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                direction.into_error(format!(
                    "无法启动 {}：{}",
                    self.binary.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(direction.into_error(format!(
                "{} 退出状态 {}：{}",
                self.binary.display(),
                output.status,
                stderr.trim()
            )));
        }

        staging.read(output_name).await.map_err(|e| {
            direction.into_error(format!("读取 {} 输出失败：{}", direction.subcommand(), e))
        })
    }
}

#[async_trait]
impl RuleSetCodec for SingBoxCodec {
    async fn decompile(&self, binary: &[u8]) -> MergeResult<Vec<u8>> {
        self.run(CodecDirection::Decompile, "source.srs", "source.json", binary)
            .await
    }

    async fn compile(&self, document: &[u8]) -> MergeResult<Vec<u8>> {
        self.run(CodecDirection::Compile, "merged.json", "merged.srs", document)
            .await
    }
}
