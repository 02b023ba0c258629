//! 流水线模块：按分类驱动 拉取 -> 解码 -> 合并 -> 编码 -> 落盘
pub mod orchestrator;
pub mod report;

use std::fmt;

use serde::{Deserialize, Serialize};

// 导出核心接口
pub use self::orchestrator::Pipeline;
pub use self::report::{CategoryReport, CategorySummary, RunReport, SkippedSource};

/// 单个规则源失败时的处理方式
/// - Abort：整个分类失败（不写产物），其他分类不受影响
/// - Skip：跳过失败的源继续合并其余源；全部源失败时分类仍失败
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SourceFailurePolicy {
    Abort,
    Skip,
}

impl fmt::Display for SourceFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Abort => write!(f, "abort"),
            Self::Skip => write!(f, "skip"),
        }
    }
}
