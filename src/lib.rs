//! srs-merger - sing-box 规则集聚合工具
//! 拉取多个远程规则集，按分类去重合并，输出 JSON 与 SRS 两种产物

// 导出全局错误类型
pub use self::error::{MergeResult, RuleMergeError};

// 导出配置模块
pub use self::config::{ConfigManager, CustomConfigBuilder, GlobalConfig};

// 导出规则模块核心接口
pub use self::rule::{
    EncodedRuleSet, MergeAccumulator, MergedRecord, RuleDecoder, RuleEncoder, RuleMerger,
    RuleRecord, RuleRecordSet, RuleScalar, RuleSetDocument, RuleValue,
};

// 导出拉取与编解码接口
pub use self::codec::{MemoryCodec, RuleSetCodec, SingBoxCodec, StagingArea};
pub use self::fetcher::{HttpSourceFetcher, SourceFetch};

// 导出产物与流水线接口
pub use self::output::{ArtifactStore, CategoryArtifact, RetentionPolicy};
pub use self::pipeline::{
    CategoryReport, CategorySummary, Pipeline, RunReport, SkippedSource, SourceFailurePolicy,
};

// 声明所有子模块
pub mod config;
pub mod error;
pub mod rule;
pub mod fetcher;
pub mod codec;
pub mod output;
pub mod pipeline;
