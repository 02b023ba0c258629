//! 产物输出模块：命名、保留策略与落盘
pub mod store;

// 导出核心接口
pub use self::store::{ArtifactStore, CategoryArtifact, RetentionPolicy};
