//! 编解码模块：二进制规则集 <-> JSON 规则集文档
//! 实际格式由外部工具（sing-box）负责，这里只定义调用接口
pub mod memory;
pub mod singbox;
pub mod staging;

use async_trait::async_trait;

use crate::error::MergeResult;

// 导出核心接口
pub use self::memory::MemoryCodec;
pub use self::singbox::SingBoxCodec;
pub use self::staging::StagingArea;

/// 规则集编解码能力
#[async_trait]
pub trait RuleSetCodec: Send + Sync {
    /// 二进制规则集 -> JSON 文档字节
    async fn decompile(&self, binary: &[u8]) -> MergeResult<Vec<u8>>;

    /// JSON 文档字节 -> 二进制规则集
    async fn compile(&self, document: &[u8]) -> MergeResult<Vec<u8>>;
}
