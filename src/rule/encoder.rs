//! 规则编码器
//! 合并结果 -> 版本化 JSON 文档 -> 外部工具编译为二进制规则集
//! JSON 文档本身也是产物，与喂给编译器的字节完全一致

use tracing::debug;

use super::model::{MergedRecord, RuleSetDocument};
use crate::codec::RuleSetCodec;
use crate::error::{MergeResult, RuleMergeError};

/// 编码产物：JSON 文档 + 二进制规则集
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedRuleSet {
    pub document: Vec<u8>,
    pub binary: Vec<u8>,
}

/// 规则编码器
pub struct RuleEncoder<'a, C: RuleSetCodec + ?Sized> {
    codec: &'a C,
}

impl<'a, C: RuleSetCodec + ?Sized> RuleEncoder<'a, C> {
    pub fn new(codec: &'a C) -> Self {
        Self { codec }
    }

    pub async fn encode(&self, merged: MergedRecord) -> MergeResult<EncodedRuleSet> {
        let document = render_document(merged)?;
        let binary = self.codec.compile(&document).await?;
        debug!(
            "规则集编码完成：文档 {} 字节，二进制 {} 字节",
            document.len(),
            binary.len()
        );
        Ok(EncodedRuleSet { document, binary })
    }
}

/// 渲染 JSON 文档：2 空格缩进、保留非 ASCII 字符、末尾换行
pub fn render_document(merged: MergedRecord) -> MergeResult<Vec<u8>> {
    let doc = RuleSetDocument::from_merged(merged);
    let mut bytes = serde_json::to_vec_pretty(&doc)
        .map_err(|e| RuleMergeError::EncodeError(format!("规则集文档序列化失败：{}", e)))?;
    bytes.push(b'\n');
    Ok(bytes)
}
