//! 内存编解码实现（不依赖外部工具，测试与离线调试使用）
//! 二进制形式：`SRS` 魔数 + 1 字节版本号 + JSON 文档原文

use async_trait::async_trait;

use super::RuleSetCodec;
use crate::error::{MergeResult, RuleMergeError};
use crate::rule::model::RULE_SET_VERSION;

const MAGIC: &[u8; 3] = b"SRS";

#[derive(Debug, Clone, Default)]
pub struct MemoryCodec;

impl MemoryCodec {
    pub fn new() -> Self {
        Self
    }

    /// 同步编码，便于测试直接构造二进制规则集
    pub fn encode_bytes(document: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(MAGIC.len() + 1 + document.len());
        out.extend_from_slice(MAGIC);
        out.push(RULE_SET_VERSION);
        out.extend_from_slice(document);
        out
    }
}

#[async_trait]
impl RuleSetCodec for MemoryCodec {
    async fn decompile(&self, binary: &[u8]) -> MergeResult<Vec<u8>> {
        match binary {
            [m0, m1, m2, version, rest @ ..] if [*m0, *m1, *m2] == *MAGIC => {
                if *version != RULE_SET_VERSION {
                    return Err(RuleMergeError::DecodeError(format!(
                        "不支持的规则集版本：{}",
                        version
                    )));
                }
                Ok(rest.to_vec())
            }
            _ => Err(RuleMergeError::DecodeError("缺少 SRS 魔数".to_string())),
        }
    }

    async fn compile(&self, document: &[u8]) -> MergeResult<Vec<u8>> {
        serde_json::from_slice::<serde_json::Value>(document)
            .map_err(|e| RuleMergeError::EncodeError(format!("规则集文档不是合法 JSON：{}", e)))?;
        Ok(Self::encode_bytes(document))
    }
}
