//! 规则解码器
//! 二进制规则集 -> 外部工具反编译为 JSON -> 规则记录集
//! 文档级错误严格处理，记录级问题宽松处理（丢弃并告警）

use serde_json::Value;
use tracing::{debug, warn};

use super::model::{RuleRecord, RuleRecordSet, RuleValue, is_empty_json};
use crate::codec::RuleSetCodec;
use crate::error::{MergeResult, RuleMergeError};

/// 规则解码器
pub struct RuleDecoder<'a, C: RuleSetCodec + ?Sized> {
    codec: &'a C,
}

impl<'a, C: RuleSetCodec + ?Sized> RuleDecoder<'a, C> {
    pub fn new(codec: &'a C) -> Self {
        Self { codec }
    }

    /// 解码原始二进制规则集
    pub async fn decode(&self, raw: &[u8]) -> MergeResult<RuleRecordSet> {
        let document = self.codec.decompile(raw).await?;
        parse_document(&document)
    }
}

/// 解析 JSON 规则集文档
/// - 非 JSON / 顶层非对象 / rules 非数组：DecodeError
/// - 缺少 rules：视为空记录集
/// - rules 中非对象条目：跳过
pub fn parse_document(document: &[u8]) -> MergeResult<RuleRecordSet> {
    let value: Value = serde_json::from_slice(document)
        .map_err(|e| RuleMergeError::DecodeError(format!("规则集文档不是合法 JSON：{}", e)))?;

    let Value::Object(mut root) = value else {
        return Err(RuleMergeError::DecodeError(
            "规则集文档顶层不是对象".to_string(),
        ));
    };

    let rules = match root.remove("rules") {
        None | Some(Value::Null) => {
            warn!("规则集文档缺少 rules 字段，按空记录集处理");
            return Ok(RuleRecordSet::default());
        }
        Some(Value::Array(rules)) => rules,
        Some(other) => {
            return Err(RuleMergeError::DecodeError(format!(
                "rules 字段不是数组：{}",
                json_kind(&other)
            )));
        }
    };

    let total = rules.len();
    let records: RuleRecordSet = rules
        .iter()
        .filter_map(|entry| match entry {
            Value::Object(_) => Some(parse_record(entry)),
            other => {
                warn!("跳过非对象规则条目：{}", json_kind(other));
                None
            }
        })
        .collect();

    debug!("规则集解析完成：条目 {} 个，有效记录 {} 条", total, records.len());
    Ok(records)
}

/// 解析单条规则对象；空值字段与无法转换为标量的字段被丢弃
fn parse_record(entry: &Value) -> RuleRecord {
    let mut record = RuleRecord::new();
    let Value::Object(map) = entry else {
        return record;
    };

    for (field, value) in map {
        if is_empty_json(value) {
            continue;
        }
        match RuleValue::from_json(value) {
            Some(rule_value) => {
                if !record.insert(field.as_str(), rule_value) {
                    warn!("字段 [{}] 不含可合并的标量值，已丢弃", field);
                }
            }
            None => warn!("字段 [{}] 的值类型为 {}，无法合并，已丢弃", field, json_kind(value)),
        }
    }
    record
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::MemoryCodec;
    use crate::rule::model::RuleScalar;

    #[test]
    fn test_parse_single_record() {
        let doc = br#"{"version":3,"rules":[{"domain_suffix":["a.com","b.com"],"domain":"c.com"}]}"#;
        let set = parse_document(doc).unwrap();
        assert_eq!(set.len(), 1);
        let record = set.iter().next().unwrap();
        assert_eq!(record.get("domain"), Some(&RuleValue::Scalar(RuleScalar::from("c.com"))));
        assert_eq!(
            record.get("domain_suffix"),
            Some(&RuleValue::list(["a.com", "b.com"]))
        );
    }

    #[test]
    fn test_empty_fields_are_dropped() {
        // 测试场景：空数组、空字符串、false、0 均视为空值
        let doc = br#"{"rules":[{"domain_keyword":[],"domain":"","invert":false,"port":0,"domain_suffix":["x.org"]}]}"#;
        let set = parse_document(doc).unwrap();
        let record = set.iter().next().unwrap();
        assert_eq!(record.len(), 1);
        assert!(record.get("domain_suffix").is_some());
    }

    #[test]
    fn test_non_object_entries_are_skipped() {
        let doc = br#"{"rules":["oops", 42, null, {"domain":["a.com"]}]}"#;
        let set = parse_document(doc).unwrap();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_missing_rules_is_empty() {
        let set = parse_document(br#"{"version":3}"#).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn test_malformed_documents_fail() {
        assert!(matches!(parse_document(b"{"), Err(RuleMergeError::DecodeError(_))));
        assert!(matches!(parse_document(b"[1,2]"), Err(RuleMergeError::DecodeError(_))));
        assert!(matches!(
            parse_document(br#"{"rules":{"domain":"a.com"}}"#),
            Err(RuleMergeError::DecodeError(_))
        ));
    }

    #[test]
    fn test_nested_values_are_dropped() {
        // 测试场景：logical 规则的嵌套对象无法按集合合并
        let doc = br#"{"rules":[{"type":"logical","rules":[{"domain":"a.com"}],"domain":["b.com"]}]}"#;
        let set = parse_document(doc).unwrap();
        let record = set.iter().next().unwrap();
        assert!(record.get("rules").is_none());
        assert_eq!(record.get("type"), Some(&RuleValue::scalar("logical")));
        assert!(record.get("domain").is_some());
    }

    #[tokio::test]
    async fn test_decode_through_codec() {
        let codec = MemoryCodec::new();
        let raw = MemoryCodec::encode_bytes(br#"{"version":3,"rules":[{"domain":["a.com"]}]}"#);
        let set = RuleDecoder::new(&codec).decode(&raw).await.unwrap();
        assert_eq!(set.len(), 1);

        let err = RuleDecoder::new(&codec).decode(b"garbage").await.unwrap_err();
        assert!(matches!(err, RuleMergeError::DecodeError(_)));
    }
}
