//! 规则数据模型定义
//! 仅存储规则数据，无任何业务逻辑，支持序列化/反序列化

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 规则集文档格式版本（由 sing-box 规则集格式决定，必须原样输出）
pub const RULE_SET_VERSION: u8 = 3;

/// 单个规则取值（标量）
/// 排序规则：Bool < Integer < Text，字符串按码点字典序
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleScalar {
    Bool(bool),
    Integer(i64),
    Text(String),
}

impl RuleScalar {
    /// 从 JSON 值转换（对象、数组、null、浮点数不是标量）
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::Number(n) => n.as_i64().map(Self::Integer),
            Value::String(s) => Some(Self::Text(s.clone())),
            _ => None,
        }
    }

    /// 是否为“空”值（false / 0 / 空字符串）
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Bool(b) => !b,
            Self::Integer(i) => *i == 0,
            Self::Text(s) => s.is_empty(),
        }
    }
}

impl fmt::Display for RuleScalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for RuleScalar {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for RuleScalar {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for RuleScalar {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<bool> for RuleScalar {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// 规则字段值：单个标量或有序标量序列
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleValue {
    Scalar(RuleScalar),
    List(Vec<RuleScalar>),
}

impl RuleValue {
    /// 快速构造序列值
    pub fn list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<RuleScalar>,
    {
        Self::List(items.into_iter().map(Into::into).collect())
    }

    /// 快速构造标量值
    pub fn scalar(item: impl Into<RuleScalar>) -> Self {
        Self::Scalar(item.into())
    }

    /// 从 JSON 值转换
    /// 数组中的非标量元素逐个丢弃；整体无法转换时返回 None
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Array(items) => Some(Self::List(
                items.iter().filter_map(RuleScalar::from_json).collect(),
            )),
            other => RuleScalar::from_json(other).map(Self::Scalar),
        }
    }

    /// 空值判定：空序列或空标量
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Scalar(s) => s.is_empty(),
            Self::List(items) => items.is_empty(),
        }
    }

    /// 遍历值中包含的全部标量
    pub fn scalars(&self) -> impl Iterator<Item = &RuleScalar> {
        let slice: &[RuleScalar] = match self {
            Self::Scalar(s) => std::slice::from_ref(s),
            Self::List(items) => items,
        };
        slice.iter()
    }
}

/// JSON 值的“空”判定（null / false / 0 / "" / [] / {}）
pub fn is_empty_json(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

/// 单条规则记录：字段名 -> 字段值
/// 字段名对合并逻辑不透明（domain_suffix、domain_keyword、process_name 等）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleRecord {
    fields: BTreeMap<String, RuleValue>,
}

impl RuleRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// 写入字段，空值直接丢弃；返回是否写入
    pub fn insert(&mut self, field: impl Into<String>, value: RuleValue) -> bool {
        if value.is_empty() {
            return false;
        }
        self.fields.insert(field.into(), value);
        true
    }

    pub fn get(&self, field: &str) -> Option<&RuleValue> {
        self.fields.get(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &RuleValue)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, RuleValue)> for RuleRecord {
    fn from_iter<T: IntoIterator<Item = (K, RuleValue)>>(iter: T) -> Self {
        let mut record = Self::new();
        for (field, value) in iter {
            record.insert(field, value);
        }
        record
    }
}

/// 单个规则源解码后的记录集合（通常只有一条记录）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleRecordSet {
    records: Vec<RuleRecord>,
}

impl RuleRecordSet {
    pub fn new(records: Vec<RuleRecord>) -> Self {
        Self { records }
    }

    pub fn iter(&self) -> impl Iterator<Item = &RuleRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl From<Vec<RuleRecord>> for RuleRecordSet {
    fn from(records: Vec<RuleRecord>) -> Self {
        Self::new(records)
    }
}

impl FromIterator<RuleRecord> for RuleRecordSet {
    fn from_iter<T: IntoIterator<Item = RuleRecord>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// 合并结果：字段名 -> 去重且升序的标量序列
/// 不变量：每个字段的序列非空、无重复、升序
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MergedRecord {
    fields: BTreeMap<String, Vec<RuleScalar>>,
}

impl MergedRecord {
    /// 仅供合并器构造：调用方保证序列已去重、排序且非空
    pub(crate) fn from_sorted(fields: BTreeMap<String, Vec<RuleScalar>>) -> Self {
        Self { fields }
    }

    pub fn get(&self, field: &str) -> Option<&[RuleScalar]> {
        self.fields.get(field).map(Vec::as_slice)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &Vec<RuleScalar>)> {
        self.fields.iter()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// 字段数
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// 全部字段的取值总数
    pub fn value_count(&self) -> usize {
        self.fields.values().map(Vec::len).sum()
    }

    /// 转回普通规则记录（每个字段为序列值）
    pub fn to_record(&self) -> RuleRecord {
        self.fields
            .iter()
            .map(|(k, v)| (k.clone(), RuleValue::List(v.clone())))
            .collect()
    }
}

/// 规则集文档：{ "version": 3, "rules": [...] }
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSetDocument {
    pub version: u8,
    pub rules: Vec<MergedRecord>,
}

impl RuleSetDocument {
    /// 包装合并结果；无字段的合并结果输出为空 rules 数组
    pub fn from_merged(merged: MergedRecord) -> Self {
        let rules = if merged.is_empty() { Vec::new() } else { vec![merged] };
        Self {
            version: RULE_SET_VERSION,
            rules,
        }
    }
}
