//! 规则模块：数据模型、解码、合并、编码
pub mod model;
pub mod decoder;
pub mod merger;
pub mod encoder;

// 导出核心接口
pub use self::model::{
    MergedRecord, RuleRecord, RuleRecordSet, RuleScalar, RuleSetDocument, RuleValue,
    RULE_SET_VERSION,
};
pub use self::decoder::{RuleDecoder, parse_document};
pub use self::merger::{MergeAccumulator, RuleMerger};
pub use self::encoder::{EncodedRuleSet, RuleEncoder, render_document};
