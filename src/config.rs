//! 运行配置：规则源分类、输出目录、外部工具、并发与保留策略
//! 配置在启动时一次性构建，按引用传入流水线，不存在全局可变状态

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::codec::singbox::DEFAULT_CODEC_BINARY;
use crate::error::{MergeResult, RuleMergeError};
use crate::output::RetentionPolicy;
use crate::pipeline::SourceFailurePolicy;

/// 默认配置文件
pub const DEFAULT_CONFIG_FILE: &str = "rules.json";

/// 始终处理的分类（配置缺失时为空列表）
pub const DEFAULT_CATEGORIES: [&str; 2] = ["direct", "proxy"];

/// 全局配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalConfig {
    // 分类名 -> 规则源 URL 列表
    pub categories: BTreeMap<String, Vec<String>>,
    // 产物输出目录
    pub output_dir: PathBuf,
    // sing-box 可执行文件
    pub codec_binary: PathBuf,
    // 超时配置（单位：秒）
    pub http_timeout: u64,
    // 单个分类内的最大并发拉取数
    pub max_concurrent_fetches: usize,
    // 产物保留策略
    pub retention: RetentionPolicy,
    // 单个规则源失败时的处理方式
    pub on_source_error: SourceFailurePolicy,
    // 产物文件名前缀：merged-<prefix>-<category>
    pub artifact_prefix: String,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            categories: DEFAULT_CATEGORIES
                .iter()
                .map(|c| (c.to_string(), Vec::new()))
                .collect(),
            output_dir: PathBuf::from("rule-set"),
            codec_binary: PathBuf::from(DEFAULT_CODEC_BINARY),
            http_timeout: 30,
            max_concurrent_fetches: 4,
            retention: RetentionPolicy::Overwrite,
            on_source_error: SourceFailurePolicy::Abort,
            artifact_prefix: "domain".to_string(),
        }
    }
}

impl GlobalConfig {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout)
    }

    /// 校验配置：分类名可作为文件名、URL 合法、并发数至少为 1
    pub fn validate(&self) -> MergeResult<()> {
        if self.max_concurrent_fetches == 0 {
            return Err(RuleMergeError::ConfigurationError(
                "max_concurrent_fetches 必须大于 0".to_string(),
            ));
        }
        if self.http_timeout == 0 {
            return Err(RuleMergeError::ConfigurationError(
                "http_timeout_secs 必须大于 0".to_string(),
            ));
        }
        if !self.artifact_prefix.is_empty() && !is_file_safe(&self.artifact_prefix) {
            return Err(RuleMergeError::ConfigurationError(format!(
                "产物前缀 [{}] 只能包含字母、数字、'-'、'_'",
                self.artifact_prefix
            )));
        }

        for (category, urls) in &self.categories {
            if !is_file_safe(category) {
                return Err(RuleMergeError::ConfigurationError(format!(
                    "分类名 [{}] 只能包含字母、数字、'-'、'_'",
                    category
                )));
            }
            for raw in urls {
                let url = Url::parse(raw).map_err(|e| {
                    RuleMergeError::ConfigurationError(format!(
                        "分类 [{}] 的 URL [{}] 无法解析：{}",
                        category, raw, e
                    ))
                })?;
                if !matches!(url.scheme(), "http" | "https") {
                    return Err(RuleMergeError::ConfigurationError(format!(
                        "分类 [{}] 的 URL [{}] 协议不受支持：{}",
                        category,
                        raw,
                        url.scheme()
                    )));
                }
            }
        }
        Ok(())
    }
}

fn is_file_safe(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// 配置文件结构
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    routing_domain: Option<BTreeMap<String, Option<Vec<String>>>>,
    #[serde(default)]
    options: Option<ConfigOptions>,
}

/// 配置文件中的可选项，缺省取 GlobalConfig::default()
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigOptions {
    output_dir: Option<PathBuf>,
    codec_binary: Option<PathBuf>,
    http_timeout_secs: Option<u64>,
    max_concurrent_fetches: Option<usize>,
    retention: Option<RetentionPolicy>,
    on_source_error: Option<SourceFailurePolicy>,
    artifact_prefix: Option<String>,
}

/// 配置管理器
pub struct ConfigManager;

impl ConfigManager {
    /// 获取默认配置
    pub fn get_default() -> GlobalConfig {
        GlobalConfig::default()
    }

    /// 自定义配置
    pub fn custom() -> CustomConfigBuilder {
        CustomConfigBuilder::new()
    }

    /// 从配置文件加载
    pub fn load_file(path: impl AsRef<Path>) -> MergeResult<GlobalConfig> {
        let path = path.as_ref();
        let content = std::fs::read(path).map_err(|e| {
            RuleMergeError::ConfigurationError(format!("无法读取配置文件 {}：{}", path.display(), e))
        })?;
        let config = Self::parse(&content).map_err(|e| match e {
            RuleMergeError::ConfigurationError(msg) => {
                RuleMergeError::ConfigurationError(format!("{}：{}", path.display(), msg))
            }
            other => other,
        })?;
        debug!(
            "配置加载完成：{}，分类 {} 个",
            path.display(),
            config.categories.len()
        );
        Ok(config)
    }

    /// 解析配置文档
    pub fn parse(content: &[u8]) -> MergeResult<GlobalConfig> {
        let file: ConfigFile = serde_json::from_slice(content)
            .map_err(|e| RuleMergeError::ConfigurationError(format!("配置文档格式错误：{}", e)))?;

        let mut builder = CustomConfigBuilder::new();
        for (category, urls) in file.routing_domain.unwrap_or_default() {
            builder = builder.category(category, urls.unwrap_or_default());
        }

        if let Some(opts) = file.options {
            if let Some(v) = opts.output_dir {
                builder = builder.output_dir(v);
            }
            if let Some(v) = opts.codec_binary {
                builder = builder.codec_binary(v);
            }
            if let Some(v) = opts.http_timeout_secs {
                builder = builder.http_timeout(v);
            }
            if let Some(v) = opts.max_concurrent_fetches {
                builder = builder.max_concurrent_fetches(v);
            }
            if let Some(v) = opts.retention {
                builder = builder.retention(v);
            }
            if let Some(v) = opts.on_source_error {
                builder = builder.on_source_error(v);
            }
            if let Some(v) = opts.artifact_prefix {
                builder = builder.artifact_prefix(v);
            }
        }

        let config = builder.build();
        config.validate()?;
        Ok(config)
    }
}

/// 配置构建器（便于自定义配置）
#[derive(Debug, Clone)]
pub struct CustomConfigBuilder {
    config: GlobalConfig,
}

impl Default for CustomConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CustomConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: GlobalConfig::default(),
        }
    }

    /// 基于已有配置继续修改（命令行覆盖文件配置）
    pub fn from_config(config: GlobalConfig) -> Self {
        Self { config }
    }

    /// 设置分类的规则源（覆盖同名分类）
    pub fn category(mut self, name: impl Into<String>, urls: Vec<String>) -> Self {
        self.config.categories.insert(name.into(), urls);
        self
    }

    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output_dir = path.into();
        self
    }

    pub fn codec_binary(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.codec_binary = path.into();
        self
    }

    pub fn http_timeout(mut self, timeout: u64) -> Self {
        self.config.http_timeout = timeout;
        self
    }

    pub fn max_concurrent_fetches(mut self, limit: usize) -> Self {
        self.config.max_concurrent_fetches = limit;
        self
    }

    pub fn retention(mut self, policy: RetentionPolicy) -> Self {
        self.config.retention = policy;
        self
    }

    pub fn on_source_error(mut self, policy: SourceFailurePolicy) -> Self {
        self.config.on_source_error = policy;
        self
    }

    pub fn artifact_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.artifact_prefix = prefix.into();
        self
    }

    pub fn build(self) -> GlobalConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_routing_domain() {
        let doc = br#"{
            "routing_domain": {
                "direct": ["https://example.com/cn.srs"],
                "proxy": ["https://example.com/gfw.srs", "https://example.com/ads.srs"]
            }
        }"#;
        let config = ConfigManager::parse(doc).unwrap();
        assert_eq!(config.categories["direct"].len(), 1);
        assert_eq!(config.categories["proxy"].len(), 2);
        assert_eq!(config.retention, RetentionPolicy::Overwrite);
        assert_eq!(config.on_source_error, SourceFailurePolicy::Abort);
    }

    #[test]
    fn test_missing_categories_default_to_empty() {
        // 测试场景：routing_domain 缺失或只有部分分类
        let config = ConfigManager::parse(b"{}").unwrap();
        assert_eq!(config.categories.len(), 2);
        assert!(config.categories.values().all(Vec::is_empty));

        let config = ConfigManager::parse(br#"{"routing_domain":{"proxy":null}}"#).unwrap();
        assert!(config.categories["direct"].is_empty());
        assert!(config.categories["proxy"].is_empty());
    }

    #[test]
    fn test_extra_category_is_kept() {
        let config =
            ConfigManager::parse(br#"{"routing_domain":{"reject":["http://example.com/ads.srs"]}}"#)
                .unwrap();
        assert_eq!(config.categories.len(), 3);
        assert_eq!(config.categories["reject"].len(), 1);
    }

    #[test]
    fn test_options_block() {
        let doc = br#"{
            "routing_domain": {},
            "options": {
                "output_dir": "out",
                "retention": "unique",
                "on_source_error": "skip",
                "max_concurrent_fetches": 8,
                "http_timeout_secs": 5
            }
        }"#;
        let config = ConfigManager::parse(doc).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.retention, RetentionPolicy::Unique);
        assert_eq!(config.on_source_error, SourceFailurePolicy::Skip);
        assert_eq!(config.max_concurrent_fetches, 8);
        assert_eq!(config.http_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_malformed_documents_are_configuration_errors() {
        let cases: [&[u8]; 6] = [
            b"not json",
            b"42",
            br#"{"routing_domain":["a"]}"#,
            br#"{"routing_domain":{"direct":[1]}}"#,
            br#"{"routing_domain":{"direct":["not a url"]}}"#,
            br#"{"routing_domain":{"direct":["ftp://example.com/a.srs"]}}"#,
        ];
        for doc in cases {
            let err = ConfigManager::parse(doc).unwrap_err();
            assert!(
                matches!(err, RuleMergeError::ConfigurationError(_)),
                "unexpected: {err:?}"
            );
        }
    }

    #[test]
    fn test_unsafe_category_name_rejected() {
        let err = ConfigManager::parse(br#"{"routing_domain":{"../etc":[]}}"#).unwrap_err();
        assert!(matches!(err, RuleMergeError::ConfigurationError(_)));
    }

    #[test]
    fn test_unknown_option_rejected() {
        let err = ConfigManager::parse(br#"{"options":{"retension":"unique"}}"#).unwrap_err();
        assert!(matches!(err, RuleMergeError::ConfigurationError(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = ConfigManager::load_file("/nonexistent/rules.json").unwrap_err();
        assert!(matches!(err, RuleMergeError::ConfigurationError(_)));
    }

    #[test]
    fn test_builder_overrides() {
        let config = ConfigManager::custom()
            .category("direct", vec!["https://example.com/a.srs".to_string()])
            .output_dir("dist")
            .max_concurrent_fetches(0)
            .build();
        assert_eq!(config.output_dir, PathBuf::from("dist"));
        assert!(config.validate().is_err());
    }
}
