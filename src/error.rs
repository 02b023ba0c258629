//! 全局错误类型定义

use serde_json::Error as SerdeJsonError;
use std::io::Error as IoError;
use thiserror::Error;
use url::ParseError as UrlParseError;

#[derive(Error, Debug)]
pub enum RuleMergeError {
    // 拉取相关错误
    #[error("规则集拉取失败 [{url}]：{reason}")]
    FetchError { url: String, reason: String },

    // 编解码相关错误
    #[error("规则集反编译失败：{0}")]
    DecodeError(String),
    #[error("规则集编译失败：{0}")]
    EncodeError(String),

    // 配置相关错误
    #[error("配置无效：{0}")]
    ConfigurationError(String),

    // 产物相关错误
    #[error("产物写入失败：{0}")]
    ArtifactError(String),

    // 网络相关错误
    #[error("网络请求失败：{0}")]
    HttpError(#[from] reqwest::Error),

    // 序列化/反序列化错误
    #[error("JSON解析失败：{0}")]
    JsonError(#[from] SerdeJsonError),

    // 基础错误
    #[error("IO操作失败：{0}")]
    IoError(#[from] IoError),
    #[error("URL解析失败：{0}")]
    UrlError(#[from] UrlParseError),
}

impl RuleMergeError {
    /// 构造带 URL 上下文的拉取错误
    pub fn fetch(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::FetchError {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// 错误所属的流水线阶段，用于命令行诊断输出
    pub fn stage(&self) -> &'static str {
        match self {
            Self::FetchError { .. } | Self::HttpError(_) => "fetch",
            Self::DecodeError(_) => "decode",
            Self::EncodeError(_) => "encode",
            Self::ConfigurationError(_) | Self::UrlError(_) => "config",
            Self::ArtifactError(_) | Self::IoError(_) => "persist",
            Self::JsonError(_) => "serialize",
        }
    }
}

// 全局Result类型
pub type MergeResult<T> = Result<T, RuleMergeError>;
