//! 远程规则集拉取
//! 单次 GET，不做重试；非 2xx 状态视为失败

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::error::{MergeResult, RuleMergeError};

/// 请求 User-Agent
pub const USER_AGENT: &str = concat!("srs-merger/", env!("CARGO_PKG_VERSION"));

/// 规则源拉取能力
#[async_trait]
pub trait SourceFetch: Send + Sync {
    /// 拉取 URL 对应的完整响应体
    async fn fetch(&self, url: &str) -> MergeResult<Vec<u8>>;
}

/// 基于 reqwest 的 HTTP 拉取器
#[derive(Debug, Clone)]
pub struct HttpSourceFetcher {
    client: Client,
}

impl HttpSourceFetcher {
    /// 创建拉取器（客户端只构建一次，连接可复用）
    pub fn new(timeout: Duration) -> MergeResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client })
    }

    /// 使用外部构建的客户端
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SourceFetch for HttpSourceFetcher {
    async fn fetch(&self, url: &str) -> MergeResult<Vec<u8>> {
        debug!("开始拉取规则集：{}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| RuleMergeError::fetch(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RuleMergeError::fetch(url, format!("HTTP {}", status)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| RuleMergeError::fetch(url, format!("读取响应体失败：{}", e)))?;

        debug!("规则集拉取完成：{}，{} 字节", url, bytes.len());
        Ok(bytes.to_vec())
    }
}
