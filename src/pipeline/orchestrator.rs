//! 流水线编排器
//! 分类之间相互独立、并发执行；分类内规则源按上限并发拉取解码，
//! 全部完成后合并一次、编码一次、落盘一次

use futures::future::join_all;
use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, error, info, warn};

use super::SourceFailurePolicy;
use super::report::{CategoryReport, CategorySummary, RunReport, SkippedSource};
use crate::codec::{RuleSetCodec, SingBoxCodec};
use crate::config::GlobalConfig;
use crate::error::{MergeResult, RuleMergeError};
use crate::fetcher::{HttpSourceFetcher, SourceFetch};
use crate::output::ArtifactStore;
use crate::rule::decoder::RuleDecoder;
use crate::rule::encoder::RuleEncoder;
use crate::rule::merger::RuleMerger;
use crate::rule::model::RuleRecordSet;

/// 规则集合并流水线
pub struct Pipeline<F: SourceFetch, C: RuleSetCodec> {
    config: GlobalConfig,
    fetcher: F,
    codec: C,
    store: ArtifactStore,
}

impl Pipeline<HttpSourceFetcher, SingBoxCodec> {
    /// 使用 HTTP 拉取器与 sing-box 编解码器构建
    pub fn from_config(config: GlobalConfig) -> MergeResult<Self> {
        let fetcher = HttpSourceFetcher::new(config.http_timeout())?;
        let codec = SingBoxCodec::new(&config.codec_binary);
        Self::new(config, fetcher, codec)
    }
}

impl<F: SourceFetch, C: RuleSetCodec> Pipeline<F, C> {
    pub fn new(config: GlobalConfig, fetcher: F, codec: C) -> MergeResult<Self> {
        config.validate()?;
        let store = ArtifactStore::from_config(&config);
        Ok(Self {
            config,
            fetcher,
            codec,
            store,
        })
    }

    pub fn config(&self) -> &GlobalConfig {
        &self.config
    }

    /// 处理全部分类；单个分类失败只记录在报告中
    /// 仅当输出目录无法准备时整体失败
    pub async fn run(&self) -> MergeResult<RunReport> {
        self.store.prepare().await?;
        info!(
            "开始处理 {} 个分类，输出目录 {}，保留策略 {}，失败策略 {}",
            self.config.categories.len(),
            self.store.output_dir().display(),
            self.store.retention(),
            self.config.on_source_error
        );

        let tasks = self
            .config
            .categories
            .iter()
            .map(|(category, urls)| async move {
                let outcome = self.run_category(category, urls).await;
                match &outcome {
                    Ok(summary) => info!(
                        "分类 [{}] 完成：源 {} 个，跳过 {} 个，字段 {} 个，取值 {} 个",
                        category,
                        summary.loaded_sources,
                        summary.skipped_sources.len(),
                        summary.field_count,
                        summary.value_count
                    ),
                    Err(e) => error!("分类 [{}] 失败（{}阶段）：{}", category, e.stage(), e),
                }
                CategoryReport {
                    category: category.clone(),
                    outcome,
                }
            });

        let categories = join_all(tasks).await;
        Ok(RunReport { categories })
    }

    /// 处理单个分类
    pub async fn run_category(&self, category: &str, urls: &[String]) -> MergeResult<CategorySummary> {
        debug!("分类 [{}]：{} 个规则源", category, urls.len());

        let (record_sets, skipped_sources) = self.load_sources(category, urls).await?;

        let merged = RuleMerger::merge(record_sets.iter());
        let field_count = merged.len();
        let value_count = merged.value_count();

        let encoded = RuleEncoder::new(&self.codec)
            .encode(merged)
            .await
            .map_err(|e| with_context(e, &format!("分类 {}", category)))?;
        let artifact = self.store.persist(category, &encoded).await?;

        Ok(CategorySummary {
            artifact,
            loaded_sources: record_sets.len(),
            skipped_sources,
            field_count,
            value_count,
        })
    }

    /// 并发拉取并解码分类内全部规则源
    async fn load_sources(
        &self,
        category: &str,
        urls: &[String],
    ) -> MergeResult<(Vec<RuleRecordSet>, Vec<SkippedSource>)> {
        let limit = self.config.max_concurrent_fetches.max(1);
        let loads = stream::iter(urls)
            .map(|url| async move { (url, self.load_source(url).await) })
            .buffer_unordered(limit);

        match self.config.on_source_error {
            SourceFailurePolicy::Abort => {
                // 首个错误即返回，drop 流会取消同分类内仍在进行的拉取
                let record_sets = loads
                    .map(|(_, result)| result)
                    .try_collect::<Vec<_>>()
                    .await?;
                Ok((record_sets, Vec::new()))
            }
            SourceFailurePolicy::Skip => {
                let results = loads.collect::<Vec<_>>().await;
                let mut record_sets = Vec::with_capacity(results.len());
                let mut skipped = Vec::new();
                for (url, result) in results {
                    match result {
                        Ok(set) => record_sets.push(set),
                        Err(error) => {
                            warn!("分类 [{}] 跳过规则源 {}：{}", category, url, error);
                            skipped.push(SkippedSource {
                                url: url.clone(),
                                error,
                            });
                        }
                    }
                }
                if record_sets.is_empty() && !skipped.is_empty() {
                    // 全部源失败：以第一个错误作为分类错误
                    return Err(skipped.swap_remove(0).error);
                }
                Ok((record_sets, skipped))
            }
        }
    }

    /// 拉取并解码单个规则源
    async fn load_source(&self, url: &str) -> MergeResult<RuleRecordSet> {
        let raw = self.fetcher.fetch(url).await?;
        let record_set = RuleDecoder::new(&self.codec)
            .decode(&raw)
            .await
            .map_err(|e| with_context(e, url))?;
        debug!("规则源 {} 解码得到 {} 条记录", url, record_set.len());
        Ok(record_set)
    }
}

/// 为编解码错误补充 URL / 分类上下文
fn with_context(err: RuleMergeError, context: &str) -> RuleMergeError {
    match err {
        RuleMergeError::DecodeError(msg) => RuleMergeError::DecodeError(format!("{}：{}", context, msg)),
        RuleMergeError::EncodeError(msg) => RuleMergeError::EncodeError(format!("{}：{}", context, msg)),
        other => other,
    }
}
