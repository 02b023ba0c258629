//! 运行结果汇总

use crate::error::RuleMergeError;
use crate::output::CategoryArtifact;

/// 被跳过的规则源（仅 Skip 策略下出现）
#[derive(Debug)]
pub struct SkippedSource {
    pub url: String,
    pub error: RuleMergeError,
}

/// 分类成功时的统计
#[derive(Debug)]
pub struct CategorySummary {
    pub artifact: CategoryArtifact,
    pub loaded_sources: usize,
    pub skipped_sources: Vec<SkippedSource>,
    pub field_count: usize,
    pub value_count: usize,
}

/// 单个分类的处理结果
#[derive(Debug)]
pub struct CategoryReport {
    pub category: String,
    pub outcome: Result<CategorySummary, RuleMergeError>,
}

impl CategoryReport {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// 整次运行的结果
#[derive(Debug, Default)]
pub struct RunReport {
    pub categories: Vec<CategoryReport>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.categories.iter().all(CategoryReport::is_success)
    }

    /// 按分类名查找
    pub fn category(&self, name: &str) -> Option<&CategoryReport> {
        self.categories.iter().find(|r| r.category == name)
    }

    /// 失败的分类及其错误
    pub fn failures(&self) -> impl Iterator<Item = (&str, &RuleMergeError)> {
        self.categories.iter().filter_map(|r| match &r.outcome {
            Ok(_) => None,
            Err(e) => Some((r.category.as_str(), e)),
        })
    }
}
