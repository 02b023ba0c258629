//! 配置文件 -> 流水线：空分类、清空策略

use std::path::Path;

use async_trait::async_trait;
use serde_json::json;

use srs_merger::{
    ConfigManager, CustomConfigBuilder, MemoryCodec, MergeResult, Pipeline, RetentionPolicy,
    RuleMergeError, SourceFetch,
};

/// 不应被调用的拉取器
struct NoNetwork;

#[async_trait]
impl SourceFetch for NoNetwork {
    async fn fetch(&self, url: &str) -> MergeResult<Vec<u8>> {
        Err(RuleMergeError::fetch(url, "network disabled in tests"))
    }
}

fn write_config(dir: &Path, body: serde_json::Value) -> std::path::PathBuf {
    let path = dir.join("rules.json");
    std::fs::write(&path, serde_json::to_vec_pretty(&body).unwrap()).unwrap();
    path
}

#[tokio::test]
async fn test_empty_categories_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("rule-set");
    let config_path = write_config(
        dir.path(),
        json!({
            "routing_domain": {"direct": [], "proxy": []},
            "options": {"output_dir": out}
        }),
    );

    let config = ConfigManager::load_file(&config_path).unwrap();
    let pipeline = Pipeline::new(config, NoNetwork, MemoryCodec::new()).unwrap();
    let report = pipeline.run().await.unwrap();
    assert!(report.is_success());

    for name in ["merged-domain-direct", "merged-domain-proxy"] {
        let document: serde_json::Value =
            serde_json::from_slice(&std::fs::read(out.join(format!("{name}.json"))).unwrap()).unwrap();
        assert_eq!(document, json!({"version": 3, "rules": []}));
        assert!(out.join(format!("{name}.srs")).exists());
    }
}

#[tokio::test]
async fn test_purge_removes_stale_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("rule-set");
    std::fs::create_dir_all(&out).unwrap();
    std::fs::write(out.join("merged-domain-direct-old.json"), b"{}").unwrap();

    let config = CustomConfigBuilder::new()
        .output_dir(&out)
        .retention(RetentionPolicy::Purge)
        .build();
    let pipeline = Pipeline::new(config, NoNetwork, MemoryCodec::new()).unwrap();
    assert!(pipeline.run().await.unwrap().is_success());

    let mut names: Vec<String> = std::fs::read_dir(&out)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(
        names,
        vec![
            "merged-domain-direct.json",
            "merged-domain-direct.srs",
            "merged-domain-proxy.json",
            "merged-domain-proxy.srs",
        ]
    );
}

#[tokio::test]
async fn test_source_failure_with_network_disabled() {
    let dir = tempfile::tempdir().unwrap();
    let config = CustomConfigBuilder::new()
        .output_dir(dir.path())
        .category("proxy", vec!["https://example.com/gfw.srs".to_string()])
        .build();
    let pipeline = Pipeline::new(config, NoNetwork, MemoryCodec::new()).unwrap();
    let report = pipeline.run().await.unwrap();

    assert!(report.category("direct").unwrap().is_success());
    let (category, err) = report.failures().next().unwrap();
    assert_eq!(category, "proxy");
    assert_eq!(err.stage(), "fetch");
}
