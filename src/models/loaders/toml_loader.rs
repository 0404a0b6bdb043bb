use crate::error::{AppResult, ConfigError};
use crate::models::labels::LabelCatalog;
use std::path::Path;
use tokio::fs;

/// 从 TOML 文件加载标签目录
///
/// 文件中缺失的条目由内置英文目录补齐。
pub async fn load_label_catalog(toml_file_path: &Path) -> AppResult<LabelCatalog> {
    let path = toml_file_path.display().to_string();

    let content = fs::read_to_string(toml_file_path)
        .await
        .map_err(|source| ConfigError::LabelsReadFailed {
            path: path.clone(),
            source,
        })?;

    let catalog = parse_label_catalog(&content).map_err(|source| ConfigError::TomlParseFailed {
        path: path.clone(),
        source,
    })?;

    tracing::info!("已加载标签文件: {} (语言: {})", path, catalog.locale);

    Ok(catalog)
}

/// 解析 TOML 文本为标签目录
pub fn parse_label_catalog(content: &str) -> Result<LabelCatalog, toml::de::Error> {
    let catalog: LabelCatalog = toml::from_str(content)?;
    Ok(catalog.merged_over(&LabelCatalog::english()))
}

/// 按配置加载标签目录：未配置文件时使用内置目录
pub async fn load_configured_catalog(labels_file: Option<&str>) -> AppResult<LabelCatalog> {
    match labels_file {
        Some(path) => load_label_catalog(Path::new(path)).await,
        None => {
            tracing::debug!("未配置标签文件，使用内置英文标签");
            Ok(LabelCatalog::english())
        }
    }
}
