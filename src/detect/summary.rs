// 该文件是 Shanan Tally （山南计数） 项目的一部分。
// src/detect/summary.rs - 类别标签表与检测计数
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::{collections::BTreeMap, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, detect::DetectItem};

const COCO_LABELS: &str = include_str!("../../labels/coco.toml");

#[derive(Error, Debug)]
pub enum LabelTableError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("标签文件格式错误: {0}")]
  ParseError(#[from] toml::de::Error),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("类别索引 {label} 不在标签表中 (共 {table_len} 个类别)")]
pub struct UnknownLabelError {
  pub label: u32,
  pub table_len: usize,
}

/// 类别索引到名称的只读映射，启动时加载一次
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelTable {
  labels: Vec<String>,
}

impl LabelTable {
  pub fn new<S: Into<String>>(labels: impl IntoIterator<Item = S>) -> Self {
    Self {
      labels: labels.into_iter().map(Into::into).collect(),
    }
  }

  /// 内置的 COCO 80 类标签表
  pub fn coco() -> Self {
    Self::from_toml_str(COCO_LABELS).expect("无法解析内置的 COCO 标签表")
  }

  pub fn from_toml_str(content: &str) -> Result<Self, LabelTableError> {
    Ok(toml::from_str(content)?)
  }

  pub fn from_path(path: impl AsRef<Path>) -> Result<Self, LabelTableError> {
    let path = path.as_ref();
    info!("加载标签文件: {}", path.display());
    let content = std::fs::read_to_string(path)?;
    let table = Self::from_toml_str(&content)?;
    debug!("标签数量: {}", table.len());
    Ok(table)
  }

  pub fn get(&self, label: u32) -> Option<&str> {
    self.labels.get(label as usize).map(String::as_str)
  }

  pub fn len(&self) -> usize {
    self.labels.len()
  }

  pub fn is_empty(&self) -> bool {
    self.labels.is_empty()
  }
}

impl FromUrlWithScheme for LabelTable {
  const SCHEME: &'static str = "toml";
}

impl FromUrl for LabelTable {
  type Error = LabelTableError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(LabelTableError::SchemeMismatch(format!(
        "期望 '{}', 实际 '{}'",
        Self::SCHEME,
        url.scheme()
      )));
    }
    Self::from_path(url.path())
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelCount {
  pub name: String,
  pub quantity: usize,
}

/// 输出格式 `{"detections": [{"name": ..., "quantity": ...}]}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryResponse {
  pub detections: Vec<LabelCount>,
}

/// 类别名到数量的映射，按名称排序
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(into = "SummaryResponse")]
pub struct DetectionSummary {
  counts: BTreeMap<String, usize>,
}

impl DetectionSummary {
  pub fn get(&self, name: &str) -> Option<usize> {
    self.counts.get(name).copied()
  }

  /// 不同类别的个数
  pub fn len(&self) -> usize {
    self.counts.len()
  }

  pub fn is_empty(&self) -> bool {
    self.counts.is_empty()
  }

  /// 所有类别的数量之和
  pub fn total(&self) -> usize {
    self.counts.values().sum()
  }
}

impl From<DetectionSummary> for SummaryResponse {
  fn from(summary: DetectionSummary) -> Self {
    SummaryResponse {
      detections: summary
        .counts
        .into_iter()
        .map(|(name, quantity)| LabelCount { name, quantity })
        .collect(),
    }
  }
}

/// 统计每个类别的检测数量
///
/// 标签表中没有的类别索引视为配置错误，直接返回错误。
pub fn summarize(
  items: &[DetectItem],
  table: &LabelTable,
) -> Result<DetectionSummary, UnknownLabelError> {
  let mut counts = BTreeMap::new();
  for item in items {
    let name = table.get(item.label).ok_or_else(|| {
      error!("模型输出了未知类别: {}", item.label);
      UnknownLabelError {
        label: item.label,
        table_len: table.len(),
      }
    })?;
    *counts.entry(name.to_string()).or_insert(0) += 1;
  }

  Ok(DetectionSummary { counts })
}

#[cfg(test)]
mod tests {
  use std::io::Write;

  use super::*;

  fn item(label: u32) -> DetectItem {
    DetectItem {
      label,
      score: 0.9,
      bbox: [0.0, 0.0, 1.0, 1.0],
    }
  }

  #[test]
  fn counts_sum_to_number_of_boxes() {
    let table = LabelTable::new(["cat", "dog", "bird"]);
    let items = [item(1), item(0), item(1), item(2), item(1)];
    let summary = summarize(&items, &table).unwrap();

    assert_eq!(summary.total(), items.len());
    assert_eq!(summary.len(), 3);
    assert_eq!(summary.get("dog"), Some(3));
    assert_eq!(summary.get("cat"), Some(1));
    assert_eq!(summary.get("fish"), None);
  }

  #[test]
  fn unknown_label_is_an_error() {
    let table = LabelTable::new(["cat"]);
    let err = summarize(&[item(0), item(4)], &table).unwrap_err();
    assert_eq!(
      err,
      UnknownLabelError {
        label: 4,
        table_len: 1
      }
    );
  }

  #[test]
  fn serializes_sorted_by_name() {
    let table = LabelTable::new(["zebra", "apple"]);
    let summary = summarize(&[item(0), item(1), item(0)], &table).unwrap();
    let json = serde_json::to_string(&summary).unwrap();
    assert_eq!(
      json,
      r#"{"detections":[{"name":"apple","quantity":1},{"name":"zebra","quantity":2}]}"#
    );
  }

  #[test]
  fn empty_summary_keeps_detections_field() {
    let summary = summarize(&[], &LabelTable::coco()).unwrap();
    assert!(summary.is_empty());
    assert_eq!(
      serde_json::to_value(&summary).unwrap(),
      serde_json::json!({ "detections": [] })
    );
  }

  #[test]
  fn builtin_coco_table() {
    let table = LabelTable::coco();
    assert_eq!(table.len(), 80);
    assert_eq!(table.get(0), Some("person"));
    assert_eq!(table.get(79), Some("toothbrush"));
    assert_eq!(table.get(80), None);
  }

  #[test]
  fn loads_table_from_url() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(file, r#"labels = ["ripe", "unripe"]"#).unwrap();
    let url = Url::from_file_path(file.path()).unwrap();
    let url = Url::parse(&format!("toml://{}", url.path())).unwrap();

    let table = LabelTable::from_url(&url).unwrap();
    assert_eq!(table, LabelTable::new(["ripe", "unripe"]));
  }

  #[test]
  fn rejects_wrong_scheme() {
    let url = Url::parse("file:///tmp/labels.toml").unwrap();
    assert!(matches!(
      LabelTable::from_url(&url),
      Err(LabelTableError::SchemeMismatch(_))
    ));
  }
}
