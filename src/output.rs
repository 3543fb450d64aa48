// 该文件是 Shanan Tally （山南计数） 项目的一部分。
// src/output.rs - 检测结果输出
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

use std::{io::Write, path::PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme};

pub trait Render<Output>: Sized {
  type Error;
  fn render_result(&self, result: &Output) -> Result<(), Self::Error>;
}

#[derive(Error, Debug)]
pub enum OutputError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 序列化错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum JsonTarget {
  File(PathBuf),
  Stdout,
}

/// 以 JSON 形式输出结果
///
/// - `json:///path/to/result.json` 写入文件
/// - `stdout:` 打印到标准输出
///
/// 附加查询参数 `?pretty` 时输出带缩进的 JSON。
#[derive(Debug, Clone)]
pub struct JsonOutput {
  target: JsonTarget,
  pretty: bool,
}

const STDOUT_SCHEME: &str = "stdout";

impl FromUrlWithScheme for JsonOutput {
  const SCHEME: &'static str = "json";
}

impl FromUrl for JsonOutput {
  type Error = OutputError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    let target = match uri.scheme() {
      Self::SCHEME => JsonTarget::File(PathBuf::from(uri.path())),
      STDOUT_SCHEME => JsonTarget::Stdout,
      other => {
        return Err(OutputError::SchemeMismatch(format!(
          "期望输出方式 '{}' 或 '{}', 实际输出方式 '{}'",
          Self::SCHEME,
          STDOUT_SCHEME,
          other
        )));
      }
    };
    let pretty = uri.query_pairs().any(|(k, _)| k == "pretty");

    Ok(JsonOutput { target, pretty })
  }
}

impl JsonOutput {
  fn to_json<T: Serialize>(&self, result: &T) -> Result<String, OutputError> {
    let json = if self.pretty {
      serde_json::to_string_pretty(result)?
    } else {
      serde_json::to_string(result)?
    };
    Ok(json)
  }
}

impl<T: Serialize> Render<T> for JsonOutput {
  type Error = OutputError;

  fn render_result(&self, result: &T) -> Result<(), Self::Error> {
    let json = self.to_json(result)?;
    match &self.target {
      JsonTarget::File(path) => {
        if let Some(parent) = path.parent()
          && !parent.as_os_str().is_empty()
        {
          std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json + "\n")?;
        info!("保存结果到文件: {}", path.display());
      }
      JsonTarget::Stdout => {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{}", json)?;
      }
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::detect::{DetectItem, LabelTable, summarize};

  #[test]
  fn writes_summary_to_nested_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out").join("result.json");
    let url = Url::parse(&format!("json://{}", path.display())).unwrap();

    let table = LabelTable::new(["leaf"]);
    let item = DetectItem {
      label: 0,
      score: 0.8,
      bbox: [0.0, 0.0, 4.0, 4.0],
    };
    let summary = summarize(&[item, item], &table).unwrap();

    JsonOutput::from_url(&url)
      .unwrap()
      .render_result(&summary)
      .unwrap();

    let written = std::fs::read_to_string(&path).unwrap();
    assert_eq!(
      written.trim_end(),
      r#"{"detections":[{"name":"leaf","quantity":2}]}"#
    );
  }

  #[test]
  fn parses_stdout_and_pretty_flag() {
    let output = JsonOutput::from_url(&Url::parse("stdout:?pretty").unwrap()).unwrap();
    assert_eq!(output.target, JsonTarget::Stdout);
    assert!(output.pretty);
  }

  #[test]
  fn rejects_unknown_scheme() {
    let url = Url::parse("rtsp://camera/stream").unwrap();
    assert!(matches!(
      JsonOutput::from_url(&url),
      Err(OutputError::SchemeMismatch(_))
    ));
  }
}
