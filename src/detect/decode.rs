// 该文件是 Shanan Tally （山南计数） 项目的一部分。
// src/detect/decode.rs - 模型输出解码
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

use tracing::debug;

use crate::{
  config::CONFIDENCE_THRESHOLD,
  detect::DetectItem,
  model::{BOX_PARAMS, LayoutError, RawOutput},
};

#[derive(Debug, Clone, PartialEq)]
pub struct Decoder {
  confidence_threshold: f32,
  num_classes: Option<usize>,
}

impl Default for Decoder {
  fn default() -> Self {
    Self {
      confidence_threshold: CONFIDENCE_THRESHOLD,
      num_classes: None,
    }
  }
}

impl Decoder {
  pub fn new(confidence_threshold: f32, num_classes: Option<usize>) -> Self {
    Self {
      confidence_threshold,
      num_classes,
    }
  }

  /// 过滤低置信度候选，并把框转换为角点形式
  ///
  /// 没有候选通过阈值时返回空列表。
  pub fn decode(&self, raw: &RawOutput) -> Result<Vec<DetectItem>, LayoutError> {
    let attrs = match self.num_classes {
      Some(classes) => classes + BOX_PARAMS,
      None => raw.guess_attributes()?,
    };
    let rows = raw.candidates(attrs)?;

    let mut items = Vec::new();
    for row in 0..rows.len() {
      let (score, label) = rows.scores(row).enumerate().fold(
        (f32::NEG_INFINITY, 0usize),
        |(best, best_idx), (idx, score)| {
          if score > best {
            (score, idx)
          } else {
            (best, best_idx)
          }
        },
      );

      if score < self.confidence_threshold {
        continue;
      }

      items.push(DetectItem::from_center(
        label as u32,
        score,
        rows.center_box(row),
      ));
    }

    debug!(
      "解码: {} 个候选中 {} 个通过置信度阈值 {}",
      rows.len(),
      items.len(),
      self.confidence_threshold
    );

    Ok(items)
  }
}
