// 该文件是 Shanan Tally （山南计数） 项目的一部分。
// src/detect.rs - 检测结果与后处理
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

/// 单个检测框，坐标位于模型输入（补边并缩放后的正方形）空间
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectItem {
  pub label: u32,
  pub score: f32,
  pub bbox: [f32; 4], // [x_min, y_min, x_max, y_max]
}

impl DetectItem {
  /// 由中心点形式 `(cx, cy, w, h)` 构造
  pub fn from_center(label: u32, score: f32, [cx, cy, w, h]: [f32; 4]) -> Self {
    Self {
      label,
      score,
      bbox: [cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0],
    }
  }

  pub fn x1(&self) -> f32 {
    self.bbox[0]
  }

  pub fn y1(&self) -> f32 {
    self.bbox[1]
  }

  pub fn x2(&self) -> f32 {
    self.bbox[2]
  }

  pub fn y2(&self) -> f32 {
    self.bbox[3]
  }

  /// 按像素计数约定的面积 `(x2 - x1 + 1) * (y2 - y1 + 1)`，负边长按 0 计
  pub fn pixel_area(&self) -> f32 {
    let w = (self.x2() - self.x1() + 1.0).max(0.0);
    let h = (self.y2() - self.y1() + 1.0).max(0.0);
    w * h
  }
}

/// 去重后的检测集合
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectResult {
  pub items: Box<[DetectItem]>,
}

impl DetectResult {
  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }
}

impl From<Vec<DetectItem>> for DetectResult {
  fn from(items: Vec<DetectItem>) -> Self {
    Self {
      items: items.into_boxed_slice(),
    }
  }
}

mod decode;
mod summary;
mod suppress;

pub use self::decode::Decoder;
pub use self::summary::{
  DetectionSummary, LabelCount, LabelTable, LabelTableError, SummaryResponse, UnknownLabelError,
  summarize,
};
pub use self::suppress::{
  BottomEdge, HighestScore, PickOrder, SuppressScope, Suppressor, overlap_over_area,
};
