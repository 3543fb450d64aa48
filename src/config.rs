// 该文件是 Shanan Tally （山南计数） 项目的一部分。
// src/config.rs - 流水线静态配置
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

use image::Rgb;

use crate::detect::SuppressScope;

/// 模型输入边长（正方形）
pub const TARGET_SIZE: u32 = 640;
/// 补边颜色
pub const PAD_COLOR: Rgb<u8> = Rgb([128, 128, 128]);
pub const CONFIDENCE_THRESHOLD: f32 = 0.5;
pub const OVERLAP_THRESHOLD: f32 = 0.5;

/// 流水线可调参数，默认值与模型训练时的设置一致
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
  pub pad_color: Rgb<u8>,
  pub confidence_threshold: f32,
  pub overlap_threshold: f32,
  /// 类别数量；为 `None` 时根据模型输出形状推断
  pub num_classes: Option<usize>,
  pub suppress_scope: SuppressScope,
}

impl Default for PipelineConfig {
  fn default() -> Self {
    Self {
      pad_color: PAD_COLOR,
      confidence_threshold: CONFIDENCE_THRESHOLD,
      overlap_threshold: OVERLAP_THRESHOLD,
      num_classes: None,
      suppress_scope: SuppressScope::Global,
    }
  }
}

impl PipelineConfig {
  pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
    self.confidence_threshold = threshold;
    self
  }

  pub fn with_overlap_threshold(mut self, threshold: f32) -> Self {
    self.overlap_threshold = threshold;
    self
  }

  pub fn with_num_classes(mut self, num_classes: Option<usize>) -> Self {
    self.num_classes = num_classes;
    self
  }

  pub fn with_suppress_scope(mut self, scope: SuppressScope) -> Self {
    self.suppress_scope = scope;
    self
  }
}
