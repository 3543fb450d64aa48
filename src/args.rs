// 该文件是 Shanan Tally （山南计数） 项目的一部分。
// src/args.rs - 项目参数配置
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

use clap::Parser;
use url::Url;

use shanan_tally::{
  config::{CONFIDENCE_THRESHOLD, OVERLAP_THRESHOLD, PipelineConfig},
  detect::SuppressScope,
};

/// Shanan Tally 项目参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// ONNX 模型路径，例如 onnx:///opt/models/model.onnx
  #[arg(long, value_name = "MODEL")]
  pub model: Url,

  /// 输入图像，例如 image:///tmp/photo.jpg
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,

  /// 输出位置
  /// 支持格式:
  /// - stdout: 打印到标准输出
  /// - json:///path/result.json 写入文件
  /// 追加 ?pretty 输出带缩进的 JSON
  #[arg(long, default_value = "stdout:", value_name = "OUTPUT")]
  pub output: Url,

  /// 标签表 (TOML)，例如 toml:///opt/models/labels.toml；缺省使用内置 COCO 标签
  #[arg(long, value_name = "LABELS")]
  pub labels: Option<Url>,

  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value_t = CONFIDENCE_THRESHOLD, value_name = "THRESHOLD")]
  pub confidence: f32,

  /// 重叠抑制阈值 (0.0 - 1.0)，重叠率为交集面积除以被比较框自身的面积
  #[arg(long, default_value_t = OVERLAP_THRESHOLD, value_name = "THRESHOLD")]
  pub overlap: f32,

  /// 模型类别数量；缺省时根据输出形状推断
  #[arg(long, value_name = "COUNT")]
  pub num_classes: Option<usize>,

  /// 仅在同类别的框之间做抑制
  #[arg(long)]
  pub per_class: bool,
}

impl Args {
  pub fn pipeline_config(&self) -> PipelineConfig {
    let scope = if self.per_class {
      SuppressScope::PerClass
    } else {
      SuppressScope::Global
    };

    PipelineConfig::default()
      .with_confidence_threshold(self.confidence)
      .with_overlap_threshold(self.overlap)
      .with_num_classes(self.num_classes)
      .with_suppress_scope(scope)
  }
}
