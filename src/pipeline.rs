// 该文件是 Shanan Tally （山南计数） 项目的一部分。
// src/pipeline.rs - 单次检测计数流水线
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

use std::{sync::Arc, time::Instant};

use thiserror::Error;
use tracing::{debug, info};

use crate::{
  config::{PipelineConfig, TARGET_SIZE},
  detect::{
    Decoder, DetectResult, DetectionSummary, LabelTable, Suppressor, UnknownLabelError, summarize,
  },
  frame::{DecodeError, NchwTensor, RawImage},
  model::{LayoutError, Model, RawOutput},
  preprocess::Preprocessor,
};

pub type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// “输入无法处理”和“处理成功但没有检测到物体”必须区分开：
/// 后者是 `Ok` 的空结果，不会出现在这里。
#[derive(Error, Debug)]
pub enum PipelineError {
  #[error("输入图像无法解码: {0}")]
  Decode(#[from] DecodeError),
  #[error("推理失败: {0}")]
  Inference(#[source] BoxedError),
  #[error("模型输出无法解析: {0}")]
  Layout(#[from] LayoutError),
  #[error("标签表配置错误: {0}")]
  UnknownLabel(#[from] UnknownLabelError),
}

impl PipelineError {
  /// 是否由调用方提供的输入引起
  pub fn is_client_error(&self) -> bool {
    matches!(self, PipelineError::Decode(_))
  }
}

/// 预处理 → 推理 → 解码 → 抑制 → 计数
///
/// 模型会话和标签表通过 `Arc` 共享，克隆流水线不会重新加载模型。
pub struct Pipeline<M, const W: u32, const H: u32> {
  model: Arc<M>,
  labels: Arc<LabelTable>,
  preprocessor: Preprocessor,
  decoder: Decoder,
  suppressor: Suppressor,
}

pub type DefaultPipeline<M> = Pipeline<M, TARGET_SIZE, TARGET_SIZE>;

impl<M, const W: u32, const H: u32> Clone for Pipeline<M, W, H> {
  fn clone(&self) -> Self {
    Self {
      model: Arc::clone(&self.model),
      labels: Arc::clone(&self.labels),
      preprocessor: self.preprocessor.clone(),
      decoder: self.decoder.clone(),
      suppressor: self.suppressor.clone(),
    }
  }
}

impl<M, E, const W: u32, const H: u32> Pipeline<M, W, H>
where
  M: Model<Input = NchwTensor<W, H>, Output = RawOutput, Error = E>,
  E: Into<BoxedError>,
{
  pub fn new(model: Arc<M>, labels: Arc<LabelTable>, config: &PipelineConfig) -> Self {
    Self {
      model,
      labels,
      preprocessor: Preprocessor::default().with_pad_color(config.pad_color),
      decoder: Decoder::new(config.confidence_threshold, config.num_classes),
      suppressor: Suppressor::new(config.overlap_threshold).with_scope(config.suppress_scope),
    }
  }

  /// 运行到抑制为止，返回保留下来的检测框
  pub fn detect(&self, bytes: &[u8]) -> Result<DetectResult, PipelineError> {
    let now = Instant::now();
    let image = RawImage::decode(bytes)?;
    let tensor: NchwTensor<W, H> = self.preprocessor.normalize(&image);
    debug!(
      "预处理完成: {}x{} -> {:?}, 耗时 {:.2?}",
      image.width(),
      image.height(),
      tensor.shape(),
      now.elapsed()
    );

    let now = Instant::now();
    let raw = self
      .model
      .infer(&tensor)
      .map_err(|e| PipelineError::Inference(e.into()))?;
    debug!("推理完成, 输出形状 {:?}, 耗时 {:.2?}", raw.shape(), now.elapsed());

    let candidates = self.decoder.decode(&raw)?;
    let kept = self.suppressor.suppress(&candidates);

    Ok(DetectResult::from(kept))
  }

  /// 完整流水线，返回各类别的数量
  pub fn run(&self, bytes: &[u8]) -> Result<DetectionSummary, PipelineError> {
    let now = Instant::now();
    let result = self.detect(bytes)?;
    let summary = summarize(&result.items, &self.labels)?;
    info!(
      "检测到 {} 个对象, {} 个类别, 总耗时 {:.2?}",
      summary.total(),
      summary.len(),
      now.elapsed()
    );
    Ok(summary)
  }
}
