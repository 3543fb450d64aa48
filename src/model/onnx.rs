// 该文件是 Shanan Tally （山南计数） 项目的一部分。
// src/model/onnx.rs - 基于 tract 的 ONNX 推理后端
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

use thiserror::Error;
use tracing::{debug, error, info};
use tract_onnx::prelude::*;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::NchwTensor,
  model::{LayoutError, Model, RawOutput},
};

#[derive(Error, Debug)]
pub enum OnnxModelError {
  #[error("模型加载错误: {0}")]
  ModelLoadError(std::io::Error),
  #[error("模型无效: {0}, 错误: {1}")]
  ModelInvalid(String, TractError),
  #[error("推理错误: {0}")]
  InferenceError(TractError),
  #[error("模型输出排布错误: {0}")]
  LayoutError(#[from] LayoutError),
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
}

impl From<std::io::Error> for OnnxModelError {
  fn from(err: std::io::Error) -> Self {
    OnnxModelError::ModelLoadError(err)
  }
}

impl OnnxModelError {
  pub fn invalid(msg: &str, e: TractError) -> Self {
    OnnxModelError::ModelInvalid(msg.to_string(), e)
  }
}

type OnnxPlan = TypedRunnableModel<TypedModel>;

/// 已加载的 ONNX 会话，输入固定为 `[1, 3, H, W]`
pub struct OnnxModel<const W: u32, const H: u32> {
  plan: OnnxPlan,
}

pub struct OnnxModelBuilder {
  model_path: String,
}

impl FromUrlWithScheme for OnnxModelBuilder {
  const SCHEME: &'static str = "onnx";
}

impl FromUrl for OnnxModelBuilder {
  type Error = OnnxModelError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(OnnxModelError::ModelPathError(format!(
        "模型路径必须使用 {} 方案, 实际为 {}",
        Self::SCHEME,
        url.scheme()
      )));
    }

    Ok(OnnxModelBuilder {
      model_path: url.path().to_string(),
    })
  }
}

impl OnnxModelBuilder {
  pub fn with_path(model_path: impl Into<String>) -> Self {
    Self {
      model_path: model_path.into(),
    }
  }

  pub fn build<const W: u32, const H: u32>(self) -> Result<OnnxModel<W, H>, OnnxModelError> {
    info!("加载模型文件: {}", self.model_path);
    let model_data = std::fs::read(&self.model_path)?;
    debug!(
      "模型文件大小: {:.2} MB",
      model_data.len() as f64 / (1024.0 * 1024.0)
    );

    let input_fact = InferenceFact::dt_shape(
      f32::datum_type(),
      tvec!(1, 3, H as usize, W as usize),
    );

    let plan = tract_onnx::onnx()
      .model_for_read(&mut model_data.as_slice())
      .map_err(|e| OnnxModelError::invalid("无法解析 ONNX 模型", e))?
      .with_input_fact(0, input_fact)
      .map_err(|e| OnnxModelError::invalid("无法设置输入形状", e))?
      .into_optimized()
      .map_err(|e| OnnxModelError::invalid("无法优化模型", e))?
      .into_runnable()
      .map_err(|e| OnnxModelError::invalid("无法构建可执行模型", e))?;

    let num_outputs = plan.model().outputs.len();
    if num_outputs == 0 {
      error!("模型没有输出");
      return Err(OnnxModelError::invalid(
        "模型没有输出",
        anyhow::anyhow!("expected at least one output"),
      ));
    }
    debug!("模型输出数量: {}", num_outputs);
    info!("模型加载完成, 输入形状 [1, 3, {}, {}]", H, W);

    Ok(OnnxModel { plan })
  }
}

impl<const W: u32, const H: u32> Model for OnnxModel<W, H> {
  type Input = NchwTensor<W, H>;
  type Output = RawOutput;
  type Error = OnnxModelError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    debug!("设置模型输入");
    let tensor = Tensor::from_shape(&input.shape(), input.as_slice())
      .map_err(OnnxModelError::InferenceError)?;

    debug!("执行模型推理");
    let outputs = self
      .plan
      .run(tvec!(tensor.into()))
      .map_err(OnnxModelError::InferenceError)?;

    debug!("获取模型输出");
    let output = outputs.first().ok_or_else(|| {
      OnnxModelError::InferenceError(anyhow::anyhow!("model produced no outputs"))
    })?;
    let view = output
      .to_array_view::<f32>()
      .map_err(OnnxModelError::InferenceError)?;
    let shape = view.shape().to_vec();
    debug!("模型输出形状: {:?}", shape);

    Ok(RawOutput::new(shape, view.iter().copied().collect())?)
  }
}
