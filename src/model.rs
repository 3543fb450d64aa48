// 该文件是 Shanan Tally （山南计数） 项目的一部分。
// src/model.rs - 推理模型边界
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
use tracing::debug;

/// 推理后端。会话只加载一次，`infer` 只读，可被多个请求同时调用。
pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

/// 每个候选框的坐标参数个数 `(cx, cy, w, h)`
pub const BOX_PARAMS: usize = 4;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayoutError {
  #[error("输出维度不支持: {0:?}")]
  UnsupportedShape(Vec<usize>),
  #[error("批大小必须为 1, 实际为 {0}")]
  BatchSize(usize),
  #[error("输出形状 {shape:?} 中找不到长度为 {attrs} 的属性维度")]
  AttributeMismatch { shape: Vec<usize>, attrs: usize },
  #[error("数据长度不匹配: 期望长度 {expected}, 实际长度 {actual}")]
  LengthMismatch { expected: usize, actual: usize },
  #[error("属性维度 {0} 不足以容纳框参数和类别分数")]
  TooFewAttributes(usize),
}

/// 候选在缓冲区中的排布方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
  /// `[1, 4 + C, N]`，属性优先
  AttributeMajor,
  /// `[1, N, 4 + C]`，候选优先
  CandidateMajor,
}

/// 模型原始输出
#[derive(Debug, Clone, PartialEq)]
pub struct RawOutput {
  shape: Vec<usize>,
  data: Vec<f32>,
}

impl RawOutput {
  pub fn new(shape: Vec<usize>, data: Vec<f32>) -> Result<Self, LayoutError> {
    let expected: usize = shape.iter().product();
    if expected != data.len() {
      return Err(LayoutError::LengthMismatch {
        expected,
        actual: data.len(),
      });
    }
    Ok(Self { shape, data })
  }

  pub fn shape(&self) -> &[usize] {
    &self.shape
  }

  pub fn as_slice(&self) -> &[f32] {
    &self.data
  }

  /// 去掉批维度后的 `(d0, d1)`
  fn matrix_dims(&self) -> Result<(usize, usize), LayoutError> {
    match self.shape.as_slice() {
      &[batch, d0, d1] => {
        if batch != 1 {
          return Err(LayoutError::BatchSize(batch));
        }
        Ok((d0, d1))
      }
      &[d0, d1] => Ok((d0, d1)),
      _ => Err(LayoutError::UnsupportedShape(self.shape.clone())),
    }
  }

  /// 推断每个候选的属性个数 `4 + C`
  ///
  /// 候选数通常远大于属性数，因此优先取较小的维度；较小维度放不下框参数时取较大者。
  pub fn guess_attributes(&self) -> Result<usize, LayoutError> {
    let (d0, d1) = self.matrix_dims()?;
    let (small, large) = (d0.min(d1), d0.max(d1));
    Ok(if small > BOX_PARAMS { small } else { large })
  }

  /// 按每行一个候选的方式访问输出
  ///
  /// 两个维度都等于 `attrs` 时按属性优先处理。
  pub fn candidates(&self, attrs: usize) -> Result<CandidateRows<'_>, LayoutError> {
    if attrs <= BOX_PARAMS {
      return Err(LayoutError::TooFewAttributes(attrs));
    }

    let (d0, d1) = self.matrix_dims()?;
    let (layout, count) = if d0 == attrs {
      (Layout::AttributeMajor, d1)
    } else if d1 == attrs {
      (Layout::CandidateMajor, d0)
    } else {
      return Err(LayoutError::AttributeMismatch {
        shape: self.shape.clone(),
        attrs,
      });
    };
    debug!("输出排布 {:?}: {} 个候选, 每个 {} 个属性", layout, count, attrs);

    Ok(CandidateRows {
      data: &self.data,
      layout,
      attrs,
      count,
    })
  }
}

/// 归一化后的候选视图
#[derive(Debug, Clone, Copy)]
pub struct CandidateRows<'a> {
  data: &'a [f32],
  layout: Layout,
  attrs: usize,
  count: usize,
}

impl<'a> CandidateRows<'a> {
  pub fn len(&self) -> usize {
    self.count
  }

  pub fn is_empty(&self) -> bool {
    self.count == 0
  }

  pub fn layout(&self) -> Layout {
    self.layout
  }

  pub fn num_classes(&self) -> usize {
    self.attrs - BOX_PARAMS
  }

  /// 第 `row` 个候选的第 `attr` 个属性
  pub fn value(&self, row: usize, attr: usize) -> f32 {
    match self.layout {
      Layout::AttributeMajor => self.data[attr * self.count + row],
      Layout::CandidateMajor => self.data[row * self.attrs + attr],
    }
  }

  /// 第 `row` 个候选的 `(cx, cy, w, h)`
  pub fn center_box(&self, row: usize) -> [f32; 4] {
    [
      self.value(row, 0),
      self.value(row, 1),
      self.value(row, 2),
      self.value(row, 3),
    ]
  }

  pub fn scores(&self, row: usize) -> impl Iterator<Item = f32> + '_ {
    (BOX_PARAMS..self.attrs).map(move |attr| self.value(row, attr))
  }
}

#[cfg(feature = "backend-tract")]
mod onnx;
#[cfg(feature = "backend-tract")]
pub use self::onnx::{OnnxModel, OnnxModelBuilder, OnnxModelError};
