// 该文件是 Shanan Tally （山南计数） 项目的一部分。
// src/frame.rs - 原始图像与 NCHW 张量定义
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

use image::{ColorType, RgbImage};
use thiserror::Error;
use tracing::debug;

const RGB_CHANNELS: usize = 3;

#[derive(Error, Debug)]
pub enum DecodeError {
  #[error("无法解析图像数据: {0}")]
  Image(#[from] image::ImageError),
  #[error("图像尺寸为零: {0}x{1}")]
  EmptyImage(u32, u32),
}

/// 解码后的输入图像，解码后不再修改
#[derive(Debug, Clone)]
pub struct RawImage {
  pixels: RgbImage,
  color: ColorType,
}

impl RawImage {
  /// 从编码后的字节（PNG、JPEG 等）解码
  pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
    let image = image::load_from_memory(bytes)?;
    let color = image.color();
    let (width, height) = (image.width(), image.height());
    if width == 0 || height == 0 {
      return Err(DecodeError::EmptyImage(width, height));
    }
    debug!("解码图像: {}x{}, 颜色类型 {:?}", width, height, color);

    Ok(Self {
      pixels: image.into_rgb8(),
      color,
    })
  }

  pub fn width(&self) -> u32 {
    self.pixels.width()
  }

  pub fn height(&self) -> u32 {
    self.pixels.height()
  }

  /// 源图像每像素的位深
  pub fn bits_per_pixel(&self) -> u16 {
    self.color.bits_per_pixel()
  }

  pub fn as_rgb(&self) -> &RgbImage {
    &self.pixels
  }
}

impl From<RgbImage> for RawImage {
  fn from(pixels: RgbImage) -> Self {
    Self {
      pixels,
      color: ColorType::Rgb8,
    }
  }
}

/// `[1, 3, H, W]` 形状的 f32 张量，通道优先
#[derive(Debug, Clone)]
pub struct NchwTensor<const W: u32, const H: u32> {
  data: Box<[f32]>,
}

impl<const W: u32, const H: u32> NchwTensor<W, H> {
  pub const SHAPE: [usize; 4] = [1, RGB_CHANNELS, H as usize, W as usize];

  pub fn shape(&self) -> [usize; 4] {
    Self::SHAPE
  }

  pub fn as_slice(&self) -> &[f32] {
    &self.data
  }

  pub fn get(&self, c: usize, y: usize, x: usize) -> Option<f32> {
    if c >= RGB_CHANNELS || y >= H as usize || x >= W as usize {
      return None;
    }
    self
      .data
      .get(c * (H as usize) * (W as usize) + y * (W as usize) + x)
      .copied()
  }
}

impl<const W: u32, const H: u32> Default for NchwTensor<W, H> {
  fn default() -> Self {
    let size = RGB_CHANNELS * (W as usize) * (H as usize);
    Self {
      data: vec![0.0f32; size].into_boxed_slice(),
    }
  }
}

impl<const W: u32, const H: u32> AsMut<[f32]> for NchwTensor<W, H> {
  fn as_mut(&mut self) -> &mut [f32] {
    &mut self.data
  }
}

impl<const W: u32, const H: u32> AsRef<[f32]> for NchwTensor<W, H> {
  fn as_ref(&self) -> &[f32] {
    &self.data
  }
}
