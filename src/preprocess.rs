// 该文件是 Shanan Tally （山南计数） 项目的一部分。
// src/preprocess.rs - 图像预处理（补边、缩放、通道重排）
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

use std::borrow::Cow;

use image::{Rgb, RgbImage, imageops::FilterType};
use tracing::debug;

use crate::{
  config::PAD_COLOR,
  frame::{DecodeError, NchwTensor, RawImage},
};

/// 补边到正方形后缩放到 `width x height`，原图沿短边居中放置
///
/// 不构造 `max(w, h)` 边长的中间画布：原图直接缩放到它在目标图中的位置，其余部分填充补边颜色。
/// 尺寸已经等于目标尺寸时直接借用，不做拷贝。
pub fn letterbox_resize(
  image: &RgbImage,
  pad_color: Rgb<u8>,
  width: u32,
  height: u32,
  filter: FilterType,
) -> Cow<'_, RgbImage> {
  let (src_w, src_h) = image.dimensions();
  if (src_w, src_h) == (width, height) {
    return Cow::Borrowed(image);
  }

  let side = src_w.max(src_h) as u64;
  let (off_x, off_y) = if src_w > src_h {
    (0, (src_w - src_h) / 2)
  } else {
    ((src_h - src_w) / 2, 0)
  };

  // 正方形画布坐标按比例映射到目标图
  let scale = |value: u32, target: u32| (value as u64 * target as u64 / side) as u32;
  let scale_round = |value: u32, target: u32| {
    ((value as u64 * target as u64 + side / 2) / side).max(1) as u32
  };
  let dst_x = scale(off_x, width).min(width - 1);
  let dst_y = scale(off_y, height).min(height - 1);
  let dst_w = scale_round(src_w, width).min(width - dst_x);
  let dst_h = scale_round(src_h, height).min(height - dst_y);

  let mut canvas = RgbImage::from_pixel(width, height, pad_color);
  if (dst_w, dst_h) == (src_w, src_h) {
    image::imageops::replace(&mut canvas, image, dst_x as i64, dst_y as i64);
  } else {
    let content = image::imageops::resize(image, dst_w, dst_h, filter);
    image::imageops::replace(&mut canvas, &content, dst_x as i64, dst_y as i64);
  }
  debug!(
    "补边缩放: {}x{} -> {}x{}, 内容 {}x{} 位于 ({}, {})",
    src_w, src_h, width, height, dst_w, dst_h, dst_x, dst_y
  );

  Cow::Owned(canvas)
}

#[derive(Debug, Clone)]
pub struct Preprocessor {
  pad_color: Rgb<u8>,
  filter: FilterType,
}

impl Default for Preprocessor {
  fn default() -> Self {
    Self {
      pad_color: PAD_COLOR,
      // 双线性插值
      filter: FilterType::Triangle,
    }
  }
}

impl Preprocessor {
  pub fn with_pad_color(mut self, pad_color: Rgb<u8>) -> Self {
    self.pad_color = pad_color;
    self
  }

  /// 补边、缩放到 `W x H`、归一化到 `[0, 1]` 并转为 NCHW
  pub fn normalize<const W: u32, const H: u32>(&self, image: &RawImage) -> NchwTensor<W, H> {
    let resized = letterbox_resize(image.as_rgb(), self.pad_color, W, H, self.filter);

    let mut tensor = NchwTensor::<W, H>::default();
    let plane = (W as usize) * (H as usize);
    let slice = tensor.as_mut();
    for (index, pixel) in resized.pixels().enumerate() {
      for (c, value) in pixel.0.iter().enumerate() {
        slice[c * plane + index] = *value as f32 / 255.0;
      }
    }

    tensor
  }

  pub fn normalize_bytes<const W: u32, const H: u32>(
    &self,
    bytes: &[u8],
  ) -> Result<NchwTensor<W, H>, DecodeError> {
    let image = RawImage::decode(bytes)?;
    Ok(self.normalize(&image))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
      Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    })
  }

  #[test]
  fn square_input_is_resized_without_padding() {
    let image = RgbImage::from_pixel(33, 33, Rgb([9, 90, 200]));
    let placed = letterbox_resize(&image, PAD_COLOR, 16, 16, FilterType::Triangle);
    assert_eq!(placed.dimensions(), (16, 16));
    assert!(placed.pixels().all(|p| *p == Rgb([9, 90, 200])));

    let same = gradient(16, 16);
    let placed = letterbox_resize(&same, PAD_COLOR, 16, 16, FilterType::Triangle);
    assert!(matches!(placed, Cow::Borrowed(_)));
    assert_eq!(&*placed, &same);
  }

  #[test]
  fn wide_image_is_centered_vertically() {
    let image = RgbImage::from_pixel(10, 5, Rgb([255, 0, 0]));
    let placed = letterbox_resize(&image, Rgb([1, 2, 3]), 10, 10, FilterType::Triangle);
    assert_eq!(placed.dimensions(), (10, 10));
    // 偏移 (10 - 5) / 2 = 2
    assert_eq!(placed.get_pixel(0, 1), &Rgb([1, 2, 3]));
    assert_eq!(placed.get_pixel(0, 2), &Rgb([255, 0, 0]));
    assert_eq!(placed.get_pixel(9, 6), &Rgb([255, 0, 0]));
    assert_eq!(placed.get_pixel(9, 7), &Rgb([1, 2, 3]));
  }

  #[test]
  fn tall_image_is_centered_horizontally() {
    let image = RgbImage::from_pixel(3, 8, Rgb([0, 255, 0]));
    let placed = letterbox_resize(&image, PAD_COLOR, 8, 8, FilterType::Triangle);
    assert_eq!(placed.dimensions(), (8, 8));
    assert_eq!(placed.get_pixel(1, 0), &PAD_COLOR);
    assert_eq!(placed.get_pixel(2, 0), &Rgb([0, 255, 0]));
    assert_eq!(placed.get_pixel(4, 7), &Rgb([0, 255, 0]));
    assert_eq!(placed.get_pixel(5, 7), &PAD_COLOR);
  }

  #[test]
  fn wide_image_is_scaled_into_place() {
    // 1000x500 -> 1000x1000 -> 640x640，内容位于 y ∈ [160, 480)
    let image = RgbImage::from_pixel(1000, 500, Rgb([0, 200, 50]));
    let placed = letterbox_resize(&image, PAD_COLOR, 640, 640, FilterType::Triangle);
    assert_eq!(placed.get_pixel(0, 159), &PAD_COLOR);
    assert_eq!(placed.get_pixel(0, 160), &Rgb([0, 200, 50]));
    assert_eq!(placed.get_pixel(639, 479), &Rgb([0, 200, 50]));
    assert_eq!(placed.get_pixel(639, 480), &PAD_COLOR);
  }

  #[test]
  fn extremely_thin_image_stays_within_target_size() {
    let image = RawImage::from(RgbImage::from_pixel(1, 60000, Rgb([255, 0, 0])));
    let tensor: NchwTensor<640, 640> = Preprocessor::default().normalize(&image);
    assert_eq!(tensor.shape(), [1, 3, 640, 640]);

    let gray = 128.0 / 255.0;
    // 内容列位于 x = 29999 * 640 / 60000 = 319
    assert_eq!(tensor.get(0, 320, 319), Some(1.0));
    assert_eq!(tensor.get(1, 320, 319), Some(0.0));
    assert_eq!(tensor.get(0, 320, 0), Some(gray));
    assert_eq!(tensor.get(0, 320, 320), Some(gray));
  }

  #[test]
  fn normalize_produces_unit_range_nchw() {
    let image = RawImage::from(gradient(120, 45));
    let tensor: NchwTensor<64, 64> = Preprocessor::default().normalize(&image);
    assert_eq!(tensor.shape(), [1, 3, 64, 64]);
    assert_eq!(tensor.as_slice().len(), 3 * 64 * 64);
    assert!(tensor.as_slice().iter().all(|v| (0.0..=1.0).contains(v)));
  }

  #[test]
  fn normalize_splits_channels_into_planes() {
    let image = RawImage::from(RgbImage::from_pixel(4, 4, Rgb([255, 0, 51])));
    let tensor: NchwTensor<4, 4> = Preprocessor::default().normalize(&image);
    assert_eq!(tensor.get(0, 3, 3), Some(1.0));
    assert_eq!(tensor.get(1, 0, 0), Some(0.0));
    assert_eq!(tensor.get(2, 2, 1), Some(0.2));
  }

  #[test]
  fn normalize_pads_with_configured_color() {
    let image = RawImage::from(RgbImage::from_pixel(8, 2, Rgb([0, 0, 0])));
    let tensor: NchwTensor<8, 8> = Preprocessor::default()
      .with_pad_color(Rgb([255, 255, 255]))
      .normalize(&image);
    assert_eq!(tensor.get(0, 0, 0), Some(1.0));
    assert_eq!(tensor.get(0, 3, 0), Some(0.0));
    assert_eq!(tensor.get(0, 7, 7), Some(1.0));
  }

  #[test]
  fn normalize_is_deterministic() {
    let image = RawImage::from(gradient(50, 90));
    let pre = Preprocessor::default();
    let a: NchwTensor<32, 32> = pre.normalize(&image);
    let b: NchwTensor<32, 32> = pre.normalize(&image);
    assert_eq!(a.as_slice(), b.as_slice());
  }

  #[test]
  fn normalize_bytes_surfaces_decode_error() {
    let result = Preprocessor::default().normalize_bytes::<16, 16>(&[0u8, 1, 2, 3]);
    assert!(result.is_err());
  }
}
