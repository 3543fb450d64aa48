// 该文件是 Shanan Tally （山南计数） 项目的一部分。
// src/detect/suppress.rs - 非极大值抑制
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

use std::{collections::BTreeMap, marker::PhantomData};

use tracing::debug;

use crate::{config::OVERLAP_THRESHOLD, detect::DetectItem};

/// 贪心选取的顺序，键越大越先被选中
pub trait PickOrder {
  fn key(item: &DetectItem) -> f32;
}

/// 按下边缘 `y2` 选取，与置信度无关
#[derive(Debug, Clone, Copy, Default)]
pub struct BottomEdge;

impl PickOrder for BottomEdge {
  fn key(item: &DetectItem) -> f32 {
    item.y2()
  }
}

/// 按置信度选取
#[derive(Debug, Clone, Copy, Default)]
pub struct HighestScore;

impl PickOrder for HighestScore {
  fn key(item: &DetectItem) -> f32 {
    item.score
  }
}

/// 抑制的作用范围
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SuppressScope {
  /// 不区分类别，不同类别的框也会互相抑制
  #[default]
  Global,
  /// 仅同类别的框互相抑制
  PerClass,
}

/// 交集面积除以 `other` 自身的面积（不是 IoU）
///
/// 面积按像素计数约定 `(x2 - x1 + 1) * (y2 - y1 + 1)` 计算，负的边长按 0 处理；
/// `other` 面积为 0 时返回 0。
pub fn overlap_over_area(picked: &DetectItem, other: &DetectItem) -> f32 {
  let xx1 = picked.x1().max(other.x1());
  let yy1 = picked.y1().max(other.y1());
  let xx2 = picked.x2().min(other.x2());
  let yy2 = picked.y2().min(other.y2());

  let w = (xx2 - xx1 + 1.0).max(0.0);
  let h = (yy2 - yy1 + 1.0).max(0.0);

  let area = other.pixel_area();
  if area > 0.0 { (w * h) / area } else { 0.0 }
}

#[derive(Debug, Clone)]
pub struct Suppressor<O: PickOrder = BottomEdge> {
  overlap_threshold: f32,
  scope: SuppressScope,
  _order: PhantomData<O>,
}

impl Default for Suppressor<BottomEdge> {
  fn default() -> Self {
    Self::new(OVERLAP_THRESHOLD)
  }
}

impl<O: PickOrder> Suppressor<O> {
  pub fn new(overlap_threshold: f32) -> Self {
    Self {
      overlap_threshold,
      scope: SuppressScope::Global,
      _order: PhantomData,
    }
  }

  pub fn with_scope(mut self, scope: SuppressScope) -> Self {
    self.scope = scope;
    self
  }

  /// 更换选取顺序
  pub fn with_order<P: PickOrder>(self) -> Suppressor<P> {
    Suppressor {
      overlap_threshold: self.overlap_threshold,
      scope: self.scope,
      _order: PhantomData,
    }
  }

  /// 返回保留下来的框，坐标不变，顺序与输入一致
  pub fn suppress(&self, items: &[DetectItem]) -> Vec<DetectItem> {
    if items.is_empty() {
      return Vec::new();
    }

    let mut keep = match self.scope {
      SuppressScope::Global => self.pick((0..items.len()).collect(), items),
      SuppressScope::PerClass => {
        let mut groups: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
        for (idx, item) in items.iter().enumerate() {
          groups.entry(item.label).or_default().push(idx);
        }
        groups
          .into_values()
          .flat_map(|group| self.pick(group, items))
          .collect()
      }
    };
    keep.sort_unstable();

    debug!(
      "抑制: {} 个候选保留 {} 个 (阈值 {}, 范围 {:?})",
      items.len(),
      keep.len(),
      self.overlap_threshold,
      self.scope
    );

    keep.into_iter().map(|idx| items[idx]).collect()
  }

  fn pick(&self, mut idxs: Vec<usize>, items: &[DetectItem]) -> Vec<usize> {
    // 升序排列，每轮取末尾（键最大者）
    idxs.sort_by(|&a, &b| O::key(&items[a]).total_cmp(&O::key(&items[b])));

    let mut picked = Vec::new();
    while let Some(current) = idxs.pop() {
      picked.push(current);
      let current = &items[current];
      // NaN 重叠率不触发抑制
      idxs.retain(|&idx| !(overlap_over_area(current, &items[idx]) > self.overlap_threshold));
    }
    picked
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn item(label: u32, score: f32, bbox: [f32; 4]) -> DetectItem {
    DetectItem { label, score, bbox }
  }

  #[test]
  fn empty_input_yields_empty_output() {
    assert!(Suppressor::default().suppress(&[]).is_empty());
  }

  #[test]
  fn overlapping_pair_keeps_larger_bottom_edge() {
    let lower = item(0, 0.6, [1.0, 1.0, 11.0, 11.0]);
    let upper = item(0, 0.99, [0.0, 0.0, 10.0, 10.0]);
    let kept = Suppressor::default().suppress(&[upper, lower]);
    assert_eq!(kept, vec![lower]);
  }

  #[test]
  fn disjoint_pair_both_survive() {
    let a = item(0, 0.9, [0.0, 0.0, 10.0, 10.0]);
    let b = item(1, 0.9, [20.0, 20.0, 30.0, 30.0]);
    assert_eq!(Suppressor::default().suppress(&[a, b]), vec![a, b]);
  }

  #[test]
  fn overlap_equal_to_threshold_survives() {
    let other = item(0, 0.9, [0.0, 0.0, 9.0, 1.0]);
    let picked = item(0, 0.9, [5.0, 0.0, 20.0, 5.0]);
    assert_eq!(overlap_over_area(&picked, &other), 0.5);
    assert_eq!(
      Suppressor::default().suppress(&[other, picked]),
      vec![other, picked]
    );
  }

  #[test]
  fn denominator_is_the_other_box() {
    let large = item(0, 0.9, [0.0, 0.0, 99.0, 99.0]);
    let small = item(0, 0.9, [10.0, 10.0, 19.0, 19.0]);
    assert_eq!(overlap_over_area(&large, &small), 1.0);
    assert_eq!(overlap_over_area(&small, &large), 0.01);

    // 大框先被选中，小框完全落在其中被抑制
    assert_eq!(Suppressor::default().suppress(&[large, small]), vec![large]);

    // 小框下边缘更低时先被选中，大框相对自身面积的重叠很小，得以保留
    let low_small = item(0, 0.9, [10.0, 90.0, 19.0, 120.0]);
    assert_eq!(
      Suppressor::default().suppress(&[large, low_small]),
      vec![large, low_small]
    );
  }

  #[test]
  fn pick_order_ignores_confidence() {
    let confident = item(0, 0.99, [0.0, 0.0, 10.0, 10.0]);
    let weak = item(0, 0.51, [0.0, 0.0, 10.0, 12.0]);
    assert_eq!(
      Suppressor::default().suppress(&[confident, weak]),
      vec![weak]
    );

    let by_score = Suppressor::default().with_order::<HighestScore>();
    assert_eq!(by_score.suppress(&[confident, weak]), vec![confident]);
  }

  #[test]
  fn global_scope_suppresses_across_classes() {
    let cat = item(0, 0.9, [0.0, 0.0, 10.0, 10.0]);
    let dog = item(1, 0.9, [0.0, 0.0, 10.0, 11.0]);
    assert_eq!(Suppressor::default().suppress(&[cat, dog]), vec![dog]);

    let per_class = Suppressor::default().with_scope(SuppressScope::PerClass);
    assert_eq!(per_class.suppress(&[cat, dog]), vec![cat, dog]);
  }

  #[test]
  fn inverted_boxes_are_tolerated() {
    let inverted = item(0, 0.9, [10.0, 10.0, 0.0, 0.0]);
    let normal = item(0, 0.9, [0.0, 0.0, 20.0, 20.0]);
    assert_eq!(overlap_over_area(&normal, &inverted), 0.0);
    assert_eq!(
      Suppressor::default().suppress(&[inverted, normal]),
      vec![inverted, normal]
    );
  }

  #[test]
  fn suppression_is_idempotent() {
    let items = [
      item(0, 0.9, [0.0, 0.0, 10.0, 10.0]),
      item(1, 0.8, [2.0, 2.0, 12.0, 10.0]),
      item(2, 0.7, [8.0, 0.0, 18.0, 10.0]),
      item(0, 0.6, [30.0, 30.0, 40.0, 45.0]),
      item(1, 0.95, [31.0, 29.0, 41.0, 44.0]),
      item(2, 0.55, [100.0, 0.0, 140.0, 10.0]),
      item(0, 0.75, [105.0, 0.0, 110.0, 10.0]),
    ];
    let suppressor = Suppressor::default();
    let once = suppressor.suppress(&items);
    let twice = suppressor.suppress(&once);
    assert!(once.len() <= items.len());
    assert_eq!(once, twice);
    for kept in &once {
      assert!(items.contains(kept));
    }
  }
}
