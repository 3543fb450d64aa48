// 该文件是 Shanan Tally （山南计数） 项目的一部分。
// src/task.rs - 任务调度
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

use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use crate::{
  detect::DetectionSummary,
  frame::NchwTensor,
  model::{Model, RawOutput},
  output::Render,
  pipeline::{BoxedError, Pipeline},
};

pub trait Task<I, P, O>: Sized {
  type Error;
  fn run_task(self, input: I, pipeline: P, output: O) -> Result<(), Self::Error>;
}

/// 取第一份输入，运行一次并输出结果
pub struct OneShotTask;

impl<I, M, E, O, RE, const W: u32, const H: u32> Task<I, Pipeline<M, W, H>, O> for OneShotTask
where
  I: Iterator<Item = Vec<u8>>,
  M: Model<Input = NchwTensor<W, H>, Output = RawOutput, Error = E>,
  E: Into<BoxedError>,
  O: Render<DetectionSummary, Error = RE>,
  RE: std::error::Error + Send + Sync + 'static,
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, pipeline: Pipeline<M, W, H>, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let payload = input.next().ok_or_else(|| anyhow::anyhow!("没有输入图像"))?;
    info!("输入获取成功 ({} 字节)，开始推理...", payload.len());

    let now = Instant::now();
    let summary = pipeline.run(&payload).inspect_err(|e| {
      if e.is_client_error() {
        warn!("输入无法处理: {}", e);
      } else {
        error!("流水线错误: {}", e);
      }
    })?;
    info!("推理完成，耗时: {:.2?}", now.elapsed());

    output.render_result(&summary)?;
    info!("输出完成");

    Ok(())
  }
}

/// 用同一个已加载的会话重复推理，统计平均耗时
pub struct RepeatShotTask {
  repeat_times: usize,
}

impl Default for RepeatShotTask {
  fn default() -> Self {
    Self { repeat_times: 1000 }
  }
}

impl RepeatShotTask {
  /// 前两次作为预热不计入平均
  const WARMUP: usize = 2;

  pub fn with_repeat_times(mut self, repeat_times: usize) -> Self {
    self.repeat_times = repeat_times.max(1);
    self
  }
}

impl<I, M, E, O, RE, const W: u32, const H: u32> Task<I, Pipeline<M, W, H>, O> for RepeatShotTask
where
  I: Iterator<Item = Vec<u8>>,
  M: Model<Input = NchwTensor<W, H>, Output = RawOutput, Error = E>,
  E: Into<BoxedError>,
  O: Render<DetectionSummary, Error = RE>,
  RE: std::error::Error + Send + Sync + 'static,
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, pipeline: Pipeline<M, W, H>, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let payload = input.next().ok_or_else(|| anyhow::anyhow!("没有输入图像"))?;
    info!("输入获取成功，开始推理...");

    let mut times = Vec::with_capacity(self.repeat_times);
    let mut last = None;
    for i in 0..self.repeat_times {
      let now = Instant::now();
      let summary = pipeline.run(&payload)?;
      let elapsed = now.elapsed();
      info!("({})推理完成，耗时: {:.2?}", i, elapsed);
      times.push(elapsed);
      last = Some(summary);
    }

    let measured = if times.len() > Self::WARMUP {
      &times[Self::WARMUP..]
    } else {
      &times[..]
    };
    warn!(
      "平均推理时间: {:.2?}",
      measured.iter().sum::<Duration>() / measured.len() as u32
    );

    if let Some(summary) = last {
      output.render_result(&summary)?;
    }

    Ok(())
  }
}
