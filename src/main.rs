// 该文件是 Shanan Tally （山南计数） 项目的一部分。
// src/main.rs - 项目主程序
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

mod args;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use shanan_tally::{
  FromUrl,
  config::TARGET_SIZE,
  detect::LabelTable,
  input::ImageFileInput,
  model::{OnnxModel, OnnxModelBuilder},
  output::JsonOutput,
  pipeline::DefaultPipeline,
  task::{OneShotTask, Task},
};

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .init();

  let args = args::Args::parse();

  info!("模型文件路径: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);
  info!("置信度阈值: {}", args.confidence);
  info!("重叠抑制阈值: {}", args.overlap);

  let labels = match &args.labels {
    Some(url) => LabelTable::from_url(url)?,
    None => LabelTable::coco(),
  };
  info!("标签数量: {}", labels.len());

  // 模型只在启动时加载一次
  let model: OnnxModel<TARGET_SIZE, TARGET_SIZE> = OnnxModelBuilder::from_url(&args.model)?.build()?;
  let pipeline = DefaultPipeline::new(Arc::new(model), Arc::new(labels), &args.pipeline_config());

  let input = ImageFileInput::from_url(&args.input)?;
  let output = JsonOutput::from_url(&args.output)?;

  OneShotTask.run_task(input, pipeline, output)?;

  Ok(())
}
