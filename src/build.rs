pub mod error;
pub mod incremental;
pub mod output;
pub mod pipeline;
pub mod template_file;

pub use error::BuildError;

use crate::config::ProjectConfig;
use anyhow::Result;
use incremental::BuildStats;
use std::path::{Path, PathBuf};

/// 构建运行参数
#[derive(Debug, Default, Clone)]
pub struct BuildParams {
    /// 先删除所有生成文件
    pub clean: bool,
    /// 内容未变化的文件也重新写入
    pub force: bool,
    /// 覆盖配置中的输入目录
    pub input_dir: Option<PathBuf>,
    /// 覆盖配置中的输出目录
    pub output_dir: Option<PathBuf>,
}

/// 查找 → 并行编译 → 校验 → 规划 → 落盘；任何一步失败都不会写入文件
pub fn run(project_root: &Path, config: &ProjectConfig, params: BuildParams) -> Result<BuildStats> {
    tracing::info!("开始构建...");
    let start = std::time::Instant::now();

    let input_dir = params
        .input_dir
        .unwrap_or_else(|| config.input_dir(project_root));
    let output_dir = params
        .output_dir
        .unwrap_or_else(|| config.output_dir(project_root));

    let compiler = config.compiler();
    let files = template_file::discover(&input_dir, compiler.keywords())?;
    if files.is_empty() {
        tracing::warn!("输入目录 {} 中没有模板", input_dir.display());
    }

    let compiled = pipeline::compile_batch(&files, &compiler)?;
    pipeline::validate(&compiled, &output_dir)?;
    let plan = output::plan(&compiled, &output_dir);
    // 清理与建目录之前确认不会覆盖手写文件
    output::ensure_managed(&plan)?;

    if params.clean {
        output::clean(&output_dir)?;
    }
    std::fs::create_dir_all(&output_dir)?;

    let stats = output::persist(&plan, &output_dir, params.force || params.clean)?;

    tracing::info!(
        "构建完成，耗时 {:.2}s（共 {} 个文件，写入 {}，未变 {}，删除 {}）",
        start.elapsed().as_secs_f64(),
        stats.total,
        stats.written,
        stats.unchanged,
        stats.removed,
    );

    Ok(stats)
}
