use crate::build::{output, pipeline, template_file};
use crate::config::{CONFIG_FILE, ProjectConfig};
use anyhow::Result;
use std::path::Path;

pub struct CheckResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// 执行项目检查：读取配置，编译并校验所有模板，但不写入任何文件
pub fn run(project_root: &Path) -> Result<CheckResult> {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if let Some(config) = check_config(project_root, &mut errors, &mut warnings) {
        check_templates(project_root, &config, &mut errors, &mut warnings);
    }

    Ok(CheckResult { errors, warnings })
}

fn check_config(
    root: &Path,
    errors: &mut Vec<String>,
    warnings: &mut Vec<String>,
) -> Option<ProjectConfig> {
    if !root.join(CONFIG_FILE).exists() {
        warnings.push(format!("缺少 {CONFIG_FILE}，使用默认配置"));
    }
    match ProjectConfig::load(root) {
        Ok(config) => Some(config),
        Err(e) => {
            errors.push(format!("{e}"));
            None
        }
    }
}

fn check_templates(
    root: &Path,
    config: &ProjectConfig,
    errors: &mut Vec<String>,
    warnings: &mut Vec<String>,
) {
    let input_dir = config.input_dir(root);
    if !input_dir.exists() {
        errors.push(format!("输入目录 {} 不存在", config.build.input_dir));
        return;
    }

    let compiler = config.compiler();
    let files = match template_file::discover(&input_dir, compiler.keywords()) {
        Ok(files) => files,
        Err(e) => {
            errors.push(format!("{e:#}"));
            return;
        }
    };
    if files.is_empty() {
        warnings.push(format!("输入目录 {} 中没有模板", config.build.input_dir));
        return;
    }

    // 逐个编译以便一次报告所有出错的模板
    let mut compiled = Vec::with_capacity(files.len());
    for file in &files {
        match pipeline::compile_one(file, &compiler) {
            Ok(template) => compiled.push(template),
            Err(e) => errors.push(format!("{e:#}")),
        }
    }
    if compiled.len() != files.len() {
        return;
    }

    let output_dir = config.output_dir(root);
    if let Err(e) = pipeline::validate(&compiled, &output_dir) {
        errors.push(e.to_string());
        return;
    }

    let plan = output::plan(&compiled, &output_dir);
    if let Err(e) = output::ensure_managed(&plan) {
        errors.push(e.to_string());
    }
    match output::stale(&plan, &output_dir) {
        Ok(stale) => {
            for path in stale {
                warnings.push(format!("过期的生成文件将在构建时删除：{}", path.display()));
            }
        }
        Err(e) => warnings.push(format!("{e:#}")),
    }
}
