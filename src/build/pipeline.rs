use crate::build::error::BuildError;
use crate::build::template_file::TemplateFile;
use crate::compiler::Compiler;
use crate::compiler::codegen::GeneratedUnit;
use crate::compiler::error::source_context;
use anyhow::{Context, Result};
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// 编译完成、尚未落盘的模板
#[derive(Debug, Clone)]
pub struct CompiledTemplate {
    pub file: TemplateFile,
    /// 模板源码的 SHA-256
    pub hash: String,
    pub unit: GeneratedUnit,
}

/// 编译单个模板，失败时附带出错位置附近的源码
pub fn compile_one(file: &TemplateFile, compiler: &Compiler) -> Result<CompiledTemplate> {
    let source = std::fs::read(&file.path)
        .with_context(|| format!("读取模板 {} 失败", file.path.display()))?;
    let source_id = file.source_id();

    match compiler.compile(&source_id, source.as_slice(), &file.name, &file.qualified_name()) {
        Ok(output) => {
            tracing::debug!("已编译 {source_id} → {}", file.qualified_name());
            Ok(CompiledTemplate {
                file: file.clone(),
                hash: output.hash,
                unit: output.unit,
            })
        }
        Err(err) => {
            let excerpt = err
                .position()
                .map(|p| source_context(&String::from_utf8_lossy(&source), p.line))
                .unwrap_or_default();
            Err(anyhow::Error::new(err)
                .context(format!("编译模板 {} 失败\n\n{excerpt}", file.path.display())))
        }
    }
}

/// 并行编译整批模板，任一失败则整批失败
pub fn compile_batch(files: &[TemplateFile], compiler: &Compiler) -> Result<Vec<CompiledTemplate>> {
    files
        .par_iter()
        .map(|file| compile_one(file, compiler))
        .collect()
}

/// 跨文件校验：名称与输出路径不能重复，引入的模板必须在本批中
pub fn validate(compiled: &[CompiledTemplate], output_dir: &Path) -> Result<(), BuildError> {
    let mut names: HashMap<String, &Path> = HashMap::new();
    let mut outputs: HashMap<std::path::PathBuf, &Path> = HashMap::new();

    for template in compiled {
        let name = template.file.qualified_name();
        if let Some(first) = names.insert(name.clone(), &template.file.path) {
            return Err(BuildError::DuplicateUnit {
                name,
                first: first.to_path_buf(),
                second: template.file.path.clone(),
            });
        }

        let output = template.file.output_path(output_dir);
        if let Some(first) = outputs.insert(output, &template.file.path) {
            return Err(BuildError::DuplicateUnit {
                name: module_name(&template.file),
                first: first.to_path_buf(),
                second: template.file.path.clone(),
            });
        }
    }

    // 目录对应的模块不能与模板模块同名
    let mut packages: HashMap<String, &Path> = HashMap::new();
    for template in compiled {
        for depth in 1..=template.file.package.len() {
            packages
                .entry(template.file.package[..depth].join("."))
                .or_insert(&template.file.path);
        }
    }
    for template in compiled {
        let module = module_name(&template.file);
        if let Some(first) = packages.get(&module) {
            return Err(BuildError::DuplicateUnit {
                name: module,
                first: first.to_path_buf(),
                second: template.file.path.clone(),
            });
        }
    }

    let known: HashSet<&str> = names.keys().map(String::as_str).collect();
    for template in compiled {
        for include in template.unit.all_includes() {
            if !known.contains(include.as_str()) {
                return Err(BuildError::DanglingInclude {
                    unit: template.unit.qualified_name.clone(),
                    include,
                });
            }
        }
    }

    Ok(())
}

/// 模板模块的点分隔路径，例如 `blog.blog_post`
fn module_name(file: &TemplateFile) -> String {
    let mut parts = file.package.clone();
    parts.push(file.module.clone());
    parts.join(".")
}
