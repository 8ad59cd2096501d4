use crate::build::error::BuildError;
use crate::compiler::codegen::ucfirst;
use crate::compiler::keywords::Keywords;
use anyhow::{Context, Result};
use std::path::{Component, Path, PathBuf};

/// 模板文件名中的标记段：`<Name>.temporize.<ext>`
pub const TEMPLATE_MARKER: &str = "temporize";

/// 输入目录中的一个模板文件及其在生成代码中的位置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateFile {
    pub path: PathBuf,
    /// 相对输入目录的路径
    pub relative: PathBuf,
    /// 相对目录的各段，即生成代码中的模块路径
    pub package: Vec<String>,
    /// 结构体名
    pub name: String,
    /// 结构体所在的模块（文件）名
    pub module: String,
}

impl TemplateFile {
    pub fn new(input_dir: &Path, path: &Path, keywords: &Keywords) -> Result<Self, BuildError> {
        let relative = path
            .strip_prefix(input_dir)
            .map_err(|_| BuildError::invalid_path(path, "不在输入目录中"))?
            .to_path_buf();

        let file_name = relative
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| BuildError::invalid_path(path, "文件名不是有效的 UTF-8"))?;
        let segments: Vec<&str> = file_name.split('.').collect();
        if segments.len() < 3 || segments[1] != TEMPLATE_MARKER {
            return Err(BuildError::invalid_path(
                path,
                "文件名应为 <Name>.temporize.<ext>",
            ));
        }

        // 以字母开头，结构体名与模块名才不会相同
        let name = ucfirst(segments[0]);
        if !is_identifier(&name) {
            return Err(BuildError::invalid_path(
                path,
                format!("\"{}\" 不是有效的类型名", segments[0]),
            ));
        }
        if keywords.is_reserved(&name) {
            return Err(BuildError::invalid_path(
                path,
                format!("类型名 \"{name}\" 是保留字"),
            ));
        }
        let module = snake_case(&name);
        if keywords.is_reserved(&module) {
            return Err(BuildError::invalid_path(
                path,
                format!("模块名 \"{module}\" 是保留字"),
            ));
        }

        let mut package = Vec::new();
        if let Some(parent) = relative.parent() {
            for component in parent.components() {
                let Component::Normal(segment) = component else {
                    return Err(BuildError::invalid_path(path, "目录中包含非法路径段"));
                };
                let segment = segment
                    .to_str()
                    .ok_or_else(|| BuildError::invalid_path(path, "目录名不是有效的 UTF-8"))?;
                if !is_package_segment(segment) {
                    return Err(BuildError::invalid_path(
                        path,
                        format!("目录名 \"{segment}\" 只能包含小写字母、数字和下划线，且不能以数字开头"),
                    ));
                }
                if keywords.is_reserved(segment) {
                    return Err(BuildError::invalid_path(
                        path,
                        format!("目录名 \"{segment}\" 是保留字"),
                    ));
                }
                package.push(segment.to_owned());
            }
        }

        Ok(Self {
            path: path.to_path_buf(),
            relative,
            package,
            name,
            module,
        })
    }

    /// 点分隔的完整名称，与 `{include a.b.Name as $x}` 中的路径对应
    pub fn qualified_name(&self) -> String {
        let mut parts = self.package.clone();
        parts.push(self.name.clone());
        parts.join(".")
    }

    /// 诊断信息中使用的文件标识
    pub fn source_id(&self) -> String {
        self.relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }

    pub fn output_dir(&self, output_root: &Path) -> PathBuf {
        let mut dir = output_root.to_path_buf();
        dir.extend(&self.package);
        dir
    }

    pub fn output_path(&self, output_root: &Path) -> PathBuf {
        self.output_dir(output_root)
            .join(format!("{}.rs", self.module))
    }
}

/// 文件名形如 `<Name>.temporize.<ext>`
pub fn is_template(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|name| {
            let mut segments = name.split('.');
            segments.next().is_some_and(|s| !s.is_empty())
                && segments.next() == Some(TEMPLATE_MARKER)
                && segments.next().is_some()
        })
}

/// 递归查找输入目录下的所有模板，按相对路径排序
pub fn discover(input_dir: &Path, keywords: &Keywords) -> Result<Vec<TemplateFile>> {
    let mut paths = Vec::new();
    collect_paths(input_dir, &mut paths)?;
    paths.sort();

    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        files.push(TemplateFile::new(input_dir, &path, keywords)?);
    }
    tracing::debug!("在 {} 中找到 {} 个模板", input_dir.display(), files.len());
    Ok(files)
}

fn collect_paths(current_dir: &Path, paths: &mut Vec<PathBuf>) -> Result<()> {
    let entries = std::fs::read_dir(current_dir)
        .with_context(|| format!("读取目录 {} 失败", current_dir.display()))?;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_paths(&path, paths)?;
        } else if is_template(&path) {
            paths.push(path);
        } else {
            tracing::trace!("忽略非模板文件：{}", path.display());
        }
    }
    Ok(())
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_package_segment(segment: &str) -> bool {
    let mut chars = segment.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// `BlogPost` → `blog_post`，`HTMLPage` → `html_page`
pub fn snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                Some(p) if p.is_ascii_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_ascii_uppercase() => next.is_some_and(|n| n.is_ascii_lowercase()),
                _ => false,
            };
            if boundary && !out.ends_with('_') {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
