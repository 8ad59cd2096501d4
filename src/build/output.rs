use crate::build::error::BuildError;
use crate::build::incremental::{self, BuildStats};
use crate::build::pipeline::CompiledTemplate;
use anyhow::{Context, Result};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};

/// 一个待写入的文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedFile {
    pub path: PathBuf,
    pub contents: String,
}

/// 整批输出，按路径排序
#[derive(Debug, Clone, Default)]
pub struct OutputPlan {
    pub files: Vec<PlannedFile>,
}

impl OutputPlan {
    pub fn paths(&self) -> HashSet<&Path> {
        self.files.iter().map(|f| f.path.as_path()).collect()
    }
}

/// 单个目录中的模块声明
#[derive(Default)]
struct ModuleDir {
    /// (模块名, 结构体名)
    units: BTreeSet<(String, String)>,
    children: BTreeSet<String>,
}

/// 为每个模板生成文件内容，并为每个输出目录生成 mod.rs
pub fn plan(compiled: &[CompiledTemplate], output_dir: &Path) -> OutputPlan {
    let mut files = Vec::with_capacity(compiled.len() * 2);
    let mut dirs: BTreeMap<Vec<String>, ModuleDir> = BTreeMap::new();
    dirs.entry(Vec::new()).or_default();

    for template in compiled {
        let file = &template.file;
        let mut contents = incremental::header(&template.hash, &file.source_id());
        contents.push_str("#![allow(non_snake_case, non_camel_case_types)]\n\n");
        contents.push_str(&template.unit.module_source());
        files.push(PlannedFile {
            path: file.output_path(output_dir),
            contents,
        });

        dirs.entry(file.package.clone())
            .or_default()
            .units
            .insert((file.module.clone(), file.name.clone()));
        for depth in 0..file.package.len() {
            dirs.entry(file.package[..depth].to_vec())
                .or_default()
                .children
                .insert(file.package[depth].clone());
        }
    }

    for (package, dir) in &dirs {
        let mut body = String::new();
        let mut modules: Vec<&str> = dir.children.iter().map(String::as_str).collect();
        modules.extend(dir.units.iter().map(|(module, _)| module.as_str()));
        modules.sort_unstable();
        for module in modules {
            body.push_str(&format!("pub mod {module};\n"));
        }
        if !dir.units.is_empty() {
            body.push('\n');
            for (module, name) in &dir.units {
                body.push_str(&format!("pub use self::{module}::{name};\n"));
            }
        }

        let origin = if package.is_empty() {
            "模板目录".to_owned()
        } else {
            format!("模板目录 {}/", package.join("/"))
        };
        let mut contents = incremental::header(&incremental::hash_bytes(body.as_bytes()), &origin);
        contents.push('\n');
        contents.push_str(&body);

        let mut path = output_dir.to_path_buf();
        path.extend(package);
        files.push(PlannedFile {
            path: path.join("mod.rs"),
            contents,
        });
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    OutputPlan { files }
}

/// 递归查找输出目录下所有带标记的文件
pub fn scan_marked(output_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut marked = Vec::new();
    if output_dir.exists() {
        scan_dir(output_dir, &mut marked)?;
    }
    marked.sort();
    Ok(marked)
}

fn scan_dir(current_dir: &Path, marked: &mut Vec<PathBuf>) -> Result<()> {
    let entries = std::fs::read_dir(current_dir)
        .with_context(|| format!("读取目录 {} 失败", current_dir.display()))?;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            scan_dir(&path, marked)?;
        } else if path.extension().is_some_and(|ext| ext == "rs") && incremental::is_marked(&path) {
            marked.push(path);
        }
    }
    Ok(())
}

/// 带标记但不在本次输出中的文件
pub fn stale(plan: &OutputPlan, output_dir: &Path) -> Result<Vec<PathBuf>> {
    let planned = plan.paths();
    Ok(scan_marked(output_dir)?
        .into_iter()
        .filter(|path| !planned.contains(path.as_path()))
        .collect())
}

/// 删除所有生成文件，未标记的文件保持不动
pub fn clean(output_dir: &Path) -> Result<usize> {
    let marked = scan_marked(output_dir)?;
    for path in &marked {
        remove_generated(path, output_dir)?;
    }
    if !marked.is_empty() {
        tracing::info!("已清除 {} 个生成文件：{}", marked.len(), output_dir.display());
    }
    Ok(marked.len())
}

/// 计划中的路径若已存在，必须是带标记的生成文件
pub fn ensure_managed(plan: &OutputPlan) -> Result<(), BuildError> {
    for file in &plan.files {
        if file.path.exists() && !incremental::is_marked(&file.path) {
            return Err(BuildError::UnmanagedOutput {
                path: file.path.clone(),
            });
        }
    }
    Ok(())
}

/// 落盘：先确认不会覆盖手写文件，再删除过期文件，最后写入内容有变化的文件
pub fn persist(plan: &OutputPlan, output_dir: &Path, force: bool) -> Result<BuildStats> {
    ensure_managed(plan)?;

    let mut stats = BuildStats {
        total: plan.files.len(),
        ..Default::default()
    };

    for path in stale(plan, output_dir)? {
        remove_generated(&path, output_dir)?;
        tracing::info!("已删除过期文件：{}", path.display());
        stats.removed += 1;
    }

    for file in &plan.files {
        if !force
            && let Ok(existing) = std::fs::read_to_string(&file.path)
            && existing == file.contents
        {
            stats.unchanged += 1;
            continue;
        }
        if let Some(parent) = file.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("创建目录 {} 失败", parent.display()))?;
        }
        std::fs::write(&file.path, &file.contents)
            .with_context(|| format!("写入 {} 失败", file.path.display()))?;
        tracing::debug!("已写入 {}", file.path.display());
        stats.written += 1;
    }

    Ok(stats)
}

/// 删除文件，并向上清理因此变空的目录（不删除输出根目录）
fn remove_generated(path: &Path, output_dir: &Path) -> Result<()> {
    std::fs::remove_file(path).with_context(|| format!("删除 {} 失败", path.display()))?;
    let mut dir = path.parent();
    while let Some(current) = dir {
        if current == output_dir || !current.starts_with(output_dir) {
            break;
        }
        let is_empty = std::fs::read_dir(current)
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(false);
        if !is_empty || std::fs::remove_dir(current).is_err() {
            break;
        }
        dir = current.parent();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::template_file::TemplateFile;
    use crate::compiler::Compiler;
    use crate::compiler::keywords::Keywords;

    fn compiled(relative: &str, source: &str) -> CompiledTemplate {
        let input = Path::new("/in");
        let file = TemplateFile::new(input, &input.join(relative), &Keywords::default()).unwrap();
        let output = Compiler::default()
            .compile_str(&file.source_id(), source, &file.name, &file.qualified_name())
            .unwrap();
        CompiledTemplate {
            file,
            hash: output.hash,
            unit: output.unit,
        }
    }

    fn contents<'a>(plan: &'a OutputPlan, path: &str) -> &'a str {
        plan.files
            .iter()
            .find(|f| f.path == Path::new(path))
            .map(|f| f.contents.as_str())
            .unwrap_or_else(|| panic!("{path} not planned"))
    }

    #[test]
    fn plan_writes_units_and_module_files() {
        let batch = [
            compiled("Index.temporize.html", "{$title}"),
            compiled("blog/post/BlogPost.temporize.html", "{$body}"),
        ];
        let plan = plan(&batch, Path::new("/out"));
        let paths: Vec<&Path> = plan.files.iter().map(|f| f.path.as_path()).collect();
        assert_eq!(
            paths,
            vec![
                Path::new("/out/blog/mod.rs"),
                Path::new("/out/blog/post/blog_post.rs"),
                Path::new("/out/blog/post/mod.rs"),
                Path::new("/out/index.rs"),
                Path::new("/out/mod.rs"),
            ]
        );

        let root = contents(&plan, "/out/mod.rs");
        assert!(root.starts_with(incremental::MARKER_PREFIX));
        assert!(root.ends_with("pub mod blog;\npub mod index;\n\npub use self::index::Index;\n"));
        assert!(contents(&plan, "/out/blog/mod.rs").ends_with("\npub mod post;\n"));
        assert!(contents(&plan, "/out/blog/post/mod.rs")
            .ends_with("pub mod blog_post;\n\npub use self::blog_post::BlogPost;\n"));

        let unit = contents(&plan, "/out/index.rs");
        let marker = unit.lines().next().unwrap();
        assert_eq!(incremental::parse_marker(marker), Some(batch[0].hash.as_str()));
        assert!(unit.contains("#![allow(non_snake_case, non_camel_case_types)]"));
        assert!(unit.contains("pub struct Index {"));
    }

    #[test]
    fn persist_skips_unchanged_and_removes_stale() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path();
        let batch = [compiled("Index.temporize.html", "{$title}")];
        let plan = plan(&batch, out);

        let first = persist(&plan, out, false).unwrap();
        assert_eq!(first, BuildStats { total: 2, written: 2, unchanged: 0, removed: 0 });

        std::fs::create_dir_all(out.join("old")).unwrap();
        std::fs::write(out.join("old/gone.rs"), format!("{}pub struct Gone;\n", incremental::header("00", "x")))
            .unwrap();
        std::fs::write(out.join("handwritten.rs"), "pub fn keep() {}\n").unwrap();

        let second = persist(&plan, out, false).unwrap();
        assert_eq!(second, BuildStats { total: 2, written: 0, unchanged: 2, removed: 1 });
        assert!(!out.join("old").exists());
        assert!(out.join("handwritten.rs").exists());

        let forced = persist(&plan, out, true).unwrap();
        assert_eq!(forced.written, 2);
    }

    #[test]
    fn persist_refuses_to_overwrite_unmarked_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path();
        std::fs::write(out.join("index.rs"), "// mine\n").unwrap();

        let plan = plan(&[compiled("Index.temporize.html", "x")], out);
        let err = persist(&plan, out, false).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BuildError>(),
            Some(BuildError::UnmanagedOutput { .. })
        ));
        assert!(!out.join("mod.rs").exists());
    }

    #[test]
    fn ensure_managed_accepts_missing_and_marked_files() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path();
        let plan = plan(&[compiled("Index.temporize.html", "x")], out);
        ensure_managed(&plan).unwrap();

        persist(&plan, out, false).unwrap();
        ensure_managed(&plan).unwrap();

        std::fs::write(out.join("mod.rs"), "// mine\n").unwrap();
        assert!(matches!(
            ensure_managed(&plan),
            Err(BuildError::UnmanagedOutput { path }) if path == out.join("mod.rs")
        ));
    }

    #[test]
    fn clean_removes_only_marked_files() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path();
        let plan = plan(&[compiled("a/Page.temporize.html", "x")], out);
        persist(&plan, out, false).unwrap();
        std::fs::write(out.join("a/notes.rs"), "// mine\n").unwrap();

        assert_eq!(clean(out).unwrap(), 3);
        assert!(out.join("a/notes.rs").exists());
        assert!(!out.join("a/page.rs").exists());
        assert!(!out.join("mod.rs").exists());
    }
}
