use crate::compiler::Compiler;
use crate::compiler::codegen::CodegenOptions;
use crate::compiler::keywords::Keywords;
use crate::compiler::modifiers::ModifierTable;
use anyhow::Result;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "temporize.toml";

#[derive(Debug, Default, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub build: BuildConfig,
    #[serde(default)]
    pub codegen: CodegenConfig,
    #[serde(default)]
    pub modifiers: ModifierConfig,
    #[serde(default)]
    pub compiler: CompilerConfig,
}

#[derive(Debug, Deserialize)]
pub struct BuildConfig {
    #[serde(default = "default_input_dir")]
    pub input_dir: String,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct CodegenConfig {
    #[serde(default = "default_templates_path")]
    pub templates_path: String,
    #[serde(default = "default_runtime_path")]
    pub runtime_path: String,
}

/// 自定义修饰符：module 下的同名函数，签名为 `fn(&str) -> String`
#[derive(Debug, Deserialize)]
pub struct ModifierConfig {
    #[serde(default = "default_modifier_module")]
    pub module: String,
    #[serde(default)]
    pub names: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CompilerConfig {
    /// 追加的保留字
    #[serde(default)]
    pub reserved: Vec<String>,
}

impl ProjectConfig {
    /// 读取项目根目录下的 temporize.toml；文件不存在时使用默认配置
    pub fn load(project_root: &Path) -> Result<Self> {
        let config_path = project_root.join(CONFIG_FILE);
        if !config_path.exists() {
            tracing::debug!("未找到 {CONFIG_FILE}，使用默认配置");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| anyhow::anyhow!("读取 {CONFIG_FILE} 失败：{}", e))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: ProjectConfig = toml::from_str(content)
            .map_err(|e| anyhow::anyhow!("解析 {CONFIG_FILE} 失败：{}", e))?;
        Ok(config)
    }

    pub fn input_dir(&self, project_root: &Path) -> PathBuf {
        project_root.join(&self.build.input_dir)
    }

    pub fn output_dir(&self, project_root: &Path) -> PathBuf {
        project_root.join(&self.build.output_dir)
    }

    pub fn keywords(&self) -> Keywords {
        Keywords::with_extra(&self.compiler.reserved)
    }

    /// 按配置组装编译器
    pub fn compiler(&self) -> Compiler {
        let options = CodegenOptions {
            templates_path: self.codegen.templates_path.clone(),
            runtime_path: self.codegen.runtime_path.clone(),
        };
        let modifiers = ModifierTable::builtin(&options.runtime_path)
            .with_module(&self.modifiers.module, &self.modifiers.names);
        Compiler::new(self.keywords(), modifiers, options)
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            input_dir: default_input_dir(),
            output_dir: default_output_dir(),
            log_level: default_log_level(),
        }
    }
}

impl Default for CodegenConfig {
    fn default() -> Self {
        Self {
            templates_path: default_templates_path(),
            runtime_path: default_runtime_path(),
        }
    }
}

impl Default for ModifierConfig {
    fn default() -> Self {
        Self {
            module: default_modifier_module(),
            names: Vec::new(),
        }
    }
}

// 默认值函数
fn default_input_dir() -> String { "templates".into() }
fn default_output_dir() -> String { "src/templates".into() }
fn default_log_level() -> String { "info".into() }
fn default_templates_path() -> String { "crate::templates".into() }
fn default_runtime_path() -> String { "::temporize::runtime".into() }
fn default_modifier_module() -> String { "crate::modifiers".into() }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = ProjectConfig::parse("").unwrap();
        assert_eq!(config.build.input_dir, "templates");
        assert_eq!(config.build.output_dir, "src/templates");
        assert_eq!(config.build.log_level, "info");
        assert_eq!(config.codegen.templates_path, "crate::templates");
        assert_eq!(config.codegen.runtime_path, "::temporize::runtime");
        assert_eq!(config.modifiers.module, "crate::modifiers");
        assert!(config.modifiers.names.is_empty());
        assert!(config.compiler.reserved.is_empty());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = ProjectConfig::parse(
            r#"
[build]
output_dir = "src/views"

[modifiers]
names = ["shout"]

[compiler]
reserved = ["render"]
"#,
        )
        .unwrap();
        assert_eq!(config.build.input_dir, "templates");
        assert_eq!(config.build.output_dir, "src/views");
        assert_eq!(config.modifiers.names, vec!["shout"]);
        assert!(config.keywords().is_reserved("Render"));

        let root = Path::new("/project");
        assert_eq!(config.output_dir(root), PathBuf::from("/project/src/views"));
    }

    #[test]
    fn compiler_uses_configured_modifiers() {
        let config = ProjectConfig::parse(
            r#"
[codegen]
runtime_path = "rt"

[modifiers]
module = "my::mods"
names = ["shout"]
"#,
        )
        .unwrap();
        let output = config
            .compiler()
            .compile_str("t", "{$a|shout}{*$b}", "T", "T")
            .unwrap();
        assert!(output.unit.source.contains("my::mods::shout(&self.a)"));
        assert!(output.unit.source.contains("rt::modifiers::def(&self.b)"));
    }

    #[test]
    fn malformed_file_is_an_error() {
        assert!(ProjectConfig::parse("[build\ninput_dir = 1").is_err());
    }

    #[test]
    fn missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = ProjectConfig::load(dir.path()).unwrap();
        assert_eq!(config.build.input_dir, "templates");
    }
}
