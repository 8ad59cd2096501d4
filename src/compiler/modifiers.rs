use std::collections::BTreeMap;

/// 内置修饰符名称，与 runtime::modifiers 中的函数一一对应
pub const BUILTIN_MODIFIERS: &[&str] = crate::runtime::modifiers::NAMES;

/// 把模板中的修饰符名称解析为生成代码中可调用的函数路径
pub trait ModifierResolver: Sync {
    /// 返回 `fn(&str) -> String` 的完整路径；未知名称返回 None
    fn resolve(&self, name: &str) -> Option<String>;
}

/// 修饰符表：内置修饰符加上 temporize.toml 中声明的自定义修饰符
#[derive(Debug, Clone, Default)]
pub struct ModifierTable {
    entries: BTreeMap<String, String>,
}

impl ModifierTable {
    /// 仅包含内置修饰符，runtime_path 为运行时模块的路径
    pub fn builtin(runtime_path: &str) -> Self {
        let entries = BUILTIN_MODIFIERS
            .iter()
            .map(|name| (name.to_string(), format!("{runtime_path}::modifiers::{name}")))
            .collect();
        Self { entries }
    }

    /// 追加自定义修饰符，同名时覆盖内置实现
    pub fn with_module<I, S>(mut self, module: &str, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in names {
            let name = name.as_ref();
            self.entries
                .insert(name.to_owned(), format!("{module}::{name}"));
        }
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl ModifierResolver for ModifierTable {
    fn resolve(&self, name: &str) -> Option<String> {
        self.entries.get(name).cloned()
    }
}
