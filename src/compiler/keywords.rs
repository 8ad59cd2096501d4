use std::collections::HashSet;

/// 输出语言（Rust）的关键字：严格、保留与上下文关键字
const RUST_KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum",
    "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move",
    "mut", "pub", "ref", "return", "self", "static", "struct", "super", "trait", "true",
    "type", "unsafe", "use", "where", "while", "abstract", "become", "box", "do", "final",
    "gen", "macro", "override", "priv", "try", "typeof", "unsized", "virtual", "yield",
    "union", "macro_rules", "raw", "safe", "_",
];

/// 保留字表，整个任务期间固定不变
#[derive(Debug, Clone, Default)]
pub struct Keywords {
    extra: HashSet<String>,
}

impl Keywords {
    /// 在内置关键字之外追加保留字（来自 temporize.toml 的 [compiler] reserved）
    pub fn with_extra<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            extra: extra
                .into_iter()
                .map(|s| s.as_ref().to_ascii_lowercase())
                .collect(),
        }
    }

    /// 大小写不敏感地判断是否为保留字
    pub fn is_reserved(&self, name: &str) -> bool {
        let lower = name.to_ascii_lowercase();
        RUST_KEYWORDS.contains(&lower.as_str()) || self.extra.contains(&lower)
    }
}
