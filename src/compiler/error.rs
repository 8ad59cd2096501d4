use std::fmt;
use std::io;
use thiserror::Error;

/// 源码位置，行号与列号均从 1 开始（列按字符计）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    /// 由行内字节偏移计算位置
    pub fn in_line(line_text: &str, line: usize, byte_offset: usize) -> Self {
        let column = line_text
            .get(..byte_offset)
            .map_or(byte_offset, |prefix| prefix.chars().count())
            + 1;
        Self { line, column }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self { line: 1, column: 1 }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("{}", format_error(
        "保留字冲突",
        source_id,
        Some(*position),
        &format!("标识符 \"{name}\" 是输出语言的保留字"),
        Some(&format!("换一个名称，例如 \"{name}_value\"")),
    ))]
    ReservedIdentifier {
        source_id: String,
        position: Position,
        name: String,
    },

    #[error("{}", format_error("未匹配的循环块", source_id, Some(*position), message, None))]
    UnmatchedBlock {
        source_id: String,
        position: Position,
        message: String,
    },

    #[error("{}", format_error("分支不匹配", source_id, Some(*position), message, None))]
    MismatchedBranch {
        source_id: String,
        position: Position,
        message: String,
    },

    #[error("{}", format_error(
        "名称冲突",
        source_id,
        Some(*position),
        &format!("作用域 {scope} 中的名称互相冲突：{}", names.join(", ")),
        Some("循环块、引入别名和变量在同一作用域内首字母大写后不能重名"),
    ))]
    Collision {
        source_id: String,
        position: Position,
        scope: String,
        names: Vec<String>,
    },

    #[error("{}", format_error(
        "未知修饰符",
        source_id,
        Some(*position),
        &format!("修饰符 \"{name}\" 未注册"),
        Some("内置修饰符之外的名称需要在 temporize.toml 的 [modifiers] names 中声明"),
    ))]
    UnknownModifier {
        source_id: String,
        position: Position,
        name: String,
    },

    #[error("{}", format_error("读取失败", source_id, None, &error.to_string(), None))]
    Io {
        source_id: String,
        #[source]
        error: io::Error,
    },
}

impl CompileError {
    pub fn reserved(source_id: &str, position: Position, name: impl Into<String>) -> Self {
        Self::ReservedIdentifier {
            source_id: source_id.to_owned(),
            position,
            name: name.into(),
        }
    }

    pub fn unmatched_block(source_id: &str, position: Position, message: impl Into<String>) -> Self {
        Self::UnmatchedBlock {
            source_id: source_id.to_owned(),
            position,
            message: message.into(),
        }
    }

    pub fn mismatched_branch(source_id: &str, position: Position, message: impl Into<String>) -> Self {
        Self::MismatchedBranch {
            source_id: source_id.to_owned(),
            position,
            message: message.into(),
        }
    }

    pub fn io(source_id: &str, error: io::Error) -> Self {
        Self::Io {
            source_id: source_id.to_owned(),
            error,
        }
    }

    /// 出错位置；I/O 错误没有位置
    pub fn position(&self) -> Option<Position> {
        match self {
            Self::ReservedIdentifier { position, .. }
            | Self::UnmatchedBlock { position, .. }
            | Self::MismatchedBranch { position, .. }
            | Self::Collision { position, .. }
            | Self::UnknownModifier { position, .. } => Some(*position),
            Self::Io { .. } => None,
        }
    }

    pub fn source_id(&self) -> &str {
        match self {
            Self::ReservedIdentifier { source_id, .. }
            | Self::UnmatchedBlock { source_id, .. }
            | Self::MismatchedBranch { source_id, .. }
            | Self::Collision { source_id, .. }
            | Self::UnknownModifier { source_id, .. }
            | Self::Io { source_id, .. } => source_id,
        }
    }
}

fn format_error(
    kind: &str,
    file: &str,
    position: Option<Position>,
    message: &str,
    hint: Option<&str>,
) -> String {
    let mut out = match position {
        Some(p) => format!("temporize {kind}\n  → {file}:{}:{}\n", p.line, p.column),
        None => format!("temporize {kind}\n  → {file}\n"),
    };
    out.push_str(&format!("  错误：{message}"));
    if let Some(h) = hint {
        out.push_str(&format!("\n  提示：{h}"));
    }
    out
}

/// 截取出错行附近的源码，用于终端诊断输出
pub fn source_context(source: &str, error_line: usize) -> String {
    let lines: Vec<&str> = source.lines().collect();
    let start = error_line.saturating_sub(3);
    let end = (error_line + 2).min(lines.len());

    let mut ctx = String::new();
    let width = format!("{}", end).len();
    for i in start..end {
        let marker = if i + 1 == error_line { ">" } else { " " };
        ctx.push_str(&format!(
            "  {} {:>width$} | {}\n",
            marker,
            i + 1,
            lines.get(i).unwrap_or(&""),
            width = width,
        ));
    }
    ctx
}
