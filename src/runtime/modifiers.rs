//! 内置修饰符。生成代码以 `fn(&str) -> String` 的形式调用它们，
//! 自定义修饰符只需提供相同签名的函数。

/// 所有内置修饰符的名称
pub const NAMES: &[&str] = &[
    "def",
    "html",
    "urlenc",
    "upper",
    "lower",
    "capitalize",
    "trim",
    "slugify",
];

/// 默认修饰符（`{*$name}`），HTML 转义，同时处理单引号
pub fn def(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

pub fn html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// application/x-www-form-urlencoded 编码：空格变为 `+`，其余按 UTF-8 字节百分号编码
pub fn urlenc(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'.' | b'-' | b'*' | b'_' => {
                out.push(byte as char)
            }
            b' ' => out.push('+'),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

pub fn upper(value: &str) -> String {
    value.to_uppercase()
}

pub fn lower(value: &str) -> String {
    value.to_lowercase()
}

pub fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => {
            let mut result = first.to_uppercase().to_string();
            result.extend(chars);
            result
        }
    }
}

pub fn trim(value: &str) -> String {
    value.trim().to_owned()
}

pub fn slugify(value: &str) -> String {
    value
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}
