use sha2::{Digest, Sha256};
use std::io::{BufRead, BufReader};
use std::path::Path;

/// 生成文件首行的标记，之后紧跟源码哈希
pub const MARKER_PREFIX: &str = "/* $TEMPORIZE$SOURCE-HASH:";
const MARKER_SUFFIX: &str = " */";

/// 构建统计信息
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BuildStats {
    /// 计划输出的文件数（含 mod.rs）
    pub total: usize,
    pub written: usize,
    pub unchanged: usize,
    /// 删除的过期生成文件
    pub removed: usize,
}

/// 计算任意字节数据的 SHA-256 哈希（十六进制）
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// 生成文件的头部：标记行与提示行
pub fn header(hash: &str, origin: &str) -> String {
    format!("{MARKER_PREFIX}{hash}{MARKER_SUFFIX}\n// 由 temporize 从 {origin} 生成，请勿手动修改。\n")
}

/// 从首行中解析出哈希；不是标记行时返回 None
pub fn parse_marker(line: &str) -> Option<&str> {
    line.trim_end()
        .strip_prefix(MARKER_PREFIX)?
        .strip_suffix(MARKER_SUFFIX)
}

/// 读取文件首行的标记哈希；文件不存在或未标记时返回 None
pub fn read_marker(path: &Path) -> Option<String> {
    let file = std::fs::File::open(path).ok()?;
    let mut first = String::new();
    BufReader::new(file).read_line(&mut first).ok()?;
    parse_marker(&first).map(str::to_owned)
}

/// 是否为 temporize 生成的文件
pub fn is_marked(path: &Path) -> bool {
    read_marker(path).is_some()
}
