use std::path::PathBuf;
use thiserror::Error;

/// 整批模板编译之后的校验与落盘错误
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("模板 {unit} 引入了不存在的模板 {include}")]
    DanglingInclude { unit: String, include: String },

    #[error("模板 {name} 重复：{} 与 {}", first.display(), second.display())]
    DuplicateUnit {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("无效的模板路径 {}：{reason}", path.display())]
    InvalidTemplatePath { path: PathBuf, reason: String },

    #[error("输出文件 {} 不是由 temporize 生成的，拒绝覆盖", path.display())]
    UnmanagedOutput { path: PathBuf },
}

impl BuildError {
    pub fn invalid_path(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidTemplatePath {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
