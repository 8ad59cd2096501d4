//! temporize：把模板 DSL 编译为 Rust 源码。
//!
//! 每个 `<Name>.temporize.<ext>` 文件生成一个结构体，字段对应模板中的变量、
//! 循环块、引入与布尔标记，并实现 [`runtime::Template`]。

pub mod build;
pub mod check;
pub mod compiler;
pub mod config;
pub mod runtime;

pub use compiler::Compiler;
pub use runtime::Template;
