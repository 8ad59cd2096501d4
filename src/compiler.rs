pub mod codegen;
pub mod error;
pub mod keywords;
pub mod lexer;
pub mod modifiers;
pub mod parser;

use crate::compiler::codegen::{Codegen, CodegenOptions, GeneratedUnit};
use crate::compiler::error::CompileError;
use crate::compiler::keywords::Keywords;
use crate::compiler::lexer::Lexer;
use crate::compiler::modifiers::ModifierTable;
use std::io::BufRead;

/// 单个模板的编译结果
#[derive(Debug, Clone)]
pub struct CompileOutput {
    /// 源码的 SHA-256（十六进制）
    pub hash: String,
    pub unit: GeneratedUnit,
}

/// 编译器：保留字表、修饰符表与生成选项在整个任务中共享
#[derive(Debug, Clone)]
pub struct Compiler {
    keywords: Keywords,
    modifiers: ModifierTable,
    options: CodegenOptions,
}

impl Default for Compiler {
    fn default() -> Self {
        let options = CodegenOptions::default();
        Self {
            keywords: Keywords::default(),
            modifiers: ModifierTable::builtin(&options.runtime_path),
            options,
        }
    }
}

impl Compiler {
    pub fn new(keywords: Keywords, modifiers: ModifierTable, options: CodegenOptions) -> Self {
        Self {
            keywords,
            modifiers,
            options,
        }
    }

    pub fn keywords(&self) -> &Keywords {
        &self.keywords
    }

    /// 分词 → 构建 AST → 生成代码
    pub fn compile<R: BufRead>(
        &self,
        source_id: &str,
        reader: R,
        scope_name: &str,
        qualified_name: &str,
    ) -> Result<CompileOutput, CompileError> {
        let parsed = Lexer::new(&self.keywords).tokenize(source_id, reader)?;
        let ast = parser::build(parsed.tokens())?;
        let unit = Codegen::new(&self.modifiers, &self.options).compile(
            source_id,
            scope_name,
            qualified_name,
            &ast,
        )?;
        Ok(CompileOutput {
            hash: parsed.hash_hex(),
            unit,
        })
    }

    pub fn compile_str(
        &self,
        source_id: &str,
        source: &str,
        scope_name: &str,
        qualified_name: &str,
    ) -> Result<CompileOutput, CompileError> {
        self.compile(source_id, source.as_bytes(), scope_name, qualified_name)
    }
}
