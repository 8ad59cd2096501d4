use crate::compiler::error::{CompileError, Position};
use crate::compiler::modifiers::ModifierResolver;
use crate::compiler::parser::{Ast, NodeId, NodeKind};
use std::collections::{BTreeSet, HashMap};
use std::fmt::Write as _;

/// 代码生成选项，整个任务期间固定不变
#[derive(Debug, Clone)]
pub struct CodegenOptions {
    /// 生成模块根的路径，用于引用 include 目标
    pub templates_path: String,
    /// Template trait 所在模块的路径
    pub runtime_path: String,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        Self {
            templates_path: "crate::templates".into(),
            runtime_path: "::temporize::runtime".into(),
        }
    }
}

/// 一个作用域生成的代码单元，循环块对应嵌套单元
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedUnit {
    /// 结构体名
    pub name: String,
    /// 点分隔的完整名称，例如 `blog.post.Post`
    pub qualified_name: String,
    /// 本作用域的结构体与 impl
    pub source: String,
    /// 本作用域引用的模板（点分隔路径）
    pub includes: BTreeSet<String>,
    pub nested: Vec<GeneratedUnit>,
}

impl GeneratedUnit {
    /// 完整模块内容：本单元后跟每个循环块对应的子模块
    pub fn module_source(&self) -> String {
        let mut out = self.source.clone();
        for nested in &self.nested {
            let _ = writeln!(out);
            let _ = writeln!(out, "pub mod {} {{", lcfirst(&nested.name));
            for line in nested.module_source().lines() {
                if line.is_empty() {
                    out.push('\n');
                } else {
                    let _ = writeln!(out, "    {line}");
                }
            }
            let _ = writeln!(out, "}}");
        }
        out
    }

    /// 本单元及所有嵌套单元引用的模板
    pub fn all_includes(&self) -> BTreeSet<String> {
        let mut all = self.includes.clone();
        for nested in &self.nested {
            all.extend(nested.all_includes());
        }
        all
    }
}

pub struct Codegen<'a> {
    resolver: &'a dyn ModifierResolver,
    options: &'a CodegenOptions,
}

impl<'a> Codegen<'a> {
    pub fn new(resolver: &'a dyn ModifierResolver, options: &'a CodegenOptions) -> Self {
        Self { resolver, options }
    }

    /// 为 AST 的根作用域生成代码单元，并递归处理循环块
    pub fn compile(
        &self,
        source_id: &str,
        scope_name: &str,
        qualified_name: &str,
        ast: &Ast,
    ) -> Result<GeneratedUnit, CompileError> {
        self.compile_scope(source_id, scope_name, qualified_name, ast, ast.root())
    }

    fn compile_scope(
        &self,
        source_id: &str,
        scope_name: &str,
        qualified_name: &str,
        ast: &Ast,
        start: NodeId,
    ) -> Result<GeneratedUnit, CompileError> {
        let scope = Scope::collect(ast, start, source_id, qualified_name, self.resolver)?;

        let mut nested = Vec::with_capacity(scope.blocks.len());
        for block in &scope.blocks {
            let name = ucfirst(&block.name);
            let qualified = format!("{qualified_name}.{}.{name}", lcfirst(&block.name));
            nested.push(self.compile_scope(source_id, &name, &qualified, ast, block.branch)?);
        }

        let mut emitter = Emitter {
            codegen: self,
            source_id,
            scope: &scope,
            ast,
            out: String::new(),
        };
        emitter.emit_unit(scope_name, start)?;

        tracing::trace!("生成 {qualified_name}：{} 个字段", scope.field_count());

        Ok(GeneratedUnit {
            name: scope_name.to_owned(),
            qualified_name: qualified_name.to_owned(),
            source: emitter.out,
            includes: scope.includes.iter().map(|i| i.path.clone()).collect(),
            nested,
        })
    }

    fn modifier_path(&self, source_id: &str, name: &str, position: Position) -> Result<String, CompileError> {
        self.resolver
            .resolve(name)
            .ok_or_else(|| CompileError::UnknownModifier {
                source_id: source_id.to_owned(),
                position,
                name: name.to_owned(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Category {
    Variable,
    Block,
    Include,
}

struct BlockField {
    name: String,
    branch: NodeId,
}

struct IncludeField {
    alias: String,
    path: String,
}

/// 条件分支的判定方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Test {
    NonEmptyString,
    NonEmptyList,
    Present,
    Flag,
}

/// 单个作用域中收集到的名称
struct Scope {
    variables: Vec<String>,
    blocks: Vec<BlockField>,
    includes: Vec<IncludeField>,
    flags: Vec<String>,
    /// 变量、循环块与引入别名按遍历顺序排列
    entries: Vec<(Category, String, Position)>,
}

impl Scope {
    fn collect(
        ast: &Ast,
        start: NodeId,
        source_id: &str,
        qualified_name: &str,
        resolver: &dyn ModifierResolver,
    ) -> Result<Self, CompileError> {
        let mut scope = Scope {
            variables: Vec::new(),
            blocks: Vec::new(),
            includes: Vec::new(),
            flags: Vec::new(),
            entries: Vec::new(),
        };
        let mut conditionals = Vec::new();
        scope.walk(ast, start, source_id, resolver, &mut conditionals)?;
        scope.check_collisions(source_id, qualified_name)?;

        for name in conditionals {
            if scope.classify(&name) == Test::Flag && !scope.flags.contains(&name) {
                scope.flags.push(name);
            }
        }
        Ok(scope)
    }

    /// 遍历作用域，进入条件分支但不进入循环块
    fn walk(
        &mut self,
        ast: &Ast,
        start: NodeId,
        source_id: &str,
        resolver: &dyn ModifierResolver,
        conditionals: &mut Vec<String>,
    ) -> Result<(), CompileError> {
        for (_, node) in ast.chain(start) {
            match &node.kind {
                NodeKind::NoOp | NodeKind::ConstantValue(_) => {}
                NodeKind::Variable { name, modifiers } => {
                    for modifier in modifiers {
                        if resolver.resolve(modifier).is_none() {
                            return Err(CompileError::UnknownModifier {
                                source_id: source_id.to_owned(),
                                position: node.position,
                                name: modifier.clone(),
                            });
                        }
                    }
                    if !self.variables.contains(name) {
                        self.variables.push(name.clone());
                        self.entries
                            .push((Category::Variable, name.clone(), node.position));
                    }
                }
                NodeKind::Block { name, branch } => {
                    self.blocks.push(BlockField {
                        name: name.clone(),
                        branch: *branch,
                    });
                    self.entries.push((Category::Block, name.clone(), node.position));
                }
                NodeKind::Include { path, alias } => {
                    self.includes.push(IncludeField {
                        alias: alias.clone(),
                        path: path.clone(),
                    });
                    self.entries
                        .push((Category::Include, alias.clone(), node.position));
                }
                NodeKind::Conditional {
                    name,
                    consequent,
                    alternative,
                } => {
                    conditionals.push(name.clone());
                    self.walk(ast, *consequent, source_id, resolver, conditionals)?;
                    if let Some(alternative) = alternative {
                        self.walk(ast, *alternative, source_id, resolver, conditionals)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// 首字母大写后比较：循环块之间、引入别名之间、以及三类名称之间均不能重名
    fn check_collisions(&self, source_id: &str, qualified_name: &str) -> Result<(), CompileError> {
        let mut seen: HashMap<String, (Category, &str)> = HashMap::new();
        for (category, name, position) in &self.entries {
            let key = ucfirst(name);
            if let Some(&(first_category, first_name)) = seen.get(&key) {
                let same_variable = first_category == Category::Variable
                    && *category == Category::Variable
                    && first_name == name.as_str();
                if !same_variable {
                    return Err(CompileError::Collision {
                        source_id: source_id.to_owned(),
                        position: *position,
                        scope: qualified_name.to_owned(),
                        names: vec![first_name.to_owned(), name.clone()],
                    });
                }
                continue;
            }
            seen.insert(key, (*category, name.as_str()));
        }
        Ok(())
    }

    /// 同一作用域中第一个同名的变量、循环块或引入决定判定方式
    fn classify(&self, name: &str) -> Test {
        self.entries
            .iter()
            .find(|(_, entry, _)| entry == name)
            .map_or(Test::Flag, |(category, _, _)| match category {
                Category::Variable => Test::NonEmptyString,
                Category::Block => Test::NonEmptyList,
                Category::Include => Test::Present,
            })
    }

    fn field_count(&self) -> usize {
        self.variables.len() + self.blocks.len() + self.includes.len() + self.flags.len()
    }
}

struct Emitter<'a, 'b> {
    codegen: &'b Codegen<'a>,
    source_id: &'b str,
    scope: &'b Scope,
    ast: &'b Ast,
    out: String,
}

impl Emitter<'_, '_> {
    fn emit_unit(&mut self, name: &str, start: NodeId) -> Result<(), CompileError> {
        let runtime = self.codegen.options.runtime_path.clone();

        self.emit_struct(name);
        self.line(0, "");
        self.emit_setters(name);
        self.line(0, "");

        self.line(0, &format!("impl {runtime}::Template for {name} {{"));
        self.line(
            1,
            "fn render(&self, w: &mut dyn ::std::fmt::Write) -> ::std::fmt::Result {",
        );
        let body_start = self.out.len();
        self.emit_chain(start, 2)?;
        if self.out.len() == body_start {
            self.line(2, "let _ = w;");
        }
        self.line(2, "::std::result::Result::Ok(())");
        self.line(1, "}");
        self.line(0, "}");
        self.line(0, "");

        self.line(0, &format!("impl ::std::fmt::Display for {name} {{"));
        self.line(
            1,
            "fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {",
        );
        self.line(2, &format!("{runtime}::Template::render(self, f)"));
        self.line(1, "}");
        self.line(0, "}");
        Ok(())
    }

    /// 字段顺序：字符串、列表、引入、布尔标记，各自保持源码顺序
    fn emit_struct(&mut self, name: &str) {
        let scope = self.scope;
        self.line(0, "#[derive(Debug, Clone, Default)]");
        self.line(0, &format!("pub struct {name} {{"));
        for variable in &scope.variables {
            self.line(1, &format!("pub {variable}: ::std::string::String,"));
        }
        for block in &scope.blocks {
            self.line(
                1,
                &format!("pub {}: ::std::vec::Vec<{}>,", block.name, block_type(&block.name)),
            );
        }
        for include in &scope.includes {
            self.line(
                1,
                &format!(
                    "pub {}: ::std::option::Option<::std::boxed::Box<{}>>,",
                    include.alias,
                    self.include_type(&include.path)
                ),
            );
        }
        for flag in &scope.flags {
            self.line(1, &format!("pub {flag}: bool,"));
        }
        self.line(0, "}");
    }

    fn emit_setters(&mut self, name: &str) {
        let scope = self.scope;
        self.line(0, &format!("impl {name} {{"));
        self.line(1, "pub fn new() -> Self {");
        self.line(2, "<Self as ::std::default::Default>::default()");
        self.line(1, "}");

        for variable in &scope.variables {
            self.setter(
                variable,
                "impl ::std::convert::Into<::std::string::String>",
                "value.into()",
            );
        }
        for block in &scope.blocks {
            self.setter(
                &block.name,
                &format!("::std::vec::Vec<{}>", block_type(&block.name)),
                "value",
            );
        }
        for include in &scope.includes {
            let target = self.include_type(&include.path);
            self.setter(
                &include.alias,
                &target,
                "::std::option::Option::Some(::std::boxed::Box::new(value))",
            );
        }
        for flag in &scope.flags {
            self.setter(flag, "bool", "value");
        }
        self.line(0, "}");
    }

    fn setter(&mut self, field: &str, ty: &str, value: &str) {
        self.line(0, "");
        self.line(1, &format!("pub fn with_{field}(mut self, value: {ty}) -> Self {{"));
        self.line(2, &format!("self.{field} = {value};"));
        self.line(2, "self");
        self.line(1, "}");
    }

    fn emit_chain(&mut self, start: NodeId, depth: usize) -> Result<(), CompileError> {
        let runtime = self.codegen.options.runtime_path.clone();
        let ast = self.ast;

        for (_, node) in ast.chain(start) {
            match &node.kind {
                NodeKind::NoOp => {}
                NodeKind::ConstantValue(text) => {
                    self.line(depth, &format!("w.write_str(\"{}\")?;", escape_literal(text)));
                }
                NodeKind::Variable { name, modifiers } => {
                    let mut expr = format!("&self.{name}");
                    for modifier in modifiers {
                        let path = self
                            .codegen
                            .modifier_path(self.source_id, modifier, node.position)?;
                        expr = format!("&{path}({expr})");
                    }
                    self.line(depth, &format!("w.write_str({expr})?;"));
                }
                NodeKind::Block { name, .. } => {
                    self.line(depth, &format!("for item in &self.{name} {{"));
                    self.line(depth + 1, &format!("{runtime}::Template::render(item, w)?;"));
                    self.line(depth, "}");
                }
                NodeKind::Include { alias, .. } => {
                    self.line(
                        depth,
                        &format!("if let ::std::option::Option::Some(unit) = &self.{alias} {{"),
                    );
                    self.line(depth + 1, &format!("{runtime}::Template::render(&**unit, w)?;"));
                    self.line(depth, "}");
                }
                NodeKind::Conditional {
                    name,
                    consequent,
                    alternative,
                } => {
                    let test = match self.scope.classify(name) {
                        Test::NonEmptyString | Test::NonEmptyList => {
                            format!("!self.{name}.is_empty()")
                        }
                        Test::Present => format!("self.{name}.is_some()"),
                        Test::Flag => format!("self.{name}"),
                    };
                    self.line(depth, &format!("if {test} {{"));
                    self.emit_chain(*consequent, depth + 1)?;
                    if let Some(alternative) = alternative {
                        self.line(depth, "} else {");
                        self.emit_chain(*alternative, depth + 1)?;
                    }
                    self.line(depth, "}");
                }
            }
        }
        Ok(())
    }

    fn include_type(&self, path: &str) -> String {
        format!(
            "{}::{}",
            self.codegen.options.templates_path,
            path.replace('.', "::")
        )
    }

    fn line(&mut self, depth: usize, text: &str) {
        if !text.is_empty() {
            for _ in 0..depth {
                self.out.push_str("    ");
            }
            self.out.push_str(text);
        }
        self.out.push('\n');
    }
}

fn block_type(name: &str) -> String {
    format!("{}::{}", lcfirst(name), ucfirst(name))
}

/// 首字符大写
pub fn ucfirst(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// 首字符小写
pub fn lcfirst(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// 转义为 Rust 字符串字面量的内容，非 ASCII 字符原样保留
pub fn escape_literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\0' => out.push_str("\\0"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{{{:x}}}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}
