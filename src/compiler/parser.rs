use crate::compiler::error::{CompileError, Position};
use crate::compiler::lexer::{Token, TokenKind};
use std::fmt;

/// 节点在 AST 节点表中的下标
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// AST 节点类型
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// 作用域入口，本身不产生输出
    NoOp,
    ConstantValue(String),
    Variable { name: String, modifiers: Vec<String> },
    Include { path: String, alias: String },
    /// 循环块，branch 指向块体作用域的入口
    Block { name: String, branch: NodeId },
    /// 条件分支，consequent / alternative 各自是独立的作用域
    Conditional {
        name: String,
        consequent: NodeId,
        alternative: Option<NodeId>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    pub position: Position,
    /// 同一作用域中的下一个节点
    pub next: Option<NodeId>,
}

/// 线索化的 AST：节点保存在表中，作用域是一条由 next 串起的链
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ast {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Ast {
    fn new() -> Self {
        Self {
            nodes: vec![Node {
                kind: NodeKind::NoOp,
                position: Position::default(),
                next: None,
            }],
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node(self.root).next.is_none()
    }

    /// 从 start 开始沿 next 遍历一个作用域（包含 start 本身）
    pub fn chain(&self, start: NodeId) -> Chain<'_> {
        Chain {
            ast: self,
            current: Some(start),
        }
    }

    fn push(&mut self, kind: NodeKind, position: Position) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            position,
            next: None,
        });
        id
    }

    fn fmt_scope(&self, f: &mut fmt::Formatter<'_>, start: NodeId, depth: usize) -> fmt::Result {
        let indent = "    ".repeat(depth);
        for (_, node) in self.chain(start) {
            match &node.kind {
                NodeKind::NoOp => {}
                NodeKind::ConstantValue(text) => {
                    writeln!(f, "{indent}\"{}\"", text.replace('\n', "\\n"))?
                }
                NodeKind::Variable { name, modifiers } => {
                    writeln!(f, "{indent}${name}:{}", modifiers.join("|"))?
                }
                NodeKind::Include { path, alias } => {
                    writeln!(f, "{indent}include({path} as {alias})")?
                }
                NodeKind::Block { name, branch } => {
                    writeln!(f, "{indent}for {name}:")?;
                    self.fmt_scope(f, *branch, depth + 1)?;
                }
                NodeKind::Conditional {
                    name,
                    consequent,
                    alternative,
                } => {
                    writeln!(f, "{indent}if {name}")?;
                    self.fmt_scope(f, *consequent, depth + 1)?;
                    if let Some(alternative) = alternative {
                        writeln!(f, "{indent}else")?;
                        self.fmt_scope(f, *alternative, depth + 1)?;
                    }
                }
            }
        }
        Ok(())
    }
}

/// 打印缩进的树形结构，供 `temporize inspect` 使用
impl fmt::Display for Ast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_scope(f, self.root, 0)
    }
}

pub struct Chain<'a> {
    ast: &'a Ast,
    current: Option<NodeId>,
}

impl<'a> Iterator for Chain<'a> {
    type Item = (NodeId, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current?;
        let node = self.ast.node(id);
        self.current = node.next;
        Some((id, node))
    }
}

/// 将 token 序列构建为 AST
pub fn build(tokens: &[Token]) -> Result<Ast, CompileError> {
    let source_id = tokens.first().map(|t| t.source.to_string()).unwrap_or_default();
    AstBuilder::new(source_id).build(tokens)
}

struct AstBuilder {
    ast: Ast,
    source_id: String,
    /// 尚未闭合的循环块与条件分支
    stack: Vec<NodeId>,
    /// 下一个节点挂接的位置
    cursor: NodeId,
}

impl AstBuilder {
    fn new(source_id: String) -> Self {
        let ast = Ast::new();
        let cursor = ast.root();
        Self {
            ast,
            source_id,
            stack: Vec::new(),
            cursor,
        }
    }

    fn build(mut self, tokens: &[Token]) -> Result<Ast, CompileError> {
        for token in tokens {
            self.accept(token)?;
        }

        if let Some(&open) = self.stack.last() {
            let node = self.ast.node(open);
            return Err(match &node.kind {
                NodeKind::Block { name, .. } => CompileError::unmatched_block(
                    &self.source_id,
                    node.position,
                    format!("循环块 {{for ${name}}} 直到文件结尾都没有 {{/for}}"),
                ),
                NodeKind::Conditional { name, .. } => CompileError::mismatched_branch(
                    &self.source_id,
                    node.position,
                    format!("条件分支 {{if ${name}}} 直到文件结尾都没有 {{/if}}"),
                ),
                _ => CompileError::unmatched_block(
                    &self.source_id,
                    node.position,
                    "结构栈中出现了非分支节点",
                ),
            });
        }

        Ok(self.ast)
    }

    fn accept(&mut self, token: &Token) -> Result<(), CompileError> {
        let position = token.position;
        match &token.kind {
            TokenKind::Literal(text) => {
                self.append(NodeKind::ConstantValue(text.clone()), position);
            }
            TokenKind::Variable { name, modifiers } => {
                self.append(
                    NodeKind::Variable {
                        name: name.clone(),
                        modifiers: modifiers.clone(),
                    },
                    position,
                );
            }
            TokenKind::Include { path, alias } => {
                self.append(
                    NodeKind::Include {
                        path: path.clone(),
                        alias: alias.clone(),
                    },
                    position,
                );
            }
            TokenKind::Block(name) => {
                let branch = self.ast.push(NodeKind::NoOp, position);
                let block = self.append(
                    NodeKind::Block {
                        name: name.clone(),
                        branch,
                    },
                    position,
                );
                self.stack.push(block);
                self.cursor = branch;
            }
            TokenKind::BlockEnd => {
                let Some(&top) = self.stack.last() else {
                    return Err(CompileError::unmatched_block(
                        &self.source_id,
                        position,
                        "{/for} 没有对应的 {for}",
                    ));
                };
                if !matches!(self.ast.node(top).kind, NodeKind::Block { .. }) {
                    return Err(CompileError::unmatched_block(
                        &self.source_id,
                        position,
                        "{/for} 关闭的不是循环块，最内层未闭合的是 {if}",
                    ));
                }
                self.stack.pop();
                self.cursor = top;
            }
            TokenKind::Conditional(name) => {
                let consequent = self.ast.push(NodeKind::NoOp, position);
                let conditional = self.append(
                    NodeKind::Conditional {
                        name: name.clone(),
                        consequent,
                        alternative: None,
                    },
                    position,
                );
                self.stack.push(conditional);
                self.cursor = consequent;
            }
            TokenKind::ConditionalElse => {
                let Some(&top) = self.stack.last() else {
                    return Err(CompileError::mismatched_branch(
                        &self.source_id,
                        position,
                        "{else} 没有对应的 {if}",
                    ));
                };
                match self.ast.node(top).kind {
                    NodeKind::Conditional {
                        alternative: None, ..
                    } => {}
                    NodeKind::Conditional {
                        alternative: Some(_),
                        ..
                    } => {
                        return Err(CompileError::mismatched_branch(
                            &self.source_id,
                            position,
                            "同一个 {if} 出现了两次 {else}",
                        ));
                    }
                    _ => {
                        return Err(CompileError::mismatched_branch(
                            &self.source_id,
                            position,
                            "{else} 出现在循环块内部，而不是直接位于 {if} 中",
                        ));
                    }
                }

                let branch = self.ast.push(NodeKind::NoOp, position);
                if let NodeKind::Conditional { alternative, .. } = &mut self.ast.nodes[top.0].kind {
                    *alternative = Some(branch);
                }
                self.cursor = branch;
            }
            TokenKind::ConditionalEnd => {
                let Some(&top) = self.stack.last() else {
                    return Err(CompileError::mismatched_branch(
                        &self.source_id,
                        position,
                        "{/if} 没有对应的 {if}",
                    ));
                };
                if !matches!(self.ast.node(top).kind, NodeKind::Conditional { .. }) {
                    return Err(CompileError::mismatched_branch(
                        &self.source_id,
                        position,
                        "{/if} 关闭的不是条件分支，最内层未闭合的是 {for}",
                    ));
                }
                self.stack.pop();
                self.cursor = top;
            }
            // 词法分析已将这些标记丢弃
            TokenKind::Skip | TokenKind::SkipEnd | TokenKind::Comment | TokenKind::CommentEnd => {}
        }
        Ok(())
    }

    /// 在游标处追加节点，游标随之前移
    fn append(&mut self, kind: NodeKind, position: Position) -> NodeId {
        let id = self.ast.push(kind, position);
        self.ast.nodes[self.cursor.0].next = Some(id);
        self.cursor = id;
        id
    }
}
