use crate::compiler::error::{CompileError, Position};
use crate::compiler::keywords::Keywords;
use regex::{Captures, Regex};
use sha2::{Digest, Sha256};
use std::fmt;
use std::io::{self, BufRead};
use std::sync::{Arc, LazyLock};

/// Token 类型
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// 原样输出的文本
    Literal(String),
    /// {$name|mod1|mod2}
    Variable { name: String, modifiers: Vec<String> },
    /// {for $name}
    Block(String),
    /// {/for}
    BlockEnd,
    /// {include a.b.Name as $alias}
    Include { path: String, alias: String },
    /// {if $name}
    Conditional(String),
    /// {else}
    ConditionalElse,
    /// {/if}
    ConditionalEnd,
    /// {skip}，仅在词法分析内部使用
    Skip,
    /// {/skip}
    SkipEnd,
    /// {comment}，连同内容一起丢弃
    Comment,
    /// {/comment}
    CommentEnd,
}

impl TokenKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Literal(_) => "Literal",
            Self::Variable { .. } => "Variable",
            Self::Block(_) => "Block",
            Self::BlockEnd => "BlockEnd",
            Self::Include { .. } => "Include",
            Self::Conditional(_) => "Conditional",
            Self::ConditionalElse => "ConditionalElse",
            Self::ConditionalEnd => "ConditionalEnd",
            Self::Skip => "Skip",
            Self::SkipEnd => "SkipEnd",
            Self::Comment => "Comment",
            Self::CommentEnd => "CommentEnd",
        }
    }

    fn is_elided(&self) -> bool {
        matches!(
            self,
            Self::Skip | Self::SkipEnd | Self::Comment | Self::CommentEnd
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// 源码中与该 token 对应的原始文本
    pub raw: String,
    pub source: Arc<str>,
    pub position: Position,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "@<{}> {:5}|{:5} {}",
            self.source,
            self.position.line,
            self.position.column,
            self.kind.name()
        )?;
        match &self.kind {
            TokenKind::Variable { name, modifiers } => {
                write!(f, ":{}[{}]", name, modifiers.join(":"))?
            }
            TokenKind::Block(name) | TokenKind::Conditional(name) => write!(f, ":{name}")?,
            TokenKind::Include { path, alias } => write!(f, ":{path} as {alias}")?,
            _ => {}
        }
        write!(f, " ({})", self.raw.replace('\n', "\\n"))
    }
}

/// 词法分析结果：token 序列与源码字节的 SHA-256 指纹
#[derive(Debug, Clone)]
pub struct ParseResult {
    tokens: Vec<Token>,
    hash: [u8; 32],
}

impl ParseResult {
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn into_tokens(self) -> Vec<Token> {
        self.tokens
    }

    pub fn hash(&self) -> &[u8; 32] {
        &self.hash
    }

    /// 十六进制小写形式的指纹
    pub fn hash_hex(&self) -> String {
        self.hash.iter().map(|b| format!("{b:02x}")).collect()
    }
}

static VARIABLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\$([a-z][A-Za-z0-9_]*)((?:\|[A-Za-z_][A-Za-z0-9_]*)*)\}").unwrap()
});
static DEFAULT_VARIABLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\*\$([a-z][A-Za-z0-9_]*)((?:\|[A-Za-z_][A-Za-z0-9_]*)*)\}").unwrap()
});
// 循环块名同时用作子模块名与结构体名，须以字母开头，否则两者相同
static BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{for\s+\$([A-Za-z][A-Za-z0-9_]*)\}").unwrap());
static BLOCK_END_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{/for\}").unwrap());
static INCLUDE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{include\s+((?:[A-Za-z_][A-Za-z0-9_]*\.)*[A-Z][A-Za-z0-9_]*)\s+as\s+\$([A-Za-z_][A-Za-z0-9_]*)\}")
        .unwrap()
});
static CONDITIONAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{if\s+\$([A-Za-z_][A-Za-z0-9_]*)\}").unwrap());
static ELSE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{else\}").unwrap());
static CONDITIONAL_END_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{/if\}").unwrap());
static SKIP_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{skip\}").unwrap());
static COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{comment\}").unwrap());

const SKIP_END: &str = "{/skip}";
const COMMENT_END: &str = "{/comment}";

/// 默认修饰符，由 {*$name} 语法糖引入
pub const DEFAULT_MODIFIER: &str = "def";

/// 识别器，按声明顺序排列；同一起点的多个匹配取先声明者
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Recognizer {
    Variable,
    DefaultVariable,
    Block,
    BlockEnd,
    Include,
    Conditional,
    ConditionalElse,
    ConditionalEnd,
    Skip,
    Comment,
}

const RECOGNIZERS: [Recognizer; 10] = [
    Recognizer::Variable,
    Recognizer::DefaultVariable,
    Recognizer::Block,
    Recognizer::BlockEnd,
    Recognizer::Include,
    Recognizer::Conditional,
    Recognizer::ConditionalElse,
    Recognizer::ConditionalEnd,
    Recognizer::Skip,
    Recognizer::Comment,
];

impl Recognizer {
    fn pattern(self) -> &'static Regex {
        match self {
            Self::Variable => &*VARIABLE_RE,
            Self::DefaultVariable => &*DEFAULT_VARIABLE_RE,
            Self::Block => &*BLOCK_RE,
            Self::BlockEnd => &*BLOCK_END_RE,
            Self::Include => &*INCLUDE_RE,
            Self::Conditional => &*CONDITIONAL_RE,
            Self::ConditionalElse => &*ELSE_RE,
            Self::ConditionalEnd => &*CONDITIONAL_END_RE,
            Self::Skip => &*SKIP_RE,
            Self::Comment => &*COMMENT_RE,
        }
    }
}

/// 分词器，保留字表在整个任务中共享
pub struct Lexer<'a> {
    keywords: &'a Keywords,
}

impl<'a> Lexer<'a> {
    pub fn new(keywords: &'a Keywords) -> Self {
        Self { keywords }
    }

    /// 逐行读取并分词，同时对原始字节计算指纹
    pub fn tokenize<R: BufRead>(&self, source_id: &str, mut reader: R) -> Result<ParseResult, CompileError> {
        let mut scanner = Scanner::new(self.keywords, source_id);
        let mut hasher = Sha256::new();
        let mut buf = Vec::new();
        let mut line_no = 0;

        loop {
            buf.clear();
            let read = reader
                .read_until(b'\n', &mut buf)
                .map_err(|e| CompileError::io(source_id, e))?;
            if read == 0 {
                break;
            }
            hasher.update(&buf);
            line_no += 1;

            let line = std::str::from_utf8(&buf).map_err(|e| {
                CompileError::io(source_id, io::Error::new(io::ErrorKind::InvalidData, e))
            })?;
            scanner.scan_line(line, line_no)?;
        }

        if scanner.in_skip {
            tracing::warn!("{source_id}：{{skip}} 区域直到文件结尾都没有闭合");
        }
        if scanner.in_comment {
            tracing::warn!("{source_id}：{{comment}} 区域直到文件结尾都没有闭合");
        }

        let tokens = join(scanner.tokens);
        tracing::trace!("{source_id}：共 {} 个 token", tokens.len());

        Ok(ParseResult {
            tokens,
            hash: hasher.finalize().into(),
        })
    }
}

/// 使用默认保留字表分词
pub fn tokenize<R: BufRead>(source_id: &str, reader: R) -> Result<ParseResult, CompileError> {
    Lexer::new(&Keywords::default()).tokenize(source_id, reader)
}

pub fn tokenize_str(source_id: &str, source: &str) -> Result<ParseResult, CompileError> {
    tokenize(source_id, source.as_bytes())
}

/// 单次分词过程的状态；skip/comment 标记跨行保持
struct Scanner<'a> {
    keywords: &'a Keywords,
    source: Arc<str>,
    in_skip: bool,
    in_comment: bool,
    tokens: Vec<Token>,
}

impl<'a> Scanner<'a> {
    fn new(keywords: &'a Keywords, source_id: &str) -> Self {
        Self {
            keywords,
            source: Arc::from(source_id),
            in_skip: false,
            in_comment: false,
            tokens: Vec::new(),
        }
    }

    fn scan_line(&mut self, line: &str, line_no: usize) -> Result<(), CompileError> {
        let mut offs = 0;

        loop {
            if self.in_comment {
                let Some(rel) = line[offs..].find(COMMENT_END) else {
                    return Ok(());
                };
                let start = offs + rel;
                let end = start + COMMENT_END.len();
                self.push(TokenKind::CommentEnd, &line[start..end], line, line_no, start);
                self.in_comment = false;
                offs = end;
                continue;
            }

            if self.in_skip {
                let Some(rel) = line[offs..].find(SKIP_END) else {
                    self.push_literal(&line[offs..], line, line_no, offs);
                    return Ok(());
                };
                let start = offs + rel;
                let end = start + SKIP_END.len();
                self.push_literal(&line[offs..start], line, line_no, offs);
                self.push(TokenKind::SkipEnd, &line[start..end], line, line_no, start);
                self.in_skip = false;
                offs = end;
                continue;
            }

            let Some((recognizer, caps, start, end)) = earliest_match(line, offs) else {
                self.push_literal(&line[offs..], line, line_no, offs);
                return Ok(());
            };

            self.push_literal(&line[offs..start], line, line_no, offs);

            let position = Position::in_line(line, line_no, start);
            let kind = self.create(recognizer, &caps, position)?;
            match kind {
                TokenKind::Skip => self.in_skip = true,
                TokenKind::Comment => self.in_comment = true,
                _ => {}
            }
            self.push(kind, &line[start..end], line, line_no, start);
            offs = end;
        }
    }

    fn create(
        &self,
        recognizer: Recognizer,
        caps: &Captures<'_>,
        position: Position,
    ) -> Result<TokenKind, CompileError> {
        let group = |i: usize| caps.get(i).map_or("", |m| m.as_str());

        let kind = match recognizer {
            Recognizer::Variable | Recognizer::DefaultVariable => {
                let name = group(1).to_owned();
                let mut modifiers = Vec::new();
                if recognizer == Recognizer::DefaultVariable {
                    modifiers.push(DEFAULT_MODIFIER.to_owned());
                }
                modifiers.extend(
                    group(2)
                        .split('|')
                        .filter(|m| !m.is_empty())
                        .map(str::to_owned),
                );

                self.check_identifier(&name, position)?;
                for modifier in &modifiers {
                    self.check_identifier(modifier, position)?;
                }
                TokenKind::Variable { name, modifiers }
            }
            Recognizer::Block => {
                let name = group(1).to_owned();
                self.check_identifier(&name, position)?;
                TokenKind::Block(name)
            }
            Recognizer::BlockEnd => TokenKind::BlockEnd,
            Recognizer::Include => {
                let path = group(1).to_owned();
                let alias = group(2).to_owned();
                for segment in path.split('.') {
                    self.check_identifier(segment, position)?;
                }
                self.check_identifier(&alias, position)?;
                TokenKind::Include { path, alias }
            }
            Recognizer::Conditional => {
                let name = group(1).to_owned();
                self.check_identifier(&name, position)?;
                TokenKind::Conditional(name)
            }
            Recognizer::ConditionalElse => TokenKind::ConditionalElse,
            Recognizer::ConditionalEnd => TokenKind::ConditionalEnd,
            Recognizer::Skip => TokenKind::Skip,
            Recognizer::Comment => TokenKind::Comment,
        };
        Ok(kind)
    }

    fn check_identifier(&self, name: &str, position: Position) -> Result<(), CompileError> {
        if self.keywords.is_reserved(name) {
            return Err(CompileError::reserved(&self.source, position, name));
        }
        Ok(())
    }

    fn push_literal(&mut self, text: &str, line: &str, line_no: usize, offs: usize) {
        if text.is_empty() {
            return;
        }
        self.push(TokenKind::Literal(text.to_owned()), text, line, line_no, offs);
    }

    fn push(&mut self, kind: TokenKind, raw: &str, line: &str, line_no: usize, offs: usize) {
        self.tokens.push(Token {
            kind,
            raw: raw.to_owned(),
            source: Arc::clone(&self.source),
            position: Position::in_line(line, line_no, offs),
        });
    }
}

/// 从 offs 起查找最早出现的匹配，返回识别器、捕获组和匹配区间
fn earliest_match(line: &str, offs: usize) -> Option<(Recognizer, Captures<'_>, usize, usize)> {
    let mut best: Option<(Recognizer, Captures<'_>, usize, usize)> = None;
    for recognizer in RECOGNIZERS {
        let Some(caps) = recognizer.pattern().captures_at(line, offs) else {
            continue;
        };
        let Some((start, end)) = caps.get(0).map(|m| (m.start(), m.end())) else {
            continue;
        };
        if best.as_ref().is_none_or(|&(_, _, current, _)| start < current) {
            best = Some((recognizer, caps, start, end));
        }
    }
    best
}

/// 丢弃 skip/comment 标记并合并相邻的文本 token（保留最早的位置）
fn join(tokens: Vec<Token>) -> Vec<Token> {
    let mut joined: Vec<Token> = Vec::with_capacity(tokens.len());
    for token in tokens {
        if token.kind.is_elided() {
            continue;
        }
        if let TokenKind::Literal(text) = &token.kind
            && let Some(last) = joined.last_mut()
            && let TokenKind::Literal(prev) = &mut last.kind
        {
            prev.push_str(text);
            last.raw.push_str(&token.raw);
            continue;
        }
        joined.push(token);
    }
    joined
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize_str("test", source)
            .unwrap()
            .into_tokens()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    fn literal(text: &str) -> TokenKind {
        TokenKind::Literal(text.to_owned())
    }

    #[test]
    fn parse_variable_between_literals() {
        let tokens = tokenize_str("test", "<html>\n{$value}\n</html>").unwrap().into_tokens();
        assert_eq!(tokens.len(), 3);

        assert_eq!(tokens[0].kind, literal("<html>\n"));
        assert_eq!(tokens[0].position, Position::new(1, 1));

        assert_eq!(
            tokens[1].kind,
            TokenKind::Variable {
                name: "value".into(),
                modifiers: vec![]
            }
        );
        assert_eq!(tokens[1].raw, "{$value}");
        assert_eq!(tokens[1].position, Position::new(2, 1));

        assert_eq!(tokens[2].kind, literal("\n</html>"));
        assert_eq!(tokens[2].position, Position::new(2, 9));
    }

    #[test]
    fn parse_variable_modifiers() {
        let tokens = kinds("<html>{$value|foo|bar}</html>");
        assert_eq!(
            tokens[1],
            TokenKind::Variable {
                name: "value".into(),
                modifiers: vec!["foo".into(), "bar".into()]
            }
        );
    }

    #[test]
    fn variable_must_start_lowercase() {
        assert_eq!(kinds("{$Value}"), vec![literal("{$Value}")]);
    }

    #[test]
    fn block_name_must_start_with_letter() {
        assert_eq!(
            kinds("{for $_a}x{/for}"),
            vec![literal("{for $_a}x"), TokenKind::BlockEnd]
        );
        assert_eq!(kinds("{for $a_}{/for}")[0], TokenKind::Block("a_".into()));
    }

    #[test]
    fn default_variable_prepends_def() {
        assert_eq!(
            kinds("{*$hello|upper}"),
            vec![TokenKind::Variable {
                name: "hello".into(),
                modifiers: vec!["def".into(), "upper".into()]
            }]
        );
        assert_eq!(kinds("{*$hello}"), kinds("{$hello|def}"));
    }

    #[test]
    fn parse_all_directives() {
        let tokens = kinds("{for $items}{if $shown}x{else}y{/if}{/for}{include a.b.Card as $card}");
        assert_eq!(
            tokens,
            vec![
                TokenKind::Block("items".into()),
                TokenKind::Conditional("shown".into()),
                literal("x"),
                TokenKind::ConditionalElse,
                literal("y"),
                TokenKind::ConditionalEnd,
                TokenKind::BlockEnd,
                TokenKind::Include {
                    path: "a.b.Card".into(),
                    alias: "card".into()
                },
            ]
        );
    }

    #[test]
    fn include_requires_uppercase_type() {
        assert_eq!(
            kinds("{include a.b.card as $card}"),
            vec![literal("{include a.b.card as $card}")]
        );
    }

    #[test]
    fn skip_single_line() {
        assert_eq!(kinds("{skip}{$foo}{/skip}"), vec![literal("{$foo}")]);
    }

    #[test]
    fn skip_multi_line() {
        assert_eq!(
            kinds("{skip}{$foo}\n{$bar}{/skip}"),
            vec![literal("{$foo}\n{$bar}")]
        );
    }

    #[test]
    fn skip_unterminated_runs_to_end() {
        assert_eq!(kinds("a{skip}{$foo}\n{if $x}"), vec![literal("a{$foo}\n{if $x}")]);
    }

    #[test]
    fn comment_is_dropped() {
        assert!(kinds("{comment}hello world{/comment}").is_empty());
        assert_eq!(
            kinds("foo\n{comment}hello world{/comment}\nbar"),
            vec![literal("foo\n\nbar")]
        );
    }

    #[test]
    fn comment_multi_line() {
        assert!(kinds("{comment}hello\nworld{/comment}").is_empty());
        assert_eq!(
            kinds("foo\n{comment}hello\nworld{/comment}\nbar"),
            vec![literal("foo\n\nbar")]
        );
    }

    #[test]
    fn comment_hides_directives() {
        assert_eq!(
            kinds("{comment}{for $x}\n{/for}{/comment}{$y}"),
            vec![TokenKind::Variable {
                name: "y".into(),
                modifiers: vec![]
            }]
        );
    }

    #[test]
    fn earliest_match_wins() {
        // {else} 在 {$x} 之前出现，尽管变量识别器先声明
        assert_eq!(
            kinds("a{else}{$x}"),
            vec![
                literal("a"),
                TokenKind::ConditionalElse,
                TokenKind::Variable {
                    name: "x".into(),
                    modifiers: vec![]
                },
            ]
        );
    }

    #[test]
    fn reserved_identifiers_fail() {
        for source in [
            "{$type}",
            "{$foo|match}",
            "{for $Self}{/for}",
            "{if $loop}{/if}",
            "{include a.B as $fn}",
            "{include mod.B as $b}",
        ] {
            let err = tokenize_str("test", source).unwrap_err();
            assert!(
                matches!(err, CompileError::ReservedIdentifier { .. }),
                "{source}: {err}"
            );
        }
    }

    #[test]
    fn reserved_identifier_reports_position() {
        let err = tokenize_str("page", "line one\n  {$type}").unwrap_err();
        match err {
            CompileError::ReservedIdentifier {
                source_id,
                position,
                name,
            } => {
                assert_eq!(source_id, "page");
                assert_eq!(position, Position::new(2, 3));
                assert_eq!(name, "type");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn extra_keywords_are_checked() {
        let keywords = Keywords::with_extra(["package"]);
        let err = Lexer::new(&keywords)
            .tokenize("test", "{$package}".as_bytes())
            .unwrap_err();
        assert!(matches!(err, CompileError::ReservedIdentifier { .. }));
    }

    #[test]
    fn raw_text_reconstructs_source() {
        let source = "Hi {$name|upper}!\n{for $rows}\r\n  {*$cell}{/for}\n{if $x}y{else}z{/if}";
        let rebuilt: String = tokenize_str("test", source)
            .unwrap()
            .tokens()
            .iter()
            .map(|t| t.raw.as_str())
            .collect();
        assert_eq!(rebuilt, source);
    }

    #[test]
    fn raw_text_drops_comments_and_skip_markers() {
        let source = "a{skip}{$x}\n b{/skip}c{comment}gone\nstill gone{/comment}d";
        let rebuilt: String = tokenize_str("test", source)
            .unwrap()
            .tokens()
            .iter()
            .map(|t| t.raw.as_str())
            .collect();
        assert_eq!(rebuilt, "a{$x}\n bcd");
    }

    #[test]
    fn hash_covers_source_bytes() {
        let source = "Hello {$world}\n{comment}x{/comment}";
        let result = tokenize_str("test", source).unwrap();
        let expected: [u8; 32] = Sha256::digest(source.as_bytes()).into();
        assert_eq!(result.hash(), &expected);
        assert_eq!(result.hash_hex().len(), 64);

        let again = tokenize_str("other", source).unwrap();
        assert_eq!(result.hash_hex(), again.hash_hex());
        assert_eq!(result.tokens().len(), again.tokens().len());
    }

    #[test]
    fn invalid_utf8_is_io_error() {
        let bytes: &[u8] = &[b'a', 0xff, b'\n'];
        let err = tokenize("test", bytes).unwrap_err();
        assert!(matches!(err, CompileError::Io { .. }));
    }

    #[test]
    fn token_display_escapes_newlines() {
        let tokens = tokenize_str("t", "a\nb").unwrap().into_tokens();
        let text = tokens[0].to_string();
        assert!(text.starts_with("@<t>"));
        assert!(text.contains("Literal"));
        assert!(text.ends_with("(a\\nb)"));
    }
}
