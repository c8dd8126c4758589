//! A small JavaScript pretty-printer.
//!
//! Works on the token stream only: whitespace between tokens is normalized,
//! indentation follows bracket nesting, and the source's own line breaks are
//! kept (runs of blank lines collapse to one). No syntax tree is built, so
//! statements are never reordered or joined. A line longer than the print
//! width is wrapped by breaking its outermost bracket group one element per
//! line. JSX elements are kept verbatim. Formatting its own output yields the
//! same bytes.

use crate::{Error, Result};

/// Fixed style knobs for JavaScript output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JsStyle {
    /// Line width past which bracket groups are broken up
    pub print_width: usize,
    /// Spaces per indentation level
    pub tab_width: usize,
    /// Rewrite `"..."` as `'...'` when that needs no extra escaping
    pub single_quote: bool,
    /// Keep commas directly before `)`, `]` and `}`
    pub trailing_comma: bool,
    /// Pad the inside of `{ ... }`
    pub bracket_spacing: bool,
}

impl Default for JsStyle {
    fn default() -> Self {
        Self {
            print_width: 80,
            tab_width: 4,
            single_quote: true,
            trailing_comma: false,
            bracket_spacing: true,
        }
    }
}

/// Format `source` in the given style.
pub fn format(source: &str, style: &JsStyle) -> Result<String> {
    let tokens = Lexer::new(source).tokenize()?;
    check_brackets(&tokens)?;
    let mut tokens = normalize(tokens, style);
    expand_statement_blocks(&mut tokens);
    Ok(layout(tokens, style))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Word,
    Number,
    Str,
    Template,
    Regex,
    Jsx,
    Punct,
    LineComment,
    BlockComment,
}

#[derive(Debug, Clone)]
struct Token {
    kind: Kind,
    text: String,
    /// Line breaks between this token and the previous one, capped at 2
    newlines: u8,
    /// Reserved word in keyword position (not after `.`)
    keyword: bool,
    /// For closers: whether the bracket closed an expression rather than a
    /// block or a statement head like `if (...)`
    ends_operand: bool,
    line: usize,
}

impl Token {
    fn punct(&self) -> Option<&str> {
        (self.kind == Kind::Punct).then_some(self.text.as_str())
    }

    fn is_comment(&self) -> bool {
        matches!(self.kind, Kind::LineComment | Kind::BlockComment)
    }

    fn is_opener(&self) -> bool {
        matches!(self.punct(), Some("{" | "(" | "["))
    }

    fn is_closer(&self) -> bool {
        matches!(self.punct(), Some("}" | ")" | "]"))
    }
}

const KEYWORDS: &[&str] = &[
    "async", "await", "break", "case", "catch", "class", "const", "continue", "debugger",
    "default", "delete", "do", "else", "export", "extends", "false", "finally", "for",
    "function", "if", "import", "in", "instanceof", "let", "new", "null", "of", "return",
    "super", "switch", "this", "throw", "true", "try", "typeof", "var", "void", "while",
    "with", "yield",
];

// Keywords that end an expression, like an identifier would
const OPERAND_KEYWORDS: &[&str] = &["this", "super", "null", "true", "false"];

// Keywords after which `{` opens an object literal
const EXPRESSION_KEYWORDS: &[&str] = &[
    "return", "typeof", "yield", "await", "case", "in", "of", "delete", "void", "throw",
    "instanceof",
];

// Keywords whose parenthesized head is followed by a statement
const STATEMENT_HEADS: &[&str] = &["if", "while", "for", "with"];

// Longest first
const PUNCTUATORS: &[&str] = &[
    ">>>=", "...", "===", "!==", "**=", "<<=", ">>=", ">>>", "&&=", "||=", "??=", "=>", "==",
    "!=", "<=", ">=", "&&", "||", "??", "?.", "++", "--", "+=", "-=", "*=", "/=", "%=", "&=",
    "|=", "^=", "**", "<<", ">>",
];
const SINGLE_PUNCT: &str = "{}()[];,<>+-*/%&|^!~?:=.@#";

fn is_operand_end(t: &Token) -> bool {
    match t.kind {
        Kind::Number | Kind::Str | Kind::Template | Kind::Regex | Kind::Jsx => true,
        Kind::Word => !t.keyword || OPERAND_KEYWORDS.contains(&t.text.as_str()),
        Kind::Punct => t.is_closer() && t.ends_operand,
        Kind::LineComment | Kind::BlockComment => false,
    }
}

fn last_significant(tokens: &[Token]) -> Option<&Token> {
    tokens.iter().rev().find(|t| !t.is_comment())
}

/// Whether the `+`/`-`/`++`/`--` at `tokens[k]` is a prefix operator.
fn is_prefix_at(tokens: &[Token], k: usize) -> bool {
    !last_significant(&tokens[..k]).is_some_and(is_operand_end)
}

fn unterminated(what: &str, line: usize) -> Error {
    Error::FormatError(format!("line {}: unterminated {}", line, what))
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    pending_newlines: u8,
    tokens: Vec<Token>,
    /// Per open bracket, whether its closer will end an expression
    brackets: Vec<bool>,
}

impl Lexer {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            pending_newlines: 0,
            tokens: Vec::new(),
            brackets: Vec::new(),
        }
    }

    fn peek(&self, n: usize) -> Option<char> {
        self.chars.get(self.pos + n).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek(0)?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn starts_with(&self, s: &str) -> bool {
        s.chars().enumerate().all(|(i, c)| self.peek(i) == Some(c))
    }

    fn tokenize(mut self) -> Result<Vec<Token>> {
        while let Some(c) = self.peek(0) {
            let start = self.pos;
            let line = self.line;
            let kind = match c {
                '\n' => {
                    self.bump();
                    self.pending_newlines = (self.pending_newlines + 1).min(2);
                    continue;
                }
                '\u{feff}' => {
                    self.pos += 1;
                    continue;
                }
                c if c.is_whitespace() => {
                    self.pos += 1;
                    continue;
                }
                '#' if self.pos == 0 && self.peek(1) == Some('!') => {
                    self.skip_line_comment();
                    Kind::LineComment
                }
                '/' if self.peek(1) == Some('/') => {
                    self.skip_line_comment();
                    Kind::LineComment
                }
                '/' if self.peek(1) == Some('*') => {
                    self.skip_block_comment()?;
                    Kind::BlockComment
                }
                '/' if self.regex_allowed() => {
                    self.skip_regex()?;
                    Kind::Regex
                }
                '<' if self.regex_allowed() && self.jsx_starts() => {
                    self.skip_jsx(line)?;
                    Kind::Jsx
                }
                '\'' | '"' => {
                    self.skip_string()?;
                    Kind::Str
                }
                '`' => {
                    self.skip_template()?;
                    Kind::Template
                }
                c if c.is_ascii_digit()
                    || (c == '.' && self.peek(1).is_some_and(|n| n.is_ascii_digit())) =>
                {
                    self.skip_number();
                    Kind::Number
                }
                c if c.is_alphabetic() || c == '_' || c == '$' => {
                    self.skip_word();
                    Kind::Word
                }
                _ => {
                    self.skip_punct(line)?;
                    Kind::Punct
                }
            };
            let mut text: String = self.chars[start..self.pos].iter().collect();
            if kind == Kind::LineComment {
                text.truncate(text.trim_end().len());
            }
            self.push(kind, text, line);
        }
        Ok(self.tokens)
    }

    fn push(&mut self, kind: Kind, text: String, line: usize) {
        let keyword = kind == Kind::Word
            && KEYWORDS.contains(&text.as_str())
            && !matches!(
                last_significant(&self.tokens).and_then(Token::punct),
                Some("." | "?.")
            );
        let ends_operand = match (kind, text.as_str()) {
            (Kind::Punct, "(" | "[" | "{") => {
                let closes_expression = self.opener_closes_expression(&text);
                self.brackets.push(closes_expression);
                true
            }
            (Kind::Punct, ")" | "]" | "}") => self.brackets.pop().unwrap_or(true),
            _ => true,
        };
        let newlines = std::mem::take(&mut self.pending_newlines);
        self.tokens.push(Token {
            kind,
            text,
            newlines,
            keyword,
            ends_operand,
            line,
        });
    }

    // `if (a) /re/` and `{ ... } /re/` put a regex after the closer, while
    // `(a) / 2` and `{}[k] / 2` divide
    fn opener_closes_expression(&self, opener: &str) -> bool {
        let prev = last_significant(&self.tokens);
        match opener {
            "(" => !prev.is_some_and(|p| p.keyword && STATEMENT_HEADS.contains(&p.text.as_str())),
            "{" => match prev {
                None => false,
                Some(p) => match p.kind {
                    Kind::Punct => !matches!(p.text.as_str(), ";" | "{" | "}" | ")" | "=>"),
                    Kind::Word if p.keyword => EXPRESSION_KEYWORDS.contains(&p.text.as_str()),
                    _ => false,
                },
            },
            _ => true,
        }
    }

    fn regex_allowed(&self) -> bool {
        !last_significant(&self.tokens).is_some_and(is_operand_end)
    }

    fn skip_line_comment(&mut self) {
        while self.peek(0).is_some_and(|c| c != '\n') {
            self.pos += 1;
        }
    }

    fn skip_block_comment(&mut self) -> Result<()> {
        let line = self.line;
        self.pos += 2;
        loop {
            match self.bump() {
                None => return Err(unterminated("block comment", line)),
                Some('*') if self.peek(0) == Some('/') => {
                    self.pos += 1;
                    return Ok(());
                }
                Some(_) => {}
            }
        }
    }

    fn skip_string(&mut self) -> Result<()> {
        let line = self.line;
        let quote = self.bump();
        loop {
            match self.peek(0) {
                None | Some('\n') => return Err(unterminated("string literal", line)),
                Some('\\') => {
                    self.bump();
                    self.bump();
                }
                c => {
                    self.bump();
                    if c == quote {
                        return Ok(());
                    }
                }
            }
        }
    }

    fn skip_template(&mut self) -> Result<()> {
        let line = self.line;
        self.bump();
        loop {
            match self.bump() {
                None => return Err(unterminated("template literal", line)),
                Some('\\') => {
                    self.bump();
                }
                Some('`') => return Ok(()),
                Some('$') if self.peek(0) == Some('{') => {
                    self.bump();
                    self.skip_substitution(line)?;
                }
                Some(_) => {}
            }
        }
    }

    // Inside `${ ... }`, up to and including the matching `}`
    fn skip_substitution(&mut self, line: usize) -> Result<()> {
        let mut depth = 1usize;
        loop {
            match self.peek(0) {
                None => return Err(unterminated("template substitution", line)),
                Some('{') => {
                    depth += 1;
                    self.bump();
                }
                Some('}') => {
                    self.bump();
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                Some('\'' | '"') => self.skip_string()?,
                Some('`') => self.skip_template()?,
                Some(_) => {
                    self.bump();
                }
            }
        }
    }

    fn skip_regex(&mut self) -> Result<()> {
        let line = self.line;
        self.pos += 1;
        let mut in_class = false;
        loop {
            match self.peek(0) {
                None | Some('\n') => return Err(unterminated("regular expression", line)),
                Some('\\') => {
                    self.bump();
                    self.bump();
                }
                Some(c) => {
                    self.pos += 1;
                    match c {
                        '[' => in_class = true,
                        ']' => in_class = false,
                        '/' if !in_class => break,
                        _ => {}
                    }
                }
            }
        }
        while self.peek(0).is_some_and(|c| c.is_ascii_alphabetic()) {
            self.pos += 1;
        }
        Ok(())
    }

    fn jsx_starts(&self) -> bool {
        self.peek(1).is_some_and(|c| c.is_alphabetic() || c == '>')
    }

    // A whole JSX element, from its opening `<` to the end of its closing tag
    fn skip_jsx(&mut self, line: usize) -> Result<()> {
        let mut depth = 0usize;
        loop {
            if self.starts_with("</") {
                self.skip_jsx_tag(line)?;
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Ok(());
                }
            } else if self.skip_jsx_tag(line)? {
                if depth == 0 {
                    return Ok(());
                }
            } else {
                depth += 1;
            }
            // children up to the next tag
            loop {
                match self.peek(0) {
                    None => return Err(unterminated("JSX element", line)),
                    Some('<') => break,
                    Some('{') => {
                        self.bump();
                        self.skip_jsx_expression(line)?;
                    }
                    Some(_) => {
                        self.bump();
                    }
                }
            }
        }
    }

    /// Consume one `<...>` tag; true when it is self-closing.
    fn skip_jsx_tag(&mut self, line: usize) -> Result<bool> {
        self.bump();
        let mut prev = '<';
        loop {
            match self.bump() {
                None => return Err(unterminated("JSX tag", line)),
                Some('>') => return Ok(prev == '/'),
                Some(q @ ('"' | '\'')) => {
                    loop {
                        match self.bump() {
                            None => return Err(unterminated("JSX attribute", line)),
                            Some(c) if c == q => break,
                            Some(_) => {}
                        }
                    }
                    prev = q;
                }
                Some('{') => {
                    self.skip_jsx_expression(line)?;
                    prev = '}';
                }
                Some(c) if !c.is_whitespace() => prev = c,
                Some(_) => {}
            }
        }
    }

    // Inside `{ ... }` of a JSX attribute or child, through the matching `}`
    fn skip_jsx_expression(&mut self, line: usize) -> Result<()> {
        let mut depth = 1usize;
        let mut prev = '{';
        loop {
            let c = self
                .peek(0)
                .ok_or_else(|| unterminated("JSX expression", line))?;
            match c {
                '{' => {
                    depth += 1;
                    self.bump();
                }
                '}' => {
                    self.bump();
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                '\'' | '"' => self.skip_string()?,
                '`' => self.skip_template()?,
                '<' if "(,=>?:&|{[".contains(prev) && self.jsx_starts() => self.skip_jsx(line)?,
                _ => {
                    self.bump();
                }
            }
            if !c.is_whitespace() {
                prev = c;
            }
        }
    }

    fn skip_number(&mut self) {
        let prefixed = self.peek(0) == Some('0')
            && matches!(self.peek(1), Some('x' | 'X' | 'b' | 'B' | 'o' | 'O'));
        while let Some(c) = self.peek(0) {
            if !(c.is_ascii_alphanumeric() || c == '_' || c == '.') {
                break;
            }
            self.pos += 1;
            if !prefixed && matches!(c, 'e' | 'E') && matches!(self.peek(0), Some('+' | '-')) {
                self.pos += 1;
            }
        }
    }

    fn skip_word(&mut self) {
        while self
            .peek(0)
            .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '$')
        {
            self.pos += 1;
        }
    }

    fn skip_punct(&mut self, line: usize) -> Result<()> {
        for p in PUNCTUATORS {
            // `a?.5:1` is a conditional, not optional chaining
            if *p == "?." && self.peek(2).is_some_and(|c| c.is_ascii_digit()) {
                continue;
            }
            if self.starts_with(p) {
                self.pos += p.len();
                return Ok(());
            }
        }
        match self.peek(0) {
            Some(c) if SINGLE_PUNCT.contains(c) => {
                self.pos += 1;
                Ok(())
            }
            Some(c) => Err(Error::FormatError(format!(
                "line {}: unexpected character '{}'",
                line, c
            ))),
            None => Ok(()),
        }
    }
}

fn closer_for(opener: &str) -> &'static str {
    match opener {
        "{" => "}",
        "(" => ")",
        _ => "]",
    }
}

fn check_brackets(tokens: &[Token]) -> Result<()> {
    let mut open: Vec<&Token> = Vec::new();
    for t in tokens {
        if t.is_opener() {
            open.push(t);
        } else if t.is_closer() {
            let opener = open.pop().ok_or_else(|| {
                Error::FormatError(format!("line {}: unexpected '{}'", t.line, t.text))
            })?;
            let expected = closer_for(&opener.text);
            if t.text != expected {
                return Err(Error::FormatError(format!(
                    "line {}: expected '{}' to close '{}' from line {}, found '{}'",
                    t.line, expected, opener.text, opener.line, t.text
                )));
            }
        }
    }
    match open.pop() {
        Some(t) => Err(Error::FormatError(format!(
            "line {}: unclosed '{}'",
            t.line, t.text
        ))),
        None => Ok(()),
    }
}

// Token rewrites: quote style and trailing commas
fn normalize(tokens: Vec<Token>, style: &JsStyle) -> Vec<Token> {
    let mut out: Vec<Token> = Vec::with_capacity(tokens.len());
    let mut iter = tokens.into_iter().peekable();
    while let Some(mut t) = iter.next() {
        if !style.trailing_comma && t.punct() == Some(",") {
            // `[a,,]` and `[,]` hold elisions; their commas are significant
            let elision = matches!(out.last().and_then(Token::punct), Some("," | "["));
            if let Some(next) = iter.peek_mut() {
                if next.is_closer() && !elision {
                    next.newlines = next.newlines.max(t.newlines);
                    continue;
                }
            }
        }
        if style.single_quote && t.kind == Kind::Str {
            t.text = prefer_single_quotes(&t.text);
        }
        out.push(t);
    }
    out
}

fn prefer_single_quotes(text: &str) -> String {
    let inner = match text.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
        Some(inner) if !inner.contains('\'') => inner,
        _ => return text.to_string(),
    };
    let mut s = String::with_capacity(text.len());
    s.push('\'');
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            s.push(c);
            continue;
        }
        match chars.next() {
            Some('"') => s.push('"'),
            Some(n) => {
                s.push('\\');
                s.push(n);
            }
            None => s.push('\\'),
        }
    }
    s.push('\'');
    s
}

fn partners(tokens: &[Token]) -> Vec<Option<usize>> {
    let mut out = vec![None; tokens.len()];
    let mut open = Vec::new();
    for (i, t) in tokens.iter().enumerate() {
        if t.is_opener() {
            open.push(i);
        } else if t.is_closer() {
            if let Some(o) = open.pop() {
                out[o] = Some(i);
            }
        }
    }
    out
}

// A `{}` that will hold a statement break is opened and closed on lines of
// its own, so `{ a(); b() }` never prints half on the brace's line
fn expand_statement_blocks(tokens: &mut [Token]) {
    let partners = partners(tokens);
    for open in 0..tokens.len() {
        let close = match partners[open] {
            Some(close) if tokens[open].punct() == Some("{") && close > open + 1 => close,
            _ => continue,
        };
        let mut depth = 0usize;
        let mut breaks = false;
        for k in open + 1..close {
            let t = &tokens[k];
            if t.is_opener() {
                depth += 1;
            } else if t.is_closer() {
                depth = depth.saturating_sub(1);
            } else if depth == 0 && t.punct() == Some(";") && !tokens[k + 1].is_comment() {
                breaks = true;
                break;
            }
        }
        if breaks {
            tokens[open + 1].newlines = tokens[open + 1].newlines.max(1);
            tokens[close].newlines = tokens[close].newlines.max(1);
        }
    }
}

// Print, then break the widest group on the first overflowing line that
// still has one, until every line fits or nothing is left to break
fn layout(mut tokens: Vec<Token>, style: &JsStyle) -> String {
    let partners = partners(&tokens);
    loop {
        let (out, lines) = Printer::new(style).print(&tokens);
        match overflowing_group(&tokens, &partners, &out, &lines, style.print_width) {
            Some((open, close)) => break_group(&mut tokens, open, close),
            None => return out,
        }
    }
}

fn overflowing_group(
    tokens: &[Token],
    partners: &[Option<usize>],
    out: &str,
    lines: &[usize],
    width: usize,
) -> Option<(usize, usize)> {
    for (line, text) in out.lines().enumerate() {
        if text.chars().count() <= width {
            continue;
        }
        let widest = tokens
            .iter()
            .enumerate()
            .filter(|(i, t)| lines[*i] == line && t.is_opener())
            .filter_map(|(i, _)| partners[i].map(|j| (i, j)))
            .filter(|&(i, j)| j > i + 1 && tokens[i + 1].newlines == 0)
            .max_by_key(|&(i, j)| (j, std::cmp::Reverse(i)));
        if widest.is_some() {
            return widest;
        }
    }
    None
}

// One element per line: after the opener, after each top-level comma, and
// before the closer
fn break_group(tokens: &mut [Token], open: usize, close: usize) {
    tokens[open + 1].newlines = tokens[open + 1].newlines.max(1);
    let mut depth = 0usize;
    for k in open + 1..close {
        let (opener, closer) = (tokens[k].is_opener(), tokens[k].is_closer());
        if opener {
            depth += 1;
        } else if closer {
            depth = depth.saturating_sub(1);
        } else if depth == 0
            && tokens[k].punct() == Some(",")
            && k + 1 < close
            && !tokens[k + 1].is_comment()
        {
            tokens[k + 1].newlines = tokens[k + 1].newlines.max(1);
        }
    }
    tokens[close].newlines = tokens[close].newlines.max(1);
}

struct Printer<'a> {
    style: &'a JsStyle,
    out: String,
    line: usize,
    /// Open brackets with the output line they were printed on
    open: Vec<usize>,
    open_kinds: Vec<char>,
    /// Unmatched `?` per bracket level
    ternaries: Vec<u32>,
}

impl<'a> Printer<'a> {
    fn new(style: &'a JsStyle) -> Self {
        Self {
            style,
            out: String::new(),
            line: 0,
            open: Vec::new(),
            open_kinds: Vec::new(),
            ternaries: vec![0],
        }
    }

    /// The formatted text plus the output line each token starts on.
    fn print(mut self, tokens: &[Token]) -> (String, Vec<usize>) {
        let mut lines = Vec::with_capacity(tokens.len());
        for (i, t) in tokens.iter().enumerate() {
            if i > 0 {
                let breaks = t.newlines.max(self.forced_breaks(&tokens[i - 1], t));
                if breaks > 0 {
                    for _ in 0..breaks {
                        self.out.push('\n');
                    }
                    self.line += breaks as usize;
                    self.indent(tokens, i);
                } else if self.needs_space(tokens, i) {
                    self.out.push(' ');
                }
            }
            lines.push(self.line);
            self.out.push_str(&t.text);
            self.line += t.text.matches('\n').count();
            self.track(t);
        }
        if !self.out.is_empty() {
            self.out.push('\n');
        }
        (self.out, lines)
    }

    fn forced_breaks(&self, prev: &Token, t: &Token) -> u8 {
        if prev.kind == Kind::LineComment {
            return 1;
        }
        // one statement per line, except inside `for (...)` headers
        if prev.punct() == Some(";")
            && !t.is_comment()
            && !matches!(self.open_kinds.last(), Some('(' | '['))
        {
            return 1;
        }
        0
    }

    fn indent(&mut self, tokens: &[Token], i: usize) {
        // leading closers print at the level of what they close
        let closers = tokens[i..]
            .iter()
            .enumerate()
            .take_while(|(j, t)| t.is_closer() && (*j == 0 || t.newlines == 0))
            .count();
        let mut lines = self.open[..self.open.len().saturating_sub(closers)].to_vec();
        lines.dedup();
        self.out
            .push_str(&" ".repeat(lines.len() * self.style.tab_width));
    }

    fn track(&mut self, t: &Token) {
        if t.is_opener() {
            self.open.push(self.line);
            self.open_kinds.push(t.text.chars().next().unwrap_or('{'));
            self.ternaries.push(0);
            return;
        }
        if t.is_closer() {
            self.open.pop();
            self.open_kinds.pop();
            if self.ternaries.len() > 1 {
                self.ternaries.pop();
            }
            return;
        }
        if let Some(pending) = self.ternaries.last_mut() {
            match t.punct() {
                Some("?") => *pending += 1,
                Some(":") if *pending > 0 => *pending -= 1,
                _ => {}
            }
        }
    }

    fn needs_space(&self, tokens: &[Token], i: usize) -> bool {
        let p = &tokens[i - 1];
        let t = &tokens[i];
        let (pt, tt) = (p.punct(), t.punct());

        if matches!(tt, Some("," | ";")) {
            return false;
        }
        if matches!(pt, Some("(" | "[")) || matches!(tt, Some(")" | "]")) {
            return false;
        }
        if p.is_comment() || t.is_comment() {
            return true;
        }
        if matches!(pt, Some("," | ";")) {
            return true;
        }
        if matches!(tt, Some("." | "?.")) {
            return p.kind == Kind::Number;
        }
        if matches!(pt, Some("." | "?." | "..." | "!" | "~" | "#" | "@")) {
            return false;
        }
        if pt == Some("{") {
            return tt != Some("}") && self.style.bracket_spacing;
        }
        if tt == Some("}") {
            return self.style.bracket_spacing;
        }
        if matches!(pt, Some("+" | "-" | "++" | "--")) && is_prefix_at(tokens, i - 1) {
            // `- -x` must not collapse into `--x`
            return t.text.starts_with(&p.text[..1]);
        }
        if matches!(tt, Some("++" | "--")) {
            return !is_operand_end(p);
        }
        if tt == Some(":") {
            return self.ternaries.last().is_some_and(|n| *n > 0);
        }
        if tt == Some("(") {
            return match p.kind {
                Kind::Word => p.keyword && !matches!(p.text.as_str(), "super" | "this" | "import"),
                Kind::Punct => !p.is_closer(),
                _ => false,
            };
        }
        if tt == Some("[") {
            return match p.kind {
                Kind::Word => p.keyword && !OPERAND_KEYWORDS.contains(&p.text.as_str()),
                Kind::Punct => !p.is_closer(),
                _ => false,
            };
        }
        if t.kind == Kind::Template && p.kind == Kind::Word && !p.keyword {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fmt(src: &str) -> String {
        format(src, &JsStyle::default()).expect("format")
    }

    #[test]
    fn spaces_operators_and_adds_final_newline() {
        assert_eq!(fmt("const x=1"), "const x = 1\n");
        assert_eq!(fmt("let y=a+b*c===d?e:f"), "let y = a + b * c === d ? e : f\n");
        assert_eq!(fmt(""), "");
        assert_eq!(fmt("  \n\n "), "");
    }

    #[test]
    fn quotes_commas_and_brackets() {
        assert_eq!(fmt(r#"var s = "hi";"#), "var s = 'hi';\n");
        assert_eq!(fmt(r#"var s = "it's";"#), "var s = \"it's\";\n");
        assert_eq!(fmt(r#"var s = "say \"x\"";"#), "var s = 'say \"x\"';\n");
        assert_eq!(fmt("f(a,b,)"), "f(a, b)\n");
        assert_eq!(
            fmt("const o={a:1,b:[1,2,],}"),
            "const o = { a: 1, b: [1, 2] }\n"
        );
        assert_eq!(fmt("const e={}"), "const e = {}\n");
        assert_eq!(fmt("const holes=[a,,]"), "const holes = [a,,]\n");
    }

    #[test]
    fn control_flow_and_indentation() {
        assert_eq!(
            fmt("if(a){b()}else{c()}"),
            "if (a) { b() } else { c() }\n"
        );
        assert_eq!(
            fmt("function f(){\nreturn 1;\n}"),
            "function f() {\n    return 1;\n}\n"
        );
        assert_eq!(fmt("foo({\na: 1\n})"), "foo({\n    a: 1\n})\n");
        assert_eq!(fmt("a();b();"), "a();\nb();\n");
        assert_eq!(fmt("for(let i=0;i<n;i++){}"), "for (let i = 0; i < n; i++) {}\n");
    }

    #[test]
    fn unary_operators_keep_meaning() {
        assert_eq!(fmt("x=-1;y=a - -b;z=!c"), "x = -1;\ny = a - -b;\nz = !c\n");
        assert_eq!(fmt("i++;++j"), "i++;\n++j\n");
        assert_eq!(fmt("a?.b?.(c)"), "a?.b?.(c)\n");
        assert_eq!(fmt("f(...args)"), "f(...args)\n");
    }

    #[test]
    fn literals_are_kept_verbatim() {
        assert_eq!(
            fmt("const r=/a\\/b[/]/g;"),
            "const r = /a\\/b[/]/g;\n"
        );
        assert_eq!(
            fmt("const t=`a ${b + \"}\"} c`"),
            "const t = `a ${b + \"}\"} c`\n"
        );
        assert_eq!(fmt("x = a / b / c"), "x = a / b / c\n");
    }

    #[test]
    fn regex_after_statement_heads_and_blocks() {
        assert_eq!(fmt("if (ok) /ab c/.test(s)"), "if (ok) /ab c/.test(s)\n");
        assert_eq!(fmt("while(x)/[ ]+/g.exec(s)"), "while (x) /[ ]+/g.exec(s)\n");
        assert_eq!(
            fmt("function f() {}\n/x y/.test(s)"),
            "function f() {}\n/x y/.test(s)\n"
        );
        // still division after expressions
        assert_eq!(fmt("x=(a+b)/2/c"), "x = (a + b) / 2 / c\n");
        assert_eq!(fmt("y=f(a)/g[b]/2"), "y = f(a) / g[b] / 2\n");
        assert_eq!(fmt("z={a:1}/2"), "z = { a: 1 } / 2\n");
        // prefix operator after a statement head
        assert_eq!(fmt("if (a) -b"), "if (a) -b\n");
    }

    #[test]
    fn jsx_elements_are_kept_verbatim() {
        assert_eq!(
            fmt("const el = <div className=\"x\">hi</div>;"),
            "const el = <div className=\"x\">hi</div>;\n"
        );
        assert_eq!(fmt("render(<App/>,root)"), "render(<App/>, root)\n");
        let nested = "const list=(\n<ul>\n  {items.map(i => <li key={i.id}>it's {i.name}</li>)}\n  <>{'{'}</>\n</ul>\n)";
        let once = fmt(nested);
        assert_eq!(
            once,
            "const list = (\n    <ul>\n  {items.map(i => <li key={i.id}>it's {i.name}</li>)}\n  <>{'{'}</>\n</ul>\n)\n"
        );
        assert_eq!(fmt(&once), once);
        assert!(fmt("a < b").contains("a < b"));
        assert!(format("const el = <div>", &JsStyle::default()).is_err());
    }

    #[test]
    fn long_lines_break_outermost_group() {
        let src = "renderSnippet(firstArgument, secondArgument, thirdArgument, fourthArgument, fifth)";
        assert!(src.len() > 80);
        let once = fmt(src);
        assert_eq!(
            once,
            "renderSnippet(\n    firstArgument,\n    secondArgument,\n    thirdArgument,\n    fourthArgument,\n    fifth\n)\n"
        );
        assert_eq!(fmt(&once), once);

        let nested = "const settings = { theme: 'hybrid', fontSize: 20, window: [1024, 768], output: 'snippet.png' }";
        assert_eq!(
            fmt(nested),
            "const settings = {\n    theme: 'hybrid',\n    fontSize: 20,\n    window: [1024, 768],\n    output: 'snippet.png'\n}\n"
        );

        // nothing to break: left as is
        let long = format!("const s = '{}'", "x".repeat(90));
        assert_eq!(fmt(&long), format!("{}\n", long));
        assert_eq!(fmt("f(a, b)"), "f(a, b)\n");
    }

    #[test]
    fn blocks_with_several_statements_open_on_their_own_line() {
        assert_eq!(
            fmt("switch (x) { case 1: y(); break; default: z() }"),
            "switch (x) {\n    case 1: y();\n    break;\n    default: z()\n}\n"
        );
        assert_eq!(fmt("function f() { return 1; }"), "function f() {\n    return 1;\n}\n");
        assert_eq!(fmt("if (a) { b() }"), "if (a) { b() }\n");
        assert_eq!(fmt("for (;;) {}"), "for (;;) {}\n");
    }

    #[test]
    fn comments_and_blank_lines() {
        assert_eq!(
            fmt("// hi   \nconst a = 1 /* c */;"),
            "// hi\nconst a = 1 /* c */;\n"
        );
        assert_eq!(fmt("a()\n\n\n\nb()"), "a()\n\nb()\n");
        assert_eq!(fmt("a(); // trailing\nb()"), "a(); // trailing\nb()\n");
        assert_eq!(fmt("#!/usr/bin/env node\nrun()"), "#!/usr/bin/env node\nrun()\n");
    }

    #[test]
    fn idempotent_on_own_output() {
        let src = r#"
import fs from "fs";
const opts={theme:"hybrid",size:[1024,768,],};
function render(file,options=opts){
if(!file){throw new Error("missing file")}
const out=options.output||file+".png";
for(let i=0;i<3;i++){log(`pass ${i}`)}
return items.map(x=>x*2).filter(Boolean);  // keep
}


export default render
"#;
        let once = fmt(src);
        let twice = fmt(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn malformed_source_is_an_error() {
        for bad in ["const s = 'abc", "f(]", "{", "x = `abc", "/* open", "a)", "x = 1 \\ 2"] {
            assert!(
                matches!(format(bad, &JsStyle::default()), Err(Error::FormatError(_))),
                "expected FormatError for {:?}",
                bad
            );
        }
    }

    #[test]
    fn style_knobs_are_honored() {
        let style = JsStyle {
            print_width: 80,
            tab_width: 2,
            single_quote: false,
            trailing_comma: true,
            bracket_spacing: false,
        };
        let out = format("if(a){\nf(\"x\",[1,],)\n}", &style).unwrap();
        assert_eq!(out, "if (a) {\n  f(\"x\", [1,],)\n}\n");
        assert_eq!(format("o={a}", &style).unwrap(), "o = {a}\n");
    }
}
