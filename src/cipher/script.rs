//! Token-level scanning of minified player scripts
//!
//! The scanner only splits text into tokens and finds function definitions.
//! It never evaluates anything, and it does not try to be a full JavaScript
//! parser: string, template and regex literals are lexed just well enough
//! that braces inside them do not confuse body matching.

/// Token category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Number,
    Str,
    Regex,
    Punct,
}

/// A token borrowed from the script text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'s> {
    pub kind: TokenKind,
    pub text: &'s str,
    /// Byte offset into the script
    pub offset: usize,
}

impl<'s> Token<'s> {
    pub fn is_punct(&self, punct: &str) -> bool {
        self.kind == TokenKind::Punct && self.text == punct
    }

    pub fn is_word(&self, word: &str) -> bool {
        self.kind == TokenKind::Ident && self.text == word
    }

    pub fn is_ident(&self) -> bool {
        self.kind == TokenKind::Ident && !is_keyword(self.text)
    }

    /// String literal contents without the quotes, escapes left as-is
    pub fn str_value(&self) -> Option<&'s str> {
        if self.kind != TokenKind::Str {
            return None;
        }
        let quote = self.text.chars().next()?;
        self.text.strip_prefix(quote)?.strip_suffix(quote)
    }
}

const KEYWORDS: &[&str] = &[
    "break", "case", "catch", "const", "continue", "debugger", "default", "delete", "do",
    "else", "finally", "for", "function", "if", "in", "instanceof", "let", "new", "of",
    "return", "switch", "this", "throw", "try", "typeof", "var", "void", "while", "with",
    "yield", "await",
];

/// Keywords after which a `/` starts a regex literal rather than a division
const REGEX_PREFIX_KEYWORDS: &[&str] = &[
    "return", "typeof", "case", "do", "else", "in", "of", "new", "delete", "void", "throw",
    "instanceof", "yield", "await",
];

// Longest first so that prefix matching picks the longest punctuator.
const PUNCTUATORS: &[&str] = &[
    ">>>=", "...", "===", "!==", "**=", "<<=", ">>=", ">>>", "&&=", "||=", "??=", "=>", "==",
    "!=", "<=", ">=", "&&", "||", "??", "?.", "++", "--", "+=", "-=", "*=", "/=", "%=", "&=",
    "|=", "^=", "**", "<<", ">>", "{", "}", "(", ")", "[", "]", ";", ",", "<", ">", "+", "-",
    "*", "/", "%", "&", "|", "^", "!", "~", "?", ":", "=", ".", "@", "#",
];

pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains(&word)
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b >= 0x80
}

fn regex_allowed(prev: Option<&Token<'_>>) -> bool {
    match prev {
        None => true,
        Some(token) => match token.kind {
            TokenKind::Punct => !matches!(token.text, ")" | "]"),
            TokenKind::Ident => REGEX_PREFIX_KEYWORDS.contains(&token.text),
            TokenKind::Number | TokenKind::Str | TokenKind::Regex => false,
        },
    }
}

/// Split script text into tokens, dropping whitespace and comments
pub fn tokenize(source: &str) -> Vec<Token<'_>> {
    let bytes = source.as_bytes();
    let mut tokens: Vec<Token<'_>> = Vec::with_capacity(source.len() / 3);
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        let start = i;

        if b.is_ascii_whitespace() {
            i += 1;
            continue;
        }

        if b == b'/' && bytes.get(i + 1) == Some(&b'/') {
            while i < bytes.len() && bytes[i] != b'\n' {
                i += 1;
            }
            continue;
        }

        if b == b'/' && bytes.get(i + 1) == Some(&b'*') {
            i = match source[i + 2..].find("*/") {
                Some(end) => i + 2 + end + 2,
                None => bytes.len(),
            };
            continue;
        }

        let kind = if b == b'"' || b == b'\'' || b == b'`' {
            i = scan_string(bytes, i);
            TokenKind::Str
        } else if b.is_ascii_digit()
            || (b == b'.' && bytes.get(i + 1).map_or(false, |n| n.is_ascii_digit()))
        {
            i = scan_number(bytes, i);
            TokenKind::Number
        } else if is_ident_byte(b) {
            while i < bytes.len() && is_ident_byte(bytes[i]) {
                i += 1;
            }
            TokenKind::Ident
        } else if b == b'/' && regex_allowed(tokens.last()) {
            match scan_regex(bytes, i) {
                Some(end) => {
                    i = end;
                    TokenKind::Regex
                }
                None => {
                    i += 1;
                    TokenKind::Punct
                }
            }
        } else if let Some(punct) = PUNCTUATORS.iter().find(|p| source[i..].starts_with(**p)) {
            i += punct.len();
            TokenKind::Punct
        } else {
            // Stray byte such as a backslash outside a literal.
            i += 1;
            continue;
        };

        tokens.push(Token {
            kind,
            text: &source[start..i],
            offset: start,
        });
    }

    tokens
}

fn scan_string(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\n' if quote != b'`' => return i,
            c if c == quote => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

fn scan_number(bytes: &[u8], start: usize) -> usize {
    let mut i = start;
    while i < bytes.len() {
        let b = bytes[i];
        let exponent_sign = (b == b'+' || b == b'-')
            && i > start
            && matches!(bytes[i - 1], b'e' | b'E')
            && !(bytes.len() > start + 1 && matches!(bytes[start + 1], b'x' | b'X'));
        if b.is_ascii_alphanumeric() || b == b'_' || b == b'.' || exponent_sign {
            i += 1;
        } else {
            break;
        }
    }
    i
}

fn scan_regex(bytes: &[u8], start: usize) -> Option<usize> {
    let mut i = start + 1;
    let mut in_class = false;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\n' => return None,
            b'[' => {
                in_class = true;
                i += 1;
            }
            b']' => {
                in_class = false;
                i += 1;
            }
            b'/' if !in_class => {
                i += 1;
                while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
                    i += 1;
                }
                return Some(i);
            }
            _ => i += 1,
        }
    }
    None
}

fn is_open(token: &Token<'_>) -> bool {
    token.kind == TokenKind::Punct && matches!(token.text, "(" | "[" | "{")
}

fn is_close(token: &Token<'_>) -> bool {
    token.kind == TokenKind::Punct && matches!(token.text, ")" | "]" | "}")
}

/// Index of the bracket closing the one at `open`
pub fn matching_close(tokens: &[Token<'_>], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate().skip(open) {
        if is_open(token) {
            depth += 1;
        } else if is_close(token) {
            depth = depth.checked_sub(1)?;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

/// Index of the bracket opening the one at `close`
pub fn matching_open(tokens: &[Token<'_>], close: usize) -> Option<usize> {
    let mut depth = 0usize;
    for i in (0..=close).rev() {
        let token = &tokens[i];
        if is_close(token) {
            depth += 1;
        } else if is_open(token) {
            depth = depth.checked_sub(1)?;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

/// Split a token run at top-level `;` and `,`, dropping empty statements
pub fn statements<'t, 's>(tokens: &'t [Token<'s>]) -> Vec<&'t [Token<'s>]> {
    let mut result = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, token) in tokens.iter().enumerate() {
        if is_open(token) {
            depth += 1;
        } else if is_close(token) {
            depth = depth.saturating_sub(1);
        } else if depth == 0 && (token.is_punct(";") || token.is_punct(",")) {
            if i > start {
                result.push(&tokens[start..i]);
            }
            start = i + 1;
        }
    }
    if start < tokens.len() {
        result.push(&tokens[start..]);
    }
    result
}

/// Render tokens back into compact text for diagnostics
pub fn render(tokens: &[Token<'_>]) -> String {
    let mut out = String::new();
    let mut prev_word = false;
    for token in tokens {
        let word = matches!(token.kind, TokenKind::Ident | TokenKind::Number);
        if word && prev_word {
            out.push(' ');
        }
        out.push_str(token.text);
        prev_word = word;
    }
    out
}

/// A function definition found in the script
#[derive(Debug, Clone)]
pub struct FunctionDef<'t, 's> {
    /// Declared or assigned name; `None` for anonymous functions
    pub name: Option<&'s str>,
    pub params: Vec<&'s str>,
    /// Tokens between the body braces, or the whole expression of an arrow body
    pub body: &'t [Token<'s>],
    /// Byte offset of the definition's first token
    pub offset: usize,
}

const NON_METHOD_WORDS: &[&str] = &[
    "if", "for", "while", "switch", "catch", "with", "function", "return", "typeof", "new",
    "do", "else", "try",
];

fn parse_params<'s>(tokens: &[Token<'s>]) -> Option<Vec<&'s str>> {
    let mut params = Vec::new();
    for (i, token) in tokens.iter().enumerate() {
        if i % 2 == 0 {
            if !token.is_ident() {
                return None;
            }
            params.push(token.text);
        } else if !token.is_punct(",") {
            return None;
        }
    }
    Some(params)
}

/// Name a function expression gets from `name = ...` or `name: ...`
fn assigned_name<'s>(tokens: &[Token<'s>], start: usize) -> Option<&'s str> {
    if start < 2 {
        return None;
    }
    let op = &tokens[start - 1];
    if !(op.is_punct("=") || op.is_punct(":")) {
        return None;
    }
    let target = &tokens[start - 2];
    match target.kind {
        TokenKind::Ident if !is_keyword(target.text) => Some(target.text),
        TokenKind::Str => target.str_value(),
        _ => None,
    }
}

fn async_start(tokens: &[Token<'_>], start: usize) -> usize {
    if start > 0 && tokens[start - 1].is_word("async") {
        start - 1
    } else {
        start
    }
}

/// End of an arrow expression body starting at `start`
pub fn expression_end(tokens: &[Token<'_>], start: usize) -> usize {
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate().skip(start) {
        if is_open(token) {
            depth += 1;
        } else if is_close(token) {
            if depth == 0 {
                return i;
            }
            depth -= 1;
        } else if depth == 0 && (token.is_punct(",") || token.is_punct(";")) {
            return i;
        }
    }
    tokens.len()
}

/// Find every function definition, nested ones included, in source order
pub fn find_functions<'t, 's>(tokens: &'t [Token<'s>]) -> Vec<FunctionDef<'t, 's>> {
    let mut functions = Vec::new();

    for i in 0..tokens.len() {
        let found = if tokens[i].is_word("function") {
            function_keyword_def(tokens, i)
        } else if tokens[i].is_punct("=>") {
            arrow_def(tokens, i)
        } else {
            method_def(tokens, i)
        };
        if let Some(def) = found {
            functions.push(def);
        }
    }

    functions.sort_by_key(|def| def.offset);
    functions
}

fn function_keyword_def<'t, 's>(tokens: &'t [Token<'s>], at: usize) -> Option<FunctionDef<'t, 's>> {
    let mut j = at + 1;
    if tokens.get(j)?.is_punct("*") {
        j += 1;
    }
    let start = async_start(tokens, at);
    let name = if tokens.get(j)?.is_ident() {
        j += 1;
        Some(tokens[j - 1].text)
    } else {
        assigned_name(tokens, start)
    };

    if !tokens.get(j)?.is_punct("(") {
        return None;
    }
    let params_close = matching_close(tokens, j)?;
    let params = parse_params(&tokens[j + 1..params_close])?;
    let body_open = params_close + 1;
    if !tokens.get(body_open)?.is_punct("{") {
        return None;
    }
    let body_close = matching_close(tokens, body_open)?;

    Some(FunctionDef {
        name,
        params,
        body: &tokens[body_open + 1..body_close],
        offset: tokens[start].offset,
    })
}

fn arrow_def<'t, 's>(tokens: &'t [Token<'s>], at: usize) -> Option<FunctionDef<'t, 's>> {
    let prev = at.checked_sub(1)?;
    let (params, params_start) = if tokens[prev].is_punct(")") {
        let open = matching_open(tokens, prev)?;
        (parse_params(&tokens[open + 1..prev])?, open)
    } else if tokens[prev].is_ident() {
        (vec![tokens[prev].text], prev)
    } else {
        return None;
    };
    let start = async_start(tokens, params_start);
    let name = assigned_name(tokens, start);

    let body_start = at + 1;
    let body = if tokens.get(body_start)?.is_punct("{") {
        let body_close = matching_close(tokens, body_start)?;
        &tokens[body_start + 1..body_close]
    } else {
        &tokens[body_start..expression_end(tokens, body_start)]
    };

    Some(FunctionDef {
        name,
        params,
        body,
        offset: tokens[start].offset,
    })
}

/// Parameter close paren and body braces of a method shorthand at `at`
fn method_span(tokens: &[Token<'_>], at: usize) -> Option<(usize, usize, usize)> {
    let name = &tokens[at];
    if name.kind != TokenKind::Ident || NON_METHOD_WORDS.contains(&name.text) {
        return None;
    }
    let prev = tokens.get(at.checked_sub(1)?)?;
    if !(prev.is_punct("{") || prev.is_punct(",")) {
        return None;
    }
    if !tokens.get(at + 1)?.is_punct("(") {
        return None;
    }
    let params_close = matching_close(tokens, at + 1)?;
    let body_open = params_close + 1;
    if !tokens.get(body_open)?.is_punct("{") {
        return None;
    }
    let body_close = matching_close(tokens, body_open)?;
    Some((params_close, body_open, body_close))
}

/// Index just past a method shorthand definition such as `Ab(a,b){...}`
pub fn method_end(tokens: &[Token<'_>], at: usize) -> Option<usize> {
    method_span(tokens, at).map(|(_, _, body_close)| body_close + 1)
}

fn method_def<'t, 's>(tokens: &'t [Token<'s>], at: usize) -> Option<FunctionDef<'t, 's>> {
    let (params_close, body_open, body_close) = method_span(tokens, at)?;
    let params = parse_params(&tokens[at + 2..params_close])?;

    Some(FunctionDef {
        name: Some(tokens[at].text),
        params,
        body: &tokens[body_open + 1..body_close],
        offset: tokens[at].offset,
    })
}
