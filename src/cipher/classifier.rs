//! Structural classification of the signature helper functions
//!
//! Helper names are obfuscated and change with every player build, but the
//! bodies keep a stable minified shape. Each shape is described as a short
//! list of token patterns per statement; parameters are matched by position so
//! renaming does not matter, and whitespace never reaches the matcher.

use crate::cipher::recipe::OperationKind;
use crate::cipher::script::{find_functions, statements, tokenize, FunctionDef, Token, TokenKind};
use crate::error::ClassificationError;
use serde::Serialize;
use tracing::debug;

/// Names of the three toolkit helpers, exactly as written in the script
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionNameSet {
    swap: String,
    reverse: String,
    remove_at: String,
}

impl FunctionNameSet {
    /// Build a name set, checking that all names are non-empty and distinct
    pub fn new(
        swap: impl Into<String>,
        reverse: impl Into<String>,
        remove_at: impl Into<String>,
    ) -> Result<Self, ClassificationError> {
        let names = Self {
            swap: swap.into(),
            reverse: reverse.into(),
            remove_at: remove_at.into(),
        };

        for kind in OperationKind::ALL {
            if names.name_of(kind).is_empty() {
                return Err(ClassificationError::NotFound(kind));
            }
        }
        if names.reverse == names.swap {
            return Err(ClassificationError::Ambiguous {
                operation: OperationKind::Reverse,
                candidates: vec![names.reverse],
            });
        }
        if names.remove_at == names.swap || names.remove_at == names.reverse {
            return Err(ClassificationError::Ambiguous {
                operation: OperationKind::RemoveAt,
                candidates: vec![names.remove_at],
            });
        }

        Ok(names)
    }

    pub fn swap(&self) -> &str {
        &self.swap
    }

    pub fn reverse(&self) -> &str {
        &self.reverse
    }

    pub fn remove_at(&self) -> &str {
        &self.remove_at
    }

    pub fn name_of(&self, kind: OperationKind) -> &str {
        match kind {
            OperationKind::Swap => &self.swap,
            OperationKind::Reverse => &self.reverse,
            OperationKind::RemoveAt => &self.remove_at,
        }
    }

    /// Operation implemented by the helper called `name`, if any
    pub fn kind_of(&self, name: &str) -> Option<OperationKind> {
        OperationKind::ALL
            .into_iter()
            .find(|kind| self.name_of(*kind) == name)
    }
}

#[derive(Debug, Clone, Copy)]
enum Pat {
    /// The n-th parameter
    Arg(usize),
    /// A local that is not a parameter; the first occurrence binds it
    Temp,
    Sym(&'static str),
    Word(&'static str),
    Int(&'static str),
    /// `B` or `B % A.length`, the same form everywhere in one body
    Index,
    /// Optional `var`, `let` or `const`
    Decl,
    /// Optional `return`
    Return,
}

#[derive(Debug, Clone, Copy, Default)]
struct Bindings<'s> {
    temp: Option<&'s str>,
    modular: Option<bool>,
}

const MODULAR_INDEX: [Pat; 5] = [
    Pat::Arg(1),
    Pat::Sym("%"),
    Pat::Arg(0),
    Pat::Sym("."),
    Pat::Word("length"),
];

fn match_token<'s>(
    token: &Token<'s>,
    pat: Pat,
    params: &[&str],
    binds: Bindings<'s>,
) -> Option<Bindings<'s>> {
    let matched = match pat {
        Pat::Arg(n) => token.kind == TokenKind::Ident && params.get(n) == Some(&token.text),
        Pat::Temp => {
            if !token.is_ident() || params.contains(&token.text) {
                return None;
            }
            return match binds.temp {
                Some(temp) if temp != token.text => None,
                _ => Some(Bindings {
                    temp: Some(token.text),
                    ..binds
                }),
            };
        }
        Pat::Sym(s) => token.is_punct(s),
        Pat::Word(w) => token.is_word(w),
        Pat::Int(n) => token.kind == TokenKind::Number && token.text == n,
        Pat::Index | Pat::Decl | Pat::Return => false,
    };
    matched.then_some(binds)
}

fn match_pats<'s>(
    tokens: &[Token<'s>],
    pats: &[Pat],
    params: &[&str],
    binds: Bindings<'s>,
) -> Option<Bindings<'s>> {
    let Some((pat, rest)) = pats.split_first() else {
        return tokens.is_empty().then_some(binds);
    };

    match *pat {
        Pat::Decl | Pat::Return => {
            let skip = tokens.first().map_or(false, |t| match pat {
                Pat::Decl => matches!(t.text, "var" | "let" | "const") && t.kind == TokenKind::Ident,
                _ => t.is_word("return"),
            });
            if skip {
                if let Some(found) = match_pats(&tokens[1..], rest, params, binds) {
                    return Some(found);
                }
            }
            match_pats(tokens, rest, params, binds)
        }
        Pat::Index => {
            if binds.modular != Some(false) && tokens.len() >= MODULAR_INDEX.len() {
                let (head, tail) = tokens.split_at(MODULAR_INDEX.len());
                let modular = match_pats(head, &MODULAR_INDEX, params, binds).and_then(|b| {
                    let b = Bindings {
                        modular: Some(true),
                        ..b
                    };
                    match_pats(tail, rest, params, b)
                });
                if modular.is_some() {
                    return modular;
                }
            }
            if binds.modular != Some(true) {
                let (first, tail) = tokens.split_first()?;
                let b = match_token(first, Pat::Arg(1), params, binds)?;
                let b = Bindings {
                    modular: Some(false),
                    ..b
                };
                return match_pats(tail, rest, params, b);
            }
            None
        }
        _ => {
            let (first, tail) = tokens.split_first()?;
            let b = match_token(first, *pat, params, binds)?;
            match_pats(tail, rest, params, b)
        }
    }
}

/// Minified body shape of one elementary operation
struct Shape {
    kind: OperationKind,
    min_params: usize,
    body: &'static [&'static [Pat]],
    /// Statement that may follow the body, such as `return a`
    epilogue: Option<&'static [Pat]>,
}

impl Shape {
    fn matches(&self, function: &FunctionDef<'_, '_>) -> bool {
        if function.params.len() < self.min_params {
            return false;
        }
        let stmts = statements(function.body);
        let extra = match stmts.len().checked_sub(self.body.len()) {
            Some(0) => false,
            Some(1) if self.epilogue.is_some() => true,
            _ => return false,
        };

        let mut binds = Bindings::default();
        for (stmt, pats) in stmts.iter().zip(self.body.iter()) {
            match match_pats(stmt, pats, &function.params, binds) {
                Some(b) => binds = b,
                None => return false,
            }
        }

        match (extra, self.epilogue) {
            (true, Some(pats)) => {
                match_pats(stmts[stmts.len() - 1], pats, &function.params, binds).is_some()
            }
            _ => true,
        }
    }
}

// var c=a[0];a[0]=a[b%a.length];a[b%a.length]=c
const SWAP: Shape = Shape {
    kind: OperationKind::Swap,
    min_params: 2,
    body: &[
        &[
            Pat::Decl,
            Pat::Temp,
            Pat::Sym("="),
            Pat::Arg(0),
            Pat::Sym("["),
            Pat::Int("0"),
            Pat::Sym("]"),
        ],
        &[
            Pat::Arg(0),
            Pat::Sym("["),
            Pat::Int("0"),
            Pat::Sym("]"),
            Pat::Sym("="),
            Pat::Arg(0),
            Pat::Sym("["),
            Pat::Index,
            Pat::Sym("]"),
        ],
        &[
            Pat::Arg(0),
            Pat::Sym("["),
            Pat::Index,
            Pat::Sym("]"),
            Pat::Sym("="),
            Pat::Temp,
        ],
    ],
    epilogue: Some(&[Pat::Word("return"), Pat::Arg(0)]),
};

// a.reverse()
const REVERSE: Shape = Shape {
    kind: OperationKind::Reverse,
    min_params: 1,
    body: &[&[
        Pat::Return,
        Pat::Arg(0),
        Pat::Sym("."),
        Pat::Word("reverse"),
        Pat::Sym("("),
        Pat::Sym(")"),
    ]],
    epilogue: None,
};

// a.splice(b,1) or a.splice(b%a.length,1)
const REMOVE_AT: Shape = Shape {
    kind: OperationKind::RemoveAt,
    min_params: 2,
    body: &[&[
        Pat::Return,
        Pat::Arg(0),
        Pat::Sym("."),
        Pat::Word("splice"),
        Pat::Sym("("),
        Pat::Index,
        Pat::Sym(","),
        Pat::Int("1"),
        Pat::Sym(")"),
    ]],
    epilogue: None,
};

const SHAPES: [&Shape; 3] = [&SWAP, &REVERSE, &REMOVE_AT];

/// Names of the named functions matching `shape`, first occurrence order
fn candidates<'s>(shape: &Shape, functions: &[FunctionDef<'_, 's>]) -> Vec<&'s str> {
    let mut names: Vec<&'s str> = Vec::new();
    for function in functions.iter().filter(|f| shape.matches(f)) {
        match function.name {
            Some(name) if !names.contains(&name) => names.push(name),
            Some(_) => {}
            None => debug!(
                "Skipping anonymous {} candidate at offset {}",
                shape.kind, function.offset
            ),
        }
    }
    names
}

fn unique_name(shape: &Shape, functions: &[FunctionDef<'_, '_>]) -> Result<String, ClassificationError> {
    let names = candidates(shape, functions);
    match names.as_slice() {
        [] => Err(ClassificationError::NotFound(shape.kind)),
        [name] => {
            debug!("Classified {} helper as {}", shape.kind, name);
            Ok(name.to_string())
        }
        _ => Err(ClassificationError::Ambiguous {
            operation: shape.kind,
            candidates: names.iter().map(|n| n.to_string()).collect(),
        }),
    }
}

/// Classify already scanned functions
pub fn classify_functions(
    functions: &[FunctionDef<'_, '_>],
) -> Result<FunctionNameSet, ClassificationError> {
    let [swap, reverse, remove_at] = SHAPES;
    FunctionNameSet::new(
        unique_name(swap, functions)?,
        unique_name(reverse, functions)?,
        unique_name(remove_at, functions)?,
    )
}

/// Find the swap, reverse and remove-at helpers in a player script
pub fn classify(script: &str) -> Result<FunctionNameSet, ClassificationError> {
    let tokens = tokenize(script);
    let functions = find_functions(&tokens);
    debug!(
        "Scanned {} tokens, {} function definitions",
        tokens.len(),
        functions.len()
    );
    classify_functions(&functions)
}
