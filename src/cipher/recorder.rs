//! Recording the driver function's call sequence into a recipe

use crate::cipher::classifier::FunctionNameSet;
use crate::cipher::recipe::{Operation, OperationKind, Recipe};
use crate::cipher::script::{
    expression_end, find_functions, matching_close, method_end, render, statements, tokenize,
    FunctionDef, Token, TokenKind,
};
use crate::error::RecordingError;
use regex::Regex;
use tracing::debug;

/// How to find the driver function in a player script
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DriverHint {
    /// Rank every function that calls the helpers and take the best
    #[default]
    Auto,
    /// The driver's declared or assigned name
    Name(String),
}

impl DriverHint {
    /// Recover the driver's name from the call sites that invoke it
    pub fn locate(script: &str) -> Option<String> {
        #[allow(clippy::useless_vec)]
        let call_site_patterns = vec![
            // XY=function(a){a=a.split("");...
            r#"([a-zA-Z0-9_$]{2,})\s*=\s*function\s*\(\s*([a-zA-Z0-9_$]+)\s*\)\s*\{\s*[a-zA-Z0-9_$]+\s*=\s*[a-zA-Z0-9_$]+\.split\(\s*(?:""|'')\s*\)"#,
            // c=XY(decodeURIComponent(c))
            r#"=\s*([a-zA-Z0-9_$]{2,})\s*\(\s*decodeURIComponent\s*\("#,
            // a.sig||XY(a.s)
            r#"\.sig\s*\|\|\s*([a-zA-Z0-9_$]+)\s*\("#,
            // .set(b, encodeURIComponent(XY(
            r#"\.set\s*\([^,()]+,\s*encodeURIComponent\s*\(\s*([a-zA-Z0-9_$]+)\s*\("#,
        ];

        for (i, pattern) in call_site_patterns.iter().enumerate() {
            if let Ok(regex) = Regex::new(pattern) {
                if let Some(name) = regex.captures(script).and_then(|c| c.get(1)) {
                    debug!("Driver call site pattern {} matched: {}", i + 1, name.as_str());
                    return Some(name.as_str().to_string());
                }
            }
        }

        None
    }
}

/// A call to one of the helpers, parsed or not
#[derive(Debug)]
struct HelperCall {
    kind: OperationKind,
    text: String,
    parsed: Result<Operation, String>,
}

/// Index of the first token after a nested function starting at `at`
fn skip_nested(tokens: &[Token<'_>], at: usize) -> Option<usize> {
    if tokens[at].is_word("function") {
        let open = (at..tokens.len()).find(|&i| tokens[i].is_punct("("))?;
        let params_close = matching_close(tokens, open)?;
        if !tokens.get(params_close + 1)?.is_punct("{") {
            return None;
        }
        return Some(matching_close(tokens, params_close + 1)? + 1);
    }
    if tokens[at].is_punct("=>") {
        let body = at + 1;
        if tokens.get(body)?.is_punct("{") {
            return Some(matching_close(tokens, body)? + 1);
        }
        return Some(expression_end(tokens, body));
    }
    method_end(tokens, at)
}

/// Helper name called at `at`, with the index of the call's opening paren
/// and of the first token of the callee expression
fn callee<'s>(tokens: &[Token<'s>], at: usize) -> Option<(&'s str, usize, usize)> {
    let token = &tokens[at];
    match token.kind {
        // obj.name( or name(
        TokenKind::Ident => {
            if !tokens.get(at + 1)?.is_punct("(") {
                return None;
            }
            if at >= 2 && tokens[at - 1].is_punct(".") {
                return Some((token.text, at + 1, at - 2));
            }
            if at >= 1 && tokens[at - 1].is_word("function") {
                return None;
            }
            Some((token.text, at + 1, at))
        }
        // obj["name"](
        TokenKind::Str => {
            if at < 2 || !tokens[at - 1].is_punct("[") || !tokens.get(at + 1)?.is_punct("]") {
                return None;
            }
            if !tokens.get(at + 2)?.is_punct("(") {
                return None;
            }
            Some((token.str_value()?, at + 2, at - 2))
        }
        _ => None,
    }
}

fn parse_index(arg: &[Token<'_>]) -> Result<usize, String> {
    match arg {
        [token] if token.kind == TokenKind::Number => {
            if !token.text.bytes().all(|b| b.is_ascii_digit()) {
                return Err(format!("`{}` is not a base-10 integer literal", token.text));
            }
            token
                .text
                .parse::<usize>()
                .map_err(|e| format!("`{}` does not fit an index: {}", token.text, e))
        }
        _ => Err(format!(
            "`{}` is not a non-negative integer literal",
            render(arg)
        )),
    }
}

fn parse_call(kind: OperationKind, args: &[Token<'_>]) -> Result<Operation, String> {
    let args = statements(args);
    let (array, rest) = args
        .split_first()
        .ok_or_else(|| "missing signature array argument".to_string())?;
    if !matches!(array, [token] if token.is_ident()) {
        return Err(format!(
            "`{}` is not a plain array identifier",
            render(array)
        ));
    }

    let index = match rest {
        [] => None,
        [index] if kind.requires_index() => Some(parse_index(index)?),
        // Reverse ignores its second argument
        [_] => None,
        _ => return Err(format!("expected at most 2 arguments, got {}", args.len())),
    };

    Operation::from_kind(kind, index).ok_or_else(|| "missing index argument".to_string())
}

/// Calls to known helpers made directly by `function`, nested functions excluded
fn helper_calls(function: &FunctionDef<'_, '_>, names: &FunctionNameSet) -> Vec<HelperCall> {
    let body = function.body;
    let mut calls = Vec::new();
    let mut i = 0;

    while i < body.len() {
        if let Some(next) = skip_nested(body, i) {
            i = next.max(i + 1);
            continue;
        }

        let found = callee(body, i).and_then(|(name, open, start)| {
            let kind = names.kind_of(name)?;
            let close = matching_close(body, open)?;
            Some((kind, open, close, start))
        });

        match found {
            Some((kind, open, close, start)) => {
                calls.push(HelperCall {
                    kind,
                    text: render(&body[start..=close]),
                    parsed: parse_call(kind, &body[open + 1..close]),
                });
                i = close + 1;
            }
            None => i += 1,
        }
    }

    calls
}

fn splits_first_param(function: &FunctionDef<'_, '_>) -> bool {
    let Some(param) = function.params.first() else {
        return false;
    };
    function.body.windows(6).any(|w| {
        w[0].is_word(param)
            && w[1].is_punct(".")
            && w[2].is_word("split")
            && w[3].is_punct("(")
            && w[4].str_value() == Some("")
            && w[5].is_punct(")")
    })
}

fn into_recipe(function: &FunctionDef<'_, '_>, calls: Vec<HelperCall>) -> Result<Recipe, RecordingError> {
    let name = function.name.unwrap_or("<anonymous>");
    let mut operations = Vec::with_capacity(calls.len());
    for call in calls {
        match call.parsed {
            Ok(operation) => operations.push(operation),
            Err(reason) => {
                return Err(RecordingError::MalformedCall {
                    function: name.to_string(),
                    operation: call.kind,
                    call: call.text,
                    reason,
                })
            }
        }
    }
    debug!("Recorded {} operations from driver {}", operations.len(), name);
    Ok(Recipe::new(operations))
}

/// Record the recipe from already scanned functions
///
/// `located` is a driver name recovered from call sites; in `Auto` mode it
/// outranks every other candidate.
pub fn record_functions(
    functions: &[FunctionDef<'_, '_>],
    hint: &DriverHint,
    names: &FunctionNameSet,
    located: Option<&str>,
) -> Result<Recipe, RecordingError> {
    match hint {
        DriverHint::Name(driver) => {
            for function in functions.iter().filter(|f| f.name == Some(driver.as_str())) {
                let calls = helper_calls(function, names);
                if !calls.is_empty() {
                    return into_recipe(function, calls);
                }
            }
            debug!("Named driver {} has no helper calls", driver);
            Err(RecordingError::NoDriverFound)
        }
        DriverHint::Auto => {
            let best = functions
                .iter()
                .map(|f| (f, helper_calls(f, names)))
                .filter(|(_, calls)| !calls.is_empty())
                .enumerate()
                .max_by_key(|(position, (f, calls))| {
                    (
                        located.is_some() && f.name == located,
                        splits_first_param(f),
                        calls.len(),
                        std::cmp::Reverse(*position),
                    )
                });

            match best {
                Some((_, (function, calls))) => {
                    debug!(
                        "Selected driver {} at offset {}",
                        function.name.unwrap_or("<anonymous>"),
                        function.offset
                    );
                    into_recipe(function, calls)
                }
                None => Err(RecordingError::NoDriverFound),
            }
        }
    }
}

/// Build the recipe the driver function applies to a signature
pub fn build_recipe(
    script: &str,
    hint: &DriverHint,
    names: &FunctionNameSet,
) -> Result<Recipe, RecordingError> {
    let tokens = tokenize(script);
    let functions = find_functions(&tokens);
    let located = match hint {
        DriverHint::Auto => DriverHint::locate(script),
        DriverHint::Name(_) => None,
    };
    record_functions(&functions, hint, names, located.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> FunctionNameSet {
        FunctionNameSet::new("Ab", "Zr", "k9").unwrap()
    }

    const TOOLKIT: &str = r#"var Xq={Ab:function(a,b){var c=a[0];a[0]=a[b%a.length];a[b%a.length]=c},
        Zr:function(a){a.reverse()},k9:function(a,b){a.splice(b,1)}};"#;

    fn script(driver: &str) -> String {
        format!("{}{}", TOOLKIT, driver)
    }

    #[test]
    fn test_build_recipe_in_call_order() {
        let script = script(r#"Kt=function(a){a=a.split("");Xq.Ab(a,3);Xq.Zr(a,54);Xq.k9(a,2);Xq.Ab(a,61);return a.join("")};"#);
        let recipe = build_recipe(&script, &DriverHint::Auto, &names()).unwrap();
        assert_eq!(
            recipe.operations(),
            &[
                Operation::Swap(3),
                Operation::Reverse,
                Operation::RemoveAt(2),
                Operation::Swap(61),
            ]
        );
    }

    #[test]
    fn test_reverse_without_argument() {
        let script = script(r#"function drv(a){a=a.split("");Xq.Zr(a);return a.join("")}"#);
        let recipe = build_recipe(&script, &DriverHint::Auto, &names()).unwrap();
        assert_eq!(recipe.operations(), &[Operation::Reverse]);
    }

    #[test]
    fn test_unrecognized_calls_are_ignored() {
        let script = script(
            r#"Kt=function(a){a=a.split("");Xq.k9(a,1);Xq.len(a);Xq.Zr(a,2);Wz(a,7);Xq.Ab(a,9);return a.join("")};"#,
        );
        let recipe = build_recipe(&script, &DriverHint::Auto, &names()).unwrap();
        assert_eq!(
            recipe.operations(),
            &[Operation::RemoveAt(1), Operation::Reverse, Operation::Swap(9)]
        );
    }

    #[test]
    fn test_bracket_and_bare_calls() {
        let script = script(r#"function drv(a){a=a.split("");Xq["Ab"](a,5);k9(a,0);return a.join("")}"#);
        let recipe = build_recipe(&script, &DriverHint::Auto, &names()).unwrap();
        assert_eq!(
            recipe.operations(),
            &[Operation::Swap(5), Operation::RemoveAt(0)]
        );
    }

    #[test]
    fn test_malformed_index() {
        let script = script(r#"Kt=function(a){a=a.split("");Xq.Ab(a,b);return a.join("")};"#);
        let err = build_recipe(&script, &DriverHint::Auto, &names()).unwrap_err();
        match err {
            RecordingError::MalformedCall {
                function,
                operation,
                call,
                ..
            } => {
                assert_eq!(function, "Kt");
                assert_eq!(operation, OperationKind::Swap);
                assert_eq!(call, "Xq.Ab(a,b)");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_malformed_missing_index_and_non_decimal() {
        let script1 = script(r#"Kt=function(a){a=a.split("");Xq.k9(a);return a.join("")};"#);
        assert!(matches!(
            build_recipe(&script1, &DriverHint::Auto, &names()),
            Err(RecordingError::MalformedCall {
                operation: OperationKind::RemoveAt,
                ..
            })
        ));

        let script2 = script(r#"Kt=function(a){a=a.split("");Xq.Ab(a,0x1f);return a.join("")};"#);
        assert!(matches!(
            build_recipe(&script2, &DriverHint::Auto, &names()),
            Err(RecordingError::MalformedCall { .. })
        ));

        let script3 = script(r#"Kt=function(a){a=a.split("");Xq.Ab(a,-2);return a.join("")};"#);
        assert!(matches!(
            build_recipe(&script3, &DriverHint::Auto, &names()),
            Err(RecordingError::MalformedCall { .. })
        ));
    }

    #[test]
    fn test_no_driver_found() {
        let script1 = script(r#"function other(a){return a.join("")}"#);
        assert_eq!(
            build_recipe(&script1, &DriverHint::Auto, &names()).unwrap_err(),
            RecordingError::NoDriverFound
        );

        let script2 = script(r#"Kt=function(a){Xq.Zr(a)};"#);
        assert_eq!(
            build_recipe(&script2, &DriverHint::Name("missing".to_string()), &names()).unwrap_err(),
            RecordingError::NoDriverFound
        );
    }

    #[test]
    fn test_named_driver_hint() {
        let script = script(
            r#"function Kt(a){a=a.split("");Xq.Zr(a,1);return a.join("")}function Decoy(a){a=a.split("");Xq.Ab(a,1);Xq.Ab(a,2);return a.join("")}"#,
        );
        let recipe = build_recipe(&script, &DriverHint::Name("Kt".to_string()), &names()).unwrap();
        assert_eq!(recipe.operations(), &[Operation::Reverse]);

        let recipe = build_recipe(&script, &DriverHint::Auto, &names()).unwrap();
        assert_eq!(recipe.operations(), &[Operation::Swap(1), Operation::Swap(2)]);
    }

    #[test]
    fn test_auto_prefers_located_driver() {
        let script = script(
            r#"function Kt(a){a=a.split("");Xq.Zr(a,1);return a.join("")}function Decoy(a){a=a.split("");Xq.Ab(a,1);Xq.Ab(a,2);return a.join("")}
            g.sig=function(c){c&&(c=Kt(decodeURIComponent(c)));return c};"#,
        );
        let recipe = build_recipe(&script, &DriverHint::Auto, &names()).unwrap();
        assert_eq!(recipe.operations(), &[Operation::Reverse]);
    }

    #[test]
    fn test_auto_ignores_enclosing_wrapper() {
        let script = format!(
            r#"(function(g){{var w=function(q){{Xq.Ab(q,9)}};{}Kt=function(a){{a=a.split("");Xq.Ab(a,3);Xq.Zr(a,0);return a.join("")}};}})(_yt);"#,
            TOOLKIT
        );
        let recipe = build_recipe(&script, &DriverHint::Auto, &names()).unwrap();
        assert_eq!(recipe.operations(), &[Operation::Swap(3), Operation::Reverse]);
    }

    #[test]
    fn test_method_shorthand_toolkit_is_not_a_call_site() {
        let script = r#"(function(g){var Xq={Ab(a,b){var c=a[0];a[0]=a[b%a.length];a[b%a.length]=c},
            Zr(a){a.reverse()},k9(a,b){a.splice(b,1)}};
            g.Kt=function(a){a=Array.from(a);Xq.Ab(a,3);Xq.Zr(a);Xq.k9(a,1);return a.join("")};
        })(_yt);"#;
        let names = crate::cipher::classify(script).unwrap();
        assert_eq!(names, self::names());

        let recipe = build_recipe(script, &DriverHint::Auto, &names).unwrap();
        assert_eq!(
            recipe.operations(),
            &[Operation::Swap(3), Operation::Reverse, Operation::RemoveAt(1)]
        );
    }

    #[test]
    fn test_locate_driver_name() {
        assert_eq!(
            DriverHint::locate(r#"Kt=function(a){a=a.split("");Xq.Ab(a,3)}"#),
            Some("Kt".to_string())
        );
        assert_eq!(
            DriverHint::locate("if(d.sig||Qw(d.s)){}"),
            Some("Qw".to_string())
        );
        assert_eq!(DriverHint::locate("var x=1;"), None);
    }
}
