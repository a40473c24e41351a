//! Parser for mapping function expressions
//!
//! Grammar:
//!
//! ```text
//! expression   = [ "{" output "}" "=" ] name "(" [ param { "," param } ] ")"
//! name         = [ add_on "." ] identifier
//! param        = "{" placeholder "}" | "'" literal "'" | bare_token
//! ```
//!
//! Arguments are split on commas without nesting awareness, so a function
//! call cannot be passed as an argument to another function.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use super::coerce::ParamType;
use super::definition::{FunctionDefinition, FunctionParameter, SELECTOR_OUTPUT};
use crate::error::{ParseError, ParseErrorKind};
use crate::mapping::{ContentUnit, PropertyDefinition};

/// Single-quoted literal, tolerating `\\` and `\'` escapes
static LITERAL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"'(?:\\\\|\\.|[^'\\])*'").expect("literal pattern is valid"));

/// What a parse is bound against
#[derive(Debug, Clone, Copy)]
pub struct ParseScope<'a> {
    /// Property whose function chain is being parsed; `None` for selectors
    pub property: Option<&'a str>,
    /// Properties the mapping declares, including ones produced earlier in the pass
    pub declared: &'a [PropertyDefinition],
    pub unit: &'a ContentUnit,
}

/// Quoted literals replaced by `'StaticParameterN'` tokens
struct ProtectedExpression {
    text: String,
    literals: HashMap<String, String>,
    spans: Vec<LiteralSpan>,
}

/// Byte ranges of one replaced literal, before and after protection
#[derive(Debug, Clone, Copy)]
struct LiteralSpan {
    protected: (usize, usize),
    original: (usize, usize),
}

impl ProtectedExpression {
    /// Map an offset in the protected text back to the expression it came from
    fn original_offset(&self, position: usize) -> usize {
        let (mut protected_end, mut original_end) = (0, 0);
        for span in &self.spans {
            if position < span.protected.0 {
                break;
            }
            if position < span.protected.1 {
                return span.original.0;
            }
            (protected_end, original_end) = (span.protected.1, span.original.1);
        }
        original_end + (position - protected_end)
    }
}

fn protect_literals(expression: &str) -> ProtectedExpression {
    let mut literals = HashMap::new();
    let mut spans = Vec::new();
    let mut counter = 0usize;
    let mut protected_len = 0usize;
    let mut original_len = 0usize;
    let text = LITERAL_PATTERN
        .replace_all(expression, |caps: &regex::Captures| {
            let token = format!("'StaticParameter{}'", counter);
            counter += 1;
            let original = &caps[0];
            let start = caps.get(0).map_or(0, |m| m.start());
            let protected_start = start - original_len + protected_len;
            spans.push(LiteralSpan {
                protected: (protected_start, protected_start + token.len()),
                original: (start, start + original.len()),
            });
            original_len = start + original.len();
            protected_len = protected_start + token.len();
            literals.insert(token.clone(), original[1..original.len() - 1].to_string());
            token
        })
        .into_owned();
    ProtectedExpression { text, literals, spans }
}

/// Split a `;`-delimited function chain, ignoring separators inside literals
pub fn split_chain(functions: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_literal = false;
    let mut escaped = false;
    let mut start = 0;

    for (i, ch) in functions.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_literal => escaped = true,
            '\'' => in_literal = !in_literal,
            ';' if !in_literal => {
                parts.push(&functions[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&functions[start..]);

    parts
        .into_iter()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

/// Parse one function expression into a bound definition
pub fn parse_function(expression: &str, scope: &ParseScope<'_>) -> Result<FunctionDefinition, ParseError> {
    let protected = protect_literals(expression.trim());
    let text = protected.text.as_str();
    let leading = expression.len() - expression.trim_start().len();
    let at = |position: usize| leading + protected.original_offset(position);

    // Output detection
    let (output_name, call, call_offset) = match text.find('=') {
        Some(eq) => {
            let name = text[..eq].replace(['{', '}'], "").trim().to_string();
            (name, &text[eq + 1..], eq + 1)
        }
        None => {
            let name = scope.property.unwrap_or(SELECTOR_OUTPUT).to_string();
            (name, text, 0)
        }
    };

    let Some(open) = call.find('(') else {
        return Err(ParseError::new(
            ParseErrorKind::MissingParenthesis,
            format!("expected '(' in function expression '{}'", expression.trim()),
            at(call_offset + call.len()),
            expression,
        ));
    };

    // Name extraction
    let full_name = call[..open].trim();
    let (add_on, name) = match full_name.split_once('.') {
        Some((add_on, name)) => (add_on.trim(), name.trim()),
        None => ("", full_name),
    };
    if name.is_empty() {
        return Err(ParseError::new(
            ParseErrorKind::EmptyFunctionName,
            "missing function name before '('",
            at(call_offset),
            expression,
        ));
    }

    // Parameter extraction
    let after_open = &call[open + 1..];
    let inner = match after_open.rfind(')') {
        Some(close) => &after_open[..close],
        None => after_open,
    };

    let mut input = Vec::new();
    let mut static_counter = 0usize;
    if !inner.trim().is_empty() {
        let mut cursor = call_offset + open + 1;
        for raw in inner.split(',') {
            let position = at(cursor + raw.len() - raw.trim_start().len());
            cursor += raw.len() + 1;
            let token = raw.trim();
            let binding = Binding {
                function: full_name,
                expression,
                position,
            };
            let param = if token.contains('{') && token.contains('}') {
                let name = token.replace(['{', '}'], "").trim().to_string();
                bind_placeholder(FunctionParameter::placeholder(name), &binding, scope)?
            } else if token.contains('\'') {
                let value = match protected.literals.get(token) {
                    Some(original) => original.clone(),
                    None => token.trim_matches('\'').to_string(),
                };
                let param = FunctionParameter::literal(static_counter, value);
                static_counter += 1;
                param
            } else {
                // Bare tokens, including empty ones, name a property like `{X}` does
                bind_placeholder(FunctionParameter::placeholder(token), &binding, scope)?
            };
            input.push(param);
        }
    }

    Ok(FunctionDefinition {
        add_on: add_on.to_string(),
        name: name.to_string(),
        output: FunctionParameter::placeholder(output_name),
        input,
    })
}

/// Where a non-static parameter appears, for error reporting
struct Binding<'e> {
    function: &'e str,
    expression: &'e str,
    position: usize,
}

/// Resolve type and current value of a non-static parameter
fn bind_placeholder(
    mut param: FunctionParameter,
    binding: &Binding<'_>,
    scope: &ParseScope<'_>,
) -> Result<FunctionParameter, ParseError> {
    let live_value = scope.unit.properties.get(&param.name);

    if let Some(declared) = scope
        .declared
        .iter()
        .find(|p| p.name.eq_ignore_ascii_case(&param.name))
    {
        param.param_type = declared.param_type();
        param.value = live_value.unwrap_or_default().to_string();
        return Ok(param);
    }

    if scope.unit.kind.is_loosely_typed() {
        param.param_type = ParamType::String;
        param.value = live_value.unwrap_or_default().to_string();
        return Ok(param);
    }

    let message = if param.name.is_empty() {
        format!("empty argument in function '{}'", binding.function)
    } else {
        format!(
            "parameter '{}' used in function '{}' is not declared for web part '{}'",
            param.name, binding.function, scope.unit.type_name
        )
    };
    Err(ParseError::new(
        ParseErrorKind::UndeclaredParameter {
            parameter: param.name.clone(),
        },
        message,
        binding.position,
        binding.expression,
    ))
}
