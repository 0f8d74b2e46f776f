//! Parsing of LLM reply text into typed directives
//!
//! The textual protocol recognizes a single call form embedded anywhere in a
//! reply:
//!
//! ```text
//! call_tool("<name>", {<json-args>})
//! ```
//!
//! Anything else, including malformed call syntax, is treated as a final
//! answer. Dispatch logic never scans raw reply text outside this module.

use serde_json::Value;

/// The parsed intent of an LLM reply
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    /// The model asked for a tool invocation
    ToolCall { name: String, args: Value },
    /// The reply is the final answer
    FinalAnswer { text: String },
}

impl Directive {
    /// Parse reply text. Never fails: malformed call syntax degrades to
    /// [`Directive::FinalAnswer`].
    pub fn parse(text: &str) -> Directive {
        let mut search_from = 0;
        while let Some(pos) = text[search_from..].find("call_tool") {
            let start = search_from + pos;
            if let Some(directive) = parse_call(&text[start..]) {
                return directive;
            }
            search_from = start + "call_tool".len();
        }

        Directive::FinalAnswer {
            text: text.to_string(),
        }
    }
}

/// Parse one candidate call starting at a `call_tool` occurrence
fn parse_call(text: &str) -> Option<Directive> {
    let rest = text.strip_prefix("call_tool")?;
    let rest = rest.trim_start().strip_prefix('(')?;
    let rest = rest.trim_start().strip_prefix('"')?;

    let name_end = rest.find('"')?;
    let name = &rest[..name_end];
    if name.is_empty() {
        return None;
    }

    let rest = rest[name_end + 1..].trim_start().strip_prefix(',')?;
    let rest = rest.trim_start();
    if !rest.starts_with('{') {
        return None;
    }

    let args_len = balanced_object_len(rest)?;
    let args: Value = serde_json::from_str(&rest[..args_len]).ok()?;

    let rest = rest[args_len..].trim_start();
    if !rest.starts_with(')') {
        return None;
    }

    Some(Directive::ToolCall {
        name: name.to_string(),
        args,
    })
}

/// Byte length of the balanced `{...}` object at the start of `s`, honoring
/// string literals and escapes
fn balanced_object_len(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in s.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + c.len_utf8());
                }
            }
            _ => {}
        }
    }

    None
}
