//! Prompt Templates
//!
//! Minimal `{placeholder}` substitution used for reasoning prompts and judge
//! prompts. Placeholders are looked up in a variable map; unknown
//! placeholders render as the empty string so a template never fails at
//! render time. `{{` and `}}` escape literal braces.

use std::collections::HashMap;

/// Render a template by substituting `{name}` placeholders from `vars`.
///
/// Placeholder names may contain letters, digits, `_`, `.` and `-`
/// (e.g. `{scratch.decision}`). Anything else between braces is left as-is.
pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' => {
                if chars.peek() == Some(&'{') {
                    chars.next();
                    out.push('{');
                    continue;
                }
                let mut name = String::new();
                let mut closed = false;
                for n in chars.by_ref() {
                    if n == '}' {
                        closed = true;
                        break;
                    }
                    name.push(n);
                }
                let valid = closed
                    && !name.is_empty()
                    && name
                        .chars()
                        .all(|n| n.is_alphanumeric() || matches!(n, '_' | '.' | '-'));
                if valid {
                    if let Some(value) = vars.get(&name) {
                        out.push_str(value);
                    }
                } else {
                    // Not a placeholder: emit the raw text back.
                    out.push('{');
                    out.push_str(&name);
                    if closed {
                        out.push('}');
                    }
                }
            }
            '}' => {
                if chars.peek() == Some(&'}') {
                    chars.next();
                }
                out.push('}');
            }
            _ => out.push(c),
        }
    }

    out
}
