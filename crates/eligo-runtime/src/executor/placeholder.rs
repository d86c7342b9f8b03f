//! Placeholder resolution
//!
//! Endpoint URL, header, body, and cache-key templates carry `${name}`
//! placeholders. A name resolves against the execution context: bare
//! variables, `input.`-scoped inbound variables, dotted `sourceId.field`
//! references, and `env.NAME` process environment lookups. Placeholders
//! that fail to resolve are left verbatim so callers can detect the gap.

use eligo_core::Value;

use crate::context::ExecutionContext;

/// Resolve placeholders for plain text (headers, bodies, cache keys)
pub fn resolve_template(template: &str, ctx: &ExecutionContext) -> String {
    resolve(template, ctx, false)
}

/// Resolve placeholders for a URL, percent-encoding substituted values
pub fn resolve_url(template: &str, ctx: &ExecutionContext) -> String {
    resolve(template, ctx, true)
}

/// Whether the text still contains an unresolved placeholder
pub fn has_unresolved(text: &str) -> bool {
    text.contains("${")
}

fn resolve(template: &str, ctx: &ExecutionContext, encode: bool) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        let Some(end) = after.find('}') else {
            // Unterminated placeholder, keep the tail as-is
            out.push_str(&rest[start..]);
            return out;
        };

        let name = after[..end].trim();
        match lookup(name, ctx) {
            Some(value) => {
                let text = value.to_display_string();
                if encode {
                    out.push_str(&urlencoding::encode(&text));
                } else {
                    out.push_str(&text);
                }
            }
            None => {
                tracing::debug!(placeholder = %name, "placeholder did not resolve");
                out.push_str(&rest[start..start + 2 + end + 1]);
            }
        }

        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}

fn lookup(name: &str, ctx: &ExecutionContext) -> Option<Value> {
    if let Some(var) = name.strip_prefix("env.") {
        return std::env::var(var).ok().map(Value::String);
    }

    // Inbound variables are addressable both bare and `input.`-scoped
    if let Some(bare) = name.strip_prefix("input.") {
        if let Some(value) = ctx.load_field(bare) {
            return Some(value);
        }
    }

    ctx.load_field(name)
}
