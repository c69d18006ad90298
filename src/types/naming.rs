// ABOUTME: Docker-safe name sanitization for containers, networks, and volumes.
// ABOUTME: Maps arbitrary labels onto the runtime alphabet [A-Za-z0-9_.-].

/// Name used when sanitization leaves nothing behind.
pub const PLACEHOLDER_NAME: &str = "unnamed";

fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-'
}

/// Sanitize an arbitrary label into a name the container runtime accepts.
///
/// Disallowed characters become `_`, a leading run of non-alphanumeric
/// characters collapses to a single `_`, repeated `_` are collapsed and
/// trailing `_` trimmed. Empty results fall back to [`PLACEHOLDER_NAME`].
pub fn docker_safe_name(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    let mut leading = false;
    while let Some(&c) = chars.peek() {
        if c.is_ascii_alphanumeric() {
            break;
        }
        leading = true;
        chars.next();
    }
    if leading {
        out.push('_');
    }

    for c in chars {
        let c = if is_allowed(c) { c } else { '_' };
        if c == '_' && out.ends_with('_') {
            continue;
        }
        out.push(c);
    }

    let trimmed = out.trim_end_matches('_');
    if trimmed.is_empty() {
        PLACEHOLDER_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Sanitized `{prefix}_{name}` pair, used for stack-scoped resources.
pub fn scoped_name(prefix: &str, name: &str) -> String {
    docker_safe_name(&format!("{prefix}_{name}"))
}
