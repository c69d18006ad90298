// ABOUTME: Variable interpolation for ${NAME}, ${NAME:-default}, and $NAME tokens.
// ABOUTME: Also lists the references a string makes, for Compose variable inference.

/// One `${...}` or `$NAME` occurrence in a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub name: String,
    pub default: Option<String>,
}

enum Piece<'a> {
    Literal(&'a str),
    Dollar,
    Reference { name: &'a str, default: Option<&'a str> },
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Split `input` into literal runs and references. Malformed tokens (an
/// unterminated `${`, an invalid name) are kept as literal text.
fn scan(input: &str) -> Vec<Piece<'_>> {
    let mut pieces = Vec::new();
    let bytes = input.as_bytes();
    let mut literal_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'$' {
            i += 1;
            continue;
        }

        let next = input[i + 1..].chars().next();
        let token = match next {
            Some('$') => Some((Piece::Dollar, i + 2)),
            Some('{') => scan_braced(input, i),
            Some(c) if is_name_start(c) => {
                let rest = &input[i + 1..];
                let len = rest.find(|c: char| !is_name_char(c)).unwrap_or(rest.len());
                Some((
                    Piece::Reference {
                        name: &rest[..len],
                        default: None,
                    },
                    i + 1 + len,
                ))
            }
            _ => None,
        };

        match token {
            Some((piece, end)) => {
                if literal_start < i {
                    pieces.push(Piece::Literal(&input[literal_start..i]));
                }
                pieces.push(piece);
                i = end;
                literal_start = end;
            }
            None => i += 1,
        }
    }

    if literal_start < input.len() {
        pieces.push(Piece::Literal(&input[literal_start..]));
    }
    pieces
}

fn scan_braced(input: &str, dollar: usize) -> Option<(Piece<'_>, usize)> {
    let body_start = dollar + 2;
    let close = input[body_start..].find('}')? + body_start;
    let body = &input[body_start..close];

    let (name, default) = match body.split_once(":-") {
        Some((name, default)) => (name, Some(default)),
        None => (body, None),
    };

    let mut chars = name.chars();
    let valid = chars.next().is_some_and(is_name_start) && chars.all(is_name_char);
    if !valid {
        return None;
    }

    Some((Piece::Reference { name, default }, close + 1))
}

/// Substitute references using `lookup`.
///
/// `${NAME:-default}` falls back to `default` when the value is missing or
/// empty. A missing value with no inline default becomes an empty string.
/// `$$` produces a literal `$`.
pub fn interpolate<'v, F>(input: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<&'v str>,
{
    let mut out = String::with_capacity(input.len());
    for piece in scan(input) {
        match piece {
            Piece::Literal(text) => out.push_str(text),
            Piece::Dollar => out.push('$'),
            Piece::Reference { name, default } => {
                let value = lookup(name).filter(|v| !(default.is_some() && v.is_empty()));
                match (value, default) {
                    (Some(v), _) => out.push_str(v),
                    (None, Some(d)) => out.push_str(d),
                    (None, None) => {}
                }
            }
        }
    }
    out
}

/// References made by `input`, in order of appearance.
pub fn references(input: &str) -> Vec<Reference> {
    scan(input)
        .into_iter()
        .filter_map(|piece| match piece {
            Piece::Reference { name, default } => Some(Reference {
                name: name.to_string(),
                default: default.map(str::to_string),
            }),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars() -> HashMap<&'static str, &'static str> {
        HashMap::from([("TAG", "1.4"), ("EMPTY", ""), ("HOST", "db")])
    }

    fn render(input: &str) -> String {
        let vars = vars();
        interpolate(input, |name| vars.get(name).copied())
    }

    #[test]
    fn braced_and_bare_references() {
        assert_eq!(render("app:${TAG}"), "app:1.4");
        assert_eq!(render("app:$TAG-slim"), "app:1.4-slim");
        assert_eq!(render("$HOST:5432"), "db:5432");
    }

    #[test]
    fn inline_default_applies_when_missing_or_empty() {
        assert_eq!(render("${PORT:-8080}"), "8080");
        assert_eq!(render("${EMPTY:-fallback}"), "fallback");
        assert_eq!(render("${TAG:-latest}"), "1.4");
    }

    #[test]
    fn missing_without_default_is_empty() {
        assert_eq!(render("x${NOPE}y"), "xy");
        assert_eq!(render("x$NOPE"), "x");
    }

    #[test]
    fn escapes_and_malformed_tokens_stay_literal() {
        assert_eq!(render("cost: $$5"), "cost: $5");
        assert_eq!(render("${unterminated"), "${unterminated");
        assert_eq!(render("${1BAD}"), "${1BAD}");
        assert_eq!(render("100$"), "100$");
    }

    #[test]
    fn lists_references_with_defaults() {
        let refs = references("${A}:${B:-x} $C");
        assert_eq!(
            refs,
            vec![
                Reference {
                    name: "A".into(),
                    default: None
                },
                Reference {
                    name: "B".into(),
                    default: Some("x".into())
                },
                Reference {
                    name: "C".into(),
                    default: None
                },
            ]
        );
    }
}
