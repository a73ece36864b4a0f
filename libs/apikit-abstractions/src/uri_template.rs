//! RFC 6570 URI template expansion for string variables (levels 1 to 3,
//! plus the `:n` prefix modifier).
//!
//! Variable names are matched case-insensitively. Undefined variables are
//! skipped, as the RFC requires.

use std::collections::HashMap;

use crate::error::UriTemplateError;

const RESERVED: &[u8] = b":/?#[]@!$&'()*+,;=";
const HEX: &[u8; 16] = b"0123456789ABCDEF";

#[derive(Debug, Clone, Copy)]
struct Operator {
    first: &'static str,
    separator: char,
    named: bool,
    if_empty: &'static str,
    allow_reserved: bool,
}

impl Operator {
    fn parse(expression: &str) -> (Self, &str) {
        let op = |first, separator, named, if_empty, allow_reserved| Self {
            first,
            separator,
            named,
            if_empty,
            allow_reserved,
        };
        let mut chars = expression.chars();
        let selected = match chars.next() {
            Some('+') => op("", ',', false, "", true),
            Some('#') => op("#", ',', false, "", true),
            Some('.') => op(".", '.', false, "", false),
            Some('/') => op("/", '/', false, "", false),
            Some(';') => op(";", ';', true, "", false),
            Some('?') => op("?", '&', true, "=", false),
            Some('&') => op("&", '&', true, "=", false),
            _ => return (op("", ',', false, "", false), expression),
        };
        (selected, chars.as_str())
    }
}

/// Expand `template` against `variables`, whose keys must be lowercase.
///
/// # Errors
/// Returns [`UriTemplateError::Malformed`] for unterminated or empty
/// expressions and invalid prefix modifiers.
pub fn expand(
    template: &str,
    variables: &HashMap<String, String>,
) -> Result<String, UriTemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let end = after
            .find('}')
            .ok_or_else(|| malformed(template, "unterminated expression"))?;
        expand_expression(template, &after[..end], variables, &mut out)?;
        rest = &after[end + 1..];
    }
    if rest.contains('}') {
        return Err(malformed(template, "unbalanced '}'"));
    }
    out.push_str(rest);
    Ok(out)
}

fn expand_expression(
    template: &str,
    expression: &str,
    variables: &HashMap<String, String>,
    out: &mut String,
) -> Result<(), UriTemplateError> {
    let (op, var_list) = Operator::parse(expression);
    if var_list.is_empty() {
        return Err(malformed(template, "empty expression"));
    }

    let mut first = true;
    for spec in var_list.split(',') {
        let (name, prefix) = parse_varspec(template, spec)?;
        let Some(value) = variables.get(&name.to_ascii_lowercase()) else {
            continue;
        };

        if first {
            out.push_str(op.first);
            first = false;
        } else {
            out.push(op.separator);
        }

        if op.named {
            out.push_str(name);
            if value.is_empty() {
                out.push_str(op.if_empty);
                continue;
            }
            out.push('=');
        }

        let value = match prefix {
            Some(len) => value.chars().take(len).collect::<String>(),
            None => value.clone(),
        };
        encode_into(&value, op.allow_reserved, out);
    }
    Ok(())
}

fn parse_varspec<'a>(
    template: &str,
    spec: &'a str,
) -> Result<(&'a str, Option<usize>), UriTemplateError> {
    // explode has no effect on string values
    let spec = spec.strip_suffix('*').unwrap_or(spec);
    let (name, prefix) = match spec.split_once(':') {
        Some((name, len)) => {
            let len: usize = len
                .parse()
                .map_err(|_| malformed(template, format!("invalid prefix length '{len}'")))?;
            if len == 0 || len >= 10_000 {
                return Err(malformed(template, format!("prefix length {len} out of range")));
            }
            (name, Some(len))
        }
        None => (spec, None),
    };
    if name.is_empty() {
        return Err(malformed(template, "empty variable name"));
    }
    Ok((name, prefix))
}

fn encode_into(value: &str, allow_reserved: bool, out: &mut String) {
    if !allow_reserved {
        out.push_str(&urlencoding::encode(value));
        return;
    }

    let bytes = value.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        let is_pct_triplet = b == b'%'
            && bytes.get(i + 1).is_some_and(u8::is_ascii_hexdigit)
            && bytes.get(i + 2).is_some_and(u8::is_ascii_hexdigit);
        if b.is_ascii_alphanumeric() || b"-._~".contains(&b) || RESERVED.contains(&b) {
            out.push(char::from(b));
        } else if is_pct_triplet {
            out.push_str(&value[i..i + 3]);
            i += 3;
            continue;
        } else {
            out.push('%');
            out.push(char::from(HEX[usize::from(b >> 4)]));
            out.push(char::from(HEX[usize::from(b & 0x0F)]));
        }
        i += 1;
    }
}

fn malformed(template: &str, reason: impl Into<String>) -> UriTemplateError {
    UriTemplateError::Malformed {
        template: template.to_owned(),
        reason: reason.into(),
    }
}
