//! Control message tokenizer (A5): turns one UDP datagram into an address
//! plus a typed argument list. This is the only piece of wire decoding this
//! crate performs — `apply_control_event` (C8) never sees raw bytes, so a
//! deployment speaking a different wire format only has to replace this
//! module.

use crate::error::EngineError;

/// One decoded argument.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenArg {
    Int(i64),
    Float(f64),
    Str(String),
}

/// One decoded control message: an address and its arguments.
#[derive(Debug, Clone)]
pub struct ControlToken {
    pub address: String,
    pub args: Vec<TokenArg>,
}

/// Tokenize one datagram: `<address> <arg> <arg> ...`, space-separated,
/// UTF-8, single line. Arguments are decimal integers, floats, or
/// double-quoted strings.
pub fn tokenize(bytes: &[u8]) -> Result<ControlToken, EngineError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|_| EngineError::MalformedInput { reason: "datagram is not valid UTF-8".into() })?
        .trim();

    if text.is_empty() || text.contains('\n') {
        return Err(EngineError::MalformedInput { reason: "empty or multi-line datagram".into() });
    }

    let mut parts = split_tokens(text)?;
    if parts.is_empty() {
        return Err(EngineError::MalformedInput { reason: "missing address".into() });
    }

    let address = parts.remove(0);
    if !address.starts_with('/') {
        return Err(EngineError::MalformedInput { reason: format!("address must start with '/': {address}") });
    }

    let args = parts.into_iter().map(parse_arg).collect();
    Ok(ControlToken { address, args })
}

fn split_tokens(text: &str) -> Result<Vec<String>, EngineError> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        if c == '"' {
            chars.next();
            let mut s = String::new();
            let mut closed = false;
            for c in chars.by_ref() {
                if c == '"' {
                    closed = true;
                    break;
                }
                s.push(c);
            }
            if !closed {
                return Err(EngineError::MalformedInput { reason: "unterminated quoted string".into() });
            }
            tokens.push(s);
        } else {
            let mut s = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() {
                    break;
                }
                s.push(c);
                chars.next();
            }
            tokens.push(s);
        }
    }

    Ok(tokens)
}

fn parse_arg(raw: String) -> TokenArg {
    if let Ok(i) = raw.parse::<i64>() {
        TokenArg::Int(i)
    } else if let Ok(f) = raw.parse::<f64>() {
        TokenArg::Float(f)
    } else {
        TokenArg::Str(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_address_and_int_args() {
        let t = tokenize(b"/set_speed_percent 150").unwrap();
        assert_eq!(t.address, "/set_speed_percent");
        assert_eq!(t.args, vec![TokenArg::Int(150)]);
    }

    #[test]
    fn tokenizes_quoted_string_arg() {
        let t = tokenize(br#"/load_json "scenes/morning""#).unwrap();
        assert_eq!(t.args, vec![TokenArg::Str("scenes/morning".into())]);
    }

    #[test]
    fn rejects_address_without_leading_slash() {
        assert!(tokenize(b"set_speed_percent 1").is_err());
    }

    #[test]
    fn rejects_unterminated_quote() {
        assert!(tokenize(br#"/load_json "unterminated"#).is_err());
    }

    #[test]
    fn rejects_empty_datagram() {
        assert!(tokenize(b"").is_err());
        assert!(tokenize(b"   ").is_err());
    }
}
