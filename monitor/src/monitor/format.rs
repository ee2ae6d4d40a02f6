//! JSON re-indentation for inspection payloads

use serde::de::IgnoredAny;

/// Re-indent a JSON document with tabs.
///
/// Only whitespace outside string literals changes. Strings, numbers and
/// duplicate keys are copied byte for byte. Empty objects and arrays stay on
/// one line as `{}` and `[]`.
pub fn indent_json(raw: &[u8]) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::from_slice::<IgnoredAny>(raw)?;

    let mut out = Vec::with_capacity(raw.len() * 2);
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut bytes = raw.iter().copied().peekable();

    while let Some(b) = bytes.next() {
        if in_string {
            out.push(b);
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }

        match b {
            b' ' | b'\t' | b'\n' | b'\r' => {}
            b'"' => {
                in_string = true;
                out.push(b);
            }
            b'{' | b'[' => {
                out.push(b);
                while matches!(bytes.peek(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
                    bytes.next();
                }
                let close = if b == b'{' { b'}' } else { b']' };
                if bytes.peek() == Some(&close) {
                    bytes.next();
                    out.push(close);
                    continue;
                }
                depth += 1;
                newline(&mut out, depth);
            }
            b'}' | b']' => {
                depth = depth.saturating_sub(1);
                newline(&mut out, depth);
                out.push(b);
            }
            b',' => {
                out.push(b);
                newline(&mut out, depth);
            }
            b':' => out.extend_from_slice(b": "),
            _ => out.push(b),
        }
    }

    Ok(out)
}

fn newline(out: &mut Vec<u8>, depth: usize) {
    out.push(b'\n');
    out.extend(std::iter::repeat(b'\t').take(depth));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indent_uses_tabs_and_keeps_order() {
        let formatted = indent_json(br#"{"Id":"abc","Config":{"Tty":false}}"#).unwrap();
        assert_eq!(
            String::from_utf8(formatted).unwrap(),
            "{\n\t\"Id\": \"abc\",\n\t\"Config\": {\n\t\t\"Tty\": false\n\t}\n}"
        );
    }

    #[test]
    fn test_indent_keeps_tokens_verbatim() {
        let raw = br#"{"Size":1e2,"N":12345678901234567890123,"D":{"k":1,"k":2},"S":"a\u00e9\"b, {c}"}"#;
        let formatted = indent_json(raw).unwrap();
        assert_eq!(
            String::from_utf8(formatted).unwrap(),
            "{\n\
             \t\"Size\": 1e2,\n\
             \t\"N\": 12345678901234567890123,\n\
             \t\"D\": {\n\
             \t\t\"k\": 1,\n\
             \t\t\"k\": 2\n\
             \t},\n\
             \t\"S\": \"a\\u00e9\\\"b, {c}\"\n\
             }"
        );
    }

    #[test]
    fn test_indent_replaces_existing_whitespace() {
        let raw = b" {\n  \"Mounts\" : [ ],\n  \"Labels\": {  },\n  \"Cmd\": [\"sh\", \"-c\"]\n}\n";
        let formatted = indent_json(raw).unwrap();
        assert_eq!(
            String::from_utf8(formatted).unwrap(),
            "{\n\t\"Mounts\": [],\n\t\"Labels\": {},\n\t\"Cmd\": [\n\t\t\"sh\",\n\t\t\"-c\"\n\t]\n}"
        );
    }

    #[test]
    fn test_indent_rejects_non_json() {
        assert!(indent_json(b"not json at all").is_err());
        assert!(indent_json(b"").is_err());
        assert!(indent_json(br#"{"a":1"#).is_err());
    }
}
