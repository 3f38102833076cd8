//! Lenient JSON reader producing a [`Document`] with byte spans.
//!
//! The reader keeps going on malformed input: a key without a value becomes a
//! dangling property, unterminated containers are closed at end of input and
//! stray characters are skipped. Every recovery is recorded as a
//! [`SyntaxError`](crate::SyntaxError) on the resulting document.

use crate::document::{Document, DocumentBuilder, DocumentFormat};
use crate::node::{NodeId, ScalarValue, TextRange};
use tracing::trace;

/// Nesting limit; deeper containers are skipped as a whole.
const MAX_DEPTH: usize = 256;

/// Parse JSON text into a document
pub fn parse_json(text: &str) -> Document {
    let mut reader = Reader {
        bytes: text.as_bytes(),
        pos: 0,
        builder: DocumentBuilder::new(text, DocumentFormat::Json),
    };

    reader.skip_trivia();
    let root = if reader.at_end() {
        None
    } else {
        reader.value(0)
    };

    reader.skip_trivia();
    if !reader.at_end() {
        let start = reader.pos;
        reader.builder.error(
            TextRange::from_bounds(start, reader.bytes.len()),
            "Unexpected content after the document root",
        );
    }

    let document = reader.builder.finish(root);
    trace!(
        nodes = document.len(),
        errors = document.syntax_errors().len(),
        "parsed json document"
    );
    document
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
    builder: DocumentBuilder,
}

impl Reader<'_> {
    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(b' ' | b'\t' | b'\n' | b'\r') => self.pos += 1,
                Some(b'/') if self.bytes.get(self.pos + 1) == Some(&b'/') => {
                    while !matches!(self.peek(), None | Some(b'\n')) {
                        self.pos += 1;
                    }
                }
                _ => return,
            }
        }
    }

    fn starts_value(byte: u8) -> bool {
        matches!(byte, b'{' | b'[' | b'"' | b'-' | b'0'..=b'9' | b't' | b'f' | b'n')
            || Self::is_word(byte)
    }

    fn is_word(byte: u8) -> bool {
        byte.is_ascii_alphanumeric() || matches!(byte, b'_' | b'$' | b'.' | b'-' | b'+' | b'#' | b'@')
    }

    fn value(&mut self, depth: usize) -> Option<NodeId> {
        if depth > MAX_DEPTH {
            let start = self.pos;
            self.skip_container();
            self.builder.error(
                TextRange::from_bounds(start, self.pos),
                "Document nesting is too deep",
            );
            return None;
        }

        match self.peek()? {
            b'{' => Some(self.object(depth)),
            b'[' => Some(self.array(depth)),
            b'"' => {
                let (range, text) = self.string();
                Some(self.builder.scalar(range, ScalarValue::String(text)))
            }
            byte if Self::is_word(byte) => Some(self.word()),
            _ => {
                let start = self.pos;
                self.pos += 1;
                self.builder
                    .error(TextRange::new(start, 1), "Unexpected character");
                None
            }
        }
    }

    fn object(&mut self, depth: usize) -> NodeId {
        let start = self.pos;
        let object = self.builder.object(TextRange::empty(start));
        self.pos += 1;

        loop {
            self.skip_trivia();
            match self.peek() {
                None => {
                    self.builder
                        .error(TextRange::empty(self.pos), "Unterminated object");
                    break;
                }
                Some(b'}') => {
                    self.pos += 1;
                    break;
                }
                Some(b',') => self.pos += 1,
                Some(b']') => {
                    self.builder
                        .error(TextRange::new(self.pos, 1), "Unexpected ']' in object");
                    break;
                }
                Some(b'"') => {
                    let (range, key) = self.string();
                    self.member(object, range, key, depth);
                }
                Some(byte) if Self::is_word(byte) => {
                    let key_start = self.pos;
                    while self.peek().is_some_and(Self::is_word) {
                        self.pos += 1;
                    }
                    let range = TextRange::from_bounds(key_start, self.pos);
                    let key = String::from_utf8_lossy(&self.bytes[key_start..self.pos]).into_owned();
                    self.builder.error(range, "Property keys must be quoted");
                    self.member(object, range, key, depth);
                }
                Some(_) => {
                    self.builder
                        .error(TextRange::new(self.pos, 1), "Unexpected character in object");
                    self.pos += 1;
                }
            }
        }

        self.builder.set_end(object, self.pos);
        object
    }

    fn member(&mut self, object: NodeId, key_range: TextRange, key: String, depth: usize) {
        let key_node = self.builder.scalar(key_range, ScalarValue::String(key));
        self.skip_trivia();

        let mut end = key_range.end();
        let colon = if self.peek() == Some(b':') {
            let colon = self.pos;
            self.pos += 1;
            end = self.pos;
            Some(colon)
        } else {
            self.builder
                .error(TextRange::empty(self.pos), "Expected ':' after property key");
            None
        };

        let mut value = None;
        if colon.is_some() {
            self.skip_trivia();
            if self.peek().is_some_and(|b| b != b',' && b != b'}' && b != b']' && Self::starts_value(b)) {
                value = self.value(depth + 1);
                if value.is_some() {
                    end = self.pos;
                }
            } else {
                self.builder
                    .error(TextRange::empty(self.pos), "Expected a value");
            }
        }

        self.builder.property(
            object,
            key_node,
            colon,
            value,
            TextRange::from_bounds(key_range.offset, end),
        );
    }

    fn array(&mut self, depth: usize) -> NodeId {
        let start = self.pos;
        let array = self.builder.array(TextRange::empty(start));
        self.pos += 1;

        loop {
            self.skip_trivia();
            match self.peek() {
                None => {
                    self.builder
                        .error(TextRange::empty(self.pos), "Unterminated array");
                    break;
                }
                Some(b']') => {
                    self.pos += 1;
                    break;
                }
                Some(b',') => self.pos += 1,
                Some(b'}') => {
                    self.builder
                        .error(TextRange::new(self.pos, 1), "Unexpected '}' in array");
                    break;
                }
                Some(_) => {
                    if let Some(item) = self.value(depth + 1) {
                        self.builder.item(array, item);
                    }
                }
            }
        }

        self.builder.set_end(array, self.pos);
        array
    }

    fn string(&mut self) -> (TextRange, String) {
        let start = self.pos;
        self.pos += 1;
        let mut out = Vec::new();

        loop {
            match self.peek() {
                None | Some(b'\n') => {
                    self.builder
                        .error(TextRange::from_bounds(start, self.pos), "Unterminated string");
                    break;
                }
                Some(b'"') => {
                    self.pos += 1;
                    break;
                }
                Some(b'\\') => {
                    self.pos += 1;
                    let Some(escaped) = self.peek() else {
                        continue;
                    };
                    self.pos += 1;
                    match escaped {
                        b'n' => out.push(b'\n'),
                        b't' => out.push(b'\t'),
                        b'r' => out.push(b'\r'),
                        b'b' => out.push(0x08),
                        b'f' => out.push(0x0c),
                        b'u' => {
                            let hex = self.bytes.get(self.pos..self.pos + 4);
                            let decoded = hex
                                .and_then(|h| std::str::from_utf8(h).ok())
                                .and_then(|h| u32::from_str_radix(h, 16).ok())
                                .and_then(char::from_u32);
                            match decoded {
                                Some(ch) => {
                                    self.pos += 4;
                                    let mut buf = [0u8; 4];
                                    out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
                                }
                                None => out.push(b'u'),
                            }
                        }
                        other => out.push(other),
                    }
                }
                Some(byte) => {
                    out.push(byte);
                    self.pos += 1;
                }
            }
        }

        (
            TextRange::from_bounds(start, self.pos),
            String::from_utf8_lossy(&out).into_owned(),
        )
    }

    fn word(&mut self) -> NodeId {
        let start = self.pos;
        while self.peek().is_some_and(Self::is_word) {
            self.pos += 1;
        }
        let range = TextRange::from_bounds(start, self.pos);
        let text = String::from_utf8_lossy(&self.bytes[start..self.pos]).into_owned();

        let value = match text.as_str() {
            "true" => ScalarValue::Boolean(true),
            "false" => ScalarValue::Boolean(false),
            "null" => ScalarValue::Null,
            _ => {
                if let Ok(integer) = text.parse::<i64>() {
                    ScalarValue::Integer(integer)
                } else if let Ok(float) = text.parse::<f64>() {
                    ScalarValue::Float(float)
                } else {
                    self.builder.error(range, "Unquoted string value");
                    ScalarValue::String(text)
                }
            }
        };
        self.builder.scalar(range, value)
    }

    fn skip_container(&mut self) {
        let mut depth = 0usize;
        while let Some(byte) = self.peek() {
            self.pos += 1;
            match byte {
                b'{' | b'[' => depth += 1,
                b'}' | b']' => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return;
                    }
                }
                b'"' => {
                    while let Some(inner) = self.peek() {
                        self.pos += 1;
                        if inner == b'\\' {
                            self.pos += 1;
                        } else if inner == b'"' {
                            break;
                        }
                    }
                }
                _ if depth == 0 => return,
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeKind;

    #[test]
    fn test_parse_well_formed() {
        let text = r#"{"class": "X", "steps": [{"tool_id": "a"}], "n": 1.5}"#;
        let doc = parse_json(text);
        assert!(doc.syntax_errors().is_empty());

        let root = doc.root().unwrap();
        assert_eq!(doc.keys(root), vec!["class", "steps", "n"]);
        assert_eq!(doc.range_of(root).unwrap().end(), text.len());

        let steps = doc.find_value(root, "steps").unwrap();
        let item = doc.items(steps)[0];
        let tool = doc.find_value(item, "tool_id").unwrap();
        assert_eq!(doc.scalar(tool), Some(&ScalarValue::String("a".into())));
        assert_eq!(&text[doc.range_of(tool).unwrap().offset..doc.range_of(tool).unwrap().end()], "\"a\"");
        assert_eq!(doc.path_of(tool).to_string(), "steps[0]/tool_id");

        let n = doc.find_value(root, "n").unwrap();
        assert_eq!(doc.scalar(n), Some(&ScalarValue::Float(1.5)));
    }

    #[test]
    fn test_property_range_spans_key_and_value() {
        let text = r#"{"a": [1, 2]}"#;
        let doc = parse_json(text);
        let property = doc.find_property(doc.root().unwrap(), "a").unwrap();
        let range = doc.range_of(property).unwrap();
        assert_eq!(&text[range.offset..range.end()], r#""a": [1, 2]"#);
    }

    #[test]
    fn test_dangling_key_is_kept() {
        let text = r#"{"class": "X", "steps": }"#;
        let doc = parse_json(text);
        let root = doc.root().unwrap();
        let steps = doc.find_property(root, "steps").unwrap();
        assert!(doc.property_value(steps).is_none());
        match doc.kind(steps) {
            Some(NodeKind::Property { colon, .. }) => assert_eq!(*colon, Some(22)),
            other => panic!("expected property, got {other:?}"),
        }
        assert!(!doc.syntax_errors().is_empty());
    }

    #[test]
    fn test_unterminated_containers_closed_at_end() {
        let text = r#"{"steps": [{"tool_id": "a"}, "#;
        let doc = parse_json(text);
        let root = doc.root().unwrap();
        assert_eq!(doc.range_of(root).unwrap().end(), text.len());
        let steps = doc.find_value(root, "steps").unwrap();
        assert_eq!(doc.items(steps).len(), 1);
    }

    #[test]
    fn test_bare_key_recovered() {
        let doc = parse_json("{cla}");
        let root = doc.root().unwrap();
        assert_eq!(doc.keys(root), vec!["cla"]);
    }

    #[test]
    fn test_escapes_and_literals() {
        let doc = parse_json(r#"["a\"bA", true, null, -3]"#);
        let items = doc.items(doc.root().unwrap()).to_vec();
        assert_eq!(doc.scalar(items[0]), Some(&ScalarValue::String("a\"bA".into())));
        assert_eq!(doc.scalar(items[1]), Some(&ScalarValue::Boolean(true)));
        assert_eq!(doc.scalar(items[2]), Some(&ScalarValue::Null));
        assert_eq!(doc.scalar(items[3]), Some(&ScalarValue::Integer(-3)));
    }

    #[test]
    fn test_empty_input() {
        let doc = parse_json("   \n");
        assert!(doc.root().is_none());
        assert!(doc.syntax_errors().is_empty());
    }

    #[test]
    fn test_excessive_nesting_does_not_overflow() {
        let text = "[".repeat(2000);
        let doc = parse_json(&text);
        assert!(doc.root().is_some());
        assert!(doc
            .syntax_errors()
            .iter()
            .any(|error| error.message.contains("too deep")));
    }
}
