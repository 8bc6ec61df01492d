#![deny(missing_docs)]

//! # Source Landmarks
//!
//! Maps locations inside a JSON document (`$.paths["/x"].get.parameters[0]`)
//! to `file:line:col` positions in the text it was parsed from, so that
//! diagnostics can point at the offending line of a hand-maintained file.
//!
//! The index is built by a lightweight scan of text that `serde_json` has
//! already accepted; a scan that meets something unexpected stops early and
//! keeps whatever it indexed so far.

use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// A JSONPath-style location, built one step at a time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JsonPath(String);

impl JsonPath {
    /// The document root, `$`.
    pub fn root() -> Self {
        JsonPath("$".to_string())
    }

    /// Descends into an object member.
    ///
    /// Identifier-like keys use `.key`; anything else `["key"]`.
    pub fn key(mut self, key: &str) -> Self {
        let plain = key
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if plain {
            self.0.push('.');
            self.0.push_str(key);
        } else {
            self.0.push('[');
            self.0.push_str(&Value::String(key.to_string()).to_string());
            self.0.push(']');
        }
        self
    }

    /// Descends into an array element.
    pub fn index(mut self, index: usize) -> Self {
        self.0.push_str(&format!("[{}]", index));
        self
    }

    /// The path text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Positions of every value in one JSON text.
#[derive(Debug, Clone, Default)]
pub struct LandmarkIndex {
    filename: String,
    offsets: HashMap<String, usize>,
    line_starts: Vec<usize>,
    text: String,
}

impl LandmarkIndex {
    /// Indexes `text`, reporting positions against `filename`.
    pub fn build(filename: &str, text: &str) -> Self {
        let mut offsets = HashMap::new();
        let mut scanner = Scanner {
            text,
            bytes: text.as_bytes(),
            pos: 0,
            offsets: &mut offsets,
        };
        if scanner.value(&JsonPath::root()).is_none() {
            tracing::debug!(filename, "landmark scan stopped early");
        }

        let mut line_starts = vec![0];
        line_starts.extend(
            text.bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );

        Self {
            filename: filename.to_string(),
            offsets,
            line_starts,
            text: text.to_string(),
        }
    }

    /// Number of indexed values.
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    /// True when nothing was indexed.
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// One-based line and column of the value at `path`.
    pub fn position(&self, path: &JsonPath) -> Option<(usize, usize)> {
        let offset = *self.offsets.get(path.as_str())?;
        let line = self.line_starts.partition_point(|&start| start <= offset);
        let line_start = self.line_starts[line - 1];
        let col = self.text[line_start..offset].chars().count() + 1;
        Some((line, col))
    }

    /// `file:line:col` for the value at `path`.
    pub fn landmark(&self, path: &JsonPath) -> Option<String> {
        let (line, col) = self.position(path)?;
        Some(format!("{}:{}:{}", self.filename, line, col))
    }
}

struct Scanner<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
    offsets: &'a mut HashMap<String, usize>,
}

impl Scanner<'_> {
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, byte: u8) -> Option<()> {
        if self.peek()? == byte {
            self.pos += 1;
            Some(())
        } else {
            None
        }
    }

    fn value(&mut self, path: &JsonPath) -> Option<()> {
        self.skip_ws();
        self.offsets.insert(path.as_str().to_string(), self.pos);
        match self.peek()? {
            b'{' => self.object(path),
            b'[' => self.array(path),
            b'"' => self.string().map(|_| ()),
            _ => {
                while let Some(b) = self.peek() {
                    if matches!(b, b',' | b']' | b'}' | b' ' | b'\t' | b'\n' | b'\r') {
                        break;
                    }
                    self.pos += 1;
                }
                Some(())
            }
        }
    }

    fn object(&mut self, path: &JsonPath) -> Option<()> {
        self.expect(b'{')?;
        self.skip_ws();
        if self.peek()? == b'}' {
            self.pos += 1;
            return Some(());
        }
        loop {
            self.skip_ws();
            let key = self.string()?;
            self.skip_ws();
            self.expect(b':')?;
            self.value(&path.clone().key(&key))?;
            self.skip_ws();
            match self.peek()? {
                b',' => self.pos += 1,
                b'}' => {
                    self.pos += 1;
                    return Some(());
                }
                _ => return None,
            }
        }
    }

    fn array(&mut self, path: &JsonPath) -> Option<()> {
        self.expect(b'[')?;
        self.skip_ws();
        if self.peek()? == b']' {
            self.pos += 1;
            return Some(());
        }
        let mut index = 0;
        loop {
            self.value(&path.clone().index(index))?;
            index += 1;
            self.skip_ws();
            match self.peek()? {
                b',' => self.pos += 1,
                b']' => {
                    self.pos += 1;
                    return Some(());
                }
                _ => return None,
            }
        }
    }

    fn string(&mut self) -> Option<String> {
        let start = self.pos;
        self.expect(b'"')?;
        loop {
            match self.peek()? {
                b'\\' => self.pos += 2,
                b'"' => {
                    self.pos += 1;
                    break;
                }
                _ => self.pos += 1,
            }
        }
        serde_json::from_str(self.text.get(start..self.pos)?).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEXT: &str = r##"{
    "openapi": "3.1.0",
    "paths": {
        "/{p}/review": {
            "get": {
                "tags": ["Reviews"],
                "parameters": [
                    {"$ref": "#/components/parameters/p.path"},
                    {"name": "r\"x", "in": "query"}
                ]
            }
        }
    }
}"##;

    #[test]
    fn test_json_path_formatting() {
        let path = JsonPath::root()
            .key("paths")
            .key("/{p}/review")
            .key("get")
            .key("parameters")
            .index(1);
        assert_eq!(
            path.as_str(),
            r#"$.paths["/{p}/review"].get.parameters[1]"#
        );
        assert_eq!(JsonPath::root().key("200").as_str(), r#"$["200"]"#);
        assert_eq!(JsonPath::root().key("a\"b").as_str(), r#"$["a\"b"]"#);
    }

    #[test]
    fn test_positions() {
        let index = LandmarkIndex::build("openapi.json", TEXT);
        let op = JsonPath::root().key("paths").key("/{p}/review").key("get");

        assert_eq!(index.position(&JsonPath::root()), Some((1, 1)));
        assert_eq!(index.position(&op), Some((5, 20)));
        assert_eq!(
            index.landmark(&op.clone().key("tags")),
            Some("openapi.json:6:25".to_string())
        );
        assert_eq!(
            index.position(&op.clone().key("parameters").index(1)),
            Some((9, 21))
        );
        assert_eq!(
            index.position(&op.clone().key("parameters").index(1).key("in")),
            Some((9, 44))
        );
        assert!(index.landmark(&op.key("responses")).is_none());
    }

    #[test]
    fn test_columns_count_characters() {
        let index = LandmarkIndex::build("x.json", "{\"é\": 1, \"b\": 2}");
        assert_eq!(index.position(&JsonPath::root().key("b")), Some((1, 15)));
    }

    #[test]
    fn test_truncated_text_keeps_prefix() {
        let index = LandmarkIndex::build("x.json", "{\"a\": [1, 2");
        assert_eq!(index.position(&JsonPath::root().key("a").index(1)), Some((1, 11)));
        assert!(!index.is_empty());
    }
}
