#![deny(missing_docs)]

//! # Parameter Tokens
//!
//! Parses the compact parameter and response grammar used by API function
//! descriptors. A token is a run of flag characters followed by a name:
//!
//! | symbol | flag |
//! |---|---|
//! | `?` | clears `REQUIRED` |
//! | `+` | `POST` (POST-only) |
//! | `=` | `BODY` (request body) |
//! | `@` | `FILE` (file upload) |
//! | `:` | `SUFFIX` (path suffix) |
//!
//! Flags are consumed left to right until the first character that is not a
//! flag for the grammar in use; the remainder is the name.

use crate::registry::FunctionDescriptor;
use indexmap::IndexMap;
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Name of the submission-id parameter.
pub const PAPER_PARAM: &str = "p";

/// Name of the implicit redirect parameter.
pub const REDIRECT_PARAM: &str = "redirect";

/// Wildcard token name; it declares "anything else" and is never emitted.
pub const WILDCARD: &str = "*";

/// A set of parameter flags.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ParamFlags(u8);

impl ParamFlags {
    /// No flags.
    pub const NONE: ParamFlags = ParamFlags(0);
    /// The parameter must be supplied.
    pub const REQUIRED: ParamFlags = ParamFlags(0x01);
    /// Only relevant for POST.
    pub const POST: ParamFlags = ParamFlags(0x02);
    /// Carried in the request body.
    pub const BODY: ParamFlags = ParamFlags(0x04);
    /// A file upload.
    pub const FILE: ParamFlags = ParamFlags(0x08);
    /// A path-template suffix.
    pub const SUFFIX: ParamFlags = ParamFlags(0x10);
    /// Located in the path.
    pub const PATH: ParamFlags = ParamFlags(0x20);
    /// Flags that exclude a parameter from GET requests.
    pub const NON_GET: ParamFlags = ParamFlags(0x02 | 0x04 | 0x08);

    /// Raw bits.
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// True when every flag in `other` is set.
    pub const fn contains(self, other: ParamFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// True when any flag in `other` is set.
    pub const fn intersects(self, other: ParamFlags) -> bool {
        self.0 & other.0 != 0
    }

    /// True when no flag is set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Sets the flags in `other`.
    pub fn insert(&mut self, other: ParamFlags) {
        self.0 |= other.0;
    }

    /// Clears the flags in `other`.
    pub fn remove(&mut self, other: ParamFlags) {
        self.0 &= !other.0;
    }

    /// Shorthand for `contains(REQUIRED)`.
    pub const fn is_required(self) -> bool {
        self.contains(Self::REQUIRED)
    }

    /// True for body-carried parameters, including file uploads.
    pub const fn in_body(self) -> bool {
        self.intersects(ParamFlags(Self::BODY.0 | Self::FILE.0))
    }
}

impl BitOr for ParamFlags {
    type Output = ParamFlags;

    fn bitor(self, rhs: ParamFlags) -> ParamFlags {
        ParamFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for ParamFlags {
    fn bitor_assign(&mut self, rhs: ParamFlags) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for ParamFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(ParamFlags, &str); 6] = [
            (ParamFlags::REQUIRED, "REQUIRED"),
            (ParamFlags::POST, "POST"),
            (ParamFlags::BODY, "BODY"),
            (ParamFlags::FILE, "FILE"),
            (ParamFlags::SUFFIX, "SUFFIX"),
            (ParamFlags::PATH, "PATH"),
        ];
        let set: Vec<&str> = NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        if set.is_empty() {
            f.write_str("ParamFlags(NONE)")
        } else {
            write!(f, "ParamFlags({})", set.join(" | "))
        }
    }
}

/// Which flag characters a token may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grammar {
    /// Request parameters: `?`, `+`, `=`, `@`, `:`.
    Request,
    /// Response fields: `?`, `+`.
    Response,
}

/// Parses one token into its flags and name.
///
/// Every token starts out `REQUIRED`.
pub fn parse_token(token: &str, grammar: Grammar) -> (ParamFlags, &str) {
    let mut flags = ParamFlags::REQUIRED;
    let mut consumed = 0;
    for c in token.chars() {
        match (c, grammar) {
            ('?', _) => flags.remove(ParamFlags::REQUIRED),
            ('+', _) => flags.insert(ParamFlags::POST),
            ('=', Grammar::Request) => flags.insert(ParamFlags::BODY),
            ('@', Grammar::Request) => flags.insert(ParamFlags::FILE),
            (':', Grammar::Request) => flags.insert(ParamFlags::SUFFIX),
            _ => break,
        }
        consumed += c.len_utf8();
    }
    (flags, &token[consumed..])
}

/// Parses a descriptor's request parameters, in declaration order.
///
/// A `paper` descriptor gets a leading required `p`; a later explicit `p`
/// token replaces its flags but keeps its position. A `redirect` descriptor
/// gets a trailing flagless `redirect`.
pub fn parse_parameters(desc: &FunctionDescriptor) -> IndexMap<String, ParamFlags> {
    let mut known = IndexMap::new();
    if desc.paper {
        known.insert(PAPER_PARAM.to_string(), ParamFlags::REQUIRED);
    }
    if let Some(spec) = &desc.parameters {
        for token in spec.tokens() {
            let (flags, name) = parse_token(token, Grammar::Request);
            known.insert(name.to_string(), flags);
        }
    }
    if desc.redirect {
        known.insert(REDIRECT_PARAM.to_string(), ParamFlags::NONE);
    }
    known
}

/// Parses a descriptor's response fields, in declaration order.
pub fn parse_response(desc: &FunctionDescriptor) -> IndexMap<String, ParamFlags> {
    let mut fields = IndexMap::new();
    if let Some(spec) = &desc.response {
        for token in spec.tokens() {
            let (flags, name) = parse_token(token, Grammar::Response);
            fields.insert(name.to_string(), flags);
        }
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TokenList;

    const R: ParamFlags = ParamFlags::REQUIRED;
    const P: ParamFlags = ParamFlags::POST;
    const B: ParamFlags = ParamFlags::BODY;
    const F: ParamFlags = ParamFlags::FILE;
    const S: ParamFlags = ParamFlags::SUFFIX;
    const N: ParamFlags = ParamFlags::NONE;

    #[test]
    fn test_request_token_table() {
        let cases: &[(&str, ParamFlags, &str)] = &[
            ("q", R, "q"),
            ("?q", N, "q"),
            ("+q", R | P, "q"),
            ("=q", R | B, "q"),
            ("@q", R | F, "q"),
            (":q", R | S, "q"),
            ("?+q", P, "q"),
            ("+?q", P, "q"),
            ("?=q", B, "q"),
            ("=?q", B, "q"),
            ("?@q", F, "q"),
            ("?:q", S, "q"),
            ("+=q", R | P | B, "q"),
            ("+@q", R | P | F, "q"),
            ("=@q", R | B | F, "q"),
            (":+q", R | S | P, "q"),
            ("?+=@:q", P | B | F | S, "q"),
            ("??q", N, "q"),
            ("==q", R | B, "q"),
            ("q?", R, "q?"),
            ("q=?", R, "q=?"),
            ("?", N, ""),
            ("", R, ""),
        ];
        for (token, flags, name) in cases {
            assert_eq!(
                parse_token(token, Grammar::Request),
                (*flags, *name),
                "token {:?}",
                token
            );
        }
    }

    #[test]
    fn test_response_token_table() {
        let cases: &[(&str, ParamFlags, &str)] = &[
            ("ok", R, "ok"),
            ("?ok", N, "ok"),
            ("+ok", R | P, "ok"),
            ("?+ok", P, "ok"),
            ("=ok", R, "=ok"),
            ("@ok", R, "@ok"),
            (":ok", R, ":ok"),
            ("?=ok", N, "=ok"),
            ("*", R, "*"),
        ];
        for (token, flags, name) in cases {
            assert_eq!(
                parse_token(token, Grammar::Response),
                (*flags, *name),
                "token {:?}",
                token
            );
        }
    }

    #[test]
    fn test_flag_predicates() {
        assert!((B | R).in_body());
        assert!(F.in_body());
        assert!(!(S | R).in_body());
        assert!((P | R).intersects(ParamFlags::NON_GET));
        assert!(!(S | R).intersects(ParamFlags::NON_GET));
        assert_eq!(format!("{:?}", R | B), "ParamFlags(REQUIRED | BODY)");
        assert_eq!(format!("{:?}", N), "ParamFlags(NONE)");
    }

    #[test]
    fn test_paper_and_redirect_injection() {
        let desc = FunctionDescriptor {
            name: "review".into(),
            paper: true,
            redirect: true,
            parameters: Some(TokenList::Text("r ?+=override".into())),
            ..FunctionDescriptor::default()
        };
        let known = parse_parameters(&desc);
        let flat: Vec<(&str, ParamFlags)> =
            known.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        assert_eq!(
            flat,
            vec![("p", R), ("r", R), ("override", P | B), ("redirect", N)]
        );
    }

    #[test]
    fn test_explicit_p_keeps_position() {
        let desc = FunctionDescriptor {
            name: "search".into(),
            paper: true,
            parameters: Some(TokenList::List(vec!["q".into(), "?p".into()])),
            ..FunctionDescriptor::default()
        };
        let known = parse_parameters(&desc);
        assert_eq!(known.get_index(0), Some((&"p".to_string(), &N)));
        assert_eq!(known.get_index(1), Some((&"q".to_string(), &R)));
    }

    #[test]
    fn test_parse_response_tokens() {
        let desc = FunctionDescriptor {
            name: "whoami".into(),
            response: Some(TokenList::Text("  email ?given_name +?token ".into())),
            ..FunctionDescriptor::default()
        };
        let fields = parse_response(&desc);
        let flat: Vec<(&str, ParamFlags)> =
            fields.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        assert_eq!(flat, vec![("email", R), ("given_name", N), ("token", P)]);
    }
}
