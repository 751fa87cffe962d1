//! Template variables.
//!
//! Each variable kind compiles to a character class or an alternation group
//! derived from the URI (RFC 3986) and HTTP (RFC 2616) grammars.

use serde::{Deserialize, Serialize};

const ALPHA: &str = "a-zA-Z";
const DIGIT: &str = "0-9";
const HEXA: &str = "0-9A-Fa-f";
const URI_UNRESERVED: &str = r"a-zA-Z0-9\-\._\~";
const URI_GEN_DELIMS: &str = r":/\?\#\[\]@";
const URI_SUB_DELIMS: &str = r"!\$\&'\(\)\*\+,;=";
const QUERY_PARAM_DELIMS: &str = r"!\$'\(\)\*\+,;";
const WORD: &str = "0-9A-Za-z_";

/// The set of characters a variable may capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableKind {
    All,
    Alpha,
    Digit,
    AlphaDigit,
    UriAll,
    UriUnreserved,
    Word,
    UriFragment,
    UriPath,
    UriQuery,
    UriQueryParam,
    UriSegment,
    Token,
    Comment,
    CommentAttribute,
}

/// A variable declaration: kind plus matching and formatting options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub kind: VariableKind,
    /// Value used when formatting without a resolved value, and the literal
    /// matched by fixed variables.
    pub default_value: String,
    /// Whether at least one character must be captured.
    pub required: bool,
    /// Whether the variable only matches its default value.
    pub fixed: bool,
    /// Percent-decode captured values.
    pub decoding_on_parse: bool,
    /// Percent-encode substituted values.
    pub encoding_on_format: bool,
}

impl Variable {
    pub fn new(kind: VariableKind) -> Self {
        Self {
            kind,
            default_value: String::new(),
            required: true,
            fixed: false,
            decoding_on_parse: false,
            encoding_on_format: false,
        }
    }

    /// A variable matching exactly `value`.
    pub fn fixed(value: impl Into<String>) -> Self {
        Self {
            default_value: value.into(),
            fixed: true,
            ..Self::new(VariableKind::All)
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default_value = value.into();
        self
    }

    pub fn decoding(mut self) -> Self {
        self.decoding_on_parse = true;
        self
    }

    pub fn encoding(mut self) -> Self {
        self.encoding_on_format = true;
        self
    }

    /// The capturing regex fragment for this variable.
    pub(crate) fn regex(&self) -> String {
        if self.fixed {
            return format!("({})", regex::escape(&self.default_value));
        }

        let pct_encoded = format!("%[{HEXA}][{HEXA}]");
        let pchar = format!("[{URI_UNRESERVED}{URI_SUB_DELIMS}:@]|(?:{pct_encoded})");
        let query = format!("{pchar}|/|\\?");
        let uri_path = format!("{pchar}|/");
        let uri_all = format!("[{URI_GEN_DELIMS}{URI_SUB_DELIMS}{URI_UNRESERVED}]|(?:{pct_encoded})");
        let query_param =
            format!("[{URI_UNRESERVED}{QUERY_PARAM_DELIMS}:@]|(?:{pct_encoded})|/|\\?");

        match self.kind {
            VariableKind::All => class(".", self.required),
            VariableKind::Alpha => class(&format!("[{ALPHA}]"), self.required),
            VariableKind::Digit => class(&format!("[{DIGIT}]"), self.required),
            VariableKind::AlphaDigit => class(&format!("[{ALPHA}{DIGIT}]"), self.required),
            VariableKind::UriUnreserved => class(&format!("[{URI_UNRESERVED}]"), self.required),
            VariableKind::Word => class(&format!("[{WORD}]"), self.required),
            VariableKind::Token => class(r#"[^\(\)<>@,;:\[\]"/\\\?=\{\} \t\x00-\x1F\x7F]"#, self.required),
            VariableKind::Comment => class(r"[^\(\)\x00-\x08\x0A-\x1F\x7F]", self.required),
            VariableKind::CommentAttribute => class(r"[^;\(\)]", self.required),
            VariableKind::UriAll => group(&uri_all, self.required),
            VariableKind::UriFragment | VariableKind::UriQuery => group(&query, self.required),
            VariableKind::UriPath => group(&uri_path, self.required),
            VariableKind::UriQueryParam => group(&query_param, self.required),
            VariableKind::UriSegment => group(&pchar, self.required),
        }
    }
}

impl Default for Variable {
    /// The route default: a required URI path segment.
    fn default() -> Self {
        Self::new(VariableKind::UriSegment)
    }
}

fn repetition(required: bool) -> char {
    if required {
        '+'
    } else {
        '*'
    }
}

fn class(content: &str, required: bool) -> String {
    format!("({content}{})", repetition(required))
}

fn group(content: &str, required: bool) -> String {
    format!("((?:{content}){})", repetition(required))
}
