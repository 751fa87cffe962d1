//! URI templates.
//!
//! A template is literal text interleaved with `{name}` variables. It is
//! compiled once into an anchored regular expression; matching reports the
//! number of characters consumed so routers can move the request's base
//! reference forward.
//!
//! # Design Decisions
//! - Compilation is eager: malformed patterns fail at construction
//! - A variable used twice must capture the same text both times, checked
//!   after the regex match
//! - `StartsWith` matching is anchored on the left only, so a router can
//!   consume a prefix and hand the rest to the next router

use std::collections::HashMap;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::error::TemplateError;
use crate::routing::variable::Variable;

/// How much of the input a template must cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchingMode {
    /// The whole input must match.
    Equals,
    /// A prefix of the input must match.
    #[default]
    StartsWith,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(String),
    Variable(String),
}

/// A compiled URI template.
#[derive(Debug, Clone)]
pub struct Template {
    pattern: String,
    matching_mode: MatchingMode,
    default_variable: Variable,
    variables: HashMap<String, Variable>,
    encoding_variables: bool,
    tokens: Vec<Token>,
    regex: Regex,
    /// Variable name of each capture group, in group order.
    groups: Vec<String>,
    has_repeats: bool,
}

/// Builder for templates with custom variables.
#[derive(Debug, Clone)]
pub struct TemplateBuilder {
    pattern: String,
    matching_mode: MatchingMode,
    default_variable: Variable,
    variables: HashMap<String, Variable>,
    encoding_variables: bool,
}

impl TemplateBuilder {
    pub fn matching_mode(mut self, mode: MatchingMode) -> Self {
        self.matching_mode = mode;
        self
    }

    /// Declaration used for variables without their own.
    pub fn default_variable(mut self, variable: Variable) -> Self {
        self.default_variable = variable;
        self
    }

    pub fn variable(mut self, name: impl Into<String>, variable: Variable) -> Self {
        self.variables.insert(name.into(), variable);
        self
    }

    /// Percent-encode every substituted value when formatting.
    pub fn encoding_variables(mut self, encode: bool) -> Self {
        self.encoding_variables = encode;
        self
    }

    pub fn build(self) -> Result<Template, TemplateError> {
        let tokens = tokenize(&self.pattern)?;

        let mut source = String::from("^(?:");
        let mut groups = Vec::new();
        for token in &tokens {
            match token {
                Token::Literal(text) => source.push_str(&regex::escape(text)),
                Token::Variable(name) => {
                    let var = self.variables.get(name).unwrap_or(&self.default_variable);
                    source.push_str(&var.regex());
                    groups.push(name.clone());
                }
            }
        }
        source.push(')');
        if self.matching_mode == MatchingMode::Equals {
            source.push('$');
        }

        let regex = Regex::new(&source).map_err(|source| TemplateError::Regex {
            pattern: self.pattern.clone(),
            source,
        })?;

        let has_repeats = groups
            .iter()
            .enumerate()
            .any(|(i, name)| groups[..i].contains(name));

        Ok(Template {
            pattern: self.pattern,
            matching_mode: self.matching_mode,
            default_variable: self.default_variable,
            variables: self.variables,
            encoding_variables: self.encoding_variables,
            tokens,
            regex,
            groups,
            has_repeats,
        })
    }
}

impl Template {
    /// Compile a template whose variables are required URI segments.
    pub fn new(pattern: impl Into<String>, matching_mode: MatchingMode) -> Result<Self, TemplateError> {
        Self::builder(pattern).matching_mode(matching_mode).build()
    }

    pub fn builder(pattern: impl Into<String>) -> TemplateBuilder {
        TemplateBuilder {
            pattern: pattern.into(),
            matching_mode: MatchingMode::StartsWith,
            default_variable: Variable::default(),
            variables: HashMap::new(),
            encoding_variables: false,
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn matching_mode(&self) -> MatchingMode {
        self.matching_mode
    }

    /// Recompile with a different matching mode.
    pub fn with_matching_mode(&self, mode: MatchingMode) -> Result<Self, TemplateError> {
        TemplateBuilder {
            pattern: self.pattern.clone(),
            matching_mode: mode,
            default_variable: self.default_variable.clone(),
            variables: self.variables.clone(),
            encoding_variables: self.encoding_variables,
        }
        .build()
    }

    /// Distinct variable names in order of first appearance.
    pub fn variable_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for group in &self.groups {
            if !names.contains(&group.as_str()) {
                names.push(group);
            }
        }
        names
    }

    /// Number of characters of `input` matched, or `None`.
    pub fn match_len(&self, input: &str) -> Option<usize> {
        if !self.has_repeats {
            return self.regex.find(input).map(|m| m.end());
        }
        let caps = self.captures(input)?;
        caps.get(0).map(|m| m.end())
    }

    /// Match `input`, storing every variable value into `attributes`.
    /// Returns the number of characters matched.
    pub fn parse(&self, input: &str, attributes: &mut HashMap<String, String>) -> Option<usize> {
        let caps = self.captures(input)?;

        for (i, name) in self.groups.iter().enumerate() {
            let raw = caps.get(i + 1).map_or("", |m| m.as_str());
            let value = if self.variable(name).decoding_on_parse {
                urlencoding::decode(raw).map_or_else(|_| raw.to_string(), |v| v.into_owned())
            } else {
                raw.to_string()
            };
            tracing::trace!(variable = %name, value = %value, "Template variable matched");
            attributes.insert(name.clone(), value);
        }

        caps.get(0).map(|m| m.end())
    }

    /// Substitute variables using `resolve`; unresolved variables take their
    /// declared default value.
    pub fn format<F>(&self, resolve: F) -> String
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut out = String::with_capacity(self.pattern.len());
        for token in &self.tokens {
            match token {
                Token::Literal(text) => out.push_str(text),
                Token::Variable(name) => {
                    let var = self.variable(name);
                    let value = resolve(name.as_str()).unwrap_or_else(|| var.default_value.clone());
                    if self.encoding_variables || var.encoding_on_format {
                        out.push_str(&urlencoding::encode(&value));
                    } else {
                        out.push_str(&value);
                    }
                }
            }
        }
        out
    }

    pub fn format_map(&self, values: &HashMap<String, String>) -> String {
        self.format(|name| values.get(name).cloned())
    }

    fn variable(&self, name: &str) -> &Variable {
        self.variables.get(name).unwrap_or(&self.default_variable)
    }

    fn captures<'a>(&self, input: &'a str) -> Option<Captures<'a>> {
        let caps = self.regex.captures(input)?;
        if self.has_repeats && !self.repeats_agree(&caps) {
            return None;
        }
        Some(caps)
    }

    fn repeats_agree(&self, caps: &Captures<'_>) -> bool {
        let value = |i: usize| caps.get(i + 1).map_or("", |m| m.as_str());
        self.groups.iter().enumerate().all(|(i, name)| {
            match self.groups[..i].iter().position(|n| n == name) {
                Some(first) => value(first) == value(i),
                None => true,
            }
        })
    }
}

/// Text with `{name}` placeholders, used for response bodies.
///
/// Unlike [`Template`] it is never matched against input, so no regex is
/// built and any text is accepted. `{{` and `}}` stand for literal braces;
/// a brace that does not open a well-formed `{name}` is kept as written,
/// so JSON bodies need no escaping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextTemplate {
    tokens: Vec<Token>,
    len: usize,
}

impl TextTemplate {
    pub fn new(text: &str) -> Self {
        Self {
            tokens: tokenize_text(text),
            len: text.len(),
        }
    }

    /// Substitute placeholders using `resolve`; unresolved ones become empty.
    pub fn format<F>(&self, resolve: F) -> String
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut out = String::with_capacity(self.len);
        for token in &self.tokens {
            match token {
                Token::Literal(text) => out.push_str(text),
                Token::Variable(name) => out.push_str(&resolve(name).unwrap_or_default()),
            }
        }
        out
    }
}

fn tokenize_text(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut rest = text;

    while let Some(i) = rest.find(['{', '}']) {
        literal.push_str(&rest[..i]);
        let tail = &rest[i..];
        if tail.starts_with("{{") || tail.starts_with("}}") {
            literal.push_str(&tail[..1]);
            rest = &tail[2..];
            continue;
        }
        if tail.starts_with('{') {
            if let Some(end) = tail[1..].find('}') {
                let name = &tail[1..=end];
                if !name.is_empty() && name.chars().all(is_name_char) {
                    if !literal.is_empty() {
                        tokens.push(Token::Literal(std::mem::take(&mut literal)));
                    }
                    tokens.push(Token::Variable(name.to_string()));
                    rest = &tail[end + 2..];
                    continue;
                }
            }
        }
        literal.push_str(&tail[..1]);
        rest = &tail[1..];
    }
    literal.push_str(rest);
    if !literal.is_empty() {
        tokens.push(Token::Literal(literal));
    }
    tokens
}

/// Characters allowed in variable names (URI unreserved).
fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~')
}

fn tokenize(pattern: &str) -> Result<Vec<Token>, TemplateError> {
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut name: Option<String> = None;

    for (offset, c) in pattern.char_indices() {
        match name.as_mut() {
            Some(buf) => {
                if is_name_char(c) {
                    buf.push(c);
                } else if c == '}' {
                    if buf.is_empty() {
                        return Err(TemplateError::EmptyVariable {
                            pattern: pattern.to_string(),
                            offset,
                        });
                    }
                    tokens.push(Token::Variable(std::mem::take(buf)));
                    name = None;
                } else {
                    return Err(TemplateError::InvalidVariableChar {
                        pattern: pattern.to_string(),
                        offset,
                        found: c,
                    });
                }
            }
            None => match c {
                '{' => {
                    if !literal.is_empty() {
                        tokens.push(Token::Literal(std::mem::take(&mut literal)));
                    }
                    name = Some(String::new());
                }
                '}' => {
                    return Err(TemplateError::UnbalancedBrace {
                        pattern: pattern.to_string(),
                        offset,
                    })
                }
                _ => literal.push(c),
            },
        }
    }

    if name.is_some() {
        return Err(TemplateError::UnterminatedVariable {
            pattern: pattern.to_string(),
        });
    }
    if !literal.is_empty() {
        tokens.push(Token::Literal(literal));
    }
    Ok(tokens)
}
