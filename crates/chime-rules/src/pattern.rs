//! Text matchers.

use chime_core::error::{ChimeError, Result, ValidationKind};
use regex::Regex;

use crate::model::MatcherType;

/// What a successful match exposes to the reply template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchDetails {
    /// Command arguments after the command word.
    pub args: Vec<String>,
    /// Regex groups, `captures[0]` being the whole match. Unmatched optional
    /// groups are empty strings.
    pub captures: Vec<String>,
}

#[derive(Debug, Clone)]
pub enum Pattern {
    FullMatch(Vec<String>),
    Keyword(Vec<String>),
    Prefix(Vec<String>),
    Suffix(Vec<String>),
    /// Command words with the prefix already prepended, e.g. `/weather`.
    Command(Vec<String>),
    Regex(Regex),
}

impl Pattern {
    pub fn compile(matcher: MatcherType, patterns: &[String], command_prefix: &str) -> Result<Self> {
        let owned = || patterns.to_vec();
        Ok(match matcher {
            MatcherType::FullMatch => Self::FullMatch(owned()),
            MatcherType::Keyword => Self::Keyword(owned()),
            MatcherType::Prefix => Self::Prefix(owned()),
            MatcherType::Suffix => Self::Suffix(owned()),
            MatcherType::Command => Self::Command(
                patterns
                    .iter()
                    .map(|p| format!("{command_prefix}{p}"))
                    .collect(),
            ),
            MatcherType::Regex => {
                let [source] = patterns else {
                    return Err(ChimeError::validation(
                        ValidationKind::RegexArity,
                        format!("regex matcher takes exactly one pattern, got {}", patterns.len()),
                    ));
                };
                let re = Regex::new(source).map_err(|e| {
                    ChimeError::validation(ValidationKind::RegexSyntax, format!("regex error: {e}"))
                })?;
                Self::Regex(re)
            }
            MatcherType::Other(code) => {
                return Err(ChimeError::validation(
                    ValidationKind::MatcherType,
                    format!("unknown matcher type {code}"),
                ));
            }
        })
    }

    pub fn matches(&self, text: &str) -> Option<MatchDetails> {
        let hit = |ok: bool| ok.then(MatchDetails::default);
        match self {
            Self::FullMatch(ps) => hit(ps.iter().any(|p| text == p)),
            Self::Keyword(ps) => hit(ps.iter().any(|p| text.contains(p.as_str()))),
            Self::Prefix(ps) => hit(ps.iter().any(|p| text.starts_with(p.as_str()))),
            Self::Suffix(ps) => hit(ps.iter().any(|p| text.ends_with(p.as_str()))),
            Self::Command(words) => {
                let mut tokens = split_command(text).into_iter();
                let first = tokens.next()?;
                words.iter().any(|w| *w == first).then(|| MatchDetails {
                    args: tokens.collect(),
                    captures: Vec::new(),
                })
            }
            Self::Regex(re) => {
                let caps = re.captures(text)?;
                Some(MatchDetails {
                    args: Vec::new(),
                    captures: caps
                        .iter()
                        .map(|m| m.map(|m| m.as_str().to_string()).unwrap_or_default())
                        .collect(),
                })
            }
        }
    }
}

/// Split a command line on whitespace. Single or double quotes group words
/// and a backslash escapes the next character.
pub fn split_command(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote: Option<char> = None;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (_, '\\') => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
                in_token = true;
            }
            (Some(q), c) if c == q => quote = None,
            (Some(_), c) => current.push(c),
            (None, '"' | '\'') => {
                quote = Some(c);
                in_token = true;
            }
            (None, c) if c.is_whitespace() => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            (None, c) => {
                current.push(c);
                in_token = true;
            }
        }
    }
    if in_token {
        tokens.push(current);
    }
    tokens
}
