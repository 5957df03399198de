//! Prefix and pattern lookup for string-keyed dictionaries.
//!
//! When SimKeys are strings, all SimKeys sharing a literal prefix form one
//! contiguous run of the sorted index, so a prefix query is two binary
//! searches. This only holds if the similarity function preserves the relative
//! order of characters: lowercasing is fine, reversing or shuffling is not.

use crate::{Identity, SimilarKeyDict, Similarity};

#[cfg(feature = "regex")]
use crate::{Error, Result};
#[cfg(feature = "regex")]
use regex::Regex;
#[cfg(feature = "regex")]
use std::sync::OnceLock;
#[cfg(feature = "regex")]
use tracing::trace;

/// A [`SimilarKeyDict`] keyed by strings whose SimKeys are strings.
pub type StringSimilarityDict<V, F = Identity> = SimilarKeyDict<String, V, F>;

/// Smallest string greater than every string that starts with `prefix`, or
/// `None` if the last char has no successor.
fn prefix_upper_bound(prefix: &str) -> Option<String> {
    let mut chars = prefix.chars();
    let last = chars.next_back()?;
    let next = match last {
        '\u{D7FF}' => '\u{E000}',
        c => char::from_u32(c as u32 + 1)?,
    };
    let mut end = String::with_capacity(prefix.len() + 1);
    end.push_str(chars.as_str());
    end.push(next);
    Some(end)
}

impl<V, F> SimilarKeyDict<String, V, F>
where
    F: Similarity<String, Key = String>,
{
    /// Keys whose SimKey starts with the SimKey of `prefix`, in index order,
    /// at most `limit` of them.
    ///
    /// An empty SimKey prefix matches every key.
    pub fn prefix_match_keys(&self, prefix: &str, limit: Option<usize>) -> Vec<&String> {
        self.prefix_range(prefix, limit)
            .iter()
            .map(|(_, k)| k)
            .collect()
    }

    /// Like [`prefix_match_keys`](Self::prefix_match_keys), returning SimKeys.
    pub fn prefix_match_simkeys(&self, prefix: &str, limit: Option<usize>) -> Vec<&String> {
        self.prefix_range(prefix, limit)
            .iter()
            .map(|(sk, _)| sk)
            .collect()
    }

    fn prefix_range(&self, prefix: &str, limit: Option<usize>) -> &[(String, String)] {
        let start_key = self.similarity().simkey(&prefix.to_owned());
        let index = self.sorted_index();

        let (start, end) = if start_key.is_empty() {
            (0, index.len())
        } else {
            let start = index.partition_point(|(sk, _)| *sk < start_key);
            let end = match prefix_upper_bound(&start_key) {
                Some(end_key) => index.partition_point(|(sk, _)| *sk < end_key),
                None => {
                    start
                        + index[start..]
                            .partition_point(|(sk, _)| sk.starts_with(start_key.as_str()))
                }
            };
            (start, end)
        };

        let end = match limit {
            Some(limit) => end.min(start.saturating_add(limit)),
            None => end,
        };
        &index[start..end]
    }

    /// Keys matching `pattern` from their first character, at most `limit`.
    ///
    /// The pattern is tested against raw keys, anchored at the start (not a
    /// search). Candidates are first narrowed with a prefix query on the
    /// pattern's literal head.
    #[cfg(feature = "regex")]
    pub fn regex_match_keys(&self, pattern: &str, limit: Option<usize>) -> Result<Vec<&String>> {
        Ok(self
            .regex_matches(pattern, limit)?
            .into_iter()
            .map(|(_, k)| k)
            .collect())
    }

    /// Like [`regex_match_keys`](Self::regex_match_keys), returning SimKeys.
    #[cfg(feature = "regex")]
    pub fn regex_match_simkeys(
        &self,
        pattern: &str,
        limit: Option<usize>,
    ) -> Result<Vec<&String>> {
        Ok(self
            .regex_matches(pattern, limit)?
            .into_iter()
            .map(|(sk, _)| sk)
            .collect())
    }

    #[cfg(feature = "regex")]
    fn regex_matches(
        &self,
        pattern: &str,
        limit: Option<usize>,
    ) -> Result<Vec<&(String, String)>> {
        let literal = literal_prefix(pattern);
        let candidates = self.prefix_range(literal, None);
        let limit = limit.unwrap_or(usize::MAX);

        if literal.len() == pattern.len() {
            trace!(pattern, "pattern is a literal, using a plain prefix test");
            return Ok(candidates
                .iter()
                .filter(|(_, k)| k.starts_with(pattern))
                .take(limit)
                .collect());
        }

        trace!(
            pattern,
            literal,
            candidates = candidates.len(),
            "narrowed regex candidates by literal prefix"
        );
        let re = Regex::new(&format!("^(?:{pattern})"))
            .map_err(|e| Error::InvalidPattern(e.to_string()))?;
        Ok(candidates
            .iter()
            .filter(|(_, k)| re.is_match(k))
            .take(limit)
            .collect())
    }
}

/// Characters that stand for themselves in a regex.
#[cfg(feature = "regex")]
static LITERAL_HEAD: OnceLock<Option<Regex>> = OnceLock::new();

/// The longest head of `pattern` that every match must start with.
///
/// A char followed by a quantifier that allows zero repetitions is not part of
/// the head, and top-level alternation (`|`) disables narrowing altogether.
#[cfg(feature = "regex")]
fn literal_prefix(pattern: &str) -> &str {
    if pattern.contains('|') {
        return "";
    }
    let head = LITERAL_HEAD.get_or_init(|| Regex::new(r#"^[\w \-,:;/'"@#%&=<>!~]*"#).ok());
    let Some(head) = head else {
        return "";
    };
    let len = head.find(pattern).map_or(0, |m| m.end());
    let literal = &pattern[..len];

    match pattern[len..].chars().next() {
        Some('*' | '?' | '{') => {
            let cut = literal.char_indices().next_back().map_or(0, |(i, _)| i);
            &literal[..cut]
        }
        _ => literal,
    }
}
