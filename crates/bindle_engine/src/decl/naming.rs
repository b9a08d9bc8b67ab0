use alloc::string::String;
use alloc::vec::Vec;

/// Rewrites implicit property names.
///
/// Explicit names given with [`rename`](super::AccessorDecl::rename) are
/// never rewritten.
///
/// ```
/// use bindle_engine::decl::NamingStrategy;
///
/// assert_eq!(NamingStrategy::LowerCamelCase.apply("first_name"), "firstName");
/// assert_eq!(NamingStrategy::KebabCase.apply("httpStatusCode"), "http-status-code");
/// assert_eq!(NamingStrategy::SnakeCase.apply("HTTPServer"), "http_server");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum NamingStrategy {
    /// `first_name`
    SnakeCase,
    /// `first-name`
    KebabCase,
    /// `FirstName`
    UpperCamelCase,
    /// `firstName`
    LowerCamelCase,
    /// `firstname`
    LowerCase,
    /// `FIRSTNAME`
    UpperCase,
}

impl NamingStrategy {
    pub fn apply(&self, name: &str) -> String {
        match self {
            NamingStrategy::SnakeCase => split_words(name).join("_"),
            NamingStrategy::KebabCase => split_words(name).join("-"),
            NamingStrategy::UpperCamelCase => camel(name, true),
            NamingStrategy::LowerCamelCase => camel(name, false),
            NamingStrategy::LowerCase => name.to_lowercase(),
            NamingStrategy::UpperCase => name.to_uppercase(),
        }
    }
}

fn camel(name: &str, upper_first: bool) -> String {
    let mut out = String::with_capacity(name.len());
    for (i, word) in split_words(name).iter().enumerate() {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            if i == 0 && !upper_first {
                out.push(first);
            } else {
                out.extend(first.to_uppercase());
            }
            out.push_str(chars.as_str());
        }
    }
    out
}

// Lowercased words. Splits on `_`, `-`, spaces and case changes; an
// acronym ends before its last capital when a lowercase letter follows.
fn split_words(name: &str) -> Vec<String> {
    let chars: Vec<char> = name.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if matches!(c, '_' | '-' | ' ') {
            if !current.is_empty() {
                words.push(core::mem::take(&mut current));
            }
            continue;
        }
        if c.is_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_lower) {
                words.push(core::mem::take(&mut current));
            }
        }
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}
