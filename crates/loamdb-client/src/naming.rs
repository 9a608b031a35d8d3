//! Field naming strategies.
//!
//! The server reports attribute names in its own convention; callers declare
//! struct fields in theirs. A naming strategy is the deterministic transform
//! from the caller-side name to the server-side name, applied during row
//! mapping.

/// A deterministic transform between caller-side field names and
/// server-side attribute names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NamingStrategy {
    /// Use field names as written.
    #[default]
    Preserve,
    /// `userName` -> `user_name`.
    SnakeCase,
    /// `user_name` -> `userName`.
    CamelCase,
    /// `user_name` -> `UserName`.
    PascalCase,
}

impl NamingStrategy {
    /// Convert a caller-side name into the server-side format.
    pub fn convert(&self, name: &str) -> String {
        match self {
            NamingStrategy::Preserve => name.to_string(),
            NamingStrategy::SnakeCase => to_snake(name),
            NamingStrategy::CamelCase => to_camel(name, false),
            NamingStrategy::PascalCase => to_camel(name, true),
        }
    }
}

/// Split a name into lowercase words at underscores and case boundaries.
fn words(name: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();

    for ch in name.chars() {
        if ch == '_' || ch == '-' {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
        } else if ch.is_uppercase() && !current.is_empty() {
            out.push(std::mem::take(&mut current));
            current.extend(ch.to_lowercase());
        } else {
            current.extend(ch.to_lowercase());
        }
    }

    if !current.is_empty() {
        out.push(current);
    }
    out
}

fn to_snake(name: &str) -> String {
    words(name).join("_")
}

fn to_camel(name: &str, capitalize_first: bool) -> String {
    let mut out = String::with_capacity(name.len());
    for (i, word) in words(name).iter().enumerate() {
        if i == 0 && !capitalize_first {
            out.push_str(word);
        } else {
            let mut chars = word.chars();
            if let Some(first) = chars.next() {
                out.extend(first.to_uppercase());
                out.push_str(chars.as_str());
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preserve() {
        assert_eq!(NamingStrategy::Preserve.convert("user_name"), "user_name");
        assert_eq!(NamingStrategy::Preserve.convert("userName"), "userName");
    }

    #[test]
    fn test_snake_case() {
        assert_eq!(NamingStrategy::SnakeCase.convert("userName"), "user_name");
        assert_eq!(NamingStrategy::SnakeCase.convert("UserName"), "user_name");
        assert_eq!(NamingStrategy::SnakeCase.convert("user_name"), "user_name");
        assert_eq!(NamingStrategy::SnakeCase.convert("id"), "id");
    }

    #[test]
    fn test_camel_case() {
        assert_eq!(NamingStrategy::CamelCase.convert("user_name"), "userName");
        assert_eq!(NamingStrategy::CamelCase.convert("userName"), "userName");
        assert_eq!(NamingStrategy::CamelCase.convert("id"), "id");
    }

    #[test]
    fn test_pascal_case() {
        assert_eq!(NamingStrategy::PascalCase.convert("user_name"), "UserName");
        assert_eq!(NamingStrategy::PascalCase.convert("userName"), "UserName");
    }

    #[test]
    fn test_empty_name() {
        assert_eq!(NamingStrategy::SnakeCase.convert(""), "");
        assert_eq!(NamingStrategy::CamelCase.convert(""), "");
    }
}
