//! Attribute name patterns used by handler predicates.

/// A predicate over attribute names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamePattern {
    Exact(String),
    Prefix(String),
    Suffix(String),
    /// Matches every name. Reserved for fallback handlers.
    Any,
}

impl NamePattern {
    pub fn exact(name: &str) -> Self {
        Self::Exact(name.to_owned())
    }

    pub fn prefix(prefix: &str) -> Self {
        Self::Prefix(prefix.to_owned())
    }

    pub fn suffix(suffix: &str) -> Self {
        Self::Suffix(suffix.to_owned())
    }

    pub fn matches(&self, name: &str) -> bool {
        match self {
            Self::Exact(exact) => name == exact,
            Self::Prefix(prefix) => name.starts_with(prefix.as_str()),
            Self::Suffix(suffix) => name.ends_with(suffix.as_str()),
            Self::Any => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patterns_match() {
        assert!(NamePattern::exact("...").matches("..."));
        assert!(!NamePattern::exact("...").matches("..x"));
        assert!(NamePattern::prefix("@").matches("@click"));
        assert!(NamePattern::suffix("-changed").matches("value-changed"));
        assert!(NamePattern::Any.matches(""));
    }
}
