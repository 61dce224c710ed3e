use regex::Regex;

/// Allow-pattern over category names. An empty pattern allows everything.
#[derive(Debug, Clone, Default)]
pub struct CategoryFilter {
    pattern: String,
    regex: Option<Regex>,
}

impl CategoryFilter {
    /// Compile the pattern. Returns Err if it is not a valid regex.
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let regex = if pattern.is_empty() {
            None
        } else {
            Some(Regex::new(pattern)?)
        };
        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }

    /// Unanchored search, so "return" allows "-Wreturn-type"
    pub fn is_allowed(&self, category: &str) -> bool {
        match &self.regex {
            Some(regex) => regex.is_match(category),
            None => true,
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

/// One-off check. A pattern that fails to compile allows nothing.
pub fn is_allowed(category: &str, pattern: &str) -> bool {
    CategoryFilter::new(pattern)
        .map(|filter| filter.is_allowed(category))
        .unwrap_or(false)
}
