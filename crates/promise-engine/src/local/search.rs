//! Id filters for search requests.

use regex::Regex;

use promise_core::{EngineError, EngineResult};

/// Glob over ids where `*` matches any run of characters.
///
/// An absent, empty, or bare `*` pattern matches every id.
pub(crate) struct IdPattern(Option<Regex>);

impl IdPattern {
    pub(crate) fn new(pattern: Option<&str>) -> EngineResult<Self> {
        let pattern = match pattern {
            None | Some("") | Some("*") => return Ok(Self(None)),
            Some(p) => p,
        };
        let body = pattern
            .split('*')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");
        let regex = Regex::new(&format!("^{body}$"))
            .map_err(|e| EngineError::Invalid(format!("search pattern {pattern:?}: {e}")))?;
        Ok(Self(Some(regex)))
    }

    pub(crate) fn matches(&self, id: &str) -> bool {
        self.0.as_ref().is_none_or(|re| re.is_match(id))
    }
}
