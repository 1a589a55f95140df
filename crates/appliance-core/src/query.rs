//! Convenience builder for HTTP query parameters.
//!
//! Keys may repeat; several appliances combine multiple `filter` parameters in a
//! single listing call.

use std::fmt::Display;

/// Builder for assembling query parameter pairs.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(&'static str, String)>,
}

impl QueryParams {
    /// Create a new, empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self { pairs: Vec::new() }
    }

    /// Append a key/value pair when the value is present.
    pub fn push_opt<T>(&mut self, key: &'static str, value: Option<T>)
    where
        T: Display,
    {
        if let Some(value) = value {
            self.pairs.push((key, value.to_string()));
        }
    }

    /// Append a required key/value pair.
    pub fn push<T>(&mut self, key: &'static str, value: T)
    where
        T: Display,
    {
        self.pairs.push((key, value.to_string()));
    }

    /// Replace every pair with the given key by a single new pair.
    pub fn set<T>(&mut self, key: &'static str, value: T)
    where
        T: Display,
    {
        self.pairs.retain(|(existing, _)| *existing != key);
        self.push(key, value);
    }

    /// Borrow the collected key/value pairs.
    #[must_use]
    pub fn pairs(&self) -> &[(&'static str, String)] {
        &self.pairs
    }

    /// Return the collected key/value pairs.
    #[must_use]
    pub fn into_pairs(self) -> Vec<(&'static str, String)> {
        self.pairs
    }

    /// Returns true if no parameters have been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::QueryParams;

    #[test]
    fn push_opt_skips_none() {
        let mut params = QueryParams::new();
        params.push_opt("filter", Option::<String>::None);
        assert!(params.is_empty());
    }

    #[test]
    fn repeated_keys_are_kept() {
        let mut params = QueryParams::new();
        params.push("filter", "mac.STARTSW.00");
        params.push("filter", "groupId.EQ.c5b18110");
        params.push("filtertype", "OR");
        assert_eq!(params.pairs().len(), 3);
    }

    #[test]
    fn set_replaces_existing_key() {
        let mut params = QueryParams::new();
        params.push("filter", "name.EQ.lab");
        params.push("page", 1);
        params.set("page", 2);
        assert_eq!(
            params.into_pairs(),
            vec![("filter", "name.EQ.lab".to_string()), ("page", "2".to_string())]
        );
    }
}
