//! Path variables captured by a route match.

use std::collections::HashMap;

use smallvec::SmallVec;

/// Variables stored inline before spilling to the heap.
const INLINE_PARAMS: usize = 4;

/// Path variables extracted from a matched template, in template order.
///
/// A `Params` can also be built by hand, which is how replayed tool calls
/// hand pre-extracted variables to the binder.
///
/// # Example
///
/// ```rust
/// use gapi_router::Params;
///
/// let mut params = Params::new();
/// params.push("id", "3");
///
/// assert_eq!(params.get("id"), Some("3"));
/// assert_eq!(params.get("name"), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Params {
    inner: SmallVec<[(String, String); INLINE_PARAMS]>,
}

impl Params {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a variable.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.inner.push((name.into(), value.into()));
    }

    /// Sets a variable, replacing an existing value with the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.inner.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.inner.push((name, value)),
        }
    }

    /// Value of a variable by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns `true` if the variable is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Returns `true` if there are no variables.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Number of variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Iterates `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Copies the variables into a map.
    #[must_use]
    pub fn to_map(&self) -> HashMap<String, String> {
        self.inner.iter().cloned().collect()
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.inner.truncate(len);
    }
}

impl<'a> IntoIterator for &'a Params {
    type Item = (&'a str, &'a str);
    type IntoIter = std::iter::Map<
        std::slice::Iter<'a, (String, String)>,
        fn(&'a (String, String)) -> (&'a str, &'a str),
    >;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for Params {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (name, value) in iter {
            params.insert(name, value);
        }
        params
    }
}

impl From<HashMap<String, String>> for Params {
    fn from(map: HashMap<String, String>) -> Self {
        map.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_get() {
        let mut params = Params::new();
        params.push("org", "acme");
        params.push("id", "3");

        assert_eq!(params.get("org"), Some("acme"));
        assert_eq!(params.get("id"), Some("3"));
        assert!(!params.contains("name"));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_insert_replaces() {
        let mut params = Params::new();
        params.insert("id", "1");
        params.insert("id", "2");
        assert_eq!(params.len(), 1);
        assert_eq!(params.get("id"), Some("2"));
    }

    #[test]
    fn test_iteration_order() {
        let mut params = Params::new();
        params.push("a", "1");
        params.push("b", "2");
        let pairs: Vec<_> = params.iter().collect();
        assert_eq!(pairs, vec![("a", "1"), ("b", "2")]);
    }

    #[test]
    fn test_map_conversions() {
        let mut map = HashMap::new();
        map.insert("id".to_string(), "3".to_string());
        let params = Params::from(map.clone());
        assert_eq!(params.get("id"), Some("3"));
        assert_eq!(params.to_map(), map);
    }

    #[test]
    fn test_spills_past_inline_capacity() {
        let params: Params = (0..10)
            .map(|i| (format!("key{i}"), format!("value{i}")))
            .collect();
        assert_eq!(params.len(), 10);
        assert_eq!(params.get("key7"), Some("value7"));
    }
}
