use std::collections::HashMap;

/// Country code → display name lookup.
pub trait CountryNames {
    fn name(&self, code: &str) -> Option<String>;

    /// Display name, echoing `code` when the lookup has no entry.
    fn display_name(&self, code: &str) -> String {
        self.name(code).unwrap_or_else(|| code.to_owned())
    }
}

/// Lookup with no entries; every code is displayed as itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoNames;

impl CountryNames for NoNames {
    fn name(&self, _code: &str) -> Option<String> {
        None
    }
}

/// Table-backed lookup, case-insensitive on the code.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CountryNameTable {
    names: HashMap<String, String>,
}

impl CountryNameTable {
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for CountryNameTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            names: iter
                .into_iter()
                .map(|(code, name)| (code.as_ref().to_ascii_uppercase(), name.into()))
                .collect(),
        }
    }
}

impl CountryNames for CountryNameTable {
    fn name(&self, code: &str) -> Option<String> {
        self.names.get(&code.to_ascii_uppercase()).cloned()
    }
}
