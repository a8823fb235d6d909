//! # Locale Store
//!
//! Per-language text of a pagelet. Each language has at most one
//! [`LocaleVariant`], and at most one variant of a pagelet is flagged as
//! the original language. [`LocaleSet`] owns the variants and keeps the
//! second rule intact whatever order variants are added in.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::Stamp;

/// Field or property name → values. Always multi-valued, even for scalars.
pub type ValueMap = BTreeMap<String, Vec<String>>;

/// Text content of a pagelet in one language
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocaleVariant {
    pub language: String,

    /// Marks the authoritative source language
    #[serde(default)]
    pub original: bool,

    #[serde(default)]
    pub text: ValueMap,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<Stamp>,
}

impl LocaleVariant {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            original: false,
            text: ValueMap::new(),
            modified: None,
        }
    }

    pub fn text(&self, key: &str) -> Option<&[String]> {
        self.text.get(key).map(Vec::as_slice)
    }

    /// The `index`-th value of a repeated field
    pub fn text_at(&self, key: &str, index: usize) -> Option<&str> {
        self.text(key)?.get(index).map(String::as_str)
    }
}

/// Ordered collection of locale variants. Deserialized input goes through
/// [`LocaleSet::upsert`] like any other insertion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<LocaleVariant>", into = "Vec<LocaleVariant>")]
pub struct LocaleSet {
    variants: Vec<LocaleVariant>,
}

impl LocaleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LocaleVariant> {
        self.variants.iter()
    }

    pub fn get(&self, language: &str) -> Option<&LocaleVariant> {
        self.variants.iter().find(|v| v.language == language)
    }

    fn get_mut(&mut self, language: &str) -> Option<&mut LocaleVariant> {
        self.variants.iter_mut().find(|v| v.language == language)
    }

    /// The variant flagged as original, if any
    pub fn original(&self) -> Option<&LocaleVariant> {
        self.variants.iter().find(|v| v.original)
    }

    pub fn has_original(&self) -> bool {
        self.original().is_some()
    }

    /// Add or replace the variant for `variant.language`.
    ///
    /// The original flag is dropped from the incoming variant when another
    /// language already holds it.
    pub fn upsert(&mut self, mut variant: LocaleVariant) {
        if variant.original
            && self
                .variants
                .iter()
                .any(|v| v.original && v.language != variant.language)
        {
            variant.original = false;
        }
        match self.get_mut(&variant.language) {
            Some(existing) => *existing = variant,
            None => self.variants.push(variant),
        }
    }

    /// Text of the variant for `language`, created on first use.
    ///
    /// A created variant claims the original flag only if no other variant
    /// has it yet. The flag itself is not reachable through the result.
    pub fn ensure(&mut self, language: &str, modified: Stamp) -> &mut ValueMap {
        let position = match self.variants.iter().position(|v| v.language == language) {
            Some(position) => position,
            None => {
                let mut variant = LocaleVariant::new(language);
                variant.original = !self.has_original();
                variant.modified = Some(modified);
                self.variants.push(variant);
                self.variants.len() - 1
            }
        };
        &mut self.variants[position].text
    }
}

impl<'a> IntoIterator for &'a LocaleSet {
    type Item = &'a LocaleVariant;
    type IntoIter = std::slice::Iter<'a, LocaleVariant>;

    fn into_iter(self) -> Self::IntoIter {
        self.variants.iter()
    }
}

impl From<Vec<LocaleVariant>> for LocaleSet {
    fn from(variants: Vec<LocaleVariant>) -> Self {
        variants.into_iter().collect()
    }
}

impl From<LocaleSet> for Vec<LocaleVariant> {
    fn from(set: LocaleSet) -> Self {
        set.variants
    }
}

impl FromIterator<LocaleVariant> for LocaleSet {
    fn from_iter<I: IntoIterator<Item = LocaleVariant>>(iter: I) -> Self {
        let mut set = LocaleSet::new();
        for variant in iter {
            set.upsert(variant);
        }
        set
    }
}
