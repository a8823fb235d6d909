//! Editable projection of a pagelet for one display language.

use serde::Serialize;
use weblounge_common::{LocaleVariant, Pagelet};

/// Deep copy of a pagelet plus the `current` and `original` locale
/// projections. Editing UIs mutate the view; the page only changes when the
/// view is turned back into a pagelet and inserted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageletView {
    pub pagelet: Pagelet,
    pub language: String,

    /// Variant in the editing language
    pub current: Option<LocaleVariant>,

    /// Variant flagged as original
    pub original: Option<LocaleVariant>,
}

impl PageletView {
    pub fn new(pagelet: &Pagelet, language: &str) -> Self {
        Self {
            pagelet: pagelet.clone(),
            language: language.to_string(),
            current: pagelet.locale.get(language).cloned(),
            original: pagelet.locale.original().cloned(),
        }
    }

    /// Value shown in a text control: the current language's value, or
    /// `None` when only the original language has one.
    pub fn text_value(&self, key: &str, index: usize) -> Option<&str> {
        self.current.as_ref()?.text_at(key, index)
    }

    /// Hint shown when the current language has no value yet
    pub fn text_placeholder(&self, key: &str, index: usize) -> Option<&str> {
        if self.text_value(key, index).is_some() {
            return None;
        }
        self.original.as_ref()?.text_at(key, index)
    }

    /// Fold the edited `current` variant back into the pagelet. The
    /// projections themselves are dropped.
    pub fn into_pagelet(self) -> Pagelet {
        let mut pagelet = self.pagelet;
        if let Some(current) = self.current {
            pagelet.locale.upsert(current);
        }
        pagelet
    }
}
