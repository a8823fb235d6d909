//! # Input Converter
//!
//! Moves values between pagelet editor form fields and a [`PageletView`].
//!
//! Field names address the value they edit: `element:<key>` is text in the
//! editing language, `property:<key>` a language independent property.
//! Names are parsed once when the form is bound; a field without a valid
//! name is a template error.
//!
//! Every value written back is a list of strings:
//!
//! | field | stored |
//! |---|---|
//! | text, hidden, textarea | one entry per field of that name, in form order |
//! | checkbox | `["true"]` or `["false"]` |
//! | radio | `[value]` of the checked option |
//! | select (one or multiple) | selected option values |

use std::str::FromStr;

use weblounge_common::Stamp;

use crate::errors::FieldError;
use crate::view::PageletView;

/// Value a field edits
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldTarget {
    Element(String),
    Property(String),
}

impl FieldTarget {
    pub fn key(&self) -> &str {
        match self {
            FieldTarget::Element(key) | FieldTarget::Property(key) => key,
        }
    }

    /// Parse an optional `name` attribute
    pub fn from_name(name: Option<&str>) -> Result<Self, FieldError> {
        name.ok_or(FieldError::MissingName)?.parse()
    }
}

impl FromStr for FieldTarget {
    type Err = FieldError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let malformed = || FieldError::MalformedName(name.to_string());
        let (scope, key) = name.split_once(':').ok_or_else(malformed)?;
        if key.is_empty() || key.contains(':') {
            return Err(malformed());
        }
        match scope {
            "element" => Ok(FieldTarget::Element(key.to_string())),
            "property" => Ok(FieldTarget::Property(key.to_string())),
            _ => Err(malformed()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Hidden,
    Textarea,
    Checkbox,
    Radio,
    SelectOne,
    SelectMultiple,
    Button,
}

impl FieldKind {
    /// Free text controls, repeated fields accumulate
    pub fn is_text(&self) -> bool {
        matches!(self, FieldKind::Text | FieldKind::Hidden | FieldKind::Textarea)
    }
}

/// A control as found in the editor template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: Option<String>,
    pub kind: FieldKind,

    /// The control's own `value`, meaningful for radio options
    pub value: Option<String>,
}

impl FieldDescriptor {
    pub fn new(name: &str, kind: FieldKind) -> Self {
        Self {
            name: Some(name.to_string()),
            kind,
            value: None,
        }
    }

    pub fn with_value(mut self, value: &str) -> Self {
        self.value = Some(value.to_string());
        self
    }
}

/// Initial state of one control
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldBinding {
    pub target: FieldTarget,
    pub kind: FieldKind,

    /// Position among the fields sharing this name
    pub occurrence: usize,

    pub value: Option<String>,

    /// Original language text shown as a hint when `value` is empty
    pub placeholder: Option<String>,

    pub checked: bool,
    pub selected: Vec<String>,
}

/// Compute the initial state of each control from `view`. Buttons are
/// skipped.
pub fn bind_fields(
    view: &PageletView,
    fields: &[FieldDescriptor],
) -> Result<Vec<FieldBinding>, FieldError> {
    let mut bindings = Vec::with_capacity(fields.len());
    let mut seen: Vec<(String, usize)> = Vec::new();

    for field in fields {
        if field.kind == FieldKind::Button {
            continue;
        }
        let name = field.name.as_deref();
        let target = FieldTarget::from_name(name)?;
        let occurrence = next_occurrence(&mut seen, name.unwrap_or_default());

        let stored = stored_values(view, &target);
        let mut binding = FieldBinding {
            target: target.clone(),
            kind: field.kind,
            occurrence,
            value: None,
            placeholder: None,
            checked: false,
            selected: Vec::new(),
        };

        match field.kind {
            kind if kind.is_text() => {
                binding.value = stored.and_then(|v| v.get(occurrence)).cloned();
                if binding.value.is_none() {
                    if let FieldTarget::Element(key) = &target {
                        binding.placeholder = view
                            .text_placeholder(key, occurrence)
                            .map(str::to_string);
                    }
                }
            }
            FieldKind::Checkbox => {
                binding.checked = stored.and_then(|v| v.first()).is_some_and(|v| v == "true");
            }
            FieldKind::Radio => {
                binding.value = field.value.clone();
                binding.checked = match (stored.and_then(|v| v.first()), &field.value) {
                    (Some(stored), Some(own)) => stored == own,
                    _ => false,
                };
            }
            FieldKind::SelectOne | FieldKind::SelectMultiple => {
                binding.selected = stored.cloned().unwrap_or_default();
            }
            _ => {}
        }
        bindings.push(binding);
    }

    Ok(bindings)
}

fn next_occurrence(seen: &mut Vec<(String, usize)>, name: &str) -> usize {
    match seen.iter_mut().find(|(n, _)| n == name) {
        Some((_, count)) => {
            *count += 1;
            *count
        }
        None => {
            seen.push((name.to_string(), 0));
            0
        }
    }
}

fn stored_values<'a>(view: &'a PageletView, target: &FieldTarget) -> Option<&'a Vec<String>> {
    match target {
        FieldTarget::Element(key) => view.current.as_ref()?.text.get(key),
        FieldTarget::Property(key) => view.pagelet.properties.get(key),
    }
}

/// A control's state when the form is submitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedField {
    pub name: Option<String>,
    pub kind: FieldKind,
    pub value: String,
    pub checked: bool,
    pub selected: Vec<String>,
}

impl SubmittedField {
    pub fn text(name: &str, value: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            kind: FieldKind::Text,
            value: value.to_string(),
            checked: false,
            selected: Vec::new(),
        }
    }

    pub fn checkbox(name: &str, checked: bool) -> Self {
        Self {
            kind: FieldKind::Checkbox,
            checked,
            ..Self::text(name, "")
        }
    }

    pub fn radio(name: &str, value: &str, checked: bool) -> Self {
        Self {
            kind: FieldKind::Radio,
            checked,
            ..Self::text(name, value)
        }
    }

    pub fn select(name: &str, multiple: bool, selected: &[&str]) -> Self {
        Self {
            kind: if multiple {
                FieldKind::SelectMultiple
            } else {
                FieldKind::SelectOne
            },
            selected: selected.iter().map(|s| s.to_string()).collect(),
            ..Self::text(name, "")
        }
    }

    pub fn with_kind(mut self, kind: FieldKind) -> Self {
        self.kind = kind;
        self
    }
}

/// Write a submitted form into `view`.
///
/// The editing language's variant is created if missing, otherwise its
/// text is cleared and `modified` restamped. Properties are rebuilt from
/// the form in both cases.
pub fn apply_form(
    view: &mut PageletView,
    fields: &[SubmittedField],
    stamp: Stamp,
) -> Result<(), FieldError> {
    let targets = fields
        .iter()
        .filter(|f| f.kind != FieldKind::Button)
        .map(|f| Ok((FieldTarget::from_name(f.name.as_deref())?, f)))
        .collect::<Result<Vec<_>, FieldError>>()?;

    let has_original = view.original.is_some() || view.pagelet.locale.has_original();
    let current = match view.current.as_mut() {
        Some(current) => {
            current.text.clear();
            current.modified = Some(stamp);
            current
        }
        None => {
            let mut created = weblounge_common::LocaleVariant::new(view.language.as_str());
            created.original = !has_original;
            created.modified = Some(stamp);
            view.current.insert(created)
        }
    };
    view.pagelet.properties.clear();

    for (target, field) in targets {
        let map = match &target {
            FieldTarget::Element(_) => &mut current.text,
            FieldTarget::Property(_) => &mut view.pagelet.properties,
        };
        let key = target.key().to_string();
        match field.kind {
            FieldKind::SelectOne | FieldKind::SelectMultiple => {
                map.insert(key, field.selected.clone());
            }
            FieldKind::Checkbox => {
                let value = if field.checked { "true" } else { "false" };
                map.insert(key, vec![value.to_string()]);
            }
            FieldKind::Radio => {
                if field.checked {
                    map.insert(key, vec![field.value.clone()]);
                }
            }
            _ => map.entry(key).or_default().push(field.value.clone()),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use weblounge_common::{LocaleVariant, Pagelet, User};

    fn stamp() -> Stamp {
        Stamp::now(User::new("amelie"))
    }

    fn view(language: &str) -> PageletView {
        let mut pagelet = Pagelet::new("text", "title");
        let mut de = LocaleVariant::new("de");
        de.original = true;
        de.text.insert("title".into(), vec!["Hallo".into()]);
        de.text.insert("line".into(), vec!["eins".into(), "zwei".into()]);
        pagelet.locale.upsert(de);
        pagelet.set_property("level", vec!["2".into()]);
        pagelet.set_property("boxed", vec!["true".into()]);
        pagelet.set_property("align", vec!["left".into()]);
        pagelet.set_property("tags", vec!["a".into(), "c".into()]);
        PageletView::new(&pagelet, language)
    }

    #[test]
    fn test_parse_names() {
        assert_eq!(
            "element:title".parse::<FieldTarget>().unwrap(),
            FieldTarget::Element("title".into())
        );
        assert_eq!(
            "property:level".parse::<FieldTarget>().unwrap(),
            FieldTarget::Property("level".into())
        );
        for bad in ["title", "element:", "meta:title", "element:a:b"] {
            assert_eq!(
                bad.parse::<FieldTarget>().unwrap_err(),
                FieldError::MalformedName(bad.into())
            );
        }
        assert_eq!(FieldTarget::from_name(None).unwrap_err(), FieldError::MissingName);
    }

    #[test]
    fn test_bind_uses_original_only_as_placeholder() {
        let fields = [
            FieldDescriptor::new("element:title", FieldKind::Text),
            FieldDescriptor::new("property:level", FieldKind::Text),
            FieldDescriptor::new("property:missing", FieldKind::Text),
        ];
        let bindings = bind_fields(&view("en"), &fields).unwrap();

        assert_eq!(bindings[0].value, None);
        assert_eq!(bindings[0].placeholder.as_deref(), Some("Hallo"));
        assert_eq!(bindings[1].value.as_deref(), Some("2"));
        assert_eq!(bindings[2].placeholder, None);
    }

    #[test]
    fn test_bind_repeated_and_choice_fields() {
        let fields = [
            FieldDescriptor::new("element:line", FieldKind::Text),
            FieldDescriptor::new("element:line", FieldKind::Textarea),
            FieldDescriptor::new("property:boxed", FieldKind::Checkbox),
            FieldDescriptor::new("property:align", FieldKind::Radio).with_value("left"),
            FieldDescriptor::new("property:align", FieldKind::Radio).with_value("right"),
            FieldDescriptor::new("property:tags", FieldKind::SelectMultiple),
            FieldDescriptor {
                name: None,
                kind: FieldKind::Button,
                value: None,
            },
        ];
        let bindings = bind_fields(&view("de"), &fields).unwrap();

        assert_eq!(bindings.len(), 6);
        assert_eq!(bindings[0].value.as_deref(), Some("eins"));
        assert_eq!(bindings[1].occurrence, 1);
        assert_eq!(bindings[1].value.as_deref(), Some("zwei"));
        assert!(bindings[2].checked);
        assert!(bindings[3].checked);
        assert!(!bindings[4].checked);
        assert_eq!(bindings[5].selected, vec!["a", "c"]);
    }

    #[test]
    fn test_bind_rejects_unnamed_field() {
        let fields = [FieldDescriptor {
            name: None,
            kind: FieldKind::Text,
            value: None,
        }];
        assert_eq!(
            bind_fields(&view("de"), &fields).unwrap_err(),
            FieldError::MissingName
        );
    }

    #[test]
    fn test_every_kind_is_written_as_list() {
        let mut view = view("de");
        let fields = [
            SubmittedField::text("element:title", "Guten Tag"),
            SubmittedField::text("element:body", "Text").with_kind(FieldKind::Textarea),
            SubmittedField::checkbox("property:boxed", false),
            SubmittedField::radio("property:align", "left", false),
            SubmittedField::radio("property:align", "right", true),
            SubmittedField::select("property:level", false, &["3"]),
            SubmittedField::select("property:tags", true, &["a", "b"]),
        ];
        apply_form(&mut view, &fields, stamp()).unwrap();

        let current = view.current.as_ref().unwrap();
        assert_eq!(current.text["title"], vec!["Guten Tag"]);
        assert_eq!(current.text["body"], vec!["Text"]);
        assert!(!current.text.contains_key("line"));

        let properties = &view.pagelet.properties;
        assert_eq!(properties["boxed"], vec!["false"]);
        assert_eq!(properties["align"], vec!["right"]);
        assert_eq!(properties["level"], vec!["3"]);
        assert_eq!(properties["tags"], vec!["a", "b"]);
    }

    #[test]
    fn test_repeated_text_fields_accumulate() {
        let mut view = view("de");
        let fields = [
            SubmittedField::text("element:line", "one"),
            SubmittedField::text("element:line", "two"),
            SubmittedField::text("element:line", "three"),
        ];
        apply_form(&mut view, &fields, stamp()).unwrap();
        assert_eq!(
            view.current.unwrap().text["line"],
            vec!["one", "two", "three"]
        );
    }

    #[test]
    fn test_new_language_is_not_original() {
        let mut view = view("en");
        apply_form(
            &mut view,
            &[SubmittedField::text("element:title", "Hello")],
            stamp(),
        )
        .unwrap();

        let current = view.current.as_ref().unwrap();
        assert_eq!(current.language, "en");
        assert!(!current.original);
        assert_eq!(current.modified.as_ref().unwrap().user.id, "amelie");

        let pagelet = view.into_pagelet();
        assert_eq!(pagelet.locale.len(), 2);
        assert_eq!(pagelet.locale.original().unwrap().language, "de");
    }

    #[test]
    fn test_first_language_becomes_original() {
        let mut view = PageletView::new(&Pagelet::new("text", "title"), "fr");
        apply_form(
            &mut view,
            &[SubmittedField::text("element:title", "Bonjour")],
            stamp(),
        )
        .unwrap();
        assert!(view.current.as_ref().unwrap().original);
    }

    #[test]
    fn test_malformed_submission_changes_nothing() {
        let mut view = view("de");
        let before = view.clone();
        let err = apply_form(
            &mut view,
            &[
                SubmittedField::text("element:title", "x"),
                SubmittedField::text("title", "y"),
            ],
            stamp(),
        )
        .unwrap_err();
        assert_eq!(err, FieldError::MalformedName("title".into()));
        assert_eq!(view, before);
    }
}
