use serde::{Deserialize, Serialize};

use crate::xml::Element;
use crate::{LocaleSet, Stamp, ValueMap};

/// One content block inside a composer.
///
/// `module` and `id` name the pagelet type (the template that renders it);
/// they are not unique within a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pagelet {
    pub module: String,
    pub id: String,

    /// Language independent values
    #[serde(default)]
    pub properties: ValueMap,

    #[serde(default)]
    pub locale: LocaleSet,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<Stamp>,

    /// Repository sections this layer does not interpret (security,
    /// publishing), carried through unchanged.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extras: Vec<Element>,
}

impl Pagelet {
    /// Empty pagelet of the given type
    pub fn new(module: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            id: id.into(),
            properties: ValueMap::new(),
            locale: LocaleSet::new(),
            created: None,
            extras: Vec::new(),
        }
    }

    pub fn created_by(mut self, stamp: Stamp) -> Self {
        self.created = Some(stamp);
        self
    }

    pub fn property(&self, key: &str) -> Option<&[String]> {
        self.properties.get(key).map(Vec::as_slice)
    }

    pub fn property_at(&self, key: &str, index: usize) -> Option<&str> {
        self.property(key)?.get(index).map(String::as_str)
    }

    pub fn set_property(&mut self, key: impl Into<String>, values: Vec<String>) {
        self.properties.insert(key.into(), values);
    }

    /// Type key, `module/id`
    pub fn type_key(&self) -> String {
        format!("{}/{}", self.module, self.id)
    }
}
