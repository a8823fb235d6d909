use serde::{Deserialize, Serialize};

use crate::Pagelet;

/// A named content region of a page. Pagelet order is rendering order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Composer {
    pub id: String,

    #[serde(default)]
    pub pagelets: Vec<Pagelet>,
}

impl Composer {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            pagelets: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.pagelets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pagelets.is_empty()
    }

    pub fn pagelet(&self, index: usize) -> Option<&Pagelet> {
        self.pagelets.get(index)
    }
}
