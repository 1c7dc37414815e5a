//! Record categories an import or export can be restricted to

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Songs,
    Macros,
    Setlists,
    Global,
    Display,
    Jacks,
}

impl Category {
    /// Every category, in scan order
    pub fn all() -> &'static [Category] {
        &[
            Category::Songs,
            Category::Macros,
            Category::Setlists,
            Category::Global,
            Category::Display,
            Category::Jacks,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Songs => "songs",
            Category::Macros => "macros",
            Category::Setlists => "setlists",
            Category::Global => "global",
            Category::Display => "display",
            Category::Jacks => "jacks",
        }
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::all()
            .iter()
            .copied()
            .find(|c| c.as_str() == s.trim().to_ascii_lowercase())
            .ok_or_else(|| {
                let names: Vec<_> = Category::all().iter().map(Category::as_str).collect();
                format!("unknown category '{}' (expected one of: {})", s, names.join(", "))
            })
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Selected categories; empty selection means everything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategorySet(Vec<Category>);

impl CategorySet {
    pub fn all() -> Self {
        Self(Category::all().to_vec())
    }

    pub fn only(categories: impl IntoIterator<Item = Category>) -> Self {
        let mut list: Vec<_> = categories.into_iter().collect();
        list.sort();
        list.dedup();
        Self(list)
    }

    pub fn contains(&self, category: Category) -> bool {
        self.0.is_empty() || self.0.contains(&category)
    }
}
