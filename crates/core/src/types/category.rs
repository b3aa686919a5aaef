//! Product category bitmask encoding.
//!
//! A product's categories are stored as one integer with one bit per
//! category. The bit assignment follows the order of an ordered label list:
//! the label at position `i` owns the bit `2^i`.
//!
//! ```rust
//! # use online_store_core::CategoryCatalog;
//! let catalog = CategoryCatalog::default();
//! let mask = catalog.encode(["Clothing", "Sport"]);
//! assert_eq!(mask.bits(), 0b1010);
//! assert_eq!(catalog.decode(mask), vec!["Clothing", "Sport"]);
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest number of labels a mask can represent.
pub const MAX_CATEGORIES: usize = 31;

/// Labels in the order the store backend assigns their bits.
pub const DEFAULT_CATEGORIES: &[&str] = &[
    "Home",
    "Clothing",
    "Shoes",
    "Sport",
    "Appliances",
    "Technology",
    "Entertainment",
    "Books",
    "Cars",
];

/// Errors building a category catalog.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CategoryError {
    #[error("at most {MAX_CATEGORIES} categories are supported (got {0})")]
    TooMany(usize),
    #[error("category labels must not be empty")]
    EmptyLabel,
    #[error("duplicate category label: {0}")]
    Duplicate(String),
}

/// A set of categories encoded as a bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryMask(u32);

impl CategoryMask {
    /// The empty set.
    pub const EMPTY: Self = Self(0);

    /// Wrap raw bits.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Raw bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Whether every bit of `other` is set in `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    /// Whether any bit is shared with `other`.
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl std::ops::BitOr for CategoryMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

impl std::ops::BitOrAssign for CategoryMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// The ordered list of category labels and their bit assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryCatalog {
    labels: Vec<String>,
}

impl Default for CategoryCatalog {
    fn default() -> Self {
        Self {
            labels: DEFAULT_CATEGORIES.iter().map(ToString::to_string).collect(),
        }
    }
}

impl CategoryCatalog {
    /// Build a catalog from an ordered list of labels.
    ///
    /// # Errors
    ///
    /// Returns an error if there are more than [`MAX_CATEGORIES`] labels, or
    /// if a label is empty or repeated.
    pub fn new<I, S>(labels: I) -> Result<Self, CategoryError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut collected: Vec<String> = Vec::new();
        for label in labels {
            let label = label.into().trim().to_string();
            if label.is_empty() {
                return Err(CategoryError::EmptyLabel);
            }
            if collected.contains(&label) {
                return Err(CategoryError::Duplicate(label));
            }
            collected.push(label);
        }

        if collected.len() > MAX_CATEGORIES {
            return Err(CategoryError::TooMany(collected.len()));
        }

        Ok(Self { labels: collected })
    }

    /// Labels in bit order.
    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Mask value of a single label (`2^index`), if the label is known.
    #[must_use]
    pub fn code(&self, label: &str) -> Option<CategoryMask> {
        self.labels
            .iter()
            .position(|known| known == label)
            .map(|index| CategoryMask(1 << index))
    }

    /// Mask with every known category set.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)] // at most MAX_CATEGORIES bits
    pub fn all(&self) -> CategoryMask {
        CategoryMask(((1_u64 << self.labels.len()) - 1) as u32)
    }

    /// OR together the codes of the checked labels. Unknown labels are
    /// ignored.
    pub fn encode<I, S>(&self, checked: I) -> CategoryMask
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        checked
            .into_iter()
            .filter_map(|label| self.code(label.as_ref()))
            .fold(CategoryMask::EMPTY, |mask, code| mask | code)
    }

    /// Encode the checked labels of an edit form.
    ///
    /// When nothing is checked the product keeps its previous categories.
    pub fn encode_for_update<I, S>(&self, checked: I, previous: CategoryMask) -> CategoryMask
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mask = self.encode(checked);
        if mask.is_empty() { previous } else { mask }
    }

    /// Encode the checked labels of a search filter.
    ///
    /// When nothing is checked every category matches.
    pub fn filter_mask<I, S>(&self, checked: I) -> CategoryMask
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mask = self.encode(checked);
        if mask.is_empty() { self.all() } else { mask }
    }

    /// Labels whose bit is set in `mask`, in catalog order.
    #[must_use]
    pub fn decode(&self, mask: CategoryMask) -> Vec<&str> {
        self.labels
            .iter()
            .enumerate()
            .filter(|(index, _)| mask.bits() & (1 << index) != 0)
            .map(|(_, label)| label.as_str())
            .collect()
    }

    /// Labels of `mask` joined with a space, for display.
    #[must_use]
    pub fn display(&self, mask: CategoryMask) -> String {
        self.decode(mask).join(" ")
    }
}
