//! Database fields and the field cross-reference
//!
//! Every breed database names its CSV columns differently. The cross-reference
//! (xref) maps the canonical field keys used by jobs, e.g. `WW,D`, to the
//! literal header of the column holding that value in one database.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use super::traits::{TRAIT_TABLE, normalize_key, trait_keys};

/// Key of the record identity field every database must provide
pub const ID_FIELD: &str = "ID";

/// Identity fields listed first, in priority order
pub const MAIN_FIELDS: [&str; 3] = [ID_FIELD, "Name", "RegNo"];

/// Header of the score column appended to comparison exports
pub const SCORE_COLUMN: &str = "Index";

/// One column of interest in a database's CSV
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub key: String,
    pub header_name: String,
    pub comment: String,
    pub selected_by_default: bool,
    /// Position in the cross-reference file
    pub ordinal: usize,
}

/// Entry of a cross-reference file as written by hand
#[derive(Debug, Clone, Deserialize)]
pub struct XrefEntry {
    pub name: String,
    pub header: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub select: bool,
}

/// Field cross-reference of one database, keyed by field key
#[derive(Debug, Clone, Default)]
pub struct Xref {
    fields: HashMap<String, Field>,
}

impl Xref {
    /// Builds the xref from file entries; a repeated key replaces the earlier entry
    pub fn from_entries(entries: Vec<XrefEntry>) -> Self {
        let fields = entries
            .into_iter()
            .enumerate()
            .map(|(ordinal, entry)| {
                let field = Field {
                    key: entry.name.clone(),
                    header_name: entry.header,
                    comment: entry.comment,
                    selected_by_default: entry.select,
                    ordinal,
                };
                (entry.name, field)
            })
            .collect();

        Self { fields }
    }

    pub fn get(&self, key: &str) -> Option<&Field> {
        self.fields.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Literal CSV header for a field key
    pub fn header_for(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(|f| f.header_name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// True when the record identity field is mapped
    pub fn has_identity(&self) -> bool {
        self.contains(ID_FIELD)
    }

    /// All fields in display order
    ///
    /// Main identity fields come first in priority order, then trait fields in
    /// canonical trait order, then everything else sorted by key. The order
    /// only depends on which keys are present, so two databases with the same
    /// keys always list them identically.
    pub fn field_listing(&self) -> Vec<Field> {
        let mut listing = Vec::with_capacity(self.fields.len());
        let mut emitted = HashSet::with_capacity(self.fields.len());

        let fixed = MAIN_FIELDS
            .iter()
            .copied()
            .chain(trait_keys());
        for key in fixed {
            if let Some(field) = self.fields.get(key) {
                if emitted.insert(key) {
                    listing.push(field.clone());
                }
            }
        }

        let mut rest: Vec<&Field> = self
            .fields
            .values()
            .filter(|f| !emitted.contains(f.key.as_str()))
            .collect();
        rest.sort_by(|a, b| a.key.cmp(&b.key));
        listing.extend(rest.into_iter().cloned());

        listing
    }

    /// Field listing with every field in `keys` marked as selected
    pub fn field_listing_selecting(&self, keys: &HashSet<String>) -> Vec<Field> {
        let mut listing = self.field_listing();
        for field in &mut listing {
            if keys.contains(&field.key) {
                field.selected_by_default = true;
            }
        }
        listing
    }

    /// Trait keys available in this database and present in `requested`
    ///
    /// A trait matches on either its key or its label, on both sides.
    /// Requested keys are compared with whitespace removed. Results follow
    /// canonical trait order and always use the trait key.
    pub fn trait_keys<S: AsRef<str>>(&self, requested: &[S]) -> Vec<String> {
        let requested: HashSet<String> = requested
            .iter()
            .map(|k| normalize_key(k.as_ref()))
            .collect();

        TRAIT_TABLE
            .iter()
            .filter(|t| self.contains(t.key) || self.contains(t.label))
            .filter(|t| requested.contains(t.key) || requested.contains(t.label))
            .map(|t| t.key.to_string())
            .collect()
    }
}
