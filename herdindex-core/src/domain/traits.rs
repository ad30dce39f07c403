//! Traits, components and trait weights
//!
//! A trait weight pairs a measured characteristic with the component of its
//! effect (direct or maternal) and a marginal economic value. Weights are
//! joined against breed-database columns through their key, e.g. `WW,D`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A measured characteristic of an animal
///
/// Codes the system does not know about are kept verbatim in `Other` so an
/// output file naming a new trait still parses; such a weight simply never
/// matches a database column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Trait {
    Usrea,
    Usimf,
    Usfat,
    Hcw,
    Rea,
    Fat,
    Ms,
    Bw,
    Ww,
    Yw,
    Fi,
    Mw,
    Stay,
    Hp,
    Cd,
    Other(String),
}

impl Trait {
    /// Short code used in keys and output files
    pub fn code(&self) -> &str {
        match self {
            Trait::Usrea => "USREA",
            Trait::Usimf => "USIMF",
            Trait::Usfat => "USFAT",
            Trait::Hcw => "HCW",
            Trait::Rea => "REA",
            Trait::Fat => "FAT",
            Trait::Ms => "MS",
            Trait::Bw => "BW",
            Trait::Ww => "WW",
            Trait::Yw => "YW",
            Trait::Fi => "FI",
            Trait::Mw => "MW",
            Trait::Stay => "STAY",
            Trait::Hp => "HP",
            Trait::Cd => "CD",
            Trait::Other(code) => code,
        }
    }
}

impl From<String> for Trait {
    fn from(code: String) -> Self {
        match code.as_str() {
            "USREA" => Trait::Usrea,
            "USIMF" => Trait::Usimf,
            "USFAT" => Trait::Usfat,
            "HCW" => Trait::Hcw,
            "REA" => Trait::Rea,
            "FAT" => Trait::Fat,
            "MS" => Trait::Ms,
            "BW" => Trait::Bw,
            "WW" => Trait::Ww,
            "YW" => Trait::Yw,
            "FI" => Trait::Fi,
            "MW" => Trait::Mw,
            "STAY" => Trait::Stay,
            "HP" => Trait::Hp,
            "CD" => Trait::Cd,
            _ => Trait::Other(code),
        }
    }
}

impl From<Trait> for String {
    fn from(value: Trait) -> Self {
        value.code().to_string()
    }
}

impl fmt::Display for Trait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Whether a trait effect is expressed by the animal itself or through its dam
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Component {
    #[serde(rename = "D", alias = "Direct")]
    Direct,
    #[serde(rename = "M", alias = "Maternal")]
    Maternal,
}

impl Component {
    /// One-letter code used in keys and output files
    pub fn code(&self) -> &'static str {
        match self {
            Component::Direct => "D",
            Component::Maternal => "M",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Component::Direct => f.write_str("Direct"),
            Component::Maternal => f.write_str("Maternal"),
        }
    }
}

/// One weighted trait of a job's output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraitWeight {
    #[serde(rename = "trait")]
    pub trait_id: Trait,
    pub component: Component,
    #[serde(rename = "mev")]
    pub marginal_economic_value: f64,
}

impl TraitWeight {
    pub fn new(trait_id: Trait, component: Component, marginal_economic_value: f64) -> Self {
        Self {
            trait_id,
            component,
            marginal_economic_value,
        }
    }

    /// Join key against database fields, e.g. `WW,D`
    pub fn key(&self) -> String {
        format!("{},{}", self.trait_id.code(), self.component.code())
    }

    /// Marginal economic value rounded for display
    pub fn display_mev(&self) -> String {
        format!("{:.3}", self.marginal_economic_value)
    }
}

/// Entry of the canonical trait table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraitInfo {
    /// Key used by jobs and the external computation
    pub key: &'static str,
    /// Label shown to users; some databases use it as the field key instead
    pub label: &'static str,
    pub description: &'static str,
}

const fn info(key: &'static str, label: &'static str, description: &'static str) -> TraitInfo {
    TraitInfo {
        key,
        label,
        description,
    }
}

/// Every trait the system understands, in display order
pub const TRAIT_TABLE: &[TraitInfo] = &[
    info("USREA,D", "USREA,D", "Ultrasounded rib-eye area"),
    info("USIMF,D", "USIMF,D", "Ultrasounded intramuscular fat"),
    info("USFAT,D", "USFAT,D", "Ultrasounded backfat thickness"),
    info("HCW,D", "HCW,D", "Hot carcass weight"),
    info("REA,D", "REA,D", "Carcass rib-eye area"),
    info("FAT,D", "FAT,D", "Carcass backfat thickness"),
    info("MS,D", "MS,D", "Carcass marbling score"),
    info("BW,D", "BW,D", "Birth weight"),
    info("WW,D", "WW,D", "Weaning weight - Direct"),
    info("WW,M", "WW,M", "Weaning weight - Maternal"),
    info("YW,D", "YW,D", "Yearling weight"),
    info("FI,D", "FI,D", "Daily dry matter intake"),
    info("MW,D", "MW,D", "Mature cow weight"),
    info(
        "STAY,D",
        "STAY,D",
        "Probability of a cow staying in the herd to age six given that she calved as a 2-year-old",
    ),
    info("HP,D", "HP,D", "Probability of conceiving as a 2-year-old heifer"),
    info("CD,D", "CE,D", "Calving ease - Direct"),
    info("CD,M", "CE,M", "Calving ease - Maternal"),
];

/// Trait keys in canonical order
pub fn trait_keys() -> impl Iterator<Item = &'static str> {
    TRAIT_TABLE.iter().map(|t| t.key)
}

/// Looks up a table entry by key or label
pub fn trait_info(key: &str) -> Option<&'static TraitInfo> {
    TRAIT_TABLE.iter().find(|t| t.key == key || t.label == key)
}

/// Strips whitespace from a user-supplied key so `WW, D` matches `WW,D`
pub fn normalize_key(key: &str) -> String {
    key.split_whitespace().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weight_key_and_display() {
        let weight = TraitWeight::new(Trait::Ww, Component::Maternal, 1.23456);
        assert_eq!(weight.key(), "WW,M");
        assert_eq!(weight.display_mev(), "1.235");
        assert_eq!(weight.component.to_string(), "Maternal");
    }

    #[test]
    fn test_weight_deserializes_output_entry() {
        let weight: TraitWeight =
            serde_json::from_str(r#"{"trait": "STAY", "component": "D", "mev": 2.5}"#).unwrap();
        assert_eq!(weight.trait_id, Trait::Stay);
        assert_eq!(weight.component, Component::Direct);
        assert_eq!(weight.key(), "STAY,D");
    }

    #[test]
    fn test_unknown_trait_is_kept() {
        let weight: TraitWeight =
            serde_json::from_str(r#"{"trait": "SC", "component": "D", "mev": 1.0}"#).unwrap();
        assert_eq!(weight.trait_id, Trait::Other("SC".to_string()));
        assert_eq!(weight.key(), "SC,D");

        let json = serde_json::to_value(&weight).unwrap();
        assert_eq!(json["trait"], "SC");
        assert_eq!(json["component"], "D");
    }

    #[test]
    fn test_unknown_component_is_rejected() {
        let result: Result<TraitWeight, _> =
            serde_json::from_str(r#"{"trait": "WW", "component": "X", "mev": 1.0}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_trait_table_lookup() {
        assert_eq!(trait_keys().count(), TRAIT_TABLE.len());
        assert_eq!(trait_keys().next(), Some("USREA,D"));
        assert_eq!(trait_info("CE,D").map(|t| t.key), Some("CD,D"));
        assert_eq!(trait_info("CD,M").map(|t| t.label), Some("CE,M"));
        assert!(trait_info("XX,D").is_none());
    }

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key(" WW, D "), "WW,D");
        assert_eq!(normalize_key("CD,M"), "CD,M");
    }
}
