//! Parameter documents handed to the external computation
//!
//! Only the keys this system reads are modelled. Every other key is carried
//! through untouched so the computation receives exactly what was submitted.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::traits::normalize_key;

/// Genetic parameters of a job
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MasterParams {
    #[serde(rename = "Comment", default)]
    pub comment: String,
    #[serde(rename = "TargetDatabase", default)]
    pub target_database: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub burnin: Option<i64>,
    #[serde(
        rename = "planningHorizon",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub planning_horizon: Option<i64>,
    #[serde(rename = "Traits", default, skip_serializing_if = "Vec::is_empty")]
    pub traits: Vec<String>,
    #[serde(rename = "Components", default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Economic parameters of a job
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EcoParams {
    #[serde(rename = "saleEndpoint", default)]
    pub sale_endpoint: String,
    #[serde(rename = "indexTerminal", default)]
    pub index_terminal: bool,
    #[serde(rename = "indexComponents", default)]
    pub index_components: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EcoParams {
    /// True if `key` is one of the index components, ignoring whitespace
    pub fn has_component(&self, key: &str) -> bool {
        let key = normalize_key(key);
        self.index_components
            .iter()
            .any(|c| normalize_key(c) == key)
    }

    pub fn endpoint(&self) -> Option<Endpoint> {
        Endpoint::parse(&self.sale_endpoint)
    }
}

/// Point in the production chain at which calves are sold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Weaning,
    Background,
    FatCattle,
    SlaughterCattle,
}

impl Endpoint {
    pub const ALL: [Endpoint; 4] = [
        Endpoint::Weaning,
        Endpoint::Background,
        Endpoint::FatCattle,
        Endpoint::SlaughterCattle,
    ];

    /// Value stored in `saleEndpoint`
    pub fn internal(&self) -> &'static str {
        match self {
            Endpoint::Weaning => "weaning",
            Endpoint::Background => "background",
            Endpoint::FatCattle => "fatcattle",
            Endpoint::SlaughterCattle => "slaughtercattle",
        }
    }

    pub fn display(&self) -> &'static str {
        match self {
            Endpoint::Weaning => "weaning",
            Endpoint::Background => "background",
            Endpoint::FatCattle => "fed cattle (live)",
            Endpoint::SlaughterCattle => "fed cattle (carcass)",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.internal() == value)
    }
}
