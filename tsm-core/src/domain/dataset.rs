// tsm-core/src/domain/dataset.rs

use crate::domain::error::DomainError;
use crate::domain::measure::MeasureCode;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::fmt;
use std::str::FromStr;

/// Peer group a provider's scores belong to. Scores are only comparable within one group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DatasetType {
    /// Low cost rental accommodation (published as "LCRA").
    Primary,
    /// Low cost home ownership (published as "LCHO"). No repairs measures.
    Secondary,
    /// Landlords reporting one combined return. Lowest priority source.
    Combined,
}

/// Measures structurally absent from the secondary sheet.
const SECONDARY_EXCLUDED: [MeasureCode; 3] = [MeasureCode::Tp02, MeasureCode::Tp03, MeasureCode::Tp04];

impl DatasetType {
    pub const ALL: [DatasetType; 3] = [Self::Primary, Self::Secondary, Self::Combined];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "LCRA",
            Self::Secondary => "LCHO",
            Self::Combined => "COMBINED",
        }
    }

    pub fn applies(self, code: MeasureCode) -> bool {
        match self {
            Self::Secondary => !SECONDARY_EXCLUDED.contains(&code),
            Self::Primary | Self::Combined => true,
        }
    }

    pub fn applicable_measures(self) -> Vec<MeasureCode> {
        MeasureCode::ALL
            .into_iter()
            .filter(|m| self.applies(*m))
            .collect()
    }

    /// Lookup order used when a caller does not say which peer group to read.
    pub fn preference(self) -> u8 {
        match self {
            Self::Primary => 0,
            Self::Secondary => 1,
            Self::Combined => 2,
        }
    }
}

impl FromStr for DatasetType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LCRA" | "PRIMARY" => Ok(Self::Primary),
            "LCHO" | "SECONDARY" => Ok(Self::Secondary),
            "COMBINED" => Ok(Self::Combined),
            _ => Err(DomainError::UnknownDataset(s.to_string())),
        }
    }
}

impl fmt::Display for DatasetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for DatasetType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DatasetType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        DatasetType::from_str(&s).map_err(de::Error::custom)
    }
}
