// tsm-core/src/domain/schema/layout.rs

use crate::domain::dataset::DatasetType;
use crate::domain::measure::MeasureCode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// Where each semantic field lives in a sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    /// First row holding provider data (0-based, headerless grid).
    pub data_start_row: usize,
    pub provider_code: usize,
    pub provider_name: usize,
    pub measures: BTreeMap<MeasureCode, usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LayoutKey {
    pub dataset: DatasetType,
    pub year: i32,
}

impl LayoutKey {
    pub fn new(dataset: DatasetType, year: i32) -> Self {
        Self { dataset, year }
    }
}

/// A layout supplied from configuration (`layouts:` in tsm_project.yaml).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LayoutOverride {
    pub year: i32,
    pub dataset: DatasetType,
    #[serde(default = "default_data_start_row")]
    pub data_start_row: usize,
    #[serde(default = "default_code_column")]
    pub provider_code: usize,
    #[serde(default)]
    pub provider_name: usize,
    pub measures: BTreeMap<MeasureCode, usize>,
}

fn default_data_start_row() -> usize {
    3
}
fn default_code_column() -> usize {
    1
}

impl LayoutOverride {
    pub fn key(&self) -> LayoutKey {
        LayoutKey::new(self.dataset, self.year)
    }

    pub fn mapping(&self) -> ColumnMapping {
        ColumnMapping {
            data_start_row: self.data_start_row,
            provider_code: self.provider_code,
            provider_name: self.provider_name,
            measures: self.measures.clone(),
        }
    }
}

/// Hard-coded positional layouts, one per known (dataset, year).
#[derive(Debug, Clone)]
pub struct FallbackLayouts {
    layouts: BTreeMap<LayoutKey, ColumnMapping>,
}

const KNOWN_YEARS: [i32; 2] = [2024, 2025];

fn full_layout() -> ColumnMapping {
    // LCRA and COMBINED: TP01..TP12 in columns 22..33.
    let measures = MeasureCode::ALL
        .iter()
        .enumerate()
        .map(|(i, code)| (*code, 22 + i))
        .collect();
    ColumnMapping {
        data_start_row: 3,
        provider_code: 1,
        provider_name: 0,
        measures,
    }
}

fn secondary_layout() -> ColumnMapping {
    // LCHO: TP01 at 21, then TP05..TP12 in 22..29.
    let mut measures = BTreeMap::new();
    measures.insert(MeasureCode::Tp01, 21);
    for (i, code) in MeasureCode::ALL[4..].iter().enumerate() {
        measures.insert(*code, 22 + i);
    }
    ColumnMapping {
        data_start_row: 3,
        provider_code: 1,
        provider_name: 0,
        measures,
    }
}

impl FallbackLayouts {
    pub fn builtin() -> Self {
        let mut layouts = BTreeMap::new();
        for year in KNOWN_YEARS {
            layouts.insert(LayoutKey::new(DatasetType::Primary, year), full_layout());
            layouts.insert(LayoutKey::new(DatasetType::Combined, year), full_layout());
            layouts.insert(LayoutKey::new(DatasetType::Secondary, year), secondary_layout());
        }
        Self { layouts }
    }

    pub fn with_overrides(mut self, overrides: &[LayoutOverride]) -> Self {
        for o in overrides {
            self.layouts.insert(o.key(), o.mapping());
        }
        self
    }

    pub fn exact(&self, key: LayoutKey) -> Option<&ColumnMapping> {
        self.layouts.get(&key)
    }

    /// Always answers: exact year first, otherwise the closest known year of the same
    /// dataset (later year wins a tie), otherwise the built-in shape for the dataset.
    pub fn resolve(&self, key: LayoutKey) -> ColumnMapping {
        if let Some(mapping) = self.exact(key) {
            return mapping.clone();
        }

        let closest = self
            .layouts
            .iter()
            .filter(|(k, _)| k.dataset == key.dataset)
            .min_by_key(|(k, _)| ((k.year - key.year).abs(), -k.year));

        match closest {
            Some((k, mapping)) => {
                warn!(
                    dataset = %key.dataset,
                    year = key.year,
                    borrowed_year = k.year,
                    "No fallback layout registered for this year, borrowing the closest one"
                );
                mapping.clone()
            }
            None => match key.dataset {
                DatasetType::Secondary => secondary_layout(),
                DatasetType::Primary | DatasetType::Combined => full_layout(),
            },
        }
    }
}

impl Default for FallbackLayouts {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_covers_every_dataset_and_known_year() {
        let layouts = FallbackLayouts::builtin();
        for year in KNOWN_YEARS {
            for dataset in DatasetType::ALL {
                assert!(layouts.exact(LayoutKey::new(dataset, year)).is_some());
            }
        }
    }

    #[test]
    fn test_secondary_layout_has_only_applicable_measures() {
        let mapping = FallbackLayouts::builtin().resolve(LayoutKey::new(DatasetType::Secondary, 2024));
        assert_eq!(mapping.measures.len(), 9);
        assert_eq!(mapping.measures.get(&MeasureCode::Tp01), Some(&21));
        assert_eq!(mapping.measures.get(&MeasureCode::Tp05), Some(&22));
        assert_eq!(mapping.measures.get(&MeasureCode::Tp12), Some(&29));
        assert!(!mapping.measures.contains_key(&MeasureCode::Tp02));
    }

    #[test]
    fn test_unknown_year_borrows_closest() {
        let layouts = FallbackLayouts::builtin();
        let mapping = layouts.resolve(LayoutKey::new(DatasetType::Primary, 2031));
        assert_eq!(mapping, full_layout());
    }

    #[test]
    fn test_override_replaces_builtin() {
        let mut measures = BTreeMap::new();
        measures.insert(MeasureCode::Tp01, 5);
        let o = LayoutOverride {
            year: 2024,
            dataset: DatasetType::Primary,
            data_start_row: 1,
            provider_code: 0,
            provider_name: 2,
            measures,
        };
        let layouts = FallbackLayouts::builtin().with_overrides(&[o]);
        let mapping = layouts.resolve(LayoutKey::new(DatasetType::Primary, 2024));
        assert_eq!(mapping.data_start_row, 1);
        assert_eq!(mapping.measures.len(), 1);
    }
}
