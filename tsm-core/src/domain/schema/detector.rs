// tsm-core/src/domain/schema/detector.rs

use crate::domain::error::DomainError;
use crate::domain::measure::{CATALOG, MeasureCode};
use crate::domain::schema::layout::{ColumnMapping, FallbackLayouts, LayoutKey};
use crate::ports::workbook::SheetGrid;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

pub const DEFAULT_SCAN_ROWS: usize = 15;
pub const DEFAULT_MIN_MEASURE_RATIO: f64 = 0.5;

/// A proposed mapping and how much of the expected measure set it covers.
#[derive(Debug, Clone, PartialEq)]
pub struct MappingCandidate {
    pub mapping: ColumnMapping,
    pub header_row: Option<usize>,
    pub resolved_measures: usize,
    pub expected_measures: usize,
    /// Roles taken from the positional layout because no header matched them.
    pub inferred_roles: Vec<String>,
}

impl MappingCandidate {
    pub fn confidence(&self) -> f64 {
        if self.expected_measures == 0 {
            return 0.0;
        }
        self.resolved_measures as f64 / self.expected_measures as f64
    }
}

pub trait ColumnMappingStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn propose(
        &self,
        grid: &SheetGrid,
        key: LayoutKey,
        expected: &[MeasureCode],
    ) -> Option<MappingCandidate>;
}

// --- PATTERN STRATEGY ---

/// Compiled once; matched against every header cell.
struct MeasurePatterns {
    code: MeasureCode,
    /// Priority tiers: parenthesized code, bare code token, description fragments.
    tiers: [Vec<Regex>; 3],
}

pub struct PatternStrategy {
    scan_rows: usize,
    layouts: FallbackLayouts,
    measures: Vec<MeasurePatterns>,
    provider_code: Regex,
    provider_name: Regex,
    response_count: Regex,
}

fn compile(pattern: &str) -> Result<Regex, DomainError> {
    Regex::new(pattern).map_err(|e| DomainError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

impl PatternStrategy {
    pub fn new(scan_rows: usize, layouts: FallbackLayouts) -> Result<Self, DomainError> {
        let mut measures = Vec::with_capacity(CATALOG.len());
        for m in &CATALOG {
            let n = m.code.number();
            // TP1 and TP01 both accepted; the trailing \b keeps TP1 from matching TP10.
            let digits = if n < 10 { format!("0?{}", n) } else { n.to_string() };
            let paren = compile(&format!(r"(?i)\(\s*TP\s*{}\s*\)", digits))?;
            let token = compile(&format!(r"(?i)\bTP\s*{}\b", digits))?;
            let fragments = m
                .header_fragments
                .iter()
                .map(|f| compile(&format!("(?i){}", f)))
                .collect::<Result<Vec<_>, _>>()?;
            measures.push(MeasurePatterns {
                code: m.code,
                tiers: [vec![paren], vec![token], fragments],
            });
        }

        Ok(Self {
            scan_rows,
            layouts,
            measures,
            provider_code: compile(
                r"(?i)\b(landlord|provider|organi[sz]ation|rp)\s+code\b|^\s*code\s*$",
            )?,
            provider_name: compile(
                r"(?i)\b(landlord|provider|organi[sz]ation|rp)\s+name\b|^\s*name\s*$",
            )?,
            response_count: compile(
                r"(?i)(number of|\bno\.? of\b|\bcount\b|\bbase\b|sample size|total responses)",
            )?,
        })
    }

    fn patterns_for(&self, code: MeasureCode) -> Option<&MeasurePatterns> {
        self.measures.iter().find(|m| m.code == code)
    }

    fn matches_any(&self, code: MeasureCode, header: &str) -> bool {
        self.patterns_for(code)
            .map(|p| p.tiers.iter().flatten().any(|re| re.is_match(header)))
            .unwrap_or(false)
    }

    fn is_count_column(&self, header: &str) -> bool {
        self.response_count.is_match(header)
    }

    /// Header row = first scanned row with the primary measure plus at least one other.
    pub fn find_header_row(&self, grid: &SheetGrid) -> Option<usize> {
        let limit = self.scan_rows.min(grid.height());
        (0..limit).find(|&r| {
            let headers: Vec<String> = grid
                .row(r)
                .iter()
                .filter_map(|c| c.as_text())
                .filter(|h| !self.is_count_column(h))
                .collect();
            let has_primary = headers
                .iter()
                .any(|h| self.matches_any(MeasureCode::PRIMARY, h));
            let has_other = MeasureCode::ALL
                .iter()
                .filter(|c| !c.is_primary())
                .any(|c| headers.iter().any(|h| self.matches_any(*c, h)));
            has_primary && has_other
        })
    }
}

impl ColumnMappingStrategy for PatternStrategy {
    fn name(&self) -> &'static str {
        "pattern"
    }

    fn propose(
        &self,
        grid: &SheetGrid,
        key: LayoutKey,
        expected: &[MeasureCode],
    ) -> Option<MappingCandidate> {
        let header_row = self.find_header_row(grid)?;
        let headers: Vec<(usize, String)> = grid
            .row(header_row)
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.as_text().map(|t| (i, t)))
            .collect();

        let mut claimed: HashSet<usize> = HashSet::new();

        let provider_code = headers
            .iter()
            .find(|(_, h)| self.provider_code.is_match(h))
            .map(|(i, _)| *i)?;
        claimed.insert(provider_code);

        let mut inferred_roles = Vec::new();
        let provider_name = match headers
            .iter()
            .find(|(i, h)| !claimed.contains(i) && self.provider_name.is_match(h))
        {
            Some((i, _)) => *i,
            None => {
                let positional = self.layouts.resolve(key).provider_name;
                if claimed.contains(&positional) {
                    return None;
                }
                warn!(
                    dataset = %key.dataset,
                    year = key.year,
                    column = positional,
                    "No provider name header, using the known layout position"
                );
                inferred_roles.push("provider_name".to_string());
                positional
            }
        };
        claimed.insert(provider_name);

        // Resolve tier by tier so that parenthesized codes win over bare tokens and free text.
        let mut measures: BTreeMap<MeasureCode, usize> = BTreeMap::new();
        for tier in 0..3 {
            for code in expected {
                if measures.contains_key(code) {
                    continue;
                }
                let Some(patterns) = self.patterns_for(*code) else {
                    continue;
                };
                let hit = headers.iter().find(|(i, h)| {
                    !claimed.contains(i)
                        && !self.is_count_column(h)
                        && patterns.tiers[tier].iter().any(|re| re.is_match(h))
                });
                if let Some((col, _)) = hit {
                    measures.insert(*code, *col);
                    claimed.insert(*col);
                }
            }
        }

        debug!(
            header_row,
            provider_code,
            provider_name,
            resolved = measures.len(),
            "Pattern strategy proposal"
        );

        Some(MappingCandidate {
            resolved_measures: measures.len(),
            expected_measures: expected.len(),
            mapping: ColumnMapping {
                data_start_row: header_row + 1,
                provider_code,
                provider_name,
                measures,
            },
            header_row: Some(header_row),
            inferred_roles,
        })
    }
}

// --- FALLBACK STRATEGY ---

pub struct FallbackStrategy {
    layouts: FallbackLayouts,
}

impl FallbackStrategy {
    pub fn new(layouts: FallbackLayouts) -> Self {
        Self { layouts }
    }

    pub fn layout(&self, key: LayoutKey) -> ColumnMapping {
        self.layouts.resolve(key)
    }
}

impl ColumnMappingStrategy for FallbackStrategy {
    fn name(&self) -> &'static str {
        "fallback"
    }

    fn propose(
        &self,
        _grid: &SheetGrid,
        key: LayoutKey,
        expected: &[MeasureCode],
    ) -> Option<MappingCandidate> {
        let mut mapping = self.layout(key);
        mapping.measures.retain(|code, _| expected.contains(code));
        Some(MappingCandidate {
            resolved_measures: mapping.measures.len(),
            expected_measures: expected.len(),
            mapping,
            header_row: None,
            inferred_roles: Vec::new(),
        })
    }
}

// --- DETECTOR ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingSource {
    Detected,
    Fallback,
}

/// A detected column that does not sit where the hard-coded layout expects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDrift {
    pub role: String,
    pub detected: usize,
    pub expected: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub mapping: ColumnMapping,
    pub source: MappingSource,
    pub confidence: f64,
    pub drift: Vec<SchemaDrift>,
}

pub struct SchemaDetector {
    pattern: PatternStrategy,
    fallback: FallbackStrategy,
    min_measure_ratio: f64,
}

impl SchemaDetector {
    pub fn new(
        scan_rows: usize,
        min_measure_ratio: f64,
        layouts: FallbackLayouts,
    ) -> Result<Self, DomainError> {
        Ok(Self {
            pattern: PatternStrategy::new(scan_rows, layouts.clone())?,
            fallback: FallbackStrategy::new(layouts),
            min_measure_ratio,
        })
    }

    /// Never fails: a weak or absent detection degrades to the fallback layout.
    pub fn detect(&self, grid: &SheetGrid, key: LayoutKey) -> Detection {
        let expected = key.dataset.applicable_measures();

        if let Some(candidate) = self.pattern.propose(grid, key, &expected)
            && candidate.confidence() >= self.min_measure_ratio
        {
            let reference = self.fallback.layout(key);
            let drift = compare(&candidate.mapping, &reference);
            for d in &drift {
                warn!(
                    dataset = %key.dataset,
                    year = key.year,
                    role = %d.role,
                    detected = d.detected,
                    expected = ?d.expected,
                    "⚠️  Schema drift: column moved relative to the known layout"
                );
            }
            return Detection {
                confidence: candidate.confidence(),
                mapping: candidate.mapping,
                source: MappingSource::Detected,
                drift,
            };
        }

        warn!(
            dataset = %key.dataset,
            year = key.year,
            strategy = self.fallback.name(),
            "Header detection inconclusive, using hard-coded column layout"
        );
        // The fallback strategy always proposes.
        let candidate = self
            .fallback
            .propose(grid, key, &expected)
            .unwrap_or_else(|| MappingCandidate {
                mapping: self.fallback.layout(key),
                header_row: None,
                resolved_measures: 0,
                expected_measures: expected.len(),
                inferred_roles: Vec::new(),
            });
        Detection {
            confidence: candidate.confidence(),
            mapping: candidate.mapping,
            source: MappingSource::Fallback,
            drift: Vec::new(),
        }
    }
}

fn compare(detected: &ColumnMapping, reference: &ColumnMapping) -> Vec<SchemaDrift> {
    let mut drift = Vec::new();
    let mut check = |role: String, got: usize, want: Option<usize>| {
        if want != Some(got) {
            drift.push(SchemaDrift {
                role,
                detected: got,
                expected: want,
            });
        }
    };
    check(
        "data_start_row".to_string(),
        detected.data_start_row,
        Some(reference.data_start_row),
    );
    check(
        "provider_code".to_string(),
        detected.provider_code,
        Some(reference.provider_code),
    );
    check(
        "provider_name".to_string(),
        detected.provider_name,
        Some(reference.provider_name),
    );
    for (code, col) in &detected.measures {
        check(code.to_string(), *col, reference.measures.get(code).copied());
    }
    drift
}
