// tsm-core/src/domain/measure.rs

use crate::domain::error::DomainError;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::fmt;
use std::str::FromStr;

/// One of the twelve tenant perception measures.
/// TP01 (overall satisfaction) is the primary measure every other one is correlated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MeasureCode {
    Tp01,
    Tp02,
    Tp03,
    Tp04,
    Tp05,
    Tp06,
    Tp07,
    Tp08,
    Tp09,
    Tp10,
    Tp11,
    Tp12,
}

pub const MEASURE_COUNT: usize = 12;

/// Static registry entry.
#[derive(Debug, Clone, Copy)]
pub struct Measure {
    pub code: MeasureCode,
    pub description: &'static str,
    /// Free-text header fragments (regex, case-insensitive) used by schema detection.
    pub header_fragments: &'static [&'static str],
}

pub const CATALOG: [Measure; MEASURE_COUNT] = [
    Measure {
        code: MeasureCode::Tp01,
        description: "Overall satisfaction",
        header_fragments: &[r"overall satisfaction", r"satisfied overall"],
    },
    Measure {
        code: MeasureCode::Tp02,
        description: "Satisfaction with repairs",
        header_fragments: &[r"satisfaction with repairs", r"with (the )?repairs service"],
    },
    Measure {
        code: MeasureCode::Tp03,
        description: "Satisfaction with time taken to complete most recent repair",
        header_fragments: &[r"time taken to complete"],
    },
    Measure {
        code: MeasureCode::Tp04,
        description: "Satisfaction that the home is well maintained",
        header_fragments: &[r"home is well[- ]?maintained"],
    },
    Measure {
        code: MeasureCode::Tp05,
        description: "Satisfaction that the home is safe",
        header_fragments: &[r"home is safe"],
    },
    Measure {
        code: MeasureCode::Tp06,
        description: "Satisfaction that the landlord listens to tenant views and acts upon them",
        header_fragments: &[r"listens to"],
    },
    Measure {
        code: MeasureCode::Tp07,
        description: "Satisfaction that the landlord keeps tenants informed about things that matter to them",
        header_fragments: &[r"keeps (tenants )?informed", r"informed about things"],
    },
    Measure {
        code: MeasureCode::Tp08,
        description: "Agreement that the landlord treats tenants fairly and with respect",
        header_fragments: &[r"treats (tenants )?fairly", r"fairly and with respect"],
    },
    Measure {
        code: MeasureCode::Tp09,
        description: "Satisfaction with the landlord's approach to handling complaints",
        header_fragments: &[r"handling (of )?complaints", r"complaints handling"],
    },
    Measure {
        code: MeasureCode::Tp10,
        description: "Satisfaction that the landlord keeps communal areas clean and well maintained",
        header_fragments: &[r"communal areas"],
    },
    Measure {
        code: MeasureCode::Tp11,
        description: "Satisfaction that the landlord makes a positive contribution to neighbourhoods",
        header_fragments: &[r"contribution to (the )?neighbourhood", r"positive contribution"],
    },
    Measure {
        code: MeasureCode::Tp12,
        description: "Satisfaction with the landlord's approach to handling anti-social behaviour",
        header_fragments: &[r"anti[- ]social behaviour", r"\basb\b"],
    },
];

impl MeasureCode {
    pub const PRIMARY: MeasureCode = MeasureCode::Tp01;

    pub const ALL: [MeasureCode; MEASURE_COUNT] = [
        MeasureCode::Tp01,
        MeasureCode::Tp02,
        MeasureCode::Tp03,
        MeasureCode::Tp04,
        MeasureCode::Tp05,
        MeasureCode::Tp06,
        MeasureCode::Tp07,
        MeasureCode::Tp08,
        MeasureCode::Tp09,
        MeasureCode::Tp10,
        MeasureCode::Tp11,
        MeasureCode::Tp12,
    ];

    /// Zero-based position in the catalog.
    pub fn index(self) -> usize {
        self as usize
    }

    /// 1-based question number (TP07 -> 7).
    pub fn number(self) -> usize {
        self.index() + 1
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tp01 => "TP01",
            Self::Tp02 => "TP02",
            Self::Tp03 => "TP03",
            Self::Tp04 => "TP04",
            Self::Tp05 => "TP05",
            Self::Tp06 => "TP06",
            Self::Tp07 => "TP07",
            Self::Tp08 => "TP08",
            Self::Tp09 => "TP09",
            Self::Tp10 => "TP10",
            Self::Tp11 => "TP11",
            Self::Tp12 => "TP12",
        }
    }

    pub fn measure(self) -> &'static Measure {
        &CATALOG[self.index()]
    }

    pub fn description(self) -> &'static str {
        self.measure().description
    }

    pub fn is_primary(self) -> bool {
        self == Self::PRIMARY
    }
}

impl FromStr for MeasureCode {
    type Err = DomainError;

    /// Accepts "TP01", "tp1", "TP 01".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        let upper = compact.to_ascii_uppercase();
        let digits = upper
            .strip_prefix("TP")
            .ok_or_else(|| DomainError::UnknownMeasure(s.to_string()))?;
        let n: usize = digits
            .parse()
            .map_err(|_| DomainError::UnknownMeasure(s.to_string()))?;
        if (1..=MEASURE_COUNT).contains(&n) {
            Ok(Self::ALL[n - 1])
        } else {
            Err(DomainError::UnknownMeasure(s.to_string()))
        }
    }
}

impl fmt::Display for MeasureCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for MeasureCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MeasureCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        MeasureCode::from_str(&s).map_err(de::Error::custom)
    }
}

/// Dense per-measure storage: one optional score per catalog slot.
/// A `None` is an explicitly missing value, never a zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MeasureScores([Option<f64>; MEASURE_COUNT]);

impl MeasureScores {
    pub fn get(&self, code: MeasureCode) -> Option<f64> {
        self.0[code.index()]
    }

    pub fn set(&mut self, code: MeasureCode, value: Option<f64>) {
        self.0[code.index()] = value;
    }

    /// Present values in catalog order.
    pub fn present(&self) -> impl Iterator<Item = (MeasureCode, f64)> + '_ {
        MeasureCode::ALL
            .iter()
            .filter_map(move |code| self.get(*code).map(|v| (*code, v)))
    }

    pub fn count_present(&self) -> usize {
        self.0.iter().filter(|v| v.is_some()).count()
    }
}
