// tsm-core/src/domain/schema/mod.rs

pub mod detector;
pub mod layout;

pub use detector::{
    ColumnMappingStrategy, Detection, FallbackStrategy, MappingSource, PatternStrategy,
    SchemaDetector, SchemaDrift,
};
pub use layout::{ColumnMapping, FallbackLayouts, LayoutKey, LayoutOverride};
