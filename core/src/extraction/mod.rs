pub mod metadata;
pub mod tags;

pub use metadata::CaseMetadata;
pub use tags::*;
