pub mod facade;
pub mod severity;
pub mod source;

pub use facade::{
    ActionKind, OptimizationFacade, ResultSource, SearchResult, TriageAction, TriageReport,
    ESCALATION_THRESHOLD, WARNING_THRESHOLD,
};
pub use severity::score_event;
pub use source::{haversine_km, InMemorySource, SpatialSource};
