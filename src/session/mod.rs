//! Sessions, samples and the storage contracts around the analysis engine.
//!
//! This module contains:
//! - The session and sample data model
//! - The `SampleRepository` and `ResultSink` collaborator traits
//! - A stimulus catalog for tagging samples with their category
//! - An in-memory store implementing both collaborator traits

pub mod catalog;
pub mod memory;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use catalog::{NewStimulus, Stimulus, StimulusCatalog, StimulusKind};
pub use memory::{MemoryStore, NewSession};
pub use store::{ResultSink, SampleRepository};
pub use types::{
    AnalysisResult, CallerId, Marker, Sample, Session, SessionId, SessionStatus,
    StimulusCategory,
};
