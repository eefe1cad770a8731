//! Ocular Screen - Eye-tracking analysis engine for trauma-response screening.
//!
//! This library turns the eye-tracking samples recorded during a stimulus
//! session into a set of behavioral markers, a bounded overall risk score and
//! a tier of follow-up recommendations.
//!
//! # Screening Only
//!
//! - **No diagnosis**: Scores and markers are screening signals, not clinical findings
//! - **Owner scoped**: Every session operation is checked against the calling clinician
//! - **Deterministic**: The same samples always produce the same result
//! - **Auditable**: Processing activity is counted in a local activity log
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Ocular Screen                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐       │
//! │  │  Sessions   │──▶│  Features   │──▶│    Rule     │       │
//! │  │  (samples)  │   │ (compute)   │   │  Battery    │       │
//! │  └─────────────┘   └─────────────┘   └─────────────┘       │
//! │         │                                    │              │
//! │         ▼                                    ▼              │
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐       │
//! │  │  Activity   │   │  Screening  │◀──│   Score +   │       │
//! │  │    Log      │   │   Report    │   │   Tiers     │       │
//! │  └─────────────┘   └─────────────┘   └─────────────┘       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use ocular_screen::{CallerId, MemoryStore, NewSession, Sample, SessionAnalyzer};
//!
//! let store = Arc::new(MemoryStore::new());
//! let caller = CallerId::authenticate(Some("clinician-1")).unwrap();
//!
//! let session = store
//!     .create_session(&caller, NewSession {
//!         participant_name: "Participant A".to_string(),
//!         participant_age: Some(34),
//!         session_type: "screening".to_string(),
//!     })
//!     .unwrap();
//! store
//!     .record_sample(&caller, &session.id, Sample::new(0, 48.0, 51.0, 3.4))
//!     .unwrap();
//!
//! let analyzer = SessionAnalyzer::new(store.clone(), store.clone());
//! let result = analyzer.analyze(&caller, &session.id).unwrap();
//! println!("score {:.2}", result.overall_score);
//! ```

pub mod audit;
pub mod config;
pub mod core;
pub mod error;
pub mod session;

#[cfg(feature = "server")]
pub mod server;

// Re-export key types at crate root for convenience
pub use audit::{ActivityLog, ActivityStats, SharedActivityLog};
pub use config::{Config, ConfigError};
pub use self::core::{
    analyze_samples, compute_features, MarkerRule, ReportBuilder, RiskTier, RuleBattery,
    ScreeningReport, SessionAnalyzer, SessionFeatures,
};
pub use error::AnalysisError;
pub use session::{
    AnalysisResult, CallerId, Marker, MemoryStore, NewSession, NewStimulus, ResultSink, Sample,
    SampleRepository, Session, SessionId, SessionStatus, Stimulus, StimulusCatalog,
    StimulusCategory,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Disclaimer attached to every screening report.
pub const SCREENING_DISCLAIMER: &str = r#"
This report is generated by an automated eye-tracking analysis system and is
intended as a screening tool only. It should not be used as a substitute for
professional clinical assessment, diagnosis, or treatment. Any concerning
results should be followed up with a qualified mental health professional for
comprehensive evaluation. This tool is designed to assist healthcare providers
and should be interpreted within the context of clinical judgment and
additional assessment methods.
"#;
