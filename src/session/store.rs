//! Collaborator contracts consumed and fed by the analysis engine.

use std::sync::Arc;

use crate::error::AnalysisError;
use crate::session::types::{AnalysisResult, CallerId, Sample, Session, SessionId};

/// Read access to sessions and their recorded samples.
///
/// Implementations enforce ownership: an unknown session yields
/// [`AnalysisError::NotFound`] and a session owned by someone else yields
/// [`AnalysisError::AccessDenied`].
pub trait SampleRepository: Send + Sync {
    fn fetch_session(&self, caller: &CallerId, session_id: &SessionId)
        -> Result<Session, AnalysisError>;

    /// All samples recorded for the session. Order is not significant.
    fn fetch_samples(
        &self,
        caller: &CallerId,
        session_id: &SessionId,
    ) -> Result<Vec<Sample>, AnalysisError>;
}

/// Destination for analysis results.
///
/// Storing overwrites any prior result for the session unconditionally.
/// Callers that need at most one concurrent analysis per session must
/// serialize at this boundary.
pub trait ResultSink: Send + Sync {
    fn store_result(
        &self,
        session_id: &SessionId,
        result: &AnalysisResult,
    ) -> Result<(), AnalysisError>;

    /// Previously stored result, if any. No recomputation happens here.
    fn load_result(
        &self,
        caller: &CallerId,
        session_id: &SessionId,
    ) -> Result<Option<AnalysisResult>, AnalysisError>;
}

impl<T: SampleRepository + ?Sized> SampleRepository for Arc<T> {
    fn fetch_session(
        &self,
        caller: &CallerId,
        session_id: &SessionId,
    ) -> Result<Session, AnalysisError> {
        (**self).fetch_session(caller, session_id)
    }

    fn fetch_samples(
        &self,
        caller: &CallerId,
        session_id: &SessionId,
    ) -> Result<Vec<Sample>, AnalysisError> {
        (**self).fetch_samples(caller, session_id)
    }
}

impl<T: ResultSink + ?Sized> ResultSink for Arc<T> {
    fn store_result(
        &self,
        session_id: &SessionId,
        result: &AnalysisResult,
    ) -> Result<(), AnalysisError> {
        (**self).store_result(session_id, result)
    }

    fn load_result(
        &self,
        caller: &CallerId,
        session_id: &SessionId,
    ) -> Result<Option<AnalysisResult>, AnalysisError> {
        (**self).load_result(caller, session_id)
    }
}
