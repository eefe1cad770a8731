//! In-memory session store with optional JSON snapshot persistence.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::AnalysisError;
use crate::session::catalog::{NewStimulus, Stimulus, StimulusCatalog};
use crate::session::store::{ResultSink, SampleRepository};
use crate::session::types::{
    AnalysisResult, CallerId, Sample, Session, SessionId, SessionStatus, StimulusCategory,
};

/// Request to open a new session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSession {
    pub participant_name: String,
    #[serde(default)]
    pub participant_age: Option<u32>,
    #[serde(default = "default_session_type")]
    pub session_type: String,
}

fn default_session_type() -> String {
    "screening".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreState {
    sessions: HashMap<SessionId, Session>,
    samples: HashMap<SessionId, Vec<Sample>>,
    catalog: StimulusCatalog,
}

impl StoreState {
    fn owned(&self, caller: &CallerId, id: &SessionId) -> Result<&Session, AnalysisError> {
        let session = self
            .sessions
            .get(id)
            .ok_or_else(|| AnalysisError::NotFound(id.to_string()))?;
        if &session.owner != caller {
            return Err(AnalysisError::AccessDenied(id.to_string()));
        }
        Ok(session)
    }

    fn owned_mut(
        &mut self,
        caller: &CallerId,
        id: &SessionId,
    ) -> Result<&mut Session, AnalysisError> {
        self.owned(caller, id)?;
        self.sessions
            .get_mut(id)
            .ok_or_else(|| AnalysisError::NotFound(id.to_string()))
    }
}

/// Thread-safe store implementing both engine collaborator contracts.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<StoreState>,
    persist_path: Option<PathBuf>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that snapshots itself to `path` after every mutation.
    ///
    /// An existing snapshot at `path` is loaded first.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut store = Self {
            state: RwLock::new(StoreState::default()),
            persist_path: Some(path),
        };

        if let Err(e) = store.load() {
            tracing::warn!("Could not load previous session store: {}", e);
        }

        store
    }

    pub fn persist_path(&self) -> Option<&Path> {
        self.persist_path.as_deref()
    }

    fn load(&mut self) -> Result<(), AnalysisError> {
        if let Some(ref path) = self.persist_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)
                    .map_err(|e| AnalysisError::Storage(e.to_string()))?;
                let state: StoreState = serde_json::from_str(&content)
                    .map_err(|e| AnalysisError::Storage(e.to_string()))?;
                tracing::debug!(
                    "Loaded {} sessions from {}",
                    state.sessions.len(),
                    path.display()
                );
                *self.write()? = state;
            }
        }
        Ok(())
    }

    fn flush(&self, state: &StoreState) -> Result<(), AnalysisError> {
        if let Some(ref path) = self.persist_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| AnalysisError::Storage(e.to_string()))?;
            }
            let json =
                serde_json::to_vec(state).map_err(|e| AnalysisError::Storage(e.to_string()))?;
            std::fs::write(path, json).map_err(|e| AnalysisError::Storage(e.to_string()))?;
        }
        Ok(())
    }

    /// Apply `change`, persist, and only then make the result visible.
    ///
    /// On any error, from `change` or from the snapshot write, the store is
    /// left as it was.
    fn commit<T>(
        &self,
        change: impl FnOnce(&mut StoreState) -> Result<T, AnalysisError>,
    ) -> Result<T, AnalysisError> {
        let mut state = self.write()?;
        if self.persist_path.is_none() {
            // Changes validate before they mutate
            return change(&mut *state);
        }
        let mut candidate = state.clone();
        let value = change(&mut candidate)?;
        self.flush(&candidate)?;
        *state = candidate;
        Ok(value)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, StoreState>, AnalysisError> {
        self.state
            .read()
            .map_err(|_| AnalysisError::Storage("session store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, StoreState>, AnalysisError> {
        self.state
            .write()
            .map_err(|_| AnalysisError::Storage("session store lock poisoned".to_string()))
    }

    /// Open a new active session owned by `caller`.
    pub fn create_session(
        &self,
        caller: &CallerId,
        new: NewSession,
    ) -> Result<Session, AnalysisError> {
        if new.participant_name.trim().is_empty() {
            return Err(AnalysisError::InvalidInput(
                "participant name must not be empty".to_string(),
            ));
        }

        let session = Session {
            id: SessionId::generate(),
            owner: caller.clone(),
            participant_name: new.participant_name,
            participant_age: new.participant_age,
            session_type: new.session_type,
            status: SessionStatus::Active,
            start_time: Utc::now().timestamp_millis(),
            end_time: None,
            analysis_results: None,
        };
        self.insert_session(session.clone())?;
        Ok(session)
    }

    /// Insert a fully-formed session, replacing any session with the same id.
    pub fn insert_session(&self, session: Session) -> Result<(), AnalysisError> {
        self.commit(|state| {
            state.samples.entry(session.id.clone()).or_default();
            state.sessions.insert(session.id.clone(), session);
            Ok(())
        })
    }

    pub fn get_session(
        &self,
        caller: &CallerId,
        id: &SessionId,
    ) -> Result<Session, AnalysisError> {
        Ok(self.read()?.owned(caller, id)?.clone())
    }

    /// Sessions owned by `caller`, newest first.
    pub fn list_sessions(&self, caller: &CallerId) -> Result<Vec<Session>, AnalysisError> {
        let state = self.read()?;
        let mut sessions: Vec<Session> = state
            .sessions
            .values()
            .filter(|s| &s.owner == caller)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| {
            b.start_time
                .cmp(&a.start_time)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(sessions)
    }

    /// Mark a session completed, stamping its end time with the current time.
    pub fn complete_session(
        &self,
        caller: &CallerId,
        id: &SessionId,
    ) -> Result<Session, AnalysisError> {
        self.complete_session_at(caller, id, Utc::now().timestamp_millis())
    }

    pub fn complete_session_at(
        &self,
        caller: &CallerId,
        id: &SessionId,
        end_time: i64,
    ) -> Result<Session, AnalysisError> {
        self.commit(|state| {
            let session = state.owned_mut(caller, id)?;
            if end_time < session.start_time {
                return Err(AnalysisError::InvalidInput(format!(
                    "end time {end_time} precedes session start {}",
                    session.start_time
                )));
            }
            session.status = SessionStatus::Completed;
            session.end_time = Some(end_time);
            Ok(session.clone())
        })
    }

    pub fn cancel_session(
        &self,
        caller: &CallerId,
        id: &SessionId,
    ) -> Result<Session, AnalysisError> {
        self.commit(|state| {
            let session = state.owned_mut(caller, id)?;
            session.status = SessionStatus::Cancelled;
            Ok(session.clone())
        })
    }

    /// Append samples to a session, tagging each with its resolved category.
    ///
    /// The batch is rejected as a whole if any sample is invalid.
    pub fn record_samples(
        &self,
        caller: &CallerId,
        id: &SessionId,
        samples: Vec<Sample>,
    ) -> Result<usize, AnalysisError> {
        for sample in &samples {
            sample.validate()?;
        }

        let count = self.commit(|state| {
            state.owned(caller, id)?;

            let tagged: Vec<Sample> = samples
                .into_iter()
                .map(|mut sample| {
                    sample.category = state.catalog.resolve(&sample);
                    sample
                })
                .collect();
            let count = tagged.len();
            state.samples.entry(id.clone()).or_default().extend(tagged);
            Ok(count)
        })?;

        tracing::debug!("Recorded {} samples for session {}", count, id);
        Ok(count)
    }

    pub fn record_sample(
        &self,
        caller: &CallerId,
        id: &SessionId,
        sample: Sample,
    ) -> Result<(), AnalysisError> {
        self.record_samples(caller, id, vec![sample]).map(|_| ())
    }

    pub fn sample_count(&self, caller: &CallerId, id: &SessionId) -> Result<usize, AnalysisError> {
        let state = self.read()?;
        state.owned(caller, id)?;
        Ok(state.samples.get(id).map_or(0, Vec::len))
    }

    pub fn register_stimulus(&self, new: NewStimulus) -> Result<Stimulus, AnalysisError> {
        self.commit(|state| state.catalog.register(new))
    }

    pub fn active_stimuli(
        &self,
        category: Option<StimulusCategory>,
    ) -> Result<Vec<Stimulus>, AnalysisError> {
        Ok(self.read()?.catalog.active(category))
    }
}

impl SampleRepository for MemoryStore {
    fn fetch_session(
        &self,
        caller: &CallerId,
        session_id: &SessionId,
    ) -> Result<Session, AnalysisError> {
        self.get_session(caller, session_id)
    }

    fn fetch_samples(
        &self,
        caller: &CallerId,
        session_id: &SessionId,
    ) -> Result<Vec<Sample>, AnalysisError> {
        let state = self.read()?;
        state.owned(caller, session_id)?;
        Ok(state.samples.get(session_id).cloned().unwrap_or_default())
    }
}

impl ResultSink for MemoryStore {
    fn store_result(
        &self,
        session_id: &SessionId,
        result: &AnalysisResult,
    ) -> Result<(), AnalysisError> {
        self.commit(|state| {
            let session = state
                .sessions
                .get_mut(session_id)
                .ok_or_else(|| AnalysisError::NotFound(session_id.to_string()))?;
            session.analysis_results = Some(result.clone());
            Ok(())
        })
    }

    fn load_result(
        &self,
        caller: &CallerId,
        session_id: &SessionId,
    ) -> Result<Option<AnalysisResult>, AnalysisError> {
        Ok(self
            .read()?
            .owned(caller, session_id)?
            .analysis_results
            .clone())
    }
}
