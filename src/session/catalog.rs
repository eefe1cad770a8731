//! Stimulus catalog used to tag samples with their stimulus category.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::AnalysisError;
use crate::session::types::{Sample, StimulusCategory};

/// Presentation form of a stimulus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StimulusKind {
    Image,
    Word,
    Face,
}

/// A stimulus that can be shown during a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stimulus {
    pub id: String,
    pub name: String,
    pub kind: StimulusKind,
    pub category: StimulusCategory,
    /// Text content or image description
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Presentation duration in milliseconds
    pub duration_ms: u64,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// Request to register a new stimulus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewStimulus {
    /// Explicit id; generated when absent
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub kind: StimulusKind,
    pub category: StimulusCategory,
    pub content: String,
    #[serde(default)]
    pub image_url: Option<String>,
    pub duration_ms: u64,
}

/// Registry of known stimuli keyed by id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StimulusCatalog {
    stimuli: HashMap<String, Stimulus>,
}

impl StimulusCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a stimulus. Ids must be unique.
    pub fn register(&mut self, new: NewStimulus) -> Result<Stimulus, AnalysisError> {
        if new.name.trim().is_empty() {
            return Err(AnalysisError::InvalidInput(
                "stimulus name must not be empty".to_string(),
            ));
        }

        let id = new
            .id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        if self.stimuli.contains_key(&id) {
            return Err(AnalysisError::InvalidInput(format!(
                "stimulus {id} is already registered"
            )));
        }

        let stimulus = Stimulus {
            id: id.clone(),
            name: new.name,
            kind: new.kind,
            category: new.category,
            content: new.content,
            image_url: new.image_url,
            duration_ms: new.duration_ms,
            active: true,
        };
        self.stimuli.insert(id, stimulus.clone());
        Ok(stimulus)
    }

    pub fn get(&self, id: &str) -> Option<&Stimulus> {
        self.stimuli.get(id)
    }

    pub fn category_of(&self, id: &str) -> Option<StimulusCategory> {
        self.stimuli.get(id).map(|s| s.category)
    }

    /// Mark a stimulus inactive. Returns false if the id is unknown.
    pub fn deactivate(&mut self, id: &str) -> bool {
        match self.stimuli.get_mut(id) {
            Some(stimulus) => {
                stimulus.active = false;
                true
            }
            None => false,
        }
    }

    /// Active stimuli, optionally restricted to one category, ordered by name.
    pub fn active(&self, category: Option<StimulusCategory>) -> Vec<Stimulus> {
        let mut stimuli: Vec<Stimulus> = self
            .stimuli
            .values()
            .filter(|s| s.active)
            .filter(|s| category.map_or(true, |c| s.category == c))
            .cloned()
            .collect();
        stimuli.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        stimuli
    }

    pub fn len(&self) -> usize {
        self.stimuli.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stimuli.is_empty()
    }

    /// Resolve the category of a sample.
    ///
    /// An explicit tag wins, then a catalog lookup of the stimulus id, then
    /// substring inference on the id.
    pub fn resolve(&self, sample: &Sample) -> Option<StimulusCategory> {
        if sample.category.is_some() {
            return sample.category;
        }
        let stimulus_id = sample.stimulus_id.as_deref()?;
        self.category_of(stimulus_id)
            .or_else(|| StimulusCategory::infer(stimulus_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(id: &str, name: &str, category: StimulusCategory) -> NewStimulus {
        NewStimulus {
            id: Some(id.to_string()),
            name: name.to_string(),
            kind: StimulusKind::Word,
            category,
            content: name.to_string(),
            image_url: None,
            duration_ms: 3000,
        }
    }

    #[test]
    fn test_register_and_lookup() {
        let mut catalog = StimulusCatalog::new();
        catalog
            .register(word("w1", "Table", StimulusCategory::Neutral))
            .unwrap();

        assert_eq!(catalog.category_of("w1"), Some(StimulusCategory::Neutral));
        assert_eq!(catalog.category_of("missing"), None);
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut catalog = StimulusCatalog::new();
        catalog
            .register(word("w1", "Table", StimulusCategory::Neutral))
            .unwrap();
        let err = catalog
            .register(word("w1", "Chair", StimulusCategory::Neutral))
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_INPUT");
    }

    #[test]
    fn test_generated_id_when_missing() {
        let mut catalog = StimulusCatalog::new();
        let mut new = word("", "Fear", StimulusCategory::Emotional);
        new.id = None;
        let stimulus = catalog.register(new).unwrap();
        assert!(!stimulus.id.is_empty());
        assert!(catalog.get(&stimulus.id).is_some());
    }

    #[test]
    fn test_active_filtering() {
        let mut catalog = StimulusCatalog::new();
        catalog
            .register(word("w1", "Table", StimulusCategory::Neutral))
            .unwrap();
        catalog
            .register(word("w2", "Danger", StimulusCategory::Emotional))
            .unwrap();
        catalog
            .register(word("w3", "Chair", StimulusCategory::Neutral))
            .unwrap();
        catalog.deactivate("w3");

        assert_eq!(catalog.active(None).len(), 2);
        let neutral = catalog.active(Some(StimulusCategory::Neutral));
        assert_eq!(neutral.len(), 1);
        assert_eq!(neutral[0].id, "w1");
    }

    #[test]
    fn test_resolution_order() {
        let mut catalog = StimulusCatalog::new();
        // Catalog entry overrides what the id text suggests
        catalog
            .register(word("neutral_7", "Explosion", StimulusCategory::TraumaRelated))
            .unwrap();

        let tagged = Sample::new(0, 50.0, 50.0, 3.5)
            .with_stimulus("neutral_7")
            .with_category(StimulusCategory::Emotional);
        assert_eq!(catalog.resolve(&tagged), Some(StimulusCategory::Emotional));

        let catalogued = Sample::new(0, 50.0, 50.0, 3.5).with_stimulus("neutral_7");
        assert_eq!(
            catalog.resolve(&catalogued),
            Some(StimulusCategory::TraumaRelated)
        );

        let inferred = Sample::new(0, 50.0, 50.0, 3.5).with_stimulus("emotional_2");
        assert_eq!(catalog.resolve(&inferred), Some(StimulusCategory::Emotional));

        let bare = Sample::new(0, 50.0, 50.0, 3.5);
        assert_eq!(catalog.resolve(&bare), None);
    }
}
