//! Model selection, including the attachment-driven multimodal lock.

use palaver_core::{ModelId, ModelsConfig};

/// The model picker.
///
/// While the active conversation has image attachments, the selector is
/// locked to the multimodal model; removing the last attachment unlocks it
/// and restores the previously selected model.
#[derive(Clone, Debug)]
pub struct ModelSelector {
    options: Vec<ModelId>,
    multimodal: Option<ModelId>,
    selected: ModelId,
    prior: Option<ModelId>,
    locked: bool,
}

impl ModelSelector {
    pub fn new(config: &ModelsConfig) -> Self {
        let options: Vec<ModelId> = config.options.iter().map(|m| ModelId::new(m)).collect();
        let multimodal = ModelId::new(&config.multimodal);
        Self {
            selected: ModelId::new(&config.default_model),
            multimodal: options.contains(&multimodal).then_some(multimodal),
            options,
            prior: None,
            locked: false,
        }
    }

    pub fn options(&self) -> &[ModelId] {
        &self.options
    }

    pub fn selected(&self) -> &ModelId {
        &self.selected
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Whether the user may currently change the selection.
    pub fn is_selectable(&self) -> bool {
        !self.locked
    }

    /// Try to select `model`. Returns whether the selection changed hands.
    pub fn select(&mut self, model: &ModelId) -> bool {
        if self.locked || !self.options.contains(model) {
            return false;
        }
        self.selected = model.clone();
        true
    }

    /// Re-derive the lock from the attachment state.
    ///
    /// Locking remembers the current selection; unlocking restores it.
    pub fn recompute(&mut self, has_attachments: bool) {
        match (self.locked, has_attachments) {
            (false, true) => {
                if let Some(multimodal) = &self.multimodal {
                    tracing::debug!(model = %multimodal, "Locking selector to multimodal model");
                    self.prior = Some(self.selected.clone());
                    self.selected = multimodal.clone();
                    self.locked = true;
                }
            }
            (true, false) => {
                if let Some(prior) = self.prior.take() {
                    tracing::debug!(model = %prior, "Unlocking selector, restoring prior model");
                    self.selected = prior;
                }
                self.locked = false;
            }
            _ => {}
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ModelsConfig {
        ModelsConfig {
            options: vec!["qwen3:8b".to_string(), "qwen3-vl:8b".to_string()],
            multimodal: "qwen3-vl:8b".to_string(),
            default_model: "qwen3:8b".to_string(),
        }
    }

    #[test]
    fn test_initial_selection_is_default_model() {
        let selector = ModelSelector::new(&config());
        assert_eq!(selector.selected(), &ModelId::new("qwen3:8b"));
        assert!(selector.is_selectable());
        assert_eq!(selector.options().len(), 2);
    }

    #[test]
    fn test_select_known_model() {
        let mut selector = ModelSelector::new(&config());
        assert!(selector.select(&ModelId::new("qwen3-vl:8b")));
        assert_eq!(selector.selected(), &ModelId::new("qwen3-vl:8b"));
    }

    #[test]
    fn test_select_unknown_model_rejected() {
        let mut selector = ModelSelector::new(&config());
        assert!(!selector.select(&ModelId::new("gpt-oss:20b")));
        assert_eq!(selector.selected(), &ModelId::new("qwen3:8b"));
    }

    // ---- Multimodal lock ----

    #[test]
    fn test_attachment_locks_to_multimodal() {
        let mut selector = ModelSelector::new(&config());
        selector.recompute(true);
        assert!(selector.is_locked());
        assert_eq!(selector.selected(), &ModelId::new("qwen3-vl:8b"));
        assert!(!selector.select(&ModelId::new("qwen3:8b")));
    }

    #[test]
    fn test_unlock_restores_prior_selection() {
        let mut selector = ModelSelector::new(&config());
        selector.recompute(true);
        selector.recompute(false);
        assert!(!selector.is_locked());
        assert_eq!(selector.selected(), &ModelId::new("qwen3:8b"));
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let mut selector = ModelSelector::new(&config());
        selector.recompute(true);
        selector.recompute(true);
        selector.recompute(false);
        selector.recompute(false);
        assert_eq!(selector.selected(), &ModelId::new("qwen3:8b"));
        assert!(!selector.is_locked());
    }

    #[test]
    fn test_missing_multimodal_model_never_locks() {
        let config = ModelsConfig {
            options: vec!["qwen3:8b".to_string()],
            multimodal: "qwen3-vl:8b".to_string(),
            default_model: "qwen3:8b".to_string(),
        };
        let mut selector = ModelSelector::new(&config);
        selector.recompute(true);
        assert!(!selector.is_locked());
        assert_eq!(selector.selected(), &ModelId::new("qwen3:8b"));
    }
}
