use std::sync::Arc;

use crate::effects::pipeline::EffectPipeline;
use crate::effects::types::EffectKind;
use crate::settings::store::SettingsStore;

/// Tag relayed to the pipeline for labels that match no effect.
const UNRECOGNISED_TAG: u8 = u8::MAX;

/// The "choose a filter" control. Every selection is written straight into
/// the running pipeline and, when a store is attached, remembered.
pub struct EffectSelector {
    pipeline: Arc<EffectPipeline>,
    store: Option<Arc<SettingsStore>>,
}

impl EffectSelector {
    /// Attach to a pipeline and publish the initial `Normal` selection.
    pub fn new(pipeline: Arc<EffectPipeline>) -> Self {
        pipeline.set_effect(EffectKind::Normal);
        Self {
            pipeline,
            store: None,
        }
    }

    /// Like [`EffectSelector::new`], also persisting each choice.
    pub fn with_store(pipeline: Arc<EffectPipeline>, store: Arc<SettingsStore>) -> Self {
        let mut selector = Self::new(pipeline);
        selector.store = Some(store);
        selector
    }

    /// Selector labels, in display order.
    pub fn options() -> [&'static str; 6] {
        EffectKind::ALL.map(EffectKind::display_name)
    }

    /// Select an effect.
    pub fn select(&self, effect: EffectKind) {
        self.pipeline.set_effect(effect);
        if let Some(store) = &self.store {
            store.set_effect(effect);
        }
    }

    /// Select by display label, returning the effect now in force.
    ///
    /// An unknown label is still relayed; the pipeline treats it as `Normal`
    /// so the stream keeps flowing.
    pub fn select_label(&self, label: &str) -> EffectKind {
        match EffectKind::from_label(label) {
            Some(effect) => self.select(effect),
            None => {
                tracing::warn!("Unknown effect '{label}', passing frames through unchanged");
                self.pipeline.set_effect_raw(UNRECOGNISED_TAG);
            }
        }
        self.pipeline.effect()
    }

    /// The effect currently in force in the pipeline.
    pub fn selected(&self) -> EffectKind {
        self.pipeline.effect()
    }

    /// Re-apply the remembered effect from the attached store, if any.
    pub fn restore_saved(&self) -> Option<EffectKind> {
        let saved = self.store.as_ref()?.effect()?;
        tracing::info!("Restoring saved effect '{saved}'");
        self.pipeline.set_effect(saved);
        Some(saved)
    }
}
