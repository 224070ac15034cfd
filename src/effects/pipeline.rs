//! Live effect pipeline, one instance per active stream.
//!
//! The active effect lives in a single atomic slot. The control side
//! overwrites it at any time with [`EffectPipeline::set_effect`]; the
//! delivery side reads it exactly once per frame in
//! [`EffectPipeline::process_frame`]. There is no queue: the latest write
//! before a frame is read wins.

use std::sync::atomic::{AtomicU8, Ordering};

use crate::effects::error::Result;
use crate::effects::filters;
use crate::effects::frame::Frame;
use crate::effects::types::EffectKind;

pub struct EffectPipeline {
    active: AtomicU8,
}

impl EffectPipeline {
    /// Create a pipeline with `Normal` in force.
    pub fn new() -> Self {
        Self {
            active: AtomicU8::new(EffectKind::Normal.tag()),
        }
    }

    /// Overwrite the active effect. Takes effect on the next frame.
    pub fn set_effect(&self, effect: EffectKind) {
        self.set_effect_raw(effect.tag());
    }

    /// Store an externally supplied effect tag without validating it.
    ///
    /// Tags outside the enumeration are read back as `Normal`.
    pub fn set_effect_raw(&self, tag: u8) {
        let previous = self.active.swap(tag, Ordering::AcqRel);
        if previous != tag {
            match EffectKind::from_tag(tag) {
                Some(effect) => tracing::debug!("effect set to {effect}"),
                None => tracing::debug!("effect set to unrecognised tag {tag}, using Normal"),
            }
        }
    }

    /// Snapshot of the effect currently in force.
    pub fn effect(&self) -> EffectKind {
        EffectKind::from_tag(self.active.load(Ordering::Acquire)).unwrap_or(EffectKind::Normal)
    }

    /// Transform `frame` with the effect in force at the moment of the call.
    ///
    /// The input is never modified. Fails with `InvalidFrame` for zero-sized
    /// or non three-channel frames.
    pub fn process_frame(&self, frame: &Frame) -> Result<Frame> {
        filters::apply(self.effect(), frame)
    }

    /// Transform `frame` with an explicit effect, ignoring the active one.
    pub fn process_frame_with(&self, frame: &Frame, effect: EffectKind) -> Result<Frame> {
        filters::apply(effect, frame)
    }
}

impl Default for EffectPipeline {
    fn default() -> Self {
        Self::new()
    }
}
