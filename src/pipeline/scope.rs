use std::sync::Arc;

use crate::config::{write_config, MosConfig, SharedConfig};

pub(crate) type ConfigSlot<T> = fn(&mut MosConfig) -> &mut T;

/// Installs a value into one field of the shared configuration and puts the
/// previous value back when dropped, whichever way the owning scope exits.
/// Overrides on one config must be released in reverse order of install.
pub(crate) struct ConfigOverride<T> {
    config: SharedConfig,
    slot: ConfigSlot<T>,
    previous: Option<T>,
}

impl<T> ConfigOverride<T> {
    pub(crate) fn install(config: &SharedConfig, slot: ConfigSlot<T>, value: T) -> Self {
        let previous = {
            let mut guard = write_config(config);
            std::mem::replace(slot(&mut *guard), value)
        };
        Self {
            config: Arc::clone(config),
            slot,
            previous: Some(previous),
        }
    }
}

impl<T> Drop for ConfigOverride<T> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            let mut guard = write_config(&self.config);
            *(self.slot)(&mut *guard) = previous;
        }
    }
}

pub(crate) fn sample_rate_slot(config: &mut MosConfig) -> &mut u32 {
    &mut config.sr
}

pub(crate) fn remove_silent_section_slot(config: &mut MosConfig) -> &mut Option<bool> {
    &mut config.dataset.remove_silent_section
}
