//! A successor configuration together with its info.

use std::fmt;

use crate::configuration::Configuration;
use crate::lockable::Frozen;
use crate::process::Frame;

/// One edge out of a configuration, as produced by a collaborator.
///
/// The resulting configuration is locked on construction, so every
/// configuration an engine receives is already shareable.
#[derive(Clone)]
pub struct Transition<F, I> {
    configuration: Frozen<Configuration<F>>,
    info: I,
}

impl<F: Frame, I> Transition<F, I> {
    pub fn new(configuration: Configuration<F>, info: I) -> Self {
        Self::from_frozen(Frozen::new(configuration), info)
    }

    pub fn from_frozen(configuration: Frozen<Configuration<F>>, info: I) -> Self {
        Self {
            configuration,
            info,
        }
    }

    pub fn configuration(&self) -> &Frozen<Configuration<F>> {
        &self.configuration
    }

    pub fn info(&self) -> &I {
        &self.info
    }

    pub fn into_parts(self) -> (Frozen<Configuration<F>>, I) {
        (self.configuration, self.info)
    }
}

impl<F: Frame, I: fmt::Debug> fmt::Debug for Transition<F, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transition")
            .field("configuration", &self.configuration)
            .field("info", &self.info)
            .finish()
    }
}
