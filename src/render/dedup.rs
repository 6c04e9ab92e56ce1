//! Identities already rendered in a session

use std::collections::HashSet;

use crate::models::ObjectIdentity;

#[derive(Debug, Default)]
pub struct RenderedSet {
    seen: HashSet<ObjectIdentity>,
    enabled: bool,
}

impl RenderedSet {
    pub fn new(enabled: bool) -> Self {
        Self {
            seen: HashSet::new(),
            enabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Turn tracking off; everything is rendered in full from now on
    pub fn disable(&mut self) {
        self.enabled = false;
        self.seen.clear();
    }

    /// Record `identity`, returning false when it was rendered before
    ///
    /// Always true while tracking is disabled.
    pub fn check_add(&mut self, identity: ObjectIdentity) -> bool {
        !self.enabled || self.seen.insert(identity)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
