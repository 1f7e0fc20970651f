//! Layout Store: latest known state of every layout row.
//!
//! A single reader/writer lock guards the whole sequence. Writers replace a
//! row's model wholesale, so readers never observe a partially built model.
//! Row count and row identity are fixed at construction.

use crate::models::{Component, ComponentModel, Layout, Model};
use parking_lot::RwLock;

#[derive(Debug, Default)]
pub struct LayoutStore {
    layout: RwLock<Layout>,
}

impl LayoutStore {
    /// Takes its own copy of `initial`; the caller's rows are never aliased.
    pub fn new(initial: &[Component]) -> Self {
        Self {
            layout: RwLock::new(initial.to_vec()),
        }
    }

    /// Copy of every row in configured order
    pub fn snapshot(&self) -> Layout {
        self.layout.read().clone()
    }

    /// Replace the model at `index`. Out-of-range indices are ignored.
    ///
    /// Returns whether a row was written.
    pub fn update_at(&self, index: usize, model: Model) -> bool {
        let mut layout = self.layout.write();
        match layout.get_mut(index) {
            Some(row) => {
                row.model = ComponentModel::Priced(model);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.layout.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.layout.read().is_empty()
    }
}
