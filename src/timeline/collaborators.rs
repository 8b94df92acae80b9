//! External systems the timeline talks to
//!
//! Transformation records and dataset names live outside the timeline; the
//! engine reaches them only through these traits.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::types::EventStatus;

/// Errors reported by a collaborator
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollaboratorError {
    #[error("record '{0}' not found")]
    NotFound(String),
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),
}

/// Mirror of transformation status kept by the transformation subsystem
pub trait TransformationRecords: Send + Sync {
    fn set_status(&self, transformation_id: &str, status: EventStatus)
        -> Result<(), CollaboratorError>;
}

/// Lookup of human-readable dataset names
pub trait DatasetCatalog: Send + Sync {
    fn dataset_name(&self, dataset_id: &str) -> Result<Option<String>, CollaboratorError>;
}

/// In-memory implementation of both collaborators
///
/// `set_status` on an unregistered transformation fails with `NotFound`.
#[derive(Debug, Default)]
pub struct InMemoryRecords {
    transformations: RwLock<HashMap<String, EventStatus>>,
    datasets: RwLock<HashMap<String, String>>,
}

impl InMemoryRecords {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_transformation(&self, transformation_id: impl Into<String>, status: EventStatus) {
        self.transformations
            .write()
            .insert(transformation_id.into(), status);
    }

    pub fn add_dataset(&self, dataset_id: impl Into<String>, name: impl Into<String>) {
        self.datasets.write().insert(dataset_id.into(), name.into());
    }

    pub fn transformation_status(&self, transformation_id: &str) -> Option<EventStatus> {
        self.transformations.read().get(transformation_id).copied()
    }
}

impl TransformationRecords for InMemoryRecords {
    fn set_status(
        &self,
        transformation_id: &str,
        status: EventStatus,
    ) -> Result<(), CollaboratorError> {
        let mut transformations = self.transformations.write();
        match transformations.get_mut(transformation_id) {
            Some(current) => {
                *current = status;
                Ok(())
            }
            None => Err(CollaboratorError::NotFound(transformation_id.to_string())),
        }
    }
}

impl DatasetCatalog for InMemoryRecords {
    fn dataset_name(&self, dataset_id: &str) -> Result<Option<String>, CollaboratorError> {
        Ok(self.datasets.read().get(dataset_id).cloned())
    }
}
