//! References to other records: either just the id, or a joined summary.

use uuid::Uuid;

pub trait Identified {
    fn id(&self) -> Uuid;
}

/// Resolved once at the data-access boundary so mappers only deal with this enum.
#[derive(Clone, Debug, PartialEq)]
pub enum Ref<T> {
    Id(Uuid),
    Populated(T),
}

impl<T: Identified> Ref<T> {
    /// Populated when the join produced a summary, otherwise the bare id.
    pub fn resolve(id: Uuid, populated: Option<T>) -> Self {
        match populated {
            Some(summary) => Ref::Populated(summary),
            None => Ref::Id(id),
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            Ref::Id(id) => *id,
            Ref::Populated(summary) => summary.id(),
        }
    }

    pub fn populated(&self) -> Option<&T> {
        match self {
            Ref::Id(_) => None,
            Ref::Populated(summary) => Some(summary),
        }
    }
}
