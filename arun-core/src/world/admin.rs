use serde::{Deserialize, Serialize};

use crate::acode::{Aaddr, Aint};
use crate::world::Value;

/// A named mutable slot on an instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeSlot {
    pub code: Aint,
    pub value: Value,
    /// Address of the attribute name.
    pub id: Aaddr,
}

/// Run-time bookkeeping of one instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminEntry {
    pub location: Aint,
    pub attributes: Vec<AttributeSlot>,
    pub already_described: bool,
    pub visits_count: Aint,
    /// Script being run by an actor, 0 if idle.
    pub script: Aint,
    /// Index of the next step of `script`.
    pub step: Aint,
    pub wait_count: Aint,
}

impl AdminEntry {
    pub fn attribute(&self, code: Aint) -> Option<&Value> {
        self.attributes.iter().find(|a| a.code == code).map(|a| &a.value)
    }

    pub fn attribute_mut(&mut self, code: Aint) -> Option<&mut Value> {
        self.attributes.iter_mut().find(|a| a.code == code).map(|a| &mut a.value)
    }
}
