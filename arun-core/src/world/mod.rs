//! Mutable world state: attribute values, administrative rows, literals and
//! the event queue.

mod admin;
mod event;
mod literal;
mod set;
mod value;

pub use admin::{AdminEntry, AttributeSlot};
pub use event::{EventQueue, EventQueueEntry};
pub use literal::Literal;
pub use set::Set;
pub use value::Value;
