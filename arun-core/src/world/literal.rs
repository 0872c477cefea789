use crate::acode::Aint;
use crate::world::Value;

/// An integer or string injected into the instance id space past `instanceMax`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Literal {
    /// The integer or string class.
    pub class: Aint,
    pub value: Value,
}
