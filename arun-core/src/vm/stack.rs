use crate::acode::Aint;
use crate::error::Result;
use crate::syserr;
use crate::world::{Set, Value};

const MAX_STACK_SIZE: usize = 1000;

/// Evaluation stack with block frames.
///
/// stack layout of a frame:
/// |-----------------|
/// | saved frame     | <- frame - 1, index of the enclosing frame
/// |-----------------|
/// | local(1)        | <- frame
/// | ...             |
/// | local(n)        |
/// | temporaries     |
#[derive(Debug, Default)]
pub struct Stack {
    values: Vec<Value>,
    frame: usize,
}

impl Stack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> usize {
        self.values.len()
    }

    pub fn clear(&mut self) {
        self.values.clear();
        self.frame = 0;
    }

    pub fn push(&mut self, value: impl Into<Value>) -> Result<()> {
        if self.values.len() >= MAX_STACK_SIZE {
            syserr!("Stack overflow.");
        }
        self.values.push(value.into());
        Ok(())
    }

    pub fn pop(&mut self) -> Result<Value> {
        match self.values.pop() {
            Some(value) => Ok(value),
            None => syserr!("Stack underflow."),
        }
    }

    pub fn pop_int(&mut self) -> Result<Aint> {
        match self.pop()? {
            Value::Int(v) => Ok(v),
            other => syserr!("Expected an integer on the stack, found a {}.", other.kind()),
        }
    }

    pub fn pop_bool(&mut self) -> Result<bool> {
        Ok(self.pop()?.truthy())
    }

    pub fn pop_str(&mut self) -> Result<String> {
        match self.pop()? {
            Value::Str(s) => Ok(s),
            other => syserr!("Expected a string on the stack, found a {}.", other.kind()),
        }
    }

    pub fn pop_set(&mut self) -> Result<Set> {
        match self.pop()? {
            Value::Set(s) => Ok(s),
            other => syserr!("Expected a set on the stack, found a {}.", other.kind()),
        }
    }

    pub fn top(&self) -> Result<&Value> {
        match self.values.last() {
            Some(value) => Ok(value),
            None => syserr!("Stack underflow."),
        }
    }

    pub fn top_set_mut(&mut self) -> Result<&mut Set> {
        match self.values.last_mut() {
            Some(Value::Set(set)) => Ok(set),
            Some(other) => syserr!("Expected a set on the stack, found a {}.", other.kind()),
            None => syserr!("Stack underflow."),
        }
    }

    /// Open a frame of `locals` zeroed variables.
    pub fn new_frame(&mut self, locals: Aint) -> Result<()> {
        self.push(self.frame as Aint)?;
        self.frame = self.values.len();
        for _ in 0..locals.max(0) {
            self.push(0)?;
        }
        Ok(())
    }

    /// Drop the current frame and everything above it.
    pub fn end_frame(&mut self) -> Result<()> {
        if self.frame == 0 {
            syserr!("Ending a frame that was never started.");
        }
        self.values.truncate(self.frame);
        self.frame = self.pop_int()? as usize;
        Ok(())
    }

    fn local_index(&self, frames_below: Aint, variable: Aint) -> Result<usize> {
        if variable < 1 {
            syserr!("Reading a non-existing block-local variable.");
        }
        let mut frame = self.frame;
        for _ in 0..frames_below.max(0) {
            frame = match frame.checked_sub(1).and_then(|saved| self.values.get(saved)) {
                Some(Value::Int(outer)) if *outer >= 0 => *outer as usize,
                _ => syserr!("Block-local variable frame chain is broken."),
            };
        }
        let index = frame + variable as usize - 1;
        if frame == 0 || index >= self.values.len() {
            syserr!("Reading a non-existing block-local variable.");
        }
        Ok(index)
    }

    pub fn get_local(&self, frames_below: Aint, variable: Aint) -> Result<Value> {
        let index = self.local_index(frames_below, variable)?;
        Ok(self.values[index].clone())
    }

    pub fn set_local(&mut self, frames_below: Aint, variable: Aint, value: Value) -> Result<()> {
        let index = self.local_index(frames_below, variable)?;
        self.values[index] = value;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn frames_nest_and_unwind() {
        let mut stack = Stack::new();
        stack.push(42).unwrap();
        stack.new_frame(2).unwrap();
        stack.set_local(0, 2, Value::Int(7)).unwrap();
        stack.new_frame(1).unwrap();
        stack.set_local(0, 1, Value::Int(3)).unwrap();

        assert_eq!(stack.get_local(1, 2).unwrap(), Value::Int(7));
        assert_eq!(stack.get_local(0, 1).unwrap(), Value::Int(3));

        stack.push(99).unwrap();
        stack.end_frame().unwrap();
        assert_eq!(stack.get_local(0, 2).unwrap(), Value::Int(7));
        stack.end_frame().unwrap();
        assert_eq!(stack.pop_int().unwrap(), 42);
        assert_eq!(stack.depth(), 0);
    }

    #[test]
    fn type_mismatch_is_a_system_error() {
        let mut stack = Stack::new();
        stack.push(Value::Str("x".to_string())).unwrap();
        assert!(stack.pop_int().is_err());
        assert!(stack.pop().is_err());
        assert!(stack.get_local(0, 1).is_err());
    }
}
