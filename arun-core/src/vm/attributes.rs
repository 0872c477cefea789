//! Attribute access, including the literal pseudo-instances, and `STRIP`.

use crate::acode::{Aint, OPAQUE_ATTRIBUTE, VISITS_ATTRIBUTE};
use crate::error::Result;
use crate::host::Host;
use crate::syserr;
use crate::vm::Vm;
use crate::world::Value;

const WORD_SEPARATORS: &[u8] = b" .,?";

fn is_separator(b: u8) -> bool {
    WORD_SEPARATORS.contains(&b)
}

fn leading_blanks(s: &[u8], position: usize) -> usize {
    s[position.min(s.len())..].iter().take_while(|b| **b == b' ').count()
}

/// Blanks ending at `position` (inclusive), counted backwards.
fn trailing_blanks(s: &[u8], position: usize) -> usize {
    s[..=position.min(s.len().saturating_sub(1))].iter().rev().take_while(|b| **b == b' ').count()
}

/// Split `s` after `count` characters. Returns `(stripped, rest)`.
pub fn strip_chars_forwards(count: Aint, s: &str) -> (String, String) {
    let count = count.max(0) as usize;
    let pos = s.char_indices().nth(count).map_or(s.len(), |(i, _)| i);
    (s[..pos].to_string(), s[pos..].to_string())
}

/// Split off the last `count` characters. Returns `(stripped, rest)`.
pub fn strip_chars_backwards(count: Aint, s: &str) -> (String, String) {
    let count = count.max(0) as usize;
    let len = s.chars().count();
    let pos = if count > len { 0 } else { s.char_indices().nth(len - count).map_or(s.len(), |(i, _)| i) };
    (s[pos..].to_string(), s[..pos].to_string())
}

/// Split after `count` words. Blanks between the stripped words and the rest
/// belong to neither.
pub fn strip_words_forwards(count: Aint, s: &str) -> (String, String) {
    let bytes = s.as_bytes();
    let mut position = 0;
    for _ in 0..count.max(0) {
        position += leading_blanks(bytes, position);
        while position < bytes.len() && !is_separator(bytes[position]) {
            position += 1;
        }
    }
    let rest_start = (position + leading_blanks(bytes, position)).min(bytes.len());
    (s[..position].to_string(), s[rest_start..].to_string())
}

/// Split off the last `count` words.
pub fn strip_words_backwards(count: Aint, s: &str) -> (String, String) {
    let bytes = s.as_bytes();
    let mut position = bytes.len();
    let mut remaining = count;
    while remaining > 0 && position > 0 {
        position -= 1;
        let blanks = trailing_blanks(bytes, position);
        if blanks > position {
            break;
        }
        position -= blanks;
        while position > 0 && !is_separator(bytes[position - 1]) {
            position -= 1;
        }
        remaining -= 1;
    }

    let stripped_start = (position + leading_blanks(bytes, position)).min(bytes.len());
    let stripped = s[stripped_start..].to_string();
    if position > 0 {
        position -= trailing_blanks(bytes, position - 1);
    }
    (stripped, s[..position].to_string())
}

impl<H: Host> Vm<H> {
    /// Value of attribute `attribute` of `instance`; `-1` is the location.
    pub fn instance_attribute(&self, instance: Aint, attribute: Aint) -> Result<Value> {
        if self.is_literal(instance) {
            return self.literal_attribute(instance, attribute);
        }
        if instance < 1 || instance > self.instance_max() {
            syserr!("Can't ATTRIBUTE item ({}).", instance);
        }
        if attribute == -1 {
            return Ok(Value::Int(self.location_of(instance)?));
        }
        match self.admin_entry(instance)?.attribute(attribute) {
            Some(value) => Ok(value.clone()),
            None => syserr!("Attribute not found."),
        }
    }

    fn literal_attribute(&self, literal: Aint, attribute: Aint) -> Result<Value> {
        let Some(entry) = self.literal(literal) else {
            syserr!("Literal {} does not exist.", literal);
        };
        if self.program.version().is_pre_beta3() {
            if attribute == 1 {
                Ok(entry.value.clone())
            } else {
                Ok(Value::Int(0))
            }
        } else if attribute == 0 {
            Ok(entry.value.clone())
        } else {
            match self.admin_entry(self.instance_max())?.attribute(attribute) {
                Some(value) => Ok(value.clone()),
                None => syserr!("Attribute not found."),
            }
        }
    }

    pub fn instance_int_attribute(&self, instance: Aint, attribute: Aint) -> Result<Aint> {
        match self.instance_attribute(instance, attribute)? {
            Value::Int(v) => Ok(v),
            other => syserr!("Attribute {} of {} is a {}, not an integer.", attribute, instance, other.kind()),
        }
    }

    pub fn instance_string_attribute(&self, instance: Aint, attribute: Aint) -> Result<String> {
        match self.instance_attribute(instance, attribute)? {
            Value::Str(s) => Ok(s),
            other => syserr!("Attribute {} of {} is a {}, not a string.", attribute, instance, other.kind()),
        }
    }

    pub fn set_instance_attribute(&mut self, instance: Aint, attribute: Aint, value: Value) -> Result<()> {
        if instance < 1 || instance > self.instance_max() {
            syserr!("Can't SET/MAKE instance ({}).", instance);
        }
        let location = self.is_location(instance);
        let admin = self.admin_entry_mut(instance)?;
        match admin.attribute_mut(attribute) {
            Some(slot) => *slot = value,
            None => syserr!("Attribute not found."),
        }
        if location && attribute != VISITS_ATTRIBUTE {
            admin.visits_count = 0;
        }
        self.game_state_changed = true;
        Ok(())
    }

    pub fn is_opaque(&self, container: Aint) -> Result<bool> {
        Ok(self.instance_attribute(container, OPAQUE_ATTRIBUTE)?.truthy())
    }

    /// Remove characters or words from a string attribute and return them.
    pub fn strip(&mut self, first: bool, count: Aint, words: bool, id: Aint, atr: Aint) -> Result<String> {
        let initial = self.instance_string_attribute(id, atr)?;
        let (stripped, rest) = match (first, words) {
            (true, true) => strip_words_forwards(count, &initial),
            (true, false) => strip_chars_forwards(count, &initial),
            (false, true) => strip_words_backwards(count, &initial),
            (false, false) => strip_chars_backwards(count, &initial),
        };
        self.set_instance_attribute(id, atr, Value::Str(rest))?;
        Ok(stripped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pair(a: &str, b: &str) -> (String, String) {
        (a.to_string(), b.to_string())
    }

    #[test]
    fn characters() {
        assert_eq!(strip_chars_forwards(2, "hello"), pair("he", "llo"));
        assert_eq!(strip_chars_forwards(9, "hello"), pair("hello", ""));
        assert_eq!(strip_chars_backwards(2, "hello"), pair("lo", "hel"));
        assert_eq!(strip_chars_backwards(9, "hello"), pair("hello", ""));
    }

    #[test]
    fn words_from_the_front() {
        assert_eq!(strip_words_forwards(1, "take the lamp"), pair("take", "the lamp"));
        assert_eq!(strip_words_forwards(2, "  take the lamp"), pair("  take the", "lamp"));
        assert_eq!(strip_words_forwards(5, "take it"), pair("take it", ""));
    }

    #[test]
    fn words_from_the_back() {
        assert_eq!(strip_words_backwards(1, "take the lamp"), pair("lamp", "take the"));
        assert_eq!(strip_words_backwards(2, "take the lamp  "), pair("the lamp  ", "take"));
        assert_eq!(strip_words_backwards(3, "one two"), pair("one two", ""));
    }
}
