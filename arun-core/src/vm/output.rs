//! Text formatting: spacing, capitalisation and `$` symbol expansion.

use crate::acode::{Aint, MsgKind, SayForm, Style, Transitivity};
use crate::apperr;
use crate::error::Result;
use crate::host::Host;
use crate::vm::{Parameter, Vm};
use crate::world::{Literal, Value};

/// Formatting state carried between calls to `output`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputState {
    /// 1-based column of the next character.
    pub col: usize,
    /// A space goes before the next word.
    pub need_space: bool,
    /// `$$` suppressed the space before the next output.
    pub skip_space: bool,
    /// The next printed letter is uppercased.
    pub capitalize: bool,
    pub any_output: bool,
}

impl Default for OutputState {
    fn default() -> Self {
        Self { col: 1, need_space: false, skip_space: false, capitalize: false, any_output: false }
    }
}

fn inhibits_space(text: &str) -> bool {
    text.starts_with("$$")
}

/// A blank, or a symbol that breaks the line anyway.
fn is_space_equivalent(text: &str) -> bool {
    text.starts_with(' ') || ["$p", "$n", "$i", "$t"].iter().any(|symbol| text.starts_with(symbol))
}

/// Punctuation directly followed by a blank or the end of the text.
fn punctuation_next(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) if ".,!?".contains(first) => {
            let rest = chars.as_str();
            rest.is_empty() || is_space_equivalent(rest)
        }
        _ => false,
    }
}

impl<H: Host> Vm<H> {
    pub(crate) fn print_raw(&mut self, text: &str) {
        self.host.print(text);
    }

    pub fn newline(&mut self) {
        self.print_raw("\n");
        self.out.col = 1;
        self.out.need_space = false;
    }

    /// End the paragraph with one empty line.
    pub fn para(&mut self) {
        if self.out.col != 1 {
            self.newline();
        }
        self.newline();
        self.out.capitalize = true;
    }

    fn space(&mut self) {
        if self.out.skip_space {
            self.out.skip_space = false;
        } else if self.out.need_space {
            self.print_raw(" ");
            self.out.col += 1;
        }
        self.out.need_space = false;
    }

    fn justify(&mut self, text: &str) {
        let mut text = text.to_string();
        if self.out.capitalize {
            if let Some((pos, ch)) = text.char_indices().find(|(_, c)| !c.is_whitespace()) {
                let upper: String = ch.to_uppercase().collect();
                text.replace_range(pos..pos + ch.len_utf8(), &upper);
                self.out.capitalize = false;
            }
        }
        self.print_raw(&text);
        self.out.col += text.chars().count();
    }

    /// Print game text, expanding `$` symbols and handling spacing.
    pub fn output(&mut self, original: &str) -> Result<()> {
        if original.is_empty() {
            return Ok(());
        }
        if inhibits_space(original) || punctuation_next(original) {
            self.out.need_space = false;
        } else {
            self.space();
        }

        let mut rest = original;
        while let Some(pos) = rest.find('$') {
            let before = &rest[..pos];
            if !before.is_empty() {
                self.out.skip_space = false;
                if let Some(trimmed) = before.strip_suffix(' ') {
                    self.justify(trimmed);
                    self.out.need_space = true;
                } else {
                    self.justify(before);
                    self.out.need_space = false;
                }
            }
            let advance = self.print_symbol(&rest[pos..])?;
            rest = &rest[(pos + advance).min(rest.len())..];
        }

        if !rest.is_empty() {
            self.justify(rest);
            self.out.skip_space = false;
            if !rest.ends_with(' ') {
                self.out.need_space = true;
            }
        }
        if self.out.need_space {
            let last = if rest.is_empty() { original } else { rest };
            self.out.capitalize = last.chars().last().is_some_and(|c| "!?.".contains(c));
        }
        self.out.any_output = true;
        Ok(())
    }

    /// Expand the symbol at the start of `text` (which begins with `$`) and
    /// return how many bytes it used.
    fn print_symbol(&mut self, text: &str) -> Result<usize> {
        let mut chars = text.chars().skip(1);
        let Some(symbol) = chars.next() else {
            self.print_raw("$");
            return Ok(1);
        };
        let mut advance = 1 + symbol.len_utf8();
        match symbol.to_ascii_lowercase() {
            'n' => {
                self.newline();
                self.out.need_space = false;
            }
            'i' => {
                self.newline();
                self.print_raw("    ");
                self.out.col = 5;
                self.out.need_space = false;
            }
            'o' => {
                self.space();
                self.say_parameter(0, SayForm::Simple)?;
                self.out.need_space = true;
            }
            '+' | '0' | '-' | '!' => {
                self.space();
                let digit = chars.next();
                if let Some(d) = digit.filter(char::is_ascii_digit) {
                    let form = match symbol {
                        '+' => SayForm::Definite,
                        '0' => SayForm::Indefinite,
                        '-' => SayForm::Negative,
                        _ => SayForm::Pronoun,
                    };
                    self.say_parameter(d as Aint - '1' as Aint, form)?;
                    self.out.need_space = true;
                }
                advance += digit.map_or(0, char::len_utf8);
            }
            '1'..='9' => {
                self.space();
                self.say_parameter(symbol as Aint - '1' as Aint, SayForm::Simple)?;
                self.out.need_space = true;
            }
            'l' => {
                self.space();
                self.say(self.current.location)?;
                self.out.need_space = true;
            }
            'a' => {
                self.space();
                self.say(self.current.actor)?;
                self.out.need_space = true;
            }
            'v' => {
                self.space();
                if let Some(word) = self.verb_word.and_then(|w| self.program.word_string(w)) {
                    self.justify(&word);
                }
                self.out.need_space = true;
            }
            'p' => {
                self.para();
                self.out.need_space = false;
            }
            't' => {
                let spaces = 4 - (self.out.col - 1) % 4;
                self.print_raw(&" ".repeat(spaces));
                self.out.col += spaces;
                self.out.need_space = false;
            }
            '$' => {
                self.out.skip_space = true;
                self.out.capitalize = false;
            }
            '_' => self.print_raw("$"),
            _ => {
                advance = 1;
                self.print_raw("$");
            }
        }
        Ok(advance)
    }

    fn say_parameter(&mut self, index: Aint, form: SayForm) -> Result<()> {
        let Some(parameter) = usize::try_from(index).ok().and_then(|i| self.parameters.get(i)).cloned() else {
            apperr!("Nonexistent parameter referenced.");
        };
        if parameter.use_words {
            let words: Vec<String> = parameter.words.iter().filter_map(|w| self.program.word_string(*w)).collect();
            self.justify(&words.join(" "));
            Ok(())
        } else {
            self.say_form(parameter.instance, form)
        }
    }

    pub fn set_style(&mut self, style: Style) {
        self.host.set_style(style);
    }

    /// Print `len` bytes of text from the string area, if the hero can see it.
    pub fn print_text(&mut self, fpos: u32, len: u32) -> Result<()> {
        if len == 0 {
            return Ok(());
        }
        let hero = self.hero();
        if self.is_here(hero, Transitivity::Direct)? {
            let text = self.program.text(fpos, len)?;
            self.output(&text)?;
        }
        Ok(())
    }

    // -------------------------
    // Messages
    // -------------------------

    pub fn print_message(&mut self, msg: MsgKind) -> Result<()> {
        let Some(entry) = self.program.message(msg) else {
            log::warn!("message {} missing from the image", msg);
            return Ok(());
        };
        self.interpret(entry.stms)
    }

    /// Print a message with `$1`, `$2`... bound to `parameters`.
    pub fn print_message_with_parameters(&mut self, msg: MsgKind, parameters: Vec<Parameter>) -> Result<()> {
        let saved = std::mem::replace(&mut self.parameters, parameters);
        let result = self.print_message(msg);
        self.parameters = saved;
        result
    }

    pub fn print_message_with_instance(&mut self, msg: MsgKind, instance: Aint) -> Result<()> {
        self.print_message_with_parameters(msg, vec![Parameter::new(instance)])
    }

    pub fn print_message_with_instances(&mut self, msg: MsgKind, first: Aint, second: Aint) -> Result<()> {
        self.print_message_with_parameters(msg, vec![Parameter::new(first), Parameter::new(second)])
    }

    pub fn print_message_with_string(&mut self, msg: MsgKind, text: &str) -> Result<()> {
        let literal = self.create_string_literal(text.to_string());
        self.print_message_with_instance(msg, literal)
    }

    pub fn print_message_with_integers(&mut self, msg: MsgKind, first: Aint, second: Aint) -> Result<()> {
        let first = self.create_integer_literal(first);
        let second = self.create_integer_literal(second);
        self.print_message_with_instances(msg, first, second)
    }

    // -------------------------
    // Literals
    // -------------------------

    pub fn create_integer_literal(&mut self, value: Aint) -> Aint {
        let class = self.program.header().integer_class_id as Aint;
        self.push_literal(Literal { class, value: Value::Int(value) })
    }

    pub fn create_string_literal(&mut self, value: String) -> Aint {
        let class = self.program.header().string_class_id as Aint;
        self.push_literal(Literal { class, value: Value::Str(value) })
    }

    fn push_literal(&mut self, literal: Literal) -> Aint {
        self.literals.push(literal);
        self.instance_max() + self.literals.len() as Aint
    }

    pub fn free_literals(&mut self) {
        self.literals.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn punctuation_detection() {
        assert!(punctuation_next("."));
        assert!(punctuation_next(", and"));
        assert!(!punctuation_next(".."));
        assert!(!punctuation_next("word"));
        assert!(punctuation_next("!$pnext"));
        assert!(punctuation_next("?$n"));
        assert!(!punctuation_next(":"));
        assert!(!punctuation_next(";"));
        assert!(inhibits_space("$$x"));
        assert!(!inhibits_space("$x"));
    }
}
