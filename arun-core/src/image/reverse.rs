//! Byte-order normalization.
//!
//! The image is big-endian on disk. On a little-endian host every word that
//! holds a number or an address is swapped in place by walking the typed table
//! graph from the header. Strings and other byte data are left alone. Tables may
//! be shared between several owners, so each table is walked once and each word
//! is swapped at most once.

use std::collections::{BTreeSet, HashSet};

use crate::acode::{Aaddr, Aword, WordClass, END_OF_SYNTAX, END_OF_TABLE, RETURN_WORD};
use crate::error::VmError;
use crate::image::header::{Header, HeaderShape};
use crate::image::records::*;
use crate::version::Version;

type Result<T> = std::result::Result<T, VmError>;

pub(crate) struct Reverser<'a> {
    memory: &'a mut [Aword],
    version: Version,
    done: HashSet<Aaddr>,
    reversed: BTreeSet<usize>,
}

impl<'a> Reverser<'a> {
    pub(crate) fn new(memory: &'a mut [Aword], version: Version) -> Self {
        Self {
            memory,
            version,
            done: HashSet::new(),
            reversed: BTreeSet::new(),
        }
    }

    /// Swap the header and everything reachable from it. Returns the indices of
    /// all swapped words.
    pub(crate) fn reverse_image(mut self) -> Result<BTreeSet<usize>> {
        let shape = HeaderShape::for_version(self.version);
        // The tag is text.
        for index in 1..shape.words() {
            self.word(index)?;
        }
        let header = Header::from_shape(self.memory, shape);

        self.dictionary(header.dictionary)?;
        self.syntaxes(header.syntax_table_address)?;
        self.parameter_map(header.parameter_map_address)?;
        self.verbs(header.verb_table_address)?;
        self.classes(header.class_table_address)?;
        self.instances(header.instance_table_address)?;
        self.scripts(header.script_table_address)?;
        self.containers(header.container_table_address)?;
        self.events(header.event_table_address)?;
        self.rules(header.rule_table_address)?;
        self.table::<StringInitEntry>(header.string_init_table)?;
        self.set_inits(header.set_init_table)?;
        self.table::<SourceFileEntry>(header.source_file_table)?;
        self.table::<SourceLineEntry>(header.source_line_table)?;
        if shape == HeaderShape::Current {
            self.stms(header.prompt)?;
        }
        self.stms(header.start)?;
        self.messages(header.message_table_address)?;
        self.table::<WordEntry>(header.scores)?;
        self.table::<WordEntry>(header.freq)?;

        log::debug!("reversed {} words", self.reversed.len());
        Ok(self.reversed)
    }

    // -------------------------
    // Primitives
    // -------------------------

    fn word(&mut self, index: usize) -> Result<()> {
        let mem_top = self.memory.len();
        let Some(word) = self.memory.get_mut(index) else {
            return Err(VmError::AddressOutOfImage { addr: index as u32, mem_top: mem_top as u32 });
        };
        if self.reversed.insert(index) {
            *word = word.swap_bytes();
        }
        Ok(())
    }

    fn peek(&self, index: usize) -> Result<Aword> {
        self.memory.get(index).copied().ok_or(VmError::AddressOutOfImage {
            addr: index as u32,
            mem_top: self.memory.len() as u32,
        })
    }

    fn already_done(&mut self, addr: Aaddr) -> bool {
        addr == 0 || !self.done.insert(addr)
    }

    /// Swap every record of a table and return the records in host order.
    fn table<R: Record>(&mut self, addr: Aaddr) -> Result<Vec<R>> {
        let mut records = Vec::new();
        if addr == 0 {
            return Ok(records);
        }
        let mut at = addr as usize;
        while self.peek(at)? != END_OF_TABLE {
            for index in at..at + R::WORDS {
                self.word(index)?;
            }
            records.push(R::from_words(&self.memory[at..at + R::WORDS]));
            at += R::WORDS;
        }
        Ok(records)
    }

    /// A statement stream runs up to and including its RETURN.
    fn stms(&mut self, addr: Aaddr) -> Result<()> {
        if self.already_done(addr) {
            return Ok(());
        }
        let mut at = addr as usize;
        loop {
            self.word(at)?;
            if self.memory[at] == RETURN_WORD {
                return Ok(());
            }
            at += 1;
        }
    }

    // -------------------------
    // Typed tables
    // -------------------------

    fn messages(&mut self, addr: Aaddr) -> Result<()> {
        if self.already_done(addr) {
            return Ok(());
        }
        for msg in self.table::<MessageEntry>(addr)? {
            self.stms(msg.stms)?;
        }
        Ok(())
    }

    fn dictionary(&mut self, addr: Aaddr) -> Result<()> {
        if self.already_done(addr) {
            return Ok(());
        }
        for entry in self.table::<DictionaryEntry>(addr)? {
            if entry.class_bits & WordClass::Synonym.bit() == 0 {
                self.table::<WordEntry>(entry.adjective_refs)?;
                self.table::<WordEntry>(entry.noun_refs)?;
                self.table::<WordEntry>(entry.pronoun_refs)?;
            }
        }
        Ok(())
    }

    fn checks(&mut self, addr: Aaddr) -> Result<()> {
        if self.already_done(addr) {
            return Ok(());
        }
        for check in self.table::<CheckEntry>(addr)? {
            self.stms(check.exp)?;
            self.stms(check.stms)?;
        }
        Ok(())
    }

    fn alternatives(&mut self, addr: Aaddr) -> Result<()> {
        if self.already_done(addr) {
            return Ok(());
        }
        for alt in self.table::<AltEntry>(addr)? {
            self.checks(alt.checks)?;
            self.stms(alt.action)?;
        }
        Ok(())
    }

    fn verbs(&mut self, addr: Aaddr) -> Result<()> {
        if self.already_done(addr) {
            return Ok(());
        }
        for verb in self.table::<VerbEntry>(addr)? {
            self.alternatives(verb.alts)?;
        }
        Ok(())
    }

    fn steps(&mut self, addr: Aaddr) -> Result<()> {
        if self.already_done(addr) {
            return Ok(());
        }
        for step in self.table::<StepEntry>(addr)? {
            self.stms(step.after)?;
            self.stms(step.exp)?;
            self.stms(step.stms)?;
        }
        Ok(())
    }

    fn scripts(&mut self, addr: Aaddr) -> Result<()> {
        if self.already_done(addr) {
            return Ok(());
        }
        for script in self.table::<ScriptEntry>(addr)? {
            self.stms(script.description)?;
            self.steps(script.steps)?;
        }
        Ok(())
    }

    fn exits(&mut self, addr: Aaddr) -> Result<()> {
        if self.already_done(addr) {
            return Ok(());
        }
        for exit in self.table::<ExitEntry>(addr)? {
            self.checks(exit.checks)?;
            self.stms(exit.action)?;
        }
        Ok(())
    }

    fn classes(&mut self, addr: Aaddr) -> Result<()> {
        if self.already_done(addr) {
            return Ok(());
        }
        for class in self.table::<ClassEntry>(addr)? {
            self.stms(class.name)?;
            self.stms(class.initialize)?;
            self.checks(class.description_checks)?;
            self.stms(class.description)?;
            self.stms(class.entered)?;
            self.stms(class.definite.address)?;
            self.stms(class.indefinite.address)?;
            self.stms(class.negative.address)?;
            self.stms(class.mentioned)?;
            self.verbs(class.verbs)?;
        }
        Ok(())
    }

    fn instances(&mut self, addr: Aaddr) -> Result<()> {
        if self.already_done(addr) {
            return Ok(());
        }
        for instance in self.table::<InstanceEntry>(addr)? {
            self.stms(instance.name)?;
            self.table::<AttributeEntry>(instance.initial_attributes)?;
            self.stms(instance.initialize)?;
            self.stms(instance.definite.address)?;
            self.stms(instance.indefinite.address)?;
            self.stms(instance.negative.address)?;
            self.stms(instance.mentioned)?;
            self.checks(instance.checks)?;
            self.stms(instance.description)?;
            self.verbs(instance.verbs)?;
            self.stms(instance.entered)?;
            self.exits(instance.exits)?;
        }
        Ok(())
    }

    fn restrictions(&mut self, addr: Aaddr) -> Result<()> {
        if self.already_done(addr) {
            return Ok(());
        }
        for restriction in self.table::<RestrictionEntry>(addr)? {
            self.stms(restriction.stms)?;
        }
        Ok(())
    }

    fn elements(&mut self, addr: Aaddr) -> Result<()> {
        if self.already_done(addr) {
            return Ok(());
        }
        for element in self.table::<ElementEntry>(addr)? {
            if element.code as Aword == END_OF_SYNTAX {
                self.restrictions(element.next)?;
            } else {
                self.elements(element.next)?;
            }
        }
        Ok(())
    }

    fn syntaxes(&mut self, addr: Aaddr) -> Result<()> {
        if self.already_done(addr) {
            return Ok(());
        }
        if self.version.is_pre_beta2() {
            for syntax in self.table::<PreBeta2SyntaxEntry>(addr)? {
                self.elements(syntax.elms)?;
            }
        } else {
            for syntax in self.table::<SyntaxEntry>(addr)? {
                self.elements(syntax.elms)?;
                self.table::<WordEntry>(syntax.parameter_name_table)?;
            }
        }
        Ok(())
    }

    fn parameter_map(&mut self, addr: Aaddr) -> Result<()> {
        if self.already_done(addr) {
            return Ok(());
        }
        for entry in self.table::<ParameterMapEntry>(addr)? {
            self.table::<WordEntry>(entry.parameter_mapping)?;
        }
        Ok(())
    }

    fn events(&mut self, addr: Aaddr) -> Result<()> {
        if self.already_done(addr) {
            return Ok(());
        }
        for event in self.table::<EventEntry>(addr)? {
            self.stms(event.code)?;
        }
        Ok(())
    }

    fn limits(&mut self, addr: Aaddr) -> Result<()> {
        if self.already_done(addr) {
            return Ok(());
        }
        for limit in self.table::<LimitEntry>(addr)? {
            self.stms(limit.stms)?;
        }
        Ok(())
    }

    fn containers(&mut self, addr: Aaddr) -> Result<()> {
        if self.already_done(addr) {
            return Ok(());
        }
        for container in self.table::<ContainerEntry>(addr)? {
            self.limits(container.limits)?;
            self.stms(container.header)?;
            self.stms(container.empty)?;
            self.checks(container.extract_checks)?;
            self.stms(container.extract_statements)?;
        }
        Ok(())
    }

    fn rules(&mut self, addr: Aaddr) -> Result<()> {
        if self.already_done(addr) {
            return Ok(());
        }
        for rule in self.table::<RuleEntry>(addr)? {
            self.stms(rule.exp)?;
            self.stms(rule.stms)?;
        }
        Ok(())
    }

    fn set_inits(&mut self, addr: Aaddr) -> Result<()> {
        if self.already_done(addr) {
            return Ok(());
        }
        for init in self.table::<SetInitEntry>(addr)? {
            self.table::<WordEntry>(init.set_address)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acode::Qualifier;
    use crate::testing::ImageBuilder;
    use crate::version::INTERPRETER_VERSION;
    use pretty_assertions::assert_eq;

    /// Words as they would be read on a host of the other byte order.
    fn foreign_words(file: &[u8]) -> (Vec<Aword>, Vec<Aword>) {
        let size = u32::from_be_bytes([file[12], file[13], file[14], file[15]]) as usize;
        let native: Vec<Aword> = file[..size * 4]
            .chunks_exact(4)
            .map(|w| u32::from_be_bytes([w[0], w[1], w[2], w[3]]))
            .collect();
        let foreign = native.iter().map(|w| w.swap_bytes()).collect();
        (native, foreign)
    }

    #[test]
    fn shared_tables_are_swapped_once() -> anyhow::Result<()> {
        let mut b = ImageBuilder::new();
        let room = b.location("room");
        b.hero_at(room);
        let button = b.object("button", room);
        let knob = b.object("knob", room);
        let code = b.print("Pressed.");
        let press = b.alternative(0, Qualifier::Default, &code);
        let turn = AltEntry { qual: Qualifier::After as Aword, ..press };
        let shared = b.verbs(&[(1, vec![press])]);
        b.instance_mut(button).verbs = shared;
        b.instance_mut(knob).verbs = shared;
        let global = b.verbs(&[(1, vec![press]), (2, vec![turn])]);
        b.global_verbs(global);
        let file = b.build();

        let (native, mut memory) = foreign_words(&file);
        let reversed = Reverser::new(&mut memory, INTERPRETER_VERSION).reverse_image()?;

        let action = press.action as usize;
        let verbs = shared as usize;
        assert!(reversed.contains(&action));
        assert!(reversed.contains(&verbs));
        assert_eq!(memory[verbs..verbs + VerbEntry::WORDS], native[verbs..verbs + VerbEntry::WORDS]);
        assert_eq!(memory[action..action + code.len() + 1], native[action..action + code.len() + 1]);
        for &index in &reversed {
            assert_eq!(memory[index], native[index], "word {}", index);
        }
        // Everything not reached, the tag included, keeps its on-disk bytes.
        assert_eq!(memory[0], native[0].swap_bytes());
        Ok(())
    }
}
