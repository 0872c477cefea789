//! Developer-facing utilities: assembling small `.a3c` images in memory and a
//! host that plays canned input.
//!
//! This is a module of the library so integration tests and the runner can
//! share it.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::io;

use anyhow::{Context, Result};
use num_traits::FromPrimitive;

use crate::acode::{
    constant, curvar, stm, Aaddr, Aint, Aword, CurVar, MsgKind, Qualifier, SayForm, StmOp, Style, Transitivity, WordClass,
    END_OF_TABLE, HEADER_WORDS, OPAQUE_ATTRIBUTE, RETURN_WORD, VISITS_ATTRIBUTE,
};
use crate::host::{Command, Host, ParseContext, PlayerInput};
use crate::image::checksum;
use crate::image::decode::{HALF, ONE_QUARTER, SYMBOLS, THREE_QUARTERS, TOP_VALUE};
use crate::image::header::{Header, HeaderShape};
use crate::image::records::*;
use crate::image::Program;
use crate::options::Options;
use crate::version::{Version, INTERPRETER_VERSION};

// -------------------------
// Predefined ids
// -------------------------

pub const ENTITY: Aint = 1;
pub const THING: Aint = 2;
pub const OBJECT: Aint = 3;
pub const LOCATION: Aint = 4;
pub const ACTOR: Aint = 5;
pub const LITERAL: Aint = 6;
pub const INTEGER: Aint = 7;
pub const STRING: Aint = 8;

/// The `nowhere` location and the hero are always instances 1 and 2.
pub const NOWHERE_INSTANCE: Aint = 1;
pub const HERO: Aint = 2;

// -------------------------
// Instruction helpers
// -------------------------

pub fn push(value: Aint) -> Aword {
    constant(value)
}

pub fn op(op: StmOp) -> Aword {
    stm(op)
}

pub fn var(var: CurVar) -> Aword {
    curvar(var)
}

/// `LOCATE id AT whr`.
pub fn locate(id: Aint, whr: Aint) -> Vec<Aword> {
    vec![push(whr), push(id), op(StmOp::Locate)]
}

/// `SET id:atr TO value` for an integer value.
pub fn set_attribute(id: Aint, atr: Aint, value: Aint) -> Vec<Aword> {
    vec![push(value), push(id), push(atr), op(StmOp::Set)]
}

/// Push the integer attribute `atr` of `id`.
pub fn attribute(id: Aint, atr: Aint) -> Vec<Aword> {
    vec![push(id), push(atr), op(StmOp::Attribute)]
}

/// `INCREASE id:atr`.
pub fn increase(id: Aint, atr: Aint) -> Vec<Aword> {
    let mut code = attribute(id, atr);
    code.extend([push(1), op(StmOp::Incr), push(id), push(atr), op(StmOp::Set)]);
    code
}

pub fn say(id: Aint) -> Vec<Aword> {
    vec![push(id), push(SayForm::Simple as Aint), op(StmOp::Say)]
}

pub fn schedule(event: Aint, whr: Aint, after: Aint) -> Vec<Aword> {
    vec![push(after), push(whr), push(event), op(StmOp::Schedule)]
}

pub fn use_script(actor: Aint, script: Aint) -> Vec<Aword> {
    vec![push(script), push(actor), op(StmOp::Use)]
}

pub fn visits(count: Aint) -> Vec<Aword> {
    vec![push(count), op(StmOp::Visits)]
}

/// Push whether `id` is directly at the current location.
pub fn here(id: Aint) -> Vec<Aword> {
    vec![push(id), push(Transitivity::Direct as Aint), op(StmOp::Here)]
}

// -------------------------
// Image builder
// -------------------------

#[derive(Debug, Clone, Default)]
struct InstanceSpec {
    entry: InstanceEntry,
    attributes: Vec<(Aint, Aword)>,
}

/// Assembles a big-endian game image from tables and statement streams.
///
/// Statement streams and tables are laid out as they are added; the class,
/// instance and other indexed tables are written by [`ImageBuilder::build`].
/// Every message gets a plain default text unless overridden.
pub struct ImageBuilder {
    version: Version,
    memory: Vec<Aword>,
    text: Vec<u8>,
    packed: bool,
    header: Header,
    classes: Vec<ClassEntry>,
    instances: Vec<InstanceSpec>,
    containers: Vec<ContainerEntry>,
    scripts: Vec<ScriptEntry>,
    events: Vec<EventEntry>,
    rules: Vec<RuleEntry>,
    dictionary: Vec<(String, Aword, Aint)>,
    messages: BTreeMap<usize, Aaddr>,
    scores: Vec<Aword>,
    string_inits: Vec<StringInitEntry>,
    set_inits: Vec<(Aint, Aint, Vec<Aword>)>,
}

impl Default for ImageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageBuilder {
    pub fn new() -> Self {
        Self::with_text_packing(false)
    }

    /// An image whose texts are arithmetic-coded with [`text_frequencies`].
    pub fn packed() -> Self {
        Self::with_text_packing(true)
    }

    fn with_text_packing(packed: bool) -> Self {
        let mut builder = Self {
            version: INTERPRETER_VERSION,
            memory: vec![0; HEADER_WORDS],
            text: Vec::new(),
            packed,
            header: Header::default(),
            classes: Vec::new(),
            instances: Vec::new(),
            containers: Vec::new(),
            scripts: Vec::new(),
            events: Vec::new(),
            rules: Vec::new(),
            dictionary: Vec::new(),
            messages: BTreeMap::new(),
            scores: Vec::new(),
            string_inits: Vec::new(),
            set_inits: Vec::new(),
        };
        for (parent, name) in [
            (0, "entity"),
            (ENTITY, "thing"),
            (THING, "object"),
            (ENTITY, "location"),
            (THING, "actor"),
            (ENTITY, "literal"),
            (LITERAL, "integer"),
            (LITERAL, "string"),
        ] {
            builder.class(parent, name);
        }
        let the = builder.print_stms("the");
        let a = builder.print_stms("a");
        let no = builder.print_stms("no");
        let entity = builder.class_mut(ENTITY);
        entity.definite = Article { address: the, is_form: false };
        entity.indefinite = Article { address: a, is_form: false };
        entity.negative = Article { address: no, is_form: false };
        builder.instance(LOCATION, "nowhere");
        builder.instance(ACTOR, "hero");
        builder
    }

    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    // -------------------------
    // Raw memory
    // -------------------------

    fn here(&self) -> Aaddr {
        self.memory.len() as Aaddr
    }

    /// Append a statement stream, adding the final RETURN.
    pub fn stms(&mut self, code: &[Aword]) -> Aaddr {
        let addr = self.here();
        self.memory.extend_from_slice(code);
        self.memory.push(RETURN_WORD);
        addr
    }

    /// Append a table of records with its end marker.
    pub fn table<R: Record>(&mut self, records: &[R]) -> Aaddr {
        let addr = self.here();
        for record in records {
            record.put(&mut self.memory);
        }
        self.memory.push(END_OF_TABLE);
        addr
    }

    /// Append a NUL-terminated string to the word memory.
    pub fn string(&mut self, text: &str) -> Aaddr {
        let addr = self.here();
        let mut bytes = text.as_bytes().to_vec();
        bytes.push(0);
        while bytes.len() % 4 != 0 {
            bytes.push(0);
        }
        for chunk in bytes.chunks_exact(4) {
            self.memory.push(u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
        }
        addr
    }

    /// Put `text` in the string area and return its position and length.
    pub fn text(&mut self, text: &str) -> (Aint, Aint) {
        let fpos = self.text.len() as Aint;
        if self.packed {
            self.text.extend(pack_text(&text_frequencies(), text.as_bytes()));
        } else {
            self.text.extend_from_slice(text.as_bytes());
        }
        (fpos, text.len() as Aint)
    }

    /// Instructions printing `text`.
    pub fn print(&mut self, text: &str) -> Vec<Aword> {
        let (fpos, len) = self.text(text);
        vec![push(len), push(fpos), op(StmOp::Print)]
    }

    /// A statement stream that only prints `text`.
    pub fn print_stms(&mut self, text: &str) -> Aaddr {
        let code = self.print(text);
        self.stms(&code)
    }

    /// A check table with a single check.
    pub fn check(&mut self, exp: &[Aword], fail_text: &str) -> Aaddr {
        let exp = self.stms(exp);
        let stms = self.print_stms(fail_text);
        self.table(&[CheckEntry { exp, stms }])
    }

    // -------------------------
    // Classes and instances
    // -------------------------

    pub fn class(&mut self, parent: Aint, name: &str) -> Aint {
        let id = self.classes.len() as Aint + 1;
        let name = self.print_stms(name);
        self.classes.push(ClassEntry { code: id, parent, name, ..Default::default() });
        id
    }

    pub fn class_mut(&mut self, id: Aint) -> &mut ClassEntry {
        &mut self.classes[id as usize - 1]
    }

    /// Add an instance with the predefined attributes and a name printing
    /// `name`.
    pub fn instance(&mut self, parent: Aint, name: &str) -> Aint {
        let id = self.instances.len() as Aint + 1;
        let name = self.print_stms(name);
        self.instances.push(InstanceSpec {
            entry: InstanceEntry { code: id, parent, name, ..Default::default() },
            attributes: vec![(OPAQUE_ATTRIBUTE, 0), (VISITS_ATTRIBUTE, 0)],
        });
        id
    }

    pub fn instance_mut(&mut self, id: Aint) -> &mut InstanceEntry {
        &mut self.instances[id as usize - 1].entry
    }

    pub fn location(&mut self, name: &str) -> Aint {
        self.instance(LOCATION, name)
    }

    pub fn object(&mut self, name: &str, at: Aint) -> Aint {
        let id = self.instance(OBJECT, name);
        self.instance_mut(id).initial_location = at;
        id
    }

    pub fn actor(&mut self, name: &str, at: Aint) -> Aint {
        let id = self.instance(ACTOR, name);
        self.instance_mut(id).initial_location = at;
        id
    }

    pub fn hero_at(&mut self, location: Aint) {
        self.instance_mut(HERO).initial_location = location;
    }

    pub fn describe(&mut self, id: Aint, text: &str) {
        let description = self.print_stms(text);
        self.instance_mut(id).description = description;
    }

    /// Declare an integer attribute with its initial value.
    pub fn attribute(&mut self, id: Aint, code: Aint, value: Aint) {
        let attributes = &mut self.instances[id as usize - 1].attributes;
        match attributes.iter_mut().find(|(c, _)| *c == code) {
            Some(slot) => slot.1 = value as Aword,
            None => attributes.push((code, value as Aword)),
        }
    }

    /// Declare a string attribute initialised to `value`.
    pub fn string_attribute(&mut self, id: Aint, code: Aint, value: &str) {
        self.attribute(id, code, 0);
        let (fpos, len) = self.text(value);
        self.string_inits.push(StringInitEntry {
            fpos: fpos as Aword,
            len: len as Aword,
            instance_code: id,
            attribute_code: code,
        });
    }

    /// Declare a set attribute initialised to `members`.
    pub fn set_attribute(&mut self, id: Aint, code: Aint, members: &[Aint]) {
        self.attribute(id, code, 0);
        self.set_inits.push((id, code, members.iter().map(|m| *m as Aword).collect()));
    }

    /// Make `owner` a container taking instances of `class`.
    pub fn container(&mut self, owner: Aint, class: Aint) -> Aint {
        let id = self.containers.len() as Aint + 1;
        self.containers.push(ContainerEntry { owner, class, ..Default::default() });
        self.instance_mut(owner).container = id;
        id
    }

    pub fn container_mut(&mut self, id: Aint) -> &mut ContainerEntry {
        &mut self.containers[id as usize - 1]
    }

    // -------------------------
    // Verbs, exits, words
    // -------------------------

    /// A verb table with one entry per `(verb, alternatives)`.
    pub fn verbs(&mut self, verbs: &[(Aint, Vec<AltEntry>)]) -> Aaddr {
        let entries: Vec<VerbEntry> = verbs
            .iter()
            .map(|(code, alts)| VerbEntry { code: *code, alts: self.table(alts) })
            .collect();
        self.table(&entries)
    }

    /// An alternative running `action`.
    pub fn alternative(&mut self, param: Aint, qual: Qualifier, action: &[Aword]) -> AltEntry {
        AltEntry { param, qual: qual as Aword, checks: 0, action: self.stms(action) }
    }

    pub fn global_verbs(&mut self, verbs: Aaddr) {
        self.header.verb_table_address = verbs;
    }

    pub fn exits(&mut self, location: Aint, exits: &[ExitEntry]) {
        let table = self.table(exits);
        self.instance_mut(location).exits = table;
    }

    /// Add a dictionary word and return its index.
    pub fn word(&mut self, text: &str, class: WordClass, code: Aint) -> usize {
        self.dictionary.push((text.to_string(), class.bit(), code));
        self.dictionary.len() - 1
    }

    // -------------------------
    // Scheduling
    // -------------------------

    pub fn event(&mut self, code: &[Aword]) -> Aint {
        let code = self.stms(code);
        self.events.push(EventEntry { id: 0, code });
        self.events.len() as Aint
    }

    /// A script for actors; `steps` are `(after, condition, statements)`
    /// code, empty for none.
    pub fn script(&mut self, code: Aint, steps: &[(Vec<Aword>, Vec<Aword>, Vec<Aword>)]) -> Aint {
        let entries: Vec<StepEntry> = steps
            .iter()
            .map(|(after, exp, stms)| StepEntry {
                after: if after.is_empty() { 0 } else { self.stms(after) },
                exp: if exp.is_empty() { 0 } else { self.stms(exp) },
                stms: self.stms(stms),
            })
            .collect();
        let steps = self.table(&entries);
        self.scripts.push(ScriptEntry { code, id: 0, description: 0, steps });
        code
    }

    pub fn rule(&mut self, exp: &[Aword], stms: &[Aword]) {
        let exp = self.stms(exp);
        let stms = self.stms(stms);
        self.rules.push(RuleEntry { already_run: 0, exp, stms });
    }

    /// Add a score entry and return its 1-based number.
    pub fn score(&mut self, points: Aint) -> Aint {
        self.scores.push(points as Aword);
        self.header.maximum_score += points as Aword;
        self.scores.len() as Aint
    }

    pub fn start(&mut self, code: &[Aword]) {
        self.header.start = self.stms(code);
    }

    pub fn prompt(&mut self, code: &[Aword]) {
        self.header.prompt = self.stms(code);
    }

    pub fn message(&mut self, msg: MsgKind, text: &str) {
        let stms = self.print_stms(text);
        self.messages.insert(msg as usize, stms);
    }

    // -------------------------
    // Output
    // -------------------------

    /// Lay out the remaining tables and return the image file.
    pub fn build(mut self) -> Vec<u8> {
        for index in 0..MsgKind::NoMsg as usize {
            if !self.messages.contains_key(&index) {
                if let Some(msg) = MsgKind::from_usize(index) {
                    let stms = self.print_stms(default_message(msg));
                    self.messages.insert(index, stms);
                }
            }
        }
        let messages: Vec<MessageEntry> = self.messages.values().map(|stms| MessageEntry { stms: *stms }).collect();
        self.header.message_table_address = self.table(&messages);

        let mut area_size = 0;
        let mut instances = Vec::with_capacity(self.instances.len());
        for spec in std::mem::take(&mut self.instances) {
            let attributes: Vec<AttributeEntry> =
                spec.attributes.iter().map(|(code, value)| AttributeEntry { code: *code, value: *value, id: 0 }).collect();
            area_size += attributes.len() * 3 + 1;
            let mut entry = spec.entry;
            entry.initial_attributes = self.table(&attributes);
            instances.push(entry);
        }

        let mut dictionary = Vec::with_capacity(self.dictionary.len());
        for (text, class_bits, code) in std::mem::take(&mut self.dictionary) {
            dictionary.push(DictionaryEntry {
                string: self.string(&text),
                class_bits,
                code,
                noun_refs: self.word_refs(class_bits, WordClass::Noun, code),
                adjective_refs: self.word_refs(class_bits, WordClass::Adjective, code),
                ..Default::default()
            });
        }
        let set_inits: Vec<SetInitEntry> = std::mem::take(&mut self.set_inits)
            .into_iter()
            .map(|(instance_code, attribute_code, members)| SetInitEntry {
                size: members.len() as Aword,
                set_address: self.table(&members.into_iter().map(WordEntry).collect::<Vec<_>>()),
                instance_code,
                attribute_code,
            })
            .collect();
        let scores: Vec<WordEntry> = self.scores.iter().copied().map(WordEntry).collect();

        let classes = std::mem::take(&mut self.classes);
        let containers = std::mem::take(&mut self.containers);
        let scripts = std::mem::take(&mut self.scripts);
        let events = std::mem::take(&mut self.events);
        let rules = std::mem::take(&mut self.rules);
        let string_inits = std::mem::take(&mut self.string_inits);

        let h = &mut self.header;
        h.class_max = classes.len() as Aword;
        h.instance_max = instances.len() as Aword;
        h.container_max = containers.len() as Aword;
        h.script_max = scripts.len() as Aword;
        h.event_max = events.len() as Aword;
        h.score_count = scores.len() as Aword;
        h.attributes_area_size = area_size as Aword;
        h.the_hero = HERO as Aword;
        h.entity_class_id = ENTITY as Aword;
        h.thing_class_id = THING as Aword;
        h.object_class_id = OBJECT as Aword;
        h.location_class_id = LOCATION as Aword;
        h.actor_class_id = ACTOR as Aword;
        h.literal_class_id = LITERAL as Aword;
        h.integer_class_id = INTEGER as Aword;
        h.string_class_id = STRING as Aword;
        h.max_parameters = 9;

        self.header.class_table_address = self.table(&classes);
        self.header.instance_table_address = self.table(&instances);
        self.header.container_table_address = self.table(&containers);
        self.header.script_table_address = self.table(&scripts);
        self.header.event_table_address = self.table(&events);
        self.header.rule_table_address = self.table(&rules);
        self.header.dictionary = self.table(&dictionary);
        self.header.string_init_table = self.table(&string_inits);
        self.header.set_init_table = self.table(&set_inits);
        self.header.scores = self.table(&scores);
        if self.packed {
            self.header.pack = 1;
            self.header.freq = self.table(&text_frequencies().into_iter().map(WordEntry).collect::<Vec<_>>());
        }

        let shape = HeaderShape::for_version(self.version);
        let body: Vec<u8> = self.memory[shape.words()..].iter().flat_map(|w| w.to_be_bytes()).collect();
        self.header.acdcrc = checksum(&body);
        self.header.tag = u32::from_be_bytes(*b"ALAN");
        self.header.version = u32::from_be_bytes(self.version.to_bytes());
        self.header.size = self.memory.len() as Aword;
        self.header.string_offset = self.header.size * 4;
        for (i, word) in self.header.to_words().into_iter().take(shape.words()).enumerate() {
            self.memory[i] = word;
        }

        let mut file: Vec<u8> = self.memory.iter().flat_map(|w| w.to_be_bytes()).collect();
        file.extend_from_slice(&self.text);
        file
    }

    /// Nouns and adjectives refer to the instance given as their code.
    fn word_refs(&mut self, class_bits: Aword, class: WordClass, code: Aint) -> Aaddr {
        if class_bits & class.bit() != 0 {
            self.table(&[WordEntry(code as Aword)])
        } else {
            0
        }
    }

    pub fn program(self, options: &Options) -> Result<Program> {
        Program::from_bytes(self.build(), options).context("load assembled image")
    }
}

// -------------------------
// Packed text
// -------------------------

/// Cumulative frequencies favouring printable ASCII. Every character can be
/// coded.
pub fn text_frequencies() -> Vec<Aword> {
    let mut freq = vec![0; SYMBOLS + 1];
    for symbol in (1..=SYMBOLS).rev() {
        let weight = if (32..127).contains(&(symbol - 1)) { 16 } else { 1 };
        freq[symbol - 1] = freq[symbol] + weight;
    }
    freq
}

#[derive(Default)]
struct BitWriter {
    bytes: Vec<u8>,
    buffer: u8,
    bits: u32,
    follow: u32,
}

impl BitWriter {
    fn bit(&mut self, bit: u8) {
        self.buffer |= bit << self.bits;
        self.bits += 1;
        if self.bits == 8 {
            self.bytes.push(self.buffer);
            self.buffer = 0;
            self.bits = 0;
        }
    }

    fn bit_plus_follow(&mut self, bit: u8) {
        self.bit(bit);
        while self.follow > 0 {
            self.bit(1 - bit);
            self.follow -= 1;
        }
    }

    fn finish(mut self) -> Vec<u8> {
        if self.bits > 0 {
            self.bytes.push(self.buffer);
        }
        self.bytes
    }
}

/// Arithmetic-code `text` so that the loader decodes it with `freq`.
pub fn pack_text(freq: &[Aword], text: &[u8]) -> Vec<u8> {
    let total = freq[0] as i64;
    let mut out = BitWriter::default();
    let (mut low, mut high) = (0, TOP_VALUE);
    for &c in text {
        let symbol = c as usize + 1;
        let range = high - low + 1;
        high = low + range * freq[symbol - 1] as i64 / total - 1;
        low += range * freq[symbol] as i64 / total;
        loop {
            if high < HALF {
                out.bit_plus_follow(0);
            } else if low >= HALF {
                out.bit_plus_follow(1);
                low -= HALF;
                high -= HALF;
            } else if low >= ONE_QUARTER && high < THREE_QUARTERS {
                out.follow += 1;
                low -= ONE_QUARTER;
                high -= ONE_QUARTER;
            } else {
                break;
            }
            low *= 2;
            high = 2 * high + 1;
        }
    }
    out.follow += 1;
    out.bit_plus_follow(if low < ONE_QUARTER { 0 } else { 1 });
    out.finish()
}

/// Plain English defaults for the messages the machine prints.
pub fn default_message(msg: MsgKind) -> &'static str {
    match msg {
        MsgKind::UnknownWord => "I don't know that word.",
        MsgKind::What => "I don't understand.",
        MsgKind::WhatWord => "I don't know what you mean.",
        MsgKind::Multiple => "You can't refer to multiple objects with that verb.",
        MsgKind::Noun => "You must supply a noun.",
        MsgKind::AfterBut => "You must give at least one object after 'but'.",
        MsgKind::ButAll => "You can only use 'but' after 'all'.",
        MsgKind::NotMuch => "That doesn't leave much to do.",
        MsgKind::WhichOneStart => "I don't know if you mean $+1",
        MsgKind::WhichOneComma => ", $+1",
        MsgKind::WhichOneOr => "or $+1.",
        MsgKind::NoSuch => "I can't see any $1 here.",
        MsgKind::NoWay => "You can't go that way.",
        MsgKind::Cant0 => "You can't do that.",
        MsgKind::SeeStart => "There is $01",
        MsgKind::SeeComma => ", $01",
        MsgKind::SeeAnd => "and $01",
        MsgKind::SeeEnd => "here.",
        MsgKind::Contains => "$+1 contains",
        MsgKind::Carries => "$+1 carries",
        MsgKind::ContainsComma => "$01$$,",
        MsgKind::ContainsAnd => "$01 and",
        MsgKind::ContainsEnd => "$01$$.",
        MsgKind::Empty => "$+1 is empty.",
        MsgKind::EmptyHanded => "$+1 is empty-handed.",
        MsgKind::CannotContain => "$+1 can not contain $+2.",
        MsgKind::Score => "You have scored $1 points out of $2.",
        MsgKind::More => "<More>",
        MsgKind::Again => "(again)",
        MsgKind::SaveWhere => "Enter file name to save in:",
        MsgKind::SaveOverwrite => "That file already exists, overwrite (y)?",
        MsgKind::SaveFailed => "Sorry, save failed.",
        MsgKind::RestoreFrom => "Enter file name to restore from:",
        MsgKind::SaveMissing => "Sorry, could not open the save file.",
        MsgKind::NotASaveFile => "Sorry, that is not a save file.",
        MsgKind::SaveVers => "Sorry, the save file was created by another version.",
        MsgKind::SaveName => "Sorry, the save file is for another game.",
        MsgKind::Really => "Are you sure (RETURN confirms)?",
        MsgKind::QuitAction => "Do you want to RESTART, RESTORE, QUIT or UNDO?",
        MsgKind::Undone => "'$1' undone.",
        MsgKind::NoUndo => "No further undo available.",
        MsgKind::WhichPronounStart => "I'm not sure which",
        MsgKind::WhichPronounFirst => "you mean by $1",
        MsgKind::ImpossibleWith => "That's impossible with $+1.",
        MsgKind::ContainmentLoop => "Putting $+1 in itself is impossible.",
        MsgKind::ContainmentLoop2 => "Putting $+1 in $+2 is impossible since $+2 already is inside $+1.",
        MsgKind::NoMsg => "",
    }
}

// -------------------------
// Scripted host
// -------------------------

/// A host fed with prepared commands and answers that records everything
/// printed. Save files are kept in memory.
#[derive(Debug, Default)]
pub struct ScriptedHost {
    commands: VecDeque<PlayerInput>,
    lines: VecDeque<String>,
    output: String,
    pub saves: HashMap<String, Vec<u8>>,
    pub styles: Vec<Style>,
    pub system_commands: Vec<String>,
    /// The `present` list of every parse, in order.
    pub seen: Vec<Vec<Aint>>,
}

impl ScriptedHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_command(mut self, text: &str, command: Command) -> Self {
        self.commands.push_back(PlayerInput::new(text, command));
        self
    }

    pub fn with_line(mut self, line: &str) -> Self {
        self.lines.push_back(line.to_string());
        self
    }

    pub fn push_command(&mut self, text: &str, command: Command) {
        self.commands.push_back(PlayerInput::new(text, command));
    }

    pub fn push_line(&mut self, line: &str) {
        self.lines.push_back(line.to_string());
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    /// Everything printed since the last call.
    pub fn take_output(&mut self) -> String {
        std::mem::take(&mut self.output)
    }
}

impl Host for ScriptedHost {
    fn print(&mut self, text: &str) {
        self.output.push_str(text);
    }

    fn set_style(&mut self, style: Style) {
        self.styles.push(style);
    }

    fn system(&mut self, command: &str) {
        self.system_commands.push(command.to_string());
    }

    fn read_line(&mut self) -> io::Result<Option<String>> {
        Ok(self.lines.pop_front())
    }

    fn read_command(&mut self, context: &ParseContext<'_>) -> io::Result<PlayerInput> {
        self.seen.push(context.present.to_vec());
        Ok(self.commands.pop_front().unwrap_or_else(|| PlayerInput::new("", Command::EndOfInput)))
    }

    fn save_exists(&mut self, name: &str) -> bool {
        self.saves.contains_key(name)
    }

    fn write_save(&mut self, name: &str, data: &[u8]) -> io::Result<()> {
        self.saves.insert(name.to_string(), data.to_vec());
        Ok(())
    }

    fn read_save(&mut self, name: &str) -> io::Result<Option<Vec<u8>>> {
        Ok(self.saves.get(name).cloned())
    }
}
