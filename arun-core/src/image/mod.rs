//! Loading `.a3c` images.
//!
//! The image is read in one piece. Words are kept in host order after the
//! reversal walk; the raw file bytes are kept as well because printed text is
//! read from the same file at `stringOffset`.

pub(crate) mod decode;
pub mod header;
pub mod records;
mod reverse;

use std::collections::BTreeSet;
use std::path::Path;

use byteorder::{BigEndian, ByteOrder};
use encoding_rs::WINDOWS_1252;

use crate::acode::{Aaddr, Aint, Aword, MsgKind, END_OF_TABLE, HEADER_WORDS};
use crate::error::VmError;
use crate::options::Options;
use crate::version::{check_version, Compatibility, Version, INTERPRETER_VERSION};

use self::header::{Header, HeaderShape};
use self::records::*;
use self::reverse::Reverser;

type Result<T> = std::result::Result<T, VmError>;

/// A loaded, byte-order normalized game image. Never modified after loading.
pub struct Program {
    file: Vec<u8>,
    memory: Vec<Aword>,
    header: Header,
    version: Version,
    reversed: BTreeSet<usize>,
    warnings: Vec<String>,
}

impl Program {
    pub fn load(path: impl AsRef<Path>, options: &Options) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| {
            VmError::Player(format!("Can't open adventure code file '{}': {}", path.display(), e))
        })?;
        Self::from_bytes(bytes, options)
    }

    pub fn from_bytes(file: Vec<u8>, options: &Options) -> Result<Self> {
        if file.len() < 8 || &file[..4] != b"ALAN" {
            return Err(VmError::NotAnAlanFile);
        }
        let version = Version::from_bytes([file[4], file[5], file[6], file[7]]);
        let mut warnings = Vec::new();
        if let Compatibility::Warn(text) = check_version(version, INTERPRETER_VERSION, options.ignore_errors)? {
            warnings.push(text);
        }

        let shape = HeaderShape::for_version(version);
        let mut header_words = vec![0; HEADER_WORDS];
        for (i, chunk) in file.chunks_exact(4).take(shape.words()).enumerate() {
            header_words[i] = BigEndian::read_u32(chunk);
        }
        let tmp = Header::from_shape(&header_words, shape);

        if tmp.size as usize <= HEADER_WORDS {
            return Err(VmError::TooSmall);
        }
        let size = tmp.size as usize;
        if file.len() < size * 4 {
            return Err(VmError::ShortRead);
        }

        let crc = checksum(&file[shape.words() * 4..size * 4]);
        if crc != tmp.acdcrc {
            let err = VmError::Checksum { computed: crc, expected: tmp.acdcrc };
            if !options.ignore_errors {
                return Err(err);
            }
            log::warn!("{}", err);
            warnings.push(format!("<WARNING! $${}$$ Ignored, proceed at your own risk.>$n", err));
        }

        let mut memory: Vec<Aword> = file[..size * 4]
            .chunks_exact(4)
            .map(|w| u32::from_ne_bytes([w[0], w[1], w[2], w[3]]))
            .collect();

        let reversed = if cfg!(target_endian = "little") {
            log::debug!("little-endian host, fixing byte ordering");
            Reverser::new(&mut memory, version).reverse_image()?
        } else {
            BTreeSet::new()
        };

        let header = Header::from_shape(&memory, shape);
        if header.pack != 0 && header.freq == 0 {
            return Err(VmError::EncodedText);
        }
        if header.instance_table_address == 0 {
            return Err(VmError::Sys("Instance table pointer == 0".to_string()));
        }
        if header.class_table_address == 0 {
            return Err(VmError::Sys("Class table pointer == 0".to_string()));
        }
        if options.debug {
            for (name, value) in header.fields() {
                log::debug!("{:<24} {:#x}", name, value);
            }
        }
        log::debug!("loaded {} words, version {}", memory.len(), version);

        Ok(Self { file, memory, header, version, reversed, warnings })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn mem_top(&self) -> Aaddr {
        self.memory.len() as Aaddr
    }

    pub fn memory(&self) -> &[Aword] {
        &self.memory
    }

    /// Indices of the words swapped by the byte-order walk.
    pub fn reversed_words(&self) -> &BTreeSet<usize> {
        &self.reversed
    }

    /// Loader warnings meant for the player; drained once.
    pub fn take_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }

    pub fn word(&self, addr: Aaddr) -> Option<Aword> {
        self.memory.get(addr as usize).copied()
    }

    // -------------------------
    // Tables
    // -------------------------

    pub fn record_at<R: Record>(&self, addr: Aaddr) -> Option<R> {
        let start = addr as usize;
        self.memory.get(start..start + R::WORDS).map(R::from_words)
    }

    /// Records of the table at `addr`, up to the end marker. Empty for address 0.
    pub fn table<R: Record>(&self, addr: Aaddr) -> Table<'_, R> {
        Table { memory: &self.memory, at: addr as usize, _record: std::marker::PhantomData }
    }

    fn indexed<R: Record>(&self, base: Aaddr, id: Aint, max: Aword) -> Option<R> {
        if base == 0 || id < 1 || id as Aword > max {
            return None;
        }
        self.record_at(base + (id as Aaddr - 1) * R::WORDS as Aaddr)
    }

    pub fn instance(&self, id: Aint) -> Option<InstanceEntry> {
        self.indexed(self.header.instance_table_address, id, self.header.instance_max)
    }

    pub fn class(&self, id: Aint) -> Option<ClassEntry> {
        self.indexed(self.header.class_table_address, id, self.header.class_max)
    }

    pub fn container(&self, id: Aint) -> Option<ContainerEntry> {
        self.indexed(self.header.container_table_address, id, self.header.container_max)
    }

    pub fn event(&self, id: Aint) -> Option<EventEntry> {
        self.indexed(self.header.event_table_address, id, self.header.event_max)
    }

    pub fn script(&self, code: Aint) -> Option<ScriptEntry> {
        self.table::<ScriptEntry>(self.header.script_table_address).find(|s| s.code == code)
    }

    pub fn message(&self, msg: MsgKind) -> Option<MessageEntry> {
        self.table::<MessageEntry>(self.header.message_table_address).nth(msg as usize)
    }

    pub fn dictionary_entry(&self, index: usize) -> Option<DictionaryEntry> {
        self.table::<DictionaryEntry>(self.header.dictionary).nth(index)
    }

    /// Parent chain of a class, from `class` up to the root.
    pub fn class_chain(&self, class: Aint) -> ClassChain<'_> {
        ClassChain { program: self, next: class, steps: 0 }
    }

    // -------------------------
    // Strings
    // -------------------------

    /// NUL-terminated string stored in the word memory.
    pub fn string_at(&self, addr: Aaddr) -> String {
        let mut bytes = Vec::new();
        'words: for word in self.memory.iter().skip(addr as usize) {
            for b in word.to_ne_bytes() {
                if b == 0 {
                    break 'words;
                }
                bytes.push(b);
            }
        }
        decode_iso(&bytes)
    }

    /// Text of the dictionary word at `index`.
    pub fn word_string(&self, index: usize) -> Option<String> {
        self.dictionary_entry(index).map(|entry| self.string_at(entry.string))
    }

    /// `len` characters of text at `fpos` relative to the string area of the
    /// file. Packed images code each text with the frequency table.
    pub fn text(&self, fpos: Aword, len: Aword) -> Result<String> {
        let start = (self.header.string_offset as usize).saturating_add(fpos as usize);
        if self.header.pack != 0 {
            let freq_start = self.header.freq as usize;
            let Some(freq) = self.memory.get(freq_start..freq_start + decode::SYMBOLS + 1) else {
                return Err(VmError::EncodedText);
            };
            let bytes = self.file.get(start..).unwrap_or_default();
            return Ok(decode_iso(&decode::decode(freq, bytes, len as usize)?));
        }
        let end = start.saturating_add(len as usize).min(self.file.len());
        if start >= end {
            return Ok(String::new());
        }
        Ok(decode_iso(&self.file[start..end]))
    }
}

/// Byte sum of every word.
pub fn checksum(bytes: &[u8]) -> Aword {
    bytes.iter().fold(0u32, |crc, b| crc.wrapping_add(*b as u32))
}

fn decode_iso(bytes: &[u8]) -> String {
    let (text, _, _) = WINDOWS_1252.decode(bytes);
    text.into_owned()
}

pub struct Table<'a, R> {
    memory: &'a [Aword],
    at: usize,
    _record: std::marker::PhantomData<R>,
}

impl<R: Record> Iterator for Table<'_, R> {
    type Item = R;

    fn next(&mut self) -> Option<R> {
        if self.at == 0 {
            return None;
        }
        let first = *self.memory.get(self.at)?;
        if first == END_OF_TABLE {
            return None;
        }
        let words = self.memory.get(self.at..self.at + R::WORDS)?;
        self.at += R::WORDS;
        Some(R::from_words(words))
    }
}

pub struct ClassChain<'a> {
    program: &'a Program,
    next: Aint,
    steps: usize,
}

impl Iterator for ClassChain<'_> {
    type Item = (Aint, ClassEntry);

    fn next(&mut self) -> Option<Self::Item> {
        // A malformed image could make the chain cyclic.
        if self.next == 0 || self.steps > self.program.header.class_max as usize {
            return None;
        }
        let id = self.next;
        let class = self.program.class(id)?;
        self.next = class.parent;
        self.steps += 1;
        Some((id, class))
    }
}
