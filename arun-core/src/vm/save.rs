//! SAVE and RESTORE.
//!
//! A save file is the four byte magic followed by a bincode encoded
//! [`SaveGame`]. The host decides where the bytes live.

use bincode::Options;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::acode::{Aint, MsgKind};
use crate::error::{Result, Unwind};
use crate::host::Host;
use crate::vm::{Current, RuleState, Vm};
use crate::world::{AdminEntry, EventQueue};

pub const SAVE_MAGIC: [u8; 4] = *b"ASAV";
const DEFAULT_SAVE_FILE_NAME: &str = "alan.sav";

#[derive(Debug, Error)]
pub enum SaveFileError {
    #[error("missing save file magic")]
    BadMagic,
    #[error("malformed save file: {0}")]
    Malformed(#[from] bincode::Error),
}

/// The complete mutable state of a game in progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveGame {
    pub version: [u8; 4],
    pub uid: u32,
    pub current: Current,
    pub admin: Vec<AdminEntry>,
    pub events: EventQueue,
    pub scores: Vec<Aint>,
    pub rules: Vec<RuleState>,
}

fn bincode_opts() -> impl bincode::Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
        .reject_trailing_bytes()
}

impl SaveGame {
    pub fn to_bytes(&self) -> std::result::Result<Vec<u8>, SaveFileError> {
        let mut out = SAVE_MAGIC.to_vec();
        out.extend(bincode_opts().serialize(self)?);
        Ok(out)
    }

    pub fn from_bytes(bytes: &[u8]) -> std::result::Result<Self, SaveFileError> {
        match bytes.strip_prefix(&SAVE_MAGIC[..]) {
            Some(payload) => Ok(bincode_opts().deserialize(payload)?),
            None => Err(SaveFileError::BadMagic),
        }
    }
}

impl<H: Host> Vm<H> {
    pub fn set_save_file_name(&mut self, name: impl Into<String>) {
        self.save_file_name = name.into();
    }

    pub fn save_file_name(&self) -> &str {
        if self.save_file_name.is_empty() {
            DEFAULT_SAVE_FILE_NAME
        } else {
            &self.save_file_name
        }
    }

    pub fn capture_save_game(&self) -> SaveGame {
        let header = self.program.header();
        SaveGame {
            version: self.program.version().to_bytes(),
            uid: header.uid,
            current: self.current.clone(),
            admin: self.admin.clone(),
            events: self.events.clone(),
            scores: self.scores.clone(),
            rules: self.rules.clone(),
        }
    }

    /// Ask for a file name; an empty answer picks the previous one.
    fn ask_save_file_name(&mut self, prompt: MsgKind) -> Result<String> {
        self.print_message(prompt)?;
        let answer = self.host.read_line()?.unwrap_or_default();
        self.out.col = 1;
        let answer = answer.trim();
        if answer.is_empty() {
            Ok(self.save_file_name().to_string())
        } else {
            Ok(answer.to_string())
        }
    }

    pub fn save_game(&mut self) -> Result<()> {
        let name = self.ask_save_file_name(MsgKind::SaveWhere)?;
        if self.host.save_exists(&name) && !self.options.regression && !self.confirm(MsgKind::SaveOverwrite)? {
            return Err(Unwind::Abort);
        }

        let bytes = match self.capture_save_game().to_bytes() {
            Ok(bytes) => bytes,
            Err(e) => {
                log::error!("encoding save game: {}", e);
                return self.error(MsgKind::SaveFailed);
            }
        };
        if let Err(e) = self.host.write_save(&name, &bytes) {
            log::warn!("writing save file {}: {}", name, e);
            return self.error(MsgKind::SaveFailed);
        }
        log::info!("saved game to {} ({} bytes)", name, bytes.len());
        self.save_file_name = name;
        Ok(())
    }

    pub fn restore_game(&mut self) -> Result<()> {
        let name = self.ask_save_file_name(MsgKind::RestoreFrom)?;
        let bytes = match self.host.read_save(&name) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return self.error(MsgKind::SaveMissing),
            Err(e) => {
                log::warn!("reading save file {}: {}", name, e);
                return self.error(MsgKind::SaveMissing);
            }
        };
        self.save_file_name = name;

        let saved = match SaveGame::from_bytes(&bytes) {
            Ok(saved) => saved,
            Err(e) => {
                log::warn!("{}", e);
                return self.error(MsgKind::NotASaveFile);
            }
        };
        self.apply_save_game(saved)
    }

    /// Replace the world with a saved one, after checking that it was saved
    /// from this game.
    pub fn apply_save_game(&mut self, saved: SaveGame) -> Result<()> {
        if saved.version != self.program.version().to_bytes() {
            return self.error(MsgKind::SaveVers);
        }
        if saved.uid != self.program.header().uid {
            return self.error(MsgKind::SaveName);
        }
        if saved.admin.len() != self.admin.len() || saved.rules.len() != self.rules.len() {
            return self.error(MsgKind::NotASaveFile);
        }
        self.current = saved.current;
        self.admin = saved.admin;
        self.events = saved.events;
        self.scores = saved.scores;
        self.rules = saved.rules;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn rejects_missing_magic() {
        assert!(matches!(SaveGame::from_bytes(b"ALAN1234"), Err(SaveFileError::BadMagic)));
    }

    #[test]
    fn rejects_trailing_bytes() {
        let saved = SaveGame {
            version: [3, 0, 6, b'b'],
            uid: 42,
            current: Current::default(),
            admin: vec![AdminEntry::default(); 3],
            events: EventQueue::new(),
            scores: vec![5, 10],
            rules: vec![RuleState::default()],
        };
        let mut bytes = saved.to_bytes().unwrap();
        assert_eq!(&bytes[..4], b"ASAV");
        assert_eq!(SaveGame::from_bytes(&bytes).unwrap(), saved);

        bytes.push(0);
        assert!(matches!(SaveGame::from_bytes(&bytes), Err(SaveFileError::Malformed(_))));
    }
}
