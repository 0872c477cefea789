//! Image version handling.
//!
//! The version word is stored as four raw bytes `[major, minor, patch, state]`
//! where `state` is `b'a'`, `b'b'`, `b'd'` or 0 for a release. The bytes are
//! never byte-swapped. The `is_pre_*` predicates select between the layouts and
//! semantics that changed while 3.0 was in alpha and beta.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::VmError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
    pub state: u8,
}

/// Version of this interpreter: 3.0 beta 6.
pub const INTERPRETER_VERSION: Version = Version::new(3, 0, 6, b'b');

impl Version {
    pub const fn new(major: u8, minor: u8, patch: u8, state: u8) -> Self {
        Self { major, minor, patch, state }
    }

    pub fn from_bytes(bytes: [u8; 4]) -> Self {
        Self::new(bytes[0], bytes[1], bytes[2], bytes[3])
    }

    pub fn to_bytes(self) -> [u8; 4] {
        [self.major, self.minor, self.patch, self.state]
    }

    pub fn is_alpha(self) -> bool {
        self.state == b'a'
    }

    pub fn is_beta(self) -> bool {
        self.state == b'b'
    }

    pub fn is_development(self) -> bool {
        self.state == b'd'
    }

    fn is_3_0(self) -> bool {
        self.major == 3 && self.minor == 0
    }

    fn pre_alpha(self, patch: u8) -> bool {
        self.is_3_0() && self.is_alpha() && self.patch < patch
    }

    fn pre_beta(self, patch: u8) -> bool {
        self.is_3_0() && (self.is_alpha() || (self.is_beta() && self.patch < patch))
    }

    /// Shorter header without `ifids` and `prompt`.
    pub fn is_pre_alpha5(self) -> bool {
        self.pre_alpha(5)
    }

    /// Header without `prompt`, two-word syntax entries, rules re-evaluated
    /// inside events, level-triggered rules.
    pub fn is_pre_beta2(self) -> bool {
        self.pre_beta(2)
    }

    /// Literal value kept in attribute 1; `MAX_INSTANCE` includes the literal
    /// class instance.
    pub fn is_pre_beta3(self) -> bool {
        self.pre_beta(3)
    }

    /// Plain text for containment loops.
    pub fn is_pre_beta4(self) -> bool {
        self.pre_beta(4)
    }

    /// Old visit-counting policy.
    pub fn is_pre_beta5(self) -> bool {
        self.pre_beta(5)
    }

    fn state_name(self) -> &'static str {
        match self.state {
            b'a' => "alpha",
            b'b' => "beta",
            b'd' => "dev",
            _ => "",
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.state_name() {
            "" => write!(f, "{}.{}.{}", self.major, self.minor, self.patch),
            state => write!(f, "{}.{}{}{}", self.major, self.minor, state, self.patch),
        }
    }
}

/// Outcome of comparing a game version against the interpreter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compatibility {
    Compatible,
    /// Run, but tell the player first.
    Warn(String),
}

/// Decide whether `interpreter` may run a game of version `game`.
///
/// Development interpreters need an exact match of the first three bytes and
/// only run development games; everything else matches on major and minor.
/// With `ignore_errors` a mismatch is downgraded to a warning.
pub fn check_version(
    game: Version,
    interpreter: Version,
    ignore_errors: bool,
) -> std::result::Result<Compatibility, VmError> {
    let development = interpreter.is_development();
    let compare_len = if development { 3 } else { 2 };

    if game.is_development() && !development {
        return Err(VmError::App(format!(
            "Games generated by a development state compiler (this game is v{}) can only be run with a matching interpreter. Look for a game file generated with an alpha, beta or release state compiler.",
            game
        )));
    }

    if game.to_bytes()[..compare_len] != interpreter.to_bytes()[..compare_len] {
        if ignore_errors {
            return Ok(Compatibility::Warn(
                "<WARNING! Incompatible version of ACODE program.>$n".to_string(),
            ));
        }
        return Err(VmError::IncompatibleVersion {
            game: game.to_string(),
            interpreter: interpreter.to_string(),
        });
    }

    if development && !game.is_development() {
        return Err(VmError::IncompatibleVersion {
            game: game.to_string(),
            interpreter: interpreter.to_string(),
        });
    }

    if interpreter.is_alpha() && !game.is_alpha() {
        return Ok(Compatibility::Warn(
            "<WARNING! You are running an alpha interpreter, but the game is generated by a later state compiler which was released later. This might cause the game to not work fully as intended. Look for an upgraded game file.>$n"
                .to_string(),
        ));
    }

    Ok(Compatibility::Compatible)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn predicates_follow_release_order() {
        let alpha4 = Version::new(3, 0, 4, b'a');
        let beta1 = Version::new(3, 0, 1, b'b');
        let beta4 = Version::new(3, 0, 4, b'b');
        let release = Version::new(3, 0, 1, 0);

        assert!(alpha4.is_pre_alpha5());
        assert!(alpha4.is_pre_beta2());
        assert!(!beta1.is_pre_alpha5());
        assert!(beta1.is_pre_beta2());
        assert!(!beta4.is_pre_beta3());
        assert!(!beta4.is_pre_beta4());
        assert!(beta4.is_pre_beta5());
        assert!(!release.is_pre_beta5());
    }

    #[test]
    fn version_matching() {
        let beta = Version::new(3, 0, 2, b'b');
        assert_eq!(check_version(beta, INTERPRETER_VERSION, false).ok(), Some(Compatibility::Compatible));

        let old = Version::new(2, 8, 0, 0);
        assert!(check_version(old, INTERPRETER_VERSION, false).is_err());
        assert!(matches!(
            check_version(old, INTERPRETER_VERSION, true),
            Ok(Compatibility::Warn(_))
        ));

        let dev = Version::new(3, 0, 6, b'd');
        assert!(check_version(dev, INTERPRETER_VERSION, true).is_err());
        assert_eq!(check_version(dev, dev, false).ok(), Some(Compatibility::Compatible));
    }

    #[test]
    fn display() {
        assert_eq!(Version::new(3, 0, 6, b'b').to_string(), "3.0beta6");
        assert_eq!(Version::new(3, 1, 0, 0).to_string(), "3.1.0");
    }
}
