//! The seam between the virtual machine and whatever runs it: a console, a
//! test harness or a GUI front end.

use std::io;

use crate::acode::{Aint, Style};
use crate::image::Program;

/// What a parameter position was bound to by the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterValue {
    Instance(Aint),
    /// A number typed by the player; becomes an integer literal.
    Integer(Aint),
    /// A quoted string typed by the player; becomes a string literal.
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedParameter {
    pub value: ParameterValue,
    /// Dictionary indices of the words the player used for it.
    pub words: Vec<usize>,
    /// Say the parameter with the player's words instead of its name.
    pub use_words: bool,
}

impl ParsedParameter {
    pub fn instance(instance: Aint) -> Self {
        Self { value: ParameterValue::Instance(instance), words: Vec::new(), use_words: false }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    Single(ParsedParameter),
    /// ALL, THEM or an explicit list; the verb runs once per member.
    Multiple(Vec<ParsedParameter>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Action {
        verb: Aint,
        /// Dictionary index of the verb word, for `$v`.
        verb_word: Option<usize>,
        parameters: Vec<Binding>,
    },
    /// A bare direction word.
    Go { direction: Aint },
    Undo,
    /// Empty input: the hero forfeits the turn.
    Empty,
    /// Input is exhausted; ends the session.
    EndOfInput,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerInput {
    /// The line as typed, remembered for UNDO narration.
    pub text: String,
    pub command: Command,
}

impl PlayerInput {
    pub fn new(text: impl Into<String>, command: Command) -> Self {
        Self { text: text.into(), command }
    }
}

/// Everything the parser may look at when resolving a command.
pub struct ParseContext<'a> {
    pub program: &'a Program,
    pub location: Aint,
    /// Instances the hero can refer to, ascending by id.
    pub present: &'a [Aint],
}

/// Services the virtual machine needs from its environment.
///
/// Only text output and the two input calls are mandatory; multimedia and
/// transcript hooks default to doing nothing.
pub trait Host {
    /// Write already formatted text. Newlines arrive as `"\n"`.
    fn print(&mut self, text: &str);

    fn set_style(&mut self, _style: Style) {}

    fn show_image(&mut self, _image: Aint, _align: Aint) {}

    fn play_sound(&mut self, _sound: Aint) {}

    fn start_transcript(&mut self) {}

    fn stop_transcript(&mut self) {}

    /// Run a host command for the `SYSTEM` statement.
    fn system(&mut self, _command: &str) {}

    /// Read a raw line, for confirmations and file names. `None` at end of input.
    fn read_line(&mut self) -> io::Result<Option<String>>;

    /// Read and parse the next player command.
    fn read_command(&mut self, context: &ParseContext<'_>) -> io::Result<PlayerInput>;

    fn save_exists(&mut self, _name: &str) -> bool {
        false
    }

    fn write_save(&mut self, _name: &str, _data: &[u8]) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::Unsupported, "saving is not supported"))
    }

    /// `None` when there is no such save.
    fn read_save(&mut self, _name: &str) -> io::Result<Option<Vec<u8>>> {
        Ok(None)
    }
}
