use thiserror::Error;

/// Errors that end the session.
#[derive(Debug, Error)]
pub enum VmError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not an Alan game file, does not start with \"ALAN\"")]
    NotAnAlanFile,

    #[error("Malformed game file. Too small.")]
    TooSmall,

    #[error("Could not read all ACD code.")]
    ShortRead,

    #[error("Checksum error in Acode (.a3c) file (0x{computed:x} instead of 0x{expected:x}).")]
    Checksum { computed: u32, expected: u32 },

    #[error("Incompatible version of ACODE program. Game is {game}, interpreter {interpreter}.")]
    IncompatibleVersion { game: String, interpreter: String },

    #[error("address out of image: addr=0x{addr:X}, mem_top=0x{mem_top:X}")]
    AddressOutOfImage { addr: u32, mem_top: u32 },

    #[error("Error in encoded data file.")]
    EncodedText,

    #[error("APPLICATION ERROR: {0}")]
    App(String),

    #[error("SYSTEM ERROR: {0}")]
    Sys(String),

    #[error("{0}")]
    Player(String),
}

/// Non-local exits out of the interpreter.
///
/// Everything but `Fatal` is caught somewhere in the turn loop and ends the
/// current command, turn or session in a well-defined way.
#[derive(Debug, Error)]
pub enum Unwind {
    /// The player command was aborted, with or without a message.
    #[error("command aborted")]
    Abort,
    /// State was popped by UNDO; resume at the player prompt.
    #[error("undo")]
    Undo,
    /// Reinitialise the world and start over.
    #[error("restart")]
    Restart,
    /// Empty input ends the hero's turn.
    #[error("turn forfeited")]
    Forfeit,
    /// The player asked to stop, or input ended.
    #[error("quit")]
    Quit,
    #[error(transparent)]
    Fatal(#[from] VmError),
}

impl From<std::io::Error> for Unwind {
    fn from(e: std::io::Error) -> Self {
        Unwind::Fatal(VmError::Io(e))
    }
}

pub type Result<T> = std::result::Result<T, Unwind>;

/// Interpreter invariant violation.
#[macro_export]
macro_rules! syserr {
    ($($arg:tt)*) => {
        return Err($crate::error::Unwind::Fatal($crate::error::VmError::Sys(format!($($arg)*))))
    };
}

/// Problem with the game image itself.
#[macro_export]
macro_rules! apperr {
    ($($arg:tt)*) => {
        return Err($crate::error::Unwind::Fatal($crate::error::VmError::App(format!($($arg)*))))
    };
}
