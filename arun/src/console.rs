use std::fs::File;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use arun_core::acode::{Aint, Style};
use arun_core::host::{Command, Host, ParseContext, PlayerInput};

use crate::parser::{tokenize, Lexicon};

/// Plays on stdin/stdout. Save files live next to the game.
pub struct ConsoleHost {
    input: Box<dyn BufRead>,
    output: Box<dyn Write>,
    lexicon: Option<Lexicon>,
    transcript_path: PathBuf,
    transcript: Option<File>,
}

impl ConsoleHost {
    pub fn new(game: &Path) -> Self {
        Self {
            input: Box::new(io::BufReader::new(io::stdin())),
            output: Box::new(io::stdout()),
            lexicon: None,
            transcript_path: game.with_extension("a3t"),
            transcript: None,
        }
    }

    fn write(&mut self, text: &str) {
        if let Err(e) = self.output.write_all(text.as_bytes()) {
            log::error!("writing to the console: {}", e);
        }
        if let Some(file) = self.transcript.as_mut() {
            if let Err(e) = file.write_all(text.as_bytes()) {
                log::warn!("transcript stopped: {}", e);
                self.transcript = None;
            }
        }
    }

    fn next_line(&mut self) -> io::Result<Option<String>> {
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let line = line.trim_end_matches(['\r', '\n']).to_string();
        if let Some(file) = self.transcript.as_mut() {
            writeln!(file, "{}", line)?;
        }
        Ok(Some(line))
    }

    /// Read lines until one parses. Parse errors are reported and the prompt repeated.
    fn read_parsed(&mut self, lexicon: &Lexicon, context: &ParseContext<'_>) -> io::Result<PlayerInput> {
        loop {
            let Some(line) = self.next_line()? else {
                return Ok(PlayerInput::new("", Command::EndOfInput));
            };
            match lexicon.parse(&tokenize(&line), context) {
                Ok(command) => return Ok(PlayerInput::new(line, command)),
                Err(e) => {
                    log::debug!("'{}': {:?}", line, e);
                    self.write(&format!("{}\n\n> ", e));
                }
            }
        }
    }
}

impl Host for ConsoleHost {
    fn print(&mut self, text: &str) {
        self.write(text);
    }

    fn set_style(&mut self, style: Style) {
        log::trace!("style {}", style);
    }

    fn show_image(&mut self, image: Aint, align: Aint) {
        log::debug!("no graphics: image {} ({})", image, align);
    }

    fn play_sound(&mut self, sound: Aint) {
        log::debug!("no sound: {}", sound);
    }

    fn start_transcript(&mut self) {
        if self.transcript.is_some() {
            return;
        }
        match File::create(&self.transcript_path) {
            Ok(file) => {
                log::info!("transcript to {}", self.transcript_path.display());
                self.transcript = Some(file);
            }
            Err(e) => log::warn!("cannot open transcript {}: {}", self.transcript_path.display(), e),
        }
    }

    fn stop_transcript(&mut self) {
        self.transcript = None;
    }

    fn system(&mut self, command: &str) {
        log::info!("system: {}", command);
        match std::process::Command::new("sh").arg("-c").arg(command).status() {
            Ok(status) if !status.success() => log::warn!("'{}' exited with {}", command, status),
            Ok(_) => {}
            Err(e) => log::warn!("'{}' failed: {}", command, e),
        }
    }

    fn read_line(&mut self) -> io::Result<Option<String>> {
        self.next_line()
    }

    fn read_command(&mut self, context: &ParseContext<'_>) -> io::Result<PlayerInput> {
        let lexicon = self.lexicon.take().unwrap_or_else(|| Lexicon::new(context.program));
        let result = self.read_parsed(&lexicon, context);
        self.lexicon = Some(lexicon);
        result
    }

    fn save_exists(&mut self, name: &str) -> bool {
        Path::new(name).exists()
    }

    fn write_save(&mut self, name: &str, data: &[u8]) -> io::Result<()> {
        std::fs::write(name, data)
    }

    fn read_save(&mut self, name: &str) -> io::Result<Option<Vec<u8>>> {
        match std::fs::read(name) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}
