//! Game control statements: SCORE, VISITS, QUIT, RESTART and UNDO, plus the
//! command-aborting `error`.

use crate::acode::{Aint, MsgKind, Transitivity};
use crate::error::{Result, Unwind};
use crate::host::Host;
use crate::syserr;
use crate::vm::Vm;

impl<H: Host> Vm<H> {
    /// Print `msg` (unless it is `NoMsg`) and abort the player command.
    pub fn error(&mut self, msg: MsgKind) -> Result<()> {
        if msg != MsgKind::NoMsg {
            self.print_message(msg)?;
        }
        Err(Unwind::Abort)
    }

    /// SCORE 0 reports the score; SCORE n awards score entry n once.
    pub fn score(&mut self, sc: Aint) -> Result<()> {
        if sc == 0 {
            let maximum = self.program.header().maximum_score as Aint;
            return self.print_message_with_integers(MsgKind::Score, self.current.score, maximum);
        }
        let Some(points) = usize::try_from(sc - 1).ok().and_then(|i| self.scores.get_mut(i)) else {
            syserr!("Score entry {} out of range.", sc);
        };
        let awarded = std::mem::take(points);
        self.current.score = self.current.score.wrapping_add(awarded);
        self.game_state_changed = true;
        Ok(())
    }

    pub fn visits(&mut self, v: Aint) {
        self.current.visits = v;
    }

    /// Ask a yes/no question. Only an empty answer, or no input at all,
    /// counts as yes.
    pub fn confirm(&mut self, msg: MsgKind) -> Result<bool> {
        self.print_message(msg)?;
        let Some(answer) = self.host.read_line()? else {
            return Ok(true);
        };
        self.out.col = 1;
        Ok(answer.trim().is_empty())
    }

    pub fn quit_game(&mut self) -> Result<()> {
        if self.game_state_changed {
            self.remember_commands();
            self.remember_game_state();
        }
        self.current.location = self.where_of(self.hero(), Transitivity::Transitive)?;
        self.para();
        loop {
            self.out.col = 1;
            self.print_message(MsgKind::QuitAction)?;
            let Some(answer) = self.host.read_line()? else {
                return Err(Unwind::Quit);
            };
            match answer.trim() {
                "restart" => return Err(Unwind::Restart),
                "restore" => return self.restore_game(),
                "quit" => return Err(Unwind::Quit),
                "undo" => return self.undo(),
                other => log::debug!("unrecognised quit action {:?}", other),
            }
        }
    }

    pub fn restart_game(&mut self) -> Result<()> {
        let previous_location = self.current.location;
        self.current.location = self.where_of(self.hero(), Transitivity::Transitive)?;
        self.para();
        if self.confirm(MsgKind::Really)? {
            return Err(Unwind::Restart);
        }
        self.current.location = previous_location;
        Ok(())
    }

    /// Step back one player command. Always unwinds to the player prompt.
    pub fn undo(&mut self) -> Result<()> {
        self.forget_game_state();
        if self.any_saved_state() {
            let command = self.recall_game_state()?.unwrap_or_default();
            self.print_message_with_string(MsgKind::Undone, &command)?;
        } else {
            self.print_message(MsgKind::NoUndo)?;
        }
        Err(Unwind::Undo)
    }
}
