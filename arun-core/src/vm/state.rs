//! Snapshots of the mutable world for UNDO.

use crate::acode::Aint;
use crate::error::Result;
use crate::host::Host;
use crate::syserr;
use crate::vm::{RuleState, Vm};
use crate::world::{AdminEntry, EventQueue};

/// Everything UNDO puts back. Attribute values, strings and sets included,
/// live inside the admin rows and are deep-copied with them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameState {
    pub events: EventQueue,
    pub score: Aint,
    pub scores: Vec<Aint>,
    pub admin: Vec<AdminEntry>,
    pub rules: Vec<RuleState>,
    /// The player command that led away from this state.
    pub player_command: Option<String>,
}

impl<H: Host> Vm<H> {
    /// Push a snapshot of the current world.
    pub fn remember_game_state(&mut self) {
        self.states.push(GameState {
            events: self.events.clone(),
            score: self.current.score,
            scores: self.scores.clone(),
            admin: self.admin.clone(),
            rules: self.rules.clone(),
            player_command: None,
        });
        self.game_state_changed = false;
    }

    /// Attach the last player command to the newest snapshot.
    pub fn remember_commands(&mut self) {
        let command = self.player_command.clone();
        if let Some(state) = self.states.last_mut() {
            state.player_command = command;
        }
    }

    /// Drop the newest snapshot without restoring it.
    pub fn forget_game_state(&mut self) {
        self.states.pop();
    }

    pub fn any_saved_state(&self) -> bool {
        !self.states.is_empty()
    }

    /// Pop the newest snapshot and make it the live world. Returns the player
    /// command remembered with it.
    pub fn recall_game_state(&mut self) -> Result<Option<String>> {
        let Some(state) = self.states.pop() else {
            syserr!("No game state to recall.");
        };
        self.events = state.events;
        self.current.score = state.score;
        self.scores = state.scores;
        self.admin = state.admin;
        self.rules = state.rules;
        self.game_state_changed = false;
        Ok(state.player_command)
    }

    /// Number of snapshots on the undo stack.
    pub fn saved_states(&self) -> usize {
        self.states.len()
    }
}
