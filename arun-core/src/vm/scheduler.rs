//! The turn loop: start-up, events, actors and rules.

use crate::acode::{Aint, Transitivity};
use crate::error::{Result, Unwind};
use crate::host::{Command, Host, ParseContext};
use crate::image::records::{RuleEntry, StepEntry};
use crate::syserr;
use crate::vm::Vm;

impl<H: Host> Vm<H> {
    // -------------------------
    // Start
    // -------------------------

    fn run_initialize(&mut self, instance: Aint) -> Result<()> {
        let Some(entry) = self.program.instance(instance) else {
            return Ok(());
        };
        let mut inherited: Vec<_> = self.program.class_chain(entry.parent).map(|(_, c)| c.initialize).collect();
        inherited.reverse();
        for initialize in inherited.into_iter().filter(|i| *i != 0) {
            self.interpret(initialize)?;
        }
        if entry.initialize != 0 {
            self.interpret(entry.initialize)?;
        }
        Ok(())
    }

    fn initialize_instances(&mut self) -> Result<()> {
        for id in 1..=self.instance_max() {
            self.current.instance = id;
            self.run_initialize(id)?;
        }
        Ok(())
    }

    /// Run the INITIALIZE statements and the START section, then put the hero
    /// in its start location.
    pub fn start(&mut self) -> Result<()> {
        let hero = self.hero();
        let start_location = self.where_of(hero, Transitivity::Transitive)?;
        self.current.tick = -1;
        self.current.location = start_location;
        self.current.actor = hero;
        self.current.score = 0;

        self.initialize_instances()?;

        let start = self.program.header().start;
        if start != 0 {
            log::debug!("START section");
            self.interpret(start)?;
        }
        self.para();

        self.locate(hero, start_location)?;
        self.evaluate_rules()
    }

    // -------------------------
    // Turns
    // -------------------------

    /// One game tick: due events, then the hero and every other actor. An
    /// aborted or undone hero command is retried with new input.
    pub fn tick(&mut self) -> Result<()> {
        match self.run_pending_events() {
            Ok(()) => {}
            Err(Unwind::Abort) => self.reset_execution(),
            Err(e) => return Err(e),
        }
        self.current.tick += 1;

        loop {
            match self.actors_turn() {
                Err(Unwind::Abort) => {
                    self.forget_game_state();
                    self.reset_execution();
                }
                Err(Unwind::Undo) => self.reset_execution(),
                other => return other,
            }
        }
    }

    fn actors_turn(&mut self) -> Result<()> {
        self.reset_execution();
        self.remember_game_state();

        let hero = self.hero();
        self.move_actor(hero)?;

        if self.game_state_changed {
            self.remember_commands();
        } else {
            self.forget_game_state();
        }

        self.evaluate_rules()?;
        for actor in 1..=self.instance_max() {
            if actor != hero && self.is_actor(actor) {
                self.move_actor(actor)?;
                self.evaluate_rules()?;
            }
        }
        Ok(())
    }

    fn move_actor(&mut self, actor: Aint) -> Result<()> {
        let previous_instance = self.current.instance;
        self.current.actor = actor;
        self.current.instance = actor;
        self.current.location = self.where_of(actor, Transitivity::Transitive)?;

        let result = if actor == self.hero() {
            match self.hero_turn() {
                Ok(()) => {
                    self.out.capitalize = true;
                    self.fail = false;
                    Ok(())
                }
                Err(Unwind::Forfeit) => Ok(()),
                Err(e) => Err(e),
            }
        } else {
            self.run_script_step(actor)
        };
        self.current.instance = previous_instance;
        result
    }

    /// Run the next step of an actor's script, unless it is still waiting.
    fn run_script_step(&mut self, actor: Aint) -> Result<()> {
        let admin = self.admin_entry(actor)?;
        let (code, step_index, wait_count) = (admin.script, admin.step, admin.wait_count);
        if code == 0 {
            log::trace!("actor {} idle at {}", actor, self.current.location);
            return Ok(());
        }
        let Some(script) = self.program.script(code) else {
            syserr!("Unknown actor script.");
        };
        let steps: Vec<StepEntry> = self.program.table(script.steps).collect();
        let index = usize::try_from(step_index).unwrap_or(usize::MAX);
        let Some(step) = steps.get(index).copied() else {
            self.admin_entry_mut(actor)?.script = 0;
            return Ok(());
        };

        if wait_count > 0 {
            log::debug!("actor {}, script {}, step {}: waiting {} more turns", actor, code, index + 1, wait_count);
            self.admin_entry_mut(actor)?.wait_count -= 1;
            return Ok(());
        }
        if step.exp != 0 && !self.evaluate_bool(step.exp)? {
            return Ok(());
        }

        self.admin_entry_mut(actor)?.step += 1;
        if let Some(next) = steps.get(index + 1).filter(|s| s.after != 0) {
            let wait = self.evaluate_int(next.after)?;
            self.admin_entry_mut(actor)?.wait_count = wait;
        }
        log::debug!("actor {}, script {}, step {}: executing", actor, code, index + 1);
        self.interpret(step.stms)?;

        let admin = self.admin_entry_mut(actor)?;
        if admin.step != 0 && index + 1 >= steps.len() {
            admin.script = 0;
        }
        self.fail = false;
        Ok(())
    }

    fn print_prompt(&mut self) -> Result<()> {
        let prompt = self.program.header().prompt;
        if prompt != 0 {
            self.out.any_output = false;
            self.interpret(prompt)?;
            if self.out.any_output {
                self.print_raw(" ");
            }
            self.out.need_space = false;
        } else {
            self.print_raw("> ");
        }
        Ok(())
    }

    /// Read the hero's command and carry it out.
    fn hero_turn(&mut self) -> Result<()> {
        self.free_literals();
        self.para();
        self.print_prompt()?;

        let location = self.current.location;
        let mut present = Vec::new();
        for i in 1..=self.instance_max() {
            if self.is_here(i, Transitivity::Transitive)? {
                present.push(i);
            }
        }
        let input = self.host.read_command(&ParseContext { program: &self.program, location, present: &present })?;
        self.out.col = 1;
        self.out.any_output = false;
        log::debug!("player command {:?}", input.text);
        self.player_command = Some(input.text);

        match input.command {
            Command::Empty => Err(Unwind::Forfeit),
            Command::Undo => self.undo(),
            Command::Go { direction } => self.go(location, direction),
            Command::Action { verb, verb_word, parameters } => {
                self.verb_word = verb_word;
                self.action(verb, parameters)
            }
            Command::EndOfInput => {
                self.newline();
                self.quit_game()
            }
        }
    }

    // -------------------------
    // Events
    // -------------------------

    fn run_pending_events(&mut self) -> Result<()> {
        while let Some(entry) = self.events.pop_due() {
            self.current.location = if self.is_location(entry.location) {
                entry.location
            } else {
                self.where_of(entry.location, Transitivity::Transitive)?
            };
            let Some(event) = self.program.event(entry.event) else {
                syserr!("Event {} does not exist.", entry.event);
            };
            log::debug!("event {} at {}", entry.event, self.current.location);
            self.interpret(event.code)?;
            if self.program.version().is_pre_beta2() {
                self.evaluate_rules()?;
            }
        }
        self.events.tick();
        Ok(())
    }

    /// SCHEDULE `event` to run at `location` after `after` ticks.
    pub fn schedule(&mut self, event: Aint, location: Aint, after: Aint) -> Result<()> {
        if event == 0 {
            syserr!("NULL event");
        }
        self.events.schedule(event, location, after);
        self.game_state_changed = true;
        Ok(())
    }

    pub fn cancel_event(&mut self, event: Aint) {
        self.events.cancel(event);
    }

    // -------------------------
    // Actors
    // -------------------------

    /// USE: start `actor` on script `script` from its first step.
    pub fn use_script(&mut self, actor: Aint, script: Aint) -> Result<()> {
        if !self.is_actor(actor) {
            syserr!("Instance is not an Actor ({}).", actor);
        }
        let admin = self.admin_entry_mut(actor)?;
        admin.script = script;
        admin.step = 0;

        let first = self
            .program
            .script(script)
            .and_then(|s| self.program.table::<StepEntry>(s.steps).next());
        if let Some(step) = first.filter(|s| s.after != 0) {
            let wait = self.evaluate_int(step.after)?;
            self.admin_entry_mut(actor)?.wait_count = wait;
        }
        self.game_state_changed = true;
        Ok(())
    }

    pub fn stop_actor(&mut self, actor: Aint) -> Result<()> {
        if !self.is_actor(actor) {
            syserr!("Instance is not an Actor ({}).", actor);
        }
        let admin = self.admin_entry_mut(actor)?;
        admin.script = 0;
        admin.step = 0;
        self.game_state_changed = true;
        Ok(())
    }

    // -------------------------
    // Rules
    // -------------------------

    /// Run rules until none fires. A rule fires at most once per evaluation,
    /// and from beta2 on only when its condition turns true.
    pub fn evaluate_rules(&mut self) -> Result<()> {
        let rules: Vec<RuleEntry> = self.program.table(self.program.header().rule_table_address).collect();
        let edge_triggered = !self.program.version().is_pre_beta2();
        for state in &mut self.rules {
            state.already_run = false;
        }

        let mut changed = true;
        while changed {
            changed = false;
            for (i, rule) in rules.iter().enumerate() {
                if self.rules.get(i).map_or(true, |r| r.already_run) {
                    continue;
                }
                let value = self.evaluate_bool(rule.exp)?;
                let fires = value && !(edge_triggered && self.rules[i].last_eval);
                if fires {
                    log::debug!("rule {} fires", i + 1);
                    self.rules[i].already_run = true;
                    changed = true;
                    self.interpret(rule.stms)?;
                }
                self.rules[i].last_eval = value;
            }
        }
        Ok(())
    }
}
