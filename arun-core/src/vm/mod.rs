//! The acode virtual machine.
//!
//! `Vm` owns the loaded [`Program`] and every piece of mutable world state.
//! The submodules each add one concern to it as a separate `impl` block.

mod action;
mod attributes;
mod container;
mod describe;
mod exe;
mod interpreter;
mod locate;
mod location;
mod output;
mod save;
mod say;
mod scheduler;
mod stack;
mod state;

use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::acode::{Aaddr, Aint, Aword};
use crate::error::{Result, Unwind, VmError};
use crate::host::Host;
use crate::image::records::{AttributeEntry, RuleEntry, SetInitEntry, StringInitEntry};
use crate::image::Program;
use crate::options::Options;
use crate::syserr;
use crate::world::{AdminEntry, AttributeSlot, EventQueue, Literal, Set, Value};

pub use self::action::{AltInfo, AltLevel};
pub use self::output::OutputState;
pub use self::save::{SaveFileError, SaveGame, SAVE_MAGIC};
pub use self::stack::Stack;
pub use self::state::GameState;

/// Deepest nesting of `interpret` calls before the game is considered broken.
const MAX_INVOCATION_DEPTH: usize = 1000;

/// Registers of the virtual machine, readable through `CURVAR`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Current {
    pub verb: Aint,
    pub location: Aint,
    pub actor: Aint,
    pub instance: Aint,
    pub tick: Aint,
    pub score: Aint,
    pub visits: Aint,
    pub source_line: Aint,
    pub source_file: Aint,
}

/// A bound parameter of the running command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parameter {
    pub instance: Aint,
    pub use_words: bool,
    /// Dictionary indices of the words the player used.
    pub words: Vec<usize>,
}

impl Parameter {
    pub fn new(instance: Aint) -> Self {
        Self { instance, ..Default::default() }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleState {
    pub already_run: bool,
    pub last_eval: bool,
}

type InterpreterMock = Box<dyn FnMut(Aaddr)>;

pub struct Vm<H: Host> {
    program: Program,
    host: H,
    options: Options,

    current: Current,
    admin: Vec<AdminEntry>,
    literals: Vec<Literal>,
    events: EventQueue,
    scores: Vec<Aint>,
    rules: Vec<RuleState>,

    stack: Stack,
    pc: Aaddr,
    fail: bool,
    invocations: Vec<Aaddr>,

    out: OutputState,
    parameters: Vec<Parameter>,
    verb_word: Option<usize>,
    player_command: Option<String>,

    states: Vec<GameState>,
    game_state_changed: bool,
    save_file_name: String,

    rng: SmallRng,
    interpreter_mock: Option<InterpreterMock>,
}

impl<H: Host> Vm<H> {
    /// Build a machine with the world in its initial state. Nothing runs until
    /// [`Vm::run`] or [`Vm::start`].
    pub fn new(program: Program, host: H, options: Options) -> std::result::Result<Self, VmError> {
        let rng = Self::new_rng(&options);
        let mut vm = Self {
            program,
            host,
            options,
            current: Current::default(),
            admin: Vec::new(),
            literals: Vec::new(),
            events: EventQueue::new(),
            scores: Vec::new(),
            rules: Vec::new(),
            stack: Stack::new(),
            pc: 0,
            fail: false,
            invocations: Vec::new(),
            out: OutputState::default(),
            parameters: Vec::new(),
            verb_word: None,
            player_command: None,
            states: Vec::new(),
            game_state_changed: false,
            save_file_name: String::new(),
            rng,
            interpreter_mock: None,
        };
        vm.init().map_err(fatal)?;
        Ok(vm)
    }

    fn new_rng(options: &Options) -> SmallRng {
        if options.deterministic() {
            SmallRng::seed_from_u64(1)
        } else {
            SmallRng::from_entropy()
        }
    }

    /// Play until the player quits or input runs out. RESTART starts over from
    /// the loaded program.
    pub fn run(&mut self) -> std::result::Result<(), VmError> {
        loop {
            match self.play() {
                Err(Unwind::Restart) => {
                    log::info!("restarting");
                    self.init().map_err(fatal)?;
                }
                Err(Unwind::Quit) | Ok(()) => return Ok(()),
                Err(other) => return Err(fatal(other)),
            }
        }
    }

    fn play(&mut self) -> Result<()> {
        for warning in self.program.take_warnings() {
            self.output(&warning)?;
        }
        match self.start() {
            Ok(()) | Err(Unwind::Abort) => {}
            Err(e) => return Err(e),
        }
        loop {
            self.tick()?;
        }
    }

    // -------------------------
    // Initialisation
    // -------------------------

    /// Reset every piece of mutable state from the program.
    pub fn init(&mut self) -> Result<()> {
        let header = self.program.header().clone();
        let max = header.instance_max as Aint;

        self.current = Current::default();
        self.literals.clear();
        self.events = EventQueue::new();
        self.states.clear();
        self.stack.clear();
        self.invocations.clear();
        self.pc = 0;
        self.fail = false;
        self.out = OutputState::default();
        self.parameters.clear();
        self.verb_word = None;
        self.player_command = None;
        self.rng = Self::new_rng(&self.options);

        let mut area_size = 0;
        self.admin = vec![AdminEntry::default(); max as usize + 1];
        for id in 1..=max {
            let Some(instance) = self.program.instance(id) else {
                syserr!("Instance {} missing from the instance table.", id);
            };
            let attributes: Vec<AttributeSlot> = self
                .program
                .table::<AttributeEntry>(instance.initial_attributes)
                .map(|a| AttributeSlot { code: a.code, value: Value::Int(a.value as Aint), id: a.id })
                .collect();
            area_size += attributes.len() * 3 + 1;
            let admin = &mut self.admin[id as usize];
            admin.location = instance.initial_location;
            admin.attributes = attributes;
        }
        if area_size != header.attributes_area_size as usize {
            syserr!("Attribute area size calculated wrong.");
        }

        let strings: Vec<StringInitEntry> = self.program.table(header.string_init_table).collect();
        for init in strings {
            let text = self.program.text(init.fpos, init.len)?;
            self.set_instance_attribute(init.instance_code, init.attribute_code, Value::Str(text))?;
        }
        let sets: Vec<SetInitEntry> = self.program.table(header.set_init_table).collect();
        for init in sets {
            let set = Set::from_members(self.words(init.set_address, init.size).into_iter().map(|w| w as Aint));
            self.set_instance_attribute(init.instance_code, init.attribute_code, Value::Set(set))?;
        }

        self.scores = self.words(header.scores, header.score_count).into_iter().map(|w| w as Aint).collect();
        self.rules = vec![RuleState::default(); self.program.table::<RuleEntry>(header.rule_table_address).count()];
        self.game_state_changed = false;
        log::debug!("initialised {} instances, {} rules", max, self.rules.len());
        Ok(())
    }

    // -------------------------
    // Accessors
    // -------------------------

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn into_host(self) -> H {
        self.host
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn current(&self) -> &Current {
        &self.current
    }

    pub fn current_mut(&mut self) -> &mut Current {
        &mut self.current
    }

    pub fn admin(&self, instance: Aint) -> Option<&AdminEntry> {
        if instance < 1 {
            return None;
        }
        self.admin.get(instance as usize)
    }

    pub fn events(&self) -> &EventQueue {
        &self.events
    }

    pub fn scores(&self) -> &[Aint] {
        &self.scores
    }

    pub fn rule_states(&self) -> &[RuleState] {
        &self.rules
    }

    pub fn literals(&self) -> &[Literal] {
        &self.literals
    }

    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn set_parameters(&mut self, parameters: Vec<Parameter>) {
        self.parameters = parameters;
    }

    pub fn failed(&self) -> bool {
        self.fail
    }

    pub fn game_state_changed(&self) -> bool {
        self.game_state_changed
    }

    /// Replace `interpret` with a callback, for testing code that drives the
    /// interpreter without real statement streams.
    pub fn set_interpreter_mock(&mut self, mock: Option<InterpreterMock>) {
        self.interpreter_mock = mock;
    }

    // -------------------------
    // Shorthands
    // -------------------------

    fn hero(&self) -> Aint {
        self.program.header().the_hero as Aint
    }

    fn instance_max(&self) -> Aint {
        self.program.header().instance_max as Aint
    }

    fn is_literal(&self, instance: Aint) -> bool {
        instance > self.instance_max()
    }

    fn literal(&self, instance: Aint) -> Option<&Literal> {
        let index = instance.checked_sub(self.instance_max() + 1)?;
        if index < 0 {
            return None;
        }
        self.literals.get(index as usize)
    }

    fn admin_entry(&self, instance: Aint) -> Result<&AdminEntry> {
        match self.admin(instance) {
            Some(admin) => Ok(admin),
            None => syserr!("Instance {} has no administrative entry.", instance),
        }
    }

    fn admin_entry_mut(&mut self, instance: Aint) -> Result<&mut AdminEntry> {
        if instance < 1 {
            syserr!("Instance {} has no administrative entry.", instance);
        }
        match self.admin.get_mut(instance as usize) {
            Some(admin) => Ok(admin),
            None => syserr!("Instance {} has no administrative entry.", instance),
        }
    }

    fn location_of_admin(&self, instance: Aint) -> Aint {
        self.admin(instance).map_or(0, |a| a.location)
    }

    /// Words of `len` consecutive items starting at `addr`.
    fn words(&self, addr: Aaddr, len: Aword) -> Vec<Aword> {
        (0..len).map(|i| self.program.word(addr + i).unwrap_or(0)).collect()
    }
}

/// An unwind that escaped every handler ends the session.
fn fatal(unwind: Unwind) -> VmError {
    match unwind {
        Unwind::Fatal(e) => e,
        other => VmError::Sys(format!("Unexpected {} outside a player command.", other)),
    }
}
