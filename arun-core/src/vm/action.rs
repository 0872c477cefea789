//! Running a verb: collecting alternatives from the global verb table, the
//! location and the parameters, checking them, then executing them in
//! qualifier order.

use num_traits::FromPrimitive;

use crate::acode::{Aaddr, Aint, MsgKind, Qualifier, Transitivity};
use crate::error::{Result, Unwind};
use crate::host::{Binding, ParameterValue, ParsedParameter};
use crate::host::Host;
use crate::image::records::{AltEntry, CheckEntry, ExitEntry, VerbEntry};
use crate::vm::{Parameter, Vm};

/// Where an alternative was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AltLevel {
    Global,
    Location,
    Parameter,
}

/// An alternative that applies to the running command.
#[derive(Debug, Clone)]
pub struct AltInfo {
    pub alt: AltEntry,
    pub done: bool,
    pub level: AltLevel,
    /// Instance the alternative belongs to, 0 for global ones.
    pub instance: Aint,
    /// Parameter position it matched, 0 for none.
    pub parameter: Aint,
    /// Class it was inherited from, 0 if declared on the instance.
    pub class: Aint,
}

impl AltInfo {
    fn qualifier(&self) -> Qualifier {
        Qualifier::from_u32(self.alt.qual).unwrap_or(Qualifier::Default)
    }
}

impl<H: Host> Vm<H> {
    // -------------------------
    // Checks
    // -------------------------

    /// Evaluate a check list. On the first failing check its statements run
    /// when `execute` is set, and the result is `true`. A list whose first
    /// check has no expression always fails.
    pub fn checks_failed(&mut self, addr: Aaddr, execute: bool) -> Result<bool> {
        let checks: Vec<CheckEntry> = self.program.table(addr).collect();
        let Some(first) = checks.first() else {
            return Ok(false);
        };
        if first.exp == 0 {
            if execute && first.stms != 0 {
                self.interpret(first.stms)?;
            }
            return Ok(true);
        }
        for check in &checks {
            if !self.evaluate_bool(check.exp)? {
                if execute && check.stms != 0 {
                    self.interpret(check.stms)?;
                }
                return Ok(true);
            }
        }
        Ok(false)
    }

    // -------------------------
    // Alternatives
    // -------------------------

    /// The alternative for the current verb in a verb table, matching
    /// parameter position `parameter` or any position.
    fn find_alternative(&self, verbs: Aaddr, parameter: Aint) -> Option<AltEntry> {
        let verb = self.current.verb;
        self.program
            .table::<VerbEntry>(verbs)
            .find(|entry| if entry.code < 0 { -entry.code - 1 == verb } else { entry.code == verb })
            .and_then(|entry| {
                self.program
                    .table::<AltEntry>(entry.alts)
                    .find(|alt| alt.param == parameter || alt.param == 0)
            })
    }

    fn add_alternative(
        &self,
        found: &mut Vec<AltInfo>,
        level: AltLevel,
        instance: Aint,
        parameter: Aint,
        class: Aint,
        verbs: Aaddr,
    ) {
        if let Some(alt) = self.find_alternative(verbs, parameter) {
            found.push(AltInfo { alt, done: false, level, instance, parameter, class });
        }
    }

    /// Alternatives of a class chain, root class first.
    fn add_inherited_alternatives(
        &self,
        found: &mut Vec<AltInfo>,
        class: Aint,
        level: AltLevel,
        instance: Aint,
        parameter: Aint,
    ) {
        let mut chain: Vec<_> = self.program.class_chain(class).collect();
        chain.reverse();
        for (id, entry) in chain {
            self.add_alternative(found, level, instance, parameter, id, entry.verbs);
        }
    }

    fn add_location_alternatives(&self, found: &mut Vec<AltInfo>, location: Aint, depth: Aint) {
        if location == 0 || depth > self.instance_max() {
            return;
        }
        let outer = self.location_of_admin(location);
        if outer != 0 {
            self.add_location_alternatives(found, outer, depth + 1);
        }
        let Some(entry) = self.program.instance(location) else {
            return;
        };
        self.add_inherited_alternatives(found, entry.parent, AltLevel::Location, location, -1);
        self.add_alternative(found, AltLevel::Location, location, 0, 0, entry.verbs);
    }

    fn add_parameter_alternatives(&self, found: &mut Vec<AltInfo>, position: Aint, instance: Aint) {
        if self.is_literal(instance) {
            let class = self.literal(instance).map_or(0, |l| l.class);
            self.add_inherited_alternatives(found, class, AltLevel::Parameter, instance, position);
        } else if let Some(entry) = self.program.instance(instance) {
            self.add_inherited_alternatives(found, entry.parent, AltLevel::Parameter, instance, position);
            self.add_alternative(found, AltLevel::Parameter, instance, position, 0, entry.verbs);
            self.add_container_alternatives(found, position, instance);
        }
    }

    /// Alternatives of the containers holding a parameter, innermost last.
    /// The walk stops at the first location.
    fn add_container_alternatives(&self, found: &mut Vec<AltInfo>, position: Aint, instance: Aint) {
        let mut containers = Vec::new();
        let mut at = self.location_of_admin(instance);
        while at != 0 && !self.is_location(at) && containers.len() <= self.instance_max() as usize {
            containers.push(at);
            at = self.location_of_admin(at);
        }
        for container in containers.into_iter().rev() {
            if let Some(entry) = self.program.instance(container) {
                self.add_alternative(found, AltLevel::Parameter, container, position, 0, entry.verbs);
            }
        }
    }

    /// Every alternative for the current verb and parameters, outermost first.
    pub fn find_all_alternatives(&self) -> Vec<AltInfo> {
        let mut found = Vec::new();
        let first_parameter = self.parameters.first().map_or(0, |p| p.instance);
        let verb_table = self.program.header().verb_table_address;
        self.add_alternative(&mut found, AltLevel::Global, first_parameter, 0, 0, verb_table);
        self.add_location_alternatives(&mut found, self.current.location, 0);
        for (index, parameter) in self.parameters.iter().enumerate() {
            self.add_parameter_alternatives(&mut found, index as Aint + 1, parameter.instance);
        }
        found
    }

    fn any_check_failed(&mut self, alternatives: &[AltInfo], execute: bool) -> Result<bool> {
        for info in alternatives {
            if info.alt.checks == 0 {
                continue;
            }
            self.current.instance = info.instance;
            if self.checks_failed(info.alt.checks, execute)? || self.fail {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn executed_ok(&mut self, info: &mut AltInfo) -> Result<bool> {
        self.fail = false;
        if !info.done && info.alt.action != 0 {
            log::debug!(
                "verb {} alternative at {:?} level, instance {}, class {}",
                self.current.verb,
                info.level,
                info.instance,
                info.class
            );
            self.current.instance = info.instance;
            self.interpret(info.alt.action)?;
        }
        info.done = true;
        Ok(!self.fail)
    }

    /// Check and execute the current verb with the current parameters.
    pub fn execute_command(&mut self) -> Result<()> {
        self.fail = false;
        let mut alternatives = self.find_all_alternatives();

        if self.any_check_failed(&alternatives, true)? {
            return Err(Unwind::Abort);
        }
        if !alternatives.iter().any(|a| a.alt.action != 0) {
            return self.error(MsgKind::Cant0);
        }

        for info in alternatives.iter_mut().rev() {
            let qualifier = info.qualifier();
            if qualifier == Qualifier::Before || qualifier == Qualifier::Only {
                if !self.executed_ok(info)? {
                    return Err(Unwind::Abort);
                }
                if qualifier == Qualifier::Only {
                    return Ok(());
                }
            }
        }
        for info in alternatives.iter_mut() {
            if info.qualifier() != Qualifier::After && !self.executed_ok(info)? {
                return Err(Unwind::Abort);
            }
        }
        for info in alternatives.iter_mut().rev() {
            if !self.executed_ok(info)? {
                return Err(Unwind::Abort);
            }
        }
        Ok(())
    }

    /// Whether the verb could run with these parameters: no check fails and
    /// something has an action. Nothing is executed.
    pub fn possible(&mut self, verb: Aint, parameters: Vec<Parameter>) -> Result<bool> {
        self.current.verb = verb;
        self.parameters = parameters;
        let alternatives = self.find_all_alternatives();
        if self.any_check_failed(&alternatives, false)? {
            return Ok(false);
        }
        Ok(alternatives.iter().any(|a| a.alt.action != 0))
    }

    // -------------------------
    // Commands
    // -------------------------

    fn to_parameter(&mut self, parsed: ParsedParameter) -> Parameter {
        let instance = match parsed.value {
            ParameterValue::Instance(id) => id,
            ParameterValue::Integer(value) => self.create_integer_literal(value),
            ParameterValue::Text(text) => self.create_string_literal(text),
        };
        Parameter { instance, use_words: parsed.use_words, words: parsed.words }
    }

    /// Run a verb for bound parameters. A multiple position runs the verb
    /// once per instance, and an aborted item does not stop the others.
    pub fn action(&mut self, verb: Aint, bindings: Vec<Binding>) -> Result<()> {
        self.current.verb = verb;
        let multiples = bindings.iter().filter(|b| matches!(b, Binding::Multiple(_))).count();
        if multiples > 1 {
            return self.error(MsgKind::Multiple);
        }

        let mut parameters = Vec::with_capacity(bindings.len());
        let mut multiple = None;
        for (position, binding) in bindings.into_iter().enumerate() {
            match binding {
                Binding::Single(parsed) => parameters.push(self.to_parameter(parsed)),
                Binding::Multiple(items) => {
                    let items: Vec<Parameter> = items.into_iter().map(|p| self.to_parameter(p)).collect();
                    multiple = Some((position, items));
                    parameters.push(Parameter::default());
                }
            }
        }

        let Some((position, items)) = multiple else {
            self.parameters = parameters;
            return self.execute_command();
        };
        if items.is_empty() {
            return self.error(MsgKind::NotMuch);
        }

        let marker = format!("(${})", position + 1);
        let count = items.len();
        for (n, item) in items.into_iter().enumerate() {
            parameters[position] = item;
            self.parameters = parameters.clone();
            self.output(&marker)?;
            match self.execute_command() {
                Ok(()) | Err(Unwind::Abort) => {}
                Err(e) => return Err(e),
            }
            self.stack.clear();
            if n + 1 < count {
                self.para();
            }
        }
        if let Some(parameter) = self.parameters.get_mut(position) {
            parameter.instance = 0;
        }
        Ok(())
    }

    /// Take the exit of `location` in direction `direction`.
    pub fn go(&mut self, location: Aint, direction: Aint) -> Result<()> {
        let exits_address = self.program.instance(location).map_or(0, |i| i.exits);
        let exit = self.program.table::<ExitEntry>(exits_address).find(|e| e.code == direction);
        let Some(exit) = exit else {
            return self.error(MsgKind::NoWay);
        };

        if exit.checks != 0 && self.checks_failed(exit.checks, true)? {
            return Ok(());
        }
        if exit.action != 0 {
            self.interpret(exit.action)?;
        }
        let hero = self.hero();
        if self.where_of(hero, Transitivity::Transitive)? == location {
            self.locate(hero, exit.target)?;
        }
        Ok(())
    }
}
