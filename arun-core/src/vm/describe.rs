//! DESCRIBE, LOOK and LIST.

use crate::acode::{Aaddr, Aint, MsgKind, Style, Transitivity};
use crate::error::Result;
use crate::host::Host;
use crate::syserr;
use crate::vm::Vm;

impl<H: Host> Vm<H> {
    fn own_or_inherited_description(&self, instance: Aint) -> Option<Aaddr> {
        let entry = self.program.instance(instance)?;
        if entry.description != 0 {
            return Some(entry.description);
        }
        self.program.class_chain(entry.parent).map(|(_, c)| c.description).find(|d| *d != 0)
    }

    pub fn has_description(&self, instance: Aint) -> bool {
        self.own_or_inherited_description(instance).is_some()
    }

    fn mark_described(&mut self, instance: Aint) -> Result<()> {
        self.admin_entry_mut(instance)?.already_described = true;
        Ok(())
    }

    fn clear_described(&mut self) {
        for admin in &mut self.admin {
            admin.already_described = false;
        }
    }

    fn describe_anything(&mut self, instance: Aint) -> Result<()> {
        if let Some(description) = self.own_or_inherited_description(instance) {
            self.interpret(description)?;
        }
        self.mark_described(instance)
    }

    /// "There is a lamp." for things without a description of their own.
    fn describe_plainly(&mut self, instance: Aint) -> Result<()> {
        self.print_message_with_instance(MsgKind::SeeStart, instance)?;
        self.print_message(MsgKind::SeeEnd)?;
        if self.is_a_container(instance) {
            self.describe_container(instance)?;
        }
        Ok(())
    }

    fn describe_object(&mut self, object: Aint) -> Result<()> {
        if self.has_description(object) {
            self.describe_anything(object)?;
        } else {
            self.describe_plainly(object)?;
        }
        self.mark_described(object)
    }

    fn describe_actor(&mut self, actor: Aint) -> Result<()> {
        let script = self.admin_entry(actor)?.script;
        let script_description = self.program.script(script).map_or(0, |s| s.description);
        if script != 0 && script_description != 0 {
            self.interpret(script_description)?;
        } else if self.has_description(actor) {
            self.describe_anything(actor)?;
        } else {
            self.describe_plainly(actor)?;
        }
        self.mark_described(actor)
    }

    /// Run the description checks, inherited ones first.
    fn description_check(&mut self, instance: Aint) -> Result<bool> {
        let Some(entry) = self.program.instance(instance) else {
            return Ok(false);
        };
        let mut class_checks: Vec<Aaddr> = self
            .program
            .class_chain(entry.parent)
            .map(|(_, c)| c.description_checks)
            .collect();
        class_checks.reverse();

        self.with_current_instance(instance, |vm| {
            for checks in class_checks.into_iter().filter(|c| *c != 0) {
                if vm.checks_failed(checks, true)? {
                    return Ok(false);
                }
            }
            if entry.checks == 0 {
                Ok(true)
            } else {
                Ok(!vm.checks_failed(entry.checks, true)?)
            }
        })
    }

    /// Describe an instance if its description checks pass.
    pub fn describe(&mut self, instance: Aint) -> Result<bool> {
        self.with_current_instance(instance, |vm| {
            vm.verify_instance(instance, "DESCRIBE")?;
            if !vm.description_check(instance)? {
                return Ok(false);
            }
            if vm.is_object(instance) {
                vm.describe_object(instance)?;
            } else if vm.is_actor(instance) {
                vm.describe_actor(instance)?;
            } else {
                vm.describe_anything(instance)?;
            }
            Ok(true)
        })
    }

    /// Describe what is at the current location: objects with descriptions,
    /// then a list of the rest, then the other actors.
    pub fn describe_instances(&mut self) -> Result<()> {
        let max = self.instance_max();
        let here = self.current.location;

        for i in 1..=max {
            if self.location_of_admin(i) == here
                && self.is_object(i)
                && !self.admin_entry(i)?.already_described
                && self.has_description(i)
            {
                self.describe(i)?;
            }
        }

        let mut found = 0;
        let mut last = 0;
        for i in 1..=max {
            if self.location_of_admin(i) != here || self.admin_entry(i)?.already_described || !self.is_object(i) {
                continue;
            }
            if !self.description_check(i)? {
                continue;
            }
            if found == 0 {
                self.print_message_with_instance(MsgKind::SeeStart, i)?;
            } else if found > 1 {
                self.print_message_with_instance(MsgKind::SeeComma, last)?;
            }
            self.mark_described(i)?;

            if self.is_a_container(i) && self.container_size(i, Transitivity::Direct)? > 0 && !self.is_opaque(i)? {
                if found > 0 {
                    self.print_message_with_instance(MsgKind::SeeAnd, i)?;
                }
                self.print_message(MsgKind::SeeEnd)?;
                self.describe_container(i)?;
                found = 0;
                continue;
            }
            found += 1;
            last = i;
        }
        if found > 0 {
            if found > 1 {
                self.print_message_with_instance(MsgKind::SeeAnd, last)?;
            }
            self.print_message(MsgKind::SeeEnd)?;
        }

        let hero = self.hero();
        for i in 1..=max {
            if self.location_of_admin(i) == here
                && i != hero
                && self.is_actor(i)
                && !self.admin_entry(i)?.already_described
            {
                self.describe(i)?;
            }
        }

        self.clear_described();
        Ok(())
    }

    /// Print the location name and describe it with everything in it.
    pub fn look(&mut self) -> Result<()> {
        self.clear_described();
        if self.out.any_output {
            self.para();
        }
        self.set_style(Style::Emphasized);
        let location = self.current.location;
        let result = self.say_instance(location);
        self.set_style(Style::Normal);
        result?;
        self.newline();
        self.out.capitalize = true;
        if self.describe(location)? {
            self.describe_instances()?;
        }
        Ok(())
    }

    /// List the contents of a container unless it is empty or opaque.
    pub fn describe_container(&mut self, container: Aint) -> Result<()> {
        if !self.is_container_empty(container)? && !self.is_opaque(container)? {
            self.list(container)?;
        }
        Ok(())
    }

    fn is_container_empty(&self, container: Aint) -> Result<bool> {
        for i in 1..=self.instance_max() {
            if self.is_describable(i) && self.is_in(i, container, Transitivity::Transitive)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// LIST: say what a container directly holds.
    pub fn list(&mut self, container: Aint) -> Result<()> {
        let Some(entry) = self.program.instance(container).filter(|i| i.container != 0) else {
            syserr!("Trying to list something not a container.");
        };
        let Some(props) = self.program.container(entry.container) else {
            syserr!("Trying to list something not a container.");
        };

        self.with_current_instance(container, |vm| {
            let mut items = Vec::new();
            for i in 1..=vm.instance_max() {
                if vm.is_describable(i) && vm.is_in(i, container, Transitivity::Direct)? {
                    items.push(i);
                }
            }
            let owner_is_actor = vm.is_actor(props.owner);

            if items.is_empty() {
                if props.empty != 0 {
                    vm.interpret(props.empty)?;
                } else if owner_is_actor {
                    vm.print_message_with_instance(MsgKind::EmptyHanded, props.owner)?;
                } else {
                    vm.print_message_with_instance(MsgKind::Empty, props.owner)?;
                }
            } else {
                if props.header != 0 {
                    vm.interpret(props.header)?;
                } else if owner_is_actor {
                    vm.print_message_with_instance(MsgKind::Carries, props.owner)?;
                } else {
                    vm.print_message_with_instance(MsgKind::Contains, props.owner)?;
                }
                let count = items.len();
                for (n, item) in items.into_iter().enumerate() {
                    let msg = match count - n {
                        1 => MsgKind::ContainsEnd,
                        2 => MsgKind::ContainsAnd,
                        _ => MsgKind::ContainsComma,
                    };
                    vm.print_message_with_instance(msg, item)?;
                }
            }
            vm.out.need_space = true;
            Ok(())
        })
    }
}
