//! LOCATE: moving instances, with extraction checks, container limits,
//! ENTERED statements and the hero's view of the new location.

use crate::acode::{Aint, MsgKind, Transitivity, VISITS_ATTRIBUTE};
use crate::apperr;
use crate::error::{Result, Unwind};
use crate::host::Host;
use crate::vm::Vm;
use crate::world::Value;

impl<H: Host> Vm<H> {
    /// Move `instance` to `whr`.
    pub fn locate(&mut self, instance: Aint, whr: Aint) -> Result<()> {
        self.verify_instance(instance, "LOCATE")?;
        self.verify_instance(whr, "LOCATE AT")?;

        if whr == instance || (self.is_a_container(instance) && self.is_in(whr, instance, Transitivity::Transitive)?) {
            return self.containment_loop_error(instance, whr);
        }

        let mut loc = self.location_of_admin(instance);
        if self.is_a_container(loc) {
            let previous = self.current.instance;
            while self.is_a_container(loc) {
                self.current.instance = loc;
                let passed = self.run_extraction(instance, loc);
                match passed {
                    Ok(true) => {}
                    Ok(false) => {
                        self.current.instance = previous;
                        return Ok(());
                    }
                    Err(e) => {
                        self.current.instance = previous;
                        return Err(e);
                    }
                }
                loc = self.location_of_admin(loc);
            }
            self.current.instance = previous;
        }

        if self.is_actor(instance) {
            self.locate_actor(instance, whr)?;
        } else if self.is_location(instance) {
            self.locate_location(instance, whr)?;
        } else {
            self.locate_object(instance, whr)?;
        }
        self.game_state_changed = true;
        Ok(())
    }

    /// Run the extract checks and statements of `container` for taking
    /// `instance` out. `false` if a check failed.
    fn run_extraction(&mut self, instance: Aint, container: Aint) -> Result<bool> {
        let Some(props) = self.program.instance(container).and_then(|i| self.program.container(i.container)) else {
            return Ok(true);
        };
        if props.extract_checks != 0 {
            log::debug!("extract checks for {} from container {}", instance, container);
            if self.checks_failed(props.extract_checks, true)? {
                self.fail = true;
                return Ok(false);
            }
        }
        if props.extract_statements != 0 {
            log::debug!("extract statements for {} from container {}", instance, container);
            self.interpret(props.extract_statements)?;
        }
        Ok(true)
    }

    fn containment_loop_error(&mut self, instance: Aint, whr: Aint) -> Result<()> {
        if self.program.version().is_pre_beta4() {
            self.output("That would be to put something inside itself.")?;
        } else if whr == instance {
            self.print_message_with_instance(MsgKind::ContainmentLoop, instance)?;
        } else {
            self.print_message_with_instances(MsgKind::ContainmentLoop2, instance, whr)?;
        }
        self.error(MsgKind::NoMsg)
    }

    fn locate_into_container(&mut self, instance: Aint, container: Aint) -> Result<()> {
        let class = self
            .program
            .instance(container)
            .and_then(|i| self.program.container(i.container))
            .map_or(0, |c| c.class);
        if !self.is_a(instance, class) {
            self.print_message_with_instances(MsgKind::CannotContain, container, instance)
        } else if self.passes_container_limits(container, instance)? {
            self.admin_entry_mut(instance)?.location = container;
            Ok(())
        } else {
            Err(Unwind::Abort)
        }
    }

    fn locate_location(&mut self, location: Aint, whr: Aint) -> Result<()> {
        let mut l = whr;
        let mut steps = 0;
        while l != 0 {
            if self.location_of_admin(l) == location || steps > self.instance_max() {
                apperr!("Locating a location that would create a recursive loop of locations containing each other.");
            }
            l = self.location_of_admin(l);
            steps += 1;
        }
        self.admin_entry_mut(location)?.location = whr;
        Ok(())
    }

    fn locate_object(&mut self, object: Aint, whr: Aint) -> Result<()> {
        if self.is_a_container(whr) {
            self.locate_into_container(object, whr)
        } else {
            self.admin_entry_mut(object)?.location = whr;
            self.admin_entry_mut(whr)?.visits_count = 0;
            Ok(())
        }
    }

    fn visits_of(&self, location: Aint) -> Result<Aint> {
        self.instance_int_attribute(location, VISITS_ATTRIBUTE)
    }

    fn increment_visits(&mut self, location: Aint) -> Result<()> {
        let mut at = location;
        let mut steps = 0;
        while at != 0 && steps <= self.instance_max() {
            let visits = self.visits_of(at)?;
            self.set_instance_attribute(at, VISITS_ATTRIBUTE, Value::Int(visits.wrapping_add(1)))?;
            at = self.location_of_admin(at);
            steps += 1;
        }
        Ok(())
    }

    /// Run the ENTERED statements of a location, its enclosing locations and
    /// its classes, outermost first.
    fn execute_entered(&mut self, instance: Aint) -> Result<()> {
        self.with_current_instance(instance, |vm| {
            let outer = vm.location_of_admin(instance);
            if outer != 0 {
                vm.execute_entered(outer)?;
            }
            let Some(entry) = vm.program.instance(instance) else {
                return Ok(());
            };
            let mut inherited: Vec<_> = vm.program.class_chain(entry.parent).map(|(_, c)| c.entered).collect();
            inherited.reverse();
            for entered in inherited.into_iter().filter(|e| *e != 0) {
                vm.interpret(entered)?;
            }
            if entry.entered != 0 {
                log::debug!("entered statements of instance {}", instance);
                vm.interpret(entry.entered)?;
            }
            Ok(())
        })
    }

    fn should_be_described(&self) -> Result<bool> {
        let location = self.location_of_admin(self.hero());
        let visits_count = self.admin_entry(location)?.visits_count;
        let period = self.current.visits.wrapping_add(1);
        if period == 0 {
            return Ok(visits_count == 0);
        }
        if self.program.version().is_pre_beta5() {
            Ok(visits_count % period == 0)
        } else {
            Ok(self.visits_of(location)? % period == 0 || visits_count == 0)
        }
    }

    fn locate_actor(&mut self, actor: Aint, whr: Aint) -> Result<()> {
        let previous_location = self.current.location;
        let previous_actor_location = self.location_of_admin(actor);
        let previous_actor = self.current.actor;
        let previous_instance = self.current.instance;
        let hero = self.hero();

        if !self.program.version().is_pre_beta5() && actor == hero {
            let from = self.where_of(hero, Transitivity::Direct)?;
            self.increment_visits(from)?;
        }

        if self.is_a_container(whr) {
            self.locate_into_container(actor, whr)?;
        } else {
            self.current.location = whr;
            self.admin_entry_mut(actor)?.location = whr;
        }

        self.current.instance = self.current.location;
        self.current.actor = actor;
        if previous_actor_location != self.current.location {
            self.execute_entered(self.current.location)?;
        }
        self.current.instance = previous_instance;
        self.current.actor = previous_actor;

        if actor == hero {
            if self.should_be_described()? {
                self.look()?;
            } else {
                self.revisited()?;
            }
            let at = self.where_of(hero, Transitivity::Direct)?;
            let admin = self.admin_entry_mut(at)?;
            admin.visits_count = admin.visits_count.wrapping_add(1);
        } else {
            self.admin_entry_mut(whr)?.visits_count = 0;
        }

        if self.current.actor != actor {
            self.current.location = previous_location;
        }
        self.current.instance = previous_instance;
        Ok(())
    }

    /// Short description for a location visited before.
    fn revisited(&mut self) -> Result<()> {
        if self.out.any_output {
            self.para();
        }
        let location = self.where_of(self.hero(), Transitivity::Direct)?;
        self.say(location)?;
        self.print_message(MsgKind::Again)?;
        self.newline();
        self.describe_instances()
    }
}
