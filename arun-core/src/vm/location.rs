//! Class membership and containment queries.

use crate::acode::{Aint, Transitivity, NOWHERE, NO_LOCATION};
use crate::error::Result;
use crate::host::Host;
use crate::image::records::ExitEntry;
use crate::syserr;
use crate::vm::Vm;

impl<H: Host> Vm<H> {
    // -------------------------
    // Classes
    // -------------------------

    /// Whether `ancestor` is on the class chain of `instance`.
    pub fn is_a(&self, instance: Aint, ancestor: Aint) -> bool {
        if ancestor == 0 {
            return false;
        }
        let parent = if self.is_literal(instance) {
            self.literal(instance).map_or(0, |l| l.class)
        } else {
            self.program.instance(instance).map_or(0, |i| i.parent)
        };
        self.program.class_chain(parent).any(|(id, _)| id == ancestor)
    }

    pub fn is_location(&self, instance: Aint) -> bool {
        self.is_a(instance, self.program.header().location_class_id as Aint)
    }

    pub fn is_actor(&self, instance: Aint) -> bool {
        self.is_a(instance, self.program.header().actor_class_id as Aint)
    }

    pub fn is_object(&self, instance: Aint) -> bool {
        self.is_a(instance, self.program.header().object_class_id as Aint)
    }

    fn is_thing(&self, instance: Aint) -> bool {
        self.is_a(instance, self.program.header().thing_class_id as Aint)
    }

    pub fn is_a_container(&self, instance: Aint) -> bool {
        instance != 0
            && !self.is_literal(instance)
            && self.program.instance(instance).is_some_and(|i| i.container != 0)
    }

    pub fn is_describable(&self, instance: Aint) -> bool {
        self.is_object(instance) || self.is_actor(instance)
    }

    pub(crate) fn verify_instance(&self, instance: Aint, action: &str) -> Result<()> {
        if instance <= 0 {
            syserr!("Can't {} instance ({}).", action, instance);
        }
        if instance > self.instance_max() {
            syserr!("Can't {} instance ({} > instanceMax).", action, instance);
        }
        Ok(())
    }

    // -------------------------
    // Where things are
    // -------------------------

    /// The location an instance is at, looking through containers.
    pub fn location_of(&self, instance: Aint) -> Result<Aint> {
        self.verify_instance(instance, "get LOCATION of")?;

        let mut position = self.location_of_admin(instance);
        let mut container = 0;
        let mut steps = 0;
        while position != 0 && !self.is_location(position) {
            container = position;
            position = self.location_of_admin(position);
            steps += 1;
            if steps > self.instance_max() {
                syserr!("Containment loop found for instance {}.", instance);
            }
        }
        if position > NOWHERE {
            return Ok(position);
        }

        let outermost = if container != 0 { container } else { instance };
        if self.is_thing(outermost) {
            Ok(NOWHERE)
        } else if self.is_location(outermost) {
            Ok(NO_LOCATION)
        } else if outermost == self.hero() {
            Ok(NO_LOCATION)
        } else {
            self.location_of(self.hero())
        }
    }

    /// Where an instance is: the container or location it is directly in, or
    /// the location it is at.
    pub fn where_of(&self, instance: Aint, trans: Transitivity) -> Result<Aint> {
        self.verify_instance(instance, "WHERE")?;
        if self.is_location(instance) {
            Ok(0)
        } else if trans == Transitivity::Direct {
            Ok(self.location_of_admin(instance))
        } else {
            self.location_of(instance)
        }
    }

    /// Whether `instance` is inside `container`.
    pub fn is_in(&self, instance: Aint, container: Aint, trans: Transitivity) -> Result<bool> {
        if !self.is_a_container(container) {
            syserr!("IN in a non-container.");
        }
        if trans == Transitivity::Direct {
            return Ok(self.location_of_admin(instance) == container);
        }
        let mut loc = self.location_of_admin(instance);
        if trans == Transitivity::Indirect && loc != 0 && !self.is_location(loc) {
            loc = self.location_of_admin(loc);
        }
        self.climb_to(loc, container, |vm, at| !vm.is_location(at))
    }

    /// Climb the location chain from `from` while `go_on` holds, looking for `target`.
    fn climb_to(&self, mut from: Aint, target: Aint, go_on: impl Fn(&Self, Aint) -> bool) -> Result<bool> {
        let mut steps = 0;
        while from != 0 && go_on(self, from) {
            if from == target {
                return Ok(true);
            }
            from = self.location_of_admin(from);
            steps += 1;
            if steps > self.admin.len() {
                syserr!("Containment loop found at instance {}.", from);
            }
        }
        Ok(false)
    }

    /// Whether `instance` is at `other`, which may be a location or an
    /// instance standing somewhere.
    pub fn is_at(&self, instance: Aint, other: Aint, trans: Transitivity) -> Result<bool> {
        if instance == 0 || other == 0 {
            return Ok(false);
        }
        let anywhere = |_: &Self, _: Aint| true;

        if self.is_location(instance) {
            let mut current = self.location_of_admin(instance);
            match trans {
                Transitivity::Direct => Ok(current == other),
                Transitivity::Indirect => {
                    if current == other {
                        return Ok(false);
                    }
                    current = self.location_of_admin(current);
                    self.climb_to(current, other, anywhere)
                }
                Transitivity::Transitive => self.climb_to(current, other, anywhere),
            }
        } else if self.is_location(other) {
            match trans {
                Transitivity::Direct => Ok(self.location_of_admin(instance) == other),
                Transitivity::Indirect if self.location_of_admin(instance) == other => Ok(false),
                Transitivity::Indirect | Transitivity::Transitive => {
                    let location = self.location_of(instance)?;
                    self.climb_to(other, location, anywhere)
                }
            }
        } else {
            match trans {
                Transitivity::Direct => Ok(self.location_of_admin(instance) == self.location_of_admin(other)),
                Transitivity::Indirect => {
                    let location = self.location_of(instance)?;
                    if location == other {
                        return Ok(false);
                    }
                    self.climb_to(self.location_of_admin(other), location, anywhere)
                }
                Transitivity::Transitive => {
                    let location = self.location_of(other)?;
                    let current = self.location_of(instance)?;
                    self.climb_to(current, location, anywhere)
                }
            }
        }
    }

    pub fn is_here(&self, instance: Aint, trans: Transitivity) -> Result<bool> {
        self.verify_instance(instance, "HERE")?;
        self.is_at(instance, self.current.location, trans)
    }

    pub fn is_nearby(&self, instance: Aint, trans: Transitivity) -> Result<bool> {
        self.verify_instance(instance, "NEARBY")?;
        if self.is_location(instance) {
            Ok(self.exit_to(self.current.location, instance))
        } else {
            Ok(self.exit_to(self.current.location, self.where_of(instance, trans)?))
        }
    }

    pub fn is_near(&self, instance: Aint, other: Aint, trans: Transitivity) -> Result<bool> {
        self.verify_instance(instance, "NEAR")?;
        let l1 = if self.is_location(instance) { instance } else { self.where_of(instance, trans)? };
        let l2 = if self.is_location(other) { other } else { self.where_of(other, trans)? };
        Ok(self.exit_to(l2, l1))
    }

    /// Whether any exit of `from` leads to `to`.
    pub fn exit_to(&self, to: Aint, from: Aint) -> bool {
        let Some(instance) = self.program.instance(from) else {
            return false;
        };
        self.program.table::<ExitEntry>(instance.exits).any(|exit| exit.target == to)
    }
}
