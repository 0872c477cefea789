//! Container contents and limits.

use crate::acode::{Aint, Transitivity, COUNT_LIMIT_ATTRIBUTE};
use crate::error::Result;
use crate::host::Host;
use crate::image::records::LimitEntry;
use crate::syserr;
use crate::vm::Vm;

impl<H: Host> Vm<H> {
    fn contents(&self, container: Aint, trans: Transitivity) -> Result<Vec<Aint>> {
        let mut found = Vec::new();
        for i in 1..=self.instance_max() {
            if self.is_in(i, container, trans)? {
                found.push(i);
            }
        }
        Ok(found)
    }

    pub fn container_size(&self, container: Aint, trans: Transitivity) -> Result<Aint> {
        Ok(self.contents(container, trans)?.len() as Aint)
    }

    /// The `index`th (1-based) instance in a container, in id order.
    pub fn container_member(&self, container: Aint, index: Aint, trans: Transitivity) -> Result<Aint> {
        let contents = self.contents(container, trans)?;
        match usize::try_from(index - 1).ok().and_then(|i| contents.get(i)) {
            Some(member) => Ok(*member),
            None => syserr!("Index not in container in 'containerMember()'"),
        }
    }

    /// Sum of an attribute over everything in a container, nested containers included.
    fn sum_attribute_in_container(&self, container: Aint, attribute: Aint) -> Result<Aint> {
        let mut sum: Aint = 0;
        for i in self.contents(container, Transitivity::Direct)? {
            sum = sum.wrapping_add(self.instance_int_attribute(i, attribute)?);
            if self.is_a_container(i) {
                sum = sum.wrapping_add(self.sum_attribute_in_container(i, attribute)?);
            }
        }
        Ok(sum)
    }

    /// Check every limit of `container` against adding `added`. The statements
    /// of the first limit exceeded are run.
    pub fn passes_container_limits(&mut self, container: Aint, added: Aint) -> Result<bool> {
        if !self.is_a_container(container) {
            syserr!("Checking limits for a non-container.");
        }
        let limits_address = self
            .program
            .instance(container)
            .and_then(|i| self.program.container(i.container))
            .map_or(0, |c| c.limits);
        let limits: Vec<LimitEntry> = self.program.table(limits_address).collect();

        for limit in limits {
            let exceeded = if limit.atr == COUNT_LIMIT_ATTRIBUTE {
                self.container_size(container, Transitivity::Direct)? >= limit.val
            } else {
                let sum = self.sum_attribute_in_container(container, limit.atr)?;
                sum.wrapping_add(self.instance_int_attribute(added, limit.atr)?) > limit.val
            };
            if exceeded {
                log::debug!("limit on attribute {} of container {} exceeded", limit.atr, container);
                if limit.stms != 0 {
                    self.interpret(limit.stms)?;
                }
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// EMPTY: move everything directly in `container` to `whr`.
    pub fn empty(&mut self, container: Aint, whr: Aint) -> Result<()> {
        for i in self.contents(container, Transitivity::Direct)? {
            self.locate(i, whr)?;
        }
        Ok(())
    }
}
