//! The instruction loop.

use num_traits::FromPrimitive;
use rand::Rng;

use crate::acode::{op_class, operand, Aaddr, Aint, CurVar, OpClass, SayForm, StmOp, Style, Transitivity};
use crate::error::Result;
use crate::host::Host;
use crate::vm::{Vm, MAX_INVOCATION_DEPTH};
use crate::world::{Set, Value};
use crate::{apperr, syserr};

fn transitivity(value: Aint) -> Result<Transitivity> {
    match Transitivity::from_i32(value) {
        Some(t) => Ok(t),
        None => syserr!("Unexpected transitivity ({}).", value),
    }
}

fn between(value: Aint, low: Aint, high: Aint) -> bool {
    if high > low {
        low <= value && value <= high
    } else {
        high <= value && value <= low
    }
}

impl<H: Host> Vm<H> {
    /// Run the statement stream at `addr` until `RETURN` or a failure. The
    /// program counter is restored whichever way it ends.
    pub fn interpret(&mut self, addr: Aaddr) -> Result<()> {
        if let Some(mock) = self.interpreter_mock.as_mut() {
            mock(addr);
            return Ok(());
        }
        if addr == 0 {
            syserr!("Interpreting at address 0.");
        }
        if self.invocations.contains(&addr) {
            apperr!("Interpreter recursion.");
        }
        if self.invocations.len() >= MAX_INVOCATION_DEPTH {
            syserr!("Interpreter call stack too deep.");
        }

        self.invocations.push(addr);
        let old_pc = self.pc;
        self.pc = addr;
        let result = self.run_statements();
        self.pc = old_pc;
        self.invocations.pop();
        result
    }

    /// Interpret an expression and pop its value.
    pub fn evaluate(&mut self, addr: Aaddr) -> Result<Value> {
        self.interpret(addr)?;
        self.stack.pop()
    }

    pub fn evaluate_bool(&mut self, addr: Aaddr) -> Result<bool> {
        Ok(self.evaluate(addr)?.truthy())
    }

    pub fn evaluate_int(&mut self, addr: Aaddr) -> Result<Aint> {
        self.interpret(addr)?;
        self.stack.pop_int()
    }

    /// Drop everything a command left on the evaluation stack.
    pub(crate) fn reset_execution(&mut self) {
        self.stack.clear();
        self.invocations.clear();
    }

    fn fetch(&mut self) -> Result<u32> {
        match self.program.word(self.pc) {
            Some(word) => {
                self.pc += 1;
                Ok(word)
            }
            None => syserr!("Interpreting outside program."),
        }
    }

    fn run_statements(&mut self) -> Result<()> {
        loop {
            let word = self.fetch()?;
            match OpClass::from_u32(op_class(word)) {
                Some(OpClass::Const) => {
                    let value = operand(word) as Aint;
                    log::trace!("{:>6x}: PUSH {}", self.pc - 1, value);
                    self.stack.push(value)?;
                }
                Some(OpClass::CurVar) => self.current_variable(operand(word))?,
                Some(OpClass::StmOp) => {
                    let Some(op) = StmOp::from_u32(operand(word)) else {
                        syserr!("Unknown STMOP instruction.");
                    };
                    log::trace!("{:>6x}: {}", self.pc - 1, <&str>::from(op));
                    if op == StmOp::Return {
                        return Ok(());
                    }
                    self.statement(op)?;
                    if self.fail {
                        return Ok(());
                    }
                }
                None => syserr!("Unknown instruction class."),
            }
        }
    }

    fn current_variable(&mut self, var: u32) -> Result<()> {
        let value = match CurVar::from_u32(var) {
            Some(CurVar::Param) => {
                let index = self.stack.pop_int()?;
                match usize::try_from(index - 1).ok().and_then(|i| self.parameters.get(i)) {
                    Some(parameter) => parameter.instance,
                    None => apperr!("Nonexistent parameter referenced."),
                }
            }
            Some(CurVar::CurLoc) => self.current.location,
            Some(CurVar::CurAct) => self.current.actor,
            Some(CurVar::CurVrb) => self.current.verb,
            Some(CurVar::CurrentInstance) => self.current.instance,
            Some(CurVar::Score) => self.current.score,
            Some(CurVar::MaxInstance) => {
                if self.program.version().is_pre_beta3() {
                    self.instance_max()
                } else {
                    self.instance_max() - 1
                }
            }
            None => syserr!("Unknown CURVAR instruction."),
        };
        log::trace!("{:>6x}: CURVAR {} = {}", self.pc - 1, var, value);
        self.stack.push(value)
    }

    fn pop_transitivity(&mut self) -> Result<Transitivity> {
        let value = self.stack.pop_int()?;
        transitivity(value)
    }

    fn statement(&mut self, op: StmOp) -> Result<()> {
        match op {
            // -------------------------
            // Bookkeeping
            // -------------------------
            StmOp::Line => {
                let line = self.stack.pop_int()?;
                let file = self.stack.pop_int()?;
                if line != 0 {
                    self.current.source_line = line;
                    self.current.source_file = file;
                }
            }
            StmOp::Dup | StmOp::DupStr => {
                let top = self.stack.top()?.clone();
                self.stack.push(top)?;
            }
            StmOp::Pop => {
                self.stack.pop()?;
            }

            // -------------------------
            // Output and host services
            // -------------------------
            StmOp::Print => {
                let fpos = self.stack.pop_int()?;
                let len = self.stack.pop_int()?;
                self.print_text(fpos as u32, len as u32)?;
            }
            StmOp::Style => {
                let style = self.stack.pop_int()?;
                match Style::from_i32(style) {
                    Some(style) => self.set_style(style),
                    None => log::warn!("unknown style {}", style),
                }
            }
            StmOp::System => {
                let fpos = self.stack.pop_int()?;
                let len = self.stack.pop_int()?;
                let command = self.program.text(fpos as u32, len as u32)?;
                self.host.system(&command);
            }
            StmOp::GetStr => {
                let fpos = self.stack.pop_int()?;
                let len = self.stack.pop_int()?;
                let text = self.program.text(fpos as u32, len as u32)?;
                self.stack.push(text)?;
            }
            StmOp::Show => {
                let image = self.stack.pop_int()?;
                let align = self.stack.pop_int()?;
                self.host.show_image(image, align);
            }
            StmOp::Play => {
                let sound = self.stack.pop_int()?;
                self.host.play_sound(sound);
            }
            StmOp::Transcript => {
                if self.stack.pop_bool()? {
                    self.host.start_transcript();
                } else {
                    self.host.stop_transcript();
                }
            }

            // -------------------------
            // Game control
            // -------------------------
            StmOp::Quit => self.quit_game()?,
            StmOp::Look => self.look()?,
            StmOp::Save => self.save_game()?,
            StmOp::Restore => self.restore_game()?,
            StmOp::Restart => self.restart_game()?,
            StmOp::Score => {
                let sc = self.stack.pop_int()?;
                self.score(sc)?;
            }
            StmOp::Visits => {
                let v = self.stack.pop_int()?;
                self.visits(v);
            }

            // -------------------------
            // Events and actors
            // -------------------------
            StmOp::Schedule => {
                let event = self.stack.pop_int()?;
                let location = self.stack.pop_int()?;
                let after = self.stack.pop_int()?;
                self.schedule(event, location, after)?;
            }
            StmOp::Cancel => {
                let event = self.stack.pop_int()?;
                self.cancel_event(event);
            }
            StmOp::Use => {
                let actor = self.stack.pop_int()?;
                let script = self.stack.pop_int()?;
                self.use_script(actor, script)?;
            }
            StmOp::Stop => {
                let actor = self.stack.pop_int()?;
                self.stop_actor(actor)?;
            }

            // -------------------------
            // Attributes
            // -------------------------
            StmOp::Make => {
                let atr = self.stack.pop_int()?;
                let id = self.stack.pop_int()?;
                let value = self.stack.pop_bool()?;
                self.set_instance_attribute(id, atr, Value::from(value))?;
            }
            StmOp::Set | StmOp::SetStr | StmOp::SetSet => {
                let atr = self.stack.pop_int()?;
                let id = self.stack.pop_int()?;
                let value = self.stack.pop()?;
                self.set_instance_attribute(id, atr, value)?;
            }
            StmOp::Attribute | StmOp::AttrStr | StmOp::AttrSet => {
                let atr = self.stack.pop_int()?;
                let id = self.stack.pop_int()?;
                let value = self.instance_attribute(id, atr)?;
                self.stack.push(value)?;
            }
            StmOp::Incr => {
                let step = self.stack.pop_int()?;
                let value = self.stack.pop_int()?;
                self.stack.push(value.wrapping_add(step))?;
            }
            StmOp::Decr => {
                let step = self.stack.pop_int()?;
                let value = self.stack.pop_int()?;
                self.stack.push(value.wrapping_sub(step))?;
            }
            StmOp::Strip => {
                let atr = self.stack.pop_int()?;
                let id = self.stack.pop_int()?;
                let words = self.stack.pop_bool()?;
                let count = self.stack.pop_int()?;
                let first = self.stack.pop_bool()?;
                let stripped = self.strip(first, count, words, id, atr)?;
                self.stack.push(stripped)?;
            }

            // -------------------------
            // Sets
            // -------------------------
            StmOp::NewSet => self.stack.push(Set::new())?,
            StmOp::Union => {
                let set2 = self.stack.pop_set()?;
                let set1 = self.stack.pop_set()?;
                self.stack.push(set1.union(&set2))?;
            }
            StmOp::Include => {
                let member = self.stack.pop_int()?;
                self.stack.top_set_mut()?.add(member);
            }
            StmOp::Exclude => {
                let member = self.stack.pop_int()?;
                self.stack.top_set_mut()?.remove(member);
            }
            StmOp::SetSize => {
                let set = self.stack.pop_set()?;
                self.stack.push(set.len() as Aint)?;
            }
            StmOp::SetMemb => {
                let set = self.stack.pop_set()?;
                let index = self.stack.pop_int()?;
                match set.member(index) {
                    Some(member) => self.stack.push(member)?,
                    None => apperr!("Accessing nonexisting member in a set"),
                }
            }
            StmOp::InSet => {
                let set = self.stack.pop_set()?;
                let element = self.stack.pop_int()?;
                self.stack.push(set.contains(element))?;
            }

            // -------------------------
            // Containment and location
            // -------------------------
            StmOp::List => {
                let cnt = self.stack.pop_int()?;
                self.list(cnt)?;
            }
            StmOp::Empty => {
                let cnt = self.stack.pop_int()?;
                let whr = self.stack.pop_int()?;
                self.empty(cnt, whr)?;
            }
            StmOp::Locate => {
                let id = self.stack.pop_int()?;
                let whr = self.stack.pop_int()?;
                self.locate(id, whr)?;
            }
            StmOp::ContSize => {
                let trans = self.pop_transitivity()?;
                let container = self.stack.pop_int()?;
                let size = self.container_size(container, trans)?;
                self.stack.push(size)?;
            }
            StmOp::ContMemb => {
                let trans = self.pop_transitivity()?;
                let container = self.stack.pop_int()?;
                let index = self.stack.pop_int()?;
                let member = self.container_member(container, index, trans)?;
                self.stack.push(member)?;
            }
            StmOp::Where => {
                let trans = self.pop_transitivity()?;
                let id = self.stack.pop_int()?;
                let location = self.where_of(id, trans)?;
                self.stack.push(location)?;
            }
            StmOp::Location => {
                let id = self.stack.pop_int()?;
                let location = self.location_of(id)?;
                self.stack.push(location)?;
            }
            StmOp::Here => {
                let trans = self.pop_transitivity()?;
                let id = self.stack.pop_int()?;
                let here = self.is_here(id, trans)?;
                self.stack.push(here)?;
            }
            StmOp::Nearby => {
                let trans = self.pop_transitivity()?;
                let id = self.stack.pop_int()?;
                let nearby = self.is_nearby(id, trans)?;
                self.stack.push(nearby)?;
            }
            StmOp::Near => {
                let trans = self.pop_transitivity()?;
                let other = self.stack.pop_int()?;
                let id = self.stack.pop_int()?;
                let near = self.is_near(id, other, trans)?;
                self.stack.push(near)?;
            }
            StmOp::At => {
                let trans = self.pop_transitivity()?;
                let other = self.stack.pop_int()?;
                let instance = self.stack.pop_int()?;
                let at = self.is_at(instance, other, trans)?;
                self.stack.push(at)?;
            }
            StmOp::In => {
                let trans = self.pop_transitivity()?;
                let cnt = self.stack.pop_int()?;
                let obj = self.stack.pop_int()?;
                let inside = self.is_in(obj, cnt, trans)?;
                self.stack.push(inside)?;
            }
            StmOp::Isa => {
                let rh = self.stack.pop_int()?;
                let lh = self.stack.pop_int()?;
                let isa = self.is_a(lh, rh);
                self.stack.push(isa)?;
            }

            // -------------------------
            // Saying things
            // -------------------------
            StmOp::Describe => {
                let id = self.stack.pop_int()?;
                self.describe(id)?;
            }
            StmOp::Say => {
                let form = self.stack.pop_int()?;
                let id = self.stack.pop_int()?;
                match SayForm::from_i32(form) {
                    Some(SayForm::Simple) => self.say(id)?,
                    Some(form) => self.say_form(id, form)?,
                    None => syserr!("Unexpected form in 'sayArticleOrForm()'"),
                }
            }
            StmOp::SayInt => {
                let value = self.stack.pop_int()?;
                self.say_integer(value)?;
            }
            StmOp::SayStr => {
                let text = self.stack.pop_str()?;
                self.say_string(&text)?;
            }

            // -------------------------
            // Conditionals
            // -------------------------
            StmOp::If => {
                if !self.stack.pop_bool()? {
                    self.skip_if()?;
                }
            }
            StmOp::Else => self.skip_else()?,
            StmOp::EndIf => {}
            StmOp::Depend => {}
            StmOp::DepCase | StmOp::DepElse => self.skip_to_end_of_depending()?,
            StmOp::DepExec => {
                if !self.stack.pop_bool()? {
                    self.skip_to_next_case()?;
                }
            }
            StmOp::EndDep => {
                self.stack.pop()?;
            }

            // -------------------------
            // Arithmetic and logic
            // -------------------------
            StmOp::And | StmOp::Or => {
                let rh = self.stack.pop_bool()?;
                let lh = self.stack.pop_bool()?;
                let result = if op == StmOp::And { lh && rh } else { lh || rh };
                self.stack.push(result)?;
            }
            StmOp::Eq | StmOp::Ne => {
                let rh = self.stack.pop()?;
                let lh = self.stack.pop()?;
                self.stack.push((lh == rh) == (op == StmOp::Eq))?;
            }
            StmOp::StrEq | StmOp::StrExact => {
                let rh = self.stack.pop_str()?;
                let lh = self.stack.pop_str()?;
                let equal = if op == StmOp::StrExact { lh == rh } else { lh.to_lowercase() == rh.to_lowercase() };
                self.stack.push(equal)?;
            }
            StmOp::Le | StmOp::Ge | StmOp::Lt | StmOp::Gt => {
                let rh = self.stack.pop_int()?;
                let lh = self.stack.pop_int()?;
                let result = match op {
                    StmOp::Le => lh <= rh,
                    StmOp::Ge => lh >= rh,
                    StmOp::Lt => lh < rh,
                    _ => lh > rh,
                };
                self.stack.push(result)?;
            }
            StmOp::Plus | StmOp::Minus | StmOp::Mult | StmOp::Div => {
                let rh = self.stack.pop_int()?;
                let lh = self.stack.pop_int()?;
                let result = match op {
                    StmOp::Plus => lh.wrapping_add(rh),
                    StmOp::Minus => lh.wrapping_sub(rh),
                    StmOp::Mult => lh.wrapping_mul(rh),
                    _ => {
                        if rh == 0 {
                            apperr!("Division by zero");
                        }
                        lh.wrapping_div(rh)
                    }
                };
                self.stack.push(result)?;
            }
            StmOp::Not => {
                let value = self.stack.pop_bool()?;
                self.stack.push(!value)?;
            }
            StmOp::UMinus => {
                let value = self.stack.pop_int()?;
                self.stack.push(value.wrapping_neg())?;
            }
            StmOp::Rnd => {
                let from = self.stack.pop_int()?;
                let to = self.stack.pop_int()?;
                let value = self.rng.gen_range(from.min(to)..=from.max(to));
                self.stack.push(value)?;
            }
            StmOp::Btw => {
                let high = self.stack.pop_int()?;
                let low = self.stack.pop_int()?;
                let value = self.stack.pop_int()?;
                self.stack.push(between(value, low, high))?;
            }

            // -------------------------
            // Strings
            // -------------------------
            StmOp::Concat => {
                let s2 = self.stack.pop_str()?;
                let s1 = self.stack.pop_str()?;
                self.stack.push(s1 + &s2)?;
            }
            StmOp::Contains => {
                let substring = self.stack.pop_str()?;
                let string = self.stack.pop_str()?;
                let found = string.to_lowercase().contains(&substring.to_lowercase());
                self.stack.push(found)?;
            }

            // -------------------------
            // Blocks and loops
            // -------------------------
            StmOp::Frame => {
                let size = self.stack.pop_int()?;
                self.stack.new_frame(size)?;
            }
            StmOp::GetLocal => {
                let frames_below = self.stack.pop_int()?;
                let variable = self.stack.pop_int()?;
                let value = self.stack.get_local(frames_below, variable)?;
                self.stack.push(value)?;
            }
            StmOp::SetLocal => {
                let frames_below = self.stack.pop_int()?;
                let variable = self.stack.pop_int()?;
                let value = self.stack.pop()?;
                self.stack.set_local(frames_below, variable, value)?;
            }
            StmOp::EndFrame => self.stack.end_frame()?,
            StmOp::Loop => {
                let index = self.stack.pop_int()?;
                let limit = self.stack.pop_int()?;
                self.stack.push(limit)?;
                self.stack.push(index)?;
                if index > limit {
                    self.skip_to_loop_end()?;
                }
            }
            StmOp::LoopNext => self.skip_to_loop_end()?,
            StmOp::LoopEnd => {
                let index = self.stack.pop_int()?;
                let limit = self.stack.pop_int()?;
                if index < limit {
                    self.stack.push(limit)?;
                    self.stack.push(index + 1)?;
                    self.jump_back_to_loop()?;
                }
            }
            StmOp::Sum | StmOp::Max | StmOp::Min => {
                let attribute = self.stack.pop_int()?;
                let loop_index = self.stack.pop_int()?;
                let limit = self.stack.pop_int()?;
                let aggregate = self.stack.pop_int()?;
                let result = match op {
                    StmOp::Sum => aggregate.wrapping_add(attribute),
                    StmOp::Max => aggregate.max(attribute),
                    _ => aggregate.min(attribute),
                };
                self.stack.push(result)?;
                self.stack.push(limit)?;
                self.stack.push(loop_index)?;
            }
            StmOp::Count => {
                let loop_index = self.stack.pop_int()?;
                let limit = self.stack.pop_int()?;
                let aggregate = self.stack.pop_int()?;
                self.stack.push(aggregate.wrapping_add(1))?;
                self.stack.push(limit)?;
                self.stack.push(loop_index)?;
            }

            StmOp::Return => {}
        }
        Ok(())
    }

    // -------------------------
    // Structured skips
    // -------------------------

    fn statement_at(&self, addr: Aaddr) -> Result<Option<StmOp>> {
        match self.program.word(addr) {
            Some(word) if op_class(word) == OpClass::StmOp as u32 => Ok(StmOp::from_u32(operand(word))),
            Some(_) => Ok(None),
            None => syserr!("Interpreting outside program."),
        }
    }

    /// Skip a false IF: stop after an ELSE or ENDIF on the same level.
    fn skip_if(&mut self) -> Result<()> {
        let mut level = 1;
        loop {
            let op = self.statement_at(self.pc)?;
            self.pc += 1;
            match op {
                Some(StmOp::If) => level += 1,
                Some(StmOp::EndIf) => {
                    level -= 1;
                    if level == 0 {
                        return Ok(());
                    }
                }
                Some(StmOp::Else) if level == 1 => return Ok(()),
                _ => {}
            }
        }
    }

    /// Skip the ELSE part of a taken IF: stop after the matching ENDIF.
    fn skip_else(&mut self) -> Result<()> {
        let mut level = 1;
        loop {
            let op = self.statement_at(self.pc)?;
            self.pc += 1;
            match op {
                Some(StmOp::If) => level += 1,
                Some(StmOp::EndIf) => {
                    level -= 1;
                    if level == 0 {
                        return Ok(());
                    }
                }
                _ => {}
            }
        }
    }

    /// A case did not match: stop after the next DEPCASE/DEPELSE on this
    /// level, or at the ENDDEP.
    fn skip_to_next_case(&mut self) -> Result<()> {
        let mut level = 1;
        loop {
            let op = self.statement_at(self.pc)?;
            self.pc += 1;
            match op {
                Some(StmOp::Depend) => level += 1,
                Some(StmOp::EndDep) => {
                    if level == 1 {
                        self.pc -= 1;
                        return Ok(());
                    }
                    level -= 1;
                }
                Some(StmOp::DepCase) | Some(StmOp::DepElse) if level == 1 => return Ok(()),
                _ => {}
            }
        }
    }

    /// A case body has run: stop at the ENDDEP of this DEPENDING.
    fn skip_to_end_of_depending(&mut self) -> Result<()> {
        let mut level = 1;
        loop {
            let op = self.statement_at(self.pc)?;
            self.pc += 1;
            match op {
                Some(StmOp::Depend) => level += 1,
                Some(StmOp::EndDep) => {
                    level -= 1;
                    if level == 0 {
                        self.pc -= 1;
                        return Ok(());
                    }
                }
                _ => {}
            }
        }
    }

    /// Leave the program counter at the LOOPEND of this loop.
    fn skip_to_loop_end(&mut self) -> Result<()> {
        let mut level = 1;
        loop {
            match self.statement_at(self.pc)? {
                Some(StmOp::LoopEnd) => {
                    level -= 1;
                    if level == 0 {
                        return Ok(());
                    }
                }
                Some(StmOp::Loop) => level += 1,
                _ => {}
            }
            self.pc += 1;
        }
    }

    /// Continue with the instruction after the LOOP matching the LOOPEND just
    /// executed.
    fn jump_back_to_loop(&mut self) -> Result<()> {
        let mut level = 1;
        let mut addr = self.pc - 1;
        loop {
            if addr == 0 {
                syserr!("No LOOP matching LOOPEND.");
            }
            addr -= 1;
            match self.statement_at(addr)? {
                Some(StmOp::LoopEnd) => level += 1,
                Some(StmOp::Loop) => {
                    level -= 1;
                    if level == 0 {
                        self.pc = addr + 1;
                        return Ok(());
                    }
                }
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acode::Aword;
    use crate::options::Options;
    use crate::testing::{op, push, ImageBuilder, ScriptedHost};
    use pretty_assertions::assert_eq;

    #[test]
    fn between_is_order_agnostic() {
        assert!(between(3, 1, 5));
        assert!(between(3, 5, 1));
        assert!(between(5, 5, 5));
        assert!(!between(6, 1, 5));
    }

    /// Run the code `build` assembles in a one-room game and return the words
    /// it printed.
    fn run(build: impl FnOnce(&mut ImageBuilder) -> Vec<Aword>) -> anyhow::Result<(Vm<ScriptedHost>, Vec<String>)> {
        let mut b = ImageBuilder::new();
        let room = b.location("room");
        b.hero_at(room);
        let code = build(&mut b);
        let addr = b.stms(&code);
        let options = Options::default();
        let mut vm = Vm::new(b.program(&options)?, ScriptedHost::new(), options)?;
        vm.start()?;
        vm.host_mut().take_output();

        vm.interpret(addr)?;
        let output = vm.host_mut().take_output();
        Ok((vm, output.split_whitespace().map(str::to_string).collect()))
    }

    #[test]
    fn nested_if_and_else() -> anyhow::Result<()> {
        let (vm, words) = run(|b| {
            let mut code = vec![push(1), op(StmOp::If), push(0), op(StmOp::If)];
            code.extend(b.print("Alpha"));
            code.push(op(StmOp::Else));
            code.extend(b.print("Beta"));
            code.extend([op(StmOp::EndIf), op(StmOp::Else)]);
            code.extend(b.print("Gamma"));
            code.extend([op(StmOp::EndIf), push(0), op(StmOp::If)]);
            code.extend(b.print("Then"));
            code.push(op(StmOp::Else));
            code.extend(b.print("Else"));
            code.push(op(StmOp::EndIf));
            code
        })?;
        assert_eq!(words, vec!["Beta", "Else"]);
        assert_eq!(vm.stack.depth(), 0);
        Ok(())
    }

    /// `DEPENDING ON value` with cases 1 (holding a nested DEPENDING), 2 and ELSE.
    fn depending(value: Aint) -> anyhow::Result<(Vm<ScriptedHost>, Vec<String>)> {
        run(|b| {
            let mut code = vec![push(value), op(StmOp::Depend)];
            code.extend([op(StmOp::Dup), push(1), op(StmOp::Eq), op(StmOp::DepExec)]);
            code.extend([push(7), op(StmOp::Depend), op(StmOp::Dup), push(7), op(StmOp::Eq), op(StmOp::DepExec)]);
            code.extend(b.print("Inner"));
            code.push(op(StmOp::DepElse));
            code.extend(b.print("Never"));
            code.push(op(StmOp::EndDep));
            code.extend([op(StmOp::DepCase), op(StmOp::Dup), push(2), op(StmOp::Eq), op(StmOp::DepExec)]);
            code.extend(b.print("Two"));
            code.push(op(StmOp::DepElse));
            code.extend(b.print("Other"));
            code.push(op(StmOp::EndDep));
            code
        })
    }

    #[test]
    fn depending_runs_one_case() -> anyhow::Result<()> {
        for (value, expected) in [(1, "Inner"), (2, "Two"), (5, "Other")] {
            let (vm, words) = depending(value)?;
            assert_eq!(words, vec![expected], "depending on {}", value);
            assert_eq!(vm.stack.depth(), 0);
        }
        Ok(())
    }

    /// `FOR EACH index FROM low TO high`, running `body` with the index on top.
    fn for_each(low: Aint, high: Aint, body: &[Aword]) -> Vec<Aword> {
        let mut code = vec![push(high), push(low), op(StmOp::Loop)];
        code.extend_from_slice(body);
        code.push(op(StmOp::LoopEnd));
        code
    }

    #[test]
    fn loops_run_from_low_to_high() -> anyhow::Result<()> {
        let say_index = [op(StmOp::Dup), op(StmOp::SayInt)];
        let (vm, words) = run(|_| for_each(1, 3, &say_index))?;
        assert_eq!(words, vec!["1", "2", "3"]);
        assert_eq!(vm.stack.depth(), 0);

        let (vm, words) = run(|_| for_each(3, 1, &say_index))?;
        assert!(words.is_empty());
        assert_eq!(vm.stack.depth(), 0);
        Ok(())
    }

    #[test]
    fn loop_next_skips_the_rest_of_the_body() -> anyhow::Result<()> {
        let body = [
            op(StmOp::Dup),
            push(2),
            op(StmOp::Eq),
            op(StmOp::If),
            op(StmOp::LoopNext),
            op(StmOp::EndIf),
            op(StmOp::Dup),
            op(StmOp::SayInt),
        ];
        let (vm, words) = run(|_| for_each(1, 4, &body))?;
        assert_eq!(words, vec!["1", "3", "4"]);
        assert_eq!(vm.stack.depth(), 0);
        Ok(())
    }

    /// An aggregate starting at `start` over `low..=high`, then said.
    fn aggregate(start: Aint, low: Aint, high: Aint, body: &[Aword]) -> anyhow::Result<Vec<String>> {
        let (vm, words) = run(|_| {
            let mut code = vec![push(start)];
            code.extend(for_each(low, high, body));
            code.push(op(StmOp::SayInt));
            code
        })?;
        assert_eq!(vm.stack.depth(), 0);
        Ok(words)
    }

    #[test]
    fn aggregates_over_a_loop() -> anyhow::Result<()> {
        assert_eq!(aggregate(0, 1, 3, &[op(StmOp::Count)])?, vec!["3"]);
        assert_eq!(aggregate(0, 1, 4, &[push(5), op(StmOp::Sum)])?, vec!["20"]);
        assert_eq!(aggregate(0, 1, 4, &[op(StmOp::Dup), op(StmOp::Max)])?, vec!["4"]);
        assert_eq!(aggregate(100, 2, 5, &[op(StmOp::Dup), op(StmOp::Min)])?, vec!["2"]);
        assert_eq!(aggregate(0, 3, 1, &[op(StmOp::Count)])?, vec!["0"]);
        Ok(())
    }

    #[test]
    fn a_nested_interpret_returns_to_the_caller() -> anyhow::Result<()> {
        let mut vase = 0;
        let (vm, words) = run(|b| {
            vase = b.object("vase", 0);
            b.describe(vase, "Two.");
            let mut code = b.print("One.");
            code.extend([push(vase), op(StmOp::Describe)]);
            code.extend(b.print("Three."));
            code
        })?;
        assert_eq!(words, vec!["One.", "Two.", "Three."]);
        assert_eq!(vm.pc, 0);
        assert!(vm.invocations.is_empty());
        Ok(())
    }
}
