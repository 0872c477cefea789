use std::cell::RefCell;
use std::rc::Rc;

use arun_core::acode::{Aaddr, Aint, Qualifier, StmOp, Transitivity, COUNT_LIMIT_ATTRIBUTE, VISITS_ATTRIBUTE};
use arun_core::host::{Binding, ParsedParameter};
use arun_core::image::records::{AltEntry, ExitEntry, LimitEntry};
use arun_core::testing::*;
use arun_core::world::Value;
use arun_core::vm::{AltLevel, Parameter};
use arun_core::{Options, Unwind, Vm};
use pretty_assertions::assert_eq;

type TestVm = Vm<ScriptedHost>;

fn vm_for(b: ImageBuilder) -> anyhow::Result<TestVm> {
    let options = Options::default();
    let program = b.program(&options)?;
    Ok(Vm::new(program, ScriptedHost::new(), options)?)
}

fn started(b: ImageBuilder) -> anyhow::Result<TestVm> {
    let mut vm = vm_for(b)?;
    vm.start()?;
    vm.host_mut().take_output();
    Ok(vm)
}

fn words(output: &str) -> Vec<&str> {
    output.split_whitespace().collect()
}

// -------------------------
// Looking around
// -------------------------

#[test]
fn revisiting_within_the_visits_period_is_brief() -> anyhow::Result<()> {
    let mut b = ImageBuilder::new();
    let kitchen = b.location("kitchen");
    let hall = b.location("hall");
    b.hero_at(kitchen);
    b.describe(kitchen, "A small kitchen.");
    b.describe(hall, "A draughty hall.");
    b.start(&visits(1000));

    let mut vm = vm_for(b)?;
    vm.start()?;
    let first = vm.host_mut().take_output();
    assert!(first.contains("Kitchen"));
    assert!(first.contains("A small kitchen."));
    assert_eq!(vm.current().visits, 1000);

    vm.locate(HERO, kitchen)?;
    let again = vm.host_mut().take_output();
    assert!(again.contains("(again)"));
    assert!(!again.contains("A small kitchen."));

    vm.locate(HERO, hall)?;
    let hall_text = vm.host_mut().take_output();
    assert!(hall_text.contains("A draughty hall."));
    assert_eq!(vm.current().location, hall);
    assert_eq!(vm.instance_int_attribute(kitchen, VISITS_ATTRIBUTE)?, 3);
    Ok(())
}

#[test]
fn things_without_description_are_listed() -> anyhow::Result<()> {
    let mut b = ImageBuilder::new();
    let cellar = b.location("cellar");
    b.hero_at(cellar);
    b.object("lamp", cellar);
    b.object("rope", cellar);
    let barrel = b.object("barrel", cellar);
    b.describe(barrel, "A barrel stands in the corner.");

    let mut vm = vm_for(b)?;
    vm.start()?;
    let output = vm.host_mut().take_output();
    assert!(output.contains("A barrel stands in the corner."));
    assert!(output.contains("There is a lamp and a rope here."));
    Ok(())
}

#[test]
fn the_interpreter_can_be_replaced_by_a_mock() -> anyhow::Result<()> {
    let mut b = ImageBuilder::new();
    let room = b.location("room");
    b.hero_at(room);
    let vase = b.object("vase", room);
    b.describe(vase, "A vase.");

    let mut vm = vm_for(b)?;
    let description = vm.program().instance(vase).map_or(0, |i| i.description);
    let calls: Rc<RefCell<Vec<Aaddr>>> = Rc::default();
    let recorder = Rc::clone(&calls);
    vm.set_interpreter_mock(Some(Box::new(move |addr| recorder.borrow_mut().push(addr))));

    assert!(vm.describe(vase)?);
    assert_eq!(*calls.borrow(), vec![description]);
    assert_eq!(vm.host().output(), "");
    Ok(())
}

// -------------------------
// Containers
// -------------------------

struct Bag {
    vm: TestVm,
    room: Aint,
    bag: Aint,
    fig: Aint,
    cherry: Aint,
}

fn bag_of_three() -> anyhow::Result<Bag> {
    let mut b = ImageBuilder::new();
    let room = b.location("room");
    b.hero_at(room);
    let bag = b.object("bag", room);
    let container = b.container(bag, OBJECT);
    let full = b.print_stms("The bag is full.");
    let limits = b.table(&[LimitEntry { atr: COUNT_LIMIT_ATTRIBUTE, val: 3, stms: full }]);
    b.container_mut(container).limits = limits;
    let cherry = b.object("cherry", bag);
    b.object("pear", bag);
    b.object("plum", bag);
    let fig = b.object("fig", room);

    Ok(Bag { vm: started(b)?, room, bag, fig, cherry })
}

#[test]
fn count_limit_stops_a_fourth_item() -> anyhow::Result<()> {
    let Bag { mut vm, room, bag, fig, .. } = bag_of_three()?;

    assert!(matches!(vm.locate(fig, bag), Err(Unwind::Abort)));
    assert!(vm.host_mut().take_output().contains("The bag is full."));
    assert_eq!(vm.admin(fig).map(|a| a.location), Some(room));
    assert_eq!(vm.container_size(bag, Transitivity::Direct)?, 3);
    Ok(())
}

#[test]
fn room_is_made_by_taking_something_out() -> anyhow::Result<()> {
    let Bag { mut vm, room, bag, fig, cherry } = bag_of_three()?;

    vm.locate(cherry, room)?;
    vm.locate(fig, bag)?;
    assert_eq!(vm.admin(fig).map(|a| a.location), Some(bag));
    assert_eq!(vm.location_of(fig)?, room);
    Ok(())
}

#[test]
fn a_container_cannot_go_into_itself() -> anyhow::Result<()> {
    let Bag { mut vm, bag, .. } = bag_of_three()?;

    assert!(matches!(vm.locate(bag, bag), Err(Unwind::Abort)));
    assert!(vm.host_mut().take_output().contains("Putting the bag in itself is impossible."));
    Ok(())
}

#[test]
fn listing_a_container() -> anyhow::Result<()> {
    let Bag { mut vm, bag, .. } = bag_of_three()?;

    vm.list(bag)?;
    let output = vm.host_mut().take_output();
    assert_eq!(words(&output), words("The bag contains a cherry, a pear and a plum."));
    Ok(())
}

// -------------------------
// Verbs
// -------------------------

const PUSH: Aint = 1;
const TAKE: Aint = 2;
const NORTH: Aint = 10;
const SOUTH: Aint = 11;

fn alt(b: &mut ImageBuilder, param: Aint, qual: Qualifier, text: &str) -> AltEntry {
    let code = b.print(text);
    b.alternative(param, qual, &code)
}

/// A global, a location and a parameter alternative for PUSH, the last one
/// with the given qualifier.
fn three_levels(parameter_qualifier: Qualifier, parameter_text: &str) -> anyhow::Result<(TestVm, Aint)> {
    let mut b = ImageBuilder::new();
    let room = b.location("room");
    b.hero_at(room);
    let button = b.object("button", room);

    let global = alt(&mut b, 0, Qualifier::Default, "G");
    let global = b.verbs(&[(PUSH, vec![global])]);
    b.global_verbs(global);

    let location = alt(&mut b, 0, Qualifier::Before, "LB");
    let location = b.verbs(&[(PUSH, vec![location])]);
    b.instance_mut(room).verbs = location;

    let parameter = alt(&mut b, 1, parameter_qualifier, parameter_text);
    let parameter = b.verbs(&[(PUSH, vec![parameter])]);
    b.instance_mut(button).verbs = parameter;

    Ok((started(b)?, button))
}

#[test]
fn only_alternative_preempts_everything() -> anyhow::Result<()> {
    let (mut vm, button) = three_levels(Qualifier::Only, "PO")?;

    vm.action(PUSH, vec![Binding::Single(ParsedParameter::instance(button))])?;
    assert_eq!(words(&vm.host_mut().take_output()), vec!["PO"]);
    Ok(())
}

#[test]
fn before_default_and_after_run_in_order() -> anyhow::Result<()> {
    let (mut vm, button) = three_levels(Qualifier::After, "PA")?;

    vm.action(PUSH, vec![Binding::Single(ParsedParameter::instance(button))])?;
    assert_eq!(words(&vm.host_mut().take_output()), vec!["LB", "G", "PA"]);
    assert_eq!(vm.current().verb, PUSH);
    Ok(())
}

#[test]
fn failing_check_aborts_the_command() -> anyhow::Result<()> {
    let mut b = ImageBuilder::new();
    let room = b.location("room");
    b.hero_at(room);
    let safe = b.object("safe", room);
    let mut open = alt(&mut b, 0, Qualifier::Default, "Opened.");
    open.checks = b.check(&[push(0)], "The safe is locked.");
    let verbs = b.verbs(&[(PUSH, vec![open])]);
    b.instance_mut(safe).verbs = verbs;

    let mut vm = started(b)?;
    let result = vm.action(PUSH, vec![Binding::Single(ParsedParameter::instance(safe))]);
    assert!(matches!(result, Err(Unwind::Abort)));
    let output = vm.host_mut().take_output();
    assert!(output.contains("The safe is locked."));
    assert!(!output.contains("Opened."));

    assert!(!vm.possible(PUSH, vec![Parameter::new(safe)])?);
    Ok(())
}

#[test]
fn a_verb_nobody_handles() -> anyhow::Result<()> {
    let mut b = ImageBuilder::new();
    let room = b.location("room");
    b.hero_at(room);

    let mut vm = started(b)?;
    assert!(matches!(vm.action(TAKE, vec![]), Err(Unwind::Abort)));
    assert!(vm.host_mut().take_output().contains("You can't do that."));
    Ok(())
}

#[test]
fn multiple_objects_run_one_by_one() -> anyhow::Result<()> {
    let mut b = ImageBuilder::new();
    let room = b.location("room");
    b.hero_at(room);
    let button = b.object("button", room);
    let knob = b.object("knob", room);
    let lever = b.object("lever", room);

    let taken = alt(&mut b, 0, Qualifier::Default, "Taken.");
    let global = b.verbs(&[(TAKE, vec![taken])]);
    b.global_verbs(global);
    let mut stuck = alt(&mut b, 1, Qualifier::Only, "Never.");
    stuck.checks = b.check(&[push(0)], "The knob is stuck.");
    let verbs = b.verbs(&[(TAKE, vec![stuck])]);
    b.instance_mut(knob).verbs = verbs;

    let mut vm = started(b)?;
    let items = [button, knob, lever].map(ParsedParameter::instance).to_vec();
    vm.action(TAKE, vec![Binding::Multiple(items)])?;

    let output = vm.host_mut().take_output();
    assert!(output.contains("(button) Taken."));
    assert!(output.contains("(knob) The knob is stuck."));
    assert!(output.contains("(lever) Taken."));
    assert!(!output.contains("Never."));
    assert_eq!(vm.parameters()[0].instance, 0);

    assert!(matches!(vm.action(TAKE, vec![Binding::Multiple(vec![])]), Err(Unwind::Abort)));
    assert!(vm.host_mut().take_output().contains("That doesn't leave much to do."));
    Ok(())
}

#[test]
fn an_abort_leaves_nothing_on_the_stack_for_the_next_item() -> anyhow::Result<()> {
    let mut b = ImageBuilder::new();
    let room = b.location("room");
    b.hero_at(room);
    let knob = b.object("knob", room);
    b.container(knob, OBJECT);
    let lever = b.object("lever", room);

    let taken = alt(&mut b, 0, Qualifier::Default, "Taken.");
    let global = b.verbs(&[(TAKE, vec![taken])]);
    b.global_verbs(global);
    // Leaves 42 on the stack, then aborts on the impossible LOCATE.
    let mut stuck = vec![push(42)];
    stuck.extend(locate(knob, knob));
    let stuck = b.alternative(1, Qualifier::Only, &stuck);
    let verbs = b.verbs(&[(TAKE, vec![stuck])]);
    b.instance_mut(knob).verbs = verbs;

    let mut vm = started(b)?;
    let items = [knob, lever].map(ParsedParameter::instance).to_vec();
    vm.action(TAKE, vec![Binding::Multiple(items)])?;

    let output = vm.host_mut().take_output();
    assert!(output.contains("Putting the knob in itself is impossible."));
    assert!(output.contains("(lever) Taken."));
    assert_eq!(vm.stack().depth(), 0);
    Ok(())
}

#[test]
fn containers_of_a_parameter_add_their_verbs() -> anyhow::Result<()> {
    let mut b = ImageBuilder::new();
    let room = b.location("room");
    b.hero_at(room);
    let chest = b.object("chest", room);
    b.container(chest, OBJECT);
    let purse = b.object("purse", chest);
    b.container(purse, OBJECT);
    let coin = b.object("coin", purse);

    let taken = alt(&mut b, 0, Qualifier::Default, "Taken.");
    let global = b.verbs(&[(TAKE, vec![taken])]);
    b.global_verbs(global);
    let creak = alt(&mut b, 0, Qualifier::Before, "Creak.");
    let verbs = b.verbs(&[(TAKE, vec![creak])]);
    b.instance_mut(chest).verbs = verbs;
    let rustle = alt(&mut b, 0, Qualifier::Before, "Rustle.");
    let verbs = b.verbs(&[(TAKE, vec![rustle])]);
    b.instance_mut(purse).verbs = verbs;

    let mut vm = started(b)?;
    vm.current_mut().verb = TAKE;
    vm.set_parameters(vec![Parameter::new(coin)]);
    let found = vm.find_all_alternatives();
    let instances: Vec<Aint> = found.iter().map(|a| a.instance).collect();
    assert_eq!(instances, vec![coin, chest, purse]);
    assert!(found[1..].iter().all(|a| a.level == AltLevel::Parameter && a.parameter == 1));

    vm.action(TAKE, vec![Binding::Single(ParsedParameter::instance(coin))])?;
    assert_eq!(words(&vm.host_mut().take_output()), vec!["Rustle.", "Creak.", "Taken."]);
    Ok(())
}

#[test]
fn going_through_an_exit() -> anyhow::Result<()> {
    let mut b = ImageBuilder::new();
    let kitchen = b.location("kitchen");
    let hall = b.location("hall");
    b.hero_at(kitchen);
    b.exits(kitchen, &[ExitEntry { code: NORTH, checks: 0, action: 0, target: hall }]);
    b.describe(hall, "A draughty hall.");

    let mut vm = started(b)?;
    assert!(matches!(vm.go(kitchen, SOUTH), Err(Unwind::Abort)));
    assert!(vm.host_mut().take_output().contains("You can't go that way."));

    vm.go(kitchen, NORTH)?;
    assert_eq!(vm.admin(HERO).map(|a| a.location), Some(hall));
    assert!(vm.host_mut().take_output().contains("A draughty hall."));
    Ok(())
}

#[test]
fn a_failed_exit_check_is_not_an_error() -> anyhow::Result<()> {
    let mut b = ImageBuilder::new();
    let kitchen = b.location("kitchen");
    let hall = b.location("hall");
    b.hero_at(kitchen);
    let locked = b.check(&[push(0)], "The door is locked.");
    b.exits(kitchen, &[ExitEntry { code: NORTH, checks: locked, action: 0, target: hall }]);

    let mut vm = started(b)?;
    vm.go(kitchen, NORTH)?;
    assert_eq!(vm.admin(HERO).map(|a| a.location), Some(kitchen));
    assert_eq!(words(&vm.host_mut().take_output()), words("The door is locked."));
    Ok(())
}

// -------------------------
// Attributes and output
// -------------------------

#[test]
fn attribute_statements() -> anyhow::Result<()> {
    const WEIGHT: Aint = 3;
    const LABEL: Aint = 4;
    const KEYS: Aint = 5;

    let mut b = ImageBuilder::new();
    let room = b.location("room");
    b.hero_at(room);
    let box_ = b.object("box", room);
    b.attribute(box_, WEIGHT, 2);
    b.string_attribute(box_, LABEL, "fragile glass");
    b.set_attribute(box_, KEYS, &[room, HERO]);
    let mut start = increase(box_, WEIGHT);
    start.extend([push(1), push(1), push(1), push(box_), push(LABEL), op(StmOp::Strip), op(StmOp::Pop)]);
    b.start(&start);

    let vm = started(b)?;
    assert_eq!(vm.instance_int_attribute(box_, WEIGHT)?, 3);
    assert_eq!(vm.instance_string_attribute(box_, LABEL)?, "glass");
    let Value::Set(keys) = vm.instance_attribute(box_, KEYS)? else {
        anyhow::bail!("KEYS is not a set");
    };
    assert_eq!(keys.len(), 2);
    assert!(keys.contains(HERO));
    Ok(())
}

#[test]
fn freed_literals_hand_out_their_ids_again() -> anyhow::Result<()> {
    let mut b = ImageBuilder::new();
    let room = b.location("room");
    b.hero_at(room);
    let mut vm = started(b)?;
    let max = vm.program().header().instance_max as Aint;

    let seven = vm.create_integer_literal(7);
    let word = vm.create_string_literal("xyzzy".to_string());
    assert_eq!((seven, word), (max + 1, max + 2));
    vm.say(seven)?;
    assert_eq!(words(&vm.host_mut().take_output()), vec!["7"]);

    vm.free_literals();
    assert!(vm.literals().is_empty());
    assert_eq!(vm.create_integer_literal(3), max + 1);
    assert_eq!(vm.literals()[0].value, Value::Int(3));
    Ok(())
}

#[test]
fn output_spacing_and_capitals() -> anyhow::Result<()> {
    let mut b = ImageBuilder::new();
    let room = b.location("room");
    b.hero_at(room);
    let mut vm = vm_for(b)?;

    vm.output("hello world.")?;
    vm.output("next")?;
    vm.output(", then")?;
    vm.output("$pnew paragraph")?;
    vm.output(".$pdone")?;
    vm.output(": more")?;
    assert_eq!(vm.host().output(), "hello world. Next, then \n\nNew paragraph.\n\nDone : more");
    Ok(())
}
