use arun_core::acode::{Aint, Qualifier, StmOp};
use arun_core::host::Command;
use arun_core::testing::*;
use arun_core::version::Version;
use arun_core::world::{Set, Value};
use arun_core::{Options, Unwind, Vm};
use pretty_assertions::assert_eq;

type TestVm = Vm<ScriptedHost>;

fn vm_with_host(b: ImageBuilder, host: ScriptedHost) -> anyhow::Result<TestVm> {
    let options = Options::default();
    let program = b.program(&options)?;
    Ok(Vm::new(program, host, options)?)
}

fn started(b: ImageBuilder, host: ScriptedHost) -> anyhow::Result<TestVm> {
    let mut vm = vm_with_host(b, host)?;
    vm.start()?;
    vm.host_mut().take_output();
    Ok(vm)
}

fn forfeits(turns: usize) -> ScriptedHost {
    let mut host = ScriptedHost::new();
    for _ in 0..turns {
        host.push_command("", Command::Empty);
    }
    host
}

fn int(vm: &TestVm, id: Aint, atr: Aint) -> Option<Aint> {
    vm.admin(id).and_then(|a| a.attribute(atr)).and_then(Value::as_int)
}

// -------------------------
// Events
// -------------------------

#[test]
fn events_count_down_and_fire_in_order() -> anyhow::Result<()> {
    let mut b = ImageBuilder::new();
    let room = b.location("room");
    b.hero_at(room);
    let clock = b.print("The clock strikes.");
    let clock = b.event(&clock);
    let bell = b.print("The bell rings.");
    let bell = b.event(&bell);
    let gong = b.print("The gong sounds.");
    let gong = b.event(&gong);
    let mut start = schedule(clock, room, 3);
    start.extend(schedule(bell, room, 1));
    start.extend(schedule(gong, room, 2));
    b.start(&start);

    let mut vm = started(b, forfeits(3))?;
    let afters = |vm: &TestVm| vm.events().entries().iter().map(|e| (e.event, e.after)).collect::<Vec<_>>();
    assert_eq!(afters(&vm), vec![(clock, 3), (gong, 2), (bell, 1)]);

    vm.tick()?;
    assert_eq!(afters(&vm), vec![(clock, 2), (gong, 1), (bell, 0)]);
    assert!(!vm.host().output().contains("rings"));

    vm.tick()?;
    assert!(vm.host_mut().take_output().contains("The bell rings."));
    assert_eq!(afters(&vm), vec![(clock, 1), (gong, 0)]);

    vm.tick()?;
    let output = vm.host_mut().take_output();
    assert!(output.contains("The gong sounds."));
    assert!(!output.contains("clock"));
    assert_eq!(vm.current().tick, 2);
    Ok(())
}

#[test]
fn rescheduling_replaces_and_cancel_removes() -> anyhow::Result<()> {
    let mut b = ImageBuilder::new();
    let room = b.location("room");
    b.hero_at(room);
    let noise = b.print("A noise.");
    let noise = b.event(&noise);
    let mut start = schedule(noise, room, 5);
    start.extend(schedule(noise, room, 2));
    b.start(&start);

    let mut vm = started(b, ScriptedHost::new())?;
    assert_eq!(vm.events().len(), 1);
    assert_eq!(vm.events().entries()[0].after, 2);

    vm.cancel_event(noise);
    assert!(vm.events().is_empty());
    assert!(vm.schedule(0, room, 1).is_err());
    Ok(())
}

// -------------------------
// Actors
// -------------------------

#[test]
fn actors_follow_their_scripts() -> anyhow::Result<()> {
    const NAP: Aint = 1;

    let mut b = ImageBuilder::new();
    let room = b.location("room");
    b.hero_at(room);
    let cat = b.actor("cat", room);
    let yawn = b.print("The cat yawns.");
    let sleep = b.print("The cat sleeps.");
    b.script(NAP, &[(vec![], vec![], yawn), (vec![push(1)], vec![], sleep)]);
    b.start(&use_script(cat, NAP));

    let mut vm = started(b, forfeits(3))?;
    assert_eq!(vm.admin(cat).map(|a| a.script), Some(NAP));

    vm.tick()?;
    assert!(vm.host_mut().take_output().contains("The cat yawns."));
    assert_eq!(vm.admin(cat).map(|a| (a.step, a.wait_count)), Some((1, 1)));

    vm.tick()?;
    assert!(!vm.host_mut().take_output().contains("The cat"));
    assert_eq!(vm.admin(cat).map(|a| a.wait_count), Some(0));

    vm.tick()?;
    assert!(vm.host_mut().take_output().contains("The cat sleeps."));
    assert_eq!(vm.admin(cat).map(|a| a.script), Some(0));
    Ok(())
}

#[test]
fn only_actors_can_use_scripts() -> anyhow::Result<()> {
    let mut b = ImageBuilder::new();
    let room = b.location("room");
    b.hero_at(room);
    let rock = b.object("rock", room);

    let mut vm = started(b, ScriptedHost::new())?;
    assert!(matches!(vm.use_script(rock, 1), Err(Unwind::Fatal(_))));
    Ok(())
}

// -------------------------
// Rules
// -------------------------

const LEVEL: Aint = 3;
const FIRED: Aint = 4;

fn gauge_game() -> (ImageBuilder, Aint) {
    let mut b = ImageBuilder::new();
    let room = b.location("room");
    b.hero_at(room);
    let gauge = b.object("gauge", room);
    b.attribute(gauge, LEVEL, 1);
    b.attribute(gauge, FIRED, 0);
    let mut exp = attribute(gauge, LEVEL);
    exp.extend([push(0), op(StmOp::Gt)]);
    b.rule(&exp, &increase(gauge, FIRED));
    (b, gauge)
}

#[test]
fn rules_fire_when_their_condition_becomes_true() -> anyhow::Result<()> {
    let (b, gauge) = gauge_game();
    let mut vm = started(b, ScriptedHost::new())?;
    assert_eq!(int(&vm, gauge, FIRED), Some(1));

    vm.evaluate_rules()?;
    assert_eq!(int(&vm, gauge, FIRED), Some(1));

    vm.set_instance_attribute(gauge, LEVEL, Value::Int(0))?;
    vm.evaluate_rules()?;
    vm.set_instance_attribute(gauge, LEVEL, Value::Int(5))?;
    vm.evaluate_rules()?;
    assert_eq!(int(&vm, gauge, FIRED), Some(2));
    Ok(())
}

#[test]
fn old_games_fire_rules_while_true() -> anyhow::Result<()> {
    let (b, gauge) = gauge_game();
    let b = b.with_version(Version::new(3, 0, 1, b'b'));
    let mut vm = started(b, ScriptedHost::new())?;
    assert_eq!(int(&vm, gauge, FIRED), Some(1));

    vm.evaluate_rules()?;
    vm.evaluate_rules()?;
    assert_eq!(int(&vm, gauge, FIRED), Some(3));
    Ok(())
}

// -------------------------
// Undo
// -------------------------

#[test]
fn game_states_are_recalled_newest_first() -> anyhow::Result<()> {
    let (b, gauge) = gauge_game();
    let mut vm = started(b, ScriptedHost::new())?;

    vm.remember_game_state();
    vm.set_instance_attribute(gauge, LEVEL, Value::Int(7))?;
    vm.remember_game_state();
    vm.set_instance_attribute(gauge, LEVEL, Value::Int(9))?;
    assert_eq!(vm.saved_states(), 2);

    vm.recall_game_state()?;
    assert_eq!(int(&vm, gauge, LEVEL), Some(7));
    vm.recall_game_state()?;
    assert_eq!(int(&vm, gauge, LEVEL), Some(1));
    assert!(!vm.any_saved_state());
    assert!(vm.recall_game_state().is_err());
    Ok(())
}

#[test]
fn recalled_states_bring_back_strings_and_sets() -> anyhow::Result<()> {
    const LABEL: Aint = 5;
    const KEYS: Aint = 6;

    let mut b = ImageBuilder::new();
    let room = b.location("room");
    b.hero_at(room);
    let crate_ = b.object("crate", room);
    b.string_attribute(crate_, LABEL, "fragile");
    b.set_attribute(crate_, KEYS, &[room]);
    let mut vm = started(b, ScriptedHost::new())?;

    vm.remember_game_state();
    vm.set_instance_attribute(crate_, LABEL, Value::Str("broken".to_string()))?;
    vm.set_instance_attribute(crate_, KEYS, Value::Set(Set::from_members([room, HERO])))?;
    assert_eq!(vm.instance_string_attribute(crate_, LABEL)?, "broken");

    vm.recall_game_state()?;
    assert_eq!(vm.instance_string_attribute(crate_, LABEL)?, "fragile");
    let Value::Set(keys) = vm.instance_attribute(crate_, KEYS)? else {
        anyhow::bail!("KEYS is not a set");
    };
    assert_eq!(keys.len(), 1);
    assert!(keys.contains(room));
    assert!(!keys.contains(HERO));
    Ok(())
}

#[test]
fn undo_takes_back_the_last_command() -> anyhow::Result<()> {
    const PUSH: Aint = 1;
    const PRESSES: Aint = 3;

    let mut b = ImageBuilder::new();
    let room = b.location("room");
    b.hero_at(room);
    let button = b.object("button", room);
    b.attribute(button, PRESSES, 0);
    let mut press = increase(button, PRESSES);
    press.extend(b.print("Click."));
    let press = b.alternative(0, Qualifier::Default, &press);
    let verbs = b.verbs(&[(PUSH, vec![press])]);
    b.global_verbs(verbs);

    let host = ScriptedHost::new()
        .with_command("push button", Command::Action { verb: PUSH, verb_word: None, parameters: vec![] })
        .with_command("undo", Command::Undo)
        .with_command("undo", Command::Undo);
    let mut vm = vm_with_host(b, host)?;
    vm.run()?;

    let output = vm.host().output().to_string();
    assert!(output.contains("Click."));
    assert!(output.contains("'push button' undone."));
    assert!(output.contains("No further undo available."));
    assert!(output.contains("Do you want to RESTART, RESTORE, QUIT or UNDO?"));
    assert_eq!(int(&vm, button, PRESSES), Some(0));
    Ok(())
}

// -------------------------
// Score, save and restore
// -------------------------

#[test]
fn each_score_is_awarded_once() -> anyhow::Result<()> {
    let mut b = ImageBuilder::new();
    let room = b.location("room");
    b.hero_at(room);
    let found = b.score(10);
    b.score(5);

    let mut vm = started(b, ScriptedHost::new())?;
    vm.score(found)?;
    vm.score(found)?;
    assert_eq!(vm.current().score, 10);
    assert_eq!(vm.scores(), &[0, 5]);

    vm.score(0)?;
    assert!(vm.host_mut().take_output().contains("You have scored 10 points out of 15."));
    assert!(vm.score(3).is_err());
    Ok(())
}

fn saving_game() -> anyhow::Result<(TestVm, Aint)> {
    let (b, gauge) = gauge_game();
    Ok((started(b, ScriptedHost::new())?, gauge))
}

#[test]
fn restore_brings_back_a_saved_game() -> anyhow::Result<()> {
    let (mut vm, gauge) = saving_game()?;
    vm.set_instance_attribute(gauge, LEVEL, Value::Int(5))?;
    vm.current_mut().score = 42;

    vm.host_mut().push_line("gauge.sav");
    vm.save_game()?;
    assert!(vm.host().saves.contains_key("gauge.sav"));
    assert_eq!(vm.save_file_name(), "gauge.sav");

    vm.set_instance_attribute(gauge, LEVEL, Value::Int(9))?;
    vm.current_mut().score = 0;
    vm.host_mut().push_line("");
    vm.restore_game()?;
    assert_eq!(int(&vm, gauge, LEVEL), Some(5));
    assert_eq!(vm.current().score, 42);
    Ok(())
}

#[test]
fn restore_refuses_foreign_files() -> anyhow::Result<()> {
    let (mut vm, _) = saving_game()?;

    vm.host_mut().push_line("missing.sav");
    assert!(matches!(vm.restore_game(), Err(Unwind::Abort)));
    assert!(vm.host_mut().take_output().contains("Sorry, could not open the save file."));

    vm.host_mut().saves.insert("junk.sav".to_string(), b"not a save".to_vec());
    vm.host_mut().push_line("junk.sav");
    assert!(matches!(vm.restore_game(), Err(Unwind::Abort)));
    assert!(vm.host_mut().take_output().contains("Sorry, that is not a save file."));

    let mut other = vm.capture_save_game();
    other.uid += 1;
    let bytes = other.to_bytes()?;
    vm.host_mut().saves.insert("other.sav".to_string(), bytes);
    vm.host_mut().push_line("other.sav");
    assert!(matches!(vm.restore_game(), Err(Unwind::Abort)));
    assert!(vm.host_mut().take_output().contains("Sorry, the save file is for another game."));
    Ok(())
}

#[test]
fn overwriting_a_save_needs_confirmation() -> anyhow::Result<()> {
    let (mut vm, _) = saving_game()?;
    vm.host_mut().saves.insert("game.sav".to_string(), Vec::new());

    vm.host_mut().push_line("game.sav");
    vm.host_mut().push_line("no");
    assert!(matches!(vm.save_game(), Err(Unwind::Abort)));
    assert_eq!(vm.host().saves.get("game.sav").map(Vec::len), Some(0));

    vm.host_mut().push_line("game.sav");
    vm.host_mut().push_line("");
    vm.save_game()?;
    assert!(vm.host().saves.get("game.sav").is_some_and(|data| data.starts_with(b"ASAV")));
    Ok(())
}
