use std::cell::Cell;
use std::rc::Rc;

use stagehand_engine::{
    ActorId, BranchFire, BranchTable, CompletionOutcome, CutsceneRegistry, DialogueBeat,
    DialogueRun, Director, DirectorState, EngineConfig, EngineError, Finale, FireOutcome,
    InvariantViolation, ResourceSet, ScriptContext, ScriptedDialogue, Sequence, Sequencer, Stage,
    StageActors, Task, Trigger, TriggerCondition, Vec2, ViolationPolicy, World,
};

fn strict() -> EngineConfig {
    EngineConfig {
        violations: ViolationPolicy::Panic,
        ..EngineConfig::default()
    }
}

fn actors() -> StageActors {
    let mut actors = StageActors::new();
    actors.insert("player", Vec2::new(0.0, 0.0));
    actors.insert("guide", Vec2::new(8.0, 0.0));
    actors
}

/// Runs whatever a fire produced to completion.
fn run(fire: Result<BranchFire, EngineError>) -> Result<(), EngineError> {
    let mut task = match fire? {
        BranchFire::Run(task) => task,
        BranchFire::AlreadyFired => return Ok(()),
    };
    let sequencer = Sequencer::new(strict());
    let mut world = World::in_memory();
    let mut resources = ResourceSet::new();
    let mut finale = Finale::new();
    let mut cx = ScriptContext::new(
        "branches",
        &mut world,
        &mut resources,
        &mut finale,
        ViolationPolicy::Panic,
    );
    assert_eq!(sequencer.drain(&mut task, 0.0, &mut cx, 10), Some(1));
    Ok(())
}

fn counting_branch(label: &'static str, runs: &Rc<Cell<u32>>) -> impl FnOnce() -> Task {
    let runs = Rc::clone(runs);
    move || Task::once(label, move |_| runs.set(runs.get() + 1))
}

#[test]
fn satisfied_nested_waits_finish_in_one_tick() {
    let sequencer = Sequencer::new(strict());
    let mut world = World::in_memory().with_actors(actors());
    let cutscene = Sequence::new("unwind")
        .wait_for(|_| {
            Sequence::new("first")
                .wait_seconds(0.0)
                .set_flag("first")
                .into_task()
        })
        .wait_for(|_| {
            Sequence::new("second")
                .wait_until(|world| world.flags().get_flag("first"))
                .into_task()
        })
        .wait_for(|_| {
            Sequence::new("third")
                .wait_for(|_| Task::once("leaf", |cx| cx.log_event("leaf")))
                .into_task()
        })
        .set_flag("unwound")
        .build();
    let mut director = Director::new(cutscene, ViolationPolicy::Panic);

    assert_eq!(director.begin(&mut world, &sequencer), DirectorState::Ended);
    assert!(world.flags().get_flag("unwound"));
}

#[test]
fn one_wait_frame_in_the_chain_costs_one_tick() {
    let sequencer = Sequencer::new(strict());
    let mut world = World::in_memory().with_actors(actors());
    let cutscene = Sequence::new("blink")
        .wait_for(|_| Sequence::new("inner").wait_frame().into_task())
        .set_flag("blinked")
        .build();
    let mut director = Director::new(cutscene, ViolationPolicy::Panic);

    assert_eq!(director.begin(&mut world, &sequencer), DirectorState::Running);
    assert_eq!(
        director.update(&mut world, &sequencer, 1.0 / 60.0),
        DirectorState::Ended
    );
    assert!(world.flags().get_flag("blinked"));
}

#[test]
fn branches_reject_reordering_and_run_once() {
    let runs = Rc::new(Cell::new(0));
    let mut table = BranchTable::new()
        .branch("zero", counting_branch("zero", &runs))
        .branch("one", counting_branch("one", &runs))
        .branch("two", counting_branch("two", &runs));

    assert!(run(table.fire(0)).is_ok());
    assert!(run(table.fire(1)).is_ok());
    assert!(run(table.fire(1)).is_ok());
    assert_eq!(runs.get(), 2);

    assert!(run(table.fire(2)).is_ok());
    assert_eq!(
        run(table.fire(1)),
        Err(EngineError::Invariant(InvariantViolation::BranchOutOfOrder {
            requested: 1,
            last: 2
        }))
    );
    assert_eq!(runs.get(), 3);
}

#[test]
fn later_branch_cannot_fire_before_an_earlier_one() {
    let runs = Rc::new(Cell::new(0));
    let mut table = BranchTable::new()
        .branch("zero", counting_branch("zero", &runs))
        .branch("one", counting_branch("one", &runs))
        .branch("two", counting_branch("two", &runs));

    assert!(matches!(
        table.fire(2),
        Err(EngineError::Invariant(InvariantViolation::BranchSkipped {
            requested: 2,
            expected: 0
        }))
    ));
    assert!(matches!(table.fire(0), Ok(BranchFire::Run(_))));
    assert!(matches!(
        table.fire(2),
        Err(EngineError::Invariant(InvariantViolation::BranchSkipped {
            requested: 2,
            expected: 1
        }))
    ));
    assert_eq!(runs.get(), 0);
}

fn gap_stage(config: EngineConfig, runs: &Rc<Cell<u32>>) -> Stage {
    let dialogue = ScriptedDialogue::new().script(
        "gap",
        vec![
            DialogueBeat::Page { frames: 1 },
            DialogueBeat::Milestone(1),
            DialogueBeat::Page { frames: 1 },
        ],
    );
    let mut stage = Stage::new(
        World::in_memory().with_actors(actors()).with_dialogue(dialogue),
        config,
    );
    let first = Rc::clone(runs);
    let second = Rc::clone(runs);
    stage.registry_mut().register_task("gap", move || {
        let table = BranchTable::new()
            .branch("zero", counting_branch("zero", &first))
            .branch("one", counting_branch("one", &second));
        Task::new("dialogue gap", DialogueRun::new("gap", table))
    });
    stage
}

#[test]
fn milestone_one_without_zero_is_dropped_when_lenient() {
    let runs = Rc::new(Cell::new(0));
    let mut stage = gap_stage(EngineConfig::lenient(), &runs);
    let id = stage.place(Trigger::new("gap", "player"));
    stage.fire(id);
    for _ in 0..10 {
        stage.tick(1.0 / 60.0);
    }

    assert_eq!(runs.get(), 0);
    assert_eq!(stage.trigger_count(), 0);
    assert!(stage
        .world()
        .events()
        .iter()
        .any(|event| event.contains("branch 1 fired before branch 0")));
    assert!(!stage.world().actors().is_locked(&ActorId::from("player")));
}

#[test]
#[should_panic(expected = "branch 1 fired before branch 0")]
fn milestone_one_without_zero_panics_when_strict() {
    let runs = Rc::new(Cell::new(0));
    let mut stage = gap_stage(strict(), &runs);
    let id = stage.place(Trigger::new("gap", "player"));
    stage.fire(id);
    for _ in 0..10 {
        stage.tick(1.0 / 60.0);
    }
}

#[test]
fn registry_miss_leaves_the_world_controllable() {
    let mut stage = Stage::new(World::in_memory().with_actors(actors()), strict());
    let id = stage.place(Trigger::new("nonexistent", "player"));

    let outcome = stage.fire(id);

    assert!(matches!(outcome, FireOutcome::Finished(ref completion)
        if completion.outcome == CompletionOutcome::Missing));
    assert!(!stage.world().actors().is_locked(&ActorId::from("player")));
    assert_eq!(stage.trigger_count(), 0);
}

#[test]
fn greet_skipped_immediately_still_greets() {
    let mut registry = CutsceneRegistry::new();
    registry.register("greet", || {
        Sequence::new("greet")
            .wait_seconds(0.5)
            .set_flag("greeted")
            .build()
    });
    let mut stage =
        Stage::new(World::in_memory().with_actors(actors()), strict()).with_registry(registry);
    let id = stage.place(Trigger::new("greet", "player"));

    assert_eq!(stage.fire(id), FireOutcome::Started);
    assert!(stage.request_skip(id));

    assert!(stage.world().flags().get_flag("greeted"));
    assert!(!stage.world().actors().is_locked(&ActorId::from("player")));
}

#[test]
fn two_triggers_on_one_name_run_independently() {
    let mut stage = Stage::new(World::in_memory().with_actors(actors()), strict());
    stage.registry_mut().register("wave", || {
        let steps = Rc::new(Cell::new(0));
        let (a, b, c) = (Rc::clone(&steps), Rc::clone(&steps), Rc::clone(&steps));
        Sequence::new("wave")
            .then(move |_| a.set(a.get() + 1))
            .wait_frame()
            .then(move |_| b.set(b.get() + 1))
            .wait_seconds(0.1)
            .then(move |cx| cx.log_event(format!("wave.steps {}", c.get())))
            .increment_counter("waves")
            .build()
    });
    stage.place(Trigger::new("wave", "player").with_condition(TriggerCondition::when(|_| true)));
    stage.place(Trigger::new("wave", "guide").with_condition(TriggerCondition::when(|_| true)));

    stage.tick(1.0 / 60.0);
    assert_eq!(stage.running(), 2);
    for _ in 0..20 {
        stage.tick(1.0 / 60.0);
    }

    let world = stage.world();
    let steps: Vec<&str> = world
        .events()
        .iter()
        .map(String::as_str)
        .filter(|event| event.starts_with("wave.steps"))
        .collect();
    assert_eq!(steps, vec!["wave.steps 2", "wave.steps 2"]);
    assert_eq!(world.flags().get_counter("waves"), 2);
    assert!(!world.actors().is_locked(&ActorId::from("player")));
    assert!(!world.actors().is_locked(&ActorId::from("guide")));
    assert_eq!(stage.completions().len(), 2);
}
