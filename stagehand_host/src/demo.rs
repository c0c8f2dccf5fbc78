//! Built-in cutscene library used by the host.

use stagehand_engine::{
    BranchTable, Cutscene, CutsceneRegistry, DialogueBeat, Facing, HelperSlot, ScriptedDialogue,
    Sequence, Task, Vec2,
};

pub struct LibraryEntry {
    pub name: &'static str,
    pub summary: &'static str,
    factory: fn() -> Cutscene,
}

pub const LIBRARY: &[LibraryEntry] = &[
    LibraryEntry {
        name: "greet",
        summary: "half a second of small talk, then sets 'greeted'",
        factory: greet,
    },
    LibraryEntry {
        name: "dock_briefing",
        summary: "three-branch dialogue with a lantern helper; sets 'briefed'",
        factory: dock_briefing,
    },
    LibraryEntry {
        name: "ferry_ride",
        summary: "nested boarding tasks and an awaited pan; counts 'ferry_trips'",
        factory: ferry_ride,
    },
];

pub fn registry() -> CutsceneRegistry {
    let mut registry = CutsceneRegistry::new();
    for entry in LIBRARY {
        registry.register(entry.name, entry.factory);
    }
    registry
}

pub fn dialogue() -> ScriptedDialogue {
    ScriptedDialogue::new()
        .script(
            "dock.briefing",
            vec![
                DialogueBeat::Page { frames: 12 },
                DialogueBeat::Milestone(0),
                DialogueBeat::Page { frames: 18 },
                DialogueBeat::Milestone(1),
                DialogueBeat::Page { frames: 18 },
                DialogueBeat::Milestone(2),
                DialogueBeat::Page { frames: 12 },
            ],
        )
        .script(
            "ferry.smalltalk",
            vec![
                DialogueBeat::Page { frames: 10 },
                DialogueBeat::Page { frames: 10 },
            ],
        )
}

pub fn print_library() {
    println!("Built-in cutscenes:");
    for entry in LIBRARY {
        println!("  - {:<14} {}", entry.name, entry.summary);
    }
}

fn greet() -> Cutscene {
    Sequence::new("greet")
        .sound("hello")
        .wait_seconds(0.5)
        .set_flag("greeted")
        .build()
}

fn dock_briefing() -> Cutscene {
    let lantern = HelperSlot::default();
    Sequence::new("dock_briefing")
        .controls("mentor")
        .camera(|fx| fx.zoom(1.25, 0.4))
        .wait_seconds(0.4)
        .face("mentor", Facing::Left)
        .dialogue("dock.briefing", move || briefing_branches(lantern.clone()))
        .place("mentor", Vec2::new(9.5, 0.0))
        .place("player", Vec2::new(10.0, 0.0))
        .set_flag("briefed")
        .build()
}

/// The lantern is lit in the first branch and put out in the last; a skip
/// in between leaves it to the director's cleanup.
fn briefing_branches(lantern: HelperSlot) -> BranchTable {
    let light = lantern.clone();
    BranchTable::new()
        .branch("light_lantern", move || {
            Sequence::new("light_lantern")
                .sound("match")
                .spawn_helper("lantern", Vec2::new(6.5, 1.0), light)
                .wait_frames(10)
                .into_task()
        })
        .branch("show_map", || {
            Sequence::new("show_map")
                .camera_and_wait(|fx| fx.pan(Vec2::new(10.0, 0.0), 0.5))
                .wait_seconds(0.25)
                .into_task()
        })
        .branch("douse_lantern", move || {
            Sequence::new("douse_lantern")
                .despawn_helper(lantern)
                .wait_frames(5)
                .into_task()
        })
}

fn ferry_ride() -> Cutscene {
    Sequence::new("ferry_ride")
        .controls("ferryman")
        .sound("bell")
        .wait_for(|_| boarding())
        .dialogue("ferry.smalltalk", BranchTable::new)
        .camera_and_wait(|fx| fx.pan(Vec2::new(20.0, 0.0), 1.5))
        .then(|cx| cx.log_event("ferry.arrived"))
        .place("player", Vec2::new(20.0, 0.0))
        .place("ferryman", Vec2::new(19.0, 0.0))
        .face("ferryman", Facing::Left)
        .increment_counter("ferry_trips")
        .set_flag("crossed")
        .build()
}

fn boarding() -> Task {
    Sequence::new("boarding")
        .wait_seconds(0.3)
        .wait_for(|_| {
            Sequence::new("gangplank")
                .camera(|fx| fx.shake(0.2, 0.2))
                .wait_frames(3)
                .into_task()
        })
        .then(|cx| cx.log_event("ferry.boarded"))
        .into_task()
}
