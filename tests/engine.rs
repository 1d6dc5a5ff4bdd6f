use std::path::PathBuf;

use civitas::{
    engine::{EngineBuilder, EngineSettings},
    scenario::{Scenario, ScenarioLoader},
};
use tempfile::tempdir;

fn scenario() -> Scenario {
    ScenarioLoader::new(env!("CARGO_MANIFEST_DIR"))
        .load("scenarios/new_haven.yaml")
        .expect("scenario should load")
}

fn build_engine(scenario: &Scenario, seed: u64, snapshot_interval: u64, dir: PathBuf) -> EngineBuilder {
    let settings = EngineSettings {
        scenario_name: scenario.name.clone(),
        seed,
        snapshot_interval_ticks: snapshot_interval,
        snapshot_dir: dir,
    };
    EngineBuilder::new(settings).with_standard_systems(&scenario.cadence)
}

#[test]
fn engine_runs_hook_each_tick() {
    let scenario = scenario();
    let mut world = scenario.build_world().unwrap();
    let temp = tempdir().expect("tempdir");
    let mut engine = build_engine(&scenario, scenario.seed, 0, temp.path().to_path_buf()).build();

    let mut ticks = Vec::new();
    engine
        .run_with_hook(&mut world, 6, |snapshot| ticks.push(snapshot.tick))
        .expect("run succeeds");

    assert_eq!(ticks, vec![1, 2, 3, 4, 5, 6]);
    assert_eq!(world.days_elapsed(), 6.0);
}

#[test]
fn same_seed_same_city() {
    let scenario = scenario();
    let temp = tempdir().expect("tempdir");
    let run = |seed: u64| {
        let mut world = scenario.build_world().unwrap();
        let mut engine = build_engine(&scenario, seed, 0, temp.path().to_path_buf()).build();
        engine.run(&mut world, 120).unwrap();
        world.snapshot(&scenario.name)
    };

    let first = run(scenario.seed);
    let second = run(scenario.seed);
    assert_eq!(first, second);

    let other = run(scenario.seed + 1);
    assert_ne!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&other).unwrap()
    );
}

#[test]
fn standard_schedule_order_and_cadence() {
    let scenario = scenario();
    let engine = build_engine(&scenario, 1, 0, PathBuf::from("unused")).build();
    assert_eq!(
        engine.schedule(),
        vec![
            ("actions", 1),
            ("maintenance", 1),
            ("disasters", 1),
            ("population", 1),
            ("citizens", 1),
            ("economy", 30),
            ("achievements", 7),
            ("bookkeeping", 1),
        ]
    );
}

#[test]
fn economy_closes_once_a_month() {
    let scenario = scenario();
    let mut world = scenario.build_world().unwrap();
    let mut engine = build_engine(&scenario, scenario.seed, 0, PathBuf::from("unused")).build();

    engine.run(&mut world, 29).unwrap();
    assert_eq!(world.ledger().months_elapsed, 0);
    assert!(world.ledger().last_report().is_none());

    engine.run(&mut world, 1).unwrap();
    assert_eq!(world.ledger().months_elapsed, 1);
    assert_eq!(world.ledger().last_report().map(|r| r.month), Some(1));

    engine.run(&mut world, 30).unwrap();
    assert_eq!(world.ledger().months_elapsed, 2);
}

#[test]
fn snapshots_are_written_on_interval() {
    let scenario = scenario();
    let mut world = scenario.build_world().unwrap();
    let temp = tempdir().expect("tempdir");
    let mut engine = build_engine(&scenario, scenario.seed, 10, temp.path().to_path_buf()).build();
    engine.run(&mut world, 30).unwrap();

    let dir = temp.path().join("new_haven");
    for tick in [10, 20, 30] {
        let path = dir.join(format!("tick_{tick:06}.json"));
        let contents = std::fs::read_to_string(&path).expect("snapshot exists");
        assert!(contents.contains("\"scenario\": \"new_haven\""));
        assert!(contents.contains(&format!("\"tick\": {tick}")));
    }
    assert!(!dir.join("tick_000015.json").exists());
}
