use chronoshade_core::mocks::RecordingActuator;
use chronoshade_core::{CoverSetup, JsonFileStore, MovementController, PositionProfile};
use chronoshade_traits::{PersistedState, PositionStore};
use std::time::{Duration, Instant};

#[test]
fn missing_file_loads_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::new(dir.path().join("state.json"));
    assert_eq!(store.load("kitchen").unwrap(), None);
}

#[test]
fn saves_keep_other_covers() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("state.json");
    let mut store = JsonFileStore::new(&path);
    store
        .save(
            "kitchen",
            &PersistedState {
                position: 40,
                tilt: Some(10),
            },
        )
        .unwrap();
    store
        .save(
            "hall",
            &PersistedState {
                position: 100,
                tilt: None,
            },
        )
        .unwrap();

    let reopened = JsonFileStore::new(&path);
    assert_eq!(
        reopened.load("kitchen").unwrap(),
        Some(PersistedState {
            position: 40,
            tilt: Some(10)
        })
    );
    assert_eq!(reopened.load("hall").unwrap().map(|s| s.tilt), Some(None));

    let text = std::fs::read_to_string(&path).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(doc["kitchen"]["position"], 40);
    assert!(doc["hall"].get("tilt").is_none());
    // no temp file left behind
    let mut names: Vec<_> = std::fs::read_dir(path.parent().unwrap())
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    names.sort();
    assert_eq!(names, ["state.json", "state.json.lock"]);
}

#[test]
fn concurrent_saves_from_separate_stores_all_land() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let rounds = 200u8;

    std::thread::scope(|s| {
        for id in ["porch", "garage"] {
            let path = &path;
            s.spawn(move || {
                let mut store = JsonFileStore::new(path);
                for i in 0..rounds {
                    let state = PersistedState {
                        position: i % 101,
                        tilt: None,
                    };
                    store
                        .save(id, &state)
                        .unwrap_or_else(|e| panic!("{id} save {i} failed: {e}"));
                }
            });
        }
    });

    let store = JsonFileStore::new(&path);
    let last = (rounds - 1) % 101;
    for id in ["porch", "garage"] {
        assert_eq!(store.load(id).unwrap().map(|s| s.position), Some(last), "{id}");
    }
}

#[test]
fn corrupt_file_is_an_error_not_a_reset() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    std::fs::write(&path, "{ not json").unwrap();
    let mut store = JsonFileStore::new(&path);
    assert!(store.load("kitchen").is_err());
    let state = PersistedState {
        position: 1,
        tilt: None,
    };
    assert!(store.save("kitchen", &state).is_err());
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");
}

#[test]
fn controller_restores_from_file_across_restarts() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let setup = || CoverSetup::new("kitchen", PositionProfile::linear(Duration::from_secs(10)).unwrap());

    let t0 = Instant::now();
    let mut c = MovementController::new(setup(), RecordingActuator::new(), JsonFileStore::new(&path));
    c.request_position(70, t0).unwrap();
    c.poll(t0 + Duration::from_secs(8));
    assert_eq!(c.current_position(t0 + Duration::from_secs(8)), 70);
    drop(c);

    let c = MovementController::new(setup(), RecordingActuator::new(), JsonFileStore::new(&path));
    assert_eq!(c.current_position(Instant::now()), 70);
}
