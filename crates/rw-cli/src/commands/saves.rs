use std::path::Path;

use rw_engine::{JsonFileStore, StateStore};

pub fn run(dir: &Path, saves: Option<&Path>) -> Result<(), String> {
    let store = JsonFileStore::new(super::saves_dir(dir, saves));
    let slots = store.list().map_err(|e| e.to_string())?;

    if slots.is_empty() {
        println!("  No saves in {}.", store.dir().display());
        return Ok(());
    }
    for slot in &slots {
        println!("  {slot}");
    }
    Ok(())
}
