use std::path::Path;

pub fn run(dir: &Path) -> Result<(), String> {
    let scenario = super::load_scenario(dir)?;
    let module = &scenario.module;

    println!("  All checks passed for '{}'.", module.name);
    println!(
        "  {} locations, {} NPCs, {} characters",
        module.locations.len(),
        module.npcs.len(),
        scenario.party.characters.len()
    );

    Ok(())
}
