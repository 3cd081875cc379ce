use std::collections::HashSet;
use std::path::Path;

use crate::cli::commands::InitArgs;
use crate::io::data_io;
use crate::io::store::TrackerStore;
use crate::model::category::normalize_title;

/// Normalize the starting categories, rejecting blanks and duplicates
fn starting_categories(raw: &[String]) -> Result<Vec<String>, String> {
    let mut seen = HashSet::new();
    let mut titles = Vec::new();
    for title in raw {
        let title = normalize_title(title)
            .ok_or_else(|| format!("invalid category title \"{}\"", title))?;
        if !seen.insert(title.clone()) {
            return Err(format!("duplicate category \"{}\"", title));
        }
        titles.push(title);
    }
    Ok(titles)
}

pub fn cmd_init(args: InitArgs, root: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let categories = starting_categories(&args.categories)?;

    if let Some(parent) = root.parent()
        && let Ok(parent_dir) = data_io::discover_dir(parent)
    {
        eprintln!("note: another tally directory exists at {}", parent_dir.display());
    }

    let dir = data_io::init_dir(root, args.force)?;
    let mut store = TrackerStore::open(&dir)?;
    for title in &categories {
        store.add_category(title)?;
    }

    println!("Initialized {}", dir.display());
    for title in &categories {
        println!("  category: {}", title);
    }
    Ok(())
}
