mod init;
pub use init::cmd_init;

use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use tracing::{debug, warn};

/// Global override for the starting directory (set by -C)
static DIR_OVERRIDE: Mutex<Option<PathBuf>> = Mutex::new(None);

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::config_io;
use crate::io::data_io::{self, DataError};
use crate::io::state;
use crate::io::store::TrackerStore;
use crate::io::watcher::DataWatcher;
use crate::model::config::TallyConfig;
use crate::model::filter::{Filter, FilterType};
use crate::model::schedule::parse_days;
use crate::model::tracker::{TrackerDraft, TrackerId};
use crate::ops::engine::QueryEngine;
use crate::ops::notifier::Notification;
use crate::ops::query::TrackerView;
use crate::ops::stats;
use crate::util::clock::{Clock, FixedClock, SystemClock};

type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Environment variable pinning "today" to a fixed `YYYY-MM-DD`
pub const TODAY_ENV: &str = "TALLY_TODAY";

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> CmdResult {
    let json = cli.json;

    if let Some(ref dir) = cli.dir {
        let abs = std::fs::canonicalize(dir)
            .map_err(|e| format!("cannot resolve -C path '{}': {}", dir, e))?;
        DIR_OVERRIDE
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(abs);
    }

    match cli.command {
        Commands::Init(args) => cmd_init(args, &start_dir()?),

        Commands::Category(cmd) => cmd_category(cmd.action, json),
        Commands::Add(args) => cmd_add(args, json),
        Commands::Edit(args) => cmd_edit(args, json),
        Commands::Delete(args) => cmd_delete(args),
        Commands::Pin(args) => cmd_pin(args, true),
        Commands::Unpin(args) => cmd_pin(args, false),
        Commands::Done(args) => cmd_done(args, json),

        Commands::List(args) => cmd_list(args, json),
        Commands::Show(args) => cmd_show(args, json),
        Commands::Stats => cmd_stats(json),
        Commands::Filter(args) => cmd_filter(args, json),
        Commands::Config(cmd) => cmd_config(cmd.action, json),
        Commands::Watch(args) => cmd_watch(args, json),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn start_dir() -> Result<PathBuf, DataError> {
    let override_dir = DIR_OVERRIDE
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();
    match override_dir {
        Some(dir) => Ok(dir),
        None => Ok(std::env::current_dir()?),
    }
}

/// Locate `tally/` and read its config
fn load_context() -> Result<(PathBuf, TallyConfig), Box<dyn std::error::Error>> {
    let dir = data_io::discover_dir(&start_dir()?)?;
    let (config, _doc) = config_io::read_config(&dir)?;
    debug!(dir = %dir.display(), "using tally directory");
    Ok((dir, config))
}

fn open_store() -> Result<(TrackerStore, TallyConfig), Box<dyn std::error::Error>> {
    let (dir, config) = load_context()?;
    Ok((TrackerStore::open(&dir)?, config))
}

fn clock() -> Result<Box<dyn Clock>, String> {
    match std::env::var(TODAY_ENV) {
        Ok(value) => {
            let date = NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
                .map_err(|_| format!("{} must be YYYY-MM-DD, got '{}'", TODAY_ENV, value))?;
            Ok(Box::new(FixedClock(date)))
        }
        Err(_) => Ok(Box::new(SystemClock)),
    }
}

/// `YYYY-MM-DD`, `today`, `yesterday` or `tomorrow`
fn parse_date(s: &str, today: NaiveDate) -> Result<NaiveDate, String> {
    let s = s.trim();
    let relative = match s.to_ascii_lowercase().as_str() {
        "today" => Some(today),
        "yesterday" => today.pred_opt(),
        "tomorrow" => today.succ_opt(),
        _ => None,
    };
    if let Some(date) = relative {
        return Ok(date);
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| format!("invalid date '{}' (expected YYYY-MM-DD, today, yesterday or tomorrow)", s))
}

fn print_json<T: serde::Serialize>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{}", line);
    }
}

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

fn cmd_category(action: CategoryAction, json: bool) -> CmdResult {
    let (mut store, _config) = open_store()?;
    match action {
        CategoryAction::List => {
            let items: Vec<CategoryJson> = store
                .categories()
                .iter()
                .map(|c| CategoryJson {
                    title: c.title.clone(),
                    trackers: store.dataset().trackers_in(&c.title).count(),
                })
                .collect();
            if json {
                return print_json(&items);
            }
            if items.is_empty() {
                println!("No categories. Add one with `tally category add <title>`.");
            }
            for item in &items {
                println!("{} ({})", item.title, item.trackers);
            }
        }
        CategoryAction::Add { title } => {
            let title = store.add_category(&title)?;
            println!("{}", title);
        }
        CategoryAction::Rename { from, to } => {
            let to = store.rename_category(&from, &to)?;
            println!("{} -> {}", from, to);
        }
        CategoryAction::Delete { title } => {
            store.delete_category(&title)?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tracker writes
// ---------------------------------------------------------------------------

fn cmd_add(args: AddArgs, json: bool) -> CmdResult {
    let (mut store, _config) = open_store()?;
    let days = match args.days.as_deref() {
        Some(days) => parse_days(days)?,
        None => Vec::new(),
    };
    let id = store.add_tracker(TrackerDraft {
        title: args.title,
        color: args.color,
        emoji: args.emoji,
        category: args.category,
        days,
    })?;
    if args.pin {
        store.set_pinned(id, true)?;
    }
    print_tracker_id(&store, id, json)
}

fn cmd_edit(args: EditArgs, json: bool) -> CmdResult {
    let (mut store, _config) = open_store()?;
    let id = store.resolve_id(&args.id)?;
    let tracker = store
        .find(id)
        .ok_or_else(|| format!("tracker not found: {}", args.id))?;

    let mut draft = TrackerDraft::from_tracker(tracker);
    if let Some(title) = args.title {
        draft.title = title;
    }
    if let Some(category) = args.category {
        draft.category = category;
    }
    if let Some(days) = args.days {
        draft.days = parse_days(&days)?;
    }
    if args.irregular {
        draft.days.clear();
    }
    if let Some(emoji) = args.emoji {
        draft.emoji = emoji;
    }
    if let Some(color) = args.color {
        draft.color = color;
    }
    store.update_tracker(id, draft)?;
    print_tracker_id(&store, id, json)
}

fn print_tracker_id(store: &TrackerStore, id: TrackerId, json: bool) -> CmdResult {
    if json {
        let clock = clock()?;
        let today = clock.today();
        let tracker = store
            .find(id)
            .ok_or_else(|| format!("tracker not found: {}", id))?;
        let view = TrackerView::new(tracker, today, today);
        return print_json(&tracker_to_json(&view));
    }
    println!("{}", id.short());
    Ok(())
}

fn cmd_delete(args: IdArg) -> CmdResult {
    let (mut store, _config) = open_store()?;
    let id = store.resolve_id(&args.id)?;
    let removed = store.delete_tracker(id)?;
    println!("deleted {} {}", removed.id.short(), removed.title);
    Ok(())
}

fn cmd_pin(args: IdArg, pinned: bool) -> CmdResult {
    let (mut store, _config) = open_store()?;
    let id = store.resolve_id(&args.id)?;
    store.set_pinned(id, pinned)?;
    Ok(())
}

fn cmd_done(args: DoneArgs, json: bool) -> CmdResult {
    let (mut store, _config) = open_store()?;
    let today = clock()?.today();
    let id = store.resolve_id(&args.id)?;
    let date = match args.date.as_deref() {
        Some(s) => parse_date(s, today)?,
        None => today,
    };
    let completed = store.toggle_completion(id, date, today)?;

    if json {
        return print_json(&ToggleJson {
            id: id.to_string(),
            date,
            completed,
        });
    }
    let title = store.find(id).map(|t| t.title.as_str()).unwrap_or_default();
    let verb = if completed { "done" } else { "not done" };
    println!("{}: {} on {}", verb, title, date);
    Ok(())
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

fn cmd_list(args: ListArgs, json: bool) -> CmdResult {
    let (dir, mut config) = load_context()?;
    let mut store = TrackerStore::open(&dir)?;
    let clock = clock()?;
    let today = clock.today();

    let mut filter = state::restore_filter(&dir, today);
    if let Some(ref date) = args.date {
        filter.set_date(parse_date(date, today)?, today);
    }
    if let Some(ref kind) = args.kind {
        filter.set_kind(kind.parse::<FilterType>()?, today);
    }
    if args.exclude_pinned {
        config.query.exclude_pinned_from_categories = true;
    }

    let mut engine = QueryEngine::new(&mut store, filter, config.query.clone(), clock);
    if args.search.is_some() {
        engine.set_search(&store, args.search.as_deref());
    }
    if args.pinned_only {
        engine.set_pinned_only(&store, Some(true));
    }

    if json {
        return print_json(&ListJson {
            date: engine.filter().date,
            kind: engine.filter().kind,
            search: engine.search().map(str::to_string),
            has_trackers_on_date: engine.has_trackers_on_date(&store),
            sections: engine.query_sections().iter().map(section_to_json).collect(),
        });
    }

    println!(
        "{}",
        format_list_header(&engine.filter(), &config.display.date_format)
    );
    println!();
    if engine.section_count() == 0 && !engine.has_trackers_on_date(&store) {
        println!("nothing scheduled");
        return Ok(());
    }
    print_lines(&format_sections(engine.query_sections()));
    Ok(())
}

fn cmd_show(args: ShowArgs, json: bool) -> CmdResult {
    let (mut store, config) = open_store()?;
    let clock = clock()?;
    let today = clock.today();
    let id = store.resolve_id(&args.id)?;
    let date = match args.date.as_deref() {
        Some(s) => parse_date(s, today)?,
        None => today,
    };

    let engine = QueryEngine::new(
        &mut store,
        Filter::new(date, FilterType::All, today),
        config.query.clone(),
        clock,
    );
    let view = engine
        .find_by_id(&store, id)
        .ok_or_else(|| format!("tracker not found: {}", args.id))?;

    if json {
        return print_json(&tracker_to_json(&view));
    }
    print_lines(&format_tracker_detail(
        &view,
        date,
        &config.display.date_format,
    ));
    Ok(())
}

fn cmd_stats(json: bool) -> CmdResult {
    let (store, config) = open_store()?;
    let stats = stats::compute(store.dataset());
    if json {
        return print_json(&stats);
    }
    print_lines(&format_stats(&stats, &config.display.date_format));
    Ok(())
}

fn cmd_filter(args: FilterArgs, json: bool) -> CmdResult {
    let (dir, _config) = load_context()?;
    let today = clock()?.today();

    let filter = if args.reset {
        let mut filter = state::reset_filter(&dir, today)?;
        if let Some(ref date) = args.date {
            filter.set_date(parse_date(date, today)?, today);
            state::save_filter(&dir, &filter)?;
        }
        filter
    } else {
        let mut filter = state::restore_filter(&dir, today);
        if args.date.is_some() || args.kind.is_some() {
            if let Some(ref kind) = args.kind {
                filter.set_kind(kind.parse::<FilterType>()?, today);
            }
            if let Some(ref date) = args.date {
                filter.set_date(parse_date(date, today)?, today);
            }
            state::save_filter(&dir, &filter)?;
        }
        filter
    };

    if json {
        return print_json(&filter);
    }
    println!("{} {}", filter.date, filter.kind);
    Ok(())
}

fn cmd_config(action: ConfigAction, json: bool) -> CmdResult {
    let dir = data_io::discover_dir(&start_dir()?)?;
    let (config, mut doc) = config_io::read_config(&dir)?;
    match action {
        ConfigAction::Get { key } => {
            let keys: Vec<&str> = match key.as_deref() {
                Some(key) => vec![key],
                None => config_io::KEYS.to_vec(),
            };
            let mut values = Vec::new();
            for key in keys {
                values.push(ConfigValueJson {
                    key: key.to_string(),
                    value: config_io::get_value(&config, key)?,
                });
            }
            if json {
                return print_json(&values);
            }
            if values.len() == 1 {
                println!("{}", values[0].value);
            } else {
                for v in &values {
                    println!("{} = {}", v.key, v.value);
                }
            }
        }
        ConfigAction::Set { key, value } => {
            config_io::set_value(&mut doc, &key, &value)?;
            config_io::write_config(&dir, &doc)?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Watch
// ---------------------------------------------------------------------------

const WATCH_POLL: Duration = Duration::from_millis(250);
const WATCH_SETTLE: Duration = Duration::from_millis(50);

fn print_notification(notification: &Notification, engine: &QueryEngine, json: bool) -> CmdResult {
    if json {
        println!("{}", serde_json::to_string(notification)?);
        return Ok(());
    }
    print_lines(&format_notification(notification));
    print_lines(&format_sections(engine.query_sections()));
    println!();
    Ok(())
}

fn cmd_watch(args: WatchArgs, json: bool) -> CmdResult {
    let (dir, config) = load_context()?;
    let mut store = TrackerStore::open(&dir)?;
    let clock = clock()?;
    let filter = state::restore_filter(&dir, clock.today());
    let mut engine = QueryEngine::new(&mut store, filter, config.query.clone(), clock);
    let watcher = DataWatcher::start(&dir)?;

    if !json {
        println!(
            "{}",
            format_list_header(&engine.filter(), &config.display.date_format)
        );
        print_lines(&format_sections(engine.query_sections()));
        println!();
    }

    let mut delivered = 0usize;
    let mut last_change = Instant::now();
    loop {
        if let Some(max) = args.count
            && delivered >= max
        {
            break;
        }
        if let Some(secs) = args.idle_timeout
            && last_change.elapsed() >= Duration::from_secs(secs)
        {
            break;
        }
        if watcher.wait(WATCH_POLL, WATCH_SETTLE) {
            last_change = Instant::now();
            if let Err(e) = store.reload() {
                // Usually a half-visible write; the next event retries
                warn!(error = %e, "could not reload data file");
                continue;
            }
        }

        // Also runs on idle polls so a `today` filter follows midnight
        if !engine.process_changes(&store) {
            continue;
        }
        if let Some(notification) = engine.flush() {
            print_notification(&notification, &engine, json)?;
            delivered += 1;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn parse_relative_dates() {
        let today = d(2024, 3, 1);
        assert_eq!(parse_date("today", today).unwrap(), today);
        assert_eq!(parse_date("Yesterday", today).unwrap(), d(2024, 2, 29));
        assert_eq!(parse_date("tomorrow", today).unwrap(), d(2024, 3, 2));
    }

    #[test]
    fn parse_iso_dates() {
        let today = d(2024, 3, 1);
        assert_eq!(parse_date(" 2023-12-31 ", today).unwrap(), d(2023, 12, 31));
        assert!(parse_date("31.12.2023", today).is_err());
        assert!(parse_date("2023-02-30", today).is_err());
    }
}
