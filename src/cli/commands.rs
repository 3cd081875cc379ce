use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tally", about = concat!("tally v", env!("CARGO_PKG_VERSION"), " - habits and events, one day at a time"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Run against a different directory
    #[arg(short = 'C', long = "dir", global = true)]
    pub dir: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create tally/ in the current directory
    Init(InitArgs),
    /// Manage categories
    Category(CategoryCmd),
    /// Create a tracker
    Add(AddArgs),
    /// Change a tracker's fields
    Edit(EditArgs),
    /// Delete a tracker and its records
    Delete(IdArg),
    /// Pin a tracker to the top of the list
    Pin(IdArg),
    /// Unpin a tracker
    Unpin(IdArg),
    /// Toggle completion of a tracker on a day
    Done(DoneArgs),
    /// List trackers for a day, grouped by category
    List(ListArgs),
    /// Show one tracker
    Show(ShowArgs),
    /// Show completion statistics
    Stats,
    /// Show or change the saved filter
    Filter(FilterArgs),
    /// Read or change tally.toml
    Config(ConfigCmd),
    /// Follow data.json and print list changes as they happen
    Watch(WatchArgs),
}

// ---------------------------------------------------------------------------
// Setup
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct InitArgs {
    /// Create a starting category (repeatable)
    #[arg(long = "category", short = 'c', value_name = "TITLE")]
    pub categories: Vec<String>,
    /// Reset data.json even if tally/ already exists
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct CategoryCmd {
    #[command(subcommand)]
    pub action: CategoryAction,
}

#[derive(Subcommand)]
pub enum CategoryAction {
    /// List categories with their tracker counts
    List,
    /// Create a category
    Add {
        title: String,
    },
    /// Rename a category (its trackers follow)
    Rename {
        from: String,
        to: String,
    },
    /// Delete an empty category
    Delete {
        title: String,
    },
}

// ---------------------------------------------------------------------------
// Tracker writes
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct AddArgs {
    /// Tracker title (at most 38 characters)
    pub title: String,
    /// Category the tracker belongs to
    #[arg(long, short = 'c')]
    pub category: String,
    /// Weekdays, e.g. "mon,wed,fri" or "daily" (omit for an irregular event)
    #[arg(long, short = 'd')]
    pub days: Option<String>,
    #[arg(long, default_value = "⭐")]
    pub emoji: String,
    /// Colour as #RRGGBB
    #[arg(long, default_value = "#33CF69")]
    pub color: String,
    /// Pin the new tracker
    #[arg(long)]
    pub pin: bool,
}

#[derive(Args)]
pub struct EditArgs {
    /// Tracker id (any unique prefix)
    pub id: String,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long, short = 'c')]
    pub category: Option<String>,
    /// New weekdays, e.g. "sat,sun"
    #[arg(long, short = 'd', conflicts_with = "irregular")]
    pub days: Option<String>,
    /// Make it an irregular event (no weekdays)
    #[arg(long)]
    pub irregular: bool,
    #[arg(long)]
    pub emoji: Option<String>,
    #[arg(long)]
    pub color: Option<String>,
}

#[derive(Args)]
pub struct IdArg {
    /// Tracker id (any unique prefix)
    pub id: String,
}

#[derive(Args)]
pub struct DoneArgs {
    /// Tracker id (any unique prefix)
    pub id: String,
    /// Day to toggle (YYYY-MM-DD, today, yesterday); default: today
    #[arg(long)]
    pub date: Option<String>,
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct ListArgs {
    /// Reference day (default: the saved filter's date)
    #[arg(long)]
    pub date: Option<String>,
    /// all, today, completed or not-completed (default: the saved filter's type)
    #[arg(long = "type", short = 't')]
    pub kind: Option<String>,
    /// Only trackers whose title contains this text
    #[arg(long, short = 's')]
    pub search: Option<String>,
    /// List pinned trackers only in the pinned section
    #[arg(long, conflicts_with = "pinned_only")]
    pub exclude_pinned: bool,
    /// List only pinned trackers
    #[arg(long)]
    pub pinned_only: bool,
}

#[derive(Args)]
pub struct ShowArgs {
    /// Tracker id (any unique prefix)
    pub id: String,
    /// Day to evaluate completion on (default: today)
    #[arg(long)]
    pub date: Option<String>,
}

#[derive(Args)]
pub struct FilterArgs {
    /// Set the saved date
    #[arg(long)]
    pub date: Option<String>,
    /// Set the saved type
    #[arg(long = "type", short = 't')]
    pub kind: Option<String>,
    /// Forget the saved type
    #[arg(long, conflicts_with = "kind")]
    pub reset: bool,
}

#[derive(Args)]
pub struct ConfigCmd {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print a value (or every value without a key)
    Get { key: Option<String> },
    /// Set a value, keeping the rest of the file as written
    Set { key: String, value: String },
}

#[derive(Args)]
pub struct WatchArgs {
    /// Stop after this many notifications
    #[arg(long)]
    pub count: Option<usize>,
    /// Stop after this many seconds without changes
    #[arg(long)]
    pub idle_timeout: Option<u64>,
}
