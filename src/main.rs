use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use chrono::{Local, NaiveDateTime};

use lanes::board::mover::{EffectOutcome, MoveHandler, MoveStatus};
use lanes::board::{BucketBoard, CardLayout, CardStrategy, CollapseTarget, DefaultCards, QuickAction};
use lanes::config::{BoardConfig, config_path};
use lanes::core::bucket::BucketKey;
use lanes::core::classify::ViewScope;
use lanes::core::cursor::{CursorStore, page_count, paginate};
use lanes::core::item::{Schedulable, WorkItem, load_items, save_items};
use lanes::Error;

const USAGE: &str = "\
usage: lanes [board] [--resource NAME] [--all] [--page LANE N] [--collapse-all] [--toggle LANE]
       lanes move <id> <lane> [--resource NAME]
       lanes catch-up [--resource NAME]";

enum Command {
    Board,
    Move { id: String, bucket: BucketKey },
    CatchUp,
}

struct Args {
    command: Command,
    resource: String,
    all: bool,
    pages: Vec<(BucketKey, usize)>,
    collapse_all: bool,
    toggled: Vec<BucketKey>,
}

impl Args {
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self, String> {
        let mut positional = Vec::new();
        let mut parsed = Self {
            command: Command::Board,
            resource: "events".to_string(),
            all: false,
            pages: Vec::new(),
            collapse_all: false,
            toggled: Vec::new(),
        };

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--resource" => {
                    parsed.resource = args.next().ok_or("--resource needs a name")?;
                }
                "--all" => parsed.all = true,
                "--page" => {
                    let lane = args.next().ok_or("--page needs a lane")?;
                    let lane: BucketKey = lane.parse().map_err(|e: Error| e.to_string())?;
                    let page = args.next().ok_or("--page needs a number")?;
                    let page: usize = page.parse().map_err(|_| format!("not a page number: {page}"))?;
                    // pages are 1-based on the command line
                    parsed.pages.push((lane, page.saturating_sub(1)));
                }
                "--collapse-all" => parsed.collapse_all = true,
                "--toggle" => {
                    let lane = args.next().ok_or("--toggle needs a lane")?;
                    parsed.toggled.push(lane.parse().map_err(|e: Error| e.to_string())?);
                }
                flag if flag.starts_with("--") => return Err(format!("unknown flag: {flag}")),
                _ => positional.push(arg),
            }
        }

        parsed.command = match positional.as_slice() {
            [] => Command::Board,
            [cmd] if cmd == "board" => Command::Board,
            [cmd] if cmd == "catch-up" => Command::CatchUp,
            [cmd, id, lane] if cmd == "move" => Command::Move {
                id: id.clone(),
                bucket: lane.parse().map_err(|e: Error| e.to_string())?,
            },
            _ => return Err(format!("unexpected arguments: {}", positional.join(" "))),
        };
        Ok(parsed)
    }
}

/// Persists moves by rewriting the resource's item file.
struct FileStore {
    path: PathBuf,
    items: Mutex<Vec<WorkItem>>,
}

impl FileStore {
    fn snapshot(&self) -> Vec<WorkItem> {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl MoveHandler<WorkItem> for FileStore {
    type Error = Error;

    async fn can_move(&self, item: &WorkItem, _target: BucketKey) -> bool {
        !item.is_closed()
    }

    async fn effect(
        &self,
        item: &WorkItem,
        _target: BucketKey,
        proposed: NaiveDateTime,
    ) -> Result<EffectOutcome, Error> {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        let stored = items
            .iter_mut()
            .find(|i| i.id == item.id)
            .ok_or_else(|| Error::ItemNotFound(item.id.to_string()))?;
        stored.reschedule(proposed);
        save_items(&self.path, &items)?;
        Ok(EffectOutcome::Applied)
    }

    fn on_after_move(&self, item: &WorkItem, target: BucketKey) {
        println!("Moved \"{}\" to {}", item.title, target.label());
    }

    fn on_move_error(&self, error: Error, item: &WorkItem, target: BucketKey) {
        log::error!("Failed to move {} to {}: {}", item.id, target, error);
        eprintln!("Could not move \"{}\" to {}: {}", item.title, target.label(), error);
    }
}

type Board = BucketBoard<WorkItem, FileStore>;

fn init_logging(config: &BoardConfig) {
    // Journal output (`journalctl --user -t lanes -f`): this crate at info/debug, the rest at warn.
    struct FilteredJournal {
        inner: systemd_journal_logger::JournalLog,
    }

    impl log::Log for FilteredJournal {
        fn enabled(&self, metadata: &log::Metadata) -> bool {
            if metadata.target().starts_with("lanes") {
                let max = if lanes::debug_logging() { log::LevelFilter::Debug } else { log::LevelFilter::Info };
                metadata.level() <= max
            } else {
                metadata.level() <= log::LevelFilter::Warn
            }
        }
        fn log(&self, record: &log::Record) {
            if self.enabled(record.metadata()) {
                self.inner.log(record);
            }
        }
        fn flush(&self) {
            self.inner.flush();
        }
    }

    lanes::set_debug_logging(config.debug_logging);

    // No journal (containers, non-systemd hosts): run without a logger
    let Ok(journal) = systemd_journal_logger::JournalLog::new() else {
        return;
    };
    let journal = journal.with_syslog_identifier("lanes".to_string());

    if log::set_boxed_logger(Box::new(FilteredJournal { inner: journal })).is_ok() {
        // Global max must be Debug so debug logs can pass through when toggled
        log::set_max_level(log::LevelFilter::Debug);
    }
}

fn print_card(layout: CardLayout, item: &WorkItem) {
    match layout {
        CardLayout::Detailed => {
            let due = match (item.timestamp(), item.due.as_deref()) {
                (Some(ts), _) => ts.format("%a %d %b %H:%M").to_string(),
                (None, Some(raw)) => format!("unreadable date {raw:?}"),
                (None, None) => "no date".to_string(),
            };
            println!("  • {}  [{}] {}  {}", item.title, item.kind.as_str(), due, item.id);
        }
        CardLayout::Compact => {
            let id = item.id.to_string();
            println!("  • {}  {}", item.title, &id[..8]);
        }
        CardLayout::Archived => println!("  ✓ {}", item.title),
    }
}

/// Print every lane, each at its own stored page.
fn print_board(board: &Board, items: &[WorkItem], now: NaiveDateTime, pages: &CursorStore, resource: &str, page_size: usize) {
    for lane in board.lanes(items, now) {
        let marker = if lane.collapsed { "[+]" } else { "[-]" };
        println!("{} {} ({})", marker, lane.label, lane.items.len());
        if lane.collapsed {
            continue;
        }
        let page = pages.page(resource, lane.key);
        let count = page_count(lane.items.len(), page_size);
        for item in paginate(&lane.items, page, page_size) {
            print_card(DefaultCards.layout(lane.key, *item), item);
        }
        if count > 1 {
            println!("    page {}/{}", page.min(count - 1) + 1, count);
        }
    }
}

fn find_item<'a>(items: &'a [WorkItem], id: &str) -> Result<&'a WorkItem, Error> {
    let mut matches = items.iter().filter(|i| i.id.to_string().starts_with(id));
    match (matches.next(), matches.next()) {
        (Some(item), None) => Ok(item),
        _ => Err(Error::ItemNotFound(id.to_string())),
    }
}

async fn move_item(board: &Board, items: &[WorkItem], id: &str, bucket: BucketKey, now: NaiveDateTime) -> Result<bool, Error> {
    let item = find_item(items, id)?;
    let offered = board.quick_actions_for(item, now);
    let Some(action) = QuickAction::for_bucket(bucket).filter(|a| offered.contains(a)) else {
        eprintln!("\"{}\" cannot be moved to {}", item.title, bucket.label());
        return Ok(false);
    };

    let status = board.quick_action(item, action).await;
    match status {
        MoveStatus::Applied | MoveStatus::Failed => {}
        MoveStatus::Aborted => println!("Nothing to do for \"{}\"", item.title),
        MoveStatus::Denied => eprintln!("\"{}\" is closed and cannot be rescheduled", item.title),
        MoveStatus::NoTarget => eprintln!("{} has no date to offer right now", bucket.label()),
        MoveStatus::AlreadyMoving | MoveStatus::Unidentified => {
            log::warn!("Unexpected move status {:?} for {}", status, item.id)
        }
    }
    Ok(status.is_applied())
}

async fn catch_up(board: &Board, items: &[WorkItem], now: NaiveDateTime) {
    let lanes = board.lanes(items, now);
    let overdue: Vec<&WorkItem> = lanes
        .iter()
        .filter(|l| l.key == BucketKey::Overdue)
        .flat_map(|l| l.items.iter().copied())
        .filter(|i| !i.is_closed())
        .collect();

    if overdue.is_empty() {
        println!("Nothing overdue");
        return;
    }

    let statuses = board.mover().request_moves(overdue, BucketKey::Today).await;
    let applied = statuses.iter().filter(|s| s.is_applied()).count();
    println!("Moved {} of {} overdue items to today", applied, statuses.len());
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // The logger needs the config, so a broken file is reported once logging is up
    let (config, load_error) = match BoardConfig::try_load_from(&config_path()) {
        Ok(config) => (config, None),
        Err(e) => (BoardConfig::default(), Some(e)),
    };
    init_logging(&config);
    if let Some(e) = load_error {
        log::warn!("Invalid config at {}, using defaults: {}", config_path().display(), e);
        eprintln!("Ignoring invalid config: {e}");
    }

    let args = match Args::parse(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(msg) => {
            eprintln!("{msg}\n\n{USAGE}");
            std::process::exit(2);
        }
    };

    config.ensure_dirs()?;
    let path = config.items_path(&args.resource);
    let items = load_items(&path);
    log::info!("Loaded {} items from {}", items.len(), path.display());

    let scope = if args.all { ViewScope::All } else { config.view_scope };
    let mut board = Board::new(
        config.policy(),
        FileStore {
            path,
            items: Mutex::new(items.clone()),
        },
    )
    .with_scope(scope);

    if args.collapse_all {
        board.collapse_mut().toggle_global_default();
    }
    for lane in &args.toggled {
        board.collapse_mut().toggle(CollapseTarget::Lane(*lane));
    }

    let now = Local::now().naive_local();
    let mut cursors = CursorStore::load(&config.cursor_path());
    if !args.pages.is_empty() {
        for (lane, page) in &args.pages {
            cursors.set_page(&args.resource, *lane, *page);
        }
        cursors.save()?;
    }

    match args.command {
        Command::Board => {
            print_board(&board, &items, now, &cursors, &args.resource, config.page_size);
        }
        Command::Move { id, bucket } => {
            if !move_item(&board, &items, &id, bucket, now).await? {
                std::process::exit(1);
            }
            let items = board.mover().handler().snapshot();
            print_board(&board, &items, now, &cursors, &args.resource, config.page_size);
        }
        Command::CatchUp => {
            catch_up(&board, &items, now).await;
            let items = board.mover().handler().snapshot();
            print_board(&board, &items, now, &cursors, &args.resource, config.page_size);
        }
    }

    Ok(())
}
