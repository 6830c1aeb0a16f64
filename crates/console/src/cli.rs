//! Command line surface of the console.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use domain::models::{FeatureFlag, Guest, GuestQuery};
use domain::services::{messages, Locale};
use shared::pagination::{PageLimit, PageRequest, DEFAULT_PAGE_SIZE};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::{Stream, StreamExt};
use tracing::{info, warn};

use crate::admin::EventAdmin;
use crate::backend::HttpBackend;
use crate::checkin::{CheckInOrchestrator, Outcome};
use crate::config::Config;
use crate::directory::GuestDirectory;
use crate::error::ConsoleError;
use crate::feedback::TerminalFeedback;
use crate::import::{ImportPhase, ImportWorkflow, RetryOutcome, SpreadsheetUpload};
use crate::navigation::{Console, Visit};
use crate::rsvp::{next_step, RsvpPortal, RsvpStep};
use crate::scanner::{self, LineFrameSource, PlainTextDecoder, ScanItem, TracingOverlay};
use crate::session::{RestoreOutcome, SessionGuard};
use crate::views::BackendViews;

#[derive(Debug, Parser)]
#[command(name = "event-console", version, about = "Event check-in and guest console")]
pub struct Cli {
    /// More log detail on stderr (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in and store the session token
    Login {
        #[arg(long, env = "EC_USERNAME")]
        username: String,
        #[arg(long, env = "EC_PASSWORD", hide_env_values = true)]
        password: String,
    },
    Logout,
    /// Show the session and the routes it may open
    Status,
    /// Resolve a console route and print what it shows
    Open { path: String },
    /// Check in a single guest by qrId
    Checkin { qr_id: String },
    /// Check in codes typed by a keyboard-wedge scanner on stdin
    Scan,
    /// Upload a guest spreadsheet and correct failed rows interactively
    Import {
        path: PathBuf,
        #[arg(long)]
        delete_existing: bool,
    },
    /// List guests
    Guests {
        #[arg(long)]
        search: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: u32,
        /// Page size, or "all"
        #[arg(long, default_value_t = PageLimit::Count(DEFAULT_PAGE_SIZE))]
        limit: PageLimit,
        #[arg(long)]
        attending: bool,
    },
    /// Answer an invitation on behalf of a guest
    Rsvp {
        qr_id: String,
        #[arg(long, conflicts_with = "decline")]
        attend: bool,
        #[arg(long)]
        decline: bool,
    },
    /// Show or flip a feature switch (rsvp, telegram, volunteer-system)
    Feature {
        flag: FeatureFlag,
        #[arg(long)]
        toggle: bool,
    },
}

/// Everything a command needs, built once by the binary.
pub struct Context {
    pub config: Config,
    pub guard: Arc<SessionGuard>,
    pub backend: Arc<HttpBackend>,
}

impl Context {
    fn locale(&self) -> Locale {
        self.config.locale()
    }
}

pub async fn run(command: Command, ctx: &Context) -> Result<(), ConsoleError> {
    match command {
        Command::Login { username, password } => {
            let session = ctx
                .guard
                .login(ctx.backend.as_ref(), &username, &password)
                .await?;
            println!("Signed in; roles: {}", join_roles(&session.roles));
        }
        Command::Logout => {
            ctx.guard.logout()?;
            println!("Signed out");
        }
        Command::Status => print_status(ctx),
        Command::Open { path } => open(ctx, &path).await?,
        Command::Checkin { qr_id } => {
            let mut orchestrator = orchestrator(ctx);
            let outcome = orchestrator.check_in(&qr_id).await;
            print_outcome(&outcome, ctx.locale());
        }
        Command::Scan => scan(ctx).await?,
        Command::Import {
            path,
            delete_existing,
        } => import(ctx, path, delete_existing).await?,
        Command::Guests {
            search,
            page,
            limit,
            attending,
        } => {
            let page = PageRequest::new(page, limit)
                .map_err(|e| ConsoleError::Validation(e.to_string()))?;
            let query = GuestQuery { search, attending };
            let listing = GuestDirectory::new(ctx.backend.clone())
                .list(&page, &query)
                .await?;
            for guest in &listing.guests {
                print_guest(guest);
            }
            println!(
                "page {}/{} ({} guests)",
                page.page,
                listing.total_pages.max(1),
                listing.total()
            );
        }
        Command::Rsvp {
            qr_id,
            attend,
            decline,
        } => rsvp(ctx, &qr_id, attend, decline).await?,
        Command::Feature { flag, toggle } => {
            let admin = EventAdmin::new(ctx.backend.clone());
            let enabled = if toggle {
                admin.toggle(flag).await?
            } else {
                admin.flag(flag).await?
            };
            println!("{}: {}", flag.label(), if enabled { "on" } else { "off" });
        }
    }
    Ok(())
}

/// Picks up the stored token; an expired one is reported and dropped.
pub fn restore_session(guard: &SessionGuard) -> Result<(), ConsoleError> {
    if guard.restore()? == RestoreOutcome::Expired {
        eprintln!("Stored session expired; sign in again");
    }
    Ok(())
}

fn orchestrator(ctx: &Context) -> CheckInOrchestrator {
    CheckInOrchestrator::new(
        ctx.backend.clone(),
        Arc::new(TerminalFeedback),
        ctx.locale(),
    )
}

fn print_status(ctx: &Context) {
    match ctx.guard.current() {
        Some(session) => {
            let console = Console::new(ctx.guard.clone(), Arc::new(BackendViews::new(ctx.backend.clone())));
            println!("Signed in; roles: {}", join_roles(&session.roles));
            if let Some(remaining) = ctx.guard.remaining() {
                println!("Idle logout in {}", remaining);
            }
            let menu: Vec<String> = console.menu().iter().map(|r| r.path()).collect();
            println!("Menu: {}", menu.join(" "));
        }
        None => println!("Not signed in"),
    }
}

async fn open(ctx: &Context, path: &str) -> Result<(), ConsoleError> {
    let console = Console::new(ctx.guard.clone(), Arc::new(BackendViews::new(ctx.backend.clone())));
    match console.visit(path).await? {
        Visit::Rendered { route, data } => println!("{}\n{:#?}", route, data),
        Visit::LoginRequired { requested } => {
            println!("{} requires a session; run `event-console login`", requested)
        }
        Visit::Unauthorized(route) => {
            println!("{}", messages::text(ctx.locale(), "unauthorizedError"));
            info!(route = %route, "Route not available for this session");
        }
        Visit::NotFound => println!("Not found: {}", path),
    }
    Ok(())
}

async fn scan(ctx: &Context) -> Result<(), ConsoleError> {
    if !ctx.guard.is_active() {
        return Err(ConsoleError::Session(messages::text(ctx.locale(), "session_expired")));
    }

    let source = LineFrameSource::new(BufReader::new(tokio::io::stdin()));
    let (mut events, handle) = scanner::start(
        source,
        PlainTextDecoder,
        TracingOverlay,
        ctx.config.rearm_after(),
    );

    let mut orchestrator = orchestrator(ctx);
    orchestrator.attach_scanner(handle.rearm_handle());
    println!("Scanning; one code per line, Ctrl-D to stop");

    match drive_scan(&mut events, &mut orchestrator, &ctx.guard, ctx.locale()).await {
        ScanStop::Fatal(reason) => eprintln!("{}", reason),
        ScanStop::SessionEnded => eprintln!("{}", messages::text(ctx.locale(), "session_expired")),
        ScanStop::Exhausted => {}
    }

    handle.shutdown().await;
    Ok(())
}

/// Why the scan loop returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanStop {
    Exhausted,
    SessionEnded,
    Fatal(String),
}

/// Feeds scanned codes to the orchestrator until the stream ends, a fatal
/// scanner error arrives or the session ends. Every item counts as operator
/// activity.
pub async fn drive_scan<S>(
    events: &mut S,
    orchestrator: &mut CheckInOrchestrator,
    guard: &SessionGuard,
    locale: Locale,
) -> ScanStop
where
    S: Stream<Item = ScanItem> + Unpin,
{
    while let Some(item) = events.next().await {
        guard.touch();
        match item {
            Ok(event) => {
                let outcome = orchestrator.check_in(&event.text).await;
                print_outcome(&outcome, locale);
                orchestrator.close_detail();
            }
            Err(e) if e.is_fatal() => return ScanStop::Fatal(e.to_string()),
            Err(e) => {
                warn!(error = %e, "Frame skipped");
                eprintln!("!!  {}", orchestrator.report_unreadable());
            }
        }
        if !guard.is_active() {
            return ScanStop::SessionEnded;
        }
    }
    ScanStop::Exhausted
}

async fn import(ctx: &Context, path: PathBuf, delete_existing: bool) -> Result<(), ConsoleError> {
    let upload = SpreadsheetUpload::from_path(&path).await?;
    let mut workflow = ImportWorkflow::new(ctx.backend.clone(), ctx.locale());

    let summary = workflow.upload(Some(upload), delete_existing).await?;
    if let Some(message) = &summary.message {
        println!("{}", message);
    }
    if workflow.phase() == ImportPhase::Clean {
        return Ok(());
    }

    print_pending(&workflow);
    println!("Commands: {} | retry | show | ignore", EDIT_USAGE);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while workflow.phase() == ImportPhase::HasFailures {
        let Some(line) = lines.next_line().await? else {
            break;
        };
        ctx.guard.touch();
        let line = line.trim();
        let (command, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        match command {
            "edit" => match parse_edit(rest) {
                Some(edit) => {
                    let header = match &edit.column {
                        ColumnRef::Position(n) => workflow.column_at(*n).map(str::to_string),
                        ColumnRef::Name(name) => Some(name.clone()),
                    };
                    let result = match header {
                        Some(header) => workflow.edit_cell_at(edit.index, &header, &edit.value),
                        None => Err(ConsoleError::Validation("unknownColumn".to_string())),
                    };
                    if let Err(e) = result {
                        eprintln!("{}", e.user_message(ctx.locale()));
                    }
                }
                None => eprintln!("usage: {}", EDIT_USAGE),
            },
            "retry" => match workflow.retry().await {
                Ok(RetryOutcome::NothingToRetry) => println!("No edited rows to retry"),
                Ok(RetryOutcome::Retried {
                    message,
                    recovered,
                    remaining,
                }) => {
                    if let Some(message) = message {
                        println!("{}", message);
                    }
                    println!("{} recovered, {} remaining", recovered, remaining);
                    if remaining > 0 {
                        print_pending(&workflow);
                    }
                }
                Err(e) => eprintln!("{}", e.user_message(ctx.locale())),
            },
            "show" => print_pending(&workflow),
            "ignore" | "quit" => workflow.ignore(),
            "" => {}
            other => eprintln!("unknown command: {}", other),
        }
    }
    Ok(())
}

const EDIT_USAGE: &str = "edit <row> <column #|\"header\"|header> <value>";

/// Column of the pending table, by its printed number or by header text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnRef {
    Position(usize),
    Name(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditCommand {
    pub index: usize,
    pub column: ColumnRef,
    pub value: String,
}

/// Parses the arguments of `edit`. Headers with spaces must be quoted; the
/// value is the rest of the line.
pub fn parse_edit(args: &str) -> Option<EditCommand> {
    let (index, rest) = args.trim_start().split_once(char::is_whitespace)?;
    let index = index.parse::<usize>().ok()?;
    let rest = rest.trim_start();

    let (column, value) = if let Some(quoted) = rest.strip_prefix('"') {
        let (name, value) = quoted.split_once('"')?;
        (ColumnRef::Name(name.to_string()), value)
    } else {
        let (word, value) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
        if word.is_empty() {
            return None;
        }
        let column = match word.parse::<usize>() {
            Ok(n) => ColumnRef::Position(n),
            Err(_) => ColumnRef::Name(word.to_string()),
        };
        (column, value)
    };

    Some(EditCommand {
        index,
        column,
        value: value.trim().to_string(),
    })
}

async fn rsvp(ctx: &Context, qr_id: &str, attend: bool, decline: bool) -> Result<(), ConsoleError> {
    let portal = RsvpPortal::new(ctx.backend.clone());
    let mut guest = portal.guest(qr_id).await?;
    let enabled = portal.rsvp_enabled().await?;

    if attend || decline {
        if !enabled {
            return Err(ConsoleError::Validation("rsvpDisabled".to_string()));
        }
        guest = portal.respond(&guest, attend).await?;
    }

    print_guest(&guest);
    match next_step(&guest, enabled) {
        RsvpStep::Declined => println!("Declined"),
        RsvpStep::PlusOneForm => println!(
            "Attending; {} of {} plus-ones registered",
            guest.guests.len(),
            guest.max_guests.unwrap_or(0)
        ),
        RsvpStep::Confirmed => println!("Confirmed"),
    }
    Ok(())
}

fn print_outcome(outcome: &Outcome, locale: Locale) {
    match outcome {
        Outcome::Accepted(guest) => println!("OK  {} ({})", guest.full_name(), guest.guest_type),
        Outcome::AlreadyDone(guest) => println!(
            "--  {}: {}",
            guest.full_name(),
            messages::text(locale, "alreadyCheckedIn")
        ),
        Outcome::Rejected { message, .. } => println!("!!  {}", message),
    }
}

fn print_guest(guest: &Guest) {
    let attending = match guest.will_attend {
        Some(true) => "yes",
        Some(false) => "no",
        None => "-",
    };
    println!(
        "{:<12} {:<30} {:<9} attending={} checked_in={}",
        guest.qr_id,
        guest.full_name(),
        guest.guest_type,
        attending,
        guest.is_checked_in
    );
}

fn print_pending(workflow: &ImportWorkflow) {
    let columns: Vec<String> = workflow
        .headers()
        .iter()
        .enumerate()
        .map(|(n, h)| format!("{}:{}", n, h))
        .collect();
    println!("#  row  {}", columns.join(" | "));
    for (index, row) in workflow.row_numbers().into_iter().enumerate() {
        let cells: Vec<String> = workflow
            .headers()
            .iter()
            .map(|h| {
                let value = workflow.display_value(row, h).unwrap_or_default();
                if workflow.invalid_headers(row).contains(&h.as_str()) {
                    format!("*{}*", value)
                } else {
                    value
                }
            })
            .collect();
        println!("{:<2} {:<4} {}", index, row, cells.join(" | "));
        for error in workflow.translated_errors(row) {
            println!("        {}", error);
        }
    }
}

fn join_roles(roles: &[domain::models::Role]) -> String {
    roles
        .iter()
        .map(|r| r.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
