use anyhow::{bail, Result};
use chrono::Datelike;
use clap::{Parser, Subcommand};
use scadenze_core::{next_milestone, DueItem, PriorityBucket};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

mod calendar;
mod config;
mod dashboard;
mod db;
mod html;
mod reminders;
mod server;
mod tracker;
mod types;

use calendar::{CalendarMonth, WEEKDAYS};
use config::Config;
use dashboard::{Dashboard, Filter, StatusFilter};
use tracker::{local_now, CompletionChange, Tracker};
use types::{Assignment, AssignmentSource, NewAssignment};

#[derive(Parser, Debug)]
#[command(name = "scadenze")]
#[command(about = "Track homework deadlines, priorities, and completion streaks")]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,

    /// SQLite database file (overrides SCADENZE_DB)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the web server (default)
    Serve {
        /// Port to listen on (overrides SCADENZE_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Add an assignment
    Add {
        title: String,

        /// Due date, YYYY-MM-DD or YYYY-MM-DDTHH:MM
        #[arg(long)]
        due: String,

        /// Time of day, HH:MM (defaults to end of day)
        #[arg(long)]
        time: Option<String>,

        #[arg(long, default_value = "")]
        description: String,

        #[arg(long, default_value = "")]
        subject: String,

        #[arg(long)]
        course: Option<String>,

        /// Accent color (CSS color)
        #[arg(long)]
        color: Option<String>,

        #[arg(long, default_value = "manual")]
        source: AssignmentSource,

        /// Do not send deadline reminders for this assignment
        #[arg(long)]
        no_reminder: bool,
    },

    /// List assignments
    List {
        #[arg(long, value_enum, default_value = "all")]
        status: StatusFilter,

        /// Case-insensitive text search over title, description, and course
        #[arg(long)]
        search: Option<String>,

        #[arg(long)]
        source: Option<AssignmentSource>,

        /// Priority bucket: overdue, high-priority, coming-up, worry-later, completed
        #[arg(long, value_parser = parse_priority)]
        priority: Option<PriorityBucket>,
    },

    /// Show assignments grouped by priority
    Dashboard,

    /// Mark an assignment as done
    Done { id: String },

    /// Mark an assignment as not done
    Undo { id: String },

    /// Delete an assignment
    Delete { id: String },

    /// Print a month calendar
    Calendar {
        #[arg(long)]
        year: Option<i32>,

        #[arg(long)]
        month: Option<u32>,
    },

    /// Show the completion streak
    Streak,

    /// Show assignments that need attention now
    Reminders,

    /// Generate a static HTML dashboard (no server)
    Build {
        #[arg(short, long, default_value = "index.html")]
        output: PathBuf,
    },

    /// Add sample assignments
    Seed,

    /// Delete all assignments and reset the streak
    Reset {
        /// Confirm the wipe
        #[arg(long)]
        yes: bool,
    },
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level))
        .add_directive("hyper=warn".parse().expect("static directive"))
        .add_directive("tower_http=warn".parse().expect("static directive"));

    fmt().with_env_filter(filter).with_target(false).init();
}

fn open_tracker(config: &Config) -> Result<Tracker> {
    let conn = db::init_db(&config.db_path)?;
    Tracker::open(conn, local_now().date(), config.celebrations)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_tracing(&args.log_level);

    let mut config = Config::from_env()?;
    if let Some(db) = args.db {
        config.db_path = db;
    }

    match args.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => {
            if let Some(port) = port {
                config.port = port;
            }
            server::serve(&config).await?;
        }
        Commands::Add {
            title,
            due,
            time,
            description,
            subject,
            course,
            color,
            source,
            no_reminder,
        } => {
            let tracker = open_tracker(&config)?;
            let assignment = tracker.create(NewAssignment {
                title,
                description,
                subject,
                course_name: course,
                due_date: due,
                due_time: time,
                reminder: Some(!no_reminder),
                color,
                source,
            })?;
            println!("Added {} ({})", assignment.title, assignment.id);
        }
        Commands::List {
            status,
            search,
            source,
            priority,
        } => {
            let tracker = open_tracker(&config)?;
            let assignments = tracker.assignments()?;
            let filter = Filter {
                search,
                status,
                source,
                priority,
            };
            let now = local_now();
            for a in filter.apply(&assignments, now) {
                print_assignment(a, now);
            }
        }
        Commands::Dashboard => {
            let tracker = open_tracker(&config)?;
            let assignments = tracker.assignments()?;
            let dashboard = Dashboard::build(&assignments, local_now(), tracker.streak());
            print_dashboard(&dashboard);
        }
        Commands::Done { id } => {
            let mut tracker = open_tracker(&config)?;
            let change = tracker.set_completed(&id, true, local_now())?;
            print_completion(&change);
        }
        Commands::Undo { id } => {
            let mut tracker = open_tracker(&config)?;
            let change = tracker.set_completed(&id, false, local_now())?;
            println!("Marked {} as not done", change.assignment.title);
        }
        Commands::Delete { id } => {
            let tracker = open_tracker(&config)?;
            tracker.delete(&id)?;
            println!("Deleted {}", id);
        }
        Commands::Calendar { year, month } => {
            let tracker = open_tracker(&config)?;
            let now = local_now();
            let month = CalendarMonth::build(
                year.unwrap_or(now.year()),
                month.unwrap_or(now.month()),
                &tracker.assignments()?,
                now,
            )?;
            print_calendar(&month);
        }
        Commands::Streak => {
            let tracker = open_tracker(&config)?;
            let streak = tracker.streak();
            println!("🔥 {} day streak", streak.count);
            if let Some(last) = streak.last_completion {
                println!("Last completion: {}", last);
            }
            if let Some(next) = next_milestone(streak.count) {
                println!("{} more day(s) to the {}-day milestone", next - streak.count, next);
            }
        }
        Commands::Reminders => {
            let tracker = open_tracker(&config)?;
            let reminders = reminders::due_reminders(&tracker.assignments()?, local_now());
            if reminders.is_empty() {
                println!("Nothing needs attention right now");
            }
            for reminder in &reminders {
                println!("{} {}", reminder.bucket.badge(), reminder);
            }
        }
        Commands::Build { output } => {
            let tracker = open_tracker(&config)?;
            let assignments = tracker.assignments()?;
            let dashboard = Dashboard::build(&assignments, local_now(), tracker.streak());
            html::generate_html(&dashboard, tracker.streak(), &output)?;
            info!(path = %output.display(), "HTML saved");
        }
        Commands::Seed => {
            let tracker = open_tracker(&config)?;
            let seeded = tracker.seed_samples(local_now().date())?;
            println!("Added {} sample assignments", seeded.len());
        }
        Commands::Reset { yes } => {
            if !yes {
                bail!("Refusing to delete all data without --yes");
            }
            let mut tracker = open_tracker(&config)?;
            let removed = tracker.reset()?;
            println!("Deleted {} assignments and reset the streak", removed);
        }
    }

    Ok(())
}

fn parse_priority(raw: &str) -> Result<PriorityBucket, String> {
    PriorityBucket::ALL
        .into_iter()
        .find(|b| b.as_str() == raw.trim().to_lowercase())
        .ok_or_else(|| {
            let names: Vec<_> = PriorityBucket::ALL.iter().map(|b| b.as_str()).collect();
            format!("expected one of: {}", names.join(", "))
        })
}

fn print_assignment(a: &Assignment, now: chrono::NaiveDateTime) {
    let status = match a.priority(now) {
        Ok(PriorityBucket::Completed) => "done".to_string(),
        Ok(_) => a.remaining(now).unwrap_or_default(),
        Err(e) => e.to_string(),
    };
    let due = a.due().map(|d| d.to_string()).unwrap_or_else(|_| a.due_date.clone());
    println!("{}  {} {}  [{}]  {}", a.id, a.source.icon(), a.title, due, status);
}

fn print_dashboard(dashboard: &Dashboard) {
    let stats = &dashboard.stats;
    println!(
        "{} active, {} completed, {} overdue, {}% done, {} day streak\n",
        stats.active, stats.completed, stats.overdue, stats.progress_percent, stats.streak
    );
    for section in &dashboard.sections {
        println!("{} ({})", section.bucket.badge(), section.entries.len());
        for entry in &section.entries {
            let remaining = if entry.bucket == PriorityBucket::Completed {
                String::new()
            } else {
                format!("  {}", entry.remaining)
            };
            let due = entry
                .due
                .map(|d| d.to_string())
                .unwrap_or_else(|| entry.assignment.due_date.clone());
            println!("  {}  [{}]{}", entry.assignment.title, due, remaining);
        }
        println!();
    }
    if !dashboard.invalid.is_empty() {
        println!("Unreadable due dates:");
        for a in &dashboard.invalid {
            println!("  {}  [{}]", a.title, a.due_date);
        }
    }
}

fn print_completion(change: &CompletionChange) {
    println!("Completed {}", change.assignment.title);
    if let Some(streak) = change.streak {
        println!("🔥 Streak: {} day(s)", streak.current);
    }
    if let Some(milestone) = change.milestone {
        println!("🎉 {}-day streak! {}", milestone.days, milestone.message);
    }
}

fn print_calendar(month: &CalendarMonth) {
    println!("{:^35}", month.title());
    println!("{}", WEEKDAYS.map(|d| format!("{:>5}", d)).join(""));
    for week in month.weeks() {
        let line: String = week
            .iter()
            .map(|cell| match cell {
                Some(day) => {
                    let marker = match day.bucket {
                        Some(PriorityBucket::Overdue) => '!',
                        Some(_) => '*',
                        None => ' ',
                    };
                    format!("{:>4}{}", day.date.day(), marker)
                }
                None => "     ".to_string(),
            })
            .collect();
        println!("{}", line);
    }
    for day in month.days.iter().filter(|d| !d.assignments.is_empty()) {
        for a in &day.assignments {
            println!("{}  {}", day.date, a.title);
        }
    }
}
