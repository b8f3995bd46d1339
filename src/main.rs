mod prompt;

use clap::{Parser, Subcommand};
use std::collections::BTreeSet;
use std::io::{self, Write};
use std::path::PathBuf;

use chrono::Utc;
use hangugo::app::App;
use hangugo::catalog::Item;
use hangugo::config::{self, Config};
use hangugo::models::{JsonOutput, Rating};

#[derive(Parser)]
#[command(name = "hangugo")]
#[command(about = "Learn Korean vocabulary with spaced repetition")]
#[command(version)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Data directory (overrides HANGUGO_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Word catalog to use instead of <data-dir>/words.json
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the data directory and any missing state files
    Init,

    /// List catalog items matching the selected tags
    Items {
        /// Only items carrying this exact tag
        #[arg(long, short)]
        tag: Option<String>,
    },

    /// List items due for review today
    Due,

    /// Start reviewing an item
    Add {
        /// Item ID
        id: String,

        /// Make the first review due today instead of tomorrow
        #[arg(long)]
        today: bool,
    },

    /// Record a review for an item
    Review {
        /// Item ID
        id: String,

        /// Rating: hard/normal/easy
        #[arg(long, short)]
        rating: String,
    },

    /// Push an item's review to tomorrow
    Snooze {
        /// Item ID
        id: String,
    },

    /// Mark an item as already known
    Known {
        /// Item ID
        id: String,
    },

    /// Show or change the selected filter tags
    Tags {
        #[command(subcommand)]
        action: Option<TagCommands>,
    },

    /// Show learning statistics
    Stats,

    /// Interactive session for new items
    Learn {
        /// Number of items to master
        #[arg(long, short)]
        size: Option<usize>,

        /// Make first reviews due today instead of tomorrow
        #[arg(long)]
        today: bool,
    },

    /// Interactive review of today's due items
    Study,
}

#[derive(Subcommand)]
enum TagCommands {
    /// List catalog tags and the current selection
    List,

    /// Replace the selection
    Set {
        /// Comma-separated tags, e.g. topic:food,pos:noun
        tags: String,
    },

    /// Clear the selection
    Reset,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn load_config(cli: &Cli) -> Result<Config, Box<dyn std::error::Error>> {
    let data_dir = cli.data_dir.clone().unwrap_or_else(config::default_data_dir);
    let mut config = Config::load(data_dir)?;
    if let Some(catalog) = &cli.catalog {
        config.catalog_path = Some(catalog.clone());
    }
    Ok(config)
}

/// Where interactive prompts go. With `--json` stdout carries only the final
/// `JsonOutput`, so prompts move to stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PromptStream {
    Stdout,
    Stderr,
}

impl PromptStream {
    fn for_output(json: bool) -> Self {
        if json {
            PromptStream::Stderr
        } else {
            PromptStream::Stdout
        }
    }

    fn writer(self) -> Box<dyn Write> {
        match self {
            PromptStream::Stdout => Box::new(io::stdout()),
            PromptStream::Stderr => Box::new(io::stderr()),
        }
    }
}

fn print_json<T: serde::Serialize>(output: &JsonOutput<T>) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string(output)?);
    Ok(())
}

fn not_found(json: bool, what: &str) -> Result<(), serde_json::Error> {
    if json {
        print_json(&JsonOutput::<()>::err(format!("{} not found", what)))
    } else {
        println!("{} not found.", what);
        Ok(())
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&cli)?;
    let mut app = App::open(config)?;
    let now = Utc::now();
    let today = now.date_naive();

    match cli.command {
        Commands::Init => {
            let created = app.init_slots()?;
            if cli.json {
                print_json(&JsonOutput::ok(serde_json::json!({
                    "dataDir": app.config.data_dir,
                    "created": created
                })))?;
            } else {
                println!("Data directory: {}", app.config.data_dir.display());
                for slot in &created {
                    println!("Created {}", slot);
                }
                println!(
                    "Put your word list at {}",
                    app.config.catalog_fallback_path().display()
                );
            }
        }

        Commands::Items { tag } => {
            let items: Vec<Item> = match tag {
                Some(tag) => app
                    .items()?
                    .into_iter()
                    .filter(|i| i.tags.contains(&tag))
                    .collect(),
                None => app.filtered_items()?,
            };

            if cli.json {
                print_json(&JsonOutput::ok(&items))?;
            } else if items.is_empty() {
                println!("No items found.");
            } else {
                println!("{:<10} {:<20} {:<30} STATUS", "ID", "TERM", "TRANSLATION");
                println!("{}", "-".repeat(72));
                for item in items {
                    let status = if app.known.contains(&item.id) {
                        "known"
                    } else {
                        app.scheduler
                            .get(&item.id)
                            .map(|s| s.stage_label())
                            .unwrap_or("-")
                    };
                    println!(
                        "{:<10} {:<20} {:<30} {}",
                        truncate(&item.id, 10),
                        truncate(&item.term, 20),
                        truncate(&item.translation, 30),
                        status
                    );
                }
            }
        }

        Commands::Due => {
            let catalog = app.items().unwrap_or_else(|e| {
                log::warn!("catalog unavailable ({}), listing ids only", e);
                Vec::new()
            });
            let due = app.scheduler.due_items(today);

            if cli.json {
                print_json(&JsonOutput::ok(&due))?;
            } else if due.is_empty() {
                println!("Nothing due today.");
            } else {
                println!("{:<10} {:<20} {:<12} STAGE", "ID", "TERM", "DUE");
                println!("{}", "-".repeat(55));
                for s in due {
                    let term = catalog
                        .iter()
                        .find(|i| i.id == s.item_id)
                        .map(|i| i.term.as_str())
                        .unwrap_or("?");
                    println!(
                        "{:<10} {:<20} {:<12} {}",
                        truncate(&s.item_id, 10),
                        truncate(term, 20),
                        s.due_date,
                        s.stage_label()
                    );
                }
            }
        }

        Commands::Add { id, today: due_today } => {
            if app.find_item(&id)?.is_none() {
                return Ok(not_found(cli.json, "Item")?);
            }
            let start_tomorrow = app.config.start_tomorrow && !due_today;
            let added = app.scheduler.register(&id, today, start_tomorrow);
            if added {
                app.scheduler.persist()?;
            }

            if cli.json {
                print_json(&JsonOutput::ok(app.scheduler.get(&id)))?;
            } else if added {
                if let Some(s) = app.scheduler.get(&id) {
                    println!("Added '{}', first review on {}.", id, s.due_date);
                }
            } else {
                println!("'{}' is already scheduled.", id);
            }
        }

        Commands::Review { id, rating } => {
            let rating = Rating::from_str(&rating).ok_or_else(|| {
                format!("Invalid rating '{}'. Use: hard, normal, or easy", rating)
            })?;

            let Some(updated) = app.scheduler.apply_outcome(&id, rating, now).cloned() else {
                return Ok(not_found(cli.json, "Scheduled item")?);
            };
            app.scheduler.persist()?;

            if cli.json {
                print_json(&JsonOutput::ok(&updated))?;
            } else {
                println!("Review recorded for '{}' ({}).", id, rating.as_str());
                println!(
                    "Interval: {} days, ease {:.2}, next review {}",
                    updated.interval_days, updated.ease_factor, updated.due_date
                );
            }
        }

        Commands::Snooze { id } => {
            if !app.scheduler.snooze_to_tomorrow(&id, now) {
                return Ok(not_found(cli.json, "Scheduled item")?);
            }
            app.scheduler.persist()?;

            if cli.json {
                print_json(&JsonOutput::<()>::ok(()))?;
            } else {
                println!("'{}' moved to tomorrow.", id);
            }
        }

        Commands::Known { id } => {
            if app.find_item(&id)?.is_none() {
                return Ok(not_found(cli.json, "Item")?);
            }
            if app.known.add(&id) {
                app.known.persist()?;
            }

            if cli.json {
                print_json(&JsonOutput::<()>::ok(()))?;
            } else {
                println!("'{}' marked as known.", id);
            }
        }

        Commands::Tags { action } => match action.unwrap_or(TagCommands::List) {
            TagCommands::List => {
                let mut counts: std::collections::BTreeMap<String, usize> = Default::default();
                for item in app.items()? {
                    for tag in item.tags {
                        *counts.entry(tag).or_default() += 1;
                    }
                }

                if cli.json {
                    print_json(&JsonOutput::ok(serde_json::json!({
                        "selected": app.tags.tags(),
                        "available": counts
                    })))?;
                } else if counts.is_empty() {
                    println!("No tags found.");
                } else {
                    println!("    {:<30} ITEMS", "TAG");
                    println!("{}", "-".repeat(42));
                    for (tag, count) in counts {
                        let mark = if app.tags.tags().contains(&tag) { "*" } else { " " };
                        println!("{}   {:<30} {}", mark, tag, count);
                    }
                }
            }

            TagCommands::Set { tags } => {
                let selection: BTreeSet<String> = tags
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
                app.tags.set(selection)?;

                if cli.json {
                    print_json(&JsonOutput::ok(app.tags.tags()))?;
                } else {
                    println!("Selected {} tags.", app.tags.tags().len());
                }
            }

            TagCommands::Reset => {
                app.tags.reset()?;
                if cli.json {
                    print_json(&JsonOutput::<()>::ok(()))?;
                } else {
                    println!("Tag selection cleared.");
                }
            }
        },

        Commands::Stats => {
            let stats = app.scheduler.stats(today);
            let overview = app.overview(today)?;
            if cli.json {
                print_json(&JsonOutput::ok(serde_json::json!({
                    "tracked": stats.tracked,
                    "due": stats.due,
                    "reviewed": stats.reviewed,
                    "total_lapses": stats.total_lapses,
                    "avg_ease": stats.avg_ease,
                    "items": overview.items,
                    "new_available": overview.new_available,
                    "known": overview.known,
                    "selected_tags": overview.selected_tags
                })))?;
            } else {
                println!("=== Learning Statistics ===");
                println!("Items (filtered): {}", overview.items);
                println!("New available: {}", overview.new_available);
                println!("Known: {}", overview.known);
                println!("Scheduled: {}", stats.tracked);
                println!("Reviewed at least once: {}", stats.reviewed);
                println!("Due today: {}", stats.due);
                println!("Total lapses: {}", stats.total_lapses);
                println!("Average ease: {:.2}", stats.avg_ease);
            }
        }

        Commands::Learn { size, today: due_today } => {
            let items = app.filtered_items()?;
            let size = size.unwrap_or(app.config.session_size);
            let start_tomorrow = app.config.start_tomorrow && !due_today;
            let stdin = io::stdin();
            let mut out = PromptStream::for_output(cli.json).writer();
            let summary = prompt::learn(
                &mut app,
                &items,
                size,
                start_tomorrow,
                rand::thread_rng(),
                stdin.lock(),
                &mut out,
            )?;
            if cli.json {
                print_json(&JsonOutput::ok(&summary))?;
            }
        }

        Commands::Study => {
            let items = app.items()?;
            let stdin = io::stdin();
            let mut out = PromptStream::for_output(cli.json).writer();
            let summary = prompt::study(
                &mut app,
                &items,
                rand::thread_rng(),
                stdin.lock(),
                &mut out,
            )?;
            if cli.json {
                print_json(&JsonOutput::ok(&summary))?;
            }
        }
    }

    Ok(())
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
