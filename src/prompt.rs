//! Line-driven interactive sessions. Each prompt reads one command per line;
//! end of input quits.

use std::io::{BufRead, Write};

use chrono::Utc;
use rand::Rng;
use serde::Serialize;

use hangugo::app::App;
use hangugo::catalog::Item;
use hangugo::models::Rating;
use hangugo::review::ReviewSession;
use hangugo::session::{EntryState, LearnSession, SessionOptions};

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

#[derive(Debug, Serialize)]
pub struct LearnSummary {
    pub goal: usize,
    pub mastered: usize,
    pub finished: bool,
}

#[derive(Debug, Serialize)]
pub struct StudySummary {
    pub reviewed: usize,
    pub remaining: usize,
}

fn show_item<W: Write>(out: &mut W, item: &Item, reveal: bool) -> std::io::Result<()> {
    match &item.transcription {
        Some(t) => writeln!(out, "  {} [{}]", item.term, t)?,
        None => writeln!(out, "  {}", item.term)?,
    }
    if reveal {
        writeln!(out, "  = {}", item.translation)?;
        if let Some(example) = &item.example {
            writeln!(out, "  e.g. {}", example)?;
            if let Some(tr) = &item.example_translation {
                writeln!(out, "       {}", tr)?;
            }
        }
    }
    Ok(())
}

fn report<W: Write, E: std::fmt::Display>(out: &mut W, e: E) -> std::io::Result<()> {
    log::error!("save failed: {}", e);
    writeln!(out, "Warning: progress could not be saved: {}", e)
}

fn next_command<R: BufRead>(input: &mut R) -> Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_lowercase()))
}

pub fn learn<R, W, G>(
    app: &mut App,
    items: &[Item],
    session_size: usize,
    start_tomorrow: bool,
    rng: G,
    mut input: R,
    out: &mut W,
) -> Result<LearnSummary>
where
    R: BufRead,
    W: Write,
    G: Rng,
{
    let options = SessionOptions {
        defer_window: app.config.defer_window,
        seed_size: app.config.seed_size,
    };
    let mut session = LearnSession::new(options, rng);
    session.start(items, session_size, start_tomorrow, &app.scheduler, &app.known);

    if session.is_finished() {
        writeln!(out, "Nothing new to learn.")?;
    }

    while let Some(item) = session.current_item().cloned() {
        let Some(state) = session.current_state() else {
            break;
        };
        writeln!(out)?;
        writeln!(
            out,
            "[{}/{} mastered, {} learning]",
            session.mastered_count(),
            session.goal(),
            session.learning_count()
        )?;
        show_item(out, &item, true)?;
        match state {
            EntryState::Fresh => write!(out, "[k]now it  [l]earn it  [q]uit > ")?,
            EntryState::Learning => write!(out, "[m]astered  [s]how later  [q]uit > ")?,
        }
        out.flush()?;

        let Some(cmd) = next_command(&mut input)? else {
            break;
        };
        match (state, cmd.as_str()) {
            (_, "q") => break,
            (EntryState::Fresh, "k") => {
                if let Err(e) = session.mark_already_known(&mut app.known) {
                    report(out, e)?;
                }
            }
            (EntryState::Fresh, "l") => {
                session.start_learning();
            }
            (EntryState::Learning, "m") => {
                if let Err(e) = session.mark_mastered(&mut app.scheduler, Utc::now()) {
                    report(out, e)?;
                }
            }
            (EntryState::Learning, "s") => {
                session.show_later();
            }
            _ => writeln!(out, "Unknown command '{}'.", cmd)?,
        }
    }

    let summary = LearnSummary {
        goal: session.goal(),
        mastered: session.mastered_count(),
        finished: session.is_finished(),
    };
    writeln!(out)?;
    writeln!(out, "Mastered {} of {}.", summary.mastered, summary.goal)?;
    Ok(summary)
}

pub fn study<R, W, G>(
    app: &mut App,
    items: &[Item],
    mut rng: G,
    mut input: R,
    out: &mut W,
) -> Result<StudySummary>
where
    R: BufRead,
    W: Write,
    G: Rng,
{
    let mut review = ReviewSession::new();
    review.start(items, &app.scheduler, Utc::now().date_naive());

    if review.is_finished() {
        writeln!(out, "Nothing due today.")?;
    }

    let mut revealed = false;
    while let Some(item) = review.current_item().cloned() {
        writeln!(out)?;
        writeln!(out, "[{} left]", review.remaining())?;
        show_item(out, &item, revealed)?;
        if revealed {
            write!(out, "[h]ard [n]ormal [e]asy  [l]ater [t]omorrow [q]uit > ")?;
        } else {
            write!(out, "[r]eveal  [l]ater [t]omorrow [q]uit > ")?;
        }
        out.flush()?;

        let Some(cmd) = next_command(&mut input)? else {
            break;
        };
        match cmd.as_str() {
            "q" => break,
            "r" => {
                revealed = true;
                continue;
            }
            "l" => {
                review.show_later(app.config.defer_window, &mut rng);
            }
            "t" => {
                if let Err(e) = review.snooze(&mut app.scheduler, Utc::now()) {
                    report(out, e)?;
                }
            }
            other => match Rating::from_str(other).filter(|_| revealed) {
                Some(rating) => {
                    if let Err(e) = review.rate(rating, &mut app.scheduler, Utc::now()) {
                        report(out, e)?;
                    }
                }
                None => {
                    writeln!(out, "Unknown command '{}'.", other)?;
                    continue;
                }
            },
        }
        revealed = false;
    }

    let summary = StudySummary {
        reviewed: review.reviewed(),
        remaining: review.remaining(),
    };
    writeln!(out)?;
    writeln!(out, "Reviewed {}, {} left.", summary.reviewed, summary.remaining)?;
    Ok(summary)
}
