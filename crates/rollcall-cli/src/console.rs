//! Interactive attendance dashboard on stdin/stdout.

use crate::config::Config;
use crate::{camera_widget, open_dashboard, upload_from_path};
use anyhow::Result;
use chrono::NaiveDate;
use rollcall_api::ApiClient;
use rollcall_core::view::CaptureView;
use rollcall_core::{CameraSource, CaptureWidget, Dashboard, StudentId};
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "\
commands:
  date <YYYY-MM-DD>            switch the attendance date
  refresh                      reload the roster
  add <name> [--photo <path>]  register a student
  remove <id>                  delete a student
  capture                      take a photo and check in
  dismiss                      clear the check-in result
  show                         redraw the dashboard
  help                         this text
  quit                         leave";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Date(NaiveDate),
    Refresh,
    Add { name: String, photo: Option<PathBuf> },
    Remove(StudentId),
    Capture,
    Dismiss,
    Show,
    Help,
    Quit,
}

pub fn parse_command(line: &str) -> Result<Command, String> {
    let mut words: Vec<&str> = line.split_whitespace().collect();
    let Some((&verb, _)) = words.split_first() else {
        return Ok(Command::Show);
    };
    words.remove(0);

    match (verb, words.as_slice()) {
        ("date", [raw]) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(Command::Date)
            .map_err(|_| format!("not a date: {raw} (expected YYYY-MM-DD)")),
        ("refresh", []) => Ok(Command::Refresh),
        ("add", rest) if !rest.is_empty() => {
            let (name_words, photo) = match rest {
                [name @ .., "--photo", path] => (name, Some(PathBuf::from(path))),
                [.., "--photo"] => return Err("--photo needs a path".into()),
                _ => (rest, None),
            };
            if name_words.is_empty() {
                return Err("add needs a name".into());
            }
            Ok(Command::Add {
                name: name_words.join(" "),
                photo,
            })
        }
        ("remove", [id]) => Ok(Command::Remove(match id.parse::<i64>() {
            Ok(n) => StudentId::Number(n),
            Err(_) => StudentId::from(*id),
        })),
        ("capture", []) => Ok(Command::Capture),
        ("dismiss", []) => Ok(Command::Dismiss),
        ("show", []) => Ok(Command::Show),
        ("help", _) => Ok(Command::Help),
        ("quit" | "exit", []) => Ok(Command::Quit),
        _ => Err(format!("unrecognized command: {}", line.trim())),
    }
}

fn render<C: CameraSource>(dashboard: &Dashboard<ApiClient>, widget: &CaptureWidget<C>) {
    println!();
    println!(
        "== Attendance {} (API: {}) ==",
        dashboard.date(),
        dashboard.backend().base_url()
    );
    println!("{}", dashboard.counts());
    if let Some(error) = dashboard.roster().error() {
        println!("error: {error}");
    }
    let cards = dashboard.cards();
    if cards.is_empty() {
        println!("No students yet. Add one with `add <name>`.");
    }
    for card in cards {
        print!("{card}");
    }
    println!("-- check-in --");
    print!("{}", CaptureView(widget.state()));
}

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}

pub async fn run(config: &Config, client: ApiClient, date: Option<NaiveDate>) -> Result<()> {
    let mut dashboard = open_dashboard(config, client, date);
    let mut widget = camera_widget(config);
    widget.initialize();
    dashboard.mount().await;
    render(&dashboard, &widget);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt();
    while let Some(line) = lines.next_line().await? {
        match parse_command(&line) {
            Ok(Command::Quit) => break,
            Ok(Command::Help) => println!("{HELP}"),
            Ok(command) => {
                execute(&mut dashboard, &mut widget, command).await;
                render(&dashboard, &widget);
            }
            Err(message) => println!("{message}"),
        }
        prompt();
    }

    widget.unmount();
    Ok(())
}

async fn execute<C: CameraSource>(
    dashboard: &mut Dashboard<ApiClient>,
    widget: &mut CaptureWidget<C>,
    command: Command,
) {
    match command {
        Command::Date(date) => dashboard.set_date(date).await,
        Command::Refresh => {
            dashboard.refresh_roster().await;
        }
        Command::Add { name, photo } => {
            let photo = match photo.as_deref().map(upload_from_path).transpose() {
                Ok(photo) => photo,
                Err(e) => {
                    println!("error: {e:#}");
                    return;
                }
            };
            let form = &mut dashboard.roster_mut().form;
            form.name = name;
            form.photo = photo;
            dashboard.add_student().await;
        }
        Command::Remove(id) => {
            dashboard.remove_student(&id).await;
        }
        Command::Capture => {
            if !widget.can_capture() {
                println!("camera not ready");
                return;
            }
            dashboard.check_in(widget).await;
        }
        Command::Dismiss => widget.dismiss(),
        Command::Show | Command::Help | Command::Quit => {}
    }
}
