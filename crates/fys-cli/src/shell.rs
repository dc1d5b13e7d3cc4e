//! Line-driven interactive session.
//!
//! Keeps one [`App`] alive so filter edits flow through the engine the same
//! way a UI would drive it.

use fys_client::DirectoryClient;
use fys_core::GeoPoint;
use fys_sync::App;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::{account, listing};

const HELP: &str = "\
commands:
  distance <n>        set the search radius
  search [text]       narrow the listing locally (empty clears)
  center <lat> <lng>  move the map center
  refresh             fetch again with the current filter
  list                show visible services
  map                 show map center and markers
  login <email> <password>
  logout
  help
  quit";

#[derive(Debug, PartialEq)]
enum ShellCommand<'a> {
    Distance(&'a str),
    Search(&'a str),
    Center(&'a str, &'a str),
    Refresh,
    List,
    Map,
    Login(&'a str, &'a str),
    Logout,
    Help,
    Quit,
    Empty,
    Unknown(&'a str),
}

fn parse_line(line: &str) -> ShellCommand<'_> {
    let line = line.trim();
    let (head, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();
    let mut args = rest.split_whitespace();
    match head {
        "" => ShellCommand::Empty,
        "distance" => ShellCommand::Distance(rest),
        "search" => ShellCommand::Search(rest),
        "center" => match (args.next(), args.next()) {
            (Some(lat), Some(lng)) => ShellCommand::Center(lat, lng),
            _ => ShellCommand::Unknown(line),
        },
        "refresh" => ShellCommand::Refresh,
        "list" | "ls" => ShellCommand::List,
        "map" => ShellCommand::Map,
        "login" => match (args.next(), args.next()) {
            (Some(email), Some(password)) => ShellCommand::Login(email, password),
            _ => ShellCommand::Unknown(line),
        },
        "logout" => ShellCommand::Logout,
        "help" | "?" => ShellCommand::Help,
        "quit" | "exit" => ShellCommand::Quit,
        _ => ShellCommand::Unknown(line),
    }
}

/// Reads commands from stdin until `quit` or end of input. Command failures
/// are printed and the session continues.
///
/// # Errors
///
/// Returns an error only if stdin cannot be read.
pub(crate) async fn run_shell(app: &App<DirectoryClient>) -> anyhow::Result<()> {
    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = parse_line(&line);
        if command == ShellCommand::Quit {
            break;
        }
        if let Err(e) = execute(app, command).await {
            tracing::debug!(error = ?e, "shell command failed");
            println!("error: {e:#}");
            if let Some(hint) = account::unauthorized_hint(&e) {
                println!("{hint}");
            }
        }
    }
    Ok(())
}

async fn execute(app: &App<DirectoryClient>, command: ShellCommand<'_>) -> anyhow::Result<()> {
    match command {
        ShellCommand::Distance(raw) => {
            app.filters().set_distance_str(raw)?;
            listing::print_listing(&listing::settle(app).await);
        }
        ShellCommand::Search(text) => {
            app.filters().set_search(text);
            listing::print_listing(&listing::settle(app).await);
        }
        ShellCommand::Center(lat, lng) => {
            let center = GeoPoint::new(lat.parse()?, lng.parse()?)?;
            app.filters().set_center(center)?;
            listing::print_listing(&listing::settle(app).await);
        }
        ShellCommand::Refresh => {
            if let Some(generation) = app.engine().refresh().await {
                listing::print_listing(&app.engine().wait_for_generation(generation).await);
            }
        }
        ShellCommand::List => listing::print_listing(&app.snapshot()),
        ShellCommand::Map => listing::print_map(&app.snapshot()),
        ShellCommand::Login(email, password) => account::run_login(app, email, password).await?,
        ShellCommand::Logout => account::run_logout(app).await?,
        ShellCommand::Help => println!("{HELP}"),
        ShellCommand::Unknown(line) => println!("unrecognized: {line} (try `help`)"),
        ShellCommand::Quit | ShellCommand::Empty => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_filter_commands() {
        assert_eq!(parse_line("distance 25"), ShellCommand::Distance("25"));
        assert_eq!(parse_line("  search  corner cafe "), ShellCommand::Search("corner cafe"));
        assert_eq!(parse_line("search"), ShellCommand::Search(""));
        assert_eq!(
            parse_line("center 40.7 -73.9"),
            ShellCommand::Center("40.7", "-73.9")
        );
    }

    #[test]
    fn incomplete_arguments_are_unknown() {
        assert_eq!(parse_line("center 40.7"), ShellCommand::Unknown("center 40.7"));
        assert_eq!(
            parse_line("login ada@example.com"),
            ShellCommand::Unknown("login ada@example.com")
        );
    }

    #[test]
    fn parses_bare_commands() {
        assert_eq!(parse_line(""), ShellCommand::Empty);
        assert_eq!(parse_line("ls"), ShellCommand::List);
        assert_eq!(parse_line("exit"), ShellCommand::Quit);
        assert_eq!(parse_line("frobnicate"), ShellCommand::Unknown("frobnicate"));
    }
}
