//! Line commands of the interactive navigator.

use std::fmt;

use route_trace_lib::{coordinates::{coordinates, Coordinates}, route_summary::RouteType};
use route_trace_session::Dialog;

pub const HELP: &str = "\
trace                      start tracing a new route
prepare | unprepare        enter or leave preparation
type <temporary|direct>    set the route type
center <lng> <lat>         move the map center
add <lng> <lat> [name]     add a stop
search <text>              search places, then `pick <n>`
pick <n>                   add the n-th search result as a stop
remove <n> | undo | clear  remove stop n, the last stop or all stops
move <from> <to>           move a stop (1-based positions)
rename <n> <name>          rename a stop
code <n> <code>            set a stop's code
note <n> <text>            set a stop's notes
confirm | back | accept    show, hide or accept the trace confirmation
cancel                     drop the trace
go | halt                  start or stop active navigation
pause | resume             pause or resume navigation
done                       complete the current stop
optimize | suggest         optimize now, or only when it is worth it
fuel <liters>              record actual fuel used
giveup | end | save        leave navigation or save the finished route
open|close <details|adjustments|summary|config>
status [json]              print the session
help | quit";

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    StartTracing,
    Prepare,
    Unprepare,
    SetRouteType(RouteType),
    Center(Coordinates),
    Add { coordinates: Coordinates, name: Option<String> },
    Search(String),
    Pick(usize),
    Remove(usize),
    RemoveLast,
    Clear,
    Move { from: usize, to: usize },
    Rename { position: usize, name: String },
    Code { position: usize, code: String },
    Note { position: usize, notes: String },
    ShowConfirmation,
    HideConfirmation,
    Accept,
    Cancel,
    Go,
    Halt,
    Pause,
    Resume,
    Done,
    Optimize,
    Suggest,
    Fuel(f64),
    GiveUp,
    End,
    Save,
    Open(Dialog),
    Close(Dialog),
    Status { json: bool },
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParseError(pub String);

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ParseError {}

/// `None` for a blank line.
pub fn parse(line: &str) -> Result<Option<Action>, ParseError> {
    let line = line.trim();
    let Some((word, rest)) = split_word(line) else {
        return Ok(None);
    };

    let action = match word.to_ascii_lowercase().as_str() {
        "trace" => Action::StartTracing,
        "prepare" => Action::Prepare,
        "unprepare" => Action::Unprepare,
        "type" => Action::SetRouteType(rest.parse().map_err(ParseError)?),
        "center" => {
            let (coordinates, _) = parse_coordinates(rest)?;
            Action::Center(coordinates)
        }
        "add" => {
            let (coordinates, name) = parse_coordinates(rest)?;
            Action::Add { coordinates, name }
        }
        "search" => Action::Search(required_text(rest, "search needs some text")?),
        "pick" => Action::Pick(position(rest)?),
        "remove" => Action::Remove(position(rest)?),
        "undo" => Action::RemoveLast,
        "clear" => Action::Clear,
        "move" => {
            let (from, to) = rest.split_once(' ')
                .ok_or_else(|| ParseError("move needs two positions".to_string()))?;
            Action::Move { from: position(from)?, to: position(to)? }
        }
        "rename" => {
            let (position, name) = position_and_text(rest)?;
            Action::Rename { position, name }
        }
        "code" => {
            let (position, code) = position_and_text(rest)?;
            Action::Code { position, code }
        }
        "note" => {
            let (position, notes) = position_and_text(rest)?;
            Action::Note { position, notes }
        }
        "confirm" => Action::ShowConfirmation,
        "back" => Action::HideConfirmation,
        "accept" => Action::Accept,
        "cancel" => Action::Cancel,
        "go" => Action::Go,
        "halt" => Action::Halt,
        "pause" => Action::Pause,
        "resume" => Action::Resume,
        "done" => Action::Done,
        "optimize" => Action::Optimize,
        "suggest" => Action::Suggest,
        "fuel" => Action::Fuel(number(rest)?),
        "giveup" => Action::GiveUp,
        "end" => Action::End,
        "save" => Action::Save,
        "open" => Action::Open(dialog(rest)?),
        "close" => Action::Close(dialog(rest)?),
        "status" => Action::Status { json: rest == "json" },
        "help" | "?" => Action::Help,
        "quit" | "exit" => Action::Quit,
        other => return Err(ParseError(format!("Unknown command: {other}, try `help`"))),
    };

    Ok(Some(action))
}

fn split_word(line: &str) -> Option<(&str, &str)> {
    if line.is_empty() {
        return None;
    }
    Some(match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    })
}

fn required_text(text: &str, error: &str) -> Result<String, ParseError> {
    if text.is_empty() {
        Err(ParseError(error.to_string()))
    } else {
        Ok(text.to_string())
    }
}

fn number(text: &str) -> Result<f64, ParseError> {
    text.trim().parse().map_err(|_| ParseError(format!("Not a number: {text:?}")))
}

fn position(text: &str) -> Result<usize, ParseError> {
    match text.trim().parse::<usize>() {
        Ok(position) if position > 0 => Ok(position),
        _ => Err(ParseError(format!("Not a stop position: {text:?}"))),
    }
}

fn position_and_text(text: &str) -> Result<(usize, String), ParseError> {
    let (first, rest) = split_word(text)
        .ok_or_else(|| ParseError("Missing stop position".to_string()))?;
    Ok((position(first)?, rest.to_string()))
}

/// `<lng> <lat> [rest]`, the rest becoming an optional name.
fn parse_coordinates(text: &str) -> Result<(Coordinates, Option<String>), ParseError> {
    let mut parts = text.splitn(3, char::is_whitespace);
    let lng = number(parts.next().unwrap_or_default())?;
    let lat = number(parts.next().unwrap_or_default())?;
    if !(-180.0..=180.0).contains(&lng) || !(-90.0..=90.0).contains(&lat) {
        return Err(ParseError(format!("Coordinates out of range: {lng} {lat}")));
    }
    let name = parts.next().map(str::trim).filter(|name| !name.is_empty()).map(str::to_string);
    Ok((coordinates(lng, lat), name))
}

fn dialog(text: &str) -> Result<Dialog, ParseError> {
    match text {
        "details" => Ok(Dialog::Details),
        "adjustments" => Ok(Dialog::Adjustments),
        "summary" => Ok(Dialog::FinalSummary),
        "config" => Ok(Dialog::Configuration),
        other => Err(ParseError(format!("Unknown dialog: {other:?}"))),
    }
}
