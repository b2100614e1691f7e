//! Operator console: stdin lines in, session events out.

use gatekeep_core::{
    mutation::MutationKind,
    session::{GateCommand, GateEvent, NoticeLevel, QueueSnapshot},
};
use gatekeep_model::QueueKind;

pub const HELP: &str = "\
commands:
  refresh            reload the current page
  page N             go to page N
  search TEXT        search the whole queue (empty clears)
  in | out           show the check-in / check-out queue
  toggle ID          select or deselect an attendee
  all | clear        select the whole page / clear the selection
  checkin ID         check an attendee in
  checkout ID        check an attendee out
  bulk               run the queue's mutation over the selection
  scan | stop        start / stop the camera
  qr CODE            feed a decoded code to the camera
  quit               end the session";

/// One parsed stdin line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Command(GateCommand),
    /// Simulated camera decode.
    Decode(String),
    Help,
    Quit,
}

pub fn parse_line(line: &str) -> Result<Option<Input>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let needs_arg = |what: &str| {
        if rest.is_empty() {
            Err(format!("{word} needs {what}"))
        } else {
            Ok(rest.to_string())
        }
    };

    let input = match word.to_ascii_lowercase().as_str() {
        "refresh" | "r" => Input::Command(GateCommand::Refresh),
        "page" | "p" => {
            let page = needs_arg("a page number")?
                .parse::<u32>()
                .map_err(|_| format!("not a page number: {rest}"))?;
            Input::Command(GateCommand::FetchPage(page))
        }
        "search" | "s" => Input::Command(GateCommand::SetQuery(rest.to_string())),
        "in" => Input::Command(GateCommand::SwitchQueue(QueueKind::NeedsCheckIn)),
        "out" => {
            Input::Command(GateCommand::SwitchQueue(QueueKind::NeedsCheckOut))
        }
        "toggle" | "t" => {
            Input::Command(GateCommand::Toggle(needs_arg("an attendee id")?.into()))
        }
        "all" => Input::Command(GateCommand::SelectAll),
        "clear" => Input::Command(GateCommand::ClearSelection),
        "checkin" => {
            Input::Command(GateCommand::CheckIn(needs_arg("an attendee id")?.into()))
        }
        "checkout" => Input::Command(GateCommand::CheckOut(
            needs_arg("an attendee id")?.into(),
        )),
        "bulk" => Input::Command(GateCommand::BulkMutate),
        "scan" => Input::Command(GateCommand::StartScan),
        "stop" => Input::Command(GateCommand::StopScan),
        "qr" => Input::Decode(needs_arg("a code")?),
        "help" | "?" => Input::Help,
        "quit" | "exit" | "q" => Input::Quit,
        other => return Err(format!("unknown command {other:?} (try help)")),
    };
    Ok(Some(input))
}

/// Render an event for the terminal.
pub fn render(event: &GateEvent) -> String {
    match event {
        GateEvent::QueueUpdated(snapshot) => render_queue(snapshot),
        GateEvent::SelectionChanged(ids) if ids.is_empty() => {
            "selection cleared".to_string()
        }
        GateEvent::SelectionChanged(ids) => {
            let ids = ids.iter().map(|id| id.as_str()).collect::<Vec<_>>();
            format!("selected ({}): {}", ids.len(), ids.join(", "))
        }
        GateEvent::MutationApplied { id, kind } => match kind {
            MutationKind::CheckIn => format!("checked in {id}"),
            MutationKind::CheckOut => format!("checked out {id}"),
        },
        GateEvent::MutationIgnored { id } => {
            format!("{id}: request already in progress")
        }
        GateEvent::MutationFailed { id, kind, notice } => {
            format!("{kind} failed for {id}: {notice}")
        }
        GateEvent::BulkCompleted(report) => report.to_string(),
        GateEvent::ScanStarted => "camera on".to_string(),
        GateEvent::ScanStopped => "camera off".to_string(),
        GateEvent::ScanRejected { code } => format!("unknown code {code:?}"),
        GateEvent::BadgeCount(count) => format!("{count} still to check in"),
        GateEvent::Notice(notice) => {
            let tag = match notice.level {
                NoticeLevel::Info => "info",
                NoticeLevel::Warning => "warning",
                NoticeLevel::Error => "error",
            };
            format!("[{tag}] {notice}")
        }
        GateEvent::Closed => "session closed".to_string(),
    }
}

fn render_queue(snapshot: &QueueSnapshot) -> String {
    let mut out = format!(
        "{} (event {}{}) page {}/{} · {} total",
        snapshot.kind,
        snapshot.scope.event_id,
        snapshot
            .scope
            .session_area_id
            .as_ref()
            .map(|area| format!(", area {area}"))
            .unwrap_or_default(),
        snapshot.pagination.current_page,
        snapshot.pagination.total_pages.max(1),
        snapshot.pagination.total_count,
    );
    if let Some(query) = &snapshot.query {
        out.push_str(&format!(" · search {query:?}"));
    }
    for record in &snapshot.records {
        let marker = if snapshot.pending.contains(&record.id) {
            '…'
        } else {
            ' '
        };
        out.push_str(&format!(
            "\n {marker} {:>6}  {}  <{}>",
            record.id.as_str(),
            record.name,
            record.email
        ));
        if let Some(org) = &record.organization {
            out.push_str(&format!("  {org}"));
        }
    }
    out
}
