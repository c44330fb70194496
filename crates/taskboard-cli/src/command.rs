//! Line commands understood by the board shell.

use chrono::{DateTime, NaiveDate, Utc};

use taskboard_core::app::DropIntent;
use taskboard_core::domain::{ListFilter, NewTask, Partition, SortMode, TaskId, TaskPatch};
use taskboard_core::impls::GatewayOp;
use taskboard_core::ports::GatewayError;

pub const HELP: &str = "\
commands:
  ls                                     show the board
  add <title> [--priority N] [--category C]
  toggle <id>                            flip done/undone
  edit <id> title=.. priority=.. category=.. description=.. due=YYYY-MM-DD|none
  rm <id>
  drag <id> before <id> todo|done        drop before another task
  drag <id> end todo|done                drop at the end of a column
  offline on|off                         simulate losing the server
  fail <op> [status|timeout]             fail the next list|create|update|delete|reorder
  filter search=.. status=all|done|undone sort=.. category=..   (no args resets)
  refresh
  help
  quit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    List,
    Add(NewTask),
    Toggle(TaskId),
    Edit(TaskId, TaskPatch),
    Remove(TaskId),
    Drag(DropIntent),
    Offline(bool),
    Fail(GatewayOp, GatewayError),
    Filter(ListFilter),
    Refresh,
    Help,
    Quit,
}

/// Parse one input line. Blank lines and `#` comments yield `None`.
pub fn parse(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let args: Vec<&str> = rest.split_whitespace().collect();

    let command = match verb {
        "ls" | "list" => Command::List,
        "add" => Command::Add(parse_add(&args)?),
        "toggle" => Command::Toggle(parse_id(single(&args, "toggle <id>")?)?),
        "edit" => {
            let (id, pairs) = args.split_first().ok_or("usage: edit <id> key=value ...")?;
            Command::Edit(parse_id(id)?, parse_patch(&key_values(pairs)?)?)
        }
        "rm" | "delete" => Command::Remove(parse_id(single(&args, "rm <id>")?)?),
        "drag" => Command::Drag(parse_drag(&args)?),
        "offline" => match single(&args, "offline on|off")? {
            "on" => Command::Offline(true),
            "off" => Command::Offline(false),
            other => return Err(format!("expected on|off, got {other:?}")),
        },
        "fail" => parse_fail(&args)?,
        "filter" => Command::Filter(parse_filter(&key_values(&args)?)?),
        "refresh" => Command::Refresh,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(format!("unknown command {other:?} (try `help`)")),
    };
    Ok(Some(command))
}

fn single<'a>(args: &[&'a str], usage: &str) -> Result<&'a str, String> {
    match args {
        [one] => Ok(*one),
        _ => Err(format!("usage: {usage}")),
    }
}

fn parse_id(raw: &str) -> Result<TaskId, String> {
    raw.parse::<TaskId>().map_err(|e| e.to_string())
}

fn parse_add(args: &[&str]) -> Result<NewTask, String> {
    let mut title = Vec::new();
    let mut payload = NewTask::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match *arg {
            "--priority" => {
                let raw = iter.next().ok_or("--priority needs a value")?;
                let priority = raw
                    .parse::<u8>()
                    .map_err(|_| format!("invalid priority {raw:?}"))?;
                payload = payload.with_priority(priority);
            }
            "--category" => {
                let raw = iter.next().ok_or("--category needs a value")?;
                payload = payload.with_category(*raw);
            }
            word => title.push(word),
        }
    }
    payload.title = title.join(" ");
    Ok(payload)
}

/// `key=value` pairs; words without `=` continue the previous value.
fn key_values<'a>(args: &[&'a str]) -> Result<Vec<(&'a str, String)>, String> {
    let mut pairs: Vec<(&'a str, String)> = Vec::new();
    for &arg in args {
        match arg.split_once('=') {
            Some((key, value)) => pairs.push((key, value.to_string())),
            None => match pairs.last_mut() {
                Some((_, value)) => {
                    value.push(' ');
                    value.push_str(arg);
                }
                None => return Err(format!("expected key=value, got {arg:?}")),
            },
        }
    }
    Ok(pairs)
}

/// Empty value or `none` clears a nullable field.
fn nullable(value: &str) -> Option<String> {
    match value.trim() {
        "" | "none" => None,
        v => Some(v.to_string()),
    }
}

fn parse_patch(pairs: &[(&str, String)]) -> Result<TaskPatch, String> {
    let mut patch = TaskPatch::default();
    for (key, value) in pairs {
        match *key {
            "title" => patch.title = Some(value.clone()),
            "description" => patch.description = Some(nullable(value)),
            "category" => patch.category = Some(nullable(value)),
            "priority" => {
                patch.priority = Some(
                    value
                        .parse::<u8>()
                        .map_err(|_| format!("invalid priority {value:?}"))?,
                )
            }
            "done" => {
                patch.completed = Some(
                    value
                        .parse::<bool>()
                        .map_err(|_| format!("expected true|false, got {value:?}"))?,
                )
            }
            "due" => patch.due_date = Some(nullable(value).map(|v| parse_due(&v)).transpose()?),
            other => return Err(format!("unknown field {other:?}")),
        }
    }
    Ok(patch)
}

fn parse_due(raw: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(at.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|at| at.and_utc())
        .ok_or_else(|| format!("invalid date {raw:?} (expected YYYY-MM-DD)"))
}

fn parse_drag(args: &[&str]) -> Result<DropIntent, String> {
    const USAGE: &str = "usage: drag <id> before <id> todo|done | drag <id> end todo|done";
    match args {
        [moved, "before", reference, target] => Ok(DropIntent::before(
            parse_id(moved)?,
            parse_id(reference)?,
            target.parse::<Partition>()?,
        )),
        [moved, "end", target] => Ok(DropIntent::end_of(
            parse_id(moved)?,
            target.parse::<Partition>()?,
        )),
        _ => Err(USAGE.to_string()),
    }
}

fn parse_fail(args: &[&str]) -> Result<Command, String> {
    let (op, rest) = args
        .split_first()
        .ok_or("usage: fail <op> [status|timeout]")?;
    let op = op.parse::<GatewayOp>()?;
    let error = match rest {
        [] => GatewayError::rejected(500, "Internal Server Error"),
        ["timeout"] => GatewayError::unreachable("request timed out"),
        [status] => {
            let status = status
                .parse::<u16>()
                .map_err(|_| format!("invalid status {status:?}"))?;
            GatewayError::Rejected {
                status,
                detail: None,
            }
        }
        _ => return Err("usage: fail <op> [status|timeout]".to_string()),
    };
    Ok(Command::Fail(op, error))
}

fn parse_filter(pairs: &[(&str, String)]) -> Result<ListFilter, String> {
    let mut filter = ListFilter::default();
    for (key, value) in pairs {
        match *key {
            "search" => filter.search = nullable(value),
            "category" => filter.category = nullable(value),
            "status" => filter.status = value.parse()?,
            "sort" => {
                filter.sort = nullable(value)
                    .map(|v| v.parse::<SortMode>())
                    .transpose()?
            }
            other => return Err(format!("unknown filter {other:?}")),
        }
    }
    Ok(filter)
}
