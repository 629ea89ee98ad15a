use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use hamlog_common::RecordId;

use crate::controller::FormField;

static COMMAND_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[/\\](\S+)\s*(.*)$").expect("command pattern is valid"));

pub const HELP: &str = "\
Commands (prefix with / or \\):
  /next, /prev            show the next or previous page
  /page N                 jump to page N
  /refresh                reload the current page
  /toggle ID              check or uncheck a row
  /all, /none             check or uncheck every row on the page
  /new                    log a new contact
  /edit [ID]              edit one record (the selected one if no ID)
  /batch                  edit all selected records with one form
  /set FIELD VALUE        change a field of the open form
  /save, /cancel          submit or discard the open form
  /delete                 delete the selected records
  /history CALLSIGN       previous contacts with a callsign
  /help                   this text
  /quit                   leave";

/// One operator command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Next,
    Prev,
    Page(u32),
    Refresh,
    Toggle(RecordId),
    SelectAll,
    SelectNone,
    New,
    /// Without an id the selected record is edited
    Edit(Option<RecordId>),
    Batch,
    Set { field: FormField, value: String },
    Save,
    Cancel,
    Delete,
    History(String),
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("Not a command, commands start with / (try /help)")]
    NotACommand,
    #[error("Unknown command: /{0}")]
    Unknown(String),
    #[error("/{command} needs {argument}")]
    MissingArgument { command: &'static str, argument: &'static str },
    #[error("/{command}: {message}")]
    InvalidArgument { command: &'static str, message: String },
}

impl Command {
    /// Parse a line such as `/page 3` or `\set mode CW`.
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let caps = COMMAND_RE.captures(line).ok_or(CommandError::NotACommand)?;
        let name = caps.get(1).map_or("", |m| m.as_str()).to_lowercase();
        let args = caps.get(2).map_or("", |m| m.as_str()).trim();

        let command = match name.as_str() {
            "next" | "n" => Command::Next,
            "prev" | "p" => Command::Prev,
            "page" => Command::Page(page_number(args)?),
            "refresh" | "r" => Command::Refresh,
            "toggle" | "t" => Command::Toggle(record_id("toggle", args)?),
            "all" => Command::SelectAll,
            "none" => Command::SelectNone,
            "new" => Command::New,
            "edit" | "e" => {
                if args.is_empty() {
                    Command::Edit(None)
                } else {
                    Command::Edit(Some(record_id("edit", args)?))
                }
            }
            "batch" => Command::Batch,
            "set" => {
                let (field, value) = args
                    .split_once(char::is_whitespace)
                    .unwrap_or((args, ""));
                if field.is_empty() {
                    return Err(CommandError::MissingArgument {
                        command: "set",
                        argument: "a field name",
                    });
                }
                let field = field.parse::<FormField>().map_err(|message| CommandError::InvalidArgument {
                    command: "set",
                    message,
                })?;
                Command::Set {
                    field,
                    value: value.trim().to_string(),
                }
            }
            "save" => Command::Save,
            "cancel" => Command::Cancel,
            "delete" | "del" => Command::Delete,
            "history" | "h" => {
                if args.is_empty() {
                    return Err(CommandError::MissingArgument {
                        command: "history",
                        argument: "a callsign",
                    });
                }
                Command::History(args.to_uppercase())
            }
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            _ => return Err(CommandError::Unknown(name)),
        };

        Ok(command)
    }
}

fn page_number(args: &str) -> Result<u32, CommandError> {
    if args.is_empty() {
        return Err(CommandError::MissingArgument {
            command: "page",
            argument: "a page number",
        });
    }
    args.parse::<u32>().map_err(|_| CommandError::InvalidArgument {
        command: "page",
        message: format!("'{}' is not a page number", args),
    })
}

fn record_id(command: &'static str, args: &str) -> Result<RecordId, CommandError> {
    if args.is_empty() {
        return Err(CommandError::MissingArgument {
            command,
            argument: "a record id",
        });
    }
    args.parse::<RecordId>()
        .map_err(|message| CommandError::InvalidArgument { command, message })
}
