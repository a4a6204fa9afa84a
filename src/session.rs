//! Interactive menu session: search, list searchable fields, exit.

use crate::resolver::Resolver;
use crate::types::{Collection, Record};
use colored::Colorize;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use serde_json::Value;
use std::io::{self, BufRead, Write};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Line editor error: {0}")]
    Readline(#[from] ReadlineError),
}

/// Source of operator input.
pub trait Prompt {
    /// Show `prompt` and read one line. `None` means the operator is done
    /// (end of input or interrupt).
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>, SessionError>;
}

/// Line-editing prompt for an interactive terminal.
pub struct TerminalPrompt {
    editor: DefaultEditor,
}

impl TerminalPrompt {
    pub fn new() -> Result<Self, SessionError> {
        Ok(TerminalPrompt {
            editor: DefaultEditor::new()?,
        })
    }
}

impl Prompt for TerminalPrompt {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>, SessionError> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = self.editor.add_history_entry(line.as_str());
                }
                Ok(Some(line))
            }
            Err(ReadlineError::Eof | ReadlineError::Interrupted) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Plain prompt over any reader, for piped input.
pub struct LinePrompt<R, W> {
    reader: R,
    echo: W,
}

impl<R: BufRead, W: Write> LinePrompt<R, W> {
    /// Prompts are written to `echo`.
    pub fn new(reader: R, echo: W) -> Self {
        LinePrompt { reader, echo }
    }
}

impl<R: BufRead, W: Write> Prompt for LinePrompt<R, W> {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>, SessionError> {
        write!(self.echo, "{}", prompt)?;
        self.echo.flush()?;

        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let trimmed = line.strip_suffix('\n').unwrap_or(&line);
        let trimmed = trimmed.strip_suffix('\r').unwrap_or(trimmed);
        Ok(Some(trimmed.to_string()))
    }
}

/// Render a record as aligned `key  value` lines.
pub fn format_record(record: &Record) -> String {
    let width = record.keys().map(|k| k.len()).max().unwrap_or(0);
    let mut out = String::new();
    for (key, value) in record {
        let rendered = match value {
            Value::String(s) => s.clone(),
            Value::Null => "null".dimmed().to_string(),
            other => other.to_string(),
        };
        let key = format!("{:<width$}", key, width = width);
        out.push_str(&format!("  {}  {}\n", key.cyan(), rendered));
    }
    out
}

/// Render the searchable field listing for every collection.
pub fn format_field_listing(resolver: &Resolver<'_>) -> String {
    let mut out = String::new();
    for collection in Collection::ALL {
        out.push_str(&format!("{}\n", collection.title().bold()));
        for field in resolver.fields(collection).iter() {
            out.push_str(&format!("  {}\n", field));
        }
        out.push('\n');
    }
    out
}

enum MainChoice {
    Search,
    Fields,
    Exit,
}

enum CollectionChoice {
    Pick(Collection),
    Back,
}

fn parse_main_choice(input: &str) -> Option<MainChoice> {
    match input.trim().to_lowercase().as_str() {
        "1" | "search" | "s" => Some(MainChoice::Search),
        "2" | "fields" | "f" => Some(MainChoice::Fields),
        "3" | "exit" | "quit" | "q" => Some(MainChoice::Exit),
        _ => None,
    }
}

fn parse_collection_choice(input: &str) -> Option<CollectionChoice> {
    match input.trim().to_lowercase().as_str() {
        "1" => Some(CollectionChoice::Pick(Collection::Users)),
        "2" => Some(CollectionChoice::Pick(Collection::Tickets)),
        "3" => Some(CollectionChoice::Pick(Collection::Organizations)),
        "4" | "back" | "b" => Some(CollectionChoice::Back),
        other => other.parse().ok().map(CollectionChoice::Pick),
    }
}

/// One operator session over a resolver.
pub struct Session<'r, 's, P, W> {
    resolver: &'r Resolver<'s>,
    prompt: P,
    out: W,
    include_relationships: bool,
}

impl<'r, 's, P: Prompt, W: Write> Session<'r, 's, P, W> {
    pub fn new(resolver: &'r Resolver<'s>, prompt: P, out: W) -> Self {
        Session {
            resolver,
            prompt,
            out,
            include_relationships: true,
        }
    }

    pub fn include_relationships(mut self, include: bool) -> Self {
        self.include_relationships = include;
        self
    }

    /// Run the menu loop until the operator exits or input ends.
    pub async fn run(&mut self, welcome_delay: Duration) -> Result<(), SessionError> {
        if !welcome_delay.is_zero() {
            tokio::time::sleep(welcome_delay).await;
        }
        writeln!(self.out, "{}", " Welcome ".black().on_magenta())?;

        loop {
            writeln!(self.out)?;
            writeln!(self.out, "{}", "Select an option".bold())?;
            writeln!(self.out, "  1) Search")?;
            writeln!(self.out, "  2) View a list of searchable fields")?;
            writeln!(self.out, "  3) Exit")?;

            let Some(input) = self.prompt.read_line("> ")? else {
                break;
            };

            match parse_main_choice(&input) {
                Some(MainChoice::Search) => {
                    if !self.search().await? {
                        break;
                    }
                }
                Some(MainChoice::Fields) => {
                    write!(self.out, "{}", format_field_listing(self.resolver))?;
                }
                Some(MainChoice::Exit) => {
                    writeln!(self.out, "{}", "Ok. Bye!".black().on_magenta())?;
                    return Ok(());
                }
                None => {
                    writeln!(
                        self.out,
                        "{}",
                        format!("Unknown option: {}. Enter 1, 2 or 3.", input.trim()).yellow()
                    )?;
                }
            }
        }

        debug!("input closed, ending session");
        Ok(())
    }

    /// One search round. Returns `false` when input ended mid-search.
    async fn search(&mut self) -> Result<bool, SessionError> {
        let collection = loop {
            writeln!(self.out, "{}", "Select a collection".bold())?;
            writeln!(self.out, "  1) Users")?;
            writeln!(self.out, "  2) Tickets")?;
            writeln!(self.out, "  3) Organizations")?;
            writeln!(self.out, "  4) Back")?;

            let Some(input) = self.prompt.read_line("> ")? else {
                return Ok(false);
            };
            match parse_collection_choice(&input) {
                Some(CollectionChoice::Pick(collection)) => break collection,
                Some(CollectionChoice::Back) => return Ok(true),
                None => writeln!(
                    self.out,
                    "{}",
                    format!("Unknown collection: {}", input.trim()).yellow()
                )?,
            }
        };

        let Some(field) = self.prompt.read_line("Enter search term: ")? else {
            return Ok(false);
        };
        let Some(value) = self.prompt.read_line("Enter search value: ")? else {
            return Ok(false);
        };

        let found = self
            .resolver
            .find(
                collection,
                field.trim(),
                &value,
                self.include_relationships,
            )
            .await;

        match found {
            Some(record) => write!(self.out, "{}", format_record(&record))?,
            None => writeln!(self.out, "{}", "No resource found".yellow())?,
        }
        Ok(true)
    }
}
