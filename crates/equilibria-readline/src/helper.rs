use std::borrow::Cow::{self, Borrowed, Owned};

use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Helper};

use equilibria_core::session::{FederatedProvider, Route};
use strum::IntoEnumIterator;

use crate::commands::COMMANDS;

/// REPL helper: completes command names, page paths after `/go` and
/// provider names after `/federated`.
#[derive(Clone)]
pub struct CliHelper {
    commands: Vec<String>,
    pages: Vec<String>,
    providers: Vec<String>,
}

impl CliHelper {
    pub fn new() -> Self {
        Self {
            commands: COMMANDS.iter().map(|cmd| cmd.to_string()).collect(),
            pages: Route::NAVIGATION
                .iter()
                .chain(std::iter::once(&Route::SignIn))
                .map(|route| route.path().to_string())
                .collect(),
            providers: FederatedProvider::iter().map(|p| p.to_string()).collect(),
        }
    }

    /// Candidates for the word being typed, with the byte offset it starts at.
    fn candidates<'a>(&'a self, line: &str) -> (usize, Vec<&'a String>) {
        let (pool, start) = match line.split_once(' ') {
            None if line.starts_with('/') => (&self.commands, 0),
            Some(("/go", _)) => (&self.pages, "/go ".len()),
            Some(("/federated", _)) => (&self.providers, "/federated ".len()),
            _ => return (0, Vec::new()),
        };
        let word = &line[start..];
        if word.contains(' ') {
            return (0, Vec::new());
        }
        let matches = pool
            .iter()
            .filter(|candidate| candidate.starts_with(word))
            .collect();
        (start, matches)
    }
}

impl Helper for CliHelper {}

impl Completer for CliHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let (start, matches) = self.candidates(&line[..pos]);
        let pairs = matches
            .into_iter()
            .map(|candidate| Pair {
                display: candidate.clone(),
                replacement: candidate.clone(),
            })
            .collect();
        Ok((start, pairs))
    }
}

impl Highlighter for CliHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if line.starts_with('/') {
            Owned(line.bright_cyan().to_string())
        } else {
            Borrowed(line)
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for CliHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        if pos < line.len() {
            return None;
        }
        let (start, matches) = self.candidates(line);
        let typed = line.len() - start;
        matches
            .into_iter()
            .find(|candidate| candidate.len() > typed)
            .map(|candidate| candidate[typed..].to_string())
    }
}

impl Validator for CliHelper {}
