//! REPL command parsing.

use equilibria_core::session::{FederatedProvider, Route};

/// Commands offered for completion.
pub const COMMANDS: [&str; 13] = [
    "/go", "/pages", "/login", "/register", "/federated", "/logout", "/refresh", "/speak",
    "/close", "/analyze", "/whoami", "/help", "/quit",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Go(Route),
    Pages,
    Login { email: String, password: String },
    Register {
        email: String,
        password: String,
        display_name: Option<String>,
    },
    Federated(FederatedProvider),
    Logout,
    Refresh,
    Speak,
    Close,
    Analyze(String),
    WhoAmI,
    Help,
    Quit,
    /// Anything that is not a command goes to the chat assistant.
    Chat(String),
}

impl Command {
    /// Whether the line may be stored in history.
    pub fn is_sensitive(&self) -> bool {
        matches!(self, Command::Login { .. } | Command::Register { .. })
    }
}

pub fn parse(line: &str) -> Result<Command, String> {
    let line = line.trim();
    if line == "quit" || line == "exit" {
        return Ok(Command::Quit);
    }
    if !line.starts_with('/') {
        return Ok(Command::Chat(line.to_string()));
    }

    let (name, rest) = match line.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (line, ""),
    };
    let mut args = rest.split_whitespace();

    match name {
        "/go" => {
            let path = args.next().ok_or("usage: /go <path>")?;
            Ok(Command::Go(Route::from_path(path)))
        }
        "/pages" => Ok(Command::Pages),
        "/login" => {
            let (email, password) = credential_args(&mut args, "usage: /login <email> <password>")?;
            Ok(Command::Login { email, password })
        }
        "/register" => {
            let (email, password) =
                credential_args(&mut args, "usage: /register <email> <password> [display name]")?;
            let display_name = args.collect::<Vec<_>>().join(" ");
            Ok(Command::Register {
                email,
                password,
                display_name: (!display_name.is_empty()).then_some(display_name),
            })
        }
        "/federated" => {
            let provider = args
                .next()
                .ok_or("usage: /federated <google|facebook|github>")?;
            provider
                .parse::<FederatedProvider>()
                .map(Command::Federated)
                .map_err(|_| format!("unknown provider '{provider}'"))
        }
        "/logout" => Ok(Command::Logout),
        "/refresh" => Ok(Command::Refresh),
        "/speak" => Ok(Command::Speak),
        "/close" => Ok(Command::Close),
        "/analyze" if rest.is_empty() => Err("usage: /analyze <journal entry>".to_string()),
        "/analyze" => Ok(Command::Analyze(rest.to_string())),
        "/whoami" => Ok(Command::WhoAmI),
        "/help" => Ok(Command::Help),
        "/quit" | "/exit" => Ok(Command::Quit),
        other => Err(format!("unknown command '{other}'")),
    }
}

fn credential_args<'a>(
    args: &mut impl Iterator<Item = &'a str>,
    usage: &str,
) -> Result<(String, String), String> {
    match (args.next(), args.next()) {
        (Some(email), Some(password)) => Ok((email.to_string(), password.to_string())),
        _ => Err(usage.to_string()),
    }
}
