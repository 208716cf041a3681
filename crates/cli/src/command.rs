//! Line parsing.
//!
//! Both surface syntaxes are rewritten into one [`Command`]:
//!
//! - `<operation> <Kind> [<id>] [<args>]`
//! - `<Kind>.<operation>(<args>)`

use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;

/// Interpreter operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Create a record
    Create,
    /// Print one record
    Show,
    /// Delete one record
    Destroy,
    /// Print every record, or every record of a kind
    All,
    /// Count records of a kind
    Count,
    /// Assign attributes
    Update,
    /// Print help
    Help,
    /// Leave the shell
    Quit,
    /// End of input
    Eof,
}

impl Operation {
    /// Operations reachable through `<Kind>.<operation>(...)`.
    pub fn is_callable(self) -> bool {
        matches!(
            self,
            Operation::Create
                | Operation::Show
                | Operation::Destroy
                | Operation::All
                | Operation::Count
                | Operation::Update
        )
    }

    /// Command word.
    pub fn name(self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Show => "show",
            Operation::Destroy => "destroy",
            Operation::All => "all",
            Operation::Count => "count",
            Operation::Update => "update",
            Operation::Help => "help",
            Operation::Quit => "quit",
            Operation::Eof => "EOF",
        }
    }
}

impl FromStr for Operation {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "create" => Operation::Create,
            "show" => Operation::Show,
            "destroy" => Operation::Destroy,
            "all" => Operation::All,
            "count" => Operation::Count,
            "update" => Operation::Update,
            "help" => Operation::Help,
            "quit" => Operation::Quit,
            "EOF" => Operation::Eof,
            _ => return Err(()),
        })
    }
}

/// A normalized command: operation, entity kind and remaining arguments.
///
/// Arguments keep their quotes; see [`unquote`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Operation to run
    pub op: Operation,
    /// Entity kind as typed, not yet validated
    pub kind: Option<String>,
    /// Raw argument tokens after the kind
    pub args: Vec<String>,
}

impl Command {
    fn from_tokens(op: Operation, mut tokens: Vec<String>) -> Self {
        let kind = if tokens.is_empty() { None } else { Some(tokens.remove(0)) };
        Self { op, kind, args: tokens }
    }
}

/// Result of parsing one input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    /// Nothing to do
    Empty,
    /// A recognized command
    Command(Command),
    /// Neither syntax matched
    Unknown(String),
}

fn call_syntax() -> &'static Regex {
    static CALL: OnceLock<Regex> = OnceLock::new();
    CALL.get_or_init(|| {
        Regex::new(r"^(\w*)\.(\w+)\((.*)\)$").unwrap_or_else(|e| panic!("invalid call regex: {e}"))
    })
}

/// Parse one input line.
pub fn parse_line(line: &str) -> Line {
    let line = line.trim();
    if line.is_empty() {
        return Line::Empty;
    }
    if let Some(topic) = line.strip_prefix('?') {
        return Line::Command(Command::from_tokens(Operation::Help, split_args(topic)));
    }

    let (head, rest) = line
        .split_once(char::is_whitespace)
        .unwrap_or((line, ""));
    if let Ok(op) = head.parse::<Operation>() {
        return Line::Command(Command::from_tokens(op, split_args(rest)));
    }

    if let Some(caps) = call_syntax().captures(line) {
        if let Ok(op) = caps[2].parse::<Operation>() {
            if op.is_callable() {
                let mut tokens = Vec::new();
                if !caps[1].is_empty() {
                    tokens.push(caps[1].to_string());
                }
                tokens.extend(split_args(&caps[3]));
                return Line::Command(Command::from_tokens(op, tokens));
            }
        }
    }
    Line::Unknown(line.to_string())
}

/// Split an argument string into tokens.
///
/// Whitespace and commas separate tokens. Quoted spans (single or double)
/// and `{...}` spans are kept whole, quotes and braces included.
pub fn split_args(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut started = false;
    let mut quote: Option<char> = None;
    let mut depth = 0usize;

    let mut chars = input.chars();
    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            current.push(c);
            if c == '\\' {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => {
                quote = Some(c);
                current.push(c);
                started = true;
            }
            '{' => {
                depth += 1;
                current.push(c);
                started = true;
            }
            '}' if depth > 0 => {
                depth -= 1;
                current.push(c);
            }
            c if depth == 0 && (c.is_whitespace() || c == ',') => {
                if started {
                    tokens.push(std::mem::take(&mut current));
                    started = false;
                }
            }
            c => {
                current.push(c);
                started = true;
            }
        }
    }
    if started {
        tokens.push(current);
    }
    tokens
}

/// Remove quoting from a token the way a shell would: quote characters are
/// dropped, and inside double quotes `\"` and `\\` are unescaped.
pub fn unquote(token: &str) -> String {
    let mut out = String::with_capacity(token.len());
    let mut quote: Option<char> = None;
    let mut chars = token.chars();
    while let Some(c) = chars.next() {
        match (quote, c) {
            (None, '"' | '\'') => quote = Some(c),
            (Some(q), c) if c == q => quote = None,
            (Some('"'), '\\') => match chars.next() {
                Some(next @ ('"' | '\\')) => out.push(next),
                Some(next) => {
                    out.push('\\');
                    out.push(next);
                }
                None => out.push('\\'),
            },
            (_, c) => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(line: &str) -> Command {
        match parse_line(line) {
            Line::Command(command) => command,
            other => panic!("expected a command, got {other:?}"),
        }
    }

    #[test]
    fn test_split_args_respects_quotes_and_braces() {
        assert_eq!(split_args("State 1234"), vec!["State", "1234"]);
        assert_eq!(
            split_args(r#""1234", "name", "My house""#),
            vec![r#""1234""#, r#""name""#, r#""My house""#]
        );
        assert_eq!(
            split_args(r#""42", {'name': "Bob", 'age': 3}"#),
            vec![r#""42""#, r#"{'name': "Bob", 'age': 3}"#]
        );
        assert_eq!(split_args(r#"name="My_house" rooms=3"#), vec![r#"name="My_house""#, "rooms=3"]);
        assert!(split_args("   ").is_empty());
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote(r#""My house""#), "My house");
        assert_eq!(unquote("'abc'"), "abc");
        assert_eq!(unquote(r#"name="a b""#), "name=a b");
        assert_eq!(unquote(r#""say \"hi\"""#), r#"say "hi""#);
        assert_eq!(unquote("plain"), "plain");
    }

    #[test]
    fn test_shell_syntax() {
        let cmd = command("show State 1234");
        assert_eq!(cmd.op, Operation::Show);
        assert_eq!(cmd.kind.as_deref(), Some("State"));
        assert_eq!(cmd.args, vec!["1234"]);

        let cmd = command("all");
        assert_eq!(cmd.op, Operation::All);
        assert_eq!(cmd.kind, None);
    }

    #[test]
    fn test_call_syntax_rewrites_to_shell_order() {
        assert_eq!(command("State.show(1234)"), command("show State 1234"));
        assert_eq!(command("Amenity.count()"), command("count Amenity"));
        assert_eq!(
            command(r#"User.update("42", "first_name", "John")"#),
            command(r#"update User "42" "first_name" "John""#)
        );
    }

    #[test]
    fn test_call_without_kind() {
        assert_eq!(command(".all()"), command("all"));
        assert_eq!(command(".count()"), command("count"));
        assert_eq!(command(".show(1234)"), command("show 1234"));
        assert_eq!(parse_line(".fly()"), Line::Unknown(".fly()".into()));
    }

    #[test]
    fn test_unsupported_call_is_unknown() {
        assert_eq!(parse_line("State.quit()"), Line::Unknown("State.quit()".into()));
        assert_eq!(parse_line("State.fly()"), Line::Unknown("State.fly()".into()));
        assert_eq!(parse_line("Draco"), Line::Unknown("Draco".into()));
        assert_eq!(parse_line("  "), Line::Empty);
    }

    #[test]
    fn test_question_mark_is_help() {
        let cmd = command("? create");
        assert_eq!(cmd.op, Operation::Help);
        assert_eq!(cmd.kind.as_deref(), Some("create"));
    }
}
