//! Cart update mini-language
//!
//! ```text
//! command := word ws* '[' items ']'
//! items   := item (',' item)*
//! ```
//!
//! An update is scanned for `word [items]` blocks. Blocks whose word is
//! `add` or `remove` become commands; other words are ignored with a
//! warning, as is any text between blocks. Only a bracket that is never
//! closed or is opened inside another list makes the update malformed.
//!
//! Items are whitespace-trimmed and matched case-sensitively; empty items
//! (`add [, Fries]`) are skipped. Verbs are case-sensitive too.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Add,
    Remove,
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Verb::Add => "add",
            Verb::Remove => "remove",
        })
    }
}

/// One `verb [item, ...]` block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartCommand {
    pub verb: Verb,
    pub items: Vec<String>,
}

impl CartCommand {
    pub fn add<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            verb: Verb::Add,
            items: items.into_iter().map(Into::into).collect(),
        }
    }

    pub fn remove<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            verb: Verb::Remove,
            items: items.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for CartCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.verb, self.items.join(", "))
    }
}

/// Parse failure; offsets are byte positions in the input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unexpected '[' inside item list at offset {offset}")]
    NestedBracket { offset: usize },
    #[error("item list opened at offset {offset} is never closed")]
    UnclosedBracket { offset: usize },
}

/// Parse a full cart update. An update with no `add`/`remove` blocks
/// yields no commands.
pub fn parse(input: &str) -> Result<Vec<CartCommand>, ParseError> {
    let mut parser = Parser { src: input, pos: 0 };
    let mut commands = Vec::new();

    while let Some(c) = parser.peek() {
        if c == '[' {
            let body = parser.item_list()?;
            tracing::warn!(items = %body, "Ignoring item list without a verb");
            continue;
        }
        if !is_word_char(c) {
            parser.pos += c.len_utf8();
            continue;
        }

        let word_at = parser.pos;
        let word = parser.take_while(is_word_char);
        let after_word = parser.pos;
        parser.skip_whitespace();
        if parser.peek() != Some('[') {
            // Ordinary text, not a command
            parser.pos = after_word;
            continue;
        }

        let body = parser.item_list()?;
        let verb = match word {
            "add" => Verb::Add,
            "remove" => Verb::Remove,
            other => {
                tracing::warn!(verb = %other, offset = word_at, "Ignoring unknown cart verb");
                continue;
            }
        };
        commands.push(CartCommand {
            verb,
            items: split_items(body),
        });
    }

    Ok(commands)
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn split_items(body: &str) -> Vec<String> {
    body.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a str {
        self.src.get(self.pos..).unwrap_or("")
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let rest = self.rest();
        let len = rest.find(|c: char| !pred(c)).unwrap_or(rest.len());
        let (taken, _) = rest.split_at(len);
        self.pos += len;
        taken
    }

    fn skip_whitespace(&mut self) {
        self.take_while(char::is_whitespace);
    }

    /// Consume `[ ... ]` starting at the current `[` and return the body
    fn item_list(&mut self) -> Result<&'a str, ParseError> {
        let open_at = self.pos;
        self.pos += 1;

        let body = self.take_while(|c| c != '[' && c != ']');
        match self.peek() {
            Some(']') => {
                self.pos += 1;
                Ok(body)
            }
            Some(_) => Err(ParseError::NestedBracket { offset: self.pos }),
            None => Err(ParseError::UnclosedBracket { offset: open_at }),
        }
    }
}
