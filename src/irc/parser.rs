//! Inbound frame tokenizer.
//!
//! Splits `[:<source>] <word-or-code> <args...>` into its parts. No protocol
//! knowledge lives here; routing happens in [`dispatch`](crate::irc::dispatch).

/// Command position of a frame: a numeric reply or a command word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb<'a> {
    Numeric(u16),
    Word(&'a str),
}

/// One parsed inbound frame. Borrows from the raw line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame<'a> {
    pub source: &'a str,
    pub verb: Verb<'a>,
    pub params: Vec<&'a str>,
}

/// Parse one raw line. Returns `None` for blank lines and for a bare
/// source with nothing after it.
pub fn parse_line(line: &str) -> Option<Frame<'_>> {
    let line = line.trim_end_matches(['\r', '\n']).trim();
    if line.is_empty() {
        return None;
    }

    let mut tokens = line.split(' ');
    let mut first = tokens.next()?;
    let mut source = "";
    if let Some(src) = first.strip_prefix(':') {
        source = src;
        first = tokens.next()?;
    }

    let verb = match first.parse::<u16>() {
        Ok(code) => Verb::Numeric(code),
        Err(_) => Verb::Word(first),
    };

    Some(Frame {
        source,
        verb,
        params: tokens.collect(),
    })
}

/// Join parameters back into one string and drop the trailing-argument
/// marker from the front.
pub fn trailing(params: &[&str]) -> String {
    let joined = params.join(" ");
    match joined.strip_prefix(':') {
        Some(rest) => rest.to_string(),
        None => joined,
    }
}
