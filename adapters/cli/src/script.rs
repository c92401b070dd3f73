//! Parser for scripted input sessions.
//!
//! Each non-empty line is one frame. A line starts with a key (`-` for none),
//! optionally followed by click coordinates and a `+millis` delay:
//!
//! ```text
//! # plumber moves onto the pipe under (130, 320)
//! Q 130 320
//! - 400 200 +50
//! wait 11000
//! ```

use std::time::Duration;

use glam::Vec2;
use thiserror::Error;

const COMMENT_PREFIX: char = '#';
const NO_KEY: &str = "-";
const WAIT: &str = "wait";

/// Frame described by one script line.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct ScriptFrame {
    /// Key pressed during the frame.
    pub(crate) key: Option<char>,
    /// Pointer click during the frame.
    pub(crate) click: Option<Vec2>,
    /// Simulated time of the frame; the configured tick when absent.
    pub(crate) delay: Option<Duration>,
}

/// Errors raised while parsing a script, tagged with one-based line numbers.
#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum ScriptError {
    /// The first token is neither a single letter nor `-` nor `wait`.
    #[error("line {line}: `{token}` is not a key")]
    InvalidKey {
        /// Offending line.
        line: usize,
        /// Offending token.
        token: String,
    },
    /// A number could not be parsed.
    #[error("line {line}: `{token}` is not a number")]
    InvalidNumber {
        /// Offending line.
        line: usize,
        /// Offending token.
        token: String,
    },
    /// A click carried only one coordinate.
    #[error("line {line}: a click needs both coordinates")]
    MissingCoordinate {
        /// Offending line.
        line: usize,
    },
    /// `wait` was not followed by a duration.
    #[error("line {line}: `wait` needs a duration in milliseconds")]
    MissingDelay {
        /// Offending line.
        line: usize,
    },
    /// Tokens remained after the line was fully parsed.
    #[error("line {line}: unexpected `{token}`")]
    UnexpectedToken {
        /// Offending line.
        line: usize,
        /// Offending token.
        token: String,
    },
}

/// Parses every frame of a script, skipping blank lines and comments.
pub(crate) fn parse(text: &str) -> Result<Vec<ScriptFrame>, ScriptError> {
    let mut frames = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let content = raw
            .split_once(COMMENT_PREFIX)
            .map_or(raw, |(before, _)| before)
            .trim();
        if content.is_empty() {
            continue;
        }
        frames.push(parse_line(line, content)?);
    }
    Ok(frames)
}

fn parse_line(line: usize, content: &str) -> Result<ScriptFrame, ScriptError> {
    let mut tokens = content.split_whitespace().peekable();
    let first = tokens.next().unwrap_or(NO_KEY);

    if first.eq_ignore_ascii_case(WAIT) {
        let millis = tokens.next().ok_or(ScriptError::MissingDelay { line })?;
        let delay = Duration::from_millis(parse_number(line, millis)?);
        reject_rest(line, tokens)?;
        return Ok(ScriptFrame {
            key: None,
            click: None,
            delay: Some(delay),
        });
    }

    let key = parse_key(line, first)?;
    let mut click = None;
    if let Some(x) = tokens.next_if(|token| !token.starts_with('+')) {
        let y = tokens
            .next_if(|token| !token.starts_with('+'))
            .ok_or(ScriptError::MissingCoordinate { line })?;
        click = Some(Vec2::new(
            parse_number::<i32>(line, x)? as f32,
            parse_number::<i32>(line, y)? as f32,
        ));
    }
    let delay = tokens
        .next_if(|token| token.starts_with('+'))
        .map(|token| parse_number(line, &token[1..]).map(Duration::from_millis))
        .transpose()?;
    reject_rest(line, tokens)?;

    Ok(ScriptFrame { key, click, delay })
}

fn parse_key(line: usize, token: &str) -> Result<Option<char>, ScriptError> {
    if token == NO_KEY {
        return Ok(None);
    }
    let mut chars = token.chars();
    match (chars.next(), chars.next()) {
        (Some(key), None) if key.is_ascii_alphabetic() => Ok(Some(key.to_ascii_uppercase())),
        _ => Err(ScriptError::InvalidKey {
            line,
            token: token.to_owned(),
        }),
    }
}

fn parse_number<T: std::str::FromStr>(line: usize, token: &str) -> Result<T, ScriptError> {
    token.parse().map_err(|_| ScriptError::InvalidNumber {
        line,
        token: token.to_owned(),
    })
}

fn reject_rest<'a>(
    line: usize,
    mut tokens: impl Iterator<Item = &'a str>,
) -> Result<(), ScriptError> {
    match tokens.next() {
        Some(token) => Err(ScriptError::UnexpectedToken {
            line,
            token: token.to_owned(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_keys_clicks_and_delays() {
        let frames = parse(
            "# opening\n\
             q 130 320\n\
             \n\
             - 400 200 +50\n\
             W # pass\n\
             wait 11000\n",
        )
        .expect("valid script");

        assert_eq!(
            frames,
            vec![
                ScriptFrame {
                    key: Some('Q'),
                    click: Some(Vec2::new(130.0, 320.0)),
                    delay: None,
                },
                ScriptFrame {
                    key: None,
                    click: Some(Vec2::new(400.0, 200.0)),
                    delay: Some(Duration::from_millis(50)),
                },
                ScriptFrame {
                    key: Some('W'),
                    click: None,
                    delay: None,
                },
                ScriptFrame {
                    key: None,
                    click: None,
                    delay: Some(Duration::from_secs(11)),
                },
            ]
        );
    }

    #[test]
    fn reports_the_offending_line() {
        assert_eq!(
            parse("Q\nQQ"),
            Err(ScriptError::InvalidKey {
                line: 2,
                token: String::from("QQ"),
            })
        );
        assert_eq!(
            parse("Q 10"),
            Err(ScriptError::MissingCoordinate { line: 1 })
        );
        assert_eq!(
            parse("Q 10 y"),
            Err(ScriptError::InvalidNumber {
                line: 1,
                token: String::from("y"),
            })
        );
        assert_eq!(parse("wait"), Err(ScriptError::MissingDelay { line: 1 }));
        assert_eq!(
            parse("Q +5 extra"),
            Err(ScriptError::UnexpectedToken {
                line: 1,
                token: String::from("extra"),
            })
        );
    }
}
