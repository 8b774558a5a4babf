//! Line-oriented terminal front end.

use crate::types::{EngineState, MarkerId};
use std::fmt::Write as _;
use std::str::FromStr;
use thiserror::Error;

/// Onboarding hint shown until dismissed or timed out
pub const ONBOARDING_MESSAGE: &str = "Give the balls a magic touch with a click!";

/// One line of user input
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// `+`
    Increment,
    /// `-`
    Decrement,
    /// `r`
    Reset,
    /// `click <id>`
    Click(MarkerId),
    /// `resize <width> <height>`
    Resize {
        /// New width
        width: f64,
        /// New height
        height: f64,
    },
    /// `dismiss`
    Dismiss,
    /// `state`: print the snapshot as JSON
    Dump,
    /// `quit`
    Quit,
}

/// Error returned for unrecognised input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseCommandError {
    /// Nothing was typed
    #[error("empty command")]
    Empty,
    /// Unknown command word
    #[error("unknown command {0:?} (try +, -, r, click <id>, resize <w> <h>, dismiss, state, quit)")]
    Unknown(String),
    /// Known command, malformed arguments
    #[error("usage: {0}")]
    Usage(&'static str),
}

impl FromStr for Command {
    type Err = ParseCommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Err(ParseCommandError::Empty);
        };
        let args: Vec<&str> = words.collect();

        match (head, args.as_slice()) {
            ("+" | "inc", []) => Ok(Self::Increment),
            ("-" | "dec", []) => Ok(Self::Decrement),
            ("r" | "reset", []) => Ok(Self::Reset),
            ("dismiss", []) => Ok(Self::Dismiss),
            ("state", []) => Ok(Self::Dump),
            ("quit" | "q" | "exit", []) => Ok(Self::Quit),
            ("click", [id]) => id
                .parse()
                .map(|id| Self::Click(MarkerId::new(id)))
                .map_err(|_| ParseCommandError::Usage("click <id>")),
            ("resize", [width, height]) => match (width.parse(), height.parse()) {
                (Ok(width), Ok(height)) => Ok(Self::Resize { width, height }),
                _ => Err(ParseCommandError::Usage("resize <width> <height>")),
            },
            ("click", _) => Err(ParseCommandError::Usage("click <id>")),
            ("resize", _) => Err(ParseCommandError::Usage("resize <width> <height>")),
            ("+" | "inc" | "-" | "dec" | "r" | "reset" | "dismiss" | "state" | "quit" | "q" | "exit", _) => {
                Err(ParseCommandError::Usage("command takes no arguments"))
            },
            (other, _) => Err(ParseCommandError::Unknown(other.to_string())),
        }
    }
}

/// Render a snapshot as text
#[must_use]
pub fn render(state: &EngineState) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "tally: {}  [{}]  viewport {}x{}",
        state.tally,
        if state.can_decrement() { "+ - r" } else { "+ r" },
        state.viewport.width,
        state.viewport.height
    );
    if state.message_visible {
        let _ = writeln!(out, "  {ONBOARDING_MESSAGE}");
    }
    for marker in &state.markers {
        let _ = writeln!(
            out,
            "  #{:<4} {} at ({:.1}, {:.1})  id={}",
            marker.sequence_number, marker.color, marker.position.x, marker.position.y, marker.id
        );
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Color, Marker, Position, Viewport};

    #[test]
    fn test_parse_commands() {
        assert_eq!("+".parse(), Ok(Command::Increment));
        assert_eq!(" - ".parse(), Ok(Command::Decrement));
        assert_eq!("r".parse(), Ok(Command::Reset));
        assert_eq!("click 7".parse(), Ok(Command::Click(MarkerId::new(7))));
        assert_eq!(
            "resize 640 480".parse(),
            Ok(Command::Resize {
                width: 640.0,
                height: 480.0
            })
        );
        assert_eq!("dismiss".parse(), Ok(Command::Dismiss));
        assert_eq!("state".parse(), Ok(Command::Dump));
        assert_eq!("quit".parse(), Ok(Command::Quit));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("".parse::<Command>(), Err(ParseCommandError::Empty));
        assert_eq!(
            "jump".parse::<Command>(),
            Err(ParseCommandError::Unknown("jump".to_string()))
        );
        assert_eq!(
            "click x".parse::<Command>(),
            Err(ParseCommandError::Usage("click <id>"))
        );
        assert_eq!(
            "resize 10".parse::<Command>(),
            Err(ParseCommandError::Usage("resize <width> <height>"))
        );
        assert!("+ 3".parse::<Command>().is_err());
    }

    #[test]
    fn test_render() {
        let mut state = EngineState::new(Viewport::new(320.0, 200.0));
        state.tally = 1;
        state.next_id = 4;
        state.markers.push(Marker {
            id: MarkerId::new(3),
            position: Position::new(12.0, 30.5),
            color: Color::from_rgb(0x0000ff),
            sequence_number: 1,
        });

        let text = render(&state);
        assert!(text.starts_with("tally: 1  [+ - r]  viewport 320x200\n"));
        assert!(text.contains(ONBOARDING_MESSAGE));
        assert!(text.contains("#0000ff at (12.0, 30.5)  id=3"));

        state.message_visible = false;
        assert!(!render(&state).contains(ONBOARDING_MESSAGE));
    }

    #[test]
    fn test_render_empty_hides_decrement() {
        let state = EngineState::new(Viewport::new(10.0, 10.0));
        assert!(render(&state).starts_with("tally: 0  [+ r]"));
    }
}
