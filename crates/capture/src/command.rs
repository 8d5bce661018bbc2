use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr, VariantNames};
use tokio::sync::mpsc;

use crate::error::{CaptureError, Result};

/// Bounded queue depth between the control surface and the capture loop
pub const COMMAND_QUEUE_DEPTH: usize = 8;

/// Requests from the user-facing side to the capture loop.
///
/// The capture loop drains all pending commands before each frame, so a
/// command takes effect no later than the next frame.
#[derive(
    Debug, Clone,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, VariantNames, IntoStaticStr,
    PartialEq, Eq
)]
#[serde(tag = "type", content = "params", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SessionCommand {
    /// Save the next raw frame, optionally under a given name
    #[strum(to_string = "capture_requested", serialize = "capture", serialize = "c")]
    CaptureRequested { name: Option<String> },

    /// Switch shape detection on or off
    #[strum(to_string = "toggle_detection", serialize = "detect", serialize = "d", serialize = "toggle")]
    ToggleDetection,

    /// Stop capturing and release the camera
    #[strum(to_string = "quit", serialize = "q", serialize = "exit")]
    Quit,
}

impl SessionCommand {
    /// Get the JSON schema for all commands
    pub fn schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(SessionCommand)
    }

    /// Get a list of all available command names
    pub fn command_names() -> &'static [&'static str] {
        <Self as VariantNames>::VARIANTS
    }

    /// Get a description of the command
    pub fn description(&self) -> &'static str {
        match self {
            Self::CaptureRequested { .. } => "Save the current frame to the images directory",
            Self::ToggleDetection => "Start or stop drawing detected shapes over the feed",
            Self::Quit => "Release the camera and exit",
        }
    }

    /// Parse one control line.
    ///
    /// Accepts either a JSON object in the tagged wire format, e.g.
    /// `{"type":"capture_requested","params":{"name":"desk"}}`, or a short
    /// text form: `capture [name]`, `detect`, `quit` and their aliases.
    pub fn parse_line(line: &str) -> Result<Option<Self>> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        if line.starts_with('{') {
            return Ok(Some(serde_json::from_str(line)?));
        }

        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };
        let command = Self::from_str(&verb.to_ascii_lowercase())
            .map_err(|_| CaptureError::UnknownCommand(verb.to_string()))?;

        Ok(Some(match command {
            Self::CaptureRequested { .. } => Self::CaptureRequested {
                name: (!rest.is_empty()).then(|| rest.to_string()),
            },
            other => other,
        }))
    }
}

/// Create the bounded command channel shared by a control surface and a session
pub fn command_channel() -> (mpsc::Sender<SessionCommand>, mpsc::Receiver<SessionCommand>) {
    mpsc::channel(COMMAND_QUEUE_DEPTH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_text_commands() {
        assert_eq!(
            SessionCommand::parse_line("capture").expect("parse"),
            Some(SessionCommand::CaptureRequested { name: None })
        );
        assert_eq!(
            SessionCommand::parse_line("  c   my desk  ").expect("parse"),
            Some(SessionCommand::CaptureRequested { name: Some("my desk".to_string()) })
        );
        assert_eq!(SessionCommand::parse_line("D").expect("parse"), Some(SessionCommand::ToggleDetection));
        assert_eq!(SessionCommand::parse_line("toggle").expect("parse"), Some(SessionCommand::ToggleDetection));
        assert_eq!(SessionCommand::parse_line("q").expect("parse"), Some(SessionCommand::Quit));
        assert_eq!(SessionCommand::parse_line("   ").expect("parse"), None);
    }

    #[test]
    fn test_parse_json_commands() {
        let command = SessionCommand::parse_line(r#"{"type":"capture_requested","params":{"name":"desk"}}"#)
            .expect("parse");
        assert_eq!(command, Some(SessionCommand::CaptureRequested { name: Some("desk".to_string()) }));

        let command = SessionCommand::parse_line(r#"{"type":"toggle_detection"}"#).expect("parse");
        assert_eq!(command, Some(SessionCommand::ToggleDetection));
    }

    #[test]
    fn test_unknown_command_is_rejected() {
        assert!(matches!(
            SessionCommand::parse_line("explode now"),
            Err(CaptureError::UnknownCommand(verb)) if verb == "explode"
        ));
        assert!(SessionCommand::parse_line("{not json").is_err());
    }

    #[test]
    fn test_json_round_trip_and_display() {
        let command = SessionCommand::CaptureRequested { name: Some("a".to_string()) };
        let json = serde_json::to_string(&command).expect("serialize");
        assert_eq!(serde_json::from_str::<SessionCommand>(&json).expect("deserialize"), command);
        assert_eq!(SessionCommand::Quit.to_string(), "quit");
        assert_eq!(SessionCommand::command_names().len(), 3);
    }

    #[test]
    fn test_channel_is_bounded() {
        let (tx, _rx) = command_channel();
        for _ in 0..COMMAND_QUEUE_DEPTH {
            tx.try_send(SessionCommand::ToggleDetection).expect("room in queue");
        }
        assert!(tx.try_send(SessionCommand::Quit).is_err());
    }
}
