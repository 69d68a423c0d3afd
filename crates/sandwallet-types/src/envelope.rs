//! What actually crosses the host/sandbox boundary.
//!
//! Sandbox to host: one JSON envelope per message, either
//! `{"action": <Action>, "seq"?: n, "epoch"?: n}` or
//! `{"console": {"log"?: [..], "error"?: [..], "group"?: [..], "groupEnd"?: [..]}}`.
//!
//! Host to sandbox: an executable statement invoking the sandbox entry point,
//! `window.sandbox.dispatch(<Action JSON>, {"seq": n});`.

use crate::action::Action;
use crate::error::WireError;
use sandwallet_constants::dispatch_statement_prefix;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Console output relayed from the sandbox for developer visibility only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsoleMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<Vec<Value>>,
    #[serde(
        rename = "groupEnd",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub group_end: Option<Vec<Value>>,
}

/// Console method a relayed entry was written with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleLevel {
    Group,
    Log,
    Error,
    GroupEnd,
}

impl ConsoleMessage {
    pub fn log(args: Vec<Value>) -> Self {
        Self {
            log: Some(args),
            ..Self::default()
        }
    }

    pub fn error(args: Vec<Value>) -> Self {
        Self {
            error: Some(args),
            ..Self::default()
        }
    }

    pub fn group(label: impl Into<String>) -> Self {
        Self {
            group: Some(vec![Value::String(label.into())]),
            ..Self::default()
        }
    }

    /// Closes the group opened with the same `label`. Handlers run
    /// concurrently, so the label is what pairs the two ends.
    pub fn group_end(label: impl Into<String>) -> Self {
        Self {
            group_end: Some(vec![Value::String(label.into())]),
            ..Self::default()
        }
    }

    /// Entries in replay order: group opens first, group end closes last.
    pub fn entries(&self) -> Vec<(ConsoleLevel, &[Value])> {
        [
            (ConsoleLevel::Group, &self.group),
            (ConsoleLevel::Log, &self.log),
            (ConsoleLevel::Error, &self.error),
            (ConsoleLevel::GroupEnd, &self.group_end),
        ]
        .into_iter()
        .filter_map(|(level, args)| args.as_deref().map(|args| (level, args)))
        .collect()
    }
}

/// An action posted by the sandbox.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionEnvelope {
    pub action: Action,
    /// Sandbox outbound sequence number
    pub seq: Option<u64>,
    /// Host sequence number of the request this action answers
    pub epoch: Option<u64>,
}

impl ActionEnvelope {
    pub fn bare(action: Action) -> Self {
        Self {
            action,
            seq: None,
            epoch: None,
        }
    }
}

/// A single sandbox-to-host message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawEnvelope", into = "RawEnvelope")]
pub enum SandboxMessage {
    Action(ActionEnvelope),
    Console(ConsoleMessage),
}

impl SandboxMessage {
    pub fn to_json(&self) -> Result<String, WireError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(raw: &str) -> Result<Self, WireError> {
        Ok(serde_json::from_str(raw)?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    action: Option<Action>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    console: Option<ConsoleMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    seq: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    epoch: Option<u64>,
}

impl TryFrom<RawEnvelope> for SandboxMessage {
    type Error = WireError;

    fn try_from(raw: RawEnvelope) -> Result<Self, Self::Error> {
        match (raw.action, raw.console) {
            (Some(action), _) => Ok(SandboxMessage::Action(ActionEnvelope {
                action,
                seq: raw.seq,
                epoch: raw.epoch,
            })),
            (None, Some(console)) => Ok(SandboxMessage::Console(console)),
            (None, None) => Err(WireError::EmptyEnvelope),
        }
    }
}

impl From<SandboxMessage> for RawEnvelope {
    fn from(message: SandboxMessage) -> Self {
        match message {
            SandboxMessage::Action(envelope) => RawEnvelope {
                action: Some(envelope.action),
                console: None,
                seq: envelope.seq,
                epoch: envelope.epoch,
            },
            SandboxMessage::Console(console) => RawEnvelope {
                action: None,
                console: Some(console),
                seq: None,
                epoch: None,
            },
        }
    }
}

/// Ordering metadata the host attaches to every statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchMeta {
    pub seq: u64,
}

/// A host-to-sandbox dispatch statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub action: Action,
    pub meta: Option<DispatchMeta>,
}

impl Statement {
    pub fn new(action: Action, seq: u64) -> Self {
        Self {
            action,
            meta: Some(DispatchMeta { seq }),
        }
    }

    /// Render as executable source for the sandbox.
    pub fn render(&self) -> Result<String, WireError> {
        let prefix = dispatch_statement_prefix();
        let action = serde_json::to_string(&self.action)?;
        Ok(match &self.meta {
            Some(meta) => format!("{prefix}{action}, {});", serde_json::to_string(meta)?),
            None => format!("{prefix}{action});"),
        })
    }

    /// Parse a statement produced by [`Statement::render`]; the metadata
    /// argument is optional.
    pub fn parse(source: &str) -> Result<Self, WireError> {
        let prefix = dispatch_statement_prefix();
        let trimmed = source.trim();
        let inner = trimmed
            .strip_prefix(prefix.as_str())
            .and_then(|rest| rest.trim_end_matches(';').trim_end().strip_suffix(')'))
            .ok_or_else(|| WireError::NotADispatchStatement(trimmed.chars().take(64).collect()))?;

        let mut args: Vec<Value> = serde_json::from_str(&format!("[{inner}]"))?;
        let meta = match args.len() {
            1 => None,
            2 => args.pop().map(serde_json::from_value).transpose()?,
            n => return Err(WireError::BadArity(n)),
        };
        let action = args
            .pop()
            .map(serde_json::from_value)
            .transpose()?
            .ok_or(WireError::BadArity(0))?;
        Ok(Self { action, meta })
    }
}

/// Tracks one direction's sequence numbers to detect dropped messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SequenceTracker {
    last: Option<u64>,
}

impl SequenceTracker {
    /// Record `seq`; returns how many messages were skipped since the last
    /// one seen, if any. Out-of-order or repeated numbers are not gaps.
    pub fn observe(&mut self, seq: u64) -> Option<u64> {
        let gap = match self.last {
            Some(last) if seq > last + 1 => Some(seq - last - 1),
            _ => None,
        };
        self.last = Some(self.last.map_or(seq, |last| last.max(seq)));
        gap
    }

    pub fn last(&self) -> Option<u64> {
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_console_entries_in_replay_order() {
        let message = ConsoleMessage {
            log: Some(vec![json!("b")]),
            group: Some(vec![json!("a")]),
            group_end: Some(vec![]),
            error: None,
        };
        let levels: Vec<_> = message.entries().into_iter().map(|(l, _)| l).collect();
        assert_eq!(
            levels,
            vec![ConsoleLevel::Group, ConsoleLevel::Log, ConsoleLevel::GroupEnd]
        );
    }

    #[test]
    fn test_console_group_end_wire_name() {
        let message = SandboxMessage::Console(ConsoleMessage::group_end("CONNECT #1"));
        let json = serde_json::to_value(message).unwrap();
        assert_eq!(json, json!({ "console": { "groupEnd": ["CONNECT #1"] } }));
    }

    #[test]
    fn test_action_envelope_without_ordering_fields() {
        let message = SandboxMessage::from_json(r#"{"action":{"type":"CONNECT_SUCCESS"}}"#).unwrap();
        assert_eq!(
            message,
            SandboxMessage::Action(ActionEnvelope::bare(Action::ConnectSuccess))
        );
    }

    #[test]
    fn test_empty_envelope_rejected() {
        assert!(SandboxMessage::from_json("{}").is_err());
    }

    #[test]
    fn test_statement_render() {
        let statement = Statement::new(Action::TokenList, 7);
        assert_eq!(
            statement.render().unwrap(),
            r#"window.sandbox.dispatch({"type":"TOKEN_LIST"}, {"seq":7});"#
        );
    }

    #[test]
    fn test_statement_parse_without_meta() {
        let statement =
            Statement::parse(r#"window.sandbox.dispatch({"type":"TOKEN_ADD"})"#).unwrap();
        assert_eq!(statement.action, Action::TokenAdd);
        assert_eq!(statement.meta, None);
    }

    #[test]
    fn test_statement_parse_rejects_foreign_code() {
        let err = Statement::parse("alert('hi')").unwrap_err();
        assert!(matches!(err, WireError::NotADispatchStatement(_)));

        let err = Statement::parse("window.sandbox.dispatch(1, 2, 3);").unwrap_err();
        assert!(matches!(err, WireError::BadArity(3)));
    }

    #[test]
    fn test_sequence_tracker_reports_gaps() {
        let mut tracker = SequenceTracker::default();
        assert_eq!(tracker.observe(1), None);
        assert_eq!(tracker.observe(2), None);
        assert_eq!(tracker.observe(5), Some(2));
        assert_eq!(tracker.observe(3), None);
        assert_eq!(tracker.last(), Some(5));
    }
}
