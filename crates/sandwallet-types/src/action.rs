//! Action vocabulary with type-safe base names.
//!
//! Every base action `T` exists in exactly three shapes: the request `T`,
//! the result `T_SUCCESS` and the failure `T_ERROR`. On the wire an action is
//! `{"type": "<NAME>", "payload": <payload>}` with `payload` omitted when the
//! variant carries none. Type names outside the vocabulary decode to
//! [`Action::Unknown`], which every consumer treats as a no-op.

use crate::error::{ErrorPayload, WireError};
use crate::model::{Account, Token};
use serde::de::DeserializeOwned;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::str::FromStr;
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// Base action names.
#[derive(
    Debug,
    Clone,
    Copy,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
)]
pub enum ActionKind {
    /// Open a connection to a cluster
    #[strum(serialize = "CONNECT")]
    #[serde(rename = "CONNECT")]
    Connect,

    /// Generate or restore the wallet keypair
    #[strum(serialize = "ACCOUNT_GET")]
    #[serde(rename = "ACCOUNT_GET")]
    AccountGet,

    /// Enumerate the wallet's token accounts
    #[strum(serialize = "TOKEN_LIST")]
    #[serde(rename = "TOKEN_LIST")]
    TokenList,

    /// Create a mint and mint a balance to the wallet
    #[strum(serialize = "TOKEN_ADD")]
    #[serde(rename = "TOKEN_ADD")]
    TokenAdd,
}

/// State slice a base action drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Slice {
    Connection,
    Account,
    TokenList,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }

    /// Slice whose loading/success/error fields this base action owns.
    /// `TOKEN_LIST` and `TOKEN_ADD` share the token list slice.
    pub fn slice(&self) -> Slice {
        match self {
            ActionKind::Connect => Slice::Connection,
            ActionKind::AccountGet => Slice::Account,
            ActionKind::TokenList | ActionKind::TokenAdd => Slice::TokenList,
        }
    }
}

/// Which of the three shapes an action is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Phase {
    Request,
    Success,
    Error,
}

impl Phase {
    pub fn suffix(&self) -> &'static str {
        match self {
            Phase::Request => "",
            Phase::Success => "_SUCCESS",
            Phase::Error => "_ERROR",
        }
    }
}

/// Payload of `CONNECT`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectRequest {
    /// Cluster moniker (`devnet`, `testnet`, `mainnet-beta`, `localnet`) or RPC URL
    pub cluster: String,
}

impl ConnectRequest {
    pub fn new(cluster: impl Into<String>) -> Self {
        Self {
            cluster: cluster.into(),
        }
    }
}

/// Payload of `ACCOUNT_GET`. Both fields absent means "generate a new keypair".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
}

/// Every message that flows through the reducer and across the bridge.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawAction")]
pub enum Action {
    Connect(ConnectRequest),
    ConnectSuccess,
    ConnectError(ErrorPayload),

    AccountGet(AccountRequest),
    AccountGetSuccess(Account),
    AccountGetError(ErrorPayload),

    TokenList,
    TokenListSuccess(Vec<Token>),
    TokenListError(ErrorPayload),

    TokenAdd,
    TokenAddSuccess(Token),
    TokenAddError(ErrorPayload),

    /// A type name outside the vocabulary, kept verbatim
    Unknown {
        type_name: String,
        payload: Option<Value>,
    },
}

impl Action {
    /// Base name, `None` for unknown actions.
    pub fn kind(&self) -> Option<ActionKind> {
        Some(match self {
            Action::Connect(_) | Action::ConnectSuccess | Action::ConnectError(_) => {
                ActionKind::Connect
            }
            Action::AccountGet(_) | Action::AccountGetSuccess(_) | Action::AccountGetError(_) => {
                ActionKind::AccountGet
            }
            Action::TokenList | Action::TokenListSuccess(_) | Action::TokenListError(_) => {
                ActionKind::TokenList
            }
            Action::TokenAdd | Action::TokenAddSuccess(_) | Action::TokenAddError(_) => {
                ActionKind::TokenAdd
            }
            Action::Unknown { .. } => return None,
        })
    }

    /// Shape of the action, `None` for unknown actions.
    pub fn phase(&self) -> Option<Phase> {
        Some(match self {
            Action::Connect(_) | Action::AccountGet(_) | Action::TokenList | Action::TokenAdd => {
                Phase::Request
            }
            Action::ConnectSuccess
            | Action::AccountGetSuccess(_)
            | Action::TokenListSuccess(_)
            | Action::TokenAddSuccess(_) => Phase::Success,
            Action::ConnectError(_)
            | Action::AccountGetError(_)
            | Action::TokenListError(_)
            | Action::TokenAddError(_) => Phase::Error,
            Action::Unknown { .. } => return None,
        })
    }

    pub fn is_request(&self) -> bool {
        self.phase() == Some(Phase::Request)
    }

    /// Wire type name, e.g. `ACCOUNT_GET_SUCCESS`.
    pub fn type_name(&self) -> String {
        if let Action::Unknown { type_name, .. } = self {
            return type_name.clone();
        }
        match (self.kind(), self.phase()) {
            (Some(kind), Some(phase)) => format!("{}{}", kind.as_str(), phase.suffix()),
            _ => String::new(),
        }
    }

    /// The `_ERROR` variant of a base action.
    pub fn failure(kind: ActionKind, payload: ErrorPayload) -> Self {
        match kind {
            ActionKind::Connect => Action::ConnectError(payload),
            ActionKind::AccountGet => Action::AccountGetError(payload),
            ActionKind::TokenList => Action::TokenListError(payload),
            ActionKind::TokenAdd => Action::TokenAddError(payload),
        }
    }

    pub fn connect(cluster: impl Into<String>) -> Self {
        Action::Connect(ConnectRequest::new(cluster))
    }

    pub fn error_payload(&self) -> Option<&ErrorPayload> {
        match self {
            Action::ConnectError(payload)
            | Action::AccountGetError(payload)
            | Action::TokenListError(payload)
            | Action::TokenAddError(payload) => Some(payload),
            _ => None,
        }
    }
}

/// Split a wire type name into its base name and phase.
pub fn parse_type_name(type_name: &str) -> Option<(ActionKind, Phase)> {
    let (base, phase) = if let Some(base) = type_name.strip_suffix(Phase::Success.suffix()) {
        (base, Phase::Success)
    } else if let Some(base) = type_name.strip_suffix(Phase::Error.suffix()) {
        (base, Phase::Error)
    } else {
        (type_name, Phase::Request)
    };
    ActionKind::from_str(base).ok().map(|kind| (kind, phase))
}

impl Serialize for Action {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut out = serializer.serialize_struct("Action", 2)?;
        out.serialize_field("type", &self.type_name())?;
        match self {
            Action::Connect(payload) => out.serialize_field("payload", payload)?,
            Action::AccountGet(payload) => out.serialize_field("payload", payload)?,
            Action::AccountGetSuccess(payload) => out.serialize_field("payload", payload)?,
            Action::TokenListSuccess(payload) => out.serialize_field("payload", payload)?,
            Action::TokenAddSuccess(payload) => out.serialize_field("payload", payload)?,
            Action::ConnectError(payload)
            | Action::AccountGetError(payload)
            | Action::TokenListError(payload)
            | Action::TokenAddError(payload) => out.serialize_field("payload", payload)?,
            Action::Unknown {
                payload: Some(payload),
                ..
            } => out.serialize_field("payload", payload)?,
            Action::ConnectSuccess
            | Action::TokenList
            | Action::TokenAdd
            | Action::Unknown { payload: None, .. } => {}
        }
        out.end()
    }
}

/// Loosely typed wire form, decoded into [`Action`] by name.
#[derive(Debug, Clone, Deserialize)]
pub struct RawAction {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default, deserialize_with = "present")]
    pub payload: Option<Value>,
}

/// An explicit `"payload": null` is kept as `Some(Value::Null)`; only an
/// absent field decodes to `None`.
fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

fn required<T: DeserializeOwned>(type_name: &str, payload: Option<Value>) -> Result<T, WireError> {
    let payload = payload.ok_or_else(|| WireError::MissingPayload {
        action: type_name.to_string(),
    })?;
    decode(type_name, payload)
}

fn optional<T: DeserializeOwned + Default>(
    type_name: &str,
    payload: Option<Value>,
) -> Result<T, WireError> {
    match payload {
        Some(payload) => decode(type_name, payload),
        None => Ok(T::default()),
    }
}

fn decode<T: DeserializeOwned>(type_name: &str, payload: Value) -> Result<T, WireError> {
    serde_json::from_value(payload).map_err(|e| WireError::InvalidPayload {
        action: type_name.to_string(),
        message: e.to_string(),
    })
}

impl TryFrom<RawAction> for Action {
    type Error = WireError;

    fn try_from(raw: RawAction) -> Result<Self, Self::Error> {
        let RawAction { type_name, payload } = raw;
        let Some((kind, phase)) = parse_type_name(&type_name) else {
            return Ok(Action::Unknown { type_name, payload });
        };
        let payload = payload.filter(|payload| !payload.is_null());
        let name = type_name.as_str();
        Ok(match (kind, phase) {
            (_, Phase::Error) => Action::failure(kind, required(name, payload)?),
            (ActionKind::Connect, Phase::Request) => Action::Connect(required(name, payload)?),
            (ActionKind::Connect, Phase::Success) => Action::ConnectSuccess,
            (ActionKind::AccountGet, Phase::Request) => {
                Action::AccountGet(optional(name, payload)?)
            }
            (ActionKind::AccountGet, Phase::Success) => {
                Action::AccountGetSuccess(required(name, payload)?)
            }
            (ActionKind::TokenList, Phase::Request) => Action::TokenList,
            (ActionKind::TokenList, Phase::Success) => {
                Action::TokenListSuccess(optional(name, payload)?)
            }
            (ActionKind::TokenAdd, Phase::Request) => Action::TokenAdd,
            (ActionKind::TokenAdd, Phase::Success) => {
                Action::TokenAddSuccess(required(name, payload)?)
            }
        })
    }
}
