//! Server error codes and their classification.
//!
//! Codes travel as strings (`"ROOM_FULL"`). Codes this client doesn't know
//! are kept verbatim in [`ErrorCode::Other`] so nothing is lost when a
//! payload is re-encoded.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Broad family an [`ErrorCode`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Disconnects, timeouts, unparseable frames.
    Connection,
    /// Room lookup and capacity problems.
    Room,
    /// Rule violations reported by the server.
    Game,
    /// Malformed or incomplete payloads.
    Validation,
    /// Internal server faults and anything unrecognised.
    System,
}

/// An error code reported by the server in an `error` side-channel frame.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ErrorCode {
    ConnDisconnected,
    ConnTimeout,
    ConnInvalidMessage,
    RoomNotFound,
    RoomFull,
    RoomClosed,
    GameInvalidMove,
    GameNotYourTurn,
    GameInvalidState,
    ValidInvalidPayload,
    ValidMissingField,
    SysInternalError,
    SysUnknownError,
    /// A code this client doesn't recognise, preserved as sent.
    Other(String),
}

impl ErrorCode {
    /// The wire representation of this code.
    pub fn as_str(&self) -> &str {
        match self {
            Self::ConnDisconnected => "CONN_DISCONNECTED",
            Self::ConnTimeout => "CONN_TIMEOUT",
            Self::ConnInvalidMessage => "CONN_INVALID_MESSAGE",
            Self::RoomNotFound => "ROOM_NOT_FOUND",
            Self::RoomFull => "ROOM_FULL",
            Self::RoomClosed => "ROOM_CLOSED",
            Self::GameInvalidMove => "GAME_INVALID_MOVE",
            Self::GameNotYourTurn => "GAME_NOT_YOUR_TURN",
            Self::GameInvalidState => "GAME_INVALID_STATE",
            Self::ValidInvalidPayload => "VALID_INVALID_PAYLOAD",
            Self::ValidMissingField => "VALID_MISSING_FIELD",
            Self::SysInternalError => "SYS_INTERNAL_ERROR",
            Self::SysUnknownError => "SYS_UNKNOWN_ERROR",
            Self::Other(code) => code,
        }
    }

    /// Which family this code belongs to. Unknown codes count as system
    /// errors.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConnDisconnected
            | Self::ConnTimeout
            | Self::ConnInvalidMessage => ErrorCategory::Connection,
            Self::RoomNotFound | Self::RoomFull | Self::RoomClosed => {
                ErrorCategory::Room
            }
            Self::GameInvalidMove
            | Self::GameNotYourTurn
            | Self::GameInvalidState => ErrorCategory::Game,
            Self::ValidInvalidPayload | Self::ValidMissingField => {
                ErrorCategory::Validation
            }
            Self::SysInternalError | Self::SysUnknownError | Self::Other(_) => {
                ErrorCategory::System
            }
        }
    }

    /// The message shown to the player for this code.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::ConnDisconnected => "The connection was lost.",
            Self::ConnTimeout => "The connection timed out.",
            Self::ConnInvalidMessage => "Received an invalid message.",
            Self::RoomNotFound => "The room could not be found.",
            Self::RoomFull => "The room is full.",
            Self::RoomClosed => "The room has been closed.",
            Self::GameInvalidMove => "That move is not allowed.",
            Self::GameNotYourTurn => "It is not your turn.",
            Self::GameInvalidState => "The game is in an invalid state.",
            Self::ValidInvalidPayload => "The data sent was invalid.",
            Self::ValidMissingField => "A required field is missing.",
            Self::SysInternalError => "A server error occurred.",
            Self::SysUnknownError | Self::Other(_) => "An error occurred.",
        }
    }
}

impl From<String> for ErrorCode {
    fn from(code: String) -> Self {
        match code.as_str() {
            "CONN_DISCONNECTED" => Self::ConnDisconnected,
            "CONN_TIMEOUT" => Self::ConnTimeout,
            "CONN_INVALID_MESSAGE" => Self::ConnInvalidMessage,
            "ROOM_NOT_FOUND" => Self::RoomNotFound,
            "ROOM_FULL" => Self::RoomFull,
            "ROOM_CLOSED" => Self::RoomClosed,
            "GAME_INVALID_MOVE" => Self::GameInvalidMove,
            "GAME_NOT_YOUR_TURN" => Self::GameNotYourTurn,
            "GAME_INVALID_STATE" => Self::GameInvalidState,
            "VALID_INVALID_PAYLOAD" => Self::ValidInvalidPayload,
            "VALID_MISSING_FIELD" => Self::ValidMissingField,
            "SYS_INTERNAL_ERROR" => Self::SysInternalError,
            "SYS_UNKNOWN_ERROR" => Self::SysUnknownError,
            _ => Self::Other(code),
        }
    }
}

impl From<ErrorCode> for String {
    fn from(code: ErrorCode) -> Self {
        match code {
            ErrorCode::Other(code) => code,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
