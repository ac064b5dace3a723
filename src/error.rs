use std::error;
use std::fmt::{self, Display, Formatter};

use crate::bridge::BridgePhase;
use crate::registry::EventType;

/// Errors surfaced by the connect protocol.
#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
	/// The decision for this connection was already sent.
	AlreadyReplied,
	/// The client has no port bound yet, which is the case for every
	/// connect-phase client.
	NotConnected,
	/// A listener failed; the remaining listeners of this dispatch were
	/// skipped.
	Listener {
		/// Event being dispatched.
		event_type: EventType,
		/// Registration index of the failing listener.
		index: usize,
		/// The listener's error.
		source: Box<dyn error::Error>,
	},
	/// The host failed to deliver a message.
	Post(Box<dyn error::Error>),
	/// The bridge received input its current phase doesn't accept.
	UnexpectedPhase(BridgePhase),
	/// Rejected by [`ServiceBuilder::build()`](crate::ServiceBuilder::build).
	InvalidConfig(&'static str),
	/// The current global can't host the emulation.
	Unsupported(&'static str),
}

impl Display for Error {
	fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Self::AlreadyReplied => formatter.write_str("connection decision was already sent"),
			Self::NotConnected => formatter.write_str("client has no connected port"),
			Self::Listener {
				event_type,
				index,
				source,
			} => write!(formatter, "`{event_type}` listener #{index} failed: {source}"),
			Self::Post(source) => write!(formatter, "failed to post message: {source}"),
			Self::UnexpectedPhase(phase) => {
				write!(formatter, "bridge can't handle this input while {phase}")
			}
			Self::InvalidConfig(reason) => write!(formatter, "invalid configuration: {reason}"),
			Self::Unsupported(reason) => write!(formatter, "unsupported environment: {reason}"),
		}
	}
}

impl error::Error for Error {
	fn source(&self) -> Option<&(dyn error::Error + 'static)> {
		match self {
			Self::Listener { source, .. } | Self::Post(source) => Some(source.as_ref()),
			_ => None,
		}
	}
}
