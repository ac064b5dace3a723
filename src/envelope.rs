//! Inbound envelopes multiplexed over the worker's `message` events.

use crate::port::Port;

/// Which tag an envelope carries.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum EnvelopeKind {
	/// Carries [`Config::connect_tag()`](crate::Config::connect_tag).
	Connect,
	/// Carries [`Config::message_tag()`](crate::Config::message_tag).
	Message,
}

/// `{<connect-tag>: url, origin, port}`.
#[derive(Debug)]
pub struct ConnectEnvelope<P> {
	/// URL of the bridge document, usually still carrying the suffix.
	pub target_url: String,
	/// Origin of the page asking to connect.
	pub origin: String,
	/// Port the decision is sent back on.
	pub port: P,
}

/// `{<message-tag>: url, origin, data, port}`.
#[derive(Debug)]
pub struct MessageEnvelope<P: Port> {
	/// URL of the bridge document.
	pub target_url: String,
	/// Origin of the connected page.
	pub origin: String,
	/// Payload posted by the connected page.
	pub data: P::Value,
	/// Port replies are sent back on.
	pub port: P,
	/// Every port transferred with the envelope. May or may not include
	/// [`port`](Self::port).
	pub ports: Vec<P>,
}

/// Either kind of envelope.
#[derive(Debug)]
pub enum Envelope<P: Port> {
	/// See [`ConnectEnvelope`].
	Connect(ConnectEnvelope<P>),
	/// See [`MessageEnvelope`].
	Message(MessageEnvelope<P>),
}

impl<P: Port> Envelope<P> {
	/// Returns the tag this envelope is sent under.
	#[must_use]
	pub const fn kind(&self) -> EnvelopeKind {
		match self {
			Self::Connect(_) => EnvelopeKind::Connect,
			Self::Message(_) => EnvelopeKind::Message,
		}
	}

	/// Origin of the sending page.
	#[must_use]
	pub fn origin(&self) -> &str {
		match self {
			Self::Connect(envelope) => &envelope.origin,
			Self::Message(envelope) => &envelope.origin,
		}
	}
}
