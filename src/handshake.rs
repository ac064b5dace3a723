//! Worker side of the connect phase.
//!
//! A [`Handshake`] moves through [`HandshakeState::Idle`],
//! [`HandshakeState::AwaitingReply`] and [`HandshakeState::Resolved`]. Once
//! resolved, exactly one `{connectResult}` reply was posted: either the
//! decision of a listener or the default rejection.

use crate::config::Config;
use crate::envelope::ConnectEnvelope;
use crate::event::{Client, ConnectEvent};
use crate::port::Port;
use crate::registry::Registry;
use crate::Error;

/// Where a [`Handshake`] is.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HandshakeState {
	/// The request was received but not dispatched yet.
	Idle,
	/// Listeners are deciding.
	AwaitingReply,
	/// The decision was sent.
	Resolved(Resolution),
}

/// Outcome of a [`Handshake`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Resolution {
	/// The decision the page received.
	pub accepted: bool,
	/// `true` if no listener decided and the connection was rejected by
	/// default.
	pub by_fallback: bool,
}

/// One connect request being decided.
#[derive(Debug)]
pub struct Handshake<P: Port> {
	/// The record handed to listeners.
	event: ConnectEvent<P>,
	/// See [`Handshake::state()`].
	state: HandshakeState,
}

impl<P: Port> Handshake<P> {
	/// Creates an idle [`Handshake`] for `envelope`, stripping the bootstrap
	/// suffix from the target URL.
	#[must_use]
	pub fn new(config: &Config, envelope: ConnectEnvelope<P>) -> Self {
		let ConnectEnvelope {
			target_url,
			origin,
			port,
		} = envelope;
		let target_url = config.strip_suffix(&target_url).to_owned();
		let client = Client::new(origin, target_url, None);

		Self {
			event: ConnectEvent::new(client, port),
			state: HandshakeState::Idle,
		}
	}

	/// Current state.
	#[must_use]
	pub const fn state(&self) -> HandshakeState {
		self.state
	}

	/// The record listeners receive.
	#[must_use]
	pub const fn event(&self) -> &ConnectEvent<P> {
		&self.event
	}

	/// Hands the request to every `crossoriginconnect` listener. Does nothing
	/// unless [`HandshakeState::Idle`].
	///
	/// # Errors
	///
	/// [`Error::Listener`] if a listener failed. The handshake still needs to
	/// be resolved.
	pub fn dispatch(&mut self, registry: &Registry<P>) -> Result<(), Error> {
		if self.state != HandshakeState::Idle {
			return Ok(());
		}

		self.state = HandshakeState::AwaitingReply;
		registry.dispatch_connect(&mut self.event)
	}

	/// Rejects the connection unless a listener already decided.
	///
	/// Resolving again returns the first [`Resolution`] without posting.
	///
	/// # Errors
	///
	/// [`Error::Post`] if the default rejection couldn't be delivered.
	pub fn resolve(&mut self) -> Result<Resolution, Error> {
		if let HandshakeState::Resolved(resolution) = self.state {
			return Ok(resolution);
		}

		let by_fallback = !self.event.has_replied();

		if by_fallback {
			self.event.accept_connection(false)?;
		}

		let resolution = Resolution {
			accepted: self.event.accepted(),
			by_fallback,
		};
		self.state = HandshakeState::Resolved(resolution);

		tracing::debug!(
			origin = self.event.client().origin(),
			target_url = self.event.client().target_url(),
			accepted = resolution.accepted,
			by_fallback,
			"connect handshake resolved"
		);

		Ok(resolution)
	}
}

/// Runs a full handshake for `envelope`.
///
/// The request is resolved even if a listener fails, so the page always gets
/// a reply. The listener's error is returned after that.
pub(crate) fn run<P: Port>(
	config: &Config,
	registry: &Registry<P>,
	envelope: ConnectEnvelope<P>,
) -> Result<Resolution, Error> {
	let mut handshake = Handshake::new(config, envelope);
	let dispatched = handshake.dispatch(registry);
	let resolution = handshake.resolve()?;

	dispatched.map(|()| resolution)
}
