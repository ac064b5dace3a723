//! Event records handed to listeners.
//!
//! These are plain data records, not host events.

use std::mem;

use crate::port::Port;
use crate::Error;

/// Worker-side handle of a remote page.
#[derive(Clone, Debug, PartialEq)]
pub struct Client<P> {
	/// See [`Client::origin()`].
	origin: String,
	/// See [`Client::target_url()`].
	target_url: String,
	/// Bound for message-phase clients only.
	port: Option<P>,
}

impl<P: Port> Client<P> {
	/// Creates a [`Client`].
	pub(crate) const fn new(origin: String, target_url: String, port: Option<P>) -> Self {
		Self {
			origin,
			target_url,
			port,
		}
	}

	/// Origin of the remote page.
	#[must_use]
	pub fn origin(&self) -> &str {
		&self.origin
	}

	/// URL the page connected to, without the bootstrap suffix.
	#[must_use]
	pub fn target_url(&self) -> &str {
		&self.target_url
	}

	/// Port bound to this client, if any.
	#[must_use]
	pub const fn port(&self) -> Option<&P> {
		self.port.as_ref()
	}

	/// Sends `data` back to the remote page.
	///
	/// # Errors
	///
	/// - [`Error::NotConnected`] for connect-phase clients.
	/// - [`Error::Post`] if the host fails to deliver the message.
	pub fn post_message(&self, data: P::Value, transfer: Vec<P>) -> Result<(), Error> {
		self.port
			.as_ref()
			.ok_or(Error::NotConnected)?
			.post_message(data, transfer)
	}
}

/// A page asks to connect.
///
/// Listeners decide with [`ConnectEvent::accept_connection()`]. If nobody
/// decides, the connection is rejected after dispatch.
#[derive(Debug)]
pub struct ConnectEvent<P> {
	/// See [`ConnectEvent::client()`].
	client: Client<P>,
	/// Taken by the first decision.
	reply: Option<P>,
	/// See [`ConnectEvent::accepted()`].
	accepted: bool,
}

impl<P: Port> ConnectEvent<P> {
	/// Creates a [`ConnectEvent`] awaiting a decision.
	pub(crate) const fn new(client: Client<P>, reply: P) -> Self {
		Self {
			client,
			reply: Some(reply),
			accepted: false,
		}
	}

	/// The page asking to connect. Its port is never bound.
	#[must_use]
	pub const fn client(&self) -> &Client<P> {
		&self.client
	}

	/// Sends the decision for this connection.
	///
	/// # Errors
	///
	/// - [`Error::AlreadyReplied`] if a decision was already sent; nothing is
	///   posted then.
	/// - [`Error::Post`] if the host fails to deliver the decision.
	pub fn accept_connection(&mut self, accept: bool) -> Result<(), Error> {
		let port = self.reply.take().ok_or(Error::AlreadyReplied)?;
		self.accepted = accept;
		port.post_connect_result(accept)
	}

	/// Returns `true` once a decision was sent.
	#[must_use]
	pub const fn has_replied(&self) -> bool {
		self.reply.is_none()
	}

	/// The decision sent so far, `false` if none.
	#[must_use]
	pub const fn accepted(&self) -> bool {
		self.accepted
	}

	/// Port the decision will be sent on, until it is.
	#[cfg(all(target_family = "wasm", target_os = "unknown"))]
	pub(crate) const fn reply_port(&self) -> Option<&P> {
		self.reply.as_ref()
	}

	/// Records a decision that was posted on a clone of the reply port.
	#[cfg(all(target_family = "wasm", target_os = "unknown"))]
	pub(crate) fn record_reply(&mut self, accepted: bool) {
		self.reply = None;
		self.accepted = accepted;
	}
}

/// A connected page sent a message.
#[derive(Debug)]
pub struct MessageEvent<P: Port> {
	/// See [`MessageEvent::data()`].
	data: P::Value,
	/// See [`MessageEvent::ports()`].
	ports: Vec<P>,
	/// See [`MessageEvent::source()`].
	source: Client<P>,
}

impl<P: Port> MessageEvent<P> {
	/// Creates a [`MessageEvent`].
	pub(crate) const fn new(data: P::Value, ports: Vec<P>, source: Client<P>) -> Self {
		Self {
			data,
			ports,
			source,
		}
	}

	/// Payload posted by the page.
	#[must_use]
	pub const fn data(&self) -> &P::Value {
		&self.data
	}

	/// Ports transferred with the message, not including the reply port.
	#[must_use]
	pub fn ports(&self) -> &[P] {
		&self.ports
	}

	/// Takes the transferred ports, leaving none for later listeners.
	pub fn take_ports(&mut self) -> Vec<P> {
		mem::take(&mut self.ports)
	}

	/// The sending page. Replies posted here reach it.
	#[must_use]
	pub const fn source(&self) -> &Client<P> {
		&self.source
	}
}
