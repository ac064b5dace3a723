//! Page side of one connection, as a state machine.

use std::fmt::{self, Display, Formatter};

use crate::envelope::{ConnectEnvelope, Envelope, MessageEnvelope};
use crate::port::{BridgeHost, Port};
use crate::Error;

/// Phase of a [`BridgeClient`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum BridgePhase {
	/// No connect request received yet.
	Idle,
	/// Waiting for the worker's `{connectResult}`.
	AwaitingServiceReply,
	/// Handed the client port to the page, nothing relayed yet.
	Connected,
	/// At least one message was relayed to the worker.
	RelayingMessage,
	/// The worker rejected the connection.
	Rejected,
}

impl Display for BridgePhase {
	fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
		formatter.write_str(match self {
			Self::Idle => "idle",
			Self::AwaitingServiceReply => "awaiting the service reply",
			Self::Connected => "connected",
			Self::RelayingMessage => "relaying messages",
			Self::Rejected => "rejected",
		})
	}
}

/// State of a [`BridgeClient`], with the ports each phase owns.
#[derive(Debug)]
enum State<P> {
	/// See [`BridgePhase::Idle`].
	Idle,
	/// See [`BridgePhase::AwaitingServiceReply`].
	AwaitingServiceReply {
		/// Origin of the page that asked to connect.
		origin: String,
		/// Port of the page that asked to connect.
		requester: P,
		/// Port the worker replies on.
		service: P,
	},
	/// See [`BridgePhase::Connected`] and [`BridgePhase::RelayingMessage`].
	Connected {
		/// Origin of the connected page.
		origin: String,
		/// Our end of the channel handed to the page.
		client: P,
		/// Number of messages relayed so far.
		relays: usize,
	},
	/// See [`BridgePhase::Rejected`].
	Rejected,
}

/// Page side of one connection, running inside the bridge document.
///
/// The host delivers events by calling [`BridgeClient::connect()`],
/// [`BridgeClient::on_service_reply()`] and
/// [`BridgeClient::on_client_message()`]. Replies arriving on a
/// [`MessageRelay::reply_port()`] go to [`MessageRelay::forward()`].
#[derive(Debug)]
pub struct BridgeClient<H: BridgeHost> {
	/// The browsing context we run in.
	host: H,
	/// URL of the bridge document, including the bootstrap suffix.
	document_url: String,
	/// Current state.
	state: State<H::Port>,
}

impl<H: BridgeHost> BridgeClient<H> {
	/// Creates an idle [`BridgeClient`] for the bridge document at
	/// `document_url`.
	pub fn new<S: Into<String>>(host: H, document_url: S) -> Self {
		Self {
			host,
			document_url: document_url.into(),
			state: State::Idle,
		}
	}

	/// Current phase.
	#[must_use]
	pub const fn phase(&self) -> BridgePhase {
		match &self.state {
			State::Idle => BridgePhase::Idle,
			State::AwaitingServiceReply { .. } => BridgePhase::AwaitingServiceReply,
			State::Connected { relays: 0, .. } => BridgePhase::Connected,
			State::Connected { .. } => BridgePhase::RelayingMessage,
			State::Rejected => BridgePhase::Rejected,
		}
	}

	/// The host this client posts through.
	#[must_use]
	pub const fn host(&self) -> &H {
		&self.host
	}

	/// Port the worker's `{connectResult}` arrives on while
	/// [`BridgePhase::AwaitingServiceReply`].
	#[must_use]
	pub const fn service_port(&self) -> Option<&H::Port> {
		if let State::AwaitingServiceReply { service, .. } = &self.state {
			Some(service)
		} else {
			None
		}
	}

	/// Port the connected page posts messages to, once connected.
	#[must_use]
	pub const fn client_port(&self) -> Option<&H::Port> {
		if let State::Connected { client, .. } = &self.state {
			Some(client)
		} else {
			None
		}
	}

	/// The page at `origin` posted `{connect: requester}`.
	///
	/// # Errors
	///
	/// - [`Error::UnexpectedPhase`] unless [`BridgePhase::Idle`].
	/// - Host errors from creating the service channel or posting the
	///   envelope.
	pub fn connect(&mut self, requester: H::Port, origin: &str) -> Result<(), Error> {
		self.expect(BridgePhase::Idle)?;

		let (service, remote) = self.host.create_channel()?;
		self.host
			.post_to_controller(Envelope::Connect(ConnectEnvelope {
				target_url: self.document_url.clone(),
				origin: origin.to_owned(),
				port: remote,
			}))?;

		self.state = State::AwaitingServiceReply {
			origin: origin.to_owned(),
			requester,
			service,
		};

		Ok(())
	}

	/// The worker answered the connect request.
	///
	/// # Errors
	///
	/// - [`Error::UnexpectedPhase`] unless
	///   [`BridgePhase::AwaitingServiceReply`].
	/// - Host errors from creating the client channel or posting the handoff.
	pub fn on_service_reply(&mut self, connect_result: bool) -> Result<(), Error> {
		self.expect(BridgePhase::AwaitingServiceReply)?;

		let State::AwaitingServiceReply {
			origin, requester, ..
		} = &self.state
		else {
			unreachable!("phase was checked above")
		};

		if !connect_result {
			self.host.post_handoff(requester, None)?;
			self.state = State::Rejected;
			return Ok(());
		}

		let (client, remote) = self.host.create_channel()?;
		self.host.post_handoff(requester, Some(remote))?;
		self.state = State::Connected {
			origin: origin.clone(),
			client,
			relays: 0,
		};

		Ok(())
	}

	/// The connected page posted `data` on the client port.
	///
	/// The envelope carries the origin the page connected from; events on
	/// the client port itself have none. Returns the relay that carries the
	/// worker's replies back.
	///
	/// # Errors
	///
	/// - [`Error::UnexpectedPhase`] unless connected.
	/// - Host errors from creating the relay channel or posting the envelope.
	pub fn on_client_message(
		&mut self,
		data: <H::Port as Port>::Value,
		ports: Vec<H::Port>,
	) -> Result<MessageRelay<H::Port>, Error> {
		let phase = self.phase();
		let State::Connected {
			origin,
			client,
			relays,
		} = &mut self.state
		else {
			return Err(Error::UnexpectedPhase(phase));
		};

		let (reply, remote) = self.host.create_channel()?;
		let mut transfer = Vec::with_capacity(ports.len() + 1);
		transfer.push(remote.clone());
		transfer.extend(ports);

		self.host
			.post_to_controller(Envelope::Message(MessageEnvelope {
				target_url: self.document_url.clone(),
				origin: origin.clone(),
				data,
				port: remote,
				ports: transfer,
			}))?;
		*relays += 1;

		Ok(MessageRelay {
			reply,
			client: client.clone(),
		})
	}

	/// Fails with [`Error::UnexpectedPhase`] unless in `phase`.
	fn expect(&self, phase: BridgePhase) -> Result<(), Error> {
		let current = self.phase();

		if current == phase {
			Ok(())
		} else {
			Err(Error::UnexpectedPhase(current))
		}
	}
}

/// Carries the worker's replies to one relayed message back to the page.
#[derive(Debug)]
pub struct MessageRelay<P> {
	/// Our end of the per-message channel.
	reply: P,
	/// Our end of the client channel.
	client: P,
}

impl<P: Port> MessageRelay<P> {
	/// Port the worker's replies arrive on.
	#[must_use]
	pub const fn reply_port(&self) -> &P {
		&self.reply
	}

	/// Passes a reply, with its ports, on to the page.
	///
	/// # Errors
	///
	/// If the host fails to deliver the message.
	pub fn forward(&self, data: P::Value, ports: Vec<P>) -> Result<(), Error> {
		self.client.post_message(data, ports)
	}
}
