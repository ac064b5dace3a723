//! Seams between the protocol and the host's messaging primitives.

use std::fmt::Debug;

use crate::envelope::Envelope;
use crate::Error;

/// One end of an entangled message channel.
///
/// Implemented for [`web_sys::MessagePort`] on the Web and for
/// [`MemoryPort`](crate::memory::MemoryPort) everywhere.
pub trait Port: Clone + Debug + PartialEq {
	/// Structured-clone payload carried by this port.
	type Value: Debug;

	/// Posts `{connectResult: accepted}`.
	///
	/// # Errors
	///
	/// If the host fails to deliver the message.
	fn post_connect_result(&self, accepted: bool) -> Result<(), Error>;

	/// Posts `data`, transferring `transfer` alongside it.
	///
	/// # Errors
	///
	/// If the host fails to deliver the message.
	fn post_message(&self, data: Self::Value, transfer: Vec<Self>) -> Result<(), Error>;
}

/// Browsing context running the bridge document.
///
/// Everything [`BridgeClient`](crate::bridge::BridgeClient) needs from the
/// page it runs in.
pub trait BridgeHost {
	/// Port type of this host.
	type Port: Port;

	/// Creates a new entangled channel, returning `(port1, port2)`.
	///
	/// # Errors
	///
	/// If the host can't create channels.
	fn create_channel(&self) -> Result<(Self::Port, Self::Port), Error>;

	/// Posts an envelope to the controlling service worker, transferring its
	/// ports.
	///
	/// # Errors
	///
	/// If the host fails to deliver the message.
	fn post_to_controller(&self, envelope: Envelope<Self::Port>) -> Result<(), Error>;

	/// Posts `{connected: port | false}` to the page that asked to connect.
	///
	/// # Errors
	///
	/// If the host fails to deliver the message.
	fn post_handoff(
		&self,
		requester: &Self::Port,
		connected: Option<Self::Port>,
	) -> Result<(), Error>;
}
