//! In-process message channels.
//!
//! Runs the complete protocol, bridge included, without a browser. Nothing
//! is delivered asynchronously: posting pushes onto the peer's queue and
//! [`MemoryPort::recv()`] pops from the own one, so the caller plays the
//! event loop.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt::{self, Debug, Formatter};
use std::rc::Rc;

use crate::envelope::Envelope;
use crate::port::{BridgeHost, Port};
use crate::Error;

/// Anything that can arrive on a [`MemoryPort`].
#[derive(Debug)]
pub enum Packet<V: Debug + 'static> {
	/// `{connectResult: bool}`.
	ConnectResult(bool),
	/// `{connected: port | false}`.
	Handoff(Option<MemoryPort<V>>),
	/// Application data with transferred ports.
	Data {
		/// Payload.
		data: V,
		/// Transferred ports.
		ports: Vec<MemoryPort<V>>,
	},
	/// A connect or message envelope, only ever posted to a controller.
	Envelope(Envelope<MemoryPort<V>>),
	/// `{connect: port}`, posted by a page to the bridge document.
	Connect(MemoryPort<V>),
}

/// Message queue of one port.
struct Queue<V: Debug + 'static> {
	/// Delivered but not yet received packets.
	packets: RefCell<VecDeque<Packet<V>>>,
	/// Set by [`MemoryPort::close()`] on either end.
	closed: Cell<bool>,
}

impl<V: Debug + 'static> Queue<V> {
	/// Creates an empty [`Queue`].
	fn new() -> Rc<Self> {
		Rc::new(Self {
			packets: RefCell::new(VecDeque::new()),
			closed: Cell::new(false),
		})
	}
}

/// One end of an in-process channel created by [`channel()`].
pub struct MemoryPort<V: Debug + 'static> {
	/// Packets posted by the other end.
	inbox: Rc<Queue<V>>,
	/// Inbox of the other end.
	peer: Rc<Queue<V>>,
}

impl<V: Debug + 'static> Clone for MemoryPort<V> {
	fn clone(&self) -> Self {
		Self {
			inbox: Rc::clone(&self.inbox),
			peer: Rc::clone(&self.peer),
		}
	}
}

impl<V: Debug + 'static> PartialEq for MemoryPort<V> {
	fn eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.inbox, &other.inbox)
	}
}

impl<V: Debug + 'static> Debug for MemoryPort<V> {
	fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
		formatter
			.debug_struct("MemoryPort")
			.field("pending", &self.pending())
			.field("closed", &self.is_closed())
			.finish_non_exhaustive()
	}
}

/// Creates an entangled pair of [`MemoryPort`]s.
#[must_use]
pub fn channel<V: Debug + 'static>() -> (MemoryPort<V>, MemoryPort<V>) {
	let first = Queue::new();
	let second = Queue::new();

	(
		MemoryPort {
			inbox: Rc::clone(&first),
			peer: Rc::clone(&second),
		},
		MemoryPort {
			inbox: second,
			peer: first,
		},
	)
}

impl<V: Debug + 'static> MemoryPort<V> {
	/// Delivers `packet` to the other end.
	///
	/// # Errors
	///
	/// [`Error::Post`] if the channel was closed.
	pub fn post(&self, packet: Packet<V>) -> Result<(), Error> {
		if self.is_closed() {
			return Err(Error::Post("port is closed".into()));
		}

		self.peer.packets.borrow_mut().push_back(packet);
		Ok(())
	}

	/// Takes the oldest packet posted by the other end.
	#[must_use]
	pub fn recv(&self) -> Option<Packet<V>> {
		self.inbox.packets.borrow_mut().pop_front()
	}

	/// Number of packets waiting in [`MemoryPort::recv()`].
	#[must_use]
	pub fn pending(&self) -> usize {
		self.inbox.packets.borrow().len()
	}

	/// Closes the channel for both ends. Later posts fail.
	pub fn close(&self) {
		self.inbox.closed.set(true);
		self.peer.closed.set(true);
	}

	/// Returns `true` once either end was closed.
	#[must_use]
	pub fn is_closed(&self) -> bool {
		self.inbox.closed.get()
	}
}

impl<V: Debug + 'static> Port for MemoryPort<V> {
	type Value = V;

	fn post_connect_result(&self, accepted: bool) -> Result<(), Error> {
		self.post(Packet::ConnectResult(accepted))
	}

	fn post_message(&self, data: V, transfer: Vec<Self>) -> Result<(), Error> {
		self.post(Packet::Data {
			data,
			ports: transfer,
		})
	}
}

/// [`BridgeHost`] posting envelopes to an in-process controller port.
#[derive(Clone, Debug)]
pub struct MemoryHost<V: Debug + 'static> {
	/// Our end of the channel to the service worker.
	controller: MemoryPort<V>,
}

impl<V: Debug + 'static> MemoryHost<V> {
	/// Creates a [`MemoryHost`] whose envelopes arrive at the other end of
	/// `controller`.
	#[must_use]
	pub const fn new(controller: MemoryPort<V>) -> Self {
		Self { controller }
	}
}

impl<V: Debug + 'static> BridgeHost for MemoryHost<V> {
	type Port = MemoryPort<V>;

	fn create_channel(&self) -> Result<(Self::Port, Self::Port), Error> {
		Ok(channel())
	}

	fn post_to_controller(&self, envelope: Envelope<Self::Port>) -> Result<(), Error> {
		self.controller.post(Packet::Envelope(envelope))
	}

	fn post_handoff(
		&self,
		requester: &Self::Port,
		connected: Option<Self::Port>,
	) -> Result<(), Error> {
		requester.post(Packet::Handoff(connected))
	}
}
