//! Ordered listener lists for the two synthetic event types.

use std::cell::RefCell;
use std::error;
use std::fmt::{self, Debug, Display, Formatter};
use std::rc::Rc;

use crate::event::{ConnectEvent, MessageEvent};
use crate::port::Port;
use crate::Error;

/// Return type of every listener.
///
/// An [`Err`] aborts the current dispatch.
pub type ListenerResult = Result<(), Box<dyn error::Error>>;

/// A registered listener.
type Listener<E> = Rc<dyn Fn(&mut E) -> ListenerResult>;

/// The synthetic event types.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum EventType {
	/// `crossoriginconnect`
	CrossOriginConnect,
	/// `crossoriginmessage`
	CrossOriginMessage,
}

impl EventType {
	/// Name used with `addEventListener()`.
	#[must_use]
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::CrossOriginConnect => "crossoriginconnect",
			Self::CrossOriginMessage => "crossoriginmessage",
		}
	}

	/// Returns [`None`] for every other event type, which must be passed
	/// through to the host untouched.
	#[must_use]
	pub fn from_name(name: &str) -> Option<Self> {
		match name {
			"crossoriginconnect" => Some(Self::CrossOriginConnect),
			"crossoriginmessage" => Some(Self::CrossOriginMessage),
			_ => None,
		}
	}
}

impl Display for EventType {
	fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
		formatter.write_str(self.as_str())
	}
}

/// Listeners of one worker.
///
/// Listeners can't be removed. Registering during a dispatch only affects
/// later dispatches.
pub struct Registry<P: Port> {
	/// `crossoriginconnect` listeners in registration order.
	connect: RefCell<Vec<Listener<ConnectEvent<P>>>>,
	/// `crossoriginmessage` listeners in registration order.
	message: RefCell<Vec<Listener<MessageEvent<P>>>>,
}

impl<P: Port> Debug for Registry<P> {
	fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
		formatter
			.debug_struct("Registry")
			.field("connect", &self.connect.borrow().len())
			.field("message", &self.message.borrow().len())
			.finish()
	}
}

impl<P: Port> Default for Registry<P> {
	fn default() -> Self {
		Self {
			connect: RefCell::new(Vec::new()),
			message: RefCell::new(Vec::new()),
		}
	}
}

impl<P: Port> Registry<P> {
	/// Creates an empty [`Registry`].
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends a `crossoriginconnect` listener.
	pub fn add_connect_listener<F>(&self, listener: F)
	where
		F: 'static + Fn(&mut ConnectEvent<P>) -> ListenerResult,
	{
		self.connect.borrow_mut().push(Rc::new(listener));
	}

	/// Appends a `crossoriginmessage` listener.
	pub fn add_message_listener<F>(&self, listener: F)
	where
		F: 'static + Fn(&mut MessageEvent<P>) -> ListenerResult,
	{
		self.message.borrow_mut().push(Rc::new(listener));
	}

	/// Number of listeners registered for `event_type`.
	#[must_use]
	pub fn len(&self, event_type: EventType) -> usize {
		match event_type {
			EventType::CrossOriginConnect => self.connect.borrow().len(),
			EventType::CrossOriginMessage => self.message.borrow().len(),
		}
	}

	/// Returns `true` if no listener of either type is registered.
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.connect.borrow().is_empty() && self.message.borrow().is_empty()
	}

	/// Calls every `crossoriginconnect` listener in registration order.
	///
	/// # Errors
	///
	/// [`Error::Listener`] from the first failing listener.
	pub fn dispatch_connect(&self, event: &mut ConnectEvent<P>) -> Result<(), Error> {
		dispatch(EventType::CrossOriginConnect, &self.connect, event)
	}

	/// Calls every `crossoriginmessage` listener in registration order.
	///
	/// # Errors
	///
	/// [`Error::Listener`] from the first failing listener.
	pub fn dispatch_message(&self, event: &mut MessageEvent<P>) -> Result<(), Error> {
		dispatch(EventType::CrossOriginMessage, &self.message, event)
	}
}

/// Calls `listeners` in order until one fails.
fn dispatch<E>(
	event_type: EventType,
	listeners: &RefCell<Vec<Listener<E>>>,
	event: &mut E,
) -> Result<(), Error> {
	// Release the borrow before calling out, listeners may register others.
	let listeners: Vec<_> = listeners.borrow().iter().map(Rc::clone).collect();

	for (index, listener) in listeners.iter().enumerate() {
		if let Err(source) = listener(event) {
			tracing::warn!(%event_type, index, error = %source, "listener failed");
			return Err(Error::Listener {
				event_type,
				index,
				source,
			});
		}
	}

	Ok(())
}
