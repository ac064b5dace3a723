//! The worker-context object tying the protocol together.

use crate::bridge::BridgeDocument;
use crate::config::{Config, ServiceBuilder};
use crate::envelope::Envelope;
use crate::event::{ConnectEvent, MessageEvent};
use crate::handshake::{self, Resolution};
use crate::port::Port;
use crate::registry::{ListenerResult, Registry};
use crate::{relay, Error};

/// Emulated cross-origin connect support of one service worker.
///
/// Owns the listener [`Registry`]. Feed it the worker's fetches with
/// [`Service::handle_fetch()`] and its decoded `message` events with
/// [`Service::handle_envelope()`].
#[derive(Debug)]
pub struct Service<P: Port> {
	/// Wire constants.
	config: Config,
	/// Listeners of this worker.
	registry: Registry<P>,
}

/// What [`Service::handle_envelope()`] did.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Outcome {
	/// A connect request was decided.
	Connect(Resolution),
	/// A message was handed to the listeners.
	Message,
}

impl<P: Port> Default for Service<P> {
	fn default() -> Self {
		Self::new()
	}
}

impl<P: Port> Service<P> {
	/// Creates a [`Service`] with the default wire constants.
	#[must_use]
	pub fn new() -> Self {
		Self::with_config(Config::default())
	}

	/// See [`ServiceBuilder`].
	pub fn builder() -> ServiceBuilder {
		ServiceBuilder::new()
	}

	/// Creates a [`Service`] from a validated [`Config`].
	pub(crate) fn with_config(config: Config) -> Self {
		Self {
			config,
			registry: Registry::new(),
		}
	}

	/// Wire constants in use.
	#[must_use]
	pub const fn config(&self) -> &Config {
		&self.config
	}

	/// Listeners of this worker.
	#[must_use]
	pub const fn registry(&self) -> &Registry<P> {
		&self.registry
	}

	/// See [`Registry::add_connect_listener()`].
	pub fn add_connect_listener<F>(&self, listener: F)
	where
		F: 'static + Fn(&mut ConnectEvent<P>) -> ListenerResult,
	{
		self.registry.add_connect_listener(listener);
	}

	/// See [`Registry::add_message_listener()`].
	pub fn add_message_listener<F>(&self, listener: F)
	where
		F: 'static + Fn(&mut MessageEvent<P>) -> ListenerResult,
	{
		self.registry.add_message_listener(listener);
	}

	/// Answers bootstrap fetches with the bridge document.
	///
	/// Returns [`None`] for every other URL, which should go to the network.
	#[must_use]
	pub fn handle_fetch(&self, url: &str) -> Option<BridgeDocument> {
		if self.config.is_bridge_url(url) {
			tracing::debug!(url, "serving bridge document");
			Some(BridgeDocument::render(&self.config))
		} else {
			tracing::trace!(url, "declining fetch");
			None
		}
	}

	/// Runs the connect handshake or the message relay for `envelope`.
	///
	/// # Errors
	///
	/// - [`Error::Listener`] if a listener failed. Connect requests were
	///   still answered.
	/// - [`Error::Post`] if a reply couldn't be delivered.
	pub fn handle_envelope(&self, envelope: Envelope<P>) -> Result<Outcome, Error> {
		match envelope {
			Envelope::Connect(envelope) => {
				handshake::run(&self.config, &self.registry, envelope).map(Outcome::Connect)
			}
			Envelope::Message(envelope) => {
				relay::run(&self.config, &self.registry, envelope).map(|()| Outcome::Message)
			}
		}
	}
}
