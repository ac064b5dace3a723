//! Worker side of the message phase.

use crate::config::Config;
use crate::envelope::MessageEnvelope;
use crate::event::{Client, MessageEvent};
use crate::port::Port;
use crate::registry::Registry;
use crate::Error;

/// Dispatches a relayed message to every `crossoriginmessage` listener.
///
/// The envelope's reply port is bound to the event's source and never shows
/// up in its ports.
pub(crate) fn run<P: Port>(
	config: &Config,
	registry: &Registry<P>,
	envelope: MessageEnvelope<P>,
) -> Result<(), Error> {
	let MessageEnvelope {
		target_url,
		origin,
		data,
		port,
		ports,
	} = envelope;

	let target_url = config.strip_suffix(&target_url).to_owned();
	let ports: Vec<_> = ports
		.into_iter()
		.filter(|transferred| transferred != &port)
		.collect();

	tracing::debug!(
		origin = origin.as_str(),
		target_url = target_url.as_str(),
		ports = ports.len(),
		"relaying cross-origin message"
	);

	let source = Client::new(origin, target_url, Some(port));
	let mut event = MessageEvent::new(data, ports, source);

	registry.dispatch_message(&mut event)
}
