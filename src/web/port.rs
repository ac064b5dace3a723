//! [`MessagePort`] on the wire.

use js_sys::{Array, Object, Reflect};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{ExtendableMessageEvent, MessagePort};

use super::JsError;
use crate::envelope::{ConnectEnvelope, Envelope, EnvelopeKind, MessageEnvelope};
use crate::port::Port;
use crate::{Config, Error};

impl Port for MessagePort {
	type Value = JsValue;

	fn post_connect_result(&self, accepted: bool) -> Result<(), Error> {
		let reply = Object::new();
		Reflect::set(&reply, &"connectResult".into(), &accepted.into()).map_err(post_error)?;

		Self::post_message(self, &reply).map_err(post_error)
	}

	fn post_message(&self, data: JsValue, transfer: Vec<Self>) -> Result<(), Error> {
		let transfer: Array = transfer.into_iter().collect();

		self.post_message_with_transferable(&data, &transfer)
			.map_err(post_error)
	}
}

/// Wraps a failed `postMessage()`.
pub(super) fn post_error(error: JsValue) -> Error {
	Error::Post(Box::new(JsError(error)))
}

/// Reads property `key` of `object`.
fn field(object: &JsValue, key: &str) -> Option<JsValue> {
	Reflect::get(object, &JsValue::from_str(key)).ok()
}

/// Decodes a worker `message` event.
///
/// Returns [`None`] for anything that isn't a well-formed envelope, which is
/// left to the worker's other listeners.
pub(super) fn decode(
	config: &Config,
	event: &ExtendableMessageEvent,
) -> Option<Envelope<MessagePort>> {
	let data = event.data();

	if !data.is_object() {
		return None;
	}

	let kind =
		config.classify(|key| Reflect::has(&data, &JsValue::from_str(key)).unwrap_or(false))?;
	let tag = match kind {
		EnvelopeKind::Connect => config.connect_tag(),
		EnvelopeKind::Message => config.message_tag(),
	};

	let envelope = field(&data, tag)
		.and_then(|target_url| target_url.as_string())
		.zip(field(&data, "origin").and_then(|origin| origin.as_string()))
		.zip(field(&data, "port").and_then(|port| port.dyn_into::<MessagePort>().ok()));

	let Some(((target_url, origin), port)) = envelope else {
		tracing::trace!(?kind, "ignoring malformed envelope");
		return None;
	};

	Some(match kind {
		EnvelopeKind::Connect => Envelope::Connect(ConnectEnvelope {
			target_url,
			origin,
			port,
		}),
		EnvelopeKind::Message => Envelope::Message(MessageEnvelope {
			target_url,
			origin,
			data: field(&data, "data").unwrap_or(JsValue::UNDEFINED),
			port,
			ports: event
				.ports()
				.iter()
				.filter_map(|port| port.dyn_into().ok())
				.collect(),
		}),
	})
}
