//! Event objects handed to JavaScript listeners.

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::{Array, Function};
use wasm_bindgen::prelude::wasm_bindgen;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::MessagePort;

use super::JsError;
use crate::event::Client;
use crate::port::Port;
use crate::registry::EventType;
use crate::{Error, Service};

/// `event.client` and `event.source` of JavaScript listeners.
#[wasm_bindgen(js_name = CrossOriginServiceWorkerClient)]
#[derive(Clone, Debug)]
pub struct CrossOriginClient(Client<MessagePort>);

#[wasm_bindgen(js_class = CrossOriginServiceWorkerClient)]
impl CrossOriginClient {
	/// Origin of the remote page.
	#[wasm_bindgen(getter)]
	#[must_use]
	pub fn origin(&self) -> String {
		self.0.origin().to_owned()
	}

	/// URL the page connected to, without the bootstrap suffix.
	#[wasm_bindgen(getter = targetUrl)]
	#[must_use]
	pub fn target_url(&self) -> String {
		self.0.target_url().to_owned()
	}

	/// Sends `message` to the remote page.
	///
	/// # Errors
	///
	/// If the client isn't connected yet, `transfer` contains anything but
	/// [`MessagePort`]s, or posting fails.
	#[wasm_bindgen(js_name = postMessage)]
	pub fn post_message(&self, message: JsValue, transfer: Option<Array>) -> Result<(), JsValue> {
		let transfer = transfer
			.map(|transfer| {
				transfer
					.iter()
					.map(JsCast::dyn_into::<MessagePort>)
					.collect::<Result<Vec<_>, _>>()
			})
			.transpose()
			.map_err(|_| JsValue::from_str("only `MessagePort`s can be transferred"))?
			.unwrap_or_default();

		self.0.post_message(message, transfer).map_err(JsValue::from)
	}
}

/// The decision of one JavaScript listener.
#[derive(Debug)]
struct Decision {
	/// Clone of the reply port while no decision was sent.
	reply: Option<MessagePort>,
	/// What the listener decided.
	accepted: Option<bool>,
	/// Cleared once the listener returned.
	open: bool,
}

/// `crossoriginconnect` event of JavaScript listeners.
#[wasm_bindgen]
#[derive(Debug)]
pub struct CrossOriginConnectEvent {
	/// See [`CrossOriginConnectEvent::client()`].
	client: CrossOriginClient,
	/// Shared with the listener adapter.
	decision: Rc<RefCell<Decision>>,
}

#[wasm_bindgen]
impl CrossOriginConnectEvent {
	/// The page asking to connect.
	#[wasm_bindgen(getter)]
	#[must_use]
	pub fn client(&self) -> CrossOriginClient {
		self.client.clone()
	}

	/// Sends the decision for this connection.
	///
	/// # Errors
	///
	/// If a decision was already sent, the listener already returned, or
	/// posting fails.
	#[wasm_bindgen(js_name = acceptConnection)]
	pub fn accept_connection(&self, accept: bool) -> Result<(), JsValue> {
		let mut decision = self.decision.borrow_mut();

		if !decision.open {
			return Err(Error::AlreadyReplied.into());
		}

		let reply = decision.reply.take().ok_or(Error::AlreadyReplied)?;
		decision.accepted = Some(accept);

		reply.post_connect_result(accept).map_err(JsValue::from)
	}
}

/// `crossoriginmessage` event of JavaScript listeners.
#[wasm_bindgen]
#[derive(Debug)]
pub struct CrossOriginMessageEvent {
	/// See [`CrossOriginMessageEvent::data()`].
	data: JsValue,
	/// See [`CrossOriginMessageEvent::ports()`].
	ports: Array,
	/// See [`CrossOriginMessageEvent::source()`].
	source: CrossOriginClient,
}

#[wasm_bindgen]
impl CrossOriginMessageEvent {
	/// Payload posted by the page.
	#[wasm_bindgen(getter)]
	#[must_use]
	pub fn data(&self) -> JsValue {
		self.data.clone()
	}

	/// Ports transferred with the message.
	#[wasm_bindgen(getter)]
	#[must_use]
	pub fn ports(&self) -> Array {
		self.ports.clone()
	}

	/// The sending page.
	#[wasm_bindgen(getter)]
	#[must_use]
	pub fn source(&self) -> CrossOriginClient {
		self.source.clone()
	}

	/// Same as [`CrossOriginMessageEvent::source()`].
	#[wasm_bindgen(getter)]
	#[must_use]
	pub fn client(&self) -> CrossOriginClient {
		self.source.clone()
	}
}

/// Registers a JavaScript `listener`. Anything but a function is ignored.
pub(super) fn add_listener(
	service: &Service<MessagePort>,
	event_type: EventType,
	listener: JsValue,
) {
	let Ok(listener) = listener.dyn_into::<Function>() else {
		return;
	};

	match event_type {
		EventType::CrossOriginConnect => service.add_connect_listener(move |event| {
			let decision = Rc::new(RefCell::new(Decision {
				reply: event.reply_port().cloned(),
				accepted: None,
				open: true,
			}));
			let js_event = CrossOriginConnectEvent {
				client: CrossOriginClient(event.client().clone()),
				decision: Rc::clone(&decision),
			};

			let result = listener.call1(&JsValue::UNDEFINED, &js_event.into());

			let mut decision = decision.borrow_mut();
			decision.open = false;

			if let Some(accepted) = decision.accepted {
				event.record_reply(accepted);
			}

			result.map(|_| ()).map_err(|error| JsError(error).into())
		}),
		EventType::CrossOriginMessage => service.add_message_listener(move |event| {
			let js_event = CrossOriginMessageEvent {
				data: event.data().clone(),
				ports: event.ports().iter().collect(),
				source: CrossOriginClient(event.source().clone()),
			};

			listener
				.call1(&JsValue::UNDEFINED, &js_event.into())
				.map(|_| ())
				.map_err(|error| JsError(error).into())
		}),
	}
}
