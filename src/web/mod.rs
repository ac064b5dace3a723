//! Service worker bindings.
//!
//! [`install()`] hooks the worker's `fetch` and `message` events and
//! replaces `self.addEventListener()`, so both JavaScript and Rust can listen
//! for `crossoriginconnect` and `crossoriginmessage`:
//!
//! ```js
//! self.addEventListener('crossoriginconnect', event => {
//! 	event.acceptConnection(event.client.origin === 'https://a.example');
//! });
//! self.addEventListener('crossoriginmessage', event => {
//! 	event.source.postMessage({ echo: event.data });
//! });
//! ```
//!
//! Every other event type goes to the original `addEventListener()`.

mod event;
mod port;

use std::cell::OnceCell;
use std::error;
use std::fmt::{self, Debug, Display, Formatter};
use std::rc::Rc;

use js_sys::{Function, Promise, Reflect};
use wasm_bindgen::prelude::{wasm_bindgen, Closure};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{
	console, ExtendableMessageEvent, FetchEvent, Headers, MessagePort, Response, ResponseInit,
	ServiceWorkerGlobalScope,
};

pub use self::event::{CrossOriginClient, CrossOriginConnectEvent, CrossOriginMessageEvent};
use crate::bridge::BridgeDocument;
use crate::registry::EventType;
use crate::{Error, Service, ServiceBuilder};

/// A JavaScript exception.
#[derive(Debug)]
pub struct JsError(JsValue);

impl Display for JsError {
	fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
		match self.0.as_string() {
			Some(message) => write!(formatter, "JavaScript exception: {message}"),
			None => write!(formatter, "JavaScript exception: {:?}", self.0),
		}
	}
}

impl error::Error for JsError {}

impl JsError {
	/// The thrown value.
	#[must_use]
	pub const fn as_raw(&self) -> &JsValue {
		&self.0
	}

	/// Converts into the thrown value.
	#[must_use]
	#[allow(clippy::missing_const_for_fn)]
	pub fn into_raw(self) -> JsValue {
		self.0
	}
}

impl From<Error> for JsValue {
	fn from(error: Error) -> Self {
		let source = match error {
			Error::Listener { source, .. } | Error::Post(source) => source,
			error => return error.to_string().into(),
		};

		match source.downcast::<JsError>() {
			Ok(error) => error.0,
			Err(source) => source.to_string().into(),
		}
	}
}

thread_local! {
	/// The installed instance of this worker.
	static INSTALLED: OnceCell<ServiceWorker> = OnceCell::new();
}

/// Installs the emulation with the default wire constants.
///
/// # Errors
///
/// See [`install_with()`].
pub fn install() -> Result<ServiceWorker, Error> {
	install_with(ServiceBuilder::new())
}

/// Installs the emulation into the current service worker.
///
/// Installing again returns the first instance and ignores `builder`.
///
/// # Errors
///
/// - [`Error::Unsupported`] outside a service worker, if cross-origin
///   connect is supported natively, or if `addEventListener()` can't be
///   replaced.
/// - [`Error::InvalidConfig`] from [`ServiceBuilder::build()`].
/// - [`Error::Post`] if the worker's event listeners couldn't be set up.
pub fn install_with(builder: ServiceBuilder) -> Result<ServiceWorker, Error> {
	INSTALLED.with(|installed| {
		if let Some(worker) = installed.get() {
			return Ok(worker.clone());
		}

		let worker = ServiceWorker::new(builder.build()?)?;
		Ok(installed.get_or_init(|| worker).clone())
	})
}

/// Entry point for JavaScript service worker shells.
///
/// # Errors
///
/// See [`install()`].
#[wasm_bindgen(js_name = installCrossOriginConnect)]
pub fn install_js() -> Result<(), JsValue> {
	install().map(|_| ()).map_err(JsValue::from)
}

/// The emulation installed into a service worker.
#[derive(Clone, Debug)]
pub struct ServiceWorker(Rc<Inner>);

/// Shared state of [`ServiceWorker`].
struct Inner {
	/// The worker's global.
	global: ServiceWorkerGlobalScope,
	/// Protocol state shared with the event listeners.
	service: Rc<Service<MessagePort>>,
	/// `addEventListener()` before we replaced it.
	native_add_event_listener: Function,
	/// Our `fetch` listener.
	fetch: Closure<dyn FnMut(&FetchEvent)>,
	/// Our `message` listener.
	message: Closure<dyn FnMut(&ExtendableMessageEvent) -> Result<(), JsValue>>,
	/// The replacement `addEventListener()`.
	add_event_listener: Closure<dyn FnMut(JsValue, JsValue, JsValue) -> Result<JsValue, JsValue>>,
}

impl Debug for Inner {
	fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
		formatter
			.debug_struct("Inner")
			.field("global", &self.global)
			.field("service", &self.service)
			.finish_non_exhaustive()
	}
}

impl Drop for Inner {
	fn drop(&mut self) {
		let _ = self
			.global
			.remove_event_listener_with_callback("fetch", self.fetch.as_ref().unchecked_ref());
		let _ = self
			.global
			.remove_event_listener_with_callback("message", self.message.as_ref().unchecked_ref());

		// Somebody else may have replaced it in the meantime.
		let current = Reflect::get(&self.global, &"addEventListener".into());

		if current.as_ref().ok() == Some(self.add_event_listener.as_ref())
			&& Reflect::set(
				&self.global,
				&"addEventListener".into(),
				&self.native_add_event_listener,
			)
			.is_err()
		{
			console::warn_1(&"`addEventListener()` could not be restored".into());
		}
	}
}

impl Inner {
	/// Registers our listeners and replaces `addEventListener()`.
	///
	/// Whatever was hooked before a failure is unhooked again when `self` is
	/// dropped.
	fn hook(&self) -> Result<(), Error> {
		self.global
			.add_event_listener_with_callback("fetch", self.fetch.as_ref().unchecked_ref())
			.map_err(port::post_error)?;
		self.global
			.add_event_listener_with_callback("message", self.message.as_ref().unchecked_ref())
			.map_err(port::post_error)?;

		let replaced = Reflect::set(
			&self.global,
			&"addEventListener".into(),
			self.add_event_listener.as_ref(),
		)
		.map_err(port::post_error)?;

		if replaced {
			Ok(())
		} else {
			Err(Error::Unsupported("`addEventListener()` can't be replaced"))
		}
	}
}

impl ServiceWorker {
	/// Hooks `service` into the current global.
	fn new(service: Service<MessagePort>) -> Result<Self, Error> {
		let global: ServiceWorkerGlobalScope = js_sys::global()
			.dyn_into()
			.map_err(|_| Error::Unsupported("not running in a service worker"))?;

		if Reflect::has(&global, &"oncrossoriginconnect".into()).unwrap_or(false) {
			return Err(Error::Unsupported("cross-origin connect is supported natively"));
		}

		let native_add_event_listener: Function =
			Reflect::get(&global, &"addEventListener".into())
				.and_then(JsCast::dyn_into)
				.map_err(port::post_error)?;

		let service = Rc::new(service);

		let fetch = Closure::wrap(Box::new({
			let service = Rc::clone(&service);
			move |event: &FetchEvent| handle_fetch(&service, event)
		}) as Box<dyn FnMut(&FetchEvent)>);

		let message = Closure::wrap(Box::new({
			let service = Rc::clone(&service);
			move |event: &ExtendableMessageEvent| handle_message(&service, event)
		})
			as Box<dyn FnMut(&ExtendableMessageEvent) -> Result<(), JsValue>>);

		let add_event_listener = Closure::wrap(Box::new({
			let service = Rc::clone(&service);
			let global = global.clone();
			let native = native_add_event_listener.clone();
			move |type_: JsValue, listener: JsValue, options: JsValue| {
				match type_.as_string().as_deref().and_then(EventType::from_name) {
					Some(event_type) => {
						event::add_listener(&service, event_type, listener);
						Ok(JsValue::UNDEFINED)
					}
					None => native.call3(&global, &type_, &listener, &options),
				}
			}
		})
			as Box<dyn FnMut(JsValue, JsValue, JsValue) -> Result<JsValue, JsValue>>);

		let inner = Inner {
			global,
			service,
			native_add_event_listener,
			fetch,
			message,
			add_event_listener,
		};
		inner.hook()?;

		Ok(Self(Rc::new(inner)))
	}

	/// The installed [`Service`], for registering Rust listeners.
	#[must_use]
	pub fn service(&self) -> &Service<MessagePort> {
		&self.0.service
	}

	/// The worker's global.
	#[must_use]
	pub fn global(&self) -> &ServiceWorkerGlobalScope {
		&self.0.global
	}

	/// The response served for a fetch of `url`, or [`None`] if the fetch
	/// should go to the network.
	///
	/// # Errors
	///
	/// If the [`Response`] couldn't be constructed.
	pub fn bridge_response(&self, url: &str) -> Result<Option<Response>, JsValue> {
		self.0
			.service
			.handle_fetch(url)
			.map(|document| bridge_response(&document))
			.transpose()
	}

	/// Same as calling `self.addEventListener(type_, listener)` from
	/// JavaScript.
	///
	/// # Errors
	///
	/// If the original `addEventListener()` throws.
	pub fn add_event_listener(&self, type_: &str, listener: &Function) -> Result<(), JsValue> {
		match EventType::from_name(type_) {
			Some(event_type) => {
				event::add_listener(&self.0.service, event_type, listener.clone().into());
				Ok(())
			}
			None => self
				.0
				.native_add_event_listener
				.call2(&self.0.global, &type_.into(), listener)
				.map(|_| ()),
		}
	}
}

/// Answers bootstrap fetches with the bridge document.
fn handle_fetch(service: &Service<MessagePort>, event: &FetchEvent) {
	let Some(document) = service.handle_fetch(&event.request().url()) else {
		return;
	};

	// Bridge URLs are ours even if responding fails.
	event.stop_immediate_propagation();

	let result = bridge_response(&document)
		.and_then(|response| event.respond_with(&Promise::resolve(&response)));

	if let Err(error) = result {
		console::warn_1(&format!("bridge document could not be served: {error:?}").into());
	}
}

/// Runs the protocol for our envelopes and leaves everything else alone.
fn handle_message(
	service: &Service<MessagePort>,
	event: &ExtendableMessageEvent,
) -> Result<(), JsValue> {
	let Some(envelope) = port::decode(service.config(), event) else {
		return Ok(());
	};

	event.stop_immediate_propagation();

	service
		.handle_envelope(envelope)
		.map(|_| ())
		.map_err(JsValue::from)
}

/// Builds the `200 text/html` [`Response`] for `document`.
fn bridge_response(document: &BridgeDocument) -> Result<Response, JsValue> {
	let headers = Headers::new()?;
	headers.set("content-type", BridgeDocument::CONTENT_TYPE)?;

	let init = ResponseInit::new();
	init.set_status(BridgeDocument::STATUS);
	init.set_headers(&headers);

	Response::new_with_opt_str_and_init(Some(document.body()), &init)
}
