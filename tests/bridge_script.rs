//! Runs the served bridge script against real `MessageChannel`s.

#![cfg(all(target_family = "wasm", target_os = "unknown"))]

use js_sys::{Array, Function, Object, Promise, Reflect};
use navigator_connect::memory::MemoryPort;
use navigator_connect::{Service, CONNECT_TAG, MESSAGE_TAG};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};
use web_sys::{MessageChannel, MessageEvent, MessagePort};

wasm_bindgen_test_configure!(run_in_browser);

/// URL the bridge document was loaded from.
const TARGET: &str = "https://b.example/svc?navigator-connect-service";
/// Origin of the page framing the bridge.
const ORIGIN: &str = "https://a.example";

/// The script of a freshly served bridge document, running with a stub
/// `window`, `document` and service worker controller.
struct Bridge {
	/// Stands in for the bridge's `window`.
	window: Object,
	/// Resolves with the next `{data, transfer}` posted to the controller.
	next: Function,
}

impl Bridge {
	fn load() -> Self {
		let body = Service::<MemoryPort<()>>::new()
			.handle_fetch(TARGET)
			.unwrap()
			.into_body();
		let script = body
			.strip_prefix("<!DOCTYPE html><script>")
			.and_then(|body| body.strip_suffix("</script>"))
			.unwrap();

		let harness = Function::new_with_args(
			"script, href",
			"const posted = [];
			const waiting = [];
			const controller = {
				postMessage(data, transfer) {
					const entry = { data, transfer };

					if (waiting.length) {
						waiting.shift()(entry);
					} else {
						posted.push(entry);
					}
				},
			};
			const window = {};

			new Function('window', 'document', 'navigator', script)(
				window,
				{ location: { href } },
				{ serviceWorker: { controller } },
			);

			return {
				window,
				next() {
					return posted.length
						? Promise.resolve(posted.shift())
						: new Promise(resolve => waiting.push(resolve));
				},
			};",
		)
		.call2(&JsValue::UNDEFINED, &script.into(), &TARGET.into())
		.unwrap();

		Self {
			window: field(&harness, "window").unchecked_into(),
			next: field(&harness, "next").unchecked_into(),
		}
	}

	/// The framing page posts `{connect: port}` to the bridge.
	fn connect(&self, port: &MessagePort) {
		let data = Object::new();
		Reflect::set(&data, &"connect".into(), port).unwrap();

		let event = Object::new();
		Reflect::set(&event, &"data".into(), &data).unwrap();
		Reflect::set(&event, &"origin".into(), &ORIGIN.into()).unwrap();

		let onmessage: Function = field(&self.window, "onmessage").unchecked_into();
		onmessage.call1(&self.window, &event).unwrap();
	}

	/// Awaits the next envelope posted to the worker and its transfer list.
	async fn next(&self) -> (JsValue, Array) {
		let promise: Promise = self.next.call0(&JsValue::UNDEFINED).unwrap().unchecked_into();
		let entry = JsFuture::from(promise).await.unwrap();

		(
			field(&entry, "data"),
			field(&entry, "transfer").unchecked_into(),
		)
	}
}

fn field(object: &JsValue, key: &str) -> JsValue {
	Reflect::get(object, &key.into()).unwrap()
}

async fn recv(port: &MessagePort) -> MessageEvent {
	let promise = Promise::new(&mut |resolve, _| port.set_onmessage(Some(&resolve)));
	let event = JsFuture::from(promise).await.unwrap().unchecked_into();
	port.set_onmessage(None);

	event
}

/// Posts `{connectResult: accepted}` on the service port of `envelope`.
fn reply(envelope: &JsValue, accepted: bool) {
	let service: MessagePort = field(envelope, "port").unchecked_into();

	let reply = Object::new();
	Reflect::set(&reply, &"connectResult".into(), &accepted.into()).unwrap();
	service.post_message(&reply).unwrap();
}

/// Connect, handoff, relay of a message and of its reply.
#[wasm_bindgen_test]
async fn accepted() {
	console_error_panic_hook::set_once();

	let bridge = Bridge::load();
	let page = MessageChannel::new().unwrap();
	bridge.connect(&page.port2());

	let (envelope, transfer) = bridge.next().await;
	assert_eq!(
		field(&envelope, CONNECT_TAG).as_string().as_deref(),
		Some(TARGET)
	);
	assert_eq!(
		field(&envelope, "origin").as_string().as_deref(),
		Some(ORIGIN)
	);
	assert_eq!(transfer.length(), 1);
	assert_eq!(transfer.get(0), field(&envelope, "port"));

	reply(&envelope, true);

	let handoff = recv(&page.port1()).await;
	let connected: MessagePort = field(&handoff.data(), "connected").dyn_into().unwrap();

	let extra = MessageChannel::new().unwrap();
	connected
		.post_message_with_transferable(&"hello".into(), &Array::of1(&extra.port2()))
		.unwrap();

	let (envelope, transfer) = bridge.next().await;
	assert_eq!(
		field(&envelope, MESSAGE_TAG).as_string().as_deref(),
		Some(TARGET)
	);
	// Recorded at connect time, the client channel carries no origin.
	assert_eq!(
		field(&envelope, "origin").as_string().as_deref(),
		Some(ORIGIN)
	);
	assert_eq!(field(&envelope, "data").as_string().as_deref(), Some("hello"));
	assert_eq!(transfer.length(), 2);
	assert_eq!(transfer.get(0), field(&envelope, "port"));

	let relay: MessagePort = field(&envelope, "port").unchecked_into();
	let answer = MessageChannel::new().unwrap();
	relay
		.post_message_with_transferable(&"world".into(), &Array::of1(&answer.port2()))
		.unwrap();

	let forwarded = recv(&connected).await;
	assert_eq!(forwarded.data().as_string().as_deref(), Some("world"));
	assert_eq!(forwarded.ports().length(), 1);
}

#[wasm_bindgen_test]
async fn rejected() {
	console_error_panic_hook::set_once();

	let bridge = Bridge::load();
	let page = MessageChannel::new().unwrap();
	bridge.connect(&page.port2());

	let (envelope, _) = bridge.next().await;
	reply(&envelope, false);

	let handoff = recv(&page.port1()).await;
	assert_eq!(field(&handoff.data(), "connected").as_bool(), Some(false));
	assert_eq!(handoff.ports().length(), 0);
}

/// Window messages without `connect` are ignored.
#[wasm_bindgen_test]
async fn ignores_other_messages() {
	let bridge = Bridge::load();
	let onmessage: Function = field(&bridge.window, "onmessage").unchecked_into();

	for data in [JsValue::NULL, "connect".into(), Object::new().into()] {
		let event = Object::new();
		Reflect::set(&event, &"data".into(), &data).unwrap();
		Reflect::set(&event, &"origin".into(), &ORIGIN.into()).unwrap();
		onmessage.call1(&bridge.window, &event).unwrap();
	}

	// A real connect is still handled.
	let page = MessageChannel::new().unwrap();
	bridge.connect(&page.port2());
	let (envelope, _) = bridge.next().await;
	assert!(Reflect::has(&envelope, &CONNECT_TAG.into()).unwrap());
}
