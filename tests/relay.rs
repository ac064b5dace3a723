//! Tests the worker side of the message phase.

mod util;

use std::rc::Rc;

use navigator_connect::memory::{self, Packet};
use navigator_connect::{Envelope, Error, MessageEnvelope, Outcome, Service};
#[cfg(target_family = "wasm")]
use wasm_bindgen_test::wasm_bindgen_test;

use self::util::{Hello, Port};

/// A message envelope as the bridge posts it: the reply port first in the
/// transfer list, followed by `extra`. Returns the page's end of the reply
/// channel.
fn message_envelope(data: Hello, extra: Vec<Port>) -> (Envelope<Port>, Port) {
	let (page, worker) = memory::channel();
	let mut ports = vec![worker.clone()];
	ports.extend(extra);

	(
		Envelope::Message(MessageEnvelope {
			target_url: util::TARGET.to_owned(),
			origin: util::ORIGIN.to_owned(),
			data,
			port: worker,
			ports,
		}),
		page,
	)
}

#[cfg_attr(not(target_family = "wasm"), test)]
#[cfg_attr(target_family = "wasm", wasm_bindgen_test)]
fn dispatch() {
	util::init_tracing();

	let service = Service::<Port>::new();
	let seen = util::recorder();

	service.add_message_listener({
		let seen = Rc::clone(&seen);
		move |event| {
			let source = event.source();
			seen.borrow_mut().push((
				event.data().clone(),
				source.origin().to_owned(),
				source.target_url().to_owned(),
				event.ports().len(),
			));
			Ok(())
		}
	});

	let (envelope, page) = message_envelope(Hello(1), Vec::new());
	let outcome = service.handle_envelope(envelope).unwrap();

	assert_eq!(outcome, Outcome::Message);
	assert_eq!(
		*seen.borrow(),
		[(
			Hello(1),
			util::ORIGIN.to_owned(),
			util::STRIPPED.to_owned(),
			0
		)]
	);
	// Nothing is posted back on our own.
	assert_eq!(page.pending(), 0);
}

/// The reply port is the source's port, not one of the transferred ports.
#[cfg_attr(not(target_family = "wasm"), test)]
#[cfg_attr(target_family = "wasm", wasm_bindgen_test)]
fn transferred_ports() {
	let service = Service::<Port>::new();
	let (extra, extra_remote) = memory::channel();
	let checked = util::recorder();

	service.add_message_listener({
		let checked = Rc::clone(&checked);
		let extra = extra.clone();
		move |event| {
			let reply = event.source().port().cloned();
			checked.borrow_mut().push(event.ports() == [extra.clone()]);
			checked
				.borrow_mut()
				.push(reply.map_or(false, |reply| !event.ports().contains(&reply)));
			Ok(())
		}
	});

	let (envelope, _page) = message_envelope(Hello(2), vec![extra]);
	service.handle_envelope(envelope).unwrap();

	assert_eq!(*checked.borrow(), [true, true]);
	assert_eq!(extra_remote.pending(), 0);
}

/// The first listener taking the ports leaves none for the next one.
#[cfg_attr(not(target_family = "wasm"), test)]
#[cfg_attr(target_family = "wasm", wasm_bindgen_test)]
fn take_ports() {
	let service = Service::<Port>::new();
	let counts = util::recorder();

	for _ in 0..2 {
		let counts = Rc::clone(&counts);
		service.add_message_listener(move |event| {
			counts.borrow_mut().push(event.take_ports().len());
			Ok(())
		});
	}

	let (extra, _) = memory::channel();
	let (envelope, _page) = message_envelope(Hello(3), vec![extra]);
	service.handle_envelope(envelope).unwrap();

	assert_eq!(*counts.borrow(), [1, 0]);
}

/// Replies posted to the source reach the page.
#[cfg_attr(not(target_family = "wasm"), test)]
#[cfg_attr(target_family = "wasm", wasm_bindgen_test)]
fn reply() {
	let service = Service::<Port>::new();
	service.add_message_listener(|event| {
		let Hello(value) = *event.data();
		let (extra, _) = memory::channel();
		event
			.source()
			.post_message(Hello(value + 1), vec![extra])?;
		Ok(())
	});

	let (envelope, page) = message_envelope(Hello(41), Vec::new());
	service.handle_envelope(envelope).unwrap();

	let Some(Packet::Data { data, ports }) = page.recv() else {
		panic!("expected a reply")
	};
	assert_eq!(data, Hello(42));
	assert_eq!(ports.len(), 1);
	assert_eq!(page.pending(), 0);
}

/// Sources stay usable after the dispatch.
#[cfg_attr(not(target_family = "wasm"), test)]
#[cfg_attr(target_family = "wasm", wasm_bindgen_test)]
fn retained_source() {
	let service = Service::<Port>::new();
	let sources = util::recorder();

	service.add_message_listener({
		let sources = Rc::clone(&sources);
		move |event| {
			sources.borrow_mut().push(event.source().clone());
			Ok(())
		}
	});

	let (envelope, page) = message_envelope(Hello(0), Vec::new());
	service.handle_envelope(envelope).unwrap();

	let source = sources.borrow_mut().pop().unwrap();
	source.post_message(Hello(7), Vec::new()).unwrap();

	assert!(matches!(
		page.recv(),
		Some(Packet::Data { data: Hello(7), .. })
	));
}

#[cfg_attr(not(target_family = "wasm"), test)]
#[cfg_attr(target_family = "wasm", wasm_bindgen_test)]
fn listener_error() {
	let service = Service::<Port>::new();
	let calls = util::recorder();

	service.add_message_listener(|_| Err("malformed".into()));
	service.add_message_listener({
		let calls = Rc::clone(&calls);
		move |_| {
			calls.borrow_mut().push(());
			Ok(())
		}
	});

	let (envelope, page) = message_envelope(Hello(0), Vec::new());
	let error = service.handle_envelope(envelope).unwrap_err();

	assert!(matches!(error, Error::Listener { index: 0, .. }));
	assert!(calls.borrow().is_empty());
	assert_eq!(page.pending(), 0);
}
