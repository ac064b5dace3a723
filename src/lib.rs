//! # Description
//!
//! Lets a page at one origin connect to the service worker of another
//! origin, which doesn't control the page, by emulating cross-origin connect
//! on top of what browsers already ship: fetch interception, a bridge
//! document loaded in a frame, [`MessageChannel`]s and `postMessage()`.
//!
//! The worker answers fetches ending in [`URL_SUFFIX`] with a
//! [`BridgeDocument`](bridge::BridgeDocument). Its script forwards the page's
//! connect request to the worker, which asks its `crossoriginconnect`
//! listeners to accept or reject it. Once accepted, messages flow both ways
//! through `crossoriginmessage` listeners and [`Client::post_message()`].
//!
//! # Usage
//!
//! In a service worker, [`web::install()`] hooks everything up; listeners can
//! then be added from JavaScript with `self.addEventListener()` or from Rust:
//!
//! ```ignore
//! let worker = navigator_connect::web::install()?;
//! worker.service().add_connect_listener(|event| {
//! 	let trusted = event.client().origin() == "https://a.example";
//! 	event.accept_connection(trusted)?;
//! 	Ok(())
//! });
//! worker.service().add_message_listener(|event| {
//! 	event.source().post_message(event.data().clone(), Vec::new())?;
//! 	Ok(())
//! });
//! ```
//!
//! The protocol itself is host independent. [`memory`] runs it in-process:
//!
//! ```
//! # use navigator_connect::{Envelope, ConnectEnvelope, Service};
//! # use navigator_connect::memory::{self, Packet};
//! let service = Service::new();
//! service.add_connect_listener(|event| {
//! 	event.accept_connection(true)?;
//! 	Ok(())
//! });
//!
//! let (page, worker) = memory::channel::<()>();
//! service
//! 	.handle_envelope(Envelope::Connect(ConnectEnvelope {
//! 		target_url: "https://b.example/svc?navigator-connect-service".to_owned(),
//! 		origin: "https://a.example".to_owned(),
//! 		port: worker,
//! 	}))
//! 	.unwrap();
//!
//! assert!(matches!(page.recv(), Some(Packet::ConnectResult(true))));
//! ```
//!
//! # Limitations
//!
//! Listeners can't be removed, and the event records are not real DOM
//! events. Only [`MessagePort`]s can be transferred through
//! [`Client::post_message()`].
//!
//! [`MessageChannel`]: https://developer.mozilla.org/en-US/docs/Web/API/MessageChannel
//! [`MessagePort`]: https://developer.mozilla.org/en-US/docs/Web/API/MessagePort

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod bridge;
mod config;
mod envelope;
mod error;
mod event;
pub mod handshake;
pub mod memory;
mod port;
mod registry;
mod relay;
mod service;
#[cfg(all(target_family = "wasm", target_os = "unknown"))]
pub mod web;

pub use self::config::{Config, ServiceBuilder, CONNECT_TAG, MESSAGE_TAG, URL_SUFFIX};
pub use self::envelope::{ConnectEnvelope, Envelope, EnvelopeKind, MessageEnvelope};
pub use self::error::Error;
pub use self::event::{Client, ConnectEvent, MessageEvent};
pub use self::port::{BridgeHost, Port};
pub use self::registry::{EventType, ListenerResult, Registry};
pub use self::service::{Outcome, Service};
