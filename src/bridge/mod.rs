//! The bridge document and the page side of the protocol.
//!
//! A page at origin A loads `<worker scope URL>?navigator-connect-service`
//! in a frame. The worker answers with [`BridgeDocument`], whose script then
//! connects the page to the worker:
//!
//! 1. The page posts `{connect: port}` to the frame. The bridge posts a
//!    connect envelope to the worker and waits for `{connectResult}`
//!    ([`BridgePhase::AwaitingServiceReply`]).
//! 2. On rejection it posts `{connected: false}` back to the page and stops
//!    ([`BridgePhase::Rejected`]). Otherwise it creates a client channel and
//!    posts `{connected: port}` ([`BridgePhase::Connected`]).
//! 3. Every message on the client channel is forwarded to the worker as a
//!    message envelope with its own reply channel, and everything arriving on
//!    that reply channel goes back to the page
//!    ([`BridgePhase::RelayingMessage`]).
//!
//! [`BridgeClient`] is the same state machine in Rust.

mod client;

use std::fmt::Write;

pub use self::client::{BridgeClient, BridgePhase, MessageRelay};
use crate::config::Config;

/// Inline script of the bridge document.
const SCRIPT: &str = include_str!("script.js");

/// Synthetic response served for bootstrap fetches.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BridgeDocument {
	/// See [`BridgeDocument::body()`].
	body: String,
}

impl BridgeDocument {
	/// HTTP status of every bridge response.
	pub const STATUS: u16 = 200;

	/// `content-type` of every bridge response.
	pub const CONTENT_TYPE: &'static str = "text/html";

	/// Renders the document for `config`.
	///
	/// The output only depends on `config`.
	#[must_use]
	pub fn render(config: &Config) -> Self {
		let connect_tag = js_string(config.connect_tag());
		let message_tag = js_string(config.message_tag());

		// Substituted text is never scanned for placeholders again.
		let script = SCRIPT
			.split("__CONNECT_TAG__")
			.map(|piece| piece.replace("__MESSAGE_TAG__", &message_tag))
			.collect::<Vec<_>>()
			.join(connect_tag.as_str());

		Self {
			body: format!("<!DOCTYPE html><script>{script}</script>"),
		}
	}

	/// HTML source.
	#[must_use]
	pub fn body(&self) -> &str {
		&self.body
	}

	/// Converts into the HTML source.
	#[must_use]
	#[allow(clippy::missing_const_for_fn)]
	pub fn into_body(self) -> String {
		self.body
	}
}

/// Quotes `value` as a JavaScript string literal that is safe inside an
/// inline `<script>`.
fn js_string(value: &str) -> String {
	let mut literal = String::with_capacity(value.len() + 2);
	literal.push('"');

	for character in value.chars() {
		match character {
			'"' => literal.push_str("\\\""),
			'\\' => literal.push_str("\\\\"),
			'\n' => literal.push_str("\\n"),
			'\r' => literal.push_str("\\r"),
			'<' | '>' | '&' | '\u{2028}' | '\u{2029}' => {
				write!(literal, "\\u{:04x}", u32::from(character))
					.unwrap_or_else(|_| unreachable!("writing to a `String` can't fail"));
			}
			character if character.is_control() => {
				write!(literal, "\\u{:04x}", u32::from(character))
					.unwrap_or_else(|_| unreachable!("writing to a `String` can't fail"));
			}
			character => literal.push(character),
		}
	}

	literal.push('"');
	literal
}

#[cfg(test)]
mod tests {
	#[cfg(target_family = "wasm")]
	use wasm_bindgen_test::wasm_bindgen_test;

	use super::js_string;

	#[cfg_attr(not(target_family = "wasm"), test)]
	#[cfg_attr(target_family = "wasm", wasm_bindgen_test)]
	fn js_string_escapes() {
		assert_eq!(js_string("crossOriginConnect"), "\"crossOriginConnect\"");
		assert_eq!(js_string("a\"b\\c"), "\"a\\\"b\\\\c\"");
		assert_eq!(js_string("</script>"), "\"\\u003c/script\\u003e\"");
		assert_eq!(js_string("\u{1}"), "\"\\u0001\"");
	}
}
