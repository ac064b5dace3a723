//! Wire constants and [`Service`] construction.

use std::borrow::Cow;

use crate::envelope::EnvelopeKind;
use crate::port::Port;
use crate::{Error, Service};

/// Key marking an envelope as a connect request.
pub const CONNECT_TAG: &str = "crossOriginConnect";

/// Key marking an envelope as a relayed message.
pub const MESSAGE_TAG: &str = "crossOriginMessage";

/// Query suffix identifying connection bootstrap fetches.
pub const URL_SUFFIX: &str = "?navigator-connect-service";

/// Wire configuration shared by the worker and the bridge document it
/// serves.
///
/// The bridge document is rendered from the same [`Config`] that decodes
/// inbound envelopes, so both ends always agree on the tags.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
	/// See [`Config::connect_tag()`].
	connect_tag: Cow<'static, str>,
	/// See [`Config::message_tag()`].
	message_tag: Cow<'static, str>,
	/// See [`Config::url_suffix()`].
	url_suffix: Cow<'static, str>,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			connect_tag: Cow::Borrowed(CONNECT_TAG),
			message_tag: Cow::Borrowed(MESSAGE_TAG),
			url_suffix: Cow::Borrowed(URL_SUFFIX),
		}
	}
}

impl Config {
	/// Key carrying the target URL of a connect request.
	#[must_use]
	pub fn connect_tag(&self) -> &str {
		&self.connect_tag
	}

	/// Key carrying the target URL of a relayed message.
	#[must_use]
	pub fn message_tag(&self) -> &str {
		&self.message_tag
	}

	/// Suffix marking bootstrap fetches.
	#[must_use]
	pub fn url_suffix(&self) -> &str {
		&self.url_suffix
	}

	/// Returns `true` if `url` should be answered with the bridge document.
	#[must_use]
	pub fn is_bridge_url(&self, url: &str) -> bool {
		url.ends_with(self.url_suffix())
	}

	/// Removes the bootstrap suffix from `url` if present.
	///
	/// `strip_suffix(url + suffix) == url` for every `url`.
	#[must_use]
	pub fn strip_suffix<'url>(&self, url: &'url str) -> &'url str {
		url.strip_suffix(self.url_suffix()).unwrap_or(url)
	}

	/// Determines which kind of envelope carries the given keys.
	///
	/// The connect tag takes precedence when both are present. Returns
	/// [`None`] for anything that isn't ours.
	pub fn classify<F>(&self, mut has_key: F) -> Option<EnvelopeKind>
	where
		F: FnMut(&str) -> bool,
	{
		if has_key(self.connect_tag()) {
			Some(EnvelopeKind::Connect)
		} else if has_key(self.message_tag()) {
			Some(EnvelopeKind::Message)
		} else {
			None
		}
	}
}

/// Builds a [`Service`] with a non-default [`Config`].
///
/// ```
/// # use navigator_connect::{memory::MemoryPort, Service, ServiceBuilder};
/// let service: Service<MemoryPort<()>> = ServiceBuilder::new()
/// 	.url_suffix("?bridge")
/// 	.build()
/// 	.unwrap();
/// assert!(service.handle_fetch("https://b.example/svc?bridge").is_some());
/// ```
#[derive(Clone, Debug, Default)]
#[must_use = "does nothing unless built"]
pub struct ServiceBuilder {
	/// The configuration being assembled.
	config: Config,
}

impl ServiceBuilder {
	/// Creates a [`ServiceBuilder`] with the default wire constants.
	pub fn new() -> Self {
		Self::default()
	}

	/// Overrides [`URL_SUFFIX`].
	pub fn url_suffix<S: Into<Cow<'static, str>>>(mut self, suffix: S) -> Self {
		self.config.url_suffix = suffix.into();
		self
	}

	/// Overrides [`CONNECT_TAG`].
	pub fn connect_tag<S: Into<Cow<'static, str>>>(mut self, tag: S) -> Self {
		self.config.connect_tag = tag.into();
		self
	}

	/// Overrides [`MESSAGE_TAG`].
	pub fn message_tag<S: Into<Cow<'static, str>>>(mut self, tag: S) -> Self {
		self.config.message_tag = tag.into();
		self
	}

	/// Validates the configuration and creates the [`Service`].
	///
	/// # Errors
	///
	/// If any constant is empty, or both tags are equal.
	pub fn build<P: Port>(self) -> Result<Service<P>, Error> {
		let config = self.config;

		if config.url_suffix.is_empty() {
			return Err(Error::InvalidConfig("URL suffix must not be empty"));
		}

		if config.connect_tag.is_empty() || config.message_tag.is_empty() {
			return Err(Error::InvalidConfig("envelope tags must not be empty"));
		}

		if config.connect_tag == config.message_tag {
			return Err(Error::InvalidConfig("envelope tags must differ"));
		}

		Ok(Service::with_config(config))
	}
}
