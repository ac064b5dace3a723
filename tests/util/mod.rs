#![allow(dead_code, unreachable_pub)]

use std::cell::RefCell;
use std::fmt::Debug;
use std::rc::Rc;

use navigator_connect::bridge::BridgeClient;
use navigator_connect::memory::{self, MemoryHost, MemoryPort, Packet};
use navigator_connect::{ConnectEnvelope, Envelope, Error, Outcome, Service};

/// Bootstrap URL the page loads.
pub const TARGET: &str = "https://b.example/svc?navigator-connect-service";
/// [`TARGET`] without the suffix.
pub const STRIPPED: &str = "https://b.example/svc";
/// Origin of the connecting page.
pub const ORIGIN: &str = "https://a.example";

/// Payload used throughout the tests, standing in for `{hello: 1}`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Hello(pub u32);

pub type Port = MemoryPort<Hello>;

pub fn init_tracing() {
	#[cfg(not(target_family = "wasm"))]
	{
		let _ = tracing_subscriber::fmt()
			.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
			.with_test_writer()
			.try_init();
	}
}

/// Collects whatever listeners observed.
pub fn recorder<T>() -> Rc<RefCell<Vec<T>>> {
	Rc::new(RefCell::new(Vec::new()))
}

/// A connect envelope for [`TARGET`] from [`ORIGIN`], and the page's end of
/// its reply channel.
pub fn connect_envelope() -> (Envelope<Port>, Port) {
	let (page, worker) = memory::channel();

	(
		Envelope::Connect(ConnectEnvelope {
			target_url: TARGET.to_owned(),
			origin: ORIGIN.to_owned(),
			port: worker,
		}),
		page,
	)
}

/// Hands every envelope waiting at `controller` to `service`.
pub fn pump<V: Debug + 'static>(
	service: &Service<MemoryPort<V>>,
	controller: &MemoryPort<V>,
) -> Vec<Result<Outcome, Error>> {
	let mut outcomes = Vec::new();

	while let Some(packet) = controller.recv() {
		match packet {
			Packet::Envelope(envelope) => outcomes.push(service.handle_envelope(envelope)),
			packet => panic!("unexpected packet at the controller: {packet:?}"),
		}
	}

	outcomes
}

/// A page at [`ORIGIN`], the bridge document it framed and the worker behind
/// it.
pub struct Harness {
	pub service: Service<Port>,
	/// The worker's end of the controller channel.
	pub controller: Port,
	pub bridge: BridgeClient<MemoryHost<Hello>>,
	/// The page's end of the channel it posted `{connect}` with.
	pub page: Port,
	/// The bridge's end of that channel.
	pub requester: Port,
}

impl Harness {
	pub fn new() -> Self {
		init_tracing();

		let (controller, bridge_controller) = memory::channel();
		let (page, requester) = memory::channel();

		Self {
			service: Service::new(),
			controller,
			bridge: BridgeClient::new(MemoryHost::new(bridge_controller), TARGET),
			page,
			requester,
		}
	}

	/// Runs the connect phase and returns what the page was handed.
	pub fn connect(&mut self) -> Option<Port> {
		self.bridge.connect(self.requester.clone(), ORIGIN).unwrap();

		for outcome in pump(&self.service, &self.controller) {
			outcome.unwrap();
		}

		let reply = self.bridge.service_port().unwrap().recv();
		let Some(Packet::ConnectResult(connect_result)) = reply else {
			panic!("expected `{{connectResult}}`, got {reply:?}");
		};
		self.bridge.on_service_reply(connect_result).unwrap();

		let handoff = self.page.recv();
		let Some(Packet::Handoff(connected)) = handoff else {
			panic!("expected `{{connected}}`, got {handoff:?}");
		};
		assert_eq!(self.page.pending(), 0);

		connected
	}
}
