pub mod sandbox;
pub mod stub_server;

pub use sandbox::Sandbox;
pub use stub_server::{RecordedRequest, StubResponse, StubServer};
