pub mod http;
pub mod reliable;
pub mod tokens;

pub mod mock;

pub use http::{HttpGenerator, HttpGeneratorConfig};
pub use mock::{MockGenerator, MockResponse};
pub use reliable::{RetryConfig, RetryingGenerator};
