//! Client-side adapters for AskPix: the API client, its configuration and the
//! image cropper used while scanning.

pub mod config;
pub mod cropper;
pub mod error;
pub mod http;

pub use config::{ClientConfig, ConfigError};
pub use cropper::DataUriCropper;
pub use error::{ClientError, ClientResult};
pub use http::{ApiClient, SolutionUpdates};
