//! Adapters that touch the outside world: files, the identity toolkit REST
//! API and the local speech program.

pub mod command_speech;
pub mod config_service;
pub mod identity_toolkit;
pub mod paths;
pub mod secret_service;

pub use command_speech::CommandSpeechSynthesizer;
pub use config_service::ConfigService;
pub use identity_toolkit::RestIdentityProvider;
pub use paths::{EquilibriaPaths, PathError};
pub use secret_service::{EnvOverrides, SecretServiceImpl};
