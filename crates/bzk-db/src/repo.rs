//! Repository traits and implementations.

pub mod image;
pub mod job;
pub mod log;
pub mod project;
pub mod secret;

pub use image::{Image, ImageRepo, PgImageRepo};
pub use job::{JobRepo, PgJobRepo};
pub use log::{LogEntry, LogRepo, PgLogRepo};
pub use project::{PgProjectRepo, ProjectRepo};
pub use secret::{PgSecretRepo, SecretRepo};
