//! Request handlers.

pub mod cache;
pub mod download;
pub mod health;
pub mod jobs;
pub mod scan;

pub use cache::*;
pub use download::*;
pub use health::*;
pub use jobs::*;
pub use scan::*;
