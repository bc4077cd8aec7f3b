pub mod alert;
pub mod contact;
pub mod context;
pub mod enums;
pub mod filters;
pub mod transport_config;

pub use alert::*;
pub use contact::*;
pub use context::*;
pub use enums::*;
pub use filters::*;
pub use transport_config::*;
