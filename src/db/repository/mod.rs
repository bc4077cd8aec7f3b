pub mod alert;
pub mod contact;
pub mod transport;

pub use alert::*;
pub use contact::*;
pub use transport::*;
