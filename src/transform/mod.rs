pub mod messages;
pub mod options;
pub mod request;
pub mod response;

pub use messages::*;
pub use options::*;
pub use request::*;
pub use response::*;
