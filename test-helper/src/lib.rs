mod addr;
mod mock;

pub use addr::get_unused_addr;
pub use mock::{MockSearchServer, ReceivedRequest};
