//! Systems and Datastreams
//!
//! Domain handles over server resources. Both wrap a `StreamableResource`
//! and therefore implement `Streamable`; both keep their parent `Node` for
//! REST calls.

mod datastream;
mod system;

pub use datastream::Datastream;
pub use system::System;
