pub mod store;
pub mod transport;

pub use store::{Collection, Phase, Record, Snapshot, StudyStore};
pub use transport::{ClientError, HttpTransport, Method, Transport};
