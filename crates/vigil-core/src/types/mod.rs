mod analysis;
mod push;
mod recording;
mod session;
mod snapshot;
mod violation;

pub use analysis::*;
pub use push::*;
pub use recording::*;
pub use session::*;
pub use snapshot::*;
pub use violation::*;
