pub mod classification;
pub mod job;
pub mod search;
pub mod search_state;
pub mod taxonomy;

pub use classification::*;
pub use job::*;
pub use search::*;
pub use search_state::*;
pub use taxonomy::*;
