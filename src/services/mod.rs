pub mod backend_client;
pub mod classifier;
pub mod directory_writer;
pub mod harvester;
pub mod job_poller;
pub mod openai_client;
pub mod query_generator;
pub mod search_client;
pub mod search_orchestrator;

pub use backend_client::*;
pub use classifier::*;
pub use directory_writer::*;
pub use harvester::*;
pub use job_poller::*;
pub use openai_client::*;
pub use query_generator::*;
pub use search_client::*;
pub use search_orchestrator::*;
