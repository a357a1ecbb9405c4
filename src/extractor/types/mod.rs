mod media;
mod task;

pub use media::{EpisodeLink, ExtractionResult, MediaType, ServerLink};
pub use task::{ChainTask, CloneOutcome, CloneStatus, TaskStatus};
