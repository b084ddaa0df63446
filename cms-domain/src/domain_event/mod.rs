mod event;
mod metadata;

pub use event::Event;
pub use metadata::EventMetadata;
