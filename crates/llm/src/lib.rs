//! Concrete `ChatProvider` implementations for `conduit-runtime`.

pub mod providers;

pub use providers::OpenAiCompatibleProvider;
