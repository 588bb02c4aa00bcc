mod openai_compatible;
mod sse;
mod translate;

pub use openai_compatible::OpenAiCompatibleProvider;
