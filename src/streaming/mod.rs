pub mod parser;
pub mod translator;

pub use parser::{SseEvent, SseLineParser};
pub use translator::{
    StreamMode, StreamTranslator, TranslatorState, collect_response, translate_stream,
};
