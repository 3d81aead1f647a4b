use futures::{Stream, StreamExt};
use tracing::{Span, debug, error, info};

use crate::backend::BackendStream;
use crate::error::{ProxyError, Result};
use crate::models::ollama::{
    ChatResponse, ErrorFrame, GenerateResponse, ResponseMessage, StreamFrame, TimingStats,
};
use crate::models::openai::Usage;
use crate::streaming::parser::{SseEvent, SseLineParser};
use crate::transform::iso_timestamp;

/// Which Ollama endpoint the frames are produced for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamMode {
    Chat,
    Generate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslatorState {
    Streaming,
    Done,
    Errored,
}

/// Converts OpenAI SSE chunks into Ollama NDJSON frames.
///
/// Every non-empty content delta becomes one incremental frame. The stream
/// ends with exactly one terminal frame: either the `done` frame (on `[DONE]`
/// or a clean EOF) or an error frame. Once terminal, further input is ignored.
///
/// The terminal chat frame carries empty content because clients already got
/// every delta. The terminal generate frame restates the full response.
pub struct StreamTranslator {
    mode: StreamMode,
    model: String,
    parser: SseLineParser,
    content: String,
    usage: Option<Usage>,
    state: TranslatorState,
}

impl StreamTranslator {
    pub fn new(mode: StreamMode, model: impl Into<String>) -> Self {
        Self {
            mode,
            model: model.into(),
            parser: SseLineParser::new(),
            content: String::new(),
            usage: None,
            state: TranslatorState::Streaming,
        }
    }

    pub fn state(&self) -> TranslatorState {
        self.state
    }

    /// Text accumulated so far
    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn usage(&self) -> Option<&Usage> {
        self.usage.as_ref()
    }

    /// Feed a chunk of the upstream body
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamFrame> {
        if self.state != TranslatorState::Streaming {
            return Vec::new();
        }
        let events = self.parser.feed(chunk);
        self.process(events)
    }

    /// The upstream closed cleanly
    pub fn finish(&mut self) -> Vec<StreamFrame> {
        if self.state != TranslatorState::Streaming {
            return Vec::new();
        }
        let events = self.parser.finish();
        let mut frames = self.process(events);
        if self.state == TranslatorState::Streaming {
            frames.push(self.complete());
        }
        frames
    }

    /// The upstream failed mid-stream
    pub fn fail(&mut self, err: &ProxyError) -> Option<StreamFrame> {
        if self.state != TranslatorState::Streaming {
            return None;
        }
        self.state = TranslatorState::Errored;
        Some(StreamFrame::Error(ErrorFrame {
            error: format!("Stream translation failed: {}", err),
            done: true,
        }))
    }

    fn process(&mut self, events: Vec<SseEvent>) -> Vec<StreamFrame> {
        let mut frames = Vec::new();

        for event in events {
            match event {
                SseEvent::Done => {
                    frames.push(self.complete());
                    break;
                }
                SseEvent::Chunk(chunk) => {
                    if let Some(usage) = chunk.usage {
                        if self.usage.is_none() {
                            self.usage = Some(usage);
                        } else {
                            debug!("Ignoring repeated usage event");
                        }
                        continue;
                    }

                    if let Some(delta) = chunk.delta_content().filter(|d| !d.is_empty()) {
                        self.content.push_str(delta);
                        let frame = self.delta_frame(delta);
                        debug!(?frame, "Streaming chunk");
                        frames.push(frame);
                    }
                }
            }
        }

        frames
    }

    fn delta_frame(&self, delta: &str) -> StreamFrame {
        let created_at = iso_timestamp();
        match self.mode {
            StreamMode::Chat => StreamFrame::Chat(ChatResponse {
                model: self.model.clone(),
                created_at,
                message: ResponseMessage::assistant(delta),
                done: false,
                stats: TimingStats::default(),
            }),
            StreamMode::Generate => StreamFrame::Generate(GenerateResponse {
                model: self.model.clone(),
                created_at,
                response: delta.to_string(),
                done: false,
                context: None,
                stats: TimingStats::default(),
            }),
        }
    }

    fn complete(&mut self) -> StreamFrame {
        self.state = TranslatorState::Done;

        let created_at = iso_timestamp();
        let stats = self.usage.as_ref().map(TimingStats::from).unwrap_or_default();
        match self.mode {
            StreamMode::Chat => StreamFrame::Chat(ChatResponse {
                model: self.model.clone(),
                created_at,
                message: ResponseMessage::assistant(""),
                done: true,
                stats,
            }),
            StreamMode::Generate => StreamFrame::Generate(GenerateResponse {
                model: self.model.clone(),
                created_at,
                response: self.content.clone(),
                done: true,
                context: Some(Vec::new()),
                stats,
            }),
        }
    }
}

/// Lazily translate an upstream body into Ollama frames.
///
/// The returned stream owns `upstream`; it is dropped as soon as a terminal
/// frame has been produced, or when the consumer drops the stream (client
/// disconnect), whichever comes first.
///
/// The stream is polled by the connection task after the handler returned, so
/// the span current at call time is re-entered for every step it logs in.
pub fn translate_stream(
    upstream: BackendStream,
    mode: StreamMode,
    model: String,
) -> impl Stream<Item = StreamFrame> + Send + 'static {
    let span = Span::current();

    async_stream::stream! {
        let mut upstream = upstream;
        let mut translator = StreamTranslator::new(mode, model);
        let mut emitted = 0usize;

        while translator.state() == TranslatorState::Streaming {
            let next = upstream.next().await;
            let frames = span.in_scope(|| match next {
                Some(Ok(chunk)) => translator.feed(&chunk),
                Some(Err(e)) => {
                    error!("Stream translation failed: {}", e);
                    translator.fail(&e).into_iter().collect()
                }
                None => translator.finish(),
            });
            for frame in frames {
                emitted += 1;
                yield frame;
            }
        }

        drop(upstream);
        span.in_scope(|| match translator.state() {
            TranslatorState::Done => info!(
                frames = emitted,
                chars = translator.content().len(),
                "Stream completed. Sent final 'done' chunk."
            ),
            _ => info!(frames = emitted, "Stream ended with an error frame"),
        });
    }
}

/// Drain a translated stream and return a single final response.
///
/// Incremental frames are discarded after their text is accumulated; the
/// returned frame is the terminal one with the full text as its content.
pub async fn collect_response<S>(frames: S) -> Result<StreamFrame>
where
    S: Stream<Item = StreamFrame>,
{
    let mut frames = std::pin::pin!(frames);
    let mut text = String::new();

    while let Some(frame) = frames.next().await {
        match frame {
            StreamFrame::Error(frame) => return Err(ProxyError::StreamFault(frame.error)),
            StreamFrame::Chat(mut frame) if frame.done => {
                frame.message.content = text;
                return Ok(StreamFrame::Chat(frame));
            }
            StreamFrame::Generate(mut frame) if frame.done => {
                frame.response = text;
                return Ok(StreamFrame::Generate(frame));
            }
            frame => text.push_str(frame.text()),
        }
    }

    Err(ProxyError::StreamFault(
        "stream ended without a final frame".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const STREAM: &str = concat!(
        "data: {\"id\":\"1\",\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
        "data: {\"id\":\"2\",\"choices\":[{\"delta\":{\"content\":\"There are\"}}]}\n\n",
        "data: {\"id\":\"3\",\"choices\":[{\"delta\":{\"content\":\" two dogs.\"}}]}\n\n",
        "data: {\"id\":\"4\",\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n",
        "data: [DONE]\n\n",
    );

    #[test]
    fn test_generate_frames() {
        let mut translator = StreamTranslator::new(StreamMode::Generate, "m");
        let frames = translator.feed(STREAM.as_bytes());

        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].text(), "There are");
        assert_eq!(frames[1].text(), " two dogs.");
        assert!(!frames[0].is_done() && !frames[1].is_done());
        assert!(frames[2].is_done());
        assert_eq!(frames[2].text(), "There are two dogs.");
        assert_eq!(translator.state(), TranslatorState::Done);
    }

    #[test]
    fn test_chat_terminal_frame_is_empty() {
        let mut translator = StreamTranslator::new(StreamMode::Chat, "m");
        let frames = translator.feed(STREAM.as_bytes());

        assert_eq!(frames.len(), 3);
        assert_eq!(frames[2].text(), "");
        assert!(frames[2].is_done());
        assert_eq!(translator.content(), "There are two dogs.");
    }

    #[test]
    fn test_input_after_done_ignored() {
        let mut translator = StreamTranslator::new(StreamMode::Chat, "m");
        translator.feed(b"data: [DONE]\n");

        let late = translator.feed(b"data: {\"choices\":[{\"delta\":{\"content\":\"x\"}}]}\n");
        assert!(late.is_empty());
        assert!(translator.finish().is_empty());
        assert!(translator.fail(&ProxyError::StreamFault("late".into())).is_none());
    }

    #[test]
    fn test_usage_event_produces_no_frame() {
        let mut translator = StreamTranslator::new(StreamMode::Generate, "m");
        let frames = translator.feed(
            b"data: {\"choices\":[],\"usage\":{\"prompt_tokens\":7,\"completion_tokens\":3}}\n",
        );
        assert!(frames.is_empty());

        let frames = translator.finish();
        assert_eq!(frames.len(), 1);
        match &frames[0] {
            StreamFrame::Generate(frame) => {
                assert_eq!(frame.stats.prompt_eval_count, Some(7));
                assert_eq!(frame.stats.eval_count, Some(3));
                assert_eq!(frame.context, Some(vec![]));
            }
            other => panic!("Expected generate frame, got {:?}", other),
        }
    }

    #[test]
    fn test_fail_emits_single_error_frame() {
        let mut translator = StreamTranslator::new(StreamMode::Chat, "m");
        let frame = translator
            .fail(&ProxyError::StreamFault("connection reset".into()))
            .unwrap();

        assert_eq!(
            frame,
            StreamFrame::Error(ErrorFrame {
                error: "Stream translation failed: connection reset".to_string(),
                done: true,
            })
        );
        assert_eq!(translator.state(), TranslatorState::Errored);
        assert!(translator.finish().is_empty());
    }
}
