pub mod audio;
pub mod live;
pub mod search;

// Re-export commonly used items for convenience
pub use audio::{
    AudioError, AudioFrame, AudioResult, AudioSink, NullSink, PlaybackQueue, PlayingStateCallback,
};
pub use live::{
    GeminiLive, LiveConfig, LiveError, LiveResult, MessageCallback, ReconnectionConfig,
    SessionState, SetupCompleteCallback,
};
pub use search::{
    BaseSearch, Citation, CitationsCallback, ImageResult, ImagesCallback, SearchDispatcher,
    SearchEngine, SearchError, SearchResponse, SearchResult,
};
