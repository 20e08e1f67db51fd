//! Capped, shareable capture buffer for one output stream

use std::sync::Arc;

use tokio::sync::Mutex;

#[derive(Debug)]
struct BufferState {
    data: Vec<u8>,
    limit: usize,
    truncated: bool,
}

/// Bytes captured from a child's stdout or stderr.
///
/// Cloning shares the underlying buffer, so a reader task can append while a
/// job snapshot reads. Bytes past `limit` are dropped and flagged.
#[derive(Debug, Clone)]
pub struct OutputBuffer {
    inner: Arc<Mutex<BufferState>>,
}

impl OutputBuffer {
    pub fn new(limit: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(BufferState {
                data: Vec::new(),
                limit,
                truncated: false,
            })),
        }
    }

    /// Append a chunk, keeping at most `limit` bytes overall
    pub async fn append(&self, chunk: &[u8]) {
        let mut state = self.inner.lock().await;
        let room = state.limit.saturating_sub(state.data.len());
        if chunk.len() > room {
            state.truncated = true;
        }
        let take = chunk.len().min(room);
        state.data.extend_from_slice(&chunk[..take]);
    }

    /// Captured bytes as (lossy UTF-8 text, truncated flag)
    pub async fn text(&self) -> (String, bool) {
        let state = self.inner.lock().await;
        (
            String::from_utf8_lossy(&state.data).into_owned(),
            state.truncated,
        )
    }
}
