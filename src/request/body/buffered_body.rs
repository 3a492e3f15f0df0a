use bytes::Bytes;

/// The entire request body, fully buffered in memory.
///
/// The binder never streams: bodies are read up-front by the surrounding server
/// (which is where size limits belong) and handed over as a single buffer.
#[derive(Debug, Clone, Default)]
pub struct BufferedBody {
    pub bytes: Bytes,
}

impl BufferedBody {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

impl From<BufferedBody> for Bytes {
    fn from(body: BufferedBody) -> Self {
        body.bytes
    }
}
