//! The uploaded-file collaborator boundary.
//!
//! Multipart parsing is out of scope for the binder: a [`FileSource`] implementation
//! (backed by whatever multipart machinery the surrounding server uses) resolves a
//! field key to an already-extracted [`UploadedFile`] handle.

/// An uploaded-file handle, as resolved by the request's [`FileSource`].
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct UploadedFile {
    /// The file name supplied by the client.
    pub file_name: String,
    /// The size of the uploaded payload, in bytes.
    pub size: u64,
    /// The part's `Content-Type`, when the client sent one.
    pub content_type: Option<String>,
}

/// Resolves a field key to an uploaded file.
///
/// The binder consults the source for `file_name`-tagged fields (or, for untagged
/// file fields, under the field's own name). An absent file leaves the field unset;
/// it is never an error.
pub trait FileSource {
    fn file(&self, key: &str) -> Option<UploadedFile>;
}
