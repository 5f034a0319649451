/// Serialization format of the stored document. The store only checks that a
/// payload is well-formed; it never looks at the records inside.
pub trait DocumentFormat: Send + Sync {
    /// Short name used in logs and error messages.
    fn name(&self) -> &'static str;

    /// Reject payloads that do not parse in this format.
    fn validate(&self, document: &[u8]) -> Result<(), String>;

    /// Document returned when nothing has been saved yet.
    fn empty_document(&self) -> &'static [u8];
}

/// JSON documents; the empty document is an empty array.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct JsonFormat;

impl DocumentFormat for JsonFormat {
    fn name(&self) -> &'static str {
        "json"
    }

    fn validate(&self, document: &[u8]) -> Result<(), String> {
        serde_json::from_slice::<serde::de::IgnoredAny>(document)
            .map(|_| ())
            .map_err(|e| format!("invalid JSON data: {e}"))
    }

    fn empty_document(&self) -> &'static [u8] {
        b"[]"
    }
}
