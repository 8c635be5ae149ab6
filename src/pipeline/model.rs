//! Data flowing through the pipeline.

/// A downloadable resource found by a search.
///
/// `title` is a display name only; it is neither unique nor filesystem-safe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDescriptor {
    /// Display name of the resource.
    pub title: String,
    /// Fetchable address of the resource.
    pub locator: String,
}

impl ResourceDescriptor {
    /// Creates a new descriptor.
    #[must_use]
    pub fn new(title: impl Into<String>, locator: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            locator: locator.into(),
        }
    }
}

/// Content retrieved by a fetcher, on its way to the sink.
///
/// The body moves into the content channel on send; the fetcher keeps no
/// handle to it afterwards.
#[derive(Debug)]
pub struct FetchedContent {
    suggested_name: String,
    body: Vec<u8>,
}

impl FetchedContent {
    /// Creates fetched content with a suggested file name.
    #[must_use]
    pub fn new(suggested_name: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            suggested_name: suggested_name.into(),
            body,
        }
    }

    /// Suggested file name, derived from the locator.
    #[must_use]
    pub fn suggested_name(&self) -> &str {
        &self.suggested_name
    }

    /// Consumes the content, yielding name and body.
    #[must_use]
    pub fn into_parts(self) -> (String, Vec<u8>) {
        (self.suggested_name, self.body)
    }
}
