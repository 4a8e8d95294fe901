//! Opaque media handles and the small enums slides are described with.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque handle to an image, video or audio resource.
///
/// The engine never dereferences it; it only compares handles to decide
/// whether a playback stream must swap its source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaRef(String);

impl MediaRef {
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MediaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MediaRef {
    fn from(uri: &str) -> Self {
        Self::new(uri)
    }
}

impl From<String> for MediaRef {
    fn from(uri: String) -> Self {
        Self(uri)
    }
}

/// How a slide's visual is rendered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisualKind {
    #[default]
    Image,
    Video,
}

/// Entry animation applied at slide start
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transition {
    #[default]
    None,
    Fade,
    Slide,
    Zoom,
}
