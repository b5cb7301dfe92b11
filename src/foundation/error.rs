/// Convenience result type used across gifgrid.
pub type GridResult<T> = Result<T, GridError>;

/// Coarse classification of a [`GridError`], used by callers to decide how to react.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    /// Bad input from the user (corrupt file, unknown model, wrong dimensions, bad options).
    /// Re-prompt rather than retry.
    Input,
    /// A broken internal invariant. Fatal for the request, never retried.
    Internal,
    /// Memory or disk pressure. Safe to retry later.
    Resource,
}

/// Top-level error taxonomy for the slicing pipeline.
#[derive(thiserror::Error, Debug)]
pub enum GridError {
    /// The input is not a readable animated image.
    #[error("decode error: {0}")]
    Decode(String),

    /// The requested device model is not in the profile table.
    #[error("unknown model: '{0}'")]
    UnknownModel(String),

    /// The decoded canvas does not match the device profile.
    #[error(
        "dimension mismatch: expected {expected_w}x{expected_h}, got {actual_w}x{actual_h}"
    )]
    DimensionMismatch {
        /// Canvas width required by the profile.
        expected_w: u32,
        /// Canvas height required by the profile.
        expected_h: u32,
        /// Decoded canvas width.
        actual_w: u32,
        /// Decoded canvas height.
        actual_h: u32,
    },

    /// A tile rectangle fell outside the canvas or overlapped another tile.
    #[error("geometry error: {0}")]
    Geometry(String),

    /// A tile animation could not be encoded.
    #[error("encode error: {0}")]
    Encode(String),

    /// Frame count or timing drifted between a tile and its source sequence.
    #[error("invariant violation: {0}")]
    Invariant(String),

    /// Allocation or staging failure.
    #[error("resource error: {0}")]
    Resource(String),

    /// Invalid options or profile configuration.
    #[error("config error: {0}")]
    Config(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GridError {
    /// Build a [`GridError::Decode`] value.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Build a [`GridError::UnknownModel`] value.
    pub fn unknown_model(model: impl Into<String>) -> Self {
        Self::UnknownModel(model.into())
    }

    /// Build a [`GridError::Geometry`] value.
    pub fn geometry(msg: impl Into<String>) -> Self {
        Self::Geometry(msg.into())
    }

    /// Build a [`GridError::Encode`] value.
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    /// Build a [`GridError::Invariant`] value.
    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::Invariant(msg.into())
    }

    /// Build a [`GridError::Resource`] value.
    pub fn resource(msg: impl Into<String>) -> Self {
        Self::Resource(msg.into())
    }

    /// Build a [`GridError::Config`] value.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Classify this error for retry/re-prompt decisions.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Decode(_) | Self::UnknownModel(_) | Self::DimensionMismatch { .. } => {
                ErrorClass::Input
            }
            Self::Config(_) => ErrorClass::Input,
            Self::Geometry(_) | Self::Encode(_) | Self::Invariant(_) => ErrorClass::Internal,
            Self::Resource(_) | Self::Other(_) => ErrorClass::Resource,
        }
    }

    /// Only resource errors are worth retrying once pressure subsides.
    pub fn is_retryable(&self) -> bool {
        self.class() == ErrorClass::Resource
    }
}

impl From<std::io::Error> for GridError {
    fn from(e: std::io::Error) -> Self {
        Self::Resource(e.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
