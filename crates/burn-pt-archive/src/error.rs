use core::fmt;

/// The step of archive processing an error originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Locating the end of central directory record.
    TrailerScan,
    /// Reading the central directory records.
    DirectoryParse,
    /// Reading local headers to locate entry payloads.
    HeaderResolve,
    /// Reconstructing the tensor order from the archive content.
    OrderResolve,
    /// Reading tensor payloads through the stream.
    StreamRead,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::TrailerScan => "trailer scan",
            Stage::DirectoryParse => "directory parse",
            Stage::HeaderResolve => "header resolve",
            Stage::OrderResolve => "order resolve",
            Stage::StreamRead => "stream read",
        };
        f.write_str(name)
    }
}

/// Errors raised while opening an archive or reading tensors out of it.
#[derive(thiserror::Error, Debug)]
pub enum ArchiveError {
    /// The archive structure is malformed, truncated or missing a required entry.
    #[error("{stage}: malformed archive: {reason}")]
    Format {
        /// Stage that detected the problem.
        stage: Stage,
        /// Human readable description.
        reason: String,
    },

    /// The entry is compressed with a method other than "stored".
    #[error("{stage}: compression method {method} not supported (entry '{name}')")]
    UnsupportedCompression {
        /// Stage that tried to read the entry.
        stage: Stage,
        /// Name of the entry.
        name: String,
        /// Compression method found in the directory.
        method: u16,
    },

    /// More tensors were requested than the archive holds.
    #[error("stream read: no more tensors in archive ({consumed} already consumed)")]
    EndOfStream {
        /// Number of tensors handed out before the request.
        consumed: usize,
    },

    /// Underlying IO failure.
    #[error("{stage}: IO error: {source}")]
    Io {
        /// Stage that issued the read.
        stage: Stage,
        /// The IO error.
        #[source]
        source: std::io::Error,
    },
}

impl ArchiveError {
    pub(crate) fn format(stage: Stage, reason: impl Into<String>) -> Self {
        ArchiveError::Format {
            stage,
            reason: reason.into(),
        }
    }

    /// Wraps an IO error, reporting truncated input as a format error.
    pub(crate) fn io(stage: Stage, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::UnexpectedEof {
            return ArchiveError::format(stage, "unexpected end of data (truncated archive)");
        }
        ArchiveError::Io { stage, source }
    }

    /// The stage this error is attributed to.
    pub fn stage(&self) -> Stage {
        match self {
            ArchiveError::Format { stage, .. }
            | ArchiveError::UnsupportedCompression { stage, .. }
            | ArchiveError::Io { stage, .. } => *stage,
            ArchiveError::EndOfStream { .. } => Stage::StreamRead,
        }
    }
}

/// Extension to tag IO results with the stage issuing them.
pub(crate) trait StageContext<T> {
    fn at(self, stage: Stage) -> Result<T, ArchiveError>;
}

impl<T> StageContext<T> for std::io::Result<T> {
    fn at(self, stage: Stage) -> Result<T, ArchiveError> {
        self.map_err(|err| ArchiveError::io(stage, err))
    }
}
