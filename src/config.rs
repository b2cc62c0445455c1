//! Configuration for tag editing passes.
//!
//! This module provides [`EditConfig`], the settings value injected into a
//! [`TagEditEngine`](crate::edit::TagEditEngine) when it is constructed.

/// Default block size used when moving bytes inside a stream.
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Configuration for write and remove passes.
///
/// # Example
///
/// ```rust
/// use tagsplice::EditConfig;
///
/// // Default configuration (64 KiB blocks, zones sorted by offset)
/// let config = EditConfig::default();
///
/// // Custom configuration
/// let config = EditConfig::new()
///     .buffer_size(16 * 1024)
///     .zero_fill(true)
///     .preserve_modified_time(true);
/// assert_eq!(config.buffer_size, 16 * 1024);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditConfig {
    /// Block size for in-stream byte moves (bytes).
    ///
    /// Larger blocks mean fewer seeks when a tag near the start of a large
    /// file changes size. Default: 64 KiB.
    pub buffer_size: usize,

    /// Zero the gap opened when a stream is lengthened.
    ///
    /// The gap is always overwritten by the new tag bytes, so this only
    /// matters when a pass fails between the resize and the splice.
    /// Default: false.
    pub zero_fill: bool,

    /// Process zones in ascending offset order.
    ///
    /// Drivers are not required to register zones in file order. When
    /// disabled, zones are processed in registration order.
    /// Default: true.
    pub sort_zones: bool,

    /// Check every parsed zone and header against the stream length before
    /// editing.
    ///
    /// A failed check is reported as [`Error::CorruptStructure`] and the
    /// stream is left untouched. Default: true.
    ///
    /// [`Error::CorruptStructure`]: crate::Error::CorruptStructure
    pub validate_layout: bool,

    /// Restore the file's modification time after editing a path.
    ///
    /// Only applies to [`write_path`] and [`remove_path`]. Default: false.
    ///
    /// [`write_path`]: crate::edit::TagEditEngine::write_path
    /// [`remove_path`]: crate::edit::TagEditEngine::remove_path
    pub preserve_modified_time: bool,
}

impl Default for EditConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            zero_fill: false,
            sort_zones: true,
            validate_layout: true,
            preserve_modified_time: false,
        }
    }
}

impl EditConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration with small move blocks for memory-constrained
    /// environments.
    pub fn low_memory() -> Self {
        Self {
            buffer_size: 4 * 1024,
            ..Self::default()
        }
    }

    /// Sets the block size for in-stream byte moves.
    ///
    /// A size of zero is clamped to one byte.
    pub fn buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(1);
        self
    }

    /// Sets whether gaps opened by lengthening are zero-filled.
    pub fn zero_fill(mut self, enabled: bool) -> Self {
        self.zero_fill = enabled;
        self
    }

    /// Sets whether zones are sorted by offset before splicing.
    pub fn sort_zones(mut self, enabled: bool) -> Self {
        self.sort_zones = enabled;
        self
    }

    /// Sets whether the parsed layout is validated before editing.
    pub fn validate_layout(mut self, enabled: bool) -> Self {
        self.validate_layout = enabled;
        self
    }

    /// Sets whether file modification times are restored after path edits.
    pub fn preserve_modified_time(mut self, enabled: bool) -> Self {
        self.preserve_modified_time = enabled;
        self
    }
}
