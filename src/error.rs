//! Error kinds shared by the descriptor, factory and codec layers.
//!
//! Every failure at this layer is a programming or data-shape fault and is
//! non-recoverable: callers are expected to drop the offending event. The
//! kinds carry no context beyond the tag itself.

use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// No descriptor could be located for the message's source triple
    #[error("no descriptor found for event source")]
    DescriptorMissing,
    /// The factory's event kind does not match the channel's kind
    #[error("event kind does not match channel kind")]
    TypeMismatch,
    /// Virtual channel index outside `[0, num_channels)`
    #[error("virtual channel index out of range")]
    ChannelOutOfRange,
    /// Supplied payload or destination region smaller than required
    #[error("payload smaller than channel data size")]
    PayloadTooSmall,
    /// Supplied payload larger than the channel allows
    #[error("payload larger than channel data size")]
    PayloadTooLarge,
    /// Text exceeds the channel's maximum length
    #[error("text exceeds channel length")]
    TextTooLong,
    /// Metadata values do not match the channel's event metadata fields
    #[error("metadata values do not match channel metadata fields")]
    MetadataShapeMismatch,
    /// The channel declares event metadata but none was supplied
    #[error("channel declares event metadata but none was supplied")]
    MetadataPresent,
    /// The spike buffer was already consumed
    #[error("spike buffer not ready")]
    BufferNotReady,
    /// The spike buffer dimensions do not match the channel
    #[error("spike buffer dimensions do not match channel")]
    BufferShapeMismatch,
    /// A wire message failed a size or tag check
    #[error("malformed wire message")]
    MalformedMessage,
}
