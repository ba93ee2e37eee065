//! Core event and channel model for a neurophysiology acquisition pipeline.
//!
//! Processors describe what they emit with channel descriptors
//! ([`chan::DataChannel`], [`chan::EventChannel`], [`chan::SpikeChannel`],
//! [`chan::ConfigurationObject`]), build typed events against those
//! descriptors through validating factories ([`event`]), and exchange them
//! with downstream stages as flat byte messages ([`ser`], [`de`]). The wire
//! layout is fixed and native-byte-order; the receiving stage supplies the
//! binding descriptor to interpret the payload.

pub mod bit;
pub mod chan;
pub mod de;
pub mod error;
pub mod event;
pub mod metadata;
pub mod ser;
pub mod wire;

pub use error::Error;

use serde::{Deserialize, Serialize};

/// Identifies a channel by its position in the pipeline: the emitting
/// processor, the sub-processor namespace within it, and the source-local
/// index of the channel among objects of its kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceChannelInfo {
    pub processor_id: u16,
    pub sub_processor_id: u16,
    pub channel_idx: u16,
}

/// Base discriminant of a wire message, stored in byte 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum EventType {
    ProcessorEvent = 1,
    SpikeEvent = 2,
}

impl EventType {
    pub fn from_tag(tag: u8) -> Option<EventType> {
        match tag {
            1 => Some(EventType::ProcessorEvent),
            2 => Some(EventType::SpikeEvent),
            _ => None,
        }
    }
}

/// Sample rate assigned to descriptors before the source sets its own
pub const DEFAULT_SAMPLE_RATE: f32 = 44100.0;
