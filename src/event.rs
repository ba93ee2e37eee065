//! Typed events bound to channel descriptors
//!
//! Events are built through validating factories that check the request
//! against the binding descriptor before any allocation: kind, virtual
//! channel range, payload size and metadata shape. A factory that fails
//! returns the offending [`Error`] kind and no partial event ever escapes.
//! Successful factories copy exactly the channel's payload size; the event
//! owns its bytes from then on.
//!
//! Spike waveforms are assembled in a [`SpikeBuffer`], a one-shot writable
//! buffer whose storage moves into the [`SpikeEvent`] on creation.

use crate::bit;
use crate::chan::{ChannelCommon, ElectrodeKind, EventChannel, EventChannelKind, SpikeChannel};
use crate::error::Error;
use crate::metadata::{self, MetadataValue};
use crate::EventType;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::trace;

mod sealed {
    pub trait Sealed {}
}

/// Element types a [`BinaryEvent`] payload can carry. Implemented for the
/// fixed-width integers and floats; the associated kind is the channel kind
/// that transports arrays of this element.
pub trait BinaryElement: Copy + sealed::Sealed {
    const KIND: EventChannelKind;

    #[doc(hidden)]
    fn push_ne_bytes(self, buf: &mut Vec<u8>);

    #[doc(hidden)]
    fn read_ne_bytes(bytes: &[u8]) -> Self;
}

macro_rules! binary_element_impl {
    ($t:ty, $kind:expr) => {
        impl sealed::Sealed for $t {}

        impl BinaryElement for $t {
            const KIND: EventChannelKind = $kind;

            fn push_ne_bytes(self, buf: &mut Vec<u8>) {
                buf.extend_from_slice(&self.to_ne_bytes());
            }

            fn read_ne_bytes(bytes: &[u8]) -> Self {
                Self::from_ne_bytes(bytes.try_into().unwrap())
            }
        }
    };
}

binary_element_impl!(i8, EventChannelKind::Int8Array);
binary_element_impl!(u8, EventChannelKind::Uint8Array);
binary_element_impl!(i16, EventChannelKind::Int16Array);
binary_element_impl!(u16, EventChannelKind::Uint16Array);
binary_element_impl!(i32, EventChannelKind::Int32Array);
binary_element_impl!(u32, EventChannelKind::Uint32Array);
binary_element_impl!(i64, EventChannelKind::Int64Array);
binary_element_impl!(u64, EventChannelKind::Uint64Array);
binary_element_impl!(f32, EventChannelKind::FloatArray);
binary_element_impl!(f64, EventChannelKind::DoubleArray);

/// Shared factory validation: descriptor kind, virtual channel range and
/// metadata shape. `metadata` is `None` for the metadata-less factories,
/// which must only be used on channels that declare no event metadata.
fn create_checks(
    info: &EventChannel,
    kind: EventChannelKind,
    channel: u16,
    metadata: Option<&[MetadataValue]>,
) -> Result<(), Error> {
    if info.kind() != kind {
        trace!(want = kind.tag(), have = info.kind().tag(), "event kind mismatch");
        return Err(Error::TypeMismatch);
    }
    if channel >= info.num_channels() {
        return Err(Error::ChannelOutOfRange);
    }
    match metadata {
        None => {
            if !info.event_metadata().is_empty() {
                return Err(Error::MetadataPresent);
            }
        }
        Some(md) => {
            if !metadata::compare_metadata(info.event_metadata(), md) {
                trace!(slots = info.event_metadata().len(), "metadata shape mismatch");
                return Err(Error::MetadataShapeMismatch);
            }
        }
    }
    Ok(())
}

/// A digital trigger: the full bit-packed TTL word of its channel, plus the
/// virtual lane the event is about
#[derive(Clone, Debug, PartialEq)]
pub struct TtlEvent {
    info: Arc<EventChannel>,
    timestamp: u64,
    channel: u16,
    word: Vec<u8>,
    metadata: Vec<MetadataValue>,
}

impl TtlEvent {
    pub fn create(
        info: &Arc<EventChannel>,
        timestamp: u64,
        word: &[u8],
        channel: u16,
    ) -> Result<TtlEvent, Error> {
        create_checks(info, EventChannelKind::Ttl, channel, None)?;
        TtlEvent::copy_word(info, timestamp, word, channel, Vec::new())
    }

    pub fn create_with_metadata(
        info: &Arc<EventChannel>,
        timestamp: u64,
        word: &[u8],
        channel: u16,
        metadata: Vec<MetadataValue>,
    ) -> Result<TtlEvent, Error> {
        create_checks(info, EventChannelKind::Ttl, channel, Some(&metadata))?;
        TtlEvent::copy_word(info, timestamp, word, channel, metadata)
    }

    fn copy_word(
        info: &Arc<EventChannel>,
        timestamp: u64,
        word: &[u8],
        channel: u16,
        metadata: Vec<MetadataValue>,
    ) -> Result<TtlEvent, Error> {
        let size = info.data_size();
        if word.len() < size {
            return Err(Error::PayloadTooSmall);
        }
        Ok(TtlEvent {
            info: Arc::clone(info),
            timestamp,
            channel,
            word: word[..size].to_vec(),
            metadata,
        })
    }

    pub(crate) fn from_parts(
        info: &Arc<EventChannel>,
        timestamp: u64,
        channel: u16,
        word: Vec<u8>,
        metadata: Vec<MetadataValue>,
    ) -> TtlEvent {
        TtlEvent {
            info: Arc::clone(info),
            timestamp,
            channel,
            word,
            metadata,
        }
    }

    pub fn channel_info(&self) -> &Arc<EventChannel> {
        &self.info
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// The virtual lane this event refers to
    pub fn channel(&self) -> u16 {
        self.channel
    }

    /// State of the event's own lane within the word
    pub fn state(&self) -> bool {
        bit::check(&self.word, self.channel)
    }

    /// The full bit-packed TTL word
    pub fn word(&self) -> &[u8] {
        &self.word
    }

    /// All high lanes of the word, ascending, ignoring padding bits beyond
    /// the channel's lane count
    pub fn active_lanes(&self) -> Vec<u16> {
        let n = self.info.num_channels();
        let mut lanes = bit::word_to_lanes(&self.word);
        lanes.retain(|&l| l < n);
        lanes
    }

    pub fn metadata(&self) -> &[MetadataValue] {
        &self.metadata
    }
}

/// A text annotation
#[derive(Clone, Debug, PartialEq)]
pub struct TextEvent {
    info: Arc<EventChannel>,
    timestamp: u64,
    channel: u16,
    text: String,
    metadata: Vec<MetadataValue>,
}

impl TextEvent {
    pub fn create(
        info: &Arc<EventChannel>,
        timestamp: u64,
        text: &str,
        channel: u16,
    ) -> Result<TextEvent, Error> {
        create_checks(info, EventChannelKind::Text, channel, None)?;
        TextEvent::check_length(info, timestamp, text, channel, Vec::new())
    }

    pub fn create_with_metadata(
        info: &Arc<EventChannel>,
        timestamp: u64,
        text: &str,
        channel: u16,
        metadata: Vec<MetadataValue>,
    ) -> Result<TextEvent, Error> {
        create_checks(info, EventChannelKind::Text, channel, Some(&metadata))?;
        TextEvent::check_length(info, timestamp, text, channel, metadata)
    }

    fn check_length(
        info: &Arc<EventChannel>,
        timestamp: u64,
        text: &str,
        channel: u16,
        metadata: Vec<MetadataValue>,
    ) -> Result<TextEvent, Error> {
        // UTF-8 bytes, not characters: the payload region holds bytes
        if text.len() > info.length() {
            return Err(Error::TextTooLong);
        }
        Ok(TextEvent {
            info: Arc::clone(info),
            timestamp,
            channel,
            text: text.to_string(),
            metadata,
        })
    }

    pub(crate) fn from_parts(
        info: &Arc<EventChannel>,
        timestamp: u64,
        channel: u16,
        text: String,
        metadata: Vec<MetadataValue>,
    ) -> TextEvent {
        TextEvent {
            info: Arc::clone(info),
            timestamp,
            channel,
            text,
            metadata,
        }
    }

    pub fn channel_info(&self) -> &Arc<EventChannel> {
        &self.info
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn channel(&self) -> u16 {
        self.channel
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn metadata(&self) -> &[MetadataValue] {
        &self.metadata
    }
}

/// A typed numeric array. The element kind always equals the channel kind;
/// the payload is exactly the channel's data size.
#[derive(Clone, Debug, PartialEq)]
pub struct BinaryEvent {
    info: Arc<EventChannel>,
    timestamp: u64,
    channel: u16,
    kind: EventChannelKind,
    data: Vec<u8>,
    metadata: Vec<MetadataValue>,
}

macro_rules! binary_factory_impl {
    ($from:ident, $from_md:ident, $t:ty) => {
        /// Create an event carrying this element type. The channel kind
        /// must match the element type exactly.
        pub fn $from(
            info: &Arc<EventChannel>,
            timestamp: u64,
            data: &[$t],
            channel: u16,
        ) -> Result<BinaryEvent, Error> {
            BinaryEvent::create(info, timestamp, data, channel)
        }

        pub fn $from_md(
            info: &Arc<EventChannel>,
            timestamp: u64,
            data: &[$t],
            channel: u16,
            metadata: Vec<MetadataValue>,
        ) -> Result<BinaryEvent, Error> {
            BinaryEvent::create_with_metadata(info, timestamp, data, channel, metadata)
        }
    };
}

impl BinaryEvent {
    binary_factory_impl!(from_i8, from_i8_with_metadata, i8);
    binary_factory_impl!(from_u8, from_u8_with_metadata, u8);
    binary_factory_impl!(from_i16, from_i16_with_metadata, i16);
    binary_factory_impl!(from_u16, from_u16_with_metadata, u16);
    binary_factory_impl!(from_i32, from_i32_with_metadata, i32);
    binary_factory_impl!(from_u32, from_u32_with_metadata, u32);
    binary_factory_impl!(from_i64, from_i64_with_metadata, i64);
    binary_factory_impl!(from_u64, from_u64_with_metadata, u64);
    binary_factory_impl!(from_f32, from_f32_with_metadata, f32);
    binary_factory_impl!(from_f64, from_f64_with_metadata, f64);

    /// Tag dispatch behind the per-element factories: the element type
    /// picks the kind compared against the channel
    fn create<T: BinaryElement>(
        info: &Arc<EventChannel>,
        timestamp: u64,
        data: &[T],
        channel: u16,
    ) -> Result<BinaryEvent, Error> {
        create_checks(info, T::KIND, channel, None)?;
        BinaryEvent::copy_data(info, timestamp, data, channel, Vec::new())
    }

    fn create_with_metadata<T: BinaryElement>(
        info: &Arc<EventChannel>,
        timestamp: u64,
        data: &[T],
        channel: u16,
        metadata: Vec<MetadataValue>,
    ) -> Result<BinaryEvent, Error> {
        create_checks(info, T::KIND, channel, Some(&metadata))?;
        BinaryEvent::copy_data(info, timestamp, data, channel, metadata)
    }

    fn copy_data<T: BinaryElement>(
        info: &Arc<EventChannel>,
        timestamp: u64,
        data: &[T],
        channel: u16,
        metadata: Vec<MetadataValue>,
    ) -> Result<BinaryEvent, Error> {
        let size = info.data_size();
        if data.len() * std::mem::size_of::<T>() < size {
            return Err(Error::PayloadTooSmall);
        }
        let mut bytes = Vec::with_capacity(data.len() * std::mem::size_of::<T>());
        for &x in data {
            x.push_ne_bytes(&mut bytes);
        }
        bytes.truncate(size);
        Ok(BinaryEvent {
            info: Arc::clone(info),
            timestamp,
            channel,
            kind: T::KIND,
            data: bytes,
            metadata,
        })
    }

    pub(crate) fn from_parts(
        info: &Arc<EventChannel>,
        timestamp: u64,
        channel: u16,
        kind: EventChannelKind,
        data: Vec<u8>,
        metadata: Vec<MetadataValue>,
    ) -> BinaryEvent {
        BinaryEvent {
            info: Arc::clone(info),
            timestamp,
            channel,
            kind,
            data,
            metadata,
        }
    }

    pub fn channel_info(&self) -> &Arc<EventChannel> {
        &self.info
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn channel(&self) -> u16 {
        self.channel
    }

    /// Element kind of the payload
    pub fn binary_kind(&self) -> EventChannelKind {
        self.kind
    }

    /// The payload bytes, exactly as they appear on the wire
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Decode the payload as elements of `T`. Returns `None` when `T` is
    /// not the element type of this event.
    pub fn elements<T: BinaryElement>(&self) -> Option<Vec<T>> {
        if self.kind != T::KIND {
            return None;
        }
        let size = std::mem::size_of::<T>();
        Some(
            self.data
                .chunks_exact(size)
                .map(T::read_ne_bytes)
                .collect(),
        )
    }

    pub fn metadata(&self) -> &[MetadataValue] {
        &self.metadata
    }
}

/// One-shot writable buffer for assembling a spike waveform, sized from a
/// [`SpikeChannel`]. Lanes are written through [`SpikeBuffer::lane_mut`];
/// creating the [`SpikeEvent`] moves the storage out and leaves the buffer
/// unusable, so each waveform is owned by exactly one event.
pub struct SpikeBuffer {
    n_chans: u16,
    n_samps: usize,
    data: Vec<f32>,
    ready: bool,
}

impl SpikeBuffer {
    pub fn new(info: &SpikeChannel) -> SpikeBuffer {
        let n_chans = info.num_channels();
        let n_samps = info.total_samples();
        SpikeBuffer {
            n_chans,
            n_samps,
            data: vec![0.0; usize::from(n_chans) * n_samps],
            ready: true,
        }
    }

    /// True until the buffer is consumed by a spike event
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Writable view of one lane's samples, `None` once consumed or when
    /// the lane is out of range
    pub fn lane_mut(&mut self, lane: u16) -> Option<&mut [f32]> {
        if !self.ready || lane >= self.n_chans {
            return None;
        }
        let start = usize::from(lane) * self.n_samps;
        Some(&mut self.data[start..start + self.n_samps])
    }
}

/// A detected spike: per-lane detection thresholds and the channel-major
/// waveform samples
#[derive(Clone, Debug, PartialEq)]
pub struct SpikeEvent {
    info: Arc<SpikeChannel>,
    timestamp: u64,
    thresholds: Vec<f32>,
    samples: Vec<f32>,
    metadata: Vec<MetadataValue>,
}

impl SpikeEvent {
    pub fn create(
        info: &Arc<SpikeChannel>,
        timestamp: u64,
        thresholds: &[f32],
        buffer: &mut SpikeBuffer,
    ) -> Result<SpikeEvent, Error> {
        if !info.event_metadata().is_empty() {
            return Err(Error::MetadataPresent);
        }
        SpikeEvent::basic(info, timestamp, thresholds, buffer, Vec::new())
    }

    pub fn create_with_metadata(
        info: &Arc<SpikeChannel>,
        timestamp: u64,
        thresholds: &[f32],
        buffer: &mut SpikeBuffer,
        metadata: Vec<MetadataValue>,
    ) -> Result<SpikeEvent, Error> {
        if !metadata::compare_metadata(info.event_metadata(), &metadata) {
            return Err(Error::MetadataShapeMismatch);
        }
        SpikeEvent::basic(info, timestamp, thresholds, buffer, metadata)
    }

    /// Validate and take ownership of the waveform. All checks run before
    /// the buffer is consumed, so a failed create leaves it usable.
    fn basic(
        info: &Arc<SpikeChannel>,
        timestamp: u64,
        thresholds: &[f32],
        buffer: &mut SpikeBuffer,
        metadata: Vec<MetadataValue>,
    ) -> Result<SpikeEvent, Error> {
        if !buffer.ready {
            trace!("spike buffer already consumed");
            return Err(Error::BufferNotReady);
        }
        if buffer.n_chans != info.num_channels() || buffer.n_samps != info.total_samples() {
            return Err(Error::BufferShapeMismatch);
        }
        match thresholds.len().cmp(&usize::from(info.num_channels())) {
            Ordering::Less => return Err(Error::PayloadTooSmall),
            Ordering::Greater => return Err(Error::PayloadTooLarge),
            Ordering::Equal => {}
        }
        buffer.ready = false;
        Ok(SpikeEvent {
            info: Arc::clone(info),
            timestamp,
            thresholds: thresholds.to_vec(),
            samples: std::mem::take(&mut buffer.data),
            metadata,
        })
    }

    pub(crate) fn from_parts(
        info: &Arc<SpikeChannel>,
        timestamp: u64,
        thresholds: Vec<f32>,
        samples: Vec<f32>,
        metadata: Vec<MetadataValue>,
    ) -> SpikeEvent {
        SpikeEvent {
            info: Arc::clone(info),
            timestamp,
            thresholds,
            samples,
            metadata,
        }
    }

    pub fn channel_info(&self) -> &Arc<SpikeChannel> {
        &self.info
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn electrode(&self) -> ElectrodeKind {
        self.info.electrode()
    }

    /// Detection thresholds, one per lane, ascending lane order
    pub fn thresholds(&self) -> &[f32] {
        &self.thresholds
    }

    pub fn threshold(&self, lane: u16) -> Option<f32> {
        self.thresholds.get(usize::from(lane)).copied()
    }

    /// All waveform samples, channel-major
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// One lane's samples: the `total_samples` slice starting at
    /// `lane * total_samples`
    pub fn channel_samples(&self, lane: u16) -> Option<&[f32]> {
        if lane >= self.info.num_channels() {
            return None;
        }
        let n = self.info.total_samples();
        let start = usize::from(lane) * n;
        Some(&self.samples[start..start + n])
    }

    pub fn metadata(&self) -> &[MetadataValue] {
        &self.metadata
    }
}

/// The binding descriptor of any event: processor events bind an
/// [`EventChannel`], spikes a [`SpikeChannel`]
#[derive(Clone, Copy, Debug)]
pub enum ChannelInfo<'a> {
    Event(&'a Arc<EventChannel>),
    Spike(&'a Arc<SpikeChannel>),
}

impl<'a> ChannelInfo<'a> {
    /// The common record both descriptor kinds carry: provenance, naming,
    /// indices, sample rate
    pub fn info(&self) -> &'a ChannelCommon {
        match self {
            ChannelInfo::Event(c) => c.info(),
            ChannelInfo::Spike(c) => c.info(),
        }
    }
}

/// Any deserialized event, tagged by shape
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    Ttl(TtlEvent),
    Text(TextEvent),
    Binary(BinaryEvent),
    Spike(SpikeEvent),
}

impl Event {
    /// The wire base tag this event serializes under
    pub fn base_type(&self) -> EventType {
        match self {
            Event::Ttl(_) | Event::Text(_) | Event::Binary(_) => EventType::ProcessorEvent,
            Event::Spike(_) => EventType::SpikeEvent,
        }
    }

    /// The binding descriptor, whichever kind of channel it is
    pub fn channel_info(&self) -> ChannelInfo<'_> {
        match self {
            Event::Ttl(e) => ChannelInfo::Event(e.channel_info()),
            Event::Text(e) => ChannelInfo::Event(e.channel_info()),
            Event::Binary(e) => ChannelInfo::Event(e.channel_info()),
            Event::Spike(e) => ChannelInfo::Spike(e.channel_info()),
        }
    }

    pub fn timestamp(&self) -> u64 {
        match self {
            Event::Ttl(e) => e.timestamp(),
            Event::Text(e) => e.timestamp(),
            Event::Binary(e) => e.timestamp(),
            Event::Spike(e) => e.timestamp(),
        }
    }

    pub fn metadata(&self) -> &[MetadataValue] {
        match self {
            Event::Ttl(e) => e.metadata(),
            Event::Text(e) => e.metadata(),
            Event::Binary(e) => e.metadata(),
            Event::Spike(e) => e.metadata(),
        }
    }

    pub fn as_ttl(&self) -> Option<&TtlEvent> {
        match self {
            Event::Ttl(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&TextEvent> {
        match self {
            Event::Text(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_binary(&self) -> Option<&BinaryEvent> {
        match self {
            Event::Binary(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_spike(&self) -> Option<&SpikeEvent> {
        match self {
            Event::Spike(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TtlEvent> for Event {
    fn from(e: TtlEvent) -> Event {
        Event::Ttl(e)
    }
}

impl From<TextEvent> for Event {
    fn from(e: TextEvent) -> Event {
        Event::Text(e)
    }
}

impl From<BinaryEvent> for Event {
    fn from(e: BinaryEvent) -> Event {
        Event::Binary(e)
    }
}

impl From<SpikeEvent> for Event {
    fn from(e: SpikeEvent) -> Event {
        Event::Spike(e)
    }
}
