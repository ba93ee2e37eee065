//! Deserialization of wire messages into events
//!
//! The receiving stage owns the decode: it reads the source triple from the
//! message header, locates the binding descriptor through its
//! [`ChannelLookup`] collaborator, and hands the message to the decoder for
//! that descriptor's kind. Every size and tag check must pass or the whole
//! message is rejected as [`Error::MalformedMessage`]; no partial event is
//! ever produced.

use crate::chan::{EventChannel, EventChannelKind, SpikeChannel};
use crate::error::Error;
use crate::event::{BinaryEvent, Event, SpikeEvent, TextEvent, TtlEvent};
use crate::metadata::{self, MetadataField, MetadataValue};
use crate::wire::{
    Reader, EVENT_BASE_SIZE, OFF_BASE_TAG, OFF_KIND_TAG, OFF_SOURCE_ID, OFF_SOURCE_INDEX,
    OFF_SUB_IDX, OFF_TIMESTAMP, SPIKE_BASE_SIZE,
};
use crate::EventType;
use std::sync::Arc;
use tracing::trace;

/// Descriptor lookup the deserializer needs from its processor collaborator.
/// Index lookups key on the source triple carried in the message header;
/// the returned index feeds the corresponding accessor. These four calls
/// are the only thing the decoder asks of the pipeline.
pub trait ChannelLookup {
    fn event_channel_index(
        &self,
        source_index: u16,
        processor_id: u16,
        sub_processor_idx: u16,
    ) -> Option<usize>;

    fn spike_channel_index(
        &self,
        source_index: u16,
        processor_id: u16,
        sub_processor_idx: u16,
    ) -> Option<usize>;

    fn event_channel(&self, index: usize) -> Option<&Arc<EventChannel>>;

    fn spike_channel(&self, index: usize) -> Option<&Arc<SpikeChannel>>;
}

fn peek_u16(msg: &[u8], offset: usize) -> Option<u16> {
    let bytes = msg.get(offset..offset + 2)?;
    Some(u16::from_ne_bytes([bytes[0], bytes[1]]))
}

/// Base tag of a raw message, if valid
pub fn base_type(msg: &[u8]) -> Option<EventType> {
    msg.get(OFF_BASE_TAG).and_then(|&tag| EventType::from_tag(tag))
}

/// Event kind tag of a raw processor-event message, if valid
pub fn event_kind(msg: &[u8]) -> Option<EventChannelKind> {
    msg.get(OFF_KIND_TAG)
        .and_then(|&tag| EventChannelKind::from_tag(tag))
}

/// Source processor id of a raw message
pub fn source_id(msg: &[u8]) -> Option<u16> {
    peek_u16(msg, OFF_SOURCE_ID)
}

/// Sub-processor index of a raw message
pub fn sub_processor_idx(msg: &[u8]) -> Option<u16> {
    peek_u16(msg, OFF_SUB_IDX)
}

/// Source-local channel index of a raw message
pub fn source_index(msg: &[u8]) -> Option<u16> {
    peek_u16(msg, OFF_SOURCE_INDEX)
}

/// Decode any message: read the base tag and source triple, locate the
/// binding descriptor through `processor`, and dispatch on its kind
pub fn event(msg: &[u8], processor: &impl ChannelLookup) -> Result<Event, Error> {
    let base = base_type(msg).ok_or(Error::MalformedMessage)?;
    let processor_id = source_id(msg).ok_or(Error::MalformedMessage)?;
    let sub_idx = sub_processor_idx(msg).ok_or(Error::MalformedMessage)?;
    let chan_idx = source_index(msg).ok_or(Error::MalformedMessage)?;

    match base {
        EventType::ProcessorEvent => {
            let index = processor
                .event_channel_index(chan_idx, processor_id, sub_idx)
                .ok_or_else(|| {
                    trace!(processor_id, sub_idx, chan_idx, "no event channel for source");
                    Error::DescriptorMissing
                })?;
            let info = processor
                .event_channel(index)
                .ok_or(Error::DescriptorMissing)?;
            match info.kind() {
                EventChannelKind::Ttl => ttl(msg, info).map(Event::Ttl),
                EventChannelKind::Text => text(msg, info).map(Event::Text),
                _ => binary(msg, info).map(Event::Binary),
            }
        }
        EventType::SpikeEvent => {
            let index = processor
                .spike_channel_index(chan_idx, processor_id, sub_idx)
                .ok_or_else(|| {
                    trace!(processor_id, sub_idx, chan_idx, "no spike channel for source");
                    Error::DescriptorMissing
                })?;
            let info = processor
                .spike_channel(index)
                .ok_or(Error::DescriptorMissing)?;
            spike(msg, info).map(Event::Spike)
        }
    }
}

/// Header checks shared by the processor-event decoders: exact total size,
/// base tag, kind tag. Returns a reader positioned at the timestamp.
fn processor_header<'a>(
    msg: &'a [u8],
    info: &EventChannel,
    kind: EventChannelKind,
) -> Result<Reader<'a>, Error> {
    let expected = EVENT_BASE_SIZE + info.data_size() + info.total_event_metadata_size();
    if msg.len() != expected {
        return Err(Error::MalformedMessage);
    }
    let mut r = Reader::new(msg);
    if r.u8()? != EventType::ProcessorEvent as u8 {
        return Err(Error::MalformedMessage);
    }
    if r.u8()? != kind.tag() {
        return Err(Error::MalformedMessage);
    }
    r.seek(OFF_TIMESTAMP)?;
    Ok(r)
}

fn metadata_block(
    r: &mut Reader,
    info_fields: &[MetadataField],
    size: usize,
) -> Result<Vec<MetadataValue>, Error> {
    if size == 0 {
        return Ok(Vec::new());
    }
    metadata::values_from_block(info_fields, r.bytes(size)?)
}

/// Decode a TTL event against its binding descriptor
pub fn ttl(msg: &[u8], info: &Arc<EventChannel>) -> Result<TtlEvent, Error> {
    if info.kind() != EventChannelKind::Ttl {
        return Err(Error::MalformedMessage);
    }
    let mut r = processor_header(msg, info, EventChannelKind::Ttl)?;
    let timestamp = r.u64()?;
    let channel = r.u16()?;
    r.seek(EVENT_BASE_SIZE)?;
    let word = r.bytes(info.data_size())?.to_vec();
    let metadata = metadata_block(&mut r, info.event_metadata(), info.total_event_metadata_size())?;
    Ok(TtlEvent::from_parts(info, timestamp, channel, word, metadata))
}

/// Decode a text event against its binding descriptor
pub fn text(msg: &[u8], info: &Arc<EventChannel>) -> Result<TextEvent, Error> {
    if info.kind() != EventChannelKind::Text {
        return Err(Error::MalformedMessage);
    }
    let mut r = processor_header(msg, info, EventChannelKind::Text)?;
    let timestamp = r.u64()?;
    let channel = r.u16()?;
    r.seek(EVENT_BASE_SIZE)?;
    let payload = r.bytes(info.data_size())?;
    // the payload region is zero-padded past the string
    let end = payload
        .iter()
        .rposition(|&b| b != 0)
        .map_or(0, |i| i + 1);
    let text = std::str::from_utf8(&payload[..end])
        .map_err(|_| Error::MalformedMessage)?
        .to_string();
    let metadata = metadata_block(&mut r, info.event_metadata(), info.total_event_metadata_size())?;
    Ok(TextEvent::from_parts(info, timestamp, channel, text, metadata))
}

/// Decode a typed binary array event against its binding descriptor
pub fn binary(msg: &[u8], info: &Arc<EventChannel>) -> Result<BinaryEvent, Error> {
    if !info.kind().is_binary() {
        return Err(Error::MalformedMessage);
    }
    let mut r = processor_header(msg, info, info.kind())?;
    let timestamp = r.u64()?;
    let channel = r.u16()?;
    r.seek(EVENT_BASE_SIZE)?;
    let data = r.bytes(info.data_size())?.to_vec();
    let metadata = metadata_block(&mut r, info.event_metadata(), info.total_event_metadata_size())?;
    Ok(BinaryEvent::from_parts(
        info,
        timestamp,
        channel,
        info.kind(),
        data,
        metadata,
    ))
}

/// Decode a spike event against its binding descriptor
pub fn spike(msg: &[u8], info: &Arc<SpikeChannel>) -> Result<SpikeEvent, Error> {
    let n_chans = usize::from(info.num_channels());
    let threshold_size = n_chans * std::mem::size_of::<f32>();
    let expected =
        SPIKE_BASE_SIZE + threshold_size + info.data_size() + info.total_event_metadata_size();
    if msg.len() != expected {
        return Err(Error::MalformedMessage);
    }
    let mut r = Reader::new(msg);
    if r.u8()? != EventType::SpikeEvent as u8 {
        return Err(Error::MalformedMessage);
    }
    if r.u8()? != info.electrode().tag() {
        return Err(Error::MalformedMessage);
    }
    r.seek(OFF_TIMESTAMP)?;
    let timestamp = r.u64()?;
    r.seek(SPIKE_BASE_SIZE)?;
    let mut thresholds = Vec::with_capacity(n_chans);
    for _ in 0..n_chans {
        thresholds.push(r.f32()?);
    }
    let n_samples = info.data_size() / std::mem::size_of::<f32>();
    let mut samples = Vec::with_capacity(n_samples);
    for _ in 0..n_samples {
        samples.push(r.f32()?);
    }
    let metadata = metadata_block(&mut r, info.event_metadata(), info.total_event_metadata_size())?;
    Ok(SpikeEvent::from_parts(
        info, timestamp, thresholds, samples, metadata,
    ))
}
