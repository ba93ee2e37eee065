//! Serialization of events into wire messages
//!
//! One event becomes one contiguous message in the layout described in
//! [`crate::wire`]. Serialization writes into a caller-provided region so
//! the audio thread can reuse its scratch buffers; [`event`] is the
//! allocating convenience wrapper around [`event_into`].

use crate::chan::{EventChannel, SpikeChannel};
use crate::error::Error;
use crate::event::{BinaryEvent, Event, SpikeEvent, TextEvent, TtlEvent};
use crate::metadata::MetadataValue;
use crate::wire::{Writer, EVENT_BASE_SIZE, SPIKE_BASE_SIZE};
use crate::EventType;

/// Serialized size of a processor event carried on `info`
pub fn event_size(info: &EventChannel) -> usize {
    EVENT_BASE_SIZE + info.data_size() + info.total_event_metadata_size()
}

/// Serialized size of a spike event carried on `info`
pub fn spike_size(info: &SpikeChannel) -> usize {
    SPIKE_BASE_SIZE
        + usize::from(info.num_channels()) * std::mem::size_of::<f32>()
        + info.data_size()
        + info.total_event_metadata_size()
}

/// Serialized size of any event
pub fn message_size(ev: &Event) -> usize {
    match ev {
        Event::Ttl(e) => event_size(e.channel_info()),
        Event::Text(e) => event_size(e.channel_info()),
        Event::Binary(e) => event_size(e.channel_info()),
        Event::Spike(e) => spike_size(e.channel_info()),
    }
}

/// Serialize an event into a caller-provided region, returning the number
/// of bytes written. Fails with `PayloadTooSmall` when the region cannot
/// hold the full message; nothing meaningful is written in that case.
pub fn event_into(dst: &mut [u8], ev: &Event) -> Result<usize, Error> {
    if dst.len() < message_size(ev) {
        return Err(Error::PayloadTooSmall);
    }
    let mut w = Writer::new(dst);
    match ev {
        Event::Ttl(e) => ttl(&mut w, e)?,
        Event::Text(e) => text(&mut w, e)?,
        Event::Binary(e) => binary(&mut w, e)?,
        Event::Spike(e) => spike(&mut w, e)?,
    }
    Ok(w.pos())
}

/// Serialize an event into a new, exactly-sized message
pub fn event(ev: &Event) -> Result<Vec<u8>, Error> {
    let mut msg = vec![0; message_size(ev)];
    event_into(&mut msg, ev)?;
    Ok(msg)
}

/// Common header of processor events: tags, source triple, timestamp,
/// virtual channel, reserved tail
fn processor_header(
    w: &mut Writer,
    kind_tag: u8,
    info: &EventChannel,
    timestamp: u64,
    channel: u16,
) -> Result<(), Error> {
    let source = info.info().source();
    w.put_u8(EventType::ProcessorEvent as u8)?;
    w.put_u8(kind_tag)?;
    w.put_u16(source.source_node_id)?;
    w.put_u16(source.sub_processor_idx)?;
    w.put_u16(info.info().source_index())?;
    w.put_u64(timestamp)?;
    w.put_u16(channel)?;
    w.put_zeros(EVENT_BASE_SIZE - w.pos())?;
    Ok(())
}

fn metadata_block(w: &mut Writer, values: &[MetadataValue]) -> Result<(), Error> {
    for value in values {
        w.put_bytes(value.bytes())?;
    }
    Ok(())
}

fn ttl(w: &mut Writer, e: &TtlEvent) -> Result<(), Error> {
    let info = e.channel_info();
    processor_header(w, info.kind().tag(), info, e.timestamp(), e.channel())?;
    w.put_bytes(e.word())?;
    metadata_block(w, e.metadata())
}

fn text(w: &mut Writer, e: &TextEvent) -> Result<(), Error> {
    let info = e.channel_info();
    processor_header(w, info.kind().tag(), info, e.timestamp(), e.channel())?;
    let bytes = e.text().as_bytes();
    w.put_bytes(bytes)?;
    // zero-pad the remainder of the payload region
    w.put_zeros(info.data_size() - bytes.len())?;
    metadata_block(w, e.metadata())
}

fn binary(w: &mut Writer, e: &BinaryEvent) -> Result<(), Error> {
    let info = e.channel_info();
    processor_header(w, e.binary_kind().tag(), info, e.timestamp(), e.channel())?;
    w.put_bytes(e.bytes())?;
    metadata_block(w, e.metadata())
}

fn spike(w: &mut Writer, e: &SpikeEvent) -> Result<(), Error> {
    let info = e.channel_info();
    let source = info.info().source();
    w.put_u8(EventType::SpikeEvent as u8)?;
    w.put_u8(info.electrode().tag())?;
    w.put_u16(source.source_node_id)?;
    w.put_u16(source.sub_processor_idx)?;
    w.put_u16(info.info().source_index())?;
    w.put_u64(e.timestamp())?;
    w.put_zeros(SPIKE_BASE_SIZE - w.pos())?;
    // thresholds in ascending lane order, then the channel-major waveform
    for &t in e.thresholds() {
        w.put_f32(t)?;
    }
    for &s in e.samples() {
        w.put_f32(s)?;
    }
    metadata_block(w, e.metadata())
}
