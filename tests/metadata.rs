use ephystools::chan::{ElectrodeKind, EventChannel, EventChannelKind, SourceInfo, SpikeChannel};
use ephystools::de;
use ephystools::event::{Event, SpikeBuffer, SpikeEvent, TtlEvent};
use ephystools::metadata::{MetadataField, MetadataType, MetadataValue};
use ephystools::{ser, Error};
use std::sync::Arc;

fn source() -> SourceInfo {
    SourceInfo::new(7, 0, "detector", "Spike Detector")
}

fn ttl_chan_with_i16_slot() -> Arc<EventChannel> {
    let mut ch = EventChannel::new(EventChannelKind::Ttl, source(), 0, 0);
    ch.set_num_channels(8);
    ch.add_event_metadata(MetadataField::new(
        MetadataType::Int16,
        1,
        "trigger code",
        "trigger.code",
        "per-event trigger code",
    ));
    Arc::new(ch)
}

#[test]
fn metadata_shape_is_enforced_both_ways() {
    let chan = ttl_chan_with_i16_slot();

    // channel declares one slot: metadata-less creation is rejected
    assert_eq!(
        TtlEvent::create(&chan, 0, &[0x01], 0).unwrap_err(),
        Error::MetadataPresent
    );

    // wrong type in the slot is rejected
    assert_eq!(
        TtlEvent::create_with_metadata(&chan, 0, &[0x01], 0, vec![MetadataValue::from_u16(3)])
            .unwrap_err(),
        Error::MetadataShapeMismatch
    );

    // the declared type round-trips through the wire
    let ev =
        TtlEvent::create_with_metadata(&chan, 0, &[0x01], 0, vec![MetadataValue::from_i16(-3)])
            .unwrap();
    let msg = ser::event(&Event::Ttl(ev.clone())).unwrap();
    assert_eq!(msg.len(), 24 + 1 + 2);
    let back = de::ttl(&msg, &chan).unwrap();
    assert_eq!(back, ev);
    assert_eq!(back.metadata().len(), 1);
    assert_eq!(back.metadata()[0].as_i16(), Some(-3));
}

#[test]
fn zero_slot_channel_rejects_metadata() {
    let mut ch = EventChannel::new(EventChannelKind::Ttl, source(), 0, 0);
    ch.set_num_channels(8);
    let chan = Arc::new(ch);
    assert_eq!(
        TtlEvent::create_with_metadata(&chan, 0, &[0x01], 0, vec![MetadataValue::from_i16(1)])
            .unwrap_err(),
        Error::MetadataShapeMismatch
    );
    // and the metadata-less factory is the right one here
    assert!(TtlEvent::create(&chan, 0, &[0x01], 0).is_ok());
}

#[test]
fn spike_metadata_rules_match_event_rules() {
    let mut ch = SpikeChannel::new(ElectrodeKind::Single, source(), 0, 0, Vec::new());
    ch.add_event_metadata(MetadataField::new(
        MetadataType::Float,
        1,
        "sort score",
        "sorter.score",
        "",
    ));
    let chan = Arc::new(ch);

    let mut buf = SpikeBuffer::new(&chan);
    assert_eq!(
        SpikeEvent::create(&chan, 0, &[1.0], &mut buf).unwrap_err(),
        Error::MetadataPresent
    );
    assert_eq!(
        SpikeEvent::create_with_metadata(
            &chan,
            0,
            &[1.0],
            &mut buf,
            vec![MetadataValue::from_f64(0.5)],
        )
        .unwrap_err(),
        Error::MetadataShapeMismatch
    );
    // rejections above did not consume the buffer
    let ev = SpikeEvent::create_with_metadata(
        &chan,
        0,
        &[1.0],
        &mut buf,
        vec![MetadataValue::from_f32(0.5)],
    )
    .unwrap();

    let msg = ser::event(&Event::Spike(ev.clone())).unwrap();
    let back = de::spike(&msg, &chan).unwrap();
    assert_eq!(back.metadata()[0].as_f32(), Some(0.5));
    assert_eq!(back, ev);
}

#[test]
fn multi_slot_metadata_roundtrip() {
    let mut ch = EventChannel::new(EventChannelKind::Int32Array, source(), 0, 0);
    ch.set_length(2);
    ch.add_event_metadata(MetadataField::new(
        MetadataType::Char,
        6,
        "label",
        "event.label",
        "",
    ));
    ch.add_event_metadata(MetadataField::new(
        MetadataType::Uint64,
        1,
        "software time",
        "event.software_time",
        "",
    ));
    let chan = Arc::new(ch);

    let values = vec![
        MetadataValue::from_str("stim-a"),
        MetadataValue::from_u64(123_456_789),
    ];
    let ev = ephystools::event::BinaryEvent::from_i32_with_metadata(&chan, 10, &[-5i32, 5], 0, values)
        .unwrap();
    let msg = ser::event(&Event::Binary(ev.clone())).unwrap();
    assert_eq!(msg.len(), 24 + 8 + 6 + 8);

    let back = de::binary(&msg, &chan).unwrap();
    assert_eq!(back, ev);
    assert_eq!(back.metadata()[0].as_str(), Some("stim-a"));
    assert_eq!(back.metadata()[1].as_u64(), Some(123_456_789));
}

#[test]
fn metadata_block_size_mismatch_rejects_message() {
    let chan = ttl_chan_with_i16_slot();
    let ev =
        TtlEvent::create_with_metadata(&chan, 0, &[0x01], 0, vec![MetadataValue::from_i16(9)])
            .unwrap();
    let msg = ser::event(&Event::Ttl(ev)).unwrap();

    // strip the metadata block: size check fails against the descriptor
    assert_eq!(
        de::ttl(&msg[..msg.len() - 2], &chan).unwrap_err(),
        Error::MalformedMessage
    );
}
