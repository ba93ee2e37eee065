use ephystools::chan::{
    ConfigurationObject, DataChannel, DataChannelKind, ElectrodeKind, EventChannel,
    EventChannelKind, SourceInfo, SpikeChannel,
};
use ephystools::metadata::{MetadataField, MetadataType};
use ephystools::{SourceChannelInfo, DEFAULT_SAMPLE_RATE};

fn source() -> SourceInfo {
    SourceInfo::new(100, 0, "acquisition_board", "Acquisition Board")
}

#[test]
fn ttl_data_size_follows_lane_count() {
    let mut ch = EventChannel::new(EventChannelKind::Ttl, source(), 0, 0);
    assert_eq!(ch.data_size(), 1);
    ch.set_num_channels(8);
    assert_eq!(ch.data_size(), 1);
    ch.set_num_channels(9);
    assert_eq!(ch.data_size(), 2);
    ch.set_num_channels(16);
    assert_eq!(ch.data_size(), 2);
    ch.set_num_channels(64);
    assert_eq!(ch.data_size(), 8);
    // length is derived for TTL channels and cannot be set independently
    ch.set_length(100);
    assert_eq!(ch.length(), 8);
    assert_eq!(ch.data_size(), 8);
}

#[test]
fn text_and_array_data_sizes() {
    let mut text = EventChannel::new(EventChannelKind::Text, source(), 0, 0);
    text.set_length(16);
    assert_eq!(text.data_size(), 16);

    for (kind, elem) in [
        (EventChannelKind::Int8Array, 1),
        (EventChannelKind::Uint16Array, 2),
        (EventChannelKind::FloatArray, 4),
        (EventChannelKind::DoubleArray, 8),
        (EventChannelKind::Uint64Array, 8),
    ] {
        let mut ch = EventChannel::new(kind, source(), 0, 0);
        ch.set_length(5);
        assert_eq!(ch.data_size(), 5 * elem, "{:?}", kind);
        assert!(kind.is_binary());
    }
    assert!(!EventChannelKind::Ttl.is_binary());
    assert!(!EventChannelKind::Text.is_binary());
}

#[test]
fn kind_tags_roundtrip() {
    for tag in 0..=u8::MAX {
        if let Some(kind) = EventChannelKind::from_tag(tag) {
            assert_eq!(kind.tag(), tag);
        }
    }
    assert_eq!(EventChannelKind::from_tag(4), None);
    assert_eq!(EventChannelKind::from_tag(20), None);
    assert_eq!(EventChannelKind::Int8Array.tag(), 10);
    assert_eq!(EventChannelKind::DoubleArray.tag(), 19);
}

#[test]
fn spike_channel_sizes() {
    let lanes: Vec<SourceChannelInfo> = (0..4)
        .map(|i| SourceChannelInfo {
            processor_id: 100,
            sub_processor_id: 0,
            channel_idx: i,
        })
        .collect();
    let mut ch = SpikeChannel::new(ElectrodeKind::Tetrode, source(), 0, 0, lanes);
    assert_eq!(ch.num_channels(), 4);
    assert_eq!(ch.num_pre_samples(), 8);
    assert_eq!(ch.num_post_samples(), 32);
    assert_eq!(ch.total_samples(), 40);
    assert_eq!(ch.data_size(), 4 * 40 * 4);
    assert_eq!(ch.channel_data_size(), 40 * 4);
    assert_eq!(ch.source_channel_info().len(), 4);

    ch.set_num_samples(10, 20);
    assert_eq!(ch.total_samples(), 30);
    assert_eq!(ch.data_size(), 4 * 30 * 4);

    assert_eq!(ElectrodeKind::Single.channel_count(), 1);
    assert_eq!(ElectrodeKind::Stereotrode.channel_count(), 2);
}

#[test]
fn data_channel_defaults_reset_and_history() {
    let mut ch = DataChannel::new(DataChannelKind::Headstage, source(), 3, 3);
    assert_eq!(ch.kind(), DataChannelKind::Headstage);
    assert_eq!(ch.bit_volts(), 1.0);
    assert!(ch.is_enabled());
    assert!(!ch.is_monitored());
    assert!(!ch.record_state());
    assert_eq!(ch.info().sample_rate(), DEFAULT_SAMPLE_RATE);
    assert_eq!(ch.info().source_index(), 3);

    ch.set_bit_volts(0.195);
    ch.set_enabled(false);
    ch.set_monitored(true);
    ch.set_record_state(true);
    ch.reset();
    assert_eq!(ch.bit_volts(), 1.0);
    assert!(ch.is_enabled());
    assert!(!ch.is_monitored());
    assert!(!ch.record_state());

    assert_eq!(ch.history(), "");
    ch.add_to_history("acquired");
    ch.add_to_history("bandpass 300-6000 Hz");
    assert_eq!(ch.history(), "acquired\nbandpass 300-6000 Hz");
}

#[test]
fn node_id_tracks_ownership_but_source_does_not() {
    let mut ch = EventChannel::new(EventChannelKind::Ttl, source(), 0, 0);
    assert_eq!(ch.info().node_id(), 100);
    ch.info_mut().set_node_id(104);
    assert_eq!(ch.info().node_id(), 104);
    assert_eq!(ch.info().source().source_node_id, 100);
}

#[test]
fn configuration_object_carries_structure_in_metadata() {
    let mut cfg = ConfigurationObject::new("config.stimulation", source());
    assert_eq!(cfg.descriptor(), "config.stimulation");
    assert!(cfg.should_be_recorded());
    cfg.set_name("stimulation settings");
    cfg.add_metadata(MetadataField::new(
        MetadataType::Float,
        1,
        "pulse amplitude",
        "stim.amplitude",
        "milliamps",
    ));
    assert_eq!(cfg.metadata().len(), 1);
    assert_eq!(cfg.source().source_name, "Acquisition Board");
}

#[test]
fn descriptors_serialize_for_record_files() {
    let mut ch = EventChannel::new(EventChannelKind::Ttl, source(), 2, 0);
    ch.set_num_channels(8);
    ch.info_mut().set_name("digital in");
    ch.info_mut().set_descriptor("events.ttl.digital");
    ch.add_event_metadata(MetadataField::new(
        MetadataType::Uint8,
        1,
        "line",
        "ttl.line",
        "",
    ));

    let json = serde_json::to_string(&ch).unwrap();
    let back: EventChannel = serde_json::from_str(&json).unwrap();
    assert_eq!(back, ch);
    assert_eq!(back.info().name(), "digital in");
    assert_eq!(back.total_event_metadata_size(), 1);
}
