//! Channel descriptors published by processors
//!
//! A processor describes everything it emits at initialization time:
//! continuous data channels, discrete event channels, spike electrodes and
//! free-form configuration objects. Descriptors capture provenance when they
//! are created and are treated as immutable once published to the pipeline;
//! the only field rewritten afterwards is the owning node id, and only by
//! pipeline machinery between stages. The serde derives exist so recording
//! backends can persist descriptors next to the data they describe.

use crate::metadata::{self, MetadataField};
use crate::{SourceChannelInfo, DEFAULT_SAMPLE_RATE};
use serde::{Deserialize, Serialize};

/// Provenance of a descriptor: which processor created it, and under which
/// sub-processor namespace. Captured at construction, never changed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SourceInfo {
    pub source_node_id: u16,
    pub sub_processor_idx: u16,
    /// Type name of the creating processor (e.g. `acquisition_board`)
    pub source_type: String,
    /// Display name of the creating processor
    pub source_name: String,
}

impl SourceInfo {
    pub fn new(
        source_node_id: u16,
        sub_processor_idx: u16,
        source_type: impl Into<String>,
        source_name: impl Into<String>,
    ) -> SourceInfo {
        SourceInfo {
            source_node_id,
            sub_processor_idx,
            source_type: source_type.into(),
            source_name: source_name.into(),
        }
    }
}

/// Fields shared by every channel descriptor: current owner, provenance,
/// naming, position within the source, sample rate and attached
/// channel-level metadata fields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChannelCommon {
    node_id: u16,
    source: SourceInfo,
    name: String,
    descriptor: String,
    description: String,
    source_index: u16,
    source_type_index: u16,
    sample_rate: f32,
    metadata: Vec<MetadataField>,
}

impl ChannelCommon {
    fn new(source: SourceInfo, source_index: u16, source_type_index: u16) -> ChannelCommon {
        ChannelCommon {
            node_id: source.source_node_id,
            source,
            name: String::new(),
            descriptor: String::new(),
            description: String::new(),
            source_index,
            source_type_index,
            sample_rate: DEFAULT_SAMPLE_RATE,
            metadata: Vec::new(),
        }
    }

    /// Id of the processor currently holding this copy of the descriptor
    pub fn node_id(&self) -> u16 {
        self.node_id
    }

    /// Rewrites the owning node id. Reserved for pipeline machinery as the
    /// descriptor propagates downstream; application code must not call it.
    pub fn set_node_id(&mut self, id: u16) {
        self.node_id = id;
    }

    pub fn source(&self) -> &SourceInfo {
        &self.source
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Machine-readable descriptor, dotted (e.g. `data.continuous.headstage`)
    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    pub fn set_descriptor(&mut self, descriptor: impl Into<String>) {
        self.descriptor = descriptor.into();
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    /// Position of this channel among all channels of its kind in the source
    pub fn source_index(&self) -> u16 {
        self.source_index
    }

    /// Position of this channel within its subtype (e.g. among headstage
    /// channels only)
    pub fn source_type_index(&self) -> u16 {
        self.source_type_index
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
    }

    /// Channel-level metadata fields, in attachment order
    pub fn metadata(&self) -> &[MetadataField] {
        &self.metadata
    }

    pub fn add_metadata(&mut self, field: MetadataField) {
        self.metadata.push(field);
    }
}

/// Subtype of a continuous data channel
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum DataChannelKind {
    Headstage = 0,
    Aux = 1,
    Adc = 2,
}

/// Descriptor of a continuous-sample channel
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DataChannel {
    common: ChannelCommon,
    kind: DataChannelKind,
    bit_volts: f32,
    enabled: bool,
    monitored: bool,
    recording: bool,
    history: String,
}

impl DataChannel {
    pub fn new(
        kind: DataChannelKind,
        source: SourceInfo,
        source_index: u16,
        source_type_index: u16,
    ) -> DataChannel {
        DataChannel {
            common: ChannelCommon::new(source, source_index, source_type_index),
            kind,
            bit_volts: 1.0,
            enabled: true,
            monitored: false,
            recording: false,
            history: String::new(),
        }
    }

    pub fn kind(&self) -> DataChannelKind {
        self.kind
    }

    pub fn info(&self) -> &ChannelCommon {
        &self.common
    }

    pub fn info_mut(&mut self) -> &mut ChannelCommon {
        &mut self.common
    }

    /// Microvolts represented by one bit of the raw sample
    pub fn bit_volts(&self) -> f32 {
        self.bit_volts
    }

    pub fn set_bit_volts(&mut self, bit_volts: f32) {
        self.bit_volts = bit_volts;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Whether the channel is routed to audio monitoring
    pub fn is_monitored(&self) -> bool {
        self.monitored
    }

    pub fn set_monitored(&mut self, monitored: bool) {
        self.monitored = monitored;
    }

    pub fn record_state(&self) -> bool {
        self.recording
    }

    pub fn set_record_state(&mut self, recording: bool) {
        self.recording = recording;
    }

    /// Append one entry to the processing history. Entries are joined by a
    /// single newline; the trail is append-only.
    pub fn add_to_history(&mut self, entry: &str) {
        if !self.history.is_empty() {
            self.history.push('\n');
        }
        self.history.push_str(entry);
    }

    pub fn history(&self) -> &str {
        &self.history
    }

    /// Restore scale and status flags to their defaults
    pub fn reset(&mut self) {
        self.bit_volts = 1.0;
        self.enabled = true;
        self.monitored = false;
        self.recording = false;
    }
}

/// First kind tag of the typed binary array range
pub const BINARY_BASE_TAG: u8 = 10;
/// Sentinel tag bounding the valid kind range
pub const INVALID_TAG: u8 = 20;

/// Kind of a discrete event channel. Discriminants are the wire tag in
/// byte 1 of every serialized event and keep the numbering of the file
/// formats already in the field, so the gaps are load-bearing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum EventChannelKind {
    Ttl = 3,
    Text = 5,
    Int8Array = 10,
    Uint8Array = 11,
    Int16Array = 12,
    Uint16Array = 13,
    Int32Array = 14,
    Uint32Array = 15,
    Int64Array = 16,
    Uint64Array = 17,
    FloatArray = 18,
    DoubleArray = 19,
}

impl EventChannelKind {
    /// The wire tag of this kind
    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Option<EventChannelKind> {
        use EventChannelKind::*;
        match tag {
            3 => Some(Ttl),
            5 => Some(Text),
            10 => Some(Int8Array),
            11 => Some(Uint8Array),
            12 => Some(Int16Array),
            13 => Some(Uint16Array),
            14 => Some(Int32Array),
            15 => Some(Uint32Array),
            16 => Some(Int64Array),
            17 => Some(Uint64Array),
            18 => Some(FloatArray),
            19 => Some(DoubleArray),
            _ => None,
        }
    }

    /// True for the typed binary array kinds
    pub fn is_binary(self) -> bool {
        (BINARY_BASE_TAG..INVALID_TAG).contains(&self.tag())
    }

    /// Size in bytes of one element of the payload this kind carries.
    /// TTL words and text are byte streams, so their element is one byte.
    pub fn element_size(self) -> usize {
        use EventChannelKind::*;
        match self {
            Ttl | Text | Int8Array | Uint8Array => 1,
            Int16Array | Uint16Array => 2,
            Int32Array | Uint32Array | FloatArray => 4,
            Int64Array | Uint64Array | DoubleArray => 8,
        }
    }
}

/// Descriptor of a discrete-event channel
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventChannel {
    common: ChannelCommon,
    kind: EventChannelKind,
    num_channels: u16,
    length: usize,
    data_size: usize,
    event_metadata: Vec<MetadataField>,
    should_be_recorded: bool,
}

impl EventChannel {
    pub fn new(
        kind: EventChannelKind,
        source: SourceInfo,
        source_index: u16,
        source_type_index: u16,
    ) -> EventChannel {
        let mut chan = EventChannel {
            common: ChannelCommon::new(source, source_index, source_type_index),
            kind,
            num_channels: 1,
            length: 1,
            data_size: 1,
            event_metadata: Vec::new(),
            should_be_recorded: true,
        };
        chan.recompute_data_size();
        chan
    }

    pub fn kind(&self) -> EventChannelKind {
        self.kind
    }

    pub fn info(&self) -> &ChannelCommon {
        &self.common
    }

    pub fn info_mut(&mut self) -> &mut ChannelCommon {
        &mut self.common
    }

    /// Number of virtual lanes. For TTL channels this is the bit width of
    /// the digital word; for the others it differentiates origins within
    /// the same processor.
    pub fn num_channels(&self) -> u16 {
        self.num_channels
    }

    /// Set the number of virtual lanes, recomputing the payload size for
    /// TTL channels (the word is padded to whole bytes).
    pub fn set_num_channels(&mut self, num_channels: u16) {
        self.num_channels = num_channels;
        self.recompute_data_size();
    }

    /// Payload length: maximum characters for text channels, element count
    /// for typed arrays, word bytes for TTL.
    pub fn length(&self) -> usize {
        self.length
    }

    /// Set the payload length. Ignored for TTL channels, whose size is
    /// fixed by the lane count.
    pub fn set_length(&mut self, length: usize) {
        if self.kind == EventChannelKind::Ttl {
            return;
        }
        self.length = length;
        self.recompute_data_size();
    }

    /// Payload size in bytes
    pub fn data_size(&self) -> usize {
        self.data_size
    }

    fn recompute_data_size(&mut self) {
        match self.kind {
            EventChannelKind::Ttl => {
                self.data_size = (usize::from(self.num_channels) + 7) / 8;
                self.length = self.data_size;
            }
            EventChannelKind::Text => {
                self.data_size = self.length;
            }
            _ => {
                self.data_size = self.length * self.kind.element_size();
            }
        }
    }

    /// Event-level metadata fields, in attachment order. These shape the
    /// metadata block every event on this channel must carry, and are
    /// distinct from the channel-level fields in [`ChannelCommon`].
    pub fn event_metadata(&self) -> &[MetadataField] {
        &self.event_metadata
    }

    pub fn add_event_metadata(&mut self, field: MetadataField) {
        self.event_metadata.push(field);
    }

    /// Serialized size of the per-event metadata block
    pub fn total_event_metadata_size(&self) -> usize {
        metadata::fields_size(&self.event_metadata)
    }

    /// A source developer's opinion on whether events from this channel are
    /// worth persisting; record engines may override it.
    pub fn should_be_recorded(&self) -> bool {
        self.should_be_recorded
    }

    pub fn set_should_be_recorded(&mut self, status: bool) {
        self.should_be_recorded = status;
    }
}

/// Electrode geometry of a spike channel. Discriminants are the wire tag in
/// byte 1 of serialized spike events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ElectrodeKind {
    Single = 0,
    Stereotrode = 1,
    Tetrode = 2,
}

impl ElectrodeKind {
    /// The wire tag of this electrode kind
    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Option<ElectrodeKind> {
        match tag {
            0 => Some(ElectrodeKind::Single),
            1 => Some(ElectrodeKind::Stereotrode),
            2 => Some(ElectrodeKind::Tetrode),
            _ => None,
        }
    }

    /// Number of data channels feeding this electrode geometry
    pub fn channel_count(self) -> u16 {
        match self {
            ElectrodeKind::Single => 1,
            ElectrodeKind::Stereotrode => 2,
            ElectrodeKind::Tetrode => 4,
        }
    }
}

/// Descriptor of a spike electrode
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpikeChannel {
    common: ChannelCommon,
    electrode: ElectrodeKind,
    source_channels: Vec<SourceChannelInfo>,
    gain: f32,
    num_pre_samples: usize,
    num_post_samples: usize,
    event_metadata: Vec<MetadataField>,
    should_be_recorded: bool,
}

impl SpikeChannel {
    pub fn new(
        electrode: ElectrodeKind,
        source: SourceInfo,
        source_index: u16,
        source_type_index: u16,
        source_channels: Vec<SourceChannelInfo>,
    ) -> SpikeChannel {
        SpikeChannel {
            common: ChannelCommon::new(source, source_index, source_type_index),
            electrode,
            source_channels,
            gain: 1.0,
            num_pre_samples: 8,
            num_post_samples: 32,
            event_metadata: Vec::new(),
            should_be_recorded: true,
        }
    }

    pub fn electrode(&self) -> ElectrodeKind {
        self.electrode
    }

    pub fn info(&self) -> &ChannelCommon {
        &self.common
    }

    pub fn info_mut(&mut self) -> &mut ChannelCommon {
        &mut self.common
    }

    /// Origin data channels, one per electrode lane
    pub fn source_channel_info(&self) -> &[SourceChannelInfo] {
        &self.source_channels
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn set_gain(&mut self, gain: f32) {
        self.gain = gain;
    }

    /// Set the waveform window around the peak
    pub fn set_num_samples(&mut self, pre: usize, post: usize) {
        self.num_pre_samples = pre;
        self.num_post_samples = post;
    }

    pub fn num_pre_samples(&self) -> usize {
        self.num_pre_samples
    }

    pub fn num_post_samples(&self) -> usize {
        self.num_post_samples
    }

    pub fn total_samples(&self) -> usize {
        self.num_pre_samples + self.num_post_samples
    }

    /// Number of electrode lanes
    pub fn num_channels(&self) -> u16 {
        self.electrode.channel_count()
    }

    /// Waveform size in bytes across all lanes
    pub fn data_size(&self) -> usize {
        usize::from(self.num_channels()) * self.total_samples() * std::mem::size_of::<f32>()
    }

    /// Waveform size in bytes of a single lane
    pub fn channel_data_size(&self) -> usize {
        self.total_samples() * std::mem::size_of::<f32>()
    }

    /// Event-level metadata fields, in attachment order
    pub fn event_metadata(&self) -> &[MetadataField] {
        &self.event_metadata
    }

    pub fn add_event_metadata(&mut self, field: MetadataField) {
        self.event_metadata.push(field);
    }

    /// Serialized size of the per-event metadata block
    pub fn total_event_metadata_size(&self) -> usize {
        metadata::fields_size(&self.event_metadata)
    }

    pub fn should_be_recorded(&self) -> bool {
        self.should_be_recorded
    }

    pub fn set_should_be_recorded(&mut self, status: bool) {
        self.should_be_recorded = status;
    }
}

/// Free-form configuration shared with processors down the chain. Holds no
/// data of its own; structure comes entirely from the attached metadata
/// fields. Not a channel: no sample rate, no indices, no owning node id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationObject {
    source: SourceInfo,
    name: String,
    descriptor: String,
    description: String,
    metadata: Vec<MetadataField>,
    should_be_recorded: bool,
}

impl ConfigurationObject {
    /// The machine-readable `descriptor` string is required up front for
    /// configuration objects; it is the only handle consumers have.
    pub fn new(descriptor: impl Into<String>, source: SourceInfo) -> ConfigurationObject {
        ConfigurationObject {
            source,
            name: String::new(),
            descriptor: descriptor.into(),
            description: String::new(),
            metadata: Vec::new(),
            should_be_recorded: true,
        }
    }

    pub fn source(&self) -> &SourceInfo {
        &self.source
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn metadata(&self) -> &[MetadataField] {
        &self.metadata
    }

    pub fn add_metadata(&mut self, field: MetadataField) {
        self.metadata.push(field);
    }

    pub fn should_be_recorded(&self) -> bool {
        self.should_be_recorded
    }

    pub fn set_should_be_recorded(&mut self, status: bool) {
        self.should_be_recorded = status;
    }
}
