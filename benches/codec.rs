#[allow(unused_imports)]
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use ephystools::chan::{ElectrodeKind, EventChannel, EventChannelKind, SourceInfo, SpikeChannel};
use ephystools::event::{Event, SpikeBuffer, SpikeEvent, TtlEvent};
use ephystools::{de, ser};
use std::sync::Arc;

fn ttl_chan(lanes: u16) -> Arc<EventChannel> {
    let mut ch = EventChannel::new(
        EventChannelKind::Ttl,
        SourceInfo::new(90, 0, "bench_source", "Bench Source"),
        0,
        0,
    );
    ch.set_num_channels(lanes);
    Arc::new(ch)
}

fn tetrode_chan() -> Arc<SpikeChannel> {
    Arc::new(SpikeChannel::new(
        ElectrodeKind::Tetrode,
        SourceInfo::new(90, 0, "bench_source", "Bench Source"),
        0,
        0,
        Vec::new(),
    ))
}

fn serialize_deserialize(c: &mut Criterion) {
    let mut group = c.benchmark_group("Serialize/Deserialize");

    for lanes in [8u16, 64] {
        let chan = ttl_chan(lanes);
        let word = vec![0xAAu8; chan.data_size()];
        let ev = Event::Ttl(TtlEvent::create(&chan, 0, &word, 1).unwrap());
        let mut buf = vec![0u8; ser::message_size(&ev)];
        group.bench_with_input(BenchmarkId::new("ttl", lanes), &lanes, |b, _| {
            b.iter(|| {
                ser::event_into(&mut buf, black_box(&ev)).unwrap();
                let _ = black_box(de::ttl(&buf, &chan).unwrap());
            });
        });
    }

    let chan = tetrode_chan();
    let ev = {
        let mut wave = SpikeBuffer::new(&chan);
        for lane in 0..4 {
            for s in wave.lane_mut(lane).unwrap() {
                *s = lane as f32;
            }
        }
        Event::Spike(SpikeEvent::create(&chan, 0, &[0.0; 4], &mut wave).unwrap())
    };
    let mut buf = vec![0u8; ser::message_size(&ev)];
    group.bench_function("spike_tetrode", |b| {
        b.iter(|| {
            ser::event_into(&mut buf, black_box(&ev)).unwrap();
            let _ = black_box(de::spike(&buf, &chan).unwrap());
        });
    });
}

criterion_group!(benches, serialize_deserialize);

criterion_main!(benches);
