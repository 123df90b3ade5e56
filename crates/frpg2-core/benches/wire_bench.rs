use criterion::{criterion_group, criterion_main, Criterion};
use frpg2_core::opcode::OpCode;
use frpg2_core::packet::ReliablePacket;
use frpg2_core::prefix::InitialData;

fn make_dat_packet() -> Vec<u8> {
    ReliablePacket::new(OpCode::Dat, 0x123456, 0x0ABCDE, vec![0xBB; 256]).encode()
}

fn bench_packet(c: &mut Criterion) {
    let mut group = c.benchmark_group("packet");

    let raw = make_dat_packet();

    group.bench_function("decode_dat", |b| {
        b.iter(|| ReliablePacket::decode(&raw).unwrap());
    });

    let packet = ReliablePacket::decode(&raw).unwrap();

    group.bench_function("encode_dat", |b| {
        b.iter(|| packet.encode());
    });

    group.finish();
}

fn bench_prefix(c: &mut Criterion) {
    let mut group = c.benchmark_group("prefix");

    let body = InitialData::encode("76561198012345678").unwrap();

    group.bench_function("encode", |b| {
        b.iter(|| InitialData::encode("76561198012345678").unwrap());
    });

    group.bench_function("decode", |b| {
        b.iter(|| InitialData::decode(&body).unwrap());
    });

    group.finish();
}

criterion_group!(benches, bench_packet, bench_prefix);
criterion_main!(benches);
