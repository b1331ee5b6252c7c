use criterion::{Criterion, black_box, criterion_group, criterion_main};
use unicode_probe::{CodePage, Converter, Portable};

fn bench_conversions(c: &mut Criterion) {
    let sample: Vec<u16> = "Hélène Strauß Jäger ".repeat(64).encode_utf16().collect();

    let utf8 = Converter::with_facility(Portable, CodePage::Utf8);
    let narrow = utf8.to_narrow(&sample).unwrap();

    c.bench_function("wide_to_utf8", |b| {
        b.iter(|| utf8.to_narrow(black_box(&sample)).unwrap())
    });
    c.bench_function("utf8_to_wide", |b| {
        b.iter(|| utf8.to_wide(black_box(&narrow)).unwrap())
    });

    let greek = Converter::with_facility(Portable, CodePage::Greek);
    c.bench_function("wide_to_greek_substituted", |b| {
        b.iter(|| greek.to_narrow(black_box(&sample)).unwrap())
    });
}

criterion_group!(benches, bench_conversions);
criterion_main!(benches);
