//! Benchmarks for asset lookups through the virtual filesystem.
//!
//! Run with: cargo bench --bench vfs

use std::fs::File;
use std::io::Write;
use std::path::Path;

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use tentacle::assets::ManifestAssetStore;
use tentacle::VirtualFs;

const FILES: usize = 256;

fn populate(root: &Path) {
    std::fs::create_dir_all(root.join("scripts")).unwrap();
    let mut manifest = String::from("return {\n");
    for i in 0..FILES {
        std::fs::write(
            root.join(format!("scripts/mod{i}.lua")),
            format!("value_{i} = {i}"),
        )
        .unwrap();
        manifest.push_str(&format!("  mod{i} = \"scripts/mod{i}.lua\",\n"));
    }
    manifest.push_str("}\n");
    std::fs::write(root.join("manifest.lua"), manifest).unwrap();

    let mut writer = zip::ZipWriter::new(File::create(root.join("data.zip")).unwrap());
    for i in 0..FILES {
        writer
            .start_file(format!("data/blob{i}.txt"), zip::write::FileOptions::default())
            .unwrap();
        writer.write_all(&[b'x'; 1024]).unwrap();
    }
    writer.finish().unwrap();
}

fn benchmark_reads(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    populate(dir.path());

    let mut vfs = VirtualFs::new();
    vfs.mount(dir.path(), false).unwrap();
    vfs.mount(dir.path().join("data.zip"), true).unwrap();

    let mut group = c.benchmark_group("vfs_read");
    group.throughput(Throughput::Elements(FILES as u64));

    group.bench_function("directory", |b| {
        b.iter(|| {
            for i in 0..FILES {
                black_box(vfs.read(&format!("scripts/mod{i}.lua")).unwrap());
            }
        });
    });

    group.bench_function("archive", |b| {
        b.iter(|| {
            for i in 0..FILES {
                black_box(vfs.read(&format!("data/blob{i}.txt")).unwrap());
            }
        });
    });

    group.bench_function("exists_miss", |b| {
        b.iter(|| black_box(vfs.exists("data/not_there.txt")));
    });

    group.finish();
}

fn benchmark_manifest(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    populate(dir.path());

    let mut vfs = VirtualFs::new();
    vfs.mount(dir.path(), false).unwrap();

    let mut group = c.benchmark_group("manifest");
    group.sample_size(20);

    group.bench_function("load_256_assets", |b| {
        b.iter(|| black_box(ManifestAssetStore::load(&vfs, "manifest.lua").unwrap()));
    });

    let store = ManifestAssetStore::load(&vfs, "manifest.lua").unwrap();
    group.bench_function("lookup_by_name", |b| {
        b.iter(|| black_box(store.get_asset_by_name("mod128")));
    });

    group.finish();
}

criterion_group!(benches, benchmark_reads, benchmark_manifest);
criterion_main!(benches);
