use std::{fs, path::Path};

use worldmapper::{MapOptions, MapperError, run_map, run_merge};
use worldmapper_nbt::{COMPOUND_ID, Nbt, compound::NbtCompound, tag::NbtList, tag::NbtTag};
use worldmapper_world::RegionFile;

const STONE: u8 = 1;
const DIRT: u8 = 3;
const COBBLESTONE: u8 = 4;

/// A one-section chunk holding `block` at the first cell, air elsewhere.
fn chunk(block: u8) -> Nbt {
    let mut blocks = vec![0u8; 4096];
    blocks[0] = block;
    let mut section = NbtCompound::new();
    section.put_byte("Y", 0);
    section.put("Blocks", blocks);
    section.put("Data", vec![0u8; 2048]);

    let mut level = NbtCompound::new();
    level.put("Biomes", vec![1u8; 256]);
    level.put("Sections", NbtList::from(vec![NbtTag::Compound(section)]));
    level.put("TileEntities", NbtList::empty(COMPOUND_ID));

    let mut root = NbtCompound::new();
    root.put_component("Level", level);
    Nbt::new(String::new(), root)
}

fn marker(value: i32) -> Nbt {
    let mut root = NbtCompound::new();
    root.put_int("marker", value);
    Nbt::new(String::new(), root)
}

fn write_region(path: &Path, chunks: &[(usize, usize, Nbt)]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut region = RegionFile::create(path).unwrap();
    for (x, z, chunk) in chunks {
        assert!(region.write_chunk(*x, *z, chunk).unwrap());
    }
}

fn open_region(path: &Path) -> RegionFile {
    let mut region = RegionFile::new(path);
    region.load().unwrap();
    region
}

fn first_block(chunk: &Nbt) -> u8 {
    let level = chunk.get_compound("Level").unwrap();
    let section = level.get_list("Sections").unwrap()[0]
        .extract_compound()
        .unwrap();
    section.get_byte_array("Blocks").unwrap()[0]
}

fn write_mapping(dir: &Path, json: &str) -> std::path::PathBuf {
    let path = dir.join("mapping.json");
    fs::write(&path, json).unwrap();
    path
}

#[test]
fn map_rewrites_blocks_and_drops_empty_chunks() {
    let src = tempfile::tempdir().unwrap();
    let dest = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    fs::write(src.path().join("level.dat"), b"level").unwrap();
    fs::create_dir_all(src.path().join("schematics")).unwrap();
    fs::write(src.path().join("schematics/house.schematic"), b"schematic").unwrap();
    fs::write(src.path().join("schematics/tree.bo2"), b"bo2").unwrap();
    let region_path = src.path().join("region/r.0.0.mca");
    write_region(&region_path, &[(0, 0, chunk(STONE)), (1, 0, chunk(DIRT))]);
    let original = fs::read(&region_path).unwrap();

    let mapping = write_mapping(
        work.path(),
        r#"{ "blocks": [
            { "blkid": 1, "newblkid": 4 },
            { "blkid": 3, "newblkid": 0 }
        ] }"#,
    );
    let report = run_map(src.path(), &mapping, dest.path(), MapOptions::default()).unwrap();

    assert_eq!(report.regions_processed, 1);
    assert_eq!(report.files_copied, 3);
    assert!(!report.has_failures());
    assert_eq!(fs::read(dest.path().join("level.dat")).unwrap(), b"level");
    // object files are not block-mapped, only copied
    assert_eq!(
        fs::read(dest.path().join("schematics/house.schematic")).unwrap(),
        b"schematic"
    );
    assert_eq!(fs::read(dest.path().join("schematics/tree.bo2")).unwrap(), b"bo2");
    // the source world is never written to
    assert_eq!(fs::read(&region_path).unwrap(), original);

    let mut region = open_region(&dest.path().join("region/r.0.0.mca"));
    assert_eq!(region.chunk_count(), 1);
    let kept = region.read_chunk(0, 0).unwrap().unwrap();
    assert_eq!(first_block(&kept), COBBLESTONE);
    assert!(region.read_chunk(1, 0).unwrap().is_none());
}

#[test]
fn map_removes_regions_left_without_chunks() {
    let src = tempfile::tempdir().unwrap();
    let dest = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    write_region(&src.path().join("region/r.0.0.mca"), &[(3, 7, chunk(STONE))]);

    let mapping = write_mapping(work.path(), r#"{ "blocks": [ { "blkid": 1, "newblkid": 0 } ] }"#);
    let report = run_map(src.path(), &mapping, dest.path(), MapOptions::default()).unwrap();

    assert_eq!(report.regions_removed, 1);
    assert_eq!(report.regions_processed, 0);
    assert!(dest.path().join("region").is_dir());
    assert!(!dest.path().join("region/r.0.0.mca").exists());
}

#[test]
fn update_mode_skips_unchanged_files() {
    let src = tempfile::tempdir().unwrap();
    let dest = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    fs::write(src.path().join("level.dat"), b"level").unwrap();
    write_region(&src.path().join("region/r.0.0.mca"), &[(0, 0, chunk(STONE))]);
    let mapping = write_mapping(work.path(), r#"{ "blocks": [ { "blkid": 1, "newblkid": 4 } ] }"#);
    let options = MapOptions {
        update: true,
        ..MapOptions::default()
    };

    let first = run_map(src.path(), &mapping, dest.path(), options).unwrap();
    assert_eq!(first.regions_processed, 1);
    assert_eq!(first.files_copied, 1);

    let second = run_map(src.path(), &mapping, dest.path(), options).unwrap();
    assert_eq!(second.regions_processed, 0);
    assert_eq!(second.regions_skipped, 1);
    assert_eq!(second.files_skipped, 1);

    // without update everything is redone
    let full = run_map(src.path(), &mapping, dest.path(), MapOptions::default()).unwrap();
    assert_eq!(full.regions_processed, 1);
}

#[test]
fn broken_region_is_confined_to_its_file() {
    let src = tempfile::tempdir().unwrap();
    let dest = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    fs::create_dir_all(src.path().join("region")).unwrap();
    fs::write(src.path().join("region/r.0.0.mca"), b"truncated").unwrap();
    write_region(&src.path().join("region/r.1.0.mca"), &[(0, 0, chunk(STONE))]);

    let mapping = write_mapping(work.path(), r#"{ "blocks": [ { "blkid": 1, "newblkid": 4 } ] }"#);
    let report = run_map(src.path(), &mapping, dest.path(), MapOptions::default()).unwrap();

    assert_eq!(report.regions_failed, 1);
    assert_eq!(report.regions_processed, 1);
    assert!(report.has_failures());
    assert!(!dest.path().join("region/r.0.0.mca").exists());
    assert!(dest.path().join("region/r.1.0.mca").is_file());
}

#[test]
fn bad_mapping_touches_no_world_file() {
    let src = tempfile::tempdir().unwrap();
    let dest = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    fs::write(src.path().join("level.dat"), b"level").unwrap();
    write_region(&src.path().join("region/r.0.0.mca"), &[(0, 0, chunk(STONE))]);

    for json in [
        r#"{ "blocks": [ { "blkid": 1 "newblkid": 4 } ] }"#,
        r#"{ "mappings": [] }"#,
        r#"{ "blocks": [ { "blkid": 5000, "newblkid": 4 } ] }"#,
        r#"{ "blocks": [ { "blkid": 1, "newblkid": 4, "biomes": ["Atlantis"] } ] }"#,
    ] {
        let mapping = write_mapping(work.path(), json);
        let err = run_map(src.path(), &mapping, dest.path(), MapOptions::default()).unwrap_err();
        assert!(matches!(err, MapperError::Config(_)), "{json}: {err}");
        assert!(err.is_fatal());
        assert_eq!(fs::read_dir(dest.path()).unwrap().count(), 0);
    }
}

#[test]
fn invalid_arguments_are_fatal() {
    let src = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    let mapping = write_mapping(work.path(), r#"{ "blocks": [] }"#);

    let same = run_map(src.path(), &mapping, src.path(), MapOptions::default()).unwrap_err();
    assert!(matches!(same, MapperError::InvalidArguments(_)));

    let missing_src = work.path().join("nowhere");
    let err = run_map(&missing_src, &mapping, work.path(), MapOptions::default()).unwrap_err();
    assert!(err.is_fatal());

    let err = run_map(src.path(), work.path(), &work.path().join("out"), MapOptions::default())
        .unwrap_err();
    assert!(matches!(err, MapperError::InvalidArguments(_)));
}

#[test]
fn merge_overlays_chunks_and_keeps_destination_files() {
    let src = tempfile::tempdir().unwrap();
    let dest = tempfile::tempdir().unwrap();
    fs::write(src.path().join("level.dat"), b"source").unwrap();
    fs::write(src.path().join("session.lock"), b"lock").unwrap();
    fs::write(dest.path().join("level.dat"), b"destination").unwrap();

    let src_region = src.path().join("region/r.0.0.mca");
    write_region(&src_region, &[(1, 1, marker(2)), (0, 0, marker(3))]);
    {
        let mut region = open_region(&src_region);
        region.write_chunk_timestamp(1, 1, 77).unwrap();
    }
    write_region(&src.path().join("region/r.5.5.mca"), &[(4, 4, marker(9))]);
    write_region(&dest.path().join("region/r.0.0.mca"), &[(0, 0, marker(1)), (2, 2, marker(4))]);

    let report = run_merge(src.path(), dest.path(), 6).unwrap();
    assert_eq!(report.regions_processed, 1);
    // r.5.5.mca and session.lock
    assert_eq!(report.files_copied, 2);
    assert_eq!(report.files_skipped, 1);

    assert_eq!(fs::read(dest.path().join("level.dat")).unwrap(), b"destination");
    assert_eq!(fs::read(dest.path().join("session.lock")).unwrap(), b"lock");
    assert!(dest.path().join("region/r.5.5.mca").is_file());

    let mut merged = open_region(&dest.path().join("region/r.0.0.mca"));
    assert_eq!(merged.chunk_count(), 3);
    assert_eq!(merged.read_chunk(0, 0).unwrap().unwrap().get_int("marker"), Some(3));
    assert_eq!(merged.read_chunk(1, 1).unwrap().unwrap().get_int("marker"), Some(2));
    assert_eq!(merged.read_chunk(2, 2).unwrap().unwrap().get_int("marker"), Some(4));
    assert_eq!(merged.chunk_timestamp(1, 1), Some(77));
}

#[test]
fn merge_replaces_destination_with_complete_region() {
    let src = tempfile::tempdir().unwrap();
    let dest = tempfile::tempdir().unwrap();
    let chunks: Vec<_> = (0..32)
        .flat_map(|x| (0..32).map(move |z| (x, z, marker((x * 32 + z) as i32))))
        .collect();
    let src_region = src.path().join("region/r.0.0.mca");
    write_region(&src_region, &chunks);
    write_region(&dest.path().join("region/r.0.0.mca"), &[(0, 0, marker(-1))]);

    let report = run_merge(src.path(), dest.path(), 6).unwrap();
    assert_eq!(report.files_copied, 1);
    assert_eq!(
        fs::read(dest.path().join("region/r.0.0.mca")).unwrap(),
        fs::read(&src_region).unwrap()
    );
}
