//! End-to-end tests over synthetic disk images.
//!
//! Images are built byte by byte in memory: an MBR at LBA 0 and one or more
//! FAT32 partitions laid out as boot sector, FAT copies, root directory.
//!
//! Run with: cargo test --test inspect_e2e

use std::io::{Cursor, Write};

use fat_inspector::config::OutputFormat;
use fat_inspector::error::{Anomaly, InspectError, MapTarget};
use fat_inspector::fs::ChainStatus;
use fat_inspector::image::DiskImage;
use fat_inspector::inspect::{inspect, DiskReport, InspectOptions};
use fat_inspector::report::Reporter;

const SECT: usize = 512;
const EOC: u32 = 0x0FFF_FFFF;

struct Partition {
    start_lba: u32,
    reserved: u16,
    fat_count: u8,
    fat: Vec<u32>,
    root: Vec<[u8; 32]>,
}

impl Partition {
    fn sectors(&self) -> usize {
        self.reserved as usize + self.fat_count as usize + 1
    }
}

fn dir_entry(name: &[u8; 11], attr: u8, cluster: u32, size: u32) -> [u8; 32] {
    let mut e = [0u8; 32];
    e[0..11].copy_from_slice(name);
    e[11] = attr;
    e[20..22].copy_from_slice(&((cluster >> 16) as u16).to_le_bytes());
    e[26..28].copy_from_slice(&(cluster as u16).to_le_bytes());
    e[28..32].copy_from_slice(&size.to_le_bytes());
    e
}

/// Lay out an image holding `parts` at their MBR slots. One sector per
/// cluster and per FAT. The FS-Info index is left at zero, so the boot sector
/// itself is decoded as a (signature-less) FS-Info sector.
fn build_image(parts: &[Option<Partition>], mbr_signature: u16) -> Vec<u8> {
    let end = parts
        .iter()
        .flatten()
        .map(|p| p.start_lba as usize + p.sectors())
        .max()
        .unwrap_or(1);
    let mut disk = vec![0u8; end * SECT];

    disk[440..444].copy_from_slice(&0xCAFE_F00Du32.to_le_bytes());
    disk[510..512].copy_from_slice(&mbr_signature.to_le_bytes());

    for (slot, part) in parts.iter().enumerate() {
        let Some(part) = part else { continue };
        let e = 446 + slot * 16;
        disk[e + 4] = 0x0C;
        disk[e + 8..e + 12].copy_from_slice(&part.start_lba.to_le_bytes());
        disk[e + 12..e + 16].copy_from_slice(&(part.sectors() as u32).to_le_bytes());

        let base = part.start_lba as usize * SECT;
        let bs = &mut disk[base..base + SECT];
        bs[0..3].copy_from_slice(&[0xEB, 0x58, 0x90]);
        bs[3..11].copy_from_slice(b"MKFS.FAT");
        bs[11..13].copy_from_slice(&512u16.to_le_bytes());
        bs[13] = 1;
        bs[14..16].copy_from_slice(&part.reserved.to_le_bytes());
        bs[16] = part.fat_count;
        bs[32..36].copy_from_slice(&(part.sectors() as u32).to_le_bytes());
        bs[36..40].copy_from_slice(&1u32.to_le_bytes());
        bs[44..48].copy_from_slice(&2u32.to_le_bytes());
        bs[71..82].copy_from_slice(b"TESTVOL    ");
        bs[82..90].copy_from_slice(b"FAT32   ");
        bs[510] = 0x55;
        bs[511] = 0xAA;

        for copy in 0..part.fat_count as usize {
            let off = base + (part.reserved as usize + copy) * SECT;
            for (i, entry) in part.fat.iter().enumerate() {
                disk[off + i * 4..off + i * 4 + 4].copy_from_slice(&entry.to_le_bytes());
            }
        }

        let root = base + (part.reserved as usize + part.fat_count as usize) * SECT;
        for (i, entry) in part.root.iter().enumerate() {
            disk[root + i * 32..root + i * 32 + 32].copy_from_slice(entry);
        }
    }
    disk
}

fn minimal_partition() -> Partition {
    Partition {
        start_lba: 1,
        reserved: 1,
        fat_count: 1,
        fat: vec![0x0FFF_FFF8, 0xFFFF_FFFF, EOC, EOC],
        root: vec![dir_entry(b"A          ", 0x20, 3, 0)],
    }
}

fn run(disk: Vec<u8>) -> Result<DiskReport, InspectError> {
    let mut image = DiskImage::new(Cursor::new(disk)).unwrap();
    inspect(&mut image, &InspectOptions::default())
}

// ============================================================================
// Decoding
// ============================================================================

#[test]
fn test_minimal_image() {
    let disk = build_image(&[Some(minimal_partition())], 0xAA55);
    assert_eq!(disk.len(), 4 * SECT);

    let report = run(disk).unwrap();
    assert!(report.anomalies.is_empty());
    assert_eq!(report.mbr.partition_starts(), vec![1]);
    assert_eq!(report.partitions.len(), 1);

    let part = &report.partitions[0];
    assert_eq!(part.boot_sector.volume_label(), "TESTVOL");
    assert_eq!(part.fat_regions.len(), 1);
    assert_eq!(part.fat_regions[0].offset, 2 * SECT as u64);
    assert_eq!(part.root_dir_sector, Some(2));

    assert_eq!(part.files.len(), 1);
    let file = &part.files[0];
    assert_eq!(file.entry.name, "A");
    assert_eq!(file.entry.size, 0);
    let chain = file.chain.as_ref().unwrap();
    assert_eq!(chain.clusters, vec![3]);
    assert_eq!(chain.status, ChainStatus::Complete);
}

#[test]
fn test_unused_slots_are_skipped() {
    let mut second = minimal_partition();
    second.start_lba = 8;
    second.root = vec![dir_entry(b"SECOND  DAT", 0x20, 3, 12)];

    let disk = build_image(&[None, Some(minimal_partition()), None, Some(second)], 0xAA55);
    let report = run(disk).unwrap();

    let slots: Vec<usize> = report.partitions.iter().map(|p| p.slot).collect();
    assert_eq!(slots, vec![1, 3]);
    assert_eq!(report.partitions[1].files[0].entry.name, "SECOND.DAT");
}

#[test]
fn test_bad_mbr_signature_still_decodes() {
    let disk = build_image(&[Some(minimal_partition())], 0x0000);
    let report = run(disk).unwrap();

    assert_eq!(report.anomalies, vec![Anomaly::MbrSignature { found: 0 }]);
    assert_eq!(report.partitions[0].files[0].entry.name, "A");
}

#[test]
fn test_broken_and_cyclic_chains() {
    let part = Partition {
        fat: vec![0x0FFF_FFF8, EOC, EOC, 4, 0x0FFF_FFF7, 6, 5],
        root: vec![
            dir_entry(b"BROKEN  BIN", 0x20, 3, 1024),
            dir_entry(b"LOOP    BIN", 0x20, 5, 1024),
            dir_entry(b"DIR        ", 0x10, 3, 0),
        ],
        ..minimal_partition()
    };
    let report = run(build_image(&[Some(part)], 0xAA55)).unwrap();
    let files = &report.partitions[0].files;

    let broken = files[0].chain.as_ref().unwrap();
    assert_eq!(broken.clusters, vec![3, 4]);
    assert_eq!(broken.status, ChainStatus::Broken);

    let looped = files[1].chain.as_ref().unwrap();
    assert_eq!(looped.clusters, vec![5, 6]);
    assert_eq!(looped.status, ChainStatus::Cycle);

    assert!(files[2].entry.is_directory());
    assert!(files[2].chain.is_none());
}

#[test]
fn test_lfn_records_are_not_files() {
    let mut lfn = [0u8; 32];
    lfn[0] = 0x41;
    lfn[11] = 0x0F;
    let part = Partition {
        root: vec![lfn, dir_entry(b"A          ", 0x20, 3, 0)],
        ..minimal_partition()
    };
    let report = run(build_image(&[Some(part)], 0xAA55)).unwrap();
    let files = &report.partitions[0].files;
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].entry.name, "A");
}

#[test]
fn test_no_reserved_sectors_skips_fs_info() {
    // FAT #0 overlaps the boot sector; nothing is written over it.
    let part = Partition {
        reserved: 0,
        fat: vec![],
        root: vec![dir_entry(b"A          ", 0x20, 0, 0)],
        ..minimal_partition()
    };
    let mut disk = build_image(&[Some(part)], 0xAA55);
    assert_eq!(disk.len(), 3 * SECT);
    // Point the FS-Info index past the end of the image: any attempt to
    // read it would fail the whole run.
    disk[SECT + 48..SECT + 50].copy_from_slice(&100u16.to_le_bytes());

    let report = run(disk).unwrap();
    let part = &report.partitions[0];
    assert!(!part.boot_sector.has_fs_info());
    assert!(part.fs_info.is_none());
    assert!(part.anomalies.is_empty(), "{:?}", part.anomalies);
    assert_eq!(part.fat_regions[0].sector, 0);
    assert_eq!(part.root_dir_sector, Some(1));

    assert_eq!(part.files.len(), 1);
    assert_eq!(part.files[0].entry.name, "A");
    assert_eq!(
        part.files[0].chain.as_ref().map(|c| c.status),
        Some(ChainStatus::Empty)
    );
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_truncated_file_names_failed_mapping() {
    let disk = build_image(&[Some(minimal_partition())], 0xAA55);

    let mut tmp = tempfile::NamedTempFile::new().unwrap();
    tmp.write_all(&disk[..3 * SECT]).unwrap();
    tmp.flush().unwrap();

    let mut image = DiskImage::open(tmp.path()).unwrap();
    let err = inspect(&mut image, &InspectOptions::default()).unwrap_err();
    match &err {
        InspectError::Io { target, .. } => {
            assert_eq!(*target, MapTarget::RootDirectory { partition: 0 })
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("root directory of partition 0"));
}

#[test]
fn test_partition_past_end_of_image() {
    let mut disk = build_image(&[Some(minimal_partition())], 0xAA55);
    disk.truncate(SECT);

    match run(disk).unwrap_err() {
        InspectError::Io { target, .. } => {
            assert_eq!(target, MapTarget::BootSector { partition: 0 })
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_empty_image() {
    match run(Vec::new()).unwrap_err() {
        InspectError::Io { target, .. } => assert_eq!(target, MapTarget::Mbr),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_missing_image_file() {
    let tmp = tempfile::TempDir::new().unwrap();
    let err = DiskImage::open(tmp.path().join("absent.img")).err().unwrap();
    assert!(matches!(err, InspectError::Open { .. }));
}

// ============================================================================
// Output
// ============================================================================

#[test]
fn test_json_report() {
    let report = run(build_image(&[Some(minimal_partition())], 0xAA55)).unwrap();

    let mut reporter = Reporter::new(Vec::new(), OutputFormat::Json);
    reporter.write(&report).unwrap();
    let json: serde_json::Value = serde_json::from_slice(&reporter.into_inner()).unwrap();

    let file = &json["partitions"][0]["files"][0];
    assert_eq!(file["name"], "A");
    assert_eq!(file["chain"]["clusters"], serde_json::json!([3]));
    assert_eq!(file["chain"]["status"], "complete");
}

#[test]
fn test_text_report() {
    let report = run(build_image(&[Some(minimal_partition())], 0xAA55)).unwrap();

    let mut reporter = Reporter::new(Vec::new(), OutputFormat::Text);
    reporter.write(&report).unwrap();
    let text = String::from_utf8(reporter.into_inner()).unwrap();

    assert!(text.contains("Partition 0 at LBA 1"), "{text}");
    assert!(text.contains("TESTVOL"));
    assert!(text.contains("[3] complete"));
}
