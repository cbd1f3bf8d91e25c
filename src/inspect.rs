//! Drives the decoders over one disk image and collects plain report
//! records. Nothing here writes output; see [`crate::report`].

use std::io::{Read, Seek};

use log::{debug, info, warn};
use serde::Serialize;

use crate::config::InspectConfig;
use crate::error::{Anomaly, InspectError, MapTarget};
use crate::fs::{parse_directory, BootSector, ClusterChain, DirectoryEntry, FatTable, FsInfo};
use crate::image::{DiskImage, SECTOR_SIZE};
use crate::partition::mbr::{Mbr, PartitionEntry};

/// Knobs that change what the inspector reads or reports.
#[derive(Debug, Clone, Copy)]
pub struct InspectOptions {
    pub max_chain_length: Option<u32>,
    pub include_deleted: bool,
    pub compare_fat_copies: bool,
}

impl Default for InspectOptions {
    fn default() -> Self {
        Self {
            max_chain_length: None,
            include_deleted: true,
            compare_fat_copies: true,
        }
    }
}

impl From<&InspectConfig> for InspectOptions {
    fn from(config: &InspectConfig) -> Self {
        Self {
            // A zero bound would cut every chain before its first cluster.
            max_chain_length: config.max_chain_length.filter(|&n| n > 0),
            include_deleted: config.include_deleted,
            compare_fat_copies: config.compare_fat_copies,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DiskReport {
    pub image_size: u64,
    pub mbr: Mbr,
    pub anomalies: Vec<Anomaly>,
    pub partitions: Vec<PartitionReport>,
}

/// Location of one FAT copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FatRegion {
    pub index: u8,
    /// Partition-relative sector.
    pub sector: u64,
    /// Absolute byte offset within the image.
    pub offset: u64,
    pub size: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    #[serde(flatten)]
    pub entry: DirectoryEntry,
    /// `None` for entries whose chain is never walked (directories, volume
    /// labels, deleted entries).
    pub chain: Option<ClusterChain>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PartitionReport {
    /// MBR slot (0-3).
    pub slot: usize,
    pub entry: PartitionEntry,
    pub boot_sector: BootSector,
    pub fs_info: Option<FsInfo>,
    pub fat_regions: Vec<FatRegion>,
    /// Partition-relative sector of the root directory, when the geometry
    /// could be derived.
    pub root_dir_sector: Option<u64>,
    /// Free clusters counted from the first FAT.
    pub fat_free_clusters: Option<u32>,
    pub files: Vec<FileReport>,
    pub anomalies: Vec<Anomaly>,
}

impl PartitionReport {
    pub fn start_offset(&self) -> u64 {
        self.entry.start_lba as u64 * SECTOR_SIZE as u64
    }
}

/// Decode the whole image. Only a failed mapping aborts; every other
/// irregularity is recorded as an [`Anomaly`] in the returned report.
pub fn inspect<R: Read + Seek>(
    image: &mut DiskImage<R>,
    options: &InspectOptions,
) -> Result<DiskReport, InspectError> {
    let mbr_sector = image.read_sector(MapTarget::Mbr, 0)?;
    let mbr = Mbr::parse(&mbr_sector);
    let anomalies = mbr.anomalies();
    for anomaly in &anomalies {
        warn!("MBR: {anomaly}");
    }

    let mut partitions = Vec::new();
    for (slot, entry) in mbr.used_entries() {
        info!(
            "partition {slot}: {} at LBA {}, {} sectors",
            entry.partition_type_name(),
            entry.start_lba,
            entry.size_lba
        );
        partitions.push(inspect_partition(image, slot, *entry, options)?);
    }

    Ok(DiskReport {
        image_size: image.len(),
        mbr,
        anomalies,
        partitions,
    })
}

fn inspect_partition<R: Read + Seek>(
    image: &mut DiskImage<R>,
    slot: usize,
    entry: PartitionEntry,
    options: &InspectOptions,
) -> Result<PartitionReport, InspectError> {
    let start = entry.start_lba as u64;
    let sector_offset = |sector: u64| (start + sector) * SECTOR_SIZE as u64;

    let boot_sector = BootSector::parse(
        &image.read_sector(MapTarget::BootSector { partition: slot }, start)?,
    );
    let mut report = PartitionReport {
        slot,
        entry,
        anomalies: boot_sector.anomalies(),
        boot_sector,
        fs_info: None,
        fat_regions: Vec::new(),
        root_dir_sector: None,
        fat_free_clusters: None,
        files: Vec::new(),
    };

    if !entry.is_fat32() {
        report.anomalies.insert(
            0,
            Anomaly::PartitionType {
                partition_type: entry.partition_type,
            },
        );
    }

    let bs = &report.boot_sector;
    if bs.has_fs_info() {
        let sector = image.read_sector(
            MapTarget::FsInfo { partition: slot },
            start + bs.fs_info_sector as u64,
        )?;
        let fs_info = FsInfo::parse(&sector);
        report.anomalies.extend(fs_info.anomalies());
        report.fs_info = Some(fs_info);
    } else {
        debug!("partition {slot}: no reserved sectors, FS-Info skipped");
    }

    // Offsets come from the raw fields and stay meaningful even when the
    // geometry is rejected below.
    report.fat_regions = bs
        .fat_sectors()
        .into_iter()
        .zip(0u8..)
        .map(|(sector, index)| FatRegion {
            index,
            sector,
            offset: sector_offset(sector),
            size: bs.fat_size_bytes(),
        })
        .collect();

    if let Err(reason) = bs.check() {
        warn!("partition {slot}: {reason}; skipping FAT and directory");
        log_anomalies(slot, &report.anomalies);
        return Ok(report);
    }
    report.root_dir_sector = Some(bs.root_dir_sector());

    let fat_len = bs.fat_size_bytes() as usize;
    let first = report.fat_regions[0];
    let fat_view = image.map(
        MapTarget::FatRegion {
            partition: slot,
            index: 0,
        },
        first.offset,
        fat_len,
    )?;
    let fat = FatTable::new(fat_view.as_bytes());

    if options.compare_fat_copies {
        for region in &report.fat_regions[1..] {
            let copy = image.map(
                MapTarget::FatRegion {
                    partition: slot,
                    index: region.index,
                },
                region.offset,
                fat_len,
            )?;
            let differing_entries = fat.count_differences(&FatTable::new(copy.as_bytes()));
            if differing_entries > 0 {
                report.anomalies.push(Anomaly::FatCopyMismatch {
                    copy: region.index,
                    differing_entries,
                });
            }
        }
    }

    let last_cluster = bs.cluster_count().saturating_add(2);
    let free = fat.free_cluster_count(u32::try_from(last_cluster).unwrap_or(u32::MAX));
    report.fat_free_clusters = Some(free);
    if let Some(hint) = report
        .fs_info
        .filter(FsInfo::is_valid)
        .and_then(|info| info.free_clusters_known())
    {
        if hint != free {
            report.anomalies.push(Anomaly::FreeCountMismatch {
                fs_info: hint,
                counted: free,
            });
        }
    }

    let root = image.map(
        MapTarget::RootDirectory { partition: slot },
        sector_offset(bs.root_dir_sector()),
        bs.cluster_size_bytes() as usize,
    )?;
    report.files = parse_directory(root.as_bytes())
        .into_iter()
        .filter(|e| options.include_deleted || !e.deleted)
        .map(|entry| {
            let chain = entry
                .should_walk_chain()
                .then(|| fat.walk(entry.first_cluster(), options.max_chain_length));
            if let Some(chain) = chain.as_ref().filter(|c| c.is_broken()) {
                warn!(
                    "partition {slot}: chain of {} is broken after {} clusters",
                    entry.display_name(),
                    chain.clusters.len()
                );
            }
            FileReport { entry, chain }
        })
        .collect();

    log_anomalies(slot, &report.anomalies);
    info!("partition {slot}: {} root directory entries", report.files.len());

    Ok(report)
}

fn log_anomalies(slot: usize, anomalies: &[Anomaly]) {
    for anomaly in anomalies {
        warn!("partition {slot}: {anomaly}");
    }
}
