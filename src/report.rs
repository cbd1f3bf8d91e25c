//! Report sink. Renders a [`DiskReport`] as plain text or JSON; the
//! decoders never write output themselves.

use std::io::{self, Write};

use crate::config::OutputFormat;
use crate::error::Anomaly;
use crate::fs::{ChainStatus, ClusterChain};
use crate::image::SECTOR_SIZE;
use crate::inspect::{DiskReport, FileReport, PartitionReport};
use crate::partition::format_size;

/// Owns the output stream for one run.
pub struct Reporter<W: Write> {
    out: W,
    format: OutputFormat,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W, format: OutputFormat) -> Self {
        Self { out, format }
    }

    pub fn write(&mut self, report: &DiskReport) -> anyhow::Result<()> {
        match self.format {
            OutputFormat::Text => write_text(&mut self.out, report)?,
            OutputFormat::Json => {
                serde_json::to_writer_pretty(&mut self.out, report)?;
                writeln!(self.out)?;
            }
        }
        self.out.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Render the whole report as text.
pub fn write_text<W: Write>(out: &mut W, report: &DiskReport) -> io::Result<()> {
    writeln!(
        out,
        "Image size: {} ({} bytes)",
        format_size(report.image_size),
        report.image_size
    )?;
    writeln!(
        out,
        "MBR: disk signature {:#010X}, boot signature {:#06X}",
        report.mbr.disk_signature, report.mbr.boot_signature
    )?;
    writeln!(
        out,
        "  {:<4} {:<4} {:<24} {:>12} {:>12} {:>10}",
        "Slot", "Boot", "Type", "Start LBA", "Sectors", "Size"
    )?;
    for (slot, entry) in report.mbr.entries.iter().enumerate() {
        if entry.is_unused() {
            writeln!(out, "  {slot:<4} (unused)")?;
            continue;
        }
        let kind = format!(
            "{:#04X} {}",
            entry.partition_type,
            entry.partition_type_name()
        );
        writeln!(
            out,
            "  {:<4} {:<4} {:<24} {:>12} {:>12} {:>10}",
            slot,
            if entry.is_bootable() { "*" } else { "" },
            kind,
            entry.start_lba,
            entry.size_lba,
            format_size(entry.size_bytes())
        )?;
    }
    write_anomalies(out, &report.anomalies, "")?;

    if report.partitions.is_empty() {
        writeln!(out, "\nNo partitions in use.")?;
    }
    for part in &report.partitions {
        writeln!(out)?;
        write_partition(out, part)?;
    }
    Ok(())
}

fn write_partition<W: Write>(out: &mut W, part: &PartitionReport) -> io::Result<()> {
    writeln!(
        out,
        "Partition {} at LBA {} (offset {:#x})",
        part.slot,
        part.entry.start_lba,
        part.start_offset()
    )?;

    let bs = &part.boot_sector;
    writeln!(out, "  Boot sector:")?;
    let fields: [(&str, String); 16] = [
        ("OEM name", bs.oem_name()),
        ("Bytes per sector", bs.bytes_per_sector.to_string()),
        ("Sectors per cluster", bs.sectors_per_cluster.to_string()),
        ("Reserved sectors", bs.reserved_sector_count.to_string()),
        ("FAT count", bs.fat_count.to_string()),
        ("Sectors per FAT", bs.sectors_per_fat.to_string()),
        ("Total sectors", bs.total_sectors().to_string()),
        ("Media descriptor", format!("{:#04X}", bs.media)),
        ("Hidden sectors", bs.hidden_sectors.to_string()),
        ("Root cluster", bs.root_cluster.to_string()),
        ("FS-Info sector", bs.fs_info_sector.to_string()),
        ("Backup boot sector", bs.backup_boot_sector.to_string()),
        ("Volume ID", format!("{:08X}", bs.volume_id)),
        ("Volume label", bs.volume_label()),
        ("Filesystem type", bs.fs_type()),
        ("Signature", format!("{:#06X}", bs.signature)),
    ];
    for (label, value) in fields {
        writeln!(out, "    {label:<22}{value}")?;
    }

    if let Some(info) = &part.fs_info {
        writeln!(out, "  FS-Info:")?;
        writeln!(
            out,
            "    {:<22}{}",
            "Signatures",
            if info.is_valid() { "valid" } else { "INVALID" }
        )?;
        writeln!(out, "    {:<22}{}", "Free clusters", hint(info.free_clusters))?;
        writeln!(
            out,
            "    {:<22}{}",
            "Next free cluster",
            hint(info.next_free_cluster)
        )?;
    }

    if !part.fat_regions.is_empty() {
        writeln!(out, "  FAT regions:")?;
        for region in &part.fat_regions {
            writeln!(
                out,
                "    FAT #{:<3} sector {:<10} offset {:#012x}  {}",
                region.index,
                region.sector,
                region.offset,
                format_size(region.size)
            )?;
        }
    }
    if let Some(free) = part.fat_free_clusters {
        writeln!(out, "    {:<22}{}", "Free clusters (FAT)", free)?;
    }

    if let Some(sector) = part.root_dir_sector {
        let offset = (part.entry.start_lba as u64 + sector) * SECTOR_SIZE as u64;
        writeln!(
            out,
            "  Root directory at sector {sector} (offset {offset:#x}), {} entries:",
            part.files.len()
        )?;
        for file in &part.files {
            write_file(out, file)?;
        }
    }

    write_anomalies(out, &part.anomalies, "  ")
}

fn write_file<W: Write>(out: &mut W, file: &FileReport) -> io::Result<()> {
    let entry = &file.entry;
    let chain = match &file.chain {
        Some(chain) => format_chain(chain),
        None if entry.is_directory() => "<DIR>".to_string(),
        None if entry.is_volume_label() => "<VOLUME>".to_string(),
        None => "-".to_string(),
    };
    writeln!(
        out,
        "    {} {:>10} {:<19} {:<12} {}",
        entry.attributes,
        entry.size,
        entry.modified.to_string(),
        entry.name,
        chain
    )?;
    if let Some(long_name) = &entry.long_name {
        writeln!(out, "{:49}\"{long_name}\"", "")?;
    }
    Ok(())
}

/// `3-5, 9 complete` style summary of a chain.
pub fn format_chain(chain: &ClusterChain) -> String {
    let runs: Vec<String> = chain
        .runs()
        .into_iter()
        .map(|(first, last)| {
            if first == last {
                first.to_string()
            } else {
                format!("{first}-{last}")
            }
        })
        .collect();

    let status = match chain.status {
        ChainStatus::Invalid { value } => format!("INVALID (next {value:#x})"),
        status => status.label().to_string(),
    };
    if runs.is_empty() {
        status
    } else {
        format!("[{}] {status}", runs.join(", "))
    }
}

fn hint(value: u32) -> String {
    if value == crate::fs::fs_info::UNKNOWN {
        "unknown".to_string()
    } else {
        value.to_string()
    }
}

fn write_anomalies<W: Write>(out: &mut W, anomalies: &[Anomaly], indent: &str) -> io::Result<()> {
    for anomaly in anomalies {
        writeln!(out, "{indent}WARNING: {anomaly}")?;
    }
    Ok(())
}
