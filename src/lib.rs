//! Read-only decoder for MBR-partitioned FAT32 disk images.
//!
//! [`inspect::inspect`] walks an image from the MBR down to each root
//! directory entry's cluster chain and returns plain records;
//! [`report::Reporter`] renders them.

pub mod config;
pub mod error;
pub mod fs;
pub mod image;
pub mod inspect;
pub mod logging;
pub mod partition;
pub mod report;
