use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use log::debug;

use crate::error::{InspectError, MapTarget};

/// Sector size used for every offset computation.
pub const SECTOR_SIZE: usize = 512;

/// One raw sector.
pub type Sector = [u8; SECTOR_SIZE];

/// A read-only disk image. Regions are read into owned buffers on demand;
/// the full image is never loaded.
pub struct DiskImage<R> {
    reader: R,
    len: u64,
}

impl DiskImage<File> {
    /// Open an image file (or block device) read-only.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, InspectError> {
        let path = path.as_ref();
        let open_err = |source| InspectError::Open {
            path: path.display().to_string(),
            source,
        };
        let file = File::open(path).map_err(open_err)?;
        Self::new(file).map_err(open_err)
    }
}

impl<R: Read + Seek> DiskImage<R> {
    /// Wrap any seekable reader. The image length is taken from the end
    /// position of the reader, which also works for block devices.
    pub fn new(mut reader: R) -> io::Result<Self> {
        let len = reader.seek(SeekFrom::End(0))?;
        Ok(Self { reader, len })
    }

    /// Total image length in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Read `[offset, offset + len)`. The range must lie entirely within the
    /// image.
    pub fn map(&mut self, target: MapTarget, offset: u64, len: usize) -> Result<View, InspectError> {
        let fail = |source| InspectError::Io {
            target,
            offset,
            len: len as u64,
            source,
        };

        let end = offset
            .checked_add(len as u64)
            .ok_or_else(|| fail(io::Error::new(io::ErrorKind::InvalidInput, "offset overflow")))?;
        if end > self.len {
            return Err(fail(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("range ends at {end:#x}, image is only {:#x} bytes", self.len),
            )));
        }

        debug!("mapping {target}: {len} bytes at {offset:#x}");
        self.reader.seek(SeekFrom::Start(offset)).map_err(fail)?;
        let mut bytes = vec![0u8; len];
        self.reader.read_exact(&mut bytes).map_err(fail)?;
        Ok(View { offset, bytes })
    }

    /// Read the sector at absolute `lba`.
    pub fn read_sector(&mut self, target: MapTarget, lba: u64) -> Result<Sector, InspectError> {
        let offset = lba
            .checked_mul(SECTOR_SIZE as u64)
            .ok_or_else(|| InspectError::Io {
                target,
                offset: u64::MAX,
                len: SECTOR_SIZE as u64,
                source: io::Error::new(io::ErrorKind::InvalidInput, "sector address overflow"),
            })?;
        let view = self.map(target, offset, SECTOR_SIZE)?;
        let mut sector = [0u8; SECTOR_SIZE];
        sector.copy_from_slice(view.as_bytes());
        Ok(sector)
    }
}

/// An owned copy of a mapped byte range.
#[derive(Debug, Clone)]
pub struct View {
    offset: u64,
    bytes: Vec<u8>,
}

impl View {
    /// Absolute image offset of the first byte.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn image(len: usize) -> DiskImage<Cursor<Vec<u8>>> {
        let data: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
        DiskImage::new(Cursor::new(data)).unwrap()
    }

    #[test]
    fn test_map_within_bounds() {
        let mut img = image(2048);
        assert_eq!(img.len(), 2048);

        let view = img.map(MapTarget::Mbr, 512, 16).unwrap();
        assert_eq!(view.offset(), 512);
        assert_eq!(view.len(), 16);
        assert_eq!(view.as_bytes()[0], (512 % 251) as u8);
    }

    #[test]
    fn test_map_exactly_to_end() {
        let mut img = image(1024);
        let sector = img.read_sector(MapTarget::Mbr, 1).unwrap();
        assert_eq!(sector[0], (512 % 251) as u8);
    }

    #[test]
    fn test_map_past_end_is_io_failure() {
        let mut img = image(1000);
        let err = img
            .read_sector(MapTarget::BootSector { partition: 0 }, 1)
            .unwrap_err();
        match err {
            InspectError::Io { target, source, .. } => {
                assert_eq!(target, MapTarget::BootSector { partition: 0 });
                assert_eq!(source.kind(), io::ErrorKind::UnexpectedEof);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_map_offset_overflow() {
        let mut img = image(512);
        assert!(img.map(MapTarget::Mbr, u64::MAX - 4, 16).is_err());
        assert!(img.read_sector(MapTarget::Mbr, u64::MAX).is_err());
    }
}
