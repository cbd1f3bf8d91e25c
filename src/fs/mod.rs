//! FAT32 on-disk structures: boot sector, FS-Info sector, directory entries
//! and the allocation table itself.
//!
//! Every decoder here is pure: it takes bytes already read by
//! [`crate::image::DiskImage`] and returns a plain record.

pub mod boot_sector;
pub mod chain;
pub mod directory;
pub mod fs_info;

pub use boot_sector::BootSector;
pub use chain::{ChainStatus, ClusterChain, FatTable};
pub use directory::{parse_directory, Attributes, DirectoryEntry};
pub use fs_info::FsInfo;

/// Decode a byte slice from OEM codepage (CP437) to a UTF-8 String.
///
/// Bytes 0x00-0x7F are ASCII. Bytes 0x80-0xFF are mapped using the standard
/// CP437 table used by DOS and FAT short filenames.
pub(crate) fn decode_oem_string(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| cp437_to_char(b)).collect()
}

fn cp437_to_char(b: u8) -> char {
    if b < 0x80 {
        b as char
    } else {
        CP437_HIGH[b as usize - 0x80]
    }
}

/// CP437 to Unicode mapping for bytes 0x80-0xFF.
#[rustfmt::skip]
const CP437_HIGH: [char; 128] = [
    // 0x80-0x8F
    'Ç','ü','é','â','ä','à','å','ç', 'ê','ë','è','ï','î','ì','Ä','Å',
    // 0x90-0x9F
    'É','æ','Æ','ô','ö','ò','û','ù', 'ÿ','Ö','Ü','¢','£','¥','₧','ƒ',
    // 0xA0-0xAF
    'á','í','ó','ú','ñ','Ñ','ª','º', '¿','⌐','¬','½','¼','¡','«','»',
    // 0xB0-0xBF
    '░','▒','▓','│','┤','╡','╢','╖', '╕','╣','║','╗','╝','╜','╛','┐',
    // 0xC0-0xCF
    '└','┴','┬','├','─','┼','╞','╟', '╚','╔','╩','╦','╠','═','╬','╧',
    // 0xD0-0xDF
    '╨','╤','╥','╙','╘','╒','╓','╫', '╪','┘','┌','█','▄','▌','▐','▀',
    // 0xE0-0xEF
    'α','ß','Γ','π','Σ','σ','µ','τ', 'Φ','Θ','Ω','δ','∞','φ','ε','∩',
    // 0xF0-0xFF
    '≡','±','≥','≤','⌠','⌡','÷','≈', '°','∙','·','√','ⁿ','²','■','\u{00A0}',
];
