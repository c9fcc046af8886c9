//! JFIF density (DPI) tagging for JPEG artifacts.
//!
//! The JPEG bitstream itself carries no physical resolution; print DPI lives
//! in the JFIF APP0 segment's density fields. [`stamp_density`] patches those
//! fields in place when the encoder emitted a JFIF header, or inserts a
//! minimal APP0 segment right after SOI when it did not. Pixel data is never
//! touched. [`read_density`] reads the tag back for verification.

/// JPEG start-of-image marker.
const SOI: [u8; 2] = [0xFF, 0xD8];

/// Density unit code for dots per inch.
const UNITS_DPI: u8 = 0x01;

/// Stamp `dpi` into the JFIF APP0 density fields of a JPEG byte stream.
///
/// Returns the input unchanged if the data does not start with a JPEG SOI
/// marker or its segment structure cannot be walked.
pub fn stamp_density(data: &[u8], dpi: u16) -> Vec<u8> {
    if data.len() < 4 || data[0..2] != SOI {
        return data.to_vec();
    }

    if let Some(offset) = find_jfif_app0(data) {
        let mut out = data.to_vec();
        out[offset + 11] = UNITS_DPI;
        out[offset + 12..offset + 14].copy_from_slice(&dpi.to_be_bytes());
        out[offset + 14..offset + 16].copy_from_slice(&dpi.to_be_bytes());
        return out;
    }

    // No JFIF header: insert a minimal APP0 segment right after SOI.
    // Layout: marker (2) + length (2, = 16) + "JFIF\0" + version 1.2 +
    // units + X/Y density + no thumbnail.
    let mut out = Vec::with_capacity(data.len() + 18);
    out.extend_from_slice(&SOI);
    out.extend_from_slice(&[0xFF, 0xE0, 0x00, 0x10]);
    out.extend_from_slice(b"JFIF\0");
    out.extend_from_slice(&[0x01, 0x02, UNITS_DPI]);
    out.extend_from_slice(&dpi.to_be_bytes());
    out.extend_from_slice(&dpi.to_be_bytes());
    out.extend_from_slice(&[0x00, 0x00]);
    out.extend_from_slice(&data[2..]);
    out
}

/// Read the DPI density tag from a JPEG byte stream.
///
/// Returns `None` when there is no JFIF APP0 segment or its density is not
/// expressed in dots per inch.
pub fn read_density(data: &[u8]) -> Option<u16> {
    let offset = find_jfif_app0(data)?;
    if data[offset + 11] != UNITS_DPI {
        return None;
    }
    Some(u16::from_be_bytes([data[offset + 12], data[offset + 13]]))
}

/// Walk marker segments from SOI and return the offset of a JFIF APP0
/// segment large enough to hold density fields. Stops at SOS/EOI: APP
/// segments only precede entropy-coded data.
fn find_jfif_app0(data: &[u8]) -> Option<usize> {
    if data.len() < 4 || data[0..2] != SOI {
        return None;
    }

    let mut offset = 2;
    while offset + 4 <= data.len() {
        if data[offset] != 0xFF {
            return None;
        }
        let marker = data[offset + 1];
        match marker {
            // Standalone markers carry no length field.
            0x01 | 0xD0..=0xD8 => {
                offset += 2;
                continue;
            }
            0xDA | 0xD9 => return None,
            _ => {}
        }

        let len = u16::from_be_bytes([data[offset + 2], data[offset + 3]]) as usize;
        if len < 2 || offset + 2 + len > data.len() {
            return None;
        }
        if marker == 0xE0 && len >= 16 && data[offset + 4..offset + 9] == *b"JFIF\0" {
            return Some(offset);
        }
        offset += 2 + len;
    }

    None
}
