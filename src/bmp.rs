// Packs captured rows into an uncompressed Windows bitmap held in memory.
// Result: a Vec<u8> that is a complete .bmp file (54-byte header + padded rows),
// ready to be written out in one go.
//
// Layout written here:
//   0..14   BITMAPFILEHEADER  "BM", file size, reserved, pixel-data offset
//   14..54  BITMAPINFOHEADER  size 40, width, -height (top-down), planes, depth, ...
//   54..    rows, top row first, each padded with zeros to a multiple of 4 bytes
use tracing::debug;

use crate::error::CaptureError;
use crate::framebuffer::RowSource;
use crate::types::CaptureGeometry;

pub const FILE_HEADER_SIZE: usize = 14;
pub const INFO_HEADER_SIZE: usize = 40;
pub const HEADER_SIZE: usize = FILE_HEADER_SIZE + INFO_HEADER_SIZE;

const MAGIC: [u8; 2] = *b"BM";
const BI_RGB: u32 = 0;

/// The header fields that vary between captures. Everything else
/// (reserved words, resolution, palette counts) is written as zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BmpHeader {
    pub file_size: u32,
    pub pixel_offset: u32,
    pub width: i32,
    pub height: i32, // negative = rows stored top to bottom
    pub planes: u16,
    pub bits_per_pixel: u16,
    pub compression: u32,
    pub image_size: u32,
}

impl BmpHeader {
    pub fn for_capture(geometry: &CaptureGeometry) -> Self {
        // resolve() guarantees both dimensions fit in i32 and the file size in u32.
        Self {
            file_size: HEADER_SIZE as u32 + geometry.image_size,
            pixel_offset: HEADER_SIZE as u32,
            width: geometry.width as i32,
            height: -(geometry.height as i32),
            planes: 1,
            bits_per_pixel: geometry.bits_per_pixel(),
            compression: BI_RGB,
            image_size: geometry.image_size,
        }
    }

    /// Write all 54 header bytes into the start of `out`. Fields are encoded
    /// little-endian explicitly; zero fields are written too, so `out` need
    /// not be pre-cleared.
    pub fn write_to(&self, out: &mut [u8]) {
        let out = &mut out[..HEADER_SIZE];

        // File header
        out[0..2].copy_from_slice(&MAGIC);
        put_u32(out, 2, self.file_size);
        put_u32(out, 6, 0); // reserved
        put_u32(out, 10, self.pixel_offset);

        // Info header
        put_u32(out, 14, INFO_HEADER_SIZE as u32);
        put_i32(out, 18, self.width);
        put_i32(out, 22, self.height);
        put_u16(out, 26, self.planes);
        put_u16(out, 28, self.bits_per_pixel);
        put_u32(out, 30, self.compression);
        put_u32(out, 34, self.image_size);
        put_i32(out, 38, 0); // horizontal pixels per metre
        put_i32(out, 42, 0); // vertical pixels per metre
        put_u32(out, 46, 0); // palette colours
        put_u32(out, 50, 0); // important colours
    }

    #[cfg(test)]
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < HEADER_SIZE || data[0..2] != MAGIC {
            return None;
        }
        Some(Self {
            file_size: get_u32(data, 2),
            pixel_offset: get_u32(data, 10),
            width: get_u32(data, 18) as i32,
            height: get_u32(data, 22) as i32,
            planes: u16::from_le_bytes([data[26], data[27]]),
            bits_per_pixel: u16::from_le_bytes([data[28], data[29]]),
            compression: get_u32(data, 30),
            image_size: get_u32(data, 34),
        })
    }
}

#[inline]
fn put_u16(out: &mut [u8], at: usize, v: u16) {
    out[at..at + 2].copy_from_slice(&v.to_le_bytes());
}

#[inline]
fn put_u32(out: &mut [u8], at: usize, v: u32) {
    out[at..at + 4].copy_from_slice(&v.to_le_bytes());
}

#[inline]
fn put_i32(out: &mut [u8], at: usize, v: i32) {
    out[at..at + 4].copy_from_slice(&v.to_le_bytes());
}

#[cfg(test)]
fn get_u32(data: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

/// Build the whole bitmap: header first, then one padded row per call to
/// `rows`, top to bottom. Any row failure aborts and drops the partial buffer.
pub fn encode<S: RowSource + ?Sized>(
    geometry: &CaptureGeometry,
    rows: &mut S,
) -> Result<Vec<u8>, CaptureError> {
    // 1) One zeroed allocation for the whole file; padding bytes stay zero.
    let mut data = vec![0u8; HEADER_SIZE + geometry.image_size as usize];

    // 2) Header.
    let header = BmpHeader::for_capture(geometry);
    header.write_to(&mut data);

    // 3) Pixel rows. Only the first row_bytes of each slot are handed out,
    //    so the trailing padding is never touched.
    let row_bytes = geometry.row_bytes();
    let stride = geometry.padded_row_bytes();
    if stride > 0 {
        for slot in data[HEADER_SIZE..].chunks_exact_mut(stride) {
            rows.read_row(&mut slot[..row_bytes])?;
        }
    }

    debug!(file_size = header.file_size, rows = geometry.height, "encoded bitmap");
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::resolve;
    use crate::types::FramebufferGeometry;

    /// Hands out a fixed byte pattern per row and counts the calls.
    struct PatternRows {
        next: u8,
        calls: u32,
    }

    impl RowSource for PatternRows {
        fn read_row(&mut self, row: &mut [u8]) -> Result<(), CaptureError> {
            for b in row.iter_mut() {
                *b = self.next;
                self.next = self.next.wrapping_add(1).max(1); // never 0, so padding stands out
            }
            self.calls += 1;
            Ok(())
        }
    }

    fn pattern() -> PatternRows {
        PatternRows { next: 1, calls: 0 }
    }

    fn geometry(width: u32, height: u32, bits_per_pixel: u32) -> CaptureGeometry {
        let fb = FramebufferGeometry {
            width,
            height,
            virtual_width: width,
            virtual_height: height,
            x_offset: 0,
            y_offset: 0,
            bits_per_pixel,
        };
        resolve(&fb, false).unwrap()
    }

    #[test]
    fn test_scenario_a_header_fields() {
        let g = geometry(4, 2, 24);
        let data = encode(&g, &mut pattern()).unwrap();
        assert_eq!(data.len(), 78);
        assert_eq!(&data[0..2], b"BM");
        assert_eq!(u32::from_le_bytes(data[2..6].try_into().unwrap()), 78);
        assert_eq!(u32::from_le_bytes(data[6..10].try_into().unwrap()), 0);
        assert_eq!(u32::from_le_bytes(data[10..14].try_into().unwrap()), 54);
        assert_eq!(u32::from_le_bytes(data[14..18].try_into().unwrap()), 40);
        assert_eq!(i32::from_le_bytes(data[18..22].try_into().unwrap()), 4);
        assert_eq!(i32::from_le_bytes(data[22..26].try_into().unwrap()), -2);
        assert_eq!(u16::from_le_bytes(data[26..28].try_into().unwrap()), 1);
        assert_eq!(u16::from_le_bytes(data[28..30].try_into().unwrap()), 24);
        assert_eq!(u32::from_le_bytes(data[30..34].try_into().unwrap()), 0);
        assert_eq!(u32::from_le_bytes(data[34..38].try_into().unwrap()), 24);
        assert!(data[38..54].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_scenario_b_length() {
        let g = geometry(5, 1, 32);
        let data = encode(&g, &mut pattern()).unwrap();
        assert_eq!(data.len(), 74);
        let header = BmpHeader::parse(&data).unwrap();
        assert_eq!(header.file_size, 74);
        assert_eq!(header.bits_per_pixel, 32);
    }

    #[test]
    fn test_scenario_c_padding_stays_zero() {
        let g = geometry(3, 1, 24);
        let data = encode(&g, &mut pattern()).unwrap();
        assert_eq!(data.len(), 66);
        assert_eq!(&data[54..63], &[1, 2, 3, 4, 5, 6, 7, 8, 9]);
        assert_eq!(&data[63..66], &[0, 0, 0]);
    }

    #[test]
    fn test_rows_written_in_order_with_padding() {
        let g = geometry(1, 3, 8); // 1 byte per row + 3 padding
        let mut rows = pattern();
        let data = encode(&g, &mut rows).unwrap();
        assert_eq!(rows.calls, 3);
        assert_eq!(&data[54..], &[1, 0, 0, 0, 2, 0, 0, 0, 3, 0, 0, 0]);
    }

    #[test]
    fn test_header_round_trip() {
        for (w, h, bits) in [(4, 2, 24), (5, 1, 32), (3, 7, 16), (1920, 1080, 32)] {
            let g = geometry(w, h, bits);
            let data = encode(&g, &mut pattern()).unwrap();
            let header = BmpHeader::parse(&data).unwrap();
            assert_eq!(header, BmpHeader::for_capture(&g));
            assert_eq!(header.file_size as usize, data.len());
            assert_eq!(header.file_size, 54 + g.image_size);
            assert_eq!(header.pixel_offset, 54);
            assert_eq!(header.width, w as i32);
            assert_eq!(header.height, -(h as i32));
        }
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let g = geometry(7, 5, 24);
        let a = encode(&g, &mut pattern()).unwrap();
        let b = encode(&g, &mut pattern()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_row_failure_aborts() {
        struct FailSecond(u32);
        impl RowSource for FailSecond {
            fn read_row(&mut self, _row: &mut [u8]) -> Result<(), CaptureError> {
                self.0 += 1;
                if self.0 == 2 {
                    return Err(CaptureError::ReadFailure {
                        row: 1,
                        source: std::io::ErrorKind::UnexpectedEof.into(),
                    });
                }
                Ok(())
            }
        }

        let g = geometry(4, 4, 32);
        let err = encode(&g, &mut FailSecond(0)).unwrap_err();
        assert!(matches!(err, CaptureError::ReadFailure { row: 1, .. }));
    }

    #[test]
    fn test_zero_width_reads_nothing() {
        let g = geometry(0, 3, 32);
        let mut rows = pattern();
        let data = encode(&g, &mut rows).unwrap();
        assert_eq!(data.len(), 54);
        assert_eq!(rows.calls, 0);
    }

    #[test]
    fn test_decodes_with_independent_reader() {
        // 3x2 at 24 bits: each row is 9 pixel bytes plus 3 of padding.
        let g = geometry(3, 2, 24);
        let mut rows = pattern();
        let data = encode(&g, &mut rows).unwrap();

        let img = image::load_from_memory_with_format(&data, image::ImageFormat::Bmp)
            .unwrap()
            .to_rgb8();
        assert_eq!(img.dimensions(), (3, 2));
        // Bitmap bytes are B,G,R. Top-down order means the first row read is y=0.
        assert_eq!(img.get_pixel(0, 0).0, [3, 2, 1]);
        assert_eq!(img.get_pixel(2, 0).0, [9, 8, 7]);
        assert_eq!(img.get_pixel(0, 1).0, [12, 11, 10]);
    }
}
