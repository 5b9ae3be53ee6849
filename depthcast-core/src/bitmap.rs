//! 24-bit Windows bitmap encoder.
//!
//! Turns an RGB [`RawFrame`] into a complete BMP file held in memory:
//!
//! ```text
//! offset  size  field
//! ──────  ────  ─────────────────────────────── BITMAPFILEHEADER
//!      0     2  signature "BM"
//!      2     4  file size
//!      6     2  reserved (0)
//!      8     2  reserved (0)
//!     10     4  pixel array offset (54)
//! ──────  ────  ─────────────────────────────── BITMAPINFOHEADER
//!     14     4  DIB header size (40)
//!     18     4  width  (i32)
//!     22     4  height (i32, positive = bottom-up)
//!     26     2  color planes (1)
//!     28     2  bits per pixel (24)
//!     30     4  compression (0 = BI_RGB)
//!     34     4  image size (width * height * 3, unpadded)
//!     38     4  horizontal resolution (0)
//!     42     4  vertical resolution (0)
//!     46     4  palette colors (0)
//!     50     4  important colors (0)
//! ──────  ────  ─────────────────────────────── pixel array
//!     54     …  height rows of `row_size` bytes
//! ```
//!
//! All multi-byte fields are little-endian. The image size field holds
//! the raw sensor byte count without row padding, matching the bytes
//! existing collectors were built against; decoders ignore it for
//! uncompressed bitmaps.
//!
//! ## Pixel order
//!
//! The sensor buffer is reversed byte-for-byte as one flat array and the
//! result is cut into rows. Source pixel `n` lands at output pixel
//! `N - 1 - n` with its channel bytes reversed. Read back as a bottom-up
//! BGR bitmap this yields the source rows in their original vertical
//! order, each mirrored left-to-right, with RGB input landing in the
//! correct BGR slots. Collectors already consume this layout, so it is
//! kept as is rather than replaced by a per-row vertical flip.

use std::io::Write;

use crate::error::DepthcastError;
use crate::frame::{COLOR_BYTES_PER_PIXEL, RawFrame};
use crate::memfile::{MemFile, MemReader};

// ── Constants ────────────────────────────────────────────────────

/// `"BM"`.
pub const SIGNATURE: [u8; 2] = *b"BM";
/// BITMAPFILEHEADER size.
pub const FILE_HEADER_SIZE: u32 = 14;
/// BITMAPINFOHEADER size.
pub const DIB_HEADER_SIZE: u32 = 40;
/// Offset of the pixel array from the start of the file.
pub const PIXEL_ARRAY_OFFSET: u32 = FILE_HEADER_SIZE + DIB_HEADER_SIZE;
pub const BITS_PER_PIXEL: u16 = 24;
pub const COLOR_PLANES: u16 = 1;
/// BI_RGB.
pub const COMPRESSION_NONE: u32 = 0;

/// Padded length in bytes of one 24-bit row of `width` pixels.
///
/// `floor((24 * width + 31) / 32) * 4`
pub const fn row_size(width: u32) -> u64 {
    (BITS_PER_PIXEL as u64 * width as u64 + 31) / 32 * 4
}

/// Total file size for a `width` x `height` 24-bit bitmap.
pub const fn file_size(width: u32, height: u32) -> u64 {
    PIXEL_ARRAY_OFFSET as u64 + row_size(width) * height as u64
}

// ── BitmapHeader ─────────────────────────────────────────────────

/// The combined file and info header (54 bytes on the wire).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitmapHeader {
    pub file_size: u32,
    pub pixel_offset: u32,
    pub dib_header_size: u32,
    pub width: i32,
    pub height: i32,
    pub planes: u16,
    pub bits_per_pixel: u16,
    pub compression: u32,
    pub image_size: u32,
    pub x_pixels_per_meter: i32,
    pub y_pixels_per_meter: i32,
    pub colors_used: u32,
    pub colors_important: u32,
}

impl BitmapHeader {
    /// Encoded size on the wire.
    pub const SIZE: usize = PIXEL_ARRAY_OFFSET as usize;

    /// Header for an uncompressed 24-bit bottom-up bitmap.
    ///
    /// Fails if the dimensions do not fit the header's field widths.
    pub fn for_dimensions(width: u32, height: u32) -> Result<Self, DepthcastError> {
        let too_big = || {
            DepthcastError::InvalidFrame(format!("{width}x{height} exceeds bitmap limits"))
        };
        let signed_width = i32::try_from(width).map_err(|_| too_big())?;
        let signed_height = i32::try_from(height).map_err(|_| too_big())?;
        let image_size = u32::try_from(width as u64 * height as u64 * COLOR_BYTES_PER_PIXEL as u64)
            .map_err(|_| too_big())?;
        let file_size = u32::try_from(file_size(width, height)).map_err(|_| too_big())?;

        Ok(Self {
            file_size,
            pixel_offset: PIXEL_ARRAY_OFFSET,
            dib_header_size: DIB_HEADER_SIZE,
            width: signed_width,
            height: signed_height,
            planes: COLOR_PLANES,
            bits_per_pixel: BITS_PER_PIXEL,
            compression: COMPRESSION_NONE,
            image_size,
            x_pixels_per_meter: 0,
            y_pixels_per_meter: 0,
            colors_used: 0,
            colors_important: 0,
        })
    }

    /// Padded row length implied by the header.
    pub fn row_size(&self) -> usize {
        row_size(self.width.unsigned_abs()) as usize
    }

    /// Serialize to bytes (little-endian).
    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0..2].copy_from_slice(&SIGNATURE);
        buf[2..6].copy_from_slice(&self.file_size.to_le_bytes());
        // 6..10: two reserved u16 fields, left zero.
        buf[10..14].copy_from_slice(&self.pixel_offset.to_le_bytes());
        buf[14..18].copy_from_slice(&self.dib_header_size.to_le_bytes());
        buf[18..22].copy_from_slice(&self.width.to_le_bytes());
        buf[22..26].copy_from_slice(&self.height.to_le_bytes());
        buf[26..28].copy_from_slice(&self.planes.to_le_bytes());
        buf[28..30].copy_from_slice(&self.bits_per_pixel.to_le_bytes());
        buf[30..34].copy_from_slice(&self.compression.to_le_bytes());
        buf[34..38].copy_from_slice(&self.image_size.to_le_bytes());
        buf[38..42].copy_from_slice(&self.x_pixels_per_meter.to_le_bytes());
        buf[42..46].copy_from_slice(&self.y_pixels_per_meter.to_le_bytes());
        buf[46..50].copy_from_slice(&self.colors_used.to_le_bytes());
        buf[50..54].copy_from_slice(&self.colors_important.to_le_bytes());
        buf
    }

    /// Deserialize from the first 54 bytes of a bitmap file.
    pub fn decode(data: &[u8]) -> Result<Self, DepthcastError> {
        if data.len() < Self::SIZE {
            return Err(DepthcastError::InvalidBitmap("shorter than 54-byte header"));
        }
        if data[0..2] != SIGNATURE {
            return Err(DepthcastError::InvalidBitmap("missing BM signature"));
        }
        let u16_at = |o: usize| u16::from_le_bytes([data[o], data[o + 1]]);
        let u32_at = |o: usize| u32::from_le_bytes([data[o], data[o + 1], data[o + 2], data[o + 3]]);
        let i32_at = |o: usize| i32::from_le_bytes([data[o], data[o + 1], data[o + 2], data[o + 3]]);

        Ok(Self {
            file_size: u32_at(2),
            pixel_offset: u32_at(10),
            dib_header_size: u32_at(14),
            width: i32_at(18),
            height: i32_at(22),
            planes: u16_at(26),
            bits_per_pixel: u16_at(28),
            compression: u32_at(30),
            image_size: u32_at(34),
            x_pixels_per_meter: i32_at(38),
            y_pixels_per_meter: i32_at(42),
            colors_used: u32_at(46),
            colors_important: u32_at(50),
        })
    }
}

// ── BitmapFile ───────────────────────────────────────────────────

/// A complete encoded bitmap, ready to be streamed.
#[derive(Debug, Clone)]
pub struct BitmapFile {
    header: BitmapHeader,
    contents: MemReader,
}

impl BitmapFile {
    pub fn header(&self) -> &BitmapHeader {
        &self.header
    }

    /// Size of the whole file in bytes.
    pub fn file_size(&self) -> u32 {
        self.header.file_size
    }

    /// The encoded file, header included.
    pub fn as_bytes(&self) -> &[u8] {
        self.contents.bytes()
    }

    /// Hand the file over as a sequential reader positioned at byte 0.
    pub fn into_reader(self) -> MemReader {
        let mut reader = self.contents;
        reader.rewind();
        reader
    }
}

// ── Encoding ─────────────────────────────────────────────────────

/// Encode an RGB frame as a 24-bit bitmap.
///
/// The frame is only borrowed for the duration of the call.
pub fn encode(frame: &RawFrame) -> Result<BitmapFile, DepthcastError> {
    frame.validate()?;
    if frame.bytes_per_pixel != COLOR_BYTES_PER_PIXEL {
        return Err(DepthcastError::InvalidFrame(format!(
            "bitmap encoder needs {COLOR_BYTES_PER_PIXEL} bytes per pixel, got {}",
            frame.bytes_per_pixel
        )));
    }

    let header = BitmapHeader::for_dimensions(frame.width, frame.height)?;
    let mut file = MemFile::with_capacity(header.file_size as usize)?;
    file.write_all(&header.encode())?;

    let row_len = frame.row_len();
    let row_size = header.row_size();
    let mut row = Vec::new();
    row.try_reserve_exact(row_size)
        .map_err(|_| DepthcastError::Allocation { size: row_size })?;

    // Output row k is the k-th row-sized slice of the fully reversed
    // buffer, i.e. the k-th source row from the end, read backwards.
    for chunk in frame.data.rchunks_exact(row_len) {
        row.clear();
        row.extend(chunk.iter().rev());
        row.resize(row_size, 0);
        file.write_all(&row)?;
    }

    debug_assert_eq!(file.len(), header.file_size as usize);

    Ok(BitmapFile {
        header,
        contents: file.into_reader(),
    })
}

// ── BitmapEncoder ────────────────────────────────────────────────

/// Stateful wrapper around [`encode`] that keeps running totals.
#[derive(Debug, Default)]
pub struct BitmapEncoder {
    frames_encoded: u64,
    bytes_encoded: u64,
}

impl BitmapEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode one frame, updating the counters on success.
    pub fn encode(&mut self, frame: &RawFrame) -> Result<BitmapFile, DepthcastError> {
        let bmp = encode(frame)?;
        self.frames_encoded += 1;
        self.bytes_encoded += bmp.file_size() as u64;
        Ok(bmp)
    }

    /// Number of frames encoded so far.
    pub fn frames_encoded(&self) -> u64 {
        self.frames_encoded
    }

    /// Sum of encoded file sizes.
    pub fn bytes_encoded(&self) -> u64 {
        self.bytes_encoded
    }
}

// ── Tests ────────────────────────────────────────────────────────
