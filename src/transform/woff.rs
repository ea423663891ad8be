// src/transform/woff.rs

//! SFNT (TrueType/OpenType) table parsing and WOFF/WOFF2 wrapping.
//!
//! Both encoders keep the font's tables byte-for-byte. WOFF compresses each
//! table with zlib; WOFF2 compresses the whole table stream with Brotli and
//! marks `glyf`/`loca` with the null transform, so no glyph rewriting is
//! needed.

use std::io::Write;

use anyhow::{anyhow, bail, Context, Result};
use flate2::write::ZlibEncoder;
use flate2::Compression;

/// `\0\1\0\0`: TrueType outlines.
pub const FLAVOR_TRUETYPE: u32 = 0x0001_0000;
/// `true`: legacy Apple TrueType.
pub const FLAVOR_APPLE_TRUE: u32 = u32::from_be_bytes(*b"true");
/// `OTTO`: CFF outlines.
pub const FLAVOR_CFF: u32 = u32::from_be_bytes(*b"OTTO");
const FLAVOR_COLLECTION: u32 = u32::from_be_bytes(*b"ttcf");

const WOFF_SIGNATURE: u32 = u32::from_be_bytes(*b"wOFF");
const WOFF2_SIGNATURE: u32 = u32::from_be_bytes(*b"wOF2");

const SFNT_HEADER_LEN: usize = 12;
const SFNT_ENTRY_LEN: usize = 16;
const WOFF_HEADER_LEN: usize = 44;
const WOFF_ENTRY_LEN: usize = 20;
const WOFF2_HEADER_LEN: usize = 48;

/// Tag index 63: the four-byte tag follows the flags byte.
const WOFF2_ARBITRARY_TAG: u8 = 0x3F;
/// Transform version 3 is the null transform for `glyf` and `loca`.
const WOFF2_NULL_TRANSFORM_GLYF: u8 = 3 << 6;

const BROTLI_QUALITY: u32 = 11;
const BROTLI_WINDOW: u32 = 22;

/// One table from the SFNT directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SfntTable {
    pub tag: [u8; 4],
    pub checksum: u32,
    pub data: Vec<u8>,
}

impl SfntTable {
    fn tag_str(&self) -> String {
        String::from_utf8_lossy(&self.tag).into_owned()
    }
}

/// A parsed single-font SFNT file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sfnt {
    pub flavor: u32,
    /// Tables sorted by tag.
    pub tables: Vec<SfntTable>,
}

impl Sfnt {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let flavor = read_u32(bytes, 0).context("truncated SFNT header")?;
        match flavor {
            FLAVOR_TRUETYPE | FLAVOR_APPLE_TRUE | FLAVOR_CFF => {}
            FLAVOR_COLLECTION => bail!("font collections (ttc) are not supported"),
            other => bail!("not an SFNT font (version 0x{other:08x})"),
        }

        let num_tables = read_u16(bytes, 4).context("truncated SFNT header")? as usize;
        if num_tables == 0 {
            bail!("font has no tables");
        }

        let mut tables = Vec::with_capacity(num_tables);
        for idx in 0..num_tables {
            let at = SFNT_HEADER_LEN + idx * SFNT_ENTRY_LEN;
            let entry = bytes
                .get(at..at + SFNT_ENTRY_LEN)
                .ok_or_else(|| anyhow!("truncated table directory (entry {idx})"))?;

            let tag = [entry[0], entry[1], entry[2], entry[3]];
            let checksum = read_u32(entry, 4)?;
            let offset = read_u32(entry, 8)? as usize;
            let length = read_u32(entry, 12)? as usize;

            let data = bytes.get(offset..offset + length).ok_or_else(|| {
                anyhow!(
                    "table '{}' points outside the file ({offset}+{length} > {})",
                    String::from_utf8_lossy(&tag),
                    bytes.len()
                )
            })?;
            tables.push(SfntTable {
                tag,
                checksum,
                data: data.to_vec(),
            });
        }
        tables.sort_by(|a, b| a.tag.cmp(&b.tag));

        Ok(Self { flavor, tables })
    }

    pub fn is_truetype(&self) -> bool {
        matches!(self.flavor, FLAVOR_TRUETYPE | FLAVOR_APPLE_TRUE)
    }

    /// Size of the equivalent uncompressed SFNT file.
    fn total_sfnt_size(&self) -> u32 {
        let tables: usize = self.tables.iter().map(|t| pad4(t.data.len())).sum();
        (SFNT_HEADER_LEN + SFNT_ENTRY_LEN * self.tables.len() + tables) as u32
    }
}

/// Wrap a font as WOFF 1.0.
pub fn encode_woff(font: &Sfnt) -> Result<Vec<u8>> {
    let num_tables = font.tables.len();
    let mut data_offset = WOFF_HEADER_LEN + WOFF_ENTRY_LEN * num_tables;

    let mut directory = Vec::with_capacity(WOFF_ENTRY_LEN * num_tables);
    let mut payload = Vec::new();

    for table in &font.tables {
        let compressed = zlib(&table.data)
            .with_context(|| format!("compressing table '{}'", table.tag_str()))?;
        // Tables that do not shrink are stored as-is.
        let stored: &[u8] = if compressed.len() < table.data.len() {
            &compressed
        } else {
            &table.data
        };

        directory.extend_from_slice(&table.tag);
        directory.extend_from_slice(&(data_offset as u32).to_be_bytes());
        directory.extend_from_slice(&(stored.len() as u32).to_be_bytes());
        directory.extend_from_slice(&(table.data.len() as u32).to_be_bytes());
        directory.extend_from_slice(&table.checksum.to_be_bytes());

        payload.extend_from_slice(stored);
        pad_to_4(&mut payload);
        data_offset += pad4(stored.len());
    }

    let total_len = WOFF_HEADER_LEN + directory.len() + payload.len();
    let mut out = Vec::with_capacity(total_len);
    out.extend_from_slice(&WOFF_SIGNATURE.to_be_bytes());
    out.extend_from_slice(&font.flavor.to_be_bytes());
    out.extend_from_slice(&(total_len as u32).to_be_bytes());
    out.extend_from_slice(&(num_tables as u16).to_be_bytes());
    out.extend_from_slice(&0u16.to_be_bytes()); // reserved
    out.extend_from_slice(&font.total_sfnt_size().to_be_bytes());
    out.extend_from_slice(&1u16.to_be_bytes()); // major version
    out.extend_from_slice(&0u16.to_be_bytes()); // minor version
    out.extend_from_slice(&[0u8; 20]); // no metadata, no private block
    out.extend_from_slice(&directory);
    out.extend_from_slice(&payload);

    Ok(out)
}

/// Wrap a font as WOFF 2.0.
pub fn encode_woff2(font: &Sfnt) -> Result<Vec<u8>> {
    // `loca` goes directly after `glyf` in the directory and the stream.
    let mut order: Vec<&SfntTable> = font.tables.iter().filter(|t| &t.tag != b"loca").collect();
    if let Some(loca) = font.tables.iter().find(|t| &t.tag == b"loca") {
        let at = order
            .iter()
            .position(|t| &t.tag == b"glyf")
            .map(|i| i + 1)
            .unwrap_or(order.len());
        order.insert(at, loca);
    }

    let mut directory = Vec::new();
    let mut stream = Vec::new();
    for table in &order {
        let flags = if &table.tag == b"glyf" || &table.tag == b"loca" {
            WOFF2_ARBITRARY_TAG | WOFF2_NULL_TRANSFORM_GLYF
        } else {
            WOFF2_ARBITRARY_TAG
        };
        directory.push(flags);
        directory.extend_from_slice(&table.tag);
        write_uint_base128(&mut directory, table.data.len() as u32);
        stream.extend_from_slice(&table.data);
    }

    let compressed = brotli_compress(&stream).context("compressing font data")?;

    let unpadded = WOFF2_HEADER_LEN + directory.len() + compressed.len();
    let total_len = pad4(unpadded);

    let mut out = Vec::with_capacity(total_len);
    out.extend_from_slice(&WOFF2_SIGNATURE.to_be_bytes());
    out.extend_from_slice(&font.flavor.to_be_bytes());
    out.extend_from_slice(&(total_len as u32).to_be_bytes());
    out.extend_from_slice(&(order.len() as u16).to_be_bytes());
    out.extend_from_slice(&0u16.to_be_bytes()); // reserved
    out.extend_from_slice(&font.total_sfnt_size().to_be_bytes());
    out.extend_from_slice(&(compressed.len() as u32).to_be_bytes());
    out.extend_from_slice(&1u16.to_be_bytes()); // major version
    out.extend_from_slice(&0u16.to_be_bytes()); // minor version
    out.extend_from_slice(&[0u8; 20]); // no metadata, no private block
    out.extend_from_slice(&directory);
    out.extend_from_slice(&compressed);
    pad_to_4(&mut out);

    Ok(out)
}

/// Variable-length big-endian base-128 with a continuation bit, as used by
/// the WOFF2 table directory.
pub fn write_uint_base128(out: &mut Vec<u8>, mut value: u32) {
    let mut groups = [0u8; 5];
    let mut len = 0;
    loop {
        groups[len] = (value & 0x7F) as u8;
        len += 1;
        value >>= 7;
        if value == 0 {
            break;
        }
    }
    for idx in (0..len).rev() {
        let continuation = if idx > 0 { 0x80 } else { 0 };
        out.push(groups[idx] | continuation);
    }
}

fn zlib(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

fn brotli_compress(data: &[u8]) -> Result<Vec<u8>> {
    let mut writer = brotli::CompressorWriter::new(Vec::new(), 4096, BROTLI_QUALITY, BROTLI_WINDOW);
    writer.write_all(data)?;
    writer.flush()?;
    Ok(writer.into_inner())
}

fn pad4(len: usize) -> usize {
    (len + 3) & !3
}

fn pad_to_4(buf: &mut Vec<u8>) {
    buf.resize(pad4(buf.len()), 0);
}

fn read_u16(bytes: &[u8], at: usize) -> Result<u16> {
    let raw = bytes
        .get(at..at + 2)
        .ok_or_else(|| anyhow!("unexpected end of data at {at}"))?;
    Ok(u16::from_be_bytes([raw[0], raw[1]]))
}

fn read_u32(bytes: &[u8], at: usize) -> Result<u32> {
    let raw = bytes
        .get(at..at + 4)
        .ok_or_else(|| anyhow!("unexpected end of data at {at}"))?;
    Ok(u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]))
}

/// Build a minimal SFNT file out of raw tables. Used by tests across the
/// crate to fabricate fonts without shipping binary fixtures.
#[doc(hidden)]
pub fn build_sfnt(flavor: u32, tables: &[(&[u8; 4], &[u8])]) -> Vec<u8> {
    let mut sorted: Vec<_> = tables.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let mut out = Vec::new();
    out.extend_from_slice(&flavor.to_be_bytes());
    out.extend_from_slice(&(sorted.len() as u16).to_be_bytes());
    out.extend_from_slice(&[0u8; 6]); // searchRange, entrySelector, rangeShift

    let mut offset = SFNT_HEADER_LEN + SFNT_ENTRY_LEN * sorted.len();
    for (tag, data) in &sorted {
        out.extend_from_slice(*tag);
        out.extend_from_slice(&0u32.to_be_bytes());
        out.extend_from_slice(&(offset as u32).to_be_bytes());
        out.extend_from_slice(&(data.len() as u32).to_be_bytes());
        offset += pad4(data.len());
    }
    for (_, data) in &sorted {
        out.extend_from_slice(data);
        pad_to_4(&mut out);
    }
    out
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;

    fn sample_font() -> Vec<u8> {
        let glyf = [7u8; 300];
        let tables: [(&[u8; 4], &[u8]); 4] = [
            (b"head", &[1, 2, 3, 4, 5, 6]),
            (b"loca", &[0, 0, 1, 44]),
            (b"glyf", &glyf),
            (b"cmap", &[9; 10]),
        ];
        build_sfnt(FLAVOR_TRUETYPE, &tables)
    }

    #[test]
    fn parses_and_sorts_tables() {
        let font = Sfnt::parse(&sample_font()).unwrap();
        let tags: Vec<&[u8; 4]> = font.tables.iter().map(|t| &t.tag).collect();
        assert_eq!(tags, vec![b"cmap", b"glyf", b"head", b"loca"]);
        assert!(font.is_truetype());
        assert_eq!(font.tables[2].data, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn rejects_collections_and_garbage() {
        let mut ttc = sample_font();
        ttc[0..4].copy_from_slice(b"ttcf");
        assert!(Sfnt::parse(&ttc).unwrap_err().to_string().contains("collections"));
        assert!(Sfnt::parse(b"hello world!").is_err());
        assert!(Sfnt::parse(&[0, 1]).is_err());
    }

    #[test]
    fn woff_header_and_compressed_table_round_trip() {
        let font = Sfnt::parse(&sample_font()).unwrap();
        let woff = encode_woff(&font).unwrap();

        assert_eq!(&woff[0..4], b"wOFF");
        assert_eq!(read_u32(&woff, 4).unwrap(), FLAVOR_TRUETYPE);
        assert_eq!(read_u32(&woff, 8).unwrap() as usize, woff.len());
        assert_eq!(read_u16(&woff, 12).unwrap(), 4);
        assert_eq!(read_u32(&woff, 16).unwrap(), font.total_sfnt_size());

        // glyf is the second directory entry and compresses well.
        let entry = WOFF_HEADER_LEN + WOFF_ENTRY_LEN;
        assert_eq!(&woff[entry..entry + 4], b"glyf");
        let offset = read_u32(&woff, entry + 4).unwrap() as usize;
        let comp_len = read_u32(&woff, entry + 8).unwrap() as usize;
        let orig_len = read_u32(&woff, entry + 12).unwrap() as usize;
        assert_eq!(orig_len, 300);
        assert!(comp_len < orig_len);
        assert_eq!(offset % 4, 0);

        let mut inflated = Vec::new();
        flate2::read::ZlibDecoder::new(&woff[offset..offset + comp_len])
            .read_to_end(&mut inflated)
            .unwrap();
        assert_eq!(inflated, vec![7u8; 300]);
    }

    #[test]
    fn woff2_stream_decompresses_to_tables_with_loca_after_glyf() {
        let font = Sfnt::parse(&sample_font()).unwrap();
        let woff2 = encode_woff2(&font).unwrap();

        assert_eq!(&woff2[0..4], b"wOF2");
        assert_eq!(read_u32(&woff2, 8).unwrap() as usize, woff2.len());
        assert_eq!(woff2.len() % 4, 0);
        assert_eq!(read_u16(&woff2, 12).unwrap(), 4);

        // Directory: flags, tag, one-byte lengths (all tables < 128 bytes
        // except glyf, which needs two).
        let dir = &woff2[WOFF2_HEADER_LEN..];
        assert_eq!(dir[0], 0x3F);
        assert_eq!(&dir[1..5], b"cmap");
        assert_eq!(dir[5], 10);
        assert_eq!(dir[6], 0xFF);
        assert_eq!(&dir[7..11], b"glyf");
        assert_eq!(&dir[11..13], &[0x82, 0x2C]); // 300
        assert_eq!(dir[13], 0xFF);
        assert_eq!(&dir[14..18], b"loca");
        assert_eq!(dir[18], 4);
        assert_eq!(&dir[20..24], b"head");

        let compressed_len = read_u32(&woff2, 20).unwrap() as usize;
        let start = WOFF2_HEADER_LEN + 25;
        let mut stream = Vec::new();
        brotli::Decompressor::new(&woff2[start..start + compressed_len], 4096)
            .read_to_end(&mut stream)
            .unwrap();

        let mut expected = vec![9u8; 10];
        expected.extend(vec![7u8; 300]);
        expected.extend([0, 0, 1, 44]);
        expected.extend([1, 2, 3, 4, 5, 6]);
        assert_eq!(stream, expected);
    }

    #[test]
    fn base128_uses_minimal_groups() {
        let encode = |v| {
            let mut out = Vec::new();
            write_uint_base128(&mut out, v);
            out
        };
        assert_eq!(encode(0), vec![0]);
        assert_eq!(encode(127), vec![0x7F]);
        assert_eq!(encode(128), vec![0x81, 0x00]);
        assert_eq!(encode(u32::MAX), vec![0x8F, 0xFF, 0xFF, 0xFF, 0x7F]);
    }
}
