//! Direct reading of the ZIP central directory.
//!
//! `ZipArchive` indexes entries by name, so an archive whose central
//! directory repeats a path exposes only one of the records. The record
//! count stored in the end-of-central-directory record still counts every
//! one, which is how a collapsed listing is noticed and rebuilt here.

use std::io::{self, Read, Seek, SeekFrom};

const EOCD_SIGNATURE: u32 = 0x0605_4b50;
const EOCD_LEN: u64 = 22;
const MAX_COMMENT_LEN: u64 = u16::MAX as u64;

const ZIP64_LOCATOR_SIGNATURE: u32 = 0x0706_4b50;
const ZIP64_LOCATOR_LEN: u64 = 20;
const ZIP64_EOCD_SIGNATURE: u32 = 0x0606_4b50;
const ZIP64_EOCD_LEN: usize = 56;

const CENTRAL_HEADER_SIGNATURE: u32 = 0x0201_4b50;
const CENTRAL_HEADER_LEN: usize = 46;

/// Where the central directory sits and how many records it claims
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CentralDirectory {
    pub start: u64,
    pub size: u64,
    pub records: u64,
}

/// Find the central directory through the end-of-central-directory record
pub(crate) fn locate<R: Read + Seek>(reader: &mut R) -> io::Result<CentralDirectory> {
    let len = reader.seek(SeekFrom::End(0))?;
    let tail_len = len.min(EOCD_LEN + MAX_COMMENT_LEN);
    let tail_start = len - tail_len;

    let mut tail = vec![0u8; tail_len as usize];
    reader.seek(SeekFrom::Start(tail_start))?;
    reader.read_exact(&mut tail)?;

    let eocd = (0..tail.len().saturating_sub(EOCD_LEN as usize - 1))
        .rev()
        .find(|&pos| u32_at(&tail, pos) == EOCD_SIGNATURE)
        .ok_or_else(|| invalid("no end of central directory record"))?;
    let eocd_offset = tail_start + eocd as u64;

    let records = u64::from(u16_at(&tail, eocd + 10));
    let size = u64::from(u32_at(&tail, eocd + 12));
    let offset = u64::from(u32_at(&tail, eocd + 16));

    if records == u64::from(u16::MAX) || size == u64::from(u32::MAX) || offset == u64::from(u32::MAX)
    {
        return locate_zip64(reader, eocd_offset);
    }

    // Measured back from the record so data prepended to the archive is tolerated
    let start = eocd_offset
        .checked_sub(size)
        .ok_or_else(|| invalid("central directory size exceeds archive"))?;

    Ok(CentralDirectory {
        start,
        size,
        records,
    })
}

fn locate_zip64<R: Read + Seek>(reader: &mut R, eocd_offset: u64) -> io::Result<CentralDirectory> {
    let locator_offset = eocd_offset
        .checked_sub(ZIP64_LOCATOR_LEN)
        .ok_or_else(|| invalid("missing zip64 locator"))?;

    let mut locator = [0u8; ZIP64_LOCATOR_LEN as usize];
    reader.seek(SeekFrom::Start(locator_offset))?;
    reader.read_exact(&mut locator)?;
    if u32_at(&locator, 0) != ZIP64_LOCATOR_SIGNATURE {
        return Err(invalid("missing zip64 locator"));
    }
    let record_offset = u64_at(&locator, 8);

    let mut record = [0u8; ZIP64_EOCD_LEN];
    reader.seek(SeekFrom::Start(record_offset))?;
    reader.read_exact(&mut record)?;
    if u32_at(&record, 0) != ZIP64_EOCD_SIGNATURE {
        return Err(invalid("bad zip64 end of central directory record"));
    }

    let records = u64_at(&record, 32);
    let size = u64_at(&record, 40);
    let start = record_offset
        .checked_sub(size)
        .ok_or_else(|| invalid("central directory size exceeds archive"))?;

    Ok(CentralDirectory {
        start,
        size,
        records,
    })
}

/// Every entry name in central directory order, repeats included
pub(crate) fn names<R: Read + Seek>(
    reader: &mut R,
    directory: &CentralDirectory,
) -> io::Result<Vec<String>> {
    let size = usize::try_from(directory.size)
        .map_err(|_| invalid("central directory too large"))?;
    let mut buf = vec![0u8; size];
    reader.seek(SeekFrom::Start(directory.start))?;
    reader.read_exact(&mut buf)?;

    let mut names = Vec::new();
    let mut pos = 0usize;
    while (names.len() as u64) < directory.records {
        if pos + CENTRAL_HEADER_LEN > buf.len() || u32_at(&buf, pos) != CENTRAL_HEADER_SIGNATURE {
            return Err(invalid("truncated central directory"));
        }

        let name_len = usize::from(u16_at(&buf, pos + 28));
        let extra_len = usize::from(u16_at(&buf, pos + 30));
        let comment_len = usize::from(u16_at(&buf, pos + 32));

        let name_start = pos + CENTRAL_HEADER_LEN;
        let name = buf
            .get(name_start..name_start + name_len)
            .ok_or_else(|| invalid("truncated central directory"))?;
        names.push(String::from_utf8_lossy(name).into_owned());

        pos = name_start + name_len + extra_len + comment_len;
    }

    Ok(names)
}

fn invalid(reason: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, reason.to_string())
}

fn u16_at(buf: &[u8], pos: usize) -> u16 {
    u16::from_le_bytes([buf[pos], buf[pos + 1]])
}

fn u32_at(buf: &[u8], pos: usize) -> u32 {
    u32::from_le_bytes([buf[pos], buf[pos + 1], buf[pos + 2], buf[pos + 3]])
}

fn u64_at(buf: &[u8], pos: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[pos..pos + 8]);
    u64::from_le_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{write_cbz, write_raw_cbz};
    use std::fs::File;
    use tempfile::TempDir;

    #[test]
    fn test_locate_counts_every_record() {
        let dir = TempDir::new().unwrap();
        let path = write_cbz(
            dir.path(),
            "plain.cbz",
            &[("folder/", b""), ("folder/a.jpg", b"a"), ("b.jpg", b"b")],
        );

        let mut file = File::open(&path).unwrap();
        let directory = locate(&mut file).unwrap();
        assert_eq!(directory.records, 3);
        assert_eq!(
            names(&mut file, &directory).unwrap(),
            vec!["folder/", "folder/a.jpg", "b.jpg"]
        );
    }

    #[test]
    fn test_names_keep_repeats() {
        let dir = TempDir::new().unwrap();
        let path = write_raw_cbz(
            dir.path(),
            "dup.cbz",
            &[("a.jpg", b"first"), ("a.jpg", b"second"), ("b.jpg", b"b")],
        );

        let mut file = File::open(&path).unwrap();
        let directory = locate(&mut file).unwrap();
        assert_eq!(directory.records, 3);
        assert_eq!(
            names(&mut file, &directory).unwrap(),
            vec!["a.jpg", "a.jpg", "b.jpg"]
        );
    }

    #[test]
    fn test_locate_rejects_non_zip() {
        let mut cursor = io::Cursor::new(b"This is not a ZIP file".to_vec());
        let err = locate(&mut cursor).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_names_rejects_truncated_directory() {
        let directory = CentralDirectory {
            start: 0,
            size: 10,
            records: 1,
        };
        let mut cursor = io::Cursor::new(vec![0u8; 10]);
        assert!(names(&mut cursor, &directory).is_err());
    }
}
