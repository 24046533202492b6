use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};

/// Magic bytes at the start of every `.portal` container.
pub const MAGIC: &[u8; 4] = b"PRTL";

/// Fixed byte length of the container header.
///
/// Layout: magic (4), version (u32), TOC offset (u64), manifest offset (u64),
/// manifest size (u64), all little-endian.
pub const HEADER_LEN: usize = 32;

/// File entry listed in the archive table of contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub name: String,
    pub offset: u64,
    pub size: u64,
}

/// A `.portal` scene container: header, named payload entries, and the
/// scene manifest XML blob.
#[derive(Debug, Clone)]
pub struct PortalArchive {
    backing: ArchiveBacking,
    version: u32,
    entries: Vec<ArchiveEntry>,
    manifest_xml: String,
}

#[derive(Debug, Clone)]
enum ArchiveBacking {
    File(PathBuf),
    Memory { _label: String, data: Arc<[u8]> },
}

impl PortalArchive {
    /// Opens an archive from disk and eagerly loads the manifest blob.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_buf = path.as_ref().to_path_buf();
        let mut file = File::open(&path_buf)
            .with_context(|| format!("unable to open {}", path_buf.display()))?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)
            .context("unable to read archive into memory")?;

        let (version, entries, manifest_xml) = parse_container(&data)?;

        Ok(Self {
            backing: ArchiveBacking::File(path_buf),
            version,
            entries,
            manifest_xml,
        })
    }

    /// Creates an archive from bytes already resident in memory.
    pub fn from_bytes(label: impl Into<String>, data: Vec<u8>) -> Result<Self> {
        let storage: Arc<[u8]> = Arc::from(data.into_boxed_slice());
        let (version, entries, manifest_xml) = parse_container(&storage)?;
        Ok(Self {
            backing: ArchiveBacking::Memory {
                _label: label.into(),
                data: storage,
            },
            version,
            entries,
            manifest_xml,
        })
    }

    /// Returns the format version stored in the header.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Returns the raw scene manifest XML.
    pub fn manifest_xml(&self) -> &str {
        &self.manifest_xml
    }

    /// Returns the list of payload entries bundled with the scene.
    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    /// Looks up an entry by exact name.
    pub fn entry(&self, name: &str) -> Option<&ArchiveEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    /// Extracts the raw bytes for the named entry.
    pub fn read_entry(&self, name: &str) -> Result<Vec<u8>> {
        let entry = self
            .entry(name)
            .ok_or_else(|| anyhow!("entry not found in archive: {name}"))?;
        match &self.backing {
            ArchiveBacking::File(path) => {
                let mut file = File::open(path)
                    .with_context(|| format!("unable to reopen archive {}", path.display()))?;
                file.seek(SeekFrom::Start(entry.offset))
                    .with_context(|| format!("unable to seek to {}", entry.name))?;
                let mut buffer = vec![0u8; entry.size as usize];
                file.read_exact(&mut buffer)
                    .with_context(|| format!("unable to read {} from archive", entry.name))?;
                Ok(buffer)
            }
            ArchiveBacking::Memory { data, .. } => {
                let start = entry.offset as usize;
                let end = start
                    .checked_add(entry.size as usize)
                    .filter(|end| *end <= data.len())
                    .ok_or_else(|| {
                        anyhow!(
                            "entry {} extends past archive bounds (offset={}, size={})",
                            entry.name,
                            entry.offset,
                            entry.size
                        )
                    })?;
                Ok(data[start..end].to_vec())
            }
        }
    }
}

fn parse_container(data: &[u8]) -> Result<(u32, Vec<ArchiveEntry>, String)> {
    if data.len() < HEADER_LEN {
        return Err(anyhow!(
            "archive too small to contain header (len={})",
            data.len()
        ));
    }
    if &data[..4] != MAGIC {
        return Err(anyhow!(
            "invalid archive magic: expected PRTL, found {:?}",
            &data[..4]
        ));
    }

    let version = read_u32(data, 4)?;
    let toc_offset = read_u64(data, 8)?;
    let manifest_offset = read_u64(data, 16)?;
    let manifest_size = read_u64(data, 24)?;

    let entries = parse_toc(data, toc_offset)?;
    let manifest_xml = slice_checked(data, manifest_offset, manifest_size)
        .context("scene manifest points outside archive bounds")?;
    let manifest_xml = String::from_utf8(manifest_xml.to_vec())
        .map_err(|err| anyhow!("scene manifest is not valid UTF-8: {err}"))?;

    Ok((version, entries, manifest_xml))
}

fn parse_toc(data: &[u8], toc_offset: u64) -> Result<Vec<ArchiveEntry>> {
    let mut cursor = usize::try_from(toc_offset)
        .ok()
        .filter(|offset| (HEADER_LEN..data.len()).contains(offset))
        .ok_or_else(|| anyhow!("archive TOC offset {toc_offset} is outside file bounds"))?;

    let entry_count = read_u32(data, cursor)?;
    cursor += 4;

    let mut entries = Vec::with_capacity(entry_count as usize);
    for _ in 0..entry_count {
        let name_len = read_u32(data, cursor)? as usize;
        cursor += 4;
        let name_end = cursor
            .checked_add(name_len)
            .filter(|end| *end <= data.len())
            .ok_or_else(|| anyhow!("entry name extends past archive bounds"))?;
        let name = String::from_utf8(data[cursor..name_end].to_vec())
            .map_err(|err| anyhow!("invalid UTF-8 in entry name: {err}"))?;
        cursor = name_end;

        let offset = read_u64(data, cursor)?;
        cursor += 8;
        let size = read_u64(data, cursor)?;
        cursor += 8;

        if offset
            .checked_add(size)
            .filter(|end| *end <= data.len() as u64)
            .is_none()
        {
            return Err(anyhow!(
                "entry {name} points outside archive bounds (offset={offset}, size={size}, len={})",
                data.len()
            ));
        }
        entries.push(ArchiveEntry { name, offset, size });
    }

    Ok(entries)
}

fn slice_checked(data: &[u8], offset: u64, size: u64) -> Result<&[u8]> {
    let start = usize::try_from(offset).map_err(|_| anyhow!("offset exceeds usize: {offset}"))?;
    let len = usize::try_from(size).map_err(|_| anyhow!("size exceeds usize: {size}"))?;
    let end = start
        .checked_add(len)
        .filter(|end| *end <= data.len())
        .ok_or_else(|| {
            anyhow!(
                "blob points outside archive bounds (offset={offset}, size={size}, len={})",
                data.len()
            )
        })?;
    Ok(&data[start..end])
}

fn read_u32(data: &[u8], offset: usize) -> Result<u32> {
    let end = offset
        .checked_add(4)
        .filter(|end| *end <= data.len())
        .ok_or_else(|| anyhow!("unexpected end of archive while reading 32-bit value"))?;
    Ok(u32::from_le_bytes(
        data[offset..end].try_into().expect("length checked above"),
    ))
}

fn read_u64(data: &[u8], offset: usize) -> Result<u64> {
    let end = offset
        .checked_add(8)
        .filter(|end| *end <= data.len())
        .ok_or_else(|| anyhow!("unexpected end of archive while reading 64-bit value"))?;
    Ok(u64::from_le_bytes(
        data[offset..end].try_into().expect("length checked above"),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MANIFEST: &str =
        "<scene>\n  <node>\n    <name>baked</name>\n    <mesh>meshes/baked.obj</mesh>\n  </node>\n</scene>\n";

    fn build_container(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut buffer = vec![0u8; HEADER_LEN];
        buffer[..4].copy_from_slice(MAGIC);
        buffer[4..8].copy_from_slice(&1u32.to_le_bytes());

        let mut placed = Vec::new();
        for (name, data) in entries {
            placed.push((name.to_string(), buffer.len() as u64, data.len() as u64));
            buffer.extend_from_slice(data);
        }

        let manifest_offset = buffer.len() as u64;
        buffer.extend_from_slice(MANIFEST.as_bytes());

        let toc_offset = buffer.len() as u64;
        buffer.extend_from_slice(&(entries.len() as u32).to_le_bytes());
        for (name, offset, size) in &placed {
            buffer.extend_from_slice(&(name.len() as u32).to_le_bytes());
            buffer.extend_from_slice(name.as_bytes());
            buffer.extend_from_slice(&offset.to_le_bytes());
            buffer.extend_from_slice(&size.to_le_bytes());
        }

        buffer[8..16].copy_from_slice(&toc_offset.to_le_bytes());
        buffer[16..24].copy_from_slice(&manifest_offset.to_le_bytes());
        buffer[24..32].copy_from_slice(&(MANIFEST.len() as u64).to_le_bytes());
        buffer
    }

    fn open_container(entries: &[(&str, &[u8])]) -> (NamedTempFile, PortalArchive) {
        let buffer = build_container(entries);
        let mut tmp = NamedTempFile::new().expect("tmp file");
        tmp.write_all(&buffer).expect("write archive");
        let archive = PortalArchive::open(tmp.path()).expect("open archive");
        (tmp, archive)
    }

    #[test]
    fn open_reads_manifest_and_entries() {
        let (_tmp, archive) = open_container(&[("meshes/baked.obj", b"v 0 0 0")]);
        assert_eq!(archive.version(), 1);
        assert_eq!(archive.manifest_xml(), MANIFEST);
        assert_eq!(archive.entries().len(), 1);
        assert_eq!(archive.entries()[0].name, "meshes/baked.obj");
    }

    #[test]
    fn read_entry_returns_bytes() {
        let (_tmp, archive) = open_container(&[("textures/baked.png", b"not-a-real-png")]);
        let bytes = archive.read_entry("textures/baked.png").unwrap();
        assert_eq!(bytes, b"not-a-real-png");
    }

    #[test]
    fn missing_entry_is_error() {
        let (_tmp, archive) = open_container(&[]);
        assert!(archive.read_entry("missing.obj").is_err());
    }

    #[test]
    fn from_bytes_matches_file_backing() {
        let buffer = build_container(&[("meshes/portal.obj", b"v 1 2 3")]);
        let archive = PortalArchive::from_bytes("in-memory", buffer).unwrap();
        assert_eq!(archive.read_entry("meshes/portal.obj").unwrap(), b"v 1 2 3");
    }

    #[test]
    fn rejects_bad_magic() {
        let mut buffer = build_container(&[]);
        buffer[..4].copy_from_slice(b"NOPE");
        assert!(PortalArchive::from_bytes("bad", buffer).is_err());
    }

    #[test]
    fn rejects_truncated_header() {
        assert!(PortalArchive::from_bytes("tiny", b"PRTL".to_vec()).is_err());
    }

    #[test]
    fn rejects_out_of_bounds_entry() {
        let mut buffer = build_container(&[("meshes/baked.obj", b"v 0 0 0")]);
        // Corrupt the entry size field (last 8 bytes of the TOC record).
        let len = buffer.len();
        buffer[len - 8..].copy_from_slice(&u64::MAX.to_le_bytes());
        assert!(PortalArchive::from_bytes("corrupt", buffer).is_err());
    }

    #[test]
    fn rejects_out_of_bounds_manifest() {
        let mut buffer = build_container(&[]);
        buffer[16..24].copy_from_slice(&u64::MAX.to_le_bytes());
        assert!(PortalArchive::from_bytes("corrupt", buffer).is_err());
    }
}
