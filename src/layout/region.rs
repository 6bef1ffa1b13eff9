use alloc::vec::Vec;

/// Borrowed byte ranges to be written back to back.
///
/// Empty ranges are never stored.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BufferList<'a> {
    buffers: Vec<&'a [u8]>,
}

impl<'a> BufferList<'a> {
    pub fn new() -> Self {
        Self {
            buffers: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, bytes: &'a [u8]) {
        if !bytes.is_empty() {
            self.buffers.push(bytes);
        }
    }

    /// Number of buffers.
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Bytes across all buffers.
    pub fn total_len(&self) -> usize {
        self.buffers.iter().map(|b| b.len()).sum()
    }

    pub fn as_slice(&self) -> &[&'a [u8]] {
        &self.buffers
    }

    pub fn iter(&self) -> core::slice::Iter<'_, &'a [u8]> {
        self.buffers.iter()
    }

    pub fn into_vec(self) -> Vec<&'a [u8]> {
        self.buffers
    }
}

impl<'a, 'b> IntoIterator for &'b BufferList<'a> {
    type Item = &'b &'a [u8];
    type IntoIter = core::slice::Iter<'b, &'a [u8]>;

    fn into_iter(self) -> Self::IntoIter {
        self.buffers.iter()
    }
}

/// A contiguous run of file bytes: seek to `file_offset`, then write
/// `buffers` in order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriteRegion<'a> {
    pub file_offset: u64,
    pub buffers: BufferList<'a>,
}

impl<'a> WriteRegion<'a> {
    /// Bytes in the region.
    pub fn len(&self) -> u64 {
        self.buffers.total_len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// File offset one past the region's last byte.
    pub fn end_offset(&self) -> u64 {
        self.file_offset + self.len()
    }

    /// Concatenate the buffers (copies).
    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.buffers.total_len());
        for buffer in &self.buffers {
            out.extend_from_slice(buffer);
        }
        out
    }

    /// Seek to the region's offset and write every buffer.
    #[cfg(feature = "std")]
    pub fn write_to<W>(&self, writer: &mut W) -> std::io::Result<()>
    where
        W: std::io::Write + std::io::Seek,
    {
        writer.seek(std::io::SeekFrom::Start(self.file_offset))?;
        for buffer in &self.buffers {
            writer.write_all(buffer)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_buffers_are_dropped() {
        let mut list = BufferList::new();
        list.push(b"");
        list.push(b"abc");
        list.push(b"");
        assert_eq!(list.len(), 1);
        assert_eq!(list.total_len(), 3);
    }

    #[test]
    fn region_concatenates() {
        let mut buffers = BufferList::new();
        buffers.push(b"head");
        buffers.push(b"body");
        let region = WriteRegion {
            file_offset: 10,
            buffers,
        };
        assert_eq!(region.len(), 8);
        assert_eq!(region.end_offset(), 18);
        assert_eq!(region.to_vec(), b"headbody");
    }

    #[cfg(feature = "std")]
    #[test]
    fn write_to_seeks_first() {
        let mut buffers = BufferList::new();
        buffers.push(b"xy");
        let region = WriteRegion {
            file_offset: 3,
            buffers,
        };
        let mut file = std::io::Cursor::new(alloc::vec![0u8; 6]);
        region.write_to(&mut file).unwrap();
        assert_eq!(file.into_inner(), [0, 0, 0, b'x', b'y', 0]);
    }
}
