use crate::storage::PAGE_SIZE;
use log::debug;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Raw page I/O against one backing file.
///
/// Every call opens the file afresh, so a `PageManager` can be shared behind
/// `&self` and always sees the current file length. Callers serialize
/// conflicting reads and writes of the same page.
#[derive(Debug, Clone)]
pub struct PageManager {
    path: PathBuf,
}

impl PageManager {
    /// Create (or truncate) the backing file.
    pub fn create(path: &Path) -> io::Result<Self> {
        OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Self::open(path)
    }

    /// Attach to an existing backing file.
    pub fn open(path: &Path) -> io::Result<Self> {
        let path = fs::canonicalize(path)?;
        if !path.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{:?} is not a regular file", path),
            ));
        }
        Ok(Self { path })
    }

    /// Canonical absolute path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_len(&self) -> io::Result<u64> {
        Ok(fs::metadata(&self.path)?.len())
    }

    /// `ceil(file_len / PAGE_SIZE)`: a trailing partial page counts.
    pub fn num_pages(&self) -> io::Result<u32> {
        let pages = self.file_len()?.div_ceil(PAGE_SIZE as u64);
        u32::try_from(pages).map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidData, "file has too many pages")
        })
    }

    /// Read page `page_number` into `buf`.
    ///
    /// Bytes past the end of a trailing partial page read as zero.
    pub fn read_page(&self, page_number: u32, buf: &mut [u8]) -> io::Result<()> {
        check_len(buf.len())?;

        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::Start(Self::page_offset(page_number)))?;

        let mut filled = 0;
        while filled < PAGE_SIZE {
            match file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        if filled == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("page {} lies past the end of the file", page_number),
            ));
        }
        buf[filled..].fill(0);

        debug!("read page {} of {:?} ({} bytes on disk)", page_number, self.path, filled);
        Ok(())
    }

    /// Write `data` to page `page_number`, extending the file if needed.
    ///
    /// Only the page's own byte range is touched.
    pub fn write_page(&self, page_number: u32, data: &[u8]) -> io::Result<()> {
        check_len(data.len())?;

        let mut file = OpenOptions::new().write(true).open(&self.path)?;
        file.seek(SeekFrom::Start(Self::page_offset(page_number)))?;
        file.write_all(data)?;
        file.sync_data()?;

        debug!("wrote page {} of {:?}", page_number, self.path);
        Ok(())
    }

    fn page_offset(page_number: u32) -> u64 {
        page_number as u64 * PAGE_SIZE as u64
    }
}

fn check_len(len: usize) -> io::Result<()> {
    if len != PAGE_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("Buffer size must be PAGE_SIZE ({}), got {}", PAGE_SIZE, len),
        ));
    }
    Ok(())
}
