//! On-disk log of account documents.
//!
//! Layout: an 8-byte header (`b"CGAL"`, a little-endian `u16` version, two
//! zero bytes), then one frame per put:
//! `[u32 len][u32 crc32 of payload][bincode Account]`, integers little-endian.
//! Replaying keeps the last frame for each account id.

use std::collections::{HashMap, HashSet};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::model::{Account, AccountId};

const MAGIC: [u8; 4] = *b"CGAL";
const VERSION: u16 = 1;
const HEADER_LEN: usize = 8;
const FRAME_LEN: usize = 8;

fn header() -> [u8; HEADER_LEN] {
    let mut header = [0u8; HEADER_LEN];
    header[..4].copy_from_slice(&MAGIC);
    header[4..6].copy_from_slice(&VERSION.to_le_bytes());
    header
}

fn invalid(reason: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, reason.into())
}

fn check_header(bytes: &[u8]) -> io::Result<()> {
    if bytes[..4] != MAGIC {
        return Err(invalid("not an account log"));
    }
    let version = u16::from_le_bytes([bytes[4], bytes[5]]);
    if version != VERSION {
        return Err(invalid(format!("unsupported account log version {version}")));
    }
    Ok(())
}

fn write_frame(writer: &mut impl Write, account: &Account) -> io::Result<()> {
    let payload = bincode::serialize(account).map_err(|e| invalid(e.to_string()))?;
    let len = u32::try_from(payload.len()).map_err(|_| invalid("account document too large"))?;
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(&crc32fast::hash(&payload).to_le_bytes())?;
    writer.write_all(&payload)
}

/// The intact frame at the front of `buf`, with its encoded size.
fn read_frame(buf: &[u8]) -> Option<(Account, usize)> {
    let len = u32::from_le_bytes(buf.get(0..4)?.try_into().ok()?) as usize;
    let crc = u32::from_le_bytes(buf.get(4..8)?.try_into().ok()?);
    let payload = buf.get(FRAME_LEN..FRAME_LEN.checked_add(len)?)?;
    if crc32fast::hash(payload) != crc {
        return None;
    }
    let account = bincode::deserialize(payload).ok()?;
    Some((account, FRAME_LEN + len))
}

/// What `AccountLog::recover` found on disk.
#[derive(Debug, Default)]
pub struct Recovered {
    /// Latest document per account, ordered by id.
    pub accounts: Vec<Account>,
    /// Intact frames read, superseded ones included.
    pub frames: usize,
    /// Bytes cut off after the last intact frame.
    pub discarded_bytes: u64,
}

pub struct AccountLog {
    writer: BufWriter<File>,
    path: PathBuf,
    /// Ids with at least one frame in the current file.
    logged: HashSet<AccountId>,
    superseded: u64,
}

impl AccountLog {
    /// Open the log at `path`, creating it if needed, and read back every
    /// intact frame. A torn or corrupt tail is truncated so the next frame
    /// lands right after the last good one.
    pub fn recover(path: &Path) -> io::Result<(Self, Recovered)> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        let mut buf = Vec::new();
        file.read_to_end(&mut buf)?;

        if buf.len() < HEADER_LEN {
            // Fresh file, or a crash while the header was going out.
            if !header().starts_with(&buf) {
                return Err(invalid("not an account log"));
            }
            file.set_len(0)?;
            file.seek(SeekFrom::Start(0))?;
            file.write_all(&header())?;
            file.sync_all()?;
            let recovered = Recovered {
                discarded_bytes: buf.len() as u64,
                ..Recovered::default()
            };
            return Ok((Self::with_file(file, path, HashSet::new(), 0), recovered));
        }
        check_header(&buf)?;

        let mut latest: HashMap<AccountId, Account> = HashMap::new();
        let mut offset = HEADER_LEN;
        let mut frames = 0;
        while let Some((account, used)) = read_frame(&buf[offset..]) {
            latest.insert(account.id.clone(), account);
            offset += used;
            frames += 1;
        }

        let discarded_bytes = (buf.len() - offset) as u64;
        if discarded_bytes > 0 {
            file.set_len(offset as u64)?;
            file.sync_all()?;
        }
        file.seek(SeekFrom::Start(offset as u64))?;

        let logged = latest.keys().cloned().collect();
        let superseded = (frames - latest.len()) as u64;
        let mut accounts: Vec<Account> = latest.into_values().collect();
        accounts.sort_by(|a, b| a.id.cmp(&b.id));

        let log = Self::with_file(file, path, logged, superseded);
        Ok((
            log,
            Recovered {
                accounts,
                frames,
                discarded_bytes,
            },
        ))
    }

    fn with_file(file: File, path: &Path, logged: HashSet<AccountId>, superseded: u64) -> Self {
        Self {
            writer: BufWriter::new(file),
            path: path.to_path_buf(),
            logged,
            superseded,
        }
    }

    /// Buffer one document. Nothing is durable until `sync`.
    pub fn append(&mut self, account: &Account) -> io::Result<()> {
        write_frame(&mut self.writer, account)?;
        if !self.logged.insert(account.id.clone()) {
            self.superseded += 1;
        }
        Ok(())
    }

    pub fn sync(&mut self) -> io::Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_data()
    }

    /// Frames that a later frame for the same account has replaced.
    pub fn superseded(&self) -> u64 {
        self.superseded
    }

    /// Replace the file with one frame per account in `accounts`.
    ///
    /// The new file is written and fsynced beside the log, then renamed over
    /// it. Anything buffered but not yet synced is dropped.
    pub fn rewrite(&mut self, accounts: &[Account]) -> io::Result<()> {
        let tmp_path = self.path.with_extension("compacting");
        {
            let mut writer = BufWriter::new(File::create(&tmp_path)?);
            writer.write_all(&header())?;
            for account in accounts {
                write_frame(&mut writer, account)?;
            }
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;

        let file = OpenOptions::new().append(true).open(&self.path)?;
        self.writer = BufWriter::new(file);
        self.logged = accounts.iter().map(|a| a.id.clone()).collect();
        self.superseded = 0;
        Ok(())
    }
}
