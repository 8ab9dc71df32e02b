//! Byte streams behind file locations: plain files, stdin/stdout (`-`) and
//! gzip in both directions. Also the readiness wait shared by socket
//! providers.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::os::fd::RawFd;
use std::path::Path;

use flate2::Compression;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use libc::{POLLIN, nfds_t, poll, pollfd};

use crate::config::OpenFlags;

pub(crate) const STDIO_LOCATION: &str = "-";
pub(crate) const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

pub(crate) fn is_gzip(magic: &[u8]) -> bool {
    magic.starts_with(&GZIP_MAGIC)
}

/// Open `location` for reading, decompressing gzip transparently.
///
/// Concatenated gzip members (as produced by appending to a compressed
/// trace) are read as one stream.
pub(crate) fn open_input(location: &str) -> io::Result<Box<dyn Read + Send>> {
    let raw: Box<dyn Read + Send> = if location == STDIO_LOCATION {
        Box::new(io::stdin())
    } else {
        Box::new(File::open(location)?)
    };
    let mut buffered = BufReader::new(raw);
    if is_gzip(buffered.fill_buf()?) {
        tracing::debug!(location, "gzip input detected");
        Ok(Box::new(MultiGzDecoder::new(buffered)))
    } else {
        Ok(Box::new(buffered))
    }
}

/// Fill `buf` as far as the stream allows; returns the bytes read, which is
/// short only at end of stream.
pub(crate) fn read_full<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(filled)
}

/// Block until `fd` is readable, for providers with non-blocking sockets.
pub(crate) fn wait_readable(fd: RawFd) -> io::Result<()> {
    let mut poll_fds = [pollfd {
        fd,
        events: POLLIN,
        revents: 0,
    }];
    loop {
        // Safety: `poll_fds` outlives the call and its length is passed along.
        let ready = unsafe { poll(poll_fds.as_mut_ptr(), poll_fds.len() as nfds_t, -1) };
        if ready >= 0 {
            return Ok(());
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}

/// Fail early when an output file could never be created.
pub(crate) fn check_output_location(location: &str) -> io::Result<()> {
    if location == STDIO_LOCATION {
        return Ok(());
    }
    if location.is_empty() {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "empty path"));
    }
    match Path::new(location).parent() {
        Some(dir) if !dir.as_os_str().is_empty() && !dir.is_dir() => Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("directory {} does not exist", dir.display()),
        )),
        _ => Ok(()),
    }
}

fn check_append_compression(location: &str, compress: bool) -> io::Result<()> {
    let mut magic = [0u8; 2];
    let read = read_full(&mut File::open(location)?, &mut magic)?;
    let compressed = is_gzip(&magic[..read]);
    if compressed == compress {
        return Ok(());
    }
    let (existing, new) = if compressed {
        ("gzip-compressed", "uncompressed")
    } else {
        ("uncompressed", "gzip-compressed")
    };
    Err(io::Error::new(
        io::ErrorKind::InvalidInput,
        format!("cannot append {new} output to an {existing} file"),
    ))
}

/// Buffered sink, optionally gzip-compressed.
pub(crate) enum OutputStream {
    Plain(BufWriter<Box<dyn Write + Send>>),
    Gzip(GzEncoder<BufWriter<Box<dyn Write + Send>>>),
}

impl OutputStream {
    /// Open `location` for writing. The flag reports whether an appended
    /// file already holds data, in which case no file header is needed.
    ///
    /// Appending fails when the existing data and the new output disagree
    /// on gzip compression.
    pub(crate) fn open(location: &str, flags: OpenFlags, level: u32) -> io::Result<(Self, bool)> {
        let (sink, has_data): (Box<dyn Write + Send>, bool) = if location == STDIO_LOCATION {
            (Box::new(io::stdout()), false)
        } else {
            let file = flags.open_options().open(location)?;
            let has_data = flags.append && file.metadata()?.len() > 0;
            if has_data {
                check_append_compression(location, level > 0)?;
            }
            (Box::new(file), has_data)
        };
        let buffered = BufWriter::new(sink);
        let stream = if level > 0 {
            OutputStream::Gzip(GzEncoder::new(buffered, Compression::new(level)))
        } else {
            OutputStream::Plain(buffered)
        };
        Ok((stream, has_data))
    }

    /// Write any gzip trailer and flush everything to the sink.
    pub(crate) fn finish(self) -> io::Result<()> {
        match self {
            OutputStream::Plain(mut writer) => writer.flush(),
            OutputStream::Gzip(encoder) => encoder.finish()?.flush(),
        }
    }
}

impl Write for OutputStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            OutputStream::Plain(writer) => writer.write(buf),
            OutputStream::Gzip(encoder) => encoder.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            OutputStream::Plain(writer) => writer.flush(),
            OutputStream::Gzip(encoder) => encoder.flush(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};

    use super::{OutputStream, check_output_location, open_input, read_full};
    use crate::config::OpenFlags;

    #[test]
    fn gzip_output_reads_back_transparently() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.gz");
        let location = path.to_str().unwrap();

        let (mut stream, has_data) = OutputStream::open(location, OpenFlags::default(), 6).unwrap();
        assert!(!has_data);
        stream.write_all(b"first ").unwrap();
        stream.finish().unwrap();

        let append = OpenFlags {
            append: true,
            exclusive: false,
        };
        let (mut stream, has_data) = OutputStream::open(location, append, 6).unwrap();
        assert!(has_data);
        stream.write_all(b"second").unwrap();
        stream.finish().unwrap();

        let raw = std::fs::read(&path).unwrap();
        assert_eq!(&raw[..2], &[0x1f, 0x8b]);

        let mut text = String::new();
        open_input(location).unwrap().read_to_string(&mut text).unwrap();
        assert_eq!(text, "first second");
    }

    #[test]
    fn append_keeps_the_existing_compression() {
        let dir = tempfile::tempdir().unwrap();
        let append = OpenFlags {
            append: true,
            exclusive: false,
        };

        let plain = dir.path().join("plain");
        std::fs::write(&plain, b"data").unwrap();
        let err = OutputStream::open(plain.to_str().unwrap(), append, 6).err().unwrap();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
        assert!(OutputStream::open(plain.to_str().unwrap(), append, 0).is_ok());

        let packed = dir.path().join("packed.gz");
        let (mut stream, _) =
            OutputStream::open(packed.to_str().unwrap(), OpenFlags::default(), 1).unwrap();
        stream.write_all(b"data").unwrap();
        stream.finish().unwrap();
        assert!(OutputStream::open(packed.to_str().unwrap(), append, 0).is_err());
        assert_eq!(std::fs::read(&packed).unwrap()[..2], [0x1f, 0x8b]);
    }

    #[test]
    fn exclusive_refuses_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("taken");
        std::fs::write(&path, b"x").unwrap();
        let flags = OpenFlags {
            append: false,
            exclusive: true,
        };
        assert!(OutputStream::open(path.to_str().unwrap(), flags, 0).is_err());
    }

    #[test]
    fn output_location_needs_an_existing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let ok = dir.path().join("out.pcap");
        assert!(check_output_location(ok.to_str().unwrap()).is_ok());
        let missing = dir.path().join("missing").join("out.pcap");
        assert!(check_output_location(missing.to_str().unwrap()).is_err());
        assert!(check_output_location("-").is_ok());
        assert!(check_output_location("relative.pcap").is_ok());
    }

    #[test]
    fn read_full_stops_at_end_of_stream() {
        let mut data: &[u8] = &[1, 2, 3];
        let mut buf = [0u8; 8];
        assert_eq!(read_full(&mut data, &mut buf).unwrap(), 3);
        assert_eq!(read_full(&mut data, &mut buf).unwrap(), 0);
    }
}
