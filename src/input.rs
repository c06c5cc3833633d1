use std::fs::File;
use std::io::{self, BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::Path;

use anyhow::Result;

/// Seekable input over a file or buffered stdin
pub enum InputReader {
    File(BufReader<File>),
    Pipe(Cursor<Vec<u8>>),
}

impl InputReader {
    /// Create a new InputReader from a path
    /// Use "-" for stdin pipe input, which is read fully into memory
    pub fn new<P: AsRef<Path>>(input_path: P) -> Result<Self> {
        if Self::is_pipe_path(&input_path) {
            let mut data = Vec::new();
            io::stdin().lock().read_to_end(&mut data)?;
            return Ok(Self::Pipe(Cursor::new(data)));
        }

        let file = File::open(input_path)?;
        Ok(Self::File(BufReader::new(file)))
    }

    pub fn is_pipe_path<P: AsRef<Path>>(input_path: P) -> bool {
        input_path.as_ref().to_string_lossy() == "-"
    }

    /// Check if this is pipe input
    pub fn is_pipe(&self) -> bool {
        matches!(self, Self::Pipe(_))
    }
}

impl Read for InputReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::File(reader) => reader.read(buf),
            Self::Pipe(reader) => reader.read(buf),
        }
    }
}

impl Seek for InputReader {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match self {
            Self::File(reader) => reader.seek(pos),
            Self::Pipe(reader) => reader.seek(pos),
        }
    }
}
