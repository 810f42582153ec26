use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::wib::builder::running;
use crate::wib::{InputWord, FRAME_NWORDS};

/// Writes frames to `path` as little-endian 64-bit words, [`FRAME_NWORDS`] per frame.
pub fn store_frames(path: impl AsRef<Path>, words: &[u64]) -> Result<()> {
    let path = path.as_ref();
    let mut file = BufWriter::new(
        File::create(path).with_context(|| format!("Could not create {}", path.display()))?,
    );
    for word in words {
        file.write_all(&word.to_le_bytes())
            .with_context(|| format!("Could not write to {}", path.display()))?;
    }
    file.flush()
        .with_context(|| format!("Could not write to {}", path.display()))?;
    Ok(())
}

/// Reads the frame words stored by [`store_frames`].
pub fn load_frames(path: impl AsRef<Path>) -> Result<Vec<u64>> {
    let path = path.as_ref();
    let mut bytes = Vec::new();
    BufReader::new(File::open(path).with_context(|| format!("Could not open {}", path.display()))?)
        .read_to_end(&mut bytes)
        .with_context(|| format!("Could not read {}", path.display()))?;
    if bytes.len() % (8 * FRAME_NWORDS) != 0 {
        bail!(
            "{} holds {} bytes, not a whole number of frames",
            path.display(),
            bytes.len()
        );
    }
    Ok(bytes
        .chunks_exact(8)
        .map(|chunk| {
            let mut word = [0; 8];
            word.copy_from_slice(chunk);
            u64::from_le_bytes(word)
        })
        .collect())
}

/// Turns stored frame words back into the input stream of a running acquisition.
pub fn replay(words: &[u64]) -> impl Iterator<Item = [InputWord; FRAME_NWORDS]> + '_ {
    words.chunks_exact(FRAME_NWORDS).map(|chunk| {
        let mut frame = [0; FRAME_NWORDS];
        frame.copy_from_slice(chunk);
        running(&frame)
    })
}
