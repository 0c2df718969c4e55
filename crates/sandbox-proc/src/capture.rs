use tokio::io::{AsyncRead, AsyncReadExt};

/// Read buffer size for draining child pipes.
const READ_CHUNK: usize = 8 * 1024;

/// One captured stream, capped at the configured byte limit.
#[derive(Debug, Default)]
pub(crate) struct Captured {
    pub bytes: Vec<u8>,
    pub truncated: bool,
}

impl Captured {
    /// Text view of the captured bytes.
    ///
    /// When the cap cut a multibyte sequence in half, lossy conversion
    /// would turn the partial sequence into a three-byte replacement
    /// character and push the text past the cap; drop the partial tail
    /// instead. Invalid bytes the child actually wrote stay visible as
    /// replacement characters.
    pub(crate) fn into_text(self) -> String {
        let mut bytes = self.bytes;
        if self.truncated {
            trim_partial_trailing_sequence(&mut bytes);
        }
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

/// Drop a trailing UTF-8 lead byte that announces more continuation bytes
/// than the buffer holds.
fn trim_partial_trailing_sequence(bytes: &mut Vec<u8>) {
    for back in 1..=bytes.len().min(3) {
        let idx = bytes.len() - back;
        let Some(&byte) = bytes.get(idx) else { return };
        if byte & 0xC0 == 0x80 {
            // Continuation byte, keep scanning for the lead.
            continue;
        }
        let width = match byte {
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            // ASCII or an invalid lead; nothing the cap could have cut.
            _ => return,
        };
        if width > back {
            bytes.truncate(idx);
        }
        return;
    }
}

/// Drain `reader` to EOF, keeping at most `cap` bytes.
///
/// Bytes past the cap are read and discarded rather than left in the pipe,
/// so a chatty child never blocks on a full pipe buffer while the watchdog
/// is still counting down.
pub(crate) async fn drain_capped<R>(mut reader: R, cap: usize) -> std::io::Result<Captured>
where
    R: AsyncRead + Unpin,
{
    let mut out = Captured::default();
    let mut buf = [0u8; READ_CHUNK];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        // n <= buf.len() is guaranteed by read()
        let chunk = buf.get(..n).unwrap_or_default();
        let room = cap.saturating_sub(out.bytes.len());
        if room >= n {
            out.bytes.extend_from_slice(chunk);
        } else {
            out.bytes
                .extend_from_slice(chunk.get(..room).unwrap_or_default());
            out.truncated = true;
        }
    }
    Ok(out)
}
