use crate::event::{OutputLine, ProcessEvent, StreamKind};
use tokio::io::AsyncRead;
use tokio::sync::mpsc::UnboundedSender;
use tokio_stream::StreamExt;
use tokio_util::bytes::BytesMut;
use tokio_util::codec::{Decoder, FramedRead};

/// Splits child output after each `\n`, keeping the terminator.
///
/// Invalid UTF-8 is replaced rather than treated as a stream error, and an
/// unterminated final line is still delivered at EOF.
#[derive(Debug, Default)]
pub struct LineCodec {
    // Bytes already scanned for a newline
    next_index: usize,
}

impl Decoder for LineCodec {
    type Item = OutputLine;
    type Error = std::io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(offset) = src[self.next_index..].iter().position(|b| *b == b'\n') else {
            self.next_index = src.len();
            return Ok(None);
        };

        let end = self.next_index + offset;
        self.next_index = 0;
        let line = src.split_to(end + 1);
        Ok(Some(to_line(&line)))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }
        if src.is_empty() {
            return Ok(None);
        }

        self.next_index = 0;
        let rest = src.split_to(src.len());
        Ok(Some(to_line(&rest)))
    }
}

fn to_line(bytes: &[u8]) -> OutputLine {
    OutputLine::new(String::from_utf8_lossy(bytes))
}

/// Read `io` to EOF, forwarding each line as a [`ProcessEvent`] of `kind`.
///
/// Stops early without error once the receiving side is gone.
pub async fn forward_lines<R: AsyncRead + Unpin>(
    io: R,
    kind: StreamKind,
    events: UnboundedSender<ProcessEvent>,
) -> std::io::Result<()> {
    let mut frames = FramedRead::with_capacity(io, LineCodec::default(), 1024);

    while let Some(frame) = frames.next().await {
        let line = frame?;
        if events.send(kind.event(line)).is_err() {
            break;
        }
    }

    Ok(())
}
