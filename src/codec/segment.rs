use crate::constants::SEGMENT_GROUP_MARKER;
use crate::constants::SEGMENT_GROUP_SIZE;
use crate::RangeError;

/// Appends the group encoding of one key segment to `buf`.
pub(crate) fn encode_segment(
    segment: &[u8],
    buf: &mut Vec<u8>,
) {
    let mut chunks = segment.chunks(SEGMENT_GROUP_SIZE).peekable();
    // An empty segment, or one whose length is a multiple of the group size,
    // ends with an all-padding group.
    let needs_tail = segment.len() % SEGMENT_GROUP_SIZE == 0;

    while let Some(chunk) = chunks.next() {
        let last = chunks.peek().is_none() && !needs_tail;
        buf.extend_from_slice(chunk);
        let pad = SEGMENT_GROUP_SIZE - chunk.len();
        buf.extend(std::iter::repeat(0u8).take(pad));
        if last {
            buf.push(SEGMENT_GROUP_MARKER - pad as u8);
        } else {
            buf.push(SEGMENT_GROUP_MARKER);
        }
    }

    if needs_tail {
        buf.extend(std::iter::repeat(0u8).take(SEGMENT_GROUP_SIZE));
        buf.push(SEGMENT_GROUP_MARKER - SEGMENT_GROUP_SIZE as u8);
    }
}

/// Decodes a concatenation of encoded segments.
pub(crate) fn decode_segments(mut bytes: &[u8]) -> Result<Vec<Vec<u8>>, RangeError> {
    let group = SEGMENT_GROUP_SIZE + 1;
    let mut segments = Vec::new();
    let mut current = Vec::new();

    while !bytes.is_empty() {
        if bytes.len() < group {
            return Err(RangeError::CorruptRecord(format!(
                "truncated key group: {} bytes left",
                bytes.len()
            )));
        }
        let (data, marker) = (&bytes[..SEGMENT_GROUP_SIZE], bytes[SEGMENT_GROUP_SIZE]);
        bytes = &bytes[group..];

        let pad = (SEGMENT_GROUP_MARKER - marker) as usize;
        if pad == 0 {
            current.extend_from_slice(data);
            continue;
        }
        if pad > SEGMENT_GROUP_SIZE {
            return Err(RangeError::CorruptRecord(format!("bad group marker {:#04x}", marker)));
        }
        let real = SEGMENT_GROUP_SIZE - pad;
        if data[real..].iter().any(|b| *b != 0) {
            return Err(RangeError::CorruptRecord("non-zero group padding".into()));
        }
        current.extend_from_slice(&data[..real]);
        segments.push(std::mem::take(&mut current));
    }

    if !current.is_empty() {
        return Err(RangeError::CorruptRecord("unterminated key segment".into()));
    }
    Ok(segments)
}
