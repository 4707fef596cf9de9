//! Manufacturer data blocks: a run of `[tag, len, data[len]]` datagrams.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbidDatagram<'a> {
    pub tag: u8,
    pub data: &'a [u8],
}

/// Split `data` into datagrams. A truncated header or value ends parsing;
/// everything complete before it is returned.
pub fn read_mdi(data: &[u8]) -> Vec<DbidDatagram<'_>> {
    let mut out = Vec::new();
    let mut rest = data;
    while let [tag, len, tail @ ..] = rest {
        let len = *len as usize;
        let Some(value) = tail.get(..len) else {
            break;
        };
        out.push(DbidDatagram { tag: *tag, data: value });
        rest = &tail[len..];
    }
    out
}
