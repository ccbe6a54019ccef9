//! SMTP dot-stuffing (RFC 5321 §4.5.2): lines beginning with `.` are
//! escaped to `..` on the wire and collapsed back to `.` on receipt. The
//! terminating `.\r\n` is not part of the payload handled here.

pub fn stuff(body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len());
    let mut at_line_start = true;
    for &b in body {
        if at_line_start && b == b'.' {
            out.push(b'.');
        }
        out.push(b);
        at_line_start = b == b'\n';
    }
    out
}

pub fn unstuff(wire: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(wire.len());
    let mut at_line_start = true;
    let mut i = 0;
    while i < wire.len() {
        let b = wire[i];
        if at_line_start && b == b'.' && wire.get(i + 1) == Some(&b'.') {
            out.push(b'.');
            i += 2;
            at_line_start = false;
            continue;
        }
        out.push(b);
        at_line_start = b == b'\n';
        i += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stuff_unstuff_round_trip_on_leading_dots() {
        let body = b"Hello\r\n.World\r\n..Double\r\nNormal\r\n";
        let stuffed = stuff(body);
        assert_eq!(unstuff(&stuffed), body);
    }

    #[test]
    fn stuffing_only_escapes_line_leading_dots() {
        let body = b"a.b.c\r\n";
        assert_eq!(stuff(body), body);
    }

    #[test]
    fn round_trip_identity_on_arbitrary_bodies() {
        let samples: [&[u8]; 4] = [
            b"",
            b".",
            b"...\r\n...\r\n",
            b"line one\r\n.line two\r\nline.three\r\n",
        ];
        for sample in samples {
            assert_eq!(unstuff(&stuff(sample)), sample);
        }
    }
}
