//! Path cleaning
//!
//! Canonicalizes a channel-URI path before the case-insensitive route
//! fallback: collapses repeated slashes, resolves `.` and `..` segments,
//! and guarantees a leading slash. A trailing slash survives cleaning.

/// Return the canonical form of `p`.
pub fn clean_path(p: &str) -> String {
    if p.is_empty() {
        return "/".to_string();
    }

    let bytes = p.as_bytes();
    let n = bytes.len();
    let mut out: Vec<u8> = Vec::with_capacity(n + 1);
    out.push(b'/');

    let mut r = usize::from(bytes[0] == b'/');
    let mut trailing = n > 1 && bytes[n - 1] == b'/';

    while r < n {
        match bytes[r] {
            b'/' => {
                // empty segment
                r += 1;
            }
            b'.' if r + 1 == n => {
                trailing = true;
                r += 1;
            }
            b'.' if bytes[r + 1] == b'/' => {
                // "." segment
                r += 2;
            }
            b'.' if bytes[r + 1] == b'.' && (r + 2 == n || bytes[r + 2] == b'/') => {
                // ".." segment: drop the previous one
                r += 3;
                if out.len() > 1 {
                    let cut = out
                        .iter()
                        .rposition(|&b| b == b'/')
                        .unwrap_or(0)
                        .max(1);
                    out.truncate(cut);
                }
            }
            _ => {
                if out.len() > 1 {
                    out.push(b'/');
                }
                while r < n && bytes[r] != b'/' {
                    out.push(bytes[r]);
                    r += 1;
                }
            }
        }
    }

    if trailing && out.len() > 1 {
        out.push(b'/');
    }

    String::from_utf8_lossy(&out).into_owned()
}
