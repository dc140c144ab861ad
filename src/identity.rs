use chrono::Utc;

/// Number of digest characters kept in the short (default) link form.
pub const SHORT_NAME_LEN: usize = 5;

const BASE62: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Incremental MD5 over uploaded content. Upload handlers feed it chunk by
/// chunk while spooling to disk, so the payload is only read once from the
/// wire.
pub struct ContentDigest {
    inner: md5::Context,
}

impl ContentDigest {
    pub fn new() -> Self {
        Self {
            inner: md5::Context::new(),
        }
    }

    pub fn update(&mut self, chunk: &[u8]) {
        self.inner.consume(chunk);
    }

    /// Finish the digest and return it as uppercase hex.
    pub fn finish(self) -> String {
        format!("{:x}", self.inner.compute()).to_uppercase()
    }
}

/// One-shot digest of a full buffer.
pub fn digest(content: &[u8]) -> String {
    let mut hasher = ContentDigest::new();
    hasher.update(content);
    hasher.finish()
}

/// Build the public filename for a digest. The full form keeps the whole
/// digest (hard to enumerate); the short form keeps a 5-char prefix and
/// accepts that a later upload with the same prefix overwrites this one.
pub fn name_from(digest: &str, extension: &str, full: bool) -> String {
    if full {
        format!("{digest}{extension}")
    } else {
        format!("{}{extension}", &digest[..SHORT_NAME_LEN])
    }
}

/// Alternative naming mode: a pseudo-random token seeded from the current
/// timestamp rather than the content, so identical uploads get distinct
/// names.
pub fn random_name(extension: &str, hard_to_guess: bool) -> String {
    let seed = format!("{}", Utc::now().timestamp_nanos_opt().unwrap_or_default());
    let mut hash: i64 = 0;
    for ch in seed.chars() {
        hash = (hash << 3).wrapping_sub(hash).wrapping_add(ch as i64);
    }

    let mut name = base62_encode(hash.unsigned_abs());
    if !hard_to_guess {
        name.truncate(SHORT_NAME_LEN);
    }
    format!("{}{extension}", name.to_uppercase())
}

fn base62_encode(mut num: u64) -> String {
    if num == 0 {
        return (BASE62[0] as char).to_string();
    }
    let mut result = Vec::new();
    while num > 0 {
        result.push(BASE62[(num % 62) as usize]);
        num /= 62;
    }
    result.reverse();
    String::from_utf8(result).expect("base62 output is ascii")
}

/// Extension of an uploaded filename including the leading dot, or an
/// empty string when there is none.
pub fn extension_of(filename: &str) -> String {
    match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => format!(".{ext}"),
        _ => String::new(),
    }
}
