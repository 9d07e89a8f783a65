use sha2::{Digest, Sha256};

pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_content_hashes_the_same() {
        assert_eq!(content_hash("hello"), content_hash("hello"));
    }

    #[test]
    fn different_content_hashes_differ() {
        assert_ne!(content_hash("hello"), content_hash("world"));
    }
}
