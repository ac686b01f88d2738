//! Utility functions and helpers.

pub mod cookies;
pub mod date;
pub mod http;
pub mod progress;
pub mod url;

use std::path::Path;

/// File extensions treated as post images.
pub const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "webp", "gif"];

/// Check whether a path has a supported image extension (case-insensitive).
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_image_file() {
        assert!(is_image_file(Path::new("a/b/0.jpg")));
        assert!(is_image_file(Path::new("cover.PNG")));
        assert!(is_image_file(Path::new("x.webp")));
        assert!(!is_image_file(Path::new("post.json")));
        assert!(!is_image_file(Path::new("noext")));
    }
}
