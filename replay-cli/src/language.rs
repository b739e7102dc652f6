//! Language inference from file extensions

use std::path::Path;

/// Piston language names keyed by file extension
const EXTENSIONS: &[(&str, &str)] = &[
    ("py", "python"),
    ("js", "javascript"),
    ("mjs", "javascript"),
    ("ts", "typescript"),
    ("c", "c"),
    ("cc", "c++"),
    ("cpp", "c++"),
    ("cxx", "c++"),
    ("java", "java"),
    ("rs", "rust"),
    ("go", "go"),
    ("rb", "ruby"),
    ("php", "php"),
    ("cs", "csharp"),
    ("kt", "kotlin"),
    ("swift", "swift"),
    ("sh", "bash"),
    ("lua", "lua"),
];

pub fn infer(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    EXTENSIONS
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, language)| *language)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_extensions() {
        assert_eq!(infer(Path::new("main.cpp")), Some("c++"));
        assert_eq!(infer(Path::new("src/app.PY")), Some("python"));
        assert_eq!(infer(Path::new("Main.java")), Some("java"));
    }

    #[test]
    fn test_unknown_extension() {
        assert_eq!(infer(Path::new("notes.txt")), None);
        assert_eq!(infer(Path::new("Makefile")), None);
    }
}
