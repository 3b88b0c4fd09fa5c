use crate::error::LoadError;
use std::{fs::File, io::Read, path::Path};

/// On-disk format generations. `Tr1Ub` is the "Unfinished Business" build of
/// the first generation; it shares the TR1 layout and differs only by its
/// extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LevelFormat {
    Tr1,
    Tr1Ub,
    Tr2,
    Tr3,
    Tr4,
    Tr5,
}

impl LevelFormat {
    /// True for the two formats sharing the first-generation layout.
    pub fn is_tr1_layout(self) -> bool {
        matches!(self, LevelFormat::Tr1 | LevelFormat::Tr1Ub)
    }
}

/// Classifies a level file by the last four characters of its name
/// (case-insensitive extension) and its first four bytes. Signatures are
/// exact byte matches; anything else is a hard
/// [`LoadError::UnrecognizedFormat`] - no best-guess decode is attempted.
pub fn detect_format(path: &Path) -> Result<LevelFormat, LoadError> {
    let mut check = [0u8; 4];
    let mut file = File::open(path).map_err(|e| LoadError::TruncatedFile {
        section: "signature",
        offset: 0,
        source: e,
    })?;
    file.read_exact(&mut check)
        .map_err(|e| LoadError::TruncatedFile {
            section: "signature",
            offset: 0,
            source: e,
        })?;

    classify(path, check)
}

/// The pure (extension, signature) -> format mapping, split out so it can be
/// tested without touching the filesystem.
pub fn classify(path: &Path, check: [u8; 4]) -> Result<LevelFormat, LoadError> {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    if name.len() < 5 {
        // Too short to even carry an extension.
        return Err(LoadError::UnrecognizedFormat);
    }
    let ext = match name.get(name.len() - 4..) {
        Some(tail) => tail.to_ascii_uppercase(),
        None => return Err(LoadError::UnrecognizedFormat),
    };

    let format = match ext.as_str() {
        ".PHD" if check == [0x20, 0x00, 0x00, 0x00] => LevelFormat::Tr1,
        ".TUB" if check == [0x20, 0x00, 0x00, 0x00] => LevelFormat::Tr1Ub,
        ".TR2" if check == [0x2D, 0x00, 0x00, 0x00] => LevelFormat::Tr2,
        ".TR2"
            if (check[0] == 0x38 || check[0] == 0x34)
                && check[1] == 0x00
                && (check[2] == 0x18 || check[2] == 0x08)
                && check[3] == 0xFF =>
        {
            LevelFormat::Tr3
        }
        ".TR4" if check == *b"TR4\x00" => LevelFormat::Tr4,
        // Levels produced by the community level editor.
        ".TR4" if check == *b"TR4\x63" => LevelFormat::Tr4,
        // Bogus signature written by some third-party tools.
        ".TR4" if check == [0xF0, 0xFF, 0xFF, 0xFF] => LevelFormat::Tr4,
        ".TRC" if check == *b"TR4\x00" => LevelFormat::Tr5,
        _ => return Err(LoadError::UnrecognizedFormat),
    };

    Ok(format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn classify_named(name: &str, check: [u8; 4]) -> Result<LevelFormat, LoadError> {
        classify(&PathBuf::from(name), check)
    }

    #[test]
    pub fn known_signatures_classify() {
        let cases: &[(&str, [u8; 4], LevelFormat)] = &[
            ("LEVEL1.PHD", [0x20, 0x00, 0x00, 0x00], LevelFormat::Tr1),
            ("EGYPT.TUB", [0x20, 0x00, 0x00, 0x00], LevelFormat::Tr1Ub),
            ("WALL.TR2", [0x2D, 0x00, 0x00, 0x00], LevelFormat::Tr2),
            ("JUNGLE.TR2", [0x38, 0x00, 0x18, 0xFF], LevelFormat::Tr3),
            ("TEMPLE.tr2", [0x34, 0x00, 0x08, 0xFF], LevelFormat::Tr3),
            ("angkor.tr4", *b"TR4\x00", LevelFormat::Tr4),
            ("CUSTOM.TR4", *b"TR4\x63", LevelFormat::Tr4),
            ("WEIRD.TR4", [0xF0, 0xFF, 0xFF, 0xFF], LevelFormat::Tr4),
            ("RICH.TRC", *b"TR4\x00", LevelFormat::Tr5),
        ];

        for (name, check, expected) in cases {
            let format = classify_named(name, *check).unwrap();
            assert_eq!(format, *expected, "{name}");
        }
    }

    #[test]
    pub fn bad_signature_is_rejected() {
        // Valid extensions, signatures that belong to a different generation.
        let cases: &[(&str, [u8; 4])] = &[
            ("LEVEL1.PHD", [0x2D, 0x00, 0x00, 0x00]),
            ("WALL.TR2", *b"TR4\x00"),
            ("CITY.TRC", *b"TR4\x63"),
            ("CITY.TRC", [0x20, 0x00, 0x00, 0x00]),
            ("angkor.tr4", [0x00, 0x00, 0x00, 0x00]),
        ];

        for (name, check) in cases {
            assert!(
                matches!(
                    classify_named(name, *check),
                    Err(LoadError::UnrecognizedFormat)
                ),
                "{name} should not classify"
            );
        }
    }

    #[test]
    pub fn unknown_extension_is_rejected() {
        assert!(matches!(
            classify_named("README.TXT", [0x20, 0x00, 0x00, 0x00]),
            Err(LoadError::UnrecognizedFormat)
        ));
        assert!(matches!(
            classify_named("a", [0x20, 0x00, 0x00, 0x00]),
            Err(LoadError::UnrecognizedFormat)
        ));
    }
}
