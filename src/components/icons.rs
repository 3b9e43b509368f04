/// Icon shown in front of a tree row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IconTag {
    Folder,
    FolderOpened,
    GitCommit,
    Json,
    Lock,
    Book,
    Law,
    SettingsGear,
    Javascript,
    Typescript,
    Css,
    Html,
    Markdown,
    FileMedia,
    FileZip,
    FileText,
    Rust,
    Gear,
    File,
}

/// Exact (lowercase) file names with a dedicated icon.
const FILENAME_ICONS: &[(&str, IconTag)] = &[
    (".gitignore", IconTag::GitCommit),
    ("package.json", IconTag::Json),
    ("package-lock.json", IconTag::Lock),
    ("cargo.lock", IconTag::Lock),
    ("readme.md", IconTag::Book),
    ("license", IconTag::Law),
    ("vite.config.ts", IconTag::SettingsGear),
    ("vite.config.js", IconTag::SettingsGear),
];

/// Lowercase extensions (without the dot).
const EXTENSION_ICONS: &[(&str, IconTag)] = &[
    ("js", IconTag::Javascript),
    ("ts", IconTag::Typescript),
    ("json", IconTag::Json),
    ("css", IconTag::Css),
    ("html", IconTag::Html),
    ("md", IconTag::Markdown),
    ("png", IconTag::FileMedia),
    ("jpg", IconTag::FileMedia),
    ("jpeg", IconTag::FileMedia),
    ("gif", IconTag::FileMedia),
    ("svg", IconTag::FileMedia),
    ("zip", IconTag::FileZip),
    ("rar", IconTag::FileZip),
    ("7z", IconTag::FileZip),
    ("log", IconTag::FileText),
    ("txt", IconTag::FileText),
    ("rs", IconTag::Rust),
    ("toml", IconTag::Gear),
];

/// Resolve the icon for an entry.
///
/// Directories pick the open or closed folder. Files are looked up by
/// exact lowercase name, then by lowercase extension, then fall back to
/// [`IconTag::File`].
pub fn resolve_icon_tag(name: &str, is_directory: bool, is_expanded: bool) -> IconTag {
    if is_directory {
        return if is_expanded {
            IconTag::FolderOpened
        } else {
            IconTag::Folder
        };
    }

    let lower = name.to_lowercase();
    if let Some((_, tag)) = FILENAME_ICONS.iter().find(|(n, _)| *n == lower) {
        return *tag;
    }

    // "archive" has no extension; ".bashrc" has extension "bashrc".
    let extension = match lower.rsplit_once('.') {
        Some((_, ext)) => ext,
        None => "",
    };
    if !extension.is_empty() {
        if let Some((_, tag)) = EXTENSION_ICONS.iter().find(|(e, _)| *e == extension) {
            return *tag;
        }
    }

    IconTag::File
}

impl IconTag {
    /// Nerd Font glyph followed by a space.
    pub fn glyph(self) -> &'static str {
        match self {
            IconTag::Folder => "\u{f07b} ",
            IconTag::FolderOpened => "\u{f07c} ",
            IconTag::GitCommit => "\u{e702} ",
            IconTag::Json => "\u{e60b} ",
            IconTag::Lock => "\u{f023} ",
            IconTag::Book => "\u{f02d} ",
            IconTag::Law => "\u{f0e3} ",
            IconTag::SettingsGear => "\u{e615} ",
            IconTag::Javascript => "\u{e74e} ",
            IconTag::Typescript => "\u{e628} ",
            IconTag::Css => "\u{e749} ",
            IconTag::Html => "\u{e736} ",
            IconTag::Markdown => "\u{e73e} ",
            IconTag::FileMedia => "\u{f1c5} ",
            IconTag::FileZip => "\u{f410} ",
            IconTag::FileText => "\u{f15c} ",
            IconTag::Rust => "\u{e7a8} ",
            IconTag::Gear => "\u{f013} ",
            IconTag::File => "\u{f15b} ",
        }
    }

    /// Plain ASCII marker for terminals without Nerd Fonts.
    pub fn ascii(self) -> &'static str {
        match self {
            IconTag::Folder => "[+] ",
            IconTag::FolderOpened => "[-] ",
            _ => "    ",
        }
    }
}
