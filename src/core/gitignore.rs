//! Ignore rules for the snapshot repository.
//!
//! Anything matched here never reaches `current.patch`: build output, IDE
//! state and files regenerated by the native toolchains.

use crate::infra::io::LINE_ENDING;

const SNAPSHOT_IGNORES: &[&str] = &[
    // Xcode
    "build/",
    "*.pbxuser",
    "!default.pbxuser",
    "*.mode1v3",
    "!default.mode1v3",
    "*.mode2v3",
    "!default.mode2v3",
    "*.perspectivev3",
    "!default.perspectivev3",
    "xcuserdata",
    "*.xccheckout",
    "*.moved-aside",
    "DerivedData",
    "*.hmap",
    "*.ipa",
    "*.xcuserstate",
    "ios/.xcode.env.local",
    // Android / IntelliJ
    ".idea",
    ".gradle",
    "local.properties",
    "*.iml",
    "*.hprof",
    "*.keystore",
    "!debug.keystore",
    // CocoaPods
    "/ios/Pods/",
    "/vendor/bundle/",
    "Podfile.lock",
    // macOS
    ".DS_Store",
    "*.jsbundle",
    // Created by Xcode when the project is opened
    "IDEWorkspaceChecks.plist",
    // Leftovers of a failed apply
    "*.rej",
    "*.orig",
];

/// Contents of the snapshot `.gitignore`; `extra` entries are appended once.
/// Later `!pattern` entries re-include what the defaults ignore.
pub fn snapshot_gitignore(extra: &[String]) -> String {
    let mut entries: Vec<&str> = Vec::with_capacity(SNAPSHOT_IGNORES.len() + extra.len());

    for entry in SNAPSHOT_IGNORES
        .iter()
        .copied()
        .chain(extra.iter().map(String::as_str))
    {
        let entry = entry.trim();
        if !entry.is_empty() && !entries.contains(&entry) {
            entries.push(entry);
        }
    }

    let mut out = entries.join(LINE_ENDING);
    out.push_str(LINE_ENDING);
    out
}
