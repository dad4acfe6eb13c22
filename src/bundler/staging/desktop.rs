//! freedesktop.org desktop entries.

use crate::bundler::settings::Settings;
use std::fmt::Write as _;

/// Render the `[Desktop Entry]` for the application.
///
/// Every Linux target ships the same entry; only `exec` differs (the
/// launcher's installed command). `icon` is an icon theme name or an
/// absolute path.
pub fn desktop_entry(settings: &Settings, exec: &str, icon: &str) -> String {
    let bundle = settings.bundle_settings();
    let mut entry = String::from("[Desktop Entry]\n");

    let _ = writeln!(entry, "Name={}", settings.product_name());
    if !settings.description().is_empty() {
        let _ = writeln!(entry, "Comment={}", settings.description());
    }
    let _ = writeln!(entry, "Exec={exec}");
    let _ = writeln!(entry, "Icon={icon}");
    entry.push_str("Type=Application\n");
    if !bundle.categories.is_empty() {
        // Category lists are semicolon-terminated.
        let _ = writeln!(entry, "Categories={};", bundle.categories.join(";"));
    }
    entry.push_str("Terminal=false\n");
    entry
}

/// File name of the desktop entry (`stemweaver.desktop`).
pub fn desktop_file_name(settings: &Settings) -> String {
    format!("{}.desktop", settings.package_name())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::settings::SettingsBuilder;

    fn settings() -> Settings {
        SettingsBuilder::new().source_dir("/tmp/src").build().unwrap()
    }

    #[test]
    fn entry_differs_only_in_exec() {
        let s = settings();
        let appimage = desktop_entry(&s, "stemweaver", "stemweaver");
        let deb = desktop_entry(&s, "/usr/bin/stemweaver", "stemweaver");

        let strip = |e: &str| {
            e.lines()
                .filter(|l| !l.starts_with("Exec="))
                .collect::<Vec<_>>()
                .join("\n")
        };
        assert_eq!(strip(&appimage), strip(&deb));
        assert!(deb.contains("Exec=/usr/bin/stemweaver\n"));
    }

    #[test]
    fn entry_carries_required_keys() {
        let entry = desktop_entry(&settings(), "stemweaver", "stemweaver");
        assert!(entry.starts_with("[Desktop Entry]\n"));
        for key in ["Name=StemWeaver", "Comment=", "Type=Application", "Categories=AudioVideo;Audio;", "Terminal=false"] {
            assert!(entry.contains(key), "missing {key}");
        }
    }
}
