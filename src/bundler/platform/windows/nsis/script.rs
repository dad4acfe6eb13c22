//! NSIS installer script generation.
//!
//! Generates NSI installer scripts from templates using Handlebars,
//! with all necessary metadata, paths, and configuration settings.

use super::{template::NSI_TEMPLATE, utils};
use crate::bundler::{
    error::{Error, Result},
    settings::Settings,
};
use handlebars::Handlebars;
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

/// Staged inputs the script refers to.
#[derive(Debug)]
pub struct ScriptInputs<'a> {
    /// Directory whose contents are installed into `$INSTDIR`.
    pub app_dir: &'a Path,
    /// Launcher file name inside `app_dir`.
    pub launcher: &'a str,
    /// Icon file name inside `app_dir`.
    pub icon_name: &'a str,
    /// Installer `.exe` to produce.
    pub output_file: &'a Path,
}

/// NSIS strings are double-quoted; `$\"` is the escape for a literal quote.
fn nsis_quote(text: &str) -> String {
    text.replace('"', "$\\\"")
}

/// Render the NSI script.
pub fn render_nsi_script(settings: &Settings, inputs: &ScriptInputs<'_>) -> Result<String> {
    let nsis = &settings.bundle_settings().windows.nsis;
    let package = settings.package();
    let mut data = BTreeMap::new();

    data.insert("product_name", nsis_quote(settings.product_name()));
    data.insert("version", settings.version_string().to_string());
    data.insert(
        "version_nsis",
        utils::format_version_for_nsis(settings.version_string()),
    );
    data.insert("publisher", nsis_quote(&package.publisher));
    data.insert("license", nsis_quote(&package.license));
    data.insert("description", nsis_quote(settings.description()));
    if let Some(homepage) = &package.homepage {
        data.insert("homepage", nsis_quote(homepage));
    }

    data.insert(
        "install_dir",
        utils::install_dir(nsis.install_mode, settings.product_name()),
    );
    data.insert(
        "execution_level",
        utils::execution_level(nsis.install_mode).to_string(),
    );
    data.insert(
        "shell_context",
        utils::shell_context(nsis.install_mode).to_string(),
    );
    data.insert("compression", utils::map_compression(nsis.compression).to_string());

    data.insert("app_dir", inputs.app_dir.display().to_string());
    data.insert(
        "icon_path",
        inputs.app_dir.join(inputs.icon_name).display().to_string(),
    );
    data.insert("launcher_target", format!("$INSTDIR\\{}", inputs.launcher));
    data.insert("icon_target", format!("$INSTDIR\\{}", inputs.icon_name));
    data.insert("output_file", inputs.output_file.display().to_string());

    let mut handlebars = Handlebars::new();
    handlebars.register_escape_fn(handlebars::no_escape);
    handlebars
        .register_template_string("installer.nsi", NSI_TEMPLATE)
        .map_err(|e| Error::GenericError(format!("failed to register NSI template: {}", e)))?;

    Ok(handlebars.render("installer.nsi", &data)?)
}

/// Render the script and write it with a UTF-8 BOM into `dir`.
///
/// # Returns
/// Path to the generated installer.nsi file
pub async fn generate_nsi_script(
    settings: &Settings,
    inputs: &ScriptInputs<'_>,
    dir: &Path,
) -> Result<PathBuf> {
    let content = render_nsi_script(settings, inputs)?;
    let nsi_path = dir.join("installer.nsi");
    utils::write_utf8_bom(&nsi_path, &content).await?;
    Ok(nsi_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::settings::{PackageSettings, SettingsBuilder};

    #[test]
    fn script_references_staged_files() {
        let settings = SettingsBuilder::new()
            .source_dir("/tmp/src")
            .package_settings(PackageSettings {
                version: "1.1".into(),
                ..Default::default()
            })
            .build()
            .unwrap();
        let inputs = ScriptInputs {
            app_dir: Path::new("/scratch/app"),
            launcher: "StemWeaver.bat",
            icon_name: "stemweaver.ico",
            output_file: Path::new("/out/StemWeaver_1.1_x64-setup.exe"),
        };

        let script = render_nsi_script(&settings, &inputs).unwrap();
        assert!(script.contains("OutFile \"/out/StemWeaver_1.1_x64-setup.exe\""));
        assert!(script.contains("File /r \"/scratch/app/*\""));
        assert!(script.contains("\"$INSTDIR\\StemWeaver.bat\""));
        assert!(script.contains("VIProductVersion \"1.1.0.0\""));
        assert!(script.contains("RequestExecutionLevel user"));
        assert!(script.contains("SetCompressor /SOLID lzma"));
        assert!(script.contains("URLInfoAbout"));
    }
}
