//! Launcher scripts that start the Python entry point.
//!
//! The POSIX launcher locates itself with `readlink -f`, so it works from any
//! install prefix and through symlinks (AppImage `AppRun`, `/usr/bin`).

use crate::bundler::{error::Result, settings::Settings};
use handlebars::Handlebars;
use serde::Serialize;

const POSIX_TEMPLATE: &str = r#"#!/bin/sh
# {{product_name}} {{version}} launcher
SELF="$(readlink -f "$0")"
HERE="$(dirname "$SELF")"
APP_DIR="$(cd "$HERE/{{payload_dir}}" 2>/dev/null && pwd)" || {
    echo "{{product_name}}: payload directory not found next to $SELF" >&2
    exit 1
}

if [ -x "$APP_DIR/venv/bin/python3" ]; then
    PYTHON="$APP_DIR/venv/bin/python3"
elif [ -x "$APP_DIR/runtime/bin/python3" ]; then
    PYTHON="$APP_DIR/runtime/bin/python3"
elif command -v python3 >/dev/null 2>&1; then
    PYTHON="$(command -v python3)"
else
    echo "{{product_name}}: no Python 3 interpreter found; install python3 (>= {{min_python}}) and try again" >&2
    exit 127
fi

exec "$PYTHON" "$APP_DIR/{{entry_point}}" "$@"
"#;

const WINDOWS_TEMPLATE: &str = r#"@echo off
rem {{product_name}} {{version}} launcher
setlocal
set "APP_DIR=%~dp0"
set "ENTRY=%APP_DIR%{{entry_point_win}}"

if exist "%APP_DIR%runtime\pythonw.exe" (
    start "" "%APP_DIR%runtime\pythonw.exe" "%ENTRY%" %*
    goto :eof
)
where pyw >nul 2>nul
if %ERRORLEVEL%==0 (
    start "" pyw -3 "%ENTRY%" %*
    goto :eof
)
where pythonw >nul 2>nul
if %ERRORLEVEL%==0 (
    start "" pythonw "%ENTRY%" %*
    goto :eof
)
echo {{product_name}}: no Python 3 interpreter found. Install Python {{min_python}} or newer.
pause
exit /b 1
"#;

#[derive(Serialize)]
struct LauncherData<'a> {
    product_name: &'a str,
    version: &'a str,
    min_python: &'a str,
    payload_dir: &'a str,
    entry_point: String,
    entry_point_win: String,
}

fn render(template: &str, data: &LauncherData<'_>) -> Result<String> {
    let mut handlebars = Handlebars::new();
    handlebars.register_escape_fn(handlebars::no_escape);
    Ok(handlebars.render_template(template, data)?)
}

fn data<'a>(settings: &'a Settings, payload_dir: &'a str) -> LauncherData<'a> {
    let entry_point = settings.entry_point_str();
    LauncherData {
        product_name: settings.product_name(),
        version: settings.version_string(),
        min_python: &settings.bundle_settings().min_python,
        payload_dir,
        entry_point_win: entry_point.replace('/', "\\"),
        entry_point,
    }
}

/// POSIX `sh` launcher. `payload_dir` is the payload location relative to
/// the directory the launcher is installed in.
pub fn posix_launcher(settings: &Settings, payload_dir: &str) -> Result<String> {
    render(POSIX_TEMPLATE, &data(settings, payload_dir))
}

/// Windows `.bat` launcher placed next to the payload.
pub fn windows_launcher(settings: &Settings) -> Result<String> {
    let text = render(WINDOWS_TEMPLATE, &data(settings, "."))?;
    Ok(text.replace('\n', "\r\n"))
}
