//! NSI script template.

/// Modern UI installer for a Python payload with a `.bat` launcher.
///
/// Installed paths are passed in whole: a backslash directly before `{{`
/// would escape the placeholder.
pub const NSI_TEMPLATE: &str = r#"Unicode true
SetCompressor /SOLID {{compression}}

!include "MUI2.nsh"

!define PRODUCT_NAME "{{product_name}}"
!define PRODUCT_VERSION "{{version}}"
!define PRODUCT_PUBLISHER "{{publisher}}"
!define UNINSTALL_KEY "Software\Microsoft\Windows\CurrentVersion\Uninstall\${PRODUCT_NAME}"

Name "${PRODUCT_NAME} ${PRODUCT_VERSION}"
OutFile "{{output_file}}"
InstallDir "{{install_dir}}"
RequestExecutionLevel {{execution_level}}
ShowInstDetails show
ShowUninstDetails show

VIProductVersion "{{version_nsis}}"
VIAddVersionKey "ProductName" "${PRODUCT_NAME}"
VIAddVersionKey "ProductVersion" "${PRODUCT_VERSION}"
VIAddVersionKey "CompanyName" "${PRODUCT_PUBLISHER}"
VIAddVersionKey "LegalCopyright" "{{license}}"
VIAddVersionKey "FileDescription" "{{description}}"
VIAddVersionKey "FileVersion" "{{version_nsis}}"

!define MUI_ICON "{{icon_path}}"
!define MUI_UNICON "{{icon_path}}"
!define MUI_ABORTWARNING
!define MUI_FINISHPAGE_RUN "{{launcher_target}}"

!insertmacro MUI_PAGE_WELCOME
!insertmacro MUI_PAGE_DIRECTORY
!insertmacro MUI_PAGE_INSTFILES
!insertmacro MUI_PAGE_FINISH
!insertmacro MUI_UNPAGE_CONFIRM
!insertmacro MUI_UNPAGE_INSTFILES
!insertmacro MUI_LANGUAGE "English"

Function .onInit
  SetShellVarContext {{shell_context}}
FunctionEnd

Function un.onInit
  SetShellVarContext {{shell_context}}
FunctionEnd

Section "Install"
  SetOutPath "$INSTDIR"
  File /r "{{app_dir}}/*"

  WriteUninstaller "$INSTDIR\uninstall.exe"

  CreateDirectory "$SMPROGRAMS\${PRODUCT_NAME}"
  CreateShortcut "$SMPROGRAMS\${PRODUCT_NAME}\${PRODUCT_NAME}.lnk" "{{launcher_target}}" "" "{{icon_target}}"
  CreateShortcut "$SMPROGRAMS\${PRODUCT_NAME}\Uninstall ${PRODUCT_NAME}.lnk" "$INSTDIR\uninstall.exe"
  CreateShortcut "$DESKTOP\${PRODUCT_NAME}.lnk" "{{launcher_target}}" "" "{{icon_target}}"

  WriteRegStr SHCTX "${UNINSTALL_KEY}" "DisplayName" "${PRODUCT_NAME}"
  WriteRegStr SHCTX "${UNINSTALL_KEY}" "DisplayVersion" "${PRODUCT_VERSION}"
  WriteRegStr SHCTX "${UNINSTALL_KEY}" "Publisher" "${PRODUCT_PUBLISHER}"
  WriteRegStr SHCTX "${UNINSTALL_KEY}" "DisplayIcon" "{{icon_target}}"
  WriteRegStr SHCTX "${UNINSTALL_KEY}" "UninstallString" '"$INSTDIR\uninstall.exe"'
{{#if homepage}}  WriteRegStr SHCTX "${UNINSTALL_KEY}" "URLInfoAbout" "{{homepage}}"
{{/if}}  WriteRegDWORD SHCTX "${UNINSTALL_KEY}" "NoModify" 1
  WriteRegDWORD SHCTX "${UNINSTALL_KEY}" "NoRepair" 1
SectionEnd

Section "Uninstall"
  Delete "$DESKTOP\${PRODUCT_NAME}.lnk"
  RMDir /r "$SMPROGRAMS\${PRODUCT_NAME}"
  RMDir /r "$INSTDIR"
  DeleteRegKey SHCTX "${UNINSTALL_KEY}"
SectionEnd
"#;
