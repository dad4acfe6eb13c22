//! System package manager detection.

use super::ToolSpec;

/// A supported host package manager.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PackageManager {
    /// Debian, Ubuntu.
    Apt,
    /// Fedora, RHEL 8+.
    Dnf,
    /// Older RHEL / CentOS.
    Yum,
    /// Arch Linux.
    Pacman,
    /// openSUSE.
    Zypper,
}

impl PackageManager {
    /// Detection order. The first manager whose executable exists wins.
    pub const PRIORITY: [PackageManager; 5] = [
        PackageManager::Apt,
        PackageManager::Dnf,
        PackageManager::Yum,
        PackageManager::Pacman,
        PackageManager::Zypper,
    ];

    /// Detect the host package manager from `PATH`.
    pub fn detect() -> Option<Self> {
        Self::detect_with(super::command_exists)
    }

    /// Detect using a custom presence check.
    pub fn detect_with(exists: impl Fn(&str) -> bool) -> Option<Self> {
        let found = Self::PRIORITY
            .into_iter()
            .find(|manager| exists(manager.executable()));
        match found {
            Some(manager) => log::debug!("Detected package manager: {}", manager.executable()),
            None => log::debug!("No supported package manager detected"),
        }
        found
    }

    /// Executable name.
    pub fn executable(self) -> &'static str {
        match self {
            PackageManager::Apt => "apt-get",
            PackageManager::Dnf => "dnf",
            PackageManager::Yum => "yum",
            PackageManager::Pacman => "pacman",
            PackageManager::Zypper => "zypper",
        }
    }

    fn install_args(self) -> &'static [&'static str] {
        match self {
            PackageManager::Apt => &["install", "-y"],
            PackageManager::Dnf | PackageManager::Yum => &["install", "-y"],
            PackageManager::Pacman => &["-S", "--noconfirm"],
            PackageManager::Zypper => &["--non-interactive", "install"],
        }
    }

    /// Package providing `spec` on this distribution family.
    pub fn package_for(self, spec: &ToolSpec) -> &'static str {
        match (spec.command, self) {
            ("rpmbuild", PackageManager::Apt) => "rpm",
            ("rpmbuild", PackageManager::Pacman) => "rpm-tools",
            ("makensis", PackageManager::Dnf | PackageManager::Yum) => "mingw32-nsis",
            ("python3", PackageManager::Pacman) => "python",
            _ => spec.package,
        }
    }

    /// Program and arguments installing `tools`, escalated through `sudo`
    /// unless already running as root.
    pub fn install_command(self, tools: &[ToolSpec], as_root: bool) -> (String, Vec<String>) {
        let mut packages: Vec<String> = Vec::new();
        for tool in tools {
            let package = self.package_for(tool).to_string();
            if !packages.contains(&package) {
                packages.push(package);
            }
        }

        let mut args: Vec<String> = self.install_args().iter().map(|a| a.to_string()).collect();
        args.extend(packages);

        if as_root {
            (self.executable().to_string(), args)
        } else {
            let mut sudo_args = vec![self.executable().to_string()];
            sudo_args.extend(args);
            ("sudo".to_string(), sudo_args)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detection_follows_priority_order() {
        let found = PackageManager::detect_with(|cmd| cmd == "pacman" || cmd == "yum");
        assert_eq!(found, Some(PackageManager::Yum));
        assert_eq!(PackageManager::detect_with(|_| false), None);
    }

    #[test]
    fn install_command_escalates_when_not_root() {
        let tools = [ToolSpec::required("rpmbuild", "rpm-build")];
        let (program, args) = PackageManager::Apt.install_command(&tools, false);
        assert_eq!(program, "sudo");
        assert_eq!(args, ["apt-get", "install", "-y", "rpm"]);

        let (program, args) = PackageManager::Dnf.install_command(&tools, true);
        assert_eq!(program, "dnf");
        assert_eq!(args, ["install", "-y", "rpm-build"]);
    }
}
