//! Danger classifier for generated commands
//!
//! Pattern-matches a normalized command against fixed signatures of
//! destructive shell idioms. This is an advisory heuristic that decides how
//! strict the confirmation gate is, not a security boundary: equivalent
//! commands written differently are not caught.

use lazy_static::lazy_static;
use regex::Regex;

/// A named destructive-operation signature
pub struct DangerPattern {
    pub name: &'static str,
    regex: Regex,
}

impl DangerPattern {
    fn new(name: &'static str, pattern: &str) -> Self {
        Self {
            name,
            regex: Regex::new(pattern).unwrap(),
        }
    }

    pub fn is_match(&self, command: &str) -> bool {
        self.regex.is_match(command)
    }
}

lazy_static! {
    static ref PATTERNS: Vec<DangerPattern> = vec![
        DangerPattern::new("recursive root delete", r"\brm\s+-[a-zA-Z]*(?:rf|fr)[a-zA-Z]*\s+/"),
        DangerPattern::new("filesystem format", r"\bmkfs\b"),
        DangerPattern::new("unmount", r"\bumount\b"),
        DangerPattern::new("raw disk read/write", r"\bdd\s+if="),
        DangerPattern::new("raw disk write", r"\bdd\b.*\bof=/dev/"),
        DangerPattern::new("shutdown", r"\bshutdown\b"),
        DangerPattern::new("reboot", r"\breboot\b"),
        DangerPattern::new("recursive chown to root", r"\bchown\s+-R\s+root\b"),
        DangerPattern::new("chmod to no permissions", r"\bchmod\s+(?:-R\s+)?0{3,4}\b"),
        DangerPattern::new("chmod world writable", r"\bchmod\s+(?:-R\s+)?0?777\b"),
        DangerPattern::new("truncate into path", r"(?:^|[\s;&|]):>\s*/\w"),
        DangerPattern::new("redirect onto disk device", r">\s*/dev/(?:sd|hd|nvme|disk)"),
    ];
}

/// All signatures, in evaluation order
pub fn patterns() -> &'static [DangerPattern] {
    &PATTERNS
}

/// Name of the first signature the command matches
pub fn matched_signature(command: &str) -> Option<&'static str> {
    PATTERNS
        .iter()
        .find(|p| p.is_match(command))
        .map(|p| p.name)
}

/// Check whether a command looks destructive
pub fn is_dangerous(command: &str) -> bool {
    matched_signature(command).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_signature_has_a_hit() {
        let samples = [
            "rm -rf /",
            "mkfs.ext4 /dev/sdb1",
            "umount /mnt/data",
            "dd if=/dev/zero of=disk.img bs=1M count=10",
            "sudo dd bs=4M of=/dev/sdb",
            "shutdown -h now",
            "sudo reboot",
            "chown -R root /srv",
            "chmod 000 secrets.txt",
            "chmod -R 777 /var/www",
            ":> /etc/passwd",
            "cat image.iso > /dev/sda",
        ];
        for (pattern, sample) in patterns().iter().zip(samples.iter()) {
            assert!(pattern.is_match(sample), "{} should match {:?}", pattern.name, sample);
        }
        assert_eq!(patterns().len(), samples.len());
    }

    #[test]
    fn test_recursive_delete_variants() {
        assert!(is_dangerous("rm -rf /"));
        assert!(is_dangerous("rm -rf /home"));
        assert!(is_dangerous("sudo rm -fr /"));
        assert!(is_dangerous("rm -rfv /*"));
        assert!(!is_dangerous("rm -rf ./build"));
        assert!(!is_dangerous("rm -rf target"));
    }

    #[test]
    fn test_harmless_commands() {
        assert!(!is_dangerous("ls -la"));
        assert!(!is_dangerous("git status"));
        assert!(!is_dangerous("echo hi > /tmp/out.txt"));
        assert!(!is_dangerous("chmod 644 notes.md"));
        assert!(!is_dangerous("grep -r shutdowns logs/"));
    }

    #[test]
    fn test_case_sensitive() {
        assert!(!is_dangerous("SHUTDOWN"));
        assert!(is_dangerous("shutdown"));
    }

    #[test]
    fn test_matched_signature_name() {
        assert_eq!(matched_signature("sudo reboot"), Some("reboot"));
        assert_eq!(matched_signature("ls"), None);
    }
}
