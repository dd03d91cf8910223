use std::collections::HashMap;

use crate::domain::config::Settings;

const LOGO_BASE_URL: &str =
    "https://raw.githubusercontent.com/M1XZG/operating-system-logos/master/src/128x128";

/// os-release identifiers to logo codes.
const ID_CODES: &[(&str, &str)] = &[
    ("ubuntu", "UBT"),
    ("debian", "DEB"),
    ("raspbian", "RAS"),
    ("raspberrypi", "RAS"),
    ("raspberry pi os", "RAS"),
    ("rhel", "RHT"),
    ("redhat", "RHT"),
    ("red-hat", "RHT"),
    ("centos", "CES"),
    ("fedora", "FED"),
    ("arch", "ARL"),
    ("archlinux", "ARL"),
    ("amzn", "LIN"),
    ("amazon", "LIN"),
    ("amazonlinux", "LIN"),
    ("amazon-linux", "LIN"),
    ("rocky", "LIN"),
    ("rocky-linux", "LIN"),
    ("almalinux", "LIN"),
    ("alma", "LIN"),
    ("opensuse", "SSE"),
    ("sles", "SSE"),
    ("suse", "SSE"),
    ("ol", "LIN"),
    ("oracle", "LIN"),
    ("oraclelinux", "LIN"),
    ("oracle-linux", "LIN"),
    ("manjaro", "LIN"),
    ("kali", "LIN"),
    ("gentoo", "GNT"),
    ("elementary", "LIN"),
    ("elementaryos", "LIN"),
    ("linuxmint", "MIN"),
    ("mint", "MIN"),
    ("pop", "LIN"),
    ("pop-os", "LIN"),
    ("pop!_os", "LIN"),
    ("zorin", "LIN"),
    ("void", "LIN"),
    ("nixos", "LIN"),
    ("android", "AND"),
    ("windows", "WIN"),
    ("macos", "MAC"),
    ("osx", "MAC"),
    ("darwin", "MAC"),
    ("linux", "LIN"),
    ("freebsd", "BSD"),
    ("netbsd", "NBS"),
    ("openbsd", "OBS"),
];

/// Substrings of the OS name, checked in order when no identifier matched.
const NAME_KEYWORDS: &[(&str, &str)] = &[
    ("ubuntu", "UBT"),
    ("debian", "DEB"),
    ("raspberry", "RAS"),
    ("raspbian", "RAS"),
    ("red hat", "RHT"),
    ("rhel", "RHT"),
    ("centos", "CES"),
    ("fedora", "FED"),
    ("arch", "ARL"),
    ("gentoo", "GNT"),
    ("mint", "MIN"),
    ("suse", "SSE"),
    ("opensuse", "SSE"),
    ("freebsd", "BSD"),
    ("netbsd", "NBS"),
    ("openbsd", "OBS"),
    ("mac", "MAC"),
    ("os x", "MAC"),
    ("macos", "MAC"),
    ("windows", "WIN"),
    ("android", "AND"),
    ("linux", "LIN"),
];

fn code_for_id(id: &str) -> Option<&'static str> {
    let id = id.to_lowercase();
    ID_CODES.iter().find(|(k, _)| *k == id).map(|(_, code)| *code)
}

fn logo_url(code: &str) -> String {
    format!("{}/{}.png", LOGO_BASE_URL, code.to_uppercase())
}

/// Thumbnail for the webhook embed, if any code can be derived.
pub fn os_logo_url(
    settings: &Settings,
    os_release: &HashMap<String, String>,
    os_name: &str,
) -> Option<String> {
    if let Some(code) = settings.get("DISCORD_OS_LOGO_CODE") {
        return Some(logo_url(code));
    }

    let from_id = os_release.get("ID").and_then(|id| code_for_id(id));
    let from_id_like = || {
        os_release
            .get("ID_LIKE")
            .and_then(|like| like.split_whitespace().find_map(code_for_id))
    };
    let from_name = || {
        let name = os_name.to_lowercase();
        NAME_KEYWORDS
            .iter()
            .find(|(keyword, _)| name.contains(keyword))
            .map(|(_, code)| *code)
    };

    from_id.or_else(from_id_like).or_else(from_name).map(logo_url)
}
