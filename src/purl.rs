//! PURL matching
//!
//! The backend has no native package-URL support, but its component naming
//! follows conventions per package ecosystem and Linux distribution. This
//! module parses PURLs and maps them to component names, versions and URLs
//! that can be looked up in the component database.

use std::borrow::Cow;
use std::collections::BTreeMap;

/// Component labels per package ecosystem.
static PURL_TYPES: &[(&str, &str)] = &[
    ("cargo", "Rust Crate"),
    ("composer", "PHP Package"),
    ("cpan", "Perl Module"),
    ("gem", "RubyGem"),
    ("golang", "Go Package"),
    ("hackage", "Haskell Package"),
    ("npm", "Node.js Package"),
    ("nuget", "NuGet Package"),
    ("pub", "Dart Package"),
    ("pypi", "Python Package"),
    ("swift", "Swift Package"),
];

/// Release-specific labels for one distro namespace. `releases` is matched
/// in order by prefix against the `distro` qualifier, so narrower prefixes
/// must come before wider ones (`amzn-2023` before `amzn-2`).
struct DistroNamespace {
    namespace: &'static str,
    generic: &'static str,
    releases: &'static [(&'static str, &'static str)],
}

static PURL_DISTROS: &[(&str, &[DistroNamespace])] = &[
    (
        "alpm",
        &[DistroNamespace {
            namespace: "arch",
            generic: "Arch Linux Package",
            releases: &[],
        }],
    ),
    (
        "apk",
        &[
            DistroNamespace {
                namespace: "alpine",
                generic: "Alpine Package",
                releases: &[
                    ("alpine-3.18", "Alpine 3.18 Package"),
                    ("alpine-3.19", "Alpine 3.19 Package"),
                    ("alpine-3.20", "Alpine 3.20 Package"),
                    ("alpine-3.21", "Alpine 3.21 Package"),
                ],
            },
            DistroNamespace {
                namespace: "openwrt",
                generic: "OpenWrt Package",
                releases: &[],
            },
        ],
    ),
    (
        "deb",
        &[
            DistroNamespace {
                namespace: "debian",
                generic: "Debian Package",
                releases: &[
                    ("debian-11", "Debian 11 Package"),
                    ("bullseye", "Debian 11 Package"),
                    ("debian-12", "Debian 12 Package"),
                    ("bookworm", "Debian 12 Package"),
                ],
            },
            DistroNamespace {
                namespace: "ubuntu",
                generic: "Ubuntu Package",
                releases: &[
                    ("ubuntu-20.04", "Ubuntu 20.04 Package"),
                    ("ubuntu-22.04", "Ubuntu 22.04 Package"),
                    ("ubuntu-24.04", "Ubuntu 24.04 Package"),
                ],
            },
        ],
    ),
    (
        "rpm",
        &[
            DistroNamespace {
                namespace: "almalinux",
                generic: "AlmaLinux Package",
                releases: &[
                    ("almalinux-8", "AlmaLinux 8 Package"),
                    ("almalinux-9", "AlmaLinux 9 Package"),
                    ("almalinux-10", "AlmaLinux 10 Package"),
                ],
            },
            DistroNamespace {
                namespace: "amzn",
                generic: "Amazon Linux Package",
                releases: &[
                    ("amzn-2018", "Amazon Linux Package"),
                    ("amzn-2023", "Amazon Linux 2023 Package"),
                    ("amzn-2", "Amazon Linux 2 Package"),
                ],
            },
            DistroNamespace {
                namespace: "fedora",
                generic: "Fedora Package",
                releases: &[
                    ("fedora-40", "Fedora 40 Package"),
                    ("fedora-41", "Fedora 41 Package"),
                    ("fedora-42", "Fedora 42 Package"),
                ],
            },
            DistroNamespace {
                namespace: "opensuse",
                generic: "openSUSE Package",
                releases: &[],
            },
            DistroNamespace {
                namespace: "ol",
                generic: "Oracle Linux OS Package",
                releases: &[
                    ("ol-7", "Oracle Linux OS 7 Package"),
                    ("ol-8", "Oracle Linux OS 8 Package"),
                    ("ol-9", "Oracle Linux OS 9 Package"),
                ],
            },
            DistroNamespace {
                namespace: "redhat",
                generic: "RHEL Package",
                releases: &[
                    ("rhel-7", "RHEL 7 Package"),
                    ("rhel-8", "RHEL 8 Package"),
                    ("rhel-9", "RHEL 9 Package"),
                ],
            },
            DistroNamespace {
                namespace: "rocky",
                generic: "Rocky Linux Package",
                releases: &[
                    ("rocky-8", "Rocky Linux 8 Package"),
                    ("rocky-9", "Rocky Linux 9 Package"),
                ],
            },
            DistroNamespace {
                namespace: "sles",
                generic: "SUSE Linux Enterprise Server Package",
                releases: &[
                    ("sles-15.5", "SUSE Linux Enterprise Server 15 SP5 Package"),
                    ("sles-15.6", "SUSE Linux Enterprise Server 15 SP6 Package"),
                    ("sles-15.7", "SUSE Linux Enterprise Server 15 SP7 Package"),
                ],
            },
        ],
    ),
];

/// Distro packages are monitored across versions, so they all match this.
const ALL_VERSIONS: &str = "All Versions";

/// Error from parsing a package URL.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid package URL {input:?}: {reason}")]
pub struct PurlError {
    input: String,
    reason: &'static str,
}

/// A parsed `pkg:` package URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Purl {
    /// Package ecosystem, lowercased (`npm`, `deb`, ...).
    pub package_type: String,
    /// Namespace segments joined with `/`, if any.
    pub namespace: Option<String>,
    pub name: String,
    pub version: Option<String>,
    /// Qualifier map with lowercased keys. Qualifiers without a value are
    /// dropped.
    pub qualifiers: BTreeMap<String, String>,
}

impl Purl {
    /// Parse a package URL. Subpaths after `#` are ignored.
    pub fn parse(input: &str) -> Result<Self, PurlError> {
        let fail = |reason: &'static str| PurlError {
            input: input.to_string(),
            reason,
        };
        let decode = |segment: &str| -> Result<String, PurlError> {
            urlencoding::decode(segment)
                .map(Cow::into_owned)
                .map_err(|_| fail("invalid percent-encoding"))
        };

        let trimmed = input.trim();
        let rest = strip_scheme(trimmed).ok_or_else(|| fail("missing pkg: scheme"))?;
        let rest = rest.trim_start_matches('/');
        let rest = match rest.split_once('#') {
            Some((head, _subpath)) => head,
            None => rest,
        };
        let (path, query) = match rest.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (rest, None),
        };
        let (path, version) = match path.rsplit_once('@') {
            Some((head, version)) if !version.is_empty() => (head, Some(decode(version)?)),
            Some((head, _empty)) => (head, None),
            None => (path, None),
        };

        let mut segments = path.split('/').filter(|segment| !segment.is_empty());
        let package_type = segments
            .next()
            .ok_or_else(|| fail("missing package type"))?
            .to_lowercase();
        let mut parts = segments.map(decode).collect::<Result<Vec<_>, _>>()?;
        let name = parts.pop().ok_or_else(|| fail("missing package name"))?;
        let namespace = if parts.is_empty() {
            None
        } else {
            Some(parts.join("/"))
        };

        let mut qualifiers = BTreeMap::new();
        if let Some(query) = query {
            for pair in query.split('&').filter(|pair| !pair.is_empty()) {
                let (key, value) = match pair.split_once('=') {
                    Some((key, value)) => (key, value),
                    None => (pair, ""),
                };
                if value.is_empty() {
                    continue;
                }
                qualifiers.insert(key.to_lowercase(), decode(value)?);
            }
        }

        Ok(Self {
            package_type,
            namespace,
            name,
            version,
            qualifiers,
        })
    }
}

fn strip_scheme(input: &str) -> Option<&str> {
    let (scheme, rest) = input.split_once(':')?;
    scheme.eq_ignore_ascii_case("pkg").then_some(rest)
}

/// How a PURL maps into the component database. All fields `None` means the
/// PURL is not matchable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentMatch {
    pub name: Option<String>,
    pub version: Option<String>,
    pub url: Option<String>,
}

/// Map a parsed PURL to component coordinates.
pub fn match_purl(purl: &Purl) -> ComponentMatch {
    if let Some(label) = lookup(PURL_TYPES, &purl.package_type) {
        return match_package(purl, label);
    }
    if purl.package_type == "github" {
        return match_github(purl);
    }
    match_distro(purl)
}

fn lookup<T: Copy>(table: &[(&str, T)], key: &str) -> Option<T> {
    table
        .iter()
        .find(|(entry, _)| *entry == key)
        .map(|(_, value)| *value)
}

fn match_package(purl: &Purl, label: &str) -> ComponentMatch {
    let name = match &purl.namespace {
        Some(namespace) => format!("{label}: {namespace}/{}", purl.name),
        None => format!("{label}: {}", purl.name),
    };
    ComponentMatch {
        name: Some(name),
        version: purl
            .version
            .as_deref()
            .map(|version| version.trim_start_matches('v').to_string()),
        url: None,
    }
}

/// GitHub projects are identified by repository URL instead of a name.
fn match_github(purl: &Purl) -> ComponentMatch {
    let Some(namespace) = &purl.namespace else {
        return ComponentMatch::default();
    };
    ComponentMatch {
        name: None,
        version: purl.version.clone(),
        url: Some(format!("https://github.com/{namespace}/{}", purl.name)),
    }
}

fn match_distro(purl: &Purl) -> ComponentMatch {
    let Some(namespaces) = lookup(PURL_DISTROS, &purl.package_type) else {
        return ComponentMatch::default();
    };
    let Some(namespace) = &purl.namespace else {
        return ComponentMatch::default();
    };
    let lowered = namespace.to_lowercase();
    let Some(table) = namespaces.iter().find(|entry| entry.namespace == lowered) else {
        return ComponentMatch::default();
    };

    let qualifier = purl.qualifiers.get("distro").map(|q| q.to_lowercase());
    let label = qualifier
        .and_then(|qualifier| {
            table
                .releases
                .iter()
                .find(|(prefix, _)| qualifier.starts_with(prefix))
                .map(|(_, label)| *label)
        })
        .unwrap_or(table.generic);

    ComponentMatch {
        name: Some(format!("{label}: {}", purl.name)),
        version: Some(ALL_VERSIONS.to_string()),
        url: None,
    }
}
